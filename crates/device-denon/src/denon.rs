use crate::protocol::{parse_event, LINE_TERMINATOR, MAIN_VOLUME_QUERY};
use anyhow::{Context, Result};
use async_trait::async_trait;
use avrtrim_core::{ReceiverEvent, ReceiverTransport};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Port the receiver's telnet control interface listens on
pub const DEFAULT_TELNET_PORT: u16 = 23;

/// Connection settings for [`DenonReceiver`]
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    pub port: u16,
    pub connect_timeout: Duration,
    /// Pause between consecutive commands of a batch
    pub command_spacing: Duration,
    /// Notifications buffered before the reader waits on the consumer
    pub event_buffer: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_TELNET_PORT,
            connect_timeout: Duration::from_secs(5),
            // Receivers drop commands that arrive back to back
            command_spacing: Duration::from_millis(50),
            event_buffer: 64,
        }
    }
}

/// Denon/Marantz receiver controlled over its telnet interface
///
/// Commands go out on the write half; a background task reads the other half
/// and forwards parsed notifications to the channel returned by
/// [`DenonReceiver::connect`].
pub struct DenonReceiver {
    label: String,
    writer: Mutex<OwnedWriteHalf>,
    command_spacing: Duration,
    reader_task: JoinHandle<()>,
}

impl DenonReceiver {
    /// Connect and start forwarding notifications
    pub async fn connect(
        host: &str,
        options: ConnectOptions,
    ) -> Result<(Self, mpsc::Receiver<ReceiverEvent>)> {
        let label = format!("{}:{}", host, options.port);
        tracing::info!("Connecting to receiver at {}", label);

        let stream = tokio::time::timeout(
            options.connect_timeout,
            TcpStream::connect((host, options.port)),
        )
        .await
        .with_context(|| format!("Timed out connecting to receiver at {}", label))?
        .with_context(|| format!("Failed to connect to receiver at {}", label))?;

        stream
            .set_nodelay(true)
            .context("Failed to configure receiver socket")?;

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(options.event_buffer.max(1));
        let reader_task = tokio::spawn(read_events(read_half, tx, label.clone()));

        tracing::info!("Connected to receiver at {}", label);

        Ok((
            Self {
                label,
                writer: Mutex::new(write_half),
                command_spacing: options.command_spacing,
                reader_task,
            },
            rx,
        ))
    }

    /// Ask the receiver to report its main volume
    pub async fn query_main_volume(&self) -> Result<()> {
        self.send_commands(&[MAIN_VOLUME_QUERY.to_string()]).await
    }

    /// Stop forwarding notifications
    pub fn close(&self) {
        tracing::debug!("Closing connection to receiver at {}", self.label);
        self.reader_task.abort();
    }
}

#[async_trait]
impl ReceiverTransport for DenonReceiver {
    fn id(&self) -> &str {
        &self.label
    }

    async fn send_commands(&self, commands: &[String]) -> Result<()> {
        let mut writer = self.writer.lock().await;

        for (idx, command) in commands.iter().enumerate() {
            if idx > 0 && !self.command_spacing.is_zero() {
                tokio::time::sleep(self.command_spacing).await;
            }

            tracing::debug!("-> {}: {}", self.label, command);
            writer
                .write_all(command.as_bytes())
                .await
                .with_context(|| format!("Failed to send '{}' to {}", command, self.label))?;
            writer
                .write_all(&[LINE_TERMINATOR])
                .await
                .with_context(|| format!("Failed to send '{}' to {}", command, self.label))?;
        }

        writer
            .flush()
            .await
            .with_context(|| format!("Failed to flush commands to {}", self.label))?;

        Ok(())
    }
}

impl Drop for DenonReceiver {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn read_events(read_half: OwnedReadHalf, tx: mpsc::Sender<ReceiverEvent>, label: String) {
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::with_capacity(64);

    loop {
        buf.clear();
        match reader.read_until(LINE_TERMINATOR, &mut buf).await {
            Ok(0) => {
                tracing::warn!("Receiver at {} closed the connection", label);
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                tracing::debug!("<- {}: {}", label, line);
                let Some(event) = parse_event(line) else {
                    continue;
                };

                if tx.send(event).await.is_err() {
                    tracing::debug!("Notification consumer for {} went away", label);
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to read from receiver at {}: {}", label, e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn options(port: u16) -> ConnectOptions {
        ConnectOptions {
            port,
            command_spacing: Duration::ZERO,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_forwards_notifications() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"MV505\rMVMAX 98\r\rZ240\r").await.unwrap();
            socket
        });

        let (receiver, mut events) = DenonReceiver::connect("127.0.0.1", options(port)).await.unwrap();
        let _socket = server.await.unwrap();

        assert_eq!(events.recv().await, Some(ReceiverEvent::new("Main", "MV", "505")));
        assert_eq!(events.recv().await, Some(ReceiverEvent::new("Main", "MVMAX", "98")));
        assert_eq!(events.recv().await, Some(ReceiverEvent::new("Zone2", "MV", "40")));
        assert_eq!(receiver.id(), format!("127.0.0.1:{}", port));
    }

    #[tokio::test]
    async fn test_sends_terminated_commands_in_order() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let expected = b"SSLEVSL 51\rSSLEVTFL 505\rMV?\r";
            let mut received = vec![0u8; expected.len()];
            socket.read_exact(&mut received).await.unwrap();
            received
        });

        let (receiver, _events) = DenonReceiver::connect("127.0.0.1", options(port)).await.unwrap();
        receiver
            .send_commands(&["SSLEVSL 51".to_string(), "SSLEVTFL 505".to_string()])
            .await
            .unwrap();
        receiver.query_main_volume().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, b"SSLEVSL 51\rSSLEVTFL 505\rMV?\r".to_vec());
    }

    #[tokio::test]
    async fn test_stream_ends_when_receiver_disconnects() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let (_receiver, mut events) = DenonReceiver::connect("127.0.0.1", options(port)).await.unwrap();
        server.await.unwrap();

        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, port) = listener().await;
        drop(listener);

        let result = DenonReceiver::connect("127.0.0.1", options(port)).await;
        assert!(result.is_err());
    }
}
