//! Denon/Marantz telnet line protocol.
//!
//! Every message is ASCII terminated by a carriage return. A message starts
//! with a two letter event code ("MV", "PW", "SS") followed by its parameter;
//! zone 2 and 3 messages carry a "Z2"/"Z3" prefix instead.

use avrtrim_core::{ReceiverEvent, MAIN_VOLUME_EVENT, MAIN_ZONE};

/// Terminator of every telnet message
pub const LINE_TERMINATOR: u8 = b'\r';

/// Asks the receiver to report the current main volume
pub const MAIN_VOLUME_QUERY: &str = "MV?";

const MAX_VOLUME_EVENT: &str = "MVMAX";

/// Parse one telnet line into a receiver notification
pub fn parse_event(line: &str) -> Option<ReceiverEvent> {
    let line = line.trim();

    let (zone, body) = match line.get(..2) {
        Some("Z2") => ("Zone2", &line[2..]),
        Some("Z3") => ("Zone3", &line[2..]),
        Some(_) => (MAIN_ZONE, line),
        None => return None,
    };

    if zone != MAIN_ZONE {
        // "Z250" is a zone volume; "Z2ON" and friends are zone commands
        if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
            return Some(ReceiverEvent::new(zone, MAIN_VOLUME_EVENT, body));
        }
        let event = body.get(..2)?;
        return Some(ReceiverEvent::new(zone, event, &body[2..]));
    }

    if let Some(parameter) = body.strip_prefix(MAX_VOLUME_EVENT) {
        return Some(ReceiverEvent::new(zone, MAX_VOLUME_EVENT, parameter.trim()));
    }

    let event = body.get(..2)?;
    Some(ReceiverEvent::new(zone, event, &body[2..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main_volume() {
        assert_eq!(parse_event("MV505"), Some(ReceiverEvent::new("Main", "MV", "505")));
        assert_eq!(parse_event("MV50\r"), Some(ReceiverEvent::new("Main", "MV", "50")));
    }

    #[test]
    fn test_parse_max_volume_is_separate_event() {
        assert_eq!(parse_event("MVMAX 98"), Some(ReceiverEvent::new("Main", "MVMAX", "98")));
    }

    #[test]
    fn test_parse_other_events() {
        assert_eq!(parse_event("PWON"), Some(ReceiverEvent::new("Main", "PW", "ON")));
        assert_eq!(parse_event("SSLEVSL 51"), Some(ReceiverEvent::new("Main", "SS", "LEVSL 51")));
    }

    #[test]
    fn test_parse_zones() {
        assert_eq!(parse_event("Z240"), Some(ReceiverEvent::new("Zone2", "MV", "40")));
        assert_eq!(parse_event("Z3ON"), Some(ReceiverEvent::new("Zone3", "ON", "")));
        assert_eq!(parse_event("Z2MUON"), Some(ReceiverEvent::new("Zone2", "MU", "ON")));
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(parse_event(""), None);
        assert_eq!(parse_event("M"), None);
        assert_eq!(parse_event("Z2"), None);
        assert_eq!(parse_event("Z2X"), None);
    }
}
