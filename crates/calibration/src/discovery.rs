use crate::document::Calibration;
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

/// Calibration exports are named `manualREW*.ady`
pub const CALIBRATION_FILE_PREFIX: &str = "manualREW";
pub const CALIBRATION_FILE_SUFFIX: &str = ".ady";

fn is_calibration_file(name: &str) -> bool {
    name.starts_with(CALIBRATION_FILE_PREFIX) && name.ends_with(CALIBRATION_FILE_SUFFIX)
}

/// Find the calibration export in `dir`.
///
/// When several match, the first by file name wins so the choice is stable.
pub async fn find_calibration_file(dir: &Path) -> Result<PathBuf> {
    let metadata = tokio::fs::metadata(dir)
        .await
        .with_context(|| format!("Config directory '{}' does not exist", dir.display()))?;
    if !metadata.is_dir() {
        bail!("Config path '{}' is not a directory", dir.display());
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list '{}'", dir.display()))?;

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(name) = name.to_str() {
            if is_calibration_file(name) {
                candidates.push(entry.path());
            }
        }
    }

    candidates.sort();
    if candidates.len() > 1 {
        tracing::warn!(
            "Found {} calibration files in '{}', using the first",
            candidates.len(),
            dir.display()
        );
    }

    candidates.into_iter().next().ok_or_else(|| {
        anyhow!(
            "No file starting with \"{}\" and ending with \"{}\" found in '{}'",
            CALIBRATION_FILE_PREFIX,
            CALIBRATION_FILE_SUFFIX,
            dir.display()
        )
    })
}

/// Read and parse a calibration export
pub async fn load_calibration_file(path: &Path) -> Result<Calibration> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read calibration file '{}'", path.display()))?;

    let calibration = Calibration::from_json(&contents)
        .with_context(|| format!("Failed to parse calibration file '{}'", path.display()))?
        .with_source(path);

    tracing::info!(
        "Loaded calibration '{}' from {} ({} adjustable channels)",
        calibration.title(),
        path.display(),
        calibration.speaker_baselines().len()
    );

    Ok(calibration)
}

/// Locate and load the calibration export in `dir`
pub async fn load_calibration(dir: &Path) -> Result<Calibration> {
    let path = find_calibration_file(dir).await?;
    load_calibration_file(&path).await
}
