use std::fmt;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};

use crate::config::MountPointConfig;
use crate::m3u::list_playlist_files;
use crate::playlist_tools::rewrite_lines;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountPointStatus {
    /// Rewritten, original kept at `backup`
    Converted { backup: PathBuf },
    /// A backup from an earlier run exists, the file is left alone
    BackupExists,
    NoConversionNeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointResult {
    pub file: PathBuf,
    pub status: MountPointStatus,
}

impl fmt::Display for MountPointResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        match &self.status {
            MountPointStatus::Converted { .. } => {
                write!(f, "✓ Converted {} (backup saved as {}.backup)", name, name)
            }
            MountPointStatus::BackupExists => write!(f, "⚠ Skipped {} (backup already exists)", name),
            MountPointStatus::NoConversionNeeded => write!(f, "- No conversion needed for {}", name),
        }
    }
}

pub fn backup_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

pub fn convert_line(line: &str, mount_point: &MountPointConfig) -> String {
    line.replace(&mount_point.old, &mount_point.new)
}

/// Rewrites the mount point of a single playlist, backing it up first.
pub fn convert_file(file: &Path, mount_point: &MountPointConfig) -> Result<MountPointStatus> {
    let contents = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("Failed to read playlist: {}", file.display()))?;

    if !contents.contains(&mount_point.old) {
        return Ok(MountPointStatus::NoConversionNeeded);
    }

    let backup = backup_path(file);
    if backup.exists() {
        return Ok(MountPointStatus::BackupExists);
    }

    std::fs::rename(file, &backup)
        .wrap_err_with(|| format!("Failed to back up playlist: {}", file.display()))?;
    let converted = rewrite_lines(&contents, |line| convert_line(line, mount_point));
    std::fs::write(file, converted)
        .wrap_err_with(|| format!("Failed to write playlist: {}", file.display()))?;

    Ok(MountPointStatus::Converted { backup })
}

/// Converts every playlist in `folder`. Stops at the first I/O error.
pub fn convert_folder(folder: &Path, mount_point: &MountPointConfig) -> Result<Vec<MountPointResult>> {
    log::debug!(
        "Changing mount point '{}' -> '{}' in {}",
        mount_point.old,
        mount_point.new,
        folder.display()
    );

    let mut results = Vec::new();
    for file in list_playlist_files(folder)? {
        let status = convert_file(&file, mount_point)?;
        let result = MountPointResult { file, status };
        match result.status {
            MountPointStatus::BackupExists => log::warn!("{}", result),
            _ => log::info!("{}", result),
        }
        results.push(result);
    }
    Ok(results)
}

pub fn converted_count(results: &[MountPointResult]) -> usize {
    results
        .iter()
        .filter(|r| matches!(r.status, MountPointStatus::Converted { .. }))
        .count()
}
