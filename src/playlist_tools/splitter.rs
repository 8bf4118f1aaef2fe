use std::collections::HashSet;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use walkdir::WalkDir;

use crate::m3u::{is_path_line, list_playlist_files};

/// What splitting one playlist changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub name: String,
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl SplitReport {
    pub fn is_unchanged(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }
}

/// Chunk file contents: the header plus one path per line, no trailing newline.
pub fn chunk_contents(paths: &[&str]) -> String {
    format!("#EXTM3U\n{}", paths.join("\n"))
}

/// Splits `playlist` into `<output_dir>/<stem>_<n>.m3u` chunks of at most `chunk_size` paths.
///
/// Chunks whose contents are already on disk are not rewritten, and `<stem>_*.m3u` files left
/// over from a longer version of the playlist are deleted.
pub fn split_playlist(playlist: &Path, output_dir: &Path, chunk_size: usize) -> Result<SplitReport> {
    let stem = playlist
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let bytes = std::fs::read(playlist)
        .wrap_err_with(|| format!("Failed to read playlist: {}", playlist.display()))?;
    let contents = String::from_utf8_lossy(&bytes);
    let paths: Vec<&str> = contents
        .lines()
        .filter(|line| is_path_line(line))
        .map(str::trim)
        .collect();

    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create folder: {}", output_dir.display()))?;

    let mut report = SplitReport {
        name: stem.clone(),
        ..Default::default()
    };
    let mut kept = HashSet::new();

    for (index, chunk) in paths.chunks(chunk_size.max(1)).enumerate() {
        let output = output_dir.join(format!("{}_{}.m3u", stem, index + 1));
        kept.insert(output.clone());

        let new_contents = chunk_contents(chunk);
        if std::fs::read_to_string(&output).is_ok_and(|existing| existing == new_contents) {
            continue;
        }

        std::fs::write(&output, new_contents)
            .wrap_err_with(|| format!("Failed to write chunk: {}", output.display()))?;
        log::info!("[WRITTEN] {}", output.display());
        report.written.push(output);
    }

    let prefix = format!("{}_", stem);
    for entry in WalkDir::new(output_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        let is_chunk = name.starts_with(&prefix) && name.ends_with(".m3u");
        if !entry.file_type().is_file() || !is_chunk || kept.contains(entry.path()) {
            continue;
        }

        std::fs::remove_file(entry.path())
            .wrap_err_with(|| format!("Failed to remove chunk: {}", entry.path().display()))?;
        log::info!("[REMOVED] {}", entry.path().display());
        report.removed.push(entry.path().to_path_buf());
    }

    if report.is_unchanged() {
        log::info!("[UNCHANGED] {} - no updates needed", stem);
    }
    Ok(report)
}

/// Splits every playlist in `source` into its own `target/<stem>/` folder.
pub fn split_folder(source: &Path, target: &Path, chunk_size: usize) -> Result<Vec<SplitReport>> {
    let mut reports = Vec::new();
    for playlist in list_playlist_files(source)? {
        let stem = playlist
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        reports.push(split_playlist(&playlist, &target.join(stem), chunk_size)?);
    }
    Ok(reports)
}
