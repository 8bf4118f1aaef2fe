use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};

use crate::config::WindowsPathConfig;
use crate::m3u::list_playlist_files;
use crate::playlist_tools::rewrite_lines;

/// `/media/.../library/Artist/a.flac` -> `Z:\music\library\Artist\a.flac`
pub fn convert_line(line: &str, paths: &WindowsPathConfig) -> String {
    line.replace(&paths.linux_prefix, &paths.windows_prefix)
        .replace('/', "\\")
}

pub fn convert_contents(contents: &str, paths: &WindowsPathConfig) -> String {
    rewrite_lines(contents, |line| convert_line(line, paths))
}

/// Writes a Windows copy of every playlist in `source` into `target`, which is created if
/// missing. Existing copies are overwritten.
pub fn convert_folder(source: &Path, target: &Path, paths: &WindowsPathConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(target)
        .wrap_err_with(|| format!("Failed to create folder: {}", target.display()))?;

    let mut written = Vec::new();
    for file in list_playlist_files(source)? {
        let Some(name) = file.file_name() else {
            continue;
        };
        let contents = std::fs::read_to_string(&file)
            .wrap_err_with(|| format!("Failed to read playlist: {}", file.display()))?;

        let output = target.join(name);
        std::fs::write(&output, convert_contents(&contents, paths))
            .wrap_err_with(|| format!("Failed to write playlist: {}", output.display()))?;
        log::debug!("Wrote {}", output.display());
        written.push(output);
    }

    log::info!("Converted {} playlists into {}", written.len(), target.display());
    Ok(written)
}
