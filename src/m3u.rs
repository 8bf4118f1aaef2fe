use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use walkdir::WalkDir;

/// A local m3u playlist: the ordered audio paths it lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlaylist {
    pub path: PathBuf,
    pub entries: Vec<PathBuf>,
}

impl LocalPlaylist {
    /// Reads a playlist file, resolving relative entries against `music_root`.
    pub fn read(path: &Path, music_root: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read playlist file: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            entries: parse_entries(&contents, music_root),
        })
    }

    /// Remote playlist name for this file, e.g. `my_favorites.m3u` -> `Synced My Favorites`.
    pub fn remote_name(&self) -> String {
        format_playlist_name(&self.path)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Whether a line is a path entry rather than a blank line or an m3u directive/comment.
pub fn is_path_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Path entries of an m3u file in file order. Duplicates are kept.
pub fn parse_entries(contents: &str, music_root: &Path) -> Vec<PathBuf> {
    contents
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| is_path_line(line))
        .map(|line| music_root.join(line.trim()))
        .collect()
}

pub fn format_playlist_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("Synced {}", title_case(&stem.replace('_', " ")))
}

/// Upper-cases the first letter of every run of letters and lower-cases the rest.
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_is_letter = false;

    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            output.push(c);
            previous_is_letter = false;
        }
    }

    output
}

/// All `*.m3u` files directly inside `folder`, sorted by file name.
pub fn list_playlist_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry
            .wrap_err_with(|| format!("Failed to list playlists folder: {}", folder.display()))?;
        let path = entry.path();
        let is_m3u = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("m3u"));

        if entry.file_type().is_file() && is_m3u {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries_skips_comments_and_blank_lines() {
        let contents = "#EXTM3U\n#EXTINF:123,Artist - Title\nArtist/Album/01 Title.flac\n\n   \n/abs/Other.flac\r\n";
        let entries = parse_entries(contents, Path::new("/music"));

        assert_eq!(
            entries,
            vec![
                PathBuf::from("/music/Artist/Album/01 Title.flac"),
                PathBuf::from("/abs/Other.flac"),
            ]
        );
    }

    #[test]
    fn test_parse_entries_keeps_duplicates_in_order() {
        let contents = "b.flac\na.flac\nb.flac\n";
        let entries = parse_entries(contents, Path::new("/root"));

        assert_eq!(
            entries,
            vec![
                PathBuf::from("/root/b.flac"),
                PathBuf::from("/root/a.flac"),
                PathBuf::from("/root/b.flac"),
            ]
        );
    }

    #[test]
    fn test_parse_entries_strips_byte_order_mark() {
        let entries = parse_entries("\u{feff}song.flac\n", Path::new("/m"));
        assert_eq!(entries, vec![PathBuf::from("/m/song.flac")]);
    }

    #[test]
    fn test_format_playlist_name() {
        assert_eq!(
            format_playlist_name(Path::new("/p/favorites.m3u")),
            "Synced Favorites"
        );
        assert_eq!(
            format_playlist_name(Path::new("/p/late_NIGHT_drive.m3u")),
            "Synced Late Night Drive"
        );
    }

    #[test]
    fn test_title_case_matches_word_boundaries() {
        assert_eq!(title_case("they're 90s hits"), "They'Re 90S Hits");
        assert_eq!(title_case("rock-n-roll"), "Rock-N-Roll");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_read_local_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("road_trip.m3u");
        std::fs::write(&path, "#EXTM3U\nA/a.flac\nB/b.flac\n").unwrap();

        let playlist = LocalPlaylist::read(&path, Path::new("/library")).unwrap();

        assert_eq!(playlist.remote_name(), "Synced Road Trip");
        assert_eq!(playlist.file_name(), "road_trip.m3u");
        assert_eq!(playlist.entries.len(), 2);
        assert_eq!(playlist.entries[0], PathBuf::from("/library/A/a.flac"));
    }

    #[test]
    fn test_read_missing_playlist_fails() {
        let result = LocalPlaylist::read(Path::new("/does/not/exist.m3u"), Path::new("/"));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_playlist_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.m3u"), "").unwrap();
        std::fs::write(dir.path().join("a.M3U"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("c.m3u.backup"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.m3u"), "").unwrap();

        let files = list_playlist_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.M3U", "b.m3u"]);
    }
}
