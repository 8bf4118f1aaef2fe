use std::path::Path;

use audiotags::Tag;

use crate::ports::tags::{MetadataError, RawTags, TagReader};

/// Extensions audiotags can read tags from.
pub const SUPPORTED_FILE_TYPES: &[&str] = &["mp3", "flac", "m4a", "mp4"];

/// Normalized (artist, title, album) triple read from an audio file's tags.
///
/// Only ever built with a non-empty artist and title; album may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub artist: String,
    pub title: String,
    pub album: String,
}

impl TrackDescriptor {
    /// Builds a descriptor from raw tags, `None` unless artist and title are both present.
    pub fn from_tags(tags: RawTags) -> Option<Self> {
        let clean = |value: Option<String>| value.map(|v| v.trim().to_string()).unwrap_or_default();

        let artist = clean(tags.artist);
        let title = clean(tags.title);
        let album = clean(tags.album);

        if artist.is_empty() || title.is_empty() {
            return None;
        }

        Some(Self {
            artist,
            title,
            album,
        })
    }
}

/// Reads tags from disk with audiotags.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudiotagsReader;

impl TagReader for AudiotagsReader {
    fn read_tags(&self, path: &Path) -> Result<RawTags, MetadataError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !SUPPORTED_FILE_TYPES.contains(&extension.as_str()) {
            return Err(MetadataError::UnsupportedFileType { extension });
        }

        let tag = Tag::new()
            .read_from_path(path)
            .map_err(|e| MetadataError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(RawTags {
            artist: tag.artist().map(str::to_string),
            title: tag.title().map(str::to_string),
            album: tag.album_title().map(str::to_string),
        })
    }
}

/// Turns audio file paths into track descriptors, never failing the caller.
pub struct MetadataExtractor<R: TagReader> {
    reader: R,
}

impl<R: TagReader> MetadataExtractor<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns `None` (with a warning) when the file is unreadable, unsupported or lacks
    /// artist/title tags.
    pub fn extract(&self, path: &Path) -> Option<TrackDescriptor> {
        let tags = match self.reader.read_tags(path) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!("Metadata error for {}: {}", path.display(), e);
                return None;
            }
        };

        let descriptor = TrackDescriptor::from_tags(tags);
        if descriptor.is_none() {
            tracing::warn!(
                "Skipping {}: missing artist or title tag",
                path.display()
            );
        }
        descriptor
    }
}
