use std::path::Path;

/// Raw tag values read from an audio file. Missing frames are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType { extension: String },

    #[error("Failed to read tags from {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Port trait for reading embedded tags from audio files.
#[cfg_attr(test, mockall::automock)]
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<RawTags, MetadataError>;
}
