use std::fmt;

use color_eyre::eyre::Result;

/// Opaque Spotify track identifier (`spotify:track:...`).
///
/// Equality is exact-string; order inside a list is playlist position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackUri(pub String);

impl TrackUri {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackUri {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Decoupled representation of a Spotify playlist from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyApiPlaylist {
    pub id: String,
    pub name: String,
}

/// Decoupled representation of a Spotify search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyApiTrack {
    pub uri: TrackUri,
    pub name: String,
    pub artists: Vec<String>,
    pub album_name: String,
}

/// One page of playlist items. `next_offset` is `None` on the last page.
///
/// Items Spotify returns without a track (removed or unavailable content) have no uri and are
/// left out of `uris`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistItemsPage {
    pub uris: Vec<TrackUri>,
    pub next_offset: Option<u32>,
}

/// Port trait wrapping the Spotify API capabilities used by business logic.
///
/// Implementations live in `services::spotify::client` (production), `test_utils` (in-memory
/// fake) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyClient: Send + Sync {
    /// Ranked track candidates for a search query, at most `limit` of them.
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyApiTrack>>;

    async fn current_user_id(&self) -> Result<String>;

    async fn current_user_playlists(&self) -> Result<Vec<SpotifyApiPlaylist>>;

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PlaylistItemsPage>;

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> Result<SpotifyApiPlaylist>;

    async fn remove_items(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()>;

    async fn add_items(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()>;

    async fn set_description(&self, playlist_id: &str, description: &str) -> Result<()>;
}
