use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};

use crate::ports::spotify::{SpotifyApiPlaylist, SpotifyClient, TrackUri};

/// Items requested per playlist page.
pub const PLAYLIST_PAGE_SIZE: u32 = 100;

/// Reads and rewrites the current user's remote playlists.
pub struct RemotePlaylistAccessor<C: SpotifyClient> {
    client: Arc<C>,
}

impl<C: SpotifyClient> RemotePlaylistAccessor<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Case-insensitive exact name match. With duplicate names the first one Spotify lists wins.
    pub async fn find(&self, name: &str) -> Result<Option<SpotifyApiPlaylist>> {
        let playlists = self
            .client
            .current_user_playlists()
            .await
            .wrap_err("Failed to list current user playlists")?;

        let wanted = name.to_lowercase();
        Ok(playlists
            .into_iter()
            .find(|playlist| playlist.name.to_lowercase() == wanted))
    }

    /// All track uris of the playlist in playlist order, paging until exhausted.
    pub async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<TrackUri>> {
        let mut uris = Vec::new();
        let mut offset = Some(0);

        while let Some(current) = offset {
            let page = self
                .client
                .playlist_items_page(playlist_id, PLAYLIST_PAGE_SIZE, current)
                .await
                .wrap_err_with(|| {
                    format!(
                        "Failed to fetch items of playlist {} at offset {}",
                        playlist_id, current
                    )
                })?;

            uris.extend(page.uris);
            offset = page.next_offset;
        }

        Ok(uris)
    }

    /// Creates an empty playlist owned by the authenticated user.
    pub async fn create(&self, name: &str, description: &str) -> Result<SpotifyApiPlaylist> {
        let owner_id = self
            .client
            .current_user_id()
            .await
            .wrap_err("Failed to get current user")?;

        self.client
            .create_playlist(&owner_id, name, description)
            .await
            .wrap_err_with(|| format!("Failed to create playlist: {}", name))
    }

    pub async fn set_description(&self, playlist_id: &str, description: &str) -> Result<()> {
        self.client
            .set_description(playlist_id, description)
            .await
            .wrap_err_with(|| format!("Failed to update description of playlist {}", playlist_id))
    }
}
