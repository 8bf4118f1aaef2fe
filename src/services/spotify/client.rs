use std::num::NonZeroU32;

use color_eyre::eyre::{Result, WrapErr};

use crate::ports::spotify::{
    PlaylistItemsPage, SpotifyApiPlaylist, SpotifyApiTrack, SpotifyClient, TrackUri,
};
use crate::spotify_rs::SpotifyWebClient;
use crate::spotify_rs::types::{SpotifyPage, SpotifyPlaylist, SpotifyPlaylistItem, SpotifyTrack};

#[derive(Debug, Clone)]
pub struct SpotifyApiCredentials {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyApiCredentials {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

/// Production [`SpotifyClient`] backed by the Spotify Web API.
pub struct SpotifyHttpAdapter {
    client: SpotifyWebClient,
}

impl SpotifyHttpAdapter {
    pub fn new(access_token: String, requests_per_second: NonZeroU32) -> Self {
        Self {
            client: SpotifyWebClient::new(access_token, requests_per_second),
        }
    }
}

fn to_api_playlist(playlist: SpotifyPlaylist) -> SpotifyApiPlaylist {
    SpotifyApiPlaylist {
        id: playlist.id,
        name: playlist.name,
    }
}

fn to_api_track(track: SpotifyTrack) -> SpotifyApiTrack {
    SpotifyApiTrack {
        uri: TrackUri(track.uri),
        name: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album_name: track.album.map(|a| a.name).unwrap_or_default(),
    }
}

fn raw_uris(uris: &[TrackUri]) -> Vec<String> {
    uris.iter().map(|u| u.as_str().to_string()).collect()
}

/// Null tracks are dropped, but still count towards the next offset. A page that claims a
/// `next` while returning no items ends the listing.
fn to_items_page(playlist_id: &str, page: SpotifyPage<SpotifyPlaylistItem>) -> PlaylistItemsPage {
    let item_count = page.items.len() as u32;
    let uris = page
        .items
        .into_iter()
        .filter_map(|item| match item.track {
            Some(track) => Some(TrackUri(track.uri)),
            None => {
                tracing::debug!("Ignoring unavailable item in playlist {}", playlist_id);
                None
            }
        })
        .collect();

    let next_offset = match page.next {
        Some(_) if item_count > 0 => Some(page.offset + item_count),
        Some(_) => {
            tracing::warn!(
                "Spotify returned an empty page with a next link for playlist {}",
                playlist_id
            );
            None
        }
        None => None,
    };

    PlaylistItemsPage { uris, next_offset }
}

#[async_trait::async_trait]
impl SpotifyClient for SpotifyHttpAdapter {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyApiTrack>> {
        let tracks = self
            .client
            .search_tracks(query, limit)
            .await
            .wrap_err("Spotify search request failed")?;
        Ok(tracks.into_iter().map(to_api_track).collect())
    }

    async fn current_user_id(&self) -> Result<String> {
        let user = self
            .client
            .get_current_user()
            .await
            .wrap_err("Failed to get current Spotify user")?;
        Ok(user.id)
    }

    async fn current_user_playlists(&self) -> Result<Vec<SpotifyApiPlaylist>> {
        let playlists = self
            .client
            .get_user_playlists()
            .await
            .wrap_err("Failed to list Spotify playlists")?;
        Ok(playlists.into_iter().map(to_api_playlist).collect())
    }

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PlaylistItemsPage> {
        let page = self
            .client
            .get_playlist_items(playlist_id, limit, offset)
            .await
            .wrap_err("Failed to fetch Spotify playlist items")?;

        Ok(to_items_page(playlist_id, page))
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> Result<SpotifyApiPlaylist> {
        let playlist = self
            .client
            .create_playlist(owner_id, name, description)
            .await
            .wrap_err("Failed to create Spotify playlist")?;
        Ok(to_api_playlist(playlist))
    }

    async fn remove_items(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()> {
        let snapshot = self
            .client
            .remove_tracks(playlist_id, &raw_uris(uris))
            .await
            .wrap_err("Failed to remove tracks from Spotify playlist")?;
        tracing::debug!("Removed {} uris, snapshot {}", uris.len(), snapshot.snapshot_id);
        Ok(())
    }

    async fn add_items(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()> {
        let snapshot = self
            .client
            .add_tracks(playlist_id, &raw_uris(uris))
            .await
            .wrap_err("Failed to add tracks to Spotify playlist")?;
        tracing::debug!("Added {} uris, snapshot {}", uris.len(), snapshot.snapshot_id);
        Ok(())
    }

    async fn set_description(&self, playlist_id: &str, description: &str) -> Result<()> {
        self.client
            .change_playlist_description(playlist_id, description)
            .await
            .wrap_err("Failed to update Spotify playlist description")
    }
}
