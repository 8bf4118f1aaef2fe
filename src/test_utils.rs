use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};

use crate::ports::spotify::{
    PlaylistItemsPage, SpotifyApiPlaylist, SpotifyApiTrack, SpotifyClient, TrackUri,
};
use crate::ports::tags::{MetadataError, RawTags, TagReader};

/// Every call made against [`InMemorySpotify`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotifyCall {
    Search { query: String, limit: u32 },
    CurrentUser,
    ListPlaylists,
    ItemsPage { playlist_id: String, offset: u32 },
    Create { name: String },
    Remove { playlist_id: String, uris: Vec<TrackUri> },
    Add { playlist_id: String, uris: Vec<TrackUri> },
    SetDescription { playlist_id: String, description: String },
}

impl SpotifyCall {
    pub fn is_track_mutation(&self) -> bool {
        matches!(self, SpotifyCall::Remove { .. } | SpotifyCall::Add { .. })
    }
}

#[derive(Debug, Clone)]
struct FakePlaylist {
    id: String,
    name: String,
    description: Option<String>,
    tracks: Vec<TrackUri>,
}

#[derive(Debug, Default)]
struct FakeState {
    playlists: Vec<FakePlaylist>,
    search_hits: HashMap<String, Vec<TrackUri>>,
    failing_playlists: Vec<String>,
    calls: Vec<SpotifyCall>,
    next_id: u32,
}

/// In-memory Spotify account that records every call.
#[derive(Debug, Default)]
pub struct InMemorySpotify {
    state: Mutex<FakeState>,
}

impl InMemorySpotify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing playlist and returns its id.
    pub fn with_playlist(&self, name: &str, tracks: &[&str]) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("playlist-{}", state.next_id);
        state.playlists.push(FakePlaylist {
            id: id.clone(),
            name: name.to_string(),
            description: None,
            tracks: tracks.iter().map(|t| TrackUri::from(*t)).collect(),
        });
        id
    }

    /// Makes `query` return `uris` as its ranked candidates.
    pub fn with_search_hits(&self, query: &str, uris: &[&str]) {
        self.state.lock().unwrap().search_hits.insert(
            query.to_string(),
            uris.iter().map(|u| TrackUri::from(*u)).collect(),
        );
    }

    /// Every track mutation on a playlist with this name fails.
    pub fn fail_mutations_on(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_playlists
            .push(name.to_lowercase());
    }

    pub fn calls(&self) -> Vec<SpotifyCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn track_mutations(&self) -> Vec<SpotifyCall> {
        self.calls()
            .into_iter()
            .filter(SpotifyCall::is_track_mutation)
            .collect()
    }

    pub fn tracks_of(&self, name: &str) -> Option<Vec<TrackUri>> {
        self.find(name).map(|p| p.tracks)
    }

    pub fn description_of(&self, name: &str) -> Option<String> {
        self.find(name).and_then(|p| p.description)
    }

    pub fn playlist_count(&self) -> usize {
        self.state.lock().unwrap().playlists.len()
    }

    fn find(&self, name: &str) -> Option<FakePlaylist> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }
}

impl FakeState {
    fn playlist_mut(&mut self, playlist_id: &str) -> Result<&mut FakePlaylist> {
        let failing = self.failing_playlists.clone();
        let playlist = self
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| eyre!("404 Not Found: playlist {}", playlist_id))?;

        if failing.contains(&playlist.name.to_lowercase()) {
            return Err(eyre!("503 Service Unavailable"));
        }
        Ok(playlist)
    }
}

fn api_playlist(playlist: &FakePlaylist) -> SpotifyApiPlaylist {
    SpotifyApiPlaylist {
        id: playlist.id.clone(),
        name: playlist.name.clone(),
    }
}

#[async_trait::async_trait]
impl SpotifyClient for InMemorySpotify {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyApiTrack>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpotifyCall::Search {
            query: query.to_string(),
            limit,
        });

        let hits = state.search_hits.get(query).cloned().unwrap_or_default();
        Ok(hits
            .into_iter()
            .take(limit as usize)
            .map(|uri| SpotifyApiTrack {
                name: uri.to_string(),
                uri,
                artists: vec!["Fake Artist".to_string()],
                album_name: String::new(),
            })
            .collect())
    }

    async fn current_user_id(&self) -> Result<String> {
        self.state.lock().unwrap().calls.push(SpotifyCall::CurrentUser);
        Ok("test-user".to_string())
    }

    async fn current_user_playlists(&self) -> Result<Vec<SpotifyApiPlaylist>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpotifyCall::ListPlaylists);
        Ok(state.playlists.iter().map(api_playlist).collect())
    }

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PlaylistItemsPage> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpotifyCall::ItemsPage {
            playlist_id: playlist_id.to_string(),
            offset,
        });

        let playlist = state
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| eyre!("404 Not Found: playlist {}", playlist_id))?;

        let start = (offset as usize).min(playlist.tracks.len());
        let end = (start + limit as usize).min(playlist.tracks.len());
        let next_offset = (end < playlist.tracks.len()).then_some(end as u32);

        Ok(PlaylistItemsPage {
            uris: playlist.tracks[start..end].to_vec(),
            next_offset,
        })
    }

    async fn create_playlist(
        &self,
        _owner_id: &str,
        name: &str,
        description: &str,
    ) -> Result<SpotifyApiPlaylist> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpotifyCall::Create {
            name: name.to_string(),
        });
        state.next_id += 1;
        let playlist = FakePlaylist {
            id: format!("playlist-{}", state.next_id),
            name: name.to_string(),
            description: Some(description.to_string()),
            tracks: vec![],
        };
        let created = api_playlist(&playlist);
        state.playlists.push(playlist);
        Ok(created)
    }

    async fn remove_items(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpotifyCall::Remove {
            playlist_id: playlist_id.to_string(),
            uris: uris.to_vec(),
        });
        let playlist = state.playlist_mut(playlist_id)?;
        playlist.tracks.retain(|t| !uris.contains(t));
        Ok(())
    }

    async fn add_items(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpotifyCall::Add {
            playlist_id: playlist_id.to_string(),
            uris: uris.to_vec(),
        });
        let playlist = state.playlist_mut(playlist_id)?;
        playlist.tracks.extend_from_slice(uris);
        Ok(())
    }

    async fn set_description(&self, playlist_id: &str, description: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SpotifyCall::SetDescription {
            playlist_id: playlist_id.to_string(),
            description: description.to_string(),
        });
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| eyre!("404 Not Found: playlist {}", playlist_id))?;
        playlist.description = Some(description.to_string());
        Ok(())
    }
}

/// Tag reader backed by a path -> tags map. Unknown paths are unreadable.
#[derive(Debug, Default)]
pub struct StaticTagReader {
    tags: HashMap<PathBuf, RawTags>,
}

impl StaticTagReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, path: &str, artist: &str, title: &str, album: &str) -> Self {
        self.tags.insert(
            PathBuf::from(path),
            RawTags {
                artist: Some(artist.to_string()),
                title: Some(title.to_string()),
                album: Some(album.to_string()),
            },
        );
        self
    }
}

impl TagReader for StaticTagReader {
    fn read_tags(&self, path: &Path) -> Result<RawTags, MetadataError> {
        self.tags
            .get(path)
            .cloned()
            .ok_or_else(|| MetadataError::Unreadable {
                path: path.display().to_string(),
                reason: "No such file or directory".to_string(),
            })
    }
}
