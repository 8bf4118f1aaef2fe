use std::num::NonZeroU32;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::spotify_rs::types::{
    SpotifyPage, SpotifyPlaylist, SpotifyPlaylistItem, SpotifySearchResponse, SpotifySnapshot,
    SpotifyTrack, SpotifyUser,
};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: usize = 3;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, thiserror::Error)]
pub enum SpotifyApiError {
    #[error("Failed to send http request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Spotify rate limit exceeded (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Spotify returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Failed to parse response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl SpotifyApiError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SpotifyApiError::Transport(error) => error.is_timeout() || error.is_connect(),
            SpotifyApiError::RateLimited { .. } => true,
            SpotifyApiError::Status { status, .. } => status.is_server_error(),
            SpotifyApiError::Decode(_) => false,
        }
    }

    /// Whether Spotify certainly never applied the request: the connection failed or the call
    /// was rate limited before being processed.
    pub fn is_unprocessed(&self) -> bool {
        match self {
            SpotifyApiError::Transport(error) => error.is_connect(),
            SpotifyApiError::RateLimited { .. } => true,
            _ => false,
        }
    }
}

/// When a failed request may be sent again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resend {
    /// Replaying cannot change the result, retry any transient failure.
    Idempotent,
    /// Replaying after a timeout or 5xx could apply the request twice (appends, creates).
    OnlyUnprocessed,
}

impl Resend {
    pub fn allows(self, error: &SpotifyApiError) -> bool {
        match self {
            Resend::Idempotent => error.is_transient(),
            Resend::OnlyUnprocessed => error.is_unprocessed(),
        }
    }
}

/// Spotify Web API client
pub struct SpotifyWebClient {
    access_token: String,
    client: reqwest::Client,
    limiter: DirectRateLimiter,
}

impl SpotifyWebClient {
    pub fn new(access_token: String, requests_per_second: NonZeroU32) -> Self {
        Self {
            access_token,
            client: reqwest::Client::new(),
            limiter: RateLimiter::direct(Quota::per_second(requests_per_second)),
        }
    }

    /// Sends the request produced by `build`, rebuilding it for every retry.
    async fn send<F>(&self, resend: Resend, build: F) -> Result<Response, SpotifyApiError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let build = &build;
        let attempt = move || async move {
            self.limiter.until_ready().await;
            let response = build(&self.client)
                .bearer_auth(&self.access_token)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .map_err(SpotifyApiError::Transport)?;
            check_status(response).await
        };

        attempt
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_times(MAX_RETRIES),
            )
            .when(move |error| resend.allows(error))
            .notify(|error, delay| {
                log::warn!("Spotify request failed, retrying in {:?}: {}", delay, error);
            })
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SpotifyApiError> {
        self.send(Resend::Idempotent, |client| client.get(url))
            .await?
            .json::<T>()
            .await
            .map_err(SpotifyApiError::Decode)
    }

    /// Get the current user's profile
    pub async fn get_current_user(&self) -> Result<SpotifyUser, SpotifyApiError> {
        self.get_json(&format!("{}/me", SPOTIFY_API_BASE)).await
    }

    /// Get all playlists for the current user, in the order Spotify lists them
    pub async fn get_user_playlists(&self) -> Result<Vec<SpotifyPlaylist>, SpotifyApiError> {
        let mut all_playlists = Vec::new();
        let mut next_url = Some(format!("{}/me/playlists?limit=50", SPOTIFY_API_BASE));

        while let Some(url) = next_url {
            let page: SpotifyPage<SpotifyPlaylist> = self.get_json(&url).await?;
            all_playlists.extend(page.items);
            next_url = page.next;
        }

        Ok(all_playlists)
    }

    pub async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyTrack>, SpotifyApiError> {
        let url = format!("{}/search", SPOTIFY_API_BASE);
        let limit = limit.to_string();
        let response: SpotifySearchResponse = self
            .send(Resend::Idempotent, |client| {
                client
                    .get(&url)
                    .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            })
            .await?
            .json()
            .await
            .map_err(SpotifyApiError::Decode)?;

        Ok(response.tracks.items)
    }

    /// Get a single page of playlist items, only the track uris are requested
    pub async fn get_playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<SpotifyPage<SpotifyPlaylistItem>, SpotifyApiError> {
        let url = format!("{}/playlists/{}/tracks", SPOTIFY_API_BASE, playlist_id);
        let limit = limit.to_string();
        let offset = offset.to_string();

        self.send(Resend::Idempotent, |client| {
            client.get(&url).query(&[
                ("fields", "items(track(uri)),next,offset,total"),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
        })
        .await?
        .json()
        .await
        .map_err(SpotifyApiError::Decode)
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<SpotifyPlaylist, SpotifyApiError> {
        let url = format!("{}/users/{}/playlists", SPOTIFY_API_BASE, user_id);
        let body = json!({
            "name": name,
            "description": description,
            "public": true,
        });

        self.send(Resend::OnlyUnprocessed, |client| client.post(&url).json(&body))
            .await?
            .json()
            .await
            .map_err(SpotifyApiError::Decode)
    }

    /// Removes every occurrence of the given uris from the playlist
    pub async fn remove_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<SpotifySnapshot, SpotifyApiError> {
        let url = format!("{}/playlists/{}/tracks", SPOTIFY_API_BASE, playlist_id);
        let tracks: Vec<_> = uris.iter().map(|uri| json!({ "uri": uri })).collect();
        let body = json!({ "tracks": tracks });

        self.send(Resend::Idempotent, |client| client.delete(&url).json(&body))
            .await?
            .json()
            .await
            .map_err(SpotifyApiError::Decode)
    }

    /// Appends the given uris to the end of the playlist
    pub async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<SpotifySnapshot, SpotifyApiError> {
        let url = format!("{}/playlists/{}/tracks", SPOTIFY_API_BASE, playlist_id);
        let body = json!({ "uris": uris });

        self.send(Resend::OnlyUnprocessed, |client| client.post(&url).json(&body))
            .await?
            .json()
            .await
            .map_err(SpotifyApiError::Decode)
    }

    pub async fn change_playlist_description(
        &self,
        playlist_id: &str,
        description: &str,
    ) -> Result<(), SpotifyApiError> {
        let url = format!("{}/playlists/{}", SPOTIFY_API_BASE, playlist_id);
        let body = json!({ "description": description });

        self.send(Resend::Idempotent, |client| client.put(&url).json(&body)).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, SpotifyApiError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs);
        // Spotify asks for at least this long before the next call
        if let Some(wait) = retry_after {
            tokio::time::sleep(wait).await;
        }
        return Err(SpotifyApiError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error text".to_string());
        return Err(SpotifyApiError::Status { status, body });
    }

    Ok(response)
}
