use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};

use crate::metadata::TrackDescriptor;
use crate::ports::spotify::{SpotifyApiTrack, SpotifyClient, TrackUri};

/// Candidates requested for the field-scoped search.
pub const STRUCTURED_SEARCH_LIMIT: u32 = 5;
/// Candidates requested for the free-text fallback.
pub const FREE_TEXT_SEARCH_LIMIT: u32 = 1;

/// `track:"..." artist:"..." album:"..."`, the album field is always present.
pub fn structured_query(descriptor: &TrackDescriptor) -> String {
    format!(
        "track:\"{}\" artist:\"{}\" album:\"{}\"",
        descriptor.title, descriptor.artist, descriptor.album
    )
}

/// `Artist - Title (Album: Album)`, or `Artist - Title` without an album.
pub fn free_text_query(descriptor: &TrackDescriptor) -> String {
    if descriptor.album.is_empty() {
        format!("{} - {}", descriptor.artist, descriptor.title)
    } else {
        format!(
            "{} - {} (Album: {})",
            descriptor.artist, descriptor.title, descriptor.album
        )
    }
}

/// `Artist A, Artist B - Name [Album] (uri)`, for logging what a search accepted.
pub fn describe_match(track: &SpotifyApiTrack) -> String {
    let mut text = format!("{} - {}", track.artists.join(", "), track.name);
    if !track.album_name.is_empty() {
        text.push_str(&format!(" [{}]", track.album_name));
    }
    format!("{} ({})", text, track.uri)
}

/// Maps track descriptors to Spotify track uris.
///
/// Two tiers, first hit wins: a field-scoped search, then a loose free-text search. The first
/// candidate of a tier is taken as is, there is no similarity scoring.
pub struct TrackResolver<C: SpotifyClient> {
    client: Arc<C>,
}

impl<C: SpotifyClient> TrackResolver<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// `Ok(None)` when neither tier finds anything. Search errors are returned, not swallowed.
    #[tracing::instrument(skip(self), fields(artist = %descriptor.artist, title = %descriptor.title))]
    pub async fn resolve(&self, descriptor: &TrackDescriptor) -> Result<Option<TrackUri>> {
        let query = structured_query(descriptor);
        let candidates = self
            .client
            .search_tracks(&query, STRUCTURED_SEARCH_LIMIT)
            .await
            .wrap_err_with(|| format!("Spotify search failed for query: {}", query))?;

        if let Some(track) = candidates.into_iter().next() {
            tracing::debug!("Structured search matched {}", describe_match(&track));
            return Ok(Some(track.uri));
        }

        let query = free_text_query(descriptor);
        let candidates = self
            .client
            .search_tracks(&query, FREE_TEXT_SEARCH_LIMIT)
            .await
            .wrap_err_with(|| format!("Spotify search failed for query: {}", query))?;

        match candidates.into_iter().next() {
            Some(track) => {
                tracing::info!("Free-text search matched {}", describe_match(&track));
                Ok(Some(track.uri))
            }
            None => {
                tracing::warn!("No match found for: {}", query);
                Ok(None)
            }
        }
    }
}
