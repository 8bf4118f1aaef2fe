//! Thin wrapper over the Spotify Web API.
//!
//! Docs: https://developer.spotify.com/documentation/web-api

pub mod auth;
pub mod client;
pub mod types;

pub use client::SpotifyWebClient;
