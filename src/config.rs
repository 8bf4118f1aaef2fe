use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, OptionExt, Result, eyre};
use serde::{Deserialize, Serialize};

use crate::services::spotify::client::SpotifyApiCredentials;
use crate::services::spotify::sync::{DEFAULT_REPO_URL, SyncOptions};

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Folder holding the local `*.m3u` playlists
    #[serde(default)]
    playlists_folder: Option<String>,
    /// Root that relative playlist entries are resolved against, defaults to `playlists_folder`
    #[serde(default)]
    music_root: Option<String>,
    #[serde(default)]
    token_cache: Option<String>,
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default, with = "humantime_serde_opt")]
    removal_delay: Option<Duration>,
    #[serde(default)]
    requests_per_second: Option<u32>,
    #[serde(default)]
    windows_playlists_folder: Option<String>,
    #[serde(default)]
    split_playlists_folder: Option<String>,
    #[serde(default)]
    split_chunk_size: Option<usize>,
    #[serde(default)]
    spotify: Option<SpotifyConfig>,
    #[serde(default)]
    mount_point: Option<MountPointConfig>,
    #[serde(default)]
    windows: Option<WindowsPathConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPointConfig {
    pub old: String,
    pub new: String,
}

impl Default for MountPointConfig {
    fn default() -> Self {
        Self {
            old: "/media/benson/".to_string(),
            new: "/mnt/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowsPathConfig {
    pub linux_prefix: String,
    pub windows_prefix: String,
}

impl Default for WindowsPathConfig {
    fn default() -> Self {
        Self {
            linux_prefix: "/media/benson/SSD_960GB/music/library/".to_string(),
            windows_prefix: "Z:\\music\\library\\".to_string(),
        }
    }
}

/// `removal_delay = "500ms"` style durations.
mod humantime_serde_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&humantime::format_duration(*d).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("m3u-spotify-sync").join("config.toml"))
    }

    /// Load the default config file, falling back to environment variables only when it does not
    /// exist.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                log::debug!("No config file found, using environment variables only");
                Ok(Self::default())
            }
        }
    }

    /// Write a default config file, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_eyre("No config directory on this platform")?;
        if path.exists() {
            log::info!("Config file already exists at {}", path.display());
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        std::fs::write(&path, Self::default_toml()?)
            .context(format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    fn default_toml() -> Result<String> {
        let config = Config {
            playlists_folder: Some("~/music/playlists".to_string()),
            music_root: None,
            token_cache: None,
            repo_url: Some(DEFAULT_REPO_URL.to_string()),
            removal_delay: Some(Duration::from_millis(500)),
            requests_per_second: Some(10),
            windows_playlists_folder: None,
            split_playlists_folder: None,
            split_chunk_size: Some(DEFAULT_CHUNK_SIZE),
            spotify: Some(SpotifyConfig {
                client_id: Some(String::new()),
                client_secret: Some(String::new()),
                redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            }),
            mount_point: Some(MountPointConfig::default()),
            windows: Some(WindowsPathConfig::default()),
        };
        Ok(toml::to_string_pretty(&config)?)
    }

    /// Non-empty environment variables take precedence over the file.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env(|key| std::env::var(key).ok());
        self
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("LINUX_PLAYLISTS_FOLDER_PATH") {
            self.playlists_folder = Some(v);
        }
        if let Some(v) = non_empty("WINDOWS_PLAYLISTS_FOLDER_PATH") {
            self.windows_playlists_folder = Some(v);
        }
        if let Some(v) = non_empty("SPLITTED_PLAYLIST_FOLDER_PATH") {
            self.split_playlists_folder = Some(v);
        }
        if let Some(v) = non_empty("SPOTIFY_AUTH_CACHE_PATH") {
            self.token_cache = Some(v);
        }

        let spotify = self.spotify.get_or_insert_with(SpotifyConfig::default);
        if let Some(v) = non_empty("SPOTIFY_CLIENT_ID") {
            spotify.client_id = Some(v);
        }
        if let Some(v) = non_empty("SPOTIFY_CLIENT_SECRET") {
            spotify.client_secret = Some(v);
        }
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    fn existing_dir(&self, value: Option<&String>, what: &str) -> Result<PathBuf> {
        let raw = value.ok_or_else(|| eyre!("{} is not set", what))?;
        let path = self.expand_path(raw);
        if !path.is_dir() {
            return Err(eyre!("{} not found: {}", what, path.display()));
        }
        Ok(path)
    }

    /// Folder with the local playlists, must exist
    pub fn playlists_folder(&self) -> Result<PathBuf> {
        self.existing_dir(self.playlists_folder.as_ref(), "Playlists folder")
    }

    /// Root for relative playlist entries, must exist
    pub fn music_root(&self) -> Result<PathBuf> {
        match &self.music_root {
            Some(_) => self.existing_dir(self.music_root.as_ref(), "Music root folder"),
            None => self.playlists_folder(),
        }
    }

    /// Windows output folder, created on demand so only needs to be set
    pub fn windows_playlists_folder(&self) -> Result<PathBuf> {
        self.windows_playlists_folder
            .as_deref()
            .map(|p| self.expand_path(p))
            .ok_or_eyre("Windows playlists folder is not set")
    }

    /// Split output folder, created on demand so only needs to be set
    pub fn split_playlists_folder(&self) -> Result<PathBuf> {
        self.split_playlists_folder
            .as_deref()
            .map(|p| self.expand_path(p))
            .ok_or_eyre("Split playlists folder is not set")
    }

    pub fn split_chunk_size(&self) -> Result<usize> {
        match self.split_chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE) {
            0 => Err(eyre!("split_chunk_size must be greater than zero")),
            size => Ok(size),
        }
    }

    pub fn token_cache_path(&self) -> Result<PathBuf> {
        match &self.token_cache {
            Some(path) => Ok(self.expand_path(path)),
            None => dirs::cache_dir()
                .map(|dir| dir.join("m3u-spotify-sync").join("token.json"))
                .ok_or_eyre("No cache directory on this platform, set token_cache"),
        }
    }

    pub fn spotify_credentials(&self) -> Result<SpotifyApiCredentials> {
        let spotify = self.spotify.clone().unwrap_or_default();
        let client_id = spotify
            .client_id
            .filter(|v| !v.is_empty())
            .ok_or_eyre("Spotify client id is not set (spotify.client_id or SPOTIFY_CLIENT_ID)")?;
        let client_secret = spotify.client_secret.filter(|v| !v.is_empty()).ok_or_eyre(
            "Spotify client secret is not set (spotify.client_secret or SPOTIFY_CLIENT_SECRET)",
        )?;
        let redirect_uri = spotify
            .redirect_uri
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        Ok(SpotifyApiCredentials::new(
            client_id,
            client_secret,
            redirect_uri,
        ))
    }

    pub fn requests_per_second(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.requests_per_second.unwrap_or(10))
            .ok_or_eyre("requests_per_second must be greater than zero")
    }

    pub fn sync_options(&self) -> SyncOptions {
        let defaults = SyncOptions::default();
        SyncOptions {
            removal_delay: self.removal_delay.unwrap_or(defaults.removal_delay),
            repo_url: self.repo_url.clone().unwrap_or(defaults.repo_url),
        }
    }

    pub fn mount_point(&self) -> MountPointConfig {
        self.mount_point.clone().unwrap_or_default()
    }

    pub fn windows_paths(&self) -> WindowsPathConfig {
        self.windows.clone().unwrap_or_default()
    }

    /// Effective configuration with secrets masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(spotify) = config.spotify.as_mut() {
            if spotify.client_secret.as_deref().is_some_and(|s| !s.is_empty()) {
                spotify.client_secret = Some("********".to_string());
            }
        }
        config
    }
}
