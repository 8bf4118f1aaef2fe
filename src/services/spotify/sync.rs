use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use color_eyre::eyre::{Report, Result, WrapErr};

use crate::m3u::LocalPlaylist;
use crate::metadata::MetadataExtractor;
use crate::ports::spotify::{SpotifyApiPlaylist, SpotifyClient, TrackUri};
use crate::ports::tags::TagReader;
use crate::services::spotify::playlists::RemotePlaylistAccessor;
use crate::services::spotify::resolver::TrackResolver;

/// Spotify rejects add/remove calls with more than 100 uris.
pub const MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_REMOVAL_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_REPO_URL: &str = "github.com/bensonchow123/computy_scripts";

/// Description written on every synced playlist, stamped with the sync time.
pub fn build_description(synced_at: DateTime<Local>, repo_url: &str) -> String {
    format!(
        "Synced from my Jellyfin server at {}, tracks can be wrong. \
         Using my custom M3U → Spotify sync tool, see at: {}. \
         Ordered in order of my favourites.",
        synced_at.format("%-d/%-m/%y, %H:%M"),
        repo_url
    )
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Pause after every removal batch, keeps Spotify's rate limiter happy.
    pub removal_delay: Duration,
    pub repo_url: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            removal_delay: DEFAULT_REMOVAL_DELAY,
            repo_url: DEFAULT_REPO_URL.to_string(),
        }
    }
}

/// What a single playlist sync ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created { name: String, added: usize },
    Updated { name: String, removed: usize, added: usize },
    Unchanged { name: String },
    Skipped { file: String },
}

/// The status line printed for each playlist.
impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Created { name, .. } => write!(f, "Creating new playlist: {}", name),
            SyncOutcome::Updated { name, .. } => write!(f, "Updating: {}", name),
            SyncOutcome::Unchanged { name } => write!(f, "No update needed: {}", name),
            SyncOutcome::Skipped { file } => {
                write!(f, "No valid metadata in playlist's files, skipping: {}", file)
            }
        }
    }
}

/// The remote change needed to make `playlist` match the local file.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Name computed from the local file, the remote one may differ in case.
    pub name: String,
    pub playlist: SpotifyApiPlaylist,
    pub created: bool,
    pub desired: Vec<TrackUri>,
    pub current: Vec<TrackUri>,
    pub description: String,
}

impl SyncPlan {
    /// Exact sequence equality, order included.
    pub fn is_up_to_date(&self) -> bool {
        self.desired == self.current
    }
}

/// Result of syncing one playlist file inside a batch run.
#[derive(Debug)]
pub struct PlaylistSyncResult {
    pub file: PathBuf,
    pub result: Result<SyncOutcome>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub results: Vec<PlaylistSyncResult>,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Report)> {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.file.as_path(), e)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.results.iter().filter_map(|r| r.result.as_ref().ok())
    }
}

/// Mirrors local m3u playlists onto Spotify playlists.
///
/// Playlists are processed one at a time. A differing track list is cleared and rewritten
/// in full, so a second run without local changes makes no track mutations.
pub struct PlaylistSyncService<C: SpotifyClient, R: TagReader> {
    extractor: MetadataExtractor<R>,
    resolver: TrackResolver<C>,
    playlists: RemotePlaylistAccessor<C>,
    client: Arc<C>,
    options: SyncOptions,
}

impl<C: SpotifyClient, R: TagReader> PlaylistSyncService<C, R> {
    pub fn new(client: Arc<C>, reader: R, options: SyncOptions) -> Self {
        Self {
            extractor: MetadataExtractor::new(reader),
            resolver: TrackResolver::new(client.clone()),
            playlists: RemotePlaylistAccessor::new(client.clone()),
            client,
            options,
        }
    }

    /// Syncs every file in order. A failing playlist is logged and reported, never fatal.
    ///
    /// Each playlist's status line goes to stdout whatever the log filter is.
    pub async fn sync_all(&self, files: &[PathBuf], music_root: &Path) -> SyncReport {
        let mut report = SyncReport::default();

        for file in files {
            let result = match LocalPlaylist::read(file, music_root) {
                Ok(local) => self.sync_playlist(&local).await.wrap_err_with(|| {
                    format!(
                        "Failed to sync {} into '{}'",
                        file.display(),
                        local.remote_name()
                    )
                }),
                Err(e) => Err(e),
            };

            match &result {
                Ok(outcome) => println!("{}", outcome),
                Err(e) => {
                    println!("Failed to sync {}: {}", file.display(), e);
                    tracing::error!("❌ {:?}", e);
                }
            }

            report.results.push(PlaylistSyncResult {
                file: file.clone(),
                result,
            });
        }

        report
    }

    #[tracing::instrument(skip_all, fields(playlist = %local.file_name()))]
    pub async fn sync_playlist(&self, local: &LocalPlaylist) -> Result<SyncOutcome> {
        tracing::info!("🎵 Processing: {}", local.file_name());

        let desired = self.resolve_entries(local).await?;
        if desired.is_empty() {
            tracing::debug!("⚠️ No valid metadata in playlist's files, skipping.");
            return Ok(SyncOutcome::Skipped {
                file: local.file_name(),
            });
        }

        let plan = self.plan(local, desired).await?;
        self.apply(plan).await
    }

    /// Resolved uris in file order. Entries that fail extraction or search drop out in place.
    async fn resolve_entries(&self, local: &LocalPlaylist) -> Result<Vec<TrackUri>> {
        let mut uris = Vec::with_capacity(local.entries.len());

        for entry in &local.entries {
            let Some(descriptor) = self.extractor.extract(entry) else {
                continue;
            };
            if let Some(uri) = self.resolver.resolve(&descriptor).await? {
                uris.push(uri);
            }
        }

        tracing::debug!(
            "Resolved {} of {} entries",
            uris.len(),
            local.entries.len()
        );
        Ok(uris)
    }

    async fn plan(&self, local: &LocalPlaylist, desired: Vec<TrackUri>) -> Result<SyncPlan> {
        let name = local.remote_name();
        let description = build_description(Local::now(), &self.options.repo_url);

        let (playlist, created, current) = match self.playlists.find(&name).await? {
            Some(playlist) => {
                let current = self.playlists.fetch_tracks(&playlist.id).await?;
                (playlist, false, current)
            }
            None => {
                tracing::debug!("➕ Creating new playlist: {}", name);
                let playlist = self.playlists.create(&name, &description).await?;
                (playlist, true, Vec::new())
            }
        };

        Ok(SyncPlan {
            name,
            playlist,
            created,
            desired,
            current,
            description,
        })
    }

    async fn apply(&self, plan: SyncPlan) -> Result<SyncOutcome> {
        let playlist = &plan.playlist;
        let name = plan.name.clone();

        let outcome = if plan.is_up_to_date() {
            tracing::debug!("✅ No update needed: {}", name);
            SyncOutcome::Unchanged { name }
        } else {
            if !plan.created {
                tracing::debug!("🔁 Updating: {}", name);
            }
            self.remove_all(&playlist.id, &plan.current).await?;
            self.add_all(&playlist.id, &plan.desired).await?;
            tracing::debug!(
                "Removed {} and added {} tracks on {}",
                plan.current.len(),
                plan.desired.len(),
                name
            );

            if plan.created {
                SyncOutcome::Created {
                    name,
                    added: plan.desired.len(),
                }
            } else {
                SyncOutcome::Updated {
                    name,
                    removed: plan.current.len(),
                    added: plan.desired.len(),
                }
            }
        };

        self.playlists
            .set_description(&playlist.id, &plan.description)
            .await?;

        Ok(outcome)
    }

    async fn remove_all(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()> {
        for batch in uris.chunks(MAX_BATCH_SIZE) {
            self.client
                .remove_items(playlist_id, batch)
                .await
                .wrap_err_with(|| format!("Failed to remove {} tracks", batch.len()))?;
            tokio::time::sleep(self.options.removal_delay).await;
        }
        Ok(())
    }

    async fn add_all(&self, playlist_id: &str, uris: &[TrackUri]) -> Result<()> {
        for batch in uris.chunks(MAX_BATCH_SIZE) {
            self.client
                .add_items(playlist_id, batch)
                .await
                .wrap_err_with(|| format!("Failed to add {} tracks", batch.len()))?;
        }
        Ok(())
    }
}
