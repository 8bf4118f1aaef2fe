mod config;
mod logging;
mod m3u;
mod metadata;
mod playlist_tools;
mod ports;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use tracing_subscriber::filter::LevelFilter;

use crate::{
    config::Config,
    logging::{LoggingOptions, setup_logging},
    m3u::list_playlist_files,
    metadata::AudiotagsReader,
    playlist_tools::{mount_point, splitter, windows},
    services::spotify::{
        account::{SpotifyAccountService, TokenStore},
        sync::PlaylistSyncService,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "M3U_SYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log level
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: LevelFilter,

    /// File log level
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: LevelFilter,

    /// Path to log file
    #[arg(long, env = "M3U_SYNC_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// OTLP gRPC endpoint to export spans to, e.g. http://localhost:4317
    #[arg(long, env = "OTLP_ENDPOINT", global = true)]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn is_file(s: &str) -> Result<PathBuf, String> {
    let p: PathBuf = s.into();
    if p.is_file() {
        Ok(p)
    } else {
        Err(format!("`{}` is not an existing file", s))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror the local m3u playlists onto Spotify
    Sync {
        /// Only sync these playlist files instead of the whole playlists folder
        #[arg(short, long = "playlist", value_parser = is_file)]
        playlists: Vec<PathBuf>,
    },
    /// Authorize against Spotify and cache the token
    Auth,
    /// Rewrite the old mount point to the new one in every playlist, keeping backups
    ConvertMountPoint,
    /// Write Windows-path copies of every playlist
    ConvertWindows,
    /// Split every playlist into fixed-size chunks
    Split {
        /// Paths per chunk, overrides `split_chunk_size`
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
    /// Print the effective configuration, secrets masked
    Show,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .with_context(|| "Failed to load m3u-spotify-sync config")?;
    Ok(config.with_env_overrides())
}

fn account_service(config: &Config) -> Result<SpotifyAccountService> {
    Ok(SpotifyAccountService::new(
        config.spotify_credentials()?,
        TokenStore::new(config.token_cache_path()?),
    ))
}

async fn sync(config: &Config, only: Vec<PathBuf>) -> Result<()> {
    let music_root = config.music_root()?;
    let files = if only.is_empty() {
        list_playlist_files(&config.playlists_folder()?)?
    } else {
        only
    };
    log::info!("Found {} playlists to sync", files.len());

    let client = account_service(config)?
        .connect(config.requests_per_second()?)
        .await?;
    let service = PlaylistSyncService::new(Arc::new(client), AudiotagsReader, config.sync_options());
    let report = service.sync_all(&files, &music_root).await;

    if report.has_failures() {
        let failed = report.failures().count();
        return Err(eyre!("{} of {} playlists failed to sync", failed, files.len()));
    }
    println!("\nAll {} playlists synced.", report.outcomes().count());
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    log::debug!("Loading configuration");
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Commands::Sync { playlists } => sync(&config, playlists).await?,
        Commands::Auth => account_service(&config)?.authorize().await?,
        Commands::ConvertMountPoint => {
            let mount = config.mount_point();
            let results = mount_point::convert_folder(&config.playlists_folder()?, &mount)?;
            println!(
                "\nConversion complete! Processed {} files.",
                mount_point::converted_count(&results)
            );
            println!("Mount point changed from '{}' to '{}'", mount.old, mount.new);
        }
        Commands::ConvertWindows => {
            let written = windows::convert_folder(
                &config.playlists_folder()?,
                &config.windows_playlists_folder()?,
                &config.windows_paths(),
            )?;
            println!("Wrote {} Windows playlists", written.len());
        }
        Commands::Split { chunk_size } => {
            let chunk_size = match chunk_size {
                Some(0) => return Err(eyre!("--chunk-size must be greater than zero")),
                Some(size) => size,
                None => config.split_chunk_size()?,
            };
            let reports = splitter::split_folder(
                &config.playlists_folder()?,
                &config.split_playlists_folder()?,
                chunk_size,
            )?;
            let changed = reports.iter().filter(|r| !r.is_unchanged()).count();
            println!(
                "Split playlists updated on {} ({} of {} changed)",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                changed,
                reports.len()
            );
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = Config::create_default()?;
                log::info!("Default config at {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
            ConfigCommands::Show => {
                println!("{}", toml::to_string_pretty(&config.redacted())?);
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = setup_logging(LoggingOptions {
        console_level: args.log_level,
        log_file: args.log_file.as_deref(),
        file_level: args.log_file_level,
        otlp_endpoint: args.otlp_endpoint.as_deref(),
    })?;

    log::debug!("m3u-spotify-sync starting");
    let result = run(args).await;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            log::warn!("Failed to flush traces: {}", e);
        }
    }

    result
}
