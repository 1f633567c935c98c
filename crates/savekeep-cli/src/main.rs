//! SaveKeep command line
//!
//! Scans for game saves and manages the tracked games, backups and settings.
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use savekeep_config::SaveKeepConfig;
use savekeep_library::{BackupPatch, GamePatch, NewBackup, NewGame, SaveKeep, SettingsPatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "savekeep", about = "Find and track game save files", version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the JSON documents, overrides the configuration
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Scan default locations, saved scan paths and any --path given
    Scan(ScanArgs),
    /// Tracked games
    #[command(subcommand)]
    Games(GamesCmd),
    /// Backup records
    #[command(subcommand)]
    Backups(BackupsCmd),
    /// Application settings
    #[command(subcommand)]
    Settings(SettingsCmd),
    /// Storage usage summary
    Stats,
}

#[derive(ClapArgs, Debug)]
struct ScanArgs {
    /// Extra directory to scan; may be repeated
    #[arg(long = "path", value_name = "DIR")]
    paths: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum GamesCmd {
    List,
    Get { id: String },
    /// Create from a JSON object, e.g. '{"name":"Hades","savePath":"/saves/Hades"}'
    Create { json: String },
    /// Apply a partial JSON object
    Update { id: String, json: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum BackupsCmd {
    List {
        /// Only backups of this game
        #[arg(long = "game", value_name = "ID")]
        game_id: Option<String>,
    },
    Get { id: String },
    /// Create from a JSON object with gameId, gameName and size
    Create { json: String },
    Update { id: String, json: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum SettingsCmd {
    Get,
    /// Merge a partial JSON object over the current settings
    Set { json: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let source = config_source(&cli);
    let config = load_config(&cli, source.as_deref())?;
    setup_logging(&config.logging.level);

    match &source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No configuration file found, using defaults"),
    }

    let app = SaveKeep::new(&config).context("Failed to open SaveKeep library")?;
    info!("SaveKeep ready, data in {}", app.data_dir().display());

    run(&app, cli.cmd).await
}

/// The file to read: `--config` if given, else the default file when it exists
fn config_source(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(SaveKeepConfig::existing_default_path)
}

/// Runs before logging is set up, so the outcome is logged by the caller
fn load_config(cli: &Cli, source: Option<&Path>) -> Result<SaveKeepConfig> {
    let mut config = match source {
        Some(path) => SaveKeepConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SaveKeepConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }
    Ok(config)
}

/// Logs go to stderr so stdout stays valid JSON
fn setup_logging(level: &str) {
    use std::io::IsTerminal;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(app: &SaveKeep, cmd: Cmd) -> Result<()> {
    let data = app.data();

    match cmd {
        Cmd::Scan(args) => print_json(&app.scan_saves(&args.paths).await?),

        Cmd::Games(GamesCmd::List) => print_json(&data.list_games().await?),
        Cmd::Games(GamesCmd::Get { id }) => {
            let game = data
                .get_game(&id)
                .await?
                .with_context(|| format!("Game not found: {}", id))?;
            print_json(&game)
        }
        Cmd::Games(GamesCmd::Create { json }) => {
            let fields: NewGame = parse_json(&json, "game")?;
            print_json(&data.create_game(fields).await?)
        }
        Cmd::Games(GamesCmd::Update { id, json }) => {
            let patch: GamePatch = parse_json(&json, "game update")?;
            let game = data
                .update_game(&id, patch)
                .await?
                .with_context(|| format!("Game not found: {}", id))?;
            print_json(&game)
        }
        Cmd::Games(GamesCmd::Delete { id }) => {
            let deleted = data.delete_game(&id).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))
        }

        Cmd::Backups(BackupsCmd::List { game_id }) => {
            let backups = match game_id {
                Some(game_id) => data.list_backups_for_game(&game_id).await?,
                None => data.list_backups().await?,
            };
            print_json(&backups)
        }
        Cmd::Backups(BackupsCmd::Get { id }) => {
            let backup = data
                .get_backup(&id)
                .await?
                .with_context(|| format!("Backup not found: {}", id))?;
            print_json(&backup)
        }
        Cmd::Backups(BackupsCmd::Create { json }) => {
            let fields: NewBackup = parse_json(&json, "backup")?;
            print_json(&data.create_backup(fields).await?)
        }
        Cmd::Backups(BackupsCmd::Update { id, json }) => {
            let patch: BackupPatch = parse_json(&json, "backup update")?;
            let backup = data
                .update_backup(&id, patch)
                .await?
                .with_context(|| format!("Backup not found: {}", id))?;
            print_json(&backup)
        }
        Cmd::Backups(BackupsCmd::Delete { id }) => {
            let deleted = data.delete_backup(&id).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))
        }

        Cmd::Settings(SettingsCmd::Get) => print_json(&data.get_settings().await?),
        Cmd::Settings(SettingsCmd::Set { json }) => {
            let patch: SettingsPatch = parse_json(&json, "settings")?;
            print_json(&data.update_settings(patch).await?)
        }

        Cmd::Stats => print_json(&data.get_storage_stats().await?),
    }
}

fn parse_json<T: DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json).with_context(|| format!("Invalid {} JSON", what))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", text);
    Ok(())
}
