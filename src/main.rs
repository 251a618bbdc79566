use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use devlog::app::{App, AppEvent};
use devlog::backend::{BackendClient, SessionHub, SessionProvider};
use devlog::config::Config;
use devlog::feed::parse_page_param;
use devlog::preferences::PreferenceManager;
use devlog::storage::{Database, DatabaseError};
use devlog::ui;

/// Get the config directory path (~/.config/devlog/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("devlog");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "devlog", about = "Read and write developer blog posts from the terminal")]
struct Args {
    /// Page of the feed to open (values below 1 open page 1)
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    page: Option<String>,

    /// Sign out, forget the stored session and exit
    #[arg(long)]
    logout: bool,

    /// Reset local state (preferences and stored session)
    #[arg(long)]
    reset_db: bool,

    /// Use this config file instead of ~/.config/devlog/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Log to a file in the config directory; stdout belongs to the TUI.
fn init_tracing(config_dir: &std::path::Path) -> Result<()> {
    let log_path = config_dir.join("devlog.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("devlog=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // The directory holds the session database: user-only access.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
            eprintln!(
                "Warning: failed to restrict permissions on {}: {}",
                config_dir.display(),
                e
            );
        }
    }

    init_tracing(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let settings = match config.backend_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Add your project settings to {}:", config_path.display());
            eprintln!("  backend_url = \"https://your-project.example.co\"");
            eprintln!("  anon_key = \"your-public-anon-key\"");
            std::process::exit(1);
        }
    };

    let db_path = config_dir.join("devlog.db");
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Local state reset.");
    }

    let client = BackendClient::new(&settings.url, settings.anon_key, settings.timeout_secs)
        .context("Failed to create backend client")?;

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of devlog appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let sessions = SessionHub::restore(client.clone(), db.clone()).await;

    if args.logout {
        sessions
            .sign_out()
            .await
            .context("Failed to clear the stored session")?;
        println!("Signed out.");
        return Ok(());
    }

    let preferences = match PreferenceManager::load(&config, &db).await {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load stored preferences, using config only");
            PreferenceManager::from_config(&config)
        }
    };

    let page = parse_page_param(args.page.as_deref());
    tracing::info!(page, "Starting devlog");

    let mut app = App::new(db, Arc::new(sessions), Arc::new(client), preferences, page);

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
