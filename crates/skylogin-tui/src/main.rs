//! skylogin - sign in to a Bluesky / AT Protocol account from the terminal.
//!
//! Without a subcommand this opens the TUI: a login form guarding a small
//! greeting page. `login`, `logout` and `status` do the same work headless.

mod app;
mod headless;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skylogin_core::auth::HOME_PATH;
use skylogin_core::{AtpClient, Config, FileSessionStore, MemorySessionStore, SessionStore};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "skylogin.log";

#[derive(Parser)]
#[command(name = "skylogin", version, about)]
struct Cli {
    /// Route to open in the TUI
    #[arg(long, default_value = HOME_PATH)]
    path: String,

    /// PDS service URL (overrides config and SKYLOGIN_SERVICE)
    #[arg(long, global = true)]
    service: Option<String>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in without the TUI
    Login {
        /// Handle or email; prompts when omitted
        #[arg(long)]
        identifier: Option<String>,
    },
    /// Revoke and forget the stored session
    Logout,
    /// Show whether a session is stored
    Status,
}

/// Initialize the tracing subscriber, writing to stderr.
fn init_stderr_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Initialize the tracing subscriber, writing to a log file since the
/// terminal belongs to the UI.
fn init_file_tracing(log_dir: PathBuf) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(guard)
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    if let Some(ref service) = cli.service {
        config.service_url = service.clone();
    }
    config
}

fn open_store(config: &Config, ephemeral: bool) -> Result<Arc<dyn SessionStore>> {
    if ephemeral {
        return Ok(Arc::new(MemorySessionStore::new()));
    }
    Ok(Arc::new(FileSessionStore::new(config.data_dir()?)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(ref command) = cli.command {
        init_stderr_tracing();
        let config = load_config(&cli);
        let store = open_store(&config, cli.ephemeral)?;
        let auth = Arc::new(AtpClient::new()?);
        return match command {
            Command::Login { identifier } => {
                headless::login(config, store, auth, identifier.clone()).await
            }
            Command::Logout => headless::logout(config, store, auth).await,
            Command::Status => headless::status(store),
        };
    }

    let log_dir = Config::default()
        .log_dir()
        .unwrap_or_else(|_| PathBuf::from("."));
    let _log_guard = init_file_tracing(log_dir)?;
    info!("skylogin starting");

    let config = load_config(&cli);
    let store = open_store(&config, cli.ephemeral)?;
    let auth = Arc::new(AtpClient::new()?);
    let mut app = App::new(config, store, auth, &cli.path);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("skylogin shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout so background results and redirects land
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    if handle_input(app, key, Instant::now())? {
                        return Ok(());
                    }
                }
            }
        }

        let now = Instant::now();
        app.check_background_tasks(now);
        app.tick(now);

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
