use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gemini_chat_core::{ChatSession, Config, Relay, RelayHost, Speaker};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "gemini-chat")]
#[command(author, version, about = "Chat with Google Gemini from the terminal", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose) {
        eprintln!("warning: logging disabled: {:#}", err);
    }

    // A config file that fails to parse stops the program before the TUI
    // starts, with the path and the parse error on stderr.
    let config = Config::load()?;

    match cli.command {
        Some(Commands::Ask { prompt }) => ask(&config, &prompt).await,
        None => run_tui(config).await,
    }
}

/// Log to a file in the config directory; stderr belongs to the TUI.
fn init_logging(verbose: bool) -> Result<()> {
    let dir = gemini_chat_core::config::config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("gemini-chat.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("GEMINI_CHAT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("{}", e))?;
    Ok(())
}

async fn ask(config: &Config, prompt: &str) -> Result<()> {
    let credential = config.resolve_credential()?;
    let relay = RelayHost::from_config(config, credential)?;

    let mut session = ChatSession::new();
    session.set_input(prompt);
    session.submit(&relay).await;

    match session.transcript().last() {
        Some(turn) if turn.speaker == Speaker::Model => {
            println!("{}", turn.text);
            Ok(())
        }
        Some(turn) if turn.speaker == Speaker::SystemError => {
            eprintln!("{}", turn.text);
            std::process::exit(1);
        }
        _ => Err(anyhow!("Nothing to ask: the prompt is empty")),
    }
}

async fn run_tui(config: Config) -> Result<()> {
    let relay: Option<Arc<dyn Relay>> = match config.resolve_credential() {
        Ok(credential) => Some(Arc::new(RelayHost::from_config(&config, credential)?)),
        Err(err) => {
            info!(reason = %err, "no API key configured, prompting for one");
            None
        }
    };

    let mut app = App::new(config, relay);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run_loop(&mut terminal, &mut app).await;
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        app.poll_reply().await;
    }

    Ok(())
}
