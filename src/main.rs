// ABOUTME: Main entry point for the web relay terminal client

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{DisableBracketedPaste, EnableBracketedPaste, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{prelude::*, Terminal};
use std::{io, path::PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info};

use webrelay::app::{App, EventHandler};
use webrelay::components::LayoutComponent;
use webrelay::config::{ConfigOverrides, RelayConfig};
use webrelay::relay::Geometry;

/// Relay an interactive terminal session over a WebSocket
#[derive(Debug, Parser)]
#[command(name = "webrelay", version, about)]
struct Cli {
    /// Origin the relay is served from; the endpoint scheme follows it (http → ws, https → wss)
    #[arg(long, env = "WEBRELAY_ORIGIN")]
    origin: Option<String>,

    /// Relay path on the origin
    #[arg(long, env = "WEBRELAY_PATH")]
    path: Option<String>,

    /// Full ws:// or wss:// endpoint, overriding origin and path
    #[arg(long, env = "WEBRELAY_ENDPOINT")]
    endpoint: Option<String>,

    /// Columns used before the terminal has been measured
    #[arg(long, env = "WEBRELAY_DEFAULT_COLS")]
    default_cols: Option<u16>,

    /// Rows used before the terminal has been measured
    #[arg(long, env = "WEBRELAY_DEFAULT_ROWS")]
    default_rows: Option<u16>,

    /// Directory for log files
    #[arg(long, env = "WEBRELAY_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Config file, defaults to the platform config directory
    #[arg(long, short)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            origin: self.origin.clone(),
            path: self.path.clone(),
            endpoint: self.endpoint.clone(),
            default_cols: self.default_cols,
            default_rows: self.default_rows,
            log_dir: self.log_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::load(cli.config.as_deref())?.with_overrides(cli.overrides());
    let endpoint = config.endpoint()?;

    setup_logging(&config)?;
    setup_panic_handler();

    info!("Relay endpoint: {}", endpoint);

    let (cols, rows) = crossterm::terminal::size().context("Terminal not compatible")?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut app = App::new(&config, endpoint, Geometry::new(cols, rows), events_tx);
    let layout = LayoutComponent::new();

    run_tui(&mut app, &layout, events_rx).await
}

async fn run_tui(
    app: &mut App,
    layout: &LayoutComponent,
    mut transport_events: mpsc::UnboundedReceiver<webrelay::relay::TransportEvent>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut terminal = match setup_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = restore_terminal();
            return Err(e);
        }
    };

    // One connection per run, opened right away
    app.connect();

    let mut terminal_events = EventStream::new();
    let result = loop {
        if let Err(e) = terminal.draw(|frame| layout.render(frame, app)) {
            break Err(e.into());
        }

        tokio::select! {
            Some(event) = transport_events.recv() => {
                app.handle_transport_event(event).await;
            }
            maybe_event = terminal_events.next() => match maybe_event {
                Some(Ok(event)) => {
                    if let Some(app_event) = EventHandler::handle_terminal_event(event) {
                        app.handle_app_event(app_event).await;
                    }
                }
                Some(Err(e)) => {
                    error!("Terminal event error: {}", e);
                    break Err(e.into());
                }
                None => break Ok(()),
            },
        }

        if app.state.should_quit {
            break Ok(());
        }
    };

    // Channel first, then input, then the screen
    app.shutdown().await;
    drop(terminal_events);
    drop(terminal);

    let restored = restore_terminal();
    result.and(restored.map_err(Into::into))
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Undo raw mode and the alternate screen. Every step runs even when an
/// earlier one fails; the first failure is returned.
fn restore_terminal() -> io::Result<()> {
    first_error([
        disable_raw_mode(),
        execute!(
            io::stdout(),
            DisableBracketedPaste,
            LeaveAlternateScreen,
            cursor::Show
        ),
    ])
}

fn first_error<const N: usize>(results: [io::Result<()>; N]) -> io::Result<()> {
    results.into_iter().collect()
}

fn setup_logging(config: &RelayConfig) -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_file = log_dir.join(format!(
        "webrelay-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to create log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(file)
                .with_ansi(false), // The TUI owns stdout
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webrelay=info".into()),
        )
        .init();

    Ok(())
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        // Ensure terminal is restored before logging the panic
        let _ = restore_terminal();

        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
