//! `bayview`: live terminal dashboard for machine network status.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `bayview-core`'s [`MachineStream`](bayview_core::MachineStream). Screens
//! are navigable via number keys: 1 Grid (bays, columns and switch
//! topology per section) and 2 Sections (filterable per-section lists).
//!
//! Logs are written to a file (default `/tmp/bayview.log`) to avoid
//! corrupting the terminal UI. A background data bridge task fetches the
//! snapshot and follows the `network-status` push channel.
//!
//! Entry point: CLI argument parsing, config resolution, tracing setup,
//! panic hooks, and app launch.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use bayview_config::{Config, Profile};
use bayview_core::{Controller, ControllerConfig, SectionRoute};

use crate::app::App;
use crate::screen::ScreenId;

/// Live dashboard of machine network status by section, bay and column.
#[derive(Parser, Debug)]
#[command(name = "bayview", version, about)]
struct Cli {
    /// Status server URL (e.g., http://10.0.0.5:12000)
    #[arg(short = 's', long, env = "BAYVIEW_SERVER")]
    server: Option<String>,

    /// Config profile to use (defaults to the configured default profile)
    #[arg(short = 'p', long, env = "BAYVIEW_PROFILE")]
    profile: Option<String>,

    /// Config file path (defaults to the platform config dir)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Open on a single section
    #[arg(long, conflicts_with = "route")]
    section: Option<String>,

    /// Open on a route path, e.g. `/sections/North%20Hall`
    #[arg(long)]
    route: Option<String>,

    /// Screen to open on
    #[arg(long, value_enum)]
    view: Option<View>,

    /// Accept invalid TLS certificates on the REST endpoint
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Fetch once and skip the live push channel
    #[arg(long)]
    no_push: bool,

    /// Log file path (defaults to /tmp/bayview.log)
    #[arg(long, default_value = "/tmp/bayview.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    Grid,
    Sections,
}

impl From<View> for ScreenId {
    fn from(view: View) -> Self {
        match view {
            View::Grid => Self::Grid,
            View::Sections => Self::Sections,
        }
    }
}

/// Everything the app needs to start, merged from flags and config.
#[derive(Debug)]
struct Launch {
    controller: ControllerConfig,
    route: SectionRoute,
    screen: ScreenId,
}

/// Flags win over the selected profile, which wins over built-in defaults.
fn resolve_launch(cli: &Cli, cfg: &Config) -> Result<Launch> {
    let mut profile = cfg
        .resolve_profile(cli.profile.as_deref())?
        .map(|(_, p)| p.clone())
        .unwrap_or_default();

    if let Some(ref server) = cli.server {
        profile.server.clone_from(server);
    }
    if cli.insecure {
        profile.insecure = Some(true);
    }
    if cli.no_push {
        profile.push = Some(false);
    }

    let controller = bayview_config::profile_to_controller_config(&profile, &cfg.defaults)?;
    let route = initial_route(cli, &profile)?;
    let screen = cli.view.map_or_else(|| cfg.defaults.view.into(), ScreenId::from);

    Ok(Launch {
        controller,
        route,
        screen,
    })
}

fn initial_route(cli: &Cli, profile: &Profile) -> Result<SectionRoute> {
    if let Some(ref section) = cli.section {
        return Ok(SectionRoute::section(section.clone()));
    }
    if let Some(ref path) = cli.route {
        return Ok(SectionRoute::parse(path)?);
    }
    Ok(profile
        .section
        .clone()
        .map_or_else(SectionRoute::all, SectionRoute::section))
}

fn load_config(cli: &Cli) -> Result<Config> {
    Ok(match cli.config {
        Some(ref path) => bayview_config::load_config_from(path)?,
        None => bayview_config::load_config()?,
    })
}

/// Set up file-based tracing. Nothing may log to stdout/stderr while the
/// terminal is in raw mode. Hold the returned guard until exit so logs flush.
fn setup_tracing(cli: &Cli, configured_level: &str) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => configured_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bayview={log_level},bayview_core={log_level},bayview_api={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("bayview.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks before anything touches the terminal.
    tui::install_hooks()?;

    let cfg = load_config(&cli)?;
    let launch = resolve_launch(&cli, &cfg)?;

    let _log_guard = setup_tracing(&cli, &cfg.defaults.log_level);

    info!(
        server = %launch.controller.url,
        route = %launch.route,
        push = launch.controller.websocket_enabled,
        "starting bayview"
    );

    let controller = Controller::new(launch.controller);
    let mut app = App::new(Some(controller), launch.screen, launch.route);
    app.run().await?;

    Ok(())
}
