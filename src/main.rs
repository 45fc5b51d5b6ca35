mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use app::CrimViewerApp;
use clap::Parser;
use config::Config;
use eframe::egui;
use state::AppState;

/// Browse, filter, chart and export CRIM observation and relationship
/// metadata.
#[derive(Debug, Parser)]
#[command(name = "crim-viewer", version, about)]
struct Cli {
    /// Path to a config.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read observations from a local snapshot instead of the API.
    #[arg(long, value_name = "FILE")]
    observations: Option<PathBuf>,

    /// Read relationships from a local snapshot instead of the API.
    #[arg(long, value_name = "FILE")]
    relationships: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

/// Priority: RUST_LOG > --debug > config level > "info".
fn init_logging(debug: bool, config_level: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    match std::env::var("RUST_LOG") {
        Ok(filter) => builder.parse_filters(&filter),
        Err(_) if debug => builder.parse_filters("debug"),
        Err(_) => builder.parse_filters(config_level.unwrap_or("info")),
    };
    builder.format_timestamp_millis().init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    init_logging(cli.debug, config.logging.level.as_deref());

    if let Some(path) = cli.observations {
        config.data.observations_file = Some(path);
    }
    if let Some(path) = cli.relationships {
        config.data.relationships_file = Some(path);
    }

    let mut state = AppState::new(config);
    state.load_all();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "CRIM Metadata Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(CrimViewerApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("running viewer: {e}"))
}
