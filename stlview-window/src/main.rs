/// stlview - interactive binary STL viewer
///
/// Usage: stlview <STL_FILE>
/// Controls:
///   - Left drag: orbit
///   - Right drag: pan
///   - Wheel: zoom
///   - N: toggle normal shading
///   - R: toggle debug spin
///   - Esc: quit

use anyhow::Result;
use stlview_core::ViewerConfig;
use stlview_window::{load_mesh, Cli, CliExit, ViewerApp};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = match Cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(CliExit::Info(info)) => info.exit(),
        Err(CliExit::Usage(usage)) => {
            println!("{usage}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ViewerConfig::default();

    // Input problems are reported before any window is created
    let mesh = load_mesh(&cli.stl_file)?;

    ViewerApp::run(mesh, &config)?;
    Ok(())
}
