#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::Parser;
use popd::{Popd, config};

/// A POP3 maildrop server
#[derive(Parser, Debug)]
#[command(name = "popd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on, overriding every configured listener
    port: Option<u16>,

    /// Path to the RON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let defaults = config::DEFAULT_PATHS.map(PathBuf::from);
    let found = config::find_config_file(
        cli.config.as_deref(),
        std::env::var_os(config::CONFIG_ENV).map(PathBuf::from),
        &defaults,
    )?;

    let popd = match (found, cli.port) {
        (Some(path), port) => {
            let mut popd = config::load(&path)?;
            if let Some(port) = port {
                popd.set_port(port);
            }
            popd
        }
        (None, Some(port)) => Popd::with_port(port),
        (None, None) => {
            let paths_tried = defaults
                .iter()
                .map(|p| format!("  - {}", p.display()))
                .collect::<Vec<_>>()
                .join("\n");

            anyhow::bail!(
                "No configuration file found and no port given. Tried:\n  - --config\n  - {} environment variable\n{paths_tried}",
                config::CONFIG_ENV
            )
        }
    };

    popd.run().await
}
