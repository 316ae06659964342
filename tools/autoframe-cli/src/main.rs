//! Autoframe CLI — face auto-framing for image sequences.
//!
//! Usage:
//!   autoframe run --frames <DIR> --detections <JSONL> --output <DIR>
//!   autoframe plan --detections <JSONL> --frame-width <W> --frame-height <H>
//!   autoframe config [--output <PATH>]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use autoframe_common::config::{config_file_path, AppConfig};

mod commands;
mod overrides;
mod replay;

use overrides::ConfigOverrides;

#[derive(Parser)]
#[command(
    name = "autoframe",
    about = "Keep a face centered and steady in a fixed-size output",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/autoframe/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an image sequence, framed on the detected face
    Run {
        /// Directory of source frames, processed in file-name order
        #[arg(long)]
        frames: PathBuf,

        /// Detector output (JSONL, one record per frame)
        #[arg(long)]
        detections: PathBuf,

        /// Directory for rendered frames
        #[arg(short, long)]
        output: PathBuf,

        /// Draw the tracked face on the output
        #[arg(long)]
        overlay: bool,

        /// Background detection workers (0 = inline)
        #[arg(long)]
        workers: Option<usize>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Print the framing decision for every frame as JSON lines
    Plan {
        /// Detector output (JSONL, one record per frame)
        #[arg(long)]
        detections: PathBuf,

        /// Source frame width
        #[arg(long)]
        frame_width: u32,

        /// Source frame height
        #[arg(long)]
        frame_height: u32,

        /// Number of frames to plan (defaults to the last detected frame + 1)
        #[arg(long)]
        frames: Option<u64>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Print or write the effective configuration
    Config {
        /// Write the configuration here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

/// Effective configuration and whether it came from a file.
pub struct LoadedConfig {
    pub config: AppConfig,
    pub from_file: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LoadedConfig> {
    match path {
        Some(path) => {
            let config = AppConfig::load_from(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            Ok(LoadedConfig {
                config,
                from_file: true,
            })
        }
        None => Ok(LoadedConfig {
            config: AppConfig::load(),
            from_file: config_file_path().exists(),
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loaded = load_config(cli.config.as_ref())?;

    // Initialize logging
    let mut logging = loaded.config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    autoframe_common::logging::init_logging(&logging);
    loaded.config.logging = logging;

    match cli.command {
        Commands::Run {
            frames,
            detections,
            output,
            overlay,
            workers,
            overrides,
        } => {
            commands::run::run(
                commands::run::RunArgs {
                    frames,
                    detections,
                    output,
                    overlay,
                    workers,
                },
                &overrides,
                loaded,
            )
            .await
        }
        Commands::Plan {
            detections,
            frame_width,
            frame_height,
            frames,
            overrides,
        } => commands::plan::run(
            detections,
            frame_width,
            frame_height,
            frames,
            &overrides,
            loaded.config,
        ),
        Commands::Config { output, overrides } => {
            commands::config::run(output, &overrides, loaded.config)
        }
    }
}
