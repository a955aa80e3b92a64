//! PlotPal CLI: builds vacant-land fine-tuning corpora from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// PlotPal: satellite corpora for vacant-land detection
#[derive(Parser, Debug)]
#[command(name = "plotpal", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Locate the vacant-land dataset and list its cities
    Discover,
    /// Sample polygons from one city's layer
    Sample {
        /// City code, e.g. CC or BJ
        city: String,
        /// Number of polygons to draw
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Download the tile covering one point
    Fetch {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Zoom level (defaults to tiles.zoom)
        #[arg(long)]
        zoom: Option<u8>,
        /// Output JPEG path
        #[arg(short, long, default_value = "test_satellite_image.jpg")]
        out: PathBuf,
    },
    /// Build the image corpus and metadata table
    Build {
        /// City codes to process (comma-separated)
        #[arg(long, value_delimiter = ',')]
        cities: Vec<String>,
        /// Samples drawn per city
        #[arg(short, long)]
        samples: Option<usize>,
    },
    /// Format the metadata table into train/eval conversations
    Format,
    /// Print the inference conversation for one image
    Prompt {
        #[arg(long)]
        image: String,
        /// Location named in the question, e.g. "Changchun, China"
        #[arg(long)]
        location: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "plotpal", "plotpal")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "plotpal.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
