use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitebuild::config::{DEFAULT_DEBOUNCE, DEFAULT_PORT};
use sitebuild::models::Target;
use sitebuild::{Config, Site};

#[derive(Parser)]
#[command(name = "sitebuild")]
#[command(about = "Build a static site from src/ into build/ and serve it with live reload")]
struct Cli {
    /// Task to run: default, build, watch, server, clean, pug, style, img, js, fonts
    #[arg(default_value = "default")]
    task: Target,

    /// Project root containing src/
    #[arg(short = 'C', long, default_value = ".")]
    root: PathBuf,

    /// Port for the dev server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Coalesce source changes arriving within this many milliseconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64)]
    debounce_ms: u64,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "sitebuild=info,tower_http=warn".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::new(cli.root)
        .with_port(cli.port)
        .with_debounce(Duration::from_millis(cli.debounce_ms));
    let site = Site::with_log(config);

    tokio::select! {
        result = site.run_target(cli.task) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
