//! `title-probe`: fetch one web page and print its title.
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_debug, engine_info};
use scraper_engine::{FetchResult, TitleProbe};
use tokio_util::sync::CancellationToken;

const DEFAULT_URL: &str = "https://quotes.toscrape.com/";

#[derive(Debug, Parser)]
#[command(name = "title-probe", version, about = "Fetch a web page and print its title")]
struct Cli {
    /// Page to fetch.
    #[arg(default_value = DEFAULT_URL)]
    url: String,

    /// JSON configuration file. Missing or invalid files fall back to defaults.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    init_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize_bootstrap();

    let settings = config::Settings::load(&cli.config);
    logging::apply_configured_level(&settings.logging);
    if cli.init_config {
        settings.save(&cli.config)?;
        engine_info!("Wrote configuration to {:?}", cli.config);
        println!("Wrote configuration to {}", cli.config.display());
        return Ok(());
    }

    let log = logging::build_scraper_logger(&settings.logging);
    let fetch_config = settings.fetch_config();
    engine_debug!("Using {:?}", fetch_config);

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let result = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        TitleProbe::new()
            .fetch_with_retry_cancellable(&cli.url, &fetch_config, &log, &cancel)
            .await
    });

    println!("{}", report(&cli.url, &result));
    Ok(())
}

fn report(url: &str, result: &FetchResult) -> String {
    match result {
        FetchResult::Title(title) => format!("Website title: {title}"),
        FetchResult::NoTitle => format!("No title found at {url}"),
        FetchResult::Failed => format!("Failed to retrieve {url}"),
        FetchResult::Cancelled => "Cancelled".to_string(),
    }
}
