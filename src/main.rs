use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_product_archiver::archiver::ArtifactStore;
use storefront_product_archiver::config::{RunMode, ScraperConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use storefront_product_archiver::fetcher::HttpFetcher;
use storefront_product_archiver::loader::HttpDocumentLoader;
use storefront_product_archiver::pipeline::{self, ExtractionStrategy, SequentialSession};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Engine {
    Http,
    #[cfg(feature = "chrome")]
    Chrome,
}

#[derive(Debug, Parser)]
#[command(name = "storefront_product_archiver")]
#[command(about = "Archive product records from a storefront collection")]
struct Cli {
    /// Collection page to start from.
    #[arg(long, env = "ARCHIVER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// First listing page only, at most three products, keep every intermediate artifact.
    #[arg(long, env = "ARCHIVER_TEST_MODE")]
    test_mode: bool,

    #[arg(long, env = "ARCHIVER_OUTPUT_DIR", default_value = "data")]
    output_dir: PathBuf,

    /// Listing pages fetched concurrently.
    #[arg(long, default_value_t = 5)]
    workers: usize,

    #[arg(long, env = "ARCHIVER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    #[arg(long, value_enum, default_value = "http")]
    engine: Engine,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let config = ScraperConfig {
        base_url: cli.base_url,
        user_agent: cli.user_agent,
        mode: if cli.test_mode { RunMode::Test } else { RunMode::Full },
        output_root: cli.output_dir,
        discovery_workers: cli.workers,
        ..ScraperConfig::default()
    };
    let store = ArtifactStore::new(config.output_dir(), config.is_test_mode());
    let fetcher = HttpFetcher::new(&config)?;

    let mut strategy: Box<dyn ExtractionStrategy> = match cli.engine {
        Engine::Http => Box::new(SequentialSession::new(
            HttpDocumentLoader::new(&config)?,
            config.clone(),
            store.clone(),
        )),
        #[cfg(feature = "chrome")]
        Engine::Chrome => Box::new(SequentialSession::new(
            storefront_product_archiver::chrome::ChromeDocumentLoader::launch(&config)?,
            config.clone(),
            store.clone(),
        )),
    };

    let products = pipeline::run(&config, &fetcher, strategy.as_mut(), &store)?;
    drop(strategy);

    info!(count = products.len(), "Products archived successfully.");
    Ok(())
}
