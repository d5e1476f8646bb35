//! Product-detail extraction and the end-to-end run.
//!
//! Detail pages are extracted through an [`ExtractionStrategy`]. The default
//! [`SequentialSession`] reuses one rendering session, one product at a
//! time, because the session carries cookies and cache that must not be
//! shared across concurrent navigations. [`SessionPerItem`] is for engines
//! that can hand every URL its own session.

use chrono::Utc;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::archiver::ArtifactStore;
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::fetcher::PageFetcher;
use crate::loader::{load_with_retry, pause, DocumentLoader, SessionGuard};
use crate::models::Product;
use crate::navigation::{product_handle, verify_navigation};
use crate::pagination::discover_product_urls;
use crate::parser::parse_product;

/// Loads, verifies and parses a single product page.
pub fn extract_product<L: DocumentLoader + ?Sized>(
    loader: &mut L,
    url: &str,
    config: &ScraperConfig,
    store: &ArtifactStore,
) -> Result<Product, ScrapeError> {
    let timestamp = Utc::now();

    if let Err(e) = loader.clear_cookies() {
        warn!(url, error = %e, "could not clear cookies");
    }

    load_with_retry(loader, url, config.load_attempts, config.load_backoff)?;
    let verified = verify_navigation(loader, url, &config.navigation)?;

    pause(config.post_load_settle);
    let html = loader.page_source().unwrap_or(verified.html);
    if html.trim().is_empty() {
        return Err(ScrapeError::load(url, config.load_attempts, "document has no content"));
    }

    let handle = product_handle(url);
    store.save_page_source(handle, &html);

    let product = parse_product(url, Some(&verified.final_url), &html, timestamp);
    store.save_intermediate(&product, &format!("product_{handle}_data.json"));

    info!(url, title = product.title.as_deref().unwrap_or("-"), "processed product");
    Ok(product)
}

/// "Extract products from these URLs". Failed items are logged and left out.
pub trait ExtractionStrategy {
    fn extract_all(&mut self, urls: &[String]) -> Vec<Product>;
}

fn keep_or_log(url: &str, result: Result<Product, ScrapeError>) -> Option<Product> {
    match result {
        Ok(product) => Some(product),
        Err(e) => {
            error!(url, error = %e, "dropping product");
            None
        }
    }
}

/// One rendering session reused for every product, strictly in order.
pub struct SequentialSession<L: DocumentLoader> {
    session: SessionGuard<L>,
    config: ScraperConfig,
    store: ArtifactStore,
}

impl<L: DocumentLoader> SequentialSession<L> {
    pub fn new(loader: L, config: ScraperConfig, store: ArtifactStore) -> Self {
        SequentialSession {
            session: SessionGuard::new(loader),
            config,
            store,
        }
    }
}

impl<L: DocumentLoader> ExtractionStrategy for SequentialSession<L> {
    fn extract_all(&mut self, urls: &[String]) -> Vec<Product> {
        let total = urls.len();
        let mut products = Vec::with_capacity(total);

        for (i, url) in urls.iter().enumerate() {
            info!(url = %url, "processing product {}/{}", i + 1, total);
            let result = extract_product(&mut *self.session, url, &self.config, &self.store);
            products.extend(keep_or_log(url, result));

            if i + 1 < total {
                pause(self.config.inter_product_delay);
            }
        }

        info!(succeeded = products.len(), total, "finished product extraction");
        products
    }
}

/// A fresh session per URL, run on a bounded pool. Results keep input order.
pub struct SessionPerItem<F> {
    open_session: F,
    config: ScraperConfig,
    store: ArtifactStore,
}

impl<F, L> SessionPerItem<F>
where
    F: Fn() -> Result<L, ScrapeError> + Sync,
    L: DocumentLoader,
{
    pub fn new(open_session: F, config: ScraperConfig, store: ArtifactStore) -> Self {
        SessionPerItem {
            open_session,
            config,
            store,
        }
    }

    fn extract_one(&self, url: &str) -> Result<Product, ScrapeError> {
        let mut session = SessionGuard::new((self.open_session)()?);
        extract_product(&mut *session, url, &self.config, &self.store)
    }
}

impl<F, L> ExtractionStrategy for SessionPerItem<F>
where
    F: Fn() -> Result<L, ScrapeError> + Sync,
    L: DocumentLoader,
{
    fn extract_all(&mut self, urls: &[String]) -> Vec<Product> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.discovery_workers.max(1))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                error!(error = %e, "failed to build extraction pool");
                return Vec::new();
            }
        };

        let this = &*self;
        let results: Vec<Option<Product>> = pool.install(|| {
            urls.par_iter()
                .map(|url| keep_or_log(url, this.extract_one(url)))
                .collect()
        });

        let products: Vec<Product> = results.into_iter().flatten().collect();
        info!(succeeded = products.len(), total = urls.len(), "finished product extraction");
        products
    }
}

/// Discovers product URLs, extracts them, and writes the batch.
///
/// Individual page or product failures never abort the run; the returned
/// list holds whatever succeeded.
pub fn run<F, S>(
    config: &ScraperConfig,
    fetcher: &F,
    strategy: &mut S,
    store: &ArtifactStore,
) -> Result<Vec<Product>, ScrapeError>
where
    F: PageFetcher,
    S: ExtractionStrategy + ?Sized,
{
    info!(base_url = %config.base_url, mode = ?config.mode, "starting product scraping");
    let mut urls = discover_product_urls(fetcher, config, store)?;

    if config.is_test_mode() {
        urls.truncate(config.test_product_limit);
        info!(limit = config.test_product_limit, "test mode: limiting products");
    }

    let products = strategy.extract_all(&urls);

    if let Err(e) = store.save_products(&products) {
        error!(error = %e, "failed to save products");
    }
    Ok(products)
}
