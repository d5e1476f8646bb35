//! Rendering-engine seam.
//!
//! The extraction pipeline only ever talks to [`DocumentLoader`]. Engines
//! behind it are interchangeable: the plain HTTP loader here, or the
//! headless browser in [`crate::chrome`] when the `chrome` feature is on.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::fetcher::{build_client, fetch_page};

pub trait DocumentLoader {
    /// Loads `url` and waits until the engine reports the page as loaded.
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Address of the current document after any redirect or client-side navigation.
    fn current_url(&self) -> Result<String, ScrapeError>;

    fn page_source(&self) -> Result<String, ScrapeError>;

    fn reload(&mut self) -> Result<(), ScrapeError>;

    fn clear_cookies(&mut self) -> Result<(), ScrapeError>;

    /// Releases the engine. Must be safe to call more than once.
    fn close(&mut self) {}
}

/// A document that passed navigation verification.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub final_url: String,
    pub html: String,
}

/// Owns a loader and closes it when dropped, including on unwind.
pub struct SessionGuard<L: DocumentLoader> {
    loader: L,
}

impl<L: DocumentLoader> SessionGuard<L> {
    pub fn new(loader: L) -> Self {
        SessionGuard { loader }
    }
}

impl<L: DocumentLoader> Deref for SessionGuard<L> {
    type Target = L;

    fn deref(&self) -> &L {
        &self.loader
    }
}

impl<L: DocumentLoader> DerefMut for SessionGuard<L> {
    fn deref_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}

impl<L: DocumentLoader> Drop for SessionGuard<L> {
    fn drop(&mut self) {
        self.loader.close();
    }
}

/// Navigates to `url`, retrying up to `attempts` times with `backoff` between tries.
pub fn load_with_retry<L: DocumentLoader + ?Sized>(
    loader: &mut L,
    url: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<(), ScrapeError> {
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        debug!(url, attempt, "loading page");
        match loader.navigate(url) {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(url, attempt, error = %e, "page load failed");
                last_err = Some(e);
                if attempt < attempts {
                    pause(backoff);
                }
            }
        }
    }
    let reason = last_err.map_or_else(|| "no attempt made".to_string(), |e| e.to_string());
    Err(ScrapeError::load(url, attempts, reason))
}

pub(crate) fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Loader backed by a blocking HTTP client. No script execution, so the
/// "rendered" document is the server response.
pub struct HttpDocumentLoader {
    config: ScraperConfig,
    client: Client,
    requested: Option<String>,
    current: Option<RenderedDocument>,
}

impl HttpDocumentLoader {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let client = build_client(config).map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;
        Ok(HttpDocumentLoader {
            config: config.clone(),
            client,
            requested: None,
            current: None,
        })
    }

    fn current(&self) -> Result<&RenderedDocument, ScrapeError> {
        self.current
            .as_ref()
            .ok_or_else(|| ScrapeError::load("about:blank", 0, "no document loaded"))
    }
}

impl DocumentLoader for HttpDocumentLoader {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.requested = Some(url.to_string());
        let (final_url, html) = fetch_page(&self.client, url)?;
        self.current = Some(RenderedDocument { final_url, html });
        Ok(())
    }

    fn current_url(&self) -> Result<String, ScrapeError> {
        Ok(self.current()?.final_url.clone())
    }

    fn page_source(&self) -> Result<String, ScrapeError> {
        Ok(self.current()?.html.clone())
    }

    // Re-requests the originally navigated address; a plain HTTP client
    // has no client-side state to refresh in place.
    fn reload(&mut self) -> Result<(), ScrapeError> {
        let url = self
            .requested
            .clone()
            .ok_or_else(|| ScrapeError::load("about:blank", 0, "reload before navigate"))?;
        self.navigate(&url)
    }

    fn clear_cookies(&mut self) -> Result<(), ScrapeError> {
        self.client = build_client(&self.config)?;
        Ok(())
    }

    fn close(&mut self) {
        self.current = None;
        self.requested = None;
    }
}
