//! Confirms the loaded page is the product that was asked for.
//!
//! Client-rendered storefronts sometimes land on a stale page or bounce to a
//! collection page. The handle (last path segment) of the current address is
//! compared with the requested one and the page is reloaded on mismatch.

use tracing::{info, warn};

use crate::config::NavigationPolicy;
use crate::error::ScrapeError;
use crate::loader::{pause, DocumentLoader, RenderedDocument};

/// Last non-empty path segment of `url` with query string and fragment removed.
pub fn product_handle(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
}

/// Waits for the loader to settle on `target` and returns its document.
///
/// Makes at most `policy.attempts` checks, reloading between them, so a
/// persistent mismatch costs `attempts - 1` reloads before failing with
/// [`ScrapeError::NavigationMismatch`].
pub fn verify_navigation<L: DocumentLoader + ?Sized>(
    loader: &mut L,
    target: &str,
    policy: &NavigationPolicy,
) -> Result<RenderedDocument, ScrapeError> {
    let expected = product_handle(target);
    let attempts = policy.attempts.max(1);
    let mut actual = String::new();

    for attempt in 1..=attempts {
        pause(policy.check_delay);
        let current_url = loader.current_url()?;
        actual = product_handle(&current_url).to_string();

        if actual == expected {
            info!(handle = expected, attempt, "correct page loaded");
            return Ok(RenderedDocument {
                html: loader.page_source()?,
                final_url: current_url,
            });
        }

        if attempt < attempts {
            warn!(expected, actual = %actual, attempt, "wrong page loaded, reloading");
            loader.reload()?;
            pause(policy.reload_settle);
        }
    }

    Err(ScrapeError::NavigationMismatch {
        expected: expected.to_string(),
        actual,
        attempts,
    })
}
