//! Headless Chrome rendering engine.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::loader::DocumentLoader;

fn engine_err(url: &str, e: impl ToString) -> ScrapeError {
    ScrapeError::load(url, 1, e.to_string())
}

pub struct ChromeDocumentLoader {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    implicit_wait: Duration,
}

impl ChromeDocumentLoader {
    pub fn launch(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        info!("launching headless browser");
        let launch = |e: anyhow::Error| ScrapeError::BrowserLaunch(e.to_string());

        let browser = Browser::new(LaunchOptions {
            headless: true,
            window_size: Some((1920, 1080)),
            args: vec![OsStr::new("--no-sandbox"), OsStr::new("--blink-settings=imagesEnabled=false")],
            ..Default::default()
        })
        .map_err(launch)?;

        let tab = browser.new_tab().map_err(launch)?;
        tab.set_default_timeout(config.page_load_timeout);
        tab.set_user_agent(&config.user_agent, None, None).map_err(launch)?;

        Ok(ChromeDocumentLoader {
            browser: Some(browser),
            tab,
            implicit_wait: config.implicit_wait,
        })
    }
}

impl DocumentLoader for ChromeDocumentLoader {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| engine_err(url, e))?;
        self.tab
            .wait_for_element_with_custom_timeout("body", self.implicit_wait)
            .map_err(|e| engine_err(url, e))?;
        Ok(())
    }

    fn current_url(&self) -> Result<String, ScrapeError> {
        Ok(self.tab.get_url())
    }

    fn page_source(&self) -> Result<String, ScrapeError> {
        self.tab
            .get_content()
            .map_err(|e| engine_err(&self.tab.get_url(), e))
    }

    fn reload(&mut self) -> Result<(), ScrapeError> {
        self.tab
            .reload(false, None)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| engine_err(&self.tab.get_url(), e))?;
        Ok(())
    }

    fn clear_cookies(&mut self) -> Result<(), ScrapeError> {
        self.tab
            .call_method(Network::ClearBrowserCookies(None))
            .map_err(|e| engine_err(&self.tab.get_url(), e))?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            if let Err(e) = self.tab.close(true) {
                warn!(error = %e, "failed to close tab");
            }
            drop(browser);
            info!("browser session closed");
        }
    }
}
