use reqwest::blocking::Client;
use reqwest::redirect;
use tracing::debug;

use crate::config::ScraperConfig;
use crate::error::ScrapeError;

/// Plain HTTP page access used by listing discovery.
pub trait PageFetcher: Sync {
    fn fetch_html(&self, url: &str) -> Result<String, ScrapeError>;

    /// A fetcher with its own request context (connection pool and cookie
    /// jar), handed to each discovery worker.
    fn fork(&self) -> Result<Self, ScrapeError>
    where
        Self: Sized;
}

pub fn build_client(config: &ScraperConfig) -> Result<Client, reqwest::Error> {
    let max_redirects = config.max_redirects;
    let custom_redirect_policy = redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error(format!("Too many redirects (>{max_redirects})"))
        } else {
            attempt.follow()
        }
    });

    Client::builder()
        .redirect(custom_redirect_policy)
        .user_agent(config.user_agent.clone())
        .timeout(config.page_load_timeout)
        .cookie_store(true)
        .build()
}

/// Fetches `url`, returning the body and the final address after redirects.
pub fn fetch_page(client: &Client, url: &str) -> Result<(String, String), ScrapeError> {
    let resp = client.get(url).send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ScrapeError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let final_url = resp.url().to_string();
    let body = resp.text()?;
    debug!(url, final_url = %final_url, bytes = body.len(), "fetched page");
    Ok((final_url, body))
}

pub struct HttpFetcher {
    config: ScraperConfig,
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        Ok(HttpFetcher {
            config: config.clone(),
            client: build_client(config)?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        fetch_page(&self.client, url).map(|(_, body)| body)
    }

    fn fork(&self) -> Result<Self, ScrapeError> {
        HttpFetcher::new(&self.config)
    }
}
