use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://agilite.co.il/collections/all";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// First listing page only, at most a handful of products, every
    /// intermediate artifact written to disk.
    Test,
    Full,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub user_agent: String,
    pub mode: RunMode,
    pub output_root: PathBuf,

    pub page_load_timeout: Duration,
    pub implicit_wait: Duration,
    pub max_redirects: usize,

    pub load_attempts: u32,
    pub load_backoff: Duration,
    pub navigation: NavigationPolicy,
    pub post_load_settle: Duration,
    pub inter_product_delay: Duration,

    pub discovery_workers: usize,
    pub test_product_limit: usize,
}

/// Bounds for the "did we land on the right product page" loop.
#[derive(Debug, Clone, Copy)]
pub struct NavigationPolicy {
    pub attempts: u32,
    /// Wait before reading the current address on each attempt.
    pub check_delay: Duration,
    /// Wait after a reload before the next attempt.
    pub reload_settle: Duration,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        NavigationPolicy {
            attempts: 3,
            check_delay: Duration::from_secs(2),
            reload_settle: Duration::from_secs(3),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            mode: RunMode::Full,
            output_root: PathBuf::from("data"),
            page_load_timeout: Duration::from_secs(30),
            implicit_wait: Duration::from_secs(5),
            max_redirects: 10,
            load_attempts: 3,
            load_backoff: Duration::from_secs(2),
            navigation: NavigationPolicy::default(),
            post_load_settle: Duration::from_secs(2),
            inter_product_delay: Duration::from_secs(3),
            discovery_workers: 5,
            test_product_limit: 3,
        }
    }
}

impl ScraperConfig {
    pub fn is_test_mode(&self) -> bool {
        self.mode == RunMode::Test
    }

    pub fn output_dir(&self) -> PathBuf {
        match self.mode {
            RunMode::Test => self.output_root.join("test_scrape"),
            RunMode::Full => self.output_root.join("raw"),
        }
    }

    /// Same settings with every wait collapsed to zero. Used by tests.
    pub fn without_delays(mut self) -> Self {
        self.load_backoff = Duration::ZERO;
        self.navigation.check_delay = Duration::ZERO;
        self.navigation.reload_settle = Duration::ZERO;
        self.post_load_settle = Duration::ZERO;
        self.inter_product_delay = Duration::ZERO;
        self
    }
}
