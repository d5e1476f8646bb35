pub mod archiver;
#[cfg(feature = "chrome")]
pub mod chrome;
pub mod config;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod loader;
pub mod models;
pub mod navigation;
pub mod pagination;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod stock;
pub mod structured;

pub use error::ScrapeError;
pub use models::{Product, StockStatus, VariantGroup};
