use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::{error, info};

use crate::error::ScrapeError;
use crate::models::Product;

pub fn save_to_file<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ScrapeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Where run output lands. Intermediate artifacts are only written when
/// `keep_intermediate` is set (test mode); the final batch always is.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    keep_intermediate: bool,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, keep_intermediate: bool) -> Self {
        ArtifactStore {
            dir: dir.into(),
            keep_intermediate,
        }
    }

    /// Writes an inspection artifact. Failures are logged, not returned.
    pub fn save_intermediate<T: Serialize + ?Sized>(&self, value: &T, filename: &str) {
        if !self.keep_intermediate {
            return;
        }
        let path = self.dir.join(filename);
        match save_to_file(value, &path) {
            Ok(()) => info!(path = %path.display(), "saved intermediate data"),
            Err(e) => error!(path = %path.display(), error = %e, "failed to save intermediate data"),
        }
    }

    pub fn save_page_source(&self, handle: &str, html: &str) {
        if !self.keep_intermediate {
            return;
        }
        let path = self.dir.join(format!("product_{handle}_page.html"));
        let result = fs::create_dir_all(&self.dir).and_then(|()| fs::write(&path, html));
        match result {
            Ok(()) => info!(path = %path.display(), "saved page source"),
            Err(e) => error!(path = %path.display(), error = %e, "failed to save page source"),
        }
    }

    /// Writes the batch as `products_<YYYYMMDD_HHMMSS>.json`.
    pub fn save_products(&self, products: &[Product]) -> Result<PathBuf, ScrapeError> {
        let filename = format!("products_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(filename);
        save_to_file(products, &path)?;
        info!(path = %path.display(), count = products.len(), "saved products");
        Ok(path)
    }
}
