//! Merges the structured-data candidate with per-field fallbacks.
//!
//! Structured values win whenever present. A fallback runs only for a field
//! that is still empty, and fields are settled independently of each other.

use crate::models::{ProductDraft, StockStatus, VariantGroup};

/// Secondary source consulted lazily, one field at a time.
pub trait FieldSource {
    fn title(&self) -> Option<String>;
    fn price(&self) -> Option<String>;
    fn variants(&self) -> Vec<VariantGroup>;
    fn images(&self) -> Vec<String>;
    /// `price_found` reports whether the reconciled record has a price.
    fn stock_status(&self, price_found: bool) -> Option<StockStatus>;
}

fn prefer<T>(primary: Option<T>, fallback: impl FnOnce() -> Option<T>) -> Option<T> {
    primary.or_else(fallback)
}

fn prefer_list<T>(primary: Vec<T>, fallback: impl FnOnce() -> Vec<T>) -> Vec<T> {
    if primary.is_empty() { fallback() } else { primary }
}

pub fn reconcile(primary: ProductDraft, fallback: &impl FieldSource) -> ProductDraft {
    let title = prefer(primary.title, || fallback.title());
    let price = prefer(primary.price, || fallback.price());
    let variants = prefer_list(primary.variants, || fallback.variants());
    let images = prefer_list(primary.images, || fallback.images());
    let price_found = price.is_some();
    let stock_status = prefer(primary.stock_status, || fallback.stock_status(price_found));

    ProductDraft {
        title,
        price,
        variants,
        description: primary.description,
        images,
        stock_status,
    }
}
