use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub url: String,
    pub title: Option<String>,
    pub price: Option<String>,
    pub variants: Vec<VariantGroup>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub stock_status: Option<StockStatus>,
    pub timestamp: DateTime<Utc>,
}

impl Product {
    pub fn from_draft(url: &str, timestamp: DateTime<Utc>, draft: ProductDraft) -> Self {
        Product {
            url: url.to_string(),
            title: draft.title,
            price: draft.price,
            variants: draft.variants,
            description: draft.description,
            images: draft.images,
            stock_status: draft.stock_status,
            timestamp,
        }
    }
}

/// A named axis of product options, e.g. `Color` with `["Red", "Blue"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantGroup {
    #[serde(rename = "type")]
    pub kind: String,
    pub values: Vec<String>,
}

impl VariantGroup {
    pub fn new(kind: impl Into<String>, values: Vec<String>) -> Self {
        VariantGroup {
            kind: kind.into(),
            values,
        }
    }
}

/// Adds `incoming` to `groups`, keeping group labels unique.
///
/// A group whose label already exists has its new values appended to the
/// existing entry, skipping values already present. Otherwise the group is
/// pushed at the end, so discovery order of groups is preserved.
pub fn merge_variant_group(groups: &mut Vec<VariantGroup>, incoming: VariantGroup) {
    match groups.iter_mut().find(|g| g.kind == incoming.kind) {
        Some(existing) => {
            for value in incoming.values {
                if !existing.values.contains(&value) {
                    existing.values.push(value);
                }
            }
        }
        None => {
            let mut values: Vec<String> = Vec::with_capacity(incoming.values.len());
            for value in incoming.values {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            groups.push(VariantGroup::new(incoming.kind, values));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    PreOrder,
    /// Availability token copied verbatim from structured data,
    /// e.g. `https://schema.org/InStock`.
    Raw(String),
}

impl StockStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::PreOrder => "Pre-order",
            StockStatus::Raw(token) => token,
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StockStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "In Stock" => StockStatus::InStock,
            "Out of Stock" => StockStatus::OutOfStock,
            "Pre-order" => StockStatus::PreOrder,
            _ => StockStatus::Raw(value),
        }
    }
}

impl From<StockStatus> for String {
    fn from(value: StockStatus) -> Self {
        match value {
            StockStatus::Raw(token) => token,
            other => other.as_str().to_string(),
        }
    }
}

/// Intermediate record with every field optional. Produced by the
/// structured-data pass and completed by the reconciler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub title: Option<String>,
    pub price: Option<String>,
    pub variants: Vec<VariantGroup>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub stock_status: Option<StockStatus>,
}
