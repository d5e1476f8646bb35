//! Stock status from markup.
//!
//! Availability widgets are checked first. Without one, the status is
//! inferred from a disabled purchase button, and as a last resort assumed
//! from the presence of a price.

use scraper::ElementRef;
use tracing::{debug, info};

use crate::fallback::{element_text, first_success, parse_selector, FallbackExtractor, FieldStrategy};
use crate::models::StockStatus;

pub const STOCK_SELECTORS: &[&str] = &[
    ".product-inventory",
    ".stock-status",
    ".availability",
    r#"[class*="stock"]"#,
    r#"[class*="inventory"]"#,
    r#"[class*="availability"]"#,
    ".add-to-cart-button",
    ".product-form__submit",
    r#"button[type="submit"]"#,
];

const DISABLED_CONTROL_SELECTOR: &str = "button[disabled], input[disabled]";

const OUT_OF_STOCK_PHRASES: &[&str] = &["out of stock", "sold out", "unavailable", "not available"];
const IN_STOCK_PHRASES: &[&str] = &["in stock", "available", "add to cart", "buy now"];
const PRE_ORDER_PHRASES: &[&str] = &["pre-order"];
const PURCHASE_WORDS: &[&str] = &["add to cart", "buy", "purchase"];

/// How a status was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockBasis {
    /// An availability element or purchase control said so.
    Markup,
    /// A disabled purchase control with no other signal.
    DisabledPurchaseControl,
    /// Heuristic: a price was found and nothing contradicts availability.
    /// Not verified stock data.
    AssumedFromPrice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReading {
    pub status: StockStatus,
    pub basis: StockBasis,
}

/// Classifies one element's lowercased text.
///
/// Out-of-stock phrases win over purchase phrases, which win over pre-order.
/// A purchase control that is disabled reads as out of stock.
pub fn classify_stock_text(text: &str, disabled: bool) -> Option<StockStatus> {
    let contains_any = |phrases: &[&str]| phrases.iter().any(|p| text.contains(p));

    if contains_any(OUT_OF_STOCK_PHRASES) {
        Some(StockStatus::OutOfStock)
    } else if contains_any(IN_STOCK_PHRASES) {
        if disabled {
            Some(StockStatus::OutOfStock)
        } else {
            Some(StockStatus::InStock)
        }
    } else if contains_any(PRE_ORDER_PHRASES) {
        Some(StockStatus::PreOrder)
    } else {
        None
    }
}

fn is_disabled(el: ElementRef<'_>) -> bool {
    let attrs = el.value();
    attrs.attr("disabled").is_some() || attrs.attr("aria-disabled") == Some("true")
}

// Inputs carry their caption in `value` rather than as text.
fn control_text(el: ElementRef<'_>) -> String {
    let text = element_text(el);
    if text.is_empty() && el.value().name() == "input" {
        return el.value().attr("value").unwrap_or_default().trim().to_string();
    }
    text
}

fn probe_stock(ctx: &FallbackExtractor<'_>, selector: &scraper::Selector) -> Option<StockStatus> {
    ctx.doc.select(selector).find_map(|el| {
        let text = control_text(el).to_lowercase();
        let disabled = is_disabled(el);
        debug!(text = %text, disabled, "checking stock element");
        classify_stock_text(&text, disabled)
    })
}

fn disabled_purchase_control(ctx: &FallbackExtractor<'_>) -> bool {
    let Some(selector) = parse_selector(DISABLED_CONTROL_SELECTOR) else {
        return false;
    };
    ctx.doc.select(&selector).any(|el| {
        let text = control_text(el).to_lowercase();
        PURCHASE_WORDS.iter().any(|w| text.contains(w))
    })
}

pub fn read_stock(ctx: &FallbackExtractor<'_>, price_found: bool) -> Option<StockReading> {
    let strategy = FieldStrategy {
        field: "stock_status",
        selectors: STOCK_SELECTORS,
        probe: probe_stock,
    };
    if let Some(status) = first_success(ctx, &strategy) {
        return Some(StockReading {
            status,
            basis: StockBasis::Markup,
        });
    }

    if disabled_purchase_control(ctx) {
        info!("inferred out of stock from disabled purchase control");
        return Some(StockReading {
            status: StockStatus::OutOfStock,
            basis: StockBasis::DisabledPurchaseControl,
        });
    }

    if price_found {
        info!("no stock signal on page; assuming in stock because a price was found");
        return Some(StockReading {
            status: StockStatus::InStock,
            basis: StockBasis::AssumedFromPrice,
        });
    }

    None
}
