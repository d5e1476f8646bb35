//! Markup-selector extraction for fields the structured data left empty.
//!
//! Every field runs the same loop: try selectors from most to least specific
//! and keep the first one whose probe produces a non-empty value.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::models::{merge_variant_group, StockStatus, VariantGroup};
use crate::reconcile::FieldSource;
use crate::stock;

pub const TITLE_SELECTORS: &[&str] = &[
    "h1.product-title",
    "h2.product-title",
    ".product-title",
    ".product__title",
];

pub const PRICE_SELECTORS: &[&str] = &[
    "sale-price",
    ".price-list sale-price",
    ".price",
    ".product-price",
    r#"[class*="price"]"#,
];

pub const VARIANT_GROUP_SELECTORS: &[&str] = &[
    ".product-form__input",
    ".selector-wrapper",
    ".variant-picker",
    ".product-form__option",
];

pub const IMAGE_SELECTORS: &[&str] = &[
    ".product-single__photos img",
    ".product-gallery img",
    ".product-images img",
    r#"[class*="product"] img"#,
];

const VARIANT_LABEL_SELECTOR: &str = "label, .form__label, .variant__label";
const VARIANT_VALUE_SELECTOR: &str = r#"input[type="radio"], option, [data-value]"#;
const VARIANT_VALUE_WRAP_SELECTOR: &str = ".variant-input-wrap";

/// One field's ordered selector list plus the probe that turns a selector
/// into a candidate value. A probe returns `None` for a miss.
pub struct FieldStrategy<'a, T> {
    pub field: &'static str,
    pub selectors: &'a [&'a str],
    pub probe: fn(&FallbackExtractor<'_>, &Selector) -> Option<T>,
}

/// Runs `strategy` against the document, stopping at the first hit.
pub fn first_success<T>(ctx: &FallbackExtractor<'_>, strategy: &FieldStrategy<'_, T>) -> Option<T> {
    for css in strategy.selectors {
        let Some(selector) = parse_selector(css) else {
            continue;
        };
        match (strategy.probe)(ctx, &selector) {
            Some(value) => {
                debug!(field = strategy.field, selector = css, "fallback selector matched");
                return Some(value);
            }
            None => debug!(field = strategy.field, selector = css, "selector miss"),
        }
    }
    None
}

pub(crate) fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = css, error = %e, "invalid selector");
            None
        }
    }
}

/// Text content with runs of whitespace collapsed and ends trimmed.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps digits, commas and periods: `"$1,299.00"` becomes `"1,299.00"`.
pub fn normalize_price(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect()
}

pub struct FallbackExtractor<'a> {
    pub(crate) doc: &'a Html,
    base: Option<Url>,
}

impl<'a> FallbackExtractor<'a> {
    /// `page_url` resolves relative image sources.
    pub fn new(doc: &'a Html, page_url: Option<&str>) -> Self {
        FallbackExtractor {
            doc,
            base: page_url.and_then(|u| Url::parse(u).ok()),
        }
    }

    fn resolve(&self, src: &str) -> String {
        resolve_url(self.base.as_ref(), src)
    }

    pub(crate) fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }
}

/// `src` joined onto `base`; returned unchanged when there is no base or the join fails.
pub(crate) fn resolve_url(base: Option<&Url>, src: &str) -> String {
    match base {
        Some(base) => base.join(src).map_or_else(|_| src.to_string(), String::from),
        None => src.to_string(),
    }
}

fn probe_title(ctx: &FallbackExtractor<'_>, selector: &Selector) -> Option<String> {
    ctx.doc
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn probe_price(ctx: &FallbackExtractor<'_>, selector: &Selector) -> Option<String> {
    ctx.doc
        .select(selector)
        .map(|el| normalize_price(&element_text(el)))
        .find(|p| !p.is_empty())
}

fn probe_variants(ctx: &FallbackExtractor<'_>, selector: &Selector) -> Option<Vec<VariantGroup>> {
    let label_sel = parse_selector(VARIANT_LABEL_SELECTOR)?;
    let value_sel = parse_selector(VARIANT_VALUE_SELECTOR)?;
    let wrap_sel = parse_selector(VARIANT_VALUE_WRAP_SELECTOR)?;

    let mut groups = Vec::new();
    for container in ctx.doc.select(selector) {
        let label = container
            .select(&label_sel)
            .next()
            .map(|el| element_text(el).replace(':', "").trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        let mut value_elements: Vec<ElementRef<'_>> = container.select(&value_sel).collect();
        if value_elements.is_empty() {
            value_elements = container.select(&wrap_sel).collect();
        }

        let mut values: Vec<String> = Vec::new();
        for el in value_elements {
            let Some(value) = variant_value(el) else {
                continue;
            };
            if !values.contains(&value) {
                values.push(value);
            }
        }

        if !values.is_empty() {
            debug!(group = %label, ?values, "found variant group");
            merge_variant_group(&mut groups, VariantGroup::new(label, values));
        }
    }

    (!groups.is_empty()).then_some(groups)
}

fn variant_value(el: ElementRef<'_>) -> Option<String> {
    let value = match el.value().name() {
        "input" => el.value().attr("value").unwrap_or_default().trim().to_string(),
        "option" => {
            let text = element_text(el);
            // Placeholder such as "Select a size".
            if text.to_lowercase().contains("select") {
                return None;
            }
            text
        }
        _ => match el.value().attr("data-value") {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => element_text(el),
        },
    };
    (!value.is_empty()).then_some(value)
}

fn probe_images(ctx: &FallbackExtractor<'_>, selector: &Selector) -> Option<Vec<String>> {
    let images: Vec<String> = ctx
        .doc
        .select(selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(|src| ctx.resolve(src))
        .collect();
    (!images.is_empty()).then_some(images)
}

impl FieldSource for FallbackExtractor<'_> {
    fn title(&self) -> Option<String> {
        first_success(
            self,
            &FieldStrategy {
                field: "title",
                selectors: TITLE_SELECTORS,
                probe: probe_title,
            },
        )
    }

    fn price(&self) -> Option<String> {
        first_success(
            self,
            &FieldStrategy {
                field: "price",
                selectors: PRICE_SELECTORS,
                probe: probe_price,
            },
        )
    }

    fn variants(&self) -> Vec<VariantGroup> {
        first_success(
            self,
            &FieldStrategy {
                field: "variants",
                selectors: VARIANT_GROUP_SELECTORS,
                probe: probe_variants,
            },
        )
        .unwrap_or_default()
    }

    fn images(&self) -> Vec<String> {
        first_success(
            self,
            &FieldStrategy {
                field: "images",
                selectors: IMAGE_SELECTORS,
                probe: probe_images,
            },
        )
        .unwrap_or_default()
    }

    fn stock_status(&self, price_found: bool) -> Option<StockStatus> {
        stock::read_stock(self, price_found).map(|reading| reading.status)
    }
}
