//! schema.org `Product` extraction from `<script type="application/ld+json">` blocks.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::ScrapeError;
use crate::fallback::resolve_url;
use crate::models::{ProductDraft, StockStatus, VariantGroup};

const JSON_LD_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Returns the first `Product` block in the document, if any.
///
/// Blocks that fail to parse are logged and skipped.
pub fn find_product_block(doc: &Html) -> Option<Value> {
    let selector = Selector::parse(JSON_LD_SELECTOR).ok()?;

    for (index, script) in doc.select(&selector).enumerate() {
        let text: String = script.text().collect();
        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(v) => v,
            Err(source) => {
                let err = ScrapeError::StructuredDataParse { index, source };
                debug!(error = %err, "skipping structured data block");
                continue;
            }
        };

        if is_product(&value) {
            return Some(value);
        }
        if let Value::Array(items) = value {
            if let Some(item) = items.into_iter().find(is_product) {
                return Some(item);
            }
        }
    }
    None
}

fn is_product(value: &Value) -> bool {
    value.get("@type").and_then(Value::as_str) == Some("Product")
}

/// Candidate record from structured data. Empty when the page has none.
///
/// Image URLs are resolved against `base` when one is given.
pub fn extract(doc: &Html, base: Option<&Url>) -> ProductDraft {
    match find_product_block(doc) {
        Some(block) => {
            let name = block.get("name").and_then(Value::as_str).unwrap_or("Unknown");
            info!(name, "found Product structured data");
            draft_from_block(&block, base)
        }
        None => ProductDraft::default(),
    }
}

pub fn draft_from_block(block: &Value, base: Option<&Url>) -> ProductDraft {
    let mut draft = ProductDraft {
        title: non_empty_str(block.get("name")),
        description: block
            .get("description")
            .and_then(Value::as_str)
            .map(collapse_newlines)
            .filter(|d| !d.is_empty()),
        images: block
            .get("image")
            .map(image_urls)
            .unwrap_or_default()
            .into_iter()
            .map(|src| resolve_url(base, &src))
            .collect(),
        ..ProductDraft::default()
    };

    let offers: &[Value] = match block.get("offers") {
        Some(Value::Array(list)) => list,
        Some(single @ Value::Object(_)) => std::slice::from_ref(single),
        _ => &[],
    };

    let names: Vec<String> = offers
        .iter()
        .filter_map(|o| non_empty_str(o.get("name")))
        .collect();
    if !names.is_empty() {
        draft.variants.push(VariantGroup::new("General", names));
    }

    draft.price = offers.iter().find_map(|o| scalar_string(o.get("price")?));
    draft.stock_status = offers
        .iter()
        .find_map(|o| scalar_string(o.get("availability")?))
        .map(StockStatus::from);

    draft
}

/// Newlines become spaces; surrounding whitespace is trimmed.
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Flattens the `image` field, which may be a URL, an `ImageObject`, or a list of either.
fn image_urls(image: &Value) -> Vec<String> {
    match image {
        Value::Array(items) => items.iter().filter_map(single_image_url).collect(),
        other => single_image_url(other).into_iter().collect(),
    }
}

fn single_image_url(image: &Value) -> Option<String> {
    match image {
        Value::Object(obj) => non_empty_str(obj.get("url")),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// Prices show up both as `"49.99"` and `49.99`.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page_with(blocks: &[&str]) -> Html {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        Html::parse_document(&format!("<html><head>{scripts}</head><body></body></html>"))
    }

    #[test]
    fn extracts_core_fields_from_product_block() {
        let block = json!({
            "@type": "Product",
            "name": "Tactical Belt",
            "description": "Line one\nLine two\n",
            "image": ["https://cdn.test/a.jpg", {"url": "https://cdn.test/b.jpg"}],
            "offers": [
                {"name": "Black / M", "price": "129.00", "availability": "https://schema.org/InStock"},
                {"name": "Black / L", "price": "139.00", "availability": "https://schema.org/OutOfStock"}
            ]
        });
        let doc = page_with(&[block.to_string().as_str()]);

        let draft = extract(&doc, None);

        assert_eq!(draft.title.as_deref(), Some("Tactical Belt"));
        assert_eq!(draft.description.as_deref(), Some("Line one Line two"));
        assert_eq!(draft.images, vec!["https://cdn.test/a.jpg", "https://cdn.test/b.jpg"]);
        assert_eq!(draft.price.as_deref(), Some("129.00"));
        assert_eq!(
            draft.stock_status,
            Some(StockStatus::Raw("https://schema.org/InStock".into()))
        );
        assert_eq!(
            draft.variants,
            vec![VariantGroup::new("General", vec!["Black / M".into(), "Black / L".into()])]
        );
    }

    #[test]
    fn malformed_block_is_skipped() {
        let good = json!({"@type": "Product", "name": "Pouch"}).to_string();
        let doc = page_with(&["{not json", good.as_str()]);

        assert_eq!(extract(&doc, None).title.as_deref(), Some("Pouch"));
    }

    #[test]
    fn product_inside_list_is_found() {
        let block = json!([
            {"@type": "BreadcrumbList"},
            {"@type": "Product", "name": "Plate Carrier", "image": "https://cdn.test/pc.jpg"}
        ]);
        let doc = page_with(&[block.to_string().as_str()]);

        let draft = extract(&doc, None);
        assert_eq!(draft.title.as_deref(), Some("Plate Carrier"));
        assert_eq!(draft.images, vec!["https://cdn.test/pc.jpg"]);
    }

    #[test]
    fn non_product_blocks_yield_empty_draft() {
        let doc = page_with(&[json!({"@type": "Organization", "name": "Shop"}).to_string().as_str()]);
        assert_eq!(extract(&doc, None), ProductDraft::default());
    }

    #[test]
    fn single_offer_object_with_numeric_price() {
        let block = json!({
            "@type": "Product",
            "name": "Cap",
            "image": {"url": "https://cdn.test/cap.jpg"},
            "offers": {"price": 49.99, "availability": "InStock"}
        });

        let draft = draft_from_block(&block, None);

        assert_eq!(draft.price.as_deref(), Some("49.99"));
        assert_eq!(draft.images, vec!["https://cdn.test/cap.jpg"]);
        assert!(draft.variants.is_empty(), "no offer names means no variant group");
    }

    #[test]
    fn price_and_availability_come_from_first_offer_declaring_them() {
        let block = json!({
            "@type": "Product",
            "offers": [
                {"name": "S"},
                {"name": "M", "price": "10.00"},
                {"name": "L", "price": "12.00", "availability": "PreOrder"}
            ]
        });

        let draft = draft_from_block(&block, None);

        assert_eq!(draft.price.as_deref(), Some("10.00"));
        assert_eq!(draft.stock_status, Some(StockStatus::Raw("PreOrder".into())));
    }

    #[test]
    fn relative_images_resolve_against_page_address() {
        let block = json!({
            "@type": "Product",
            "name": "Belt",
            "image": ["//cdn.test/a.jpg", "/cdn/shop/files/b.jpg", {"url": "https://cdn.test/c.jpg"}]
        });
        let base = Url::parse("https://shop.test/products/belt").unwrap();

        let draft = draft_from_block(&block, Some(&base));

        assert_eq!(
            draft.images,
            vec![
                "https://cdn.test/a.jpg",
                "https://shop.test/cdn/shop/files/b.jpg",
                "https://cdn.test/c.jpg",
            ]
        );
    }
}
