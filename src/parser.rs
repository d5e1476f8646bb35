use chrono::{DateTime, Utc};
use scraper::Html;

use crate::fallback::FallbackExtractor;
use crate::models::Product;
use crate::reconcile::reconcile;
use crate::structured;

/// Builds a product record from a rendered product page.
///
/// `page_url` is the document's final address, used to resolve relative
/// image URLs from both structured data and markup; `url` is the address
/// recorded on the product.
pub fn parse_product(url: &str, page_url: Option<&str>, html: &str, timestamp: DateTime<Utc>) -> Product {
    let doc = Html::parse_document(html);

    let fallback = FallbackExtractor::new(&doc, page_url.or(Some(url)));
    let candidate = structured::extract(&doc, fallback.base());
    let draft = reconcile(candidate, &fallback);

    Product::from_draft(url, timestamp, draft)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::StockStatus;

    const URL: &str = "https://shop.test/products/widget";

    #[test]
    fn markup_only_page_with_disabled_cart_button() {
        let html = r#"<html><body>
            <div class="price">$49.99</div>
            <button disabled>Add to Cart</button>
        </body></html>"#;

        let product = parse_product(URL, None, html, Utc::now());

        assert_eq!(product.price.as_deref(), Some("49.99"));
        assert_eq!(product.stock_status, Some(StockStatus::OutOfStock));
    }

    #[test]
    fn structured_data_wins_and_fallback_fills_gaps() {
        let block = json!({
            "@type": "Product",
            "name": "Widget",
            "description": "Strong\nand light",
            "offers": {"price": "20.00"}
        });
        let html = format!(
            r#"<html><head><script type="application/ld+json">{block}</script></head><body>
               <h1 class="product-title">Markup Widget</h1>
               <div class="price">$99.00</div>
               <div class="product-gallery"><img src="/img/w.jpg"></div>
            </body></html>"#
        );
        let ts = Utc::now();

        let product = parse_product(URL, None, &html, ts);

        assert_eq!(product.url, URL);
        assert_eq!(product.title.as_deref(), Some("Widget"));
        assert_eq!(product.description.as_deref(), Some("Strong and light"));
        assert_eq!(product.price.as_deref(), Some("20.00"));
        assert_eq!(product.images, vec!["https://shop.test/img/w.jpg"]);
        assert_eq!(product.stock_status, Some(StockStatus::InStock));
        assert_eq!(product.timestamp, ts);
    }

    #[test]
    fn serialized_shape_matches_record_layout() {
        let product = parse_product(URL, None, "<html></html>", Utc::now());
        let value = serde_json::to_value(&product).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["url", "title", "price", "variants", "description", "images", "stock_status", "timestamp"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert!(value["stock_status"].is_null());
    }

    #[test]
    fn structured_images_are_recorded_as_absolute_urls() {
        let block = json!({
            "@type": "Product",
            "name": "Belt",
            "image": ["//shop.test/cdn/shop/files/belt.jpg", "/cdn/shop/files/belt-2.jpg"]
        });
        let html = format!(r#"<script type="application/ld+json">{block}</script>"#);

        let product = parse_product("https://shop.test/products/belt", None, &html, Utc::now());

        assert_eq!(
            product.images,
            vec![
                "https://shop.test/cdn/shop/files/belt.jpg",
                "https://shop.test/cdn/shop/files/belt-2.jpg",
            ]
        );
    }
}
