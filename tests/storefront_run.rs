//! End-to-end runs against a local storefront served by `wiremock`.
//!
//! The blocking HTTP client cannot run on the async test runtime, so every
//! scrape happens inside `spawn_blocking`.

use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront_product_archiver::archiver::ArtifactStore;
use storefront_product_archiver::config::{RunMode, ScraperConfig};
use storefront_product_archiver::fetcher::HttpFetcher;
use storefront_product_archiver::loader::HttpDocumentLoader;
use storefront_product_archiver::pagination::discover_product_urls;
use storefront_product_archiver::pipeline::{self, SequentialSession};
use storefront_product_archiver::{Product, StockStatus};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{body}</body></html>"))
}

fn card(href: &str) -> String {
    format!(r#"<div class="product-card"><a href="{href}"><span>Item</span></a></div>"#)
}

fn test_config(server: &MockServer, mode: RunMode, output_root: PathBuf) -> ScraperConfig {
    ScraperConfig {
        base_url: format!("{}/collections/all", server.uri()),
        mode,
        output_root,
        ..ScraperConfig::default().without_delays()
    }
}

async fn mount_listing(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/collections/all"))
        .respond_with(html(&body))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_card_listing_yields_origin_plus_href() {
    let server = MockServer::start().await;
    mount_listing(&server, card("/products/widget-a")).await;
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&server, RunMode::Full, tmp.path().to_path_buf());

    let links = tokio::task::spawn_blocking(move || {
        let fetcher = HttpFetcher::new(&config).unwrap();
        let store = ArtifactStore::new(config.output_dir(), false);
        discover_product_urls(&fetcher, &config, &store)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(links, vec![format!("{}/products/widget-a", server.uri())]);
}

#[tokio::test]
async fn full_mode_follows_pagination_and_skips_broken_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/all"))
        .and(query_param("page", "2"))
        .respond_with(html(&card("/products/two")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/all"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_listing(
        &server,
        format!(
            r#"<nav class="pagination"><a href="/collections/all?page=2">2</a><a href="/collections/all?page=3">3</a></nav>
               <div class="pagination"><a href="/collections/all?page=3">3</a></div>{}"#,
            card("/products/one")
        ),
    )
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&server, RunMode::Full, tmp.path().to_path_buf());

    let links = tokio::task::spawn_blocking(move || {
        let fetcher = HttpFetcher::new(&config).unwrap();
        let store = ArtifactStore::new(config.output_dir(), false);
        discover_product_urls(&fetcher, &config, &store)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        links,
        vec![
            format!("{}/products/one", server.uri()),
            format!("{}/products/two", server.uri()),
        ]
    );
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_mode_run_extracts_products_and_keeps_artifacts() {
    let server = MockServer::start().await;
    let listing: String = ["a", "b", "c", "d"]
        .iter()
        .map(|h| card(&format!("/products/widget-{h}")))
        .collect();
    mount_listing(&server, listing).await;

    let structured = json!({
        "@type": "Product",
        "name": "Widget A",
        "description": "Tough.\nLight.",
        "image": [{"url": "https://cdn.test/a.jpg"}],
        "offers": [{"name": "Black", "price": "129.00", "availability": "https://schema.org/InStock"}]
    });
    Mock::given(method("GET"))
        .and(path("/products/widget-a"))
        .respond_with(html(&format!(
            r#"<script type="application/ld+json">{structured}</script><div class="price">$1.00</div>"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/widget-b"))
        .respond_with(html(
            r#"<h1 class="product-title">Widget B</h1><div class="price">$49.99</div>
               <button disabled>Add to Cart</button>"#,
        ))
        .mount(&server)
        .await;
    // widget-c is not mounted: 404, so the product is dropped. widget-d is past the limit.

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&server, RunMode::Test, tmp.path().to_path_buf());
    let out_dir = config.output_dir();

    let products: Vec<Product> = tokio::task::spawn_blocking(move || {
        let fetcher = HttpFetcher::new(&config).unwrap();
        let store = ArtifactStore::new(config.output_dir(), true);
        let loader = HttpDocumentLoader::new(&config).unwrap();
        let mut strategy = SequentialSession::new(loader, config.clone(), store.clone());
        pipeline::run(&config, &fetcher, &mut strategy, &store)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(products.len(), 2, "third product fails to load, fourth is beyond the limit");

    let a = &products[0];
    assert_eq!(a.url, format!("{}/products/widget-a", server.uri()));
    assert_eq!(a.title.as_deref(), Some("Widget A"));
    assert_eq!(a.description.as_deref(), Some("Tough. Light."));
    assert_eq!(a.price.as_deref(), Some("129.00"));
    assert_eq!(
        a.stock_status,
        Some(StockStatus::Raw("https://schema.org/InStock".into()))
    );
    assert_eq!(a.images, vec!["https://cdn.test/a.jpg"]);

    let b = &products[1];
    assert_eq!(b.title.as_deref(), Some("Widget B"));
    assert_eq!(b.price.as_deref(), Some("49.99"));
    assert_eq!(b.stock_status, Some(StockStatus::OutOfStock));

    assert!(out_dir.join("page_1_data.json").exists());
    assert!(out_dir.join("all_product_links.json").exists());
    assert!(out_dir.join("product_widget-a_page.html").exists());
    assert!(out_dir.join("product_widget-b_data.json").exists());
    let batches: Vec<_> = std::fs::read_dir(&out_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("products_"))
        .collect();
    assert_eq!(batches.len(), 1);
}
