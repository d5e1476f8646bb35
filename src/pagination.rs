//! Product URL discovery across a collection's listing pages.

use rayon::prelude::*;
use scraper::Html;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::archiver::ArtifactStore;
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::fallback::{element_text, parse_selector};
use crate::fetcher::PageFetcher;

const PAGE_COUNT_SELECTOR: &str = "div.pagination";
const PAGE_NAV_LINK_SELECTOR: &str = "nav.pagination a[href]";
const PRODUCT_CARD_SELECTOR: &str = r#"div[class*="product-card"], div[class*="grid-product"]"#;
const PRODUCT_LINK_SELECTOR: &str = r#"a[href*="/products/"]"#;

/// Scheme and host of `url`, e.g. `https://shop.test`.
pub fn origin_of(url: &str) -> Result<String, ScrapeError> {
    Ok(Url::parse(url)?.origin().ascii_serialization())
}

fn absolutize(href: &str, origin: &str) -> String {
    if href.starts_with('/') && !href.starts_with("//") {
        format!("{origin}{href}")
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        href.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCount {
    pub total_pages: u32,
    pub page_numbers: Vec<u32>,
    pub pagination_html: Option<String>,
}

/// Estimates the page count from a numbered pagination widget.
pub fn total_pages(html: &str) -> PageCount {
    let doc = Html::parse_document(html);
    let widget = parse_selector(PAGE_COUNT_SELECTOR).and_then(|sel| doc.select(&sel).next());
    let Some(widget) = widget else {
        return PageCount {
            total_pages: 1,
            page_numbers: Vec::new(),
            pagination_html: None,
        };
    };

    let page_numbers: Vec<u32> = parse_selector("a")
        .map(|a| {
            widget
                .select(&a)
                .filter_map(|link| element_text(link).parse::<u32>().ok())
                .collect()
        })
        .unwrap_or_default();

    PageCount {
        total_pages: page_numbers.iter().copied().max().unwrap_or(1),
        page_numbers,
        pagination_html: Some(widget.html()),
    }
}

/// Every listing page linked from the pagination block, plus `base_url`
/// itself, sorted and without duplicates.
pub fn pagination_links(html: &str, base_url: &str) -> Result<Vec<String>, ScrapeError> {
    let origin = origin_of(base_url)?;
    let doc = Html::parse_document(html);

    let mut pages: Vec<String> = parse_selector(PAGE_NAV_LINK_SELECTOR)
        .map(|sel| {
            doc.select(&sel)
                .filter_map(|a| a.value().attr("href"))
                .map(|href| absolutize(href, &origin))
                .collect()
        })
        .unwrap_or_default();
    pages.push(base_url.to_string());
    pages.sort();
    pages.dedup();
    Ok(pages)
}

#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub product_links: Vec<String>,
    pub cards_found: usize,
}

/// Product URLs from the cards on one listing page, in page order.
pub fn product_links(html: &str, origin: &str) -> ListingPage {
    let doc = Html::parse_document(html);
    let (Some(card_sel), Some(link_sel)) = (
        parse_selector(PRODUCT_CARD_SELECTOR),
        parse_selector(PRODUCT_LINK_SELECTOR),
    ) else {
        return ListingPage::default();
    };

    let mut page = ListingPage::default();
    for card in doc.select(&card_sel) {
        page.cards_found += 1;
        let Some(href) = card
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let url = absolutize(href, origin);
        if !page.product_links.contains(&url) {
            page.product_links.push(url);
        }
    }
    page
}

fn page_label(page_url: &str) -> String {
    Url::parse(page_url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| "1".to_string())
}

fn links_from_page<F: PageFetcher>(
    fetcher: &F,
    page_url: &str,
    origin: &str,
    store: &ArtifactStore,
) -> Vec<String> {
    let html = match fetcher.fetch_html(page_url) {
        Ok(html) => html,
        Err(e) => {
            warn!(page_url, error = %e, "failed to fetch listing page");
            return Vec::new();
        }
    };
    let page = product_links(&html, origin);
    info!(page_url, cards = page.cards_found, links = page.product_links.len(), "scanned listing page");

    store.save_intermediate(
        &json!({
            "page_url": page_url,
            "product_links": page.product_links,
            "cards_found": page.cards_found,
            "page_html": html,
        }),
        &format!("page_{}_data.json", page_label(page_url)),
    );
    page.product_links
}

/// Collects product URLs from the listing, fetching pages on a bounded pool.
///
/// In test mode only the base page is scanned. A page that fails to load
/// contributes no links; it does not abort discovery.
pub fn discover_product_urls<F: PageFetcher>(
    fetcher: &F,
    config: &ScraperConfig,
    store: &ArtifactStore,
) -> Result<Vec<String>, ScrapeError> {
    let base_url = config.base_url.as_str();
    let origin = origin_of(base_url)?;

    let base_html = fetcher.fetch_html(base_url);
    if let Err(e) = &base_html {
        warn!(base_url, error = %e, "failed to read pagination, using base page only");
    }

    if let Ok(html) = &base_html {
        let count = total_pages(html);
        info!(estimated_pages = count.total_pages, "read pagination widget");
        store.save_intermediate(
            &json!({
                "total_pages": count.total_pages,
                "page_numbers": count.page_numbers,
                "pagination_html": count.pagination_html,
            }),
            "pagination_data.json",
        );
    }

    let page_urls = match base_html {
        _ if config.is_test_mode() => {
            info!("test mode: processing only the first listing page");
            vec![base_url.to_string()]
        }
        Ok(html) => pagination_links(&html, base_url)?,
        Err(_) => vec![base_url.to_string()],
    };
    info!(pages = page_urls.len(), "listing pages to scan");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.discovery_workers.max(1))
        .build()
        .map_err(|e| ScrapeError::WorkerPool(e.to_string()))?;

    // Workers never share a request context; each job split gets its own fetcher.
    let per_page: Vec<Vec<String>> = pool.install(|| {
        page_urls
            .par_iter()
            .map_init(
                || fetcher.fork(),
                |worker, page_url| match worker {
                    Ok(worker) => links_from_page(&*worker, page_url, &origin, store),
                    Err(e) => {
                        warn!(page_url = %page_url, error = %e, "failed to open worker request context");
                        Vec::new()
                    }
                },
            )
            .collect()
    });

    let mut links: Vec<String> = Vec::new();
    for url in per_page.into_iter().flatten() {
        if !links.contains(&url) {
            links.push(url);
        }
    }
    info!(count = links.len(), "found product links");

    store.save_intermediate(
        &json!({"total_links": links.len(), "links": links}),
        "all_product_links.json",
    );
    Ok(links)
}
