//! Catalog crawling: navigate a listing page, wait for it to stabilize,
//! force lazy-loaded items to materialize, extract a lightweight index of
//! candidate products, and paginate.
//!
//! Extraction itself runs over page-content snapshots parsed with
//! `scraper`, so the item-parsing logic is pure and unit-testable; only the
//! navigation/scroll/wait choreography touches the live page.

use bankscan_core::{normalize, CrawlerSettings, MarketConfig, ProductIndexEntry, ProductType, NO_DATA};

use crate::dom::{element_text, selector};
use crate::error::CrawlError;
use crate::session::Session;
use crate::wait;

const ITEM_SELECTOR: &str = r#"div[data-test="offers-grouped-list-item"]"#;
const BANK_SELECTOR: &str = r#"[data-test="offer-company"]"#;
const NAME_SELECTOR: &str = r#"[data-test="offer-product-name"]"#;
const TRIGGER_SELECTOR: &str = r#"button[data-test="offer-info-button"]"#;
const OFFERS_COUNT_SELECTOR: &str = r#"[data-test="offers-count"]"#;

/// Result of parsing one catalog page snapshot.
///
/// `items_found` counts every trigger-bearing item before bank filtering —
/// the retry loop needs to distinguish "nothing rendered yet" from
/// "rendered, but no allowed banks on this page".
pub(crate) struct CatalogPage {
    pub items_found: usize,
    pub entries: Vec<ProductIndexEntry>,
}

/// Crawls a catalog listing into index entries.
///
/// Soft failures (no items after bounded retries, missing pagination link)
/// return whatever has been accumulated; only navigation/snapshot failures
/// propagate as errors.
///
/// # Errors
///
/// Returns [`CrawlError::Navigation`] if the listing URL cannot be loaded
/// and [`CrawlError::Snapshot`] if page content cannot be captured.
pub async fn crawl_catalog(
    session: &Session,
    url: &str,
    product_type: ProductType,
    max_pages: usize,
    market: &MarketConfig,
    settings: &CrawlerSettings,
) -> Result<Vec<ProductIndexEntry>, CrawlError> {
    session.goto(url).await?;

    if !wait::wait_for_ready(session.page(), settings.page_ready_timeout()).await {
        tracing::warn!(url, "document never reported ready — continuing after settle");
    }
    // Client-side modules keep rendering well past the ready event.
    wait::settle(settings.settle_load_ms, settings.settle_jitter_ms).await;

    if wait::wait_for_selector(
        session.page(),
        OFFERS_COUNT_SELECTOR,
        settings.offers_count_timeout(),
    )
    .await
    {
        tracing::debug!("offer counter present");
    } else {
        // Some page variants simply omit the counter.
        tracing::warn!("offer counter not found — searching list items directly");
    }

    wait::scroll_to_midpoint(session.page()).await;
    wait::settle(settings.settle_scroll_ms, settings.settle_jitter_ms).await;
    wait::scroll_to_bottom(session.page()).await;
    wait::settle(settings.settle_load_ms, settings.settle_jitter_ms).await;

    let first_page = extract_with_retries(session, product_type, market, settings).await?;
    if first_page.items_found == 0 {
        tracing::warn!(
            url,
            "no catalog items found after retries — the site may have blocked this session"
        );
        return Ok(Vec::new());
    }
    tracing::info!(
        items = first_page.items_found,
        accepted = first_page.entries.len(),
        page = 1,
        "catalog items extracted"
    );

    let mut entries = first_page.entries;

    for page_idx in 2..=max_pages {
        if !open_catalog_page(session, page_idx, settings).await {
            tracing::debug!(page = page_idx, "no pagination link — crawl complete");
            break;
        }
        wait::settle(settings.settle_load_ms, settings.settle_jitter_ms).await;

        let parsed = extract_with_retries(session, product_type, market, settings).await?;
        if parsed.items_found == 0 {
            tracing::warn!(page = page_idx, "pagination rendered no items — stopping");
            break;
        }
        tracing::info!(
            items = parsed.items_found,
            accepted = parsed.entries.len(),
            page = page_idx,
            "catalog items extracted"
        );
        entries.extend(parsed.entries);
    }

    Ok(entries)
}

/// Snapshots and parses the current page, re-scrolling and re-settling
/// between attempts. Returns the last (empty) parse if every attempt finds
/// zero items — the caller treats that as a soft failure.
async fn extract_with_retries(
    session: &Session,
    product_type: ProductType,
    market: &MarketConfig,
    settings: &CrawlerSettings,
) -> Result<CatalogPage, CrawlError> {
    let attempts = settings.item_attempts.max(1);

    for attempt in 1..=attempts {
        let html = session
            .page()
            .content()
            .await
            .map_err(|source| CrawlError::Snapshot { source })?;

        let parsed = parse_catalog_page(&html, product_type, market);
        if parsed.items_found > 0 {
            return Ok(parsed);
        }

        if attempt < attempts {
            tracing::warn!(attempt, "list items not found — re-scrolling");
            wait::scroll_to_bottom(session.page()).await;
            wait::settle(settings.settle_scroll_ms, settings.settle_jitter_ms).await;
        }
    }

    Ok(CatalogPage {
        items_found: 0,
        entries: Vec::new(),
    })
}

/// Parses one catalog page snapshot into index entries.
///
/// Ordinals count trigger-bearing items in document order, including items
/// later discarded by the bank filter — the detail extractor re-queries all
/// triggers at use time, so the positions must agree with the full DOM, not
/// with the filtered list.
pub(crate) fn parse_catalog_page(
    html: &str,
    product_type: ProductType,
    market: &MarketConfig,
) -> CatalogPage {
    let doc = scraper::Html::parse_document(html);
    let item_sel = selector(ITEM_SELECTOR);
    let bank_sel = selector(BANK_SELECTOR);
    let name_sel = selector(NAME_SELECTOR);
    let trigger_sel = selector(TRIGGER_SELECTOR);

    let mut items_found = 0usize;
    let mut entries = Vec::new();

    for item in doc.select(&item_sel) {
        // Items without a detail trigger cannot be extracted later and do
        // not own an ordinal.
        if item.select(&trigger_sel).next().is_none() {
            continue;
        }
        let ordinal = items_found;
        items_found += 1;

        let Some(bank_el) = item.select(&bank_sel).next() else {
            continue;
        };
        let bank_label = element_text(bank_el);

        // Filter before detail extraction: banks outside the allow-set are
        // discarded here, never crawled further.
        let Some(bank) = normalize::resolve_name(&bank_label, &market.banks) else {
            tracing::debug!(bank = %bank_label, "item skipped — bank not in allow-set");
            continue;
        };

        let product_name = item
            .select(&name_sel)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| NO_DATA.to_string());

        entries.push(ProductIndexEntry {
            bank: bank.to_string(),
            product_name,
            product_type,
            ordinal,
        });
    }

    CatalogPage {
        items_found,
        entries,
    }
}

/// CSS selector for the pagination link targeting `page_idx`.
pub(crate) fn page_link_selector(page_idx: usize) -> String {
    format!(r#"a[href*="page={page_idx}"]"#)
}

/// Waits for the pagination link, scrolls it into view and clicks it.
/// Returns `false` (crawl complete, not an error) when the link never
/// appears or cannot be clicked.
async fn open_catalog_page(
    session: &Session,
    page_idx: usize,
    settings: &CrawlerSettings,
) -> bool {
    let link_selector = page_link_selector(page_idx);
    if !wait::wait_for_selector(session.page(), &link_selector, settings.page_link_timeout()).await
    {
        return false;
    }

    let click_js = format!(
        r"(() => {{
            const link = document.querySelector('{link_selector}');
            if (!link) return false;
            link.scrollIntoView({{block: 'center'}});
            link.click();
            return true;
        }})()"
    );

    match session.page().evaluate(click_js).await {
        Ok(result) => result.into_value::<bool>().unwrap_or(false),
        Err(e) => {
            tracing::debug!(page = page_idx, error = %e, "pagination click failed");
            false
        }
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
