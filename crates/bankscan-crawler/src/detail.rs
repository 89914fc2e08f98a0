//! Detail extraction: open a candidate's popup panel, scrape its labeled
//! feature fields and tariff table, and always close the panel before the
//! next candidate.
//!
//! The whole operation is infallible from the caller's perspective: a
//! missing trigger, a panel timeout, or any unexpected scraping error is
//! logged and yields an empty mapping so the batch keeps moving. Panel
//! parsing runs over a page-content snapshot and is pure.

use std::collections::BTreeMap;

use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};

use bankscan_core::{normalize, CrawlerSettings, MarketConfig, NormalizationTable, NO_DATA};

use crate::dom::{element_text, selector};
use crate::error::CrawlError;
use crate::session::Session;
use crate::wait;

const POPUP_SELECTOR: &str = r#"[data-test="detailed-popup"]"#;
const FEATURE_SELECTOR: &str = r#"[data-test^="detailed-popup-feature-"]"#;
const FEATURE_PREFIX: &str = "detailed-popup-feature-";
const FEATURE_VALUE_SELECTOR: &str = r#"[data-test="text"]"#;
const TARIFF_TABLE_SELECTOR: &str = "details[open] table";
const CLOSE_CONTROL_SELECTOR: &str = r#"[aria-label="закрыть"]"#;

/// Pause after dismissing the panel, letting the overlay animation finish
/// before the next trigger click.
const CLOSE_SETTLE_MS: u64 = 1000;

/// Extracts the criterion mapping for the candidate at `ordinal`.
///
/// Never fails: every error path degrades to an empty mapping with a log
/// line, and the panel close runs on success, timeout and error alike.
pub async fn extract_details(
    session: &Session,
    ordinal: usize,
    table: &NormalizationTable,
    market: &MarketConfig,
    settings: &CrawlerSettings,
) -> BTreeMap<String, String> {
    let result = open_and_scrape(session, ordinal, table, market, settings).await;

    // Cleanup is unconditional and swallowed; a stuck panel must never
    // block the next candidate.
    close_panel(session).await;

    match result {
        Ok(criteria) => {
            tracing::info!(ordinal, criteria = criteria.len(), "detail panel scraped");
            criteria
        }
        Err(e) => {
            tracing::warn!(
                ordinal,
                error = %e,
                "detail extraction failed — continuing with empty criteria"
            );
            BTreeMap::new()
        }
    }
}

async fn open_and_scrape(
    session: &Session,
    ordinal: usize,
    table: &NormalizationTable,
    market: &MarketConfig,
    settings: &CrawlerSettings,
) -> Result<BTreeMap<String, String>, CrawlError> {
    // Triggers are re-queried at click time: positional addressing survives
    // the DOM re-renders that invalidate cached element handles.
    let click_js = format!(
        r#"(() => {{
            const triggers = document.querySelectorAll('button[data-test="offer-info-button"]');
            const trigger = triggers[{ordinal}];
            if (!trigger) return false;
            trigger.scrollIntoView({{behavior: 'smooth', block: 'center'}});
            trigger.click();
            return true;
        }})()"#
    );

    let clicked = session
        .page()
        .evaluate(click_js)
        .await
        .map_err(|source| CrawlError::Evaluate {
            context: format!("clicking detail trigger {ordinal}"),
            source,
        })?
        .into_value::<bool>()
        .unwrap_or(false);

    if !clicked {
        return Err(CrawlError::TriggerMissing { ordinal });
    }

    if !wait::wait_for_selector(session.page(), POPUP_SELECTOR, settings.popup_timeout()).await {
        return Err(CrawlError::PanelTimeout {
            ordinal,
            waited_ms: settings.popup_timeout_secs * 1000,
        });
    }
    // The panel animates its content in after mounting.
    wait::settle(settings.settle_popup_ms, settings.settle_jitter_ms).await;

    let html = session
        .page()
        .content()
        .await
        .map_err(|source| CrawlError::Snapshot { source })?;

    Ok(parse_popup(&html, table, market))
}

/// Parses a detail-panel snapshot into a canonical-criterion mapping.
///
/// Feature blocks are recorded unconditionally (identity mapping when no
/// rule matches); tariff rows are kept only when their label resolves into
/// the criteria allow-set — the table carries plenty of rows irrelevant to
/// the comparison contract.
pub(crate) fn parse_popup(
    html: &str,
    table: &NormalizationTable,
    market: &MarketConfig,
) -> BTreeMap<String, String> {
    let doc = scraper::Html::parse_document(html);
    let popup_sel = selector(POPUP_SELECTOR);

    let Some(popup) = doc.select(&popup_sel).next() else {
        return BTreeMap::new();
    };

    let mut data = BTreeMap::new();

    let feature_sel = selector(FEATURE_SELECTOR);
    let value_sel = selector(FEATURE_VALUE_SELECTOR);
    for block in popup.select(&feature_sel) {
        let Some(raw_label) = block
            .value()
            .attr("data-test")
            .and_then(|dt| dt.strip_prefix(FEATURE_PREFIX))
        else {
            continue;
        };
        if raw_label.is_empty() {
            continue;
        }

        let value = block
            .select(&value_sel)
            .next()
            .map(element_text)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| NO_DATA.to_string());

        data.insert(table.canonicalize(raw_label).to_string(), value);
    }

    let table_sel = selector(TARIFF_TABLE_SELECTOR);
    let row_sel = selector("tbody tr");
    let th_sel = selector("th");
    let td_sel = selector("td");
    if let Some(tariffs) = popup.select(&table_sel).next() {
        for row in tariffs.select(&row_sel) {
            let Some(header) = row.select(&th_sel).next() else {
                continue;
            };
            let raw_label = element_text(header);
            let cells: Vec<String> = row.select(&td_sel).map(element_text).collect();
            if raw_label.is_empty() || cells.is_empty() {
                continue;
            }

            let canonical = table.canonicalize(&raw_label);
            // Unknown rows are dropped silently.
            if let Some(criterion) = normalize::resolve_name(canonical, &market.criteria) {
                data.insert(criterion.to_string(), cells.join(" "));
            }
        }
    }

    data
}

/// Dismisses the detail panel: preferred close control first, generic
/// role-button inside the panel next, Escape keystroke as the last resort.
/// All failures are swallowed.
async fn close_panel(session: &Session) {
    let close_js = format!(
        r#"(() => {{
            const popup = document.querySelector('{POPUP_SELECTOR}');
            if (!popup) return 'absent';
            const control = document.querySelector('{CLOSE_CONTROL_SELECTOR}')
                || popup.querySelector('[role="button"][tabindex="0"]');
            if (control) {{ control.click(); return 'clicked'; }}
            return 'no-control';
        }})()"#
    );

    let outcome = match session.page().evaluate(close_js).await {
        Ok(result) => result
            .into_value::<String>()
            .unwrap_or_else(|_| "unknown".to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "panel close script failed");
            return;
        }
    };

    if outcome == "no-control" {
        press_escape(session).await;
    }
    if outcome != "absent" {
        wait::settle(CLOSE_SETTLE_MS, 0).await;
    }
}

/// Sends a trusted Escape key press through the input domain.
async fn press_escape(session: &Session) {
    for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
        let event = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key("Escape")
            .build();
        match event {
            Ok(event) => {
                if let Err(e) = session.page().execute(event).await {
                    tracing::debug!(error = %e, "escape dispatch failed during panel cleanup");
                }
            }
            Err(reason) => {
                tracing::debug!(reason, "could not build escape key event");
            }
        }
    }
}

#[cfg(test)]
#[path = "detail_test.rs"]
mod tests;
