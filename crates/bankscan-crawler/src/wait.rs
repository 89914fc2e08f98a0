//! The crawl's single wait policy.
//!
//! The target renders through client-side modules with no reliable
//! completion signal, so synchronization is a mix of bounded condition
//! waits (polled JS predicates) and fixed settling delays with a little
//! random jitter. Keeping every wait here — rather than scattered across
//! call sites — means the retry/tuning strategy lives in one place.
//!
//! Every wait is bounded; there is no unbounded wait anywhere in the crawl.

use std::time::Duration;

use chromiumoxide::Page;
use rand::Rng;

/// Poll interval for condition waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Repeatedly evaluates a JS predicate until it returns `true` or the
/// timeout elapses. Evaluation errors count as "not yet" — mid-render
/// documents routinely reject scripts for a few ticks.
pub async fn wait_until(page: &Page, predicate: &str, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let satisfied = match page.evaluate(predicate.to_string()).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                tracing::debug!(error = %e, "wait predicate evaluation failed");
                false
            }
        };
        if satisfied {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Bounded wait for an element matching `selector` to exist.
pub async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
    let predicate = format!("document.querySelector('{selector}') !== null");
    wait_until(page, &predicate, timeout).await
}

/// Bounded wait for `document.readyState === "complete"`. Readiness alone
/// is not sufficient for this target — always follow with [`settle`].
pub async fn wait_for_ready(page: &Page, timeout: Duration) -> bool {
    wait_until(page, r#"document.readyState === "complete""#, timeout).await
}

/// Fixed settling delay plus random jitter. The jitter keeps the request
/// rhythm from looking machine-regular.
pub async fn settle(base_ms: u64, jitter_ms: u64) {
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ms)
    };
    tokio::time::sleep(Duration::from_millis(base_ms + jitter)).await;
}

/// Scrolls to the vertical midpoint of the document (lazy-load forcing,
/// first stage).
pub async fn scroll_to_midpoint(page: &Page) {
    run_scroll(page, "window.scrollTo(0, document.body.scrollHeight / 2);").await;
}

/// Scrolls to the bottom of the document (lazy-load forcing, second stage
/// and re-scroll between item-lookup attempts).
pub async fn scroll_to_bottom(page: &Page) {
    run_scroll(page, "window.scrollTo(0, document.body.scrollHeight);").await;
}

async fn run_scroll(page: &Page, script: &str) {
    if let Err(e) = page.evaluate(script.to_string()).await {
        tracing::debug!(error = %e, "scroll script failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settle_respects_base_and_jitter_bounds() {
        let started = tokio::time::Instant::now();
        settle(10, 20).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(10));
        // Base + max jitter, with scheduler slack.
        assert!(elapsed < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn settle_zero_jitter_is_exact_base() {
        let started = tokio::time::Instant::now();
        settle(5, 0).await;
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
