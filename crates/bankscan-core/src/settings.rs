//! Crawler settings loaded from environment variables.
//!
//! The target site has no reliable "content loaded" signal, so the crawler
//! leans on a family of bounded waits and fixed settling delays. All of the
//! knobs live here with `BANKSCAN_`-prefixed overrides; the defaults match
//! the timings that have proven stable against the live site.

use std::path::PathBuf;
use std::time::Duration;

use crate::ConfigError;

/// Default desktop user agent presented by the automated browser.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone)]
pub struct CrawlerSettings {
    pub user_agent: String,
    pub market_path: PathBuf,
    pub output_dir: PathBuf,
    /// Bounded wait for `document.readyState == "complete"`.
    pub page_ready_timeout_secs: u64,
    /// Bounded wait for the offer-count indicator (absence is non-fatal).
    pub offers_count_timeout_secs: u64,
    /// Bounded wait for the detail panel to appear after a trigger click.
    pub popup_timeout_secs: u64,
    /// Bounded wait for a pagination link (absence ends the crawl).
    pub page_link_timeout_secs: u64,
    /// Settling delay after document-ready (client-side modules keep
    /// rendering after the ready event fires).
    pub settle_load_ms: u64,
    /// Settling delay after each lazy-load scroll.
    pub settle_scroll_ms: u64,
    /// Settling delay for the detail panel's render animation.
    pub settle_popup_ms: u64,
    /// Pause between consecutive detail extractions.
    pub settle_between_details_ms: u64,
    /// Random jitter added on top of every settling delay.
    pub settle_jitter_ms: u64,
    /// Catalog item lookup attempts before declaring a soft failure.
    pub item_attempts: u32,
    /// Independent crawl pipelines allowed to run at once (one browser
    /// session each).
    pub max_concurrent_sessions: usize,
}

impl CrawlerSettings {
    #[must_use]
    pub fn page_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.page_ready_timeout_secs)
    }

    #[must_use]
    pub fn offers_count_timeout(&self) -> Duration {
        Duration::from_secs(self.offers_count_timeout_secs)
    }

    #[must_use]
    pub fn popup_timeout(&self) -> Duration {
        Duration::from_secs(self.popup_timeout_secs)
    }

    #[must_use]
    pub fn page_link_timeout(&self) -> Duration {
        Duration::from_secs(self.page_link_timeout_secs)
    }
}

/// Load crawler settings from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env
/// vars.
///
/// # Errors
///
/// Returns `ConfigError` if an override value fails to parse.
pub fn load_settings() -> Result<CrawlerSettings, ConfigError> {
    dotenvy::dotenv().ok();
    load_settings_from_env()
}

/// Load crawler settings from environment variables already in the process.
///
/// # Errors
///
/// Returns `ConfigError` if an override value fails to parse.
pub fn load_settings_from_env() -> Result<CrawlerSettings, ConfigError> {
    build_settings(|key| std::env::var(key))
}

/// Build settings using the provided env-var lookup function.
///
/// Parsing is decoupled from the real environment so tests can drive it with
/// a plain `HashMap` lookup.
fn build_settings<F>(lookup: F) -> Result<CrawlerSettings, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    Ok(CrawlerSettings {
        user_agent: or_default("BANKSCAN_USER_AGENT", DEFAULT_USER_AGENT),
        market_path: PathBuf::from(or_default("BANKSCAN_MARKET_PATH", "./config/market.yaml")),
        output_dir: PathBuf::from(or_default("BANKSCAN_OUTPUT_DIR", "./data")),
        page_ready_timeout_secs: parse_u64("BANKSCAN_PAGE_READY_TIMEOUT_SECS", "15")?,
        offers_count_timeout_secs: parse_u64("BANKSCAN_OFFERS_COUNT_TIMEOUT_SECS", "20")?,
        popup_timeout_secs: parse_u64("BANKSCAN_POPUP_TIMEOUT_SECS", "15")?,
        page_link_timeout_secs: parse_u64("BANKSCAN_PAGE_LINK_TIMEOUT_SECS", "5")?,
        settle_load_ms: parse_u64("BANKSCAN_SETTLE_LOAD_MS", "5000")?,
        settle_scroll_ms: parse_u64("BANKSCAN_SETTLE_SCROLL_MS", "3000")?,
        settle_popup_ms: parse_u64("BANKSCAN_SETTLE_POPUP_MS", "3000")?,
        settle_between_details_ms: parse_u64("BANKSCAN_SETTLE_BETWEEN_DETAILS_MS", "3000")?,
        settle_jitter_ms: parse_u64("BANKSCAN_SETTLE_JITTER_MS", "400")?,
        item_attempts: parse_u32("BANKSCAN_ITEM_ATTEMPTS", "3")?,
        max_concurrent_sessions: parse_usize("BANKSCAN_MAX_CONCURRENT_SESSIONS", "1")?,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn build_settings_defaults() {
        let map: HashMap<&str, &str> = HashMap::new();
        let settings = build_settings(lookup_from_map(&map)).unwrap();
        assert!(settings.user_agent.contains("Mozilla/5.0"));
        assert_eq!(settings.market_path, PathBuf::from("./config/market.yaml"));
        assert_eq!(settings.output_dir, PathBuf::from("./data"));
        assert_eq!(settings.page_ready_timeout_secs, 15);
        assert_eq!(settings.offers_count_timeout_secs, 20);
        assert_eq!(settings.popup_timeout_secs, 15);
        assert_eq!(settings.page_link_timeout_secs, 5);
        assert_eq!(settings.settle_load_ms, 5000);
        assert_eq!(settings.item_attempts, 3);
        assert_eq!(settings.max_concurrent_sessions, 1);
    }

    #[test]
    fn build_settings_overrides() {
        let mut map = HashMap::new();
        map.insert("BANKSCAN_POPUP_TIMEOUT_SECS", "30");
        map.insert("BANKSCAN_ITEM_ATTEMPTS", "5");
        map.insert("BANKSCAN_OUTPUT_DIR", "/tmp/bankscan");
        let settings = build_settings(lookup_from_map(&map)).unwrap();
        assert_eq!(settings.popup_timeout_secs, 30);
        assert_eq!(settings.item_attempts, 5);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/bankscan"));
    }

    #[test]
    fn build_settings_invalid_number() {
        let mut map = HashMap::new();
        map.insert("BANKSCAN_SETTLE_LOAD_MS", "soon");
        let result = build_settings(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BANKSCAN_SETTLE_LOAD_MS"),
            "expected InvalidEnvVar(BANKSCAN_SETTLE_LOAD_MS), got: {result:?}"
        );
    }

    #[test]
    fn timeout_accessors_convert_to_durations() {
        let map: HashMap<&str, &str> = HashMap::new();
        let settings = build_settings(lookup_from_map(&map)).unwrap();
        assert_eq!(settings.popup_timeout(), Duration::from_secs(15));
        assert_eq!(settings.page_link_timeout(), Duration::from_secs(5));
    }
}
