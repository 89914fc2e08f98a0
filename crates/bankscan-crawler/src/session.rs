//! Browser session lifecycle.
//!
//! One [`Session`] owns one Chromium process and one live page. The crawler
//! and the detail extractor both borrow the same session and are driven from
//! a single task, so every navigation, wait, scroll and click executes as
//! one ordered sequence of suspending operations — there is never more than
//! one in-flight operation against the page.
//!
//! The launch configuration minimizes bot-detection fingerprints: automation
//! flags disabled, fixed realistic window size, a desktop user agent, and a
//! navigator mask re-applied after every navigation (fresh documents reset
//! injected properties).

use std::path::PathBuf;

use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;

use bankscan_core::CrawlerSettings;

use crate::error::CrawlError;

/// Chromium launch arguments. `--no-sandbox` keeps headless launches working
/// inside containers; the rest strip the automation tells the target site
/// checks for.
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
    "--disable-extensions",
    "--disable-gpu",
    "--no-first-run",
    "--no-default-browser-check",
    "--window-size=1920,1080",
];

/// Navigator mask scripts, re-run after every navigation.
const FINGERPRINT_SCRIPTS: &[&str] = &[
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})",
    "Object.defineProperty(navigator, 'plugins', {get: () => [1, 2, 3, 4, 5]})",
    "Object.defineProperty(navigator, 'languages', {get: () => ['ru-RU', 'ru', 'en-US', 'en']})",
];

/// Well-known Chromium install locations, probed before falling back to
/// `which`.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

pub struct Session {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl Session {
    /// Launches a Chromium session configured for the crawl.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Launch`] if the browser executable cannot be
    /// found or the process fails to start. This is fatal to the run — an
    /// environment problem, not a transient one — and is never retried.
    pub async fn open(settings: &CrawlerSettings, headless: bool) -> Result<Self, CrawlError> {
        let chrome = find_chrome()?;
        tracing::info!(chrome = %chrome.display(), headless, "launching browser session");

        let mut builder = BrowserConfig::builder().chrome_executable(chrome);
        if !headless {
            builder = builder.with_head();
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        builder = builder.arg(format!("--user-agent={}", settings.user_agent));

        let config = builder
            .build()
            .map_err(|reason| CrawlError::Launch { reason })?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Launch {
                reason: e.to_string(),
            })?;

        // CDP event pump; the connection is dead once it yields an error.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Launch {
                reason: format!("could not open initial page: {e}"),
            })?;

        page.execute(SetUserAgentOverrideParams::new(settings.user_agent.clone()))
            .await
            .map_err(|e| CrawlError::Launch {
                reason: format!("could not override user agent: {e}"),
            })?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Navigates the session's page and re-applies the navigator mask.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Navigation`] if the navigation itself fails.
    /// Mask injection failures are logged and swallowed — a partially
    /// masked page is still crawlable.
    pub async fn goto(&self, url: &str) -> Result<(), CrawlError> {
        self.page
            .goto(url)
            .await
            .map_err(|source| CrawlError::Navigation {
                url: url.to_string(),
                source,
            })?;
        self.apply_fingerprint_mask().await;
        Ok(())
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Best-effort shutdown: closes the browser and stops the event pump.
    /// Errors are swallowed — cleanup must never block the caller.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "browser close failed during session shutdown");
        }
        self.handler.abort();
    }

    async fn apply_fingerprint_mask(&self) {
        for script in FINGERPRINT_SCRIPTS {
            if let Err(e) = self.page.evaluate((*script).to_string()).await {
                tracing::debug!(error = %e, "fingerprint mask script failed");
            }
        }
    }
}

/// Locates a Chromium executable.
fn find_chrome() -> Result<PathBuf, CrawlError> {
    for path in CHROME_PATHS {
        let candidate = PathBuf::from(path);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(CrawlError::Launch {
        reason: "Chrome/Chromium executable not found; install chromium or google-chrome"
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_disable_automation_tells() {
        assert!(LAUNCH_ARGS.contains(&"--disable-blink-features=AutomationControlled"));
        assert!(LAUNCH_ARGS.contains(&"--no-sandbox"));
        assert!(LAUNCH_ARGS.iter().any(|a| a.starts_with("--window-size=")));
    }

    #[test]
    fn fingerprint_mask_covers_webdriver_plugins_languages() {
        let joined = FINGERPRINT_SCRIPTS.join("\n");
        assert!(joined.contains("webdriver"));
        assert!(joined.contains("plugins"));
        assert!(joined.contains("languages"));
    }
}
