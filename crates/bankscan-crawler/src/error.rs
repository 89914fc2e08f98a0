use chromiumoxide::error::CdpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The automated browser could not be started. Environment
    /// misconfiguration, not a transient condition — aborts the whole run.
    #[error("failed to launch browser session: {reason}")]
    Launch { reason: String },

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: CdpError,
    },

    #[error("failed to snapshot page content: {source}")]
    Snapshot {
        #[source]
        source: CdpError,
    },

    #[error("script evaluation failed while {context}: {source}")]
    Evaluate {
        context: String,
        #[source]
        source: CdpError,
    },

    #[error("detail trigger {ordinal} not present in the document")]
    TriggerMissing { ordinal: usize },

    #[error("detail panel did not appear for trigger {ordinal} within {waited_ms}ms")]
    PanelTimeout { ordinal: usize, waited_ms: u64 },
}

impl CrawlError {
    /// `true` for the environment-fatal category that must abort the entire
    /// run; everything else degrades to partial data.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::Launch { .. })
    }
}
