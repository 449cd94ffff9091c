use thiserror::Error;

/// Failure kinds for a scrape run.
///
/// Callers branch on the kind: `Timeout` is the only variant eligible for
/// the fallback parse, `ChallengeDetected` aborts the run outright, and the
/// remaining variants are fatal wherever they occur on the primary path.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Cloudflare/Turnstile challenge detected instead of target content")]
    ChallengeDetected,

    #[error("{operation} timed out")]
    Timeout {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Reserved for call sites that reject malformed offer data outright;
    /// the validity predicate itself filters rather than erroring.
    #[error("offer data failed validation: {reason}")]
    Validation { reason: String },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON (de)serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("browser engine failure: {0}")]
    Browser(#[source] anyhow::Error),
}

impl ScraperError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScraperError::Timeout { .. })
    }
}
