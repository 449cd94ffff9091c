//! Capability surface the orchestrator needs from a browser engine.
//!
//! The production implementation ([`crate::chrome::ChromeDriver`]) wraps
//! Headless Chrome over CDP; tests drive the orchestrator with a scripted
//! stand-in. In-page work crosses this boundary as serialized descriptions
//! (selectors, phrase lists) and comes back as structured data; no closures
//! are shared with the remote document environment.

use std::time::Duration;

use serde::Deserialize;

use crate::config::Cookie;
use crate::error::ScraperError;

/// Phrases whose presence in the loaded document identifies an anti-bot
/// interstitial instead of real content.
#[derive(Debug, Clone)]
pub struct ChallengeProbe {
    /// Matched against `document.title`.
    pub title_phrase: &'static str,
    /// Matched against the full body text.
    pub body_phrases: &'static [&'static str],
}

/// Selector set describing one batch card extraction.
#[derive(Debug, Clone)]
pub struct ExtractionSpec {
    pub card_selector: &'static str,
    pub title_selector: &'static str,
    pub price_selector: &'static str,
    pub retailer_selector: &'static str,
    pub link_selector: &'static str,
}

/// One card's fields as returned by the in-page extraction, untrimmed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardRecord {
    pub title: Option<String>,
    pub price: Option<String>,
    pub retailer: Option<String>,
    pub link: Option<String>,
}

pub trait BrowserDriver {
    /// Best-effort: callers log and continue on failure.
    fn add_cookies(&mut self, cookies: &[Cookie]) -> Result<(), ScraperError>;

    /// Navigation budget and the default budget for in-page operations.
    fn set_timeouts(&mut self, navigation: Duration, operation: Duration);

    /// Abort image/font/media requests to cut load and avoid
    /// font-fingerprinting triggers.
    fn block_heavy_resources(&mut self) -> Result<(), ScraperError>;

    /// Pin the Accept-Language request header, independent of any system
    /// default.
    fn force_accept_language(&mut self, value: &str) -> Result<(), ScraperError>;

    /// Navigate waiting for DOM content. Errors attributable to the budget
    /// come back as [`ScraperError::Timeout`].
    fn navigate(&mut self, url: &str) -> Result<(), ScraperError>;

    /// Evaluate the challenge probe inside the loaded page.
    fn challenge_present(&mut self, probe: &ChallengeProbe) -> Result<bool, ScraperError>;

    /// Wait for the primary content marker. A wait that fails here means
    /// the marker never showed up inside the budget; it is always
    /// timeout-classified.
    fn wait_for_selector(&mut self, selector: &str, timeout: Duration)
        -> Result<(), ScraperError>;

    /// Batch-extract every card matching the spec via one in-page
    /// evaluation.
    fn extract_cards(&mut self, spec: &ExtractionSpec) -> Result<Vec<CardRecord>, ScraperError>;

    /// Full rendered document source, for diagnostics and fallback parsing.
    fn page_content(&mut self) -> Result<String, ScraperError>;

    /// Tear the session down. Runs exactly once on every exit path, after
    /// all diagnostic/fallback work.
    fn close(&mut self);
}
