//! Browsing-session orchestration.
//!
//! One pipeline per run: session setup → navigate → challenge check →
//! content wait → extract → persist, with a one-shot static-HTML fallback
//! when the primary path times out. The session is closed exactly once on
//! every exit path, after all diagnostic and fallback work.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::browser::{BrowserDriver, CardRecord, ChallengeProbe, ExtractionSpec};
use crate::chrome::ChromeDriver;
use crate::config::{ConfigOverrides, ScrapingConfig};
use crate::error::ScraperError;
use crate::offer::{clean_text, Offer, RawOffer};
use crate::parser;
use crate::storage;

/// Primary content marker of the hydrated listing page.
const CONTENT_MARKER: &str = "[data-t='title']";

/// Fixed wait after the marker appears, letting client-side rendering
/// finish before extraction.
const SETTLE_DELAY: Duration = Duration::from_millis(750);

/// Forced independent of any system default; extracted text depends on the
/// target market.
const ACCEPT_LANGUAGE: &str = "de-DE,de;q=0.9,en;q=0.8";

/// Known anti-bot interstitial phrases in the target page's language, plus
/// the literal vendor names.
const CHALLENGE_PROBE: ChallengeProbe = ChallengeProbe {
    title_phrase: "Nur einen Moment",
    body_phrases: &[
        "Bestätigen Sie, dass Sie ein Mensch sind",
        "Cloudflare",
        "Turnstile",
        "muss die Sicherheit Ihrer Verbindung überprüfen",
    ],
};

const CARD_SPEC: ExtractionSpec = ExtractionSpec {
    card_selector: "[data-t]",
    title_selector: "[data-t='title']",
    price_selector: "[data-t='price']",
    retailer_selector: "[data-t='merchant']",
    link_selector: "a",
};

/// Run a full scrape with the given overrides applied over the defaults.
///
/// On success the persisted offer list is read back from disk and returned,
/// so callers observe exactly what was written. Unrecoverable failures
/// surface as the originating [`ScraperError`]; zero valid offers from a
/// successfully loaded page is not a failure.
pub async fn run_scraper(overrides: ConfigOverrides) -> Result<Vec<Offer>, ScraperError> {
    let config = ScrapingConfig::default().with_overrides(overrides);
    let mut driver = ChromeDriver::launch(&config)?;
    run_with_driver(&config, &mut driver).await?;
    storage::read_back(&config.output_path)
}

pub(crate) async fn run_with_driver<D: BrowserDriver>(
    config: &ScrapingConfig,
    driver: &mut D,
) -> Result<(), ScraperError> {
    let outcome = scrape(config, driver).await;
    driver.close();
    outcome
}

async fn scrape<D: BrowserDriver>(
    config: &ScrapingConfig,
    driver: &mut D,
) -> Result<(), ScraperError> {
    prepare_session(config, driver)?;
    match scrape_live(config, driver).await {
        Ok(()) => Ok(()),
        Err(original @ ScraperError::Timeout { .. }) => {
            recover_from_timeout(config, driver, original)
        }
        Err(ScraperError::ChallengeDetected) => {
            error!("Challenge detected. Provide cookies from a manual session to bypass.");
            error!(
                "Steps: 1) Open the target URL in normal Chrome. 2) Solve the challenge. \
                 3) Export cookies for the target domain. 4) Add them to the config cookies."
            );
            Err(ScraperError::ChallengeDetected)
        }
        Err(err) => Err(err),
    }
}

fn prepare_session<D: BrowserDriver>(
    config: &ScrapingConfig,
    driver: &mut D,
) -> Result<(), ScraperError> {
    driver.set_timeouts(
        Duration::from_millis(config.navigation_timeout_ms()),
        Duration::from_millis(config.timeout_ms),
    );

    if !config.cookies.is_empty() {
        // Best-effort: a run without these cookies still stands a chance.
        match driver.add_cookies(&config.cookies) {
            Ok(()) => info!("Injected {} cookies into context.", config.cookies.len()),
            Err(e) => warn!("Failed to add cookies: {e}"),
        }
    }

    if !config.bypass_cloudflare {
        driver.block_heavy_resources()?;
    }
    driver.force_accept_language(ACCEPT_LANGUAGE)?;
    Ok(())
}

async fn scrape_live<D: BrowserDriver>(
    config: &ScrapingConfig,
    driver: &mut D,
) -> Result<(), ScraperError> {
    info!("Navigating to deals listing...");
    driver.navigate(&config.url)?;

    if driver.challenge_present(&CHALLENGE_PROBE)? {
        return Err(ScraperError::ChallengeDetected);
    }

    driver.wait_for_selector(CONTENT_MARKER, Duration::from_millis(config.timeout_ms))?;
    tokio::time::sleep(SETTLE_DELAY).await;

    info!("Extracting offers...");
    let cards = driver.extract_cards(&CARD_SPEC)?;
    let offers = validate_cards(cards, config);

    storage::persist(&offers, &config.output_path)?;
    info!(
        "Saved {} offers to {}",
        offers.len(),
        config.output_path.display()
    );
    Ok(())
}

/// Normalize raw card records, stamp them, and narrow to valid offers.
fn validate_cards(cards: Vec<CardRecord>, config: &ScrapingConfig) -> Vec<Offer> {
    let scraped_at = Utc::now();
    cards
        .into_iter()
        .map(|card| RawOffer {
            title: clean_text(card.title.as_deref()),
            price: clean_text(card.price.as_deref()),
            retailer: clean_text(card.retailer.as_deref()),
            link: card.link,
            scraped_at,
        })
        .filter_map(|raw| raw.into_valid(&config.brand_pattern))
        .collect()
}

/// Timeout branch: capture diagnostics, then try the one-shot static parse
/// of the captured source. Every local failure here is logged and the
/// original timeout propagates instead.
fn recover_from_timeout<D: BrowserDriver>(
    config: &ScrapingConfig,
    driver: &mut D,
    original: ScraperError,
) -> Result<(), ScraperError> {
    error!("Navigation or selector wait timed out. Capturing diagnostics...");

    let html = match driver.page_content() {
        Ok(html) => html,
        Err(e) => {
            error!("Failed to capture page source: {e}");
            return Err(original);
        }
    };
    if let Err(e) = storage::write_diagnostic(&html, &config.output_path) {
        error!("Failed to write diagnostic snapshot: {e}");
        return Err(original);
    }

    if !config.fallback_parse {
        return Err(original);
    }

    let offers = parser::parse_offers_from_html(&html, config);
    if offers.is_empty() {
        warn!("Fallback parse found no matching offers in captured HTML.");
        return Err(original);
    }
    if let Err(e) = storage::persist(&offers, &config.output_path) {
        error!("Failed to persist fallback offers: {e}");
        return Err(original);
    }
    info!("Fallback extracted {} offers after timeout.", offers.len());
    Ok(())
}
