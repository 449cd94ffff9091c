//! Scrapes the mydealz energy-drinks listing for brand-matching offers and
//! persists them as JSON.
//!
//! The primary path drives a Headless Chrome session through challenge
//! detection, a content wait, and a batch DOM extraction; when that times
//! out, a captured page snapshot goes through a static-HTML fallback parse
//! instead. See [`run_scraper`] for the entry point.

pub mod browser;
pub mod chrome;
pub mod config;
pub mod crawler;
pub mod error;
pub mod offer;
pub mod parser;
pub mod stealth;
pub mod storage;

pub use config::{ConfigOverrides, Cookie, ScrapingConfig};
pub use crawler::run_scraper;
pub use error::ScraperError;
pub use offer::{clean_text, is_valid_offer, Offer, RawOffer};
pub use parser::parse_offers_from_html;
