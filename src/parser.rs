//! Static-HTML fallback extraction.
//!
//! The non-JS rendition of the listing page uses a different layout than the
//! hydrated app (`article.thread` containers instead of `[data-t]` cards),
//! so this path has its own selector set.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::config::ScrapingConfig;
use crate::offer::{clean_text, Offer};

static CONTAINER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article.thread").unwrap());
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("strong.thread-title a.thread-link").unwrap());
static PRICE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".thread-price").unwrap());
static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());

/// "Available at <retailer>" marker in the listing's market language.
static RETAILER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Verfügbar bei\s+(.*)").unwrap());

/// Extract brand-matching offers from a captured page snapshot.
///
/// Containers that yield no title, or a title that misses the brand
/// pattern, contribute nothing; that is filtering, not an error.
pub fn parse_offers_from_html(html: &str, config: &ScrapingConfig) -> Vec<Offer> {
    let document = Html::parse_document(html);
    let mut offers = Vec::new();

    for container in document.select(&CONTAINER_SELECTOR) {
        let title_el = container.select(&TITLE_SELECTOR).next();
        let title = title_el
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let price = container
            .select(&PRICE_SELECTOR)
            .next()
            .and_then(|el| clean_text(Some(&el.text().collect::<String>())));

        let retailer = container
            .select(&SPAN_SELECTOR)
            .map(|el| el.text().collect::<String>())
            .find_map(|text| {
                RETAILER_RE
                    .captures(&text)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| clean_text(Some(m.as_str())))
            });

        let link = title_el
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string);

        if !title.is_empty() && config.brand_pattern.is_match(&title) {
            offers.push(Offer {
                title,
                price,
                retailer,
                link,
                scraped_at: Utc::now(),
            });
        }
    }

    offers
}
