use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A validated, brand-matching deal record. This is the only shape that
/// reaches the output file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub title: String,
    pub price: Option<String>,
    pub retailer: Option<String>,
    pub link: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Pre-validation intermediate: identical to [`Offer`] except the title may
/// still be unresolved. Exists only as input to [`is_valid_offer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawOffer {
    pub title: Option<String>,
    pub price: Option<String>,
    pub retailer: Option<String>,
    pub link: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl RawOffer {
    /// Explicit narrowing from the raw shape to the validated shape. No
    /// data transformation happens here beyond the narrowing itself.
    pub fn into_valid(self, brand_pattern: &Regex) -> Option<Offer> {
        if !is_valid_offer(&self, brand_pattern) {
            return None;
        }
        let title = self.title?;
        Some(Offer {
            title,
            price: self.price,
            retailer: self.retailer,
            link: self.link,
            scraped_at: self.scraped_at,
        })
    }
}

/// True iff the title is present, non-empty after trimming, and matches the
/// configured brand pattern.
pub fn is_valid_offer(raw: &RawOffer, brand_pattern: &Regex) -> bool {
    match raw.title.as_deref() {
        Some(title) => {
            let title = title.trim();
            !title.is_empty() && brand_pattern.is_match(title)
        }
        None => false,
    }
}

/// Trim surrounding whitespace and collapse embedded newlines to single
/// spaces. Absent or empty-after-trim input maps to `None`.
pub fn clean_text(text: Option<&str>) -> Option<String> {
    let trimmed = text?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.replace('\n', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand() -> Regex {
        Regex::new(r"(?i)Red\s?Bull|Monster").unwrap()
    }

    fn raw(title: Option<&str>) -> RawOffer {
        RawOffer {
            title: title.map(str::to_string),
            price: None,
            retailer: None,
            link: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn missing_or_blank_title_is_invalid() {
        assert!(!is_valid_offer(&raw(None), &brand()));
        assert!(!is_valid_offer(&raw(Some("")), &brand()));
        assert!(!is_valid_offer(&raw(Some("   \n ")), &brand()));
    }

    #[test]
    fn non_matching_title_is_invalid() {
        assert!(!is_valid_offer(&raw(Some("Generic Soda 6-Pack")), &brand()));
    }

    #[test]
    fn matching_titles_are_valid() {
        assert!(is_valid_offer(&raw(Some("Red Bull Editions 4-Pack")), &brand()));
        assert!(is_valid_offer(&raw(Some("RedBull Sugarfree")), &brand()));
        assert!(is_valid_offer(&raw(Some("MONSTER Ultra 0,5l")), &brand()));
        assert!(is_valid_offer(&raw(Some("  monster energy  ")), &brand()));
    }

    #[test]
    fn into_valid_narrows_without_transforming() {
        let raw = RawOffer {
            title: Some("Red Bull 24er Palette".to_string()),
            price: Some("21,99€".to_string()),
            retailer: Some("Kaufland".to_string()),
            link: Some("/deals/red-bull-123".to_string()),
            scraped_at: Utc::now(),
        };
        let offer = raw.clone().into_valid(&brand()).unwrap();
        assert_eq!(offer.title, "Red Bull 24er Palette");
        assert_eq!(offer.price.as_deref(), Some("21,99€"));
        assert_eq!(offer.retailer.as_deref(), Some("Kaufland"));
        assert_eq!(offer.link.as_deref(), Some("/deals/red-bull-123"));
        assert_eq!(offer.scraped_at, raw.scraped_at);

        assert!(RawOffer { title: None, ..raw }.into_valid(&brand()).is_none());
    }

    #[test]
    fn clean_text_normalizes() {
        assert_eq!(clean_text(None), None);
        assert_eq!(clean_text(Some("")), None);
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(Some("a\nb")), Some("a b".to_string()));
        assert_eq!(clean_text(Some("  x  ")), Some("x".to_string()));
        assert_eq!(
            clean_text(Some("\n4,99€\nbei Rewe\n")),
            Some("4,99€ bei Rewe".to_string())
        );
    }

    #[test]
    fn offer_serializes_with_camel_case_keys() {
        let offer = Offer {
            title: "Red Bull".to_string(),
            price: None,
            retailer: Some("Rewe".to_string()),
            link: None,
            scraped_at: Utc::now(),
        };
        let json = serde_json::to_string(&offer).unwrap();
        assert!(json.contains("\"scrapedAt\""));
        assert!(json.contains("\"price\":null"));
    }
}
