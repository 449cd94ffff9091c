use std::env;
use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Cookie injected into the browser context before navigation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: Option<String>,
}

/// Immutable run parameters. Built once per run from `Default` plus any
/// caller overrides, then consumed read-only.
#[derive(Debug, Clone)]
pub struct ScrapingConfig {
    pub url: String,
    pub headless: bool,
    /// Per-operation budget in milliseconds. Navigation gets 1.5x this.
    pub timeout_ms: u64,
    pub output_path: PathBuf,
    /// Case-insensitive pattern an offer title must match to be kept.
    pub brand_pattern: Regex,
    pub cookies: Vec<Cookie>,
    pub user_agent: Option<String>,
    /// When set, skip resource blocking so the page renders fully.
    /// Cloudflare is sensitive to incomplete resource loading.
    pub bypass_cloudflare: bool,
    /// Enables the static-HTML fallback parse after a timeout.
    pub fallback_parse: bool,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            url: "https://www.mydealz.de/gruppe/energy-drinks?retailers=78%2C122%2C27%2C2977%2C49%2C2561&hide_expired=1&sortBy=new&temperatureFrom=any".to_string(),
            headless: true,
            timeout_ms: 5000,
            output_path: PathBuf::from("data/offers.json"),
            brand_pattern: Regex::new(r"(?i)Red\s?Bull|Monster")
                .expect("default brand pattern is valid"),
            cookies: default_cookie_jar(),
            user_agent: Some("Chrome/118.0.0.0".to_string()),
            bypass_cloudflare: true,
            fallback_parse: true,
        }
    }
}

impl ScrapingConfig {
    /// Apply each present override field over `self`. Absent fields keep
    /// their current value; there is no implicit merge.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.url {
            self.url = url;
        }
        if let Some(headless) = overrides.headless {
            self.headless = headless;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(output_path) = overrides.output_path {
            self.output_path = output_path;
        }
        if let Some(brand_pattern) = overrides.brand_pattern {
            self.brand_pattern = brand_pattern;
        }
        if let Some(cookies) = overrides.cookies {
            self.cookies = cookies;
        }
        if let Some(user_agent) = overrides.user_agent {
            self.user_agent = Some(user_agent);
        }
        if let Some(bypass) = overrides.bypass_cloudflare {
            self.bypass_cloudflare = bypass;
        }
        if let Some(fallback) = overrides.fallback_parse {
            self.fallback_parse = fallback;
        }
        self
    }

    /// Navigation budget: pages are slower to reach than in-page waits.
    pub fn navigation_timeout_ms(&self) -> u64 {
        self.timeout_ms * 3 / 2
    }
}

/// Partial configuration; every field optional.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub headless: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub output_path: Option<PathBuf>,
    pub brand_pattern: Option<Regex>,
    pub cookies: Option<Vec<Cookie>>,
    pub user_agent: Option<String>,
    pub bypass_cloudflare: Option<bool>,
    pub fallback_parse: Option<bool>,
}

impl ConfigOverrides {
    /// Read overrides from `SCRAPER_*` environment variables. Unset or
    /// unparseable variables leave the default in place.
    pub fn from_env() -> Self {
        Self {
            url: env::var("SCRAPER_URL").ok(),
            headless: env::var("SCRAPER_HEADLESS").ok().map(|v| parse_bool(&v)),
            timeout_ms: env::var("SCRAPER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok()),
            output_path: env::var("SCRAPER_OUTPUT_PATH").ok().map(PathBuf::from),
            brand_pattern: env::var("SCRAPER_BRAND_PATTERN").ok().and_then(|v| {
                match Regex::new(&v) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!("Ignoring invalid SCRAPER_BRAND_PATTERN: {}", e);
                        None
                    }
                }
            }),
            cookies: None,
            user_agent: env::var("SCRAPER_USER_AGENT").ok(),
            bypass_cloudflare: env::var("SCRAPER_BYPASS_CLOUDFLARE")
                .ok()
                .map(|v| parse_bool(&v)),
            fallback_parse: env::var("SCRAPER_FALLBACK_PARSE")
                .ok()
                .map(|v| parse_bool(&v)),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

/// Session/consent cookies captured from a manual browser session against
/// mydealz.de. Stale values degrade to an anonymous session rather than
/// breaking the run.
fn default_cookie_jar() -> Vec<Cookie> {
    let jar = [
        (
            "__eoi",
            "ID=c732aabef2c61ea8:T=1762855520:RT=1762855520:S=AA-AfjZM6j3Ng9P8ple2Bk4AjeMR",
        ),
        ("cookie_policy_agreement", "3"),
        ("dont-track", "1"),
        ("f_c", "0"),
        ("f_v", "%22eb7cdb48-bee5-11f0-9279-0242ac110002%22"),
        ("g_p", "0"),
        (
            "pepper_session",
            "%22QbEid4p9cpIWWKuz6sHJzx8wXkKBem1HnSZcwAIK%22",
        ),
        ("u_l", "0"),
    ];
    jar.iter()
        .map(|(name, value)| Cookie {
            name: (*name).to_string(),
            value: (*value).to_string(),
            domain: ".mydealz.de".to_string(),
            path: Some("/".to_string()),
        })
        .collect()
}
