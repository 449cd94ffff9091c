//! Headless Chrome implementation of the [`BrowserDriver`] capability.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision};
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Emulation::{SetLocaleOverride, SetTimezoneOverride};
use headless_chrome::protocol::cdp::Fetch::{
    events::RequestPausedEvent, FailRequest, RequestPattern, RequestStage,
};
use headless_chrome::protocol::cdp::Network::{ErrorReason, ResourceType};
use headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{info, warn};

use crate::browser::{BrowserDriver, CardRecord, ChallengeProbe, ExtractionSpec};
use crate::config::ScrapingConfig;
use crate::error::ScraperError;
use crate::stealth;

/// Locale/timezone of the target market. Extracted price and date text
/// depend on these, so they are pinned regardless of machine locale.
const TARGET_LOCALE: &str = "de-DE";
const TARGET_TIMEZONE: &str = "Europe/Berlin";

pub struct ChromeDriver {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    user_agent: String,
    navigation_timeout: Duration,
    operation_timeout: Duration,
}

impl ChromeDriver {
    /// Launch Chrome honoring the configured headless flag, pin the context
    /// to the target market, and inject the stealth script before any
    /// navigation.
    pub fn launch(config: &ScrapingConfig) -> Result<Self, ScraperError> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| stealth::pick_user_agent().to_string());
        let ua_arg = format!("--user-agent={user_agent}");

        let mut args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--window-position=0,0"),
        ];
        args.push(OsStr::new(&ua_arg));
        if config.headless {
            // Modern headless mode goes through the arg, not the flag.
            args.push(OsStr::new("--headless=new"));
        }

        info!("Launching browser (headless: {})...", config.headless);
        let browser = Browser::new(LaunchOptions {
            headless: false,
            window_size: Some((1920, 1080)),
            args,
            ..Default::default()
        })
        .map_err(ScraperError::Browser)?;

        let tab = browser.new_tab().map_err(ScraperError::Browser)?;

        tab.call_method(SetTimezoneOverride {
            timezone_id: TARGET_TIMEZONE.to_string(),
        })
        .map_err(ScraperError::Browser)?;
        tab.call_method(SetLocaleOverride {
            locale: Some(TARGET_LOCALE.to_string()),
        })
        .map_err(ScraperError::Browser)?;

        tab.call_method(AddScriptToEvaluateOnNewDocument {
            source: stealth::stealth_script().to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(ScraperError::Browser)?;

        let operation_timeout = Duration::from_millis(config.timeout_ms);
        Ok(Self {
            browser: Some(browser),
            tab,
            user_agent,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms()),
            operation_timeout,
        })
    }
}

/// Map an engine error to the tagged model: budget overruns become
/// `Timeout`, everything else stays a generic engine failure.
fn classify(operation: &'static str, err: anyhow::Error) -> ScraperError {
    if err.downcast_ref::<headless_chrome::util::Timeout>().is_some() {
        ScraperError::Timeout {
            operation,
            source: err,
        }
    } else {
        ScraperError::Browser(err)
    }
}

impl BrowserDriver for ChromeDriver {
    fn add_cookies(&mut self, cookies: &[crate::config::Cookie]) -> Result<(), ScraperError> {
        // Injected on about:blank with an explicit domain, before any
        // navigation.
        for cookie in cookies {
            self.tab
                .call_method(Network::SetCookie {
                    name: cookie.name.clone(),
                    value: cookie.value.clone(),
                    url: None,
                    domain: Some(cookie.domain.clone()),
                    path: cookie.path.clone(),
                    secure: None,
                    http_only: None,
                    same_site: None,
                    expires: None,
                    priority: None,
                    same_party: None,
                    source_scheme: None,
                    source_port: None,
                    partition_key: None,
                })
                .map_err(ScraperError::Browser)?;
        }
        Ok(())
    }

    fn set_timeouts(&mut self, navigation: Duration, operation: Duration) {
        self.navigation_timeout = navigation;
        self.operation_timeout = operation;
        self.tab.set_default_timeout(operation);
    }

    fn block_heavy_resources(&mut self) -> Result<(), ScraperError> {
        // Only the heavy resource classes get paused, so the interceptor
        // unconditionally aborts whatever reaches it.
        let patterns = vec![
            heavy_pattern(ResourceType::Image),
            heavy_pattern(ResourceType::Font),
            heavy_pattern(ResourceType::Media),
        ];
        self.tab
            .enable_fetch(Some(&patterns), None)
            .map_err(ScraperError::Browser)?;

        let interceptor: Arc<dyn RequestInterceptor + Send + Sync> = Arc::new(
            |_transport: Arc<Transport>, _session_id: SessionId, event: RequestPausedEvent| {
                RequestPausedDecision::Fail(FailRequest {
                    request_id: event.params.request_id,
                    error_reason: ErrorReason::Aborted,
                })
            },
        );
        self.tab
            .enable_request_interception(interceptor)
            .map_err(ScraperError::Browser)?;
        Ok(())
    }

    fn force_accept_language(&mut self, value: &str) -> Result<(), ScraperError> {
        self.tab
            .set_user_agent(&self.user_agent, Some(value), None)
            .map_err(ScraperError::Browser)
    }

    fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        // Navigation runs on its own, larger budget; restore the
        // per-operation default afterwards either way.
        self.tab.set_default_timeout(self.navigation_timeout);
        let outcome = self
            .tab
            .navigate_to(url)
            .map_err(ScraperError::Browser)
            .and_then(|tab| {
                tab.wait_until_navigated()
                    .map(|_| ())
                    .map_err(|e| classify("navigation", e))
            });
        self.tab.set_default_timeout(self.operation_timeout);
        outcome
    }

    fn challenge_present(&mut self, probe: &ChallengeProbe) -> Result<bool, ScraperError> {
        let script = build_challenge_script(probe);
        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(ScraperError::Browser)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        // A failed wait means the marker never showed up inside the budget,
        // whatever the engine reports underneath.
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| ScraperError::Timeout {
                operation: "content wait",
                source: e,
            })
    }

    fn extract_cards(&mut self, spec: &ExtractionSpec) -> Result<Vec<CardRecord>, ScraperError> {
        let script = build_extraction_script(spec);
        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(ScraperError::Browser)?;
        let value = result
            .value
            .ok_or_else(|| ScraperError::Browser(anyhow!("extraction script returned no value")))?;
        let json = value
            .as_str()
            .ok_or_else(|| ScraperError::Browser(anyhow!("extraction script returned non-string")))?;
        Ok(serde_json::from_str(json)?)
    }

    fn page_content(&mut self) -> Result<String, ScraperError> {
        self.tab.get_content().map_err(ScraperError::Browser)
    }

    fn close(&mut self) {
        if self.browser.take().is_some() {
            info!("Browser session closed.");
        } else {
            warn!("Browser session already closed.");
        }
    }
}

fn heavy_pattern(resource_type: ResourceType) -> RequestPattern {
    RequestPattern {
        url_pattern: Some("*".to_string()),
        resource_Type: Some(resource_type),
        request_stage: Some(RequestStage::Request),
    }
}

/// Quote a string as a JS literal. Serializing through a JSON value cannot
/// fail, unlike `serde_json::to_string` on arbitrary types.
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// The probe runs inside the remote document: only the phrase lists cross
/// the boundary, serialized into the script source.
fn build_challenge_script(probe: &ChallengeProbe) -> String {
    let title_phrase = js_string(probe.title_phrase);
    let body_phrases = serde_json::json!(probe.body_phrases).to_string();
    format!(
        r#"(() => {{
            const title = document.title || '';
            const body = (document.body && document.body.textContent) || '';
            const phrases = {body_phrases};
            return title.includes({title_phrase}) || phrases.some((p) => body.includes(p));
        }})()"#
    )
}

/// Batch extraction over every card matching the spec. Returns a JSON
/// string so the result deserializes into [`CardRecord`]s on this side.
fn build_extraction_script(spec: &ExtractionSpec) -> String {
    let card = js_string(spec.card_selector);
    let title = js_string(spec.title_selector);
    let price = js_string(spec.price_selector);
    let retailer = js_string(spec.retailer_selector);
    let link = js_string(spec.link_selector);
    format!(
        r#"(() => {{
            const records = [];
            document.querySelectorAll({card}).forEach((card) => {{
                const pick = (sel) => {{
                    const el = card.querySelector(sel);
                    return el && el.textContent ? el.textContent : null;
                }};
                const linkEl = card.querySelector({link});
                records.push({{
                    title: pick({title}),
                    price: pick({price}),
                    retailer: pick({retailer}),
                    link: linkEl ? (linkEl.getAttribute('href') || linkEl.href || null) : null
                }});
            }});
            return JSON.stringify(records);
        }})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_script_embeds_phrases_as_js_literals() {
        let probe = ChallengeProbe {
            title_phrase: "Nur einen Moment",
            body_phrases: &["Cloudflare", "Bestätigen Sie, dass Sie ein Mensch sind"],
        };
        let script = build_challenge_script(&probe);
        assert!(script.contains(r#"title.includes("Nur einen Moment")"#));
        assert!(script.contains(r#""Cloudflare""#));
        assert!(script.contains("Bestätigen Sie"));
        assert!(script.contains("document.body"));
    }

    #[test]
    fn extraction_script_embeds_selectors_escaped() {
        let spec = ExtractionSpec {
            card_selector: "[data-t]",
            title_selector: "[data-t='title']",
            price_selector: "[data-t='price']",
            retailer_selector: "[data-t='merchant']",
            link_selector: "a",
        };
        let script = build_extraction_script(&spec);
        assert!(script.contains(r#"querySelectorAll("[data-t]")"#));
        assert!(script.contains(r#"pick("[data-t='title']")"#));
        assert!(script.contains("JSON.stringify(records)"));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }
}
