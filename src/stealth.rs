//! Fingerprint hardening for the browsing session.
//!
//! A small injection script runs before any page script (via
//! `Page.addScriptToEvaluateOnNewDocument`) and removes the obvious
//! automation tells; a pool of realistic user agents covers runs where no
//! explicit override is configured.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/123.0.0.0 Safari/537.36",
    ]
});

/// Pick a realistic user agent for sessions without a configured override.
pub fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36")
}

/// The stealth injection script. Runs before any other script on the page.
pub fn stealth_script() -> &'static str {
    r#"
        // Unmask: remove navigator.webdriver.
        Object.defineProperty(navigator, 'webdriver', {
            get: () => undefined,
        });

        // Headless Chrome ships without window.chrome; real Chrome doesn't.
        window.chrome = window.chrome || {
            runtime: {
                connect: function () {
                    return {
                        onMessage: { addListener: function () {}, removeListener: function () {} },
                        postMessage: function () {},
                        disconnect: function () {}
                    };
                },
                sendMessage: function () {},
                onMessage: { addListener: function () {}, removeListener: function () {} }
            },
            app: { isInstalled: false },
            csi: function () {},
            loadTimes: function () { return {}; }
        };

        // Notification permission probes reveal the 'prompt'-less headless state.
        const originalQuery = window.navigator.permissions.query;
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications' ?
            Promise.resolve({ state: Notification.permission }) :
            originalQuery(parameters)
        );
    "#
}
