//! Browser-like request headers for getting past CDN bot challenges.
//!
//! Edge networks in front of social sites answer bare library requests with
//! an interstitial challenge. Presenting a plausible desktop browser profile
//! is usually enough for a single page fetch. Profile headers only fill in
//! what the caller did not set explicitly.

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

/// Snapshot of the headers a desktop browser sends on navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserProfile {
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
}

const NAVIGATE_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

impl BrowserProfile {
    pub const FIREFOX_WINDOWS: BrowserProfile = BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0",
        accept: NAVIGATE_ACCEPT,
        accept_language: "en-US,en;q=0.5",
    };

    pub const CHROME_WINDOWS: BrowserProfile = BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        accept: NAVIGATE_ACCEPT,
        accept_language: "en-US,en;q=0.9",
    };

    pub const CHROME_MAC: BrowserProfile = BrowserProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        accept: NAVIGATE_ACCEPT,
        accept_language: "en-US,en;q=0.9",
    };

    const DESKTOP: [BrowserProfile; 3] = [
        Self::FIREFOX_WINDOWS,
        Self::CHROME_WINDOWS,
        Self::CHROME_MAC,
    ];

    /// Choose one of the built-in desktop profiles at random.
    pub fn pick() -> Self {
        Self::DESKTOP
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(Self::FIREFOX_WINDOWS)
    }

    /// Insert the profile headers that are not already present.
    ///
    /// ```
    /// use reelwatch_http::bypass::BrowserProfile;
    /// use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert(USER_AGENT, HeaderValue::from_static("custom/1.0"));
    /// BrowserProfile::FIREFOX_WINDOWS.apply(&mut headers);
    ///
    /// assert_eq!(headers[USER_AGENT], "custom/1.0");
    /// assert_eq!(headers.len(), 3);
    /// ```
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in [
            (USER_AGENT, self.user_agent),
            (ACCEPT, self.accept),
            (ACCEPT_LANGUAGE, self.accept_language),
        ] {
            if !headers.contains_key(&name) {
                headers.insert(name, HeaderValue::from_static(value));
            }
        }
    }
}
