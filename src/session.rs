// ChapterFetch - Segmented Audiobook Chapter Downloader
// Copyright (C) 2026 ChapterFetch Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Per-run request session
//!
//! Hosts that serve chapter manifests gate segment access behind a
//! `Referer` plus per-playback headers handed out by the player page
//! (`x-playback-token`, `x-audiobook-id`). [`Session`] carries that header
//! set and the per-request timeout; it is owned by the scheduler and handed
//! down to the manifest resolver and segment fetcher, so no request state
//! lives in globals and two runs never share hidden session data.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Default per-request timeout, matching the original player's segment
/// request budget.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser user-agent pool for rotation when the caller supplies none.
const USER_AGENTS: &[&str] = &[
    // Chrome (Windows)
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome (Linux)
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/118.0.5993.70 Safari/537.36",
    // Chrome (MacOS)
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_2_0) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    // Firefox (Windows)
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) \
     Gecko/20100101 Firefox/122.0",
    // Firefox (Linux)
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) \
     Gecko/20100101 Firefox/121.0",
    // Safari (MacOS)
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_1_0) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Session configuration
///
/// Produced by whatever acquired the playback page (out of scope here);
/// consumed by [`Session::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Page URL the chapter list came from; sent as `Referer`
    pub referer: String,

    /// Per-playback token from the player page, if the host requires one
    pub playback_token: Option<String>,

    /// Audiobook id from the player page, if the host requires one
    pub book_id: Option<String>,

    /// Explicit user agent; a pooled browser agent is chosen when absent
    pub user_agent: Option<String>,

    /// Per-request timeout for manifest and segment fetches
    #[serde(default = "default_timeout")]
    pub request_timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            referer: String::new(),
            playback_token: None,
            book_id: None,
            user_agent: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Immutable header set + timeout for one pipeline run
#[derive(Debug, Clone)]
pub struct Session {
    headers: HashMap<String, String>,
    request_timeout: Duration,
}

impl Session {
    /// Build the session header set from a config.
    ///
    /// `Origin` is derived from the referer's scheme and host; headers whose
    /// source value is absent are simply omitted.
    pub fn new(config: SessionConfig) -> Self {
        let mut headers = HashMap::new();
        headers.insert("accept".to_string(), "*/*".to_string());

        let user_agent = config.user_agent.unwrap_or_else(|| {
            USER_AGENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(USER_AGENTS[0])
                .to_string()
        });
        headers.insert("user-agent".to_string(), user_agent);

        if !config.referer.is_empty() {
            headers.insert("referer".to_string(), config.referer.clone());
            if let Some(origin) = origin_of(&config.referer) {
                headers.insert("origin".to_string(), origin);
            }
        }
        if let Some(token) = config.playback_token {
            headers.insert("x-playback-token".to_string(), token);
        }
        if let Some(book_id) = config.book_id {
            headers.insert("x-audiobook-id".to_string(), book_id);
        }

        Self {
            headers,
            request_timeout: config.request_timeout,
        }
    }

    /// Request headers for manifest and segment fetches
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// `scheme://host[:port]` of a URL, or None when it doesn't parse
fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let origin = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };
    Some(origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_full_header_set() {
        let session = Session::new(SessionConfig {
            referer: "https://tokybook.com/post/some-book".to_string(),
            playback_token: Some("tok123".to_string()),
            book_id: Some("42".to_string()),
            user_agent: Some("test-agent/1.0".to_string()),
            request_timeout: Duration::from_secs(5),
        });

        let headers = session.headers();
        assert_eq!(
            headers.get("referer").map(String::as_str),
            Some("https://tokybook.com/post/some-book")
        );
        assert_eq!(
            headers.get("origin").map(String::as_str),
            Some("https://tokybook.com")
        );
        assert_eq!(headers.get("x-playback-token").map(String::as_str), Some("tok123"));
        assert_eq!(headers.get("x-audiobook-id").map(String::as_str), Some("42"));
        assert_eq!(headers.get("user-agent").map(String::as_str), Some("test-agent/1.0"));
        assert_eq!(session.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn picks_pooled_user_agent_when_unset() {
        let session = Session::new(SessionConfig::default());
        let ua = session.headers().get("user-agent").unwrap();
        assert!(USER_AGENTS.contains(&ua.as_str()));
    }

    #[test]
    fn omits_optional_headers_when_absent() {
        let session = Session::new(SessionConfig::default());
        assert!(!session.headers().contains_key("referer"));
        assert!(!session.headers().contains_key("x-playback-token"));
        assert!(!session.headers().contains_key("x-audiobook-id"));
    }
}
