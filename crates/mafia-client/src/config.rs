//! Hosted-store connection settings.
//!
//! Both the endpoint URL and the access key must be present for the hosted
//! store to be used. Missing or blank values are not an error: callers fall
//! back to the in-memory store.

use std::fmt;

pub const URL_ENV: &str = "SUPABASE_URL";
pub const KEY_ENV: &str = "SUPABASE_ANON_KEY";

#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub url: String,
    pub key: String,
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl StoreCredentials {
    /// Combine an endpoint and key, treating blank values as absent.
    pub fn resolve(url: Option<String>, key: Option<String>) -> Option<Self> {
        let url = url.map(|u| u.trim().trim_end_matches('/').to_string());
        let key = key.map(|k| k.trim().to_string());
        match (url, key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some(Self { url, key }),
            _ => None,
        }
    }

    /// REST endpoint for `table`.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }

    /// Realtime WebSocket endpoint (`http` → `ws`, `https` → `wss`).
    pub fn realtime_url(&self) -> String {
        let base = if let Some(rest) = self.url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.url.clone()
        };
        format!("{base}/realtime/v1/websocket?apikey={}&vsn=1.0.0", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_values_required() {
        assert!(StoreCredentials::resolve(None, Some("k".into())).is_none());
        assert!(StoreCredentials::resolve(Some("https://x.co".into()), None).is_none());
        assert!(StoreCredentials::resolve(Some("  ".into()), Some("k".into())).is_none());
        assert!(StoreCredentials::resolve(Some("https://x.co".into()), Some("".into())).is_none());
    }

    #[test]
    fn urls_are_derived() {
        let creds =
            StoreCredentials::resolve(Some("https://demo.supabase.co/".into()), Some("anon".into()))
                .unwrap();
        assert_eq!(
            creds.rest_url("game_sessions"),
            "https://demo.supabase.co/rest/v1/game_sessions"
        );
        assert_eq!(
            creds.realtime_url(),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }

    #[test]
    fn debug_hides_key() {
        let creds = StoreCredentials::resolve(Some("http://localhost:54321".into()), Some("secret".into()))
            .unwrap();
        assert!(!format!("{creds:?}").contains("secret"));
        assert!(creds.realtime_url().starts_with("ws://localhost:54321/"));
    }
}
