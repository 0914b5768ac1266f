//! Hosted row-store over HTTP.
//!
//! Rows live in a PostgREST-style endpoint (`/rest/v1/<table>`); every request
//! carries the anon key both as `apikey` and as a bearer token. The change
//! feed is delegated to [`crate::realtime`].

use mafia_core::session::{NewSession, SESSIONS_TABLE, SessionFilter, SessionRecord, SessionStatus};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::StoreCredentials;
use crate::store::{SessionStore, StoreError, StoreResult, Subscription};

/// Error body returned by the REST endpoint.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Decode a REST response body.
///
/// Non-success statuses become [`StoreError::Status`]; an empty body or a
/// literal `null` is a success without data.
pub fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> StoreResult<T> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(StoreError::Status { status, message });
    }
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<T>>(body).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Row filter for taking seat `seen + 1` in session `id`.
fn seat_query(id: &str, seen: u32) -> Vec<(&'static str, String)> {
    vec![
        ("id", format!("eq.{id}")),
        ("status", format!("eq.{}", SessionStatus::Waiting)),
        ("current_players", format!("eq.{seen}")),
        ("total_players", format!("gt.{seen}")),
    ]
}

pub struct RestStore {
    http: reqwest::Client,
    creds: StoreCredentials,
}

impl RestStore {
    pub fn new(creds: StoreCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            creds,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.creds.rest_url(table))
            .header("apikey", &self.creds.key)
            .bearer_auth(&self.creds.key)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let resp = request
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        decode_body(status, &body)
    }
}

impl SessionStore for RestStore {
    async fn insert(&self, session: NewSession) -> StoreResult<SessionRecord> {
        let request = self
            .request(Method::POST, SESSIONS_TABLE)
            .header("Prefer", "return=representation")
            .json(&session);
        let rows: Option<Vec<SessionRecord>> = self.send(request).await?;
        tracing::debug!(rows = rows.as_ref().map(Vec::len), "insert returned");
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    async fn select(&self, filter: SessionFilter) -> StoreResult<Vec<SessionRecord>> {
        let mut query = vec![("select", "*".to_string())];
        if let Some(status) = filter.status {
            query.push(("status", format!("eq.{status}")));
        }
        if let Some(id) = filter.id {
            query.push(("id", format!("eq.{id}")));
        }
        let request = self.request(Method::GET, SESSIONS_TABLE).query(&query);
        self.send(request).await
    }

    async fn update_status(&self, id: &str, status: SessionStatus) -> Result<(), StoreError> {
        let request = self
            .request(Method::PATCH, SESSIONS_TABLE)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "status": status }));
        let rows: Option<Vec<SessionRecord>> = self.send(request).await?;
        match rows {
            Some(rows) if !rows.is_empty() => Ok(()),
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn add_player(&self, id: &str, seen: u32) -> StoreResult<SessionRecord> {
        // Conditional on the count we saw, so two guests never take one seat.
        let request = self
            .request(Method::PATCH, SESSIONS_TABLE)
            .query(&seat_query(id, seen))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "current_players": seen + 1 }));
        let rows: Option<Vec<SessionRecord>> = self.send(request).await?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    async fn subscribe(&self, table: &str) -> Result<Subscription, StoreError> {
        crate::realtime::subscribe(&self.creds.realtime_url(), table).await
    }
}
