//! Realtime change feed over WebSocket.
//!
//! Speaks the Phoenix channel framing used by the hosted store: join
//! `realtime:public:<table>` with a `postgres_changes` config, send a
//! heartbeat every [`HEARTBEAT_INTERVAL`], and turn every change frame into a
//! [`ChangeEvent`]. The socket lives in a background task owned by the
//! returned [`Subscription`].

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::store::{ChangeEvent, ChangeKind, StoreError, Subscription};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// One Phoenix channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhxFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

pub fn topic(table: &str) -> String {
    format!("realtime:public:{table}")
}

pub fn join_frame(table: &str, reference: u64) -> PhxFrame {
    PhxFrame {
        topic: topic(table),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": table }
                ]
            }
        }),
        reference: Some(reference.to_string()),
    }
}

pub fn heartbeat_frame(reference: u64) -> PhxFrame {
    PhxFrame {
        topic: "phoenix".to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
    }
}

/// Map a text frame to a change on `table`, if it is one.
///
/// Accepts both the `postgres_changes` envelope and bare
/// `INSERT`/`UPDATE`/`DELETE` events.
pub fn parse_change(text: &str, table: &str) -> Option<ChangeEvent> {
    let frame: PhxFrame = serde_json::from_str(text).ok()?;
    if frame.topic != topic(table) {
        return None;
    }
    let kind = match frame.event.as_str() {
        "postgres_changes" => {
            let kind = frame
                .payload
                .pointer("/data/type")
                .and_then(Value::as_str)
                .unwrap_or("");
            ChangeKind::from_wire(kind)
        }
        "INSERT" | "UPDATE" | "DELETE" => ChangeKind::from_wire(&frame.event),
        _ => return None,
    };
    Some(ChangeEvent {
        table: table.to_string(),
        kind,
    })
}

fn encode(frame: &PhxFrame) -> Result<Message, StoreError> {
    serde_json::to_string(frame)
        .map(Message::text)
        .map_err(|e| StoreError::Realtime(e.to_string()))
}

/// Connect, join the table's channel, and spawn the feed task.
pub async fn subscribe(url: &str, table: &str) -> Result<Subscription, StoreError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| StoreError::Realtime(e.to_string()))?;
    let (mut sink, mut stream) = stream.split();

    sink.send(encode(&join_frame(table, 1))?)
        .await
        .map_err(|e| StoreError::Realtime(e.to_string()))?;
    tracing::info!(table, "joined change feed");

    let (tx, rx) = mpsc::unbounded_channel();
    let table = table.to_string();
    let task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick completes immediately.
        heartbeat.tick().await;
        let mut reference = 1u64;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    reference += 1;
                    let Ok(msg) = encode(&heartbeat_frame(reference)) else { break };
                    if sink.send(msg).await.is_err() {
                        break;
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(change) = parse_change(text.as_str(), &table)
                            && tx.send(change).is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Skip binary, ping, pong frames.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "change feed failed");
                        break;
                    }
                }
            }
        }
        tracing::info!(table = %table, "change feed closed");
    });

    Ok(Subscription::new(rx, Some(task)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_frame_shape() {
        let frame = serde_json::to_value(join_frame("game_sessions", 1)).unwrap();
        assert_eq!(frame["topic"], "realtime:public:game_sessions");
        assert_eq!(frame["event"], "phx_join");
        assert_eq!(frame["ref"], "1");
        assert_eq!(
            frame["payload"]["config"]["postgres_changes"][0]["table"],
            "game_sessions"
        );
    }

    #[test]
    fn heartbeat_targets_phoenix_topic() {
        let frame = heartbeat_frame(7);
        assert_eq!(frame.topic, "phoenix");
        assert_eq!(frame.reference.as_deref(), Some("7"));
    }

    #[test]
    fn parses_postgres_changes() {
        let text = r#"{"topic":"realtime:public:game_sessions","event":"postgres_changes",
            "payload":{"data":{"type":"UPDATE","table":"game_sessions"}},"ref":null}"#;
        assert_eq!(
            parse_change(text, "game_sessions"),
            Some(ChangeEvent {
                table: "game_sessions".to_string(),
                kind: ChangeKind::Update,
            })
        );
    }

    #[test]
    fn parses_bare_events() {
        let text = r#"{"topic":"realtime:public:game_sessions","event":"INSERT","payload":{}}"#;
        assert_eq!(
            parse_change(text, "game_sessions").map(|c| c.kind),
            Some(ChangeKind::Insert)
        );
    }

    #[test]
    fn ignores_replies_and_other_topics() {
        let reply = r#"{"topic":"realtime:public:game_sessions","event":"phx_reply","payload":{"status":"ok"},"ref":"1"}"#;
        assert_eq!(parse_change(reply, "game_sessions"), None);
        let other = r#"{"topic":"realtime:public:players","event":"INSERT","payload":{}}"#;
        assert_eq!(parse_change(other, "game_sessions"), None);
        assert_eq!(parse_change("not json", "game_sessions"), None);
    }
}
