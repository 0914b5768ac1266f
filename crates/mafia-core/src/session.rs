//! Session rows as stored in the hosted `game_sessions` table.
//!
//! Field names follow the table's snake_case columns so the same types
//! serialize straight onto the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::GameSettings;

/// Table holding session rows.
pub const SESSIONS_TABLE: &str = "game_sessions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Full,
    InProgress,
    Ended,
}

impl SessionStatus {
    /// Column value, as used in filters.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Full => "full",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Ended => "ended",
        }
    }

    /// Badge shown in the join dialog.
    pub fn badge(self) -> &'static str {
        match self {
            SessionStatus::Waiting => "Join",
            SessionStatus::Full => "Full",
            SessionStatus::InProgress => "In Progress",
            SessionStatus::Ended => "Ended",
        }
    }

    pub fn is_joinable(self) -> bool {
        self == SessionStatus::Waiting
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored session. The store owns `id` and `status`; clients hold
/// read-only snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub host_name: String,
    pub total_players: u32,
    pub mafia_count: u32,
    /// Round length in minutes.
    pub game_duration: u32,
    pub game_code: String,
    pub status: SessionStatus,
    pub current_players: u32,
}

impl SessionRecord {
    /// Settings this session was created with.
    pub fn settings(&self) -> GameSettings {
        GameSettings::new(self.total_players, self.mafia_count, self.game_duration)
            .with_join_code(self.game_code.clone())
    }

    /// Title shown in the join dialog.
    pub fn title(&self) -> String {
        format!("{}'s Game", self.host_name)
    }

    /// "k / n players".
    pub fn occupancy(&self) -> String {
        format!("{} / {} players", self.current_players, self.total_players)
    }

    /// Every seat is taken, whatever the stored status says.
    pub fn is_full(&self) -> bool {
        self.status == SessionStatus::Full || self.current_players >= self.total_players
    }

    pub fn is_joinable(&self) -> bool {
        self.status.is_joinable() && !self.is_full()
    }

    /// Badge shown in the join dialog. A waiting session with no free seat
    /// reads as full.
    pub fn badge(&self) -> &'static str {
        if self.status == SessionStatus::Waiting && self.is_full() {
            SessionStatus::Full.badge()
        } else {
            self.status.badge()
        }
    }
}

/// Insert payload for a new session row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub host_name: String,
    pub total_players: u32,
    pub mafia_count: u32,
    pub game_duration: u32,
    pub game_code: String,
    pub status: SessionStatus,
    pub current_players: u32,
}

impl NewSession {
    /// A waiting session with the host as its only player.
    pub fn waiting(settings: &GameSettings, host_name: &str, game_code: &str) -> Self {
        Self {
            host_name: host_name.to_string(),
            total_players: settings.total_players(),
            mafia_count: settings.mafia_count(),
            game_duration: settings.game_duration_minutes(),
            game_code: game_code.to_string(),
            status: SessionStatus::Waiting,
            current_players: 1,
        }
    }

    /// Materialize the row the way a store would after assigning an id.
    pub fn into_record(self, id: String, created_at: Option<String>) -> SessionRecord {
        SessionRecord {
            id,
            created_at,
            host_name: self.host_name,
            total_players: self.total_players,
            mafia_count: self.mafia_count,
            game_duration: self.game_duration,
            game_code: self.game_code,
            status: self.status,
            current_players: self.current_players,
        }
    }
}

/// Row filter for `select`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub id: Option<String>,
}

impl SessionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            id: None,
        }
    }

    /// The single row with `id`.
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            status: None,
            id: Some(id.into()),
        }
    }

    pub fn matches(&self, record: &SessionRecord) -> bool {
        self.status.is_none_or(|s| s == record.status)
            && self.id.as_ref().is_none_or(|id| *id == record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        let json = serde_json::to_string(&SessionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: SessionStatus = serde_json::from_str("\"waiting\"").unwrap();
        assert_eq!(back, SessionStatus::Waiting);
    }

    #[test]
    fn record_from_row_json() {
        let row = r#"{
            "id": "5b1c",
            "created_at": "2024-03-01T10:00:00+00:00",
            "host_name": "Ana",
            "total_players": 8,
            "mafia_count": 2,
            "game_duration": 15,
            "game_code": "GAMEX1",
            "status": "waiting",
            "current_players": 3
        }"#;
        let record: SessionRecord = serde_json::from_str(row).unwrap();
        assert_eq!(record.title(), "Ana's Game");
        assert_eq!(record.occupancy(), "3 / 8 players");
        let settings = record.settings();
        assert_eq!(settings.total_players(), 8);
        assert_eq!(settings.join_code(), Some("GAMEX1"));
    }

    #[test]
    fn new_session_starts_waiting_with_host() {
        let settings = GameSettings::new(6, 4, 10);
        let new = NewSession::waiting(&settings, "Ana", "GAME00");
        assert_eq!(new.mafia_count, 2);
        assert_eq!(new.status, SessionStatus::Waiting);
        assert_eq!(new.current_players, 1);
        let json = serde_json::to_value(&new).unwrap();
        assert_eq!(json["mafia_count"], 2);
        assert_eq!(json["status"], "waiting");
    }

    #[test]
    fn filter_matches_status() {
        let rec = NewSession::waiting(&GameSettings::default(), "A", "GAME00")
            .into_record("1".to_string(), None);
        assert!(SessionFilter::all().matches(&rec));
        assert!(SessionFilter::status(SessionStatus::Waiting).matches(&rec));
        assert!(!SessionFilter::status(SessionStatus::Ended).matches(&rec));
        assert!(SessionFilter::id("1").matches(&rec));
        assert!(!SessionFilter::id("2").matches(&rec));
        assert!(SessionStatus::Waiting.is_joinable());
        assert!(!SessionStatus::Full.is_joinable());
    }

    #[test]
    fn waiting_session_without_seats_reads_full() {
        let mut rec = NewSession::waiting(&GameSettings::new(4, 1, 5), "A", "GAME00")
            .into_record("1".to_string(), None);
        assert!(rec.is_joinable());
        assert_eq!(rec.badge(), "Join");

        rec.current_players = 4;
        assert!(rec.is_full());
        assert!(!rec.is_joinable());
        assert_eq!(rec.badge(), "Full");

        rec.current_players = 2;
        rec.status = SessionStatus::InProgress;
        assert!(!rec.is_joinable());
        assert_eq!(rec.badge(), "In Progress");
    }
}
