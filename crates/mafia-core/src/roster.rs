//! Players shown in a lobby.
//!
//! The roster is local state. It is seeded when the local player enters a
//! lobby, grows to match the stored player count while the lobby waits, and
//! is never written to the store.

use crate::join_code::JoinCodeKind;
use crate::session::SessionRecord;
use crate::settings::GameSettings;

/// Roster id of the session host.
pub const HOST_SEAT: &str = "1";

const AVATAR_BASE: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

/// Avatar URL for a seed string.
pub fn avatar_url(seed: &str) -> String {
    format!("{AVATAR_BASE}{seed}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub id: String,
    pub display_name: String,
    pub avatar_ref: String,
    pub is_host: bool,
    pub is_ready: bool,
}

impl PlayerView {
    /// Placeholder seat `n` (1-based), named "Player n".
    fn placeholder(n: u32, ready: bool) -> Self {
        Self {
            id: n.to_string(),
            display_name: format!("Player {n}"),
            avatar_ref: avatar_url(&format!("player{n}")),
            is_host: false,
            is_ready: ready,
        }
    }
}

/// Why the host cannot start the round yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBlocker {
    NotEnoughPlayers { missing: u32 },
    PlayersNotReady { waiting: u32 },
}

impl StartBlocker {
    pub fn message(self) -> String {
        match self {
            StartBlocker::NotEnoughPlayers { missing } => {
                format!("Waiting for {missing} more players...")
            }
            StartBlocker::PlayersNotReady { .. } => {
                "Waiting for all players to be ready...".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    players: Vec<PlayerView>,
}

impl Roster {
    /// Roster for a freshly created session.
    ///
    /// A test game is pre-filled with ready placeholder seats up to the table
    /// size; a standard game starts with only the host.
    pub fn for_host(host_name: &str, settings: &GameSettings) -> Self {
        let host = PlayerView {
            id: HOST_SEAT.to_string(),
            display_name: format!("{host_name} (Host)"),
            avatar_ref: avatar_url(host_name),
            is_host: true,
            is_ready: true,
        };
        let mut players = vec![host];

        let is_test = settings
            .join_code()
            .is_some_and(|code| JoinCodeKind::of(code) == JoinCodeKind::Test);
        if is_test {
            players.extend((2..=settings.total_players()).map(|n| PlayerView::placeholder(n, true)));
        }
        Self { players }
    }

    /// Roster seen by a player who has just joined `record`: the host, any
    /// seats taken before them, then the local player. The record's count
    /// already includes the local player.
    pub fn for_guest(record: &SessionRecord, guest_name: &str) -> Self {
        let host = PlayerView {
            id: HOST_SEAT.to_string(),
            display_name: format!("{} (Host)", record.host_name),
            avatar_ref: avatar_url(&record.host_name),
            is_host: true,
            is_ready: true,
        };
        let mut players = vec![host];
        let taken = record.current_players.saturating_sub(1).max(1);
        players.extend((2..=taken).map(|n| PlayerView::placeholder(n, true)));

        let id = (taken + 1).to_string();
        players.push(PlayerView {
            id,
            display_name: guest_name.to_string(),
            avatar_ref: avatar_url(guest_name),
            is_host: false,
            is_ready: true,
        });
        Self { players }
    }

    pub fn players(&self) -> &[PlayerView] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn push(&mut self, player: PlayerView) {
        self.players.push(player);
    }

    /// Add ready placeholder seats until the roster holds `count` players.
    /// Returns how many were added.
    pub fn fill_seats(&mut self, count: u32) -> usize {
        let before = self.players.len();
        let mut next = before as u32 + 1;
        while (self.players.len() as u32) < count {
            self.players.push(PlayerView::placeholder(next, true));
            next += 1;
        }
        self.players.len() - before
    }

    /// Mark a player ready or not. Returns `false` if no player has `id`.
    pub fn set_ready(&mut self, id: &str, ready: bool) -> bool {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.is_ready = ready;
                true
            }
            None => false,
        }
    }

    pub fn ready_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_ready).count()
    }

    /// Every condition currently preventing the round from starting. Empty
    /// when the host may start.
    pub fn start_blockers(&self, total_players: u32) -> Vec<StartBlocker> {
        let mut blockers = Vec::new();
        let count = self.players.len() as u32;
        if count < total_players {
            blockers.push(StartBlocker::NotEnoughPlayers {
                missing: total_players - count,
            });
        }
        let waiting = self.players.iter().filter(|p| !p.is_ready).count() as u32;
        if waiting > 0 {
            blockers.push(StartBlocker::PlayersNotReady { waiting });
        }
        blockers
    }

    /// Label for the start button.
    pub fn start_label(&self, total_players: u32) -> String {
        match self.start_blockers(total_players).first() {
            Some(blocker) => blocker.message(),
            None => "Start Game".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;

    fn record(current_players: u32) -> SessionRecord {
        SessionRecord {
            id: "abc".to_string(),
            created_at: None,
            host_name: "Rosa".to_string(),
            total_players: 6,
            mafia_count: 2,
            game_duration: 5,
            game_code: "GAME12".to_string(),
            status: SessionStatus::Waiting,
            current_players,
        }
    }

    #[test]
    fn standard_game_has_only_host() {
        let settings = GameSettings::new(6, 2, 10).with_join_code("GAMEAB");
        let roster = Roster::for_host("Ana", &settings);
        assert_eq!(roster.len(), 1);
        let host = &roster.players()[0];
        assert!(host.is_host && host.is_ready);
        assert_eq!(host.display_name, "Ana (Host)");
        assert!(host.avatar_ref.ends_with("seed=Ana"));
        assert_eq!(
            roster.start_blockers(6),
            vec![StartBlocker::NotEnoughPlayers { missing: 5 }]
        );
        assert_eq!(roster.start_label(6), "Waiting for 5 more players...");
    }

    #[test]
    fn test_game_is_prefilled_and_startable() {
        let settings = GameSettings::new(5, 1, 10).with_join_code("TESTQ9");
        let roster = Roster::for_host("Ana", &settings);
        assert_eq!(roster.len(), 5);
        assert_eq!(roster.players()[4].display_name, "Player 5");
        assert!(roster.start_blockers(5).is_empty());
        assert_eq!(roster.start_label(5), "Start Game");
    }

    #[test]
    fn both_blockers_reported() {
        let settings = GameSettings::new(4, 1, 10).with_join_code("TESTQ9");
        let mut roster = Roster::for_host("Ana", &settings);
        roster.set_ready("3", false);
        assert_eq!(
            roster.start_blockers(4),
            vec![StartBlocker::PlayersNotReady { waiting: 1 }]
        );
        assert_eq!(
            roster.start_blockers(6),
            vec![
                StartBlocker::NotEnoughPlayers { missing: 2 },
                StartBlocker::PlayersNotReady { waiting: 1 },
            ]
        );
    }

    #[test]
    fn set_ready_unknown_player() {
        let mut roster = Roster::default();
        assert!(!roster.set_ready("9", true));
    }

    #[test]
    fn guest_roster_includes_host_and_self() {
        let roster = Roster::for_guest(&record(3), "Zed");
        assert_eq!(roster.len(), 3);
        assert!(roster.players()[0].is_host);
        assert_eq!(roster.players()[0].display_name, "Rosa (Host)");
        assert_eq!(roster.players()[1].display_name, "Player 2");
        let me = roster.players().last().unwrap();
        assert_eq!(me.display_name, "Zed");
        assert_eq!(me.id, "3");
        assert!(!me.is_host);
    }

    #[test]
    fn filled_seats_unblock_start() {
        let settings = GameSettings::new(4, 1, 10).with_join_code("GAMEAB");
        let mut roster = Roster::for_host("Ana", &settings);
        assert_eq!(roster.fill_seats(3), 2);
        assert_eq!(roster.start_label(4), "Waiting for 1 more players...");
        assert_eq!(roster.players()[2].id, "3");

        assert_eq!(roster.fill_seats(4), 1);
        assert_eq!(roster.fill_seats(2), 0);
        assert_eq!(roster.len(), 4);
        assert!(roster.start_blockers(4).is_empty());
    }
}
