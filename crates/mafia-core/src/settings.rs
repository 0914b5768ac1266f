//! Game settings gathered by the create-game dialog.
//!
//! The mafia count is re-clamped every time the player count changes, so a
//! [`GameSettings`] value always satisfies `mafia_count <= total_players / 3`.
//! Range checks on the player count and round duration are deferred to
//! [`GameSettings::validate`], which runs right before a session is persisted.

use std::ops::RangeInclusive;

use thiserror::Error;

/// Player counts selectable in the create dialog.
pub const PLAYER_RANGE: RangeInclusive<u32> = 4..=12;

/// Round durations (minutes) selectable in the create dialog.
pub const DURATION_RANGE: RangeInclusive<u32> = 1..=60;

pub const DEFAULT_TOTAL_PLAYERS: u32 = 6;
pub const DEFAULT_MAFIA_COUNT: u32 = 2;
pub const DEFAULT_DURATION_MINUTES: u32 = 15;

/// Settings that violate the session invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("total players must be between {min} and {max}, got {got}", min = PLAYER_RANGE.start(), max = PLAYER_RANGE.end())]
    PlayerCount { got: u32 },

    #[error("game duration must be between {min} and {max} minutes, got {got}", min = DURATION_RANGE.start(), max = DURATION_RANGE.end())]
    Duration { got: u32 },

    #[error("mafia count must be between 1 and {max}, got {got}")]
    MafiaCount { got: u32, max: u32 },
}

/// Largest mafia count allowed for a table of `total_players`.
pub fn max_mafia(total_players: u32) -> u32 {
    total_players / 3
}

/// Clamp `mafia_count` into `1..=total_players / 3`.
///
/// With fewer than three players there is no legal mafia count and the result
/// is `0`; [`GameSettings::validate`] then refuses to create the session.
pub fn clamp_mafia_count(total_players: u32, mafia_count: u32) -> u32 {
    let max = max_mafia(total_players);
    if max == 0 {
        return 0;
    }
    mafia_count.clamp(1, max)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    total_players: u32,
    mafia_count: u32,
    game_duration_minutes: u32,
    join_code: Option<String>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_TOTAL_PLAYERS,
            DEFAULT_MAFIA_COUNT,
            DEFAULT_DURATION_MINUTES,
        )
    }
}

impl GameSettings {
    /// Build settings, clamping the mafia count against `total_players`.
    ///
    /// The player count and duration are taken as given; call
    /// [`validate`](Self::validate) before persisting.
    pub fn new(total_players: u32, mafia_count: u32, game_duration_minutes: u32) -> Self {
        Self {
            total_players,
            mafia_count: clamp_mafia_count(total_players, mafia_count),
            game_duration_minutes,
            join_code: None,
        }
    }

    pub fn total_players(&self) -> u32 {
        self.total_players
    }

    pub fn mafia_count(&self) -> u32 {
        self.mafia_count
    }

    pub fn game_duration_minutes(&self) -> u32 {
        self.game_duration_minutes
    }

    pub fn join_code(&self) -> Option<&str> {
        self.join_code.as_deref()
    }

    /// Round length in seconds.
    pub fn round_secs(&self) -> u32 {
        self.game_duration_minutes.saturating_mul(60)
    }

    /// Number of non-mafia seats, for the "M Mafia vs C Civilians" summary.
    pub fn civilian_count(&self) -> u32 {
        self.total_players.saturating_sub(self.mafia_count)
    }

    /// Slider update: bound the player count to [`PLAYER_RANGE`] and re-clamp
    /// the mafia count.
    pub fn set_total_players(&mut self, total_players: u32) {
        self.total_players = total_players.clamp(*PLAYER_RANGE.start(), *PLAYER_RANGE.end());
        self.mafia_count = clamp_mafia_count(self.total_players, self.mafia_count);
    }

    /// Slider update: bound the mafia count to `1..=total_players / 3`.
    pub fn set_mafia_count(&mut self, mafia_count: u32) {
        self.mafia_count = clamp_mafia_count(self.total_players, mafia_count);
    }

    /// Slider update: bound the duration to [`DURATION_RANGE`].
    pub fn set_game_duration_minutes(&mut self, minutes: u32) {
        self.game_duration_minutes = minutes.clamp(*DURATION_RANGE.start(), *DURATION_RANGE.end());
    }

    pub fn with_join_code(mut self, code: impl Into<String>) -> Self {
        self.join_code = Some(code.into());
        self
    }

    /// Check every invariant a persisted session must satisfy.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !PLAYER_RANGE.contains(&self.total_players) {
            return Err(SettingsError::PlayerCount {
                got: self.total_players,
            });
        }
        if !DURATION_RANGE.contains(&self.game_duration_minutes) {
            return Err(SettingsError::Duration {
                got: self.game_duration_minutes,
            });
        }
        let max = max_mafia(self.total_players);
        if self.mafia_count < 1 || self.mafia_count > max {
            return Err(SettingsError::MafiaCount {
                got: self.mafia_count,
                max,
            });
        }
        Ok(())
    }
}
