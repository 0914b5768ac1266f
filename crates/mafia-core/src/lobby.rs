//! Lobby → countdown → reveal → round → results state machine.
//!
//! [`transition`] is a pure function from the current [`Phase`] and a
//! [`LobbyEvent`] to the next phase. [`Lobby`] bundles the phase with the
//! settings and roster the guards need. Timers live outside: the driver feeds
//! one [`LobbyEvent::Tick`] per second while [`Phase::needs_ticker`] holds and
//! one [`LobbyEvent::RevealElapsed`] after [`REVEAL_DELAY`] in
//! [`Phase::RoleAssigned`].

use std::time::Duration;

use thiserror::Error;

use crate::role::Role;
use crate::roster::{Roster, StartBlocker};
use crate::settings::GameSettings;

/// Countdown start value once the host presses start.
pub const START_COUNTDOWN_SECS: u32 = 5;

/// Pause between the countdown hitting zero and the role reveal.
pub const REVEAL_DELAY: Duration = Duration::from_millis(500);

/// Period of countdown and round ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Round timer
// ---------------------------------------------------------------------------

/// Outcome of a single [`RoundTimer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Running { remaining: u32 },
    /// This tick brought the timer to zero. Returned exactly once.
    Expired,
    /// The timer already expired; the tick had no effect.
    Stopped,
}

/// Round countdown in whole seconds.
///
/// A tick with one second (or less) left sets the timer to zero and reports
/// [`TimerTick::Expired`]; every later tick reports [`TimerTick::Stopped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTimer {
    total_secs: u32,
    remaining_secs: u32,
    expired: bool,
}

impl RoundTimer {
    pub fn new(total_secs: u32) -> Self {
        Self {
            total_secs,
            remaining_secs: total_secs,
            expired: false,
        }
    }

    pub fn tick(&mut self) -> TimerTick {
        if self.expired {
            return TimerTick::Stopped;
        }
        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            self.expired = true;
            return TimerTick::Expired;
        }
        self.remaining_secs -= 1;
        TimerTick::Running {
            remaining: self.remaining_secs,
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Remaining time as `m:ss`.
    pub fn display(&self) -> String {
        format!(
            "{}:{:02}",
            self.remaining_secs / 60,
            self.remaining_secs % 60
        )
    }

    /// Remaining time as a percentage of the round.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        f64::from(self.remaining_secs) / f64::from(self.total_secs) * 100.0
    }
}

// ---------------------------------------------------------------------------
// Phases and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Players accruing; host may start once the guard passes.
    Waiting,
    /// Start pressed. The role is drawn up front and revealed later.
    Countdown { remaining: u32, role: Role },
    /// Countdown hit zero; waiting out [`REVEAL_DELAY`].
    RoleAssigned { role: Role },
    RoundRunning { role: Role, timer: RoundTimer },
    RoundEnded { role: Role },
    /// Host ended the game.
    Closed,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Countdown { .. } => "countdown",
            Phase::RoleAssigned { .. } => "role assigned",
            Phase::RoundRunning { .. } => "round running",
            Phase::RoundEnded { .. } => "round ended",
            Phase::Closed => "closed",
        }
    }

    /// Whether one-second ticks must be delivered in this phase.
    pub fn needs_ticker(&self) -> bool {
        matches!(self, Phase::Countdown { .. } | Phase::RoundRunning { .. })
    }

    pub fn awaiting_reveal(&self) -> bool {
        matches!(self, Phase::RoleAssigned { .. })
    }

    /// Role of the local player, once drawn.
    pub fn role(&self) -> Option<Role> {
        match self {
            Phase::Countdown { role, .. }
            | Phase::RoleAssigned { role }
            | Phase::RoundRunning { role, .. }
            | Phase::RoundEnded { role } => Some(*role),
            Phase::Waiting | Phase::Closed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyEvent {
    /// Host pressed start; `role` is the local player's draw for the round.
    Start { role: Role },
    Tick,
    RevealElapsed,
    /// Host ended the running round early.
    ForceEnd,
    NewRound,
    EndGame,
}

impl LobbyEvent {
    pub fn name(self) -> &'static str {
        match self {
            LobbyEvent::Start { .. } => "start",
            LobbyEvent::Tick => "tick",
            LobbyEvent::RevealElapsed => "reveal",
            LobbyEvent::ForceEnd => "force end",
            LobbyEvent::NewRound => "new round",
            LobbyEvent::EndGame => "end game",
        }
    }

    fn host_only(self) -> bool {
        matches!(
            self,
            LobbyEvent::Start { .. }
                | LobbyEvent::ForceEnd
                | LobbyEvent::NewRound
                | LobbyEvent::EndGame
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("{}", .0.first().map(|b| b.message()).unwrap_or_default())]
    Blocked(Vec<StartBlocker>),

    #[error("only the host can {0}")]
    NotHost(&'static str),

    #[error("cannot {event} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        event: &'static str,
    },
}

/// Inputs the transition guards consult.
#[derive(Debug, Clone, Copy)]
pub struct Guards<'a> {
    pub settings: &'a GameSettings,
    pub roster: &'a Roster,
    pub is_host: bool,
}

/// Compute the phase following `event`.
pub fn transition(phase: &Phase, event: LobbyEvent, guards: Guards<'_>) -> Result<Phase, LobbyError> {
    if event.host_only() && !guards.is_host {
        return Err(LobbyError::NotHost(event.name()));
    }

    let next = match (phase, event) {
        (Phase::Waiting, LobbyEvent::Start { role }) => {
            let blockers = guards.roster.start_blockers(guards.settings.total_players());
            if !blockers.is_empty() {
                return Err(LobbyError::Blocked(blockers));
            }
            Phase::Countdown {
                remaining: START_COUNTDOWN_SECS,
                role,
            }
        }
        (Phase::Countdown { remaining: 0, role }, LobbyEvent::Tick) => {
            Phase::RoleAssigned { role: *role }
        }
        (Phase::Countdown { remaining, role }, LobbyEvent::Tick) => Phase::Countdown {
            remaining: remaining - 1,
            role: *role,
        },
        (Phase::RoleAssigned { role }, LobbyEvent::RevealElapsed) => Phase::RoundRunning {
            role: *role,
            timer: RoundTimer::new(guards.settings.round_secs()),
        },
        (Phase::RoundRunning { role, timer }, LobbyEvent::Tick) => {
            let mut timer = timer.clone();
            match timer.tick() {
                TimerTick::Running { .. } => Phase::RoundRunning { role: *role, timer },
                TimerTick::Expired | TimerTick::Stopped => Phase::RoundEnded { role: *role },
            }
        }
        (Phase::RoundRunning { role, .. }, LobbyEvent::ForceEnd) => {
            Phase::RoundEnded { role: *role }
        }
        (Phase::RoundEnded { .. }, LobbyEvent::NewRound) => Phase::Waiting,
        (Phase::RoundEnded { .. }, LobbyEvent::EndGame) => Phase::Closed,
        (phase, event) => {
            return Err(LobbyError::InvalidTransition {
                phase: phase.name(),
                event: event.name(),
            });
        }
    };
    Ok(next)
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// A joined session as seen by the local player.
#[derive(Debug, Clone, PartialEq)]
pub struct Lobby {
    pub session_id: Option<String>,
    pub settings: GameSettings,
    pub roster: Roster,
    pub is_host: bool,
    pub phase: Phase,
}

impl Lobby {
    pub fn new(
        session_id: Option<String>,
        settings: GameSettings,
        roster: Roster,
        is_host: bool,
    ) -> Self {
        Self {
            session_id,
            settings,
            roster,
            is_host,
            phase: Phase::Waiting,
        }
    }

    pub fn guards(&self) -> Guards<'_> {
        Guards {
            settings: &self.settings,
            roster: &self.roster,
            is_host: self.is_host,
        }
    }

    /// Apply `event`, leaving the phase untouched on error.
    pub fn apply(&mut self, event: LobbyEvent) -> Result<&Phase, LobbyError> {
        self.phase = transition(&self.phase, event, self.guards())?;
        Ok(&self.phase)
    }

    /// Seat players counted on the stored record. Only a waiting lobby takes
    /// new seats; returns how many were added.
    pub fn sync_player_count(&mut self, current_players: u32) -> usize {
        if self.phase != Phase::Waiting {
            return 0;
        }
        self.roster.fill_seats(current_players)
    }

    pub fn start_blockers(&self) -> Vec<StartBlocker> {
        self.roster.start_blockers(self.settings.total_players())
    }

    pub fn start_label(&self) -> String {
        self.roster.start_label(self.settings.total_players())
    }

    pub fn join_code(&self) -> &str {
        self.settings.join_code().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::PlayerView;

    fn test_lobby(total: u32, minutes: u32) -> Lobby {
        let settings = GameSettings::new(total, 1, minutes).with_join_code("TEST00");
        let roster = Roster::for_host("Host", &settings);
        Lobby::new(Some("s1".to_string()), settings, roster, true)
    }

    fn run_to_round(lobby: &mut Lobby, role: Role) {
        lobby.apply(LobbyEvent::Start { role }).unwrap();
        for _ in 0..=START_COUNTDOWN_SECS {
            lobby.apply(LobbyEvent::Tick).unwrap();
        }
        assert_eq!(lobby.phase, Phase::RoleAssigned { role });
        lobby.apply(LobbyEvent::RevealElapsed).unwrap();
    }

    #[test]
    fn timer_expires_once_after_sixty_ticks() {
        let mut timer = RoundTimer::new(60);
        for i in 1..60 {
            assert_eq!(timer.tick(), TimerTick::Running { remaining: 60 - i });
        }
        assert_eq!(timer.remaining_secs(), 1);
        assert_eq!(timer.tick(), TimerTick::Expired);
        assert_eq!(timer.remaining_secs(), 0);
        for _ in 0..5 {
            assert_eq!(timer.tick(), TimerTick::Stopped);
        }
        assert!(timer.is_expired());
    }

    #[test]
    fn zero_length_timer_expires_on_first_tick() {
        let mut timer = RoundTimer::new(0);
        assert_eq!(timer.tick(), TimerTick::Expired);
        assert_eq!(timer.tick(), TimerTick::Stopped);
    }

    #[test]
    fn timer_display_and_progress() {
        let mut timer = RoundTimer::new(125);
        assert_eq!(timer.display(), "2:05");
        assert_eq!(timer.progress(), 100.0);
        timer.tick();
        assert_eq!(timer.display(), "2:04");
        assert!(timer.progress() < 100.0);
    }

    #[test]
    fn countdown_runs_from_five_to_zero() {
        let mut lobby = test_lobby(4, 1);
        lobby.apply(LobbyEvent::Start { role: Role::Mafia }).unwrap();
        let mut seen = Vec::new();
        while let Phase::Countdown { remaining, .. } = lobby.phase {
            seen.push(remaining);
            lobby.apply(LobbyEvent::Tick).unwrap();
        }
        assert_eq!(seen, vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(lobby.phase, Phase::RoleAssigned { role: Role::Mafia });
        assert!(lobby.phase.awaiting_reveal());
        assert!(!lobby.phase.needs_ticker());
    }

    #[test]
    fn one_minute_round_ends_after_sixty_ticks() {
        let mut lobby = test_lobby(4, 1);
        run_to_round(&mut lobby, Role::Civilian);

        let mut ticks = 0;
        while matches!(lobby.phase, Phase::RoundRunning { .. }) {
            lobby.apply(LobbyEvent::Tick).unwrap();
            ticks += 1;
        }
        assert_eq!(ticks, 60);
        assert_eq!(lobby.phase, Phase::RoundEnded { role: Role::Civilian });
        // The ticker is gone in this phase, and a stray tick is rejected.
        assert!(!lobby.phase.needs_ticker());
        assert!(matches!(
            lobby.apply(LobbyEvent::Tick),
            Err(LobbyError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn start_blocked_until_fourth_player_ready() {
        let settings = GameSettings::new(4, 1, 5).with_join_code("GAME00");
        let mut roster = Roster::for_host("Host", &settings);
        for n in 2..=4 {
            roster.push(PlayerView {
                id: n.to_string(),
                display_name: format!("Player {n}"),
                avatar_ref: String::new(),
                is_host: false,
                is_ready: n != 4,
            });
        }
        let mut lobby = Lobby::new(None, settings, roster, true);

        let err = lobby.apply(LobbyEvent::Start { role: Role::Civilian }).unwrap_err();
        assert_eq!(
            err,
            LobbyError::Blocked(vec![StartBlocker::PlayersNotReady { waiting: 1 }])
        );
        assert_eq!(err.to_string(), "Waiting for all players to be ready...");
        assert_eq!(lobby.phase, Phase::Waiting);

        assert!(lobby.roster.set_ready("4", true));
        lobby.apply(LobbyEvent::Start { role: Role::Civilian }).unwrap();
        assert!(matches!(lobby.phase, Phase::Countdown { remaining: 5, .. }));
    }

    #[test]
    fn start_blocked_by_missing_players() {
        let settings = GameSettings::new(6, 2, 5).with_join_code("GAME00");
        let roster = Roster::for_host("Host", &settings);
        let mut lobby = Lobby::new(None, settings, roster, true);
        assert_eq!(lobby.start_label(), "Waiting for 5 more players...");
        assert!(matches!(
            lobby.apply(LobbyEvent::Start { role: Role::Mafia }),
            Err(LobbyError::Blocked(_))
        ));
    }

    #[test]
    fn stored_player_count_unblocks_start() {
        let settings = GameSettings::new(4, 1, 5).with_join_code("GAME00");
        let roster = Roster::for_host("Host", &settings);
        let mut lobby = Lobby::new(None, settings, roster, true);

        assert_eq!(lobby.sync_player_count(3), 2);
        assert_eq!(lobby.start_label(), "Waiting for 1 more players...");
        assert_eq!(lobby.sync_player_count(4), 1);
        lobby.apply(LobbyEvent::Start { role: Role::Civilian }).unwrap();

        // Seats are frozen once the countdown starts.
        assert_eq!(lobby.sync_player_count(6), 0);
        assert_eq!(lobby.roster.len(), 4);
    }

    #[test]
    fn guests_cannot_drive_the_round() {
        let mut lobby = test_lobby(4, 1);
        lobby.is_host = false;
        assert_eq!(
            lobby.apply(LobbyEvent::Start { role: Role::Mafia }),
            Err(LobbyError::NotHost("start"))
        );
    }

    #[test]
    fn force_end_then_new_round_or_close() {
        let mut lobby = test_lobby(4, 10);
        run_to_round(&mut lobby, Role::Detective);
        lobby.apply(LobbyEvent::ForceEnd).unwrap();
        assert_eq!(lobby.phase.role(), Some(Role::Detective));

        lobby.apply(LobbyEvent::NewRound).unwrap();
        assert_eq!(lobby.phase, Phase::Waiting);
        assert_eq!(lobby.phase.role(), None);

        run_to_round(&mut lobby, Role::Mafia);
        lobby.apply(LobbyEvent::ForceEnd).unwrap();
        lobby.apply(LobbyEvent::EndGame).unwrap();
        assert_eq!(lobby.phase, Phase::Closed);
    }

    #[test]
    fn out_of_order_events_rejected() {
        let mut lobby = test_lobby(4, 1);
        assert_eq!(
            lobby.apply(LobbyEvent::RevealElapsed),
            Err(LobbyError::InvalidTransition {
                phase: "waiting",
                event: "reveal",
            })
        );
        assert!(lobby.apply(LobbyEvent::EndGame).is_err());
        assert_eq!(lobby.phase, Phase::Waiting);
    }
}
