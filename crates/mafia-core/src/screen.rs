//! Top-level application state: which screen is showing and what it holds.
//!
//! A single [`Screen`] value replaces loose "started / ended / host" flags:
//! each variant carries exactly the data its view renders.

use crate::join_code::JoinCodeKind;
use crate::lobby::Lobby;
use crate::results::PlayerResult;
use crate::session::SessionRecord;
use crate::settings::GameSettings;

/// A trimmed, non-empty display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Create-game dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub settings: GameSettings,
    pub error: Option<String>,
    /// A create request is in flight; submit actions are disabled.
    pub creating: bool,
}

impl CreateForm {
    /// "2 Mafia vs 4 Civilians".
    pub fn summary(&self) -> String {
        let civilians = self.settings.civilian_count();
        let noun = if civilians == 1 { "Civilian" } else { "Civilians" };
        format!("{} Mafia vs {civilians} {noun}", self.settings.mafia_count())
    }

    pub fn duration_summary(&self) -> String {
        let minutes = self.settings.game_duration_minutes();
        let plural = if minutes == 1 { "" } else { "s" };
        format!("Game will last {minutes} minute{plural}")
    }
}

/// What the join dialog shows.
///
/// `Loaded` with no sessions ("no games available") and `NoData` (the store
/// answered without a payload) are distinct from `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    Loading,
    Loaded(Vec<SessionRecord>),
    NoData,
    Failed(String),
}

impl DiscoveryState {
    pub fn sessions(&self) -> &[SessionRecord] {
        match self {
            DiscoveryState::Loaded(sessions) => sessions,
            _ => &[],
        }
    }

    /// Placeholder text when there is no list to show.
    pub fn message(&self) -> Option<String> {
        match self {
            DiscoveryState::Loading => Some("Loading games...".to_string()),
            DiscoveryState::Loaded(s) if s.is_empty() => Some("No games available".to_string()),
            DiscoveryState::Loaded(_) => None,
            DiscoveryState::NoData => Some("The server returned no data".to_string()),
            DiscoveryState::Failed(e) => Some(format!("Failed to load games: {e}")),
        }
    }
}

/// Join-game dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDialog {
    pub discovery: DiscoveryState,
    pub selected: usize,
    /// A seat request is in flight.
    pub joining: bool,
}

impl JoinDialog {
    pub fn new() -> Self {
        Self {
            discovery: DiscoveryState::Loading,
            selected: 0,
            joining: false,
        }
    }

    pub fn selected_session(&self) -> Option<&SessionRecord> {
        self.discovery.sessions().get(self.selected)
    }

    pub fn select_next(&mut self) {
        let len = self.discovery.sessions().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn select_prev(&mut self) {
        let len = self.discovery.sessions().len();
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    /// Replace the listing, keeping the selection in bounds.
    pub fn set_discovery(&mut self, discovery: DiscoveryState) {
        self.discovery = discovery;
        let len = self.discovery.sessions().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

impl Default for JoinDialog {
    fn default() -> Self {
        Self::new()
    }
}

/// An entered session: lobby, round and results.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub lobby: Lobby,
    /// Roster id of the local player.
    pub local_id: String,
    /// Filled when the round ends.
    pub results: Vec<PlayerResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// Username entry; gates everything else.
    Identity,
    Home,
    Create(CreateForm),
    Join(JoinDialog),
    Session(SessionView),
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Identity => "identity",
            Screen::Home => "home",
            Screen::Create(_) => "create",
            Screen::Join(_) => "join",
            Screen::Session(_) => "session",
        }
    }
}

/// User actions forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ConfirmName(String),
    OpenCreate,
    OpenJoin,
    CloseDialog,
    SetTotalPlayers(u32),
    SetMafiaCount(u32),
    SetDuration(u32),
    CreateGame(JoinCodeKind),
    RefreshSessions,
    SelectNext,
    SelectPrev,
    Join(String),
    StartGame,
    ForceEnd,
    NewRound,
    EndGame,
    Leave,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub display_name: Option<DisplayName>,
    pub screen: Screen,
    /// Latest one-line notice (errors, blocked actions).
    pub notice: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            display_name: None,
            screen: Screen::Identity,
            notice: None,
        }
    }

    pub fn name(&self) -> &str {
        self.display_name.as_ref().map(DisplayName::as_str).unwrap_or("")
    }

    pub fn session(&self) -> Option<&SessionView> {
        match &self.screen {
            Screen::Session(view) => Some(view),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut SessionView> {
        match &mut self.screen {
            Screen::Session(view) => Some(view),
            _ => None,
        }
    }
}
