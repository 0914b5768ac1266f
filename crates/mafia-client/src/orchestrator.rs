//! Session orchestrator: owns the [`AppState`] and drives every transition.
//!
//! Frontends forward user actions with [`SessionOrchestrator::dispatch`] and
//! then await [`SessionOrchestrator::recv`] in their event loop, re-rendering
//! when it reports [`PollResult::Updated`]. Store calls, round timers and the
//! discovery change feed all run as background tasks that report back through
//! one internal channel, so state is only ever mutated on the caller's task.
//!
//! Status writes go through a single writer task so the hosted row always
//! ends on the latest phase.
//!
//! Two epoch counters keep late work from leaking into a newer view:
//! `timer_epoch` is stamped on every tick and reveal, and `view_epoch` on
//! every store request. Leaving a screen bumps both, so anything still in
//! flight arrives stale and is dropped.

use std::sync::Arc;

use mafia_core::join_code::{JoinCodeKind, generate_join_code};
use mafia_core::lobby::{Lobby, LobbyEvent, Phase, REVEAL_DELAY, TICK_PERIOD};
use mafia_core::results::round_results;
use mafia_core::role::assign_role;
use mafia_core::roster::{HOST_SEAT, Roster};
use mafia_core::screen::{
    AppState, CreateForm, DiscoveryState, DisplayName, Intent, JoinDialog, Screen, SessionView,
};
use mafia_core::session::{NewSession, SESSIONS_TABLE, SessionFilter, SessionRecord, SessionStatus};
use mafia_core::settings::{GameSettings, SettingsError};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::discovery::{FetchSequencer, FetchTicket, list_open_sessions};
use crate::store::{ChangeEvent, SessionStore, StoreError, StoreResult, Subscription};
use crate::ticker::Ticker;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] SettingsError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("no data returned after insert")]
    NoData,
}

/// Persist a new waiting session hosted by `host_name`.
///
/// The mafia count is re-clamped against the player count before anything is
/// written, and out-of-range settings are rejected without touching the store.
pub async fn create_session<S: SessionStore>(
    store: &S,
    settings: &GameSettings,
    host_name: &str,
    kind: JoinCodeKind,
) -> Result<SessionRecord, SessionError> {
    let code = generate_join_code(kind);
    let settings = GameSettings::new(
        settings.total_players(),
        settings.mafia_count(),
        settings.game_duration_minutes(),
    )
    .with_join_code(code.clone());
    settings.validate()?;

    tracing::info!(
        code = %code,
        total = settings.total_players(),
        mafia = settings.mafia_count(),
        minutes = settings.game_duration_minutes(),
        "creating session"
    );
    let record = store
        .insert(NewSession::waiting(&settings, host_name, &code))
        .await?
        .ok_or(SessionError::NoData)?;
    tracing::info!(id = %record.id, code = %record.game_code, "session created");
    Ok(record)
}

// ---------------------------------------------------------------------------
// Internal events
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Internal {
    Tick {
        epoch: u64,
    },
    RevealElapsed {
        epoch: u64,
    },
    Created {
        epoch: u64,
        result: Result<SessionRecord, SessionError>,
    },
    Subscribed {
        epoch: u64,
        result: Result<Subscription, StoreError>,
    },
    Joined {
        epoch: u64,
        result: StoreResult<SessionRecord>,
    },
    LobbyRefreshed {
        epoch: u64,
        ticket: FetchTicket,
        result: StoreResult<Vec<SessionRecord>>,
    },
    Fetched {
        epoch: u64,
        ticket: FetchTicket,
        state: DiscoveryState,
    },
    StatusUpdated {
        status: SessionStatus,
        result: Result<(), StoreError>,
    },
}

enum Wake {
    Internal(Internal),
    Change(ChangeEvent),
    FeedClosed,
}

/// Outcome of one [`SessionOrchestrator::recv`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// State changed; re-render.
    Updated,
    /// Something was processed but nothing visible changed.
    Unchanged,
}

/// Status the hosted row should take after a lobby event, if any.
fn status_after(event: LobbyEvent) -> Option<SessionStatus> {
    match event {
        LobbyEvent::Start { .. } => Some(SessionStatus::InProgress),
        LobbyEvent::NewRound => Some(SessionStatus::Waiting),
        LobbyEvent::EndGame => Some(SessionStatus::Ended),
        _ => None,
    }
}

async fn next_change(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

/// A queued write of `status` to the row with the given id.
type StatusWrite = (String, SessionStatus);

/// Spawn the task that applies status writes one at a time, in queue order.
fn spawn_status_writer<S: SessionStore>(
    store: Arc<S>,
    events: mpsc::UnboundedSender<Internal>,
) -> mpsc::UnboundedSender<StatusWrite> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StatusWrite>();
    tokio::spawn(async move {
        while let Some((id, status)) = rx.recv().await {
            let result = store.update_status(&id, status).await;
            if events.send(Internal::StatusUpdated { status, result }).is_err() {
                break;
            }
        }
    });
    tx
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct SessionOrchestrator<S: SessionStore> {
    store: Arc<S>,
    state: AppState,
    tx: mpsc::UnboundedSender<Internal>,
    rx: mpsc::UnboundedReceiver<Internal>,
    timer_epoch: u64,
    view_epoch: u64,
    ticker: Option<Ticker>,
    reveal: Option<Ticker>,
    subscription: Option<Subscription>,
    fetches: FetchSequencer,
    status_writer: Option<mpsc::UnboundedSender<StatusWrite>>,
}

impl<S: SessionStore> SessionOrchestrator<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            state: AppState::new(),
            tx,
            rx,
            timer_epoch: 0,
            view_epoch: 0,
            ticker: None,
            reveal: None,
            subscription: None,
            fetches: FetchSequencer::new(),
            status_writer: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Whether a store change feed is open.
    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether a countdown or round ticker is scheduled.
    pub fn has_ticker(&self) -> bool {
        self.ticker.is_some()
    }

    /// Apply a user action. Must be called from within a Tokio runtime.
    ///
    /// Actions that make no sense on the current screen are ignored.
    pub fn dispatch(&mut self, intent: Intent) {
        tracing::debug!(?intent, screen = self.state.screen.name(), "dispatch");
        self.state.notice = None;

        match intent {
            Intent::ConfirmName(input) => self.confirm_name(&input),
            Intent::OpenCreate => {
                if matches!(self.state.screen, Screen::Home) {
                    self.state.screen = Screen::Create(CreateForm::default());
                }
            }
            Intent::OpenJoin => {
                if matches!(self.state.screen, Screen::Home) {
                    self.state.screen = Screen::Join(JoinDialog::new());
                    self.watch_sessions();
                }
            }
            Intent::CloseDialog => {
                if matches!(self.state.screen, Screen::Create(_) | Screen::Join(_)) {
                    self.teardown();
                    self.state.screen = Screen::Home;
                }
            }
            Intent::SetTotalPlayers(n) => {
                if let Screen::Create(form) = &mut self.state.screen {
                    form.settings.set_total_players(n);
                }
            }
            Intent::SetMafiaCount(n) => {
                if let Screen::Create(form) = &mut self.state.screen {
                    form.settings.set_mafia_count(n);
                }
            }
            Intent::SetDuration(n) => {
                if let Screen::Create(form) = &mut self.state.screen {
                    form.settings.set_game_duration_minutes(n);
                }
            }
            Intent::CreateGame(kind) => self.create_game(kind),
            Intent::RefreshSessions => {
                if matches!(self.state.screen, Screen::Join(_)) {
                    self.fetch_sessions();
                }
            }
            Intent::SelectNext => {
                if let Screen::Join(dialog) = &mut self.state.screen {
                    dialog.select_next();
                }
            }
            Intent::SelectPrev => {
                if let Screen::Join(dialog) = &mut self.state.screen {
                    dialog.select_prev();
                }
            }
            Intent::Join(id) => self.join(&id),
            Intent::StartGame => self.start_round(),
            Intent::ForceEnd => {
                self.apply_lobby(LobbyEvent::ForceEnd);
            }
            Intent::NewRound => {
                self.apply_lobby(LobbyEvent::NewRound);
            }
            Intent::EndGame => {
                self.apply_lobby(LobbyEvent::EndGame);
            }
            Intent::Leave => {
                if let Some(view) = self.state.session() {
                    tracing::info!(session = ?view.lobby.session_id, "leaving session");
                    self.teardown();
                    self.state.screen = Screen::Home;
                }
            }
        }
    }

    /// Wait for the next background result and fold it into the state.
    pub async fn recv(&mut self) -> PollResult {
        let wake = tokio::select! {
            Some(event) = self.rx.recv() => Wake::Internal(event),
            change = next_change(&mut self.subscription) => match change {
                Some(change) => Wake::Change(change),
                None => Wake::FeedClosed,
            },
        };
        match wake {
            Wake::Internal(event) => self.handle(event),
            Wake::Change(change) => {
                tracing::debug!(table = %change.table, kind = ?change.kind, "store changed");
                if matches!(self.state.screen, Screen::Join(_)) {
                    self.fetch_sessions();
                } else if matches!(self.state.screen, Screen::Session(_)) {
                    self.refresh_lobby();
                }
                PollResult::Unchanged
            }
            Wake::FeedClosed => {
                self.subscription = None;
                tracing::warn!(screen = self.state.screen.name(), "change feed closed");
                self.state.notice =
                    Some("Live updates unavailable: the change feed closed".to_string());
                PollResult::Updated
            }
        }
    }

    // -- intents --

    fn confirm_name(&mut self, input: &str) {
        if !matches!(self.state.screen, Screen::Identity) {
            return;
        }
        match DisplayName::parse(input) {
            Some(name) => {
                tracing::info!(name = name.as_str(), "name confirmed");
                self.state.display_name = Some(name);
                self.state.screen = Screen::Home;
            }
            None => self.state.notice = Some("Please enter a name".to_string()),
        }
    }

    fn create_game(&mut self, kind: JoinCodeKind) {
        let host_name = self.state.name().to_string();
        let Screen::Create(form) = &mut self.state.screen else {
            return;
        };
        if form.creating {
            return;
        }
        form.creating = true;
        form.error = None;
        let settings = form.settings.clone();

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let epoch = self.view_epoch;
        tokio::spawn(async move {
            let result = create_session(store.as_ref(), &settings, &host_name, kind).await;
            let _ = tx.send(Internal::Created { epoch, result });
        });
    }

    /// Ask the store for a seat. The lobby opens once the seat is confirmed.
    fn join(&mut self, id: &str) {
        let Screen::Join(dialog) = &mut self.state.screen else {
            return;
        };
        if dialog.joining {
            return;
        }
        let Some(record) = dialog.discovery.sessions().iter().find(|r| r.id == id).cloned() else {
            self.state.notice = Some("That game is no longer listed".to_string());
            return;
        };
        if !record.is_joinable() {
            self.state.notice = Some(format!("{} is {}", record.title(), record.badge()));
            return;
        }
        dialog.joining = true;

        tracing::info!(
            id = %record.id,
            code = %record.game_code,
            seen = record.current_players,
            "requesting seat"
        );
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let epoch = self.view_epoch;
        tokio::spawn(async move {
            let result = store.add_player(&record.id, record.current_players).await;
            let _ = tx.send(Internal::Joined { epoch, result });
        });
    }

    fn start_round(&mut self) {
        let Some(view) = self.state.session() else {
            return;
        };
        let settings = &view.lobby.settings;
        let role = assign_role(
            &mut rand::rng(),
            settings.total_players(),
            settings.mafia_count(),
        );
        self.apply_lobby(LobbyEvent::Start { role });
    }

    // -- lobby --

    /// Run `event` through the lobby state machine, then sync timers, results
    /// and the hosted status with the new phase.
    fn apply_lobby(&mut self, event: LobbyEvent) -> bool {
        let Some(view) = self.state.session_mut() else {
            return false;
        };
        let outcome = view.lobby.apply(event).map(Phase::name);
        match outcome {
            Ok(phase) => {
                tracing::debug!(event = event.name(), phase, "lobby transition");
                if let Some(status) = status_after(event) {
                    self.push_status(status);
                }
                self.after_transition();
                true
            }
            Err(e) => {
                tracing::debug!(event = event.name(), error = %e, "lobby event rejected");
                self.state.notice = Some(e.to_string());
                false
            }
        }
    }

    fn after_transition(&mut self) {
        let Some(view) = self.state.session_mut() else {
            return;
        };
        match &view.lobby.phase {
            Phase::RoundEnded { role } if view.results.is_empty() => {
                view.results = round_results(
                    &mut rand::rng(),
                    &view.lobby.roster,
                    &view.local_id,
                    *role,
                    &view.lobby.settings,
                );
            }
            Phase::Waiting => view.results.clear(),
            Phase::Closed => {
                tracing::info!(session = ?view.lobby.session_id, "session ended");
                self.teardown();
                self.state.screen = Screen::Home;
                return;
            }
            _ => {}
        }
        self.reconcile_timers();
    }

    /// Start or stop the ticker and reveal delay to match the current phase.
    fn reconcile_timers(&mut self) {
        let phase = self.state.session().map(|v| &v.lobby.phase);
        let wants_ticker = phase.is_some_and(Phase::needs_ticker);
        let wants_reveal = phase.is_some_and(Phase::awaiting_reveal);

        if !wants_ticker && self.ticker.take().is_some() {
            self.timer_epoch += 1;
        }
        if !wants_reveal && self.reveal.take().is_some() {
            self.timer_epoch += 1;
        }
        if wants_ticker && self.ticker.is_none() {
            self.timer_epoch += 1;
            let epoch = self.timer_epoch;
            self.ticker = Some(Ticker::every(TICK_PERIOD, self.tx.clone(), move || {
                Internal::Tick { epoch }
            }));
        }
        if wants_reveal && self.reveal.is_none() {
            self.timer_epoch += 1;
            let epoch = self.timer_epoch;
            self.reveal = Some(Ticker::once(REVEAL_DELAY, self.tx.clone(), move || {
                Internal::RevealElapsed { epoch }
            }));
        }
    }

    /// Mirror the lobby's progress onto the hosted row. Guests never write.
    fn push_status(&mut self, status: SessionStatus) {
        let Some(view) = self.state.session() else {
            return;
        };
        if !view.lobby.is_host {
            return;
        }
        let Some(id) = view.lobby.session_id.clone() else {
            return;
        };

        let writer = self
            .status_writer
            .get_or_insert_with(|| spawn_status_writer(Arc::clone(&self.store), self.tx.clone()));
        if writer.send((id, status)).is_err() {
            tracing::error!(%status, "status writer stopped");
        }
    }

    // -- discovery --

    fn subscribe_changes(&mut self) {
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let epoch = self.view_epoch;
        tokio::spawn(async move {
            let result = store.subscribe(SESSIONS_TABLE).await;
            let _ = tx.send(Internal::Subscribed { epoch, result });
        });
    }

    fn watch_sessions(&mut self) {
        self.subscribe_changes();
        self.fetch_sessions();
    }

    /// Follow the entered session's own row so new players show up.
    fn watch_lobby(&mut self) {
        self.subscribe_changes();
        self.refresh_lobby();
    }

    fn refresh_lobby(&mut self) {
        let Some(id) = self.state.session().and_then(|v| v.lobby.session_id.clone()) else {
            return;
        };
        let ticket = self.fetches.begin();
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let epoch = self.view_epoch;
        tokio::spawn(async move {
            let result = store.select(SessionFilter::id(id)).await;
            let _ = tx.send(Internal::LobbyRefreshed {
                epoch,
                ticket,
                result,
            });
        });
    }

    fn fetch_sessions(&mut self) {
        let ticket = self.fetches.begin();
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let epoch = self.view_epoch;
        tokio::spawn(async move {
            let state = list_open_sessions(store.as_ref()).await;
            let _ = tx.send(Internal::Fetched {
                epoch,
                ticket,
                state,
            });
        });
    }

    /// Drop timers and the change feed, and invalidate in-flight work.
    fn teardown(&mut self) {
        self.ticker = None;
        self.reveal = None;
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
        self.timer_epoch += 1;
        self.view_epoch += 1;
    }

    // -- background results --

    fn handle(&mut self, event: Internal) -> PollResult {
        match event {
            Internal::Tick { epoch } => {
                if epoch != self.timer_epoch {
                    return PollResult::Unchanged;
                }
                self.apply_lobby(LobbyEvent::Tick);
                PollResult::Updated
            }
            Internal::RevealElapsed { epoch } => {
                if epoch != self.timer_epoch {
                    return PollResult::Unchanged;
                }
                self.reveal = None;
                self.apply_lobby(LobbyEvent::RevealElapsed);
                PollResult::Updated
            }
            Internal::Created { epoch, result } => self.on_created(epoch, result),
            Internal::Joined { epoch, result } => self.on_joined(epoch, result),
            Internal::LobbyRefreshed {
                epoch,
                ticket,
                result,
            } => {
                if epoch != self.view_epoch || !self.fetches.accept(ticket) {
                    return PollResult::Unchanged;
                }
                self.on_lobby_refreshed(result)
            }
            Internal::Subscribed { epoch, result } => {
                if epoch != self.view_epoch {
                    return PollResult::Unchanged;
                }
                match result {
                    Ok(sub) => {
                        self.subscription = Some(sub);
                        PollResult::Unchanged
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "live session updates unavailable");
                        self.state.notice = Some(format!("Live updates unavailable: {e}"));
                        PollResult::Updated
                    }
                }
            }
            Internal::Fetched {
                epoch,
                ticket,
                state,
            } => {
                if epoch != self.view_epoch || !self.fetches.accept(ticket) {
                    tracing::debug!(?ticket, "discarding stale session listing");
                    return PollResult::Unchanged;
                }
                match &mut self.state.screen {
                    Screen::Join(dialog) => {
                        dialog.set_discovery(state);
                        PollResult::Updated
                    }
                    _ => PollResult::Unchanged,
                }
            }
            Internal::StatusUpdated { status, result } => match result {
                Ok(()) => {
                    tracing::debug!(%status, "session status stored");
                    PollResult::Unchanged
                }
                Err(e) => {
                    tracing::error!(%status, error = %e, "failed to store session status");
                    self.state.notice = Some(format!("Could not mark game {status}: {e}"));
                    PollResult::Updated
                }
            },
        }
    }

    fn on_created(&mut self, epoch: u64, result: Result<SessionRecord, SessionError>) -> PollResult {
        if epoch != self.view_epoch {
            if let Ok(record) = &result {
                tracing::info!(id = %record.id, "session created after dialog closed");
            }
            return PollResult::Unchanged;
        }
        let host_name = self.state.name().to_string();
        let Screen::Create(form) = &mut self.state.screen else {
            return PollResult::Unchanged;
        };

        match result {
            Ok(record) => {
                let settings = record.settings();
                let roster = Roster::for_host(&host_name, &settings);
                let lobby = Lobby::new(Some(record.id), settings, roster, true);
                self.teardown();
                self.state.screen = Screen::Session(SessionView {
                    lobby,
                    local_id: HOST_SEAT.to_string(),
                    results: Vec::new(),
                });
                self.watch_lobby();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create session");
                form.creating = false;
                form.error = Some(e.to_string());
            }
        }
        PollResult::Updated
    }

    fn on_joined(&mut self, epoch: u64, result: StoreResult<SessionRecord>) -> PollResult {
        if epoch != self.view_epoch {
            if let Ok(Some(record)) = &result {
                tracing::warn!(id = %record.id, "seat taken after join dialog closed");
            }
            return PollResult::Unchanged;
        }
        let guest_name = self.state.name().to_string();
        let Screen::Join(dialog) = &mut self.state.screen else {
            return PollResult::Unchanged;
        };
        dialog.joining = false;

        match result {
            Ok(Some(record)) => {
                let roster = Roster::for_guest(&record, &guest_name);
                let local_id = roster
                    .players()
                    .last()
                    .map(|p| p.id.clone())
                    .unwrap_or_default();
                tracing::info!(
                    id = %record.id,
                    code = %record.game_code,
                    seat = %local_id,
                    "joined session"
                );

                self.teardown();
                let lobby = Lobby::new(Some(record.id.clone()), record.settings(), roster, false);
                self.state.screen = Screen::Session(SessionView {
                    lobby,
                    local_id,
                    results: Vec::new(),
                });
                self.watch_lobby();
            }
            Ok(None) => {
                tracing::info!("seat count moved before join landed");
                self.state.notice = Some("That game changed before you joined; try again".to_string());
                self.fetch_sessions();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to join session");
                self.state.notice = Some(format!("Could not join: {e}"));
            }
        }
        PollResult::Updated
    }

    fn on_lobby_refreshed(&mut self, result: StoreResult<Vec<SessionRecord>>) -> PollResult {
        let rows = match result {
            Ok(rows) => rows.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh lobby");
                self.state.notice = Some(format!("Could not refresh players: {e}"));
                return PollResult::Updated;
            }
        };
        let Some(view) = self.state.session_mut() else {
            return PollResult::Unchanged;
        };
        let Some(record) = rows
            .iter()
            .find(|r| view.lobby.session_id.as_deref() == Some(r.id.as_str()))
        else {
            return PollResult::Unchanged;
        };

        let added = view.lobby.sync_player_count(record.current_players);
        if added == 0 {
            return PollResult::Unchanged;
        }
        tracing::info!(added, players = view.lobby.roster.len(), "players joined");
        PollResult::Updated
    }
}
