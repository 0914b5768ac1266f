//! Ratatui TUI frontend for the Mafia client.
//!
//! Pure UI module: terminal lifecycle, rendering, and key → [`Intent`]
//! mapping. All application state lives in the orchestrator; the only state
//! kept here is what the user is still typing and which create-form field has
//! focus.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};
use std::io::{self, Stdout};

use mafia_core::join_code::JoinCodeKind;
use mafia_core::lobby::Phase;
use mafia_core::role::Role;
use mafia_core::screen::{AppState, CreateForm, Intent, JoinDialog, Screen, SessionView};
use mafia_core::session::SessionRecord;
use mafia_core::settings::{DURATION_RANGE, PLAYER_RANGE, max_mafia};

// ---------------------------------------------------------------------------
// UserIntent
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum UserIntent {
    None,
    Quit,
    /// Forward to the orchestrator.
    Send(Intent),
}

// ---------------------------------------------------------------------------
// TUI-only state
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum CreateField {
    #[default]
    Players,
    Mafia,
    Duration,
}

impl CreateField {
    const ALL: [CreateField; 3] = [CreateField::Players, CreateField::Mafia, CreateField::Duration];

    fn next(self) -> Self {
        match self {
            CreateField::Players => CreateField::Mafia,
            CreateField::Mafia => CreateField::Duration,
            CreateField::Duration => CreateField::Players,
        }
    }

    fn prev(self) -> Self {
        match self {
            CreateField::Players => CreateField::Duration,
            CreateField::Mafia => CreateField::Players,
            CreateField::Duration => CreateField::Mafia,
        }
    }

    fn label(self) -> &'static str {
        match self {
            CreateField::Players => "Total Players",
            CreateField::Mafia => "Mafia Members",
            CreateField::Duration => "Game Duration",
        }
    }

    /// Current value and its allowed bounds.
    fn value(self, form: &CreateForm) -> (u32, u32, u32) {
        let s = &form.settings;
        match self {
            CreateField::Players => (s.total_players(), *PLAYER_RANGE.start(), *PLAYER_RANGE.end()),
            CreateField::Mafia => (s.mafia_count(), 1, max_mafia(s.total_players()).max(1)),
            CreateField::Duration => (
                s.game_duration_minutes(),
                *DURATION_RANGE.start(),
                *DURATION_RANGE.end(),
            ),
        }
    }

    /// Intent moving this field by `delta`.
    fn adjust(self, form: &CreateForm, delta: i32) -> Intent {
        let (value, _, _) = self.value(form);
        let next = value.saturating_add_signed(delta);
        match self {
            CreateField::Players => Intent::SetTotalPlayers(next),
            CreateField::Mafia => Intent::SetMafiaCount(next),
            CreateField::Duration => Intent::SetDuration(next),
        }
    }
}

#[derive(Default)]
struct TuiState {
    /// Name input buffer
    name_input: String,
    /// Name input cursor position, in chars
    name_cursor: usize,
    create_field: CreateField,
    show_help: bool,
}

impl TuiState {
    fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index();
        self.name_input.insert(index, new_char);
        self.name_cursor += 1;
    }

    fn byte_index(&self) -> usize {
        self.name_input
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.name_cursor)
            .unwrap_or(self.name_input.len())
    }

    fn delete_char(&mut self) {
        if self.name_cursor == 0 {
            return;
        }
        let before = self.name_input.chars().take(self.name_cursor - 1);
        let after = self.name_input.chars().skip(self.name_cursor);
        self.name_input = before.chain(after).collect();
        self.name_cursor -= 1;
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.name_input.chars().count();
        self.name_cursor = self.name_cursor.saturating_add_signed(delta).min(len);
    }
}

// ---------------------------------------------------------------------------
// Tui
// ---------------------------------------------------------------------------

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: TuiState,
}

impl Tui {
    /// Enter raw mode and the alternate screen.
    pub fn setup() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self {
            terminal,
            state: TuiState::default(),
        })
    }

    pub fn teardown(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn render(&mut self, app: &AppState) -> io::Result<()> {
        self.terminal.draw(|f| ui(f, app, &self.state))?;
        Ok(())
    }

    /// Non-blocking: returns [`UserIntent::None`] when no key is pending.
    pub fn poll_and_handle_input(&mut self, app: &AppState) -> io::Result<UserIntent> {
        if !event::poll(std::time::Duration::from_millis(0))? {
            return Ok(UserIntent::None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(UserIntent::None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(UserIntent::None);
        }
        Ok(self.handle_key_event(key, app))
    }

    /// Drop local input once the orchestrator has moved past the name prompt.
    pub fn on_state_changed(&mut self, app: &AppState) {
        if app.display_name.is_some() && !self.state.name_input.is_empty() {
            self.state.name_input.clear();
            self.state.name_cursor = 0;
        }
    }

    // -- private -----------------------------------------------------------

    fn handle_key_event(&mut self, key: KeyEvent, app: &AppState) -> UserIntent {
        handle_key(&mut self.state, key, app)
    }
}

// ---------------------------------------------------------------------------
// Key mapping
// ---------------------------------------------------------------------------

fn handle_key(tui: &mut TuiState, key: KeyEvent, app: &AppState) -> UserIntent {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return UserIntent::Quit;
    }
    if key.code == KeyCode::F(1) {
        tui.show_help = !tui.show_help;
        return UserIntent::None;
    }
    if tui.show_help {
        if key.code == KeyCode::Esc {
            tui.show_help = false;
        }
        return UserIntent::None;
    }

    match &app.screen {
        Screen::Identity => identity_key(tui, key.code),
        Screen::Home => match key.code {
            KeyCode::Char('c') => UserIntent::Send(Intent::OpenCreate),
            KeyCode::Char('j') => UserIntent::Send(Intent::OpenJoin),
            KeyCode::Char('q') | KeyCode::Esc => UserIntent::Quit,
            _ => UserIntent::None,
        },
        Screen::Create(form) => create_key(tui, key.code, form),
        Screen::Join(dialog) => join_key(key.code, dialog),
        Screen::Session(view) => session_key(key.code, view),
    }
}

fn identity_key(tui: &mut TuiState, code: KeyCode) -> UserIntent {
    match code {
        KeyCode::Esc => UserIntent::Quit,
        KeyCode::Enter if tui.name_input.trim().is_empty() => UserIntent::None,
        KeyCode::Enter => UserIntent::Send(Intent::ConfirmName(tui.name_input.clone())),
        KeyCode::Char(c) => {
            tui.enter_char(c);
            UserIntent::None
        }
        KeyCode::Backspace => {
            tui.delete_char();
            UserIntent::None
        }
        KeyCode::Left => {
            tui.move_cursor(-1);
            UserIntent::None
        }
        KeyCode::Right => {
            tui.move_cursor(1);
            UserIntent::None
        }
        _ => UserIntent::None,
    }
}

fn create_key(tui: &mut TuiState, code: KeyCode, form: &CreateForm) -> UserIntent {
    let field = &mut tui.create_field;
    match code {
        KeyCode::Esc => UserIntent::Send(Intent::CloseDialog),
        KeyCode::Up => {
            *field = field.prev();
            UserIntent::None
        }
        KeyCode::Down | KeyCode::Tab => {
            *field = field.next();
            UserIntent::None
        }
        KeyCode::Left | KeyCode::Char('-') => UserIntent::Send(field.adjust(form, -1)),
        KeyCode::Right | KeyCode::Char('+') => UserIntent::Send(field.adjust(form, 1)),
        // Submit is disabled while a create is in flight.
        _ if form.creating => UserIntent::None,
        KeyCode::Enter => UserIntent::Send(Intent::CreateGame(JoinCodeKind::Standard)),
        KeyCode::Char('t') => UserIntent::Send(Intent::CreateGame(JoinCodeKind::Test)),
        _ => UserIntent::None,
    }
}

fn join_key(code: KeyCode, dialog: &JoinDialog) -> UserIntent {
    match code {
        KeyCode::Esc => UserIntent::Send(Intent::CloseDialog),
        KeyCode::Up => UserIntent::Send(Intent::SelectPrev),
        KeyCode::Down => UserIntent::Send(Intent::SelectNext),
        KeyCode::Char('r') => UserIntent::Send(Intent::RefreshSessions),
        KeyCode::Enter => match dialog.selected_session() {
            Some(session) => UserIntent::Send(Intent::Join(session.id.clone())),
            None => UserIntent::None,
        },
        _ => UserIntent::None,
    }
}

fn session_key(code: KeyCode, view: &SessionView) -> UserIntent {
    let phase = &view.lobby.phase;
    let intent = match code {
        KeyCode::Esc | KeyCode::Char('q') => Intent::Leave,
        KeyCode::Enter | KeyCode::Char('s') if *phase == Phase::Waiting => Intent::StartGame,
        KeyCode::Char('e') if matches!(phase, Phase::RoundRunning { .. }) => Intent::ForceEnd,
        KeyCode::Enter | KeyCode::Char('n') if matches!(phase, Phase::RoundEnded { .. }) => {
            Intent::NewRound
        }
        KeyCode::Char('x') if matches!(phase, Phase::RoundEnded { .. }) => Intent::EndGame,
        _ => return UserIntent::None,
    };
    UserIntent::Send(intent)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn ui(frame: &mut Frame, app: &AppState, tui: &TuiState) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(10),   // Screen body
            Constraint::Length(1), // Notice
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let title = Paragraph::new(Line::from(vec![
        Span::styled(" MAFIA ", Style::default().fg(Color::Black).bg(Color::Red).bold()),
        Span::raw("  "),
        Span::styled("party game", Style::default().fg(Color::Gray)),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, main_layout[0]);

    let body = main_layout[1];
    match &app.screen {
        Screen::Identity => render_identity(frame, tui, body),
        Screen::Home => render_home(frame, app, body),
        Screen::Create(form) => render_create(frame, form, tui, body),
        Screen::Join(dialog) => render_join(frame, dialog, body),
        Screen::Session(view) => render_session(frame, view, body),
    }

    if let Some(notice) = &app.notice {
        let notice = Paragraph::new(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Color::Yellow),
        ));
        frame.render_widget(notice, main_layout[2]);
    }

    let mut status_spans = vec![
        Span::styled(" F1", Style::default().fg(Color::Yellow)),
        Span::raw(": Help | "),
        Span::raw(key_hints(app)),
    ];
    if let Some(name) = &app.display_name {
        status_spans.push(Span::raw(" | You: "));
        status_spans.push(Span::styled(name.as_str(), Style::default().fg(Color::Cyan)));
    }
    frame.render_widget(Paragraph::new(Line::from(status_spans)), main_layout[3]);

    if tui.show_help {
        render_help_popup(frame);
    }
}

fn key_hints(app: &AppState) -> &'static str {
    match &app.screen {
        Screen::Identity => "Enter: Continue  Esc: Quit",
        Screen::Home => "C: Create Game  J: Join Game  Q: Quit",
        Screen::Create(_) => "Up/Down: Field  Left/Right: Adjust  Enter: Create  T: Test Game  Esc: Back",
        Screen::Join(_) => "Up/Down: Select  Enter: Join  R: Refresh  Esc: Back",
        Screen::Session(view) => match view.lobby.phase {
            Phase::Waiting => "Enter: Start  Q: Leave",
            Phase::RoundRunning { .. } => "E: End Round  Q: Leave",
            Phase::RoundEnded { .. } => "N: New Round  X: End Game  Q: Leave",
            _ => "Q: Leave",
        },
    }
}

fn panel(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {title} "))
        .title_style(Style::default().fg(color).bold())
}

fn render_identity(frame: &mut Frame, tui: &TuiState, area: Rect) {
    let area = centered_rect(50, 40, area);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let prompt = Paragraph::new("Choose a name to join the table").alignment(Alignment::Center);
    frame.render_widget(prompt, layout[0]);

    let input = Paragraph::new(tui.name_input.as_str()).block(panel("Your Name", Color::Cyan));
    frame.render_widget(input, layout[1]);

    #[allow(clippy::cast_possible_truncation)]
    frame.set_cursor_position((
        layout[1].x + 1 + tui.name_cursor as u16,
        layout[1].y + 1,
    ));
}

fn render_home(frame: &mut Frame, app: &AppState, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Welcome, {}", app.name()),
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(""),
        Line::from("Someone at the table is not who they seem."),
        Line::from(""),
        Line::from(vec![
            Span::styled("[C]", Style::default().fg(Color::Yellow).bold()),
            Span::raw(" Create Game    "),
            Span::styled("[J]", Style::default().fg(Color::Yellow).bold()),
            Span::raw(" Join Game"),
        ]),
    ];
    let home = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(panel("Home", Color::Red));
    frame.render_widget(home, centered_rect(60, 60, area));
}

fn render_create(frame: &mut Frame, form: &CreateForm, tui: &TuiState, area: Rect) {
    let mut lines = vec![Line::from("")];
    for field in CreateField::ALL {
        let (value, min, max) = field.value(form);
        let focused = field == tui.create_field;
        let marker = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::White)
        };
        let unit = if field == CreateField::Duration { " min" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{:<16}", field.label()), style),
            Span::styled(format!("< {value:>2}{unit} >"), style),
            Span::styled(format!("   ({min}-{max})"), Style::default().fg(Color::DarkGray)),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        form.summary(),
        Style::default().fg(Color::Magenta),
    )));
    lines.push(Line::from(Span::styled(
        form.duration_summary(),
        Style::default().fg(Color::Gray),
    )));
    lines.push(Line::from(""));
    if form.creating {
        lines.push(Line::from(Span::styled(
            "Creating game...",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!("Failed to create game: {error}"),
            Style::default().fg(Color::Red),
        )));
    }

    let dialog = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel("Create New Game", Color::Blue));
    let area = centered_rect(70, 70, area);
    frame.render_widget(Clear, area);
    frame.render_widget(dialog, area);
}

fn badge_color(session: &SessionRecord) -> Color {
    if session.is_joinable() {
        Color::Green
    } else {
        Color::Yellow
    }
}

fn render_join(frame: &mut Frame, dialog: &JoinDialog, area: Rect) {
    let area = centered_rect(70, 80, area);
    frame.render_widget(Clear, area);

    if let Some(message) = dialog.discovery.message() {
        let placeholder = Paragraph::new(message)
            .alignment(Alignment::Center)
            .block(panel("Join Game", Color::Green));
        frame.render_widget(placeholder, area);
        return;
    }

    let items: Vec<ListItem> = dialog
        .discovery
        .sessions()
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let selected = i == dialog.selected;
            let name_style = if selected {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(if selected { "> " } else { "  " }),
                    Span::styled(session.title(), name_style),
                    Span::raw("  "),
                    Span::styled(
                        format!("[{}]", session.badge()),
                        Style::default().fg(badge_color(session)).bold(),
                    ),
                ]),
                Line::from(Span::styled(
                    format!(
                        "    {}  ·  {} Mafia  ·  {} min  ·  {}",
                        session.occupancy(),
                        session.mafia_count,
                        session.game_duration,
                        session.game_code
                    ),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    let title = if dialog.joining { "Joining..." } else { "Join Game" };
    frame.render_widget(List::new(items).block(panel(title, Color::Green)), area);
}

fn render_session(frame: &mut Frame, view: &SessionView, area: Rect) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(40)])
        .split(area);

    render_roster(frame, view, layout[0]);
    match &view.lobby.phase {
        Phase::Waiting => render_waiting(frame, view, layout[1]),
        Phase::Countdown { remaining, .. } => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("Game starting in {remaining}..."),
                    Style::default().fg(Color::Yellow).bold(),
                )),
            ];
            let countdown = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(panel("Get Ready", Color::Yellow));
            frame.render_widget(countdown, layout[1]);
        }
        Phase::RoleAssigned { role } => render_role(frame, *role, None, layout[1]),
        Phase::RoundRunning { role, timer } => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(6), Constraint::Length(3)])
                .split(layout[1]);
            render_role(frame, *role, Some("Discuss and find the Mafia!"), split[0]);
            let gauge = Gauge::default()
                .block(panel("Time Remaining", Color::Magenta))
                .gauge_style(Style::default().fg(Color::Magenta))
                .ratio((timer.progress() / 100.0).clamp(0.0, 1.0))
                .label(timer.display());
            frame.render_widget(gauge, split[1]);
        }
        Phase::RoundEnded { .. } => render_results(frame, view, layout[1]),
        Phase::Closed => {}
    }
}

fn render_roster(frame: &mut Frame, view: &SessionView, area: Rect) {
    let items: Vec<ListItem> = view
        .lobby
        .roster
        .players()
        .iter()
        .map(|p| {
            let is_me = p.id == view.local_id;
            let name_style = if is_me {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default().fg(Color::White)
            };
            let ready = if p.is_ready {
                Span::styled(" ✓", Style::default().fg(Color::Green))
            } else {
                Span::styled(" …", Style::default().fg(Color::DarkGray))
            };
            let crown = if p.is_host { "♛ " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(crown, Style::default().fg(Color::Yellow)),
                Span::styled(p.display_name.clone(), name_style),
                ready,
            ]))
        })
        .collect();

    let roster = &view.lobby.roster;
    let title = format!(
        "Players {}/{} · {} ready",
        roster.len(),
        view.lobby.settings.total_players(),
        roster.ready_count()
    );
    frame.render_widget(List::new(items).block(panel(&title, Color::Blue)), area);
}

fn render_waiting(frame: &mut Frame, view: &SessionView, area: Rect) {
    let settings = &view.lobby.settings;
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Join code: ", Style::default().fg(Color::Gray)),
            Span::styled(view.lobby.join_code(), Style::default().fg(Color::Yellow).bold()),
        ]),
        Line::from(format!(
            "{} players · {} Mafia · {} min",
            settings.total_players(),
            settings.mafia_count(),
            settings.game_duration_minutes()
        )),
        Line::from(""),
    ];
    if view.lobby.is_host {
        let label = view.lobby.start_label();
        let ready = view.lobby.start_blockers().is_empty();
        let style = if ready {
            Style::default().fg(Color::Black).bg(Color::Green).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(Span::styled(format!(" {label} "), style)));
    } else {
        lines.push(Line::from(Span::styled(
            "Waiting for the host to start...",
            Style::default().fg(Color::Gray),
        )));
    }

    let lobby = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(panel("Lobby", Color::Green));
    frame.render_widget(lobby, area);
}

fn role_color(role: Role) -> Color {
    match role {
        Role::Mafia => Color::Red,
        Role::Detective => Color::Blue,
        Role::Civilian => Color::Green,
    }
}

fn render_role(frame: &mut Frame, role: Role, footer: Option<&str>, area: Rect) {
    let color = role_color(role);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("{}  {}", role.icon(), role.label()),
            Style::default().fg(color).bold(),
        )),
        Line::from(""),
        Line::from(role.briefing()),
    ];
    if let Some(footer) = footer {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(footer, Style::default().fg(Color::Gray))));
    }
    let card = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(panel("Your Role", color));
    frame.render_widget(card, area);
}

fn render_results(frame: &mut Frame, view: &SessionView, area: Rect) {
    let items: Vec<ListItem> = view
        .results
        .iter()
        .map(|r| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<24}", r.name)),
                Span::styled(
                    format!("{} {}", r.role.icon(), r.role.label()),
                    Style::default().fg(role_color(r.role)).bold(),
                ),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items).block(panel("Game Results", Color::Red)), area);
}

fn render_help_popup(frame: &mut Frame) {
    let area = centered_rect(60, 70, frame.area());

    frame.render_widget(Clear, area);

    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().fg(Color::Cyan).bold()))
    };
    let help_text = Text::from(vec![
        Line::from(Span::styled("CONTROLS", Style::default().fg(Color::Yellow).bold())),
        Line::from(""),
        section("  CREATE GAME"),
        Line::from("  Up/Down       Choose setting"),
        Line::from("  Left/Right    Adjust value"),
        Line::from("  Enter / T     Create game / test game"),
        Line::from(""),
        section("  JOIN GAME"),
        Line::from("  Up/Down       Choose game"),
        Line::from("  Enter         Join selected game"),
        Line::from("  R             Refresh list"),
        Line::from(""),
        section("  LOBBY"),
        Line::from("  Enter         Start game (host)"),
        Line::from("  E / N / X     End round / new round / close"),
        Line::from("  Q             Leave"),
        Line::from(""),
        Line::from(Span::styled(
            "Press ESC or F1 to close",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let help = Paragraph::new(help_text).wrap(Wrap { trim: true }).block(
        panel("Help", Color::Cyan).style(Style::default().bg(Color::Black)),
    );

    frame.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mafia_core::lobby::{Lobby, RoundTimer};
    use mafia_core::roster::Roster;
    use mafia_core::settings::GameSettings;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn session(phase: Phase) -> SessionView {
        let settings = GameSettings::new(4, 1, 1).with_join_code("TEST00");
        let roster = Roster::for_host("Ana", &settings);
        let mut lobby = Lobby::new(None, settings, roster, true);
        lobby.phase = phase;
        SessionView {
            lobby,
            local_id: "1".to_string(),
            results: Vec::new(),
        }
    }

    #[test]
    fn name_buffer_edits() {
        let mut tui = TuiState::default();
        for c in "Anna".chars() {
            tui.enter_char(c);
        }
        tui.move_cursor(-1);
        tui.delete_char();
        assert_eq!(tui.name_input, "Ana");
        assert_eq!(tui.name_cursor, 2);
        tui.move_cursor(10);
        assert_eq!(tui.name_cursor, 3);
    }

    #[test]
    fn blank_name_cannot_continue() {
        let app = AppState::new();
        let mut tui = TuiState::default();
        handle_key(&mut tui, key(KeyCode::Char(' ')), &app);
        assert!(matches!(handle_key(&mut tui, key(KeyCode::Enter), &app), UserIntent::None));

        handle_key(&mut tui, key(KeyCode::Char('Z')), &app);
        assert!(matches!(
            handle_key(&mut tui, key(KeyCode::Enter), &app),
            UserIntent::Send(Intent::ConfirmName(name)) if name == " Z"
        ));
    }

    #[test]
    fn create_field_adjust_maps_to_intents() {
        let form = CreateForm::default();
        assert_eq!(CreateField::Players.adjust(&form, 1), Intent::SetTotalPlayers(7));
        assert_eq!(CreateField::Mafia.adjust(&form, -1), Intent::SetMafiaCount(1));
        assert_eq!(CreateField::Duration.next(), CreateField::Players);
        assert_eq!(CreateField::Players.prev(), CreateField::Duration);
        assert_eq!(CreateField::Mafia.value(&form), (2, 1, 2));
    }

    #[test]
    fn session_keys_depend_on_phase() {
        let waiting = session(Phase::Waiting);
        assert!(matches!(
            session_key(KeyCode::Enter, &waiting),
            UserIntent::Send(Intent::StartGame)
        ));
        assert!(matches!(session_key(KeyCode::Char('e'), &waiting), UserIntent::None));

        let ended = session(Phase::RoundEnded { role: Role::Civilian });
        assert!(matches!(
            session_key(KeyCode::Enter, &ended),
            UserIntent::Send(Intent::NewRound)
        ));
        assert!(matches!(
            session_key(KeyCode::Char('x'), &ended),
            UserIntent::Send(Intent::EndGame)
        ));
        assert!(matches!(
            session_key(KeyCode::Esc, &ended),
            UserIntent::Send(Intent::Leave)
        ));
    }

    #[test]
    fn running_round_hint_matches_its_key() {
        let running = session(Phase::RoundRunning {
            role: Role::Mafia,
            timer: RoundTimer::new(60),
        });
        assert!(matches!(
            session_key(KeyCode::Char('e'), &running),
            UserIntent::Send(Intent::ForceEnd)
        ));
        let mut app = AppState::new();
        app.screen = Screen::Session(running);
        assert_eq!(key_hints(&app), "E: End Round  Q: Leave");
    }

    #[test]
    fn full_sessions_get_a_warning_badge() {
        let settings = GameSettings::new(4, 1, 5);
        let mut record = mafia_core::session::NewSession::waiting(&settings, "Rosa", "GAME00")
            .into_record("s1".to_string(), None);
        assert_eq!(badge_color(&record), Color::Green);
        record.current_players = 4;
        assert_eq!(badge_color(&record), Color::Yellow);
    }

    #[test]
    fn ctrl_c_quits_and_help_swallows_keys() {
        let mut app = AppState::new();
        app.screen = Screen::Home;
        let mut tui = TuiState::default();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(handle_key(&mut tui, ctrl_c, &app), UserIntent::Quit));
        assert!(matches!(
            handle_key(&mut tui, key(KeyCode::Char('c')), &app),
            UserIntent::Send(Intent::OpenCreate)
        ));

        tui.show_help = true;
        assert!(matches!(
            handle_key(&mut tui, key(KeyCode::Char('j')), &app),
            UserIntent::None
        ));
    }
}
