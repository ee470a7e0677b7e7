use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use arena_terminal::auth;
use arena_terminal::config::Config;
use arena_terminal::demo;
use arena_terminal::dto::{CompetitionStatus, MatchStatus, SortDirection, UserRole};
use arena_terminal::forms;
use arena_terminal::provider;
use arena_terminal::state::{
    AppState, AuthMode, CompetitionTab, CompetitorTab, Delta, Dialog, DialogKind, MatchTab,
    OverviewTab, ProviderCommand, Screen, apply_delta,
};
use arena_terminal::table::{ColumnKind, ColumnSpec, TableView, cell_text, spaced_lowercase};
use arena_terminal::validation::FieldValue;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    filter_edit: Option<String>,
    winners_requested: bool,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<ProviderCommand>, config: &Config) -> Self {
        Self {
            state: AppState::new(config),
            should_quit: false,
            cmd_tx,
            filter_edit: None,
            winners_requested: false,
        }
    }

    fn send(&mut self, cmd: ProviderCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            self.state.set_alert("Background worker is gone");
        }
    }

    /// The visible remote table re-fetches whenever its committed state
    /// changed since the last issued query.
    fn pump_fetches(&mut self) {
        if self.state.session.is_none() {
            return;
        }
        let list = self.state.overview_tab.list();
        if let Some((request_id, query)) = self.state.overview_table_mut().take_query() {
            self.send(ProviderCommand::FetchPage {
                list,
                request_id,
                query,
            });
        }
    }

    /// Winners only exist once a competition is FINISHED; fetch them lazily
    /// the first time that state shows up on screen.
    fn maybe_fetch_winners(&mut self) {
        if self.winners_requested || !self.state.winners.is_empty() {
            return;
        }
        let Screen::Competition { id } = &self.state.screen else {
            return;
        };
        let finished = self
            .state
            .competition
            .as_ref()
            .is_some_and(|c| c.status == CompetitionStatus::Finished);
        if finished {
            let id = id.clone();
            self.winners_requested = true;
            self.send(ProviderCommand::FetchWinners { id });
        }
    }

    fn open_screen(&mut self, screen: Screen) {
        self.winners_requested = false;
        self.filter_edit = None;
        self.state.navigate(screen.clone());
        match screen {
            Screen::Competition { id } => {
                self.send(ProviderCommand::FetchCompetition { id: id.clone() });
                self.send(ProviderCommand::FetchRanking { id });
            }
            Screen::Competitor { id } => {
                self.send(ProviderCommand::FetchCompetitor { id });
            }
            Screen::Match { id } => {
                self.send(ProviderCommand::FetchMatch { id });
            }
            _ => {}
        }
    }

    fn open_dialog(&mut self, kind: DialogKind) {
        let dialog = forms::new_dialog(kind);
        let competition_kind = self.state.competition.as_ref().map(|c| c.competitor_type);
        if let Some(cmd) = forms::dialog_prefetch(kind, &self.state.screen, competition_kind) {
            self.send(cmd);
        }
        self.state.dialog = Some(dialog);
    }

    fn submit_dialog(&mut self) {
        let Some(dialog) = self.state.dialog.as_mut() else {
            return;
        };
        if !dialog.form.pass() {
            return;
        }
        match forms::dialog_command(dialog, &self.state.screen) {
            Ok(cmd) => self.send(cmd),
            Err(message) => self.state.set_alert(message),
        }
    }

    fn submit_auth(&mut self) {
        if !self.state.auth_form.pass() {
            return;
        }
        let cmd = forms::auth_command(self.state.auth_mode, &self.state.auth_form);
        self.send(cmd);
    }

    fn logout(&mut self) {
        self.send(ProviderCommand::Logout);
        self.state.session = None;
        self.state.back.clear();
        self.state.dialog = None;
        self.state.screen = Screen::Auth;
        self.state.auth_mode = AuthMode::Login;
        self.state.auth_form = forms::auth_form(AuthMode::Login);
        self.state.auth_focus = 0;
    }

    // ----- key dispatch -----

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            self.state.help_overlay = false;
            return;
        }
        if self.state.alert.is_some() {
            self.state.clear_alert();
            if key.code == KeyCode::Esc {
                return;
            }
        }
        if self.state.dialog.is_some() {
            self.dialog_key(key);
            return;
        }
        match self.state.screen.clone() {
            Screen::Auth => self.auth_key(key),
            Screen::Overview => self.overview_key(key),
            Screen::Competition { id } => self.competition_key(key, id),
            Screen::Competitor { id } => self.competitor_key(key, id),
            Screen::Match { id } => self.match_key(key, id),
        }
    }

    fn dialog_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.dialog = None,
            KeyCode::Enter => self.submit_dialog(),
            KeyCode::Tab | KeyCode::Down => {
                if let Some(dialog) = self.state.dialog.as_mut() {
                    dialog.focus_next();
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Some(dialog) = self.state.dialog.as_mut() {
                    dialog.focus_prev();
                }
            }
            _ => {
                if let Some(dialog) = self.state.dialog.as_mut() {
                    edit_dialog_field(dialog, key);
                }
            }
        }
    }

    fn auth_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.submit_auth(),
            KeyCode::Tab | KeyCode::Down => {
                let len = self.state.auth_form.len().max(1);
                self.state.auth_focus = (self.state.auth_focus + 1) % len;
            }
            KeyCode::BackTab | KeyCode::Up => {
                let len = self.state.auth_form.len().max(1);
                self.state.auth_focus = (self.state.auth_focus + len - 1) % len;
            }
            // Left/Right flip the login/register toggle; the form is rebuilt
            // from scratch, dropping values and errors.
            KeyCode::Left | KeyCode::Right => {
                self.state.auth_mode = match self.state.auth_mode {
                    AuthMode::Login => AuthMode::Register,
                    AuthMode::Register => AuthMode::Login,
                };
                self.state.auth_form = forms::auth_form(self.state.auth_mode);
                self.state.auth_focus = 0;
            }
            KeyCode::Char(c) => {
                if let Some(name) = self.state.auth_form.name_at(self.state.auth_focus) {
                    let mut text = self
                        .state
                        .auth_form
                        .value(name)
                        .map(|v| v.text().to_string())
                        .unwrap_or_default();
                    text.push(c);
                    self.state.auth_form.set_value(name, FieldValue::Text(text));
                }
            }
            KeyCode::Backspace => {
                if let Some(name) = self.state.auth_form.name_at(self.state.auth_focus) {
                    let mut text = self
                        .state
                        .auth_form
                        .value(name)
                        .map(|v| v.text().to_string())
                        .unwrap_or_default();
                    text.pop();
                    self.state.auth_form.set_value(name, FieldValue::Text(text));
                }
            }
            _ => {}
        }
    }

    fn overview_key(&mut self, key: KeyEvent) {
        // The search box swallows keystrokes while open.
        if self.filter_edit.is_some() {
            match key.code {
                KeyCode::Enter => {
                    let committed = self.filter_edit.take().unwrap_or_default();
                    self.state.overview_table_mut().set_filter(committed);
                }
                KeyCode::Esc => self.filter_edit = None,
                KeyCode::Backspace => {
                    if let Some(buffer) = self.filter_edit.as_mut() {
                        buffer.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(buffer) = self.filter_edit.as_mut() {
                        buffer.push(c);
                    }
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Tab => self.state.switch_overview_tab(),
            KeyCode::Char('j') | KeyCode::Down => self.state.overview_table_mut().select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.overview_table_mut().select_prev(),
            KeyCode::Char('n') | KeyCode::Right => self.state.overview_table_mut().next_page(),
            KeyCode::Char('p') | KeyCode::Left => self.state.overview_table_mut().prev_page(),
            KeyCode::Char('s') => {
                let key = self.state.overview_table().sort_key.clone();
                self.state.overview_table_mut().toggle_sort(&key);
            }
            KeyCode::Char('o') => {
                let view = self.state.overview_table_mut();
                if let Some(next) = next_sortable_column(view) {
                    view.toggle_sort(&next);
                }
            }
            KeyCode::Char('/') => self.filter_edit = Some(self.state.overview_table().filter.clone()),
            KeyCode::Char('g') => self.state.cycle_page_size(),
            KeyCode::Char('r') => self.state.overview_table_mut().refresh(),
            KeyCode::Char('c') => {
                if self.state.is_admin() {
                    let kind = match self.state.overview_tab {
                        OverviewTab::Competitions => DialogKind::CreateCompetition,
                        OverviewTab::Players => DialogKind::CreatePlayer,
                        OverviewTab::Teams => DialogKind::CreateTeam,
                        OverviewTab::GameFormats => DialogKind::CreateGameFormat,
                    };
                    self.open_dialog(kind);
                }
            }
            KeyCode::Char('x') => self.logout(),
            KeyCode::Enter => {
                let target = match self.state.overview_tab {
                    OverviewTab::Competitions => {
                        self.state.overview_table().selected_id().map(|id| Screen::Competition { id })
                    }
                    OverviewTab::Players | OverviewTab::Teams => {
                        self.state.overview_table().selected_id().map(|id| Screen::Competitor { id })
                    }
                    OverviewTab::GameFormats => None,
                };
                if let Some(screen) = target {
                    self.open_screen(screen);
                }
            }
            _ => {}
        }
    }

    fn competition_key(&mut self, key: KeyEvent, id: String) {
        let organizing = self.state.competition_organizing();
        let status = self.state.competition.as_ref().map(|c| c.status);
        let admin = self.state.is_admin();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('b') | KeyCode::Esc => self.go_back(),
            KeyCode::Tab => self.state.competition_tab = self.state.competition_tab.next(),
            KeyCode::Char('j') | KeyCode::Down => {
                if let Some(view) = self.competition_table_mut() {
                    view.select_next();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if let Some(view) = self.competition_table_mut() {
                    view.select_prev();
                }
            }
            KeyCode::Enter => {
                let target = match self.state.competition_tab {
                    CompetitionTab::Competitors | CompetitionTab::Ranking => self
                        .competition_table_mut()
                        .and_then(|view| view.selected_id())
                        .map(|id| Screen::Competitor { id }),
                    CompetitionTab::Matches => self
                        .competition_table_mut()
                        .and_then(|view| view.selected_id())
                        .map(|id| Screen::Match { id }),
                    CompetitionTab::Details => None,
                };
                if let Some(screen) = target {
                    self.open_screen(screen);
                }
            }
            KeyCode::Char('i') => {
                self.send(ProviderCommand::FetchCompetition { id: id.clone() });
                self.send(ProviderCommand::FetchRanking { id });
            }
            // Admin lifecycle.
            KeyCode::Char('z') if admin && organizing => {
                self.send(ProviderCommand::StopRegistration { id });
            }
            KeyCode::Char('v') if admin && status == Some(CompetitionStatus::NotStarted) => {
                self.send(ProviderCommand::StartCompetition { id });
            }
            KeyCode::Char('c')
                if admin
                    && status.is_some_and(|s| {
                        !matches!(
                            s,
                            CompetitionStatus::Finished | CompetitionStatus::Canceled
                        )
                    }) =>
            {
                self.send(ProviderCommand::CancelCompetition { id });
            }
            KeyCode::Char('a') if admin && organizing => {
                self.open_dialog(DialogKind::RegisterCompetitor);
            }
            KeyCode::Char('d')
                if admin && organizing && self.state.competition_tab == CompetitionTab::Competitors =>
            {
                if let Some(competitor_id) = self.state.competition_competitors.selected_id() {
                    self.send(ProviderCommand::RemoveCompetitor {
                        competition_id: id,
                        competitor_id: Some(competitor_id),
                    });
                }
            }
            // Self-service for regular users while registrations are open.
            KeyCode::Char('u') if !admin && organizing && self.state.self_can_join_competition() => {
                self.send(ProviderCommand::AddCompetitor {
                    competition_id: id,
                    competitor_id: None,
                });
            }
            KeyCode::Char('l') if !admin && organizing && !self.state.self_can_join_competition() => {
                self.send(ProviderCommand::RemoveCompetitor {
                    competition_id: id,
                    competitor_id: None,
                });
            }
            KeyCode::Char('e') => {
                let name = self
                    .state
                    .competition
                    .as_ref()
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "competition".to_string());
                let path = format!("{}-ranking.xlsx", slug(&name));
                self.send(ProviderCommand::ExportRanking {
                    competition_id: id,
                    competition_name: name,
                    path,
                });
            }
            _ => {}
        }
    }

    fn competitor_key(&mut self, key: KeyEvent, id: String) {
        let admin = self.state.is_admin();
        let is_team = self.state.competitor.as_ref().is_some_and(|c| c.is_team());
        let on_roster = self.state.competitor_tab == CompetitorTab::Roster;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('b') | KeyCode::Esc => self.go_back(),
            KeyCode::Tab => self.state.competitor_tab = self.state.competitor_tab.next(),
            KeyCode::Char('j') | KeyCode::Down => {
                if let Some(view) = self.competitor_table_mut() {
                    view.select_next();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if let Some(view) = self.competitor_table_mut() {
                    view.select_prev();
                }
            }
            KeyCode::Enter => {
                let target = match self.state.competitor_tab {
                    CompetitorTab::Matches => self
                        .state
                        .competitor_matches
                        .selected_id()
                        .map(|id| Screen::Match { id }),
                    CompetitorTab::Competitions => self
                        .state
                        .competitor_competitions
                        .selected_id()
                        .map(|id| Screen::Competition { id }),
                    CompetitorTab::Roster => self
                        .state
                        .competitor_roster
                        .selected_id()
                        .map(|id| Screen::Competitor { id }),
                    _ => None,
                };
                if let Some(screen) = target {
                    self.open_screen(screen);
                }
            }
            KeyCode::Char('i') => self.send(ProviderCommand::FetchCompetitor { id }),
            // Admin roster management on a team page.
            KeyCode::Char('a') if admin && is_team => self.open_dialog(DialogKind::AddTeamMember),
            KeyCode::Char('t') if admin && is_team && on_roster => {
                if let Some(player_id) = self.state.competitor_roster.selected_id() {
                    self.send(ProviderCommand::ToggleTeamMember {
                        team_id: id,
                        player_id: Some(player_id),
                    });
                }
            }
            KeyCode::Char('d') if admin && is_team && on_roster => {
                if let Some(player_id) = self.state.competitor_roster.selected_id() {
                    self.send(ProviderCommand::RemoveTeamMember {
                        team_id: id,
                        player_id: Some(player_id),
                    });
                }
            }
            // A regular user manages their own membership.
            KeyCode::Char('u') if !admin && is_team => {
                self.send(ProviderCommand::AddTeamMember {
                    team_id: id,
                    player_id: None,
                });
            }
            KeyCode::Char('t') if !admin && is_team => {
                self.send(ProviderCommand::ToggleTeamMember {
                    team_id: id,
                    player_id: None,
                });
            }
            KeyCode::Char('d') if !admin && is_team => {
                self.send(ProviderCommand::RemoveTeamMember {
                    team_id: id,
                    player_id: None,
                });
            }
            _ => {}
        }
    }

    fn match_key(&mut self, key: KeyEvent, id: String) {
        let admin = self.state.is_admin();
        let status = self.state.match_info.as_ref().map(|m| m.status);
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('b') | KeyCode::Esc => self.go_back(),
            KeyCode::Tab => {
                self.state.match_tab = match self.state.match_tab {
                    MatchTab::Details => MatchTab::Points,
                    MatchTab::Points => MatchTab::Details,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.match_points.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.match_points.select_prev(),
            KeyCode::Char('i') => self.send(ProviderCommand::FetchMatch { id }),
            KeyCode::Char('v') if admin && status == Some(MatchStatus::NotStarted) => {
                self.send(ProviderCommand::StartMatch { id });
            }
            KeyCode::Char('f') if admin && status == Some(MatchStatus::Started) => {
                self.open_dialog(DialogKind::EndMatch);
            }
            KeyCode::Char('c')
                if admin
                    && matches!(
                        status,
                        Some(MatchStatus::NotStarted) | Some(MatchStatus::Started)
                    ) =>
            {
                self.send(ProviderCommand::CancelMatch { id });
            }
            // Points go to one competitor of a player match.
            KeyCode::Char('1') if admin && status == Some(MatchStatus::Started) => {
                self.open_point_dialog(|m| m.competitor_one.id.clone());
            }
            KeyCode::Char('2') if admin && status == Some(MatchStatus::Started) => {
                self.open_point_dialog(|m| m.competitor_two.id.clone());
            }
            _ => {}
        }
    }

    fn open_point_dialog(
        &mut self,
        pick: impl Fn(&arena_terminal::dto::MatchDetail) -> String,
    ) {
        let Some(player_id) = self.state.match_info.as_ref().map(pick) else {
            return;
        };
        self.open_dialog(DialogKind::AddPoint);
        if let Some(dialog) = self.state.dialog.as_mut() {
            dialog.aux = Some(player_id);
        }
    }

    fn go_back(&mut self) {
        self.winners_requested = false;
        self.state.navigate_back();
        // The list behind us may be stale after lifecycle commands.
        if self.state.screen == Screen::Overview {
            self.state.overview_table_mut().refresh();
        } else {
            match self.state.screen.clone() {
                Screen::Competition { id } => {
                    self.send(ProviderCommand::FetchCompetition { id: id.clone() });
                    self.send(ProviderCommand::FetchRanking { id });
                }
                Screen::Competitor { id } => self.send(ProviderCommand::FetchCompetitor { id }),
                Screen::Match { id } => self.send(ProviderCommand::FetchMatch { id }),
                _ => {}
            }
        }
    }

    fn competition_table_mut(&mut self) -> Option<&mut TableView> {
        match self.state.competition_tab {
            CompetitionTab::Competitors => Some(&mut self.state.competition_competitors),
            CompetitionTab::Matches => Some(&mut self.state.competition_matches),
            CompetitionTab::Ranking => Some(&mut self.state.competition_ranking),
            CompetitionTab::Details => None,
        }
    }

    fn competitor_table_mut(&mut self) -> Option<&mut TableView> {
        match self.state.competitor_tab {
            CompetitorTab::Matches => Some(&mut self.state.competitor_matches),
            CompetitorTab::Competitions => Some(&mut self.state.competitor_competitions),
            CompetitorTab::Roster => Some(&mut self.state.competitor_roster),
            CompetitorTab::WinRatings => Some(&mut self.state.win_ratings),
            CompetitorTab::Details => None,
        }
    }
}

fn edit_dialog_field(dialog: &mut Dialog, key: KeyEvent) {
    let Some(name) = dialog.focused_name() else {
        return;
    };
    let Some(current) = dialog.form.value(name).cloned() else {
        return;
    };
    match current {
        FieldValue::Text(mut text) => match key.code {
            KeyCode::Char(c) => {
                text.push(c);
                dialog.form.set_value(name, FieldValue::Text(text));
            }
            KeyCode::Backspace => {
                text.pop();
                dialog.form.set_value(name, FieldValue::Text(text));
            }
            _ => {}
        },
        FieldValue::Number(value) => match key.code {
            KeyCode::Char(c @ '0'..='9') => {
                let digit = i64::from(c as u8 - b'0');
                let next = value.unwrap_or(0).saturating_mul(10).saturating_add(digit);
                dialog.form.set_value(name, FieldValue::Number(Some(next)));
            }
            KeyCode::Backspace => {
                let next = value.and_then(|n| if n >= 10 { Some(n / 10) } else { None });
                dialog.form.set_value(name, FieldValue::Number(next));
            }
            KeyCode::Delete => dialog.form.set_value(name, FieldValue::Number(None)),
            _ => {}
        },
        FieldValue::Choice(index) => {
            let len = dialog.options.get(name).map(Vec::len).unwrap_or(0);
            if len == 0 {
                return;
            }
            let next = match key.code {
                KeyCode::Left => Some(index.map_or(len - 1, |i| (i + len - 1) % len)),
                KeyCode::Right | KeyCode::Char(' ') => Some(index.map_or(0, |i| (i + 1) % len)),
                _ => None,
            };
            if let Some(next) = next {
                dialog.form.set_value(name, FieldValue::Choice(Some(next)));
            }
        }
    }
}

fn next_sortable_column(view: &TableView) -> Option<String> {
    let sortable: Vec<&ColumnSpec> = view.spec.columns.iter().filter(|c| c.sortable).collect();
    if sortable.is_empty() {
        return None;
    }
    let current = sortable.iter().position(|c| c.key == view.sort_key);
    let next = match current {
        Some(i) => (i + 1) % sortable.len(),
        None => 0,
    };
    Some(sortable[next].key.to_string())
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = Config::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();

    let session = auth::load_session();
    if config.demo_mode() {
        demo::spawn_demo_provider(tx.clone(), cmd_rx);
    } else {
        provider::spawn_provider(
            &config,
            session.as_ref().map(|s| s.token.clone()),
            tx.clone(),
            cmd_rx,
        );
    }

    let mut app = App::new(cmd_tx, &config);
    app.state.auth_form = forms::auth_form(AuthMode::Login);
    if let Some(session) = session {
        app.state.push_log(format!(
            "[INFO] Restored session for {:?}",
            session.user.role
        ));
        app.state.session = Some(session);
        app.state.screen = Screen::Overview;
    }

    let res = run_app(&mut terminal, &mut app, rx, &config);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
    config: &Config,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(config.tick_millis);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.pump_fetches();
        app.maybe_fetch_winners();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

// ----- rendering -----

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match &app.state.screen {
        Screen::Auth => render_auth(frame, chunks[1], &app.state),
        Screen::Overview => render_overview(frame, chunks[1], app),
        Screen::Competition { .. } => render_competition(frame, chunks[1], &app.state),
        Screen::Competitor { .. } => render_competitor(frame, chunks[1], &app.state),
        Screen::Match { .. } => render_match(frame, chunks[1], &app.state),
    }

    render_status_line(frame, chunks[2], &app.state);

    let footer = Paragraph::new(footer_text(app)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if let Some(dialog) = &app.state.dialog {
        render_dialog(frame, frame.size(), dialog);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, frame.size(), &app.state.screen);
    }
}

fn header_text(state: &AppState) -> String {
    let who = match &state.session {
        Some(session) => match session.user.role {
            UserRole::Administrator => "admin",
            UserRole::User => "user",
        },
        None => "signed out",
    };
    let place = match &state.screen {
        Screen::Auth => "SIGN IN".to_string(),
        Screen::Overview => format!("OVERVIEW | {}", state.overview_table().spec.title),
        Screen::Competition { .. } => "COMPETITION".to_string(),
        Screen::Competitor { .. } => "COMPETITOR".to_string(),
        Screen::Match { .. } => "MATCH".to_string(),
    };
    format!("ARENA | {place} | {who}")
}

fn footer_text(app: &App) -> String {
    if app.state.dialog.is_some() {
        return "Tab/↑/↓ Field | ←/→ Option | Enter Submit | Esc Close".to_string();
    }
    match &app.state.screen {
        Screen::Auth => "←/→ Login/Register | Tab Field | Enter Submit | Esc Quit".to_string(),
        Screen::Overview => {
            let mut hints = vec![
                "Tab Section", "j/k Move", "Enter Open", "n/p Page", "s/o Sort", "/ Search",
                "g Size", "r Reload",
            ];
            if app.state.is_admin() {
                hints.push("c Create");
            }
            hints.push("x Sign out");
            hints.push("? Help");
            hints.push("q Quit");
            hints.join(" | ")
        }
        Screen::Competition { .. } => {
            "Tab Section | j/k Move | Enter Open | e Export | b Back | ? Help | q Quit".to_string()
        }
        Screen::Competitor { .. } => {
            "Tab Section | j/k Move | Enter Open | b Back | ? Help | q Quit".to_string()
        }
        Screen::Match { .. } => "Tab Section | j/k Move | b Back | ? Help | q Quit".to_string(),
    }
}

fn render_status_line(frame: &mut Frame, area: Rect, state: &AppState) {
    if let Some(alert) = &state.alert {
        let banner = Paragraph::new(format!(" {alert} "))
            .style(Style::default().fg(Color::White).bg(Color::Red));
        frame.render_widget(banner, area);
        return;
    }
    let last = state.logs.back().cloned().unwrap_or_default();
    let line = Paragraph::new(last).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(line, area);
}

fn render_auth(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup = centered_rect(50, 70, area);
    let title = match state.auth_mode {
        AuthMode::Login => "Login",
        AuthMode::Register => "Register",
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let mut lines: Vec<Line> = vec![
        Line::styled("◂ Login / Register ▸", Style::default().fg(Color::DarkGray)),
        Line::from(""),
    ];
    for (idx, (name, value, error)) in state.auth_form.entries().enumerate() {
        let focused = idx == state.auth_focus;
        let marker = if focused { "> " } else { "  " };
        let shown = if name == "password" {
            "•".repeat(value.text().len())
        } else {
            value.text().to_string()
        };
        let style = if focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::styled(
            format!("{marker}{}: {shown}", spaced_lowercase(name)),
            style,
        ));
        if let Some(error) = error {
            lines.push(Line::styled(
                format!("    {error}"),
                Style::default().fg(Color::Red),
            ));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_overview(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let view = app.state.overview_table();
    render_toolbar(frame, sections[0], view, app.filter_edit.as_deref());
    render_table(frame, sections[1], view);
    render_pagination(frame, sections[2], view);
}

/// Toolbar: table name, then the search hint or the live search input.
fn render_toolbar(frame: &mut Frame, area: Rect, view: &TableView, editing: Option<&str>) {
    let search = match editing {
        Some(buffer) => format!("search: {buffer}_"),
        None if view.filter.is_empty() => {
            if view.spec.filter_key.is_empty() {
                String::new()
            } else {
                format!("/ search by {}", spaced_lowercase(view.spec.filter_key))
            }
        }
        None => format!("search: {}", view.filter),
    };
    let text = format!("{}    {search}", view.spec.title);
    let toolbar = Paragraph::new(text)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(toolbar, area);
}

fn render_pagination(frame: &mut Frame, area: Rect, view: &TableView) {
    if view.is_static() {
        return;
    }
    let text = format!(
        "page {}/{} | {} rows | {} per page",
        view.page_index + 1,
        view.page_count(),
        view.total,
        view.page_size
    );
    let line = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(line, area);
}

fn column_constraints(columns: &[ColumnSpec]) -> Vec<Constraint> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| match col.kind {
            _ if i == 0 => Constraint::Min(18),
            ColumnKind::Number => Constraint::Length(10),
            ColumnKind::Date => Constraint::Length(18),
            ColumnKind::Text => Constraint::Length(18),
        })
        .collect()
}

fn render_table(frame: &mut Frame, area: Rect, view: &TableView) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let widths = column_constraints(view.spec.columns);
    let header_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths.clone())
        .split(sections[0]);
    let header_style = Style::default().add_modifier(Modifier::BOLD);
    for (i, col) in view.spec.columns.iter().enumerate() {
        let mut label = spaced_lowercase(col.key);
        if col.key == view.sort_key && !view.is_static() {
            label.push_str(match view.sort_direction {
                SortDirection::Asc => " ▲",
                SortDirection::Desc => " ▼",
            });
        }
        render_cell_text(frame, header_cols[i], &label, header_style);
    }

    let list_area = sections[1];
    if view.rows.is_empty() {
        let empty = Paragraph::new("No entries").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return;
    }

    let visible = list_area.height as usize;
    for (i, row) in view.rows.iter().take(visible).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let selected = i == view.selected;
        let row_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if selected {
            frame.render_widget(Block::default().style(row_style), row_area);
        }
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths.clone())
            .split(row_area);
        for (j, col) in view.spec.columns.iter().enumerate() {
            render_cell_text(frame, cols[j], &cell_text(row, col), row_style);
        }
    }
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, area);
}

fn render_tab_bar(frame: &mut Frame, area: Rect, labels: &[&str], active: usize) {
    let mut spans = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        }
        let style = if i == active {
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(*label, style));
    }
    let bar = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(bar, area);
}

fn render_competition(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(area);

    let tabs = ["Details", "Competitors", "Matches", "Ranking"];
    let active = match state.competition_tab {
        CompetitionTab::Details => 0,
        CompetitionTab::Competitors => 1,
        CompetitionTab::Matches => 2,
        CompetitionTab::Ranking => 3,
    };
    render_tab_bar(frame, sections[0], &tabs, active);

    match state.competition_tab {
        CompetitionTab::Details => render_competition_details(frame, sections[1], state),
        CompetitionTab::Competitors => render_table(frame, sections[1], &state.competition_competitors),
        CompetitionTab::Matches => render_table(frame, sections[1], &state.competition_matches),
        CompetitionTab::Ranking => render_table(frame, sections[1], &state.competition_ranking),
    }
}

fn render_competition_details(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(competition) = &state.competition else {
        let loading = Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, area);
        return;
    };

    let mut lines = vec![competition.name.clone()];
    if let Some(kind) = competition.competition_type {
        lines.push(format!(
            "-{}-",
            match kind {
                arena_terminal::dto::CompetitionType::OneVsAll => "One VS All Competition",
                arena_terminal::dto::CompetitionType::Tournament => "Tournament Competition",
            }
        ));
    }
    lines.push(format!("Status: {}", enum_text(&competition.status)));
    lines.push(format!("Location: {}", competition.location));
    lines.push(format!(
        "Initial starting time: {}",
        stamp_text(competition.initial_start_time.as_ref())
    ));
    lines.push(format!(
        "Actualized starting time: {}",
        stamp_text(competition.actualized_start_time.as_ref())
    ));
    lines.push(format!("Game type: {}", competition.game_type.name));
    lines.push(format!(
        "Competitor type: {}",
        enum_text(&competition.competitor_type)
    ));
    if let Some(team_size) = competition.team_size {
        lines.push(format!("Team size: {team_size}"));
    }
    if let Some(win_at) = competition.win_at {
        lines.push(format!("Win at score: {win_at}"));
    }
    if let Some(duration) = competition.duration_in_minutes {
        lines.push(format!("Match duration in minutes: {duration}"));
    }
    if let Some(brk) = competition.break_in_minutes {
        lines.push(format!("Break time in minutes: {brk}"));
    }
    if competition.status == CompetitionStatus::Finished {
        let winners = if state.winners.is_empty() {
            "-".to_string()
        } else {
            state
                .winners
                .iter()
                .map(|w| w.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        lines.push(format!(
            "{} {winners}",
            if state.winners.len() > 1 {
                "Winners:"
            } else {
                "Winner:"
            }
        ));
    }

    let details = Paragraph::new(lines.join("\n"));
    frame.render_widget(details, area);
}

fn render_competitor(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(area);

    let roster_label = if state.competitor.as_ref().is_some_and(|c| c.is_team()) {
        "Members"
    } else {
        "Teams"
    };
    let tabs = [
        "Details",
        "Matches",
        "Competitions",
        roster_label,
        "Win ratings",
    ];
    let active = match state.competitor_tab {
        CompetitorTab::Details => 0,
        CompetitorTab::Matches => 1,
        CompetitorTab::Competitions => 2,
        CompetitorTab::Roster => 3,
        CompetitorTab::WinRatings => 4,
    };
    render_tab_bar(frame, sections[0], &tabs, active);

    match state.competitor_tab {
        CompetitorTab::Details => render_competitor_details(frame, sections[1], state),
        CompetitorTab::Matches => render_table(frame, sections[1], &state.competitor_matches),
        CompetitorTab::Competitions => {
            render_table(frame, sections[1], &state.competitor_competitions)
        }
        CompetitorTab::Roster => render_table(frame, sections[1], &state.competitor_roster),
        CompetitorTab::WinRatings => render_table(frame, sections[1], &state.win_ratings),
    }
}

fn render_competitor_details(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(competitor) = &state.competitor else {
        let loading = Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, area);
        return;
    };
    let kind = if competitor.is_team() { "Team" } else { "Player" };
    let mut lines = vec![
        competitor.name.clone(),
        format!("-{kind}-"),
        format!("Matches: {}", competitor.matches.len()),
        format!("Won matches: {}", competitor.won_matches.len()),
        format!("Competitions: {}", competitor.competitions.len()),
    ];
    if let Some(players) = competitor.players.as_deref() {
        lines.push(format!("Members: {}", players.len()));
    }
    if let Some(teams) = competitor.teams.as_deref() {
        lines.push(format!("Teams: {}", teams.len()));
    }
    frame.render_widget(Paragraph::new(lines.join("\n")), area);
}

fn render_match(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(area);

    let tabs = ["Details", "Points"];
    let active = match state.match_tab {
        MatchTab::Details => 0,
        MatchTab::Points => 1,
    };
    render_tab_bar(frame, sections[0], &tabs, active);

    match state.match_tab {
        MatchTab::Details => render_match_details(frame, sections[1], state),
        MatchTab::Points => render_table(frame, sections[1], &state.match_points),
    }
}

fn render_match_details(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(detail) = &state.match_info else {
        let loading = Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, area);
        return;
    };
    let score = match (detail.competitor_one_points, detail.competitor_two_points) {
        (Some(a), Some(b)) => format!("{a} - {b}"),
        _ => "-".to_string(),
    };
    let mut lines = vec![
        format!(
            "{} vs {}",
            detail.competitor_one.name, detail.competitor_two.name
        ),
        format!("Competition: {}", detail.competition.name),
        format!("Status: {}", enum_text(&detail.status)),
        format!("Score: {score}"),
        format!("Location: {}", detail.location),
        format!("Start: {}", stamp_text(detail.start_time.as_ref())),
        format!("End: {}", stamp_text(detail.end_time.as_ref())),
    ];
    if let Some(winner) = &detail.winner {
        lines.push(format!("Winner: {}", winner.name));
    }
    if let Some(level) = detail.stage_level {
        lines.push(format!("Stage level: {level}"));
    }
    if let Some(index) = detail.stage_index {
        lines.push(format!("Stage index: {index}"));
    }
    frame.render_widget(Paragraph::new(lines.join("\n")), area);
}

fn render_dialog(frame: &mut Frame, area: Rect, dialog: &Dialog) {
    let popup = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(forms::dialog_title(dialog.kind))
        .borders(Borders::ALL);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let mut lines: Vec<Line> = Vec::new();
    for (idx, (name, value, error)) in dialog.form.entries().enumerate() {
        let focused = idx == dialog.focus;
        let marker = if focused { "> " } else { "  " };
        let shown = match value {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(Some(n)) => n.to_string(),
            FieldValue::Number(None) => "-".to_string(),
            FieldValue::Choice(index) => {
                let label = index
                    .and_then(|i| dialog.options.get(name).and_then(|opts| opts.get(i)))
                    .map(|(_, label)| label.as_str())
                    .unwrap_or("-");
                format!("◂ {label} ▸")
            }
        };
        let style = if focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::styled(
            format!("{marker}{}: {shown}", spaced_lowercase(name)),
            style,
        ));
        if let Some(error) = error {
            lines.push(Line::styled(
                format!("    {error}"),
                Style::default().fg(Color::Red),
            ));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "Enter to submit, Esc to close",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_help_overlay(frame: &mut Frame, area: Rect, screen: &Screen) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let screen_keys: &[&str] = match screen {
        Screen::Auth => &[
            "  ←/→          Switch login/register",
            "  Tab / ↑/↓    Move between fields",
            "  Enter        Submit",
        ],
        Screen::Overview => &[
            "  Tab          Next section",
            "  Enter        Open selected entry",
            "  n/p or ←/→   Page",
            "  s            Flip sort direction",
            "  o            Next sortable column",
            "  /            Search",
            "  g            Page size (5/10)",
            "  r            Reload",
            "  c            Create (admin)",
            "  x            Sign out",
        ],
        Screen::Competition { .. } => &[
            "  Tab          Next section",
            "  Enter        Open competitor/match",
            "  z            Stop registrations (admin)",
            "  v            Start competition (admin)",
            "  c            Cancel competition (admin)",
            "  a            Register competitor (admin)",
            "  d            Remove competitor (admin)",
            "  u / l        Join / leave (user)",
            "  e            Export ranking to xlsx",
            "  i            Reload details",
        ],
        Screen::Competitor { .. } => &[
            "  Tab          Next section",
            "  Enter        Open match/competition/member",
            "  a            Add member (admin, team)",
            "  t            Toggle member status",
            "  d            Remove member",
            "  u            Join team (user)",
            "  i            Reload details",
        ],
        Screen::Match { .. } => &[
            "  Tab          Details/Points",
            "  v            Start match (admin)",
            "  f            End match (admin)",
            "  c            Cancel match (admin)",
            "  1 / 2        Add point for competitor (admin)",
            "  i            Reload details",
        ],
    };

    let mut text = vec![
        "Arena terminal - Help".to_string(),
        String::new(),
        "Global:".to_string(),
        "  ?            Toggle help".to_string(),
        "  b / Esc      Back".to_string(),
        "  q            Quit".to_string(),
        String::new(),
        "Screen:".to_string(),
    ];
    text.extend(screen_keys.iter().map(|s| s.to_string()));

    let help = Paragraph::new(text.join("\n"))
        .block(Block::default().title("Help").borders(Borders::ALL));
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn enum_text<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "-".to_string())
}

fn stamp_text(stamp: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    match stamp {
        Some(dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
        None => "-".to_string(),
    }
}
