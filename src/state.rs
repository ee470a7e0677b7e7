use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::api::ListEndpoint;
use crate::auth::Session;
use crate::config::{Config, PAGE_SIZE_CHOICES};
use crate::dto::{
    CompetitionDetail, CompetitionStatus, CompetitorDetail, CompetitorDisplay, CompetitorType,
    EndMatchPayload, GameType, LoginPayload, MatchDetail, PaginatedQuery, RankingItem,
    RegisterPayload, WinRatingRow,
};
use crate::table::{self, TableView};
use crate::validation::Form;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Overview,
    Competition { id: String },
    Competitor { id: String },
    Match { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewTab {
    Competitions,
    Players,
    Teams,
    GameFormats,
}

impl OverviewTab {
    pub fn list(self) -> ListEndpoint {
        match self {
            OverviewTab::Competitions => ListEndpoint::Competitions,
            OverviewTab::Players => ListEndpoint::Players,
            OverviewTab::Teams => ListEndpoint::Teams,
            OverviewTab::GameFormats => ListEndpoint::GameFormats,
        }
    }

    pub fn next(self) -> Self {
        match self {
            OverviewTab::Competitions => OverviewTab::Players,
            OverviewTab::Players => OverviewTab::Teams,
            OverviewTab::Teams => OverviewTab::GameFormats,
            OverviewTab::GameFormats => OverviewTab::Competitions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionTab {
    Details,
    Competitors,
    Matches,
    Ranking,
}

impl CompetitionTab {
    pub fn next(self) -> Self {
        match self {
            CompetitionTab::Details => CompetitionTab::Competitors,
            CompetitionTab::Competitors => CompetitionTab::Matches,
            CompetitionTab::Matches => CompetitionTab::Ranking,
            CompetitionTab::Ranking => CompetitionTab::Details,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitorTab {
    Details,
    Matches,
    Competitions,
    Roster,
    WinRatings,
}

impl CompetitorTab {
    pub fn next(self) -> Self {
        match self {
            CompetitorTab::Details => CompetitorTab::Matches,
            CompetitorTab::Matches => CompetitorTab::Competitions,
            CompetitorTab::Competitions => CompetitorTab::Roster,
            CompetitorTab::Roster => CompetitorTab::WinRatings,
            CompetitorTab::WinRatings => CompetitorTab::Details,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTab {
    Details,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    CreateCompetition,
    CreatePlayer,
    CreateTeam,
    CreateGameFormat,
    RegisterCompetitor,
    AddTeamMember,
    EndMatch,
    AddPoint,
}

/// An open form overlay: the validated form plus per-field option lists for
/// choice fields (id, label), filled statically or by a fetch.
pub struct Dialog {
    pub kind: DialogKind,
    pub form: Form,
    pub focus: usize,
    pub options: HashMap<&'static str, Vec<(String, String)>>,
    /// Extra context some dialogs carry (e.g. the player id a point is for).
    pub aux: Option<String>,
}

impl Dialog {
    pub fn new(kind: DialogKind, form: Form) -> Self {
        Self {
            kind,
            form,
            focus: 0,
            options: HashMap::new(),
            aux: None,
        }
    }

    pub fn focus_next(&mut self) {
        if self.form.len() > 0 {
            self.focus = (self.focus + 1) % self.form.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if self.form.len() > 0 {
            self.focus = (self.focus + self.form.len() - 1) % self.form.len();
        }
    }

    pub fn focused_name(&self) -> Option<&'static str> {
        self.form.name_at(self.focus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSource {
    PlayersNotInCompetition,
    TeamsForCompetition,
    PlayersNotInTeam,
}

#[derive(Debug)]
pub enum ProviderCommand {
    Login(LoginPayload),
    Register(RegisterPayload),
    Logout,
    FetchPage {
        list: ListEndpoint,
        request_id: u64,
        query: PaginatedQuery,
    },
    FetchCompetition {
        id: String,
    },
    FetchRanking {
        id: String,
    },
    FetchWinners {
        id: String,
    },
    FetchCompetitor {
        id: String,
    },
    FetchMatch {
        id: String,
    },
    FetchGameTypes,
    FetchGameFormatChoices,
    FetchChoices {
        source: ChoiceSource,
        id: String,
    },
    StopRegistration {
        id: String,
    },
    StartCompetition {
        id: String,
    },
    EndCompetition {
        id: String,
    },
    CancelCompetition {
        id: String,
    },
    /// `competitor_id: None` acts on the caller's own player claim.
    AddCompetitor {
        competition_id: String,
        competitor_id: Option<String>,
    },
    RemoveCompetitor {
        competition_id: String,
        competitor_id: Option<String>,
    },
    AddTeamMember {
        team_id: String,
        player_id: Option<String>,
    },
    ToggleTeamMember {
        team_id: String,
        player_id: Option<String>,
    },
    RemoveTeamMember {
        team_id: String,
        player_id: Option<String>,
    },
    StartMatch {
        id: String,
    },
    EndMatch {
        id: String,
        payload: EndMatchPayload,
    },
    CancelMatch {
        id: String,
    },
    AddPoint {
        match_id: String,
        player_id: String,
        value: i64,
    },
    CreateOneVsAllCompetition(Value),
    CreateTournamentCompetition(Value),
    CreatePlayer(Value),
    CreateTeam(Value),
    CreateGameFormat(Value),
    ExportRanking {
        competition_id: String,
        competition_name: String,
        path: String,
    },
}

#[derive(Debug)]
pub enum Delta {
    Log(String),
    Alert(String),
    /// 401/403: the provider already cleared the persisted token.
    AuthExpired,
    LoggedIn {
        token: String,
    },
    Page {
        list: ListEndpoint,
        request_id: u64,
        items: Vec<Value>,
        total: usize,
    },
    Competition(Box<CompetitionDetail>),
    Ranking {
        competition_id: String,
        items: Vec<RankingItem>,
    },
    Winners {
        competition_id: String,
        items: Vec<CompetitorDisplay>,
    },
    Competitor(Box<CompetitorDetail>),
    WinRatings {
        competitor_id: String,
        rows: Vec<WinRatingRow>,
    },
    Match(Box<MatchDetail>),
    GameTypes(Vec<GameType>),
    GameFormatChoices(Vec<(String, String)>),
    Choices {
        source: ChoiceSource,
        items: Vec<CompetitorDisplay>,
    },
    /// A create/command finished: close the dialog and re-arm the visible
    /// fetches.
    DialogDone {
        message: String,
    },
}

pub struct AppState {
    pub screen: Screen,
    pub back: Vec<Screen>,
    pub session: Option<Session>,
    pub alert: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub page_size: usize,

    pub auth_mode: AuthMode,
    pub auth_form: Form,
    pub auth_focus: usize,

    pub overview_tab: OverviewTab,
    pub competitions: TableView,
    pub players: TableView,
    pub teams: TableView,
    pub game_formats: TableView,

    pub competition_tab: CompetitionTab,
    pub competition: Option<CompetitionDetail>,
    pub competition_competitors: TableView,
    pub competition_matches: TableView,
    pub competition_ranking: TableView,
    pub winners: Vec<CompetitorDisplay>,

    pub competitor_tab: CompetitorTab,
    pub competitor: Option<CompetitorDetail>,
    pub competitor_matches: TableView,
    pub competitor_competitions: TableView,
    pub competitor_roster: TableView,
    pub win_ratings: TableView,

    pub match_tab: MatchTab,
    pub match_info: Option<MatchDetail>,
    pub match_points: TableView,

    pub game_types: Vec<GameType>,
    pub dialog: Option<Dialog>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let page_size = config.page_size;
        Self {
            screen: Screen::Auth,
            back: Vec::new(),
            session: None,
            alert: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
            page_size,
            auth_mode: AuthMode::Login,
            auth_form: Form::new(Vec::new()),
            auth_focus: 0,
            overview_tab: OverviewTab::Competitions,
            competitions: TableView::remote(&table::COMPETITIONS, page_size),
            players: TableView::remote(&table::PLAYERS, page_size),
            teams: TableView::remote(&table::TEAMS, page_size),
            game_formats: TableView::remote(&table::GAME_FORMATS, page_size),
            competition_tab: CompetitionTab::Details,
            competition: None,
            competition_competitors: TableView::fixed(&table::COMPETITION_COMPETITORS),
            competition_matches: TableView::fixed(&table::MATCHES),
            competition_ranking: TableView::fixed(&table::RANKING),
            winners: Vec::new(),
            competitor_tab: CompetitorTab::Details,
            competitor: None,
            competitor_matches: TableView::fixed(&table::MATCHES),
            competitor_competitions: TableView::fixed(&table::COMPETITOR_COMPETITIONS),
            competitor_roster: TableView::fixed(&table::PLAYER_TEAMS),
            win_ratings: TableView::fixed(&table::WIN_RATINGS),
            match_tab: MatchTab::Details,
            match_info: None,
            match_points: TableView::fixed(&table::POINTS),
            game_types: Vec::new(),
            dialog: None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn is_admin(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_admin)
    }

    pub fn player_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(Session::player_id)
    }

    pub fn overview_table(&self) -> &TableView {
        match self.overview_tab {
            OverviewTab::Competitions => &self.competitions,
            OverviewTab::Players => &self.players,
            OverviewTab::Teams => &self.teams,
            OverviewTab::GameFormats => &self.game_formats,
        }
    }

    pub fn overview_table_mut(&mut self) -> &mut TableView {
        match self.overview_tab {
            OverviewTab::Competitions => &mut self.competitions,
            OverviewTab::Players => &mut self.players,
            OverviewTab::Teams => &mut self.teams,
            OverviewTab::GameFormats => &mut self.game_formats,
        }
    }

    fn table_for(&mut self, list: ListEndpoint) -> Option<&mut TableView> {
        match list {
            ListEndpoint::Competitions => Some(&mut self.competitions),
            ListEndpoint::Players => Some(&mut self.players),
            ListEndpoint::Teams => Some(&mut self.teams),
            ListEndpoint::GameFormats => Some(&mut self.game_formats),
            ListEndpoint::GameTypes => None,
        }
    }

    /// Fresh table state on tab switch, like remounting the route.
    pub fn switch_overview_tab(&mut self) {
        self.overview_tab = self.overview_tab.next();
        let size = self.page_size;
        let view = self.overview_table_mut();
        view.set_page_size(size);
        view.reset();
    }

    /// Page size is an app-wide preference; every remote table adopts it.
    pub fn cycle_page_size(&mut self) {
        let idx = PAGE_SIZE_CHOICES
            .iter()
            .position(|&size| size == self.page_size)
            .unwrap_or(0);
        self.page_size = PAGE_SIZE_CHOICES[(idx + 1) % PAGE_SIZE_CHOICES.len()];
        let size = self.page_size;
        self.competitions.set_page_size(size);
        self.players.set_page_size(size);
        self.teams.set_page_size(size);
        self.game_formats.set_page_size(size);
    }

    pub fn navigate(&mut self, screen: Screen) {
        self.back.push(self.screen.clone());
        self.screen = screen;
        self.dialog = None;
        self.reset_detail_state();
    }

    pub fn navigate_back(&mut self) {
        if let Some(previous) = self.back.pop() {
            self.screen = previous;
            self.dialog = None;
            self.reset_detail_state();
        }
    }

    fn reset_detail_state(&mut self) {
        match self.screen {
            Screen::Competition { .. } => {
                self.competition = None;
                self.competition_tab = CompetitionTab::Details;
                self.winners.clear();
                self.competition_ranking.set_fixed_rows(Vec::new());
            }
            Screen::Competitor { .. } => {
                self.competitor = None;
                self.competitor_tab = CompetitorTab::Details;
                self.win_ratings.set_fixed_rows(Vec::new());
            }
            Screen::Match { .. } => {
                self.match_info = None;
                self.match_tab = MatchTab::Details;
            }
            _ => {}
        }
    }

    pub fn set_alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.push_log(format!("[WARN] {message}"));
        self.alert = Some(message);
    }

    pub fn clear_alert(&mut self) {
        self.alert = None;
    }

    fn install_competition(&mut self, detail: CompetitionDetail) {
        self.competition_competitors.spec = match detail.competitor_type {
            CompetitorType::Player => &table::COMPETITION_COMPETITORS,
            CompetitorType::Team => &table::PLAYER_TEAMS,
        };
        self.competition_competitors
            .set_fixed_rows(to_rows(&detail.competitors));
        self.competition_matches
            .set_fixed_rows(to_rows(&detail.matches));
        self.competition = Some(detail);
    }

    fn install_competitor(&mut self, detail: CompetitorDetail) {
        self.competitor_matches
            .set_fixed_rows(to_rows(&detail.matches));
        self.competitor_competitions
            .set_fixed_rows(to_rows(&detail.competitions));
        if let Some(players) = detail.players.as_deref() {
            // Team roster: each player row joined with the link's active flag.
            self.competitor_roster.spec = &table::TEAM_MEMBERS;
            let rows = players
                .iter()
                .map(|player| {
                    let mut row = serde_json::to_value(player).unwrap_or(Value::Null);
                    if let (Some(active), Some(obj)) =
                        (detail.member_is_active(&player.id), row.as_object_mut())
                    {
                        obj.insert("isActive".to_string(), Value::Bool(active));
                    }
                    row
                })
                .collect();
            self.competitor_roster.set_fixed_rows(rows);
        } else if let Some(teams) = detail.teams.as_deref() {
            self.competitor_roster.spec = &table::PLAYER_TEAMS;
            self.competitor_roster.set_fixed_rows(to_rows(teams));
        } else {
            self.competitor_roster.set_fixed_rows(Vec::new());
        }
        self.competitor = Some(detail);
    }

    fn install_match(&mut self, detail: MatchDetail) {
        self.match_points.set_fixed_rows(to_rows(&detail.points));
        self.match_info = Some(detail);
    }

    /// True while the competition on screen is accepting registrations.
    pub fn competition_organizing(&self) -> bool {
        self.competition
            .as_ref()
            .is_some_and(|c| c.status == CompetitionStatus::Organizing)
    }

    /// A regular user may join the on-screen competition iff it is
    /// player-typed and their player is not already entered.
    pub fn self_can_join_competition(&self) -> bool {
        let Some(competition) = self.competition.as_ref() else {
            return false;
        };
        let Some(player_id) = self.player_id() else {
            return false;
        };
        if self.is_admin() || competition.competitor_type != CompetitorType::Player {
            return false;
        }
        !competition.competitors.iter().any(|c| c.id == player_id)
    }
}

pub fn to_rows<T: serde::Serialize>(items: &[T]) -> Vec<Value> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).unwrap_or(Value::Null))
        .collect()
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Log(message) => state.push_log(message),
        Delta::Alert(message) => state.set_alert(message),
        Delta::AuthExpired => {
            state.session = None;
            state.back.clear();
            state.dialog = None;
            state.screen = Screen::Auth;
            state.set_alert("Session expired, sign in again");
        }
        Delta::LoggedIn { token } => match Session::from_token(token) {
            Ok(session) => {
                state.push_log(format!("[INFO] Signed in as {:?}", session.user.role));
                state.session = Some(session);
                state.back.clear();
                state.screen = Screen::Overview;
                state.overview_tab = OverviewTab::Competitions;
                state.competitions.reset();
            }
            Err(err) => state.set_alert(format!("Unusable token: {err}")),
        },
        Delta::Page {
            list,
            request_id,
            items,
            total,
        } => {
            if let Some(view) = state.table_for(list) {
                if !view.set_rows(request_id, items, total) {
                    state.push_log("[INFO] Dropped superseded page");
                }
            }
        }
        Delta::Competition(detail) => {
            if matches!(&state.screen, Screen::Competition { id } if *id == detail.id) {
                state.install_competition(*detail);
            }
        }
        Delta::Ranking {
            competition_id,
            items,
        } => {
            if matches!(&state.screen, Screen::Competition { id } if *id == competition_id) {
                state.competition_ranking.set_fixed_rows(to_rows(&items));
            }
        }
        Delta::Winners {
            competition_id,
            items,
        } => {
            if matches!(&state.screen, Screen::Competition { id } if *id == competition_id) {
                state.winners = items;
            }
        }
        Delta::Competitor(detail) => {
            if matches!(&state.screen, Screen::Competitor { id } if *id == detail.id) {
                state.install_competitor(*detail);
            }
        }
        Delta::WinRatings {
            competitor_id,
            rows,
        } => {
            if matches!(&state.screen, Screen::Competitor { id } if *id == competitor_id) {
                state.win_ratings.set_fixed_rows(to_rows(&rows));
            }
        }
        Delta::Match(detail) => {
            if matches!(&state.screen, Screen::Match { id } if *id == detail.id) {
                state.install_match(*detail);
            }
        }
        Delta::GameTypes(types) => {
            if let Some(dialog) = state.dialog.as_mut() {
                let options = types
                    .iter()
                    .map(|gt| (gt.id.clone(), gt.name.clone()))
                    .collect();
                dialog.options.insert("gameType", options);
            }
            state.game_types = types;
        }
        Delta::GameFormatChoices(options) => {
            if let Some(dialog) = state.dialog.as_mut() {
                dialog.options.insert("gameFormat", options);
            }
        }
        Delta::Choices { source, items } => {
            if let Some(dialog) = state.dialog.as_mut() {
                let field = match source {
                    ChoiceSource::PlayersNotInCompetition | ChoiceSource::TeamsForCompetition => {
                        "competitor"
                    }
                    ChoiceSource::PlayersNotInTeam => "player",
                };
                let options = items
                    .iter()
                    .map(|item| (item.id.clone(), item.name.clone()))
                    .collect();
                dialog.options.insert(field, options);
            }
        }
        Delta::DialogDone { message } => {
            state.dialog = None;
            state.push_log(format!("[INFO] {message}"));
            if state.screen == Screen::Overview {
                state.overview_table_mut().refresh();
            }
        }
    }
}
