use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

use crate::dto::{FilterRule, PaginatedQuery, RequestFilters, SortDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Date,
}

/// Column-property descriptor: field name, sortable flag, optional nested
/// sub-key (for object cells like `gameType.name`), and a rendering hint.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub sortable: bool,
    pub nested: Option<&'static str>,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn text(key: &'static str, sortable: bool) -> Self {
        Self {
            key,
            sortable,
            nested: None,
            kind: ColumnKind::Text,
        }
    }

    pub const fn number(key: &'static str, sortable: bool) -> Self {
        Self {
            key,
            sortable,
            nested: None,
            kind: ColumnKind::Number,
        }
    }

    pub const fn date(key: &'static str, sortable: bool) -> Self {
        Self {
            key,
            sortable,
            nested: None,
            kind: ColumnKind::Date,
        }
    }

    pub const fn nested(key: &'static str, sub: &'static str, sortable: bool) -> Self {
        Self {
            key,
            sortable,
            nested: Some(sub),
            kind: ColumnKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub title: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Empty means the table offers no free-text filter.
    pub filter_key: &'static str,
    pub default_sort_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableSource {
    /// State changes arm a fetch against the paginated endpoint.
    Remote,
    /// Caller-supplied fixed rows; never fetches.
    Static,
}

/// Paginated/sortable/filterable list state driving a remote fetch whenever
/// sort key, direction, page index, page size or filter changes. Fetches are
/// tagged with a request id so a superseded response can be dropped instead
/// of overwriting newer state.
pub struct TableView {
    pub spec: &'static TableSpec,
    source: TableSource,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    pub page_size: usize,
    pub filter: String,
    pub rows: Vec<Value>,
    pub total: usize,
    pub selected: usize,
    dirty: bool,
    issued: u64,
}

impl TableView {
    pub fn remote(spec: &'static TableSpec, page_size: usize) -> Self {
        Self {
            spec,
            source: TableSource::Remote,
            sort_key: spec.default_sort_key.to_string(),
            sort_direction: SortDirection::Asc,
            page_index: 0,
            page_size,
            filter: String::new(),
            rows: Vec::new(),
            total: 0,
            selected: 0,
            dirty: true,
            issued: 0,
        }
    }

    pub fn fixed(spec: &'static TableSpec) -> Self {
        Self {
            spec,
            source: TableSource::Static,
            sort_key: spec.default_sort_key.to_string(),
            sort_direction: SortDirection::Asc,
            page_index: 0,
            page_size: 0,
            filter: String::new(),
            rows: Vec::new(),
            total: 0,
            selected: 0,
            dirty: false,
            issued: 0,
        }
    }

    pub fn is_static(&self) -> bool {
        self.source == TableSource::Static
    }

    // ----- committed state changes -----

    /// Same key flips direction, a new sortable key selects ascending.
    pub fn toggle_sort(&mut self, key: &str) {
        let sortable = self
            .spec
            .columns
            .iter()
            .any(|col| col.key == key && col.sortable);
        if !sortable {
            return;
        }
        if self.sort_key == key {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_key = key.to_string();
            self.sort_direction = SortDirection::Asc;
        }
        self.mark_dirty();
    }

    pub fn next_page(&mut self) {
        if (self.page_index + 1) * self.page_size < self.total {
            self.page_index += 1;
            self.mark_dirty();
        }
    }

    pub fn prev_page(&mut self) {
        if self.page_index > 0 {
            self.page_index -= 1;
            self.mark_dirty();
        }
    }

    pub fn set_page_size(&mut self, size: usize) {
        if size == self.page_size {
            return;
        }
        self.page_size = size;
        self.page_index = 0;
        self.mark_dirty();
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.page_index = 0;
        self.mark_dirty();
    }

    /// Back to defaults (ascending, default sort key, first page, no filter)
    /// and re-arm the fetch; used on reload.
    pub fn reset(&mut self) {
        self.sort_key = self.spec.default_sort_key.to_string();
        self.sort_direction = SortDirection::Asc;
        self.page_index = 0;
        self.filter.clear();
        self.selected = 0;
        self.mark_dirty();
    }

    /// Re-arm a fetch with unchanged parameters.
    pub fn refresh(&mut self) {
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        if self.source == TableSource::Remote {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Consumes the dirty flag and builds the query from current state, so
    /// the fetch always carries the latest committed parameters. Returns the
    /// request id the eventual response must echo.
    pub fn take_query(&mut self) -> Option<(u64, PaginatedQuery)> {
        if self.source != TableSource::Remote || !self.dirty {
            return None;
        }
        self.dirty = false;
        self.issued += 1;
        Some((self.issued, self.query()))
    }

    pub fn query(&self) -> PaginatedQuery {
        PaginatedQuery {
            page_index: self.page_index,
            page_size: self.page_size,
            column_name_for_sorting: self.sort_key.clone(),
            sort_direction: self.sort_direction,
            request_filters: RequestFilters {
                logical_operator: 0,
                filters: vec![FilterRule {
                    path: self.spec.filter_key.to_string(),
                    value: self.filter.clone(),
                }],
            },
        }
    }

    // ----- results -----

    /// Installs a fetched page unless it was superseded by a newer query.
    pub fn set_rows(&mut self, request_id: u64, rows: Vec<Value>, total: usize) -> bool {
        if self.source == TableSource::Remote && request_id != self.issued {
            return false;
        }
        self.rows = rows;
        self.total = total;
        self.clamp_selection();
        true
    }

    pub fn set_fixed_rows(&mut self, rows: Vec<Value>) {
        self.total = rows.len();
        self.rows = rows;
        self.clamp_selection();
    }

    // ----- selection -----

    pub fn select_next(&mut self) {
        if !self.rows.is_empty() && self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.rows.len() {
            self.selected = self.rows.len() - 1;
        }
    }

    pub fn selected_row(&self) -> Option<&Value> {
        self.rows.get(self.selected)
    }

    pub fn selected_id(&self) -> Option<String> {
        self.selected_row().and_then(row_id)
    }

    pub fn page_count(&self) -> usize {
        if self.page_size == 0 || self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.page_size)
        }
    }
}

/// Rows without a top-level id fall back to the embedded competitor's id
/// (ranking rows are keyed that way).
pub fn row_id(row: &Value) -> Option<String> {
    if let Some(id) = row.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    row.get("competitor")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Cell text for one column of one row: nested lookup, date formatting,
/// "-" for anything null or missing.
pub fn cell_text(row: &Value, col: &ColumnSpec) -> String {
    let mut cell = row.get(col.key);
    if let (Some(sub), Some(value)) = (col.nested, cell) {
        cell = value.get(sub);
    }
    let Some(value) = cell else {
        return "-".to_string();
    };
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) if col.kind == ColumnKind::Date => format_date(text),
        Value::String(text) => {
            if text.is_empty() {
                "-".to_string()
            } else {
                text.clone()
            }
        }
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "-".to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    if let Some(dt) = parse_naive(trimmed) {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    trimmed.replace('T', " ")
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    None
}

/// "numberOfActivePlayers" -> "number of active players"; used for column
/// headings and the toolbar's search hint.
pub fn spaced_lowercase(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let chars: Vec<char> = key.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev_lower = chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev_lower || (chars[i - 1].is_uppercase() && next_lower) {
                out.push(' ');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

// ----- per-entity specs, mirroring the service's list shapes -----

pub static COMPETITIONS: TableSpec = TableSpec {
    title: "Competitions",
    columns: &[
        ColumnSpec::text("name", true),
        ColumnSpec::text("competitionType", false),
        ColumnSpec::text("status", true),
        ColumnSpec::text("gameType", false),
        ColumnSpec::text("competitorType", false),
    ],
    filter_key: "name",
    default_sort_key: "status",
};

pub static PLAYERS: TableSpec = TableSpec {
    title: "Players",
    columns: &[
        ColumnSpec::text("name", true),
        ColumnSpec::number("numberOfCompetitions", false),
        ColumnSpec::number("numberOfMatches", false),
        ColumnSpec::number("numberOfTeams", false),
    ],
    filter_key: "name",
    default_sort_key: "name",
};

pub static TEAMS: TableSpec = TableSpec {
    title: "Teams",
    columns: &[
        ColumnSpec::text("name", true),
        ColumnSpec::number("numberOfCompetitions", false),
        ColumnSpec::number("numberOfMatches", false),
        ColumnSpec::number("numberOfPlayers", false),
        ColumnSpec::number("numberOfActivePlayers", false),
    ],
    filter_key: "name",
    default_sort_key: "name",
};

pub static GAME_FORMATS: TableSpec = TableSpec {
    title: "Game formats",
    columns: &[
        ColumnSpec::text("name", true),
        ColumnSpec::nested("gameType", "name", false),
        ColumnSpec::text("competitorType", true),
        ColumnSpec::number("teamSize", true),
        ColumnSpec::number("winAt", true),
        ColumnSpec::number("durationInMinutes", true),
    ],
    filter_key: "name",
    default_sort_key: "name",
};

pub static MATCHES: TableSpec = TableSpec {
    title: "Matches",
    columns: &[
        ColumnSpec::text("status", true),
        ColumnSpec::date("startTime", true),
        ColumnSpec::text("competitors", false),
        ColumnSpec::text("competitorsPoints", false),
        ColumnSpec::text("competition", false),
        ColumnSpec::text("winner", false),
    ],
    filter_key: "startTime",
    default_sort_key: "startTime",
};

pub static COMPETITION_COMPETITORS: TableSpec = TableSpec {
    title: "Competitors",
    columns: &[
        ColumnSpec::text("name", false),
        ColumnSpec::text("competitorType", false),
    ],
    filter_key: "",
    default_sort_key: "",
};

pub static RANKING: TableSpec = TableSpec {
    title: "Ranking",
    columns: &[
        ColumnSpec::nested("competitor", "name", false),
        ColumnSpec::number("wins", false),
        ColumnSpec::number("points", false),
    ],
    filter_key: "",
    default_sort_key: "",
};

pub static POINTS: TableSpec = TableSpec {
    title: "Points",
    columns: &[
        ColumnSpec::text("player", false),
        ColumnSpec::number("value", false),
    ],
    filter_key: "",
    default_sort_key: "",
};

pub static TEAM_MEMBERS: TableSpec = TableSpec {
    title: "Members",
    columns: &[
        ColumnSpec::text("name", false),
        ColumnSpec::number("numberOfPlayers", false),
        ColumnSpec::number("numberOfActivePlayers", false),
        ColumnSpec::text("isActive", false),
    ],
    filter_key: "",
    default_sort_key: "",
};

pub static PLAYER_TEAMS: TableSpec = TableSpec {
    title: "Teams",
    columns: &[
        ColumnSpec::text("name", false),
        ColumnSpec::number("numberOfPlayers", false),
        ColumnSpec::number("numberOfActivePlayers", false),
    ],
    filter_key: "",
    default_sort_key: "",
};

pub static COMPETITOR_COMPETITIONS: TableSpec = TableSpec {
    title: "Competitions",
    columns: &[
        ColumnSpec::text("name", false),
        ColumnSpec::text("status", false),
        ColumnSpec::text("competitorType", false),
    ],
    filter_key: "",
    default_sort_key: "",
};

pub static WIN_RATINGS: TableSpec = TableSpec {
    title: "Win ratings",
    columns: &[
        ColumnSpec::text("gameType", false),
        ColumnSpec::number("winRating", false),
    ],
    filter_key: "",
    default_sort_key: "",
};
