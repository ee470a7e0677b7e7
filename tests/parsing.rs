use std::fs;
use std::path::PathBuf;

use arena_terminal::auth::decode_claims;
use arena_terminal::dto::{
    CompetitionDetail, CompetitionStatus, CompetitorDetail, CompetitorType, MatchDetail,
    MatchStatus, PaginatedPage, UserRole, win_rating_rows,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_paginated_competitions_fixture() {
    let raw = read_fixture("paginated_competitions.json");
    let page: PaginatedPage = serde_json::from_str(&raw).expect("fixture should parse");
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 12);
    assert_eq!(
        page.items[0].get("name").and_then(|v| v.as_str()),
        Some("Spring open 2026")
    );
}

#[test]
fn parses_competition_detail_fixture() {
    let raw = read_fixture("competition.json");
    let detail: CompetitionDetail = serde_json::from_str(&raw).expect("fixture should parse");
    assert_eq!(detail.status, CompetitionStatus::Organizing);
    assert_eq!(detail.competitor_type, CompetitorType::Player);
    assert_eq!(detail.game_type.name, "Darts");
    assert_eq!(detail.win_at, Some(11));
    assert!(detail.break_in_minutes.is_none());
    assert_eq!(detail.competitors.len(), 2);
    assert_eq!(detail.matches.len(), 1);
    assert_eq!(detail.matches[0].status, MatchStatus::NotStarted);
}

#[test]
fn parses_match_detail_fixture() {
    let raw = read_fixture("match.json");
    let detail: MatchDetail = serde_json::from_str(&raw).expect("fixture should parse");
    assert_eq!(detail.status, MatchStatus::SpecialWinCompetitorOne);
    assert_eq!(detail.competitor_one.name, "A. Stone");
    assert_eq!(detail.competitor_one_points, Some(11));
    assert_eq!(detail.winner.as_ref().map(|w| w.id.as_str()), Some("p1"));
    assert_eq!(detail.points.len(), 2);
}

#[test]
fn parses_team_competitor_fixture() {
    let raw = read_fixture("competitor_team.json");
    let detail: CompetitorDetail = serde_json::from_str(&raw).expect("fixture should parse");
    assert!(detail.is_team());
    assert!(!detail.is_player());
    assert_eq!(detail.member_is_active("p1"), Some(true));
    assert_eq!(detail.member_is_active("p2"), Some(false));
    assert_eq!(detail.member_is_active("p9"), None);
    assert_eq!(detail.won_matches.len(), 1);
}

#[test]
fn win_ratings_come_as_a_plain_map() {
    let raw = json!({ "Darts": 0.75, "Chess": 0.0 });
    let mut rows = win_rating_rows(&raw);
    rows.sort_by(|a, b| a.game_type.cmp(&b.game_type));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].game_type, "Chess");
    assert_eq!(rows[1].win_rating, 0.75);

    assert!(win_rating_rows(&json!(null)).is_empty());
    assert!(win_rating_rows(&json!([1, 2])).is_empty());
}

#[test]
fn decodes_role_and_player_claims() {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": "User",
            "PlayerId": "p7",
        })
        .to_string()
        .as_bytes(),
    );
    let claims = decode_claims(&format!("{header}.{payload}.sig")).expect("decodes");
    assert_eq!(claims.role, UserRole::User);
    assert_eq!(claims.player_id.as_deref(), Some("p7"));
}

#[test]
fn token_without_role_claim_is_rejected() {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "x" }).to_string().as_bytes());
    assert!(decode_claims(&format!("{header}.{payload}.sig")).is_err());
    assert!(decode_claims("nonsense").is_err());
    assert!(decode_claims("a.b.c").is_err());
}

#[test]
fn paginated_query_serializes_in_the_service_shape() {
    use arena_terminal::table::{self, TableView};
    let view = TableView::remote(&table::GAME_FORMATS, 10);
    let value = serde_json::to_value(view.query()).expect("serializes");
    assert_eq!(value["pageIndex"], 0);
    assert_eq!(value["pageSize"], 10);
    assert_eq!(value["columnNameForSorting"], "name");
    assert_eq!(value["sortDirection"], "asc");
    assert_eq!(value["requestFilters"]["logicalOperator"], 0);
    assert_eq!(value["requestFilters"]["filters"][0]["path"], "name");
}
