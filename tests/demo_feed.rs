use std::sync::mpsc;

use arena_terminal::api::ListEndpoint;
use arena_terminal::demo::{DemoWorld, paginate};
use arena_terminal::dto::{
    FilterRule, PaginatedQuery, RequestFilters, SortDirection,
};
use arena_terminal::state::{Delta, ProviderCommand};
use serde_json::{Value, json};

fn query(page_index: usize, page_size: usize, sort: &str, dir: SortDirection, filter: &str) -> PaginatedQuery {
    PaginatedQuery {
        page_index,
        page_size,
        column_name_for_sorting: sort.to_string(),
        sort_direction: dir,
        request_filters: RequestFilters {
            logical_operator: 0,
            filters: vec![FilterRule {
                path: "name".to_string(),
                value: filter.to_string(),
            }],
        },
    }
}

fn sample_rows() -> Vec<Value> {
    vec![
        json!({"id": "1", "name": "Omega", "wins": 3}),
        json!({"id": "2", "name": "Alpha", "wins": 9}),
        json!({"id": "3", "name": "Harbor", "wins": 1}),
        json!({"id": "4", "name": "Vertex", "wins": 5}),
    ]
}

#[test]
fn paginate_sorts_filters_and_slices() {
    let (items, total) = paginate(sample_rows(), &query(0, 2, "name", SortDirection::Asc, ""));
    assert_eq!(total, 4);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Alpha");
    assert_eq!(items[1]["name"], "Harbor");

    let (items, _) = paginate(sample_rows(), &query(1, 2, "name", SortDirection::Asc, ""));
    assert_eq!(items[0]["name"], "Omega");

    let (items, total) = paginate(sample_rows(), &query(0, 10, "name", SortDirection::Asc, "a"));
    // Case-insensitive contains: Alpha, Harbor, Omega, Vertex all but... only
    // names holding an 'a': Alpha, Harbor, Omega.
    assert_eq!(total, 3);
    assert!(items.iter().all(|row| row["name"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains('a')));
}

#[test]
fn paginate_sorts_numbers_numerically_and_flips() {
    let (items, _) = paginate(sample_rows(), &query(0, 10, "wins", SortDirection::Desc, ""));
    let wins: Vec<i64> = items.iter().map(|r| r["wins"].as_i64().unwrap()).collect();
    assert_eq!(wins, vec![9, 5, 3, 1]);
}

#[test]
fn paginate_past_the_end_is_empty_not_a_panic() {
    let (items, total) = paginate(sample_rows(), &query(9, 5, "name", SortDirection::Asc, ""));
    assert_eq!(total, 4);
    assert!(items.is_empty());
}

#[test]
fn world_answers_pages_with_echoed_request_id() {
    let (tx, rx) = mpsc::channel();
    let mut world = DemoWorld::seed();
    world.handle(
        &tx,
        ProviderCommand::FetchPage {
            list: ListEndpoint::Competitions,
            request_id: 42,
            query: query(0, 10, "name", SortDirection::Asc, ""),
        },
    );
    match rx.try_recv().expect("page delta") {
        Delta::Page {
            list,
            request_id,
            items,
            total,
        } => {
            assert_eq!(list, ListEndpoint::Competitions);
            assert_eq!(request_id, 42);
            assert!(!items.is_empty());
            assert_eq!(total, items.len());
        }
        other => panic!("unexpected delta: {other:?}"),
    }
}

#[test]
fn world_serves_detail_and_ranking_for_seeded_competitions() {
    let (tx, rx) = mpsc::channel();
    let mut world = DemoWorld::seed();
    world.handle(
        &tx,
        ProviderCommand::FetchPage {
            list: ListEndpoint::Competitions,
            request_id: 1,
            query: query(0, 10, "name", SortDirection::Asc, ""),
        },
    );
    let id = match rx.try_recv().expect("page delta") {
        Delta::Page { items, .. } => items[0]["id"].as_str().expect("id").to_string(),
        other => panic!("unexpected delta: {other:?}"),
    };

    world.handle(&tx, ProviderCommand::FetchCompetition { id: id.clone() });
    match rx.try_recv().expect("competition delta") {
        Delta::Competition(detail) => assert_eq!(detail.id, id),
        other => panic!("unexpected delta: {other:?}"),
    }

    world.handle(&tx, ProviderCommand::FetchRanking { id: id.clone() });
    match rx.try_recv().expect("ranking delta") {
        Delta::Ranking {
            competition_id,
            items,
        } => {
            assert_eq!(competition_id, id);
            // Ranking covers exactly the entered competitors, best first.
            for pair in items.windows(2) {
                assert!((pair[0].wins, pair[0].points) >= (pair[1].wins, pair[1].points));
            }
        }
        other => panic!("unexpected delta: {other:?}"),
    }
}

#[test]
fn world_team_membership_round_trip() {
    let (tx, rx) = mpsc::channel();
    let mut world = DemoWorld::seed();
    world.handle(
        &tx,
        ProviderCommand::FetchPage {
            list: ListEndpoint::Teams,
            request_id: 1,
            query: query(0, 10, "name", SortDirection::Asc, ""),
        },
    );
    let team_id = match rx.try_recv().expect("page delta") {
        Delta::Page { items, .. } => items[0]["id"].as_str().expect("id").to_string(),
        other => panic!("unexpected delta: {other:?}"),
    };

    world.handle(
        &tx,
        ProviderCommand::FetchChoices {
            source: arena_terminal::state::ChoiceSource::PlayersNotInTeam,
            id: team_id.clone(),
        },
    );
    let candidate = match rx.try_recv().expect("choices delta") {
        Delta::Choices { items, .. } => items[0].id.clone(),
        other => panic!("unexpected delta: {other:?}"),
    };

    world.handle(
        &tx,
        ProviderCommand::AddTeamMember {
            team_id: team_id.clone(),
            player_id: Some(candidate.clone()),
        },
    );
    let mut saw_member = false;
    while let Ok(delta) = rx.try_recv() {
        if let Delta::Competitor(detail) = delta {
            assert_eq!(detail.id, team_id);
            let players = detail.players.as_deref().expect("team roster");
            saw_member = players.iter().any(|p| p.id == candidate);
        }
    }
    assert!(saw_member, "added player should appear in the roster");
}
