//! Integration tests for the kicker core
//!
//! These tests drive the table registry, the match lifecycle manager and the
//! rating engine together over a shared in-memory store:
//! - Complete match workflows from table creation to rating updates
//! - Rejected transitions and their lack of side effects
//! - Rating arithmetic and the history-before-rating write order
//! - Configurable legacy behavior

mod fixtures;

use chrono::Utc;
use kicker_stats::config::{DrawScoring, LeavePolicy, MatchRules, RatingConfig, TeamSampling};
use kicker_stats::store::{Page, RatingStore};
use kicker_stats::types::{MatchState, PlayerPoints};
use kicker_stats::{KickerError, MarginEloCalculator, RatingEngine};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use fixtures::{create_test_system, create_test_system_with, new_players, RecordingRatingStore};

fn kind(err: &anyhow::Error) -> &KickerError {
    KickerError::of(err).expect("kicker error")
}

#[tokio::test]
async fn test_complete_match_workflow() {
    let system = create_test_system();

    // Step 1: table and empty match
    let table = system.create_table("T1").await;
    let m = system.matches.create_match(table.id, Utc::now()).await.unwrap();
    assert_eq!(m.state, MatchState::Open);
    assert!(m.team_a.is_empty() && m.team_b.is_empty());

    // Step 2: two players per team
    let players = new_players(4);
    for (i, player) in players.iter().enumerate() {
        system
            .matches
            .join_match(m.id, *player, if i < 2 { 1 } else { 2 })
            .await
            .unwrap();
    }

    // Step 3: start
    let started = system.matches.start_match(m.id).await.unwrap();
    assert_eq!(started.state, MatchState::Running);
    assert!(started.start_time.is_some());

    // Step 4: close with stats for all four players
    let stats: Vec<PlayerPoints> = players
        .iter()
        .zip([6, 4, 3, 2])
        .map(|(p, points)| PlayerPoints::new(*p, points))
        .collect();
    let closed = system.matches.close_match(m.id, 10, 5, &stats).await.unwrap();
    assert_eq!(closed.state, MatchState::Finished);
    assert_eq!((closed.score_a, closed.score_b), (10, 5));
    assert!(closed.end_time.is_some());
    assert_eq!(closed.player_stats.len(), 4);
    assert_eq!(system.matches.player_stats(m.id).await.unwrap().len(), 4);

    // Step 5: ratings
    for player in &players {
        system.ratings.initialize_player_rating(*player).await.unwrap();
    }
    let changes = system.ratings.update_match_ratings(&closed).await.unwrap();
    assert_eq!(changes.len(), 4);
    assert!(changes[..2].iter().all(|c| c.new_score > c.old_score));
    assert!(changes[2..].iter().all(|c| c.new_score < c.old_score));

    let listed = system.tables.matches_for_table(table.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, m.id);
}

#[tokio::test]
async fn test_start_with_three_players_fails() {
    let system = create_test_system();
    let table = system.create_table("T1").await;
    let m = system.full_match(&table, &new_players(3)).await;

    let err = system.matches.start_match(m.id).await.unwrap_err();
    assert!(matches!(kind(&err), KickerError::InvalidArgument { .. }));

    let after = system.matches.get_match(m.id).await.unwrap();
    assert_eq!(after.state, MatchState::Open);
    assert!(after.start_time.is_none());
}

#[tokio::test]
async fn test_win_against_stronger_team_rating() {
    let system = create_test_system();
    let table = system.create_table("T1").await;
    let players = new_players(4);
    system
        .seed_ratings(&players, &[1200, 1150, 1250, 1350])
        .await;

    let finished = system.finished_match(&table, &players, 10, 5).await;
    let change = system
        .ratings
        .update_player_rating(players[0], &finished)
        .await
        .unwrap();

    // E = 1 / (1 + 10^(100/500)) = 0.3869, S = 10 / 15 = 0.6667
    assert!((change.expected - 0.3869).abs() < 1e-4);
    assert!((change.actual - 0.6667).abs() < 1e-4);
    assert_eq!(change.new_score, 1228);
}

#[tokio::test]
async fn test_missing_stats_writes_nothing() {
    let system = create_test_system();
    let table = system.create_table("T1").await;
    let players = new_players(4);
    system.seed_ratings(&players, &[1200; 4]).await;

    let m = system.full_match(&table, &players).await;
    system.matches.start_match(m.id).await.unwrap();
    let stats: Vec<PlayerPoints> = players[..3]
        .iter()
        .map(|p| PlayerPoints::new(*p, 3))
        .collect();
    let finished = system.matches.close_match(m.id, 10, 2, &stats).await.unwrap();

    let err = system
        .ratings
        .update_player_rating(players[3], &finished)
        .await
        .unwrap_err();
    assert!(matches!(kind(&err), KickerError::InvariantViolation { .. }));

    assert!(system
        .ratings
        .get_player_rating_history(players[3], Page::all())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(system.store.ratings_for_player(players[3]).unwrap().len(), 1);
}

#[tokio::test]
async fn test_leave_with_invalid_team_number() {
    let system = create_test_system();
    let table = system.create_table("T1").await;
    let players = new_players(2);
    let m = system.full_match(&table, &players).await;

    let err = system
        .matches
        .leave_match(m.id, players[0], 3)
        .await
        .unwrap_err();
    assert!(matches!(kind(&err), KickerError::InvalidArgument { .. }));
    assert!(err.to_string().contains("Invalid team number"));

    assert_eq!(system.matches.get_match(m.id).await.unwrap(), m);
}

#[tokio::test]
async fn test_state_only_moves_forward() {
    let system = create_test_system();
    let table = system.create_table("T1").await;
    let players = new_players(4);
    let m = system.full_match(&table, &players).await;

    // Close before start
    let err = system.matches.close_match(m.id, 10, 0, &[]).await.unwrap_err();
    assert!(matches!(kind(&err), KickerError::InvalidArgument { .. }));

    system.matches.start_match(m.id).await.unwrap();

    // Start twice, join while running
    assert!(system.matches.start_match(m.id).await.is_err());
    assert!(system
        .matches
        .join_match(m.id, new_players(1)[0], 1)
        .await
        .is_err());

    let stats: Vec<PlayerPoints> = players.iter().map(|p| PlayerPoints::new(*p, 1)).collect();
    system.matches.close_match(m.id, 10, 8, &stats).await.unwrap();

    // Nothing leaves Finished
    let mut rng = StdRng::seed_from_u64(1);
    assert!(system.matches.start_match(m.id).await.is_err());
    assert!(system
        .matches
        .start_match_randomized(m.id, &mut rng)
        .await
        .is_err());
    assert!(system.matches.close_match(m.id, 10, 0, &stats).await.is_err());
    assert!(system.matches.leave_match(m.id, players[0], 1).await.is_err());

    let after = system.matches.get_match(m.id).await.unwrap();
    assert_eq!(after.state, MatchState::Finished);
    assert_eq!((after.score_a, after.score_b), (10, 8));
}

#[tokio::test]
async fn test_history_written_before_rating() {
    let store = Arc::new(RecordingRatingStore::new());
    let engine = RatingEngine::new(
        store.clone(),
        store.clone(),
        Arc::new(MarginEloCalculator::default()),
    );
    let system = create_test_system();
    let table = system.create_table("T1").await;
    let players = new_players(4);
    let finished = system.finished_match(&table, &players, 10, 3).await;

    for player in &players {
        engine.initialize_player_rating(*player).await.unwrap();
    }
    let before = engine.get_player_rating(players[1]).await.unwrap();
    store.clear();

    let change = engine
        .update_player_rating(players[1], &finished)
        .await
        .unwrap();

    assert_eq!(
        store.operations(),
        vec!["insert_history", "save_history", "insert_rating", "save_ratings"]
    );

    let history = engine
        .get_player_rating_history(players[1], Page::all())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score, before.score);

    let current = engine.get_player_rating(players[1]).await.unwrap();
    assert_eq!(current.score, change.new_score);
    let superseded = RatingStore::get_rating(store.as_ref(), before.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(superseded, before);
}

#[tokio::test]
async fn test_history_pagination() {
    let system = create_test_system();
    let table = system.create_table("T1").await;
    let players = new_players(4);
    system.seed_ratings(&players, &[1200; 4]).await;

    for _ in 0..3 {
        let finished = system.finished_match(&table, &players, 10, 6).await;
        system.ratings.update_match_ratings(&finished).await.unwrap();
    }

    let all = system
        .ratings
        .get_player_rating_history(players[0], Page::all())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].score, 1200);

    let window = system
        .ratings
        .get_player_rating_history(players[0], Page::window(1, 1))
        .await
        .unwrap();
    assert_eq!(window, vec![all[1].clone()]);

    let first = system
        .ratings
        .get_player_rating_history(players[0], Page::first(2))
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    let none = system
        .ratings
        .get_player_rating_history(new_players(1)[0], Page::all())
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_draw_scoring_modes() {
    let players = new_players(4);

    let system = create_test_system();
    let table = system.create_table("T1").await;
    system.seed_ratings(&players, &[1200; 4]).await;
    let finished = system.finished_match(&table, &players, 5, 5).await;
    let changes = system.ratings.update_match_ratings(&finished).await.unwrap();
    assert!(changes.iter().all(|c| c.delta() == 0));

    let legacy = create_test_system_with(
        MatchRules::default(),
        RatingConfig {
            draw_scoring: DrawScoring::Legacy,
            ..RatingConfig::default()
        },
    );
    let table = legacy.create_table("T1").await;
    legacy.seed_ratings(&players, &[1200; 4]).await;
    let finished = legacy.finished_match(&table, &players, 5, 5).await;
    let changes = legacy.ratings.update_match_ratings(&finished).await.unwrap();
    // S = 1 - 10/15 for both sides, E = 0.5
    assert!(changes.iter().all(|c| c.new_score == 1183));
}

#[tokio::test]
async fn test_legacy_rules() {
    let system = create_test_system_with(
        MatchRules {
            team_sampling: TeamSampling::WithReplacement,
            leave_policy: LeavePolicy::LegacyNotFull,
        },
        RatingConfig::default(),
    );
    let table = system.create_table("T1").await;
    let players = new_players(4);
    let m = system.full_match(&table, &players).await;

    let err = system
        .matches
        .leave_match(m.id, players[0], 1)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid argument: Team is full");

    let mut rng = StdRng::seed_from_u64(99);
    let started = system
        .matches
        .start_match_randomized(m.id, &mut rng)
        .await
        .unwrap();
    assert_eq!(started.team_a.len(), 2);
    assert_eq!(started.team_b.len(), 2);
    assert!(started
        .participants()
        .iter()
        .all(|p| players.contains(p)));
}

#[tokio::test]
async fn test_randomized_start_is_seed_deterministic() {
    let players = new_players(4);

    let mut lineups = Vec::new();
    for _ in 0..2 {
        let system = create_test_system();
        let table = system.create_table("T1").await;
        let m = system.full_match(&table, &players).await;
        let mut rng = StdRng::seed_from_u64(2024);
        let started = system
            .matches
            .start_match_randomized(m.id, &mut rng)
            .await
            .unwrap();
        lineups.push((started.team_a.players, started.team_b.players));
    }

    assert_eq!(lineups[0], lineups[1]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_teams_never_exceed_two(sides in proptest::collection::vec(1u8..=2, 1..12)) {
        tokio_test::block_on(async {
            let system = create_test_system();
            let table = system.create_table("T1").await;
            let m = system.matches.create_match(table.id, Utc::now()).await.unwrap();

            for side in sides {
                let before = system.matches.get_match(m.id).await.unwrap();
                let result = system.matches.join_match(m.id, new_players(1)[0], side).await;
                let after = system.matches.get_match(m.id).await.unwrap();

                let full = if side == 1 { before.team_a.is_full() } else { before.team_b.is_full() };
                if full {
                    let err = result.unwrap_err();
                    assert!(matches!(kind(&err), KickerError::InvalidArgument { .. }));
                    assert_eq!(after, before);
                } else {
                    assert!(result.is_ok());
                }
                assert!(after.team_a.len() <= 2 && after.team_b.len() <= 2);
            }
        });
    }
}
