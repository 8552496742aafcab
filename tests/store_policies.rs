use std::fs;

use player_matches::config::{CommitMode, ConflictPolicy};
use player_matches::match_store::{
    close_db, insert_matches, load_match, open_db, open_in_memory, patch_matches, table_stats,
};
use player_matches::model::{MatchFilter, MatchRef, PatchColumn, PlayerMatch};

fn player_match(match_id: u64, kills: i64) -> PlayerMatch {
    PlayerMatch {
        match_id,
        radiant_win: false,
        duration: 2400,
        hero_id: 14,
        start_time: 1_700_000_000,
        kills,
        deaths: 4,
        assists: 9,
    }
}

#[test]
fn upsert_rewrites_stats_but_keeps_patched_flags() {
    let mut conn = open_in_memory().unwrap();
    insert_matches(
        &mut conn,
        &[player_match(10, 1)],
        ConflictPolicy::Reject,
        CommitMode::PerRow,
    )
    .unwrap();
    patch_matches(
        &mut conn,
        MatchFilter::new(PatchColumn::Win, true),
        &[MatchRef { match_id: 10 }],
        CommitMode::PerRow,
    )
    .unwrap();

    insert_matches(
        &mut conn,
        &[player_match(10, 7)],
        ConflictPolicy::Upsert,
        CommitMode::Batch,
    )
    .unwrap();

    let row = load_match(&conn, 10).unwrap().unwrap();
    assert_eq!(row.kills, 7);
    assert_eq!(row.win, Some(true));
    assert_eq!(row.is_radiant, None);
}

#[test]
fn patch_is_idempotent() {
    let mut conn = open_in_memory().unwrap();
    insert_matches(
        &mut conn,
        &[player_match(1, 0), player_match(2, 0)],
        ConflictPolicy::Reject,
        CommitMode::PerRow,
    )
    .unwrap();

    let filter = MatchFilter::new(PatchColumn::IsRadiant, true);
    let refs = [MatchRef { match_id: 2 }];
    for _ in 0..2 {
        let outcome = patch_matches(&mut conn, filter, &refs, CommitMode::PerRow).unwrap();
        assert_eq!(outcome.updated, 1);
        assert!(outcome.missing.is_empty());
    }
    assert_eq!(load_match(&conn, 2).unwrap().unwrap().is_radiant, Some(true));
    assert_eq!(load_match(&conn, 1).unwrap().unwrap().is_radiant, None);
    assert_eq!(table_stats(&conn).unwrap().unpatched_side, 1);
}

#[test]
fn file_db_survives_close_and_reopen() {
    let dir = std::env::temp_dir().join(format!("player_matches_test_{}", std::process::id()));
    let path = dir.join("nested").join("matches.sqlite");
    let _ = fs::remove_dir_all(&dir);

    let mut conn = open_db(&path).unwrap();
    insert_matches(
        &mut conn,
        &[player_match(77, 3)],
        ConflictPolicy::Reject,
        CommitMode::PerRow,
    )
    .unwrap();
    close_db(conn).unwrap();

    let conn = open_db(&path).unwrap();
    let row = load_match(&conn, 77).unwrap().unwrap();
    assert_eq!(row.kills, 3);
    close_db(conn).unwrap();
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn id_past_sqlite_range_is_rejected_not_wrapped() {
    let mut conn = open_in_memory().unwrap();
    let err = insert_matches(
        &mut conn,
        &[player_match(5, 1), player_match(u64::MAX, 1)],
        ConflictPolicy::Reject,
        CommitMode::Batch,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("exceeds the sqlite integer range"));
    assert_eq!(table_stats(&conn).unwrap().rows, 0);

    let err = patch_matches(
        &mut conn,
        MatchFilter::new(PatchColumn::Win, true),
        &[MatchRef { match_id: i64::MAX as u64 + 1 }],
        CommitMode::PerRow,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("exceeds the sqlite integer range"));
    assert!(load_match(&conn, u64::MAX).is_err());

    insert_matches(
        &mut conn,
        &[player_match(i64::MAX as u64, 1)],
        ConflictPolicy::Reject,
        CommitMode::PerRow,
    )
    .unwrap();
    let row = load_match(&conn, i64::MAX as u64).unwrap().unwrap();
    assert_eq!(row.match_id, i64::MAX as u64);
}
