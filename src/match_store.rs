use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::config::{CommitMode, ConflictPolicy};
use crate::model::{MatchFilter, MatchRef, PlayerMatch, StoredPlayerMatch};

const INSERT_SQL: &str = r#"
    INSERT INTO player_matches (
        match_id, radiant_win, duration, hero_id,
        start_time, kills, deaths, assists
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

// `win` and `is_radiant` are left alone so earlier patches survive a re-run.
const UPSERT_SQL: &str = r#"
    INSERT INTO player_matches (
        match_id, radiant_win, duration, hero_id,
        start_time, kills, deaths, assists
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(match_id) DO UPDATE SET
        radiant_win = excluded.radiant_win,
        duration = excluded.duration,
        hero_id = excluded.hero_id,
        start_time = excluded.start_time,
        kills = excluded.kills,
        deaths = excluded.deaths,
        assists = excluded.assists
"#;

const SELECT_COLUMNS: &str = "match_id, radiant_win, duration, hero_id, start_time, \
                              kills, deaths, assists, win, is_radiant";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    pub updated: usize,
    /// Ids that matched no stored row.
    pub missing: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    pub rows: usize,
    pub unpatched_win: usize,
    pub unpatched_side: usize,
    pub latest_start_time: Option<i64>,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create db directory {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS player_matches (
            match_id INTEGER PRIMARY KEY,
            radiant_win INTEGER NOT NULL,
            duration INTEGER NOT NULL,
            hero_id INTEGER NOT NULL,
            start_time INTEGER NOT NULL,
            kills INTEGER NOT NULL,
            deaths INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            win INTEGER NULL,
            is_radiant INTEGER NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Close explicitly so a failing final flush is reported instead of lost in
/// `Drop`.
pub fn close_db(conn: Connection) -> Result<()> {
    conn.close()
        .map_err(|(_, err)| err)
        .context("close sqlite db")
}

/// Writes the eight primary fields of every match. Returns the number of rows
/// written.
pub fn insert_matches(
    conn: &mut Connection,
    matches: &[PlayerMatch],
    policy: ConflictPolicy,
    mode: CommitMode,
) -> Result<usize> {
    let sql = match policy {
        ConflictPolicy::Reject => INSERT_SQL,
        ConflictPolicy::Upsert => UPSERT_SQL,
    };
    with_commit_mode(conn, mode, "insert", |conn| {
        let mut stmt = conn.prepare_cached(sql).context("prepare insert")?;
        let mut written = 0usize;
        for m in matches {
            let id = sql_id(m.match_id)?;
            written += stmt
                .execute(params![
                    id,
                    bool_to_i64(m.radiant_win),
                    m.duration,
                    m.hero_id,
                    m.start_time,
                    m.kills,
                    m.deaths,
                    m.assists,
                ])
                .with_context(|| format!("insert match {}", m.match_id))?;
        }
        Ok(written)
    })
}

/// Sets `filter.column = filter.value` on every row whose id is in `refs`.
/// Ids without a row are collected, not treated as errors.
pub fn patch_matches(
    conn: &mut Connection,
    filter: MatchFilter,
    refs: &[MatchRef],
    mode: CommitMode,
) -> Result<PatchOutcome> {
    let column = filter.column.as_str();
    let sql = format!("UPDATE player_matches SET {column} = ?1 WHERE match_id = ?2");
    let value = bool_to_i64(filter.value);

    with_commit_mode(conn, mode, "patch", |conn| {
        let mut stmt = conn.prepare_cached(&sql).context("prepare patch")?;
        let mut outcome = PatchOutcome::default();
        for r in refs {
            let changed = stmt
                .execute(params![value, sql_id(r.match_id)?])
                .with_context(|| format!("set {column} on match {}", r.match_id))?;
            if changed == 0 {
                debug!(match_id = r.match_id, column, "no stored row to patch");
                outcome.missing.push(r.match_id);
            } else {
                outcome.updated += changed;
            }
        }
        Ok(outcome)
    })
}

pub fn load_matches(conn: &Connection) -> Result<Vec<StoredPlayerMatch>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM player_matches ORDER BY start_time ASC, match_id ASC"
        ))
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map([], stored_match_from_row)
        .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match row")?);
    }
    Ok(out)
}

pub fn load_match(conn: &Connection, match_id: u64) -> Result<Option<StoredPlayerMatch>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM player_matches WHERE match_id = ?1"),
        params![sql_id(match_id)?],
        stored_match_from_row,
    )
    .optional()
    .with_context(|| format!("load match {match_id}"))
}

pub fn table_stats(conn: &Connection) -> Result<TableStats> {
    conn.query_row(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN win IS NULL THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN is_radiant IS NULL THEN 1 ELSE 0 END), 0),
            MAX(start_time)
        FROM player_matches
        "#,
        [],
        |row| {
            Ok(TableStats {
                rows: row.get::<_, i64>(0)? as usize,
                unpatched_win: row.get::<_, i64>(1)? as usize,
                unpatched_side: row.get::<_, i64>(2)? as usize,
                latest_start_time: row.get(3)?,
            })
        },
    )
    .context("query table stats")
}

fn with_commit_mode<T, F>(conn: &mut Connection, mode: CommitMode, pass: &str, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T>,
{
    match mode {
        CommitMode::PerRow => f(&*conn),
        CommitMode::Batch => {
            let tx = conn
                .transaction()
                .with_context(|| format!("begin {pass} transaction"))?;
            let out = f(&*tx)?;
            tx.commit()
                .with_context(|| format!("commit {pass} transaction"))?;
            Ok(out)
        }
    }
}

fn stored_match_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredPlayerMatch> {
    Ok(StoredPlayerMatch {
        match_id: row.get::<_, u64>(0)?,
        radiant_win: row.get::<_, i64>(1)? != 0,
        duration: row.get(2)?,
        hero_id: row.get(3)?,
        start_time: row.get(4)?,
        kills: row.get(5)?,
        deaths: row.get(6)?,
        assists: row.get(7)?,
        win: row.get::<_, Option<i64>>(8)?.map(|v| v != 0),
        is_radiant: row.get::<_, Option<i64>>(9)?.map(|v| v != 0),
    })
}

/// sqlite integers are signed; an id past `i64::MAX` would wrap negative.
fn sql_id(match_id: u64) -> Result<i64> {
    i64::try_from(match_id)
        .with_context(|| format!("match id {match_id} exceeds the sqlite integer range"))
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
