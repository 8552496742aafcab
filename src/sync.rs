use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::{CommitMode, ConflictPolicy};
use crate::match_store::{TableStats, insert_matches, patch_matches, table_stats};
use crate::model::{MatchFilter, PATCH_PASSES, PatchColumn};
use crate::opendota::MatchSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOptions {
    pub conflict_policy: ConflictPolicy,
    pub commit_mode: CommitMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPassSummary {
    pub filter: MatchFilter,
    pub fetched: usize,
    pub updated: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub account_id: u64,
    pub db_path: PathBuf,
    pub fetched: usize,
    pub inserted: usize,
    pub passes: Vec<PatchPassSummary>,
    /// Ids returned by both `win=1` and `win=0`.
    pub win_conflicts: Vec<u64>,
    /// Ids returned by both `is_radiant=1` and `is_radiant=0`.
    pub side_conflicts: Vec<u64>,
    pub table: TableStats,
}

/// Runs the insert pass and then the four patch passes, strictly in order.
///
/// Nothing is retried. Whatever a failing pass committed before the error
/// stays in the table (all of it under `PerRow`, none of that pass under
/// `Batch`).
pub fn sync_player_matches(
    conn: &mut Connection,
    source: &dyn MatchSource,
    account_id: u64,
    db_path: PathBuf,
    opts: SyncOptions,
) -> Result<SyncSummary> {
    info!(
        account_id,
        policy = %opts.conflict_policy,
        mode = %opts.commit_mode,
        "fetching match history"
    );
    let matches = source
        .fetch_matches()
        .context("fetch player match history")?;
    let inserted = insert_matches(conn, &matches, opts.conflict_policy, opts.commit_mode)
        .context("insert pass")?;
    info!(fetched = matches.len(), inserted, "insert pass done");

    let mut passes = Vec::with_capacity(PATCH_PASSES.len());
    let mut seen: HashMap<MatchFilter, BTreeSet<u64>> = HashMap::new();
    for filter in PATCH_PASSES {
        let label = filter.label();
        let refs = source
            .fetch_filtered(filter)
            .with_context(|| format!("fetch {label} matches"))?;
        let outcome = patch_matches(conn, filter, &refs, opts.commit_mode)
            .with_context(|| format!("patch pass {label}"))?;
        if !outcome.missing.is_empty() {
            warn!(
                filter = %label,
                missing = outcome.missing.len(),
                "match ids without a stored row"
            );
        }
        info!(filter = %label, fetched = refs.len(), updated = outcome.updated, "patch pass done");

        seen.insert(filter, refs.iter().map(|r| r.match_id).collect());
        passes.push(PatchPassSummary {
            filter,
            fetched: refs.len(),
            updated: outcome.updated,
            missing: outcome.missing.len(),
        });
    }

    let win_conflicts = bucket_overlap(&seen, PatchColumn::Win);
    let side_conflicts = bucket_overlap(&seen, PatchColumn::IsRadiant);
    for (column, ids) in [
        (PatchColumn::Win, &win_conflicts),
        (PatchColumn::IsRadiant, &side_conflicts),
    ] {
        if !ids.is_empty() {
            // The `=0` pass runs last, so those rows currently hold false.
            warn!(
                column = column.as_str(),
                count = ids.len(),
                ids = ?ids,
                "match ids returned for both values"
            );
        }
    }

    let table = table_stats(conn)?;
    Ok(SyncSummary {
        account_id,
        db_path,
        fetched: matches.len(),
        inserted,
        passes,
        win_conflicts,
        side_conflicts,
        table,
    })
}

fn bucket_overlap(seen: &HashMap<MatchFilter, BTreeSet<u64>>, column: PatchColumn) -> Vec<u64> {
    let (Some(yes), Some(no)) = (
        seen.get(&MatchFilter::new(column, true)),
        seen.get(&MatchFilter::new(column, false)),
    ) else {
        return Vec::new();
    };
    yes.intersection(no).copied().collect()
}
