use anyhow::Result;
use chrono::DateTime;
use clap::Parser;

use player_matches::config::{self, SyncArgs};
use player_matches::logging::init_logging;
use player_matches::match_store::{close_db, open_db};
use player_matches::opendota::OpenDotaClient;
use player_matches::sync::{SyncOptions, SyncSummary, sync_player_matches};

fn main() -> Result<()> {
    config::load_dotenv();
    let args = SyncArgs::parse();
    init_logging(args.verbose)?;
    let cfg = args.into_config();

    let source = OpenDotaClient::new(&cfg)?;
    let mut conn = open_db(&cfg.db_path)?;
    let summary = sync_player_matches(
        &mut conn,
        &source,
        cfg.account_id,
        cfg.db_path.clone(),
        SyncOptions {
            conflict_policy: cfg.conflict_policy,
            commit_mode: cfg.commit_mode,
        },
    )?;
    close_db(conn)?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SyncSummary) {
    println!("Match history sync complete");
    println!("Account: {}", summary.account_id);
    println!("DB: {}", summary.db_path.display());
    println!(
        "Matches fetched: {}  inserted: {}",
        summary.fetched, summary.inserted
    );
    for pass in &summary.passes {
        println!(
            "  {:<14} fetched={} updated={} missing={}",
            pass.filter.label(),
            pass.fetched,
            pass.updated,
            pass.missing
        );
    }
    for (name, ids) in [
        ("win", &summary.win_conflicts),
        ("is_radiant", &summary.side_conflicts),
    ] {
        if !ids.is_empty() {
            println!("Conflicting {name} buckets: {}", ids.len());
            for id in ids.iter().take(8) {
                println!("   - {id}");
            }
        }
    }

    let table = &summary.table;
    println!(
        "Table rows: {} (win unset: {}, side unset: {})",
        table.rows, table.unpatched_win, table.unpatched_side
    );
    let latest = table
        .latest_start_time
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string());
    println!("Latest match: {}", latest.as_deref().unwrap_or("n/a"));
}
