use std::env;
use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.opendota.com/api";
pub const DEFAULT_DB_NAME: &str = "player_matches.sqlite";
const APP_DIR: &str = "player_matches";

/// What the insert pass does when `match_id` is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConflictPolicy {
    /// Plain insert; the primary key rejects the duplicate and the run aborts.
    #[default]
    Reject,
    /// Rewrite the eight primary fields, keep `win` / `is_radiant`.
    Upsert,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictPolicy::Reject => "reject",
            ConflictPolicy::Upsert => "upsert",
        })
    }
}

/// Commit granularity for every write pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CommitMode {
    /// Autocommit each statement. A failure keeps the rows written before it.
    #[default]
    #[value(alias = "per_row")]
    PerRow,
    /// One transaction per pass. A failure rolls the whole pass back.
    Batch,
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommitMode::PerRow => "per-row",
            CommitMode::Batch => "batch",
        })
    }
}

/// Sync one player's OpenDota match history into a sqlite table.
#[derive(Debug, Clone, Parser)]
#[command(name = "player_matches", version, about)]
pub struct SyncArgs {
    /// OpenDota account id
    #[arg(long, env = "ACCOUNT_ID")]
    pub account_id: u64,

    /// sqlite database file
    #[arg(long = "db", env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Database file name under the data dir, used when no path is given
    #[arg(long, env = "DB_NAME", default_value = DEFAULT_DB_NAME)]
    pub db_name: String,

    /// API base url
    #[arg(long, env = "OPENDOTA_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(
        long,
        env = "HTTP_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(5..=300)
    )]
    pub timeout_secs: u64,

    /// Duplicate match_id handling
    #[arg(long, env = "SYNC_CONFLICT_POLICY", default_value = "reject", value_enum)]
    pub on_conflict: ConflictPolicy,

    /// Commit granularity
    #[arg(long, env = "SYNC_COMMIT_MODE", default_value = "per-row", value_enum)]
    pub commit: CommitMode,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub account_id: u64,
    pub db_path: PathBuf,
    pub api_url: String,
    pub timeout_secs: u64,
    pub conflict_policy: ConflictPolicy,
    pub commit_mode: CommitMode,
}

impl SyncArgs {
    pub fn into_config(self) -> SyncConfig {
        self.into_config_with(|key| env::var(key).ok())
    }

    /// `lookup` only resolves the data dir (`XDG_DATA_HOME`, `HOME`) and the
    /// unused server credentials; everything else comes from the parsed args.
    pub fn into_config_with<F>(self, lookup: F) -> SyncConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        for key in ["DB_HOST", "DB_USER", "DB_PASSWORD"] {
            if get(key).is_some() {
                debug!(key, "ignored: sqlite store has no server credentials");
            }
        }

        let db_path = match self.db_path {
            Some(path) => path,
            None => {
                let name = self.db_name.trim();
                let name = if name.is_empty() { DEFAULT_DB_NAME } else { name };
                app_data_dir(&get)
                    .map(|dir| dir.join(name))
                    .unwrap_or_else(|| PathBuf::from(name))
            }
        };

        SyncConfig {
            account_id: self.account_id,
            db_path,
            api_url: self.api_url.trim().trim_end_matches('/').to_string(),
            timeout_secs: self.timeout_secs,
            conflict_policy: self.on_conflict,
            commit_mode: self.commit,
        }
    }
}

/// Loads `.env.local` then `.env`; values already in the environment win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn app_data_dir<F>(get: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = get("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = get("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    // Every flag is passed explicitly so values in the test environment
    // cannot leak in through clap's env fallback.
    fn parse(overrides: &[(&str, &str)]) -> Result<SyncArgs, clap::Error> {
        let mut flags = vec![
            ("--account-id", "86745912"),
            ("--db-name", DEFAULT_DB_NAME),
            ("--api-url", DEFAULT_API_URL),
            ("--timeout-secs", "30"),
            ("--on-conflict", "reject"),
            ("--commit", "per-row"),
        ];
        for &(flag, value) in overrides {
            match flags.iter_mut().find(|(f, _)| *f == flag) {
                Some(slot) => slot.1 = value,
                None => flags.push((flag, value)),
            }
        }
        let mut argv = vec!["player_matches"];
        for (flag, value) in flags {
            argv.push(flag);
            argv.push(value);
        }
        SyncArgs::try_parse_from(argv)
    }

    #[test]
    fn default_db_lands_in_data_dir() {
        let cfg = parse(&[])
            .unwrap()
            .into_config_with(lookup(&[("HOME", "/home/u")]));
        assert_eq!(cfg.account_id, 86745912);
        assert_eq!(
            cfg.db_path,
            PathBuf::from("/home/u/.local/share/player_matches/player_matches.sqlite")
        );
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.conflict_policy, ConflictPolicy::Reject);
        assert_eq!(cfg.commit_mode, CommitMode::PerRow);
    }

    #[test]
    fn bad_account_id_is_rejected() {
        let err = SyncArgs::try_parse_from(["player_matches", "--account-id", "account id"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn db_path_wins_over_db_name() {
        let cfg = parse(&[("--db", "/tmp/x.sqlite")])
            .unwrap()
            .into_config_with(lookup(&[("XDG_DATA_HOME", "/data")]));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x.sqlite"));

        let cfg = parse(&[("--db-name", "mydb.sqlite")])
            .unwrap()
            .into_config_with(lookup(&[("XDG_DATA_HOME", "/data")]));
        assert_eq!(cfg.db_path, PathBuf::from("/data/player_matches/mydb.sqlite"));
    }

    #[test]
    fn no_home_falls_back_to_relative_db_name() {
        let cfg = parse(&[]).unwrap().into_config_with(lookup(&[]));
        assert_eq!(cfg.db_path, PathBuf::from(DEFAULT_DB_NAME));
    }

    #[test]
    fn parses_policy_mode_timeout_and_url() {
        let cfg = parse(&[
            ("--api-url", "http://localhost:9000/api/"),
            ("--timeout-secs", "5"),
            ("--on-conflict", "upsert"),
            ("--commit", "batch"),
        ])
        .unwrap()
        .into_config_with(lookup(&[]));
        assert_eq!(cfg.api_url, "http://localhost:9000/api");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.conflict_policy, ConflictPolicy::Upsert);
        assert_eq!(cfg.commit_mode, CommitMode::Batch);

        let args = parse(&[("--commit", "per_row")]).unwrap();
        assert_eq!(args.commit, CommitMode::PerRow);
    }

    #[test]
    fn bad_timeout_is_rejected_like_bad_policy() {
        for extra in [
            ("--timeout-secs", "soon"),
            ("--timeout-secs", "1"),
            ("--timeout-secs", "301"),
            ("--on-conflict", "ignore"),
            ("--commit", "sometimes"),
        ] {
            let err = parse(&[extra]).unwrap_err();
            assert!(
                matches!(
                    err.kind(),
                    clap::error::ErrorKind::ValueValidation | clap::error::ErrorKind::InvalidValue
                ),
                "{extra:?} should be rejected, got {:?}",
                err.kind()
            );
        }
    }
}
