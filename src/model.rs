use serde::Deserialize;

/// One row of a player's match history as returned by the unfiltered
/// `/players/{account_id}/matches` call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerMatch {
    pub match_id: u64,
    pub radiant_win: bool,
    pub duration: i64,
    pub hero_id: i64,
    pub start_time: i64,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
}

/// Filtered calls only need the id; any other fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MatchRef {
    pub match_id: u64,
}

impl From<&PlayerMatch> for MatchRef {
    fn from(m: &PlayerMatch) -> Self {
        Self {
            match_id: m.match_id,
        }
    }
}

/// A `player_matches` row as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlayerMatch {
    pub match_id: u64,
    pub radiant_win: bool,
    pub duration: i64,
    pub hero_id: i64,
    pub start_time: i64,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub win: Option<bool>,
    pub is_radiant: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchColumn {
    Win,
    IsRadiant,
}

impl PatchColumn {
    /// Column name in `player_matches`, also used as the API query key.
    pub fn as_str(self) -> &'static str {
        match self {
            PatchColumn::Win => "win",
            PatchColumn::IsRadiant => "is_radiant",
        }
    }
}

/// Query filter for the match list endpoint. Each filter maps to exactly one
/// column/value pair on the patched row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchFilter {
    pub column: PatchColumn,
    pub value: bool,
}

impl MatchFilter {
    pub const fn new(column: PatchColumn, value: bool) -> Self {
        Self { column, value }
    }

    pub fn query_pair(self) -> (&'static str, &'static str) {
        (self.column.as_str(), if self.value { "1" } else { "0" })
    }

    pub fn label(self) -> String {
        let (key, value) = self.query_pair();
        format!("{key}={value}")
    }
}

pub const PATCH_PASSES: [MatchFilter; 4] = [
    MatchFilter::new(PatchColumn::Win, true),
    MatchFilter::new(PatchColumn::Win, false),
    MatchFilter::new(PatchColumn::IsRadiant, true),
    MatchFilter::new(PatchColumn::IsRadiant, false),
];
