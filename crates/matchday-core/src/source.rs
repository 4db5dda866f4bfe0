// Contract for the remote league-data source.
//
// The core never talks to the network directly. Everything it needs from the
// league host comes through `LeagueSource`, and every call may fail on its
// own without affecting sibling calls.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::results::MatchupRecord;
use crate::roster::RosterEntry;
use crate::stats::StatRow;
use crate::teams::TeamDirectory;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Remote league data. Implementations must be safe to call concurrently
/// for distinct keys.
#[async_trait]
pub trait LeagueSource: Send + Sync {
    /// Head-to-head games scheduled in `week`, base fields only.
    async fn fetch_matchups(&self, week: u32) -> Result<Vec<MatchupRecord>, SourceError>;

    /// The roster `team_id` fielded in `week`, in feed order.
    async fn fetch_roster(&self, team_id: &str, week: u32)
        -> Result<Vec<RosterEntry>, SourceError>;

    /// Per-player, per-week event counts for the season so far.
    async fn fetch_raw_stats(&self) -> Result<Vec<StatRow>, SourceError>;

    /// Display metadata for every team in the league, keyed by team id.
    async fn fetch_team_details(&self) -> Result<TeamDirectory, SourceError>;
}
