// The league-state document: everything a run publishes for downstream
// readers, persisted as one JSON file.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::advanced::AdvancedStats;
use crate::persist;
use crate::results::MatchupRecord;
use crate::standings::StandingsTables;
use crate::teams::TeamDirectory;
use crate::waivers::WaiverPlayer;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueState {
    #[serde(default)]
    pub matchups: Vec<MatchupRecord>,
    #[serde(default)]
    pub standings: StandingsTables,
    #[serde(default)]
    pub advanced_stats: AdvancedStats,
    #[serde(default)]
    pub waivers: Vec<WaiverPlayer>,
    #[serde(default)]
    pub team_details: TeamDirectory,
    #[serde(default)]
    pub current_week: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl LeagueState {
    /// Load the persisted document. A missing file is an empty state; a file
    /// that exists but cannot be parsed is an error, so a run never starts
    /// from (and then overwrites) a document it failed to read.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(persist::read_json(path)?.unwrap_or_default())
    }

    /// Write the whole document, replacing the previous version atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        persist::write_json_atomic(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standings::{compute, Scheme, TeamWeekScores};
    use crate::results::flatten;
    use crate::teams::TeamDetails;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("matchday_state_{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_document_loads_empty() {
        let dir = scratch("missing");
        let state = LeagueState::load(&dir.join("league_state.json")).unwrap();
        assert_eq!(state, LeagueState::default());
    }

    #[test]
    fn save_then_load_preserves_document() {
        let dir = scratch("roundtrip");
        let path = dir.join("league_state.json");

        let matchups = vec![MatchupRecord::new(1, "A", "a", 10.0, "B", "b", 7.0)];
        let mut state = LeagueState {
            current_week: 2,
            last_updated: Some(Utc::now()),
            ..Default::default()
        };
        state.standings.set(
            Scheme::Standard,
            compute(&flatten(&matchups), 1, Scheme::Standard, &TeamWeekScores::new()),
        );
        state.matchups = matchups;
        state.team_details.insert(
            "a".into(),
            TeamDetails {
                team: "A".into(),
                manager: "Ann".into(),
                logo: String::new(),
            },
        );

        state.save(&path).unwrap();
        let loaded = LeagueState::load(&path).unwrap();
        assert_eq!(loaded, state);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["standings"]["standard"][0]["team"], "A");
        assert_eq!(raw["matchups"][0]["matchupId"], "1_a_b");
        assert_eq!(raw["team_details"]["a"]["manager"], "Ann");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn sparse_document_fills_defaults() {
        let dir = scratch("sparse");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("league_state.json");
        fs::write(&path, r#"{"current_week": 5, "standings": {"standard": []}}"#).unwrap();

        let state = LeagueState::load(&path).unwrap();
        assert_eq!(state.current_week, 5);
        assert!(state.matchups.is_empty());
        assert!(state.last_updated.is_none());
        assert!(state.team_details.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let dir = scratch("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("league_state.json");
        fs::write(&path, "[truncated").unwrap();

        assert!(LeagueState::load(&path).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
