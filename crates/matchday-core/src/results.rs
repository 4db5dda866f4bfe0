// Match results: the persisted per-game record and its per-team flattening.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Identifier of a game: `"{week}_{home_id}_{away_id}"`.
pub fn matchup_id(week: u32, home_team_id: &str, away_team_id: &str) -> String {
    format!("{week}_{home_team_id}_{away_team_id}")
}

/// Values derived in later pipeline stages and attached to a game.
///
/// Every field is optional. `None` means "not computed", never "computed as
/// empty", which is what lets partial runs keep earlier results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchupAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_optimal_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_optimal_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_beat_median: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_beat_median: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_projected: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_projected: Option<f64>,
}

impl MatchupAnnotations {
    /// Field-wise coalesce: each field from `self` if present, else from
    /// `fallback`.
    pub fn or(self, fallback: &MatchupAnnotations) -> MatchupAnnotations {
        MatchupAnnotations {
            home_optimal_score: self.home_optimal_score.or(fallback.home_optimal_score),
            away_optimal_score: self.away_optimal_score.or(fallback.away_optimal_score),
            median_threshold: self.median_threshold.or(fallback.median_threshold),
            home_beat_median: self.home_beat_median.or(fallback.home_beat_median),
            away_beat_median: self.away_beat_median.or(fallback.away_beat_median),
            home_projected: self.home_projected.or(fallback.home_projected),
            away_projected: self.away_projected.or(fallback.away_projected),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == MatchupAnnotations::default()
    }
}

/// One head-to-head game as persisted in the league-state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupRecord {
    #[serde(rename = "matchupId")]
    pub matchup_id: String,
    pub week: u32,
    pub home_team: String,
    pub home_team_id: String,
    #[serde(default)]
    pub home_score: f64,
    pub away_team: String,
    pub away_team_id: String,
    #[serde(default)]
    pub away_score: f64,
    #[serde(flatten)]
    pub annotations: MatchupAnnotations,
}

impl MatchupRecord {
    /// A bare game with no annotations. The id is derived from the week and
    /// both team ids.
    pub fn new(
        week: u32,
        home_team: impl Into<String>,
        home_team_id: impl Into<String>,
        home_score: f64,
        away_team: impl Into<String>,
        away_team_id: impl Into<String>,
        away_score: f64,
    ) -> Self {
        let home_team_id = home_team_id.into();
        let away_team_id = away_team_id.into();
        Self {
            matchup_id: matchup_id(week, &home_team_id, &away_team_id),
            week,
            home_team: home_team.into(),
            home_team_id,
            home_score,
            away_team: away_team.into(),
            away_team_id,
            away_score,
            annotations: MatchupAnnotations::default(),
        }
    }

    /// The two per-team views of this game, home first.
    pub fn results(&self) -> [MatchResult; 2] {
        [
            MatchResult {
                week: self.week,
                team: self.home_team.clone(),
                team_id: self.home_team_id.clone(),
                opponent: self.away_team.clone(),
                opponent_id: self.away_team_id.clone(),
                team_score: self.home_score,
                opponent_score: self.away_score,
            },
            MatchResult {
                week: self.week,
                team: self.away_team.clone(),
                team_id: self.away_team_id.clone(),
                opponent: self.home_team.clone(),
                opponent_id: self.home_team_id.clone(),
                team_score: self.away_score,
                opponent_score: self.home_score,
            },
        ]
    }
}

/// One team's view of one game.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub week: u32,
    pub team: String,
    pub team_id: String,
    pub opponent: String,
    pub opponent_id: String,
    pub team_score: f64,
    pub opponent_score: f64,
}

/// Flatten games into per-team results: two mirrored rows per game.
pub fn flatten(matchups: &[MatchupRecord]) -> Vec<MatchResult> {
    matchups.iter().flat_map(MatchupRecord::results).collect()
}

/// Every team id appearing in `matchups`, sorted.
pub fn team_ids(matchups: &[MatchupRecord]) -> BTreeSet<String> {
    matchups
        .iter()
        .flat_map(|m| [m.home_team_id.clone(), m.away_team_id.clone()])
        .collect()
}

/// Weeks at or before `last_week`, paired with the teams that played in
/// them. Used to enumerate the roster keys a run needs.
pub fn team_weeks(matchups: &[MatchupRecord], last_week: u32) -> Vec<(u32, String)> {
    let keys: BTreeSet<(u32, String)> = matchups
        .iter()
        .filter(|m| m.week <= last_week)
        .flat_map(|m| {
            [
                (m.week, m.home_team_id.clone()),
                (m.week, m.away_team_id.clone()),
            ]
        })
        .collect();
    keys.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(week: u32, home: &str, hs: f64, away: &str, aws: f64) -> MatchupRecord {
        MatchupRecord::new(week, home.to_uppercase(), home, hs, away.to_uppercase(), away, aws)
    }

    #[test]
    fn id_combines_week_and_teams() {
        let m = game(3, "t1", 10.0, "t2", 7.0);
        assert_eq!(m.matchup_id, "3_t1_t2");
    }

    #[test]
    fn flatten_yields_mirrored_pairs() {
        let rows = flatten(&[game(1, "a", 10.0, "b", 7.0)]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_id, "a");
        assert_eq!(rows[0].team_score, rows[1].opponent_score);
        assert_eq!(rows[1].team_score, rows[0].opponent_score);
        assert_eq!(rows[1].opponent, "A");
    }

    #[test]
    fn team_weeks_are_unique_and_bounded() {
        let games = vec![
            game(1, "a", 1.0, "b", 2.0),
            game(2, "b", 1.0, "a", 2.0),
            game(3, "a", 0.0, "b", 0.0),
        ];
        let keys = team_weeks(&games, 2);
        assert_eq!(
            keys,
            vec![
                (1, "a".to_string()),
                (1, "b".to_string()),
                (2, "a".to_string()),
                (2, "b".to_string()),
            ]
        );
        assert_eq!(team_ids(&games).len(), 2);
    }

    #[test]
    fn json_omits_missing_annotations() {
        let mut m = game(1, "a", 10.0, "b", 7.0);
        m.annotations.home_optimal_score = Some(14.5);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["matchupId"], "1_a_b");
        assert_eq!(json["home_optimal_score"], 14.5);
        assert!(json.get("away_optimal_score").is_none());
        assert!(json.get("median_threshold").is_none());
    }

    #[test]
    fn json_without_annotations_reads_as_not_computed() {
        let raw = r#"{
            "matchupId": "2_a_b", "week": 2,
            "home_team": "A", "home_team_id": "a", "home_score": 3.5,
            "away_team": "B", "away_team_id": "b", "away_score": 4.0,
            "median_threshold": 3.75, "away_beat_median": true
        }"#;
        let m: MatchupRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(m.annotations.median_threshold, Some(3.75));
        assert_eq!(m.annotations.away_beat_median, Some(true));
        assert_eq!(m.annotations.home_beat_median, None);
        assert_eq!(m.annotations.home_optimal_score, None);
    }

    #[test]
    fn annotations_or_prefers_self() {
        let fresh = MatchupAnnotations {
            home_optimal_score: Some(1.0),
            ..Default::default()
        };
        let prev = MatchupAnnotations {
            home_optimal_score: Some(9.0),
            away_optimal_score: Some(8.0),
            ..Default::default()
        };
        let merged = fresh.or(&prev);
        assert_eq!(merged.home_optimal_score, Some(1.0));
        assert_eq!(merged.away_optimal_score, Some(8.0));
        assert!(!merged.is_empty());
        assert!(MatchupAnnotations::default().is_empty());
    }
}
