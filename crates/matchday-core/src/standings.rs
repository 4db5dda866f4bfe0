// League tables under the three scoring schemes.
//
// Every scheme reduces to the same aggregation: classify each team-game as a
// win, draw or loss, award 3/1/0 points, and sum per team. The schemes differ
// only in which scores are compared and against what.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::results::MatchResult;

/// Per-(team_id, week) score, used for optimal-lineup substitution.
pub type TeamWeekScores = HashMap<(String, u32), f64>;

/// How the weekly median enters the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedianMode {
    /// Results against the weekly median replace head-to-head results.
    Replace,
    /// Head-to-head points plus a second result against the weekly median.
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Actual scores, head to head.
    Standard,
    /// Each team's optimal-lineup score in place of its actual score.
    Optimal,
    Median(MedianMode),
}

impl Scheme {
    pub const ALL: [Scheme; 4] = [
        Scheme::Standard,
        Scheme::Optimal,
        Scheme::Median(MedianMode::Replace),
        Scheme::Median(MedianMode::Additive),
    ];

    /// Key under which the table is stored in the league-state document.
    pub fn key(&self) -> &'static str {
        match self {
            Scheme::Standard => "standard",
            Scheme::Optimal => "optimal",
            Scheme::Median(MedianMode::Replace) => "median",
            Scheme::Median(MedianMode::Additive) => "median_h2h",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    fn compare(score: f64, against: f64) -> Self {
        if score > against {
            Outcome::Win
        } else if score < against {
            Outcome::Loss
        } else {
            Outcome::Draw
        }
    }

    fn points(self) -> u32 {
        match self {
            Outcome::Win => 3,
            Outcome::Draw => 1,
            Outcome::Loss => 0,
        }
    }
}

/// One team's line in a league table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub rank: u32,
    pub team: String,
    pub team_id: String,
    pub points: u32,
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
    pub fpts_for: f64,
    pub fpts_against: f64,
    /// `"W-D-L"`.
    pub record: String,
}

#[derive(Default)]
struct Tally {
    team_id: String,
    points: u32,
    win: u32,
    draw: u32,
    loss: u32,
    fpts_for: f64,
    fpts_against: f64,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.win += 1,
            Outcome::Draw => self.draw += 1,
            Outcome::Loss => self.loss += 1,
        }
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median team score of every week up to and including `target_week`.
pub fn weekly_medians(results: &[MatchResult], target_week: u32) -> BTreeMap<u32, f64> {
    let mut by_week: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for r in results.iter().filter(|r| r.week <= target_week) {
        by_week.entry(r.week).or_default().push(r.team_score);
    }
    by_week
        .into_iter()
        .filter_map(|(week, scores)| median(&scores).map(|m| (week, m)))
        .collect()
}

/// A team's standing against the weekly median for one week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianMark {
    pub threshold: f64,
    pub beat: bool,
}

/// Median threshold and beat-median flag for every (team_id, week) played
/// up to `target_week`. A score equal to the median does not beat it.
pub fn median_history(
    results: &[MatchResult],
    target_week: u32,
) -> HashMap<(String, u32), MedianMark> {
    let medians = weekly_medians(results, target_week);
    results
        .iter()
        .filter_map(|r| {
            let threshold = *medians.get(&r.week)?;
            Some((
                (r.team_id.clone(), r.week),
                MedianMark {
                    threshold,
                    beat: r.team_score > threshold,
                },
            ))
        })
        .collect()
}

/// Build the league table for `scheme` over games in weeks `<= target_week`.
///
/// `optimal` is only read by [`Scheme::Optimal`]; a (team, week) it lacks
/// scores 0. Rows are ranked by points then points-for, both descending.
/// Teams level on both keep team-name order. No games yields an empty table.
pub fn compute(
    results: &[MatchResult],
    target_week: u32,
    scheme: Scheme,
    optimal: &TeamWeekScores,
) -> Vec<StandingsRow> {
    let in_range: Vec<&MatchResult> = results.iter().filter(|r| r.week <= target_week).collect();
    if in_range.is_empty() {
        return Vec::new();
    }

    let medians = match scheme {
        Scheme::Median(_) => weekly_medians(results, target_week),
        _ => BTreeMap::new(),
    };
    let optimal_for =
        |team_id: &str, week: u32| optimal.get(&(team_id.to_string(), week)).copied().unwrap_or(0.0);

    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for r in in_range {
        let (score, against) = match scheme {
            Scheme::Optimal => (optimal_for(&r.team_id, r.week), optimal_for(&r.opponent_id, r.week)),
            _ => (r.team_score, r.opponent_score),
        };

        let head_to_head = Outcome::compare(score, against);
        let median_outcome = medians
            .get(&r.week)
            .map(|m| Outcome::compare(score, *m))
            .unwrap_or(Outcome::Loss);

        let tally = tallies.entry(r.team.clone()).or_default();
        if tally.team_id.is_empty() {
            tally.team_id = r.team_id.clone();
        }
        tally.fpts_for += score;
        tally.fpts_against += against;

        match scheme {
            Scheme::Standard | Scheme::Optimal => {
                tally.record(head_to_head);
                tally.points += head_to_head.points();
            }
            Scheme::Median(MedianMode::Replace) => {
                tally.record(median_outcome);
                tally.points += median_outcome.points();
            }
            Scheme::Median(MedianMode::Additive) => {
                tally.record(head_to_head);
                tally.points += head_to_head.points() + median_outcome.points();
            }
        }
    }

    let mut rows: Vec<StandingsRow> = tallies
        .into_iter()
        .map(|(team, t)| StandingsRow {
            rank: 0,
            record: format!("{}-{}-{}", t.win, t.draw, t.loss),
            team,
            team_id: t.team_id,
            points: t.points,
            win: t.win,
            draw: t.draw,
            loss: t.loss,
            fpts_for: t.fpts_for,
            fpts_against: t.fpts_against,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.fpts_for.total_cmp(&a.fpts_for))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i as u32 + 1;
    }
    rows
}

/// The league tables persisted in the state document, one per scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsTables {
    #[serde(default)]
    pub standard: Vec<StandingsRow>,
    #[serde(default)]
    pub optimal: Vec<StandingsRow>,
    #[serde(default)]
    pub median: Vec<StandingsRow>,
    #[serde(default)]
    pub median_h2h: Vec<StandingsRow>,
}

impl StandingsTables {
    pub fn get(&self, scheme: Scheme) -> &[StandingsRow] {
        match scheme {
            Scheme::Standard => &self.standard,
            Scheme::Optimal => &self.optimal,
            Scheme::Median(MedianMode::Replace) => &self.median,
            Scheme::Median(MedianMode::Additive) => &self.median_h2h,
        }
    }

    /// Replace one scheme's table, leaving the others as they were.
    pub fn set(&mut self, scheme: Scheme, rows: Vec<StandingsRow>) {
        match scheme {
            Scheme::Standard => self.standard = rows,
            Scheme::Optimal => self.optimal = rows,
            Scheme::Median(MedianMode::Replace) => self.median = rows,
            Scheme::Median(MedianMode::Additive) => self.median_h2h = rows,
        }
    }
}
