// Season analytics derived from completed results: weekly extremes, lineup
// efficiency, per-team consistency and form, and league superlatives.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::results::{MatchResult, MatchupRecord};
use crate::standings::TeamWeekScores;

/// Games considered for the form guide.
pub const FORM_WINDOW: usize = 5;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Efficiency {
    pub team: String,
    pub score: f64,
    pub opt: f64,
    /// Actual as a percentage of optimal.
    pub pct: f64,
}

impl Efficiency {
    fn placeholder(pct: f64) -> Self {
        Self {
            team: "-".to_string(),
            score: 0.0,
            opt: 0.0,
            pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyExtreme {
    pub week: u32,
    pub high_team: String,
    pub high_score: f64,
    pub low_team: String,
    pub low_score: f64,
    pub best_eff: Efficiency,
    pub worst_eff: Efficiency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub week: u32,
    pub score: f64,
    /// Table points accumulated through this week.
    pub table_points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team: String,
    pub std_dev: f64,
    pub total_pa: f64,
    pub last_5_avg: f64,
    /// Results of the last games, oldest first, e.g. `"WWLDL"`.
    pub form: String,
    pub max_score: f64,
    pub min_score: f64,
    pub weekly_trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Superlative {
    pub team: String,
    pub val: f64,
    pub desc: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Superlatives {
    pub most_consistent: Option<Superlative>,
    pub wildcard: Option<Superlative>,
    pub luckiest: Option<Superlative>,
    pub unluckiest: Option<Superlative>,
    pub form_king: Option<Superlative>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedStats {
    pub team_stats: Vec<TeamSummary>,
    pub superlatives: Superlatives,
    pub weekly_extremes: Vec<WeeklyExtreme>,
}

/// Recover per-(team, week) optimal scores from persisted matchup
/// annotations, for runs that did not recompute rosters.
pub fn optimal_from_annotations(matchups: &[MatchupRecord]) -> TeamWeekScores {
    let mut scores = TeamWeekScores::new();
    for m in matchups {
        if let Some(s) = m.annotations.home_optimal_score {
            scores.insert((m.home_team_id.clone(), m.week), s);
        }
        if let Some(s) = m.annotations.away_optimal_score {
            scores.insert((m.away_team_id.clone(), m.week), s);
        }
    }
    scores
}

fn result_letter(r: &MatchResult) -> char {
    if r.team_score > r.opponent_score {
        'W'
    } else if r.team_score < r.opponent_score {
        'L'
    } else {
        'D'
    }
}

fn letter_points(letter: char) -> u32 {
    match letter {
        'W' => 3,
        'D' => 1,
        _ => 0,
    }
}

/// First element with the largest (or smallest) key. Ties keep the earlier
/// element.
fn first_extreme<T>(items: &[T], key: impl Fn(&T) -> f64, largest: bool) -> Option<&T> {
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let k = key(item);
        let better = match best {
            None => true,
            Some((_, current)) if largest => k > current,
            Some((_, current)) => k < current,
        };
        if better {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn weekly_extremes(completed: &[&MatchResult], optimal: &TeamWeekScores) -> Vec<WeeklyExtreme> {
    let mut weeks: Vec<u32> = completed.iter().map(|r| r.week).collect();
    weeks.sort_unstable();
    weeks.dedup();

    let mut out = Vec::with_capacity(weeks.len());
    for week in weeks {
        let games: Vec<&MatchResult> = completed.iter().copied().filter(|r| r.week == week).collect();
        let (Some(high), Some(low)) = (
            first_extreme(&games, |r| r.team_score, true),
            first_extreme(&games, |r| r.team_score, false),
        ) else {
            continue;
        };

        let efficiencies: Vec<Efficiency> = games
            .iter()
            .filter_map(|r| {
                let opt = *optimal.get(&(r.team_id.clone(), week))?;
                let divisor = if opt == 0.0 { 1.0 } else { opt };
                let pct = r.team_score / divisor * 100.0;
                pct.is_finite().then(|| Efficiency {
                    team: r.team.clone(),
                    score: round2(r.team_score),
                    opt: round2(opt),
                    pct,
                })
            })
            .collect();

        let best_eff = first_extreme(&efficiencies, |e| e.pct, true)
            .map(|e| Efficiency {
                pct: round_to(e.pct, 1),
                ..e.clone()
            })
            .unwrap_or_else(|| Efficiency::placeholder(0.0));
        let worst_eff = first_extreme(&efficiencies, |e| e.pct, false)
            .map(|e| Efficiency {
                pct: round_to(e.pct, 1),
                ..e.clone()
            })
            .unwrap_or_else(|| Efficiency::placeholder(100.0));

        out.push(WeeklyExtreme {
            week,
            high_team: high.team.clone(),
            high_score: round2(high.team_score),
            low_team: low.team.clone(),
            low_score: round2(low.team_score),
            best_eff,
            worst_eff,
        });
    }
    out
}

fn team_summaries(completed: &[&MatchResult]) -> Vec<TeamSummary> {
    // Teams in order of first appearance.
    let mut order: Vec<&str> = Vec::new();
    let mut games: HashMap<&str, Vec<&MatchResult>> = HashMap::new();
    for &r in completed {
        let entry = games.entry(r.team.as_str()).or_default();
        if entry.is_empty() {
            order.push(r.team.as_str());
        }
        entry.push(r);
    }

    order
        .into_iter()
        .map(|team| {
            let mut team_games = games.remove(team).unwrap_or_default();
            team_games.sort_by_key(|r| r.week);

            let scores: Vec<f64> = team_games.iter().map(|r| r.team_score).collect();
            let letters: Vec<char> = team_games.iter().map(|r| result_letter(r)).collect();

            let tail_start = team_games.len().saturating_sub(FORM_WINDOW);
            let recent = &scores[tail_start..];
            let last_5_avg = if recent.is_empty() {
                0.0
            } else {
                recent.iter().sum::<f64>() / recent.len() as f64
            };

            let mut cumulative = 0;
            let weekly_trend = team_games
                .iter()
                .zip(&letters)
                .map(|(r, letter)| {
                    cumulative += letter_points(*letter);
                    TrendPoint {
                        week: r.week,
                        score: r.team_score,
                        table_points: cumulative,
                    }
                })
                .collect();

            TeamSummary {
                team: team.to_string(),
                std_dev: round2(population_std_dev(&scores)),
                total_pa: round2(team_games.iter().map(|r| r.opponent_score).sum()),
                last_5_avg: round2(last_5_avg),
                form: letters[tail_start..].iter().collect(),
                max_score: round2(scores.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
                min_score: round2(scores.iter().copied().fold(f64::INFINITY, f64::min)),
                weekly_trend,
            }
        })
        .collect()
}

fn pick(
    summary: &[TeamSummary],
    key: fn(&TeamSummary) -> f64,
    largest: bool,
    desc: &str,
) -> Option<Superlative> {
    first_extreme(summary, key, largest).map(|t| Superlative {
        team: t.team.clone(),
        val: key(t),
        desc: desc.to_string(),
    })
}

fn superlatives(summary: &[TeamSummary]) -> Superlatives {
    Superlatives {
        most_consistent: pick(summary, |t| t.std_dev, false, "Lowest Std Dev in Scores"),
        wildcard: pick(summary, |t| t.std_dev, true, "Highest Std Dev in Scores"),
        luckiest: pick(summary, |t| t.total_pa, false, "Fewest Points Against"),
        unluckiest: pick(summary, |t| t.total_pa, true, "Most Points Against"),
        form_king: pick(summary, |t| t.last_5_avg, true, "Highest Avg Score (Last 5)"),
    }
}

/// Season analytics over games in weeks `<= target_week`. `optimal` feeds
/// the efficiency columns; weeks without optimal scores report placeholders.
pub fn compute(results: &[MatchResult], target_week: u32, optimal: &TeamWeekScores) -> AdvancedStats {
    let completed: Vec<&MatchResult> = results.iter().filter(|r| r.week <= target_week).collect();
    if completed.is_empty() {
        return AdvancedStats::default();
    }

    let team_stats = team_summaries(&completed);
    AdvancedStats {
        superlatives: superlatives(&team_stats),
        weekly_extremes: weekly_extremes(&completed, optimal),
        team_stats,
    }
}
