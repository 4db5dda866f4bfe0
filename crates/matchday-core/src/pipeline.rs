// Weekly update run.
//
// Run sequence:
// 1. Load the persisted league state and roster cache
// 2. Fetch matchups (or reuse the persisted ones)
// 3. Standings and median annotations from match results
// 4. Rosters and stats -> optimal lineup scores, stat detail document
// 5. Current-week rosters -> waiver pool
// 6. Predictions -> projected lineup scores
// 7. Reconcile annotations with history, rebuild derived tables
// 8. Persist state, cache and stat detail

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::advanced;
use crate::config::Config;
use crate::lineup::{best_lineup_score, projected_lineup_score};
use crate::projections::Predictions;
use crate::reconcile;
use crate::results::{self, flatten, MatchupAnnotations, MatchupRecord};
use crate::roster::{PrefetchReport, RosterCache};
use crate::source::LeagueSource;
use crate::stat_detail::StatDetailDocument;
use crate::standings::{self, MedianMode, Scheme};
use crate::state::LeagueState;
use crate::stats::{StatRow, StatsLookup};
use crate::waivers;

// ---------------------------------------------------------------------------
// Update plan
// ---------------------------------------------------------------------------

/// Which parts of the league state a run recomputes.
///
/// Rosters, waivers and projections all depend on a fresh matchup pass, so
/// requesting any of them turns `matchups` on as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub matchups: bool,
    pub rosters: bool,
    pub waivers: bool,
    pub projections: bool,
}

impl UpdatePlan {
    pub fn all() -> Self {
        Self {
            matchups: true,
            rosters: true,
            waivers: true,
            projections: true,
        }
    }

    /// Apply the dependency rules: anything built on match results implies
    /// a matchup refresh.
    pub fn normalized(mut self) -> Self {
        if self.rosters || self.waivers || self.projections {
            self.matchups = true;
        }
        self
    }

    /// Build a plan from command-line flags. No flags means everything.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plan = UpdatePlan::default();
        let mut any = false;
        for arg in args {
            any = true;
            match arg.as_ref() {
                "--all" => plan = UpdatePlan::all(),
                "--matchups" => plan.matchups = true,
                "--rosters" => plan.rosters = true,
                "--waivers" => plan.waivers = true,
                "--projections" => plan.projections = true,
                other => bail!(
                    "unknown flag `{other}` (expected --all, --matchups, --rosters, --waivers, --projections)"
                ),
            }
        }
        Ok(if any { plan.normalized() } else { UpdatePlan::all() })
    }
}

/// What a run did, for the caller to log or display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub matchups: usize,
    pub failed_weeks: Vec<u32>,
    pub team_details: Option<usize>,
    pub rosters: PrefetchReport,
    pub optimal_scores: usize,
    pub median_marks: usize,
    pub waivers: Option<usize>,
    pub projected: usize,
    pub stat_lines: Option<usize>,
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Fetch every week of the season. A failed week is logged and contributes
/// nothing; the persisted records for it survive reconciliation.
async fn fetch_all_matchups(
    source: &dyn LeagueSource,
    season_weeks: u32,
    summary: &mut RunSummary,
) -> Vec<MatchupRecord> {
    let mut fetched = Vec::new();
    for week in 1..=season_weeks {
        match source.fetch_matchups(week).await {
            Ok(records) => fetched.extend(records),
            Err(e) => {
                warn!("Failed to fetch matchups for week {week}: {e}");
                summary.failed_weeks.push(week);
            }
        }
    }
    fetched
}

/// `None` when the stats feed is unavailable. Everything scored from stats
/// is then skipped for the run and the persisted values stand.
async fn fetch_stats(source: &dyn LeagueSource) -> Option<Vec<StatRow>> {
    match source.fetch_raw_stats().await {
        Ok(rows) => {
            info!("Loaded {} stat rows", rows.len());
            Some(rows)
        }
        Err(e) => {
            warn!("Failed to load player stats, keeping persisted optimal scores and waivers: {e}");
            None
        }
    }
}

/// Replace the persisted team directory when the source returns one.
async fn refresh_team_details(
    source: &dyn LeagueSource,
    state: &mut LeagueState,
    summary: &mut RunSummary,
) {
    match source.fetch_team_details().await {
        Ok(details) if !details.is_empty() => {
            info!("Loaded details for {} teams", details.len());
            summary.team_details = Some(details.len());
            state.team_details = details;
        }
        Ok(_) => warn!(
            "Source returned no team details; keeping {} persisted",
            state.team_details.len()
        ),
        Err(e) => warn!("Failed to fetch team details: {e}"),
    }
}

fn annotation_slot<'a>(
    fresh: &'a mut HashMap<String, MatchupAnnotations>,
    record: &MatchupRecord,
) -> &'a mut MatchupAnnotations {
    fresh.entry(record.matchup_id.clone()).or_default()
}

/// Median threshold and beat-median flags for completed games.
fn annotate_medians(
    records: &[MatchupRecord],
    target_week: u32,
    fresh: &mut HashMap<String, MatchupAnnotations>,
) -> usize {
    let history = standings::median_history(&flatten(records), target_week);
    let mut marked = 0;
    for record in records.iter().filter(|m| m.week <= target_week) {
        let home = history.get(&(record.home_team_id.clone(), record.week));
        let away = history.get(&(record.away_team_id.clone(), record.week));
        if home.is_none() && away.is_none() {
            continue;
        }
        let slot = annotation_slot(fresh, record);
        slot.median_threshold = home.or(away).map(|m| m.threshold);
        slot.home_beat_median = home.map(|m| m.beat);
        slot.away_beat_median = away.map(|m| m.beat);
        marked += 1;
    }
    marked
}

/// Optimal lineup score for every completed (team, week) whose roster is
/// available. Keys whose roster fetch failed are left unannotated.
fn annotate_optimal(
    records: &[MatchupRecord],
    target_week: u32,
    cache: &RosterCache,
    lookup: &StatsLookup,
    fresh: &mut HashMap<String, MatchupAnnotations>,
) -> usize {
    let optimal_for = |team_id: &str, week: u32| {
        cache
            .snapshot(week, team_id)
            .map(|roster| best_lineup_score(&lookup.scored_players(roster, week)))
    };

    let mut scored = 0;
    for record in records.iter().filter(|m| m.week <= target_week) {
        let home = optimal_for(&record.home_team_id, record.week);
        let away = optimal_for(&record.away_team_id, record.week);
        scored += usize::from(home.is_some()) + usize::from(away.is_some());
        if home.is_none() && away.is_none() {
            continue;
        }
        let slot = annotation_slot(fresh, record);
        slot.home_optimal_score = home;
        slot.away_optimal_score = away;
    }
    scored
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Projected lineup score for every game in a week the model has predicted.
fn annotate_projections(
    records: &[MatchupRecord],
    predictions: &Predictions,
    cache: &RosterCache,
    fresh: &mut HashMap<String, MatchupAnnotations>,
) -> usize {
    let mut projected = 0;
    for record in records {
        let Some(week_preds) = predictions.for_week(record.week) else {
            continue;
        };
        let project = |team_id: &str| {
            cache
                .snapshot(record.week, team_id)
                .map(|roster| round2(projected_lineup_score(roster, week_preds)))
        };
        let home = project(&record.home_team_id);
        let away = project(&record.away_team_id);
        if home.is_none() && away.is_none() {
            continue;
        }
        let slot = annotation_slot(fresh, record);
        slot.home_projected = home;
        slot.away_projected = away;
        projected += 1;
    }
    projected
}

fn add_report(total: &mut PrefetchReport, batch: PrefetchReport) {
    total.cached += batch.cached;
    total.fetched += batch.fetched;
    total.failed += batch.failed;
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Execute one update run against `source`, reading and writing the files
/// named by `config`.
///
/// Transient source failures degrade to empty data for the failing key and
/// never abort the run. A failed stats fetch skips every stats-derived
/// output instead of scoring players as zero. An unreadable league-state document does abort it,
/// before anything is written.
pub async fn run(config: &Config, source: &dyn LeagueSource, plan: UpdatePlan) -> Result<RunSummary> {
    let plan = plan.normalized();
    let target_week = config.completed_week();
    let current_week = config.league.current_week;
    let mut summary = RunSummary::default();

    // 1. Persisted state
    let state_path = config.state_path();
    let cache_path = config.roster_cache_path();
    let mut state = LeagueState::load(&state_path)
        .with_context(|| format!("failed to load league state from {}", state_path.display()))?;
    let mut cache = RosterCache::load(&cache_path);
    info!(
        "Run starting: plan={plan:?}, completed through week {target_week}, {} persisted matchups, {} cached rosters",
        state.matchups.len(),
        cache.len()
    );

    // 2. Matchups
    let fetched = if plan.matchups {
        fetch_all_matchups(source, config.league.season_weeks, &mut summary).await
    } else {
        info!("Reusing {} persisted matchups", state.matchups.len());
        Vec::new()
    };
    let records = reconcile::merge_all(&state.matchups, &fetched);
    summary.matchups = records.len();
    if records.is_empty() {
        warn!("No matchups available; standings will be empty");
    }
    let results = flatten(&records);
    let mut fresh: HashMap<String, MatchupAnnotations> = HashMap::new();

    // 3. Standings from actual scores, median annotations
    if plan.matchups {
        for scheme in [
            Scheme::Standard,
            Scheme::Median(MedianMode::Replace),
            Scheme::Median(MedianMode::Additive),
        ] {
            let table = standings::compute(&results, target_week, scheme, &HashMap::new());
            state.standings.set(scheme, table);
        }
        summary.median_marks = annotate_medians(&records, target_week, &mut fresh);
        refresh_team_details(source, &mut state, &mut summary).await;
    }

    // 4. Rosters -> optimal scores
    let needs_stats = plan.rosters || plan.waivers;
    let stat_rows = if needs_stats { fetch_stats(source).await } else { None };
    let stat_detail = stat_rows
        .as_deref()
        .filter(|rows| !rows.is_empty())
        .map(StatDetailDocument::build);
    summary.stat_lines = stat_detail.as_ref().map(StatDetailDocument::len);

    if (plan.waivers || plan.projections) && config.cache.refetch_current_week {
        cache.invalidate_from(current_week);
    }

    if plan.rosters {
        let keys = results::team_weeks(&records, target_week);
        let report = cache.prefetch(source, &keys, config.fetch.concurrency).await;
        add_report(&mut summary.rosters, report);

        if let Some(rows) = &stat_rows {
            let lookup = StatsLookup::build(rows);
            summary.optimal_scores =
                annotate_optimal(&records, target_week, &cache, &lookup, &mut fresh);
            info!("Computed {} optimal lineup scores", summary.optimal_scores);
        }
    }

    // 5. Waivers
    if plan.waivers {
        let keys: Vec<(u32, String)> = results::team_ids(&records)
            .into_iter()
            .map(|team_id| (current_week, team_id))
            .collect();
        let report = cache.prefetch(source, &keys, config.fetch.concurrency).await;
        add_report(&mut summary.rosters, report);

        if let Some(rows) = &stat_rows {
            let rostered: HashSet<String> = keys
                .iter()
                .filter_map(|(week, team_id)| cache.snapshot(*week, team_id))
                .flat_map(|roster| roster.entries().iter().map(|e| e.player_id.clone()))
                .collect();
            let pool = waivers::available_players(rows, &rostered);
            info!(
                "Waiver pool: {} players ({} rostered in week {current_week})",
                pool.len(),
                rostered.len()
            );
            summary.waivers = Some(pool.len());
            state.waivers = pool;
        }
    }

    // 6. Projections
    if plan.projections {
        match &config.paths.predictions {
            Some(path) => match Predictions::load(path) {
                Ok(predictions) if !predictions.is_empty() => {
                    let weeks: HashSet<u32> = predictions.weeks().collect();
                    let keys: Vec<(u32, String)> = results::team_weeks(&records, u32::MAX)
                        .into_iter()
                        .filter(|(week, _)| weeks.contains(week))
                        .collect();
                    let report = cache.prefetch(source, &keys, config.fetch.concurrency).await;
                    add_report(&mut summary.rosters, report);
                    summary.projected = annotate_projections(&records, &predictions, &cache, &mut fresh);
                    info!("Projected {} matchups", summary.projected);
                }
                Ok(_) => info!("No predictions in {}; skipping projections", path.display()),
                Err(e) => warn!("Failed to load predictions from {}: {e:#}", path.display()),
            },
            None => info!("No predictions file configured; skipping projections"),
        }
    }

    // 7. Reconcile and rebuild derived tables
    let merged: Vec<MatchupRecord> = records
        .iter()
        .map(|record| match fresh.remove(&record.matchup_id) {
            Some(annotations) => reconcile::merge(
                record,
                &MatchupRecord {
                    annotations,
                    ..record.clone()
                },
            ),
            None => record.clone(),
        })
        .collect();

    let optimal = advanced::optimal_from_annotations(&merged);
    if plan.rosters && stat_rows.is_some() {
        let table = standings::compute(&results, target_week, Scheme::Optimal, &optimal);
        state.standings.set(Scheme::Optimal, table);
    }
    if plan.matchups {
        state.advanced_stats = advanced::compute(&results, target_week, &optimal);
    }

    state.matchups = merged;
    state.current_week = current_week;
    state.last_updated = Some(Utc::now());

    // 8. Persist
    state
        .save(&state_path)
        .with_context(|| format!("failed to save league state to {}", state_path.display()))?;
    cache
        .flush(&cache_path)
        .with_context(|| format!("failed to flush roster cache to {}", cache_path.display()))?;
    if let Some(detail) = &stat_detail {
        let detail_path = config.stats_detail_path();
        detail
            .save(&detail_path)
            .with_context(|| format!("failed to save stat detail to {}", detail_path.display()))?;
    }

    info!(
        "Run complete: {} matchups, rosters {:?}, {} optimal scores",
        summary.matchups, summary.rosters, summary.optimal_scores
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_means_everything() {
        let none: [&str; 0] = [];
        assert_eq!(UpdatePlan::from_args(none).unwrap(), UpdatePlan::all());
        assert_eq!(UpdatePlan::from_args(["--all"]).unwrap(), UpdatePlan::all());
    }

    #[test]
    fn dependent_steps_imply_matchups() {
        for flag in ["--rosters", "--waivers", "--projections"] {
            let plan = UpdatePlan::from_args([flag]).unwrap();
            assert!(plan.matchups, "{flag} should imply --matchups");
        }
        let plan = UpdatePlan::from_args(["--rosters"]).unwrap();
        assert!(!plan.waivers);
        assert!(!plan.projections);
    }

    #[test]
    fn matchups_alone_stays_narrow() {
        let plan = UpdatePlan::from_args(["--matchups"]).unwrap();
        assert_eq!(
            plan,
            UpdatePlan {
                matchups: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = UpdatePlan::from_args(["--stats"]).unwrap_err();
        assert!(err.to_string().contains("--stats"));
    }

    #[test]
    fn default_plan_normalizes_to_nothing() {
        assert_eq!(UpdatePlan::default().normalized(), UpdatePlan::default());
    }
}
