// Roster snapshot cache: (week, team) -> roster, fetch on miss, no expiry.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::entry::RosterSnapshot;
use crate::persist;
use crate::source::LeagueSource;

/// Outcome counts for a batch prefetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub cached: usize,
    pub fetched: usize,
    pub failed: usize,
}

/// In-memory roster cache, persisted wholesale as `week -> team_id -> roster`.
///
/// Snapshots are written once per key. A failed fetch is not cached, so the
/// next run retries it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterCache {
    weeks: BTreeMap<u32, BTreeMap<String, RosterSnapshot>>,
}

impl RosterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted cache. A missing file yields an empty cache; an
    /// unreadable one is logged and also yields an empty cache, since every
    /// entry can be refetched.
    pub fn load(path: &Path) -> Self {
        match persist::read_json::<RosterCache>(path) {
            Ok(Some(cache)) => {
                let cache = cache.normalized();
                info!(
                    "Loaded roster cache from {} ({} snapshots)",
                    path.display(),
                    cache.len()
                );
                cache
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Ignoring unreadable roster cache {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    /// Persist the entire cache, replacing the previous file.
    pub fn flush(&self, path: &Path) -> Result<()> {
        persist::write_json_atomic(path, self)?;
        debug!("Flushed {} roster snapshots to {}", self.len(), path.display());
        Ok(())
    }

    pub fn snapshot(&self, week: u32, team_id: &str) -> Option<&RosterSnapshot> {
        self.weeks.get(&week).and_then(|teams| teams.get(team_id))
    }

    pub fn contains(&self, week: u32, team_id: &str) -> bool {
        self.snapshot(week, team_id).is_some()
    }

    /// Number of cached snapshots across all weeks.
    pub fn len(&self) -> usize {
        self.weeks.values().map(|teams| teams.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a snapshot unless the key is already present. Returns whether
    /// the snapshot was stored.
    pub fn insert(&mut self, week: u32, team_id: &str, snapshot: RosterSnapshot) -> bool {
        let teams = self.weeks.entry(week).or_default();
        if teams.contains_key(team_id) {
            return false;
        }
        teams.insert(team_id.to_string(), snapshot);
        true
    }

    /// Return the cached snapshot for `(week, team_id)`, fetching it from
    /// `source` on a miss. A failed fetch is logged and returns an empty
    /// snapshot.
    pub async fn get_or_fetch(
        &mut self,
        source: &dyn LeagueSource,
        week: u32,
        team_id: &str,
    ) -> RosterSnapshot {
        if let Some(snapshot) = self.snapshot(week, team_id) {
            debug!(week, team_id, "roster cache hit");
            return snapshot.clone();
        }

        match source.fetch_roster(team_id, week).await {
            Ok(entries) => {
                let snapshot = RosterSnapshot::new(entries);
                self.insert(week, team_id, snapshot.clone());
                snapshot
            }
            Err(e) => {
                warn!("Failed to fetch roster for team {team_id}, week {week}: {e}");
                RosterSnapshot::default()
            }
        }
    }

    /// Fetch every missing key in `keys` with at most `concurrency` requests
    /// in flight. Results are stored on this task once the batch completes,
    /// so each key has a single writer.
    pub async fn prefetch(
        &mut self,
        source: &dyn LeagueSource,
        keys: &[(u32, String)],
        concurrency: usize,
    ) -> PrefetchReport {
        let unique: BTreeSet<(u32, String)> = keys.iter().cloned().collect();
        let mut report = PrefetchReport::default();

        let missing: Vec<(u32, String)> = unique
            .into_iter()
            .filter(|(week, team_id)| {
                let hit = self.contains(*week, team_id);
                if hit {
                    report.cached += 1;
                }
                !hit
            })
            .collect();

        if missing.is_empty() {
            return report;
        }
        info!(
            "Fetching {} rosters ({} already cached, concurrency {})",
            missing.len(),
            report.cached,
            concurrency.max(1)
        );

        let results: Vec<_> = stream::iter(missing)
            .map(|(week, team_id)| async move {
                let result = source.fetch_roster(&team_id, week).await;
                (week, team_id, result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        for (week, team_id, result) in results {
            match result {
                Ok(entries) => {
                    self.insert(week, &team_id, RosterSnapshot::new(entries));
                    report.fetched += 1;
                }
                Err(e) => {
                    warn!("Failed to fetch roster for team {team_id}, week {week}: {e}");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Drop every snapshot at or after `week` so the next read refetches it.
    /// Returns how many snapshots were removed.
    pub fn invalidate_from(&mut self, week: u32) -> usize {
        let stale = self.weeks.split_off(&week);
        let removed: usize = stale.values().map(|teams| teams.len()).sum();
        if removed > 0 {
            info!("Invalidated {removed} roster snapshots from week {week}");
        }
        removed
    }

    fn normalized(self) -> Self {
        let weeks = self
            .weeks
            .into_iter()
            .map(|(week, teams)| {
                let teams = teams
                    .into_iter()
                    .map(|(team_id, snap)| (team_id, snap.normalized()))
                    .collect();
                (week, teams)
            })
            .collect();
        Self { weeks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::results::MatchupRecord;
    use crate::roster::{RosterEntry, RosterStatus};
    use crate::source::SourceError;
    use crate::stats::StatRow;
    use crate::teams::TeamDirectory;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that serves a fixed unsorted roster and counts calls.
    struct CountingSource {
        calls: AtomicUsize,
        failing_teams: HashSet<String>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing_teams: HashSet::new(),
            }
        }

        fn failing(team: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing_teams: [team.to_string()].into_iter().collect(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LeagueSource for CountingSource {
        async fn fetch_matchups(&self, _week: u32) -> Result<Vec<MatchupRecord>, SourceError> {
            Ok(vec![])
        }

        async fn fetch_roster(
            &self,
            team_id: &str,
            week: u32,
        ) -> Result<Vec<RosterEntry>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_teams.contains(team_id) {
                return Err(SourceError::Transport("connection reset".into()));
            }
            Ok(vec![
                RosterEntry {
                    player_id: format!("{team_id}_fwd_{week}"),
                    position: Position::Forward,
                    status: RosterStatus::Bench,
                },
                RosterEntry {
                    player_id: format!("{team_id}_gk_{week}"),
                    position: Position::Goalkeeper,
                    status: RosterStatus::Starter,
                },
            ])
        }

        async fn fetch_raw_stats(&self) -> Result<Vec<StatRow>, SourceError> {
            Ok(vec![])
        }

        async fn fetch_team_details(&self) -> Result<TeamDirectory, SourceError> {
            Ok(TeamDirectory::new())
        }
    }

    #[tokio::test]
    async fn get_or_fetch_hits_source_once_per_key() {
        let source = CountingSource::new();
        let mut cache = RosterCache::new();

        let first = cache.get_or_fetch(&source, 3, "t1").await;
        let second = cache.get_or_fetch(&source, 3, "t1").await;

        assert_eq!(source.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(first.entries()[0].player_id, "t1_gk_3");
        assert_eq!(first.entries()[1].player_id, "t1_fwd_3");
    }

    #[tokio::test]
    async fn failed_fetch_returns_empty_and_is_not_cached() {
        let source = CountingSource::failing("bad");
        let mut cache = RosterCache::new();

        let snap = cache.get_or_fetch(&source, 1, "bad").await;
        assert!(snap.is_empty());
        assert!(!cache.contains(1, "bad"));

        // A second read retries the remote call.
        cache.get_or_fetch(&source, 1, "bad").await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn prefetch_isolates_failures_and_skips_cached_keys() {
        let source = CountingSource::failing("bad");
        let mut cache = RosterCache::new();
        cache.insert(1, "t1", RosterSnapshot::default());

        let keys = vec![
            (1, "t1".to_string()),
            (1, "t2".to_string()),
            (2, "t1".to_string()),
            (2, "bad".to_string()),
            (2, "t1".to_string()),
        ];
        let report = cache.prefetch(&source, &keys, 2).await;

        assert_eq!(
            report,
            PrefetchReport {
                cached: 1,
                fetched: 2,
                failed: 1
            }
        );
        assert_eq!(source.calls(), 3);
        assert!(cache.contains(1, "t2"));
        assert!(cache.contains(2, "t1"));
        assert!(!cache.contains(2, "bad"));
    }

    #[test]
    fn insert_is_write_once() {
        let mut cache = RosterCache::new();
        let first = RosterSnapshot::new(vec![RosterEntry {
            player_id: "a".into(),
            position: Position::Defender,
            status: RosterStatus::Starter,
        }]);
        assert!(cache.insert(1, "t1", first.clone()));
        assert!(!cache.insert(1, "t1", RosterSnapshot::default()));
        assert_eq!(cache.snapshot(1, "t1"), Some(&first));
    }

    #[test]
    fn invalidate_from_drops_current_and_later_weeks() {
        let mut cache = RosterCache::new();
        for week in 1..=4 {
            cache.insert(week, "t1", RosterSnapshot::default());
            cache.insert(week, "t2", RosterSnapshot::default());
        }

        assert_eq!(cache.invalidate_from(3), 4);
        assert!(cache.contains(2, "t2"));
        assert!(!cache.contains(3, "t1"));
        assert!(!cache.contains(4, "t2"));
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn flush_and_load_preserve_snapshots() {
        let dir = std::env::temp_dir().join("matchday_roster_cache_flush");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("roster_cache.json");

        let source = CountingSource::new();
        let mut cache = RosterCache::new();
        cache.get_or_fetch(&source, 1, "t1").await;
        cache.get_or_fetch(&source, 12, "t2").await;
        cache.flush(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["12"]["t2"][0]["id"], "t2_gk_12");

        let loaded = RosterCache::load(&path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.snapshot(1, "t1"), cache.snapshot(1, "t1"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_sorts_legacy_unsorted_snapshots() {
        let dir = std::env::temp_dir().join("matchday_roster_cache_legacy");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roster_cache.json");
        std::fs::write(
            &path,
            r#"{"5": {"t1": [
                {"id": "bench_f", "pos": "F", "status": "Bench"},
                {"id": "start_d", "pos": "D", "status": "Starter"},
                {"id": "start_g", "pos": "G", "status": "Starter"}
            ]}}"#,
        )
        .unwrap();

        let cache = RosterCache::load(&path);
        let ids: Vec<&str> = cache
            .snapshot(5, "t1")
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.player_id.as_str())
            .collect();
        assert_eq!(ids, vec!["start_g", "start_d", "bench_f"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn null_position_keeps_the_rest_of_the_cache() {
        let dir = std::env::temp_dir().join("matchday_roster_cache_null_pos");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roster_cache.json");
        std::fs::write(
            &path,
            r#"{"2": {
                "t1": [{"id": "unknown", "pos": null, "status": "Starter"}],
                "t2": [{"id": "keeper", "pos": "G", "status": "Starter"}]
            }}"#,
        )
        .unwrap();

        let cache = RosterCache::load(&path);
        assert_eq!(cache.len(), 2);
        let entry = &cache.snapshot(2, "t1").unwrap().entries()[0];
        assert_eq!(entry.position, Position::Midfielder);
        assert!(cache.contains(2, "t2"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_cache_loads_empty() {
        let dir = std::env::temp_dir().join("matchday_roster_cache_corrupt");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roster_cache.json");
        std::fs::write(&path, "[[[").unwrap();

        assert!(RosterCache::load(&path).is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
