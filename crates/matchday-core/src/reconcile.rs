// Merge freshly computed matchup records into the persisted set.
//
// A run may recompute only some annotations. Base fields (teams, scores,
// week) always come from the fresh fetch; each annotation keeps its previous
// value unless this run produced a new one. A fresh `None` never erases a
// persisted `Some`.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::results::MatchupRecord;

/// Merge one game. `fresh` supplies the base fields and any annotations it
/// carries; `previous` fills the annotations `fresh` lacks.
pub fn merge(previous: &MatchupRecord, fresh: &MatchupRecord) -> MatchupRecord {
    MatchupRecord {
        annotations: fresh.annotations.clone().or(&previous.annotations),
        ..fresh.clone()
    }
}

/// Merge whole record sets, matching games by `matchupId`.
///
/// The result holds every fresh record (merged with its previous version
/// when there is one) in fresh order, followed by previous records that the
/// fresh set does not mention. Nothing persisted is dropped.
pub fn merge_all(previous: &[MatchupRecord], fresh: &[MatchupRecord]) -> Vec<MatchupRecord> {
    let by_id: HashMap<&str, &MatchupRecord> = previous
        .iter()
        .map(|m| (m.matchup_id.as_str(), m))
        .collect();

    let mut merged = Vec::with_capacity(fresh.len().max(previous.len()));
    let mut seen: HashSet<&str> = HashSet::new();
    let mut matched = 0usize;

    for record in fresh {
        seen.insert(record.matchup_id.as_str());
        match by_id.get(record.matchup_id.as_str()) {
            Some(prev) => {
                matched += 1;
                merged.push(merge(prev, record));
            }
            None => merged.push(record.clone()),
        }
    }

    let mut retained = 0usize;
    for record in previous {
        if seen.insert(record.matchup_id.as_str()) {
            debug!("keeping persisted matchup {} absent from this run", record.matchup_id);
            retained += 1;
            merged.push(record.clone());
        }
    }

    info!(
        "reconciled matchups: {} fresh ({} merged with history), {} retained from history",
        fresh.len(),
        matched,
        retained
    );
    merged
}
