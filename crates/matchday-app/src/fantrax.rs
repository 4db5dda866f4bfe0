// League source backed by the Fantrax JSON request endpoint.
//
// Every call is a POST of `{"msgs": [{"method", "data"}]}` and the payload
// comes back under `responses[0].data`. The season schedule arrives in one
// response covering every week, so it is fetched once per run and sliced by
// week. Team names, managers and logos come from the Classic standings view.
// Player stats come from the CSV export configured in `paths.stats_csv`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use matchday_core::config::Config;
use matchday_core::position::Position;
use matchday_core::results::MatchupRecord;
use matchday_core::roster::{RosterEntry, RosterStatus};
use matchday_core::source::{LeagueSource, SourceError};
use matchday_core::stats::{self, StatRow};
use matchday_core::teams::{TeamDetails, TeamDirectory};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const FANTRAX_API_URL: &str = "https://www.fantrax.com/fxpa/req";

// ---------------------------------------------------------------------------
// FantraxSource
// ---------------------------------------------------------------------------

pub struct FantraxSource {
    http: reqwest::Client,
    league_id: String,
    session_cookie: Option<String>,
    stats_csv: PathBuf,
    schedule: OnceCell<Vec<MatchupRecord>>,
}

impl FantraxSource {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            league_id: config.league.league_id.clone(),
            session_cookie: config.credentials.session_cookie.clone(),
            stats_csv: config.paths.stats_csv.clone(),
            schedule: OnceCell::new(),
        })
    }

    /// Issue one request and return its `data` payload.
    async fn request(&self, method: &str, mut data: Value) -> Result<Value, SourceError> {
        if let Value::Object(map) = &mut data {
            map.insert("leagueId".into(), Value::String(self.league_id.clone()));
        }
        debug!("Fantrax request: {method} {data}");
        let body = json!({ "msgs": [{ "method": method, "data": data }] });

        let mut request = self
            .http
            .post(FANTRAX_API_URL)
            .query(&[("leagueId", self.league_id.as_str())])
            .json(&body);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut envelope: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("{method}: {e}")))?;
        envelope
            .pointer_mut("/responses/0/data")
            .map(Value::take)
            .ok_or_else(|| SourceError::Malformed(format!("{method}: response has no data")))
    }

    async fn schedule(&self) -> Result<&[MatchupRecord], SourceError> {
        let records = self
            .schedule
            .get_or_try_init(|| async {
                let data = self
                    .request("getStandings", json!({ "view": "SCHEDULE" }))
                    .await?;
                parse_schedule(&data)
            })
            .await?;
        Ok(records)
    }
}

#[async_trait]
impl LeagueSource for FantraxSource {
    async fn fetch_matchups(&self, week: u32) -> Result<Vec<MatchupRecord>, SourceError> {
        Ok(self
            .schedule()
            .await?
            .iter()
            .filter(|m| m.week == week)
            .cloned()
            .collect())
    }

    async fn fetch_roster(&self, team_id: &str, week: u32) -> Result<Vec<RosterEntry>, SourceError> {
        let data = self
            .request(
                "getTeamRosterInfo",
                json!({ "teamId": team_id, "period": week.to_string() }),
            )
            .await?;
        Ok(parse_roster(&data))
    }

    async fn fetch_raw_stats(&self) -> Result<Vec<StatRow>, SourceError> {
        let path = self.stats_csv.clone();
        tokio::task::spawn_blocking(move || stats::load_stats_csv(&path))
            .await
            .map_err(|e| SourceError::Transport(format!("stats loader task failed: {e}")))?
    }

    async fn fetch_team_details(&self) -> Result<TeamDirectory, SourceError> {
        let data = self
            .request("getStandings", json!({ "view": "Classic" }))
            .await?;
        parse_team_details(&data)
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Scalar JSON value as text. Ids arrive as strings or numbers.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Score cell content. Unplayed games show placeholders like "-".
fn safe_float(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn rows_of<'a>(table: &'a Value) -> &'a [Value] {
    table
        .get("rows")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The SCHEDULE view: one table per week, in week order. Each row's cells
/// are home team, home score, away team, away score.
pub fn parse_schedule(data: &Value) -> Result<Vec<MatchupRecord>, SourceError> {
    let tables = data
        .get("tableList")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Malformed("schedule has no tableList".into()))?;

    let mut records = Vec::new();
    for (index, table) in tables.iter().enumerate() {
        let week = index as u32 + 1;
        for row in rows_of(table) {
            let cells = match row.get("cells").and_then(Value::as_array) {
                Some(cells) if cells.len() >= 4 => cells,
                _ => {
                    warn!("Skipping schedule row in week {week} with missing cells");
                    continue;
                }
            };
            let home_id = scalar_text(cells[0].get("teamId")).unwrap_or_default();
            let away_id = scalar_text(cells[2].get("teamId")).unwrap_or_default();
            if home_id.is_empty() || away_id.is_empty() {
                warn!("Skipping schedule row in week {week} without team ids");
                continue;
            }
            records.push(MatchupRecord::new(
                week,
                scalar_text(cells[0].get("content")).unwrap_or_default(),
                home_id,
                safe_float(cells[1].get("content")),
                scalar_text(cells[2].get("content")).unwrap_or_default(),
                away_id,
                safe_float(cells[3].get("content")),
            ));
        }
    }
    Ok(records)
}

/// The Classic standings view carries `fantasyTeamInfo`, keyed by team id.
/// Managers are identified by the team's short name.
pub fn parse_team_details(data: &Value) -> Result<TeamDirectory, SourceError> {
    let info = data
        .get("fantasyTeamInfo")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::Malformed("standings have no fantasyTeamInfo".into()))?;

    Ok(info
        .iter()
        .map(|(team_id, team)| {
            let text = |key: &str, fallback: &str| {
                scalar_text(team.get(key)).unwrap_or_else(|| fallback.to_string())
            };
            let details = TeamDetails {
                team: text("name", "Unknown"),
                manager: text("shortName", "Unknown"),
                logo: text("logoUrl512", ""),
            };
            (team_id.clone(), details)
        })
        .collect())
}

/// Roster tables: each row has a `scorer` with id and position codes, plus
/// a lineup `statusId` (1 is a starter). Rows without a player are skipped.
pub fn parse_roster(data: &Value) -> Vec<RosterEntry> {
    let tables = data
        .get("tables")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    tables
        .iter()
        .flat_map(rows_of)
        .filter_map(|row| {
            let scorer = row.get("scorer")?;
            let player_id = scalar_text(scorer.get("scorerId")).filter(|id| !id.is_empty())?;
            let position = scalar_text(scorer.get("posShortNames"))
                .map(|p| Position::parse_or_fallback(&p))
                .unwrap_or(Position::FALLBACK);
            let status = scalar_text(row.get("statusId"))
                .map(|s| RosterStatus::from_status_id(&s))
                .unwrap_or(RosterStatus::Starter);
            Some(RosterEntry {
                player_id,
                position,
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(content: Value, team_id: Option<&str>) -> Value {
        match team_id {
            Some(id) => json!({ "content": content, "teamId": id }),
            None => json!({ "content": content }),
        }
    }

    fn game(home: (&str, &str), hs: Value, away: (&str, &str), aws: Value) -> Value {
        json!({ "cells": [
            cell(json!(home.0), Some(home.1)),
            cell(hs, None),
            cell(json!(away.0), Some(away.1)),
            cell(aws, None),
        ]})
    }

    // -----------------------------------------------------------------------
    // Schedule
    // -----------------------------------------------------------------------

    #[test]
    fn schedule_tables_map_to_weeks() {
        let data = json!({ "tableList": [
            { "rows": [
                game(("Lions", "a1"), json!("42.5"), ("Tigers", "b2"), json!(38)),
            ]},
            { "rows": [
                game(("Tigers", "b2"), json!("-"), ("Lions", "a1"), json!("")),
            ]},
        ]});

        let records = parse_schedule(&data).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.matchup_id, "1_a1_b2");
        assert_eq!(first.home_team, "Lions");
        assert_eq!(first.home_score, 42.5);
        assert_eq!(first.away_score, 38.0);

        let second = &records[1];
        assert_eq!(second.week, 2);
        assert_eq!(second.home_team_id, "b2");
        assert_eq!(second.home_score, 0.0);
        assert_eq!(second.away_score, 0.0);
    }

    #[test]
    fn schedule_skips_incomplete_rows() {
        let data = json!({ "tableList": [
            { "rows": [
                { "cells": [ cell(json!("Lions"), Some("a1")) ] },
                { "other": true },
                game(("Lions", ""), json!(1), ("Tigers", "b2"), json!(2)),
                game(("Bears", "c3"), json!(1), ("Wolves", "d4"), json!(2)),
            ]},
            {},
        ]});
        let records = parse_schedule(&data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].matchup_id, "1_c3_d4");
    }

    #[test]
    fn schedule_without_table_list_is_malformed() {
        let err = parse_schedule(&json!({ "error": "nope" })).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    // -----------------------------------------------------------------------
    // Rosters
    // -----------------------------------------------------------------------

    #[test]
    fn roster_rows_parse_ids_positions_and_status() {
        let data = json!({ "tables": [
            { "rows": [
                { "scorer": { "scorerId": "06v07", "posShortNames": "F" }, "statusId": "1" },
                { "scorer": { "scorerId": 1234, "posShortNames": "D,M" }, "statusId": 2 },
                { "scorer": { "scorerId": "x9", "posShortNames": "WB" }, "statusId": "1" },
            ]},
            { "rows": [
                { "scorer": { "scorerId": "g1" } },
                { "scorer": { "scorerId": "" }, "statusId": "1" },
                { "statusId": "1" },
            ]},
        ]});

        let entries = parse_roster(&data);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].player_id, "06v07");
        assert_eq!(entries[0].position, Position::Forward);
        assert_eq!(entries[0].status, RosterStatus::Starter);

        assert_eq!(entries[1].player_id, "1234");
        assert_eq!(entries[1].position, Position::Defender);
        assert_eq!(entries[1].status, RosterStatus::Bench);

        assert_eq!(entries[2].position, Position::FALLBACK);
        assert_eq!(entries[3].position, Position::FALLBACK);
        assert_eq!(entries[3].status, RosterStatus::Starter);
    }

    #[test]
    fn roster_without_tables_is_empty() {
        assert!(parse_roster(&json!({})).is_empty());
        assert!(parse_roster(&json!({ "tables": "none" })).is_empty());
    }

    // -----------------------------------------------------------------------
    // Team details
    // -----------------------------------------------------------------------

    #[test]
    fn team_details_read_name_manager_and_logo() {
        let data = json!({ "fantasyTeamInfo": {
            "a1": { "name": "Lions", "shortName": "leo", "logoUrl512": "https://img/a1.png" },
            "b2": { "name": "Tigers" },
        }});

        let details = parse_team_details(&data).unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details["a1"].team, "Lions");
        assert_eq!(details["a1"].manager, "leo");
        assert_eq!(details["a1"].logo, "https://img/a1.png");
        assert_eq!(details["b2"].manager, "Unknown");
        assert_eq!(details["b2"].logo, "");
    }

    #[test]
    fn standings_without_team_info_are_malformed() {
        let err = parse_team_details(&json!({ "tableList": [] })).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn safe_float_handles_placeholders() {
        assert_eq!(safe_float(Some(&json!("12.25"))), 12.25);
        assert_eq!(safe_float(Some(&json!(7))), 7.0);
        assert_eq!(safe_float(Some(&json!("-"))), 0.0);
        assert_eq!(safe_float(Some(&Value::Null)), 0.0);
        assert_eq!(safe_float(None), 0.0);
    }
}
