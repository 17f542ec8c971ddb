//! Bulk schedule importer.
//!
//! Reads a timetable document keyed by external route id and derives
//! recurring REGULAR runs from each route's operating-hours window and
//! headway. Runs once at startup, single-threaded; every failure is
//! per-item (route, day or stop), logged and skipped, so the import can
//! be re-run against a growing timetable.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Duration, NaiveTime};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::models::{Direction, ScheduleType};
use crate::services::runs::{self, CreateRun, StopTimeEntry};
use crate::store;

#[derive(Debug, Deserialize)]
struct ScheduleDocument {
    #[serde(default)]
    routes: HashMap<String, RouteTimetable>,
}

#[derive(Debug, Deserialize)]
struct RouteTimetable {
    /// "HH:MM-HH:MM" first to last departure, same-day.
    operating_hours: Option<String>,
    frequency_minutes: Option<i64>,
    /// Destination label, echoed in logs only; the created runs derive
    /// their destination from the route topology.
    to: Option<String>,
    #[serde(default)]
    stops: Vec<TimetableStop>,
}

#[derive(Debug, Deserialize)]
struct TimetableStop {
    /// External OSM id of the stop.
    id: i64,
    arrival_time_from_start_minutes: i64,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub runs_created: u64,
    pub runs_existing: u64,
    pub runs_failed: u64,
    pub routes_skipped: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read schedule file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse schedule file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Imports the timetable document at `path`. Idempotent: departures for
/// which a matching REGULAR run already exists are left untouched.
pub async fn import_schedules(
    pool: &SqlitePool,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let content = std::fs::read_to_string(path)?;
    let document: ScheduleDocument = serde_json::from_str(&content)?;

    let mut summary = ImportSummary::default();
    for (key, timetable) in &document.routes {
        import_route(pool, key, timetable, &mut summary).await;
    }

    info!(
        created = summary.runs_created,
        existing = summary.runs_existing,
        failed = summary.runs_failed,
        routes_skipped = summary.routes_skipped,
        "schedule import finished"
    );
    Ok(summary)
}

async fn import_route(
    pool: &SqlitePool,
    key: &str,
    timetable: &RouteTimetable,
    summary: &mut ImportSummary,
) {
    let Ok(osm_id) = key.parse::<i64>() else {
        warn!(key, "schedule route key is not a number, skipping");
        summary.routes_skipped += 1;
        return;
    };

    let route = match store::routes::find_route_by_osm_id(pool, osm_id).await {
        Ok(Some(route)) => route,
        Ok(None) => {
            warn!(osm_id, "no route with this osm id, skipping its schedule");
            summary.routes_skipped += 1;
            return;
        }
        Err(e) => {
            warn!(osm_id, error = %e, "route lookup failed, skipping its schedule");
            summary.routes_skipped += 1;
            return;
        }
    };

    let Some((first_departure, last_departure)) = timetable
        .operating_hours
        .as_deref()
        .and_then(parse_operating_hours)
    else {
        warn!(osm_id, hours = ?timetable.operating_hours, "missing or malformed operating_hours, skipping");
        summary.routes_skipped += 1;
        return;
    };

    let headway = timetable.frequency_minutes.unwrap_or(0);
    if headway <= 0 {
        warn!(osm_id, headway, "non-positive frequency_minutes, skipping");
        summary.routes_skipped += 1;
        return;
    }

    let stop_times = resolve_stop_times(pool, osm_id, &timetable.stops).await;
    info!(
        osm_id,
        route_id = route.id,
        to = timetable.to.as_deref().unwrap_or("?"),
        stops = stop_times.len(),
        "importing schedule for route"
    );

    for day in 1..=7 {
        let mut departure = first_departure;
        while departure <= last_departure {
            import_departure(pool, route.id, day, departure, &stop_times, summary).await;

            // Same-day windows only: stop once the clock would wrap past
            // midnight, which also keeps degenerate input from looping.
            let (next, wrapped) =
                departure.overflowing_add_signed(Duration::minutes(headway));
            if wrapped != 0 || next <= departure {
                break;
            }
            departure = next;
        }
    }
}

async fn import_departure(
    pool: &SqlitePool,
    route_id: i64,
    day: i32,
    departure: NaiveTime,
    stop_times: &[StopTimeEntry],
    summary: &mut ImportSummary,
) {
    match store::runs::regular_run_exists_at(pool, route_id, day, departure).await {
        Ok(true) => {
            summary.runs_existing += 1;
            return;
        }
        Ok(false) => {}
        Err(e) => {
            warn!(route_id, day, %departure, error = %e, "existence check failed, skipping departure");
            summary.runs_failed += 1;
            return;
        }
    }

    let request = CreateRun {
        route_id,
        direction: Direction::Aller,
        schedule_type: ScheduleType::Regular,
        day_of_week: Some(day),
        specific_date: None,
        start_time: departure,
        stop_times: stop_times.to_vec(),
    };
    match runs::create_run(pool, &request).await {
        Ok(run) => {
            summary.runs_created += 1;
            tracing::debug!(run_id = run.id, route_id, day, %departure, "imported run");
        }
        Err(e) => {
            warn!(route_id, day, %departure, error = %e, "run creation failed, skipping departure");
            summary.runs_failed += 1;
        }
    }
}

/// Resolves each timetable stop's external id to an internal stop,
/// dropping (with a log line) any stop the database does not know.
async fn resolve_stop_times(
    pool: &SqlitePool,
    route_osm_id: i64,
    stops: &[TimetableStop],
) -> Vec<StopTimeEntry> {
    let mut entries = Vec::with_capacity(stops.len());
    for stop in stops {
        match store::stops::find_stop_by_osm_id(pool, stop.id).await {
            Ok(Some(resolved)) => entries.push(StopTimeEntry {
                stop_id: resolved.id,
                arrival_minute_from_start: stop.arrival_time_from_start_minutes,
            }),
            Ok(None) => {
                warn!(
                    route_osm_id,
                    stop_osm_id = stop.id,
                    "stop not found in database, dropping its stop time"
                );
            }
            Err(e) => {
                warn!(route_osm_id, stop_osm_id = stop.id, error = %e, "stop lookup failed, dropping its stop time");
            }
        }
    }
    entries
}

/// Parses "HH:MM-HH:MM" (seconds tolerated) into (first, last) departure.
fn parse_operating_hours(hours: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (first, last) = hours.split_once('-')?;
    Some((parse_time(first.trim())?, parse_time(last.trim())?))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operating_hours() {
        let (first, last) = parse_operating_hours("06:00-22:30").unwrap();
        assert_eq!(first, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(last, NaiveTime::from_hms_opt(22, 30, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_operating_hours() {
        assert!(parse_operating_hours("06:00").is_none());
        assert!(parse_operating_hours("six-seven").is_none());
        assert!(parse_operating_hours("06:00-25:99").is_none());
    }
}
