//! Run creation and validation.
//!
//! A run and its stop times are created atomically through one
//! validation pipeline; both the HTTP handler and the bulk importer go
//! through [`create_run`].

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::{Direction, RunDetails, ScheduleType, Stop};
use crate::services::topology;
use crate::store;
use crate::store::runs::NewRun;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRun {
    pub route_id: i64,
    pub direction: Direction,
    pub schedule_type: ScheduleType,
    /// 1 (Monday) to 7 (Sunday); required for REGULAR, forbidden for SPECIAL.
    pub day_of_week: Option<i32>,
    /// Required for SPECIAL, forbidden for REGULAR.
    pub specific_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub stop_times: Vec<StopTimeEntry>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StopTimeEntry {
    pub stop_id: i64,
    /// Non-negative offset in minutes from the run's start time.
    pub arrival_minute_from_start: i64,
}

/// The resolved occasion a run is scheduled for.
#[derive(Clone, Copy)]
enum Occasion {
    Weekday(i32),
    Date(NaiveDate),
}

struct ValidatedRun {
    occasion: Occasion,
    destination: String,
}

pub async fn create_run(pool: &SqlitePool, req: &CreateRun) -> Result<RunDetails, AppError> {
    let ValidatedRun {
        occasion,
        destination,
    } = validate(pool, req).await?;

    let mut tx = pool.begin().await?;

    // Dense per-(route, occasion) sequence starting at 1, counted inside
    // the same transaction as the insert. A racing writer would trip the
    // runs unique constraint rather than duplicate a number.
    let existing = match occasion {
        Occasion::Weekday(day) => {
            store::runs::count_regular_runs(&mut tx, req.route_id, day).await?
        }
        Occasion::Date(date) => {
            store::runs::count_special_runs(&mut tx, req.route_id, date).await?
        }
    };
    let run_num = (existing + 1) as i32;

    if let Occasion::Date(date) = occasion {
        store::special_days::register_special_day(&mut tx, date).await?;
    }

    let run_id = store::runs::insert_run(
        &mut tx,
        &NewRun {
            route_id: req.route_id,
            direction: req.direction,
            schedule_type: req.schedule_type,
            day_of_week: req.day_of_week,
            specific_date: req.specific_date,
            run_num,
            start_time: req.start_time,
            destination_stop_name: &destination,
        },
    )
    .await?;

    for entry in &req.stop_times {
        store::runs::insert_stop_time(&mut tx, run_id, entry.stop_id, entry.arrival_minute_from_start)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        run_id,
        route_id = req.route_id,
        run_num,
        destination = %destination,
        "created run"
    );

    get_run_details(pool, run_id).await
}

async fn validate(pool: &SqlitePool, req: &CreateRun) -> Result<ValidatedRun, AppError> {
    let occasion = validate_schedule_type_constraints(req)?;

    if req.stop_times.is_empty() {
        return Err(AppError::InvalidRunData(
            "Stop times list cannot be empty".to_string(),
        ));
    }
    if req
        .stop_times
        .iter()
        .any(|st| st.arrival_minute_from_start < 0)
    {
        return Err(AppError::InvalidRunData(
            "Arrival minute must be non-negative".to_string(),
        ));
    }

    store::routes::get_route(pool, req.route_id)
        .await?
        .ok_or_else(|| AppError::InvalidRunData("Route not found".to_string()))?;

    let ordered_stop_ids = topology::ordered_stop_ids(pool, req.route_id, req.direction).await?;
    if ordered_stop_ids.is_empty() {
        return Err(AppError::InvalidRunData(
            "Route has no configured stops".to_string(),
        ));
    }

    let request_stop_ids: HashSet<i64> = req.stop_times.iter().map(|st| st.stop_id).collect();

    let stops = store::stops::stops_by_ids(
        pool,
        &request_stop_ids.iter().copied().collect::<Vec<_>>(),
    )
    .await?;
    if stops.len() != request_stop_ids.len() {
        return Err(AppError::InvalidRunData("Some stops not found".to_string()));
    }
    let stops: HashMap<i64, Stop> = stops.into_iter().map(|s| (s.id, s)).collect();

    // The request must cover the route's stop set exactly.
    let route_stop_ids: HashSet<i64> = ordered_stop_ids.iter().copied().collect();
    if route_stop_ids != request_stop_ids || req.stop_times.len() != route_stop_ids.len() {
        return Err(AppError::InvalidRunData("Incoherent stop data".to_string()));
    }

    validate_stop_time_ordering(&req.stop_times, &ordered_stop_ids)?;

    // Destination is the last stop of the direction-ordered sequence.
    let destination = ordered_stop_ids
        .last()
        .and_then(|id| stops.get(id))
        .map(|stop| stop.name.clone())
        .ok_or_else(|| AppError::InvalidRunData("Incoherent stop data".to_string()))?;

    Ok(ValidatedRun {
        occasion,
        destination,
    })
}

fn validate_schedule_type_constraints(req: &CreateRun) -> Result<Occasion, AppError> {
    match req.schedule_type {
        ScheduleType::Regular => {
            let day = req.day_of_week.ok_or_else(|| {
                AppError::InvalidRunData("Day of week required for regular schedule".to_string())
            })?;
            if !(1..=7).contains(&day) {
                return Err(AppError::InvalidRunData(
                    "Day of week must be between 1 and 7".to_string(),
                ));
            }
            if req.specific_date.is_some() {
                return Err(AppError::InvalidRunData(
                    "Specific date must be null for regular schedule".to_string(),
                ));
            }
            Ok(Occasion::Weekday(day))
        }
        ScheduleType::Special => {
            let date = req.specific_date.ok_or_else(|| {
                AppError::InvalidRunData("Specific date required for special schedule".to_string())
            })?;
            if req.day_of_week.is_some() {
                return Err(AppError::InvalidRunData(
                    "Day of week must be null for special schedule".to_string(),
                ));
            }
            Ok(Occasion::Date(date))
        }
    }
}

/// Offsets must strictly increase when stop times are ordered by the
/// stop's position along the run's direction.
fn validate_stop_time_ordering(
    stop_times: &[StopTimeEntry],
    ordered_stop_ids: &[i64],
) -> Result<(), AppError> {
    let positions: HashMap<i64, usize> = ordered_stop_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let mut sorted: Vec<&StopTimeEntry> = stop_times.iter().collect();
    sorted.sort_by_key(|st| positions[&st.stop_id]);

    for pair in sorted.windows(2) {
        if pair[1].arrival_minute_from_start <= pair[0].arrival_minute_from_start {
            return Err(AppError::InvalidRunData(
                "Incoherent stop time data".to_string(),
            ));
        }
    }
    Ok(())
}

pub async fn get_run_details(pool: &SqlitePool, id: i64) -> Result<RunDetails, AppError> {
    let run = store::runs::get_run(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Run not found".to_string()))?;
    let stop_times = store::runs::stop_times_for_run(pool, id).await?;
    Ok(RunDetails::from_rows(run, stop_times))
}

pub async fn delete_run(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    if !store::runs::delete_run(pool, id).await? {
        return Err(AppError::NotFound("Run not found".to_string()));
    }
    tracing::info!(run_id = id, "deleted run");
    Ok(())
}

pub async fn list_all_runs(pool: &SqlitePool) -> Result<Vec<RunDetails>, AppError> {
    let runs = store::runs::list_runs(pool).await?;
    with_stop_times(pool, runs).await
}

pub async fn list_runs_for_route(
    pool: &SqlitePool,
    route_id: i64,
) -> Result<Vec<RunDetails>, AppError> {
    store::routes::get_route(pool, route_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;
    let runs = store::runs::list_runs_for_route(pool, route_id).await?;
    with_stop_times(pool, runs).await
}

pub async fn list_runs_for_stop(
    pool: &SqlitePool,
    stop_id: i64,
) -> Result<Vec<RunDetails>, AppError> {
    store::stops::get_stop(pool, stop_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Stop not found".to_string()))?;
    let runs = store::runs::list_runs_for_stop(pool, stop_id).await?;
    with_stop_times(pool, runs).await
}

async fn with_stop_times(
    pool: &SqlitePool,
    runs: Vec<crate::models::RunRow>,
) -> Result<Vec<RunDetails>, AppError> {
    let mut details = Vec::with_capacity(runs.len());
    for run in runs {
        let stop_times = store::runs::stop_times_for_run(pool, run.id).await?;
        details.push(RunDetails::from_rows(run, stop_times));
    }
    Ok(details)
}
