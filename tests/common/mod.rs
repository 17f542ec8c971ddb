//! Shared test harness: in-memory SQLite with migrations applied, plus
//! seeding helpers for routes, stops and runs.
//!
//! Compiled into each integration test binary; not every binary uses
//! every helper.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use route_server::models::{Direction, RouteStatus, ScheduleType};
use route_server::services::runs::{CreateRun, StopTimeEntry};
use route_server::services::topology;
use route_server::store;
use route_server::MIGRATOR;

pub async fn test_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    MIGRATOR.run(&pool).await.expect("failed to run migrations");
    pool
}

pub async fn seed_stop(pool: &SqlitePool, name: &str, osm_id: Option<i64>) -> i64 {
    store::stops::insert_stop(pool, name, osm_id)
        .await
        .expect("failed to insert stop")
}

pub async fn seed_route(
    pool: &SqlitePool,
    name: &str,
    num: &str,
    osm_id: Option<i64>,
    stop_ids: &[i64],
) -> i64 {
    let mut tx = pool.begin().await.expect("failed to begin transaction");
    let route_id = store::routes::insert_route(
        &mut tx,
        name,
        num,
        None,
        RouteStatus::Active,
        osm_id,
    )
    .await
    .expect("failed to insert route");
    topology::insert_ordered_stops(&mut tx, route_id, stop_ids)
        .await
        .expect("failed to insert route stops");
    tx.commit().await.expect("failed to commit");
    route_id
}

/// A route named "R" with stops A, B, C in forward order.
pub async fn seed_abc_route(pool: &SqlitePool) -> (i64, [i64; 3]) {
    let a = seed_stop(pool, "A", None).await;
    let b = seed_stop(pool, "B", None).await;
    let c = seed_stop(pool, "C", None).await;
    let route_id = seed_route(pool, "R", "12", None, &[a, b, c]).await;
    (route_id, [a, b, c])
}

pub fn regular_run(
    route_id: i64,
    direction: Direction,
    day_of_week: i32,
    start_time: NaiveTime,
    stop_times: &[(i64, i64)],
) -> CreateRun {
    CreateRun {
        route_id,
        direction,
        schedule_type: ScheduleType::Regular,
        day_of_week: Some(day_of_week),
        specific_date: None,
        start_time,
        stop_times: entries(stop_times),
    }
}

pub fn special_run(
    route_id: i64,
    direction: Direction,
    specific_date: NaiveDate,
    start_time: NaiveTime,
    stop_times: &[(i64, i64)],
) -> CreateRun {
    CreateRun {
        route_id,
        direction,
        schedule_type: ScheduleType::Special,
        day_of_week: None,
        specific_date: Some(specific_date),
        start_time,
        stop_times: entries(stop_times),
    }
}

pub fn entries(stop_times: &[(i64, i64)]) -> Vec<StopTimeEntry> {
    stop_times
        .iter()
        .map(|(stop_id, minute)| StopTimeEntry {
            stop_id: *stop_id,
            arrival_minute_from_start: *minute,
        })
        .collect()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
