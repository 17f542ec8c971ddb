use chrono::{NaiveDate, NaiveTime};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::error::AppError;
use crate::models::{Direction, RunRow, ScheduleType, StopArrivalRow, StopTimeRow};

/// Run columns joined with the owning route's display fields.
const RUN_SELECT: &str = r#"
    SELECT runs.id, runs.route_id, routes.num AS route_num, routes.name AS route_name,
           runs.direction, runs.schedule_type, runs.day_of_week, runs.specific_date,
           runs.run_num, runs.start_time, runs.destination_stop_name
      FROM runs
      JOIN routes ON routes.id = runs.route_id
"#;

pub struct NewRun<'a> {
    pub route_id: i64,
    pub direction: Direction,
    pub schedule_type: ScheduleType,
    pub day_of_week: Option<i32>,
    pub specific_date: Option<NaiveDate>,
    pub run_num: i32,
    pub start_time: NaiveTime,
    pub destination_stop_name: &'a str,
}

pub async fn insert_run(
    tx: &mut Transaction<'_, Sqlite>,
    run: &NewRun<'_>,
) -> Result<i64, AppError> {
    let row = sqlx::query(
        r#"
        INSERT INTO runs (route_id, direction, schedule_type, day_of_week,
                          specific_date, run_num, start_time, destination_stop_name)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(run.route_id)
    .bind(run.direction)
    .bind(run.schedule_type)
    .bind(run.day_of_week)
    .bind(run.specific_date)
    .bind(run.run_num)
    .bind(run.start_time)
    .bind(run.destination_stop_name)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.get("id"))
}

pub async fn insert_stop_time(
    tx: &mut Transaction<'_, Sqlite>,
    run_id: i64,
    stop_id: i64,
    arrival_minute_from_start: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO stop_times (run_id, stop_id, arrival_minute_from_start) VALUES (?, ?, ?)",
    )
    .bind(run_id)
    .bind(stop_id)
    .bind(arrival_minute_from_start)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Existing runs for a (route, weekday) occasion, counted inside the
/// creation transaction so the derived run_num stays dense.
pub async fn count_regular_runs(
    tx: &mut Transaction<'_, Sqlite>,
    route_id: i64,
    day_of_week: i32,
) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM runs
          WHERE route_id = ? AND schedule_type = 'REGULAR' AND day_of_week = ?",
    )
    .bind(route_id)
    .bind(day_of_week)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

pub async fn count_special_runs(
    tx: &mut Transaction<'_, Sqlite>,
    route_id: i64,
    specific_date: NaiveDate,
) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM runs
          WHERE route_id = ? AND schedule_type = 'SPECIAL' AND specific_date = ?",
    )
    .bind(route_id)
    .bind(specific_date)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

pub async fn get_run(pool: &SqlitePool, id: i64) -> Result<Option<RunRow>, AppError> {
    let run = sqlx::query_as::<_, RunRow>(&format!("{RUN_SELECT} WHERE runs.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(run)
}

pub async fn stop_times_for_run(
    pool: &SqlitePool,
    run_id: i64,
) -> Result<Vec<StopTimeRow>, AppError> {
    let rows = sqlx::query_as::<_, StopTimeRow>(
        r#"
        SELECT st.stop_id, stops.name AS stop_name, st.arrival_minute_from_start
          FROM stop_times st
          JOIN stops ON stops.id = st.stop_id
         WHERE st.run_id = ?
         ORDER BY st.arrival_minute_from_start
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Deletes the run; its stop times cascade.
pub async fn delete_run(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM runs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_runs(pool: &SqlitePool) -> Result<Vec<RunRow>, AppError> {
    let runs = sqlx::query_as::<_, RunRow>(&format!("{RUN_SELECT} ORDER BY runs.id"))
        .fetch_all(pool)
        .await?;
    Ok(runs)
}

pub async fn list_runs_for_route(
    pool: &SqlitePool,
    route_id: i64,
) -> Result<Vec<RunRow>, AppError> {
    let runs = sqlx::query_as::<_, RunRow>(&format!(
        "{RUN_SELECT} WHERE runs.route_id = ? ORDER BY runs.id"
    ))
    .bind(route_id)
    .fetch_all(pool)
    .await?;
    Ok(runs)
}

/// Distinct runs that have a stop time at the given stop.
pub async fn list_runs_for_stop(pool: &SqlitePool, stop_id: i64) -> Result<Vec<RunRow>, AppError> {
    let runs = sqlx::query_as::<_, RunRow>(&format!(
        r#"
        {RUN_SELECT}
        WHERE runs.id IN (SELECT run_id FROM stop_times WHERE stop_id = ?)
        ORDER BY runs.id
        "#
    ))
    .bind(stop_id)
    .fetch_all(pool)
    .await?;
    Ok(runs)
}

/// REGULAR runs whose weekday is one of the given days, optionally
/// restricted to one route.
pub async fn regular_runs_on_days(
    pool: &SqlitePool,
    route_id: Option<i64>,
    days: &[i32],
) -> Result<Vec<RunRow>, AppError> {
    if days.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; days.len()].join(", ");
    let mut sql = format!(
        "{RUN_SELECT} WHERE runs.schedule_type = 'REGULAR' AND runs.day_of_week IN ({placeholders})"
    );
    if route_id.is_some() {
        sql.push_str(" AND runs.route_id = ?");
    }
    let mut query = sqlx::query_as::<_, RunRow>(&sql);
    for day in days {
        query = query.bind(*day);
    }
    if let Some(route_id) = route_id {
        query = query.bind(route_id);
    }
    Ok(query.fetch_all(pool).await?)
}

/// SPECIAL runs dated within [from, to], optionally restricted to one route.
pub async fn special_runs_between(
    pool: &SqlitePool,
    route_id: Option<i64>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RunRow>, AppError> {
    let mut sql = format!(
        "{RUN_SELECT} WHERE runs.schedule_type = 'SPECIAL' AND runs.specific_date BETWEEN ? AND ?"
    );
    if route_id.is_some() {
        sql.push_str(" AND runs.route_id = ?");
    }
    let mut query = sqlx::query_as::<_, RunRow>(&sql).bind(from).bind(to);
    if let Some(route_id) = route_id {
        query = query.bind(route_id);
    }
    Ok(query.fetch_all(pool).await?)
}

/// Idempotency probe for the bulk importer.
pub async fn regular_run_exists_at(
    pool: &SqlitePool,
    route_id: i64,
    day_of_week: i32,
    start_time: NaiveTime,
) -> Result<bool, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM runs
          WHERE route_id = ? AND schedule_type = 'REGULAR'
            AND day_of_week = ? AND start_time = ?",
    )
    .bind(route_id)
    .bind(day_of_week)
    .bind(start_time)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Every stop time referencing the stop, with the owning run and route
/// fields the per-stop window query needs.
pub async fn arrivals_for_stop(
    pool: &SqlitePool,
    stop_id: i64,
) -> Result<Vec<StopArrivalRow>, AppError> {
    let rows = sqlx::query_as::<_, StopArrivalRow>(
        r#"
        SELECT runs.id AS run_id, routes.num AS route_num, routes.name AS route_name,
               runs.schedule_type, runs.day_of_week, runs.specific_date,
               runs.start_time, runs.destination_stop_name,
               st.arrival_minute_from_start
          FROM stop_times st
          JOIN runs ON runs.id = st.run_id
          JOIN routes ON routes.id = runs.route_id
         WHERE st.stop_id = ?
        "#,
    )
    .bind(stop_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
