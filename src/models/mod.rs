use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Travel direction along a route's stop sequence.
///
/// `Aller` follows the topology order, `Retour` traverses it reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Direction {
    Aller,
    Retour,
}

/// Whether a run recurs weekly or happens on a single calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum ScheduleType {
    Regular,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum RouteStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Route {
    pub id: i64,
    pub name: String,
    pub num: String,
    pub description: Option<String>,
    pub status: RouteStatus,
    /// External OSM relation id, used only by the bulk importer.
    pub osm_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Stop {
    pub id: i64,
    pub name: String,
    /// External OSM node id, used only by the bulk importer.
    pub osm_id: Option<i64>,
}

/// A run row joined with its route's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct RunRow {
    pub id: i64,
    pub route_id: i64,
    pub route_num: String,
    pub route_name: String,
    pub direction: Direction,
    pub schedule_type: ScheduleType,
    pub day_of_week: Option<i32>,
    pub specific_date: Option<NaiveDate>,
    pub run_num: i32,
    pub start_time: NaiveTime,
    pub destination_stop_name: String,
}

/// A stop time row joined with its stop's name.
#[derive(Debug, Clone, FromRow)]
pub struct StopTimeRow {
    pub stop_id: i64,
    pub stop_name: String,
    pub arrival_minute_from_start: i64,
}

/// One stop time of one run serving a given stop, joined with the run
/// and route fields the per-stop window query needs.
#[derive(Debug, Clone, FromRow)]
pub struct StopArrivalRow {
    pub run_id: i64,
    pub route_num: String,
    pub route_name: String,
    pub schedule_type: ScheduleType,
    pub day_of_week: Option<i32>,
    pub specific_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub destination_stop_name: String,
    pub arrival_minute_from_start: i64,
}

/// Route with its ordered stop id list, as served over HTTP.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RouteDetails {
    pub id: i64,
    pub name: String,
    pub num: String,
    pub description: Option<String>,
    pub status: RouteStatus,
    pub osm_id: Option<i64>,
    /// Stop ids in forward (ALLER) topology order.
    pub stop_ids: Vec<i64>,
}

impl RouteDetails {
    pub fn from_route(route: Route, stop_ids: Vec<i64>) -> Self {
        Self {
            id: route.id,
            name: route.name,
            num: route.num,
            description: route.description,
            status: route.status,
            osm_id: route.osm_id,
            stop_ids,
        }
    }
}

/// Full view of one scheduled run, with per-stop times.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunDetails {
    pub id: i64,
    pub route_id: i64,
    pub route_num: String,
    pub route_name: String,
    pub direction: Direction,
    pub schedule_type: ScheduleType,
    pub day_of_week: Option<i32>,
    pub specific_date: Option<NaiveDate>,
    pub run_num: i32,
    pub start_time: NaiveTime,
    pub destination_stop_name: String,
    pub stop_times: Vec<StopTimeDetail>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StopTimeDetail {
    pub stop_id: i64,
    pub stop_name: String,
    pub arrival_minute_from_start: i64,
    /// Start time plus the offset, wrapping over midnight.
    pub actual_arrival_time: NaiveTime,
}

impl RunDetails {
    pub fn from_rows(run: RunRow, stop_times: Vec<StopTimeRow>) -> Self {
        let stop_times = stop_times
            .into_iter()
            .map(|st| {
                let (arrival, _) = run
                    .start_time
                    .overflowing_add_signed(Duration::minutes(st.arrival_minute_from_start));
                StopTimeDetail {
                    stop_id: st.stop_id,
                    stop_name: st.stop_name,
                    arrival_minute_from_start: st.arrival_minute_from_start,
                    actual_arrival_time: arrival,
                }
            })
            .collect();
        Self {
            id: run.id,
            route_id: run.route_id,
            route_num: run.route_num,
            route_name: run.route_name,
            direction: run.direction,
            schedule_type: run.schedule_type,
            day_of_week: run.day_of_week,
            specific_date: run.specific_date,
            run_num: run.run_num,
            start_time: run.start_time,
            destination_stop_name: run.destination_stop_name,
            stop_times,
        }
    }
}

/// One upcoming arrival at a stop within the next 24 hours.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpcomingArrival {
    pub run_id: i64,
    pub route_num: String,
    pub route_name: String,
    pub destination: String,
    pub arrival_time: NaiveDateTime,
}
