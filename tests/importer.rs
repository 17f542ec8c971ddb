mod common;

use std::io::Write;

use common::*;

use route_server::import::{self, ImportError};
use route_server::models::Direction;
use route_server::store;
use sqlx::SqlitePool;
use tempfile::NamedTempFile;

fn schedule_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(json.as_bytes()).expect("write schedule");
    file
}

/// Route osm 100 over three stops with osm ids 1, 2, 3.
async fn seed_osm_route(pool: &SqlitePool) -> i64 {
    let a = seed_stop(pool, "A", Some(1)).await;
    let b = seed_stop(pool, "B", Some(2)).await;
    let c = seed_stop(pool, "C", Some(3)).await;
    seed_route(pool, "R", "12", Some(100), &[a, b, c]).await
}

const BASIC_TIMETABLE: &str = r#"{
    "routes": {
        "100": {
            "operating_hours": "06:00-07:00",
            "frequency_minutes": 30,
            "to": "C",
            "stops": [
                {"id": 1, "arrival_time_from_start_minutes": 0},
                {"id": 2, "arrival_time_from_start_minutes": 10},
                {"id": 3, "arrival_time_from_start_minutes": 25}
            ]
        }
    }
}"#;

#[tokio::test]
async fn imports_departures_for_every_weekday() {
    let pool = test_pool().await;
    let route_id = seed_osm_route(&pool).await;
    let file = schedule_file(BASIC_TIMETABLE);

    let summary = import::import_schedules(&pool, file.path()).await.unwrap();
    // 06:00, 06:30 and 07:00 on each of the seven weekdays.
    assert_eq!(summary.runs_created, 21);
    assert_eq!(summary.runs_existing, 0);
    assert_eq!(summary.runs_failed, 0);
    assert_eq!(summary.routes_skipped, 0);

    let runs = store::runs::list_runs_for_route(&pool, route_id)
        .await
        .unwrap();
    assert_eq!(runs.len(), 21);
    for run in &runs {
        assert_eq!(run.direction, Direction::Aller);
        assert!(run.day_of_week.is_some());
    }
    // Three departures per weekday, numbered densely within each day.
    let monday: Vec<i32> = runs
        .iter()
        .filter(|r| r.day_of_week == Some(1))
        .map(|r| r.run_num)
        .collect();
    assert_eq!(monday.len(), 3);
    assert!(monday.contains(&1) && monday.contains(&2) && monday.contains(&3));
}

#[tokio::test]
async fn reimport_leaves_existing_runs_untouched() {
    let pool = test_pool().await;
    let route_id = seed_osm_route(&pool).await;
    let file = schedule_file(BASIC_TIMETABLE);

    import::import_schedules(&pool, file.path()).await.unwrap();
    let summary = import::import_schedules(&pool, file.path()).await.unwrap();
    assert_eq!(summary.runs_created, 0);
    assert_eq!(summary.runs_existing, 21);
    assert_eq!(summary.runs_failed, 0);

    let runs = store::runs::list_runs_for_route(&pool, route_id)
        .await
        .unwrap();
    assert_eq!(runs.len(), 21);
}

#[tokio::test]
async fn skips_routes_the_database_does_not_know() {
    let pool = test_pool().await;
    seed_osm_route(&pool).await;
    let file = schedule_file(
        r#"{
            "routes": {
                "999": {
                    "operating_hours": "06:00-07:00",
                    "frequency_minutes": 30,
                    "stops": [{"id": 1, "arrival_time_from_start_minutes": 0}]
                },
                "not-a-number": {
                    "operating_hours": "06:00-07:00",
                    "frequency_minutes": 30,
                    "stops": []
                }
            }
        }"#,
    );

    let summary = import::import_schedules(&pool, file.path()).await.unwrap();
    assert_eq!(summary.routes_skipped, 2);
    assert_eq!(summary.runs_created, 0);
    assert_eq!(summary.runs_failed, 0);
}

#[tokio::test]
async fn unknown_stop_fails_departures_without_aborting_the_batch() {
    let pool = test_pool().await;
    seed_osm_route(&pool).await;
    // Stop osm 42 does not exist; dropping it leaves the departure's stop
    // set short of the route topology, so every departure is rejected.
    let file = schedule_file(
        r#"{
            "routes": {
                "100": {
                    "operating_hours": "06:00-07:00",
                    "frequency_minutes": 30,
                    "stops": [
                        {"id": 1, "arrival_time_from_start_minutes": 0},
                        {"id": 42, "arrival_time_from_start_minutes": 10},
                        {"id": 3, "arrival_time_from_start_minutes": 25}
                    ]
                }
            }
        }"#,
    );

    let summary = import::import_schedules(&pool, file.path()).await.unwrap();
    assert_eq!(summary.runs_created, 0);
    assert_eq!(summary.runs_failed, 21);
    assert_eq!(summary.routes_skipped, 0);
}

#[tokio::test]
async fn skips_routes_with_unusable_service_windows() {
    let pool = test_pool().await;
    seed_osm_route(&pool).await;
    let file = schedule_file(
        r#"{
            "routes": {
                "100": {
                    "operating_hours": "whenever",
                    "frequency_minutes": 30,
                    "stops": []
                }
            }
        }"#,
    );
    let summary = import::import_schedules(&pool, file.path()).await.unwrap();
    assert_eq!(summary.routes_skipped, 1);
    assert_eq!(summary.runs_created, 0);
}

#[tokio::test]
async fn skips_routes_with_non_positive_frequency() {
    let pool = test_pool().await;
    seed_osm_route(&pool).await;
    let file = schedule_file(
        r#"{
            "routes": {
                "100": {
                    "operating_hours": "06:00-07:00",
                    "frequency_minutes": 0,
                    "stops": []
                }
            }
        }"#,
    );
    let summary = import::import_schedules(&pool, file.path()).await.unwrap();
    assert_eq!(summary.routes_skipped, 1);
    assert_eq!(summary.runs_created, 0);
}

#[tokio::test]
async fn departure_stepping_stops_at_midnight() {
    let pool = test_pool().await;
    let route_id = seed_osm_route(&pool).await;
    // 23:00 and 23:40 fit; the next step would cross midnight.
    let file = schedule_file(
        r#"{
            "routes": {
                "100": {
                    "operating_hours": "23:00-23:59",
                    "frequency_minutes": 40,
                    "stops": [
                        {"id": 1, "arrival_time_from_start_minutes": 0},
                        {"id": 2, "arrival_time_from_start_minutes": 10},
                        {"id": 3, "arrival_time_from_start_minutes": 25}
                    ]
                }
            }
        }"#,
    );

    let summary = import::import_schedules(&pool, file.path()).await.unwrap();
    assert_eq!(summary.runs_created, 14);

    let runs = store::runs::list_runs_for_route(&pool, route_id)
        .await
        .unwrap();
    let times: Vec<_> = runs
        .iter()
        .filter(|r| r.day_of_week == Some(1))
        .map(|r| r.start_time)
        .collect();
    assert_eq!(times.len(), 2);
    assert!(times.contains(&time(23, 0)));
    assert!(times.contains(&time(23, 40)));
}

#[tokio::test]
async fn malformed_document_is_a_parse_error() {
    let pool = test_pool().await;
    let file = schedule_file("{ not json");
    let err = import::import_schedules(&pool, file.path())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Parse(_)));
}
