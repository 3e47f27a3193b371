// tests/datalayer_queries.rs

mod common;
use crate::common::{AlgorithmBuilder, RegistrationBuilder, TestResult, key, window_at};

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use orca::datalayer::{Datalayer, ExecutionRecord, MemoryDatalayer, ResultQuery, WindowQuery};
use orca::model::{AlgorithmResult, ResultValue, TaskOutcome, WindowTypeKey};
use orca::types::{ExecutionId, ExecutionStatus};

#[tokio::test]
async fn windows_filter_by_overlap_type_and_metadata() -> TestResult {
    let dl = MemoryDatalayer::new();
    let jan1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut plant_a = window_at("daily", "1", jan1, Duration::days(1));
    plant_a.metadata.insert("site".to_string(), json!("plant-a"));
    let mut plant_b = window_at("daily", "1", jan1 + Duration::days(1), Duration::days(1));
    plant_b.metadata.insert("site".to_string(), json!("plant-b"));
    let hourly = window_at("hourly", "1", jan1 + Duration::hours(3), Duration::hours(1));

    dl.emit_window(plant_a.clone()).await?;
    dl.emit_window(plant_b.clone()).await?;
    dl.emit_window(hourly.clone()).await?;

    // Whole of Jan 1: plant-a's daily window and the hourly one.
    let jan1_only = dl
        .windows(WindowQuery::between(jan1, jan1 + Duration::days(1)))
        .await?;
    assert_eq!(jan1_only, vec![plant_a.clone(), hourly.clone()]);

    // Ranges are half-open: a query ending where a window starts misses it.
    let touching = dl
        .windows(WindowQuery::between(jan1 - Duration::days(1), jan1))
        .await?;
    assert!(touching.is_empty());

    let mut by_type = WindowQuery::between(jan1, jan1 + Duration::days(7));
    by_type.window_type = Some(WindowTypeKey::new("daily", "1"));
    assert_eq!(dl.windows(by_type.clone()).await?.len(), 2);

    let mut by_site = by_type;
    by_site.metadata.insert("site".to_string(), json!("plant-b"));
    assert_eq!(dl.windows(by_site).await?, vec![plant_b]);

    Ok(())
}

#[tokio::test]
async fn catalog_views_are_derived_from_processors() -> TestResult {
    let dl = MemoryDatalayer::new();

    dl.create_processor(
        RegistrationBuilder::new("P1")
            .algorithm(AlgorithmBuilder::new("A"))
            .algorithm(AlgorithmBuilder::new("H").window_type("hourly", "1"))
            .build(),
    )
    .await?;
    dl.create_processor(
        RegistrationBuilder::new("P2")
            .algorithm(AlgorithmBuilder::new("B").depends_on("A", "P1"))
            .build(),
    )
    .await?;

    let types: Vec<String> = dl
        .window_types()
        .await?
        .iter()
        .map(|wt| wt.key().to_string())
        .collect();
    assert_eq!(types, vec!["daily@1", "hourly@1"]);

    let algorithms: Vec<_> = dl.algorithms().await?.iter().map(|a| a.key()).collect();
    assert_eq!(algorithms, vec![key("A"), key("B"), key("H")]);

    // Storing a processor again replaces it.
    dl.create_processor(RegistrationBuilder::new("P2").build()).await?;
    assert_eq!(dl.processors().await?.len(), 2);
    assert_eq!(dl.algorithms().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn results_filter_by_algorithm_type_and_time() -> TestResult {
    let dl = MemoryDatalayer::new();
    let jan1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for (day, exec) in [(0, 1), (5, 2)] {
        let window = window_at("daily", "1", jan1 + Duration::days(day), Duration::days(1));
        dl.record_results(ExecutionRecord {
            exec_id: ExecutionId(exec),
            window: Arc::new(window),
            status: ExecutionStatus::Completed,
            results: vec![
                AlgorithmResult {
                    algorithm: key("A"),
                    outcome: TaskOutcome::succeeded(ResultValue::Scalar(day as f64)),
                },
                AlgorithmResult {
                    algorithm: key("B"),
                    outcome: TaskOutcome::succeeded(ResultValue::Scalar(0.0)),
                },
            ],
        })
        .await?;
    }

    assert_eq!(dl.results(ResultQuery::default()).await?.len(), 4);

    let a_in_first_week = dl
        .results(ResultQuery {
            algorithm: Some(key("A")),
            time_from: Some(jan1 + Duration::days(3)),
            time_to: Some(jan1 + Duration::days(7)),
            ..ResultQuery::default()
        })
        .await?;
    assert_eq!(a_in_first_week.len(), 1);
    assert_eq!(a_in_first_week[0].exec_id, ExecutionId(2));
    assert_eq!(
        a_in_first_week[0].result.outcome.value,
        ResultValue::Scalar(5.0)
    );

    let hourly = dl
        .results(ResultQuery {
            window_type: Some(WindowTypeKey::new("hourly", "1")),
            ..ResultQuery::default()
        })
        .await?;
    assert!(hourly.is_empty());
    Ok(())
}
