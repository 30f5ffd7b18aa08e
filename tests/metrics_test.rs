//! Unit tests for metrics.rs module

use std::time::Duration;

use disaster_response::metrics::MetricsCollector;

#[test]
fn test_metrics_collector_default_names() {
    let collector = MetricsCollector::default();
    assert_eq!(collector.rows_persisted_total, "disaster_pipeline_rows_persisted_total");
    assert_eq!(collector.candidates_evaluated_total, "disaster_pipeline_candidates_evaluated_total");
    assert_eq!(collector.stage_duration, "disaster_pipeline_stage_duration_seconds");
}

#[test]
fn test_metric_names_are_prefixed() {
    let collector = MetricsCollector::default();
    let names = [
        collector.rows_loaded_total,
        collector.rows_dropped_total,
        collector.rows_persisted_total,
        collector.category_columns,
        collector.candidates_evaluated_total,
        collector.candidate_score,
        collector.candidate_duration,
        collector.label_f1,
        collector.stage_duration,
        collector.errors_total,
    ];
    assert!(names.iter().all(|n| n.starts_with("disaster_pipeline_")));
}

#[test]
fn test_record_stage_and_cleaning() {
    let collector = MetricsCollector::default();
    collector.record_stage("load", Duration::from_millis(120));
    collector.record_cleaning(3, 36);
    collector.record_rows_persisted(26_000);
}
