use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Metrics collection and management
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    // ETL metrics
    pub rows_loaded_total: &'static str,
    pub rows_dropped_total: &'static str,
    pub rows_persisted_total: &'static str,
    pub category_columns: &'static str,

    // Training metrics
    pub candidates_evaluated_total: &'static str,
    pub candidate_score: &'static str,
    pub candidate_duration: &'static str,
    pub label_f1: &'static str,

    // Stage metrics
    pub stage_duration: &'static str,
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            rows_loaded_total: "disaster_pipeline_rows_loaded_total",
            rows_dropped_total: "disaster_pipeline_rows_dropped_total",
            rows_persisted_total: "disaster_pipeline_rows_persisted_total",
            category_columns: "disaster_pipeline_category_columns",

            candidates_evaluated_total: "disaster_pipeline_candidates_evaluated_total",
            candidate_score: "disaster_pipeline_candidate_score",
            candidate_duration: "disaster_pipeline_candidate_duration_seconds",
            label_f1: "disaster_pipeline_label_f1",

            stage_duration: "disaster_pipeline_stage_duration_seconds",
            errors_total: "disaster_pipeline_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Record rows read from the raw inputs
    pub fn record_rows_loaded(&self, count: usize) {
        counter!(self.rows_loaded_total).increment(count as u64);
    }

    /// Record the outcome of cleaning: rows removed and columns derived
    pub fn record_cleaning(&self, dropped: usize, category_columns: usize) {
        counter!(self.rows_dropped_total).increment(dropped as u64);
        gauge!(self.category_columns).set(category_columns as f64);
    }

    /// Record rows written to the database
    pub fn record_rows_persisted(&self, count: usize) {
        counter!(self.rows_persisted_total).increment(count as u64);
    }

    /// Record one cross-validated grid candidate
    pub fn record_candidate(&self, score: f64, duration: Duration) {
        counter!(self.candidates_evaluated_total).increment(1);
        histogram!(self.candidate_score).record(score);
        histogram!(self.candidate_duration).record(duration.as_secs_f64());
    }

    /// Record held-out F1 for a label
    pub fn record_label_f1(&self, label: &str, f1: f64) {
        gauge!(self.label_f1, "label" => label.to_string()).set(f1);
    }

    /// Record the duration of a pipeline stage
    pub fn record_stage(&self, stage: &'static str, duration: Duration) {
        histogram!(self.stage_duration, "stage" => stage).record(duration.as_secs_f64());
    }

    /// Record error metrics
    pub fn record_error(&self, stage: &'static str) {
        counter!(self.errors_total, "stage" => stage).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.rows_loaded_total, "disaster_pipeline_rows_loaded_total");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let collector = MetricsCollector::default();
        collector.record_rows_loaded(10);
        collector.record_candidate(0.5, Duration::from_millis(10));
        collector.record_label_f1("related", 0.8);
        collector.record_error("load");
    }
}
