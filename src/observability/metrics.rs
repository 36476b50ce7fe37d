// ============================================================================
// PROMETHEUS METRICS
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

lazy_static! {
    // ========================================================================
    // HTTP REQUEST METRICS
    // ========================================================================

    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========================================================================
    // DATABASE METRICS
    // ========================================================================

    pub static ref DB_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_queries_total",
        "Total number of database queries",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]
    )
    .unwrap();

    // ========================================================================
    // VOUCHER METRICS
    // ========================================================================

    /// Voucher operations by kind (upsert, get, list) and outcome.
    pub static ref VOUCHER_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "voucher_operations_total",
        "Total disbursement voucher operations",
        &["operation", "outcome"]
    )
    .unwrap();
}

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);
}

pub fn record_db_query(operation: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    DB_QUERIES_TOTAL.with_label_values(&[operation, status]).inc();

    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration_secs);
}

pub fn record_voucher_operation(operation: &str, outcome: &str) {
    VOUCHER_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voucher_operation_counter_increments() {
        let before = VOUCHER_OPERATIONS_TOTAL
            .with_label_values(&["metrics_test", "success"])
            .get();
        record_voucher_operation("metrics_test", "success");
        let after = VOUCHER_OPERATIONS_TOTAL
            .with_label_values(&["metrics_test", "success"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_db_query_records_status() {
        record_db_query("metrics_test", 0.01, false);
        assert!(DB_QUERIES_TOTAL.with_label_values(&["metrics_test", "error"]).get() >= 1);
    }
}
