//! Store call metrics, recorded through the `metrics` facade.

use metrics::{counter, histogram};

pub mod names {
    /// Sheets API calls, by operation and resulting status.
    pub const REQUESTS_TOTAL: &str = "shortgen_sheets_requests_total";

    /// Sheets API calls repeated after a transient failure.
    pub const RETRIES_TOTAL: &str = "shortgen_sheets_retries_total";

    /// Wall time of one Sheets call including retries.
    pub const LATENCY_SECONDS: &str = "shortgen_sheets_latency_seconds";
}

/// Count a finished call and record how long it took.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    let operation = operation.to_string();
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(names::LATENCY_SECONDS, "operation" => operation).record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}
