//! Pipeline metrics.
//!
//! Counters are recorded through the `metrics` facade; whichever recorder
//! the host process installs picks them up.

use metrics::counter;

pub mod names {
    /// Generation requests sent, by model and grounding mode.
    pub const GENERATION_ATTEMPTS_TOTAL: &str = "shortgen_generation_attempts_total";

    /// Rate-limit backoff sleeps.
    pub const GENERATION_BACKOFFS_TOTAL: &str = "shortgen_generation_backoffs_total";

    /// Resends without the retrieval tool.
    pub const GENERATION_FALLBACKS_TOTAL: &str = "shortgen_generation_fallbacks_total";

    /// Generation calls that surfaced an error, by status.
    pub const GENERATION_FAILURES_TOTAL: &str = "shortgen_generation_failures_total";

    /// Responses parsed with default fields.
    pub const DEGRADED_PARSES_TOTAL: &str = "shortgen_degraded_parses_total";

    /// Topics synthesized because the queue was empty.
    pub const TOPICS_SYNTHESIZED_TOTAL: &str = "shortgen_topics_synthesized_total";

    /// Completed runs, by outcome.
    pub const RUNS_TOTAL: &str = "shortgen_runs_total";
}

pub fn record_generation_attempt(model: &str, grounded: bool) {
    counter!(
        names::GENERATION_ATTEMPTS_TOTAL,
        "model" => model.to_string(),
        "grounded" => grounded.to_string()
    )
    .increment(1);
}

pub fn record_backoff(model: &str) {
    counter!(names::GENERATION_BACKOFFS_TOTAL, "model" => model.to_string()).increment(1);
}

pub fn record_fallback(model: &str) {
    counter!(names::GENERATION_FALLBACKS_TOTAL, "model" => model.to_string()).increment(1);
}

pub fn record_generation_failure(status: Option<u16>) {
    let status = status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string());
    counter!(names::GENERATION_FAILURES_TOTAL, "status" => status).increment(1);
}

pub fn record_degraded_parse(schema_version: u32) {
    counter!(
        names::DEGRADED_PARSES_TOTAL,
        "schema_version" => schema_version.to_string()
    )
    .increment(1);
}

pub fn record_topic_synthesized() {
    counter!(names::TOPICS_SYNTHESIZED_TOTAL).increment(1);
}

pub fn record_run(outcome: &'static str) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_namespaced() {
        for name in [
            names::GENERATION_ATTEMPTS_TOTAL,
            names::GENERATION_BACKOFFS_TOTAL,
            names::GENERATION_FALLBACKS_TOTAL,
            names::GENERATION_FAILURES_TOTAL,
            names::DEGRADED_PARSES_TOTAL,
            names::TOPICS_SYNTHESIZED_TOTAL,
            names::RUNS_TOTAL,
        ] {
            assert!(name.starts_with("shortgen_"), "{}", name);
        }
    }
}
