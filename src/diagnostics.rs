use chrono::{DateTime, Utc};

/// Wall-clock timing for slow paths (chapter loads, batched requests).
/// `std::time::Instant` is unavailable on wasm32, so this runs on chrono.
pub struct PerfSpan {
    scope: &'static str,
    started_at: DateTime<Utc>,
}

impl PerfSpan {
    pub fn start(scope: &'static str) -> Self {
        Self {
            scope,
            started_at: Utc::now(),
        }
    }

    pub fn finish(self, details: &str) {
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        if details.trim().is_empty() {
            tracing::debug!(scope = self.scope, elapsed_ms, "perf");
        } else {
            tracing::debug!(scope = self.scope, elapsed_ms, details, "perf");
        }
    }
}
