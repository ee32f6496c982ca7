// Copyright 2025 The Solar Statistics Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lock-free ingestion counters with Prometheus text exposition.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the pipeline and scraped via `/metrics`. All
/// updates are relaxed atomics; the handler may run on any number of
/// concurrent dispatch contexts.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    messages_received: AtomicU64,
    messages_dropped: AtomicU64,
    measurements_stored: AtomicU64,
    counters_stored: AtomicU64,
    store_failures: AtomicU64,
}

impl IngestMetrics {
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_measurement_stored(&self) {
        self.measurements_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_counters_stored(&self) {
        self.counters_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Render all counters in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let counters = [
            (
                "ingest_messages_received_total",
                "Messages received on the subscribed topic",
                &self.messages_received,
            ),
            (
                "ingest_messages_dropped_total",
                "Messages dropped because they could not be decoded",
                &self.messages_dropped,
            ),
            (
                "ingest_measurements_stored_total",
                "Measurement rows written",
                &self.measurements_stored,
            ),
            (
                "ingest_counters_stored_total",
                "Energy counter rows written",
                &self.counters_stored,
            ),
            (
                "ingest_store_failures_total",
                "Failed repository writes",
                &self.store_failures,
            ),
        ];

        let mut out = String::new();
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {}", value.load(Ordering::Relaxed));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reflects_counts() {
        let metrics = IngestMetrics::default();
        metrics.record_received();
        metrics.record_received();
        metrics.record_measurement_stored();

        let out = metrics.render();
        assert!(out.contains("ingest_messages_received_total 2"));
        assert!(out.contains("ingest_measurements_stored_total 1"));
        assert!(out.contains("ingest_store_failures_total 0"));
        assert!(out.contains("# TYPE ingest_messages_dropped_total counter"));
    }
}
