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

//! The per-message pipeline: decode → map → store.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, warn};

use crate::listener::MessageHandler;
use crate::mapper;
use crate::metrics::IngestMetrics;
use crate::protocol::{self, NOTIFY_STATUS};
use crate::repository::Repository;

/// Handles `NotifyStatus` messages from the meter. Every failure is local
/// to the one message being processed: logged, counted, dropped.
pub struct StatusHandler {
    repo: Arc<dyn Repository>,
    metrics: Arc<IngestMetrics>,
}

impl StatusHandler {
    pub fn new(repo: Arc<dyn Repository>, metrics: Arc<IngestMetrics>) -> Self {
        Self { repo, metrics }
    }
}

#[async_trait]
impl MessageHandler for StatusHandler {
    async fn handle(&self, topic: &str, payload: &[u8]) {
        self.metrics.record_received();

        let envelope = match protocol::decode_envelope(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("dropping message on {topic}: {e}");
                self.metrics.record_dropped();
                return;
            }
        };

        if envelope.method != NOTIFY_STATUS {
            debug!("ignoring method {} from {}", envelope.method, envelope.source);
            return;
        }

        let status = match protocol::decode_status(&envelope.params) {
            Ok(status) => status,
            Err(e) => {
                warn!("dropping message on {topic}: {e}");
                self.metrics.record_dropped();
                return;
            }
        };

        // The device id is the envelope source, not payload content.
        let device = envelope.source.as_str();
        let time = status.time();

        // The two writes are independent; one failing does not block the
        // other, and there is no rollback across them.
        if let Some(phases) = &status.phases {
            let measurement = mapper::to_measurement(device, time, phases);
            match self.repo.store_measurement(&measurement).await {
                Ok(()) => self.metrics.record_measurement_stored(),
                Err(e) => {
                    error!("storing measurement for {device}: {e:#}");
                    self.metrics.record_store_failure();
                }
            }
        }

        if let Some(energy) = &status.energy {
            let counters = mapper::to_counters(device, time, energy);
            match self.repo.store_counters(&counters).await {
                Ok(()) => self.metrics.record_counters_stored(),
                Err(e) => {
                    error!("storing counters for {device}: {e:#}");
                    self.metrics.record_store_failure();
                }
            }
        }
    }
}
