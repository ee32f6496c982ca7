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

//! Storage port for the ingestion pipeline and its Postgres adapter.

use anyhow::Result;
use async_trait::async_trait;

use crate::database::PostgresClient;
use crate::mapper::{Counters, Measurement};

/// Sink for the two persisted facts. Each call is one atomic single-row
/// write; batching, retries and deduplication are deliberately not part of
/// this contract. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn store_measurement(&self, measurement: &Measurement) -> Result<()>;
    async fn store_counters(&self, counters: &Counters) -> Result<()>;
}

/// Postgres-backed repository writing into `home_energy_stats` and
/// `home_energy_counters`. Column order matches the existing deployment.
#[derive(Clone)]
pub struct PostgresRepository {
    client: PostgresClient,
}

impl PostgresRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn store_measurement(&self, measurement: &Measurement) -> Result<()> {
        let conn = self.client.get_connection().await?;

        conn.execute(
            "INSERT INTO home_energy_stats (
                time,
                device,
                phase_a_actual_power,
                phase_a_apparent_power,
                phase_a_current,
                phase_a_frequency,
                phase_a_power_factor,
                phase_a_voltage,
                phase_b_actual_power,
                phase_b_apparent_power,
                phase_b_current,
                phase_b_frequency,
                phase_b_power_factor,
                phase_b_voltage,
                phase_c_actual_power,
                phase_c_apparent_power,
                phase_c_current,
                phase_c_frequency,
                phase_c_power_factor,
                phase_c_voltage,
                total_actual_power,
                total_apparent_power,
                total_current
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )",
            &[
                &measurement.time,
                &measurement.device,
                &measurement.phase_a.actual_power,
                &measurement.phase_a.apparent_power,
                &measurement.phase_a.current,
                &measurement.phase_a.frequency,
                &measurement.phase_a.power_factor,
                &measurement.phase_a.voltage,
                &measurement.phase_b.actual_power,
                &measurement.phase_b.apparent_power,
                &measurement.phase_b.current,
                &measurement.phase_b.frequency,
                &measurement.phase_b.power_factor,
                &measurement.phase_b.voltage,
                &measurement.phase_c.actual_power,
                &measurement.phase_c.apparent_power,
                &measurement.phase_c.current,
                &measurement.phase_c.frequency,
                &measurement.phase_c.power_factor,
                &measurement.phase_c.voltage,
                &measurement.total_actual_power,
                &measurement.total_apparent_power,
                &measurement.total_current,
            ],
        )
        .await?;

        Ok(())
    }

    async fn store_counters(&self, counters: &Counters) -> Result<()> {
        let conn = self.client.get_connection().await?;

        conn.execute(
            "INSERT INTO home_energy_counters (
                time,
                device,
                phase_a_total_energy,
                phase_a_total_energy_returned,
                phase_b_total_energy,
                phase_b_total_energy_returned,
                phase_c_total_energy,
                phase_c_total_energy_returned,
                total_energy,
                total_energy_returned
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )",
            &[
                &counters.time,
                &counters.device,
                &counters.phase_a.energy,
                &counters.phase_a.energy_returned,
                &counters.phase_b.energy,
                &counters.phase_b.energy_returned,
                &counters.phase_c.energy,
                &counters.phase_c.energy_returned,
                &counters.total.energy,
                &counters.total.energy_returned,
            ],
        )
        .await?;

        Ok(())
    }
}
