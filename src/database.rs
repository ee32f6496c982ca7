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

//! Pooled Postgres client and startup schema migration.

use anyhow::{Context, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use log::info;
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;

const SCHEMA: &str = include_str!("../migrations/001_initial.sql");

/// Postgres connection pool shared by the repository.
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Build a pool from the configured connection URL. No connection is
    /// attempted until the pool is first used; call [`ping`](Self::ping)
    /// to verify connectivity at startup.
    pub fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config =
            cfg.url.parse().context("parsing DB_URL")?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(cfg.max_open_conns)
            .build()
            .context("building connection pool")?;

        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute("SELECT 1", &[]).await?;
        Ok(())
    }

    pub async fn get_connection(&self) -> Result<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }

    /// Apply the embedded schema. Statements are idempotent, so running on
    /// every startup is safe.
    pub async fn migrate(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA)
            .await
            .context("applying schema migration")?;
        info!("database schema up to date");
        Ok(())
    }
}
