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

//! Process configuration from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub broker: BrokerConfig,
    pub database: DatabaseConfig,
    pub metrics_address: String,
    /// Bound on the whole shutdown sequence once a signal is received.
    pub shutdown_timeout: Duration,
}

/// Broker connection settings. Credentials, if any, ride in the URL's
/// user-info component.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub topic: String,
    pub client_id: String,
    pub connect_timeout: Duration,
    pub drain_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_open_conns: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let broker_url = env::var("MQTT_URL").context("MQTT_URL not set")?;
        let topic = env::var("MQTT_TOPIC").context("MQTT_TOPIC not set")?;
        let client_id = env::var("MQTT_CLIENT_ID")
            .unwrap_or_else(|_| format!("solar-statistics-{}", uuid::Uuid::new_v4()));
        let connect_timeout = duration_secs_var("MQTT_CONNECT_TIMEOUT_SECONDS", 120)?;
        let shutdown_timeout = duration_secs_var("SHUTDOWN_TIMEOUT_SECONDS", 10)?;

        let database_url = env::var("DB_URL").context("DB_URL not set")?;
        let max_open_conns = match env::var("DB_MAX_OPEN_CONNS") {
            Ok(raw) => raw.parse().context("invalid DB_MAX_OPEN_CONNS")?,
            Err(_) => 16,
        };

        let metrics_address =
            env::var("METRICS_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            broker: BrokerConfig {
                url: broker_url,
                topic,
                client_id,
                connect_timeout,
                // The drain shares the shutdown bound.
                drain_timeout: shutdown_timeout,
            },
            database: DatabaseConfig {
                url: database_url,
                max_open_conns,
            },
            metrics_address,
            shutdown_timeout,
        })
    }
}

fn duration_secs_var(name: &str, default_secs: u64) -> Result<Duration> {
    let secs = match env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {name}"))?,
        Err(_) => default_secs,
    };
    Ok(Duration::from_secs(secs))
}
