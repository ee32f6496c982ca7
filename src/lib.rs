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

//! Shelly Pro 3EM telemetry ingestion.
//!
//! Subscribes to the meter's RPC notification topic on an MQTT broker,
//! decodes `NotifyStatus` payloads, and persists instantaneous measurements
//! and cumulative energy counters to Postgres. Delivery toward storage is
//! at-least-once; malformed messages are dropped without stalling the
//! pipeline.

pub mod config;
pub mod database;
pub mod handler;
pub mod http;
pub mod listener;
pub mod mapper;
pub mod metrics;
pub mod protocol;
pub mod repository;

pub use handler::StatusHandler;
pub use listener::{Listener, MessageHandler};
pub use repository::{PostgresRepository, Repository};
