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

//! Readiness and metrics endpoints.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header;
use axum::routing::get;
use axum::Router;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::metrics::IngestMetrics;

/// Serve `/ready` and `/metrics` until the token is cancelled.
pub async fn serve(
    addr: String,
    metrics: Arc<IngestMetrics>,
    cancel: CancellationToken,
) -> Result<()> {
    let app = Router::new()
        .route("/ready", get(ready))
        .route("/metrics", get(render_metrics))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;

    info!("metrics server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .context("metrics server")
}

async fn ready() -> &'static str {
    "OK"
}

async fn render_metrics(
    State(metrics): State<Arc<IngestMetrics>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}
