use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use solar_statistics::config::Config;
use solar_statistics::database::PostgresClient;
use solar_statistics::http;
use solar_statistics::metrics::IngestMetrics;
use solar_statistics::{Listener, PostgresRepository, StatusHandler};

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Err(e) = run().await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    let db = PostgresClient::connect(&config.database).context("database setup")?;
    db.ping().await.context("database ping")?;
    db.migrate().await.context("database migration")?;

    let metrics = Arc::new(IngestMetrics::default());
    let repo = Arc::new(PostgresRepository::new(db));
    let handler = StatusHandler::new(repo, metrics.clone());

    let mut listener = Listener::new(config.broker.clone())?;
    listener.handle(config.broker.topic.clone(), Box::new(handler));

    let cancel = CancellationToken::new();

    {
        let addr = config.metrics_address.clone();
        let metrics = metrics.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = http::serve(addr, metrics, cancel).await {
                error!("metrics server error: {e:#}");
            }
        });
    }

    let mut listen_task = tokio::spawn(listener.listen(cancel.clone()));

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        result = &mut listen_task => {
            cancel.cancel();
            return result
                .context("listener task panicked")?
                .context("mqtt listener");
        }
    }

    cancel.cancel();

    // Give the listener its drain window, then exit regardless.
    match tokio::time::timeout(config.shutdown_timeout, &mut listen_task).await {
        Ok(result) => result
            .context("listener task panicked")?
            .context("mqtt listener")?,
        Err(_) => warn!(
            "listener did not finish draining within {:?}, exiting anyway",
            config.shutdown_timeout
        ),
    }

    Ok(())
}
