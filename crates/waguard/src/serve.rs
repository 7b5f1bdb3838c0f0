// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `waguard serve`: the scheduler, the recompute queue, and the admin gateway.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info, warn};
use waguard_config::WaguardConfig;
use waguard_core::{GovernorError, SystemClock};
use waguard_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};
use waguard_governor::{Collaborators, Governor, RecalcQueue};
use waguard_storage::SqliteStore;

use crate::scheduler::run_scheduler;
use crate::shutdown;

/// Open the store and build a governor over it.
///
/// The store doubles as connection registry and telemetry source.
pub(crate) async fn open_governor(
    config: &WaguardConfig,
) -> Result<(Arc<Governor>, Arc<SqliteStore>), GovernorError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let governor = Governor::new(
        config,
        Collaborators {
            telemetry: store.clone(),
            connections: store.clone(),
            store: store.clone(),
            clock: Arc::new(SystemClock),
        },
    );
    Ok((Arc::new(governor), store))
}

/// Close the store once every other holder has been dropped.
pub(crate) async fn close_store(store: Arc<SqliteStore>) {
    match Arc::try_unwrap(store) {
        Ok(store) => {
            if let Err(e) = store.close().await {
                warn!(error = %e, "error closing storage");
            }
        }
        Err(_) => warn!("storage still shared at shutdown, skipping close"),
    }
}

pub async fn run_serve(config: WaguardConfig) -> Result<(), GovernorError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting waguard");
    log_heap("startup");

    let prometheus_render = install_metrics();

    let (governor, store) = open_governor(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let (queue, queue_task) = RecalcQueue::start(
        governor.clone(),
        config.scheduler.queue_capacity,
        cancel.clone(),
    );

    let scheduler_task = if config.scheduler.enabled {
        Some(tokio::spawn(run_scheduler(
            governor.clone(),
            Duration::from_secs(config.scheduler.interval_secs),
            config.scheduler.window,
            cancel.clone(),
        )))
    } else {
        debug!("batch scheduler disabled by configuration");
        None
    };

    let served = if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token is not set; every admin route will answer 401");
        }
        let state = GatewayState {
            governor: governor.clone(),
            queue: Some(queue.clone()),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render,
            },
        };
        let server = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        let result = waguard_gateway::start_server(&server, state, cancel.clone()).await;
        // A bind failure should still bring the workers down.
        cancel.cancel();
        result
    } else {
        info!("gateway disabled; running scheduler only");
        cancel.cancelled().await;
        Ok(())
    };

    if let Some(task) = scheduler_task {
        if let Err(e) = task.await {
            warn!(error = %e, "scheduler task panicked");
        }
    }
    if let Err(e) = queue_task.await {
        warn!(error = %e, "recompute queue task panicked");
    }

    drop(queue);
    drop(governor);
    close_store(store).await;

    log_heap("shutdown");
    info!("waguard stopped");
    served
}

/// Install the Prometheus recorder; a failure leaves metrics as no-ops.
fn install_metrics() -> Option<Arc<dyn Fn() -> String + Send + Sync>> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            waguard_governor::metrics::register_metrics();
            info!("prometheus metrics recorder installed");
            Some(Arc::new(move || handle.render()))
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    }
}

#[cfg(not(target_env = "msvc"))]
fn log_heap(phase: &str) {
    let _ = tikv_jemalloc_ctl::epoch::advance();
    let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
    let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
    info!(
        phase,
        allocated_kb = allocated / 1024,
        resident_kb = resident / 1024,
        "heap"
    );
}

#[cfg(target_env = "msvc")]
fn log_heap(_phase: &str) {}

/// Initialize the tracing subscriber; `RUST_LOG` overrides the configured level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("waguard={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init();
}
