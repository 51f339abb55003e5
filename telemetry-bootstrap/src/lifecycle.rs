use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;

use anyhow::{bail, Context, Result};
use axum::Router;
use clap::Subcommand;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use telemetry_infrastructure::{run_durable_writer, schedule_statistics};
use telemetry_interfaces_http::{
    build_anomaly_router, build_ingress_router, build_query_router, build_stats_router,
    build_store_router,
};

use crate::context::AppContext;

type Worker = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Accept events over HTTP and append them to the log
    Ingress,
    /// Persist the log into the database and serve range reads
    Store,
    /// Aggregate running statistics on a fixed interval
    Stats,
    /// Look up log entries by per-type index
    Query,
    /// Run anomaly detection on demand
    Anomaly,
    /// Every service in one process, each on its own port
    All,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::Ingress => "ingress",
            Service::Store => "store",
            Service::Stats => "stats",
            Service::Query => "query",
            Service::Anomaly => "anomaly",
            Service::All => "all",
        }
    }
}

#[derive(Default)]
struct Plan {
    servers: Vec<(&'static str, String, Router)>,
    workers: Vec<Worker>,
}

async fn build_plan(
    service: Service,
    context: &mut AppContext,
    worker_rx: &watch::Receiver<bool>,
) -> Result<Plan> {
    let mut plan = Plan::default();
    let all = service == Service::All;
    let config = context.config.clone();

    if all || service == Service::Ingress {
        let state = context.log_state().await?;
        plan.servers
            .push(("ingress", config.ingress_bind_addr.clone(), build_ingress_router(state)));
    }
    if all || service == Service::Store {
        let state = context.store_state().await?;
        let shutdown = worker_rx.clone();
        let writer_state = state.clone();
        plan.workers.push(Box::pin(async move {
            if let Err(err) = run_durable_writer(writer_state, shutdown).await {
                error!("durable writer exited: {}", err);
            }
        }));
        plan.servers
            .push(("store", config.store_bind_addr.clone(), build_store_router(state)));
    }
    if all || service == Service::Stats {
        let state = context.stats_state(all).await?;
        plan.workers
            .push(Box::pin(schedule_statistics(state.clone(), worker_rx.clone())));
        plan.servers
            .push(("stats", config.stats_bind_addr.clone(), build_stats_router(state)));
    }
    if all || service == Service::Query {
        let state = context.log_state().await?;
        plan.servers
            .push(("query", config.query_bind_addr.clone(), build_query_router(state)));
    }
    if all || service == Service::Anomaly {
        let state = context.anomaly_state().await?;
        plan.servers
            .push(("anomaly", config.anomaly_bind_addr.clone(), build_anomaly_router(state)));
    }
    Ok(plan)
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Starts `service`, serves until SIGINT/SIGTERM, then stops the HTTP
/// servers before cancelling and awaiting the background workers.
pub async fn run(service: Service, config_path: Option<&Path>) -> Result<()> {
    let mut context = AppContext::load(config_path).await?;
    if context.config.log_backend == "memory" && service != Service::All {
        bail!("the memory log backend is only usable with the `all` service");
    }

    let (http_tx, http_rx) = watch::channel(false);
    let (worker_tx, worker_rx) = watch::channel(false);
    let plan = build_plan(service, &mut context, &worker_rx).await?;

    let mut listeners = Vec::with_capacity(plan.servers.len());
    for (name, addr, router) in plan.servers {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid {} bind address", name))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {} on {}", name, addr))?;
        info!(service = name, "listening on {}", addr);
        listeners.push((name, listener, router));
    }

    let workers: Vec<JoinHandle<()>> = plan.workers.into_iter().map(tokio::spawn).collect();
    let servers: Vec<JoinHandle<Result<()>>> = listeners
        .into_iter()
        .map(|(name, listener, router)| {
            let shutdown = http_rx.clone();
            tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(wait_for(shutdown))
                    .await
                    .with_context(|| format!("{} server failed", name))
            })
        })
        .collect();

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = http_tx.send(true);
    });

    let mut outcome = Ok(());
    for server in servers {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!("{:#}", err);
                outcome = Err(err);
            }
            Err(err) => error!("server task panicked: {}", err),
        }
    }

    let _ = worker_tx.send(true);
    for worker in workers {
        if let Err(err) = worker.await {
            error!("background task panicked: {}", err);
        }
    }
    info!(service = service.name(), "shutdown complete");
    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_infrastructure::AppConfig;

    #[tokio::test]
    async fn all_mode_plans_every_service_on_a_shared_memory_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            log_backend: "memory".to_string(),
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            stats_path: dir.path().join("stats.json").to_string_lossy().to_string(),
            anomaly_path: dir.path().join("anomalies.json").to_string_lossy().to_string(),
            ..AppConfig::default()
        };
        let mut context = AppContext::from_config(config);
        let (_tx, rx) = watch::channel(false);

        let plan = build_plan(Service::All, &mut context, &rx).await.expect("plan");
        let names: Vec<&str> = plan.servers.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(names, vec!["ingress", "store", "stats", "query", "anomaly"]);
        assert_eq!(plan.workers.len(), 2);
    }

    #[tokio::test]
    async fn single_service_plans_only_itself() {
        let config = AppConfig {
            log_backend: "memory".to_string(),
            ..AppConfig::default()
        };
        let mut context = AppContext::from_config(config);
        let (_tx, rx) = watch::channel(false);

        let plan = build_plan(Service::Query, &mut context, &rx).await.expect("plan");
        assert_eq!(plan.servers.len(), 1);
        assert!(plan.workers.is_empty());
    }
}
