mod config;
mod domain;
mod following;
mod friending;
mod http_server;
mod identity_resolver;
mod metrics;
mod pair_lock;
mod repo;
#[cfg(test)]
mod test_support;

use crate::config::{Config, Settings};
use crate::http_server::HttpServer;
use crate::identity_resolver::GraphIdentityResolver;
use crate::repo::Repo;
use anyhow::{Context, Result};
use neo4rs::Graph;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!("Starting relationship server");

    let config = Config::new("config")?;
    let settings = config.get::<Settings>()?;

    info!("Connecting to Neo4j at {}", settings.neo4j_uri);
    let graph = Graph::new(
        &settings.neo4j_uri,
        &settings.neo4j_user,
        &settings.neo4j_password,
    )
    .await?;

    let repo = Arc::new(Repo::new(graph.clone()));
    repo.ensure_constraints()
        .await
        .context("Failed to apply store constraints")?;

    let resolver = Arc::new(GraphIdentityResolver::new(graph));

    let cancellation_token = CancellationToken::new();
    let task_tracker = TaskTracker::new();

    HttpServer::start(
        task_tracker.clone(),
        &settings,
        repo,
        resolver,
        cancellation_token.clone(),
    )?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received ctrl-c, shutting down");
            cancellation_token.cancel();
        }
        _ = cancellation_token.cancelled() => {}
    }

    task_tracker.close();
    task_tracker.wait().await;

    Ok(())
}
