mod handlers;
mod router;

use crate::{
    config::Settings,
    domain::UserId,
    following::FollowingEngine,
    friending::FriendingEngine,
    identity_resolver::ResolveIdentity,
    repo::RepoTrait,
};
use anyhow::{Context, Result};
use axum::Router;
use axum_server::Handle;
use moka::future::Cache;
use router::create_router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::info;

pub struct AppState<T, R>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    pub friending: FriendingEngine<T>,
    pub following: FollowingEngine<T>,
    pub resolver: Arc<R>,
    pub follower_count_cache: Cache<UserId, u64>,
}

impl<T, R> AppState<T, R>
where
    T: RepoTrait + 'static,
    R: ResolveIdentity + 'static,
{
    pub fn new(repo: Arc<T>, resolver: Arc<R>, follower_count_ttl: Duration) -> Self {
        let follower_count_cache = Cache::builder()
            .time_to_live(follower_count_ttl)
            .max_capacity(4000)
            .build();

        Self {
            friending: FriendingEngine::new(repo.clone()),
            following: FollowingEngine::new(repo),
            resolver,
            follower_count_cache,
        }
    }
}

pub struct HttpServer;
impl HttpServer {
    pub fn start<T, R>(
        task_tracker: TaskTracker,
        settings: &Settings,
        repo: Arc<T>,
        resolver: Arc<R>,
        cancellation_token: CancellationToken,
    ) -> Result<()>
    where
        T: RepoTrait + 'static,
        R: ResolveIdentity + 'static,
    {
        let follower_count_ttl =
            Duration::from_secs(settings.follower_count_cache_seconds.get());
        let state = Arc::new(AppState::new(repo, resolver, follower_count_ttl));
        let router = create_router(state)?;

        start_http_server(task_tracker, settings.http_port, router, cancellation_token);

        Ok(())
    }
}

fn start_http_server(
    task_tracker: TaskTracker,
    http_port: u16,
    router: Router,
    cancellation_token: CancellationToken,
) {
    task_tracker.spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
        let handle = Handle::new();
        tokio::spawn(await_shutdown(cancellation_token, handle.clone()));
        axum_server::bind(addr)
            .handle(handle)
            .serve(router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .context("Failed to start HTTP server")
    });
}

async fn await_shutdown(cancellation_token: CancellationToken, handle: Handle) {
    cancellation_token.cancelled().await;
    info!("Shuting down.");
    handle.graceful_shutdown(Some(Duration::from_secs(30)));
}
