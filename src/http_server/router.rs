use super::handlers::{
    accept_friend_request, follow_user, follower_count, list_followers, list_following,
    list_friend_requests, list_friends, reject_friend_request, remove_friend, send_friend_request,
    serve_root_page, unfollow_user,
};
use super::AppState;
use crate::domain::RelationError;
use crate::identity_resolver::{ResolveIdentity, ResolverError};
use crate::metrics::setup_metrics;
use crate::repo::RepoTrait;
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tower_http::{timeout::TimeoutLayer, trace::DefaultOnFailure};
use tracing::Level;

pub fn create_router<T, R>(state: Arc<AppState<T, R>>) -> Result<Router>
where
    T: RepoTrait + 'static, // 'static is needed because the router needs to be static
    R: ResolveIdentity + 'static,
{
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(DefaultOnFailure::new().level(Level::ERROR));

    let metrics_handle = setup_metrics()?;

    Ok(Router::new()
        .route("/", get(serve_root_page))
        .route("/metrics", get(|| async move { metrics_handle.render() }))
        .route("/friends/:user", get(list_friends::<T, R>))
        .route("/friends/:user/:friend", delete(remove_friend::<T, R>))
        .route("/friend_requests/:user", get(list_friend_requests::<T, R>))
        .route(
            "/friend_requests/:from/:to",
            post(send_friend_request::<T, R>),
        )
        .route(
            "/friend_requests/:from/:to/accept",
            post(accept_friend_request::<T, R>),
        )
        .route(
            "/friend_requests/:from/:to/reject",
            post(reject_friend_request::<T, R>),
        )
        .route(
            "/follows/:follower/:followee",
            post(follow_user::<T, R>).delete(unfollow_user::<T, R>),
        )
        .route("/followers/:user", get(list_followers::<T, R>))
        .route("/followers/:user/count", get(follower_count::<T, R>))
        .route("/following/:user", get(list_following::<T, R>))
        .layer(tracing_layer)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(5)))
        .with_state(state))
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Relation(#[from] RelationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::Resolver(ResolverError::HandleNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Resolver(ResolverError::Repo(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Relation(RelationError::SelfRelation)
            | ApiError::Relation(RelationError::SelfFollow) => StatusCode::BAD_REQUEST,
            ApiError::Relation(RelationError::AlreadyRequested(..))
            | ApiError::Relation(RelationError::AlreadyFriends(..))
            | ApiError::Relation(RelationError::AlreadyFollowing(..)) => StatusCode::CONFLICT,
            ApiError::Relation(RelationError::RequestNotFound(..))
            | ApiError::Relation(RelationError::FriendNotFound(..))
            | ApiError::Relation(RelationError::NotFollowing(..)) => StatusCode::NOT_FOUND,
            ApiError::Relation(RelationError::Storage(_)) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, self.to_string()).into_response()
    }
}
