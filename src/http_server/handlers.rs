use super::router::ApiError;
use super::AppState;
use crate::domain::{FollowEdge, FriendRequest, UserId};
use crate::identity_resolver::ResolveIdentity;
use crate::repo::RepoTrait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct PendingRequestsResponse {
    pub incoming: Vec<FriendRequest>,
    pub outgoing: Vec<FriendRequest>,
}

#[derive(Debug, Serialize)]
pub struct FollowerCountResponse {
    pub count: u64,
}

pub async fn send_friend_request<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<(StatusCode, Json<FriendRequest>), ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let from = state.resolver.resolve_handle(&from).await?;
    let to = state.resolver.resolve_handle(&to).await?;

    let request = state.friending.send_request(&from, &to).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn accept_friend_request<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let from = state.resolver.resolve_handle(&from).await?;
    let to = state.resolver.resolve_handle(&to).await?;

    state.friending.accept_request(&from, &to).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reject_friend_request<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let from = state.resolver.resolve_handle(&from).await?;
    let to = state.resolver.resolve_handle(&to).await?;

    state.friending.reject_request(&from, &to).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_friend<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path((user, friend)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let user = state.resolver.resolve_handle(&user).await?;
    let friend = state.resolver.resolve_handle(&friend).await?;

    state.friending.remove_friend(&user, &friend).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_friends<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path(user): Path<String>,
) -> Result<Json<Vec<UserId>>, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let user = state.resolver.resolve_handle(&user).await?;
    let friends = state.friending.friends(&user).await?;
    Ok(Json(friends))
}

/// The engine hands back every pending request touching the user; the split
/// into incoming and outgoing is response shaping, not engine logic.
pub async fn list_friend_requests<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path(user): Path<String>,
) -> Result<Json<PendingRequestsResponse>, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let user = state.resolver.resolve_handle(&user).await?;
    let requests = state.friending.pending_requests(&user).await?;

    let (incoming, outgoing): (Vec<FriendRequest>, Vec<FriendRequest>) = requests
        .into_iter()
        .partition(|request| request.to == user);

    Ok(Json(PendingRequestsResponse { incoming, outgoing }))
}

pub async fn follow_user<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path((follower, followee)): Path<(String, String)>,
) -> Result<(StatusCode, Json<FollowEdge>), ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let follower = state.resolver.resolve_handle(&follower).await?;
    let followee = state.resolver.resolve_handle(&followee).await?;

    let edge = state.following.follow_user(&follower, &followee).await?;
    state.follower_count_cache.invalidate(&followee).await;

    Ok((StatusCode::CREATED, Json(edge)))
}

pub async fn unfollow_user<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path((follower, followee)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let follower = state.resolver.resolve_handle(&follower).await?;
    let followee = state.resolver.resolve_handle(&followee).await?;

    state.following.unfollow_user(&follower, &followee).await?;
    state.follower_count_cache.invalidate(&followee).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_followers<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path(user): Path<String>,
) -> Result<Json<Vec<UserId>>, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let user = state.resolver.resolve_handle(&user).await?;
    let followers = state.following.followers(&user).await?;
    Ok(Json(followers))
}

pub async fn list_following<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path(user): Path<String>,
) -> Result<Json<Vec<UserId>>, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let user = state.resolver.resolve_handle(&user).await?;
    let following = state.following.following(&user).await?;
    Ok(Json(following))
}

pub async fn follower_count<T, R>(
    State(state): State<Arc<AppState<T, R>>>,
    Path(user): Path<String>,
) -> Result<Json<FollowerCountResponse>, ApiError>
where
    T: RepoTrait,
    R: ResolveIdentity,
{
    let user = state.resolver.resolve_handle(&user).await?;

    if let Some(count) = state.follower_count_cache.get(&user).await {
        return Ok(Json(FollowerCountResponse { count }));
    }

    let count = state.following.follower_count(&user).await?;
    state.follower_count_cache.insert(user, count).await;

    Ok(Json(FollowerCountResponse { count }))
}

pub async fn serve_root_page() -> impl IntoResponse {
    let body = r#"
        <html>
            <head>
                <title>Relationship Server</title>
            </head>
            <body>
                <h1>Healthy</h1>
            </body>
        </html>
    "#;

    Html(body)
}
