use crate::domain::{FollowEdge, FriendRequest, RequestStatus, UserId};
use crate::identity_resolver::{ResolveIdentity, ResolverError};
use crate::repo::{RepoError, RepoTrait};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::task::yield_now;

fn friendship_key(a: &UserId, b: &UserId) -> (UserId, UserId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// In-memory stand-in for the graph store. Every method yields once before
/// touching state so that racing engine calls actually interleave under the
/// multi-threaded test runtime.
#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    pending: Vec<FriendRequest>,
    friendships: HashSet<(UserId, UserId)>,
    follows: HashSet<(UserId, UserId)>,
}

impl MemoryRepo {
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

#[async_trait]
impl RepoTrait for MemoryRepo {
    async fn insert_pending_request(&self, request: &FriendRequest) -> Result<(), RepoError> {
        yield_now().await;
        self.state.lock().await.pending.push(request.clone());
        Ok(())
    }

    async fn find_pending_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .pending
            .iter()
            .find(|request| request.status == RequestStatus::Pending && request.is_between(a, b))
            .cloned())
    }

    async fn find_pending(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .pending
            .iter()
            .find(|request| {
                request.status == RequestStatus::Pending
                    && &request.from == from
                    && &request.to == to
            })
            .cloned())
    }

    async fn delete_pending_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError> {
        yield_now().await;
        let mut state = self.state.lock().await;
        state
            .pending
            .retain(|request| !(&request.from == from && &request.to == to));
        Ok(())
    }

    async fn pending_requests_for(&self, user: &UserId) -> Result<Vec<FriendRequest>, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .pending
            .iter()
            .filter(|request| request.involves(user))
            .cloned()
            .collect())
    }

    async fn promote_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError> {
        yield_now().await;
        // Single lock acquisition stands in for the store transaction.
        let mut state = self.state.lock().await;
        state
            .pending
            .retain(|request| !(&request.from == from && &request.to == to));
        let key = friendship_key(from, to);
        state.friendships.insert(key);
        Ok(())
    }

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state.friendships.contains(&friendship_key(a, b)))
    }

    async fn friends_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .friendships
            .iter()
            .filter_map(|(a, b)| {
                if a == user {
                    Some(b.clone())
                } else if b == user {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect())
    }

    async fn delete_friendship(&self, a: &UserId, b: &UserId) -> Result<(), RepoError> {
        yield_now().await;
        let mut state = self.state.lock().await;
        state.friendships.remove(&friendship_key(a, b));
        Ok(())
    }

    async fn insert_follow(&self, edge: &FollowEdge) -> Result<(), RepoError> {
        yield_now().await;
        let mut state = self.state.lock().await;
        state
            .follows
            .insert((edge.follower.clone(), edge.followee.clone()));
        Ok(())
    }

    async fn follow_exists(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .follows
            .contains(&(follower.clone(), followee.clone())))
    }

    async fn delete_follow(&self, follower: &UserId, followee: &UserId) -> Result<(), RepoError> {
        yield_now().await;
        let mut state = self.state.lock().await;
        state.follows.remove(&(follower.clone(), followee.clone()));
        Ok(())
    }

    async fn followers_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .filter(|(_, followee)| followee == user)
            .map(|(follower, _)| follower.clone())
            .collect())
    }

    async fn following_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .filter(|(follower, _)| follower == user)
            .map(|(_, followee)| followee.clone())
            .collect())
    }

    async fn follower_count(&self, user: &UserId) -> Result<u64, RepoError> {
        yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .filter(|(_, followee)| followee == user)
            .count() as u64)
    }
}

/// Wraps [`MemoryRepo`] and fails the next `promote_failures` calls to
/// `promote_request`, standing in for a store that drops the transaction.
/// Everything else passes straight through.
#[derive(Default)]
pub struct FailingRepo {
    inner: MemoryRepo,
    promote_failures: AtomicUsize,
}

impl FailingRepo {
    pub fn failing_promotes(times: usize) -> Self {
        Self {
            inner: MemoryRepo::default(),
            promote_failures: AtomicUsize::new(times),
        }
    }
}

#[async_trait]
impl RepoTrait for FailingRepo {
    async fn insert_pending_request(&self, request: &FriendRequest) -> Result<(), RepoError> {
        self.inner.insert_pending_request(request).await
    }

    async fn find_pending_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError> {
        self.inner.find_pending_between(a, b).await
    }

    async fn find_pending(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError> {
        self.inner.find_pending(from, to).await
    }

    async fn delete_pending_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError> {
        self.inner.delete_pending_request(from, to).await
    }

    async fn pending_requests_for(&self, user: &UserId) -> Result<Vec<FriendRequest>, RepoError> {
        self.inner.pending_requests_for(user).await
    }

    async fn promote_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError> {
        let remaining = self.promote_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.promote_failures.store(remaining - 1, Ordering::SeqCst);
            // The transaction never committed, so the inner state is
            // untouched.
            return Err(RepoError::Malformed("transaction dropped".to_string()));
        }
        self.inner.promote_request(from, to).await
    }

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, RepoError> {
        self.inner.are_friends(a, b).await
    }

    async fn friends_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        self.inner.friends_of(user).await
    }

    async fn delete_friendship(&self, a: &UserId, b: &UserId) -> Result<(), RepoError> {
        self.inner.delete_friendship(a, b).await
    }

    async fn insert_follow(&self, edge: &FollowEdge) -> Result<(), RepoError> {
        self.inner.insert_follow(edge).await
    }

    async fn follow_exists(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, RepoError> {
        self.inner.follow_exists(follower, followee).await
    }

    async fn delete_follow(&self, follower: &UserId, followee: &UserId) -> Result<(), RepoError> {
        self.inner.delete_follow(follower, followee).await
    }

    async fn followers_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        self.inner.followers_of(user).await
    }

    async fn following_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        self.inner.following_of(user).await
    }

    async fn follower_count(&self, user: &UserId) -> Result<u64, RepoError> {
        self.inner.follower_count(user).await
    }
}

/// Fixed handle-to-identity table for route layer tests.
#[derive(Default)]
pub struct StaticResolver {
    identities: HashMap<String, UserId>,
}

impl StaticResolver {
    pub fn with_handles(handles: &[&str]) -> Self {
        let identities = handles
            .iter()
            .map(|handle| (handle.to_string(), UserId::new(format!("id-{handle}"))))
            .collect();
        Self { identities }
    }
}

#[async_trait]
impl ResolveIdentity for StaticResolver {
    async fn resolve_handle(&self, handle: &str) -> Result<UserId, ResolverError> {
        self.identities
            .get(handle)
            .cloned()
            .ok_or_else(|| ResolverError::HandleNotFound(handle.to_string()))
    }
}
