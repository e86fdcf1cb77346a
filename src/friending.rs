use crate::domain::{FriendRequest, RelationError, UserId};
use crate::metrics;
use crate::pair_lock::{PairKey, PairLocks};
use crate::repo::RepoTrait;
use std::sync::Arc;
use tracing::debug;

/// The request lifecycle state machine. A pending request either gets
/// accepted, which atomically replaces it with a symmetric friendship, or
/// rejected, which just deletes it. Redundant operations fail loudly instead
/// of no-opping so that stale callers surface their bugs.
///
/// Every mutating operation runs under the lock for its unordered pair; the
/// store cannot give us multi-document transactions, so this is what makes
/// the check-then-act sequences safe against concurrent calls.
pub struct FriendingEngine<T>
where
    T: RepoTrait,
{
    repo: Arc<T>,
    pair_locks: PairLocks,
}

impl<T> FriendingEngine<T>
where
    T: RepoTrait,
{
    pub fn new(repo: Arc<T>) -> Self {
        Self {
            repo,
            pair_locks: PairLocks::new(),
        }
    }

    /// Creates a pending request. The existence check is direction-agnostic:
    /// if B already asked A, a request from A to B fails rather than creating
    /// a second pending row for the pair.
    pub async fn send_request(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<FriendRequest, RelationError> {
        if from == to {
            return Err(RelationError::SelfRelation);
        }

        let _guard = self.pair_locks.acquire(PairKey::unordered(from, to)).await;

        if self.repo.are_friends(from, to).await? {
            return Err(RelationError::AlreadyFriends(from.clone(), to.clone()));
        }

        if self.repo.find_pending_between(from, to).await?.is_some() {
            return Err(RelationError::AlreadyRequested(from.clone(), to.clone()));
        }

        let request = FriendRequest::pending(from.clone(), to.clone());
        self.repo.insert_pending_request(&request).await?;
        metrics::friend_requests_sent().increment(1);
        debug!("Friend request sent: {} -> {}", from, to);

        Ok(request)
    }

    /// Accepts the pending request from `from` to `to`. Direction matters:
    /// only the responder's side of the exact stored request can accept. The
    /// delete-plus-create runs as one store transaction, so a failure cannot
    /// leave the request gone without the friendship.
    pub async fn accept_request(&self, from: &UserId, to: &UserId) -> Result<(), RelationError> {
        let _guard = self.pair_locks.acquire(PairKey::unordered(from, to)).await;

        if self.repo.find_pending(from, to).await?.is_none() {
            return Err(RelationError::RequestNotFound(from.clone(), to.clone()));
        }

        self.repo.promote_request(from, to).await?;
        metrics::friend_requests_accepted().increment(1);
        debug!("Friend request accepted: {} -> {}", from, to);

        Ok(())
    }

    /// Rejection is not sticky: the request is deleted and a fresh one may be
    /// sent afterwards. It is also not idempotent; a second reject finds no
    /// pending request and fails.
    pub async fn reject_request(&self, from: &UserId, to: &UserId) -> Result<(), RelationError> {
        let _guard = self.pair_locks.acquire(PairKey::unordered(from, to)).await;

        if self.repo.find_pending(from, to).await?.is_none() {
            return Err(RelationError::RequestNotFound(from.clone(), to.clone()));
        }

        self.repo.delete_pending_request(from, to).await?;
        metrics::friend_requests_rejected().increment(1);
        debug!("Friend request rejected: {} -> {}", from, to);

        Ok(())
    }

    /// Removes an existing friendship, order-independent and symmetric.
    pub async fn remove_friend(&self, user: &UserId, friend: &UserId) -> Result<(), RelationError> {
        let _guard = self
            .pair_locks
            .acquire(PairKey::unordered(user, friend))
            .await;

        if !self.repo.are_friends(user, friend).await? {
            return Err(RelationError::FriendNotFound(user.clone(), friend.clone()));
        }

        self.repo.delete_friendship(user, friend).await?;
        metrics::friendships_removed().increment(1);
        debug!("Friendship removed: {} - {}", user, friend);

        Ok(())
    }

    pub async fn friends(&self, user: &UserId) -> Result<Vec<UserId>, RelationError> {
        Ok(self.repo.friends_of(user).await?)
    }

    /// Pending requests where `user` is either party, in both directions.
    pub async fn pending_requests(
        &self,
        user: &UserId,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        Ok(self.repo.pending_requests_for(user).await?)
    }
}
