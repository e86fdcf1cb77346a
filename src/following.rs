use crate::domain::{FollowEdge, RelationError, UserId};
use crate::metrics;
use crate::pair_lock::{PairKey, PairLocks};
use crate::repo::RepoTrait;
use std::sync::Arc;
use tracing::debug;

/// Directed follow edges. No state machine here: an edge is present or it
/// is not, and redundant operations fail with a precondition error instead of
/// silently succeeding, matching the friending engine's philosophy.
///
/// Locks are keyed by the ordered pair because A->B and B->A are independent
/// edges.
pub struct FollowingEngine<T>
where
    T: RepoTrait,
{
    repo: Arc<T>,
    pair_locks: PairLocks,
}

impl<T> FollowingEngine<T>
where
    T: RepoTrait,
{
    pub fn new(repo: Arc<T>) -> Self {
        Self {
            repo,
            pair_locks: PairLocks::new(),
        }
    }

    pub async fn follow_user(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<FollowEdge, RelationError> {
        if follower == followee {
            return Err(RelationError::SelfFollow);
        }

        let _guard = self
            .pair_locks
            .acquire(PairKey::ordered(follower, followee))
            .await;

        if self.repo.follow_exists(follower, followee).await? {
            return Err(RelationError::AlreadyFollowing(
                follower.clone(),
                followee.clone(),
            ));
        }

        let edge = FollowEdge::new(follower.clone(), followee.clone());
        self.repo.insert_follow(&edge).await?;
        metrics::follows().increment(1);
        debug!("Followed: {} -> {}", follower, followee);

        Ok(edge)
    }

    pub async fn unfollow_user(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<(), RelationError> {
        let _guard = self
            .pair_locks
            .acquire(PairKey::ordered(follower, followee))
            .await;

        if !self.repo.follow_exists(follower, followee).await? {
            return Err(RelationError::NotFollowing(
                follower.clone(),
                followee.clone(),
            ));
        }

        self.repo.delete_follow(follower, followee).await?;
        metrics::unfollows().increment(1);
        debug!("Unfollowed: {} -> {}", follower, followee);

        Ok(())
    }

    pub async fn followers(&self, user: &UserId) -> Result<Vec<UserId>, RelationError> {
        Ok(self.repo.followers_of(user).await?)
    }

    pub async fn following(&self, user: &UserId) -> Result<Vec<UserId>, RelationError> {
        Ok(self.repo.following_of(user).await?)
    }

    pub async fn follower_count(&self, user: &UserId) -> Result<u64, RelationError> {
        Ok(self.repo.follower_count(user).await?)
    }

    /// Part of the engine contract even though no route currently calls it.
    pub async fn is_following(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, RelationError> {
        Ok(self.repo.follow_exists(follower, followee).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryRepo;
    use pretty_assertions::assert_eq;

    fn engine() -> FollowingEngine<MemoryRepo> {
        FollowingEngine::new(Arc::new(MemoryRepo::default()))
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn bob() -> UserId {
        UserId::new("bob")
    }

    #[tokio::test]
    async fn follow_creates_a_directed_edge() {
        let engine = engine();

        engine.follow_user(&alice(), &bob()).await.unwrap();

        assert_eq!(engine.followers(&bob()).await.unwrap(), vec![alice()]);
        assert_eq!(engine.following(&alice()).await.unwrap(), vec![bob()]);
        assert!(engine.is_following(&alice(), &bob()).await.unwrap());
        assert!(!engine.is_following(&bob(), &alice()).await.unwrap());
    }

    #[tokio::test]
    async fn self_follow_fails() {
        let engine = engine();

        let result = engine.follow_user(&alice(), &alice()).await;
        assert!(matches!(result, Err(RelationError::SelfFollow)));
    }

    #[tokio::test]
    async fn duplicate_follow_fails() {
        let engine = engine();

        engine.follow_user(&alice(), &bob()).await.unwrap();

        let result = engine.follow_user(&alice(), &bob()).await;
        assert!(matches!(result, Err(RelationError::AlreadyFollowing(..))));
    }

    #[tokio::test]
    async fn both_directions_are_independent() {
        let engine = engine();

        engine.follow_user(&alice(), &bob()).await.unwrap();
        engine.follow_user(&bob(), &alice()).await.unwrap();

        engine.unfollow_user(&alice(), &bob()).await.unwrap();

        // Removing A->B leaves B->A untouched.
        assert!(engine.is_following(&bob(), &alice()).await.unwrap());
        assert!(!engine.is_following(&alice(), &bob()).await.unwrap());
    }

    #[tokio::test]
    async fn unfollow_without_an_edge_fails() {
        let engine = engine();

        let result = engine.unfollow_user(&alice(), &bob()).await;
        assert!(matches!(result, Err(RelationError::NotFollowing(..))));
    }

    #[tokio::test]
    async fn follower_count_matches_the_follower_list() {
        let engine = engine();
        let followers = ["bob", "carol", "dave"];

        for follower in followers {
            engine
                .follow_user(&UserId::new(follower), &alice())
                .await
                .unwrap();
        }

        let listed = engine.followers(&alice()).await.unwrap();
        let count = engine.follower_count(&alice()).await.unwrap();
        assert_eq!(count, listed.len() as u64);
        assert_eq!(count, followers.len() as u64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_follows_create_exactly_one_edge() {
        let engine = Arc::new(FollowingEngine::new(Arc::new(MemoryRepo::default())));

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.follow_user(&alice(), &bob()).await }
        });
        let second = tokio::spawn({
            let engine = engine.clone();
            async move { engine.follow_user(&alice(), &bob()).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(successes, 1);
        assert_eq!(engine.follower_count(&bob()).await.unwrap(), 1);
    }
}
