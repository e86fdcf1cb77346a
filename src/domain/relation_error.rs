use super::user_id::UserId;
use crate::repo::RepoError;
use thiserror::Error;

/// Every expected failure of a relationship operation. These are outcomes
/// of precondition checks, not defects; the route layer maps each kind to a
/// client-facing response and the engines never swallow or retry them.
#[derive(Debug, Error)]
pub enum RelationError {
    #[error("an identity cannot be in a relationship with itself")]
    SelfRelation,

    #[error("a pending request already exists between {0} and {1}")]
    AlreadyRequested(UserId, UserId),

    #[error("{0} and {1} are already friends")]
    AlreadyFriends(UserId, UserId),

    #[error("no pending request from {0} to {1}")]
    RequestNotFound(UserId, UserId),

    #[error("{0} and {1} are not friends")]
    FriendNotFound(UserId, UserId),

    #[error("an identity cannot follow itself")]
    SelfFollow,

    #[error("{0} already follows {1}")]
    AlreadyFollowing(UserId, UserId),

    #[error("{0} does not follow {1}")]
    NotFollowing(UserId, UserId),

    /// Transient store failure. Retrying is the caller's responsibility.
    #[error(transparent)]
    Storage(#[from] RepoError),
}
