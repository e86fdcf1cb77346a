use super::user_id::UserId;
use serde::Serialize;

/// Directed follow relation. There is no reciprocity: an edge from A to B
/// says nothing about B and A. Edges are immutable; the only way to refresh
/// one is to delete and re-create it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowEdge {
    pub follower: UserId,
    pub followee: UserId,
}

impl FollowEdge {
    pub fn new(follower: UserId, followee: UserId) -> Self {
        Self { follower, followee }
    }
}
