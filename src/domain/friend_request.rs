use super::user_id::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    // Accept and reject delete the record, so the terminal statuses never
    // reach storage.
    #[allow(unused)]
    Accepted,
    #[allow(unused)]
    Rejected,
}

/// Used as the DB record. A request only ever lives in storage while
/// pending; accept and reject both delete it rather than flipping the
/// status in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendRequest {
    pub from: UserId,
    pub to: UserId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn pending(from: UserId, to: UserId) -> Self {
        Self {
            from,
            to,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, user: &UserId) -> bool {
        &self.from == user || &self.to == user
    }

    /// True when the request is between the given pair, in either direction.
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }
}
