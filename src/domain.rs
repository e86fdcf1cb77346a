pub mod follow_edge;
pub use follow_edge::FollowEdge;

pub mod friend_request;
pub use friend_request::{FriendRequest, RequestStatus};

pub mod relation_error;
pub use relation_error::RelationError;

pub mod user_id;
pub use user_id::UserId;
