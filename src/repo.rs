use crate::domain::{FollowEdge, FriendRequest, RequestStatus, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use neo4rs::{query, Graph, Query, Row};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] neo4rs::Error),

    #[error("malformed record: {0}")]
    Malformed(String),
}

fn malformed(error: impl std::fmt::Display) -> RepoError {
    RepoError::Malformed(error.to_string())
}

/// Persistence seam for the two relationship collections. The engines own
/// every write that goes through here; nothing else in the process touches
/// these records.
#[async_trait]
pub trait RepoTrait: Send + Sync {
    async fn insert_pending_request(&self, request: &FriendRequest) -> Result<(), RepoError>;

    /// Pending request between the pair, matching either direction.
    async fn find_pending_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError>;

    /// Pending request with exactly this direction.
    async fn find_pending(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError>;

    async fn delete_pending_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError>;

    /// All pending requests where `user` is either party.
    async fn pending_requests_for(&self, user: &UserId) -> Result<Vec<FriendRequest>, RepoError>;

    /// Deletes the pending request and creates the friendship in a single
    /// store transaction. Either both happen or neither does.
    async fn promote_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError>;

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, RepoError>;

    async fn friends_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError>;

    async fn delete_friendship(&self, a: &UserId, b: &UserId) -> Result<(), RepoError>;

    async fn insert_follow(&self, edge: &FollowEdge) -> Result<(), RepoError>;

    async fn follow_exists(&self, follower: &UserId, followee: &UserId)
        -> Result<bool, RepoError>;

    async fn delete_follow(&self, follower: &UserId, followee: &UserId) -> Result<(), RepoError>;

    async fn followers_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError>;

    async fn following_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError>;

    /// Count query so callers don't have to materialize the follower list.
    async fn follower_count(&self, user: &UserId) -> Result<u64, RepoError>;
}

pub struct Repo {
    graph: Graph,
}

impl Repo {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Applied once at startup. The uniqueness constraint on `user_id` also
    /// creates the index every per-user query goes through.
    pub async fn ensure_constraints(&self) -> Result<(), RepoError> {
        let statement = r#"
            CREATE CONSTRAINT user_id_unique IF NOT EXISTS
            FOR (u:User) REQUIRE u.user_id IS UNIQUE
        "#;
        self.graph.run(query(statement)).await?;
        Ok(())
    }

    async fn count_query(&self, q: Query) -> Result<u64, RepoError> {
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let count: i64 = row.get("count").map_err(malformed)?;
            Ok(count.max(0) as u64)
        } else {
            Ok(0)
        }
    }

    async fn user_id_query(&self, q: Query) -> Result<Vec<UserId>, RepoError> {
        let mut result = self.graph.execute(q).await?;
        let mut user_ids = Vec::new();
        while let Some(row) = result.next().await? {
            let user_id: String = row.get("user_id").map_err(malformed)?;
            user_ids.push(UserId::new(user_id));
        }
        Ok(user_ids)
    }
}

fn request_from_row(row: &Row) -> Result<FriendRequest, RepoError> {
    let from: String = row.get("from").map_err(malformed)?;
    let to: String = row.get("to").map_err(malformed)?;
    let created_at_secs: i64 = row.get("created_at").map_err(malformed)?;
    let created_at = DateTime::<Utc>::from_timestamp(created_at_secs, 0).unwrap_or_default();

    Ok(FriendRequest {
        from: UserId::new(from),
        to: UserId::new(to),
        status: RequestStatus::Pending,
        created_at,
    })
}

#[async_trait]
impl RepoTrait for Repo {
    async fn insert_pending_request(&self, request: &FriendRequest) -> Result<(), RepoError> {
        debug!(
            "Inserting pending request: from={}, to={}",
            request.from, request.to
        );
        let statement = r#"
            MERGE (a:User {user_id: $from})
            MERGE (b:User {user_id: $to})
            MERGE (a)-[r:PENDING_REQUEST]->(b)
            ON CREATE SET r.created_at = $created_at
        "#;
        self.graph
            .run(
                query(statement)
                    .param("from", request.from.as_str())
                    .param("to", request.to.as_str())
                    .param("created_at", request.created_at.timestamp()),
            )
            .await?;
        Ok(())
    }

    async fn find_pending_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError> {
        let statement = r#"
            MATCH (a:User {user_id: $a})-[r:PENDING_REQUEST]-(b:User {user_id: $b})
            RETURN startNode(r).user_id AS from,
                   endNode(r).user_id AS to,
                   r.created_at AS created_at
            LIMIT 1
        "#;
        let mut result = self
            .graph
            .execute(query(statement).param("a", a.as_str()).param("b", b.as_str()))
            .await?;

        match result.next().await? {
            Some(row) => Ok(Some(request_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_pending(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<Option<FriendRequest>, RepoError> {
        let statement = r#"
            MATCH (a:User {user_id: $from})-[r:PENDING_REQUEST]->(b:User {user_id: $to})
            RETURN a.user_id AS from, b.user_id AS to, r.created_at AS created_at
            LIMIT 1
        "#;
        let mut result = self
            .graph
            .execute(
                query(statement)
                    .param("from", from.as_str())
                    .param("to", to.as_str()),
            )
            .await?;

        match result.next().await? {
            Some(row) => Ok(Some(request_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_pending_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError> {
        debug!("Deleting pending request: from={}, to={}", from, to);
        let statement = r#"
            MATCH (a:User {user_id: $from})-[r:PENDING_REQUEST]->(b:User {user_id: $to})
            DELETE r
        "#;
        self.graph
            .run(
                query(statement)
                    .param("from", from.as_str())
                    .param("to", to.as_str()),
            )
            .await?;
        Ok(())
    }

    async fn pending_requests_for(&self, user: &UserId) -> Result<Vec<FriendRequest>, RepoError> {
        let statement = r#"
            MATCH (u:User {user_id: $user})-[r:PENDING_REQUEST]-(:User)
            RETURN startNode(r).user_id AS from,
                   endNode(r).user_id AS to,
                   r.created_at AS created_at
        "#;
        let mut result = self
            .graph
            .execute(query(statement).param("user", user.as_str()))
            .await?;

        let mut requests = Vec::new();
        while let Some(row) = result.next().await? {
            requests.push(request_from_row(&row)?);
        }
        Ok(requests)
    }

    async fn promote_request(&self, from: &UserId, to: &UserId) -> Result<(), RepoError> {
        debug!("Promoting request to friendship: from={}, to={}", from, to);
        let delete_request = query(
            r#"
            MATCH (a:User {user_id: $from})-[r:PENDING_REQUEST]->(b:User {user_id: $to})
            DELETE r
        "#,
        )
        .param("from", from.as_str())
        .param("to", to.as_str());

        let create_friendship = query(
            r#"
            MATCH (a:User {user_id: $from}), (b:User {user_id: $to})
            MERGE (a)-[:FRIENDS_WITH]-(b)
        "#,
        )
        .param("from", from.as_str())
        .param("to", to.as_str());

        let mut txn = self.graph.start_txn().await?;
        txn.run_queries(vec![delete_request, create_friendship])
            .await?;
        txn.commit().await?;
        Ok(())
    }

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, RepoError> {
        let statement = r#"
            MATCH (a:User {user_id: $a})-[r:FRIENDS_WITH]-(b:User {user_id: $b})
            RETURN count(r) AS count
        "#;
        let count = self
            .count_query(query(statement).param("a", a.as_str()).param("b", b.as_str()))
            .await?;
        Ok(count > 0)
    }

    async fn friends_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        let statement = r#"
            MATCH (u:User {user_id: $user})-[:FRIENDS_WITH]-(f:User)
            RETURN f.user_id AS user_id
        "#;
        self.user_id_query(query(statement).param("user", user.as_str()))
            .await
    }

    async fn delete_friendship(&self, a: &UserId, b: &UserId) -> Result<(), RepoError> {
        debug!("Deleting friendship: a={}, b={}", a, b);
        let statement = r#"
            MATCH (a:User {user_id: $a})-[r:FRIENDS_WITH]-(b:User {user_id: $b})
            DELETE r
        "#;
        self.graph
            .run(query(statement).param("a", a.as_str()).param("b", b.as_str()))
            .await?;
        Ok(())
    }

    async fn insert_follow(&self, edge: &FollowEdge) -> Result<(), RepoError> {
        debug!(
            "Inserting follow: follower={}, followee={}",
            edge.follower, edge.followee
        );
        let statement = r#"
            MERGE (a:User {user_id: $follower})
            MERGE (b:User {user_id: $followee})
            MERGE (a)-[:FOLLOWS]->(b)
        "#;
        self.graph
            .run(
                query(statement)
                    .param("follower", edge.follower.as_str())
                    .param("followee", edge.followee.as_str()),
            )
            .await?;
        Ok(())
    }

    async fn follow_exists(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, RepoError> {
        let statement = r#"
            MATCH (a:User {user_id: $follower})-[r:FOLLOWS]->(b:User {user_id: $followee})
            RETURN count(r) AS count
        "#;
        let count = self
            .count_query(
                query(statement)
                    .param("follower", follower.as_str())
                    .param("followee", followee.as_str()),
            )
            .await?;
        Ok(count > 0)
    }

    async fn delete_follow(&self, follower: &UserId, followee: &UserId) -> Result<(), RepoError> {
        debug!(
            "Deleting follow: follower={}, followee={}",
            follower, followee
        );
        let statement = r#"
            MATCH (a:User {user_id: $follower})-[r:FOLLOWS]->(b:User {user_id: $followee})
            DELETE r
        "#;
        self.graph
            .run(
                query(statement)
                    .param("follower", follower.as_str())
                    .param("followee", followee.as_str()),
            )
            .await?;
        Ok(())
    }

    async fn followers_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        let statement = r#"
            MATCH (f:User)-[:FOLLOWS]->(u:User {user_id: $user})
            RETURN f.user_id AS user_id
        "#;
        self.user_id_query(query(statement).param("user", user.as_str()))
            .await
    }

    async fn following_of(&self, user: &UserId) -> Result<Vec<UserId>, RepoError> {
        let statement = r#"
            MATCH (u:User {user_id: $user})-[:FOLLOWS]->(f:User)
            RETURN f.user_id AS user_id
        "#;
        self.user_id_query(query(statement).param("user", user.as_str()))
            .await
    }

    async fn follower_count(&self, user: &UserId) -> Result<u64, RepoError> {
        let statement = r#"
            MATCH (:User)-[r:FOLLOWS]->(u:User {user_id: $user})
            RETURN count(r) AS count
        "#;
        self.count_query(query(statement).param("user", user.as_str()))
            .await
    }
}
