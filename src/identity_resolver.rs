use crate::domain::UserId;
use crate::repo::RepoError;
use async_trait::async_trait;
use neo4rs::{query, Graph};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("unknown handle: {0}")]
    HandleNotFound(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Seam to the authentication collaborator. The route layer resolves every
/// handle through this before touching an engine; engines only ever see the
/// resulting opaque identity.
#[async_trait]
pub trait ResolveIdentity: Send + Sync {
    async fn resolve_handle(&self, handle: &str) -> Result<UserId, ResolverError>;
}

/// Looks handles up on the `User` nodes the auth service maintains.
pub struct GraphIdentityResolver {
    graph: Graph,
}

impl GraphIdentityResolver {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl ResolveIdentity for GraphIdentityResolver {
    async fn resolve_handle(&self, handle: &str) -> Result<UserId, ResolverError> {
        let statement = r#"
            MATCH (u:User {handle: $handle})
            RETURN u.user_id AS user_id
            LIMIT 1
        "#;
        let mut result = self
            .graph
            .execute(query(statement).param("handle", handle))
            .await
            .map_err(RepoError::from)?;

        match result.next().await.map_err(RepoError::from)? {
            Some(row) => {
                let user_id: String = row.get("user_id")
                    .map_err(|e| RepoError::Malformed(e.to_string()))?;
                Ok(UserId::new(user_id))
            }
            None => Err(ResolverError::HandleNotFound(handle.to_string())),
        }
    }
}
