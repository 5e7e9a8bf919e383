//! User directory - Resolves user identifiers to roles and contact details
//!
//! The ledger never stores users itself; it looks them up through this
//! interface for role checks and for notification content.

use crate::{error::EscrowError, EscrowResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Platform role attached to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employer,
    Freelancer,
    Admin,
}

/// Directory record for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// Lookup interface consumed by the ledger
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user id to its profile, or `NotFound`
    async fn lookup(&self, user_id: &str) -> EscrowResult<UserProfile>;
}

/// In-memory directory, used in tests and single-process deployments
#[derive(Default)]
pub struct InMemoryDirectory {
    users: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user record
    pub async fn register(&self, profile: UserProfile) {
        self.users
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn lookup(&self, user_id: &str) -> EscrowResult<UserProfile> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| EscrowError::not_found(format!("User {user_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_lookup() {
        let directory = InMemoryDirectory::new();
        directory
            .register(UserProfile {
                user_id: "emp_1".to_string(),
                display_name: "Priya Sharma".to_string(),
                phone: Some("+15550100".to_string()),
                role: Role::Employer,
            })
            .await;

        let profile = directory.lookup("emp_1").await.unwrap();
        assert_eq!(profile.role, Role::Employer);
        assert_eq!(profile.display_name, "Priya Sharma");

        let err = directory.lookup("missing").await.unwrap_err();
        assert!(matches!(err, EscrowError::NotFound(_)));
    }
}
