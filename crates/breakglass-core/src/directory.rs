//! User directory collaborator contract.
//!
//! The directory is an external system; this core only needs identity
//! resolution and the admin roster. [`InMemoryUserDirectory`] backs tests
//! and local wiring.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, TicketError};

/// A user as resolved by the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Directory identifier.
    pub id: Uuid,
    /// Delivery address for notifications.
    pub email: String,
    /// Human-readable name.
    pub display_name: String,
    /// Whether the user holds the admin capability.
    pub is_admin: bool,
    /// Organizational department.
    pub department: String,
}

/// Resolves user identities and the current admin roster.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// List all users holding the admin capability.
    async fn list_admins(&self) -> Result<Vec<User>>;
}

/// The single authorization check for privileged operations.
///
/// Returns [`TicketError::UserNotFound`] when the id does not resolve and
/// [`TicketError::Forbidden`] when the user lacks the admin capability.
pub async fn require_admin(directory: &dyn UserDirectory, user_id: Uuid) -> Result<User> {
    let user = directory
        .find_by_id(user_id)
        .await?
        .ok_or(TicketError::UserNotFound(user_id))?;
    if !user.is_admin {
        return Err(TicketError::Forbidden(user_id));
    }
    Ok(user)
}

/// In-memory user directory for testing.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, returning its id.
    pub async fn add_user(&self, user: User) -> Uuid {
        let id = user.id;
        self.users.write().await.insert(id, user);
        id
    }

    /// Remove all users.
    pub async fn clear(&self) {
        self.users.write().await.clear();
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.is_admin)
            .cloned()
            .collect())
    }
}
