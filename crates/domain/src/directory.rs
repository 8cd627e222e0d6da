//! Guest lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A guest as known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

/// Read-only view of the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_guest(&self, user_id: UserId) -> Option<Guest>;
}

/// In-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    guests: Arc<RwLock<HashMap<UserId, Guest>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a guest with a fresh id.
    pub async fn register(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone_number: Option<String>,
    ) -> Guest {
        let guest = Guest {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            phone_number,
        };
        self.insert(guest.clone()).await;
        guest
    }

    pub async fn insert(&self, guest: Guest) {
        self.guests.write().await.insert(guest.id, guest);
    }

    pub async fn remove(&self, user_id: UserId) -> Option<Guest> {
        self.guests.write().await.remove(&user_id)
    }

    pub async fn find_by_email(&self, email: &str) -> Option<Guest> {
        self.guests
            .read()
            .await
            .values()
            .find(|g| g.email.eq_ignore_ascii_case(email))
            .cloned()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_guest(&self, user_id: UserId) -> Option<Guest> {
        self.guests.read().await.get(&user_id).cloned()
    }
}
