use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyAdminError {
    #[error("API key cannot be empty")]
    InvalidInput,
    #[error("API key already exists")]
    AlreadyExists,
    #[error("API key does not exist")]
    NotFound,
}

/// The set of API keys allowed to call the weather endpoint.
///
/// Keys live in memory only; the seed set comes from configuration at
/// startup and the admin endpoints mutate it at runtime.
pub struct ApiKeyStore {
    keys: RwLock<HashSet<String>>,
}

impl ApiKeyStore {
    pub fn new(seed_keys: impl IntoIterator<Item = String>) -> Self {
        let keys: HashSet<String> = seed_keys.into_iter().collect();
        tracing::info!("API key store initialized with {} keys", keys.len());
        Self {
            keys: RwLock::new(keys),
        }
    }

    /// Membership test, no side effects.
    pub async fn is_valid(&self, api_key: &str) -> bool {
        self.keys.read().await.contains(api_key)
    }

    pub async fn add(&self, api_key: &str) -> Result<(), KeyAdminError> {
        if api_key.trim().is_empty() {
            return Err(KeyAdminError::InvalidInput);
        }
        let mut keys = self.keys.write().await;
        if !keys.insert(api_key.to_string()) {
            tracing::warn!("Attempted to add an already existing API key: {}", api_key);
            return Err(KeyAdminError::AlreadyExists);
        }
        tracing::info!("Added new API key: {}", api_key);
        Ok(())
    }

    pub async fn delete(&self, api_key: &str) -> Result<(), KeyAdminError> {
        let mut keys = self.keys.write().await;
        if !keys.remove(api_key) {
            tracing::warn!("Attempted to delete a non-existent API key: {}", api_key);
            return Err(KeyAdminError::NotFound);
        }
        tracing::info!("Deleted API key: {}", api_key);
        Ok(())
    }

    /// Snapshot copy; later mutations do not affect a returned set.
    pub async fn list(&self) -> HashSet<String> {
        self.keys.read().await.clone()
    }
}
