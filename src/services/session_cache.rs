//! Cache chiave/valore con TTL davanti al session store

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::AuthError;

/// Cache veloce delle sessioni. Ottimizzazione, mai fonte di verità.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Valore JSON salvato sotto `key`, se presente e non scaduto
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Sovrascrive `key` con `value` per `ttl`
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), AuthError>;

    async fn delete(&self, key: &str) -> Result<(), AuthError>;
}

/// Cache in memoria di processo
pub struct MemorySessionCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Rimuove le voci scadute, restituisce quante ne ha eliminate
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), AuthError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| AuthError::Cache(format!("TTL fuori scala: {:?}", ttl)))?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
