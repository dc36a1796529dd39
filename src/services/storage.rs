// src/services/storage.rs
use crate::errors::StylistError;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::sync::Mutex;

pub const WARDROBE_KEY: &str = "wardrobe";
pub const CREDENTIAL_KEY: &str = "gemini_api_key";

/// Durable string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StylistError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StylistError>;
    async fn remove(&self, key: &str) -> Result<(), StylistError>;
}

pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self, StylistError> {
        let client = Client::open(redis_url).map_err(|e| StylistError::Storage(e.to_string()))?;

        // Test connection
        let mut conn = client
            .get_async_connection()
            .await
            .map_err(|e| StylistError::Storage(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| StylistError::Storage(e.to_string()))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::Connection, StylistError> {
        self.client
            .get_async_connection()
            .await
            .map_err(|e| StylistError::Storage(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StylistError> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| StylistError::Storage(format!("GET {}: {}", key, e)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StylistError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| StylistError::Storage(format!("SET {}: {}", key, e)))
    }

    async fn remove(&self, key: &str) -> Result<(), StylistError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| StylistError::Storage(format!("DEL {}: {}", key, e)))
    }
}

/// Process-local store, used in tests and when Redis is unreachable.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StylistError> {
        self.entries
            .lock()
            .map_err(|_| StylistError::Storage("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StylistError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StylistError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StylistError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

pub async fn load_credential(store: &dyn KeyValueStore) -> Option<String> {
    match store.get(CREDENTIAL_KEY).await {
        Ok(value) => value.filter(|k| !k.trim().is_empty()),
        Err(e) => {
            log::warn!("Could not read stored API key: {}", e);
            None
        }
    }
}

pub async fn save_credential(store: &dyn KeyValueStore, api_key: &str) -> Result<(), StylistError> {
    store.set(CREDENTIAL_KEY, api_key).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_and_removes() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn credential_absence_is_not_an_error() {
        let store = MemoryStore::new();
        assert_eq!(load_credential(&store).await, None);

        save_credential(&store, "secret").await.unwrap();
        assert_eq!(load_credential(&store).await.as_deref(), Some("secret"));

        store.set(CREDENTIAL_KEY, "  ").await.unwrap();
        assert_eq!(load_credential(&store).await, None);
    }
}
