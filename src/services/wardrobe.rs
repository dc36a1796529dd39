// src/services/wardrobe.rs
use crate::errors::StylistError;
use crate::models::ClothingItem;
use crate::services::storage::{KeyValueStore, WARDROBE_KEY};
use std::sync::Arc;
use uuid::Uuid;

/// Ordered wardrobe collection, mirrored to the key-value store on every change.
pub struct WardrobeStore {
    items: Vec<ClothingItem>,
    store: Arc<dyn KeyValueStore>,
}

impl WardrobeStore {
    pub fn empty(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            items: Vec::new(),
            store,
        }
    }

    /// Loads the persisted wardrobe. Anything unreadable counts as no wardrobe.
    pub async fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let items = match store.get(WARDROBE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ClothingItem>>(&raw) {
                Ok(items) => {
                    log::info!("Restored {} wardrobe items", items.len());
                    items
                }
                Err(e) => {
                    log::warn!("Discarding corrupt persisted wardrobe: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Could not read persisted wardrobe: {}", e);
                Vec::new()
            }
        };
        Self { items, store }
    }

    pub fn all(&self) -> &[ClothingItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&ClothingItem> {
        self.items.iter().find(|item| item.id == *id)
    }

    pub async fn add(&mut self, items: Vec<ClothingItem>) -> Result<(), StylistError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut updated = self.items.clone();
        updated.extend(items);
        self.commit(updated).await
    }

    /// Returns whether an item was removed.
    pub async fn remove(&mut self, id: &Uuid) -> Result<bool, StylistError> {
        let Some(pos) = self.items.iter().position(|item| item.id == *id) else {
            return Ok(false);
        };
        let mut updated = self.items.clone();
        updated.remove(pos);
        self.commit(updated).await?;
        Ok(true)
    }

    pub async fn clear(&mut self) -> Result<(), StylistError> {
        self.store.remove(WARDROBE_KEY).await?;
        self.items.clear();
        Ok(())
    }

    async fn commit(&mut self, updated: Vec<ClothingItem>) -> Result<(), StylistError> {
        let value = serde_json::to_string(&updated)
            .map_err(|e| StylistError::Serialization(e.to_string()))?;
        self.store.set(WARDROBE_KEY, &value).await?;
        self.items = updated;
        Ok(())
    }
}

/// A store whose every call fails.
#[cfg(test)]
pub(crate) struct BrokenStore;

#[cfg(test)]
#[async_trait::async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StylistError> {
        Err(StylistError::Storage("down".into()))
    }
    async fn set(&self, _key: &str, _value: &str) -> Result<(), StylistError> {
        Err(StylistError::Storage("down".into()))
    }
    async fn remove(&self, _key: &str) -> Result<(), StylistError> {
        Err(StylistError::Storage("down".into()))
    }
}

#[cfg(test)]
pub(crate) fn sample_item(category: &str) -> ClothingItem {
    use crate::models::{EncodedImage, Season};

    ClothingItem {
        id: Uuid::new_v4(),
        image: EncodedImage {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        },
        filename: format!("{}.png", category),
        category: category.to_string(),
        primary_color: "navy".to_string(),
        secondary_colors: vec!["white".to_string()],
        style: "casual".to_string(),
        seasons: [Season::Spring, Season::Fall].into_iter().collect(),
        formality: 2,
        pattern: Some("solid".to_string()),
        material: None,
        description: format!("A navy {}", category),
        added_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStore;

    fn memory() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn items_keep_insertion_order() {
        let mut wardrobe = WardrobeStore::empty(memory());
        let shirt = sample_item("shirt");
        let pants = sample_item("pants");
        let shoes = sample_item("shoes");

        wardrobe.add(vec![shirt.clone(), pants.clone()]).await.unwrap();
        wardrobe.add(vec![shoes.clone()]).await.unwrap();

        let ids: Vec<Uuid> = wardrobe.all().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![shirt.id, pants.id, shoes.id]);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let mut wardrobe = WardrobeStore::empty(memory());
        let shirt = sample_item("shirt");
        let pants = sample_item("pants");
        wardrobe.add(vec![shirt.clone(), pants.clone()]).await.unwrap();

        assert!(wardrobe.remove(&shirt.id).await.unwrap());
        assert!(!wardrobe.remove(&shirt.id).await.unwrap());
        assert!(!wardrobe.remove(&Uuid::new_v4()).await.unwrap());

        assert_eq!(wardrobe.len(), 1);
        assert_eq!(wardrobe.all()[0].id, pants.id);
    }

    #[tokio::test]
    async fn restore_round_trips_items() {
        let store = memory();
        let items = vec![sample_item("shirt"), sample_item("pants"), sample_item("shoes")];

        let mut wardrobe = WardrobeStore::empty(store.clone());
        wardrobe.add(items.clone()).await.unwrap();

        let restored = WardrobeStore::restore(store).await;
        assert_eq!(restored.all(), items.as_slice());
    }

    #[tokio::test]
    async fn clear_removes_the_persisted_key() {
        let store = memory();
        let mut wardrobe = WardrobeStore::empty(store.clone());
        wardrobe.add(vec![sample_item("shirt")]).await.unwrap();

        wardrobe.clear().await.unwrap();
        assert!(wardrobe.is_empty());
        assert_eq!(store.get(WARDROBE_KEY).await.unwrap(), None);

        let restored = WardrobeStore::restore(store).await;
        assert!(restored.is_empty());
    }

    #[tokio::test]
    async fn corrupt_value_restores_empty() {
        let store = memory();
        store.set(WARDROBE_KEY, "{not json").await.unwrap();

        let restored = WardrobeStore::restore(store).await;
        assert!(restored.is_empty());
    }

    #[tokio::test]
    async fn failed_write_leaves_items_untouched() {
        let mut wardrobe = WardrobeStore::restore(Arc::new(BrokenStore)).await;
        assert!(wardrobe.is_empty());

        let err = wardrobe.add(vec![sample_item("shirt")]).await.unwrap_err();
        assert!(matches!(err, StylistError::Storage(_)));
        assert!(wardrobe.is_empty());
    }
}
