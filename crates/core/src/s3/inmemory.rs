//! In-memory object store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, ServiceError};

use super::{ObjectStore, ObjectSummary, ObjectTag};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    tags: Vec<ObjectTag>,
}

/// Object store backed by a map, for tests.
///
/// Keys are ordered so listings come back sorted, like S3 listings do.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<(String, String), StoredObject>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object without going through the trait.
    pub async fn insert(&self, bucket: &str, key: &str, body: Vec<u8>, tags: Vec<ObjectTag>) {
        let mut objects = self.objects.write().await;
        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject { body, tags },
        );
    }

    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        let objects = self.objects.read().await;
        objects.contains_key(&(bucket.to_string(), key.to_string()))
    }
}

fn not_found(bucket: &str, key: &str) -> ServiceError {
    ServiceError::NotFound {
        entity_type: "Object",
        id: format!("{}/{}", bucket, key),
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        let objects = self.objects.read().await;
        Ok(objects
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .map(|((_, key), object)| ObjectSummary::new(key.clone(), object.body.len() as i64))
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().await;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
            .ok_or_else(|| not_found(bucket, key))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        tags: &[ObjectTag],
    ) -> Result<()> {
        self.insert(bucket, key, body, tags.to_vec()).await;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn get_object_tags(&self, bucket: &str, key: &str) -> Result<Vec<ObjectTag>> {
        let objects = self.objects.read().await;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.tags.clone())
            .ok_or_else(|| not_found(bucket, key))
    }
}
