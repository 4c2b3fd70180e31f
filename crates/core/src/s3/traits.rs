use async_trait::async_trait;

use crate::error::Result;

use super::{ObjectSummary, ObjectTag};

/// Object storage operations used by the document pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object of a bucket.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>>;

    /// Reads the full body of an object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Writes an object together with its tags.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        tags: &[ObjectTag],
    ) -> Result<()>;

    /// Deletes an object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Reads the tag set of an object.
    async fn get_object_tags(&self, bucket: &str, key: &str) -> Result<Vec<ObjectTag>>;
}
