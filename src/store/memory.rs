// In-process stores used by the test suite and for failure injection.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::{ObjectStore, RecordStore, StoreError};
use crate::models::{NewPost, Post, PostChanges};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: Vec<Post>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    table: Mutex<Table>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert/update/delete fail with a 500-style API error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 500,
                message: "record store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.check(&self.fail_reads)?;
        let mut posts = self.table.lock().await.rows.clone();
        // Ties: most recently inserted first
        posts.reverse();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        self.check(&self.fail_reads)?;
        let table = self.table.lock().await;
        Ok(table.rows.iter().find(|p| p.id == id).cloned())
    }

    async fn post_id_exists(&self, post_id: &str) -> Result<bool, StoreError> {
        self.check(&self.fail_reads)?;
        let table = self.table.lock().await;
        Ok(table.rows.iter().any(|p| p.post_id == post_id))
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, StoreError> {
        self.check(&self.fail_writes)?;
        let mut table = self.table.lock().await;
        table.next_id += 1;
        let row = Post {
            id: table.next_id,
            post_id: post.post_id.clone(),
            platform: post.platform.clone(),
            country: post.country.clone(),
            status: post.status.clone(),
            image_url: post.image_url.clone(),
            created_at: post.created_at.clone(),
            updated_at: None,
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn update_post(
        &self,
        id: i64,
        changes: &PostChanges,
    ) -> Result<Option<Post>, StoreError> {
        self.check(&self.fail_writes)?;
        let mut table = self.table.lock().await;
        let Some(row) = table.rows.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        row.post_id = changes.post_id.clone();
        row.platform = changes.platform.clone();
        row.country = changes.country.clone();
        row.status = changes.status.clone();
        row.image_url = changes.image_url.clone();
        row.updated_at = Some(changes.updated_at.clone());
        Ok(Some(row.clone()))
    }

    async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        self.check(&self.fail_writes)?;
        self.table.lock().await.rows.retain(|p| p.id != id);
        Ok(())
    }
}

/// An uploaded object: its bytes and declared content type.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    fail_uploads: AtomicBool,
    fail_removes: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(BTreeMap::new()),
            fail_uploads: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub async fn names(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }

    pub async fn get(&self, name: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(name).cloned()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("http://objects.test/post-images")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "object store unavailable".to_string(),
            });
        }
        let mut objects = self.objects.lock().await;
        if objects.contains_key(name) {
            return Err(StoreError::Api {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(
            name.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "object store unavailable".to_string(),
            });
        }
        self.objects.lock().await.remove(name);
        Ok(())
    }
}
