pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::models::{NewPost, Post, PostChanges};

pub use self::supabase::{SupabaseClient, SupabaseObjectStore, SupabaseRecordStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Store returned no rows for {0}")]
    Empty(&'static str),

    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The `posts` table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All posts, newest `created_at` first
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError>;

    async fn post_id_exists(&self, post_id: &str) -> Result<bool, StoreError>;

    async fn insert_post(&self, post: &NewPost) -> Result<Post, StoreError>;

    /// Returns None when no row with `id` exists anymore
    async fn update_post(&self, id: i64, changes: &PostChanges)
        -> Result<Option<Post>, StoreError>;

    async fn delete_post(&self, id: i64) -> Result<(), StoreError>;
}

/// A single public bucket of images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the bucket (public) if it does not exist yet
    async fn ensure_bucket(&self) -> Result<(), StoreError>;

    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), StoreError>;

    fn public_url(&self, name: &str) -> String;

    async fn remove(&self, name: &str) -> Result<(), StoreError>;
}
