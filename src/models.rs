use serde::{Deserialize, Serialize};

/// Status given to posts created without one.
pub const DEFAULT_STATUS: &str = "Available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub post_id: String,
    pub platform: String,
    pub country: String,
    pub status: String,
    pub image_url: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Row written by create. `id` is assigned by the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub post_id: String,
    pub platform: String,
    pub country: String,
    pub status: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

/// Full set of mutable columns written by update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostChanges {
    pub post_id: String,
    pub platform: String,
    pub country: String,
    pub status: String,
    pub image_url: Option<String>,
    pub updated_at: String,
}
