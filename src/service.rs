use std::sync::Arc;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};

use crate::error::{AppError, AppResult};
use crate::models::{NewPost, Post, PostChanges, DEFAULT_STATUS};
use crate::store::{ObjectStore, RecordStore};

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// A file part received under the `image` field.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    /// Declared type, else guessed from the name.
    pub fn content_type(&self) -> String {
        match &self.content_type {
            Some(declared) if !declared.is_empty() => declared.clone(),
            _ => mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

/// Fields of a create or update request. `None` means the field was absent.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub post_id: Option<String>,
    pub platform: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    pub image: Option<ImageUpload>,
}

/// Lowercased extension of `file_name` if it is an accepted image type.
/// Only the suffix is checked, never the content.
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn allowed_file(file_name: &str) -> bool {
    allowed_extension(file_name).is_some()
}

/// `{post_id}_{random hex}.{ext}`, with anything outside `[A-Za-z0-9._-]`
/// in the post id replaced so the name is a single URL path segment.
pub fn image_file_name(post_id: &str, ext: &str) -> String {
    let safe_id: String = post_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let token: [u8; 16] = rand::random();
    format!("{}_{}.{}", safe_id, hex::encode(token), ext)
}

/// Object name addressed by a public URL: its last path segment.
pub fn object_name_from_url(image_url: &str) -> &str {
    let path = image_url.split(['?', '#']).next().unwrap_or(image_url);
    path.rsplit('/').next().unwrap_or(path)
}

/// UTC timestamp in ISO-8601, as stored in `created_at`/`updated_at`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub struct PostService {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
}

impl PostService {
    pub fn new(records: Arc<dyn RecordStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { records, objects }
    }

    /// Make sure the image bucket exists. Called once at startup.
    pub async fn prepare_storage(&self) -> AppResult<()> {
        self.objects.ensure_bucket().await?;
        Ok(())
    }

    pub async fn list(&self) -> AppResult<Vec<Post>> {
        Ok(self.records.list_posts().await?)
    }

    pub async fn create(&self, form: PostForm) -> AppResult<Post> {
        let (Some(post_id), Some(platform), Some(country)) = (
            present(form.post_id),
            present(form.platform),
            present(form.country),
        ) else {
            return Err(AppError::Validation("Missing required fields".into()));
        };

        // Not atomic: two concurrent creates can both pass this check
        if self.records.post_id_exists(&post_id).await? {
            return Err(AppError::Validation("Post ID already exists".into()));
        }

        let image_url = match &form.image {
            Some(image) => self.upload_image(image, &post_id).await?,
            None => None,
        };

        let new_post = NewPost {
            post_id,
            platform,
            country,
            status: form.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            image_url,
            created_at: timestamp(),
        };

        match self.records.insert_post(&new_post).await {
            Ok(post) => {
                tracing::info!("Created post {} ({})", post.id, post.post_id);
                Ok(post)
            }
            Err(e) => {
                if let Some(url) = &new_post.image_url {
                    self.delete_image(url).await;
                }
                Err(e.into())
            }
        }
    }

    pub async fn update(&self, id: i64, form: PostForm) -> AppResult<Post> {
        let existing = self
            .records
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

        let post_id = form.post_id.unwrap_or(existing.post_id);
        let mut image_url = existing.image_url;

        if let Some(image) = form.image.filter(|i| allowed_file(&i.file_name)) {
            // The old image goes first; a failed upload leaves the post without one
            if let Some(old) = image_url.take() {
                self.delete_image(&old).await;
            }
            image_url = self.upload_image(&image, &post_id).await?;
        }

        let changes = PostChanges {
            post_id,
            platform: form.platform.unwrap_or(existing.platform),
            country: form.country.unwrap_or(existing.country),
            status: form.status.unwrap_or(existing.status),
            image_url,
            updated_at: timestamp(),
        };

        let post = self
            .records
            .update_post(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".into()))?;
        tracing::info!("Updated post {} ({})", post.id, post.post_id);
        Ok(post)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let existing = self
            .records
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

        self.records.delete_post(id).await?;
        tracing::info!("Deleted post {} ({})", existing.id, existing.post_id);

        if let Some(url) = &existing.image_url {
            self.delete_image(url).await;
        }
        Ok(())
    }

    /// Upload `image` if it is an accepted type and return its public URL.
    /// Files with an empty or disallowed name are skipped (Ok(None)).
    async fn upload_image(&self, image: &ImageUpload, post_id: &str) -> AppResult<Option<String>> {
        let Some(ext) = allowed_extension(&image.file_name) else {
            tracing::debug!("Ignoring image with unsupported name {:?}", image.file_name);
            return Ok(None);
        };

        let name = image_file_name(post_id, &ext);
        self.objects
            .upload(&name, image.data.clone(), &image.content_type())
            .await
            .map_err(AppError::Upload)?;

        Ok(Some(self.objects.public_url(&name)))
    }

    async fn delete_image(&self, image_url: &str) {
        let name = object_name_from_url(image_url);
        if let Err(e) = self.objects.remove(name).await {
            tracing::warn!("Failed to delete image {}: {}", name, e);
        }
    }
}
