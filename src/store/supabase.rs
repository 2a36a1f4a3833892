// Supabase-backed stores: PostgREST for the posts table, Storage for images.
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ObjectStore, RecordStore, StoreError};
use crate::models::{NewPost, Post, PostChanges};

const POSTS_TABLE: &str = "posts";

/// Authenticated HTTP handle to one Supabase project, shared by both stores.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base: Url,
    key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, key: &str) -> Result<Self, StoreError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            key: key.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in new(): the base URL always has path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    fn table(&self, table: &str) -> Url {
        self.endpoint(&["rest", "v1", table])
    }
}

/// Turn a non-2xx response into `StoreError::Api`.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message: api_message(&body),
    })
}

/// PostgREST reports `message`, Storage reports `error`/`message`, and the
/// gateway sometimes `msg`. Fall back to the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "msg"]
                .iter()
                .find_map(|key| value.get(*key)?.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

async fn rows(response: Response) -> Result<Vec<Post>, StoreError> {
    let body = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

// --- Record store ---

pub struct SupabaseRecordStore {
    client: SupabaseClient,
}

impl SupabaseRecordStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn select_eq(&self, column: &str, value: &str) -> Result<Vec<Post>, StoreError> {
        let response = self
            .client
            .request(Method::GET, self.client.table(POSTS_TABLE))
            .query(&[("select", "*".to_string()), (column, format!("eq.{}", value))])
            .send()
            .await?;
        rows(response).await
    }
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let response = self
            .client
            .request(Method::GET, self.client.table(POSTS_TABLE))
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        rows(response).await
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let mut found = self.select_eq("id", &id.to_string()).await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    async fn post_id_exists(&self, post_id: &str) -> Result<bool, StoreError> {
        Ok(!self.select_eq("post_id", post_id).await?.is_empty())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, StoreError> {
        let response = self
            .client
            .request(Method::POST, self.client.table(POSTS_TABLE))
            .header("Prefer", "return=representation")
            .json(post)
            .send()
            .await?;
        rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::Empty("insert"))
    }

    async fn update_post(
        &self,
        id: i64,
        changes: &PostChanges,
    ) -> Result<Option<Post>, StoreError> {
        let response = self
            .client
            .request(Method::PATCH, self.client.table(POSTS_TABLE))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(changes)
            .send()
            .await?;
        Ok(rows(response).await?.into_iter().next())
    }

    async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        let response = self
            .client
            .request(Method::DELETE, self.client.table(POSTS_TABLE))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

// --- Object store ---

#[derive(Deserialize)]
struct Bucket {
    name: String,
}

#[derive(Serialize)]
struct CreateBucket<'a> {
    id: &'a str,
    name: &'a str,
    public: bool,
}

#[derive(Serialize)]
struct RemoveObjects<'a> {
    prefixes: [&'a str; 1],
}

pub struct SupabaseObjectStore {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseObjectStore {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn ensure_bucket(&self) -> Result<(), StoreError> {
        let url = self.client.endpoint(&["storage", "v1", "bucket"]);

        let response = self.client.request(Method::GET, url.clone()).send().await?;
        let body = check(response).await?.bytes().await?;
        let buckets: Vec<Bucket> = serde_json::from_slice(&body)?;
        if buckets.iter().any(|b| b.name == self.bucket) {
            return Ok(());
        }

        tracing::info!("Creating storage bucket: {}", self.bucket);
        let response = self
            .client
            .request(Method::POST, url)
            .json(&CreateBucket {
                id: &self.bucket,
                name: &self.bucket,
                public: true,
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        let url = self
            .client
            .endpoint(&["storage", "v1", "object", &self.bucket, name]);
        let response = self
            .client
            .request(Method::POST, url)
            .header(header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        self.client
            .endpoint(&["storage", "v1", "object", "public", &self.bucket, name])
            .to_string()
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        let url = self
            .client
            .endpoint(&["storage", "v1", "object", &self.bucket]);
        let response = self
            .client
            .request(Method::DELETE, url)
            .json(&RemoveObjects { prefixes: [name] })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
