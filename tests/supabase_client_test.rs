//! Request shapes of the Supabase-backed stores, checked against a mock
//! PostgREST/Storage server bound to an ephemeral local port.

use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{json, Value};

use postboard::models::{NewPost, PostChanges};
use postboard::store::{
    ObjectStore, RecordStore, StoreError, SupabaseClient, SupabaseObjectStore,
    SupabaseRecordStore,
};

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: String,
    apikey: Option<String>,
    authorization: Option<String>,
    content_type: Option<String>,
    prefer: Option<String>,
    body: Bytes,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

fn header_value(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn post_json(id: i64, post_id: &str) -> Value {
    json!({
        "id": id,
        "post_id": post_id,
        "platform": "Instagram",
        "country": "PH",
        "status": "Available",
        "image_url": null,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": null
    })
}

async fn mock(State(log): State<Log>, req: Request) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or_default().to_string();
    let apikey = header_value(&req, "apikey");
    let authorization = header_value(&req, "authorization");
    let content_type = header_value(&req, "content-type");
    let prefer = header_value(&req, "prefer");
    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap();

    log.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        apikey: apikey.clone(),
        authorization,
        content_type,
        prefer,
        body,
    });

    if apikey.as_deref() == Some("bad-key") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid API key" })),
        )
            .into_response();
    }

    match (method, path.as_str()) {
        (Method::GET, "/rest/v1/posts") => {
            if query.contains("post_id=eq.taken") || query.contains("id=eq.1") {
                Json(json!([post_json(1, "taken")])).into_response()
            } else if query.contains("order=created_at.desc") {
                Json(json!([post_json(2, "newer"), post_json(1, "taken")])).into_response()
            } else {
                Json(json!([])).into_response()
            }
        }
        (Method::POST, "/rest/v1/posts") => {
            (StatusCode::CREATED, Json(json!([post_json(5, "fresh")]))).into_response()
        }
        (Method::PATCH, "/rest/v1/posts") => {
            if query.contains("id=eq.1") {
                let mut post = post_json(1, "taken");
                post["status"] = json!("Sold");
                post["updated_at"] = json!("2024-05-02T10:00:00Z");
                Json(json!([post])).into_response()
            } else {
                Json(json!([])).into_response()
            }
        }
        (Method::DELETE, "/rest/v1/posts") => StatusCode::NO_CONTENT.into_response(),
        (Method::GET, "/storage/v1/bucket") => {
            Json(json!([{ "id": "existing", "name": "existing", "public": true }]))
                .into_response()
        }
        (Method::POST, "/storage/v1/bucket") => Json(json!({ "name": "created" })).into_response(),
        (Method::POST, p) if p.starts_with("/storage/v1/object/full/") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Duplicate", "message": "The resource already exists" })),
        )
            .into_response(),
        (Method::POST, p) if p.starts_with("/storage/v1/object/") => {
            Json(json!({ "Key": p })).into_response()
        }
        (Method::DELETE, p) if p.starts_with("/storage/v1/object/") => {
            Json(json!([])).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_mock() -> (String, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(mock).with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), log)
}

fn last(log: &Log) -> Recorded {
    log.lock().unwrap().last().cloned().unwrap()
}

// ============================================================================
// RECORD STORE
// ============================================================================

#[tokio::test]
async fn list_posts_orders_by_created_at_and_authenticates() {
    let (url, log) = start_mock().await;
    let store = SupabaseRecordStore::new(SupabaseClient::new(&url, "service-key").unwrap());

    let posts = store.list_posts().await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].post_id, "newer");

    let req = last(&log);
    assert_eq!(req.method, Method::GET);
    assert!(req.query.contains("select=*"));
    assert!(req.query.contains("order=created_at.desc"));
    assert_eq!(req.apikey.as_deref(), Some("service-key"));
    assert_eq!(req.authorization.as_deref(), Some("Bearer service-key"));
}

#[tokio::test]
async fn post_id_exists_filters_by_equality() {
    let (url, log) = start_mock().await;
    let store = SupabaseRecordStore::new(SupabaseClient::new(&url, "k").unwrap());

    assert!(store.post_id_exists("taken").await.unwrap());
    assert!(last(&log).query.contains("post_id=eq.taken"));
    assert!(!store.post_id_exists("free").await.unwrap());
}

#[tokio::test]
async fn find_post_returns_none_for_missing_row() {
    let (url, _log) = start_mock().await;
    let store = SupabaseRecordStore::new(SupabaseClient::new(&url, "k").unwrap());

    assert_eq!(store.find_post(1).await.unwrap().unwrap().post_id, "taken");
    assert!(store.find_post(2).await.unwrap().is_none());
}

#[tokio::test]
async fn insert_asks_for_representation() {
    let (url, log) = start_mock().await;
    let store = SupabaseRecordStore::new(SupabaseClient::new(&url, "k").unwrap());

    let new_post = NewPost {
        post_id: "fresh".into(),
        platform: "Instagram".into(),
        country: "PH".into(),
        status: "Available".into(),
        image_url: None,
        created_at: "2024-05-01T10:00:00Z".into(),
    };
    let post = store.insert_post(&new_post).await.unwrap();
    assert_eq!(post.id, 5);

    let req = last(&log);
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.prefer.as_deref(), Some("return=representation"));
    assert_eq!(req.content_type.as_deref(), Some("application/json"));
    let sent: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(sent["post_id"], "fresh");
    assert!(sent["image_url"].is_null());
}

#[tokio::test]
async fn update_targets_id_and_reports_missing_rows() {
    let (url, log) = start_mock().await;
    let store = SupabaseRecordStore::new(SupabaseClient::new(&url, "k").unwrap());

    let changes = PostChanges {
        post_id: "taken".into(),
        platform: "Instagram".into(),
        country: "PH".into(),
        status: "Sold".into(),
        image_url: None,
        updated_at: "2024-05-02T10:00:00Z".into(),
    };
    let post = store.update_post(1, &changes).await.unwrap().unwrap();
    assert_eq!(post.status, "Sold");
    let req = last(&log);
    assert_eq!(req.method, Method::PATCH);
    assert!(req.query.contains("id=eq.1"));

    assert!(store.update_post(9, &changes).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_targets_id() {
    let (url, log) = start_mock().await;
    let store = SupabaseRecordStore::new(SupabaseClient::new(&url, "k").unwrap());

    store.delete_post(3).await.unwrap();
    let req = last(&log);
    assert_eq!(req.method, Method::DELETE);
    assert_eq!(req.path, "/rest/v1/posts");
    assert!(req.query.contains("id=eq.3"));
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let (url, _log) = start_mock().await;
    let store = SupabaseRecordStore::new(SupabaseClient::new(&url, "bad-key").unwrap());

    match store.list_posts().await {
        Err(StoreError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

// ============================================================================
// OBJECT STORE
// ============================================================================

#[tokio::test]
async fn upload_posts_bytes_with_content_type() {
    let (url, log) = start_mock().await;
    let store = SupabaseObjectStore::new(SupabaseClient::new(&url, "k").unwrap(), "post-images");

    store
        .upload("P1_ab.png", Bytes::from_static(b"png-bytes"), "image/png")
        .await
        .unwrap();

    let req = last(&log);
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.path, "/storage/v1/object/post-images/P1_ab.png");
    assert_eq!(req.content_type.as_deref(), Some("image/png"));
    assert_eq!(&req.body[..], b"png-bytes");
    assert_eq!(
        store.public_url("P1_ab.png"),
        format!("{}/storage/v1/object/public/post-images/P1_ab.png", url)
    );
}

#[tokio::test]
async fn upload_error_surfaces_message() {
    let (url, _log) = start_mock().await;
    let store = SupabaseObjectStore::new(SupabaseClient::new(&url, "k").unwrap(), "full");

    let err = store
        .upload("x.png", Bytes::from_static(b"x"), "image/png")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "The resource already exists (status 400)");
}

#[tokio::test]
async fn remove_sends_prefixes() {
    let (url, log) = start_mock().await;
    let store = SupabaseObjectStore::new(SupabaseClient::new(&url, "k").unwrap(), "post-images");

    store.remove("P1_ab.png").await.unwrap();
    let req = last(&log);
    assert_eq!(req.method, Method::DELETE);
    assert_eq!(req.path, "/storage/v1/object/post-images");
    let sent: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(sent, json!({ "prefixes": ["P1_ab.png"] }));
}

#[tokio::test]
async fn ensure_bucket_skips_existing_bucket() {
    let (url, log) = start_mock().await;
    let store = SupabaseObjectStore::new(SupabaseClient::new(&url, "k").unwrap(), "existing");

    store.ensure_bucket().await.unwrap();
    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
}

#[tokio::test]
async fn ensure_bucket_creates_public_bucket() {
    let (url, log) = start_mock().await;
    let store = SupabaseObjectStore::new(SupabaseClient::new(&url, "k").unwrap(), "post-images");

    store.ensure_bucket().await.unwrap();
    let req = last(&log);
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.path, "/storage/v1/bucket");
    let sent: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(sent["name"], "post-images");
    assert_eq!(sent["public"], true);
    assert!(req.content_type.unwrap().starts_with("application/json"));
}
