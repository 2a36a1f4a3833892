use std::sync::Arc;

use crate::service::PostService;

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
}

impl AppState {
    pub fn new(posts: PostService) -> Self {
        Self {
            posts: Arc::new(posts),
        }
    }
}
