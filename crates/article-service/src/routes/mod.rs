use crate::AppState;
use axum::{Router, routing::get};

pub mod articles;

async fn health() -> &'static str {
    "OK"
}

pub fn create_router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/health", get(health))
        .merge(articles::create_article_router())
}
