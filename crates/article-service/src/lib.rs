use axum::{Router, http::StatusCode};
use diesel::sqlite::SqliteConnection;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub mod config;
pub mod db;
pub mod errors;
pub mod extractors;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod shutdown;
pub mod validation;

use repositories::{ArticleRepository, InMemoryArticleRepository, SqliteArticleRepository};
use shutdown::{GracefulShutdownLayer, ShutdownState};

/// Per-request context handed to every handler through axum's `State`.
pub trait AppState: Clone + Send + Sync + 'static {
    type ArticleRepo: ArticleRepository;

    fn article_repo(&self) -> Self::ArticleRepo;
}

#[derive(Clone)]
pub struct RepositoryState<R> {
    articles: R,
}

impl<R: ArticleRepository> RepositoryState<R> {
    pub fn with_repository(articles: R) -> Self {
        Self { articles }
    }
}

impl<R: ArticleRepository> AppState for RepositoryState<R> {
    type ArticleRepo = R;

    fn article_repo(&self) -> R {
        self.articles.clone()
    }
}

pub type DefaultAppState = RepositoryState<SqliteArticleRepository>;
pub type InMemoryAppState = RepositoryState<InMemoryArticleRepository>;

impl DefaultAppState {
    pub fn new(db: Arc<Mutex<SqliteConnection>>) -> Self {
        Self::with_repository(SqliteArticleRepository::new(db))
    }
}

impl InMemoryAppState {
    pub fn in_memory() -> Self {
        Self::with_repository(InMemoryArticleRepository::new())
    }
}

pub fn create_app<S: AppState>(state: S) -> Router {
    routes::create_router().with_state(state)
}

/// Router wrapped in the production middleware: request tracing, graceful
/// shutdown and a per-request timeout answered with 408.
pub fn create_served_app<S: AppState>(
    state: S,
    shutdown_state: ShutdownState,
    request_timeout: Duration,
) -> Router {
    routes::create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(GracefulShutdownLayer::new(shutdown_state))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
        .with_state(state)
}
