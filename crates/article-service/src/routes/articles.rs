use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::errors::ApiError;
use crate::extractors::JsonBody;
use crate::models::{Article, ArticleChanges, NewArticle, timestamp_now};
use crate::validation::validate_article;
use crate::{AppState, repositories::ArticleRepository};

pub const CREATED_MESSAGE: &str = "Article created successfully";
pub const UPDATED_MESSAGE: &str = "Article updated successfully";
pub const DELETED_MESSAGE: &str = "Article deleted successfully";

/// Success envelope shared by every article endpoint.
#[derive(Debug, Serialize)]
pub struct ArticleResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    article: Option<T>,
}

impl<T> ArticleResponse<T> {
    fn article(article: T) -> Self {
        Self {
            success: true,
            message: None,
            article: Some(article),
        }
    }

    fn with_message(message: &'static str, article: T) -> Self {
        Self {
            success: true,
            message: Some(message),
            article: Some(article),
        }
    }
}

impl ArticleResponse<()> {
    fn message(message: &'static str) -> Self {
        Self {
            success: true,
            message: Some(message),
            article: None,
        }
    }
}

/// Looks up the record a `{id}` path segment names. Segments that are not
/// integers cannot name a record and resolve to `NotFound` as well.
pub async fn resolve_article<R: ArticleRepository>(
    repo: &R,
    raw_id: &str,
) -> Result<Article, ApiError> {
    let Ok(id) = raw_id.parse::<i32>() else {
        debug!(raw_id, "Path segment is not an article id");
        return Err(ApiError::NotFound);
    };

    match repo.find(id).await? {
        Some(article) => Ok(article),
        None => {
            debug!(id, "Article not found");
            Err(ApiError::NotFound)
        }
    }
}

#[instrument(skip_all)]
async fn list_articles<S: AppState>(
    State(state): State<S>,
) -> Result<ResponseJson<ArticleResponse<Vec<Article>>>, ApiError> {
    debug!("Processing list articles request");

    let articles = state.article_repo().all().await?;

    info!(count = articles.len(), "Successfully retrieved articles");
    Ok(ResponseJson(ArticleResponse::article(articles)))
}

#[instrument(skip_all, fields(id = %id))]
async fn get_article<S: AppState>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ArticleResponse<Article>>, ApiError> {
    debug!("Processing get article request");

    let article = resolve_article(&state.article_repo(), &id).await?;

    info!(id = article.id, "Successfully retrieved article");
    Ok(ResponseJson(ArticleResponse::article(article)))
}

#[instrument(skip_all)]
async fn create_article<S: AppState>(
    State(state): State<S>,
    JsonBody(body): JsonBody,
) -> Result<ResponseJson<ArticleResponse<Article>>, ApiError> {
    debug!("Processing create article request");

    let fields = validate_article(&body).inspect_err(|errors| {
        warn!(failed_fields = errors.len(), "Article payload failed validation");
    })?;

    let new_article = NewArticle::from_fields(fields, timestamp_now());
    let article = state.article_repo().create(&new_article).await?;

    info!(
        id = article.id,
        published = article.published,
        "Successfully created article"
    );
    Ok(ResponseJson(ArticleResponse::with_message(
        CREATED_MESSAGE,
        article,
    )))
}

#[instrument(skip_all, fields(id = %id))]
async fn update_article<S: AppState>(
    State(state): State<S>,
    Path(id): Path<String>,
    payload: Result<JsonBody, ApiError>,
) -> Result<ResponseJson<ArticleResponse<Article>>, ApiError> {
    debug!("Processing update article request");

    let repo = state.article_repo();
    let existing = resolve_article(&repo, &id).await?;

    let JsonBody(body) = payload?;

    let fields = validate_article(&body).inspect_err(|errors| {
        warn!(failed_fields = errors.len(), "Article payload failed validation");
    })?;

    let changes = ArticleChanges::from_fields(fields, timestamp_now());
    let article = repo.update_fields(&existing, &changes).await?;

    info!(id = article.id, "Successfully updated article");
    Ok(ResponseJson(ArticleResponse::with_message(
        UPDATED_MESSAGE,
        article,
    )))
}

#[instrument(skip_all, fields(id = %id))]
async fn delete_article<S: AppState>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ArticleResponse<()>>, ApiError> {
    debug!("Processing delete article request");

    let repo = state.article_repo();
    let existing = resolve_article(&repo, &id).await?;
    repo.delete(&existing).await?;

    info!(id = existing.id, "Successfully deleted article");
    Ok(ResponseJson(ArticleResponse::message(DELETED_MESSAGE)))
}

pub fn create_article_router<S: AppState>() -> Router<S> {
    Router::new()
        .route(
            "/article",
            get(list_articles::<S>).post(create_article::<S>),
        )
        .route(
            "/article/{id}",
            get(get_article::<S>)
                .put(update_article::<S>)
                .delete(delete_article::<S>),
        )
}
