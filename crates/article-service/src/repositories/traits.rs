use crate::errors::ApiError;
use crate::models::{Article, ArticleChanges, NewArticle};
use async_trait::async_trait;

/// Primary-key addressed access to stored articles.
///
/// `update_fields` and `delete` take the record the caller already resolved;
/// if the row has vanished in the meantime they fail with [`ApiError::NotFound`].
#[async_trait]
pub trait ArticleRepository: Clone + Send + Sync + 'static {
    async fn find(&self, id: i32) -> Result<Option<Article>, ApiError>;
    async fn all(&self) -> Result<Vec<Article>, ApiError>;
    async fn create(&self, article: &NewArticle) -> Result<Article, ApiError>;
    async fn update_fields(
        &self,
        article: &Article,
        changes: &ArticleChanges,
    ) -> Result<Article, ApiError>;
    async fn delete(&self, article: &Article) -> Result<(), ApiError>;
}
