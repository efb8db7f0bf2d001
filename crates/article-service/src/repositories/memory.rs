use super::traits::ArticleRepository;
use crate::errors::ApiError;
use crate::models::{Article, ArticleChanges, NewArticle};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Store {
    rows: BTreeMap<i32, Article>,
    last_id: i32,
}

/// Map-backed repository for tests and throwaway instances. Ids increase
/// monotonically and are never reused.
#[derive(Clone, Default)]
pub struct InMemoryArticleRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, ApiError> {
        self.store.lock().map_err(|_| ApiError::InternalError)
    }
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn find(&self, id: i32) -> Result<Option<Article>, ApiError> {
        Ok(self.store()?.rows.get(&id).cloned())
    }

    async fn all(&self) -> Result<Vec<Article>, ApiError> {
        Ok(self.store()?.rows.values().cloned().collect())
    }

    async fn create(&self, article: &NewArticle) -> Result<Article, ApiError> {
        let mut store = self.store()?;
        store.last_id += 1;

        let row = Article {
            id: store.last_id,
            title: article.title.clone(),
            content: article.content.clone(),
            published: article.published,
            created_at: article.created_at,
            updated_at: article.updated_at,
        };
        store.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_fields(
        &self,
        article: &Article,
        changes: &ArticleChanges,
    ) -> Result<Article, ApiError> {
        let mut store = self.store()?;
        let row = store.rows.get_mut(&article.id).ok_or(ApiError::NotFound)?;
        changes.apply_to(row);
        Ok(row.clone())
    }

    async fn delete(&self, article: &Article) -> Result<(), ApiError> {
        self.store()?
            .rows
            .remove(&article.id)
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }
}
