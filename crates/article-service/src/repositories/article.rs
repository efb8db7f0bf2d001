use super::traits::ArticleRepository;
use crate::errors::ApiError;
use crate::models::{Article, ArticleChanges, NewArticle};
use crate::schema::articles;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

#[derive(Clone)]
pub struct SqliteArticleRepository {
    db: Arc<Mutex<SqliteConnection>>,
}

impl SqliteArticleRepository {
    pub fn new(db: Arc<Mutex<SqliteConnection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, SqliteConnection>, ApiError> {
        self.db.lock().map_err(|_| {
            error!("SQLite connection mutex poisoned");
            ApiError::InternalError
        })
    }
}

#[async_trait]
impl ArticleRepository for SqliteArticleRepository {
    async fn find(&self, id: i32) -> Result<Option<Article>, ApiError> {
        let mut conn = self.conn()?;
        let result = articles::table
            .find(id)
            .select(Article::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn all(&self) -> Result<Vec<Article>, ApiError> {
        let mut conn = self.conn()?;
        let result = articles::table
            .order(articles::id.asc())
            .select(Article::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn create(&self, article: &NewArticle) -> Result<Article, ApiError> {
        let mut conn = self.conn()?;
        let result = diesel::insert_into(articles::table)
            .values(article)
            .returning(Article::as_returning())
            .get_result(&mut *conn)?;
        Ok(result)
    }

    async fn update_fields(
        &self,
        article: &Article,
        changes: &ArticleChanges,
    ) -> Result<Article, ApiError> {
        let mut conn = self.conn()?;
        diesel::update(articles::table.find(article.id))
            .set(changes)
            .returning(Article::as_returning())
            .get_result(&mut *conn)
            .optional()?
            .ok_or(ApiError::NotFound)
    }

    async fn delete(&self, article: &Article) -> Result<(), ApiError> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(articles::table.find(article.id)).execute(&mut *conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
