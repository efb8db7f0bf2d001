use chrono::{NaiveDateTime, SubsecRound, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::validation::ArticleFields;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Article {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::articles)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewArticle {
    /// Builds the row for a validated create payload. An absent `published`
    /// flag is stored as `false`.
    pub fn from_fields(fields: ArticleFields, now: NaiveDateTime) -> Self {
        NewArticle {
            title: fields.title,
            content: fields.content,
            published: fields.published.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Column changes applied by an update. `published: None` leaves the stored
/// flag untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::articles)]
pub struct ArticleChanges {
    pub title: String,
    pub content: String,
    pub published: Option<bool>,
    pub updated_at: NaiveDateTime,
}

impl ArticleChanges {
    pub fn from_fields(fields: ArticleFields, now: NaiveDateTime) -> Self {
        ArticleChanges {
            title: fields.title,
            content: fields.content,
            published: fields.published,
            updated_at: now,
        }
    }

    pub fn apply_to(&self, article: &mut Article) {
        article.title = self.title.clone();
        article.content = self.content.clone();
        if let Some(published) = self.published {
            article.published = published;
        }
        article.updated_at = self.updated_at;
    }
}

/// Current UTC time at the precision SQLite round-trips.
pub fn timestamp_now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}
