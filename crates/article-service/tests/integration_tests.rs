use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use hyper::Method;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::{Service, ServiceExt};

mod common;

mod helpers {
    use super::*;
    use crate::common::establish_test_connection;
    use article_service::{DefaultAppState, create_app};

    pub fn create_test_app() -> (Router, Arc<Mutex<diesel::sqlite::SqliteConnection>>) {
        let connection = establish_test_connection();
        let db = Arc::new(Mutex::new(connection));

        let state = DefaultAppState::new(db.clone());

        let app = create_app(state);
        (app, db)
    }

    pub async fn make_request(
        app: &mut Router,
        request: Request<Body>,
    ) -> Result<(StatusCode, Value)> {
        let response = ServiceExt::<Request<Body>>::ready(app)
            .await?
            .call(request)
            .await?;

        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body_str = String::from_utf8(body_bytes.to_vec())?;

        let json_response: Value = if body_str.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body_str).unwrap_or(json!(body_str))
        };

        Ok((status, json_response))
    }

    pub fn json_request(method: Method, uri: &str, payload: &Value) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))?)
    }

    pub fn empty_request(method: Method, uri: &str) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())?)
    }
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (mut app, _db) = helpers::create_test_app();

    let request = helpers::empty_request(Method::GET, "/health")?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!("OK"));
    Ok(())
}

#[tokio::test]
async fn test_create_article_endpoint() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    let payload = json!({
        "title": "Hello",
        "content": "World",
        "published": true
    });
    let request = helpers::json_request(Method::POST, "/article", &payload)?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], json!(true));
    assert_eq!(response["message"], json!("Article created successfully"));
    assert_eq!(response["article"]["title"], json!("Hello"));
    assert_eq!(response["article"]["content"], json!("World"));
    assert_eq!(response["article"]["published"], json!(true));
    assert!(response["article"]["id"].as_i64().unwrap() > 0);
    assert!(response["article"]["created_at"].is_string());
    assert!(response["article"]["updated_at"].is_string());

    // Verify database state
    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();

        assert_eq!(test_utils::count_articles(&mut conn), 1);

        let id = response["article"]["id"].as_i64().unwrap() as i32;
        let saved = test_utils::get_article_by_id(&mut conn, id)
            .expect("Article should exist in database");
        assert_eq!(saved.title, "Hello");
        assert!(saved.published, "published flag must be persisted");
    }
    Ok(())
}

#[tokio::test]
async fn test_create_without_published_defaults_to_false() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    let payload = json!({"title": "Draft", "content": "Not yet"});
    let request = helpers::json_request(Method::POST, "/article", &payload)?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["article"]["published"], json!(false));

    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();
        let saved = test_utils::get_all_articles(&mut conn);
        assert_eq!(saved.len(), 1);
        assert!(!saved[0].published);
    }
    Ok(())
}

#[tokio::test]
async fn test_create_validation_failure_writes_nothing() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    let payload = json!({"content": "No title", "published": "sometimes"});
    let request = helpers::json_request(Method::POST, "/article", &payload)?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["success"], json!(false));
    assert_eq!(
        response["message"],
        json!("The title field is required. (and 1 more error)")
    );
    assert_eq!(
        response["errors"],
        json!({
            "title": ["The title field is required."],
            "published": ["The published field must be true or false."]
        })
    );

    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();
        assert_eq!(test_utils::count_articles(&mut conn), 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/article")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], json!(false));

    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();
        assert_eq!(test_utils::count_articles(&mut conn), 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported_media_type() -> Result<()> {
    let (mut app, _db) = helpers::create_test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/article")
        .body(Body::from(json!({"title": "t", "content": "c"}).to_string()))?;
    let (status, _) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_non_numeric_ids_are_not_found() -> Result<()> {
    let (mut app, _db) = helpers::create_test_app();

    for uri in ["/article/999", "/article/abc", "/article/-3"] {
        let request = helpers::empty_request(Method::GET, uri)?;
        let (status, response) = helpers::make_request(&mut app, request).await?;

        assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}");
        assert_eq!(
            response,
            json!({"success": false, "message": "Article not found"})
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found_before_validation() -> Result<()> {
    let (mut app, _db) = helpers::create_test_app();

    let request = helpers::json_request(Method::PUT, "/article/42", &json!({}))?;
    let (status, _) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_update_validation_failure_leaves_record_unchanged() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    let request = helpers::json_request(
        Method::POST,
        "/article",
        &json!({"title": "Keep", "content": "Me"}),
    )?;
    let (_, created) = helpers::make_request(&mut app, request).await?;
    let id = created["article"]["id"].as_i64().unwrap() as i32;

    let request = helpers::json_request(
        Method::PUT,
        &format!("/article/{id}"),
        &json!({"title": "Changed"}),
    )?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response["errors"]["content"],
        json!(["The content field is required."])
    );

    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();
        let saved = test_utils::get_article_by_id(&mut conn, id).unwrap();
        assert_eq!(saved.title, "Keep");
        assert_eq!(saved.content, "Me");
    }
    Ok(())
}

#[tokio::test]
async fn test_delete_article_endpoint() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    let request = helpers::json_request(
        Method::POST,
        "/article",
        &json!({"title": "Short lived", "content": "Bye"}),
    )?;
    let (_, created) = helpers::make_request(&mut app, request).await?;
    let id = created["article"]["id"].as_i64().unwrap();

    let request = helpers::empty_request(Method::DELETE, &format!("/article/{id}"))?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response,
        json!({"success": true, "message": "Article deleted successfully"})
    );

    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();
        assert_eq!(test_utils::count_articles(&mut conn), 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_unsupported_method_is_rejected() -> Result<()> {
    let (mut app, _db) = helpers::create_test_app();

    let request = helpers::empty_request(Method::DELETE, "/article")?;
    let (status, _) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn test_storage_failure_is_opaque_internal_error() -> Result<()> {
    use diesel::RunQueryDsl;

    let (mut app, db) = helpers::create_test_app();

    {
        let mut conn = db.lock().unwrap();
        diesel::sql_query("DROP TABLE articles").execute(&mut *conn)?;
    }

    for request in [
        helpers::empty_request(Method::GET, "/article")?,
        helpers::empty_request(Method::GET, "/article/1")?,
        helpers::json_request(
            Method::POST,
            "/article",
            &json!({"title": "t", "content": "c"}),
        )?,
    ] {
        let (status, response) = helpers::make_request(&mut app, request).await?;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response,
            json!({"success": false, "message": "Internal server error"})
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_string_fields_are_stored_trimmed() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    let request = helpers::json_request(
        Method::POST,
        "/article",
        &json!({"title": "  Hello  ", "content": " World\n", "published": " 1"}),
    )?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["article"]["title"], json!("Hello"));
    assert_eq!(response["article"]["content"], json!("World"));
    assert_eq!(response["article"]["published"], json!(true));

    let padded_title = format!("{} ", "x".repeat(255));
    let request = helpers::json_request(
        Method::POST,
        "/article",
        &json!({"title": padded_title, "content": "c"}),
    )?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["article"]["title"], json!("x".repeat(255)));

    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();
        let saved = test_utils::get_all_articles(&mut conn);
        assert_eq!(saved[0].title, "Hello");
        assert_eq!(saved[1].title.len(), 255);
    }
    Ok(())
}

#[tokio::test]
async fn test_empty_body_fails_validation() -> Result<()> {
    let (mut app, db) = helpers::create_test_app();

    for content_type in ["application/json", "text/plain"] {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/article")
            .header("content-type", content_type)
            .body(Body::empty())?;
        let (status, response) = helpers::make_request(&mut app, request).await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{content_type}");
        assert_eq!(
            response["errors"],
            json!({
                "title": ["The title field is required."],
                "content": ["The content field is required."]
            })
        );
    }

    {
        use crate::common::test_utils;
        let mut conn = db.lock().unwrap();
        assert_eq!(test_utils::count_articles(&mut conn), 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_update_unknown_id_with_malformed_body_is_not_found() -> Result<()> {
    let (mut app, _db) = helpers::create_test_app();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/article/42")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let (status, _) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

mod slow {
    use article_service::errors::ApiError;
    use article_service::models::{Article, ArticleChanges, NewArticle};
    use article_service::repositories::{ArticleRepository, InMemoryArticleRepository};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Wraps the in-memory store and stalls every listing.
    #[derive(Clone, Default)]
    pub struct StallingRepository {
        inner: InMemoryArticleRepository,
    }

    #[async_trait]
    impl ArticleRepository for StallingRepository {
        async fn find(&self, id: i32) -> Result<Option<Article>, ApiError> {
            self.inner.find(id).await
        }

        async fn all(&self) -> Result<Vec<Article>, ApiError> {
            tokio::time::sleep(Duration::from_secs(2)).await;
            self.inner.all().await
        }

        async fn create(&self, article: &NewArticle) -> Result<Article, ApiError> {
            self.inner.create(article).await
        }

        async fn update_fields(
            &self,
            article: &Article,
            changes: &ArticleChanges,
        ) -> Result<Article, ApiError> {
            self.inner.update_fields(article, changes).await
        }

        async fn delete(&self, article: &Article) -> Result<(), ApiError> {
            self.inner.delete(article).await
        }
    }
}

#[tokio::test]
async fn test_slow_request_times_out() -> Result<()> {
    use article_service::{RepositoryState, create_served_app, shutdown::ShutdownState};
    use std::time::Duration;

    let state = RepositoryState::with_repository(slow::StallingRepository::default());
    let mut app = create_served_app(state, ShutdownState::new(), Duration::from_millis(50));

    let request = helpers::empty_request(Method::GET, "/article")?;
    let (status, _) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    let request = helpers::json_request(
        Method::POST,
        "/article",
        &json!({"title": "quick", "content": "enough"}),
    )?;
    let (status, _) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_served_app_rejects_requests_after_shutdown_starts() -> Result<()> {
    use article_service::{InMemoryAppState, create_served_app, shutdown::ShutdownState};
    use std::time::Duration;

    let shutdown_state = ShutdownState::new();
    let mut app = create_served_app(
        InMemoryAppState::in_memory(),
        shutdown_state.clone(),
        Duration::from_secs(5),
    );

    shutdown_state.start_shutdown();

    let request = helpers::empty_request(Method::GET, "/article")?;
    let (status, _) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
