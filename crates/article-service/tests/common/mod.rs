#![allow(dead_code)]

use article_service::db::establish_in_memory_connection;
use diesel::sqlite::SqliteConnection;

pub fn establish_test_connection() -> SqliteConnection {
    establish_in_memory_connection().expect("Failed to create in-memory database")
}

pub mod server_utils {
    use super::*;
    use article_service::{DefaultAppState, InMemoryAppState, routes};
    use axum_test::TestServer;
    use std::sync::{Arc, Mutex};

    pub fn create_test_server() -> (TestServer, Arc<Mutex<SqliteConnection>>) {
        let connection = establish_test_connection();
        let db = Arc::new(Mutex::new(connection));

        let state = DefaultAppState::new(db.clone());
        let app = routes::create_router().with_state(state);

        let server = TestServer::new(app).unwrap();
        (server, db)
    }

    pub fn create_in_memory_test_server() -> TestServer {
        let app = routes::create_router().with_state(InMemoryAppState::in_memory());
        TestServer::new(app).unwrap()
    }
}

pub mod test_utils {
    use article_service::models::Article;
    use article_service::schema::articles;
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;

    pub fn count_articles(conn: &mut SqliteConnection) -> i64 {
        articles::table
            .count()
            .get_result(conn)
            .expect("Failed to count articles")
    }

    pub fn get_all_articles(conn: &mut SqliteConnection) -> Vec<Article> {
        articles::table
            .select(Article::as_select())
            .load(conn)
            .expect("Failed to load articles")
    }

    pub fn get_article_by_id(conn: &mut SqliteConnection, id: i32) -> Option<Article> {
        articles::table
            .find(id)
            .select(Article::as_select())
            .first(conn)
            .optional()
            .expect("Failed to query article by id")
    }
}
