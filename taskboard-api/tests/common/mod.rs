//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A router over the in-process store, so no database is needed
//! - Request helpers that return the status and the parsed JSON body
//! - Fixtures that create users, projects and tasks through the API

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{ApiConfig, Config, DatabaseConfig, LoggingConfig};
use taskboard_shared::repositories::Repositories;
use tower::Service as _;
use uuid::Uuid;

/// Password that satisfies the strength policy
pub const PASSWORD: &str = "Kanban#2025";

/// Test context containing all necessary resources
pub struct TestContext {
    pub repos: Repositories,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a context over an empty in-process store
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://unused".to_string(),
                max_connections: 1,
                run_migrations: false,
            },
            logging: LoggingConfig::default(),
        };

        let repos = Repositories::in_memory();
        let state = AppState::new(repos.clone(), config.clone());
        let app = build_router(state);

        TestContext { repos, app, config }
    }

    /// Sends a request and returns the status with the JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| panic!("body is not JSON: {}", String::from_utf8_lossy(&bytes)))
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Creates a user through the API and returns its id
    pub async fn create_user(&self, email: &str) -> Uuid {
        let (status, body) = self.post("/api/users", user_body("kanban", email)).await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {}", body);
        id_of(&body)
    }

    /// Creates a not-yet-started project owned by `user_id`
    pub async fn create_project(&self, user_id: Uuid, name: &str) -> Uuid {
        let (status, body) = self.post("/api/projects", project_body(user_id, name)).await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        id_of(&body)
    }

    /// Creates a Todo task of Medium priority due in `days` days
    pub async fn create_task(&self, project_id: Uuid, user_id: Uuid, title: &str, days: i64) -> Uuid {
        let body = task_body(project_id, user_id, title, in_days(days), "Todo", "Medium");
        let (status, body) = self.post("/api/tasks", body).await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", body);
        id_of(&body)
    }
}

/// RFC 3339 timestamp `days` days from now
pub fn in_days(days: i64) -> String {
    rfc3339(Utc::now() + Duration::days(days))
}

pub fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

pub fn user_body(username: &str, email: &str) -> Value {
    json!({
        "username": username,
        "email": email,
        "password": PASSWORD,
        "phone": "(11)98765-4321",
        "status": "Active",
        "role": "Common"
    })
}

pub fn project_body(user_id: Uuid, name: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} description", name),
        "startDate": rfc3339(Utc::now() + Duration::hours(1)),
        "status": "NotStarted",
        "userId": user_id
    })
}

pub fn task_body(project_id: Uuid, user_id: Uuid, title: &str, due: String, status: &str, priority: &str) -> Value {
    json!({
        "title": title,
        "description": format!("{} description", title),
        "dueDate": due,
        "status": status,
        "priority": priority,
        "projectId": project_id,
        "userId": user_id
    })
}

/// Reads `data.id` from a success envelope
pub fn id_of(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .unwrap_or_else(|| panic!("response has no data.id: {}", body))
}

/// Fields named in a validation error body
pub fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|error| error["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
