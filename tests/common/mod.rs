// Utilidades compartilhadas pelos testes de integração.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use lab_backend::{
    config::AppState,
    db::{LabStore, MemoryLabStore},
    models::{
        auth::{Role, User},
        item::{Item, ItemCondition, NewItem},
    },
    routes::build_router,
};

pub const JWT_SECRET: &str = "segredo-de-teste";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub store: Arc<MemoryLabStore>,
    pub staff: User,
    pub student: User,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryLabStore::new());
        let state = AppState::with_store(store.clone(), JWT_SECRET.to_string(), 5);
        let router = build_router(state.clone());

        Self {
            state,
            router,
            store,
            staff: user("Técnico Carlos", Role::Staff),
            student: user("Ana Souza", Role::Student),
        }
    }

    pub async fn seed_item(&self, code: &str, stock: i32) -> Item {
        self.store
            .insert_item(new_item(code, stock))
            .await
            .expect("seed item")
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state
            .auth_service
            .issue_token(user, chrono::Duration::hours(1))
            .expect("issue token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        as_user: Option<&User>,
    ) -> (StatusCode, Value) {
        self.request_with_headers(method, uri, body, as_user, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        as_user: Option<&User>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(user) = as_user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(user)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }
}

pub fn user(name: &str, role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        role,
    }
}

pub fn new_item(code: &str, stock: i32) -> NewItem {
    NewItem {
        code: code.to_string(),
        name: format!("Equipamento {code}"),
        category: "Eletrônica".to_string(),
        condition: ItemCondition::Good,
        location: "Sala 3".to_string(),
        stock,
        description: None,
    }
}
