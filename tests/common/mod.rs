//! Shared fixtures for integration tests
//!
//! Everything runs against the in-memory store; no MongoDB is needed.

#![allow(dead_code)]

mod failing;

pub use failing::FailingCounters;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use signlearn::config::Args;
use signlearn::db::schemas::{Course, Package, UserDoc};
use signlearn::engine::{ConsistencyEngine, EnrollmentCounting};
use signlearn::routes;
use signlearn::seed::CatalogSeed;
use signlearn::server::AppState;
use signlearn::store::{AccountStore, MemoryStore, Store};

pub const CATALOG: &str = r#"{
    "courses": [
        { "id": "asl-alphabet", "title": "ASL Alphabet", "description": "Fingerspell every letter",
          "ageGroup": "5-10", "category": "basics", "difficulty": "beginner",
          "tags": ["letters", "fingerspelling"] },
        { "id": "family-signs", "title": "Family Signs", "description": "Mom, dad and everyone else",
          "ageGroup": "1-4", "category": "family", "difficulty": "beginner", "tags": ["home"] },
        { "id": "daily-talk", "title": "Everyday Conversations", "description": "Small talk in ASL",
          "ageGroup": "15+", "category": "conversation", "difficulty": "intermediate",
          "tags": ["greetings"] },
        { "id": "draft-course", "title": "Unreleased", "ageGroup": "15+", "isPublished": false }
    ],
    "packages": [
        { "id": "starter", "title": "Starter Pack", "description": "First signs for kids",
          "ageGroups": ["1-4", "5-10"], "targetAudience": "parents",
          "courses": ["asl-alphabet", "family-signs"], "popular": true, "price": 9.99 },
        { "id": "teen", "title": "Teen Pack", "description": "Conversation practice",
          "ageGroups": ["15+"], "targetAudience": "learners", "courses": ["daily-talk"] },
        { "id": "retired", "title": "Retired Pack", "ageGroups": ["5-10"], "isActive": false }
    ]
}"#;

pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    CatalogSeed::from_json(CATALOG)
        .unwrap()
        .apply(store.as_ref())
        .await
        .unwrap();
    store
}

pub fn engine(store: &Arc<MemoryStore>, counting: EnrollmentCounting) -> ConsistencyEngine<MemoryStore> {
    ConsistencyEngine::new(Arc::clone(store), counting)
}

/// Insert a user directly and return its id
pub async fn create_user(store: &MemoryStore, email: &str) -> String {
    let user = store.insert_user(UserDoc::new(email.to_string())).await.unwrap();
    user.id_hex().unwrap()
}

pub async fn course(store: &MemoryStore, id: &str) -> Course {
    use signlearn::store::RecordStore;
    store.get_course(id).await.unwrap().unwrap()
}

pub async fn package(store: &MemoryStore, id: &str) -> Package {
    use signlearn::store::RecordStore;
    store.get_package(id).await.unwrap().unwrap()
}

pub async fn user(store: &MemoryStore, id: &str) -> UserDoc {
    use signlearn::store::RecordStore;
    store.get_user(id).await.unwrap().unwrap()
}

// =============================================================================
// HTTP
// =============================================================================

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_args(&[]).await
    }

    pub async fn with_args(extra: &[&str]) -> Self {
        let store = seeded_store().await;
        let shared: Arc<dyn Store> = store.clone();
        Self::assemble(extra, store, shared)
    }

    /// Serve through a wrapper whose counter increments fail
    pub async fn with_failing_counters() -> Self {
        let store = seeded_store().await;
        let shared: Arc<dyn Store> = Arc::new(FailingCounters::new(store.clone()));
        Self::assemble(&[], store, shared)
    }

    fn assemble(extra: &[&str], store: Arc<MemoryStore>, shared: Arc<dyn Store>) -> Self {
        let mut argv = vec!["signlearn", "--store", "memory"];
        argv.extend_from_slice(extra);
        let args = <Args as clap::Parser>::parse_from(argv);
        Self {
            state: AppState::new(args, shared),
            store,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };
        let body = body
            .map(|v| Bytes::from(v.to_string()))
            .unwrap_or_default();

        let response = routes::dispatch(&self.state, &method, path, query, body).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }
}
