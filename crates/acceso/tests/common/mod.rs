//! In-process users service for the API suite.
//!
//! Serves the `/users` resource from memory on 127.0.0.1:0 and checks the
//! bearer key on every request.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Key the service accepts
pub const API_KEY: &str = "test-api-key";

const REQUIRED_FIELDS: [&str; 3] = ["name", "email", "username"];
const PAGING_PARAMS: [&str; 2] = ["page", "limit"];
const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<u64, Map<String, Value>>,
    next_id: u64,
}

impl Store {
    fn seeded() -> Self {
        let mut store = Self {
            users: BTreeMap::new(),
            next_id: 1,
        };
        for (name, username, role) in [
            ("Leanne Graham", "bret", "admin"),
            ("Ervin Howell", "antonette", "user"),
            ("Clementine Bauch", "samantha", "admin"),
            ("Patricia Lebsack", "karianne", "user"),
        ] {
            let mut user = Map::new();
            user.insert("name".into(), json!(name));
            user.insert("email".into(), json!(format!("{username}@example.com")));
            user.insert("username".into(), json!(username));
            user.insert("role".into(), json!(role));
            store.insert(user);
        }
        store
    }

    fn insert(&mut self, mut user: Map<String, Value>) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        user.insert("id".into(), json!(id));
        self.users.insert(id, user.clone());
        Value::Object(user)
    }
}

#[derive(Debug, Clone)]
struct AppState {
    store: Arc<Mutex<Store>>,
    api_key: String,
}

impl AppState {
    fn deny(&self, headers: &HeaderMap) -> Option<Response> {
        let expected = format!("Bearer {}", self.api_key);
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if presented == Some(expected.as_str()) {
            None
        } else {
            Some(error(StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "User not found")
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(denied) = state.deny(&headers) {
        return denied;
    }
    let store = state.store.lock().unwrap();
    let users: Vec<Value> = store
        .users
        .values()
        .filter(|user| {
            params
                .iter()
                .filter(|(k, _)| !PAGING_PARAMS.contains(&k.as_str()))
                .all(|(k, v)| user.get(k).and_then(Value::as_str) == Some(v.as_str()))
        })
        .cloned()
        .map(Value::Object)
        .collect();

    let page = params.get("page").and_then(|p| p.parse::<usize>().ok());
    let limit = params.get("limit").and_then(|l| l.parse::<usize>().ok());
    if page.is_none() && limit.is_none() {
        return Json(Value::Array(users)).into_response();
    }

    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    let data: Vec<Value> = users.into_iter().skip((page - 1) * limit).take(limit).collect();
    Json(json!({ "data": data, "page": page, "limit": limit })).into_response()
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = state.deny(&headers) {
        return denied;
    }
    let Some(fields) = body.as_object() else {
        return error(StatusCode::BAD_REQUEST, "Body must be an object");
    };
    let missing: Vec<&str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|f| fields.get(*f).and_then(Value::as_str).map_or(true, str::is_empty))
        .collect();
    if !missing.is_empty() {
        return error(
            StatusCode::BAD_REQUEST,
            &format!("Missing required fields: {}", missing.join(", ")),
        );
    }

    let mut user = Map::new();
    for field in REQUIRED_FIELDS {
        user.insert(field.into(), fields[field].clone());
    }
    user.insert("role".into(), fields.get("role").cloned().unwrap_or(json!("user")));
    let created = state.store.lock().unwrap().insert(user);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn get_user(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Some(denied) = state.deny(&headers) {
        return denied;
    }
    match state.store.lock().unwrap().users.get(&id) {
        Some(user) => Json(Value::Object(user.clone())).into_response(),
        None => not_found(),
    }
}

async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = state.deny(&headers) {
        return denied;
    }
    let Some(fields) = body.as_object() else {
        return error(StatusCode::BAD_REQUEST, "Body must be an object");
    };
    let mut store = state.store.lock().unwrap();
    let Some(user) = store.users.get_mut(&id) else {
        return not_found();
    };
    for (key, value) in fields {
        if key != "id" {
            user.insert(key.clone(), value.clone());
        }
    }
    Json(Value::Object(user.clone())).into_response()
}

async fn delete_user(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Some(denied) = state.deny(&headers) {
        return denied;
    }
    match state.store.lock().unwrap().users.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .with_state(state)
}

/// A running users service.
pub struct TestUsersServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestUsersServer {
    /// Bind to a random port and serve the seeded users.
    pub async fn spawn() -> Self {
        let state = AppState {
            store: Arc::new(Mutex::new(Store::seeded())),
            api_key: API_KEY.to_string(),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind users service");
        let addr = listener.local_addr().expect("users service address");
        let app = router(state);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("users service error: {e}");
            }
        });
        Self { addr, handle }
    }

    /// Base URL of the service
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestUsersServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
