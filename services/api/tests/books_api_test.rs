use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use reading_tracker_core::{
    domain::{Book, BookPatch, CatalogEntry, NewBookRecord, PLACEHOLDER_COVER},
    memory::InMemoryStore,
    ports::{AccountStore, BookRepository, CatalogSearchService, PortError, PortResult},
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`
use tracing::Level;
use uuid::Uuid;

struct StubCatalog {
    entries: Vec<CatalogEntry>,
}

#[async_trait]
impl CatalogSearchService for StubCatalog {
    async fn search(&self, query: &str) -> PortResult<Vec<CatalogEntry>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.entries.clone())
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
        catalog_base_url: "http://catalog.invalid".to_string(),
        catalog_max_results: 20,
        request_timeout: Duration::from_secs(5),
        session_ttl_days: 30,
        shelf_idle_ttl: Duration::from_secs(60),
    }
}

/// Fails the first `failing_loads` listings, then serves the wrapped store.
struct FlakyBooks {
    inner: Arc<InMemoryStore>,
    failing_loads: AtomicUsize,
}

#[async_trait]
impl BookRepository for FlakyBooks {
    async fn list_by_owner(&self, owner: Uuid) -> PortResult<Vec<Book>> {
        let left = self.failing_loads.load(Ordering::SeqCst);
        if left > 0 {
            self.failing_loads.store(left - 1, Ordering::SeqCst);
            return Err(PortError::Unexpected("database unavailable".to_string()));
        }
        self.inner.list_by_owner(owner).await
    }

    async fn get_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<Book> {
        self.inner.get_by_id(id, owner).await
    }

    async fn insert(&self, owner: Uuid, record: NewBookRecord) -> PortResult<Book> {
        self.inner.insert(owner, record).await
    }

    async fn update_by_id(&self, id: Uuid, owner: Uuid, patch: BookPatch) -> PortResult<Book> {
        self.inner.update_by_id(id, owner, patch).await
    }

    async fn delete_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<()> {
        self.inner.delete_by_id(id, owner).await
    }
}

fn dune_entry() -> CatalogEntry {
    CatalogEntry {
        external_id: "B1gvDwAAQBAJ".to_string(),
        title: "Dune".to_string(),
        authors: vec!["Frank Herbert".to_string()],
        cover_url: Some("https://books.example/dune.jpg".to_string()),
        page_count: Some(412),
        description: None,
    }
}

// Helper to create a test app over the in-memory store
fn setup_app() -> (Router, Arc<AppState>) {
    let store = Arc::new(InMemoryStore::new());
    build_app(store.clone(), store, test_config())
}

fn build_app(
    books: Arc<dyn BookRepository>,
    accounts: Arc<InMemoryStore>,
    config: Config,
) -> (Router, Arc<AppState>) {
    let catalog = Arc::new(StubCatalog {
        entries: vec![dune_entry()],
    });
    let state = Arc::new(AppState::new(books, accounts, catalog, Arc::new(config)));
    (build_router(state.clone()), state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

// Signs up a new user and returns the `session=...` cookie pair
async fn signup(app: &Router, email: &str) -> String {
    signup_with_id(app, email).await.0
}

async fn signup_with_id(app: &Router, email: &str) -> (String, Uuid) {
    let req = Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "correct horse", "name": "Reader" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let user_id = body["user_id"].as_str().unwrap().parse().unwrap();
    (cookie, user_id)
}

async fn add_book(app: &Router, cookie: &str, body: Value) -> Value {
    let (status, book) = send(app, json_request("POST", "/books", cookie, body)).await;
    assert_eq!(status, StatusCode::CREATED);
    book
}

#[tokio::test]
async fn book_routes_require_a_session() {
    let (app, _) = setup_app();

    let req = Request::builder().uri("/books").body(Body::empty()).unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, empty_request("GET", "/books", "session=forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn manual_add_applies_defaults_and_lists_newest_first() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "dune@example.com").await;

    let dune = add_book(&app, &cookie, json!({ "title": "Dune" })).await;
    assert_eq!(dune["pages"], 1);
    assert_eq!(dune["read"], 0);
    assert_eq!(dune["cover"], "/placeholder.svg");
    assert_eq!(dune["status"], "unread");

    add_book(&app, &cookie, json!({ "title": "Emma", "pages": 474 })).await;

    let (status, list) = send(&app, empty_request("GET", "/books", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 2);
    assert_eq!(list["books"][0]["title"], "Emma");
    assert_eq!(list["books"][1]["title"], "Dune");
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "blank@example.com").await;

    let (status, _) = send(
        &app,
        json_request("POST", "/books", &cookie, json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn progress_moves_book_through_shelves() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "progress@example.com").await;
    let book = add_book(&app, &cookie, json!({ "title": "Moby-Dick", "pages": 300 })).await;
    let uri = format!("/books/{}/progress", book["id"].as_str().unwrap());

    let (status, halfway) =
        send(&app, json_request("PUT", &uri, &cookie, json!({ "page": 150 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(halfway["status"], "in_progress");
    assert_eq!(halfway["progress_percent"], 50.0);

    let (_, done) = send(&app, json_request("PUT", &uri, &cookie, json!({ "page": 9000 }))).await;
    assert_eq!(done["read"], 300);
    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress_percent"], 100.0);

    let (status, completed) = send(
        &app,
        empty_request("GET", "/books?status=completed", &cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["total"], 1);

    let (status, _) = send(&app, empty_request("GET", "/books?status=finished", &cookie)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lowering_pages_below_progress_needs_confirmation() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "edit@example.com").await;
    let book = add_book(
        &app,
        &cookie,
        json!({ "title": "Ulysses", "pages": 300, "read": 150 }),
    )
    .await;
    let uri = format!("/books/{}", book["id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        json_request("PATCH", &uri, &cookie, json!({ "pages": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, edited) = send(
        &app,
        json_request(
            "PATCH",
            &uri,
            &cookie,
            json!({ "pages": 100, "confirm_progress_reset": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["pages"], 100);
    assert_eq!(edited["read"], 0);
    assert_eq!(edited["status"], "unread");
}

#[tokio::test]
async fn edited_read_stays_within_page_count() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "clamp@example.com").await;
    let book = add_book(
        &app,
        &cookie,
        json!({ "title": "Ulysses", "pages": 300, "read": 150 }),
    )
    .await;
    let uri = format!("/books/{}", book["id"].as_str().unwrap());

    let (status, edited) = send(
        &app,
        json_request("PATCH", &uri, &cookie, json!({ "read": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["read"], 300);
    assert_eq!(edited["status"], "completed");

    let (status, grown) = send(
        &app,
        json_request("PATCH", &uri, &cookie, json!({ "pages": 450, "read": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grown["pages"], 450);
    assert_eq!(grown["read"], 450);
}

#[tokio::test]
async fn toggle_read_round_trips() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "toggle@example.com").await;
    let book = add_book(&app, &cookie, json!({ "title": "Beloved", "pages": 320 })).await;
    let uri = format!("/books/{}/toggle-read", book["id"].as_str().unwrap());

    let (_, started) = send(&app, empty_request("POST", &uri, &cookie)).await;
    assert_eq!(started["read"], 1);
    assert_eq!(started["status"], "in_progress");

    let (_, reset) = send(&app, empty_request("POST", &uri, &cookie)).await;
    assert_eq!(reset["read"], 0);
    assert_eq!(reset["status"], "unread");
}

#[tokio::test]
async fn users_cannot_touch_each_others_books() {
    let (app, _) = setup_app();
    let alice = signup(&app, "alice@example.com").await;
    let bob = signup(&app, "bob@example.com").await;
    let book = add_book(&app, &alice, json!({ "title": "Private Diary" })).await;
    let uri = format!("/books/{}", book["id"].as_str().unwrap());

    let (status, _) = send(&app, empty_request("DELETE", &uri, &bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        json_request("PATCH", &uri, &bob, json!({ "title": "Mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, empty_request("GET", "/books", &alice)).await;
    assert_eq!(list["books"][0]["title"], "Private Diary");

    let (status, _) = send(&app, empty_request("DELETE", &uri, &alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = send(&app, empty_request("GET", "/books", &alice)).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn stats_and_bulk_delete() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "stats@example.com").await;
    add_book(&app, &cookie, json!({ "title": "A", "pages": 100 })).await;
    add_book(&app, &cookie, json!({ "title": "B", "pages": 200, "read": 50 })).await;
    add_book(&app, &cookie, json!({ "title": "C", "pages": 80, "read": 80 })).await;

    let (status, stats) = send(&app, empty_request("GET", "/stats", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_books"], 3);
    assert_eq!(stats["unread"], 1);
    assert_eq!(stats["in_progress"], 1);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["pages_read"], 130);
    assert_eq!(stats["total_pages"], 380);

    let (status, _) = send(&app, empty_request("DELETE", "/books", &cookie)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, stats) = send(&app, empty_request("GET", "/stats", &cookie)).await;
    assert_eq!(stats["total_books"], 0);
}

#[tokio::test]
async fn catalog_hits_can_be_added_to_the_shelf() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "catalog@example.com").await;

    let (status, hits) = send(&app, empty_request("GET", "/catalog/search?q=dune", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["title"], "Dune");
    assert_eq!(hits[0]["authors"][0], "Frank Herbert");

    let (status, book) = send(
        &app,
        json_request("POST", "/books/from-catalog", &cookie, hits[0].clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["title"], "Dune");
    assert_eq!(book["pages"], 412);
    assert_eq!(book["cover"], "https://books.example/dune.jpg");
    assert_eq!(book["status"], "unread");
}

#[tokio::test]
async fn logout_disposes_the_shelf_and_the_session() {
    let (app, state) = setup_app();
    let cookie = signup(&app, "logout@example.com").await;
    add_book(&app, &cookie, json!({ "title": "Walden" })).await;
    assert_eq!(state.shelves.open_count().await, 1);

    let (status, _) = send(&app, empty_request("POST", "/auth/logout", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.shelves.open_count().await, 0);

    let (status, _) = send(&app, empty_request("GET", "/books", &cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_checks_password_and_duplicate_signup_conflicts() {
    let (app, _) = setup_app();
    let cookie = signup(&app, "login@example.com").await;

    let (status, me) = send(&app, empty_request("GET", "/auth/me", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "login@example.com");
    assert_eq!(me["name"], "Reader");

    let login = |password: &str| {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": "Login@Example.com", "password": password }).to_string(),
            ))
            .unwrap()
    };
    let (status, _) = send(&app, login("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send(&app, login("correct horse")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "login@example.com");

    let dup = Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "login@example.com", "password": "another" }).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&app, dup).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn failed_first_load_is_retried_on_the_next_request() {
    let store = Arc::new(InMemoryStore::new());
    let books = Arc::new(FlakyBooks {
        inner: store.clone(),
        failing_loads: AtomicUsize::new(1),
    });
    let (app, _) = build_app(books, store.clone(), test_config());
    let (cookie, user_id) = signup_with_id(&app, "flaky@example.com").await;
    store
        .seed_book(Book {
            id: Uuid::new_v4(),
            owner: user_id,
            title: "Middlemarch".to_string(),
            cover: PLACEHOLDER_COVER.to_string(),
            pages: 880,
            read: 12,
            created_at: chrono::Utc::now(),
        })
        .unwrap();

    let (status, _) = send(&app, empty_request("GET", "/books", &cookie)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, list) = send(&app, empty_request("GET", "/books", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["books"][0]["title"], "Middlemarch");
}

#[tokio::test]
async fn shelf_of_an_expired_session_is_evicted() {
    let store = Arc::new(InMemoryStore::new());
    let config = Config {
        shelf_idle_ttl: Duration::from_millis(50),
        ..test_config()
    };
    let (app, state) = build_app(store.clone(), store, config);

    let stale = signup(&app, "stale@example.com").await;
    add_book(&app, &stale, json!({ "title": "Walden" })).await;
    assert_eq!(state.shelves.open_count().await, 1);

    // The session lapses without a logout.
    let stale_id = stale.trim_start_matches("session=");
    state.accounts.delete_auth_session(stale_id).await.unwrap();
    let (status, _) = send(&app, empty_request("GET", "/books", &stale)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    tokio::time::sleep(Duration::from_millis(120)).await;
    let active = signup(&app, "active@example.com").await;
    let (status, _) = send(&app, empty_request("GET", "/books", &active)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(state.shelves.open_count().await, 1);
}
