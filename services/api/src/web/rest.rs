//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the book, statistics and catalog endpoints and
//! the master definition for the OpenAPI specification.

use crate::web::{auth, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use reading_tracker_core::{
    collection::CollectionError,
    domain::{Book, BookPatch, CatalogEntry, NewBook},
    ports::PortError,
    status::{self, ReadingStats, ReadingStatus},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        list_books_handler,
        create_book_handler,
        add_from_catalog_handler,
        reload_books_handler,
        delete_all_books_handler,
        update_book_handler,
        set_progress_handler,
        toggle_read_handler,
        delete_book_handler,
        stats_handler,
        search_catalog_handler,
    ),
    components(
        schemas(
            BookResponse,
            BookListResponse,
            CreateBookRequest,
            UpdateBookRequest,
            ProgressRequest,
            CatalogEntryPayload,
            StatsResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::ProfileResponse,
        )
    ),
    tags(
        (name = "Reading Tracker API", description = "Track reading progress across your books.")
    )
)]
pub struct ApiDoc;

/// The OpenAPI document served by Swagger UI and written by the `openapi` binary.
pub fn openapi_document() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "Reading Tracker API".to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A book with its derived reading status.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub cover: String,
    pub pages: i32,
    pub read: i32,
    /// One of `unread`, `in_progress`, `completed`.
    pub status: String,
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&Book> for BookResponse {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            cover: book.cover.clone(),
            pages: book.pages,
            read: book.read,
            status: ReadingStatus::of(book).as_str().to_string(),
            progress_percent: status::progress_percent(book),
            created_at: book.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<BookResponse>,
    pub total: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBookRequest {
    pub title: String,
    pub cover: Option<String>,
    pub pages: Option<i32>,
    pub read: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub cover: Option<String>,
    pub pages: Option<i32>,
    pub read: Option<i32>,
    /// Must be true to lower `pages` below the pages already read.
    #[serde(default)]
    pub confirm_progress_reset: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ProgressRequest {
    pub page: i32,
}

/// A catalog search hit, also accepted back when adding it to the shelf.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CatalogEntryPayload {
    pub external_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub cover_url: Option<String>,
    pub page_count: Option<i32>,
    pub description: Option<String>,
}

impl From<CatalogEntry> for CatalogEntryPayload {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            external_id: entry.external_id,
            title: entry.title,
            authors: entry.authors,
            cover_url: entry.cover_url,
            page_count: entry.page_count,
            description: entry.description,
        }
    }
}

impl From<CatalogEntryPayload> for CatalogEntry {
    fn from(payload: CatalogEntryPayload) -> Self {
        Self {
            external_id: payload.external_id,
            title: payload.title,
            authors: payload.authors,
            cover_url: payload.cover_url,
            page_count: payload.page_count,
            description: payload.description,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total_books: usize,
    pub unread: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub pages_read: i64,
    pub total_pages: i64,
}

impl From<ReadingStats> for StatsResponse {
    fn from(stats: ReadingStats) -> Self {
        Self {
            total_books: stats.total_books,
            unread: stats.unread,
            in_progress: stats.in_progress,
            completed: stats.completed,
            pages_read: stats.pages_read,
            total_pages: stats.total_pages,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookListQuery {
    /// Optional shelf filter: `unread`, `in_progress` or `completed`.
    pub status: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free-text catalog query (title, author or ISBN).
    pub q: String,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

type Rejection = (StatusCode, String);

/// Maps a collection failure onto an HTTP status. The collection has already logged it.
fn reject(e: CollectionError) -> Rejection {
    let status = match &e {
        CollectionError::Validation(_) => StatusCode::BAD_REQUEST,
        CollectionError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CollectionError::NotFound(_) => StatusCode::NOT_FOUND,
        CollectionError::ConfirmationRequired { .. } => StatusCode::CONFLICT,
        CollectionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CollectionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn book_list<'a>(books: impl IntoIterator<Item = &'a Book>) -> BookListResponse {
    let books: Vec<BookResponse> = books.into_iter().map(BookResponse::from).collect();
    BookListResponse {
        total: books.len(),
        books,
    }
}

//=========================================================================================
// Book Handlers
//=========================================================================================

/// List the signed-in user's books, most recently added first.
#[utoipa::path(
    get,
    path = "/books",
    params(BookListQuery),
    responses(
        (status = 200, description = "The user's books", body = BookListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<BookListQuery>,
) -> Result<Json<BookListResponse>, Rejection> {
    let wanted = query
        .status
        .as_deref()
        .map(str::parse::<ReadingStatus>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let shelf = state.shelf(user_id).await.map_err(reject)?;
    let response = match wanted {
        Some(wanted) => book_list(shelf.books_with_status(wanted)),
        None => book_list(shelf.books()),
    };
    Ok(Json(response))
}

/// Add a book entered by hand.
#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book added", body = BookResponse),
        (status = 400, description = "Invalid book details"),
        (status = 504, description = "Gave up waiting for storage")
    )
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let input = NewBook {
        title: req.title,
        cover: req.cover,
        pages: req.pages,
        read: req.read,
    };
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    let book = shelf.add(input).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(&book))))
}

/// Add a book picked from catalog search results.
#[utoipa::path(
    post,
    path = "/books/from-catalog",
    request_body = CatalogEntryPayload,
    responses(
        (status = 201, description = "Book added", body = BookResponse),
        (status = 400, description = "Invalid catalog entry"),
        (status = 504, description = "Gave up waiting for storage")
    )
)]
pub async fn add_from_catalog_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<CatalogEntryPayload>,
) -> Result<impl IntoResponse, Rejection> {
    let entry = CatalogEntry::from(payload);
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    let book = shelf.add(NewBook::from_catalog(&entry)).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(&book))))
}

/// Re-fetch the user's books from storage.
#[utoipa::path(
    post,
    path = "/books/reload",
    responses(
        (status = 200, description = "Freshly loaded books", body = BookListResponse),
        (status = 500, description = "Reload failed; previous books kept")
    )
)]
pub async fn reload_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<BookListResponse>, Rejection> {
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    shelf.load().await.map_err(reject)?;
    Ok(Json(book_list(shelf.books())))
}

/// Delete every book on the user's shelf.
#[utoipa::path(
    delete,
    path = "/books",
    responses(
        (status = 204, description = "All books deleted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_all_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<StatusCode, Rejection> {
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    shelf.remove_all().await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Edit a book's details.
///
/// Lowering `pages` below the pages already read returns 409 unless
/// `confirm_progress_reset` is set, in which case progress is reset to 0.
#[utoipa::path(
    patch,
    path = "/books/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid book details"),
        (status = 404, description = "No such book on this shelf"),
        (status = 409, description = "Confirmation required to reset progress")
    )
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookResponse>, Rejection> {
    let patch = BookPatch {
        title: req.title,
        cover: req.cover,
        pages: req.pages,
        read: req.read,
    };
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    let book = shelf
        .edit_details(id, patch, req.confirm_progress_reset)
        .await
        .map_err(reject)?;
    Ok(Json(BookResponse::from(&book)))
}

/// Record the page the reader has reached.
#[utoipa::path(
    put,
    path = "/books/{id}/progress",
    params(("id" = Uuid, Path, description = "Book id")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Progress saved", body = BookResponse),
        (status = 404, description = "No such book on this shelf")
    )
)]
pub async fn set_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProgressRequest>,
) -> Result<Json<BookResponse>, Rejection> {
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    let book = shelf.set_progress(id, req.page).await.map_err(reject)?;
    Ok(Json(BookResponse::from(&book)))
}

/// Toggle a book between unstarted and started.
#[utoipa::path(
    post,
    path = "/books/{id}/toggle-read",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 404, description = "No such book on this shelf")
    )
)]
pub async fn toggle_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookResponse>, Rejection> {
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    let book = shelf.toggle_read(id).await.map_err(reject)?;
    Ok(Json(BookResponse::from(&book)))
}

/// Delete a single book.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "No such book on this shelf")
    )
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    let mut shelf = state.shelf(user_id).await.map_err(reject)?;
    shelf.remove(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Statistics and Catalog Handlers
//=========================================================================================

/// Reading statistics for the profile view.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Shelf statistics", body = StatsResponse)
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<StatsResponse>, Rejection> {
    let shelf = state.shelf(user_id).await.map_err(reject)?;
    Ok(Json(StatsResponse::from(shelf.stats())))
}

/// Search the external book catalog.
#[utoipa::path(
    get,
    path = "/catalog/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching catalog entries", body = Vec<CatalogEntryPayload>),
        (status = 504, description = "The catalog did not answer in time")
    )
)]
pub async fn search_catalog_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<CatalogEntryPayload>>, Rejection> {
    let entries = state.catalog.search(&query.q).await.map_err(|e| match e {
        PortError::Timeout(what) => (
            StatusCode::GATEWAY_TIMEOUT,
            format!("Gave up waiting for {}", what),
        ),
        e => {
            error!("Catalog search failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Catalog search failed".to_string())
        }
    })?;

    Ok(Json(entries.into_iter().map(CatalogEntryPayload::from).collect()))
}
