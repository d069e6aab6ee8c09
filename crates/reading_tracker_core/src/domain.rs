//! crates/reading_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Cover reference used whenever a book has no usable cover of its own.
pub const PLACEHOLDER_COVER: &str = "/placeholder.svg";

/// A book on one user's shelf.
///
/// `pages` and `read` are kept as signed integers because stored rows are not
/// guaranteed to respect the entry rules; classification tolerates any pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub cover: String,
    pub pages: i32,
    pub read: i32,
    pub created_at: DateTime<Utc>,
}

/// Raw input for adding a book, either typed by the user or taken from a catalog hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub cover: Option<String>,
    pub pages: Option<i32>,
    pub read: Option<i32>,
}

impl NewBook {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builds add-input from a catalog search result.
    pub fn from_catalog(entry: &CatalogEntry) -> Self {
        Self {
            title: entry.title.clone(),
            cover: entry.cover_url.clone(),
            pages: entry.page_count,
            read: None,
        }
    }
}

/// A normalized, validated book ready to be handed to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookRecord {
    pub title: String,
    pub cover: String,
    pub pages: i32,
    pub read: i32,
}

/// A partial update. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub cover: Option<String>,
    pub pages: Option<i32>,
    pub read: Option<i32>,
}

impl BookPatch {
    pub fn read(read: i32) -> Self {
        Self {
            read: Some(read),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.cover.is_none() && self.pages.is_none() && self.read.is_none()
    }

    /// Applies the present fields to a book, leaving the rest untouched.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(cover) = &self.cover {
            book.cover = cover.clone();
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
        if let Some(read) = self.read {
            book.read = read;
        }
    }
}

/// A candidate book returned by the external catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub external_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub cover_url: Option<String>,
    pub page_count: Option<i32>,
    pub description: Option<String>,
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
