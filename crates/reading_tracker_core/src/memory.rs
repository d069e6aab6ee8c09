//! crates/reading_tracker_core/src/memory.rs
//!
//! An in-process implementation of the storage ports. Rows live in plain vectors
//! behind a mutex, newest first, so listing needs no sort.

use crate::domain::{Book, BookPatch, NewBookRecord, User, UserCredentials};
use crate::ports::{AccountStore, BookRepository, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    books: Vec<Book>,
    users: Vec<(User, String)>,
    sessions: Vec<(String, Uuid, DateTime<Utc>)>,
}

/// Thread-safe in-memory store for books, users and auth sessions.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a book row as-is, bypassing entry rules. Useful for legacy or odd rows.
    pub fn seed_book(&self, book: Book) -> PortResult<()> {
        self.tables()?.books.insert(0, book);
        Ok(())
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }
}

fn book_not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("Book {} not found", id))
}

#[async_trait]
impl BookRepository for InMemoryStore {
    async fn list_by_owner(&self, owner: Uuid) -> PortResult<Vec<Book>> {
        let tables = self.tables()?;
        Ok(tables
            .books
            .iter()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<Book> {
        let tables = self.tables()?;
        tables
            .books
            .iter()
            .find(|b| b.id == id && b.owner == owner)
            .cloned()
            .ok_or_else(|| book_not_found(id))
    }

    async fn insert(&self, owner: Uuid, record: NewBookRecord) -> PortResult<Book> {
        let book = Book {
            id: Uuid::new_v4(),
            owner,
            title: record.title,
            cover: record.cover,
            pages: record.pages,
            read: record.read,
            created_at: Utc::now(),
        };
        self.tables()?.books.insert(0, book.clone());
        Ok(book)
    }

    async fn update_by_id(&self, id: Uuid, owner: Uuid, patch: BookPatch) -> PortResult<Book> {
        let mut tables = self.tables()?;
        let book = tables
            .books
            .iter_mut()
            .find(|b| b.id == id && b.owner == owner)
            .ok_or_else(|| book_not_found(id))?;
        patch.apply_to(book);
        Ok(book.clone())
    }

    async fn delete_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        let before = tables.books.len();
        tables.books.retain(|b| !(b.id == id && b.owner == owner));
        if tables.books.len() == before {
            return Err(book_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        name: Option<&str>,
    ) -> PortResult<User> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|(u, _)| u.email == email) {
            return Err(PortError::Conflict(format!("Email {} already registered", email)));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at: Utc::now(),
        };
        tables.users.push((user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables()?;
        tables
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user_id: u.user_id,
                email: u.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables()?;
        tables
            .users
            .iter()
            .find(|(u, _)| u.user_id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables()?
            .sessions
            .push((session_id.to_string(), user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let tables = self.tables()?;
        match tables.sessions.iter().find(|(id, _, _)| id == session_id) {
            Some((_, user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables()?.sessions.retain(|(id, _, _)| id != session_id);
        Ok(())
    }
}
