//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `BookRepository` and `AccountStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reading_tracker_core::domain::{
    Book, BookPatch, NewBookRecord, User, UserCredentials, PLACEHOLDER_COVER,
};
use reading_tracker_core::ports::{AccountStore, BookRepository, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const BOOK_COLUMNS: &str = "id, user_id, title, cover, pages, read, created_at";

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    cover: Option<String>,
    pages: i32,
    read: i32,
    created_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            owner: self.user_id,
            title: self.title,
            cover: self
                .cover
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
            pages: self.pages,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

//=========================================================================================
// `BookRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl BookRepository for DbAdapter {
    async fn list_by_owner(&self, owner: Uuid) -> PortResult<Vec<Book>> {
        let sql = format!(
            "SELECT {} FROM books WHERE user_id = $1 ORDER BY created_at DESC",
            BOOK_COLUMNS
        );
        let records = sqlx::query_as::<_, BookRecord>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<Book> {
        let sql = format!(
            "SELECT {} FROM books WHERE id = $1 AND user_id = $2",
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(BookRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", id)))
    }

    async fn insert(&self, owner: Uuid, record: NewBookRecord) -> PortResult<Book> {
        let sql = format!(
            "INSERT INTO books (id, user_id, title, cover, pages, read) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            BOOK_COLUMNS
        );
        let record = sqlx::query_as::<_, BookRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner)
            .bind(record.title)
            .bind(record.cover)
            .bind(record.pages)
            .bind(record.read)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn update_by_id(&self, id: Uuid, owner: Uuid, patch: BookPatch) -> PortResult<Book> {
        // Absent fields bind as NULL and keep their stored value.
        let sql = format!(
            "UPDATE books SET \
                title = COALESCE($3, title), \
                cover = COALESCE($4, cover), \
                pages = COALESCE($5, pages), \
                read = COALESCE($6, read) \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(id)
            .bind(owner)
            .bind(patch.title)
            .bind(patch.cover)
            .bind(patch.pages)
            .bind(patch.read)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(BookRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", id)))
    }

    async fn delete_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Book {} not found", id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        name: Option<&str>,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, name, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, email, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .map_or(false, |db| db.is_unique_violation());
            if duplicate {
                PortError::Conflict(format!("Email {} already registered", email))
            } else {
                unexpected(e)
            }
        })?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CredentialsRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, name, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(UserRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
