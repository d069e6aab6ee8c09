//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-user shelf registry.

use crate::config::Config;
use reading_tracker_core::collection::{BookCollection, CollectionError, LoadState};
use reading_tracker_core::ports::{AccountStore, BookRepository, CatalogSearchService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub books: Arc<dyn BookRepository>,
    pub accounts: Arc<dyn AccountStore>,
    pub catalog: Arc<dyn CatalogSearchService>,
    pub config: Arc<Config>,
    pub shelves: ShelfRegistry,
}

impl AppState {
    pub fn new(
        books: Arc<dyn BookRepository>,
        accounts: Arc<dyn AccountStore>,
        catalog: Arc<dyn CatalogSearchService>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            books,
            accounts,
            catalog,
            shelves: ShelfRegistry::new(config.shelf_idle_ttl),
            config,
        }
    }

    /// Exclusive access to the user's loaded shelf, opening it on first use.
    pub async fn shelf(
        &self,
        user_id: Uuid,
    ) -> Result<OwnedMutexGuard<BookCollection>, CollectionError> {
        self.shelves
            .open(self.books.clone(), user_id, self.config.request_timeout)
            .await
    }
}

//=========================================================================================
// ShelfRegistry (One Mirror Per Signed-In User)
//=========================================================================================

struct OpenShelf {
    collection: Arc<Mutex<BookCollection>>,
    last_used: Instant,
}

/// Holds each signed-in user's `BookCollection`.
///
/// A shelf is created and loaded on first use and disposed on logout. Shelves left
/// untouched for longer than the idle ttl, such as those whose session expired,
/// are evicted the next time any shelf is opened. Each one sits behind its own
/// mutex, so writes to one user's mirror are serialized while different users
/// never wait on each other.
pub struct ShelfRegistry {
    open: Mutex<HashMap<Uuid, OpenShelf>>,
    idle_ttl: Duration,
}

impl ShelfRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            open: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn open(
        &self,
        repo: Arc<dyn BookRepository>,
        user_id: Uuid,
        timeout: Duration,
    ) -> Result<OwnedMutexGuard<BookCollection>, CollectionError> {
        let shelf = {
            let mut open = self.open.lock().await;
            let now = Instant::now();

            let before = open.len();
            open.retain(|id, shelf| {
                *id == user_id || now.duration_since(shelf.last_used) < self.idle_ttl
            });
            let evicted = before - open.len();
            if evicted > 0 {
                info!("Evicted {} idle shelves", evicted);
            }

            let shelf = open.entry(user_id).or_insert_with(|| OpenShelf {
                collection: Arc::new(Mutex::new(
                    BookCollection::new(repo, Some(user_id)).with_timeout(timeout),
                )),
                last_used: now,
            });
            shelf.last_used = now;
            shelf.collection.clone()
        };

        let mut collection = shelf.lock_owned().await;
        // A failed first load leaves the shelf uninitialized; the next request retries.
        if collection.state() == LoadState::Uninitialized {
            info!("Opening shelf for user {}", user_id);
            collection.load().await?;
        }
        Ok(collection)
    }

    /// Drops the user's mirror. Returns whether one was open.
    pub async fn dispose(&self, user_id: Uuid) -> bool {
        let removed = self.open.lock().await.remove(&user_id).is_some();
        if removed {
            info!("Disposed shelf for user {}", user_id);
        }
        removed
    }

    pub async fn open_count(&self) -> usize {
        self.open.lock().await.len()
    }
}
