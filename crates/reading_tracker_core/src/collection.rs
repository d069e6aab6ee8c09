//! crates/reading_tracker_core/src/collection.rs
//!
//! The book collection: one user's in-memory mirror of their shelf and the single
//! place through which it is read and mutated.
//!
//! The mirror is only written after the repository call succeeds, so a failed
//! operation always leaves it exactly as it was. Failures are logged, recorded as
//! the collection's last error, and returned to the caller.

use crate::domain::{Book, BookPatch, NewBook};
use crate::ports::{BookRepository, PortError};
use crate::rules::{self, PageEdit, ValidationError};
use crate::status::{self, ReadingStats, ReadingStatus, Shelves};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Upper bound on how long `add` waits for the repository.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("No signed-in user")]
    Unauthenticated,
    #[error("Book {0} not found")]
    NotFound(Uuid),
    #[error("Setting the page count to {pages} resets the {read} pages already read")]
    ConfirmationRequired { read: i32, pages: i32 },
    #[error("Gave up waiting for {0}")]
    Timeout(String),
    #[error("Repository error: {0}")]
    Repository(PortError),
}

impl CollectionError {
    fn from_port(err: PortError, id: Option<Uuid>) -> Self {
        match (err, id) {
            (PortError::NotFound(_), Some(id)) => CollectionError::NotFound(id),
            (PortError::Timeout(what), _) => CollectionError::Timeout(what),
            (PortError::Unauthorized, _) => CollectionError::Unauthenticated,
            (err, _) => CollectionError::Repository(err),
        }
    }
}

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Lifecycle of the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
}

pub struct BookCollection {
    repo: Arc<dyn BookRepository>,
    owner: Option<Uuid>,
    books: Vec<Book>,
    state: LoadState,
    last_error: Option<CollectionError>,
    timeout: Duration,
}

impl BookCollection {
    /// Creates an empty, uninitialized collection for `owner`.
    ///
    /// With no owner every operation fails with `Unauthenticated` before reaching
    /// the repository.
    pub fn new(repo: Arc<dyn BookRepository>, owner: Option<Uuid>) -> Self {
        Self {
            repo,
            owner,
            books: Vec::new(),
            state: LoadState::Uninitialized,
            last_error: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// The error left by the most recent operation, if it failed.
    pub fn last_error(&self) -> Option<&CollectionError> {
        self.last_error.as_ref()
    }

    /// The mirror, most recently created first.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn find(&self, id: Uuid) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    //=====================================================================================
    // Derived views, always computed from the current mirror
    //=====================================================================================

    pub fn total_count(&self) -> usize {
        self.books.len()
    }

    pub fn unread_books(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| status::is_unread(b)).collect()
    }

    pub fn in_progress_books(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| status::is_in_progress(b)).collect()
    }

    pub fn completed_books(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| status::is_completed(b)).collect()
    }

    pub fn books_with_status(&self, wanted: ReadingStatus) -> Vec<&Book> {
        self.books
            .iter()
            .filter(|b| ReadingStatus::of(b) == wanted)
            .collect()
    }

    pub fn shelves(&self) -> Shelves<'_> {
        status::partition(&self.books)
    }

    pub fn stats(&self) -> ReadingStats {
        ReadingStats::from_books(&self.books)
    }

    //=====================================================================================
    // Operations
    //=====================================================================================

    /// Replaces the mirror with the owner's books from the repository.
    pub async fn load(&mut self) -> CollectionResult<()> {
        let owner = self.start("load")?;
        let previous = self.state;
        self.state = LoadState::Loading;

        let outcome = self.refresh(owner).await;
        match outcome {
            Ok(()) => {
                self.state = LoadState::Ready;
                info!("Loaded {} books for user {}", self.books.len(), owner);
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                Err(self.fail("load", e))
            }
        }
    }

    /// Normalizes and stores a new book, then puts it at the front of the mirror.
    pub async fn add(&mut self, input: NewBook) -> CollectionResult<Book> {
        let owner = self.start("add")?;
        let record = rules::normalize_new_book(&input).map_err(|e| self.fail("add", e.into()))?;

        let outcome = tokio::time::timeout(self.timeout, self.repo.insert(owner, record)).await;
        let book = match outcome {
            Ok(Ok(book)) => book,
            Ok(Err(e)) => return Err(self.fail("add", CollectionError::from_port(e, None))),
            Err(_) => {
                let what = format!("add after {:?}", self.timeout);
                return Err(self.fail("add", CollectionError::Timeout(what)));
            }
        };

        debug!("Added book {} ('{}')", book.id, book.title);
        self.books.insert(0, book.clone());
        Ok(book)
    }

    /// Writes the fields present in `patch` and replaces the mirrored entry in place.
    ///
    /// `read` is kept inside the page count the patch leaves behind.
    pub async fn update(&mut self, id: Uuid, patch: BookPatch) -> CollectionResult<Book> {
        let owner = self.start("update")?;
        let mut patch =
            rules::normalize_patch(&patch).map_err(|e| self.fail("update", e.into()))?;
        let current = self.mirrored("update", id)?;
        rules::fit_patch_to_book(&mut patch, &current);
        self.write_patch("update", id, owner, patch).await
    }

    /// Metadata edit from the edit dialog.
    ///
    /// A page count below the mirrored pages already read needs `confirmed`; once
    /// confirmed the same write resets `read` to 0. Without confirmation nothing is
    /// written. A supplied `read` is clamped to the resulting page count.
    pub async fn edit_details(
        &mut self,
        id: Uuid,
        patch: BookPatch,
        confirmed: bool,
    ) -> CollectionResult<Book> {
        let owner = self.start("edit_details")?;
        let mut patch =
            rules::normalize_patch(&patch).map_err(|e| self.fail("edit_details", e.into()))?;
        let current = self.mirrored("edit_details", id)?;

        if let Some(new_pages) = patch.pages {
            if let PageEdit::ResetsProgress { read, pages } =
                rules::check_page_edit(&current, new_pages)
            {
                if !confirmed {
                    info!(
                        "Edit of book {} needs confirmation: {} pages read, new count {}",
                        id, read, pages
                    );
                    return Err(CollectionError::ConfirmationRequired { read, pages });
                }
                patch.read = Some(0);
            }
        }

        rules::fit_patch_to_book(&mut patch, &current);
        self.write_patch("edit_details", id, owner, patch).await
    }

    /// Deletes a book and drops it from the mirror.
    pub async fn remove(&mut self, id: Uuid) -> CollectionResult<()> {
        let owner = self.start("remove")?;
        let outcome = self.repo.delete_by_id(id, owner).await;
        if let Err(e) = outcome {
            return Err(self.fail("remove", CollectionError::from_port(e, Some(id))));
        }
        self.books.retain(|b| b.id != id);
        Ok(())
    }

    /// Deletes every mirrored book one by one, then reloads.
    ///
    /// Books already gone from the repository are skipped. If a delete fails the
    /// mirror is resynced from the repository before the error is returned.
    pub async fn remove_all(&mut self) -> CollectionResult<()> {
        let owner = self.start("remove_all")?;
        let ids: Vec<Uuid> = self.books.iter().map(|b| b.id).collect();

        for id in ids {
            let outcome = self.repo.delete_by_id(id, owner).await;
            match outcome {
                Ok(()) | Err(PortError::NotFound(_)) => {}
                Err(e) => {
                    if let Err(resync) = self.refresh(owner).await {
                        warn!("Resync after failed bulk delete also failed: {}", resync);
                    }
                    return Err(self.fail("remove_all", CollectionError::from_port(e, Some(id))));
                }
            }
        }

        self.load().await
    }

    /// Flips between unstarted (`read = 0`) and started (`read = 1`).
    pub async fn toggle_read(&mut self, id: Uuid) -> CollectionResult<Book> {
        let owner = self.start("toggle_read")?;
        let current = self.mirrored("toggle_read", id)?;
        let read = if current.read == 0 { 1 } else { 0 };
        self.write_patch("toggle_read", id, owner, BookPatch::read(read)).await
    }

    /// Records the page the reader has reached, clamped into `[0, pages]`.
    pub async fn set_progress(&mut self, id: Uuid, page: i32) -> CollectionResult<Book> {
        let owner = self.start("set_progress")?;
        let current = self.mirrored("set_progress", id)?;
        let clamped = rules::clamp_progress(page, current.pages);
        if clamped != page {
            debug!(
                "Clamped progress for book {} from {} to {}",
                id, page, clamped
            );
        }
        self.write_patch("set_progress", id, owner, BookPatch::read(clamped))
            .await
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    /// Clears the previous error and resolves the acting owner.
    fn start(&mut self, operation: &'static str) -> CollectionResult<Uuid> {
        self.last_error = None;
        match self.owner {
            Some(owner) => Ok(owner),
            None => Err(self.fail(operation, CollectionError::Unauthenticated)),
        }
    }

    fn fail(&mut self, operation: &'static str, err: CollectionError) -> CollectionError {
        match &err {
            CollectionError::Repository(_) | CollectionError::Timeout(_) => {
                error!("Book collection {} failed: {}", operation, err)
            }
            _ => warn!("Book collection {} rejected: {}", operation, err),
        }
        self.last_error = Some(err.clone());
        err
    }

    fn mirrored(&mut self, operation: &'static str, id: Uuid) -> CollectionResult<Book> {
        if let Some(book) = self.find(id).cloned() {
            return Ok(book);
        }
        Err(self.fail(operation, CollectionError::NotFound(id)))
    }

    async fn refresh(&mut self, owner: Uuid) -> CollectionResult<()> {
        let books = self
            .repo
            .list_by_owner(owner)
            .await
            .map_err(|e| CollectionError::from_port(e, None))?;
        self.books = books;
        Ok(())
    }

    async fn write_patch(
        &mut self,
        operation: &'static str,
        id: Uuid,
        owner: Uuid,
        patch: BookPatch,
    ) -> CollectionResult<Book> {
        let outcome = self.repo.update_by_id(id, owner, patch).await;
        match outcome {
            Ok(book) => {
                if let Some(slot) = self.books.iter_mut().find(|b| b.id == id) {
                    *slot = book.clone();
                }
                Ok(book)
            }
            Err(e) => Err(self.fail(operation, CollectionError::from_port(e, Some(id)))),
        }
    }
}
