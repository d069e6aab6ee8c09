//! crates/reading_tracker_core/src/status.rs
//!
//! Reading-status derivation. Everything here is a total function over `Book`
//! values, including rows that break the entry rules (`read > pages`,
//! `pages <= 0`, negative `read`).

use crate::domain::Book;

/// The three mutually exclusive shelves a book can sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingStatus {
    Unread,
    InProgress,
    Completed,
}

impl ReadingStatus {
    /// Classifies a single book.
    ///
    /// A book with no positive page count is never completed or in progress.
    pub fn of(book: &Book) -> Self {
        if book.pages > 0 && book.read >= book.pages {
            ReadingStatus::Completed
        } else if book.read > 0 && book.read < book.pages {
            ReadingStatus::InProgress
        } else {
            ReadingStatus::Unread
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Unread => "unread",
            ReadingStatus::InProgress => "in_progress",
            ReadingStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(ReadingStatus::Unread),
            "in_progress" => Ok(ReadingStatus::InProgress),
            "completed" => Ok(ReadingStatus::Completed),
            other => Err(format!("unknown reading status '{}'", other)),
        }
    }
}

pub fn is_unread(book: &Book) -> bool {
    ReadingStatus::of(book) == ReadingStatus::Unread
}

pub fn is_in_progress(book: &Book) -> bool {
    ReadingStatus::of(book) == ReadingStatus::InProgress
}

pub fn is_completed(book: &Book) -> bool {
    ReadingStatus::of(book) == ReadingStatus::Completed
}

/// Percentage of the book read, always within `[0, 100]`.
pub fn progress_percent(book: &Book) -> f64 {
    if book.pages <= 0 {
        return 0.0;
    }
    let percent = f64::from(book.read) / f64::from(book.pages) * 100.0;
    percent.clamp(0.0, 100.0)
}

/// Books split by status, each list in input order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Shelves<'a> {
    pub unread: Vec<&'a Book>,
    pub in_progress: Vec<&'a Book>,
    pub completed: Vec<&'a Book>,
}

impl<'a> Shelves<'a> {
    pub fn get(&self, status: ReadingStatus) -> &[&'a Book] {
        match status {
            ReadingStatus::Unread => &self.unread,
            ReadingStatus::InProgress => &self.in_progress,
            ReadingStatus::Completed => &self.completed,
        }
    }

    pub fn len(&self) -> usize {
        self.unread.len() + self.in_progress.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions a collection into the three shelves. Every book lands on exactly one.
pub fn partition(books: &[Book]) -> Shelves<'_> {
    let mut shelves = Shelves::default();
    for book in books {
        match ReadingStatus::of(book) {
            ReadingStatus::Unread => shelves.unread.push(book),
            ReadingStatus::InProgress => shelves.in_progress.push(book),
            ReadingStatus::Completed => shelves.completed.push(book),
        }
    }
    shelves
}

/// Aggregate figures for the profile view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingStats {
    pub total_books: usize,
    pub unread: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Sum of each book's `read`, clamped into `[0, pages]`.
    pub pages_read: i64,
    pub total_pages: i64,
}

impl ReadingStats {
    pub fn from_books(books: &[Book]) -> Self {
        let mut stats = ReadingStats {
            total_books: books.len(),
            ..Default::default()
        };
        for book in books {
            match ReadingStatus::of(book) {
                ReadingStatus::Unread => stats.unread += 1,
                ReadingStatus::InProgress => stats.in_progress += 1,
                ReadingStatus::Completed => stats.completed += 1,
            }
            let pages = i64::from(book.pages.max(0));
            stats.total_pages += pages;
            stats.pages_read += i64::from(book.read).clamp(0, pages);
        }
        stats
    }
}
