//! crates/reading_tracker_core/src/rules.rs
//!
//! Entry rules for book input: defaults, validation and the page-count edit check.
//! Nothing here touches storage; every function is applied before a repository call.

use crate::domain::{Book, BookPatch, NewBook, NewBookRecord, PLACEHOLDER_COVER};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
}

pub fn normalize_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Blank or missing covers fall back to the placeholder.
pub fn normalize_cover(cover: Option<&str>) -> String {
    match cover.map(str::trim) {
        Some(cover) if !cover.is_empty() => cover.to_string(),
        _ => PLACEHOLDER_COVER.to_string(),
    }
}

/// Missing or non-positive page counts become 1.
pub fn normalize_pages(pages: Option<i32>) -> i32 {
    match pages {
        Some(pages) if pages > 0 => pages,
        _ => 1,
    }
}

/// Missing or negative read values become 0.
pub fn normalize_read(read: Option<i32>) -> i32 {
    read.unwrap_or(0).max(0)
}

/// Clamps a page number into `[0, pages]`.
pub fn clamp_progress(page: i32, pages: i32) -> i32 {
    page.clamp(0, pages.max(0))
}

/// Applies every add-time default and clamps `read` to the page count.
pub fn normalize_new_book(input: &NewBook) -> Result<NewBookRecord, ValidationError> {
    let title = normalize_title(&input.title)?;
    let pages = normalize_pages(input.pages);
    let read = clamp_progress(normalize_read(input.read), pages);

    Ok(NewBookRecord {
        title,
        cover: normalize_cover(input.cover.as_deref()),
        pages,
        read,
    })
}

/// Normalizes only the fields present in the patch, each with its own default rule.
pub fn normalize_patch(patch: &BookPatch) -> Result<BookPatch, ValidationError> {
    let title = match &patch.title {
        Some(title) => Some(normalize_title(title)?),
        None => None,
    };

    Ok(BookPatch {
        title,
        cover: patch.cover.as_deref().map(|c| normalize_cover(Some(c))),
        pages: patch.pages.map(|p| normalize_pages(Some(p))),
        read: patch.read.map(|r| normalize_read(Some(r))),
    })
}

/// Clamps the `read` a patch would leave on `current` into the page count it would leave.
///
/// A supplied `read` is always clamped. Without one, `read` is only written when
/// the patch's page count falls below the book's current progress.
pub fn fit_patch_to_book(patch: &mut BookPatch, current: &Book) {
    let pages = patch.pages.unwrap_or(current.pages);
    let read = clamp_progress(patch.read.unwrap_or(current.read), pages);
    if patch.read.is_some() || read != current.read {
        patch.read = Some(read);
    }
}

/// Outcome of checking a new page count against a book's current progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEdit {
    /// The page count does not change.
    Unchanged,
    /// The new count is at or above the current progress; `read` is kept.
    KeepsProgress,
    /// The new count is below the current progress; applying it resets `read` to 0.
    ResetsProgress { read: i32, pages: i32 },
}

/// Compares a (normalized) new page count against the book's live `read` value.
pub fn check_page_edit(book: &Book, new_pages: i32) -> PageEdit {
    if new_pages == book.pages {
        PageEdit::Unchanged
    } else if new_pages < book.read {
        PageEdit::ResetsProgress {
            read: book.read,
            pages: new_pages,
        }
    } else {
        PageEdit::KeepsProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn book(pages: i32, read: i32) -> Book {
        Book {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            title: "Dune".to_string(),
            cover: PLACEHOLDER_COVER.to_string(),
            pages,
            read,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn manual_add_with_title_only_gets_defaults() {
        let record = normalize_new_book(&NewBook::titled("Dune")).unwrap();
        assert_eq!(record.title, "Dune");
        assert_eq!(record.pages, 1);
        assert_eq!(record.read, 0);
        assert_eq!(record.cover, PLACEHOLDER_COVER);
    }

    #[test]
    fn add_rejects_blank_titles() {
        assert_eq!(
            normalize_new_book(&NewBook::titled("   ")),
            Err(ValidationError::EmptyTitle)
        );
    }

    #[test]
    fn add_clamps_read_into_page_range() {
        let input = NewBook {
            title: " Middlemarch ".to_string(),
            cover: Some("  ".to_string()),
            pages: Some(-20),
            read: Some(40),
        };
        let record = normalize_new_book(&input).unwrap();
        assert_eq!(record.title, "Middlemarch");
        assert_eq!(record.cover, PLACEHOLDER_COVER);
        assert_eq!(record.pages, 1);
        assert_eq!(record.read, 1);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let patch = BookPatch {
            pages: Some(0),
            read: Some(-3),
            ..Default::default()
        };
        let normalized = normalize_patch(&patch).unwrap();
        assert_eq!(normalized.title, None);
        assert_eq!(normalized.cover, None);
        assert_eq!(normalized.pages, Some(1));
        assert_eq!(normalized.read, Some(0));
    }

    #[test]
    fn patch_blank_cover_becomes_placeholder() {
        let patch = BookPatch {
            cover: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            normalize_patch(&patch).unwrap().cover.as_deref(),
            Some(PLACEHOLDER_COVER)
        );
    }

    #[test]
    fn patch_with_blank_title_is_rejected() {
        let patch = BookPatch {
            title: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(normalize_patch(&patch), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn supplied_read_is_clamped_to_effective_page_count() {
        let b = book(300, 150);

        let mut patch = BookPatch::read(999);
        fit_patch_to_book(&mut patch, &b);
        assert_eq!(patch.read, Some(300));

        let mut patch = BookPatch {
            pages: Some(450),
            read: Some(500),
            ..Default::default()
        };
        fit_patch_to_book(&mut patch, &b);
        assert_eq!(patch.read, Some(450));
    }

    #[test]
    fn fit_leaves_read_out_of_patches_that_keep_progress() {
        let b = book(300, 150);

        let mut patch = BookPatch {
            pages: Some(200),
            ..Default::default()
        };
        fit_patch_to_book(&mut patch, &b);
        assert_eq!(patch.read, None);

        let mut patch = BookPatch {
            pages: Some(100),
            ..Default::default()
        };
        fit_patch_to_book(&mut patch, &b);
        assert_eq!(patch.read, Some(100));
    }

    #[test]
    fn shrinking_pages_below_read_resets_progress() {
        let b = book(300, 150);
        assert_eq!(
            check_page_edit(&b, 100),
            PageEdit::ResetsProgress {
                read: 150,
                pages: 100
            }
        );
        assert_eq!(check_page_edit(&b, 150), PageEdit::KeepsProgress);
        assert_eq!(check_page_edit(&b, 400), PageEdit::KeepsProgress);
        assert_eq!(check_page_edit(&b, 300), PageEdit::Unchanged);
    }

    #[test]
    fn clamp_progress_handles_degenerate_page_counts() {
        assert_eq!(clamp_progress(50, 300), 50);
        assert_eq!(clamp_progress(301, 300), 300);
        assert_eq!(clamp_progress(-1, 300), 0);
        assert_eq!(clamp_progress(5, 0), 0);
        assert_eq!(clamp_progress(5, -10), 0);
    }
}
