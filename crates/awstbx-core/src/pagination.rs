//! Cursor-based pagination
//!
//! Remote listings hand back one [`Page`] at a time together with an opaque
//! continuation cursor. [`collect_pages`] drains such a listing into a single
//! ordered `Vec`, preserving page order and the order within each page.
//!
//! Listings that need two independent cursors (for example S3 object versions,
//! which continue from a key marker *and* a version-id marker) do not fit the
//! single-cursor [`Page`] shape. Those callers run their own local loop and
//! use [`cursor_present`] so the termination rule stays identical.

use crate::error::CoreError;
use std::collections::HashSet;
use std::future::Future;
use tracing::debug;

/// One page of a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in the order the remote returned them
    pub items: Vec<T>,
    /// Cursor for the next page. `None` or an empty string means "no more pages".
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// Whether another page follows this one.
    pub fn has_more(&self) -> bool {
        cursor_present(self.next_cursor.as_deref())
    }
}

/// A cursor counts as present only when it is `Some` and non-empty.
pub fn cursor_present(cursor: Option<&str>) -> bool {
    matches!(cursor, Some(c) if !c.is_empty())
}

/// Fetch every page of a listing and return the concatenated items.
///
/// `fetch` is called with `None` first and then with each returned cursor
/// until a page reports no cursor. The first error from `fetch` is returned
/// immediately and no further calls are made; items gathered so far are
/// discarded.
///
/// A listing that repeats a cursor would loop forever, so collection aborts
/// with [`CoreError::DuplicateCursor`] instead.
///
/// # Example
/// ```ignore
/// let ids = collect_pages(|cursor| client.list_file_systems_page(cursor)).await?;
/// ```
pub async fn collect_pages<T, E, F, Fut>(mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: From<CoreError>,
{
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.take()).await?;
        pages += 1;

        let has_more = page.has_more();
        debug!(
            page = pages,
            items = page.items.len(),
            has_more,
            "Fetched page"
        );
        items.extend(page.items);

        let next = match page.next_cursor {
            Some(next) if has_more => next,
            _ => return Ok(items),
        };

        if !seen.insert(next.clone()) {
            return Err(CoreError::DuplicateCursor(next).into());
        }
        cursor = Some(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::RefCell;

    /// Serve `pages` in order, recording the cursor each call received.
    fn scripted(
        pages: Vec<Page<u32>>,
    ) -> (
        RefCell<std::vec::IntoIter<Page<u32>>>,
        RefCell<Vec<Option<String>>>,
    ) {
        (RefCell::new(pages.into_iter()), RefCell::new(Vec::new()))
    }

    #[tokio::test]
    async fn collects_all_pages_in_order() {
        let (pages, calls) = scripted(vec![
            Page::new(vec![1, 2], Some("a".into())),
            Page::new(vec![3, 4], Some("b".into())),
            Page::last(vec![5, 6]),
        ]);

        let items: Vec<u32> = collect_pages(|cursor| {
            calls.borrow_mut().push(cursor);
            let page = pages.borrow_mut().next().expect("fetched past the last page");
            async move { Ok::<_, anyhow::Error>(page) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            *calls.borrow(),
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_listing_makes_exactly_one_call() {
        let (pages, calls) = scripted(vec![Page::last(vec![])]);

        let items: Vec<u32> = collect_pages(|cursor| {
            calls.borrow_mut().push(cursor);
            let page = pages.borrow_mut().next().unwrap();
            async move { Ok::<_, anyhow::Error>(page) }
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn empty_cursor_ends_collection() {
        let (pages, calls) = scripted(vec![
            Page::new(vec![7], Some(String::new())),
            Page::last(vec![8]),
        ]);

        let items: Vec<u32> = collect_pages(|cursor| {
            calls.borrow_mut().push(cursor);
            let page = pages.borrow_mut().next().unwrap();
            async move { Ok::<_, anyhow::Error>(page) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![7]);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn first_error_stops_collection() {
        let calls = RefCell::new(0u32);

        let result: Result<Vec<u32>, anyhow::Error> = collect_pages(|_cursor| {
            *calls.borrow_mut() += 1;
            let call = *calls.borrow();
            async move {
                if call == 2 {
                    Err(anyhow!("AccessDenied"))
                } else {
                    Ok(Page::new(vec![call], Some(format!("cursor-{call}"))))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "AccessDenied");
        assert_eq!(*calls.borrow(), 2);
    }

    #[tokio::test]
    async fn repeated_cursor_is_rejected() {
        let calls = RefCell::new(0u32);

        let result: Result<Vec<u32>, anyhow::Error> = collect_pages(|_cursor| {
            *calls.borrow_mut() += 1;
            async move { Ok(Page::new(vec![1], Some("same".to_string()))) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::DuplicateCursor(c)) if c == "same"
        ));
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn cursor_presence() {
        assert!(!cursor_present(None));
        assert!(!cursor_present(Some("")));
        assert!(cursor_present(Some("token")));
        assert!(Page::new(vec![1], Some("x".into())).has_more());
        assert!(!Page::<u32>::last(vec![]).has_more());
    }
}
