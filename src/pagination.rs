//! Server-supplied pagination metadata and the navigation cursor derived from it.

use serde::{Deserialize, Serialize};

/// Pagination metadata as returned in a list envelope's `meta`.
///
/// Read-only from the client side; replaced wholesale on every successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default)]
    pub total: u64,
    /// 1-based index of the first row on this page; `null` for an empty page.
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub to: Option<u64>,
}

impl PaginationMeta {
    /// Metadata for an unpaginated result of `len` rows.
    pub fn single_page(len: usize) -> Self {
        let total = len as u64;
        Self {
            current_page: 1,
            last_page: 1,
            total,
            from: (total > 0).then_some(1),
            to: (total > 0).then_some(total),
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::from_meta(Some(self))
    }
}

/// Navigation affordances derived from [`PaginationMeta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    current_page: u32,
    last_page: u32,
}

impl Cursor {
    /// Missing metadata yields an invisible cursor.
    pub fn from_meta(meta: Option<&PaginationMeta>) -> Self {
        match meta {
            Some(meta) => Self {
                current_page: meta.current_page,
                last_page: meta.last_page,
            },
            None => Self::default(),
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    /// Pagination controls are rendered only for more than one page.
    pub fn is_visible(&self) -> bool {
        self.last_page > 1
    }

    pub fn can_go_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn previous_page(&self) -> Option<u32> {
        self.can_go_previous().then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        self.can_go_next().then(|| self.current_page + 1)
    }

    /// Whether `page` is a valid jump target.
    pub fn contains(&self, page: u32) -> bool {
        page >= 1 && page <= self.last_page
    }
}
