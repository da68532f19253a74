//! Offset and cursor pagination parameters.
//!
//! Both strategies parse leniently: only the leading integer of a value
//! is read, and a missing, unparseable or zero value falls back to the
//! default. Negative values are rejected, except
//! `limit=-1` on offset pagination which means "no limit".

use std::fmt;

use crate::collection::HateoasLogCollection;
use crate::error::{LogError, Result};
use crate::links::{CollectionLinks, LinkBuilder};
use crate::params::QueryParams;

/// Default page size.
pub const DEFAULT_LIMIT: usize = 10;

/// Default page number.
pub const DEFAULT_PAGE: usize = 1;

/// Message returned when a page past the end is requested.
pub const PAGE_NOT_FOUND: &str = "Page not found";

/// Reads the leading integer of a parameter, so `5abc` is 5 and `2.5` is 2.
fn parse_int(params: &QueryParams, key: &str) -> Option<i64> {
    let raw = params.get(key)?.trim_start();
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value: i64 = rest[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

fn positive(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|v| *v > 0)
}

/// Page size for offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// At most this many records.
    Bounded(usize),
    /// Every matching record.
    Unbounded,
}

impl PageLimit {
    /// Returns the bound, if any.
    #[must_use]
    pub const fn get(&self) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(*n),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("-1"),
        }
    }
}

/// Page-number pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetPagination {
    page: usize,
    limit: PageLimit,
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: PageLimit::Bounded(DEFAULT_LIMIT),
        }
    }
}

impl OffsetPagination {
    /// Creates pagination for a page and limit.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `page` is zero or the limit is zero.
    pub fn new(page: usize, limit: PageLimit) -> Result<Self> {
        if page == 0 {
            return Err(LogError::validation("page must be a positive integer"));
        }
        if limit == PageLimit::Bounded(0) {
            return Err(LogError::validation("limit must be a positive integer or -1"));
        }
        Ok(Self { page, limit })
    }

    /// Reads `page` and `limit` from the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative page, or a negative
    /// limit other than `-1`.
    pub fn from_params(params: &QueryParams) -> Result<Self> {
        Self::from_params_with_default(params, DEFAULT_LIMIT)
    }

    /// Like [`Self::from_params`] with a custom default page size.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_params`].
    pub fn from_params_with_default(params: &QueryParams, default_limit: usize) -> Result<Self> {
        let limit = match parse_int(params, "limit") {
            Some(-1) => PageLimit::Unbounded,
            Some(n) if n < 0 => {
                return Err(LogError::validation("limit must be a positive integer or -1"));
            }
            Some(n) => PageLimit::Bounded(positive(n).unwrap_or(default_limit)),
            None => PageLimit::Bounded(default_limit),
        };

        let page = match parse_int(params, "page") {
            Some(n) if n < 0 => {
                return Err(LogError::validation("page must be a positive integer"));
            }
            Some(n) => positive(n).unwrap_or(DEFAULT_PAGE),
            None => DEFAULT_PAGE,
        };

        Self::new(page, limit)
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> PageLimit {
        self.limit
    }

    /// Records to skip before this page. Always zero when unbounded.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self.limit {
            PageLimit::Bounded(n) => (self.page - 1).saturating_mul(n),
            PageLimit::Unbounded => 0,
        }
    }

    /// Fails with "Page not found" for an empty page past the first.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::NotFound`] when the page is empty and not page 1.
    pub fn ensure_page_exists(&self, collection: &HateoasLogCollection) -> Result<()> {
        if collection.is_empty() && self.page != DEFAULT_PAGE {
            return Err(LogError::NotFound(PAGE_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    /// Trims the lookahead record and attaches `previous`/`next` links.
    ///
    /// `extras` are appended after `page` and `limit` on both links.
    pub fn apply_links(
        &self,
        collection: &mut HateoasLogCollection,
        path: &str,
        extras: &[(&str, String)],
    ) {
        let link = |page: usize| {
            extras
                .iter()
                .fold(
                    LinkBuilder::new(path)
                        .param("page", page)
                        .param("limit", self.limit),
                    |builder, (key, value)| builder.param(*key, value),
                )
                .build()
        };

        let mut links = CollectionLinks::default();
        if self.page > 1 {
            links.previous = Some(link(self.page - 1));
        }
        if let PageLimit::Bounded(limit) = self.limit {
            if collection.len() > limit {
                collection.truncate(limit);
                links.next = Some(link(self.page + 1));
            }
        }
        collection.links = Some(links);
    }
}

/// Keyset pagination driven by the last-seen record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPagination {
    limit: usize,
}

impl Default for CursorPagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

impl CursorPagination {
    /// Reads `limit` from the request. The cursor itself is a filter.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative limit.
    pub fn from_params(params: &QueryParams) -> Result<Self> {
        Self::from_params_with_default(params, DEFAULT_LIMIT)
    }

    /// Like [`Self::from_params`] with a custom default page size.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_params`].
    pub fn from_params_with_default(params: &QueryParams, default_limit: usize) -> Result<Self> {
        let limit = match parse_int(params, "limit") {
            Some(n) if n < 0 => {
                return Err(LogError::validation("limit must be a positive integer"));
            }
            Some(n) => positive(n).unwrap_or(default_limit),
            None => default_limit,
        };
        Ok(Self {
            limit: limit.max(1),
        })
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Attaches a `next` link when the page is full and ends on a
    /// classified record.
    pub fn apply_links(&self, collection: &mut HateoasLogCollection, path: &str) {
        let mut links = CollectionLinks::default();
        if collection.len() == self.limit {
            links.next = collection.next_cursor().map(|cursor| {
                LinkBuilder::new(path)
                    .param("cursor", cursor)
                    .param("limit", self.limit)
                    .build()
            });
        }
        collection.links = Some(links);
    }
}
