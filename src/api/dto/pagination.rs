//! Paging, sorting and search query parameters.

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{DisplayFromStr, serde_as};

use crate::domain::repositories::{ListQuery, Page, SortField, SortOrder};
use crate::error::AppError;

const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 500;

/// Listing query parameters.
///
/// Uses `serde_with` to parse numbers and flags from query strings.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<i64>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub per_page: Option<i64>,

    /// `id`, `title`, `description` or `name`; anything else sorts by title.
    #[serde(default)]
    pub sort: Option<String>,

    /// `asc` or `desc` (default).
    #[serde(default)]
    pub order: Option<String>,

    #[serde(default)]
    pub query: Option<String>,

    /// Tables only: also return the referenced caches and adapters.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub resolve: Option<bool>,
}

impl ListParams {
    /// Validates the parameters and converts them into a repository query.
    ///
    /// # Defaults
    ///
    /// - `page`: 1
    /// - `per_page`: 50
    /// - `sort`: title, `order`: desc
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `page` is below 1 or `per_page`
    /// is outside `1..=500`.
    pub fn to_query(&self) -> Result<ListQuery, AppError> {
        let page = self.page.unwrap_or(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);

        if page < 1 {
            return Err(AppError::bad_request(
                "Page must be greater than 0",
                json!({ "page": page }),
            ));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(AppError::bad_request(
                format!("per_page must be between 1 and {MAX_PER_PAGE}"),
                json!({ "per_page": per_page }),
            ));
        }

        Ok(ListQuery {
            page,
            per_page,
            sort: self
                .sort
                .as_deref()
                .map(SortField::parse_lenient)
                .unwrap_or_default(),
            order: self
                .order
                .as_deref()
                .map(SortOrder::parse_lenient)
                .unwrap_or_default(),
            query: self.query.clone(),
        })
    }

    pub fn resolve(&self) -> bool {
        self.resolve.unwrap_or(false)
    }
}

/// Paging metadata included in every listing response.
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub query: Option<String>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    /// Number of items on this page.
    pub count: usize,
}

impl PageMeta {
    pub fn of<T>(page: &Page<T>, query: &ListQuery) -> Self {
        Self {
            query: query.query.clone(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            count: page.items.len(),
        }
    }
}
