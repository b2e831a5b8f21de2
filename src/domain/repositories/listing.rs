//! Paging, sorting and search parameters shared by the listing repositories.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    #[default]
    Title,
    Name,
    Description,
}

impl SortField {
    /// Parses a sort field, falling back to [`SortField::Title`] for unknown names.
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "id" => Self::Id,
            "name" => Self::Name,
            "description" => Self::Description,
            _ => Self::Title,
        }
    }

    /// Column name used in SQL `ORDER BY`.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Name => "name",
            Self::Description => "description",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One page request over configuration records.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// 1-indexed page number.
    pub page: i64,
    pub per_page: i64,
    pub sort: SortField,
    pub order: SortOrder,
    /// Case-insensitive substring matched against name, title and description.
    pub query: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            sort: SortField::default(),
            order: SortOrder::default(),
            query: None,
        }
    }
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.per_page
    }

    /// `%query%` pattern for SQL `ILIKE`, if a search term is set.
    pub fn like_pattern(&self) -> Option<String> {
        self.search_term().map(|q| {
            let escaped = q
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }

    fn search_term(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// In-process equivalent of the SQL search filter.
    pub fn matches(&self, name: &str, title: &str, description: Option<&str>) -> bool {
        let Some(term) = self.search_term() else {
            return true;
        };
        let term = term.to_lowercase();
        [Some(name), Some(title), description]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Sorts and pages `items` in process, mirroring the SQL behaviour.
    pub fn apply<T>(&self, mut items: Vec<T>, key: impl Fn(&T) -> SortKey<'_>) -> Page<T> {
        items.sort_by(|a, b| {
            let ordering = key(a).compare(&key(b), self.sort);
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = items.len() as i64;
        let items = items
            .into_iter()
            .skip(self.offset().max(0) as usize)
            .take(self.per_page.max(0) as usize)
            .collect();

        Page {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Sortable fields of a record, borrowed for in-process sorting.
pub struct SortKey<'a> {
    pub id: i64,
    pub name: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
}

impl SortKey<'_> {
    fn compare(&self, other: &Self, field: SortField) -> Ordering {
        let primary = match field {
            SortField::Id => self.id.cmp(&other.id),
            SortField::Name => self.name.cmp(other.name),
            SortField::Title => self.title.cmp(other.title),
            SortField::Description => self.description.cmp(&other.description),
        };
        primary.then(self.id.cmp(&other.id))
    }
}

/// One page of records plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key<'a>(item: &'a (i64, &'static str)) -> SortKey<'a> {
        SortKey {
            id: item.0,
            name: item.1,
            title: item.1,
            description: None,
        }
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(SortField::parse_lenient("NAME"), SortField::Name);
        assert_eq!(SortField::parse_lenient("created_at"), SortField::Title);
        assert_eq!(SortOrder::parse_lenient("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse_lenient("sideways"), SortOrder::Desc);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let query = ListQuery {
            query: Some(" 50%_off ".into()),
            ..ListQuery::default()
        };
        assert_eq!(query.like_pattern().as_deref(), Some("%50\\%\\_off%"));

        let blank = ListQuery {
            query: Some("   ".into()),
            ..ListQuery::default()
        };
        assert!(blank.like_pattern().is_none());
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let query = ListQuery {
            query: Some("GEO".into()),
            ..ListQuery::default()
        };
        assert!(query.matches("geo-ip", "Whatever", None));
        assert!(query.matches("x", "y", Some("maps geo data")));
        assert!(!query.matches("dns", "DNS", None));
    }

    #[test]
    fn test_apply_sorts_and_pages() {
        let items = vec![(1, "b"), (2, "a"), (3, "c")];
        let query = ListQuery {
            page: 1,
            per_page: 2,
            sort: SortField::Name,
            order: SortOrder::Asc,
            query: None,
        };

        let page = query.apply(items.clone(), key);
        assert_eq!(page.total, 3);
        assert_eq!(page.items, vec![(2, "a"), (1, "b")]);

        let second = ListQuery { page: 2, ..query };
        assert_eq!(second.apply(items, key).items, vec![(3, "c")]);
    }
}
