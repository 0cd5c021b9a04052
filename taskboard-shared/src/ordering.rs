//! Dynamic ordering and pagination
//!
//! List endpoints accept an order specification such as
//! `"status desc, dueDate"`: a comma-separated list of `field [asc|desc]`
//! clauses applied in left-to-right priority. Each entity publishes an
//! explicit allow-list of sortable fields through [`SortField`], so every
//! name maps to a typed comparator (for in-process data) and to a fixed SQL
//! column (for PostgreSQL). Unknown names are rejected when the string is
//! parsed, before any query runs.
//!
//! Pagination is 1-based: page `p` of size `s` skips `(p - 1) * s` items and
//! takes `s`.
//!
//! # Example
//!
//! ```
//! use taskboard_shared::models::project::ProjectSortField;
//! use taskboard_shared::ordering::{OrderBy, SortDirection};
//!
//! let order = OrderBy::<ProjectSortField>::parse(Some("status desc, start_date")).unwrap();
//! assert_eq!(order.clauses()[0].field, ProjectSortField::Status);
//! assert_eq!(order.clauses()[0].direction, SortDirection::Desc);
//! assert_eq!(
//!     order.to_sql(),
//!     "status DESC NULLS LAST, start_date ASC NULLS FIRST, id ASC"
//! );
//! ```

use crate::validation::ValidationErrors;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Sort direction of a single clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first (`None` before `Some` for optional fields)
    #[default]
    Asc,

    /// Largest first
    Desc,
}

impl SortDirection {
    /// Applies this direction to an ascending comparison
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    // NULLS placement mirrors `Option`'s ordering so both stores agree.
    fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC NULLS FIRST",
            SortDirection::Desc => "DESC NULLS LAST",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

/// Allow-listed sortable field of an entity
///
/// Implementors are small `Copy` enums, one variant per sortable field.
pub trait SortField: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The entity this field belongs to
    type Entity;

    /// Accepted names, in camelCase, paired with the field they select
    const FIELDS: &'static [(&'static str, Self)];

    /// Identity field, used as the final tie-breaker
    const IDENTITY: Self;

    /// Field used when no order is requested
    const DEFAULT: Self;

    /// SQL column backing this field
    fn column(self) -> &'static str;

    /// Ascending comparison of two entities on this field
    fn compare(self, a: &Self::Entity, b: &Self::Entity) -> Ordering;

    /// Looks up a field by name, ignoring case and underscores
    fn lookup(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Self::FIELDS
            .iter()
            .find(|(candidate, _)| normalize(candidate) == wanted)
            .map(|(_, field)| *field)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// One `field direction` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortClause<F> {
    /// Field to compare
    pub field: F,

    /// Direction of the comparison
    pub direction: SortDirection,
}

/// Error parsing an order specification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderByError {
    /// Field name is not in the entity's allow-list
    #[error("Cannot order by '{field}'. Allowed fields: {allowed}")]
    UnknownField {
        /// Rejected field name
        field: String,
        /// Comma-separated allow-list
        allowed: String,
    },

    /// Direction token is neither `asc` nor `desc`
    #[error("Sort direction '{0}' must be 'asc' or 'desc'")]
    UnknownDirection(String),

    /// Clause has more than two tokens
    #[error("Sort clause '{0}' must look like 'field [asc|desc]'")]
    MalformedClause(String),
}

impl From<OrderByError> for ValidationErrors {
    fn from(err: OrderByError) -> Self {
        ValidationErrors::single("orderBy", err.to_string())
    }
}

/// A parsed, allow-listed order specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy<F> {
    clauses: Vec<SortClause<F>>,
}

impl<F: SortField> Default for OrderBy<F> {
    fn default() -> Self {
        Self::by(F::DEFAULT, SortDirection::Asc)
    }
}

impl<F: SortField> OrderBy<F> {
    /// Orders by a single field
    pub fn by(field: F, direction: SortDirection) -> Self {
        Self {
            clauses: vec![SortClause { field, direction }],
        }
    }

    /// Parses an order specification
    ///
    /// `None`, an empty string, or a string of empty clauses yields the
    /// entity's default order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderByError`] for unknown fields, unknown directions, or
    /// clauses with more than two tokens.
    pub fn parse(spec: Option<&str>) -> Result<Self, OrderByError> {
        let mut clauses = Vec::new();

        for raw in spec.unwrap_or_default().split(',') {
            let mut tokens = raw.split_whitespace();
            let Some(name) = tokens.next() else {
                continue;
            };

            let field = F::lookup(name).ok_or_else(|| OrderByError::UnknownField {
                field: name.to_string(),
                allowed: F::FIELDS
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

            let direction = match tokens.next() {
                None => SortDirection::Asc,
                Some(token) => SortDirection::parse(token)
                    .ok_or_else(|| OrderByError::UnknownDirection(token.to_string()))?,
            };

            if tokens.next().is_some() {
                return Err(OrderByError::MalformedClause(raw.trim().to_string()));
            }

            clauses.push(SortClause { field, direction });
        }

        if clauses.is_empty() {
            return Ok(Self::default());
        }

        Ok(Self { clauses })
    }

    /// Clauses in priority order
    pub fn clauses(&self) -> &[SortClause<F>] {
        &self.clauses
    }

    /// Compares two entities clause by clause, then by identity
    pub fn compare(&self, a: &F::Entity, b: &F::Entity) -> Ordering {
        self.clauses
            .iter()
            .map(|clause| clause.direction.apply(clause.field.compare(a, b)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| F::IDENTITY.compare(a, b))
    }

    /// Renders the `ORDER BY` list (without the keyword)
    ///
    /// Only allow-listed column names are emitted. The identity column is
    /// appended when no clause already orders by it, so pages are stable.
    pub fn to_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| format!("{} {}", clause.field.column(), clause.direction.sql()))
            .collect();

        if !self.clauses.iter().any(|clause| clause.field == F::IDENTITY) {
            parts.push(format!("{} ASC", F::IDENTITY.column()));
        }

        parts.join(", ")
    }
}

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            size: Self::DEFAULT_SIZE,
        }
    }
}

impl PageRequest {
    /// Page used when the caller does not ask for one
    pub const DEFAULT_PAGE: u32 = 1;

    /// Page size used when the caller does not ask for one
    pub const DEFAULT_SIZE: u32 = 10;

    /// Largest accepted page size
    pub const MAX_SIZE: u32 = 100;

    /// Validates raw page and size values
    ///
    /// # Errors
    ///
    /// Returns one field error per invalid value: `page` must be greater
    /// than 0, `size` must be within `1..=100`.
    pub fn new(page: i64, size: i64) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let page = match u32::try_from(page) {
            Ok(page) if page > 0 => page,
            _ => {
                errors.push("page", "Page number must be greater than 0");
                Self::DEFAULT_PAGE
            }
        };

        let size = match u32::try_from(size) {
            Ok(size) if (1..=Self::MAX_SIZE).contains(&size) => size,
            _ => {
                errors.push(
                    "size",
                    format!("Page size must be between 1 and {}", Self::MAX_SIZE),
                );
                Self::DEFAULT_SIZE
            }
        };

        errors.into_result().map(|()| Self { page, size })
    }

    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page size
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of items to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    /// Slices an already-ordered sequence down to this page
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(self.size as usize)
            .collect()
    }
}

/// Orders a sequence with `order`, then cuts out the requested page
pub fn order_and_paginate<F: SortField>(
    mut items: Vec<F::Entity>,
    order: &OrderBy<F>,
    page: PageRequest,
) -> Vec<F::Entity> {
    items.sort_by(|a, b| order.compare(a, b));
    page.slice(items)
}

/// One page of results plus the totals needed to navigate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// 1-based page number
    pub current_page: u32,

    /// Requested page size
    pub page_size: u32,

    /// Number of pages at this size
    pub total_pages: u64,

    /// Number of items across all pages
    pub total_items: u64,

    /// Whether a previous page exists
    pub has_previous: bool,

    /// Whether a next page exists
    pub has_next: bool,
}

impl<T> Paginated<T> {
    /// Wraps a page of items with totals computed from `total_items`
    pub fn new(items: Vec<T>, page: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(page.size()));

        Self {
            items,
            current_page: page.page(),
            page_size: page.size(),
            total_pages,
            total_items,
            has_previous: page.page() > 1,
            has_next: u64::from(page.page()) < total_pages,
        }
    }

    /// Converts every item, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            total_items: self.total_items,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        name: &'static str,
        rank: Option<u8>,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum RowField {
        Id,
        Name,
        Rank,
    }

    impl SortField for RowField {
        type Entity = Row;

        const FIELDS: &'static [(&'static str, Self)] = &[
            ("id", RowField::Id),
            ("name", RowField::Name),
            ("rankOrder", RowField::Rank),
        ];
        const IDENTITY: Self = RowField::Id;
        const DEFAULT: Self = RowField::Id;

        fn column(self) -> &'static str {
            match self {
                RowField::Id => "id",
                RowField::Name => "name",
                RowField::Rank => "rank_order",
            }
        }

        fn compare(self, a: &Row, b: &Row) -> Ordering {
            match self {
                RowField::Id => a.id.cmp(&b.id),
                RowField::Name => a.name.cmp(b.name),
                RowField::Rank => a.rank.cmp(&b.rank),
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 3, name: "carol", rank: Some(1) },
            Row { id: 1, name: "alice", rank: Some(2) },
            Row { id: 4, name: "bob", rank: None },
            Row { id: 2, name: "alice", rank: Some(1) },
        ]
    }

    fn ids(rows: &[Row]) -> Vec<u32> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_default_order_is_identity() {
        let order = OrderBy::<RowField>::parse(None).unwrap();
        let page = PageRequest::default();
        assert_eq!(ids(&order_and_paginate(rows(), &order, page)), vec![1, 2, 3, 4]);

        let blank = OrderBy::<RowField>::parse(Some("  , ")).unwrap();
        assert_eq!(blank, OrderBy::default());
    }

    #[test]
    fn test_descending_single_field() {
        let order = OrderBy::<RowField>::parse(Some("name DESC")).unwrap();
        let sorted = order_and_paginate(rows(), &order, PageRequest::default());
        // Equal names fall back to identity ascending.
        assert_eq!(ids(&sorted), vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_clauses_apply_left_to_right() {
        let order = OrderBy::<RowField>::parse(Some("name asc, rank_order desc")).unwrap();
        let sorted = order_and_paginate(rows(), &order, PageRequest::default());
        assert_eq!(ids(&sorted), vec![1, 2, 4, 3]);
    }

    #[test]
    fn test_none_sorts_first_ascending() {
        let order = OrderBy::<RowField>::parse(Some("RankOrder")).unwrap();
        let sorted = order_and_paginate(rows(), &order, PageRequest::default());
        assert_eq!(ids(&sorted), vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = OrderBy::<RowField>::parse(Some("password desc")).unwrap_err();
        assert_eq!(
            err,
            OrderByError::UnknownField {
                field: "password".to_string(),
                allowed: "id, name, rankOrder".to_string(),
            }
        );

        let errors: ValidationErrors = err.into();
        assert!(errors.contains("orderBy"));
    }

    #[test]
    fn test_bad_direction_and_extra_tokens() {
        assert_eq!(
            OrderBy::<RowField>::parse(Some("name sideways")).unwrap_err(),
            OrderByError::UnknownDirection("sideways".to_string())
        );
        assert_eq!(
            OrderBy::<RowField>::parse(Some("name asc please")).unwrap_err(),
            OrderByError::MalformedClause("name asc please".to_string())
        );
    }

    #[test]
    fn test_to_sql_uses_columns_and_tiebreak() {
        let order = OrderBy::<RowField>::parse(Some("rankOrder desc")).unwrap();
        assert_eq!(order.to_sql(), "rank_order DESC NULLS LAST, id ASC");

        let order = OrderBy::<RowField>::parse(Some("id desc")).unwrap();
        assert_eq!(order.to_sql(), "id DESC NULLS LAST");
    }

    #[test]
    fn test_page_request_validation() {
        assert!(PageRequest::new(1, 10).is_ok());
        assert!(PageRequest::new(3, 100).is_ok());

        let errors = PageRequest::new(0, 101).unwrap_err();
        assert!(errors.contains("page"));
        assert!(errors.contains("size"));
        assert_eq!(errors.len(), 2);

        let errors = PageRequest::new(1, 0).unwrap_err();
        assert_eq!(errors.messages_for("size"), vec!["Page size must be between 1 and 100"]);

        assert!(PageRequest::new(-4, 10).is_err());
    }

    #[test]
    fn test_second_page_of_twenty_five() {
        let items: Vec<u32> = (1..=25).collect();
        let page = PageRequest::new(2, 10).unwrap();

        let slice = page.slice(items);
        assert_eq!(slice, (11..=20).collect::<Vec<_>>());

        let paginated = Paginated::new(slice, page, 25);
        assert_eq!(paginated.items.len(), 10);
        assert_eq!(paginated.total_pages, 3);
        assert!(paginated.has_previous);
        assert!(paginated.has_next);
    }

    #[test]
    fn test_last_and_empty_pages() {
        let page = PageRequest::new(3, 10).unwrap();
        let paginated = Paginated::new(page.slice(1..=25), page, 25);
        assert_eq!(paginated.items, vec![21, 22, 23, 24, 25]);
        assert!(!paginated.has_next);

        let empty: Paginated<u32> = Paginated::new(Vec::new(), PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_previous);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_paginated_serializes_camel_case() {
        let page = PageRequest::new(1, 2).unwrap();
        let json = serde_json::to_value(Paginated::new(vec!["a"], page, 1)).unwrap();
        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["pageSize"], 2);
        assert_eq!(json["totalItems"], 1);
        assert_eq!(json["hasNext"], false);
    }
}
