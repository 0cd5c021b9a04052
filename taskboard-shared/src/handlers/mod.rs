//! Command and query handlers
//!
//! One free `async fn` per operation. A handler validates its input,
//! resolves the entities it references, applies the change and persists it
//! through [`Repositories`](crate::repositories::Repositories). Nothing here
//! knows about HTTP; the API crate maps [`HandlerError`] onto status codes.
//!
//! # Example
//!
//! ```
//! use taskboard_shared::handlers::projects::{list_projects, GetProjectsListQuery};
//! use taskboard_shared::handlers::PageQuery;
//! use taskboard_shared::repositories::Repositories;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), taskboard_shared::handlers::HandlerError> {
//! let repos = Repositories::in_memory();
//! let query = GetProjectsListQuery {
//!     paging: PageQuery {
//!         order_by: Some("startDate desc, name".to_string()),
//!         ..PageQuery::default()
//!     },
//!     ..GetProjectsListQuery::default()
//! };
//!
//! let page = list_projects(&repos, query, &CancellationToken::new()).await?;
//! assert_eq!(page.total_items, 0);
//! # Ok(())
//! # }
//! ```

pub mod projects;
pub mod tasks;
pub mod users;

use crate::auth::password::PasswordError;
use crate::models::{Labelled, UnknownVariant};
use crate::ordering::{OrderBy, PageRequest, SortField};
use crate::repositories::{RepositoryError, RepositoryResult};
use crate::validation::ValidationErrors;
use uuid::Uuid;

/// Why a handler refused or failed an operation
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The input broke one or more rules; nothing was changed
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// The change clashes with existing state
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl HandlerError {
    pub(crate) fn not_found(kind: &str, id: Uuid) -> Self {
        HandlerError::NotFound(format!("{} {} not found", kind, id))
    }
}

/// Result alias for handlers
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Paging and ordering shared by every list query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number; defaults to 1
    pub page: Option<i64>,
    /// Items per page; defaults to 10
    pub size: Option<i64>,
    /// Order specification such as `"dueDate desc, title"`
    pub order_by: Option<String>,
}

impl PageQuery {
    /// Parses paging and ordering, recording every failure in `errors`
    pub(crate) fn resolve<F: SortField>(
        &self,
        errors: &mut ValidationErrors,
    ) -> Option<(OrderBy<F>, PageRequest)> {
        let page = PageRequest::new(
            self.page.unwrap_or(i64::from(PageRequest::DEFAULT_PAGE)),
            self.size.unwrap_or(i64::from(PageRequest::DEFAULT_SIZE)),
        )
        .map_err(|e| errors.merge(e))
        .ok();

        let order = OrderBy::parse(self.order_by.as_deref())
            .map_err(|e| errors.merge(e.into()))
            .ok();

        order.zip(page)
    }
}

/// Parses an optional enum filter; blank counts as absent
pub(crate) fn parse_filter<T>(field: &str, raw: Option<&str>, errors: &mut ValidationErrors) -> Option<T>
where
    T: Labelled + std::str::FromStr<Err = UnknownVariant>,
{
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    raw.parse().map_err(|e: UnknownVariant| errors.push(field, e.to_string())).ok()
}

/// Turns a missing lookup result into `NotFound`
pub(crate) fn found<T>(lookup: RepositoryResult<Option<T>>, kind: &str, id: Uuid) -> HandlerResult<T> {
    lookup?.ok_or_else(|| HandlerError::not_found(kind, id))
}

/// Unwraps a field that validation already proved present
pub(crate) fn require<T>(value: Option<T>, field: &str, message: &str) -> Result<T, ValidationErrors> {
    value.ok_or_else(|| ValidationErrors::single(field, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskSortField, TaskStatus};

    #[test]
    fn test_page_query_defaults() {
        let mut errors = ValidationErrors::new();
        let (order, page) = PageQuery::default()
            .resolve::<TaskSortField>(&mut errors)
            .expect("defaults should resolve");

        assert!(errors.is_empty());
        assert_eq!(order, OrderBy::default());
        assert_eq!((page.page(), page.size()), (1, 10));
    }

    #[test]
    fn test_page_query_collects_every_failure() {
        let query = PageQuery {
            page: Some(0),
            size: Some(500),
            order_by: Some("colour".to_string()),
        };

        let mut errors = ValidationErrors::new();
        assert!(query.resolve::<TaskSortField>(&mut errors).is_none());
        assert!(errors.contains("page"));
        assert!(errors.contains("size"));
        assert!(errors.contains("orderBy"));
    }

    #[test]
    fn test_parse_filter() {
        let mut errors = ValidationErrors::new();
        assert_eq!(
            parse_filter::<TaskStatus>("status", Some("in_progress"), &mut errors),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(parse_filter::<TaskStatus>("status", Some("  "), &mut errors), None);
        assert!(errors.is_empty());

        assert_eq!(parse_filter::<TaskStatus>("status", Some("Someday"), &mut errors), None);
        assert_eq!(
            errors.messages_for("status"),
            vec!["'Someday' is not a valid TaskStatus value"]
        );
    }
}
