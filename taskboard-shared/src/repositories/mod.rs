//! Persistence ports
//!
//! One `#[async_trait]` trait per aggregate. Handlers only ever see these
//! traits, bundled as [`Repositories`], so the same orchestration runs
//! against PostgreSQL ([`postgres`]) and the in-process store ([`memory`]).
//!
//! Every method takes a [`CancellationToken`]. Implementations stop work
//! and return [`RepositoryError::Cancelled`] once it fires; nothing above
//! this layer polls the token.
//!
//! # Example
//!
//! ```
//! use taskboard_shared::models::project::ProjectSortField;
//! use taskboard_shared::ordering::{OrderBy, PageRequest};
//! use taskboard_shared::repositories::{ProjectFilter, Repositories};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repos = Repositories::in_memory();
//! let cancel = CancellationToken::new();
//!
//! let filter = ProjectFilter::default();
//! let page = repos
//!     .projects
//!     .list(&filter, &OrderBy::<ProjectSortField>::default(), PageRequest::default(), &cancel)
//!     .await?;
//! assert!(page.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

use crate::models::{
    project::{Project, ProjectSortField, ProjectStatus},
    task::{Task, TaskPriority, TaskSortField, TaskStatus},
    user::{User, UserSortField, UserStatus},
};
use crate::ordering::{OrderBy, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Errors surfaced by a store
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The caller's cancellation token fired before the operation finished
    #[error("operation cancelled")]
    Cancelled,

    /// A uniqueness constraint rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return RepositoryError::Conflict(
                    db_err.constraint().unwrap_or("unique").to_string(),
                );
            }
        }
        RepositoryError::Database(err)
    }
}

/// Result alias for repository calls
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Criteria for listing projects; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub user_id: Option<Uuid>,
}

impl ProjectFilter {
    /// Whether `project` satisfies every set criterion
    pub fn matches(&self, project: &Project) -> bool {
        self.status.map_or(true, |status| project.status() == status)
            && self.user_id.map_or(true, |id| project.user_id() == id)
    }
}

/// Criteria for listing tasks; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Only tasks due strictly before this instant
    pub due_before: Option<DateTime<Utc>>,
}

impl TaskFilter {
    /// Tasks belonging to one project
    pub fn for_project(project_id: Uuid) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    /// Tasks assigned to one user
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Whether `task` satisfies every set criterion
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |status| task.status() == status)
            && self.priority.map_or(true, |priority| task.priority() == priority)
            && self.project_id.map_or(true, |id| task.project_id() == id)
            && self.user_id.map_or(true, |id| task.user_id() == id)
            && self.due_before.map_or(true, |due| task.due_date() < due)
    }
}

/// Criteria for listing users; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub status: Option<UserStatus>,
}

impl UserFilter {
    /// Whether `user` satisfies every set criterion
    pub fn matches(&self, user: &User) -> bool {
        self.status.map_or(true, |status| user.status() == status)
    }
}

/// Persistence contract for projects
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Inserts a new project
    async fn add(&self, project: &Project, cancel: &CancellationToken) -> RepositoryResult<()>;

    /// Overwrites a stored project; `false` if it does not exist
    async fn update(&self, project: &Project, cancel: &CancellationToken) -> RepositoryResult<bool>;

    /// Removes a project (and, through the schema, its tasks); `false` if it
    /// does not exist
    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool>;

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<Project>>;

    /// One ordered page of projects matching `filter`
    async fn list(
        &self,
        filter: &ProjectFilter,
        order: &OrderBy<ProjectSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<Project>>;

    /// Number of projects matching `filter`
    async fn count(&self, filter: &ProjectFilter, cancel: &CancellationToken) -> RepositoryResult<u64>;
}

/// Persistence contract for tasks
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn add(&self, task: &Task, cancel: &CancellationToken) -> RepositoryResult<()>;

    /// Overwrites a stored task; `false` if it does not exist
    async fn update(&self, task: &Task, cancel: &CancellationToken) -> RepositoryResult<bool>;

    /// Removes a task; `false` if it does not exist
    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool>;

    /// Removes every task of a project, returning how many were removed
    async fn delete_by_project(&self, project_id: Uuid, cancel: &CancellationToken) -> RepositoryResult<u64>;

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<Task>>;

    /// Every task of a project, soonest due first
    async fn find_by_project(&self, project_id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Vec<Task>>;

    /// One ordered page of tasks matching `filter`
    async fn list(
        &self,
        filter: &TaskFilter,
        order: &OrderBy<TaskSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<Task>>;

    /// Number of tasks matching `filter`
    async fn count(&self, filter: &TaskFilter, cancel: &CancellationToken) -> RepositoryResult<u64>;
}

/// Persistence contract for users
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user; `Conflict` if the email is taken
    async fn add(&self, user: &User, cancel: &CancellationToken) -> RepositoryResult<()>;

    /// Overwrites a stored user; `false` if it does not exist
    async fn update(&self, user: &User, cancel: &CancellationToken) -> RepositoryResult<bool>;

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool>;

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn get_by_email(&self, email: &str, cancel: &CancellationToken) -> RepositoryResult<Option<User>>;

    async fn list(
        &self,
        filter: &UserFilter,
        order: &OrderBy<UserSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<User>>;

    async fn count(&self, filter: &UserFilter, cancel: &CancellationToken) -> RepositoryResult<u64>;
}

/// Which store backs a [`Repositories`] bundle
#[derive(Debug, Clone)]
pub enum Backend {
    /// PostgreSQL through a shared pool
    Postgres(PgPool),
    /// Process-local maps
    Memory,
}

impl Backend {
    /// Short name for health reporting
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Postgres(_) => "postgres",
            Backend::Memory => "memory",
        }
    }
}

/// The repositories handed to every handler
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    backend: Backend,
}

impl Repositories {
    /// Repositories backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            projects: Arc::new(postgres::PgProjectRepository::new(pool.clone())),
            tasks: Arc::new(postgres::PgTaskRepository::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    /// Repositories sharing one empty in-process store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            projects: store.clone(),
            tasks: store,
            backend: Backend::Memory,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Checks that the backing store answers
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if PostgreSQL does not respond.
    pub async fn ping(&self) -> RepositoryResult<()> {
        match &self.backend {
            Backend::Postgres(pool) => crate::db::pool::health_check(pool).await.map_err(RepositoryError::from),
            Backend::Memory => Ok(()),
        }
    }
}
