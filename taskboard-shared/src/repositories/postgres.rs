//! PostgreSQL store
//!
//! Runtime-checked sqlx queries against the schema in `migrations/`. List
//! queries are assembled with [`QueryBuilder`]: filter values are always
//! bound parameters, and the `ORDER BY` list comes from
//! [`OrderBy::to_sql`], which only emits allow-listed column names.
//!
//! Every statement is raced against the caller's cancellation token, so an
//! abandoned request stops waiting on the database.

use super::{
    ProjectFilter, ProjectRepository, RepositoryError, RepositoryResult, TaskFilter,
    TaskRepository, UserFilter, UserRepository,
};
use crate::models::{
    project::{Project, ProjectSortField},
    task::{Task, TaskSortField},
    user::{User, UserSortField},
};
use crate::ordering::{OrderBy, PageRequest, SortField};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

const PROJECT_COLUMNS: &str =
    "id, name, description, start_date, end_date, status, user_id, created_at, updated_at";

const TASK_COLUMNS: &str = "id, title, description, due_date, status, priority, project_id, \
                            user_id, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, phone, status, role, created_at, updated_at";

/// Runs `operation` unless `cancel` fires first
async fn guarded<T, F>(cancel: &CancellationToken, operation: F) -> RepositoryResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RepositoryError::Cancelled),
        result = operation => result.map_err(RepositoryError::from),
    }
}

fn push_page<F: SortField>(builder: &mut QueryBuilder<'_, Postgres>, order: &OrderBy<F>, page: PageRequest) {
    builder.push(" ORDER BY ").push(order.to_sql());
    builder.push(" LIMIT ").push_bind(i64::from(page.size()));
    builder
        .push(" OFFSET ")
        .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
}

fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn push_project_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProjectFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
}

fn push_task_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }
    if let Some(project_id) = filter.project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(due_before) = filter.due_before {
        builder.push(" AND due_date < ").push_bind(due_before);
    }
}

fn push_user_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

/// Project repository over a connection pool
#[derive(Debug, Clone)]
pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn add(&self, project: &Project, cancel: &CancellationToken) -> RepositoryResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, start_date, end_date, status,
                                  user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(project.id())
        .bind(project.name())
        .bind(project.description())
        .bind(project.start_date())
        .bind(project.end_date())
        .bind(project.status())
        .bind(project.user_id())
        .bind(project.created_at())
        .bind(project.updated_at());

        guarded(cancel, query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn update(&self, project: &Project, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, description = $3, start_date = $4, end_date = $5,
                status = $6, user_id = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(project.id())
        .bind(project.name())
        .bind(project.description())
        .bind(project.start_date())
        .bind(project.end_date())
        .bind(project.status())
        .bind(project.user_id())
        .bind(project.updated_at());

        let result = guarded(cancel, query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let query = sqlx::query("DELETE FROM projects WHERE id = $1").bind(id);
        let result = guarded(cancel, query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<Project>> {
        let sql = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);
        let query = sqlx::query_as::<_, Project>(&sql).bind(id);
        guarded(cancel, query.fetch_optional(&self.pool)).await
    }

    async fn list(
        &self,
        filter: &ProjectFilter,
        order: &OrderBy<ProjectSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<Project>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM projects", PROJECT_COLUMNS));
        push_project_filter(&mut builder, filter);
        push_page(&mut builder, order, page);
        debug!(sql = builder.sql(), "Listing projects");

        let query = builder.build_query_as::<Project>();
        guarded(cancel, query.fetch_all(&self.pool)).await
    }

    async fn count(&self, filter: &ProjectFilter, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM projects");
        push_project_filter(&mut builder, filter);

        let query = builder.build_query_scalar::<i64>();
        guarded(cancel, query.fetch_one(&self.pool)).await.map(to_count)
    }
}

/// Task repository over a connection pool
#[derive(Debug, Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn add(&self, task: &Task, cancel: &CancellationToken) -> RepositoryResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, due_date, status, priority,
                               project_id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(task.id())
        .bind(task.title())
        .bind(task.description())
        .bind(task.due_date())
        .bind(task.status())
        .bind(task.priority())
        .bind(task.project_id())
        .bind(task.user_id())
        .bind(task.created_at())
        .bind(task.updated_at());

        guarded(cancel, query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn update(&self, task: &Task, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, due_date = $4, status = $5, priority = $6,
                project_id = $7, user_id = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(task.id())
        .bind(task.title())
        .bind(task.description())
        .bind(task.due_date())
        .bind(task.status())
        .bind(task.priority())
        .bind(task.project_id())
        .bind(task.user_id())
        .bind(task.updated_at());

        let result = guarded(cancel, query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let query = sqlx::query("DELETE FROM tasks WHERE id = $1").bind(id);
        let result = guarded(cancel, query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_project(&self, project_id: Uuid, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let query = sqlx::query("DELETE FROM tasks WHERE project_id = $1").bind(project_id);
        let result = guarded(cancel, query.execute(&self.pool)).await?;
        Ok(result.rows_affected())
    }

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let query = sqlx::query_as::<_, Task>(&sql).bind(id);
        guarded(cancel, query.fetch_optional(&self.pool)).await
    }

    async fn find_by_project(&self, project_id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY due_date ASC, id ASC",
            TASK_COLUMNS
        );
        let query = sqlx::query_as::<_, Task>(&sql).bind(project_id);
        guarded(cancel, query.fetch_all(&self.pool)).await
    }

    async fn list(
        &self,
        filter: &TaskFilter,
        order: &OrderBy<TaskSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<Task>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_task_filter(&mut builder, filter);
        push_page(&mut builder, order, page);
        debug!(sql = builder.sql(), "Listing tasks");

        let query = builder.build_query_as::<Task>();
        guarded(cancel, query.fetch_all(&self.pool)).await
    }

    async fn count(&self, filter: &TaskFilter, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        push_task_filter(&mut builder, filter);

        let query = builder.build_query_scalar::<i64>();
        guarded(cancel, query.fetch_one(&self.pool)).await.map(to_count)
    }
}

/// User repository over a connection pool
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn add(&self, user: &User, cancel: &CancellationToken) -> RepositoryResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, phone, status, role,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id())
        .bind(user.username())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.phone())
        .bind(user.status())
        .bind(user.role())
        .bind(user.created_at())
        .bind(user.updated_at());

        guarded(cancel, query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn update(&self, user: &User, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, phone = $5,
                status = $6, role = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id())
        .bind(user.username())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.phone())
        .bind(user.status())
        .bind(user.role())
        .bind(user.updated_at());

        let result = guarded(cancel, query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let query = sqlx::query("DELETE FROM users WHERE id = $1").bind(id);
        let result = guarded(cancel, query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let query = sqlx::query_as::<_, User>(&sql).bind(id);
        guarded(cancel, query.fetch_optional(&self.pool)).await
    }

    async fn get_by_email(&self, email: &str, cancel: &CancellationToken) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let query = sqlx::query_as::<_, User>(&sql).bind(email);
        guarded(cancel, query.fetch_optional(&self.pool)).await
    }

    async fn list(
        &self,
        filter: &UserFilter,
        order: &OrderBy<UserSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<User>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_user_filter(&mut builder, filter);
        push_page(&mut builder, order, page);
        debug!(sql = builder.sql(), "Listing users");

        let query = builder.build_query_as::<User>();
        guarded(cancel, query.fetch_all(&self.pool)).await
    }

    async fn count(&self, filter: &UserFilter, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut builder, filter);

        let query = builder.build_query_scalar::<i64>();
        guarded(cancel, query.fetch_one(&self.pool)).await.map(to_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};

    #[test]
    fn test_task_list_sql_binds_every_filter() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::High),
            project_id: Some(Uuid::new_v4()),
            ..TaskFilter::default()
        };
        let order = OrderBy::<TaskSortField>::parse(Some("priority desc")).unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM tasks");
        push_task_filter(&mut builder, &filter);
        push_page(&mut builder, &order, PageRequest::new(2, 10).unwrap());

        assert_eq!(
            builder.sql(),
            "SELECT id FROM tasks WHERE TRUE AND status = $1 AND priority = $2 \
             AND project_id = $3 ORDER BY priority DESC NULLS LAST, id ASC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_unfiltered_count_sql() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut builder, &UserFilter::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM users WHERE TRUE");
    }

    #[tokio::test]
    async fn test_guarded_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: RepositoryResult<()> = guarded(&cancel, async { Ok(()) }).await;
        assert!(matches!(result, Err(RepositoryError::Cancelled)));
    }
}
