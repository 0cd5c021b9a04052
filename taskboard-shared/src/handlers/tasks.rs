//! Task commands and queries
//!
//! A task belongs to one project and is assigned to one user; both must
//! exist when the task is created or moved.

use super::{found, parse_filter, require, HandlerError, HandlerResult, PageQuery};
use crate::models::lenient;
use crate::models::task::{Task, TaskFields, TaskPriority, TaskSortField, TaskStatus};
use crate::ordering::Paginated;
use crate::repositories::{Repositories, TaskFilter};
use crate::validation::{not_blank, not_nil, CommandValidator, ValidationErrors};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

const STATUS_INVALID: &str = "Status must be a valid TaskStatus value.";
const PRIORITY_INVALID: &str = "Priority must be a valid TaskPriority value.";
const CRITICAL_WINDOW: &str = "Critical priority tasks should have due date within the next 3 days.";

/// Creates a task inside an existing project
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTaskCommand {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Title must not exceed 100 characters.")
    )]
    pub title: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 500, message = "Description must not exceed 500 characters.")
    )]
    pub description: String,

    #[validate(required(message = "DueDate is required."))]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Status must be a valid TaskStatus value."))]
    pub status: Option<TaskStatus>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Priority must be a valid TaskPriority value."))]
    pub priority: Option<TaskPriority>,

    #[validate(custom(function = "not_nil"))]
    pub project_id: Uuid,

    #[validate(custom(function = "not_nil"))]
    pub user_id: Uuid,
}

/// Replaces a task's fields; may move it to another project or assignee
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTaskCommand {
    #[serde(skip)]
    #[validate(custom(function = "not_nil"))]
    pub id: Uuid,

    #[validate(
        custom(function = "not_blank"),
        length(max = 200, message = "Title must not exceed 200 characters.")
    )]
    pub title: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 1000, message = "Description must not exceed 1000 characters.")
    )]
    pub description: String,

    #[validate(required(message = "DueDate is required."))]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Status must be a valid TaskStatus value."))]
    pub status: Option<TaskStatus>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Priority must be a valid TaskPriority value."))]
    pub priority: Option<TaskPriority>,

    #[validate(custom(function = "not_nil"))]
    pub project_id: Uuid,

    #[validate(custom(function = "not_nil"))]
    pub user_id: Uuid,
}

/// Filters, paging and ordering for [`list_tasks`]
#[derive(Debug, Clone, Default)]
pub struct GetTasksListQuery {
    pub paging: PageQuery,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Only tasks due strictly before this instant
    pub due_before: Option<DateTime<Utc>>,
}

/// Whether `due` falls later than `days` days after `today`
fn due_beyond(due: Option<DateTime<Utc>>, today: NaiveDate, days: i64) -> bool {
    due.is_some_and(|due| due.date_naive() > today + Duration::days(days))
}

fn due_in_past(due: Option<DateTime<Utc>>, today: NaiveDate) -> bool {
    due.is_some_and(|due| due.date_naive() < today)
}

impl CommandValidator for CreateTaskCommand {
    fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::from_derive(self.validate());

        if let Some(status) = self.status {
            if !status.is_closed() && due_in_past(self.due_date, today) {
                errors.push("dueDate", "DueDate cannot be in the past.");
            }
            if status == TaskStatus::Done {
                errors.push("status", "New tasks cannot be created with Done status.");
            }
        }

        match self.priority {
            Some(TaskPriority::High) if due_beyond(self.due_date, today, 7) => {
                errors.push(
                    "dueDate",
                    "High priority tasks should have due date within the next 7 days.",
                );
            }
            Some(TaskPriority::Critical) if due_beyond(self.due_date, today, 3) => {
                errors.push("dueDate", CRITICAL_WINDOW);
            }
            _ => {}
        }

        errors.into_result()
    }
}

impl CommandValidator for UpdateTaskCommand {
    fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::from_derive(self.validate());

        let Some(status) = self.status else {
            return errors.into_result();
        };

        if !status.is_closed() && due_in_past(self.due_date, today) {
            errors.push(
                "dueDate",
                "DueDate cannot be in the past for tasks that are not completed.",
            );
        }

        if status != TaskStatus::Done {
            match self.priority {
                Some(TaskPriority::High) if due_beyond(self.due_date, today, 30) => {
                    errors.push(
                        "dueDate",
                        "High priority tasks should have due date within the next 30 days.",
                    );
                }
                Some(TaskPriority::Critical) if due_beyond(self.due_date, today, 3) => {
                    errors.push("dueDate", CRITICAL_WINDOW);
                }
                _ => {}
            }
        }

        errors.into_result()
    }
}

fn task_fields(
    title: &str,
    description: &str,
    due_date: Option<DateTime<Utc>>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
) -> Result<TaskFields, ValidationErrors> {
    Ok(TaskFields {
        title: title.trim().to_string(),
        description: description.trim().to_string(),
        due_date: require(due_date, "dueDate", "DueDate is required.")?,
        status: require(status, "status", STATUS_INVALID)?,
        priority: require(priority, "priority", PRIORITY_INVALID)?,
    })
}

/// Creates a task in `command.project_id`, assigned to `command.user_id`
///
/// # Errors
///
/// - `Validation` if any rule fails
/// - `NotFound` if the project or the assignee does not exist
/// - `Repository` if the store fails
pub async fn create_task(
    repos: &Repositories,
    command: CreateTaskCommand,
    cancel: &CancellationToken,
) -> HandlerResult<Task> {
    command.validate_now()?;
    let fields = task_fields(
        &command.title,
        &command.description,
        command.due_date,
        command.status,
        command.priority,
    )?;

    let project = found(
        repos.projects.get_by_id(command.project_id, cancel).await,
        "Project",
        command.project_id,
    )?;
    let assignee = found(
        repos.users.get_by_id(command.user_id, cancel).await,
        "User",
        command.user_id,
    )?;

    let task = Task::new(fields, project.id(), assignee.id(), Utc::now());
    repos.tasks.add(&task, cancel).await?;

    info!(
        task_id = %task.id(),
        project_id = %task.project_id(),
        user_id = %task.user_id(),
        priority = %task.priority(),
        due_date = %task.due_date(),
        "task created"
    );

    Ok(task)
}

/// Replaces a task's fields
///
/// When the project or assignee changes the task is rebuilt under the new
/// owners; identity and `createdAt` are preserved either way.
///
/// # Errors
///
/// - `Validation` if any rule fails
/// - `NotFound` if the task, project or assignee does not exist
/// - `Repository` if the store fails
pub async fn update_task(
    repos: &Repositories,
    command: UpdateTaskCommand,
    cancel: &CancellationToken,
) -> HandlerResult<Task> {
    command.validate_now()?;
    let fields = task_fields(
        &command.title,
        &command.description,
        command.due_date,
        command.status,
        command.priority,
    )?;

    let mut task = found(repos.tasks.get_by_id(command.id, cancel).await, "Task", command.id)?;
    let project = found(
        repos.projects.get_by_id(command.project_id, cancel).await,
        "Project",
        command.project_id,
    )?;
    let assignee = found(
        repos.users.get_by_id(command.user_id, cancel).await,
        "User",
        command.user_id,
    )?;

    if task.project_id() != project.id() || task.user_id() != assignee.id() {
        task = task.reassign(project.id(), assignee.id());
    }

    task.update(fields, Utc::now());
    if !repos.tasks.update(&task, cancel).await? {
        return Err(HandlerError::not_found("Task", command.id));
    }

    info!(
        task_id = %task.id(),
        project_id = %task.project_id(),
        user_id = %task.user_id(),
        status = %task.status(),
        "task updated"
    );

    Ok(task)
}

/// Deletes a single task
///
/// # Errors
///
/// `NotFound` if the task does not exist.
pub async fn delete_task(repos: &Repositories, id: Uuid, cancel: &CancellationToken) -> HandlerResult<()> {
    let task = found(repos.tasks.get_by_id(id, cancel).await, "Task", id)?;

    if !repos.tasks.delete(task.id(), cancel).await? {
        return Err(HandlerError::not_found("Task", id));
    }

    info!(task_id = %id, project_id = %task.project_id(), "task deleted");
    Ok(())
}

/// Loads a single task
///
/// # Errors
///
/// `NotFound` if the task does not exist.
pub async fn get_task(repos: &Repositories, id: Uuid, cancel: &CancellationToken) -> HandlerResult<Task> {
    found(repos.tasks.get_by_id(id, cancel).await, "Task", id)
}

/// Lists one page of tasks
///
/// # Errors
///
/// `Validation` for bad paging, an unknown sort field, or an unknown status
/// or priority.
pub async fn list_tasks(
    repos: &Repositories,
    query: GetTasksListQuery,
    cancel: &CancellationToken,
) -> HandlerResult<Paginated<Task>> {
    let mut errors = ValidationErrors::new();
    let window = query.paging.resolve::<TaskSortField>(&mut errors);
    let filter = TaskFilter {
        status: parse_filter("status", query.status.as_deref(), &mut errors),
        priority: parse_filter("priority", query.priority.as_deref(), &mut errors),
        project_id: query.project_id,
        user_id: query.user_id,
        due_before: query.due_before,
    };

    let Some((order, page)) = window.filter(|_| errors.is_empty()) else {
        return Err(errors.into());
    };

    let total = repos.tasks.count(&filter, cancel).await?;
    let items = repos.tasks.list(&filter, &order, page, cancel).await?;

    Ok(Paginated::new(items, page, total))
}
