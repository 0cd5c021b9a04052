//! Project commands and queries
//!
//! Projects belong to a user and own their tasks. Deleting a project first
//! removes every task that references it.

use super::{found, parse_filter, require, HandlerError, HandlerResult, PageQuery};
use crate::models::lenient;
use crate::models::project::{Project, ProjectFields, ProjectSortField, ProjectStatus};
use crate::models::task::Task;
use crate::ordering::Paginated;
use crate::repositories::{ProjectFilter, Repositories};
use crate::validation::{not_blank, not_nil, CommandValidator, ValidationErrors};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

const STATUS_INVALID: &str = "Status must be a valid ProjectStatus value.";

/// Creates a project for an existing user
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateProjectCommand {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Name must not exceed 100 characters.")
    )]
    pub name: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 500, message = "Description must not exceed 500 characters.")
    )]
    pub description: String,

    #[validate(required(message = "StartDate is required."))]
    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Status must be a valid ProjectStatus value."))]
    pub status: Option<ProjectStatus>,

    #[validate(custom(function = "not_nil"))]
    pub user_id: Uuid,
}

/// Replaces a project's editable fields and owner
///
/// `id` is taken from the request path, never from the body.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProjectCommand {
    #[serde(skip)]
    #[validate(custom(function = "not_nil"))]
    pub id: Uuid,

    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Name must not exceed 100 characters.")
    )]
    pub name: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 500, message = "Description must not exceed 500 characters.")
    )]
    pub description: String,

    #[validate(required(message = "StartDate is required."))]
    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Status must be a valid ProjectStatus value."))]
    pub status: Option<ProjectStatus>,

    #[validate(custom(function = "not_nil"))]
    pub user_id: Uuid,
}

/// Filters, paging and ordering for [`list_projects`]
#[derive(Debug, Clone, Default)]
pub struct GetProjectsListQuery {
    pub paging: PageQuery,
    /// Status name, e.g. `"InProgress"`
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
}

/// A project together with its tasks, soonest due first
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectWithTasks {
    pub project: Project,
    pub tasks: Vec<Task>,
}

fn check_end_date(
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    status: Option<ProjectStatus>,
    errors: &mut ValidationErrors,
) {
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            errors.push("endDate", "EndDate must be greater than or equal to StartDate.");
        }
    }
    if status == Some(ProjectStatus::Completed) && end_date.is_none() {
        errors.push("endDate", "EndDate is required when Status is Completed.");
    }
}

fn starts_in_past(start_date: Option<DateTime<Utc>>, today: NaiveDate) -> bool {
    start_date.is_some_and(|start| start.date_naive() < today)
}

impl CommandValidator for CreateProjectCommand {
    fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::from_derive(self.validate());
        check_end_date(self.start_date, self.end_date, self.status, &mut errors);

        if matches!(
            self.status,
            Some(ProjectStatus::NotStarted | ProjectStatus::InProgress)
        ) && starts_in_past(self.start_date, today)
        {
            errors.push("startDate", "StartDate cannot be in the past.");
        }

        errors.into_result()
    }
}

impl CommandValidator for UpdateProjectCommand {
    fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::from_derive(self.validate());
        check_end_date(self.start_date, self.end_date, self.status, &mut errors);

        if self.status == Some(ProjectStatus::NotStarted) && starts_in_past(self.start_date, today) {
            errors.push(
                "startDate",
                "StartDate cannot be in the past for projects that haven't started yet.",
            );
        }

        errors.into_result()
    }
}

impl CreateProjectCommand {
    fn fields(&self) -> Result<ProjectFields, ValidationErrors> {
        Ok(ProjectFields {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            start_date: require(self.start_date, "startDate", "StartDate is required.")?,
            end_date: self.end_date,
            status: require(self.status, "status", STATUS_INVALID)?,
        })
    }
}

impl UpdateProjectCommand {
    fn fields(&self) -> Result<ProjectFields, ValidationErrors> {
        Ok(ProjectFields {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            start_date: require(self.start_date, "startDate", "StartDate is required.")?,
            end_date: self.end_date,
            status: require(self.status, "status", STATUS_INVALID)?,
        })
    }
}

/// Creates a project owned by `command.user_id`
///
/// # Errors
///
/// - `Validation` if any rule fails
/// - `NotFound` if the owner does not exist
/// - `Repository` if the store fails
pub async fn create_project(
    repos: &Repositories,
    command: CreateProjectCommand,
    cancel: &CancellationToken,
) -> HandlerResult<Project> {
    command.validate_now()?;
    let fields = command.fields()?;

    let owner = found(
        repos.users.get_by_id(command.user_id, cancel).await,
        "User",
        command.user_id,
    )?;

    let project = Project::new(fields, owner.id(), Utc::now());
    repos.projects.add(&project, cancel).await?;

    info!(
        project_id = %project.id(),
        user_id = %project.user_id(),
        name = %project.name(),
        status = %project.status(),
        "project created"
    );

    Ok(project)
}

/// Replaces a project's fields, moving it to another owner if requested
///
/// Identity and `createdAt` are preserved.
///
/// # Errors
///
/// - `Validation` if any rule fails
/// - `NotFound` if the project or the new owner does not exist
/// - `Repository` if the store fails
pub async fn update_project(
    repos: &Repositories,
    command: UpdateProjectCommand,
    cancel: &CancellationToken,
) -> HandlerResult<Project> {
    command.validate_now()?;
    let fields = command.fields()?;

    let mut project = found(
        repos.projects.get_by_id(command.id, cancel).await,
        "Project",
        command.id,
    )?;

    let owner = found(
        repos.users.get_by_id(command.user_id, cancel).await,
        "User",
        command.user_id,
    )?;

    if project.user_id() != owner.id() {
        project = project.reassign(owner.id());
    }

    project.update(fields, Utc::now());
    if !repos.projects.update(&project, cancel).await? {
        return Err(HandlerError::not_found("Project", command.id));
    }

    info!(
        project_id = %project.id(),
        user_id = %project.user_id(),
        status = %project.status(),
        "project updated"
    );

    Ok(project)
}

/// Deletes a project and every task in it
///
/// Tasks are removed first, then the project. The two steps are not
/// atomic.
///
/// # Errors
///
/// - `NotFound` if the project does not exist
/// - `Repository` if the store fails
pub async fn delete_project(repos: &Repositories, id: Uuid, cancel: &CancellationToken) -> HandlerResult<()> {
    let project = found(repos.projects.get_by_id(id, cancel).await, "Project", id)?;

    let tasks = repos.tasks.find_by_project(project.id(), cancel).await?;
    for task in &tasks {
        debug!(project_id = %project.id(), task_id = %task.id(), title = %task.title(), "deleting project task");
    }

    let removed = repos.tasks.delete_by_project(project.id(), cancel).await?;
    if !repos.projects.delete(project.id(), cancel).await? {
        return Err(HandlerError::not_found("Project", id));
    }

    info!(project_id = %id, tasks_removed = removed, "project deleted");
    Ok(())
}

/// Loads a project with its tasks
///
/// # Errors
///
/// `NotFound` if the project does not exist.
pub async fn get_project(
    repos: &Repositories,
    id: Uuid,
    cancel: &CancellationToken,
) -> HandlerResult<ProjectWithTasks> {
    let project = found(repos.projects.get_by_id(id, cancel).await, "Project", id)?;
    let tasks = repos.tasks.find_by_project(id, cancel).await?;

    Ok(ProjectWithTasks { project, tasks })
}

/// Lists one page of projects
///
/// # Errors
///
/// `Validation` for bad paging, an unknown sort field, or an unknown status.
pub async fn list_projects(
    repos: &Repositories,
    query: GetProjectsListQuery,
    cancel: &CancellationToken,
) -> HandlerResult<Paginated<Project>> {
    let mut errors = ValidationErrors::new();
    let window = query.paging.resolve::<ProjectSortField>(&mut errors);
    let filter = ProjectFilter {
        status: parse_filter("status", query.status.as_deref(), &mut errors),
        user_id: query.user_id,
    };

    let Some((order, page)) = window.filter(|_| errors.is_empty()) else {
        return Err(errors.into());
    };

    let total = repos.projects.count(&filter, cancel).await?;
    let items = repos.projects.list(&filter, &order, page, cancel).await?;

    Ok(Paginated::new(items, page, total))
}
