/// Task endpoints
///
/// # Endpoints
///
/// ```text
/// GET    /api/tasks        # List (paged, filterable)
/// POST   /api/tasks        # Create
/// GET    /api/tasks/:id    # Get
/// PUT    /api/tasks/:id    # Update
/// DELETE /api/tasks/:id    # Delete
/// ```
///
/// List filters: `status`, `priority`, `projectId`, `userId` and
/// `dueBefore` (RFC 3339).

use super::{
    response::{created, done, ok, ApiResponse},
    blank_as_none, ApiJson, ApiPath, ApiQuery, RequestCancellation,
};
use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    handlers::{
        tasks::{self as handlers, CreateTaskCommand, GetTasksListQuery, UpdateTaskCommand},
        PageQuery,
    },
    models::task::{Task, TaskPriority, TaskStatus},
    ordering::Paginated,
};
use uuid::Uuid;

/// Task as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            due_date: task.due_date(),
            status: task.status(),
            priority: task.priority(),
            project_id: task.project_id(),
            user_id: task.user_id(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Query string for `GET /api/tasks`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    #[serde(rename = "_page", default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(rename = "_size", default, deserialize_with = "blank_as_none")]
    pub size: Option<i64>,
    #[serde(rename = "_order")]
    pub order: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub project_id: Option<Uuid>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub due_before: Option<DateTime<Utc>>,
}

impl From<TaskListParams> for GetTasksListQuery {
    fn from(params: TaskListParams) -> Self {
        Self {
            paging: PageQuery {
                page: params.page,
                size: params.size,
                order_by: params.order,
            },
            status: params.status,
            priority: params.priority,
            project_id: params.project_id,
            user_id: params.user_id,
            due_before: params.due_before,
        }
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiQuery(params): ApiQuery<TaskListParams>,
) -> ApiResult<Json<ApiResponse<Paginated<TaskResponse>>>> {
    let page = handlers::list_tasks(&state.repos, params.into(), cancellation.token()).await?;
    Ok(ok("Tasks retrieved successfully", page.map(TaskResponse::from)))
}

pub async fn create_task(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiJson(command): ApiJson<CreateTaskCommand>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TaskResponse>>)> {
    let task = handlers::create_task(&state.repos, command, cancellation.token()).await?;
    Ok(created("Task created successfully", task.into()))
}

pub async fn get_task(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    let task = handlers::get_task(&state.repos, id, cancellation.token()).await?;
    Ok(ok("Task retrieved successfully", task.into()))
}

pub async fn update_task(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut command): ApiJson<UpdateTaskCommand>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    command.id = id;
    let task = handlers::update_task(&state.repos, command, cancellation.token()).await?;
    Ok(ok("Task updated successfully", task.into()))
}

pub async fn delete_task(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    handlers::delete_task(&state.repos, id, cancellation.token()).await?;
    Ok(done("Task deleted successfully"))
}
