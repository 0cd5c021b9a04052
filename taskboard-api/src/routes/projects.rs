/// Project endpoints
///
/// # Endpoints
///
/// ```text
/// GET    /api/projects        # List (paged, filterable)
/// POST   /api/projects        # Create
/// GET    /api/projects/:id    # Get with tasks
/// PUT    /api/projects/:id    # Update
/// DELETE /api/projects/:id    # Delete with tasks
/// ```
///
/// # List Query
///
/// ```text
/// GET /api/projects?_page=2&_size=10&_order=startDate desc,name&status=InProgress&userId=...
/// ```

use super::{
    response::{created, done, ok, ApiResponse},
    tasks::TaskResponse,
    blank_as_none, ApiJson, ApiPath, ApiQuery, RequestCancellation,
};
use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    handlers::{
        projects::{self as handlers, CreateProjectCommand, GetProjectsListQuery, ProjectWithTasks, UpdateProjectCommand},
        PageQuery,
    },
    models::project::{Project, ProjectStatus},
    ordering::Paginated,
};
use uuid::Uuid;

/// Project as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ProjectStatus,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id(),
            name: project.name().to_string(),
            description: project.description().to_string(),
            start_date: project.start_date(),
            end_date: project.end_date(),
            status: project.status(),
            user_id: project.user_id(),
            created_at: project.created_at(),
            updated_at: project.updated_at(),
        }
    }
}

/// Project with its tasks, soonest due first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub tasks: Vec<TaskResponse>,
}

impl From<ProjectWithTasks> for ProjectDetailResponse {
    fn from(detail: ProjectWithTasks) -> Self {
        Self {
            project: detail.project.into(),
            tasks: detail.tasks.into_iter().map(TaskResponse::from).collect(),
        }
    }
}

/// Query string for `GET /api/projects`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListParams {
    #[serde(rename = "_page", default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(rename = "_size", default, deserialize_with = "blank_as_none")]
    pub size: Option<i64>,
    #[serde(rename = "_order")]
    pub order: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<Uuid>,
}

impl From<ProjectListParams> for GetProjectsListQuery {
    fn from(params: ProjectListParams) -> Self {
        Self {
            paging: PageQuery {
                page: params.page,
                size: params.size,
                order_by: params.order,
            },
            status: params.status,
            user_id: params.user_id,
        }
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiQuery(params): ApiQuery<ProjectListParams>,
) -> ApiResult<Json<ApiResponse<Paginated<ProjectResponse>>>> {
    let page = handlers::list_projects(&state.repos, params.into(), cancellation.token()).await?;
    Ok(ok("Projects retrieved successfully", page.map(ProjectResponse::from)))
}

pub async fn create_project(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiJson(command): ApiJson<CreateProjectCommand>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProjectResponse>>)> {
    let project = handlers::create_project(&state.repos, command, cancellation.token()).await?;
    Ok(created("Project created successfully", project.into()))
}

pub async fn get_project(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<ProjectDetailResponse>>> {
    let detail = handlers::get_project(&state.repos, id, cancellation.token()).await?;
    Ok(ok("Project retrieved successfully", detail.into()))
}

pub async fn update_project(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut command): ApiJson<UpdateProjectCommand>,
) -> ApiResult<Json<ApiResponse<ProjectResponse>>> {
    command.id = id;
    let project = handlers::update_project(&state.repos, command, cancellation.token()).await?;
    Ok(ok("Project updated successfully", project.into()))
}

pub async fn delete_project(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    handlers::delete_project(&state.repos, id, cancellation.token()).await?;
    Ok(done("Project deleted successfully"))
}
