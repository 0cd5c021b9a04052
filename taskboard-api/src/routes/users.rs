/// User endpoints
///
/// # Endpoints
///
/// ```text
/// GET    /api/users        # List (paged, filter by status)
/// POST   /api/users        # Create
/// GET    /api/users/:id    # Get
/// PUT    /api/users/:id    # Update
/// DELETE /api/users/:id    # Delete (409 while the user owns work)
/// ```
///
/// Passwords are accepted on create and update but never returned.

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
        users::{self as handlers, CreateUserCommand, GetUsersListQuery, UpdateUserCommand},
        PageQuery,
    },
    models::user::{User, UserRole, UserStatus},
    ordering::Paginated,
};
use uuid::Uuid;

/// User as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub status: UserStatus,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            phone: user.phone().to_string(),
            status: user.status(),
            role: user.role(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

/// Query string for `GET /api/users`
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    #[serde(rename = "_page", default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(rename = "_size", default, deserialize_with = "blank_as_none")]
    pub size: Option<i64>,
    #[serde(rename = "_order")]
    pub order: Option<String>,
    pub status: Option<String>,
}

impl From<UserListParams> for GetUsersListQuery {
    fn from(params: UserListParams) -> Self {
        Self {
            paging: PageQuery {
                page: params.page,
                size: params.size,
                order_by: params.order,
            },
            status: params.status,
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiQuery(params): ApiQuery<UserListParams>,
) -> ApiResult<Json<ApiResponse<Paginated<UserResponse>>>> {
    let page = handlers::list_users(&state.repos, params.into(), cancellation.token()).await?;
    Ok(ok("Users retrieved successfully", page.map(UserResponse::from)))
}

pub async fn create_user(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiJson(command): ApiJson<CreateUserCommand>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let user = handlers::create_user(&state.repos, command, cancellation.token()).await?;
    Ok(created("User created successfully", user.into()))
}

pub async fn get_user(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = handlers::get_user(&state.repos, id, cancellation.token()).await?;
    Ok(ok("User retrieved successfully", user.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut command): ApiJson<UpdateUserCommand>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    command.id = id;
    let user = handlers::update_user(&state.repos, command, cancellation.token()).await?;
    Ok(ok("User updated successfully", user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    cancellation: RequestCancellation,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    handlers::delete_user(&state.repos, id, cancellation.token()).await?;
    Ok(done("User deleted successfully"))
}
