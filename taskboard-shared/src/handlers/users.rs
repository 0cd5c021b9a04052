//! User commands and queries
//!
//! Passwords are hashed here, before a [`User`] is built; repositories only
//! ever see the PHC string. Emails are unique, compared case-insensitively.

use super::{found, parse_filter, require, HandlerError, HandlerResult, PageQuery};
use crate::auth::password::{hash_password, validate_password_strength};
use crate::models::lenient;
use crate::models::user::{User, UserFields, UserRole, UserSortField, UserStatus};
use crate::ordering::Paginated;
use crate::repositories::{ProjectFilter, Repositories, RepositoryError, TaskFilter, UserFilter};
use crate::validation::{not_blank, not_nil, phone_format, CommandValidator, ValidationErrors};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

const STATUS_INVALID: &str = "Status must be a valid UserStatus value.";
const ROLE_INVALID: &str = "Role must be a valid UserRole value.";

/// Registers a new user
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserCommand {
    #[validate(
        custom(function = "not_blank"),
        length(max = 50, message = "Username cannot be longer than 50 characters.")
    )]
    pub username: String,

    #[validate(
        custom(function = "not_blank"),
        email(message = "Email must be a valid email address."),
        length(max = 100, message = "Email must not exceed 100 characters.")
    )]
    pub email: String,

    pub password: String,

    #[validate(custom(function = "phone_format"))]
    pub phone: String,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Status must be a valid UserStatus value."))]
    pub status: Option<UserStatus>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Role must be a valid UserRole value."))]
    pub role: Option<UserRole>,
}

/// Replaces a user's profile; the password changes only when supplied
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserCommand {
    #[serde(skip)]
    #[validate(custom(function = "not_nil"))]
    pub id: Uuid,

    #[validate(
        custom(function = "not_blank"),
        length(max = 50, message = "Username cannot be longer than 50 characters.")
    )]
    pub username: String,

    #[validate(
        custom(function = "not_blank"),
        email(message = "Email must be a valid email address."),
        length(max = 100, message = "Email must not exceed 100 characters.")
    )]
    pub email: String,

    pub password: Option<String>,

    #[validate(custom(function = "phone_format"))]
    pub phone: String,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Status must be a valid UserStatus value."))]
    pub status: Option<UserStatus>,

    #[serde(deserialize_with = "lenient")]
    #[validate(required(message = "Role must be a valid UserRole value."))]
    pub role: Option<UserRole>,
}

// Commands carry plaintext passwords; keep them out of Debug output.
impl std::fmt::Debug for CreateUserCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserCommand")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("status", &self.status)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for UpdateUserCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateUserCommand")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("status", &self.status)
            .field("role", &self.role)
            .field("password_changed", &self.password.is_some())
            .finish()
    }
}

/// Filters, paging and ordering for [`list_users`]
#[derive(Debug, Clone, Default)]
pub struct GetUsersListQuery {
    pub paging: PageQuery,
    pub status: Option<String>,
}

const USERNAME_MIN: usize = 3;

fn check_username(username: &str, errors: &mut ValidationErrors) {
    let length = username.trim().chars().count();
    if length > 0 && length < USERNAME_MIN {
        errors.push(
            "username",
            format!("Username must be at least {} characters long.", USERNAME_MIN),
        );
    }
}

fn check_password(password: &str, errors: &mut ValidationErrors) {
    if let Err(reason) = validate_password_strength(password) {
        errors.push("password", reason);
    }
}

impl CommandValidator for CreateUserCommand {
    fn validate_on(&self, _today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::from_derive(self.validate());
        check_username(&self.username, &mut errors);
        if self.password.is_empty() {
            errors.push("password", "Password is required.");
        } else {
            check_password(&self.password, &mut errors);
        }
        errors.into_result()
    }
}

impl CommandValidator for UpdateUserCommand {
    fn validate_on(&self, _today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::from_derive(self.validate());
        check_username(&self.username, &mut errors);
        if let Some(password) = &self.password {
            check_password(password, &mut errors);
        }
        errors.into_result()
    }
}

fn user_fields(
    username: &str,
    email: &str,
    phone: &str,
    status: Option<UserStatus>,
    role: Option<UserRole>,
) -> Result<UserFields, ValidationErrors> {
    Ok(UserFields {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        phone: phone.to_string(),
        status: require(status, "status", STATUS_INVALID)?,
        role: require(role, "role", ROLE_INVALID)?,
    })
}

fn email_taken(email: &str) -> HandlerError {
    HandlerError::Conflict(format!("Email {} is already in use", email))
}

fn conflict_on_email(email: &str) -> impl FnOnce(RepositoryError) -> HandlerError + '_ {
    move |err| match err {
        RepositoryError::Conflict(_) => email_taken(email),
        other => other.into(),
    }
}

/// Registers a user with a freshly hashed password
///
/// # Errors
///
/// - `Validation` if any rule fails
/// - `Conflict` if the email is already registered
/// - `Password` if hashing fails
/// - `Repository` if the store fails
pub async fn create_user(
    repos: &Repositories,
    command: CreateUserCommand,
    cancel: &CancellationToken,
) -> HandlerResult<User> {
    command.validate_now()?;
    let fields = user_fields(
        &command.username,
        &command.email,
        &command.phone,
        command.status,
        command.role,
    )?;

    if repos.users.get_by_email(&fields.email, cancel).await?.is_some() {
        warn!(email = %fields.email, "rejected duplicate email");
        return Err(email_taken(&fields.email));
    }

    let password_hash = hash_password(&command.password)?;
    let user = User::new(fields, password_hash, Utc::now());
    repos
        .users
        .add(&user, cancel)
        .await
        .map_err(conflict_on_email(user.email()))?;

    info!(
        user_id = %user.id(),
        username = %user.username(),
        role = %user.role(),
        "user created"
    );

    Ok(user)
}

/// Replaces a user's profile, re-hashing the password if one is given
///
/// # Errors
///
/// - `Validation` if any rule fails
/// - `NotFound` if the user does not exist
/// - `Conflict` if the email belongs to another user
/// - `Password` if hashing fails
/// - `Repository` if the store fails
pub async fn update_user(
    repos: &Repositories,
    command: UpdateUserCommand,
    cancel: &CancellationToken,
) -> HandlerResult<User> {
    command.validate_now()?;
    let fields = user_fields(
        &command.username,
        &command.email,
        &command.phone,
        command.status,
        command.role,
    )?;

    let mut user = found(repos.users.get_by_id(command.id, cancel).await, "User", command.id)?;

    if let Some(holder) = repos.users.get_by_email(&fields.email, cancel).await? {
        if holder.id() != user.id() {
            return Err(email_taken(&fields.email));
        }
    }

    let password_hash = command.password.as_deref().map(hash_password).transpose()?;
    let password_changed = password_hash.is_some();

    user.update(fields, password_hash, Utc::now());
    let updated = repos
        .users
        .update(&user, cancel)
        .await
        .map_err(conflict_on_email(user.email()))?;
    if !updated {
        return Err(HandlerError::not_found("User", command.id));
    }

    info!(
        user_id = %user.id(),
        status = %user.status(),
        password_changed,
        "user updated"
    );

    Ok(user)
}

/// Deletes a user that no longer owns projects or tasks
///
/// # Errors
///
/// - `NotFound` if the user does not exist
/// - `Conflict` if projects or tasks still reference the user
/// - `Repository` if the store fails
pub async fn delete_user(repos: &Repositories, id: Uuid, cancel: &CancellationToken) -> HandlerResult<()> {
    let user = found(repos.users.get_by_id(id, cancel).await, "User", id)?;

    let project_filter = ProjectFilter {
        user_id: Some(id),
        ..ProjectFilter::default()
    };
    let projects = repos.projects.count(&project_filter, cancel).await?;
    let tasks = repos.tasks.count(&TaskFilter::for_user(id), cancel).await?;

    if projects > 0 || tasks > 0 {
        return Err(HandlerError::Conflict(format!(
            "User {} still owns {} project(s) and {} task(s)",
            id, projects, tasks
        )));
    }

    if !repos.users.delete(user.id(), cancel).await? {
        return Err(HandlerError::not_found("User", id));
    }

    info!(user_id = %id, username = %user.username(), "user deleted");
    Ok(())
}

/// Loads a single user
///
/// # Errors
///
/// `NotFound` if the user does not exist.
pub async fn get_user(repos: &Repositories, id: Uuid, cancel: &CancellationToken) -> HandlerResult<User> {
    found(repos.users.get_by_id(id, cancel).await, "User", id)
}

/// Lists one page of users, in sign-up order unless ordered otherwise
///
/// # Errors
///
/// `Validation` for bad paging, an unknown sort field, or an unknown status.
pub async fn list_users(
    repos: &Repositories,
    query: GetUsersListQuery,
    cancel: &CancellationToken,
) -> HandlerResult<Paginated<User>> {
    let mut errors = ValidationErrors::new();
    let window = query.paging.resolve::<UserSortField>(&mut errors);
    let filter = UserFilter {
        status: parse_filter("status", query.status.as_deref(), &mut errors),
    };

    let Some((order, page)) = window.filter(|_| errors.is_empty()) else {
        return Err(errors.into());
    };

    let total = repos.users.count(&filter, cancel).await?;
    let items = repos.users.list(&filter, &order, page, cancel).await?;

    Ok(Paginated::new(items, page, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::models::project::{Project, ProjectFields, ProjectStatus};

    fn create_command(email: &str) -> CreateUserCommand {
        CreateUserCommand {
            username: "marta".to_string(),
            email: email.to_string(),
            password: "Kanban#2025".to_string(),
            phone: "(11)98765-4321".to_string(),
            status: Some(UserStatus::Active),
            role: Some(UserRole::Common),
        }
    }

    fn update_command(user: &User) -> UpdateUserCommand {
        UpdateUserCommand {
            id: user.id(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            password: None,
            phone: user.phone().to_string(),
            status: Some(user.status()),
            role: Some(user.role()),
        }
    }

    #[test]
    fn test_create_validation_messages() {
        let command = CreateUserCommand {
            username: "ab".to_string(),
            email: "not-an-email".to_string(),
            password: "password".to_string(),
            phone: "11 98765 4321".to_string(),
            status: None,
            role: Some(UserRole::Admin),
        };

        let errors = command.validate_now().unwrap_err();
        assert_eq!(
            errors.messages_for("username"),
            vec!["Username must be at least 3 characters long."]
        );
        assert_eq!(errors.messages_for("email"), vec!["Email must be a valid email address."]);
        assert_eq!(
            errors.messages_for("password"),
            vec!["Password must contain at least one uppercase letter"]
        );
        assert_eq!(
            errors.messages_for("phone"),
            vec!["Phone number must be in the format (XX)XXXXX-XXXX"]
        );
        assert_eq!(errors.messages_for("status"), vec![STATUS_INVALID]);
        assert!(!errors.contains("role"));
    }

    #[test]
    fn test_update_password_is_optional_but_checked() {
        let mut command = UpdateUserCommand {
            id: Uuid::new_v4(),
            username: "marta".to_string(),
            email: "marta@example.com".to_string(),
            password: None,
            phone: "(11)98765-4321".to_string(),
            status: Some(UserStatus::Inactive),
            role: Some(UserRole::Common),
        };
        assert!(command.validate_now().is_ok());

        command.password = Some("short".to_string());
        let errors = command.validate_now().unwrap_err();
        assert_eq!(
            errors.messages_for("password"),
            vec!["Password must be at least 8 characters long"]
        );
    }

    #[test]
    fn test_create_requires_password() {
        let mut command = create_command("marta@example.com");
        command.password = String::new();

        let errors = command.validate_now().unwrap_err();
        assert_eq!(errors.messages_for("password"), vec!["Password is required."]);
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", create_command("marta@example.com"));
        assert!(!rendered.contains("Kanban#2025"));
    }

    #[tokio::test]
    async fn test_create_hashes_password_and_rejects_duplicate_email() {
        let repos = Repositories::in_memory();
        let cancel = CancellationToken::new();

        let user = create_user(&repos, create_command("marta@example.com"), &cancel)
            .await
            .unwrap();
        assert!(verify_password("Kanban#2025", user.password_hash()).unwrap());

        let err = create_user(&repos, create_command("MARTA@example.com"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_hash_unless_password_given() {
        let repos = Repositories::in_memory();
        let cancel = CancellationToken::new();
        let user = create_user(&repos, create_command("marta@example.com"), &cancel)
            .await
            .unwrap();

        let mut command = update_command(&user);
        command.username = "marta.s".to_string();
        let updated = update_user(&repos, command, &cancel).await.unwrap();
        assert_eq!(updated.password_hash(), user.password_hash());
        assert_eq!(updated.username(), "marta.s");
        assert_eq!(updated.created_at(), user.created_at());

        let mut command = update_command(&updated);
        command.password = Some("N3w!Password".to_string());
        let updated = update_user(&repos, command, &cancel).await.unwrap();
        assert!(verify_password("N3w!Password", updated.password_hash()).unwrap());
    }

    #[tokio::test]
    async fn test_update_rejects_email_of_another_user() {
        let repos = Repositories::in_memory();
        let cancel = CancellationToken::new();
        let first = create_user(&repos, create_command("first@example.com"), &cancel)
            .await
            .unwrap();
        create_user(&repos, create_command("second@example.com"), &cancel)
            .await
            .unwrap();

        let mut command = update_command(&first);
        command.email = "second@example.com".to_string();
        let err = update_user(&repos, command, &cancel).await.unwrap_err();
        assert!(matches!(err, HandlerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_blocked_while_user_owns_projects() {
        let repos = Repositories::in_memory();
        let cancel = CancellationToken::new();
        let user = create_user(&repos, create_command("owner@example.com"), &cancel)
            .await
            .unwrap();

        let project = Project::new(
            ProjectFields {
                name: "Intranet".to_string(),
                description: "Internal portal".to_string(),
                start_date: Utc::now(),
                end_date: None,
                status: ProjectStatus::OnHold,
            },
            user.id(),
            Utc::now(),
        );
        repos.projects.add(&project, &cancel).await.unwrap();

        let err = delete_user(&repos, user.id(), &cancel).await.unwrap_err();
        assert!(matches!(err, HandlerError::Conflict(ref m) if m.contains("1 project(s)")));

        repos.projects.delete(project.id(), &cancel).await.unwrap();
        delete_user(&repos, user.id(), &cancel).await.unwrap();
        assert!(matches!(
            get_user(&repos, user.id(), &cancel).await,
            Err(HandlerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let repos = Repositories::in_memory();
        let cancel = CancellationToken::new();
        create_user(&repos, create_command("a@example.com"), &cancel).await.unwrap();
        let mut suspended = create_command("b@example.com");
        suspended.status = Some(UserStatus::Suspended);
        create_user(&repos, suspended, &cancel).await.unwrap();

        let query = GetUsersListQuery {
            status: Some("Suspended".to_string()),
            ..GetUsersListQuery::default()
        };
        let page = list_users(&repos, query, &cancel).await.unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].email(), "b@example.com");
    }
}
