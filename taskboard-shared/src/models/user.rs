//! User model
//!
//! Users own projects and are assigned tasks. Passwords are stored as
//! Argon2id hashes (see [`crate::auth::password`]) and never leave this
//! crate in plaintext.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE user_status AS ENUM ('active', 'inactive', 'suspended');
//! CREATE TYPE user_role AS ENUM ('admin', 'common');
//!
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY,
//!     username VARCHAR(50) NOT NULL,
//!     email VARCHAR(100) NOT NULL,
//!     password_hash VARCHAR(255) NOT NULL,
//!     phone VARCHAR(20) NOT NULL,
//!     status user_status NOT NULL DEFAULT 'active',
//!     role user_role NOT NULL DEFAULT 'common',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ
//! );
//!
//! CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
//! ```

use crate::ordering::SortField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

labelled_enum! {
    /// Account status
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
    #[sqlx(type_name = "user_status", rename_all = "snake_case")]
    pub enum UserStatus {
        Active => "Active",
        Inactive => "Inactive",
        Suspended => "Suspended",
    }
}

labelled_enum! {
    /// Account role
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
    #[sqlx(type_name = "user_role", rename_all = "snake_case")]
    pub enum UserRole {
        Admin => "Admin",
        Common => "Common",
    }
}

/// The editable part of a user, excluding the password
#[derive(Debug, Clone, PartialEq)]
pub struct UserFields {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub status: UserStatus,
    pub role: UserRole,
}

/// A user account
#[derive(Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    phone: String,
    status: UserStatus,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

// Keeps the hash out of logs.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("status", &self.status)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Creates a user with a fresh id, stamped as created at `now`
    ///
    /// `password_hash` must already be an Argon2id PHC string.
    pub fn new(fields: UserFields, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: fields.username,
            email: fields.email,
            password_hash,
            phone: fields.phone,
            status: fields.status,
            role: fields.role,
            created_at: now,
            updated_at: None,
        }
    }

    /// Replaces the editable fields, optionally the password hash, and
    /// stamps `updated_at`
    pub fn update(&mut self, fields: UserFields, password_hash: Option<String>, now: DateTime<Utc>) {
        self.username = fields.username;
        self.email = fields.email;
        self.phone = fields.phone;
        self.status = fields.status;
        self.role = fields.role;
        if let Some(hash) = password_hash {
            self.password_hash = hash;
        }
        self.updated_at = Some(now);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Argon2id PHC string
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Sortable user fields
///
/// The password hash is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    Id,
    Username,
    Email,
    Phone,
    Status,
    Role,
    CreatedAt,
    UpdatedAt,
}

impl SortField for UserSortField {
    type Entity = User;

    const FIELDS: &'static [(&'static str, Self)] = &[
        ("id", Self::Id),
        ("username", Self::Username),
        ("email", Self::Email),
        ("phone", Self::Phone),
        ("status", Self::Status),
        ("role", Self::Role),
        ("createdAt", Self::CreatedAt),
        ("updatedAt", Self::UpdatedAt),
    ];
    const IDENTITY: Self = Self::Id;
    const DEFAULT: Self = Self::CreatedAt;

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Status => "status",
            Self::Role => "role",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    fn compare(self, a: &User, b: &User) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Username => a.username.cmp(&b.username),
            Self::Email => a.email.cmp(&b.email),
            Self::Phone => a.phone.cmp(&b.phone),
            Self::Status => a.status.cmp(&b.status),
            Self::Role => a.role.cmp(&b.role),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(status: UserStatus) -> UserFields {
        UserFields {
            username: "marta".to_string(),
            email: "marta@example.com".to_string(),
            phone: "(11)98765-4321".to_string(),
            status,
            role: UserRole::Common,
        }
    }

    #[test]
    fn test_update_keeps_hash_unless_replaced() {
        let now = Utc::now();
        let mut user = User::new(fields(UserStatus::Active), "old-hash".into(), now);

        user.update(fields(UserStatus::Inactive), None, now);
        assert_eq!(user.password_hash(), "old-hash");
        assert_eq!(user.status(), UserStatus::Inactive);
        assert_eq!(user.updated_at(), Some(now));

        user.update(fields(UserStatus::Active), Some("new-hash".into()), now);
        assert_eq!(user.password_hash(), "new-hash");
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let user = User::new(fields(UserStatus::Active), "secret-hash".into(), Utc::now());
        let rendered = format!("{:?}", user);
        assert!(rendered.contains("marta"));
        assert!(!rendered.contains("secret-hash"));
    }

    #[test]
    fn test_default_sort_is_created_at() {
        assert_eq!(UserSortField::DEFAULT, UserSortField::CreatedAt);
        assert_eq!(UserSortField::lookup("password_hash"), None);
    }
}
