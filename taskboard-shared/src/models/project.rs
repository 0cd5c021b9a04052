//! Project model
//!
//! A project is a body of work owned by a user. Deleting a project deletes
//! its tasks.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE project_status AS ENUM (
//!     'not_started', 'in_progress', 'on_hold', 'completed', 'cancelled'
//! );
//!
//! CREATE TABLE projects (
//!     id UUID PRIMARY KEY,
//!     name VARCHAR(100) NOT NULL,
//!     description VARCHAR(500) NOT NULL,
//!     start_date TIMESTAMPTZ NOT NULL,
//!     end_date TIMESTAMPTZ,
//!     status project_status NOT NULL DEFAULT 'not_started',
//!     user_id UUID NOT NULL REFERENCES users(id),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ
//! );
//! ```

use crate::ordering::SortField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

labelled_enum! {
    /// Project lifecycle status
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
    #[sqlx(type_name = "project_status", rename_all = "snake_case")]
    pub enum ProjectStatus {
        /// Planned, work has not begun
        NotStarted => "NotStarted",
        /// Work is under way
        InProgress => "InProgress",
        /// Paused
        OnHold => "OnHold",
        /// Finished; requires an end date
        Completed => "Completed",
        /// Abandoned
        Cancelled => "Cancelled",
    }
}

/// The editable part of a project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFields {
    /// Display name (at most 100 characters)
    pub name: String,

    /// Free-text description (at most 500 characters)
    pub description: String,

    /// When work starts
    pub start_date: DateTime<Utc>,

    /// When work ended or is planned to end
    pub end_date: Option<DateTime<Utc>>,

    /// Lifecycle status
    pub status: ProjectStatus,
}

/// A project owned by a user
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Project {
    id: Uuid,
    name: String,
    description: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    status: ProjectStatus,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Creates a project with a fresh id, stamped as created at `now`
    pub fn new(fields: ProjectFields, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: fields.name,
            description: fields.description,
            start_date: fields.start_date,
            end_date: fields.end_date,
            status: fields.status,
            user_id,
            created_at: now,
            updated_at: None,
        }
    }

    /// Replaces the editable fields and stamps `updated_at`
    pub fn update(&mut self, fields: ProjectFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.description = fields.description;
        self.start_date = fields.start_date;
        self.end_date = fields.end_date;
        self.status = fields.status;
        self.updated_at = Some(now);
    }

    /// Rebuilds the project under a new owner
    ///
    /// Identity and `created_at` carry over; everything else is unchanged
    /// until the caller applies [`Project::update`].
    pub fn reassign(self, user_id: Uuid) -> Self {
        Self { user_id, ..self }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    /// Owning user
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `None` until the first update
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Sortable project fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectSortField {
    Id,
    Name,
    Description,
    StartDate,
    EndDate,
    Status,
    UserId,
    CreatedAt,
    UpdatedAt,
}

impl SortField for ProjectSortField {
    type Entity = Project;

    const FIELDS: &'static [(&'static str, Self)] = &[
        ("id", Self::Id),
        ("name", Self::Name),
        ("description", Self::Description),
        ("startDate", Self::StartDate),
        ("endDate", Self::EndDate),
        ("status", Self::Status),
        ("userId", Self::UserId),
        ("createdAt", Self::CreatedAt),
        ("updatedAt", Self::UpdatedAt),
    ];
    const IDENTITY: Self = Self::Id;
    const DEFAULT: Self = Self::Id;

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Status => "status",
            Self::UserId => "user_id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    fn compare(self, a: &Project, b: &Project) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
            Self::Description => a.description.cmp(&b.description),
            Self::StartDate => a.start_date.cmp(&b.start_date),
            Self::EndDate => a.end_date.cmp(&b.end_date),
            Self::Status => a.status.cmp(&b.status),
            Self::UserId => a.user_id.cmp(&b.user_id),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fields(name: &str) -> ProjectFields {
        ProjectFields {
            name: name.to_string(),
            description: "Rebuild the billing pipeline".to_string(),
            start_date: Utc::now(),
            end_date: None,
            status: ProjectStatus::NotStarted,
        }
    }

    #[test]
    fn test_new_project_has_no_update_stamp() {
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let project = Project::new(fields("Billing"), owner, now);

        assert!(!project.id().is_nil());
        assert_eq!(project.user_id(), owner);
        assert_eq!(project.created_at(), now);
        assert_eq!(project.updated_at(), None);
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let created = Utc::now();
        let mut project = Project::new(fields("Billing"), Uuid::new_v4(), created);

        let later = created + Duration::minutes(5);
        let mut changed = fields("Billing v2");
        changed.status = ProjectStatus::InProgress;
        project.update(changed, later);

        assert_eq!(project.name(), "Billing v2");
        assert_eq!(project.status(), ProjectStatus::InProgress);
        assert_eq!(project.created_at(), created);
        assert_eq!(project.updated_at(), Some(later));
    }

    #[test]
    fn test_reassign_keeps_identity() {
        let project = Project::new(fields("Billing"), Uuid::new_v4(), Utc::now());
        let (id, created) = (project.id(), project.created_at());

        let new_owner = Uuid::new_v4();
        let moved = project.reassign(new_owner);

        assert_eq!(moved.id(), id);
        assert_eq!(moved.created_at(), created);
        assert_eq!(moved.user_id(), new_owner);
    }

    #[test]
    fn test_sort_field_lookup_accepts_common_spellings() {
        assert_eq!(ProjectSortField::lookup("startDate"), Some(ProjectSortField::StartDate));
        assert_eq!(ProjectSortField::lookup("StartDate"), Some(ProjectSortField::StartDate));
        assert_eq!(ProjectSortField::lookup("start_date"), Some(ProjectSortField::StartDate));
        assert_eq!(ProjectSortField::lookup("budget"), None);
    }
}
