//! Task model
//!
//! A task is a unit of work inside a project, assigned to a user.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'in_review', 'done', 'cancelled');
//! CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'critical');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY,
//!     title VARCHAR(200) NOT NULL,
//!     description VARCHAR(1000) NOT NULL,
//!     due_date TIMESTAMPTZ NOT NULL,
//!     status task_status NOT NULL DEFAULT 'todo',
//!     priority task_priority NOT NULL DEFAULT 'medium',
//!     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
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
    /// Task workflow status
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
    #[sqlx(type_name = "task_status", rename_all = "snake_case")]
    pub enum TaskStatus {
        Todo => "Todo",
        InProgress => "InProgress",
        InReview => "InReview",
        Done => "Done",
        Cancelled => "Cancelled",
    }
}

impl TaskStatus {
    /// Whether the task no longer needs a future due date
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

labelled_enum! {
    /// Task urgency
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
    #[sqlx(type_name = "task_priority", rename_all = "snake_case")]
    pub enum TaskPriority {
        Low => "Low",
        Medium => "Medium",
        /// Due within a week of creation
        High => "High",
        /// Due within three days
        Critical => "Critical",
    }
}

/// The editable part of a task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

/// A task inside a project
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Task {
    id: Uuid,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    status: TaskStatus,
    priority: TaskPriority,
    project_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a task with a fresh id, stamped as created at `now`
    pub fn new(fields: TaskFields, project_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            status: fields.status,
            priority: fields.priority,
            project_id,
            user_id,
            created_at: now,
            updated_at: None,
        }
    }

    /// Replaces the editable fields and stamps `updated_at`
    pub fn update(&mut self, fields: TaskFields, now: DateTime<Utc>) {
        self.title = fields.title;
        self.description = fields.description;
        self.due_date = fields.due_date;
        self.status = fields.status;
        self.priority = fields.priority;
        self.updated_at = Some(now);
    }

    /// Rebuilds the task under a new project and assignee
    ///
    /// Identity and `created_at` carry over.
    pub fn reassign(self, project_id: Uuid, user_id: Uuid) -> Self {
        Self {
            project_id,
            user_id,
            ..self
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Parent project
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// Assigned user
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Sortable task fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortField {
    Id,
    Title,
    Description,
    DueDate,
    Status,
    Priority,
    ProjectId,
    UserId,
    CreatedAt,
    UpdatedAt,
}

impl SortField for TaskSortField {
    type Entity = Task;

    const FIELDS: &'static [(&'static str, Self)] = &[
        ("id", Self::Id),
        ("title", Self::Title),
        ("description", Self::Description),
        ("dueDate", Self::DueDate),
        ("status", Self::Status),
        ("priority", Self::Priority),
        ("projectId", Self::ProjectId),
        ("userId", Self::UserId),
        ("createdAt", Self::CreatedAt),
        ("updatedAt", Self::UpdatedAt),
    ];
    const IDENTITY: Self = Self::Id;
    const DEFAULT: Self = Self::Id;

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::DueDate => "due_date",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::ProjectId => "project_id",
            Self::UserId => "user_id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Title => a.title.cmp(&b.title),
            Self::Description => a.description.cmp(&b.description),
            Self::DueDate => a.due_date.cmp(&b.due_date),
            Self::Status => a.status.cmp(&b.status),
            Self::Priority => a.priority.cmp(&b.priority),
            Self::ProjectId => a.project_id.cmp(&b.project_id),
            Self::UserId => a.user_id.cmp(&b.user_id),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::{order_and_paginate, OrderBy, PageRequest};
    use chrono::Duration;

    fn task(title: &str, priority: TaskPriority, due_in_days: i64) -> Task {
        let now = Utc::now();
        Task::new(
            TaskFields {
                title: title.to_string(),
                description: "Details".to_string(),
                due_date: now + Duration::days(due_in_days),
                status: TaskStatus::Todo,
                priority,
            },
            Uuid::new_v4(),
            Uuid::new_v4(),
            now,
        )
    }

    #[test]
    fn test_reassign_then_update_keeps_created_at() {
        let original = task("Write docs", TaskPriority::Low, 5);
        let (id, created) = (original.id(), original.created_at());

        let (project, user) = (Uuid::new_v4(), Uuid::new_v4());
        let mut moved = original.reassign(project, user);
        let later = created + Duration::hours(1);
        moved.update(
            TaskFields {
                title: "Write better docs".to_string(),
                description: "Details".to_string(),
                due_date: later,
                status: TaskStatus::InProgress,
                priority: TaskPriority::Medium,
            },
            later,
        );

        assert_eq!(moved.id(), id);
        assert_eq!(moved.created_at(), created);
        assert_eq!(moved.updated_at(), Some(later));
        assert_eq!(moved.project_id(), project);
        assert_eq!(moved.user_id(), user);
    }

    #[test]
    fn test_closed_statuses() {
        assert!(TaskStatus::Done.is_closed());
        assert!(TaskStatus::Cancelled.is_closed());
        assert!(!TaskStatus::InReview.is_closed());
    }

    #[test]
    fn test_order_by_priority_then_due_date() {
        let tasks = vec![
            task("a", TaskPriority::Low, 1),
            task("b", TaskPriority::Critical, 2),
            task("c", TaskPriority::Critical, 1),
            task("d", TaskPriority::Medium, 3),
        ];

        let order = OrderBy::<TaskSortField>::parse(Some("priority desc, dueDate")).unwrap();
        let sorted = order_and_paginate(tasks, &order, PageRequest::default());
        let titles: Vec<_> = sorted.iter().map(Task::title).collect();
        assert_eq!(titles, vec!["c", "b", "d", "a"]);
    }
}
