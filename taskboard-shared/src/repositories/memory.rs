//! In-process store
//!
//! Keeps all three aggregates in maps behind one `tokio::sync::RwLock`, and
//! enforces the same rules the PostgreSQL schema does: unique
//! case-insensitive emails, and task removal when their project is deleted.
//! Used by the test suites and for running the API without a database.

use super::{
    ProjectFilter, ProjectRepository, RepositoryError, RepositoryResult, TaskFilter,
    TaskRepository, UserFilter, UserRepository,
};
use crate::models::{
    project::{Project, ProjectSortField},
    task::{Task, TaskSortField},
    user::{User, UserSortField},
};
use crate::ordering::{order_and_paginate, OrderBy, PageRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
}

/// Process-local implementation of every repository trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

fn ensure_live(cancel: &CancellationToken) -> RepositoryResult<()> {
    if cancel.is_cancelled() {
        return Err(RepositoryError::Cancelled);
    }
    Ok(())
}

fn email_taken(state: &State, email: &str, except: Uuid) -> bool {
    state
        .users
        .values()
        .any(|user| user.id() != except && user.email().eq_ignore_ascii_case(email))
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn add(&self, project: &Project, cancel: &CancellationToken) -> RepositoryResult<()> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        if state.projects.contains_key(&project.id()) {
            return Err(RepositoryError::Conflict("projects_pkey".to_string()));
        }
        state.projects.insert(project.id(), project.clone());
        Ok(())
    }

    async fn update(&self, project: &Project, cancel: &CancellationToken) -> RepositoryResult<bool> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        match state.projects.get_mut(&project.id()) {
            Some(stored) => {
                *stored = project.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        let removed = state.projects.remove(&id).is_some();
        if removed {
            state.tasks.retain(|_, task| task.project_id() != id);
        }
        Ok(removed)
    }

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<Project>> {
        ensure_live(cancel)?;
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &ProjectFilter,
        order: &OrderBy<ProjectSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<Project>> {
        ensure_live(cancel)?;
        let matching = self
            .state
            .read()
            .await
            .projects
            .values()
            .filter(|project| filter.matches(project))
            .cloned()
            .collect();
        Ok(order_and_paginate(matching, order, page))
    }

    async fn count(&self, filter: &ProjectFilter, cancel: &CancellationToken) -> RepositoryResult<u64> {
        ensure_live(cancel)?;
        let state = self.state.read().await;
        Ok(state.projects.values().filter(|p| filter.matches(p)).count() as u64)
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn add(&self, task: &Task, cancel: &CancellationToken) -> RepositoryResult<()> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        if state.tasks.contains_key(&task.id()) {
            return Err(RepositoryError::Conflict("tasks_pkey".to_string()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task, cancel: &CancellationToken) -> RepositoryResult<bool> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        match state.tasks.get_mut(&task.id()) {
            Some(stored) => {
                *stored = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool> {
        ensure_live(cancel)?;
        Ok(self.state.write().await.tasks.remove(&id).is_some())
    }

    async fn delete_by_project(&self, project_id: Uuid, cancel: &CancellationToken) -> RepositoryResult<u64> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        let before = state.tasks.len();
        state.tasks.retain(|_, task| task.project_id() != project_id);
        Ok((before - state.tasks.len()) as u64)
    }

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<Task>> {
        ensure_live(cancel)?;
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn find_by_project(&self, project_id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Vec<Task>> {
        ensure_live(cancel)?;
        let mut tasks: Vec<Task> = self
            .state
            .read()
            .await
            .tasks
            .values()
            .filter(|task| task.project_id() == project_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.due_date().cmp(&b.due_date()).then(a.id().cmp(&b.id())));
        Ok(tasks)
    }

    async fn list(
        &self,
        filter: &TaskFilter,
        order: &OrderBy<TaskSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<Task>> {
        ensure_live(cancel)?;
        let matching = self
            .state
            .read()
            .await
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        Ok(order_and_paginate(matching, order, page))
    }

    async fn count(&self, filter: &TaskFilter, cancel: &CancellationToken) -> RepositoryResult<u64> {
        ensure_live(cancel)?;
        let state = self.state.read().await;
        Ok(state.tasks.values().filter(|t| filter.matches(t)).count() as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn add(&self, user: &User, cancel: &CancellationToken) -> RepositoryResult<()> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id()) {
            return Err(RepositoryError::Conflict("users_pkey".to_string()));
        }
        if email_taken(&state, user.email(), user.id()) {
            return Err(RepositoryError::Conflict("users_email_key".to_string()));
        }
        state.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User, cancel: &CancellationToken) -> RepositoryResult<bool> {
        ensure_live(cancel)?;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id()) {
            return Ok(false);
        }
        if email_taken(&state, user.email(), user.id()) {
            return Err(RepositoryError::Conflict("users_email_key".to_string()));
        }
        state.users.insert(user.id(), user.clone());
        Ok(true)
    }

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<bool> {
        ensure_live(cancel)?;
        Ok(self.state.write().await.users.remove(&id).is_some())
    }

    async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> RepositoryResult<Option<User>> {
        ensure_live(cancel)?;
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str, cancel: &CancellationToken) -> RepositoryResult<Option<User>> {
        ensure_live(cancel)?;
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.email().eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(
        &self,
        filter: &UserFilter,
        order: &OrderBy<UserSortField>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<User>> {
        ensure_live(cancel)?;
        let matching = self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|user| filter.matches(user))
            .cloned()
            .collect();
        Ok(order_and_paginate(matching, order, page))
    }

    async fn count(&self, filter: &UserFilter, cancel: &CancellationToken) -> RepositoryResult<u64> {
        ensure_live(cancel)?;
        let state = self.state.read().await;
        Ok(state.users.values().filter(|u| filter.matches(u)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::{ProjectFields, ProjectStatus};
    use crate::models::task::{TaskFields, TaskPriority, TaskStatus};
    use crate::models::user::{UserFields, UserRole, UserStatus};
    use chrono::{Duration, Utc};

    fn user(email: &str) -> User {
        User::new(
            UserFields {
                username: "owner".to_string(),
                email: email.to_string(),
                phone: "(11)98765-4321".to_string(),
                status: UserStatus::Active,
                role: UserRole::Common,
            },
            "hash".to_string(),
            Utc::now(),
        )
    }

    fn project(owner: Uuid) -> Project {
        Project::new(
            ProjectFields {
                name: "Launch".to_string(),
                description: "Product launch".to_string(),
                start_date: Utc::now(),
                end_date: None,
                status: ProjectStatus::InProgress,
            },
            owner,
            Utc::now(),
        )
    }

    fn task(project_id: Uuid, owner: Uuid, due_in_days: i64) -> Task {
        Task::new(
            TaskFields {
                title: format!("due in {}", due_in_days),
                description: "Work".to_string(),
                due_date: Utc::now() + Duration::days(due_in_days),
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
            },
            project_id,
            owner,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_project_delete_removes_its_tasks_only() {
        let store = MemoryStore::default();
        let cancel = CancellationToken::new();
        let owner = user("a@example.com");
        let (doomed, kept) = (project(owner.id()), project(owner.id()));

        ProjectRepository::add(&store, &doomed, &cancel).await.unwrap();
        ProjectRepository::add(&store, &kept, &cancel).await.unwrap();
        for days in 1..=3 {
            TaskRepository::add(&store, &task(doomed.id(), owner.id(), days), &cancel).await.unwrap();
        }
        TaskRepository::add(&store, &task(kept.id(), owner.id(), 1), &cancel).await.unwrap();

        assert!(ProjectRepository::delete(&store, doomed.id(), &cancel).await.unwrap());
        assert!(store.find_by_project(doomed.id(), &cancel).await.unwrap().is_empty());
        assert_eq!(store.find_by_project(kept.id(), &cancel).await.unwrap().len(), 1);
        assert!(!ProjectRepository::delete(&store, doomed.id(), &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_project_orders_by_due_date() {
        let store = MemoryStore::default();
        let cancel = CancellationToken::new();
        let parent = Uuid::new_v4();
        for days in [5, 1, 3] {
            TaskRepository::add(&store, &task(parent, Uuid::new_v4(), days), &cancel).await.unwrap();
        }

        let titles: Vec<String> = store
            .find_by_project(parent, &cancel)
            .await
            .unwrap()
            .iter()
            .map(|t| t.title().to_string())
            .collect();
        assert_eq!(titles, vec!["due in 1", "due in 3", "due in 5"]);
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_case_insensitive() {
        let store = MemoryStore::default();
        let cancel = CancellationToken::new();
        UserRepository::add(&store, &user("dev@example.com"), &cancel).await.unwrap();

        let err = UserRepository::add(&store, &user("DEV@example.com"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let found = store.get_by_email("Dev@Example.com", &cancel).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let store = MemoryStore::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = UserRepository::count(&store, &UserFilter::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Cancelled));
    }

    #[tokio::test]
    async fn test_list_and_count_respect_filter_and_page() {
        let store = MemoryStore::default();
        let cancel = CancellationToken::new();
        let parent = Uuid::new_v4();
        for days in 1..=25 {
            TaskRepository::add(&store, &task(parent, Uuid::new_v4(), days), &cancel).await.unwrap();
        }
        TaskRepository::add(&store, &task(Uuid::new_v4(), Uuid::new_v4(), 1), &cancel).await.unwrap();

        let filter = TaskFilter::for_project(parent);
        let order = OrderBy::<TaskSortField>::parse(Some("dueDate desc")).unwrap();
        let page = PageRequest::new(3, 10).unwrap();

        let items = TaskRepository::list(&store, &filter, &order, page, &cancel).await.unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].title(), "due in 5");
        assert_eq!(TaskRepository::count(&store, &filter, &cancel).await.unwrap(), 25);
    }
}
