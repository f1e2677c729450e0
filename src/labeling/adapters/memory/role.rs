//! In-memory repository for task roles.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::labeling::{
    domain::{ProjectId, TaskId, TaskRole, TaskRoleId, TaskRoleKind, UserId},
    ports::{RepositoryError, RepositoryResult, TaskRoleRepository},
};

/// Thread-safe in-memory task role repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRoleRepository {
    state: Arc<RwLock<HashMap<TaskRoleId, TaskRole>>>,
}

impl InMemoryTaskRoleRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn active_matching(
        &self,
        predicate: impl Fn(&TaskRole) -> bool,
    ) -> RepositoryResult<Vec<TaskRole>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let mut roles: Vec<TaskRole> = state
            .values()
            .filter(|role| role.is_active() && predicate(role))
            .cloned()
            .collect();
        roles.sort_by_key(|role| (role.kind().level(), role.created_at(), role.id()));
        Ok(roles)
    }
}

#[async_trait]
impl TaskRoleRepository for InMemoryTaskRoleRepository {
    async fn store_batch(&self, roles: &[TaskRole]) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        for role in roles {
            state.insert(role.id(), role.clone());
        }
        Ok(())
    }

    async fn update_batch(&self, roles: &[TaskRole]) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        if let Some(missing) = roles.iter().find(|role| !state.contains_key(&role.id())) {
            return Err(RepositoryError::TaskRoleNotFound(missing.id()));
        }
        for role in roles {
            state.insert(role.id(), role.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: TaskRoleId) -> RepositoryResult<Option<TaskRole>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state.get(&id).cloned())
    }

    async fn list_active(
        &self,
        task: TaskId,
        kind: Option<TaskRoleKind>,
    ) -> RepositoryResult<Vec<TaskRole>> {
        self.active_matching(|role| {
            role.task_id() == task && kind.is_none_or(|wanted| role.kind() == wanted)
        })
    }

    async fn find_active(
        &self,
        task: TaskId,
        user: UserId,
        kind: TaskRoleKind,
    ) -> RepositoryResult<Option<TaskRole>> {
        let roles = self.active_matching(|role| {
            role.task_id() == task && role.user_id() == user && role.kind() == kind
        })?;
        Ok(roles.into_iter().next())
    }

    async fn list_active_for_user(
        &self,
        task: TaskId,
        user: UserId,
    ) -> RepositoryResult<Vec<TaskRole>> {
        self.active_matching(|role| role.task_id() == task && role.user_id() == user)
    }

    async fn count_active_in_project(
        &self,
        project: ProjectId,
        user: UserId,
        kind: TaskRoleKind,
    ) -> RepositoryResult<usize> {
        let roles = self.active_matching(|role| {
            role.project_id() == project && role.user_id() == user && role.kind() == kind
        })?;
        Ok(roles.len())
    }
}
