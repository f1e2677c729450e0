//! In-memory repositories for projects and project role grants.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::labeling::{
    domain::{DatasetId, Project, ProjectId, ProjectRole, RoleKind, UserId},
    ports::{ProjectRepository, ProjectRoleRepository, RepositoryError, RepositoryResult},
};

/// Thread-safe in-memory project repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectRepository {
    state: Arc<RwLock<InMemoryProjectState>>,
}

#[derive(Debug, Default)]
struct InMemoryProjectState {
    projects: HashMap<ProjectId, Project>,
    dataset_index: HashMap<DatasetId, ProjectId>,
}

impl InMemoryProjectRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn store(&self, project: &Project) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        if state.projects.contains_key(&project.id()) {
            return Err(RepositoryError::DuplicateProject(project.id()));
        }
        for dataset in project.datasets() {
            if let Some(owner) = state.dataset_index.get(&dataset.id) {
                return Err(RepositoryError::DatasetAlreadyBound {
                    dataset: dataset.id,
                    project: *owner,
                });
            }
        }
        for dataset in project.datasets() {
            state.dataset_index.insert(dataset.id, project.id());
        }
        state.projects.insert(project.id(), project.clone());
        Ok(())
    }

    async fn update(&self, project: &Project) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        let slot = state
            .projects
            .get_mut(&project.id())
            .ok_or(RepositoryError::ProjectNotFound(project.id()))?;
        *slot = project.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: ProjectId) -> RepositoryResult<Option<Project>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state.projects.get(&id).cloned())
    }

    async fn find_by_dataset(&self, datasets: &[DatasetId]) -> RepositoryResult<Option<Project>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let project = datasets
            .iter()
            .find_map(|dataset| state.dataset_index.get(dataset))
            .and_then(|project_id| state.projects.get(project_id))
            .cloned();
        Ok(project)
    }
}

type GrantKey = (ProjectId, UserId, RoleKind);

/// Thread-safe in-memory project role repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectRoleRepository {
    state: Arc<RwLock<BTreeMap<GrantKey, ProjectRole>>>,
}

impl InMemoryProjectRoleRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRoleRepository for InMemoryProjectRoleRepository {
    async fn grant(&self, role: &ProjectRole) -> RepositoryResult<bool> {
        let mut grants = self.state.write().map_err(|err| poisoned(&err))?;
        let key = (role.project_id, role.user_id, role.kind);
        if grants.contains_key(&key) {
            return Ok(false);
        }
        grants.insert(key, role.clone());
        Ok(true)
    }

    async fn revoke(
        &self,
        project: ProjectId,
        user: UserId,
        kind: RoleKind,
    ) -> RepositoryResult<bool> {
        let mut grants = self.state.write().map_err(|err| poisoned(&err))?;
        Ok(grants.remove(&(project, user, kind)).is_some())
    }

    async fn list(&self, project: ProjectId) -> RepositoryResult<Vec<ProjectRole>> {
        let grants = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(grants
            .values()
            .filter(|grant| grant.project_id == project)
            .cloned()
            .collect())
    }

    async fn list_for_user(
        &self,
        project: ProjectId,
        user: UserId,
    ) -> RepositoryResult<Vec<ProjectRole>> {
        let grants = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(grants
            .values()
            .filter(|grant| grant.project_id == project && grant.user_id == user)
            .cloned()
            .collect())
    }
}
