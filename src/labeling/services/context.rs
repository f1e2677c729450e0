//! Shared state and lookups used by every workflow service.

use super::{LockRegistry, WorkflowResult};
use crate::labeling::{
    domain::{
        LabelTask, LabelingDomainError, Project, ProjectId, ProjectRole, RoleKind, TaskId,
        TaskImage, User, UserId,
    },
    ports::{ImageQuery, WorkflowPorts},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Ports, clock and locks shared by the services of one engine.
pub struct WorkflowContext<C> {
    pub(crate) ports: WorkflowPorts,
    pub(crate) clock: Arc<C>,
    pub(crate) locks: LockRegistry,
}

impl<C> WorkflowContext<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a context with a fresh lock registry.
    #[must_use]
    pub fn new(ports: WorkflowPorts, clock: Arc<C>) -> Self {
        Self {
            ports,
            clock,
            locks: LockRegistry::new(),
        }
    }

    pub(crate) async fn find_project_or_error(&self, id: ProjectId) -> WorkflowResult<Project> {
        self.ports
            .projects
            .find_by_id(id)
            .await?
            .ok_or_else(|| LabelingDomainError::ProjectNotFound(id).into())
    }

    pub(crate) async fn find_task_or_error(&self, id: TaskId) -> WorkflowResult<LabelTask> {
        self.ports
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| LabelingDomainError::TaskNotFound(id).into())
    }

    /// Resolves a user that may receive a role.
    pub(crate) async fn resolve_active_user(&self, id: UserId) -> WorkflowResult<User> {
        let user = self
            .ports
            .users
            .find_user(id)
            .await?
            .ok_or(LabelingDomainError::UserNotFound(id))?;
        if !user.is_active() {
            return Err(LabelingDomainError::UserInactive(id).into());
        }
        Ok(user)
    }

    pub(crate) async fn resolve_active_users(&self, ids: &[UserId]) -> WorkflowResult<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            users.push(self.resolve_active_user(*id).await?);
        }
        Ok(users)
    }

    pub(crate) async fn task_images(&self, task: &LabelTask) -> WorkflowResult<Vec<TaskImage>> {
        Ok(self
            .ports
            .images
            .find(task.dataset_id(), &ImageQuery::for_task(task.id()))
            .await?)
    }

    /// Grants a project role; the caller holds the project lock.
    pub(crate) async fn grant_project_role_locked(
        &self,
        project: ProjectId,
        user: UserId,
        kind: RoleKind,
    ) -> WorkflowResult<()> {
        let grant = ProjectRole::new(project, user, kind, &*self.clock);
        if self.ports.project_roles.grant(&grant).await? {
            info!(project_id = %project, user_id = %user, role = %kind, "granted project role");
        }
        Ok(())
    }

    /// Recounts task statuses and cascades to the project status.
    ///
    /// The caller holds the project lock.
    pub(crate) async fn update_subtask_counter_locked(
        &self,
        project_id: ProjectId,
    ) -> WorkflowResult<Project> {
        let mut project = self.find_project_or_error(project_id).await?;
        let counters = self.ports.tasks.count_by_status(project_id).await?;
        let promoted = project.apply_task_counters(counters, &*self.clock);
        self.ports.projects.update(&project).await?;
        if promoted {
            info!(project_id = %project_id, "every task accepted, project moved to reviewing");
        }
        Ok(project)
    }

    /// Takes the project lock and recounts task statuses.
    pub(crate) async fn update_subtask_counter(
        &self,
        project_id: ProjectId,
    ) -> WorkflowResult<Project> {
        let _guard = self.locks.lock_project(project_id).await;
        self.update_subtask_counter_locked(project_id).await
    }
}
