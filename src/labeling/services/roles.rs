//! Role assignment: creating task roles and handing them over.

use super::{WorkflowContext, WorkflowResult};
use crate::labeling::domain::{
    ImageStatus, LabelTask, LabelingDomainError, Project, RoleKind, TaskId, TaskRole,
    TaskRoleKind, User, UserId, validate_role_batch,
};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Role assignment service.
pub struct RoleAssignmentService<C> {
    ctx: Arc<WorkflowContext<C>>,
}

impl<C> Clone for RoleAssignmentService<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<C> RoleAssignmentService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a role assignment service over a shared context.
    #[must_use]
    pub const fn new(ctx: Arc<WorkflowContext<C>>) -> Self {
        Self { ctx }
    }

    /// Creates one role of `kind` per user on a task.
    ///
    /// Leaders take exactly one user; workers take exactly the number the
    /// project configuration requires. Fails when any role of `kind` is
    /// already active on the task.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when `kind` is not task-bonded, the
    /// batch size is wrong, roles already exist, or a user cannot be
    /// resolved.
    pub async fn init_roles(
        &self,
        task_id: TaskId,
        user_ids: &[UserId],
        kind: RoleKind,
    ) -> WorkflowResult<Vec<TaskRole>> {
        let task_kind = kind.require_task_bonded()?;
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let task = self.ctx.find_task_or_error(task_id).await?;
        let project = self.ctx.find_project_or_error(task.project_id()).await?;
        let users = self.ctx.resolve_active_users(user_ids).await?;
        self.init_roles_locked(&task, &project, &users, task_kind)
            .await
    }

    /// Hands `old_user`'s active role of `kind` over to `new_user`.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when `kind` is not task-bonded, the
    /// users are the same, `old_user` holds no such active role, or
    /// `new_user` already holds one.
    pub async fn transfer(
        &self,
        task_id: TaskId,
        old_user: UserId,
        new_user: UserId,
        kind: RoleKind,
    ) -> WorkflowResult<TaskRole> {
        let task_kind = kind.require_task_bonded()?;
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let task = self.ctx.find_task_or_error(task_id).await?;
        let user = self.ctx.resolve_active_user(new_user).await?;
        self.transfer_locked(&task, old_user, &user, task_kind).await
    }

    /// Creates roles; the caller holds the task lock.
    pub(crate) async fn init_roles_locked(
        &self,
        task: &LabelTask,
        project: &Project,
        users: &[User],
        kind: TaskRoleKind,
    ) -> WorkflowResult<Vec<TaskRole>> {
        let config = project.require_config()?;
        validate_role_batch(&config, kind, users.len())?;
        let active = self
            .ctx
            .ports
            .task_roles
            .list_active(task.id(), Some(kind))
            .await?;
        if !active.is_empty() {
            return Err(LabelingDomainError::RolesAlreadyAssigned {
                task: task.id(),
                kind: kind.role_kind(),
                active: active.len(),
            }
            .into());
        }
        let mut seen = BTreeSet::new();
        if let Some(duplicate) = users.iter().find(|user| !seen.insert(user.id())) {
            return Err(LabelingDomainError::RoleAlreadyHeld {
                task: task.id(),
                user: duplicate.id(),
                kind: kind.role_kind(),
            }
            .into());
        }

        let clock = &*self.ctx.clock;
        let roles: Vec<TaskRole> = users
            .iter()
            .map(|user| TaskRole::new(task, user, kind, clock))
            .collect();
        self.ctx.ports.task_roles.store_batch(&roles).await?;
        {
            let _project_guard = self.ctx.locks.lock_project(task.project_id()).await;
            for role in &roles {
                self.ctx
                    .grant_project_role_locked(task.project_id(), role.user_id(), kind.role_kind())
                    .await?;
            }
        }

        let mut images = self.ctx.task_images(task).await?;
        for image in &mut images {
            for role in &roles {
                image.seed_role(role.role_key(), ImageStatus::Labeling);
            }
        }
        self.ctx
            .ports
            .images
            .update_batch(task.dataset_id(), &images)
            .await?;
        info!(
            task_id = %task.id(),
            role = %kind,
            count = roles.len(),
            "assigned task roles"
        );
        Ok(roles)
    }

    /// Transfers a role; the caller holds the task lock.
    ///
    /// Task-progress counters move to the new role, contribution counters
    /// stay with the old one. Worker transfers also move the per-image
    /// status entries and submissions.
    pub(crate) async fn transfer_locked(
        &self,
        task: &LabelTask,
        old_user: UserId,
        new_user: &User,
        kind: TaskRoleKind,
    ) -> WorkflowResult<TaskRole> {
        if old_user == new_user.id() {
            return Err(LabelingDomainError::SameUserReplacement {
                kind: kind.role_kind(),
                user: old_user,
            }
            .into());
        }
        let roles = &self.ctx.ports.task_roles;
        let mut old_role = roles
            .find_active(task.id(), old_user, kind)
            .await?
            .ok_or(LabelingDomainError::ActiveRoleNotFound {
                task: task.id(),
                user: old_user,
                kind: kind.role_kind(),
            })?;
        if roles
            .find_active(task.id(), new_user.id(), kind)
            .await?
            .is_some()
        {
            return Err(LabelingDomainError::RoleAlreadyHeld {
                task: task.id(),
                user: new_user.id(),
                kind: kind.role_kind(),
            }
            .into());
        }

        let clock = &*self.ctx.clock;
        let mut new_role = TaskRole::new(task, new_user, kind, clock);
        new_role.inherit_progress(&old_role, clock);
        old_role.deactivate(clock);
        roles.store_batch(std::slice::from_ref(&new_role)).await?;
        roles.update_batch(std::slice::from_ref(&old_role)).await?;

        {
            let project_id = task.project_id();
            let _project_guard = self.ctx.locks.lock_project(project_id).await;
            self.ctx
                .grant_project_role_locked(project_id, new_user.id(), kind.role_kind())
                .await?;
            let remaining = roles
                .count_active_in_project(project_id, old_user, kind)
                .await?;
            if remaining == 0 {
                self.ctx
                    .ports
                    .project_roles
                    .revoke(project_id, old_user, kind.role_kind())
                    .await?;
            }
        }

        if kind.is_worker() {
            let suffix = clock.utc().timestamp_millis().to_string();
            let mut images = self.ctx.task_images(task).await?;
            for image in &mut images {
                image.transfer_worker(kind, old_user, new_user, &suffix);
            }
            self.ctx
                .ports
                .images
                .update_batch(task.dataset_id(), &images)
                .await?;
        }
        info!(
            task_id = %task.id(),
            role = %kind,
            from = %old_user,
            to = %new_user.id(),
            "transferred task role"
        );
        Ok(new_role)
    }
}
