//! Task lifecycle: leaders, workers, restart, QA and role resolution.

use super::{
    ProgressAggregator, RoleAssignmentService, WorkflowContext, WorkflowResult,
};
use crate::labeling::domain::{
    ImageStatus, LabelTask, LabelingDomainError, ProjectId, RoleKey, RoleKind, TaskId,
    TaskQaAction, TaskRole, TaskRoleKind, TaskStatus, UserId,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Task lifecycle orchestration service.
pub struct TaskLifecycleService<C> {
    ctx: Arc<WorkflowContext<C>>,
}

impl<C> Clone for TaskLifecycleService<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<C> TaskLifecycleService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a task lifecycle service over a shared context.
    #[must_use]
    pub const fn new(ctx: Arc<WorkflowContext<C>>) -> Self {
        Self { ctx }
    }

    fn roles(&self) -> RoleAssignmentService<C> {
        RoleAssignmentService::new(Arc::clone(&self.ctx))
    }

    fn aggregator(&self) -> ProgressAggregator<C> {
        ProgressAggregator::new(Arc::clone(&self.ctx))
    }

    /// Assigns a leader, replacing the current one when present.
    ///
    /// The first label leader starts the task when review is disabled; the
    /// first review leader always does.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when `kind` is not a leader kind, the
    /// user cannot be resolved, review leaders are requested with review
    /// disabled, or the replacement fails.
    pub async fn set_leader(
        &self,
        task_id: TaskId,
        user_id: UserId,
        kind: RoleKind,
    ) -> WorkflowResult<TaskRole> {
        let task_kind = kind.require_task_bonded()?;
        if !task_kind.is_leader() {
            return Err(LabelingDomainError::NotALeaderRole(kind).into());
        }
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let mut task = self.ctx.find_task_or_error(task_id).await?;
        let project = self.ctx.find_project_or_error(task.project_id()).await?;
        let config = project.require_config()?;
        let user = self.ctx.resolve_active_user(user_id).await?;

        let current = self
            .ctx
            .ports
            .task_roles
            .list_active(task_id, Some(task_kind))
            .await?;
        if let Some(leader) = current.first() {
            return self
                .roles()
                .transfer_locked(&task, leader.user_id(), &user, task_kind)
                .await;
        }

        let mut created = self
            .roles()
            .init_roles_locked(&task, &project, std::slice::from_ref(&user), task_kind)
            .await?;
        let starts_work = match task_kind {
            TaskRoleKind::LabelLeader => !config.review_enabled(),
            TaskRoleKind::ReviewLeader => true,
            TaskRoleKind::Labeler | TaskRoleKind::Reviewer => false,
        };
        if starts_work && task.status() == TaskStatus::Waiting {
            task.start_work(&*self.ctx.clock)?;
            self.ctx.ports.tasks.update(&task).await?;
            info!(task_id = %task_id, "task started");
            self.ctx.update_subtask_counter(task.project_id()).await?;
        }
        created
            .pop()
            .ok_or_else(|| {
                LabelingDomainError::ActiveRoleNotFound {
                    task: task_id,
                    user: user_id,
                    kind,
                }
                .into()
            })
    }

    /// Assigns the full batch of labelers or reviewers of a task.
    ///
    /// Reviewers joining a task whose labelers have already submitted start
    /// in reviewing on those images.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when `kind` is not a worker kind, the
    /// count does not match the project configuration, workers of `kind`
    /// already exist, or a user cannot be resolved.
    pub async fn init_workers(
        &self,
        task_id: TaskId,
        user_ids: &[UserId],
        kind: RoleKind,
    ) -> WorkflowResult<Vec<TaskRole>> {
        let task_kind = kind.require_task_bonded()?;
        if !task_kind.is_worker() {
            return Err(LabelingDomainError::NotAWorkerRole(kind).into());
        }
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let task = self.ctx.find_task_or_error(task_id).await?;
        let project = self.ctx.find_project_or_error(task.project_id()).await?;
        let users = self.ctx.resolve_active_users(user_ids).await?;
        let roles = self
            .roles()
            .init_roles_locked(&task, &project, &users, task_kind)
            .await?;

        if task_kind == TaskRoleKind::Reviewer {
            let labelers = self
                .ctx
                .ports
                .task_roles
                .list_active(task_id, Some(TaskRoleKind::Labeler))
                .await?;
            if !labelers.is_empty() {
                let keys: Vec<RoleKey> = roles.iter().map(TaskRole::role_key).collect();
                let mut images = self.ctx.task_images(&task).await?;
                images.retain(|image| image.all_labelers_in(ImageStatus::Reviewing));
                for image in &mut images {
                    image.reset_role_status(&keys, ImageStatus::Reviewing);
                }
                self.ctx
                    .ports
                    .images
                    .update_batch(task.dataset_id(), &images)
                    .await?;
            }
            self.aggregator().refresh_locked(task).await?;
        }
        Ok(roles)
    }

    /// Replaces one labeler or reviewer.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when `kind` is not a worker kind or
    /// the transfer preconditions fail.
    pub async fn replace_worker(
        &self,
        task_id: TaskId,
        old_user: UserId,
        new_user: UserId,
        kind: RoleKind,
    ) -> WorkflowResult<TaskRole> {
        let task_kind = kind.require_task_bonded()?;
        if !task_kind.is_worker() {
            return Err(LabelingDomainError::NotAWorkerRole(kind).into());
        }
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let task = self.ctx.find_task_or_error(task_id).await?;
        let user = self.ctx.resolve_active_user(new_user).await?;
        self.roles()
            .transfer_locked(&task, old_user, &user, task_kind)
            .await
    }

    /// Puts a rejected task back to work.
    ///
    /// Every active role's entry on every image is reset to rejected, so
    /// labelers must submit again.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task is unknown or not
    /// rejected.
    pub async fn restart(&self, task_id: TaskId) -> WorkflowResult<LabelTask> {
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let mut task = self.ctx.find_task_or_error(task_id).await?;
        if let Err(err) = task.restart(&*self.ctx.clock) {
            warn!(task_id = %task_id, status = %task.status(), "rejected task restart");
            return Err(err.into());
        }
        self.ctx.ports.tasks.update(&task).await?;

        let roles = self.ctx.ports.task_roles.list_active(task_id, None).await?;
        let keys: Vec<RoleKey> = roles.iter().map(TaskRole::role_key).collect();
        let mut images = self.ctx.task_images(&task).await?;
        for image in &mut images {
            image.reset_role_status(&keys, ImageStatus::Rejected);
        }
        self.ctx
            .ports
            .images
            .update_batch(task.dataset_id(), &images)
            .await?;
        info!(task_id = %task_id, images = images.len(), "task restarted");

        let report = self.aggregator().refresh_locked(task).await?;
        self.ctx.update_subtask_counter(report.task.project_id()).await?;
        Ok(report.task)
    }

    /// Applies a manager verdict and recounts the project's tasks.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task is unknown or not in
    /// the status the action requires.
    pub async fn qa(&self, task_id: TaskId, action: TaskQaAction) -> WorkflowResult<LabelTask> {
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let mut task = self.ctx.find_task_or_error(task_id).await?;
        if let Err(err) = task.apply_qa(action, &*self.ctx.clock) {
            warn!(task_id = %task_id, status = %task.status(), "rejected task QA");
            return Err(err.into());
        }
        self.ctx.ports.tasks.update(&task).await?;
        info!(task_id = %task_id, status = %task.status(), "applied task QA");
        self.ctx.update_subtask_counter(task.project_id()).await?;
        Ok(task)
    }

    /// Resolves the role a user views a task from.
    ///
    /// Users with a leader-or-higher project role see every active role of
    /// the task; workers see only their own. The highest-level visible role
    /// wins. Returns `None` when no role is visible.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task is unknown or
    /// persistence fails.
    pub async fn get_max_role(
        &self,
        task_id: TaskId,
        user_id: UserId,
    ) -> WorkflowResult<Option<TaskRole>> {
        let task = self.ctx.find_task_or_error(task_id).await?;
        let grants = self
            .ctx
            .ports
            .project_roles
            .list_for_user(task.project_id(), user_id)
            .await?;
        let visible = if grants.iter().any(|grant| grant.kind.is_gte_leader()) {
            self.ctx.ports.task_roles.list_active(task_id, None).await?
        } else if grants
            .iter()
            .any(|grant| matches!(grant.kind, RoleKind::Labeler | RoleKind::Reviewer))
        {
            self.ctx
                .ports
                .task_roles
                .list_active_for_user(task_id, user_id)
                .await?
        } else {
            Vec::new()
        };
        Ok(visible.into_iter().min_by_key(|role| role.kind().level()))
    }

    /// Retrieves a task.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task is unknown.
    pub async fn find(&self, task_id: TaskId) -> WorkflowResult<LabelTask> {
        self.ctx.find_task_or_error(task_id).await
    }

    /// Lists the tasks of a project ordered by index.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when persistence fails.
    pub async fn list_for_project(&self, project_id: ProjectId) -> WorkflowResult<Vec<LabelTask>> {
        Ok(self.ctx.ports.tasks.list_by_project(project_id).await?)
    }

    /// Lists the active roles of a task.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when persistence fails.
    pub async fn list_roles(&self, task_id: TaskId) -> WorkflowResult<Vec<TaskRole>> {
        Ok(self.ctx.ports.task_roles.list_active(task_id, None).await?)
    }
}
