//! Permission evaluation backed by the role repositories.

use super::{WorkflowContext, WorkflowResult};
use crate::labeling::domain::{
    AccessSubject, Capability, LabelingDomainError, ProjectId, Resource, UserId, permits,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::warn;

/// Gathers a user's roles and evaluates capabilities against them.
pub struct AccessService<C> {
    ctx: Arc<WorkflowContext<C>>,
}

impl<C> Clone for AccessService<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<C> AccessService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an access service over a shared context.
    #[must_use]
    pub const fn new(ctx: Arc<WorkflowContext<C>>) -> Self {
        Self { ctx }
    }

    /// Collects the role facts relevant to `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the user or task is unknown.
    pub async fn subject(&self, user_id: UserId, resource: Resource) -> WorkflowResult<AccessSubject> {
        let user = self
            .ctx
            .ports
            .users
            .find_user(user_id)
            .await?
            .ok_or(LabelingDomainError::UserNotFound(user_id))?;
        let mut subject = AccessSubject {
            is_staff: user.is_staff(),
            ..AccessSubject::default()
        };
        match resource {
            Resource::Global => {}
            Resource::Project(project_id) => {
                self.collect_project_roles(&mut subject, project_id, user_id)
                    .await?;
            }
            Resource::Task(task_id) => {
                let task = self.ctx.find_task_or_error(task_id).await?;
                self.collect_project_roles(&mut subject, task.project_id(), user_id)
                    .await?;
                let roles = self
                    .ctx
                    .ports
                    .task_roles
                    .list_active_for_user(task_id, user_id)
                    .await?;
                subject.task_roles = roles.iter().map(|role| role.kind()).collect();
            }
        }
        Ok(subject)
    }

    /// Returns whether the user holds `capability` on `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the user or task is unknown.
    pub async fn permits(
        &self,
        user_id: UserId,
        resource: Resource,
        capability: Capability,
    ) -> WorkflowResult<bool> {
        let subject = self.subject(user_id, resource).await?;
        Ok(permits(&subject, capability))
    }

    /// Fails unless the user holds `capability` on `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::Forbidden`] when the capability is
    /// missing, or another [`super::WorkflowError`] when a lookup fails.
    pub async fn authorize(
        &self,
        user_id: UserId,
        resource: Resource,
        capability: Capability,
    ) -> WorkflowResult<()> {
        if self.permits(user_id, resource, capability).await? {
            return Ok(());
        }
        warn!(user_id = %user_id, %capability, "permission denied");
        Err(LabelingDomainError::Forbidden {
            user: user_id,
            capability,
        }
        .into())
    }

    async fn collect_project_roles(
        &self,
        subject: &mut AccessSubject,
        project_id: ProjectId,
        user_id: UserId,
    ) -> WorkflowResult<()> {
        let grants = self
            .ctx
            .ports
            .project_roles
            .list_for_user(project_id, user_id)
            .await?;
        subject.project_roles = grants.iter().map(|grant| grant.kind).collect();
        Ok(())
    }
}
