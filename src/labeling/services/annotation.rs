//! Label and review submission, and the role-scoped image listing.

use super::{ProgressAggregator, TaskLifecycleService, WorkflowContext, WorkflowResult};
use crate::labeling::{
    domain::{
        Annotation, Capability, ImageStatus, LabelId, LabelTask, LabelingDomainError,
        ReviewAction, ReviewId, RoleKey, TaskId, TaskImage, TaskImageId, TaskImageView, TaskRole,
        TaskRoleId, TaskRoleKind, UserId, normalize_annotations,
    },
    ports::ImageQuery,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::debug;

/// Request for a page of task images seen from one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageListRequest {
    /// The task to list.
    pub task_id: TaskId,
    /// The viewing user.
    pub user_id: UserId,
    /// View from this role instead of the user's highest one.
    pub role_id: Option<TaskRoleId>,
    /// Only images in this status from the viewing role's perspective.
    pub status: Option<ImageStatus>,
    /// Number of images to skip.
    pub skip: usize,
    /// Maximum number of images to return.
    pub limit: usize,
}

impl ImageListRequest {
    /// Lists the first `limit` images from the user's highest role.
    #[must_use]
    pub const fn new(task_id: TaskId, user_id: UserId, limit: usize) -> Self {
        Self {
            task_id,
            user_id,
            role_id: None,
            status: None,
            skip: 0,
            limit,
        }
    }

    /// Views from a specific role.
    #[must_use]
    pub const fn as_role(mut self, role_id: TaskRoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    /// Filters by status.
    #[must_use]
    pub const fn with_status(mut self, status: ImageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Skips the first `skip` matching images.
    #[must_use]
    pub const fn skipping(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

/// A page of images seen from one role.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePage {
    /// The viewing role.
    pub role: TaskRole,
    /// Number of matching images across all pages.
    pub total: u64,
    /// The requested page.
    pub images: Vec<TaskImageView>,
}

/// Label and review submission service.
pub struct AnnotationService<C> {
    ctx: Arc<WorkflowContext<C>>,
}

impl<C> Clone for AnnotationService<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<C> AnnotationService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an annotation service over a shared context.
    #[must_use]
    pub const fn new(ctx: Arc<WorkflowContext<C>>) -> Self {
        Self { ctx }
    }

    /// Returns whether `user_id` may label the image now.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task or image is unknown.
    pub async fn can_set_label(
        &self,
        task_id: TaskId,
        image_id: TaskImageId,
        user_id: UserId,
    ) -> WorkflowResult<bool> {
        let task = self.ctx.find_task_or_error(task_id).await?;
        let image = self.find_image_in_task(&task, image_id).await?;
        let holds_role = self
            .ctx
            .ports
            .task_roles
            .find_active(task_id, user_id, TaskRoleKind::Labeler)
            .await?
            .is_some();
        Ok(holds_role && image.can_set_label(task.status(), user_id))
    }

    /// Returns whether `user_id` may review `label_id` on the image now.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task or image is unknown.
    pub async fn can_set_review(
        &self,
        task_id: TaskId,
        image_id: TaskImageId,
        user_id: UserId,
        label_id: &LabelId,
    ) -> WorkflowResult<bool> {
        let task = self.ctx.find_task_or_error(task_id).await?;
        let image = self.find_image_in_task(&task, image_id).await?;
        let holds_role = self
            .ctx
            .ports
            .task_roles
            .find_active(task_id, user_id, TaskRoleKind::Reviewer)
            .await?
            .is_some();
        Ok(holds_role && image.can_set_review(task.status(), user_id, label_id))
    }

    /// Replaces the labeler's label on an image and refreshes progress.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task is not working, the
    /// user holds no active labeler role, the image is not part of the task,
    /// or an annotation has no category.
    pub async fn set_label(
        &self,
        task_id: TaskId,
        image_id: TaskImageId,
        user_id: UserId,
        annotations: Vec<Annotation>,
    ) -> WorkflowResult<LabelId> {
        let normalized = normalize_annotations(annotations)?;
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let task = self.ctx.find_task_or_error(task_id).await?;
        task.ensure_working()?;
        let mut role = self.find_worker_role(&task, user_id, TaskRoleKind::Labeler).await?;
        let user = self.ctx.resolve_active_user(user_id).await?;
        let mut image = self.find_image_in_task(&task, image_id).await?;

        let clock = &*self.ctx.clock;
        let label_id = image.apply_label(&user, normalized, clock);
        self.ctx.ports.images.update(task.dataset_id(), &image).await?;
        role.record_label(clock);
        self.ctx
            .ports
            .task_roles
            .update_batch(std::slice::from_ref(&role))
            .await?;
        debug!(task_id = %task_id, image_id = %image_id, label_id = %label_id, "label submitted");
        ProgressAggregator::new(Arc::clone(&self.ctx))
            .refresh_locked(task)
            .await?;
        Ok(label_id)
    }

    /// Records a review verdict and refreshes progress.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when `label_id` is empty or unknown,
    /// the task is not working, the user holds no active reviewer role, or
    /// the image is not part of the task.
    pub async fn set_review(
        &self,
        task_id: TaskId,
        image_id: TaskImageId,
        user_id: UserId,
        label_id: &LabelId,
        action: ReviewAction,
    ) -> WorkflowResult<ReviewId> {
        if label_id.is_empty() {
            return Err(LabelingDomainError::EmptyLabelId.into());
        }
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let task = self.ctx.find_task_or_error(task_id).await?;
        task.ensure_working()?;
        let mut role = self.find_worker_role(&task, user_id, TaskRoleKind::Reviewer).await?;
        let user = self.ctx.resolve_active_user(user_id).await?;
        let mut image = self.find_image_in_task(&task, image_id).await?;

        let clock = &*self.ctx.clock;
        let review_id = image.apply_review(&user, label_id, action, clock)?;
        self.ctx.ports.images.update(task.dataset_id(), &image).await?;
        role.record_review(action, clock);
        self.ctx
            .ports
            .task_roles
            .update_batch(std::slice::from_ref(&role))
            .await?;
        debug!(
            task_id = %task_id,
            image_id = %image_id,
            label_id = %label_id,
            %action,
            "review submitted"
        );
        ProgressAggregator::new(Arc::clone(&self.ctx))
            .refresh_locked(task)
            .await?;
        Ok(review_id)
    }

    /// Lists a page of task images as seen from one role.
    ///
    /// Leader views filter on the label leader's status. A user may view
    /// from any role at or below their own highest role.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task or role is unknown, the
    /// user sees no role of the task, or the requested role outranks theirs.
    pub async fn list_images_for_role(
        &self,
        request: ImageListRequest,
    ) -> WorkflowResult<ImagePage> {
        let task = self.ctx.find_task_or_error(request.task_id).await?;
        let own = TaskLifecycleService::new(Arc::clone(&self.ctx))
            .get_max_role(request.task_id, request.user_id)
            .await?
            .ok_or(LabelingDomainError::Forbidden {
                user: request.user_id,
                capability: Capability::ViewProject,
            })?;
        let role = match request.role_id {
            None => own,
            Some(role_id) => {
                let requested = self
                    .ctx
                    .ports
                    .task_roles
                    .find_by_id(role_id)
                    .await?
                    .filter(|candidate| {
                        candidate.is_active() && candidate.task_id() == request.task_id
                    })
                    .ok_or(LabelingDomainError::TaskRoleNotFound(role_id))?;
                if requested.kind().level() < own.kind().level() {
                    return Err(LabelingDomainError::Forbidden {
                        user: request.user_id,
                        capability: Capability::ViewAllRoles,
                    }
                    .into());
                }
                requested
            }
        };

        let status_key = if role.kind().is_leader() {
            RoleKey::LabelLeader
        } else {
            role.role_key()
        };
        let mut query = ImageQuery::for_task(task.id());
        if let Some(status) = request.status {
            query = query.with_status(status_key, status);
        }
        let images = &self.ctx.ports.images;
        let total = images.count(task.dataset_id(), &query).await?;
        let page = images
            .find(
                task.dataset_id(),
                &query.paged(request.skip, request.limit),
            )
            .await?;
        let views = page
            .iter()
            .map(|image| image.view_for(role.kind(), role.user_id()))
            .collect();
        Ok(ImagePage {
            role,
            total,
            images: views,
        })
    }

    async fn find_worker_role(
        &self,
        task: &LabelTask,
        user_id: UserId,
        kind: TaskRoleKind,
    ) -> WorkflowResult<TaskRole> {
        self.ctx
            .ports
            .task_roles
            .find_active(task.id(), user_id, kind)
            .await?
            .ok_or_else(|| {
                LabelingDomainError::ActiveRoleNotFound {
                    task: task.id(),
                    user: user_id,
                    kind: kind.role_kind(),
                }
                .into()
            })
    }

    async fn find_image_in_task(
        &self,
        task: &LabelTask,
        image_id: TaskImageId,
    ) -> WorkflowResult<TaskImage> {
        let image = self
            .ctx
            .ports
            .images
            .find_by_id(task.dataset_id(), image_id)
            .await?
            .ok_or(LabelingDomainError::ImageNotFound(image_id))?;
        if image.task_id() != task.id() {
            return Err(LabelingDomainError::ImageNotInTask {
                image: image_id,
                task: task.id(),
            }
            .into());
        }
        Ok(image)
    }
}
