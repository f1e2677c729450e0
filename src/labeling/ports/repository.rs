//! Repository ports for projects, tasks, roles and per-image state.

use crate::labeling::domain::{
    DatasetId, ImageStatus, LabelTask, Project, ProjectId, ProjectRole, RoleKey, RoleKind,
    StatusCounts, TaskCounters, TaskId, TaskImage, TaskImageId, TaskRole, TaskRoleId,
    TaskRoleKind, UserId,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors returned by repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// A project with the same identifier already exists.
    #[error("duplicate project identifier: {0}")]
    DuplicateProject(ProjectId),

    /// The dataset is already covered by another project.
    #[error("dataset {dataset} already belongs to project {project}")]
    DatasetAlreadyBound {
        /// The contested dataset.
        dataset: DatasetId,
        /// The project that already owns it.
        project: ProjectId,
    },

    /// The project was not found.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The task role was not found.
    #[error("task role not found: {0}")]
    TaskRoleNotFound(TaskRoleId),

    /// The image state was not found.
    #[error("task image not found: {0}")]
    ImageNotFound(TaskImageId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Project persistence contract.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Stores a new project.
    ///
    /// The dataset-uniqueness check and the write are one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateProject`] for a reused identifier
    /// or [`RepositoryError::DatasetAlreadyBound`] when a dataset already
    /// belongs to another project.
    async fn store(&self, project: &Project) -> RepositoryResult<()>;

    /// Persists changes to an existing project.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ProjectNotFound`] when the project does not
    /// exist.
    async fn update(&self, project: &Project) -> RepositoryResult<()>;

    /// Finds a project by identifier.
    async fn find_by_id(&self, id: ProjectId) -> RepositoryResult<Option<Project>>;

    /// Finds the project covering any of `datasets`.
    async fn find_by_dataset(&self, datasets: &[DatasetId]) -> RepositoryResult<Option<Project>>;
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores newly created tasks.
    async fn store_batch(&self, tasks: &[LabelTask]) -> RepositoryResult<()>;

    /// Removes tasks; unknown identifiers are ignored.
    async fn delete_batch(&self, ids: &[TaskId]) -> RepositoryResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::TaskNotFound`] when the task does not exist.
    async fn update(&self, task: &LabelTask) -> RepositoryResult<()>;

    /// Finds a task by identifier.
    async fn find_by_id(&self, id: TaskId) -> RepositoryResult<Option<LabelTask>>;

    /// Lists the tasks of a project ordered by index.
    async fn list_by_project(&self, project: ProjectId) -> RepositoryResult<Vec<LabelTask>>;

    /// Counts the tasks of a project per status.
    async fn count_by_status(&self, project: ProjectId) -> RepositoryResult<TaskCounters>;
}

/// Task role persistence contract.
#[async_trait]
pub trait TaskRoleRepository: Send + Sync {
    /// Stores newly created roles.
    async fn store_batch(&self, roles: &[TaskRole]) -> RepositoryResult<()>;

    /// Persists changes to existing roles.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::TaskRoleNotFound`] when any role does not
    /// exist; no role is written in that case.
    async fn update_batch(&self, roles: &[TaskRole]) -> RepositoryResult<()>;

    /// Finds a role, active or not, by identifier.
    async fn find_by_id(&self, id: TaskRoleId) -> RepositoryResult<Option<TaskRole>>;

    /// Lists the active roles of a task, optionally of one kind.
    async fn list_active(
        &self,
        task: TaskId,
        kind: Option<TaskRoleKind>,
    ) -> RepositoryResult<Vec<TaskRole>>;

    /// Finds `user`'s active role of `kind` on a task.
    async fn find_active(
        &self,
        task: TaskId,
        user: UserId,
        kind: TaskRoleKind,
    ) -> RepositoryResult<Option<TaskRole>>;

    /// Lists every active role `user` holds on a task.
    async fn list_active_for_user(
        &self,
        task: TaskId,
        user: UserId,
    ) -> RepositoryResult<Vec<TaskRole>>;

    /// Counts `user`'s active roles of `kind` across a project.
    async fn count_active_in_project(
        &self,
        project: ProjectId,
        user: UserId,
        kind: TaskRoleKind,
    ) -> RepositoryResult<usize>;
}

/// Project role persistence contract.
#[async_trait]
pub trait ProjectRoleRepository: Send + Sync {
    /// Grants a project role; returns `false` when it was already held.
    async fn grant(&self, role: &ProjectRole) -> RepositoryResult<bool>;

    /// Revokes a project role; returns `false` when it was not held.
    async fn revoke(
        &self,
        project: ProjectId,
        user: UserId,
        kind: RoleKind,
    ) -> RepositoryResult<bool>;

    /// Lists every grant of a project.
    async fn list(&self, project: ProjectId) -> RepositoryResult<Vec<ProjectRole>>;

    /// Lists `user`'s grants in a project.
    async fn list_for_user(
        &self,
        project: ProjectId,
        user: UserId,
    ) -> RepositoryResult<Vec<ProjectRole>>;
}

/// Filter, order and page for image-state queries.
///
/// Results are ordered by image index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageQuery {
    /// The task whose images are queried.
    pub task_id: TaskId,
    /// Only images whose entry for the key has the status.
    pub status: Option<(RoleKey, ImageStatus)>,
    /// Number of matching images to skip.
    pub skip: usize,
    /// Maximum number of images to return.
    pub limit: Option<usize>,
}

impl ImageQuery {
    /// Every image of `task_id`.
    #[must_use]
    pub const fn for_task(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: None,
            skip: 0,
            limit: None,
        }
    }

    /// Restricts the query to images where `key` has `status`.
    #[must_use]
    pub const fn with_status(mut self, key: RoleKey, status: ImageStatus) -> Self {
        self.status = Some((key, status));
        self
    }

    /// Pages the query.
    #[must_use]
    pub const fn paged(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    /// Returns `true` when `image` passes the filter.
    #[must_use]
    pub fn matches(&self, image: &TaskImage) -> bool {
        image.task_id() == self.task_id
            && self
                .status
                .is_none_or(|(key, status)| image.status_of(key) == Some(status))
    }
}

/// Per-image state persistence contract, partitioned by dataset.
#[async_trait]
pub trait ImageStateRepository: Send + Sync {
    /// Stores newly created image states.
    async fn store_batch(&self, dataset: DatasetId, images: &[TaskImage]) -> RepositoryResult<()>;

    /// Removes image states; unknown identifiers are ignored.
    async fn delete_batch(&self, dataset: DatasetId, ids: &[TaskImageId])
    -> RepositoryResult<()>;

    /// Persists changes to one image state.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ImageNotFound`] when it does not exist.
    async fn update(&self, dataset: DatasetId, image: &TaskImage) -> RepositoryResult<()>;

    /// Persists changes to several image states.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ImageNotFound`] when any does not exist;
    /// nothing is written in that case.
    async fn update_batch(&self, dataset: DatasetId, images: &[TaskImage])
    -> RepositoryResult<()>;

    /// Finds one image state.
    async fn find_by_id(
        &self,
        dataset: DatasetId,
        id: TaskImageId,
    ) -> RepositoryResult<Option<TaskImage>>;

    /// Returns image states matching `query`, ordered by image index.
    async fn find(&self, dataset: DatasetId, query: &ImageQuery)
    -> RepositoryResult<Vec<TaskImage>>;

    /// Counts image states matching `query`, ignoring paging.
    async fn count(&self, dataset: DatasetId, query: &ImageQuery) -> RepositoryResult<u64>;

    /// Counts the images of a task per role key and status.
    async fn count_statuses(
        &self,
        dataset: DatasetId,
        task: TaskId,
    ) -> RepositoryResult<BTreeMap<RoleKey, StatusCounts>>;
}
