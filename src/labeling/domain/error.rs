//! Error types for labeling domain validation and parsing.

use super::{
    Capability, DatasetId, LabelId, ProjectId, ProjectStatus, RoleKind, TaskId, TaskImageId,
    TaskRoleId, TaskStatus, UserId,
};
use thiserror::Error;

/// Coarse classification of a failure, used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// The operation is not valid for the current status of an aggregate.
    StateConflict,
    /// A referenced project, task, role, image, label, user or dataset is unknown.
    NotFound,
    /// A capability check failed.
    Permission,
    /// Storage or directory infrastructure failed.
    Infrastructure,
}

/// Errors raised by the labeling workflow domain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LabelingDomainError {
    /// A project was created without managers, or edited to have none.
    #[error("project must have at least one manager")]
    EmptyManagers,

    /// A project was created without datasets.
    #[error("project must cover at least one dataset")]
    EmptyDatasets,

    /// A project was created without categories.
    #[error("project must declare at least one category")]
    EmptyCategories,

    /// Batch size, label times and review times were not supplied together.
    #[error("batch_size, label_times and review_times must be set together")]
    IncompleteWorkflowConfig,

    /// Every image needs at least one labeler.
    #[error("label_times must be at least 1, got {0}")]
    InvalidLabelTimes(u32),

    /// The prospective owner may not create projects.
    #[error("user {0} is not permitted to create projects")]
    CannotCreateProject(UserId),

    /// The dataset is already covered by another project.
    #[error("dataset {dataset} already belongs to project {project}")]
    DatasetAlreadyBound {
        /// The contested dataset.
        dataset: DatasetId,
        /// The project that already owns it.
        project: ProjectId,
    },

    /// The role is project-scoped and cannot be assigned on a task.
    #[error("role {0} cannot be assigned on a task")]
    RoleNotTaskBonded(RoleKind),

    /// A leader operation was invoked with a worker or project role.
    #[error("role {0} is not a leader role")]
    NotALeaderRole(RoleKind),

    /// A worker operation was invoked with a leader or project role.
    #[error("role {0} is not a worker role")]
    NotAWorkerRole(RoleKind),

    /// Leader roles are assigned to exactly one user at a time.
    #[error("exactly one {kind} must be assigned at a time, got {actual}")]
    LeaderCountMismatch {
        /// The leader kind being assigned.
        kind: RoleKind,
        /// Number of users supplied.
        actual: usize,
    },

    /// Review roles cannot exist on a project with review disabled.
    #[error("cannot assign {0} because review is disabled for this project")]
    ReviewDisabled(RoleKind),

    /// Workers are assigned as one batch matching the project contract.
    #[error("exactly {expected} {kind} role(s) must be assigned at once, got {actual}")]
    WorkerCountMismatch {
        /// The worker kind being assigned.
        kind: RoleKind,
        /// Count required by the project configuration.
        expected: u32,
        /// Number of users supplied.
        actual: usize,
    },

    /// A role cannot be handed over to the user who already holds it.
    #[error("cannot replace {kind} {user} with the same user")]
    SameUserReplacement {
        /// The role kind being transferred.
        kind: RoleKind,
        /// The user named on both sides.
        user: UserId,
    },

    /// The user exists but has been deactivated.
    #[error("user {0} is inactive")]
    UserInactive(UserId),

    /// A review was submitted without naming a label.
    #[error("label id must not be empty")]
    EmptyLabelId,

    /// An annotation has no category name.
    #[error("annotation {index} is missing a category name")]
    MissingAnnotationCategory {
        /// Position of the offending annotation.
        index: usize,
    },

    /// The user lacks the capability for the requested action.
    #[error("user {user} lacks the {capability} capability")]
    Forbidden {
        /// The acting user.
        user: UserId,
        /// The capability that was checked.
        capability: Capability,
    },

    /// The project status does not allow the requested transition.
    #[error("project {project} cannot move from {from} to {to}")]
    InvalidProjectTransition {
        /// The project being transitioned.
        project: ProjectId,
        /// Current status.
        from: ProjectStatus,
        /// Requested status.
        to: ProjectStatus,
    },

    /// The task status does not allow the requested transition.
    #[error("task {task} cannot move from {from} to {to}")]
    InvalidTaskTransition {
        /// The task being transitioned.
        task: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The project has no workflow configuration yet.
    #[error("project {0} has not been initialized")]
    ProjectNotInitialized(ProjectId),

    /// Labels and reviews are only accepted while a task is working.
    #[error("task {task} is {status}; labels and reviews need a working task")]
    TaskNotWorking {
        /// The task being labeled or reviewed.
        task: TaskId,
        /// Its current status.
        status: TaskStatus,
    },

    /// Roles of this kind were already assigned; only replacement is allowed.
    #[error("task {task} already has {active} active {kind} role(s); replace one instead")]
    RolesAlreadyAssigned {
        /// The task in question.
        task: TaskId,
        /// The role kind being assigned.
        kind: RoleKind,
        /// Number of active roles of that kind.
        active: usize,
    },

    /// The replacement user already holds the role on the task.
    #[error("user {user} already holds an active {kind} role on task {task}")]
    RoleAlreadyHeld {
        /// The task in question.
        task: TaskId,
        /// The replacement user.
        user: UserId,
        /// The role kind being transferred.
        kind: RoleKind,
    },

    /// No project with this identifier exists.
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    /// No task with this identifier exists.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// No active task role with this identifier exists.
    #[error("task role {0} not found")]
    TaskRoleNotFound(TaskRoleId),

    /// The user holds no active role of the kind on the task.
    #[error("user {user} holds no active {kind} role on task {task}")]
    ActiveRoleNotFound {
        /// The task in question.
        task: TaskId,
        /// The user expected to hold the role.
        user: UserId,
        /// The expected role kind.
        kind: RoleKind,
    },

    /// No image state with this identifier exists.
    #[error("task image {0} not found")]
    ImageNotFound(TaskImageId),

    /// The image state belongs to a different task.
    #[error("task image {image} does not belong to task {task}")]
    ImageNotInTask {
        /// The image state identifier.
        image: TaskImageId,
        /// The task named by the caller.
        task: TaskId,
    },

    /// No current label with this identifier exists on the image.
    #[error("label {0} not found")]
    LabelNotFound(LabelId),

    /// The user directory does not know this user.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// The dataset catalog does not know this dataset.
    #[error("dataset {0} not found")]
    DatasetNotFound(DatasetId),
}

impl LabelingDomainError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyManagers
            | Self::EmptyDatasets
            | Self::EmptyCategories
            | Self::IncompleteWorkflowConfig
            | Self::InvalidLabelTimes(_)
            | Self::CannotCreateProject(_)
            | Self::DatasetAlreadyBound { .. }
            | Self::RoleNotTaskBonded(_)
            | Self::NotALeaderRole(_)
            | Self::NotAWorkerRole(_)
            | Self::LeaderCountMismatch { .. }
            | Self::ReviewDisabled(_)
            | Self::WorkerCountMismatch { .. }
            | Self::SameUserReplacement { .. }
            | Self::UserInactive(_)
            | Self::EmptyLabelId
            | Self::MissingAnnotationCategory { .. } => ErrorKind::Validation,
            Self::Forbidden { .. } => ErrorKind::Permission,
            Self::InvalidProjectTransition { .. }
            | Self::InvalidTaskTransition { .. }
            | Self::ProjectNotInitialized(_)
            | Self::TaskNotWorking { .. }
            | Self::RolesAlreadyAssigned { .. }
            | Self::RoleAlreadyHeld { .. } => ErrorKind::StateConflict,
            Self::ProjectNotFound(_)
            | Self::TaskNotFound(_)
            | Self::TaskRoleNotFound(_)
            | Self::ActiveRoleNotFound { .. }
            | Self::ImageNotFound(_)
            | Self::ImageNotInTask { .. }
            | Self::LabelNotFound(_)
            | Self::UserNotFound(_)
            | Self::DatasetNotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Error returned while parsing a domain enum from its storage form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    /// Creates a parse error for `kind`.
    #[must_use]
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
