//! Domain model for the labeling workflow.
//!
//! Projects are split into tasks, tasks are staffed with leader and worker
//! roles, and every image of a task carries its own label/review state. All
//! types here are pure: persistence and orchestration live outside the
//! domain boundary.

mod access;
mod dataset;
mod error;
mod ids;
mod image;
mod project;
mod role;
mod task;
mod user;

pub use access::{AccessSubject, Capability, Resource, permits};
pub use dataset::{DatasetImage, DatasetObject, DatasetRef};
pub use error::{ErrorKind, LabelingDomainError, ParseEnumError};
pub use ids::{
    DatasetId, DatasetImageId, LabelId, ProjectId, ReviewId, TaskId, TaskImageId, TaskRoleId,
    UserId,
};
pub use image::{
    Annotation, BoundingBox, ImageStatus, LabelSubmission, PRE_LABEL_USER,
    RELABEL_ACCEPTED_LABELS, ReviewAction, ReviewSubmission, RoleKey, StatusCounts, TaskImage,
    TaskImageView, normalize_annotations,
};
pub use project::{
    Categories, ManagerChanges, NewProject, Project, ProjectQaAction, ProjectStatus,
    TaskCounters, WorkflowConfig,
};
pub use role::{
    Contribution, ProjectRole, RoleKind, TaskProgress, TaskRole, TaskRoleKind,
    validate_role_batch,
};
pub use task::{LabelTask, TaskQaAction, TaskStatus};
pub use user::{User, UserRef};
