//! Application services for the labeling workflow.

mod access;
mod annotation;
mod context;
mod engine;
mod error;
mod locks;
mod progress;
mod project;
mod roles;
mod task;

pub use access::AccessService;
pub use annotation::{AnnotationService, ImageListRequest, ImagePage};
pub use context::WorkflowContext;
pub use engine::WorkflowEngine;
pub use error::{WorkflowError, WorkflowResult};
pub use locks::{AggregateGuard, LockRegistry};
pub use progress::{ProgressAggregator, ProgressReport};
pub use project::{
    CreateProjectRequest, EditProjectRequest, InitProjectRequest, ProjectLifecycleService,
};
pub use roles::RoleAssignmentService;
pub use task::TaskLifecycleService;
