//! Port contracts for the labeling workflow.
//!
//! Ports define infrastructure-agnostic interfaces used by workflow services.

pub mod directory;
pub mod repository;

pub use directory::{DatasetCatalog, DirectoryError, DirectoryResult, UserDirectory};
pub use repository::{
    ImageQuery, ImageStateRepository, ProjectRepository, ProjectRoleRepository, RepositoryError,
    RepositoryResult, TaskRepository, TaskRoleRepository,
};

use std::sync::Arc;

/// Every port the workflow services depend on, injected once.
#[derive(Clone)]
pub struct WorkflowPorts {
    /// Project storage.
    pub projects: Arc<dyn ProjectRepository>,
    /// Task storage.
    pub tasks: Arc<dyn TaskRepository>,
    /// Task role storage.
    pub task_roles: Arc<dyn TaskRoleRepository>,
    /// Project role storage.
    pub project_roles: Arc<dyn ProjectRoleRepository>,
    /// Per-image state storage.
    pub images: Arc<dyn ImageStateRepository>,
    /// User lookups.
    pub users: Arc<dyn UserDirectory>,
    /// Dataset enumeration.
    pub datasets: Arc<dyn DatasetCatalog>,
}
