//! In-memory adapter implementations.
//!
//! These adapters provide simple, thread-safe implementations suitable for
//! tests, demos and single-process embedding.

mod directory;
mod image;
mod project;
mod role;
mod task;

pub use directory::{InMemoryDatasetCatalog, InMemoryUserDirectory};
pub use image::InMemoryImageStateRepository;
pub use project::{InMemoryProjectRepository, InMemoryProjectRoleRepository};
pub use role::InMemoryTaskRoleRepository;
pub use task::InMemoryTaskRepository;

use crate::labeling::ports::{RepositoryError, WorkflowPorts};
use std::sync::Arc;

/// Wires fresh in-memory repositories to the given directory and catalog.
#[must_use]
pub fn ports(users: InMemoryUserDirectory, datasets: InMemoryDatasetCatalog) -> WorkflowPorts {
    WorkflowPorts {
        projects: Arc::new(InMemoryProjectRepository::new()),
        tasks: Arc::new(InMemoryTaskRepository::new()),
        task_roles: Arc::new(InMemoryTaskRoleRepository::new()),
        project_roles: Arc::new(InMemoryProjectRoleRepository::new()),
        images: Arc::new(InMemoryImageStateRepository::new()),
        users: Arc::new(users),
        datasets: Arc::new(datasets),
    }
}

/// Maps a poisoned lock to a persistence error.
fn poisoned(err: &impl std::fmt::Display) -> RepositoryError {
    RepositoryError::persistence(std::io::Error::other(err.to_string()))
}
