//! Service-level error type shared by every workflow service.

use crate::labeling::{
    domain::{ErrorKind, LabelingDomainError},
    ports::{DirectoryError, RepositoryError},
};
use thiserror::Error;

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Domain validation or a state rule failed.
    #[error(transparent)]
    Domain(#[from] LabelingDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// User directory or dataset catalog lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl WorkflowError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Repository(
                RepositoryError::ProjectNotFound(_)
                | RepositoryError::TaskNotFound(_)
                | RepositoryError::TaskRoleNotFound(_)
                | RepositoryError::ImageNotFound(_),
            ) => ErrorKind::NotFound,
            Self::Repository(RepositoryError::DatasetAlreadyBound { .. }) => ErrorKind::Validation,
            Self::Repository(RepositoryError::DuplicateProject(_)) => ErrorKind::StateConflict,
            Self::Repository(RepositoryError::Persistence(_)) | Self::Directory(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Returns the domain error, if this is one.
    #[must_use]
    pub const fn as_domain(&self) -> Option<&LabelingDomainError> {
        match self {
            Self::Domain(err) => Some(err),
            Self::Repository(_) | Self::Directory(_) => None,
        }
    }
}

/// Result type for workflow service operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
