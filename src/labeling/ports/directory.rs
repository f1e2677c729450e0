//! Ports for the user directory and the dataset catalog.

use crate::labeling::domain::{DatasetId, DatasetImage, DatasetRef, User, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors returned by directory and catalog implementations.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// The backing service could not be reached.
    #[error("directory unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps an infrastructure error.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}

/// Resolves user identifiers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user; `None` when unknown.
    async fn find_user(&self, id: UserId) -> DirectoryResult<Option<User>>;
}

/// Enumerates datasets and their images.
#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    /// Finds a dataset reference; `None` when unknown.
    async fn find_dataset(&self, id: DatasetId) -> DirectoryResult<Option<DatasetRef>>;

    /// Lists a dataset's images ordered by `(idx, id)`.
    async fn list_images(&self, id: DatasetId) -> DirectoryResult<Vec<DatasetImage>>;
}
