//! In-memory user directory and dataset catalog.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::labeling::{
    domain::{DatasetId, DatasetImage, DatasetRef, User, UserId},
    ports::{DatasetCatalog, DirectoryError, DirectoryResult, UserDirectory},
};

fn unavailable(err: &impl std::fmt::Display) -> DirectoryError {
    DirectoryError::unavailable(std::io::Error::other(err.to_string()))
}

/// Thread-safe in-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] when the lock is poisoned.
    pub fn insert(&self, user: User) -> DirectoryResult<()> {
        let mut users = self.users.write().map_err(|err| unavailable(&err))?;
        users.insert(user.id(), user);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> DirectoryResult<Option<User>> {
        let users = self.users.read().map_err(|err| unavailable(&err))?;
        Ok(users.get(&id).cloned())
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    dataset: DatasetRef,
    images: Vec<DatasetImage>,
}

/// Thread-safe in-memory dataset catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatasetCatalog {
    datasets: Arc<RwLock<HashMap<DatasetId, CatalogEntry>>>,
}

impl InMemoryDatasetCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a dataset with its images.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] when the lock is poisoned.
    pub fn insert(&self, dataset: DatasetRef, images: Vec<DatasetImage>) -> DirectoryResult<()> {
        let mut datasets = self.datasets.write().map_err(|err| unavailable(&err))?;
        datasets.insert(dataset.id, CatalogEntry { dataset, images });
        Ok(())
    }
}

#[async_trait]
impl DatasetCatalog for InMemoryDatasetCatalog {
    async fn find_dataset(&self, id: DatasetId) -> DirectoryResult<Option<DatasetRef>> {
        let datasets = self.datasets.read().map_err(|err| unavailable(&err))?;
        Ok(datasets.get(&id).map(|entry| entry.dataset.clone()))
    }

    async fn list_images(&self, id: DatasetId) -> DirectoryResult<Vec<DatasetImage>> {
        let datasets = self.datasets.read().map_err(|err| unavailable(&err))?;
        let mut images = datasets
            .get(&id)
            .map(|entry| entry.images.clone())
            .unwrap_or_default();
        images.sort_by(|left, right| (left.idx, &left.id).cmp(&(right.idx, &right.id)));
        Ok(images)
    }
}
