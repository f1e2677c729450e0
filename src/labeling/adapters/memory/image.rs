//! In-memory repository for per-image state, partitioned by dataset.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::labeling::{
    domain::{DatasetId, RoleKey, StatusCounts, TaskId, TaskImage, TaskImageId},
    ports::{ImageQuery, ImageStateRepository, RepositoryError, RepositoryResult},
};

type Partition = HashMap<TaskImageId, TaskImage>;

/// Thread-safe in-memory image state repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryImageStateRepository {
    state: Arc<RwLock<HashMap<DatasetId, Partition>>>,
}

impl InMemoryImageStateRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matching<'a>(partition: Option<&'a Partition>, query: &ImageQuery) -> Vec<&'a TaskImage> {
    let mut images: Vec<&TaskImage> = partition
        .into_iter()
        .flat_map(HashMap::values)
        .filter(|image| query.matches(image))
        .collect();
    images.sort_by(|left, right| {
        (left.idx(), left.image_id()).cmp(&(right.idx(), right.image_id()))
    });
    images
}

#[async_trait]
impl ImageStateRepository for InMemoryImageStateRepository {
    async fn store_batch(&self, dataset: DatasetId, images: &[TaskImage]) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        let partition = state.entry(dataset).or_default();
        for image in images {
            partition.insert(image.id(), image.clone());
        }
        Ok(())
    }

    async fn delete_batch(
        &self,
        dataset: DatasetId,
        ids: &[TaskImageId],
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        if let Some(partition) = state.get_mut(&dataset) {
            for id in ids {
                partition.remove(id);
            }
        }
        Ok(())
    }

    async fn update(&self, dataset: DatasetId, image: &TaskImage) -> RepositoryResult<()> {
        self.update_batch(dataset, std::slice::from_ref(image)).await
    }

    async fn update_batch(
        &self,
        dataset: DatasetId,
        images: &[TaskImage],
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        let partition = state.entry(dataset).or_default();
        if let Some(missing) = images
            .iter()
            .find(|image| !partition.contains_key(&image.id()))
        {
            return Err(RepositoryError::ImageNotFound(missing.id()));
        }
        for image in images {
            partition.insert(image.id(), image.clone());
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        dataset: DatasetId,
        id: TaskImageId,
    ) -> RepositoryResult<Option<TaskImage>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state
            .get(&dataset)
            .and_then(|partition| partition.get(&id))
            .cloned())
    }

    async fn find(
        &self,
        dataset: DatasetId,
        query: &ImageQuery,
    ) -> RepositoryResult<Vec<TaskImage>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let page = matching(state.get(&dataset), query)
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(page)
    }

    async fn count(&self, dataset: DatasetId, query: &ImageQuery) -> RepositoryResult<u64> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let total = matching(state.get(&dataset), query).len();
        u64::try_from(total).map_err(RepositoryError::persistence)
    }

    async fn count_statuses(
        &self,
        dataset: DatasetId,
        task: TaskId,
    ) -> RepositoryResult<BTreeMap<RoleKey, StatusCounts>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let mut counts: BTreeMap<RoleKey, StatusCounts> = BTreeMap::new();
        let images = state
            .get(&dataset)
            .into_iter()
            .flat_map(HashMap::values)
            .filter(|image| image.task_id() == task);
        for image in images {
            for (key, status) in image.role_status() {
                counts.entry(*key).or_default().record(*status);
            }
        }
        Ok(counts)
    }
}
