//! In-memory repository for label tasks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::labeling::{
    domain::{LabelTask, ProjectId, TaskCounters, TaskId},
    ports::{RepositoryError, RepositoryResult, TaskRepository},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<HashMap<TaskId, LabelTask>>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store_batch(&self, tasks: &[LabelTask]) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        for task in tasks {
            state.insert(task.id(), task.clone());
        }
        Ok(())
    }

    async fn delete_batch(&self, ids: &[TaskId]) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        for id in ids {
            state.remove(id);
        }
        Ok(())
    }

    async fn update(&self, task: &LabelTask) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        let slot = state
            .get_mut(&task.id())
            .ok_or(RepositoryError::TaskNotFound(task.id()))?;
        *slot = task.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> RepositoryResult<Option<LabelTask>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state.get(&id).cloned())
    }

    async fn list_by_project(&self, project: ProjectId) -> RepositoryResult<Vec<LabelTask>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let mut tasks: Vec<LabelTask> = state
            .values()
            .filter(|task| task.project_id() == project)
            .cloned()
            .collect();
        tasks.sort_by_key(LabelTask::idx);
        Ok(tasks)
    }

    async fn count_by_status(&self, project: ProjectId) -> RepositoryResult<TaskCounters> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let mut counters = TaskCounters::default();
        for task in state.values().filter(|task| task.project_id() == project) {
            counters.record(task.status());
        }
        Ok(counters)
    }
}
