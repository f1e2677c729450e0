//! Per-aggregate async locks.
//!
//! Every mutating task operation holds its task lock for its whole
//! read-modify-write cycle; project operations hold the project lock. A
//! caller that needs both takes the task lock first.
//!
//! A slot lives while a guard or a waiter holds it. Idle slots are dropped
//! on the next acquisition, so the registry tracks only contended and held
//! aggregates.

use crate::labeling::domain::{ProjectId, TaskId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots<K> = Mutex<BTreeMap<K, Arc<AsyncMutex<()>>>>;

/// Guard held while a task or project is being mutated.
pub type AggregateGuard = OwnedMutexGuard<()>;

/// Registry of one async mutex per task and per project.
#[derive(Debug, Default)]
pub struct LockRegistry {
    tasks: Slots<TaskId>,
    projects: Slots<ProjectId>,
}

fn slot<K: Ord>(slots: &Slots<K>, key: K) -> Arc<AsyncMutex<()>> {
    let mut map = slots.lock().unwrap_or_else(PoisonError::into_inner);
    map.retain(|held, mutex| *held == key || Arc::strong_count(mutex) > 1);
    Arc::clone(map.entry(key).or_default())
}

fn tracked<K>(slots: &Slots<K>) -> usize {
    slots.lock().unwrap_or_else(PoisonError::into_inner).len()
}

impl LockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to a task.
    pub async fn lock_task(&self, id: TaskId) -> AggregateGuard {
        slot(&self.tasks, id).lock_owned().await
    }

    /// Waits for exclusive access to a project.
    pub async fn lock_project(&self, id: ProjectId) -> AggregateGuard {
        slot(&self.projects, id).lock_owned().await
    }

    /// Number of task and project slots currently kept.
    #[must_use]
    pub fn tracked(&self) -> usize {
        tracked(&self.tasks).saturating_add(tracked(&self.projects))
    }
}
