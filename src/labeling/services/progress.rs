//! Progress aggregation from image statuses up to task and project status.

use super::{WorkflowContext, WorkflowResult};
use crate::labeling::domain::{LabelTask, TaskId, TaskProgress, TaskRole, TaskStatus};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    /// The task after the pass.
    pub task: LabelTask,
    /// Every active role with its refreshed counters.
    pub roles: Vec<TaskRole>,
    /// Whether the pass moved the task to reviewing.
    pub promoted: bool,
}

/// Recomputes role counters and cascades task and project status.
pub struct ProgressAggregator<C> {
    ctx: Arc<WorkflowContext<C>>,
}

impl<C> Clone for ProgressAggregator<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<C> ProgressAggregator<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an aggregator over a shared context.
    #[must_use]
    pub const fn new(ctx: Arc<WorkflowContext<C>>) -> Self {
        Self { ctx }
    }

    /// Recomputes the progress of every active role of a task.
    ///
    /// Safe to call any number of times: it only ever moves a working task
    /// whose roles are all complete to reviewing.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError`] when the task or its project is
    /// unknown, the project is not initialized, or persistence fails.
    pub async fn update_progress_for_all_roles(
        &self,
        task_id: TaskId,
    ) -> WorkflowResult<ProgressReport> {
        let _guard = self.ctx.locks.lock_task(task_id).await;
        let task = self.ctx.find_task_or_error(task_id).await?;
        self.refresh_locked(task).await
    }

    /// Aggregates; the caller holds the task lock and passes a fresh task.
    pub(crate) async fn refresh_locked(&self, mut task: LabelTask) -> WorkflowResult<ProgressReport> {
        let project = self.ctx.find_project_or_error(task.project_id()).await?;
        let config = project.require_config()?;
        let counts = self
            .ctx
            .ports
            .images
            .count_statuses(task.dataset_id(), task.id())
            .await?;
        let mut roles = self.ctx.ports.task_roles.list_active(task.id(), None).await?;
        let clock = &*self.ctx.clock;
        for role in &mut roles {
            let role_counts = counts.get(&role.role_key()).copied().unwrap_or_default();
            let progress =
                TaskProgress::from_counts(role_counts, task.num_total(), config.review_enabled());
            role.record_progress(progress, clock);
        }
        self.ctx.ports.task_roles.update_batch(&roles).await?;

        let complete = !roles.is_empty() && roles.iter().all(|role| role.progress().is_complete());
        debug!(
            task_id = %task.id(),
            roles = roles.len(),
            complete,
            "aggregated task progress"
        );
        let promoted = complete && task.status() == TaskStatus::Working;
        if promoted {
            task.submit_for_review(clock)?;
            self.ctx.ports.tasks.update(&task).await?;
            info!(task_id = %task.id(), "every role complete, task moved to reviewing");
            self.ctx.update_subtask_counter(task.project_id()).await?;
        }
        Ok(ProgressReport {
            task,
            roles,
            promoted,
        })
    }
}
