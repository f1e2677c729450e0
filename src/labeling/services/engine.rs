//! Entry point bundling every workflow service over one shared context.

use super::{
    AccessService, AnnotationService, ProgressAggregator, ProjectLifecycleService,
    RoleAssignmentService, TaskLifecycleService, WorkflowContext,
};
use crate::labeling::ports::WorkflowPorts;
use mockable::Clock;
use std::sync::Arc;

/// The labeling workflow engine.
///
/// Services handed out by one engine share ports, clock and locks, so
/// concurrent calls through any of them are serialized per task and per
/// project.
pub struct WorkflowEngine<C> {
    ctx: Arc<WorkflowContext<C>>,
}

impl<C> Clone for WorkflowEngine<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<C> WorkflowEngine<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an engine over `ports`.
    #[must_use]
    pub fn new(ports: WorkflowPorts, clock: Arc<C>) -> Self {
        Self {
            ctx: Arc::new(WorkflowContext::new(ports, clock)),
        }
    }

    /// Project lifecycle operations.
    #[must_use]
    pub fn projects(&self) -> ProjectLifecycleService<C> {
        ProjectLifecycleService::new(Arc::clone(&self.ctx))
    }

    /// Task lifecycle operations.
    #[must_use]
    pub fn tasks(&self) -> TaskLifecycleService<C> {
        TaskLifecycleService::new(Arc::clone(&self.ctx))
    }

    /// Direct role assignment and transfer.
    #[must_use]
    pub fn roles(&self) -> RoleAssignmentService<C> {
        RoleAssignmentService::new(Arc::clone(&self.ctx))
    }

    /// Progress aggregation.
    #[must_use]
    pub fn progress(&self) -> ProgressAggregator<C> {
        ProgressAggregator::new(Arc::clone(&self.ctx))
    }

    /// Label and review submission.
    #[must_use]
    pub fn annotations(&self) -> AnnotationService<C> {
        AnnotationService::new(Arc::clone(&self.ctx))
    }

    /// Permission evaluation.
    #[must_use]
    pub fn access(&self) -> AccessService<C> {
        AccessService::new(Arc::clone(&self.ctx))
    }
}
