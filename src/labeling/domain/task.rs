//! Task aggregate: one batch of images from one dataset.

use super::{DatasetId, LabelingDomainError, ParseEnumError, ProjectId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No leader has started the task yet.
    Waiting,
    /// Labelers and reviewers are at work.
    Working,
    /// Every role is complete; waiting for manager QA.
    Reviewing,
    /// Manager QA rejected the task.
    Rejected,
    /// Manager QA accepted the task.
    Accepted,
}

impl TaskStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Waiting,
        Self::Working,
        Self::Reviewing,
        Self::Rejected,
        Self::Accepted,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Working => "working",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
            Self::Accepted => "accepted",
        }
    }

    /// Returns whether a transition to `target` is valid.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting | Self::Rejected, Self::Working)
                | (Self::Working, Self::Reviewing)
                | (Self::Reviewing, Self::Accepted | Self::Rejected)
                | (Self::Rejected, Self::Accepted)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("task status", value))
    }
}

/// Manager verdict on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskQaAction {
    /// Accept a task in review.
    Accept,
    /// Reject a task in review.
    Reject,
    /// Accept a rejected task without another round.
    ForceAccept,
}

impl TaskQaAction {
    /// Status the task must be in for the action.
    #[must_use]
    pub const fn required_status(self) -> TaskStatus {
        match self {
            Self::Accept | Self::Reject => TaskStatus::Reviewing,
            Self::ForceAccept => TaskStatus::Rejected,
        }
    }

    /// Status the action leads to.
    #[must_use]
    pub const fn target_status(self) -> TaskStatus {
        match self {
            Self::Accept | Self::ForceAccept => TaskStatus::Accepted,
            Self::Reject => TaskStatus::Rejected,
        }
    }
}

/// A batch of images from one dataset; the unit of role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTask {
    id: TaskId,
    idx: u64,
    project_id: ProjectId,
    dataset_id: DatasetId,
    num_total: u64,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LabelTask {
    /// Creates a waiting task covering `num_total` images.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        dataset_id: DatasetId,
        idx: u64,
        num_total: u64,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            idx,
            project_id,
            dataset_id,
            num_total,
            status: TaskStatus::Waiting,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the sequence index inside the project.
    #[must_use]
    pub const fn idx(&self) -> u64 {
        self.idx
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the source dataset.
    #[must_use]
    pub const fn dataset_id(&self) -> DatasetId {
        self.dataset_id
    }

    /// Returns the number of images in the task.
    #[must_use]
    pub const fn num_total(&self) -> u64 {
        self.num_total
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Fails unless the task accepts labels and reviews.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::TaskNotWorking`] for any other status.
    pub const fn ensure_working(&self) -> Result<(), LabelingDomainError> {
        match self.status {
            TaskStatus::Working => Ok(()),
            status => Err(LabelingDomainError::TaskNotWorking {
                task: self.id,
                status,
            }),
        }
    }

    /// Moves the task to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::InvalidTaskTransition`] when the move
    /// is not allowed from the current status.
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), LabelingDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(LabelingDomainError::InvalidTaskTransition {
                task: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    /// Starts a waiting task.
    ///
    /// # Errors
    ///
    /// See [`Self::transition_to`].
    pub fn start_work(&mut self, clock: &impl Clock) -> Result<(), LabelingDomainError> {
        self.transition_to(TaskStatus::Working, clock)
    }

    /// Hands a working task over to manager QA.
    ///
    /// # Errors
    ///
    /// See [`Self::transition_to`].
    pub fn submit_for_review(&mut self, clock: &impl Clock) -> Result<(), LabelingDomainError> {
        self.transition_to(TaskStatus::Reviewing, clock)
    }

    /// Puts a rejected task back to work.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::InvalidTaskTransition`] unless the task
    /// is rejected.
    pub fn restart(&mut self, clock: &impl Clock) -> Result<(), LabelingDomainError> {
        if self.status != TaskStatus::Rejected {
            return Err(LabelingDomainError::InvalidTaskTransition {
                task: self.id,
                from: self.status,
                to: TaskStatus::Working,
            });
        }
        self.transition_to(TaskStatus::Working, clock)
    }

    /// Applies a manager verdict.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::InvalidTaskTransition`] when the task
    /// is not in the status the action requires.
    pub fn apply_qa(
        &mut self,
        action: TaskQaAction,
        clock: &impl Clock,
    ) -> Result<(), LabelingDomainError> {
        let target = action.target_status();
        if self.status != action.required_status() {
            return Err(LabelingDomainError::InvalidTaskTransition {
                task: self.id,
                from: self.status,
                to: target,
            });
        }
        self.transition_to(target, clock)
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
