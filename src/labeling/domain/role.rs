//! Project and task roles, their levels, and per-role progress counters.

use super::{
    LabelTask, LabelingDomainError, ParseEnumError, ProjectId, ReviewAction, RoleKey,
    StatusCounts, TaskId, TaskRoleId, User, UserId, WorkflowConfig,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every role a user can hold in a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Created the project and accepts its result.
    Owner,
    /// Operates the project: initializes it, assigns leaders, runs task QA.
    Manager,
    /// Leads the labelers of a task.
    LabelLeader,
    /// Leads the reviewers of a task.
    ReviewLeader,
    /// Labels the images of a task.
    Labeler,
    /// Reviews the labels of a task.
    Reviewer,
}

impl RoleKind {
    /// All role kinds, highest permission first.
    pub const ALL: [Self; 6] = [
        Self::Owner,
        Self::Manager,
        Self::LabelLeader,
        Self::ReviewLeader,
        Self::Labeler,
        Self::Reviewer,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::LabelLeader => "label_leader",
            Self::ReviewLeader => "review_leader",
            Self::Labeler => "labeler",
            Self::Reviewer => "reviewer",
        }
    }

    /// Permission level; a smaller number means a higher level.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Owner => 0,
            Self::Manager => 1,
            Self::LabelLeader => 2,
            Self::ReviewLeader => 3,
            Self::Labeler => 4,
            Self::Reviewer => 5,
        }
    }

    /// Returns the task-bonded counterpart, or `None` for project-scoped roles.
    #[must_use]
    pub const fn task_bonded(self) -> Option<TaskRoleKind> {
        match self {
            Self::Owner | Self::Manager => None,
            Self::LabelLeader => Some(TaskRoleKind::LabelLeader),
            Self::ReviewLeader => Some(TaskRoleKind::ReviewLeader),
            Self::Labeler => Some(TaskRoleKind::Labeler),
            Self::Reviewer => Some(TaskRoleKind::Reviewer),
        }
    }

    /// Returns the task-bonded counterpart or a validation error.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::RoleNotTaskBonded`] for owner and manager.
    pub const fn require_task_bonded(self) -> Result<TaskRoleKind, LabelingDomainError> {
        match self.task_bonded() {
            Some(kind) => Ok(kind),
            None => Err(LabelingDomainError::RoleNotTaskBonded(self)),
        }
    }

    /// Returns `true` for roles at or above leader level.
    #[must_use]
    pub const fn is_gte_leader(self) -> bool {
        matches!(
            self,
            Self::Owner | Self::Manager | Self::LabelLeader | Self::ReviewLeader
        )
    }

    /// Returns `true` for roles above leader level.
    #[must_use]
    pub const fn is_gt_leader(self) -> bool {
        matches!(self, Self::Owner | Self::Manager)
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RoleKind {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("role", value))
    }
}

/// Roles that are scoped to a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRoleKind {
    /// Singleton labeling supervisor.
    LabelLeader,
    /// Singleton review supervisor.
    ReviewLeader,
    /// One of `label_times` labelers.
    Labeler,
    /// One of `review_times` reviewers.
    Reviewer,
}

impl TaskRoleKind {
    /// Returns the project-wide role kind.
    #[must_use]
    pub const fn role_kind(self) -> RoleKind {
        match self {
            Self::LabelLeader => RoleKind::LabelLeader,
            Self::ReviewLeader => RoleKind::ReviewLeader,
            Self::Labeler => RoleKind::Labeler,
            Self::Reviewer => RoleKind::Reviewer,
        }
    }

    /// Returns `true` for the two leader kinds.
    #[must_use]
    pub const fn is_leader(self) -> bool {
        matches!(self, Self::LabelLeader | Self::ReviewLeader)
    }

    /// Returns `true` for labelers and reviewers.
    #[must_use]
    pub const fn is_worker(self) -> bool {
        !self.is_leader()
    }

    /// Returns `true` for kinds that only exist when review is enabled.
    #[must_use]
    pub const fn is_review_kind(self) -> bool {
        matches!(self, Self::ReviewLeader | Self::Reviewer)
    }

    /// Permission level of the project-wide kind.
    #[must_use]
    pub const fn level(self) -> u8 {
        self.role_kind().level()
    }
}

impl From<TaskRoleKind> for RoleKind {
    fn from(kind: TaskRoleKind) -> Self {
        kind.role_kind()
    }
}

impl fmt::Display for TaskRoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role_kind().as_str())
    }
}

/// Checks the size of a user batch for a task-bonded role.
///
/// # Errors
///
/// Returns a validation error when a leader batch is not exactly one user,
/// when a review role is requested with review disabled, or when a worker
/// batch does not match `label_times` / `review_times`.
pub fn validate_role_batch(
    config: &WorkflowConfig,
    kind: TaskRoleKind,
    count: usize,
) -> Result<(), LabelingDomainError> {
    if kind.is_leader() && count != 1 {
        return Err(LabelingDomainError::LeaderCountMismatch {
            kind: kind.role_kind(),
            actual: count,
        });
    }
    if kind.is_review_kind() && !config.review_enabled() {
        return Err(LabelingDomainError::ReviewDisabled(kind.role_kind()));
    }
    let expected = match kind {
        TaskRoleKind::Labeler => Some(config.label_times()),
        TaskRoleKind::Reviewer => Some(config.review_times()),
        TaskRoleKind::LabelLeader | TaskRoleKind::ReviewLeader => None,
    };
    match expected {
        Some(required) if u32::try_from(count).ok() != Some(required) => {
            Err(LabelingDomainError::WorkerCountMismatch {
                kind: kind.role_kind(),
                expected: required,
                actual: count,
            })
        }
        _ => Ok(()),
    }
}

/// Counters describing the work remaining in a role slot.
///
/// They belong to the slot, not the person, and move to the replacement
/// when a role is transferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Images still waiting for a label.
    pub label_num_waiting: u64,
    /// Images waiting for review.
    pub review_num_waiting: u64,
    /// Images rejected in review.
    pub review_num_rejected: u64,
    /// Images accepted in review.
    pub review_num_accepted: u64,
    /// No image is waiting for a label or rejected.
    pub label_completed: bool,
    /// Review is disabled, or every image of the task is accepted.
    pub review_completed: bool,
}

impl TaskProgress {
    /// Progress of a role that has not touched any of `num_total` images.
    #[must_use]
    pub const fn starting(num_total: u64) -> Self {
        Self {
            label_num_waiting: num_total,
            review_num_waiting: 0,
            review_num_rejected: 0,
            review_num_accepted: 0,
            label_completed: false,
            review_completed: false,
        }
    }

    /// Derives progress from per-status image counts.
    #[must_use]
    pub const fn from_counts(counts: StatusCounts, num_total: u64, review_enabled: bool) -> Self {
        Self {
            label_num_waiting: counts.labeling,
            review_num_waiting: counts.reviewing,
            review_num_rejected: counts.rejected,
            review_num_accepted: counts.accepted,
            label_completed: counts.labeling == 0 && counts.rejected == 0,
            review_completed: !review_enabled || counts.accepted == num_total,
        }
    }

    /// Returns `true` when both completion flags are set.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.label_completed && self.review_completed
    }
}

/// Contribution history of the person holding a role.
///
/// A replacement starts from zero; the replaced role keeps its history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Label submissions made through this role.
    pub labels_submitted: u64,
    /// Review submissions made through this role.
    pub reviews_submitted: u64,
    /// Reviews that accepted a label.
    pub reviews_accepted: u64,
    /// Reviews that rejected a label.
    pub reviews_rejected: u64,
}

/// A task-bonded role held by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRole {
    id: TaskRoleId,
    project_id: ProjectId,
    task_id: TaskId,
    user_id: UserId,
    user_name: String,
    kind: TaskRoleKind,
    is_active: bool,
    progress: TaskProgress,
    contribution: Contribution,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRole {
    /// Creates an active role on `task` with every image waiting for a label.
    #[must_use]
    pub fn new(task: &LabelTask, user: &User, kind: TaskRoleKind, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskRoleId::new(),
            project_id: task.project_id(),
            task_id: task.id(),
            user_id: user.id(),
            user_name: user.name().to_owned(),
            kind,
            is_active: true,
            progress: TaskProgress::starting(task.num_total()),
            contribution: Contribution::default(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the role identifier.
    #[must_use]
    pub const fn id(&self) -> TaskRoleId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the user holding the role.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name of the user holding the role.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Returns the role kind.
    #[must_use]
    pub const fn kind(&self) -> TaskRoleKind {
        self.kind
    }

    /// Returns whether the role is currently held.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the task-progress counters.
    #[must_use]
    pub const fn progress(&self) -> TaskProgress {
        self.progress
    }

    /// Returns the user-bonded contribution counters.
    #[must_use]
    pub const fn contribution(&self) -> Contribution {
        self.contribution
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

    /// Key of this role in an image's role-status map.
    #[must_use]
    pub const fn role_key(&self) -> RoleKey {
        RoleKey::new(self.kind, self.user_id)
    }

    /// Takes over the task-progress counters of the role being replaced.
    pub fn inherit_progress(&mut self, previous: &Self, clock: &impl Clock) {
        self.progress = previous.progress;
        self.touch(clock);
    }

    /// Soft-deletes the role, keeping its history.
    pub fn deactivate(&mut self, clock: &impl Clock) {
        self.is_active = false;
        self.touch(clock);
    }

    /// Stores freshly aggregated progress.
    pub fn record_progress(&mut self, progress: TaskProgress, clock: &impl Clock) {
        self.progress = progress;
        self.touch(clock);
    }

    /// Counts one label submission.
    pub fn record_label(&mut self, clock: &impl Clock) {
        self.contribution.labels_submitted += 1;
        self.touch(clock);
    }

    /// Counts one review submission.
    pub fn record_review(&mut self, action: ReviewAction, clock: &impl Clock) {
        self.contribution.reviews_submitted += 1;
        match action {
            ReviewAction::Accept => self.contribution.reviews_accepted += 1,
            ReviewAction::Reject => self.contribution.reviews_rejected += 1,
        }
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

/// A project-scoped role grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRole {
    /// The project the grant belongs to.
    pub project_id: ProjectId,
    /// The user holding the grant.
    pub user_id: UserId,
    /// The granted role.
    pub kind: RoleKind,
    /// When the grant was made.
    pub granted_at: DateTime<Utc>,
}

impl ProjectRole {
    /// Creates a grant stamped with the current clock time.
    #[must_use]
    pub fn new(project_id: ProjectId, user_id: UserId, kind: RoleKind, clock: &impl Clock) -> Self {
        Self {
            project_id,
            user_id,
            kind,
            granted_at: clock.utc(),
        }
    }
}
