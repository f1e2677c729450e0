//! Project aggregate: configuration, categories and task counters.

use super::{
    DatasetRef, LabelingDomainError, ParseEnumError, ProjectId, TaskStatus, UserId, UserRef,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Created, not yet split into tasks.
    Waiting,
    /// Tasks are being created.
    Initializing,
    /// Tasks are being labeled and reviewed.
    Working,
    /// Every task is accepted; waiting for owner QA.
    Reviewing,
    /// The owner rejected the result.
    Rejected,
    /// The owner accepted the result.
    Accepted,
}

impl ProjectStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Waiting,
        Self::Initializing,
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
            Self::Initializing => "initializing",
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
            (Self::Waiting, Self::Initializing)
                | (Self::Initializing, Self::Working)
                | (Self::Working, Self::Reviewing)
                | (Self::Reviewing, Self::Accepted | Self::Rejected)
        )
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("project status", value))
    }
}

/// Owner verdict on a project in review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectQaAction {
    /// Accept the labeled result.
    Accept,
    /// Reject the labeled result.
    Reject,
}

impl ProjectQaAction {
    /// Returns the status the action leads to.
    #[must_use]
    pub const fn target_status(self) -> ProjectStatus {
        match self {
            Self::Accept => ProjectStatus::Accepted,
            Self::Reject => ProjectStatus::Rejected,
        }
    }
}

/// Normalized set of category names: trimmed, lower-cased, unique, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(BTreeSet<String>);

impl Categories {
    /// Normalizes raw category names, dropping blanks.
    #[must_use]
    pub fn normalize<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            raw.into_iter()
                .map(|name| name.as_ref().trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    /// Adds every category of `other`; returns `true` when any was new.
    pub fn merge(&mut self, other: Self) -> bool {
        let before = self.0.len();
        self.0.extend(other.0);
        self.0.len() != before
    }

    /// Returns `true` when there are no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when `name`, normalized, is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.trim().to_lowercase())
    }

    /// Iterates the categories in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Categories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(","))
    }
}

/// Batch size and label/review multiplicity fixed at project initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    batch_size: usize,
    label_times: u32,
    review_times: u32,
}

impl WorkflowConfig {
    /// Validates and creates a configuration.
    ///
    /// `batch_size == 0` means one task per dataset; `review_times == 0`
    /// disables review.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::InvalidLabelTimes`] when `label_times`
    /// is zero.
    pub const fn new(
        batch_size: usize,
        label_times: u32,
        review_times: u32,
    ) -> Result<Self, LabelingDomainError> {
        if label_times == 0 {
            return Err(LabelingDomainError::InvalidLabelTimes(label_times));
        }
        Ok(Self {
            batch_size,
            label_times,
            review_times,
        })
    }

    /// Images per task; zero means one task per dataset.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Labelers required per image.
    #[must_use]
    pub const fn label_times(&self) -> u32 {
        self.label_times
    }

    /// Reviewers required per image.
    #[must_use]
    pub const fn review_times(&self) -> u32 {
        self.review_times
    }

    /// Returns `true` when review is part of the workflow.
    #[must_use]
    pub const fn review_enabled(&self) -> bool {
        self.review_times > 0
    }

    /// Splits `total` images into consecutive task ranges.
    ///
    /// A zero batch size keeps the whole dataset in one task, even when it
    /// is empty. Otherwise the dataset yields `ceil(total / batch_size)`
    /// tasks, none for an empty dataset.
    #[must_use]
    pub fn partition(&self, total: usize) -> Vec<Range<usize>> {
        if self.batch_size == 0 {
            return vec![0..total];
        }
        (0..total)
            .step_by(self.batch_size)
            .map(|start| start..start.saturating_add(self.batch_size).min(total))
            .collect()
    }
}

/// Number of tasks per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounters {
    /// All tasks of the project.
    pub total: u64,
    /// Tasks without an active leader yet.
    pub waiting: u64,
    /// Tasks being labeled or reviewed.
    pub working: u64,
    /// Tasks waiting for manager QA.
    pub reviewing: u64,
    /// Tasks rejected by manager QA.
    pub rejected: u64,
    /// Tasks accepted by manager QA.
    pub accepted: u64,
}

impl TaskCounters {
    /// Counters of `total` freshly created tasks.
    #[must_use]
    pub const fn fresh(total: u64) -> Self {
        Self {
            total,
            waiting: total,
            working: 0,
            reviewing: 0,
            rejected: 0,
            accepted: 0,
        }
    }

    /// Counts one more task in `status`.
    pub const fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Waiting => self.waiting += 1,
            TaskStatus::Working => self.working += 1,
            TaskStatus::Reviewing => self.reviewing += 1,
            TaskStatus::Rejected => self.rejected += 1,
            TaskStatus::Accepted => self.accepted += 1,
        }
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    /// Project name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// The creating user.
    pub owner: UserRef,
    /// Managers; at least one.
    pub managers: Vec<UserRef>,
    /// Covered datasets; at least one.
    pub datasets: Vec<DatasetRef>,
    /// Raw category names; at least one after normalization.
    pub categories: Vec<String>,
    /// Label set imported as default labels at initialization.
    pub pre_label: Option<String>,
}

/// Manager grants and revocations produced by an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerChanges {
    /// Users who became managers.
    pub added: Vec<UserId>,
    /// Users who stopped being managers.
    pub removed: Vec<UserId>,
}

/// A labeling project covering one or more datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: String,
    description: String,
    owner: UserRef,
    managers: Vec<UserRef>,
    datasets: Vec<DatasetRef>,
    categories: Categories,
    pre_label: Option<String>,
    status: ProjectStatus,
    config: Option<WorkflowConfig>,
    counters: TaskCounters,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Project {
    /// Validates `request` and creates a waiting project.
    ///
    /// # Errors
    ///
    /// Returns a validation error when managers, datasets or categories
    /// are empty.
    pub fn new(request: NewProject, clock: &impl Clock) -> Result<Self, LabelingDomainError> {
        if request.managers.is_empty() {
            return Err(LabelingDomainError::EmptyManagers);
        }
        if request.datasets.is_empty() {
            return Err(LabelingDomainError::EmptyDatasets);
        }
        let categories = Categories::normalize(&request.categories);
        if categories.is_empty() {
            return Err(LabelingDomainError::EmptyCategories);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: ProjectId::new(),
            name: request.name,
            description: request.description,
            owner: request.owner,
            managers: request.managers,
            datasets: request.datasets,
            categories,
            pre_label: request.pre_label.filter(|name| !name.trim().is_empty()),
            status: ProjectStatus::Waiting,
            config: None,
            counters: TaskCounters::default(),
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the owner.
    #[must_use]
    pub const fn owner(&self) -> &UserRef {
        &self.owner
    }

    /// Returns the managers.
    #[must_use]
    pub fn managers(&self) -> &[UserRef] {
        &self.managers
    }

    /// Returns the covered datasets.
    #[must_use]
    pub fn datasets(&self) -> &[DatasetRef] {
        &self.datasets
    }

    /// Returns the normalized categories.
    #[must_use]
    pub const fn categories(&self) -> &Categories {
        &self.categories
    }

    /// Returns the label set imported as default labels, if any.
    #[must_use]
    pub fn pre_label(&self) -> Option<&str> {
        self.pre_label.as_deref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ProjectStatus {
        self.status
    }

    /// Returns the workflow configuration once initialized.
    #[must_use]
    pub const fn config(&self) -> Option<WorkflowConfig> {
        self.config
    }

    /// Returns the task counters.
    #[must_use]
    pub const fn counters(&self) -> TaskCounters {
        self.counters
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

    /// Returns the workflow configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::ProjectNotInitialized`] before `init`.
    pub const fn require_config(&self) -> Result<WorkflowConfig, LabelingDomainError> {
        match self.config {
            Some(config) => Ok(config),
            None => Err(LabelingDomainError::ProjectNotInitialized(self.id)),
        }
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: impl Into<String>, clock: &impl Clock) {
        self.description = description.into();
        self.touch(clock);
    }

    /// Replaces the manager list and reports who was added and removed.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::EmptyManagers`] for an empty list.
    pub fn replace_managers(
        &mut self,
        managers: Vec<UserRef>,
        clock: &impl Clock,
    ) -> Result<ManagerChanges, LabelingDomainError> {
        if managers.is_empty() {
            return Err(LabelingDomainError::EmptyManagers);
        }
        let old: BTreeSet<UserId> = self.managers.iter().map(|manager| manager.id).collect();
        let new: BTreeSet<UserId> = managers.iter().map(|manager| manager.id).collect();
        let changes = ManagerChanges {
            added: new.difference(&old).copied().collect(),
            removed: old.difference(&new).copied().collect(),
        };
        self.managers = managers;
        self.touch(clock);
        Ok(changes)
    }

    /// Moves a waiting project to initializing.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::InvalidProjectTransition`] unless the
    /// project is waiting.
    pub fn begin_initialization(&mut self, clock: &impl Clock) -> Result<(), LabelingDomainError> {
        self.transition_to(ProjectStatus::Initializing, clock)
    }

    /// Records the created tasks and moves the project to working.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::InvalidProjectTransition`] unless the
    /// project is initializing.
    pub fn complete_initialization(
        &mut self,
        config: WorkflowConfig,
        task_total: u64,
        discovered: Categories,
        clock: &impl Clock,
    ) -> Result<(), LabelingDomainError> {
        self.transition_to(ProjectStatus::Working, clock)?;
        self.config = Some(config);
        self.counters = TaskCounters::fresh(task_total);
        self.categories.merge(discovered);
        Ok(())
    }

    /// Stores recounted task counters.
    ///
    /// A working project whose tasks are all accepted moves to reviewing.
    /// Returns `true` when that happened.
    pub fn apply_task_counters(&mut self, counters: TaskCounters, clock: &impl Clock) -> bool {
        self.counters = counters;
        let promote = self.status == ProjectStatus::Working
            && counters.total > 0
            && counters.accepted == counters.total;
        if promote {
            self.status = ProjectStatus::Reviewing;
        }
        self.touch(clock);
        promote
    }

    /// Applies the owner's verdict.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::InvalidProjectTransition`] unless the
    /// project is reviewing.
    pub fn apply_qa(
        &mut self,
        action: ProjectQaAction,
        clock: &impl Clock,
    ) -> Result<(), LabelingDomainError> {
        self.transition_to(action.target_status(), clock)
    }

    fn transition_to(
        &mut self,
        target: ProjectStatus,
        clock: &impl Clock,
    ) -> Result<(), LabelingDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(LabelingDomainError::InvalidProjectTransition {
                project: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
