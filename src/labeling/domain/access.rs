//! Capability evaluation over a user's project and task roles.

use super::{ProjectId, RoleKind, TaskId, TaskRoleKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Actions guarded by a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create a project.
    CreateProject,
    /// Edit project description and managers.
    EditProject,
    /// Split a project into tasks.
    InitProject,
    /// Read project details.
    ViewProject,
    /// Read progress across tasks.
    ViewProjectProgress,
    /// Assign a label or review leader.
    AssignLeader,
    /// List every task of a project, not only one's own.
    ViewAllTasks,
    /// Accept or reject a project.
    QaProject,
    /// Assign the labelers of a task.
    InitLabelWorkers,
    /// Assign the reviewers of a task.
    InitReviewWorkers,
    /// Replace a labeler.
    ReplaceLabelWorker,
    /// Replace a reviewer.
    ReplaceReviewWorker,
    /// Restart a rejected task.
    RestartTask,
    /// Accept, reject or force-accept a task.
    QaTask,
    /// List every role of a task.
    ViewAllRoles,
    /// Submit labels.
    LabelImage,
    /// Submit reviews.
    ReviewImage,
}

impl Capability {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateProject => "create_project",
            Self::EditProject => "edit_project",
            Self::InitProject => "init_project",
            Self::ViewProject => "view_project",
            Self::ViewProjectProgress => "view_project_progress",
            Self::AssignLeader => "assign_leader",
            Self::ViewAllTasks => "view_all_tasks",
            Self::QaProject => "qa_project",
            Self::InitLabelWorkers => "init_label_workers",
            Self::InitReviewWorkers => "init_review_workers",
            Self::ReplaceLabelWorker => "replace_label_worker",
            Self::ReplaceReviewWorker => "replace_review_worker",
            Self::RestartTask => "restart_task",
            Self::QaTask => "qa_task",
            Self::ViewAllRoles => "view_all_roles",
            Self::LabelImage => "label_image",
            Self::ReviewImage => "review_image",
        }
    }

    /// Capability needed to initialize workers of `kind`.
    #[must_use]
    pub const fn init_workers(kind: TaskRoleKind) -> Self {
        if kind.is_review_kind() {
            Self::InitReviewWorkers
        } else {
            Self::InitLabelWorkers
        }
    }

    /// Capability needed to replace a worker of `kind`.
    #[must_use]
    pub const fn replace_worker(kind: TaskRoleKind) -> Self {
        if kind.is_review_kind() {
            Self::ReplaceReviewWorker
        } else {
            Self::ReplaceLabelWorker
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope a capability is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Not bound to a project, e.g. project creation.
    Global,
    /// A project and everything under it.
    Project(ProjectId),
    /// A single task; project roles of its project also apply.
    Task(TaskId),
}

/// Role facts about one user, gathered for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSubject {
    /// Whether the user is staff.
    pub is_staff: bool,
    /// Project-scoped grants held in the resource's project.
    pub project_roles: BTreeSet<RoleKind>,
    /// Active task roles held on the resource's task.
    pub task_roles: BTreeSet<TaskRoleKind>,
}

impl AccessSubject {
    fn has_project_role(&self, predicate: impl Fn(RoleKind) -> bool) -> bool {
        self.project_roles.iter().copied().any(predicate)
    }

    fn has_task_role(&self, kind: TaskRoleKind) -> bool {
        self.task_roles.contains(&kind)
    }
}

/// Returns whether `subject` holds `capability`.
#[must_use]
pub fn permits(subject: &AccessSubject, capability: Capability) -> bool {
    match capability {
        Capability::CreateProject => subject.is_staff,
        Capability::EditProject | Capability::QaProject => {
            subject.has_project_role(|kind| kind == RoleKind::Owner)
        }
        Capability::InitProject | Capability::AssignLeader | Capability::QaTask => {
            subject.has_project_role(|kind| kind == RoleKind::Manager)
        }
        Capability::ViewProject => !subject.project_roles.is_empty(),
        Capability::ViewProjectProgress | Capability::ViewAllRoles => {
            subject.has_project_role(RoleKind::is_gte_leader)
        }
        Capability::ViewAllTasks => subject.has_project_role(RoleKind::is_gt_leader),
        Capability::InitLabelWorkers | Capability::ReplaceLabelWorker | Capability::RestartTask => {
            subject.has_task_role(TaskRoleKind::LabelLeader)
        }
        Capability::InitReviewWorkers | Capability::ReplaceReviewWorker => {
            subject.has_task_role(TaskRoleKind::ReviewLeader)
        }
        Capability::LabelImage => subject.has_task_role(TaskRoleKind::Labeler),
        Capability::ReviewImage => subject.has_task_role(TaskRoleKind::Reviewer),
    }
}
