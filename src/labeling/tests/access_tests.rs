//! Unit tests for capability evaluation.

use super::support::Harness;
use crate::labeling::domain::{
    AccessSubject, Capability, LabelingDomainError, Resource, RoleKind, TaskRoleKind, permits,
};
use eyre::ensure;
use rstest::rstest;
use std::collections::BTreeSet;

fn project_subject(roles: &[RoleKind]) -> AccessSubject {
    AccessSubject {
        project_roles: roles.iter().copied().collect(),
        ..AccessSubject::default()
    }
}

fn task_subject(roles: &[TaskRoleKind]) -> AccessSubject {
    AccessSubject {
        project_roles: roles.iter().map(|kind| kind.role_kind()).collect(),
        task_roles: roles.iter().copied().collect::<BTreeSet<_>>(),
        ..AccessSubject::default()
    }
}

#[rstest]
#[case(false, false)]
#[case(true, true)]
fn only_staff_create_projects(#[case] is_staff: bool, #[case] expected: bool) {
    let subject = AccessSubject {
        is_staff,
        ..AccessSubject::default()
    };

    assert_eq!(permits(&subject, Capability::CreateProject), expected);
}

#[rstest]
#[case(RoleKind::Owner, Capability::EditProject, true)]
#[case(RoleKind::Manager, Capability::EditProject, false)]
#[case(RoleKind::Owner, Capability::QaProject, true)]
#[case(RoleKind::Manager, Capability::InitProject, true)]
#[case(RoleKind::Owner, Capability::InitProject, false)]
#[case(RoleKind::Manager, Capability::AssignLeader, true)]
#[case(RoleKind::Manager, Capability::QaTask, true)]
#[case(RoleKind::LabelLeader, Capability::QaTask, false)]
#[case(RoleKind::ReviewLeader, Capability::ViewProjectProgress, true)]
#[case(RoleKind::Labeler, Capability::ViewProjectProgress, false)]
#[case(RoleKind::Manager, Capability::ViewAllTasks, true)]
#[case(RoleKind::LabelLeader, Capability::ViewAllTasks, false)]
#[case(RoleKind::Reviewer, Capability::ViewProject, true)]
fn project_capabilities_follow_project_roles(
    #[case] role: RoleKind,
    #[case] capability: Capability,
    #[case] expected: bool,
) {
    assert_eq!(permits(&project_subject(&[role]), capability), expected);
}

#[rstest]
fn users_without_grants_cannot_view_a_project() {
    assert!(!permits(&AccessSubject::default(), Capability::ViewProject));
}

#[rstest]
#[case(TaskRoleKind::LabelLeader, Capability::InitLabelWorkers, true)]
#[case(TaskRoleKind::LabelLeader, Capability::RestartTask, true)]
#[case(TaskRoleKind::LabelLeader, Capability::InitReviewWorkers, false)]
#[case(TaskRoleKind::ReviewLeader, Capability::ReplaceReviewWorker, true)]
#[case(TaskRoleKind::ReviewLeader, Capability::ReplaceLabelWorker, false)]
#[case(TaskRoleKind::Labeler, Capability::LabelImage, true)]
#[case(TaskRoleKind::Labeler, Capability::ReviewImage, false)]
#[case(TaskRoleKind::Reviewer, Capability::ReviewImage, true)]
fn task_capabilities_follow_task_roles(
    #[case] role: TaskRoleKind,
    #[case] capability: Capability,
    #[case] expected: bool,
) {
    assert_eq!(permits(&task_subject(&[role]), capability), expected);
}

#[rstest]
#[case(TaskRoleKind::Labeler, Capability::InitLabelWorkers, Capability::ReplaceLabelWorker)]
#[case(TaskRoleKind::Reviewer, Capability::InitReviewWorkers, Capability::ReplaceReviewWorker)]
fn worker_capabilities_depend_on_the_worker_kind(
    #[case] kind: TaskRoleKind,
    #[case] init: Capability,
    #[case] replace: Capability,
) {
    assert_eq!(Capability::init_workers(kind), init);
    assert_eq!(Capability::replace_worker(kind), replace);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn access_service_reads_grants_from_the_repositories() -> eyre::Result<()> {
    let harness = Harness::new()?;
    let staffed = harness.staffed_task(2, 1, 1).await?;
    let access = harness.engine.access();
    let task = Resource::Task(staffed.task.id());
    let project = Resource::Project(staffed.project.id());

    ensure!(
        access
            .permits(staffed.label_leader.id(), task, Capability::InitLabelWorkers)
            .await?
    );
    ensure!(
        access
            .permits(harness.manager.id(), project, Capability::AssignLeader)
            .await?
    );
    ensure!(
        access
            .permits(harness.owner.id(), Resource::Global, Capability::CreateProject)
            .await?
    );
    ensure!(
        !access
            .permits(harness.manager.id(), Resource::Global, Capability::CreateProject)
            .await?
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn authorize_reports_the_missing_capability() -> eyre::Result<()> {
    let harness = Harness::new()?;
    let staffed = harness.staffed_task(2, 1, 1).await?;
    let labeler = staffed
        .labelers
        .first()
        .ok_or_else(|| eyre::eyre!("task has a labeler"))?;

    let result = harness
        .engine
        .access()
        .authorize(
            labeler.id(),
            Resource::Task(staffed.task.id()),
            Capability::ReviewImage,
        )
        .await;

    let err = result.err().ok_or_else(|| eyre::eyre!("labelers cannot review"))?;
    ensure!(
        err.as_domain()
            == Some(&LabelingDomainError::Forbidden {
                user: labeler.id(),
                capability: Capability::ReviewImage,
            })
    );
    Ok(())
}
