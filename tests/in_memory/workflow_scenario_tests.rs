//! End-to-end project runs over the in-memory adapters.

use super::helpers::{Workspace, ids, workspace};
use eyre::{OptionExt, ensure};
use labelflow::labeling::{
    domain::{
        Annotation, ImageStatus, LabelTask, ProjectQaAction, ProjectStatus, RoleKind,
        TaskQaAction, TaskStatus, User,
    },
    services::{ImageListRequest, InitProjectRequest},
};
use rstest::rstest;

struct Crew {
    labelers: Vec<User>,
    reviewers: Vec<User>,
}

async fn staff(
    workspace: &Workspace,
    task: &LabelTask,
    crew: &Crew,
    review: bool,
) -> eyre::Result<()> {
    let tasks = workspace.engine.tasks();
    let leaders = workspace.register(&format!("leader-{}", task.idx()), 2)?;
    let [label_leader, review_leader] = leaders.as_slice() else {
        eyre::bail!("two leaders expected");
    };
    tasks
        .set_leader(task.id(), label_leader.id(), RoleKind::LabelLeader)
        .await?;
    if review {
        tasks
            .set_leader(task.id(), review_leader.id(), RoleKind::ReviewLeader)
            .await?;
    }
    tasks
        .init_workers(task.id(), &ids(&crew.labelers), RoleKind::Labeler)
        .await?;
    if review {
        tasks
            .init_workers(task.id(), &ids(&crew.reviewers), RoleKind::Reviewer)
            .await?;
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn project_runs_from_creation_to_owner_acceptance(
    workspace: Workspace,
) -> eyre::Result<()> {
    let first = workspace.dataset("north", 6)?;
    let second = workspace.dataset("south", 6)?;
    let projects = workspace.engine.projects();
    let created = projects
        .create(workspace.request("city traffic", vec![first, second]))
        .await?;
    ensure!(created.status() == ProjectStatus::Waiting);

    let project = projects
        .init(created.id(), InitProjectRequest::new(3, 2, 2))
        .await?;
    ensure!(project.status() == ProjectStatus::Working);
    ensure!(project.counters().total == 4);
    ensure!(project.counters().waiting == 4);

    let crew = Crew {
        labelers: workspace.register("labeler", 2)?,
        reviewers: workspace.register("reviewer", 2)?,
    };
    let tasks = workspace.engine.tasks().list_for_project(project.id()).await?;
    ensure!(tasks.len() == 4);
    ensure!(tasks.iter().all(|task| task.num_total() == 3));

    for (done, task) in tasks.iter().enumerate() {
        staff(&workspace, task, &crew, true).await?;
        workspace
            .complete(task, &crew.labelers, &crew.reviewers)
            .await?;
        let refreshed = workspace.engine.tasks().find(task.id()).await?;
        ensure!(refreshed.status() == TaskStatus::Reviewing);
        let counters = projects.find(project.id()).await?.counters();
        ensure!(counters.reviewing == u64::try_from(done + 1)?);
    }

    for task in &tasks {
        workspace
            .engine
            .tasks()
            .qa(task.id(), TaskQaAction::Accept)
            .await?;
    }
    let reviewing = projects.find(project.id()).await?;
    ensure!(reviewing.status() == ProjectStatus::Reviewing);
    ensure!(reviewing.counters().accepted == 4);

    let accepted = projects
        .qa(project.id(), ProjectQaAction::Accept)
        .await?;
    ensure!(accepted.status() == ProjectStatus::Accepted);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn label_only_projects_skip_review(workspace: Workspace) -> eyre::Result<()> {
    let dataset = workspace.dataset("harbour", 5)?;
    let projects = workspace.engine.projects();
    let created = projects
        .create(workspace.request("boats", vec![dataset]))
        .await?;
    let project = projects
        .init(created.id(), InitProjectRequest::new(0, 1, 0))
        .await?;
    let task = workspace
        .engine
        .tasks()
        .list_for_project(project.id())
        .await?
        .into_iter()
        .next()
        .ok_or_eyre("one task per dataset expected")?;
    let crew = Crew {
        labelers: workspace.register("labeler", 1)?,
        reviewers: Vec::new(),
    };

    staff(&workspace, &task, &crew, false).await?;
    let started = workspace.engine.tasks().find(task.id()).await?;
    ensure!(started.status() == TaskStatus::Working);
    workspace.complete(&task, &crew.labelers, &[]).await?;

    let finished = workspace.engine.tasks().find(task.id()).await?;
    ensure!(finished.status() == TaskStatus::Reviewing);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replacing_a_labeler_keeps_their_work(workspace: Workspace) -> eyre::Result<()> {
    let dataset = workspace.dataset("alley", 4)?;
    let projects = workspace.engine.projects();
    let created = projects
        .create(workspace.request("alleys", vec![dataset]))
        .await?;
    let project = projects
        .init(created.id(), InitProjectRequest::new(0, 1, 1))
        .await?;
    let task = workspace
        .engine
        .tasks()
        .list_for_project(project.id())
        .await?
        .into_iter()
        .next()
        .ok_or_eyre("task expected")?;
    let crew = Crew {
        labelers: workspace.register("labeler", 1)?,
        reviewers: workspace.register("reviewer", 1)?,
    };
    staff(&workspace, &task, &crew, true).await?;
    let leaving = crew.labelers.first().ok_or_eyre("labeler expected")?;
    let images = workspace.image_ids(task.id(), leaving.id()).await?;
    for image in images.iter().take(2) {
        workspace
            .engine
            .annotations()
            .set_label(task.id(), *image, leaving.id(), vec![Annotation::new("truck")])
            .await?;
    }
    let successor = workspace
        .register("successor", 1)?
        .into_iter()
        .next()
        .ok_or_eyre("successor expected")?;

    let role = workspace
        .engine
        .tasks()
        .replace_worker(task.id(), leaving.id(), successor.id(), RoleKind::Labeler)
        .await?;

    ensure!(role.user_id() == successor.id());
    ensure!(role.progress().review_num_waiting == 2);
    ensure!(role.progress().label_num_waiting == 2);
    let page = workspace
        .engine
        .annotations()
        .list_images_for_role(
            ImageListRequest::new(task.id(), successor.id(), 10)
                .with_status(ImageStatus::Reviewing),
        )
        .await?;
    ensure!(page.total == 2);
    ensure!(page.images.iter().all(|image| {
        image
            .labels
            .iter()
            .all(|label| label.user_id == successor.id() && label.user_name == successor.name())
    }));
    let former = workspace.image_ids(task.id(), leaving.id()).await;
    ensure!(former.is_err(), "the replaced labeler no longer sees the task");
    Ok(())
}
