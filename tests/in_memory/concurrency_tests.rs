//! Competing requests against the same task.

use super::helpers::{Workspace, ids, workspace};
use eyre::{OptionExt, ensure};
use labelflow::labeling::{
    domain::{Annotation, LabelingDomainError, RoleKind},
    services::InitProjectRequest,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_one_worker_batch_wins(workspace: Workspace) -> eyre::Result<()> {
    let dataset = workspace.dataset("bridge", 3)?;
    let projects = workspace.engine.projects();
    let created = projects
        .create(workspace.request("bridges", vec![dataset]))
        .await?;
    let project = projects
        .init(created.id(), InitProjectRequest::new(0, 1, 0))
        .await?;
    let task_id = workspace
        .engine
        .tasks()
        .list_for_project(project.id())
        .await?
        .first()
        .map(|task| task.id())
        .ok_or_eyre("task expected")?;
    let candidates = workspace.register("candidate", 2)?;

    let handles: Vec<_> = candidates
        .iter()
        .map(|user| {
            let tasks = workspace.engine.tasks();
            let batch = ids(std::slice::from_ref(user));
            tokio::spawn(async move { tasks.init_workers(task_id, &batch, RoleKind::Labeler).await })
        })
        .collect();
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await?);
    }

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    ensure!(winners == 1);
    let refused = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .filter_map(|err| err.as_domain())
        .all(|err| {
            matches!(
                err,
                LabelingDomainError::RolesAlreadyAssigned { active: 1, .. }
            )
        });
    ensure!(refused);
    let roles = workspace.engine.tasks().list_roles(task_id).await?;
    ensure!(roles.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_labels_are_all_recorded(workspace: Workspace) -> eyre::Result<()> {
    let dataset = workspace.dataset("market", 8)?;
    let projects = workspace.engine.projects();
    let created = projects
        .create(workspace.request("markets", vec![dataset]))
        .await?;
    let project = projects
        .init(created.id(), InitProjectRequest::new(0, 1, 0))
        .await?;
    let task_id = workspace
        .engine
        .tasks()
        .list_for_project(project.id())
        .await?
        .first()
        .map(|task| task.id())
        .ok_or_eyre("task expected")?;
    let team = workspace.register("crew", 2)?;
    let [leader, labeler] = team.as_slice() else {
        eyre::bail!("two users expected");
    };
    let tasks = workspace.engine.tasks();
    tasks
        .set_leader(task_id, leader.id(), RoleKind::LabelLeader)
        .await?;
    tasks
        .init_workers(task_id, &[labeler.id()], RoleKind::Labeler)
        .await?;
    let images = workspace.image_ids(task_id, labeler.id()).await?;

    let handles: Vec<_> = images
        .iter()
        .map(|image| {
            let annotations = workspace.engine.annotations();
            let (image, user) = (*image, labeler.id());
            tokio::spawn(async move {
                annotations
                    .set_label(task_id, image, user, vec![Annotation::new("stall")])
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    let role = workspace
        .engine
        .tasks()
        .list_roles(task_id)
        .await?
        .into_iter()
        .find(|role| role.user_id() == labeler.id())
        .ok_or_eyre("labeler role expected")?;
    ensure!(role.contribution().labels_submitted == 8);
    ensure!(role.progress().label_completed);
    Ok(())
}
