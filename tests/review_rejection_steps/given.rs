//! Given steps for review verdict BDD scenarios.

use super::when::{label_image, submit_review};
use super::world::{ReviewWorld, run_async};
use eyre::WrapErr;
use labelflow::labeling::{
    domain::{DatasetId, DatasetImage, DatasetRef, ReviewAction, RoleKind, User},
    services::{CreateProjectRequest, ImageListRequest, InitProjectRequest},
};
use rstest_bdd_macros::given;

#[given("a project with 1 image, 1 labeler and 1 reviewer")]
fn staffed_project(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    let owner = User::new("owner").as_staff();
    let manager = User::new("manager");
    let label_leader = User::new("label-leader");
    let review_leader = User::new("review-leader");
    let labeler = User::new("labeler");
    let reviewer = User::new("reviewer");
    for user in [
        &owner,
        &manager,
        &label_leader,
        &review_leader,
        &labeler,
        &reviewer,
    ] {
        world.users.insert(user.clone())?;
    }
    let dataset = DatasetId::new();
    world.datasets.insert(
        DatasetRef::new(dataset, "crossing"),
        vec![DatasetImage::new("crossing/0", 0, "https://images.example/crossing/0.jpg")],
    )?;

    let engine = &world.engine;
    let project = run_async(engine.projects().create(CreateProjectRequest::new(
        "crossings",
        owner.id(),
        [manager.id()],
        [dataset],
        ["pedestrian"],
    )))
    .wrap_err("create project for review scenario")?;
    run_async(
        engine
            .projects()
            .init(project.id(), InitProjectRequest::new(0, 1, 1)),
    )
    .wrap_err("initialize project for review scenario")?;
    let task_id = run_async(engine.tasks().list_for_project(project.id()))?
        .first()
        .map(|task| task.id())
        .ok_or_else(|| eyre::eyre!("project produced no task"))?;

    let tasks = engine.tasks();
    run_async(tasks.set_leader(task_id, label_leader.id(), RoleKind::LabelLeader))?;
    run_async(tasks.set_leader(task_id, review_leader.id(), RoleKind::ReviewLeader))?;
    run_async(tasks.init_workers(task_id, &[labeler.id()], RoleKind::Labeler))?;
    run_async(tasks.init_workers(task_id, &[reviewer.id()], RoleKind::Reviewer))?;
    let page = run_async(
        engine
            .annotations()
            .list_images_for_role(ImageListRequest::new(task_id, labeler.id(), 1)),
    )?;
    let image_id = page
        .images
        .first()
        .map(|image| image.id)
        .ok_or_else(|| eyre::eyre!("task has no image"))?;

    world.task_id = Some(task_id);
    world.image_id = Some(image_id);
    world.labeler = Some(labeler);
    world.reviewer = Some(reviewer);
    Ok(())
}

#[given("the labeler has labeled the image")]
fn labeler_has_labeled(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    label_image(world).wrap_err("label image in scenario setup")
}

#[given("the reviewer has rejected the label")]
fn reviewer_has_rejected(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    submit_review(world, ReviewAction::Reject).wrap_err("reject label in scenario setup")
}
