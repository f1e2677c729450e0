//! Then steps for review verdict BDD scenarios.

use super::world::{ReviewWorld, run_async};
use labelflow::labeling::{
    domain::{ImageStatus, TaskImageView, TaskStatus, User},
    services::ImageListRequest,
};
use rstest_bdd_macros::then;

fn image_seen_by(world: &ReviewWorld, user: &User) -> Result<TaskImageView, eyre::Report> {
    let (task_id, image_id, _) = world.labeling_target()?;
    let page = run_async(
        world
            .engine
            .annotations()
            .list_images_for_role(ImageListRequest::new(task_id, user.id(), 10)),
    )?;
    page.images
        .into_iter()
        .find(|image| image.id == image_id)
        .ok_or_else(|| eyre::eyre!("image {image_id} not visible to {}", user.name()))
}

fn expect_status(view: &TaskImageView, status: &str) -> Result<(), eyre::Report> {
    let expected = ImageStatus::try_from(status)
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    if view.status != Some(expected) {
        return Err(eyre::eyre!(
            "expected image status {expected}, found {:?}",
            view.status
        ));
    }
    Ok(())
}

#[then(r#"the labeler sees the image as "{status}""#)]
fn labeler_sees_status(world: &ReviewWorld, status: String) -> Result<(), eyre::Report> {
    let (_, _, labeler) = world.labeling_target()?;
    expect_status(&image_seen_by(world, labeler)?, &status)
}

#[then(r#"the reviewer sees the image as "{status}""#)]
fn reviewer_sees_status(world: &ReviewWorld, status: String) -> Result<(), eyre::Report> {
    let (reviewer, _) = world.review_target()?;
    expect_status(&image_seen_by(world, reviewer)?, &status)
}

#[then("the reviewer sees no reviews on the image")]
fn reviewer_sees_no_reviews(world: &ReviewWorld) -> Result<(), eyre::Report> {
    let (reviewer, _) = world.review_target()?;
    let view = image_seen_by(world, reviewer)?;
    if !view.reviews.is_empty() {
        return Err(eyre::eyre!("expected no reviews, found {}", view.reviews.len()));
    }
    Ok(())
}

#[then("the labeler may label the image again")]
fn labeler_may_relabel(world: &ReviewWorld) -> Result<(), eyre::Report> {
    let (task_id, image_id, labeler) = world.labeling_target()?;
    let allowed = run_async(
        world
            .engine
            .annotations()
            .can_set_label(task_id, image_id, labeler.id()),
    )?;
    if !allowed {
        return Err(eyre::eyre!("labeler should be allowed to relabel"));
    }
    Ok(())
}

#[then("the reviewer may not review the label again")]
fn reviewer_may_not_review_again(world: &ReviewWorld) -> Result<(), eyre::Report> {
    let (task_id, image_id, _) = world.labeling_target()?;
    let (reviewer, label_id) = world.review_target()?;
    let allowed = run_async(world.engine.annotations().can_set_review(
        task_id,
        image_id,
        reviewer.id(),
        label_id,
    ))?;
    if allowed {
        return Err(eyre::eyre!("a second review of the same label must be refused"));
    }
    Ok(())
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &ReviewWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let (task_id, _, _) = world.labeling_target()?;
    let task = run_async(world.engine.tasks().find(task_id))?;
    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected task status {expected}, found {}",
            task.status()
        ));
    }
    Ok(())
}
