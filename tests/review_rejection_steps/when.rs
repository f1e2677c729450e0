//! When steps for review verdict BDD scenarios.

use super::world::{ReviewWorld, run_async};
use labelflow::labeling::domain::{Annotation, BoundingBox, ReviewAction};
use rstest_bdd_macros::when;

/// Submits a label from the scenario's labeler and remembers its id.
pub(super) fn label_image(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    let (task_id, image_id, labeler) = world.labeling_target()?;
    let annotation =
        Annotation::new("pedestrian").with_bounding_box(BoundingBox::new(4.0, 8.0, 40.0, 96.0));
    let label_id = run_async(world.engine.annotations().set_label(
        task_id,
        image_id,
        labeler.id(),
        vec![annotation],
    ))?;
    world.label_id = Some(label_id);
    Ok(())
}

/// Submits the scenario reviewer's verdict on the current label.
pub(super) fn submit_review(
    world: &mut ReviewWorld,
    action: ReviewAction,
) -> Result<(), eyre::Report> {
    let (task_id, image_id, _) = world.labeling_target()?;
    let (reviewer, label_id) = world.review_target()?;
    run_async(world.engine.annotations().set_review(
        task_id,
        image_id,
        reviewer.id(),
        label_id,
        action,
    ))?;
    Ok(())
}

#[when("the reviewer rejects the label")]
fn reviewer_rejects(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    submit_review(world, ReviewAction::Reject)
}

#[when("the reviewer accepts the label")]
fn reviewer_accepts(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    submit_review(world, ReviewAction::Accept)
}

#[when("the labeler labels the image again")]
fn labeler_labels_again(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    label_image(world)
}
