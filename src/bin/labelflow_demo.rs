//! Runs a complete labeling workflow against the in-memory adapters.
//!
//! Usage:
//!
//! ```text
//! labelflow_demo [images-per-dataset]
//! ```
//!
//! Two datasets are registered, split into tasks of three images, labeled
//! twice and reviewed twice per image. The first label of every task is
//! rejected once and relabeled before the crew accepts everything. When the
//! run finishes a JSON summary of the project, its tasks and every role's
//! contribution is written to standard output.
//!
//! Logging follows `LABELFLOW_LOG` (filter directive, default `info`) and
//! `LABELFLOW_LOG_FORMAT` (`pretty` or `json`); both may be set in `.env`.

use std::io::{self, Write as _};
use std::sync::Arc;

use labelflow::config::TelemetrySettings;
use labelflow::labeling::{
    adapters::memory::{self, InMemoryDatasetCatalog, InMemoryUserDirectory},
    domain::{
        Annotation, BoundingBox, DatasetId, DatasetImage, DatasetRef, LabelTask, ProjectQaAction,
        ReviewAction, RoleKind, TaskQaAction, User, UserId,
    },
    services::{CreateProjectRequest, ImageListRequest, InitProjectRequest, WorkflowEngine},
};
use labelflow::telemetry::init_tracing;
use mockable::DefaultClock;
use serde_json::{Value, json};
use tokio::runtime::Builder;
use tracing::{info, warn};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_IMAGES: u64 = 6;
const BATCH_SIZE: usize = 3;
const LABEL_TIMES: u32 = 2;
const REVIEW_TIMES: u32 = 2;

type Engine = WorkflowEngine<DefaultClock>;

struct Crew {
    label_leader: User,
    review_leader: User,
    labelers: Vec<User>,
    reviewers: Vec<User>,
}

fn main() -> Result<(), BoxError> {
    let settings = TelemetrySettings::from_env()?;
    if !init_tracing(&settings)? {
        warn!("tracing subscriber already installed");
    }
    let images = match std::env::args().nth(1) {
        Some(raw) => raw.parse()?,
        None => DEFAULT_IMAGES,
    };

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let summary = runtime.block_on(run(images))?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &summary)?;
    writeln!(stdout)?;
    Ok(())
}

async fn run(images: u64) -> Result<Value, BoxError> {
    let users = InMemoryUserDirectory::new();
    let datasets = InMemoryDatasetCatalog::new();
    let engine = WorkflowEngine::new(
        memory::ports(users.clone(), datasets.clone()),
        Arc::new(DefaultClock),
    );

    let owner = register(&users, User::new("olga").as_staff())?;
    let manager = register(&users, User::new("mads"))?;
    let crew = Crew {
        label_leader: register(&users, User::new("lena"))?,
        review_leader: register(&users, User::new("ruth"))?,
        labelers: vec![
            register(&users, User::new("ada"))?,
            register(&users, User::new("bo"))?,
        ],
        reviewers: vec![
            register(&users, User::new("cy"))?,
            register(&users, User::new("di"))?,
        ],
    };
    let dataset_ids = vec![
        register_dataset(&datasets, "harbour", images)?,
        register_dataset(&datasets, "station", images)?,
    ];

    let projects = engine.projects();
    let created = projects
        .create(
            CreateProjectRequest::new(
                "city traffic",
                owner.id(),
                [manager.id()],
                dataset_ids,
                ["car", "truck", "pedestrian"],
            )
            .with_description("vehicles and people around transport hubs"),
        )
        .await?;
    let project = projects
        .init(
            created.id(),
            InitProjectRequest::new(BATCH_SIZE, LABEL_TIMES, REVIEW_TIMES),
        )
        .await?;

    let tasks = engine.tasks().list_for_project(project.id()).await?;
    let mut task_summaries = Vec::with_capacity(tasks.len());
    for task in &tasks {
        staff(&engine, task, &crew).await?;
        work_through(&engine, task, &crew, manager.id()).await?;
        let accepted = engine.tasks().qa(task.id(), TaskQaAction::Accept).await?;
        let roles = engine.tasks().list_roles(task.id()).await?;
        task_summaries.push(json!({
            "idx": accepted.idx(),
            "images": accepted.num_total(),
            "status": accepted.status(),
            "roles": roles
                .iter()
                .map(|role| json!({
                    "user": role.user_name(),
                    "kind": role.kind().role_kind(),
                    "progress": role.progress(),
                    "contribution": role.contribution(),
                }))
                .collect::<Vec<_>>(),
        }));
    }

    let finished = projects.qa(project.id(), ProjectQaAction::Accept).await?;
    info!(project_id = %finished.id(), status = %finished.status(), "workflow complete");
    Ok(json!({
        "project": finished.name(),
        "status": finished.status(),
        "categories": finished.categories(),
        "counters": finished.counters(),
        "tasks": task_summaries,
    }))
}

fn register(users: &InMemoryUserDirectory, user: User) -> Result<User, BoxError> {
    users.insert(user.clone())?;
    Ok(user)
}

fn register_dataset(
    catalog: &InMemoryDatasetCatalog,
    name: &str,
    images: u64,
) -> Result<DatasetId, BoxError> {
    let id = DatasetId::new();
    let records = (0..images)
        .map(|idx| {
            DatasetImage::new(
                format!("{name}/{idx:05}"),
                idx,
                format!("https://images.example/{name}/{idx:05}.jpg"),
            )
        })
        .collect();
    catalog.insert(DatasetRef::new(id, name), records)?;
    Ok(id)
}

fn user_ids(users: &[User]) -> Vec<UserId> {
    users.iter().map(User::id).collect()
}

async fn staff(engine: &Engine, task: &LabelTask, crew: &Crew) -> Result<(), BoxError> {
    let tasks = engine.tasks();
    tasks
        .set_leader(task.id(), crew.label_leader.id(), RoleKind::LabelLeader)
        .await?;
    tasks
        .set_leader(task.id(), crew.review_leader.id(), RoleKind::ReviewLeader)
        .await?;
    tasks
        .init_workers(task.id(), &user_ids(&crew.labelers), RoleKind::Labeler)
        .await?;
    tasks
        .init_workers(task.id(), &user_ids(&crew.reviewers), RoleKind::Reviewer)
        .await?;
    Ok(())
}

fn annotation_for(idx: u64) -> Annotation {
    let offset = f64::from(u32::try_from(idx % 64).unwrap_or_default());
    let category = if idx % 3 == 0 { "truck" } else { "car" };
    Annotation::new(category).with_bounding_box(BoundingBox::new(
        offset,
        offset,
        offset + 48.0,
        offset + 32.0,
    ))
}

async fn work_through(
    engine: &Engine,
    task: &LabelTask,
    crew: &Crew,
    viewer: UserId,
) -> Result<(), BoxError> {
    let annotations = engine.annotations();
    let page = annotations
        .list_images_for_role(ImageListRequest::new(task.id(), viewer, usize::MAX))
        .await?;
    let mut rejected_once = false;
    for image in &page.images {
        let mut labels = Vec::with_capacity(crew.labelers.len());
        for labeler in &crew.labelers {
            labels.push(
                annotations
                    .set_label(task.id(), image.id, labeler.id(), vec![annotation_for(image.idx)])
                    .await?,
            );
        }

        if !rejected_once && let (Some(reviewer), Some(labeler), Some(first)) =
            (crew.reviewers.first(), crew.labelers.first(), labels.first())
        {
            annotations
                .set_review(task.id(), image.id, reviewer.id(), first, ReviewAction::Reject)
                .await?;
            info!(task_id = %task.id(), image_id = %image.id, "label rejected, relabeling");
            let relabeled = annotations
                .set_label(task.id(), image.id, labeler.id(), vec![annotation_for(image.idx)])
                .await?;
            if let Some(slot) = labels.first_mut() {
                *slot = relabeled;
            }
            rejected_once = true;
        }

        for reviewer in &crew.reviewers {
            for label in &labels {
                annotations
                    .set_review(task.id(), image.id, reviewer.id(), label, ReviewAction::Accept)
                    .await?;
            }
        }
    }
    Ok(())
}
