//! Unit tests for project initialization when image state writes fail.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::labeling::{
    adapters::memory::{
        self, InMemoryDatasetCatalog, InMemoryImageStateRepository, InMemoryUserDirectory,
    },
    domain::{
        DatasetId, DatasetImage, DatasetRef, LabelTask, ProjectStatus, RoleKey, StatusCounts,
        TaskId, TaskImage, TaskImageId, User,
    },
    ports::{ImageQuery, ImageStateRepository, RepositoryError, RepositoryResult},
    services::{CreateProjectRequest, InitProjectRequest, WorkflowEngine, WorkflowError},
};
use eyre::ensure;
use mockable::DefaultClock;
use rstest::rstest;

/// Image store whose `store_batch` fails on one chosen call.
struct FlakyImages {
    inner: InMemoryImageStateRepository,
    failing_call: usize,
    calls: AtomicUsize,
    stored: Mutex<Vec<(DatasetId, TaskId)>>,
}

impl FlakyImages {
    fn failing_on(failing_call: usize) -> Self {
        Self {
            inner: InMemoryImageStateRepository::new(),
            failing_call,
            calls: AtomicUsize::new(0),
            stored: Mutex::new(Vec::new()),
        }
    }

    fn stored(&self) -> Vec<(DatasetId, TaskId)> {
        self.stored.lock().expect("stored batches lock").clone()
    }
}

#[async_trait]
impl ImageStateRepository for FlakyImages {
    async fn store_batch(&self, dataset: DatasetId, images: &[TaskImage]) -> RepositoryResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.failing_call {
            return Err(RepositoryError::persistence(std::io::Error::other(
                "image store unavailable",
            )));
        }
        self.inner.store_batch(dataset, images).await?;
        self.stored
            .lock()
            .expect("stored batches lock")
            .extend(images.iter().map(|image| (dataset, image.task_id())));
        Ok(())
    }

    async fn delete_batch(
        &self,
        dataset: DatasetId,
        ids: &[TaskImageId],
    ) -> RepositoryResult<()> {
        self.inner.delete_batch(dataset, ids).await
    }

    async fn update(&self, dataset: DatasetId, image: &TaskImage) -> RepositoryResult<()> {
        self.inner.update(dataset, image).await
    }

    async fn update_batch(
        &self,
        dataset: DatasetId,
        images: &[TaskImage],
    ) -> RepositoryResult<()> {
        self.inner.update_batch(dataset, images).await
    }

    async fn find_by_id(
        &self,
        dataset: DatasetId,
        id: TaskImageId,
    ) -> RepositoryResult<Option<TaskImage>> {
        self.inner.find_by_id(dataset, id).await
    }

    async fn find(
        &self,
        dataset: DatasetId,
        query: &ImageQuery,
    ) -> RepositoryResult<Vec<TaskImage>> {
        self.inner.find(dataset, query).await
    }

    async fn count(&self, dataset: DatasetId, query: &ImageQuery) -> RepositoryResult<u64> {
        self.inner.count(dataset, query).await
    }

    async fn count_statuses(
        &self,
        dataset: DatasetId,
        task: TaskId,
    ) -> RepositoryResult<BTreeMap<RoleKey, StatusCounts>> {
        self.inner.count_statuses(dataset, task).await
    }
}

struct Setup {
    engine: WorkflowEngine<DefaultClock>,
    images: Arc<FlakyImages>,
    request: CreateProjectRequest,
}

fn setup(failing_call: usize) -> eyre::Result<Setup> {
    let users = InMemoryUserDirectory::new();
    let datasets = InMemoryDatasetCatalog::new();
    let owner = User::new("olga").as_staff();
    let manager = User::new("mads");
    users.insert(owner.clone())?;
    users.insert(manager.clone())?;
    let mut dataset_ids = Vec::new();
    for name in ["harbour", "station"] {
        let id = DatasetId::new();
        let records = (0..6)
            .map(|idx| {
                DatasetImage::new(
                    format!("{name}-{idx:04}"),
                    idx,
                    format!("https://img.example/{name}/{idx}.jpg"),
                )
            })
            .collect();
        datasets.insert(DatasetRef::new(id, name), records)?;
        dataset_ids.push(id);
    }
    let images = Arc::new(FlakyImages::failing_on(failing_call));
    let mut ports = memory::ports(users, datasets);
    ports.images = Arc::clone(&images) as Arc<dyn ImageStateRepository>;
    Ok(Setup {
        engine: WorkflowEngine::new(ports, Arc::new(DefaultClock)),
        images,
        request: CreateProjectRequest::new(
            "transit",
            owner.id(),
            [manager.id()],
            dataset_ids,
            ["car"],
        ),
    })
}

#[rstest]
#[case::first_dataset(0)]
#[case::second_dataset(1)]
#[tokio::test(flavor = "multi_thread")]
async fn failed_image_writes_leave_the_project_retryable(
    #[case] failing_call: usize,
) -> eyre::Result<()> {
    let Setup {
        engine,
        images,
        request,
    } = setup(failing_call)?;
    let projects = engine.projects();
    let created = projects.create(request).await?;
    let config = InitProjectRequest::new(4, 1, 0);

    let failed = projects.init(created.id(), config).await;
    ensure!(
        matches!(failed, Err(WorkflowError::Repository(_))),
        "expected a repository error, got {failed:?}"
    );
    ensure!(projects.find(created.id()).await?.status() == ProjectStatus::Waiting);
    ensure!(engine.tasks().list_for_project(created.id()).await?.is_empty());
    let leftovers = images.stored();
    for (dataset, task) in &leftovers {
        let remaining = images
            .inner
            .count(*dataset, &ImageQuery::for_task(*task))
            .await?;
        ensure!(remaining == 0, "image states of task {task} survived the failure");
    }

    let project = projects.init(created.id(), config).await?;
    let tasks = engine.tasks().list_for_project(project.id()).await?;
    ensure!(project.status() == ProjectStatus::Working);
    ensure!(project.counters().total == 4);
    ensure!(tasks.len() == 4, "expected 4 tasks, got {}", tasks.len());
    let indices: BTreeSet<u64> = tasks.iter().map(LabelTask::idx).collect();
    ensure!(indices == BTreeSet::from([0, 1, 2, 3]));
    for task in &tasks {
        let stored = images
            .inner
            .count(task.dataset_id(), &ImageQuery::for_task(task.id()))
            .await?;
        ensure!(stored == task.num_total());
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_second_init_after_success_is_refused() -> eyre::Result<()> {
    let Setup {
        engine, request, ..
    } = setup(usize::MAX)?;
    let projects = engine.projects();
    let created = projects.create(request).await?;
    projects
        .init(created.id(), InitProjectRequest::new(4, 1, 0))
        .await?;

    let again = projects
        .init(created.id(), InitProjectRequest::new(4, 1, 0))
        .await;

    ensure!(matches!(again, Err(WorkflowError::Domain(_))));
    ensure!(engine.tasks().list_for_project(created.id()).await?.len() == 4);
    Ok(())
}
