//! Shared helpers for in-memory workflow integration tests.

use std::sync::Arc;

use labelflow::labeling::{
    adapters::memory::{self, InMemoryDatasetCatalog, InMemoryUserDirectory},
    domain::{
        Annotation, DatasetId, DatasetImage, DatasetRef, LabelTask, ReviewAction, TaskId,
        TaskImageId, User, UserId,
    },
    services::{CreateProjectRequest, ImageListRequest, WorkflowEngine},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Engine type used by the integration tests.
pub type TestEngine = WorkflowEngine<DefaultClock>;

/// An engine over fresh in-memory ports with a staff owner and a manager.
pub struct Workspace {
    pub engine: TestEngine,
    pub users: InMemoryUserDirectory,
    pub datasets: InMemoryDatasetCatalog,
    pub owner: User,
    pub manager: User,
}

impl Workspace {
    /// Builds the workspace and registers the owner and manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory rejects a user.
    pub fn new() -> eyre::Result<Self> {
        let users = InMemoryUserDirectory::new();
        let datasets = InMemoryDatasetCatalog::new();
        let owner = User::new("owner").as_staff();
        let manager = User::new("manager");
        users.insert(owner.clone())?;
        users.insert(manager.clone())?;
        let engine = WorkflowEngine::new(
            memory::ports(users.clone(), datasets.clone()),
            Arc::new(DefaultClock),
        );
        Ok(Self {
            engine,
            users,
            datasets,
            owner,
            manager,
        })
    }

    /// Registers `count` users named `{prefix}-{n}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory rejects a user.
    pub fn register(&self, prefix: &str, count: usize) -> eyre::Result<Vec<User>> {
        (0..count)
            .map(|n| -> eyre::Result<User> {
                let user = User::new(format!("{prefix}-{n}"));
                self.users.insert(user.clone())?;
                Ok(user)
            })
            .collect()
    }

    /// Registers a dataset of `images` images.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog rejects the dataset.
    pub fn dataset(&self, name: &str, images: u64) -> eyre::Result<DatasetId> {
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
        self.datasets.insert(DatasetRef::new(id, name), records)?;
        Ok(id)
    }

    /// A creation request owned by the staff owner and run by the manager.
    #[must_use]
    pub fn request(&self, name: &str, datasets: Vec<DatasetId>) -> CreateProjectRequest {
        CreateProjectRequest::new(
            name,
            self.owner.id(),
            [self.manager.id()],
            datasets,
            ["car", "truck", "pedestrian"],
        )
    }

    /// Lists every image id of a task as seen by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user sees no role on the task.
    pub async fn image_ids(&self, task_id: TaskId, user_id: UserId) -> eyre::Result<Vec<TaskImageId>> {
        let page = self
            .engine
            .annotations()
            .list_images_for_role(ImageListRequest::new(task_id, user_id, usize::MAX))
            .await?;
        Ok(page.images.iter().map(|image| image.id).collect())
    }

    /// Labels every image with each labeler, then has each reviewer accept
    /// every label.
    ///
    /// # Errors
    ///
    /// Returns an error if any submission is refused.
    pub async fn complete(
        &self,
        task: &LabelTask,
        labelers: &[User],
        reviewers: &[User],
    ) -> eyre::Result<()> {
        let annotations = self.engine.annotations();
        for image in self.image_ids(task.id(), self.manager.id()).await? {
            let mut labels = Vec::with_capacity(labelers.len());
            for labeler in labelers {
                labels.push(
                    annotations
                        .set_label(task.id(), image, labeler.id(), vec![Annotation::new("car")])
                        .await?,
                );
            }
            for reviewer in reviewers {
                for label in &labels {
                    annotations
                        .set_review(task.id(), image, reviewer.id(), label, ReviewAction::Accept)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// Provides a fresh workspace for each test.
#[fixture]
pub fn workspace() -> Workspace {
    Workspace::new().expect("in-memory workspace should build")
}

/// Collects user ids.
#[must_use]
pub fn ids(users: &[User]) -> Vec<UserId> {
    users.iter().map(User::id).collect()
}
