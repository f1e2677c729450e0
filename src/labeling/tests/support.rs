//! Shared fixtures for the labeling unit tests.

use std::sync::Arc;

use crate::labeling::{
    adapters::memory::{self, InMemoryDatasetCatalog, InMemoryUserDirectory},
    domain::{
        DatasetId, DatasetImage, DatasetRef, LabelTask, Project, RoleKind, TaskId, TaskImageId,
        User, UserId,
    },
    services::{CreateProjectRequest, ImageListRequest, InitProjectRequest, WorkflowEngine},
};
use mockable::DefaultClock;

pub(super) type TestEngine = WorkflowEngine<DefaultClock>;

/// Engine wired to in-memory ports plus handles to seed users and datasets.
pub(super) struct Harness {
    pub(super) engine: TestEngine,
    pub(super) users: InMemoryUserDirectory,
    pub(super) datasets: InMemoryDatasetCatalog,
    pub(super) owner: User,
    pub(super) manager: User,
}

/// A working task with every role assigned.
pub(super) struct StaffedTask {
    pub(super) project: Project,
    pub(super) task: LabelTask,
    pub(super) label_leader: User,
    pub(super) review_leader: Option<User>,
    pub(super) labelers: Vec<User>,
    pub(super) reviewers: Vec<User>,
}

impl Harness {
    pub(super) fn new() -> eyre::Result<Self> {
        let users = InMemoryUserDirectory::new();
        let datasets = InMemoryDatasetCatalog::new();
        let owner = User::new("olga").as_staff();
        let manager = User::new("mads");
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

    pub(super) fn add_user(&self, name: &str) -> eyre::Result<User> {
        let user = User::new(name);
        self.users.insert(user.clone())?;
        Ok(user)
    }

    pub(super) fn add_users(&self, prefix: &str, count: usize) -> eyre::Result<Vec<User>> {
        (0..count)
            .map(|n| self.add_user(&format!("{prefix}-{n}")))
            .collect()
    }

    pub(super) fn add_dataset(&self, name: &str, images: u64) -> eyre::Result<DatasetId> {
        let id = DatasetId::new();
        let records = (0..images)
            .map(|idx| {
                DatasetImage::new(
                    format!("{name}-{idx:04}"),
                    idx,
                    format!("https://img.example/{name}/{idx}.jpg"),
                )
            })
            .collect();
        self.datasets.insert(DatasetRef::new(id, name), records)?;
        Ok(id)
    }

    pub(super) fn project_request(&self, datasets: Vec<DatasetId>) -> CreateProjectRequest {
        CreateProjectRequest::new(
            "street scenes",
            self.owner.id(),
            [self.manager.id()],
            datasets,
            ["Car", "pedestrian"],
        )
    }

    pub(super) async fn initialized_project(
        &self,
        images: u64,
        config: InitProjectRequest,
    ) -> eyre::Result<(Project, Vec<LabelTask>)> {
        let dataset = self.add_dataset("streets", images)?;
        let created = self
            .engine
            .projects()
            .create(self.project_request(vec![dataset]))
            .await?;
        let project = self.engine.projects().init(created.id(), config).await?;
        let tasks = self.engine.tasks().list_for_project(project.id()).await?;
        Ok((project, tasks))
    }

    /// Creates a single-task project and staffs every role.
    pub(super) async fn staffed_task(
        &self,
        images: u64,
        label_times: u32,
        review_times: u32,
    ) -> eyre::Result<StaffedTask> {
        let (_, tasks) = self
            .initialized_project(images, InitProjectRequest::new(0, label_times, review_times))
            .await?;
        let task_id = tasks
            .first()
            .map(LabelTask::id)
            .ok_or_else(|| eyre::eyre!("project produced no task"))?;
        let tasks_service = self.engine.tasks();

        let label_leader = self.add_user("lena")?;
        tasks_service
            .set_leader(task_id, label_leader.id(), RoleKind::LabelLeader)
            .await?;
        let review_leader = if review_times > 0 {
            let leader = self.add_user("ruth")?;
            tasks_service
                .set_leader(task_id, leader.id(), RoleKind::ReviewLeader)
                .await?;
            Some(leader)
        } else {
            None
        };

        let labelers = self.add_users("labeler", usize::try_from(label_times)?)?;
        tasks_service
            .init_workers(task_id, &ids(&labelers), RoleKind::Labeler)
            .await?;
        let reviewers = self.add_users("reviewer", usize::try_from(review_times)?)?;
        if review_times > 0 {
            tasks_service
                .init_workers(task_id, &ids(&reviewers), RoleKind::Reviewer)
                .await?;
        }

        let task = tasks_service.find(task_id).await?;
        let project = self.engine.projects().find(task.project_id()).await?;
        Ok(StaffedTask {
            project,
            task,
            label_leader,
            review_leader,
            labelers,
            reviewers,
        })
    }

    /// Lists every image of a task from `user`'s highest role.
    pub(super) async fn image_ids(
        &self,
        task_id: TaskId,
        user_id: UserId,
    ) -> eyre::Result<Vec<TaskImageId>> {
        let page = self
            .engine
            .annotations()
            .list_images_for_role(ImageListRequest::new(task_id, user_id, usize::MAX))
            .await?;
        Ok(page.images.iter().map(|image| image.id).collect())
    }
}

pub(super) fn ids(users: &[User]) -> Vec<UserId> {
    users.iter().map(User::id).collect()
}
