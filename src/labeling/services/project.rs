//! Project lifecycle: creation, editing, initialization and owner QA.

use super::{WorkflowContext, WorkflowError, WorkflowResult};
use crate::labeling::{
    domain::{
        AccessSubject, Annotation, Capability, Categories, DatasetId, DatasetImage, DatasetRef,
        LabelSubmission, LabelTask, LabelingDomainError, NewProject, Project, ProjectId,
        ProjectQaAction, RoleKind, TaskId, TaskImage, TaskImageId, UserId, WorkflowConfig,
        permits,
    },
    ports::RepositoryError,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Request payload for creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProjectRequest {
    name: String,
    description: String,
    owner: UserId,
    managers: Vec<UserId>,
    datasets: Vec<DatasetId>,
    categories: Vec<String>,
    pre_label: Option<String>,
}

impl CreateProjectRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        owner: UserId,
        managers: impl IntoIterator<Item = UserId>,
        datasets: impl IntoIterator<Item = DatasetId>,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            owner,
            managers: managers.into_iter().collect(),
            datasets: datasets.into_iter().collect(),
            categories: categories.into_iter().map(Into::into).collect(),
            pre_label: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Names the dataset label set imported as default labels at init.
    #[must_use]
    pub fn with_pre_label(mut self, label_set: impl Into<String>) -> Self {
        self.pre_label = Some(label_set.into());
        self
    }
}

/// Request payload for editing a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditProjectRequest {
    /// New description, when provided.
    pub description: Option<String>,
    /// New manager list, when provided; must not be empty.
    pub managers: Option<Vec<UserId>>,
}

/// Initialization parameters as received from a caller.
///
/// All three fields are mandatory together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitProjectRequest {
    /// Images per task; zero means one task per dataset.
    pub batch_size: Option<usize>,
    /// Labelers per image.
    pub label_times: Option<u32>,
    /// Reviewers per image; zero disables review.
    pub review_times: Option<u32>,
}

impl InitProjectRequest {
    /// Creates a request with every parameter set.
    #[must_use]
    pub const fn new(batch_size: usize, label_times: u32, review_times: u32) -> Self {
        Self {
            batch_size: Some(batch_size),
            label_times: Some(label_times),
            review_times: Some(review_times),
        }
    }

    /// Validates the parameters into a workflow configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::IncompleteWorkflowConfig`] when a field
    /// is missing, or [`LabelingDomainError::InvalidLabelTimes`] when
    /// `label_times` is zero.
    pub const fn try_into_config(self) -> Result<WorkflowConfig, LabelingDomainError> {
        match (self.batch_size, self.label_times, self.review_times) {
            (Some(batch_size), Some(label_times), Some(review_times)) => {
                WorkflowConfig::new(batch_size, label_times, review_times)
            }
            _ => Err(LabelingDomainError::IncompleteWorkflowConfig),
        }
    }
}

/// Project lifecycle orchestration service.
pub struct ProjectLifecycleService<C> {
    ctx: Arc<WorkflowContext<C>>,
}

impl<C> Clone for ProjectLifecycleService<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<C> ProjectLifecycleService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a project lifecycle service over a shared context.
    #[must_use]
    pub const fn new(ctx: Arc<WorkflowContext<C>>) -> Self {
        Self { ctx }
    }

    /// Creates a waiting project and grants owner and manager roles.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the owner may not create
    /// projects, a manager or dataset cannot be resolved, managers, datasets
    /// or categories are empty, or a dataset already belongs to a project.
    pub async fn create(&self, request: CreateProjectRequest) -> WorkflowResult<Project> {
        let owner = self
            .ctx
            .ports
            .users
            .find_user(request.owner)
            .await?
            .ok_or(LabelingDomainError::UserNotFound(request.owner))?;
        let subject = AccessSubject {
            is_staff: owner.is_staff(),
            ..AccessSubject::default()
        };
        if !owner.is_active() || !permits(&subject, Capability::CreateProject) {
            return Err(LabelingDomainError::CannotCreateProject(owner.id()).into());
        }
        let managers = self.ctx.resolve_active_users(&request.managers).await?;
        let datasets = self.resolve_datasets(&request.datasets).await?;
        for dataset in &datasets {
            let bound = self
                .ctx
                .ports
                .projects
                .find_by_dataset(std::slice::from_ref(&dataset.id))
                .await?;
            if let Some(existing) = bound {
                return Err(LabelingDomainError::DatasetAlreadyBound {
                    dataset: dataset.id,
                    project: existing.id(),
                }
                .into());
            }
        }

        let project = Project::new(
            NewProject {
                name: request.name,
                description: request.description,
                owner: owner.to_ref(),
                managers: managers.iter().map(|manager| manager.to_ref()).collect(),
                datasets,
                categories: request.categories,
                pre_label: request.pre_label,
            },
            &*self.ctx.clock,
        )?;
        self.ctx
            .ports
            .projects
            .store(&project)
            .await
            .map_err(|err| match err {
                RepositoryError::DatasetAlreadyBound {
                    dataset,
                    project: bound_to,
                } => WorkflowError::from(LabelingDomainError::DatasetAlreadyBound {
                    dataset,
                    project: bound_to,
                }),
                other => WorkflowError::from(other),
            })?;

        let _guard = self.ctx.locks.lock_project(project.id()).await;
        self.ctx
            .grant_project_role_locked(project.id(), owner.id(), RoleKind::Owner)
            .await?;
        for manager in &managers {
            self.ctx
                .grant_project_role_locked(project.id(), manager.id(), RoleKind::Manager)
                .await?;
        }
        info!(
            project_id = %project.id(),
            name = project.name(),
            datasets = project.datasets().len(),
            "created project"
        );
        Ok(project)
    }

    /// Updates the description and, when given, the managers.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the project is unknown, the new
    /// manager list is empty, or a manager cannot be resolved.
    pub async fn edit(
        &self,
        project_id: ProjectId,
        request: EditProjectRequest,
    ) -> WorkflowResult<Project> {
        let _guard = self.ctx.locks.lock_project(project_id).await;
        let mut project = self.ctx.find_project_or_error(project_id).await?;
        let clock = &*self.ctx.clock;
        if let Some(description) = request.description {
            project.set_description(description, clock);
        }
        if let Some(manager_ids) = request.managers {
            let managers = self.ctx.resolve_active_users(&manager_ids).await?;
            let changes =
                project.replace_managers(managers.iter().map(|user| user.to_ref()).collect(), clock)?;
            for user in &changes.added {
                self.ctx
                    .grant_project_role_locked(project_id, *user, RoleKind::Manager)
                    .await?;
            }
            for user in &changes.removed {
                self.ctx
                    .ports
                    .project_roles
                    .revoke(project_id, *user, RoleKind::Manager)
                    .await?;
            }
            info!(
                project_id = %project_id,
                added = changes.added.len(),
                removed = changes.removed.len(),
                "replaced project managers"
            );
        }
        self.ctx.ports.projects.update(&project).await?;
        Ok(project)
    }

    /// Splits every dataset into tasks and creates the per-image state.
    ///
    /// Images are taken in `(idx, id)` order. Objects of the project's
    /// pre-label set become the images' default labels and their category
    /// names join the project categories.
    ///
    /// The project is stored as initializing before any task is written.
    /// When a later write fails the tasks and image states written so far
    /// are removed and the project returns to waiting, so the call can be
    /// retried. A failed cleanup leaves the project initializing, which
    /// refuses further attempts.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the parameters are incomplete
    /// or invalid, the project is not waiting, or the catalog or a
    /// repository fails.
    pub async fn init(
        &self,
        project_id: ProjectId,
        request: InitProjectRequest,
    ) -> WorkflowResult<Project> {
        let _guard = self.ctx.locks.lock_project(project_id).await;
        let mut project = self.ctx.find_project_or_error(project_id).await?;
        let config = request.try_into_config()?;
        let clock = &*self.ctx.clock;
        let waiting = project.clone();
        project.begin_initialization(clock)?;

        let plan = self.plan_initialization(&project, config).await?;
        self.ctx.ports.projects.update(&project).await?;
        if let Err(err) = self.persist_initialization(&mut project, config, &plan).await {
            match self.roll_back_initialization(&waiting, &plan).await {
                Ok(()) => warn!(
                    project_id = %project_id,
                    error = %err,
                    "initialization failed, project returned to waiting"
                ),
                Err(cleanup) => warn!(
                    project_id = %project_id,
                    error = %err,
                    cleanup_error = %cleanup,
                    "initialization failed, project left initializing"
                ),
            }
            return Err(err);
        }
        info!(
            project_id = %project_id,
            tasks = plan.tasks.len(),
            batch_size = config.batch_size(),
            label_times = config.label_times(),
            review_times = config.review_times(),
            "initialized project"
        );
        Ok(project)
    }

    /// Recounts task statuses; moves the project to reviewing once every
    /// task is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the project is unknown or
    /// persistence fails.
    pub async fn update_subtask_counter(&self, project_id: ProjectId) -> WorkflowResult<Project> {
        self.ctx.update_subtask_counter(project_id).await
    }

    /// Applies the owner's verdict to a project in review.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the project is unknown or not
    /// reviewing.
    pub async fn qa(&self, project_id: ProjectId, action: ProjectQaAction) -> WorkflowResult<Project> {
        let _guard = self.ctx.locks.lock_project(project_id).await;
        let mut project = self.ctx.find_project_or_error(project_id).await?;
        if let Err(err) = project.apply_qa(action, &*self.ctx.clock) {
            warn!(project_id = %project_id, status = %project.status(), "rejected project QA");
            return Err(err.into());
        }
        self.ctx.ports.projects.update(&project).await?;
        info!(project_id = %project_id, status = %project.status(), "applied project QA");
        Ok(project)
    }

    /// Retrieves a project.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the project is unknown.
    pub async fn find(&self, project_id: ProjectId) -> WorkflowResult<Project> {
        self.ctx.find_project_or_error(project_id).await
    }

    async fn resolve_datasets(&self, ids: &[DatasetId]) -> WorkflowResult<Vec<DatasetRef>> {
        let mut datasets = Vec::with_capacity(ids.len());
        for id in ids {
            let dataset = self
                .ctx
                .ports
                .datasets
                .find_dataset(*id)
                .await?
                .ok_or(LabelingDomainError::DatasetNotFound(*id))?;
            datasets.push(dataset);
        }
        Ok(datasets)
    }
}

/// Tasks and image states created by project initialization.
struct InitPlan {
    tasks: Vec<LabelTask>,
    images: Vec<(DatasetId, Vec<TaskImage>)>,
    discovered: Categories,
}

impl<C> ProjectLifecycleService<C>
where
    C: Clock + Send + Sync,
{
    async fn plan_initialization(
        &self,
        project: &Project,
        config: WorkflowConfig,
    ) -> WorkflowResult<InitPlan> {
        let clock = &*self.ctx.clock;
        let mut plan = InitPlan {
            tasks: Vec::new(),
            images: Vec::new(),
            discovered: Categories::default(),
        };
        for dataset in project.datasets() {
            let source = self.ctx.ports.datasets.list_images(dataset.id).await?;
            let mut images = Vec::with_capacity(source.len());
            for range in config.partition(source.len()) {
                let batch = source.get(range).unwrap_or_default();
                let task = LabelTask::new(
                    project.id(),
                    dataset.id,
                    as_count(plan.tasks.len()),
                    as_count(batch.len()),
                    clock,
                );
                for image in batch {
                    let state = TaskImage::new(task.id(), dataset.id, image);
                    images.push(match project.pre_label() {
                        Some(label_set) => {
                            with_pre_label(state, image, label_set, &mut plan.discovered, clock)
                        }
                        None => state,
                    });
                }
                plan.tasks.push(task);
            }
            plan.images.push((dataset.id, images));
        }
        Ok(plan)
    }

    async fn persist_initialization(
        &self,
        project: &mut Project,
        config: WorkflowConfig,
        plan: &InitPlan,
    ) -> WorkflowResult<()> {
        self.ctx.ports.tasks.store_batch(&plan.tasks).await?;
        for (dataset_id, images) in &plan.images {
            self.ctx.ports.images.store_batch(*dataset_id, images).await?;
        }
        project.complete_initialization(
            config,
            as_count(plan.tasks.len()),
            plan.discovered.clone(),
            &*self.ctx.clock,
        )?;
        self.ctx.ports.projects.update(project).await?;
        Ok(())
    }

    async fn roll_back_initialization(
        &self,
        waiting: &Project,
        plan: &InitPlan,
    ) -> WorkflowResult<()> {
        let task_ids: Vec<TaskId> = plan.tasks.iter().map(LabelTask::id).collect();
        self.ctx.ports.tasks.delete_batch(&task_ids).await?;
        for (dataset_id, images) in &plan.images {
            let image_ids: Vec<TaskImageId> = images.iter().map(TaskImage::id).collect();
            self.ctx.ports.images.delete_batch(*dataset_id, &image_ids).await?;
        }
        self.ctx.ports.projects.update(waiting).await?;
        Ok(())
    }
}

fn as_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

fn with_pre_label(
    state: TaskImage,
    image: &DatasetImage,
    label_set: &str,
    discovered: &mut Categories,
    clock: &impl Clock,
) -> TaskImage {
    let annotations: Vec<Annotation> = image
        .objects
        .iter()
        .filter(|object| object.label_set == label_set)
        .map(|object| {
            let annotation = Annotation::new(object.category_name.trim().to_lowercase());
            match object.bounding_box {
                Some(bounding_box) => annotation.with_bounding_box(bounding_box),
                None => annotation,
            }
        })
        .filter(|annotation| !annotation.category_name.is_empty())
        .collect();
    if annotations.is_empty() {
        return state;
    }
    discovered.merge(Categories::normalize(
        annotations.iter().map(|annotation| annotation.category_name.as_str()),
    ));
    state.with_default_labels(LabelSubmission::pre_label(annotations, clock))
}
