//! Shared world state for review verdict BDD scenarios.

use std::sync::Arc;

use labelflow::labeling::{
    adapters::memory::{self, InMemoryDatasetCatalog, InMemoryUserDirectory},
    domain::{LabelId, TaskId, TaskImageId, User},
    services::WorkflowEngine,
};
use mockable::DefaultClock;
use rstest::fixture;

/// Engine type used by the BDD world.
pub type TestEngine = WorkflowEngine<DefaultClock>;

/// Scenario world for review verdict behaviour tests.
pub struct ReviewWorld {
    pub engine: TestEngine,
    pub users: InMemoryUserDirectory,
    pub datasets: InMemoryDatasetCatalog,
    pub labeler: Option<User>,
    pub reviewer: Option<User>,
    pub task_id: Option<TaskId>,
    pub image_id: Option<TaskImageId>,
    pub label_id: Option<LabelId>,
}

impl ReviewWorld {
    /// Creates a world over empty in-memory ports.
    #[must_use]
    pub fn new() -> Self {
        let users = InMemoryUserDirectory::new();
        let datasets = InMemoryDatasetCatalog::new();
        let engine = WorkflowEngine::new(
            memory::ports(users.clone(), datasets.clone()),
            Arc::new(DefaultClock),
        );
        Self {
            engine,
            users,
            datasets,
            labeler: None,
            reviewer: None,
            task_id: None,
            image_id: None,
            label_id: None,
        }
    }

    /// Returns the scenario's task, image and labeler.
    ///
    /// # Errors
    ///
    /// Returns an error if the project has not been set up.
    pub fn labeling_target(&self) -> eyre::Result<(TaskId, TaskImageId, &User)> {
        let task_id = self
            .task_id
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))?;
        let image_id = self
            .image_id
            .ok_or_else(|| eyre::eyre!("missing image in scenario world"))?;
        let labeler = self
            .labeler
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing labeler in scenario world"))?;
        Ok((task_id, image_id, labeler))
    }

    /// Returns the scenario's reviewer and the label under review.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing has been labeled yet.
    pub fn review_target(&self) -> eyre::Result<(&User, &LabelId)> {
        let reviewer = self
            .reviewer
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing reviewer in scenario world"))?;
        let label_id = self
            .label_id
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing label in scenario world"))?;
        Ok((reviewer, label_id))
    }
}

impl Default for ReviewWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReviewWorld {
    ReviewWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
