//! Per-image label and review state.
//!
//! Each image of a task carries one current label per labeler, the reviews
//! submitted against those labels, and a status per role. The status map is
//! what drives progress aggregation: every role's counters are computed by
//! bucketing images on that role's entry.

use super::{
    DatasetId, DatasetImage, DatasetImageId, LabelId, LabelingDomainError, ParseEnumError,
    ReviewId, TaskId, TaskImageId, TaskRoleKind, TaskStatus, User, UserId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Display name recorded on labels imported from an existing label set.
pub const PRE_LABEL_USER: &str = "_pre";

/// Whether a labeler may replace a label every reviewer has accepted.
///
/// Relabeling stays open while the task is working, even after unanimous
/// acceptance. Submitting a new label discards the reviews of the old one,
/// so the image goes back through review.
pub const RELABEL_ACCEPTED_LABELS: bool = true;

/// Identity of a role inside an image's status map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RoleKey {
    /// The task's label leader.
    LabelLeader,
    /// The task's review leader.
    ReviewLeader,
    /// One labeler.
    Labeler(UserId),
    /// One reviewer.
    Reviewer(UserId),
}

impl RoleKey {
    /// Builds the key for `kind` held by `user`; leader keys ignore the user.
    #[must_use]
    pub const fn new(kind: TaskRoleKind, user: UserId) -> Self {
        match kind {
            TaskRoleKind::LabelLeader => Self::LabelLeader,
            TaskRoleKind::ReviewLeader => Self::ReviewLeader,
            TaskRoleKind::Labeler => Self::Labeler(user),
            TaskRoleKind::Reviewer => Self::Reviewer(user),
        }
    }

    /// Returns the role kind the key belongs to.
    #[must_use]
    pub const fn kind(self) -> TaskRoleKind {
        match self {
            Self::LabelLeader => TaskRoleKind::LabelLeader,
            Self::ReviewLeader => TaskRoleKind::ReviewLeader,
            Self::Labeler(_) => TaskRoleKind::Labeler,
            Self::Reviewer(_) => TaskRoleKind::Reviewer,
        }
    }

    /// Returns the worker's user identifier, or `None` for leader keys.
    #[must_use]
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::LabelLeader | Self::ReviewLeader => None,
            Self::Labeler(user) | Self::Reviewer(user) => Some(user),
        }
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LabelLeader => f.write_str("label_leader"),
            Self::ReviewLeader => f.write_str("review_leader"),
            Self::Labeler(user) => write!(f, "labeler:{user}"),
            Self::Reviewer(user) => write!(f, "reviewer:{user}"),
        }
    }
}

impl From<RoleKey> for String {
    fn from(key: RoleKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<&str> for RoleKey {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "label_leader" => return Ok(Self::LabelLeader),
            "review_leader" => return Ok(Self::ReviewLeader),
            _ => {}
        }
        let (prefix, raw_user) = value
            .split_once(':')
            .ok_or_else(|| ParseEnumError::new("role key", value))?;
        let user = Uuid::parse_str(raw_user)
            .map(UserId::from_uuid)
            .map_err(|_| ParseEnumError::new("role key", value))?;
        match prefix {
            "labeler" => Ok(Self::Labeler(user)),
            "reviewer" => Ok(Self::Reviewer(user)),
            _ => Err(ParseEnumError::new("role key", value)),
        }
    }
}

impl TryFrom<String> for RoleKey {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

/// Status of one image from the point of view of one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    /// Waiting for a label.
    Labeling,
    /// Labeled and waiting for review.
    Reviewing,
    /// A reviewer rejected a label.
    Rejected,
    /// Every required review accepted.
    Accepted,
}

impl ImageStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 4] = [Self::Labeling, Self::Reviewing, Self::Rejected, Self::Accepted];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Labeling => "labeling",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
            Self::Accepted => "accepted",
        }
    }

    /// Returns `true` when the labeler still owes a label.
    #[must_use]
    pub const fn awaits_labeling(self) -> bool {
        matches!(self, Self::Labeling | Self::Rejected)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ImageStatus {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("image status", value))
    }
}

/// Number of images per status for one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Images in [`ImageStatus::Labeling`].
    pub labeling: u64,
    /// Images in [`ImageStatus::Reviewing`].
    pub reviewing: u64,
    /// Images in [`ImageStatus::Rejected`].
    pub rejected: u64,
    /// Images in [`ImageStatus::Accepted`].
    pub accepted: u64,
}

impl StatusCounts {
    /// Counts one more image in `status`.
    pub const fn record(&mut self, status: ImageStatus) {
        match status {
            ImageStatus::Labeling => self.labeling += 1,
            ImageStatus::Reviewing => self.reviewing += 1,
            ImageStatus::Rejected => self.rejected += 1,
            ImageStatus::Accepted => self.accepted += 1,
        }
    }
}

/// Verdict of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// The label is correct.
    Accept,
    /// The label must be redone.
    Reject,
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        })
    }
}

/// Axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub xmin: f64,
    /// Top edge.
    pub ymin: f64,
    /// Right edge.
    pub xmax: f64,
    /// Bottom edge.
    pub ymax: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its edges.
    #[must_use]
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }
}

/// One annotated object inside a label submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Category identifier; defaults to the category name.
    pub category_id: String,
    /// Category name.
    pub category_name: String,
    /// Bounding box, when the object has one.
    pub bounding_box: Option<BoundingBox>,
    /// Serialized segmentation polygon, when the object has one.
    pub segmentation: Option<String>,
}

impl Annotation {
    /// Creates an annotation of `category_name` without geometry.
    #[must_use]
    pub fn new(category_name: impl Into<String>) -> Self {
        let name = category_name.into();
        Self {
            category_id: name.clone(),
            category_name: name,
            bounding_box: None,
            segmentation: None,
        }
    }

    /// Sets the bounding box.
    #[must_use]
    pub const fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}

/// Checks annotations and fills in missing category identifiers.
///
/// # Errors
///
/// Returns [`LabelingDomainError::MissingAnnotationCategory`] for the first
/// annotation whose category name is blank.
pub fn normalize_annotations(
    annotations: Vec<Annotation>,
) -> Result<Vec<Annotation>, LabelingDomainError> {
    annotations
        .into_iter()
        .enumerate()
        .map(|(index, mut annotation)| {
            if annotation.category_name.trim().is_empty() {
                return Err(LabelingDomainError::MissingAnnotationCategory { index });
            }
            if annotation.category_id.trim().is_empty() {
                annotation.category_id.clone_from(&annotation.category_name);
            }
            Ok(annotation)
        })
        .collect()
}

/// A labeler's current label on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSubmission {
    /// Label identifier; reviews refer to it.
    pub id: LabelId,
    /// The labeler.
    pub user_id: UserId,
    /// Display name of the labeler.
    pub user_name: String,
    /// Annotated objects.
    pub annotations: Vec<Annotation>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl LabelSubmission {
    /// Creates a label submitted by `user` now.
    #[must_use]
    pub fn new(user: &User, annotations: Vec<Annotation>, clock: &impl Clock) -> Self {
        Self {
            id: LabelId::generate(),
            user_id: user.id(),
            user_name: user.name().to_owned(),
            annotations,
            created_at: clock.utc(),
        }
    }

    /// Creates a label imported from an existing dataset label set.
    #[must_use]
    pub fn pre_label(annotations: Vec<Annotation>, clock: &impl Clock) -> Self {
        Self {
            id: LabelId::generate(),
            user_id: UserId::from_uuid(Uuid::nil()),
            user_name: PRE_LABEL_USER.to_owned(),
            annotations,
            created_at: clock.utc(),
        }
    }

    /// Returns a copy attributed to `to`, with a suffixed identifier.
    #[must_use]
    pub fn reattributed(&self, to: &User, suffix: &str) -> Self {
        Self {
            id: self.id.with_suffix(suffix),
            user_id: to.id(),
            user_name: to.name().to_owned(),
            annotations: self.annotations.clone(),
            created_at: self.created_at,
        }
    }
}

/// A reviewer's verdict on one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    /// Review identifier.
    pub id: ReviewId,
    /// The reviewer.
    pub user_id: UserId,
    /// Display name of the reviewer.
    pub user_name: String,
    /// The reviewed label.
    pub label_id: LabelId,
    /// The verdict.
    pub action: ReviewAction,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl ReviewSubmission {
    /// Creates a review submitted by `user` now.
    #[must_use]
    pub fn new(user: &User, label_id: LabelId, action: ReviewAction, clock: &impl Clock) -> Self {
        Self {
            id: ReviewId::generate(),
            user_id: user.id(),
            user_name: user.name().to_owned(),
            label_id,
            action,
            created_at: clock.utc(),
        }
    }

    /// Returns a copy attributed to `to`, with a suffixed identifier.
    #[must_use]
    pub fn reattributed(&self, to: &User, suffix: &str) -> Self {
        Self {
            id: self.id.with_suffix(suffix),
            user_id: to.id(),
            user_name: to.name().to_owned(),
            label_id: self.label_id.clone(),
            action: self.action,
            created_at: self.created_at,
        }
    }
}

/// Label and review state of one image inside one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskImage {
    id: TaskImageId,
    idx: u64,
    task_id: TaskId,
    dataset_id: DatasetId,
    image_id: DatasetImageId,
    url: String,
    url_full_res: String,
    default_labels: Option<LabelSubmission>,
    labels: BTreeMap<UserId, LabelSubmission>,
    reviews: BTreeMap<UserId, Vec<ReviewSubmission>>,
    role_status: BTreeMap<RoleKey, ImageStatus>,
}

impl TaskImage {
    /// Creates the state record of `image` inside `task_id`.
    #[must_use]
    pub fn new(task_id: TaskId, dataset_id: DatasetId, image: &DatasetImage) -> Self {
        Self {
            id: TaskImageId::new(),
            idx: image.idx,
            task_id,
            dataset_id,
            image_id: image.id.clone(),
            url: image.url.clone(),
            url_full_res: image.url_full_res.clone(),
            default_labels: None,
            labels: BTreeMap::new(),
            reviews: BTreeMap::new(),
            role_status: BTreeMap::new(),
        }
    }

    /// Attaches a pre-seeded label.
    #[must_use]
    pub fn with_default_labels(mut self, label: LabelSubmission) -> Self {
        self.default_labels = Some(label);
        self
    }

    /// Returns the state record identifier.
    #[must_use]
    pub const fn id(&self) -> TaskImageId {
        self.id
    }

    /// Returns the position of the image in its dataset.
    #[must_use]
    pub const fn idx(&self) -> u64 {
        self.idx
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the dataset the image comes from.
    #[must_use]
    pub const fn dataset_id(&self) -> DatasetId {
        self.dataset_id
    }

    /// Returns the image identifier inside the dataset.
    #[must_use]
    pub const fn image_id(&self) -> &DatasetImageId {
        &self.image_id
    }

    /// Returns the display URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the full resolution URL.
    #[must_use]
    pub fn url_full_res(&self) -> &str {
        &self.url_full_res
    }

    /// Returns the pre-seeded label, if any.
    #[must_use]
    pub const fn default_labels(&self) -> Option<&LabelSubmission> {
        self.default_labels.as_ref()
    }

    /// Returns the current labels keyed by labeler.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<UserId, LabelSubmission> {
        &self.labels
    }

    /// Returns the reviews keyed by reviewer.
    #[must_use]
    pub const fn reviews(&self) -> &BTreeMap<UserId, Vec<ReviewSubmission>> {
        &self.reviews
    }

    /// Returns the per-role status map.
    #[must_use]
    pub const fn role_status(&self) -> &BTreeMap<RoleKey, ImageStatus> {
        &self.role_status
    }

    /// Returns the status recorded for `key`.
    #[must_use]
    pub fn status_of(&self, key: RoleKey) -> Option<ImageStatus> {
        self.role_status.get(&key).copied()
    }

    /// Starts a newly created role's entry at `status`, replacing any entry
    /// left under the same key.
    pub fn seed_role(&mut self, key: RoleKey, status: ImageStatus) {
        self.role_status.insert(key, status);
    }

    /// Overwrites the status of `key`.
    pub fn set_role_status(&mut self, key: RoleKey, status: ImageStatus) {
        self.role_status.insert(key, status);
    }

    /// Overwrites the status of every key in `keys`.
    pub fn reset_role_status(&mut self, keys: &[RoleKey], status: ImageStatus) {
        for key in keys {
            self.role_status.insert(*key, status);
        }
    }

    /// Returns `true` when at least one labeler exists and all are in `status`.
    #[must_use]
    pub fn all_labelers_in(&self, status: ImageStatus) -> bool {
        let mut labelers = self.labeler_statuses().peekable();
        labelers.peek().is_some() && labelers.all(|current| current == status)
    }

    /// Returns whether `labeler` may submit a label.
    ///
    /// A labeler who never labeled may always label. A labeler whose label
    /// was rejected may relabel. A labeler whose label was accepted by every
    /// reviewer may also relabel, because [`RELABEL_ACCEPTED_LABELS`] is set.
    #[must_use]
    pub fn can_set_label(&self, task_status: TaskStatus, labeler: UserId) -> bool {
        if task_status != TaskStatus::Working {
            return false;
        }
        let Some(label) = self.labels.get(&labeler) else {
            return true;
        };
        RELABEL_ACCEPTED_LABELS || !self.accepted_by_every_reviewer(&label.id)
    }

    /// Replaces `labeler`'s current label and advances the status map.
    ///
    /// Reviews of the superseded label are discarded. Once every labeler has
    /// a label waiting for review, every role moves to reviewing.
    pub fn apply_label(
        &mut self,
        labeler: &User,
        annotations: Vec<Annotation>,
        clock: &impl Clock,
    ) -> LabelId {
        let label = LabelSubmission::new(labeler, annotations, clock);
        let label_id = label.id.clone();
        if let Some(previous) = self.labels.insert(labeler.id(), label) {
            for reviews in self.reviews.values_mut() {
                reviews.retain(|review| review.label_id != previous.id);
            }
            self.reviews.retain(|_, reviews| !reviews.is_empty());
        }
        self.role_status
            .insert(RoleKey::Labeler(labeler.id()), ImageStatus::Reviewing);
        if self.all_labelers_in(ImageStatus::Reviewing) {
            for status in self.role_status.values_mut() {
                *status = ImageStatus::Reviewing;
            }
        }
        label_id
    }

    /// Returns whether `reviewer` may review `label_id`.
    #[must_use]
    pub fn can_set_review(
        &self,
        task_status: TaskStatus,
        reviewer: UserId,
        label_id: &LabelId,
    ) -> bool {
        if label_id.is_empty() || task_status != TaskStatus::Working {
            return false;
        }
        if self.labeler_statuses().any(ImageStatus::awaits_labeling) {
            return false;
        }
        if self.label_owner(label_id).is_none() {
            return false;
        }
        !self.has_reviewed(reviewer, label_id)
    }

    /// Records `reviewer`'s verdict on `label_id` and advances the status map.
    ///
    /// Acceptance needs unanimity: the labeler is accepted once every
    /// reviewer accepted its label, the leaders once every labeler is
    /// accepted. A single rejection marks the reviewer, the labeler and both
    /// leaders rejected.
    ///
    /// # Errors
    ///
    /// Returns [`LabelingDomainError::LabelNotFound`] when no current label
    /// has this identifier.
    pub fn apply_review(
        &mut self,
        reviewer: &User,
        label_id: &LabelId,
        action: ReviewAction,
        clock: &impl Clock,
    ) -> Result<ReviewId, LabelingDomainError> {
        let labeler = self
            .label_owner(label_id)
            .ok_or_else(|| LabelingDomainError::LabelNotFound(label_id.clone()))?;
        let review = ReviewSubmission::new(reviewer, label_id.clone(), action, clock);
        let review_id = review.id.clone();
        let submitted = self.reviews.entry(reviewer.id()).or_default();
        submitted.retain(|existing| &existing.label_id != label_id);
        submitted.push(review);

        let reviewer_key = RoleKey::Reviewer(reviewer.id());
        let labeler_key = RoleKey::Labeler(labeler);
        match action {
            ReviewAction::Accept => {
                if self.accepted_every_label(reviewer.id()) {
                    self.set_role_status(reviewer_key, ImageStatus::Accepted);
                }
                if self.accepted_by_every_reviewer(label_id) {
                    self.set_role_status(labeler_key, ImageStatus::Accepted);
                }
                if self.all_labelers_in(ImageStatus::Accepted) {
                    self.set_role_status(RoleKey::LabelLeader, ImageStatus::Accepted);
                    self.set_role_status(RoleKey::ReviewLeader, ImageStatus::Accepted);
                }
            }
            ReviewAction::Reject => {
                self.reset_role_status(
                    &[
                        reviewer_key,
                        labeler_key,
                        RoleKey::LabelLeader,
                        RoleKey::ReviewLeader,
                    ],
                    ImageStatus::Rejected,
                );
            }
        }
        Ok(review_id)
    }

    /// Hands a worker's per-image state over to `to`.
    ///
    /// The status entry is renamed. A labeler's label moves to the new user
    /// with a suffixed identifier and reviews are relinked to it; a
    /// reviewer's reviews move with suffixed identifiers. Leader kinds have
    /// no per-image state to move.
    pub fn transfer_worker(&mut self, kind: TaskRoleKind, from: UserId, to: &User, suffix: &str) {
        if kind.is_leader() {
            return;
        }
        if let Some(status) = self.role_status.remove(&RoleKey::new(kind, from)) {
            self.role_status.insert(RoleKey::new(kind, to.id()), status);
        }
        match kind {
            TaskRoleKind::Labeler => {
                if let Some(label) = self.labels.remove(&from) {
                    let moved = label.reattributed(to, suffix);
                    for review in self.reviews.values_mut().flatten() {
                        if review.label_id == label.id {
                            review.label_id = moved.id.clone();
                        }
                    }
                    self.labels.insert(to.id(), moved);
                }
            }
            TaskRoleKind::Reviewer => {
                if let Some(reviews) = self.reviews.remove(&from) {
                    let moved = reviews
                        .iter()
                        .map(|review| review.reattributed(to, suffix))
                        .collect();
                    self.reviews.insert(to.id(), moved);
                }
            }
            TaskRoleKind::LabelLeader | TaskRoleKind::ReviewLeader => {}
        }
    }

    /// Returns the copy of this image visible from `kind` held by `user`.
    ///
    /// Labelers see their own label and the reviews of it. Reviewers see
    /// every label and their own reviews. Leaders see everything.
    #[must_use]
    pub fn view_for(&self, kind: TaskRoleKind, user: UserId) -> TaskImageView {
        let status_key = if kind.is_leader() {
            RoleKey::LabelLeader
        } else {
            RoleKey::new(kind, user)
        };
        let (labels, reviews): (Vec<LabelSubmission>, Vec<ReviewSubmission>) = match kind {
            TaskRoleKind::Labeler => {
                let own = self.labels.get(&user).cloned();
                let reviews = own.as_ref().map_or_else(Vec::new, |label| {
                    self.reviews
                        .values()
                        .flatten()
                        .filter(|review| review.label_id == label.id)
                        .cloned()
                        .collect()
                });
                (own.into_iter().collect(), reviews)
            }
            TaskRoleKind::Reviewer => (
                self.labels.values().cloned().collect(),
                self.reviews.get(&user).cloned().unwrap_or_default(),
            ),
            TaskRoleKind::LabelLeader | TaskRoleKind::ReviewLeader => (
                self.labels.values().cloned().collect(),
                self.reviews.values().flatten().cloned().collect(),
            ),
        };
        TaskImageView {
            id: self.id,
            idx: self.idx,
            image_id: self.image_id.clone(),
            url: self.url.clone(),
            url_full_res: self.url_full_res.clone(),
            status: self.status_of(status_key),
            default_labels: self.default_labels.clone(),
            labels,
            reviews,
        }
    }

    fn labeler_statuses(&self) -> impl Iterator<Item = ImageStatus> + '_ {
        self.role_status
            .iter()
            .filter(|(key, _)| matches!(key, RoleKey::Labeler(_)))
            .map(|(_, status)| *status)
    }

    fn reviewer_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.role_status.keys().filter_map(|key| match key {
            RoleKey::Reviewer(user) => Some(*user),
            _ => None,
        })
    }

    fn label_owner(&self, label_id: &LabelId) -> Option<UserId> {
        self.labels
            .iter()
            .find(|(_, label)| &label.id == label_id)
            .map(|(user, _)| *user)
    }

    fn has_reviewed(&self, reviewer: UserId, label_id: &LabelId) -> bool {
        self.reviews
            .get(&reviewer)
            .is_some_and(|reviews| reviews.iter().any(|review| &review.label_id == label_id))
    }

    fn has_accepted(&self, reviewer: UserId, label_id: &LabelId) -> bool {
        self.reviews.get(&reviewer).is_some_and(|reviews| {
            reviews
                .iter()
                .any(|review| &review.label_id == label_id && review.action == ReviewAction::Accept)
        })
    }

    fn accepted_every_label(&self, reviewer: UserId) -> bool {
        self.labels
            .values()
            .all(|label| self.has_accepted(reviewer, &label.id))
    }

    fn accepted_by_every_reviewer(&self, label_id: &LabelId) -> bool {
        let mut reviewers = self.reviewer_ids().peekable();
        reviewers.peek().is_some() && reviewers.all(|reviewer| self.has_accepted(reviewer, label_id))
    }
}

/// An image as presented to one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskImageView {
    /// State record identifier.
    pub id: TaskImageId,
    /// Position in the dataset.
    pub idx: u64,
    /// Image identifier inside the dataset.
    pub image_id: DatasetImageId,
    /// Display URL.
    pub url: String,
    /// Full resolution URL.
    pub url_full_res: String,
    /// Status from the viewing role's perspective.
    pub status: Option<ImageStatus>,
    /// Pre-seeded label, if any.
    pub default_labels: Option<LabelSubmission>,
    /// Labels visible to the role.
    pub labels: Vec<LabelSubmission>,
    /// Reviews visible to the role.
    pub reviews: Vec<ReviewSubmission>,
}
