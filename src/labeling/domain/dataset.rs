//! Dataset catalog records consumed at project initialization.

use super::{BoundingBox, DatasetId, DatasetImageId};
use serde::{Deserialize, Serialize};

/// Denormalized `{id, name}` reference to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    /// Dataset identifier.
    pub id: DatasetId,
    /// Dataset name.
    pub name: String,
}

impl DatasetRef {
    /// Creates a dataset reference.
    #[must_use]
    pub fn new(id: DatasetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An image as enumerated by the dataset catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetImage {
    /// Identifier of the image inside the dataset.
    pub id: DatasetImageId,
    /// Position of the image in the dataset.
    pub idx: u64,
    /// Display URL.
    pub url: String,
    /// Full resolution URL.
    pub url_full_res: String,
    /// Existing annotations grouped by label set.
    pub objects: Vec<DatasetObject>,
}

impl DatasetImage {
    /// Creates an image record without existing objects.
    #[must_use]
    pub fn new(id: impl Into<String>, idx: u64, url: impl Into<String>) -> Self {
        let url_value = url.into();
        Self {
            id: DatasetImageId::new(id),
            idx,
            url_full_res: url_value.clone(),
            url: url_value,
            objects: Vec::new(),
        }
    }

    /// Adds an existing object annotation.
    #[must_use]
    pub fn with_object(mut self, object: DatasetObject) -> Self {
        self.objects.push(object);
        self
    }
}

/// An existing annotation on a dataset image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetObject {
    /// Name of the label set the object belongs to.
    pub label_set: String,
    /// Category of the object.
    pub category_name: String,
    /// Bounding box, when the object has one.
    pub bounding_box: Option<BoundingBox>,
}

impl DatasetObject {
    /// Creates an object of `category_name` in `label_set`.
    #[must_use]
    pub fn new(label_set: impl Into<String>, category_name: impl Into<String>) -> Self {
        Self {
            label_set: label_set.into(),
            category_name: category_name.into(),
            bounding_box: None,
        }
    }

    /// Sets the bounding box.
    #[must_use]
    pub const fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}
