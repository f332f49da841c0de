//! Core types and error definitions for footprint-dataset.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("geometry parse failed for image {image_id}: {detail}")]
    Geometry { image_id: ImageId, detail: String },
    #[error("raster alignment unavailable for image {image_id}: {detail}")]
    Alignment { image_id: ImageId, detail: String },
    #[error("precondition violated: {0}")]
    Precondition(String),
    #[error("image id {0} not present in annotation table")]
    UnknownImageId(ImageId),
    #[error("image load failed for {image_id}: {detail}")]
    ImageLoad { image_id: ImageId, detail: String },
}

/// Opaque key identifying one satellite image tile and its annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        ImageId(s.to_string())
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        ImageId(s)
    }
}

/// Binary ground-truth raster, shape (height, width), values in {0, 1}.
pub type Mask = ndarray::Array2<u8>;

/// Pixel image, shape (height, width, channels).
pub type Image = ndarray::Array3<u8>;

/// Lazily computed derived state. Explicitly two-state so upstream
/// mutations (e.g. a filter change) can force recomputation.
#[derive(Debug, Clone, Default)]
pub(crate) enum Lazy<T> {
    #[default]
    Uninit,
    Cached(T),
}

impl<T> Lazy<T> {
    pub(crate) fn invalidate(&mut self) {
        *self = Lazy::Uninit;
    }

    pub(crate) fn get_or_insert_with(&mut self, init: impl FnOnce() -> T) -> &T {
        if matches!(self, Lazy::Uninit) {
            *self = Lazy::Cached(init());
        }
        match self {
            Lazy::Cached(value) => value,
            Lazy::Uninit => unreachable!("populated above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_caches_and_invalidates() {
        let mut cell: Lazy<u32> = Lazy::default();
        assert_eq!(*cell.get_or_insert_with(|| 1), 1);
        // Cached value wins over a new initializer.
        assert_eq!(*cell.get_or_insert_with(|| 2), 1);
        cell.invalidate();
        assert_eq!(*cell.get_or_insert_with(|| 2), 2);
    }

    #[test]
    fn image_id_display_roundtrip() {
        let id = ImageId::from("AOI_2_Vegas_img42");
        assert_eq!(id.to_string(), "AOI_2_Vegas_img42");
    }
}
