//! Training-data preparation for satellite building-footprint segmentation.
//!
//! This crate provides utilities for:
//! - Burning geographic (lon/lat) WKT polygons into binary pixel masks
//!   aligned to an image's affine geotransform
//! - Group-aware, seeded train/val/test splitting keyed by image identity
//! - Deterministic batch planning with augmentation-aware sizing
//! - Assembling (N, H, W, 3) image and (N, H, W, 1) mask arrays for a
//!   segmentation model
//!
//! Image decoding stays behind [`ImageProvider`] and augmentation behind
//! [`Augmenter`], so both can be swapped without touching the pipeline.

// Module declarations
pub mod aug;
pub mod batch;
pub mod dataset;
pub mod geotransform;
pub mod raster;
pub mod source;
pub mod split;
pub mod table;
pub mod types;

// Re-export public API
pub use aug::{AugConfig, Augmenter, ShiftFlipAugmenter};
pub use batch::{batch_count, batch_slice, effective_batch_size};
pub use dataset::{BatchSource, Dataset, DatasetConfig, NnPair, Subset};
pub use geotransform::{GeoTransform, RasterMeta};
pub use raster::rasterize;
pub use source::{GeoImage, ImageProvider, Sample, SampleSource};
pub use split::{GroupSplitter, SeededGroupSplit, SplitConfig, SplitPartitions};
pub use table::{AnnotationRow, AnnotationTable, PolygonRecord, RecordFilter};
pub use types::{DatasetError, DatasetResult, Image, ImageId, Mask};
