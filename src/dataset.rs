//! Dataset facade: filtered views, cached splits, and batch assembly.
//!
//! Composes the annotation table, image provider, rasterizer, batch planner,
//! and augmenter into train/val/test batch accessors shaped for a
//! segmentation model: images as (N, H, W, 3) f32, masks as (N, H, W, 1) f32.

use crate::aug::{AugConfig, Augmenter, ShiftFlipAugmenter};
use crate::batch::{batch_count, batch_slice, effective_batch_size};
use crate::source::{ImageProvider, SampleSource};
use crate::split::{GroupSplitter, SeededGroupSplit, SplitConfig, SplitPartitions};
use crate::table::{AnnotationTable, RecordFilter};
use crate::types::{DatasetError, DatasetResult, Image, ImageId, Lazy, Mask};
use image::imageops::FilterType;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Assembled batch arrays: images (N, H, W, 3), masks (N, H, W, 1).
pub type NnPair = (Array4<f32>, Array4<f32>);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Samples per assembled batch. Must be even when `augment` is set,
    /// since augmentation fills half the batch with synthetic samples.
    pub batch_size: usize,
    /// Augment training batches. Validation and test batches never augment.
    pub augment: bool,
    pub split: SplitConfig,
    pub aug: AugConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            augment: false,
            split: SplitConfig::default(),
            aug: AugConfig::default(),
        }
    }
}

/// Which partition a [`BatchSource`] serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    Train,
    Val,
    Test,
}

/// One logical data view over an annotation table and an image provider.
///
/// The table is loaded once and read-only for the facade's lifetime; the
/// id list and split partitions are derived lazily and invalidated when the
/// record filter changes. Single-threaded by design: batch computation is
/// pull-based and runs on the caller's thread.
pub struct Dataset<P: ImageProvider, A: Augmenter = ShiftFlipAugmenter> {
    table: AnnotationTable,
    provider: P,
    augmenter: A,
    cfg: DatasetConfig,
    splitter: Box<dyn GroupSplitter>,
    filter: RecordFilter,
    id_cache: Lazy<Vec<ImageId>>,
    split_cache: Lazy<SplitPartitions>,
}

impl<P: ImageProvider, A: Augmenter> std::fmt::Debug for Dataset<P, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl<P: ImageProvider> Dataset<P, ShiftFlipAugmenter> {
    pub fn new(table: AnnotationTable, provider: P, cfg: DatasetConfig) -> DatasetResult<Self> {
        let augmenter = ShiftFlipAugmenter::new(cfg.aug);
        Self::with_augmenter(table, provider, cfg, augmenter)
    }
}

impl<P: ImageProvider, A: Augmenter> Dataset<P, A> {
    /// Construct with a caller-supplied augmentation adapter. Configuration
    /// problems (odd batch size with augmentation, bad split ratios) fail
    /// here, before any batch work begins.
    pub fn with_augmenter(
        table: AnnotationTable,
        provider: P,
        cfg: DatasetConfig,
        augmenter: A,
    ) -> DatasetResult<Self> {
        effective_batch_size(cfg.batch_size, cfg.augment)?;
        let splitter: Box<dyn GroupSplitter> = Box::new(SeededGroupSplit::new(cfg.split)?);
        Ok(Self {
            table,
            provider,
            augmenter,
            cfg,
            splitter,
            filter: RecordFilter::All,
            id_cache: Lazy::default(),
            split_cache: Lazy::default(),
        })
    }

    /// Swap in a different group-split collaborator.
    pub fn with_splitter(mut self, splitter: Box<dyn GroupSplitter>) -> Self {
        self.splitter = splitter;
        self.split_cache.invalidate();
        self
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.cfg
    }

    pub fn table(&self) -> &AnnotationTable {
        &self.table
    }

    /// Unique image ids visible under the current filter, first-seen order.
    pub fn image_ids(&mut self) -> &[ImageId] {
        let table = &self.table;
        let filter = &self.filter;
        self.id_cache.get_or_insert_with(|| table.unique_ids(filter))
    }

    /// Restrict the visible records. Invalidates the cached id list and
    /// split so re-partitioning reflects the new visible set.
    pub fn set_filter(&mut self, filter: RecordFilter) {
        self.filter = filter;
        self.id_cache.invalidate();
        self.split_cache.invalidate();
    }

    /// Restore the unrestricted view.
    pub fn reset_filter(&mut self) {
        self.set_filter(RecordFilter::All);
    }

    /// The train/val/test partitions for the current visible set, computed
    /// once and cached until the filter (or splitter) changes.
    pub fn split_partitions(&mut self) -> &SplitPartitions {
        let ids = self.table.unique_ids(&self.filter);
        let splitter = &self.splitter;
        self.split_cache.get_or_insert_with(|| splitter.split(&ids))
    }

    /// Convert every visible image id into model inputs and ground truth.
    ///
    /// Each sample is resolved at native resolution, then image and mask are
    /// resized independently to `shape` (width, height) with nearest
    /// resampling. With augmentation enabled the sample count doubles.
    /// `scale_pixels` divides image intensities by 255.
    pub fn to_nn(&mut self, shape: (usize, usize), scale_pixels: bool) -> DatasetResult<NnPair> {
        let ids = self.table.unique_ids(&self.filter);
        self.assemble(&ids, self.cfg.augment, shape, scale_pixels)
    }

    pub fn train_batch_count(&mut self) -> DatasetResult<usize> {
        let effective = effective_batch_size(self.cfg.batch_size, self.cfg.augment)?;
        Ok(batch_count(self.split_partitions().train.len(), effective))
    }

    pub fn val_batch_count(&mut self) -> DatasetResult<usize> {
        let effective = effective_batch_size(self.cfg.batch_size, false)?;
        Ok(batch_count(self.split_partitions().val.len(), effective))
    }

    pub fn test_batch_count(&mut self) -> DatasetResult<usize> {
        let effective = effective_batch_size(self.cfg.batch_size, false)?;
        Ok(batch_count(self.split_partitions().test.len(), effective))
    }

    /// Assemble one training batch. Augments when configured, so eight ids
    /// become sixteen samples at batch size 16.
    pub fn train_batch(
        &mut self,
        index: usize,
        shape: (usize, usize),
        scale_pixels: bool,
    ) -> DatasetResult<NnPair> {
        let augment = self.cfg.augment;
        let effective = effective_batch_size(self.cfg.batch_size, augment)?;
        let ids = batch_slice(&self.split_partitions().train, effective, index).to_vec();
        self.assemble(&ids, augment, shape, scale_pixels)
    }

    pub fn val_batch(
        &mut self,
        index: usize,
        shape: (usize, usize),
        scale_pixels: bool,
    ) -> DatasetResult<NnPair> {
        let effective = effective_batch_size(self.cfg.batch_size, false)?;
        let ids = batch_slice(&self.split_partitions().val, effective, index).to_vec();
        self.assemble(&ids, false, shape, scale_pixels)
    }

    pub fn test_batch(
        &mut self,
        index: usize,
        shape: (usize, usize),
        scale_pixels: bool,
    ) -> DatasetResult<NnPair> {
        let effective = effective_batch_size(self.cfg.batch_size, false)?;
        let ids = batch_slice(&self.split_partitions().test, effective, index).to_vec();
        self.assemble(&ids, false, shape, scale_pixels)
    }

    /// The `(count_fn, data_fn)` pair for the training partition, for a
    /// generator/training loop that owns iteration and epoch policy.
    pub fn train_batches(&mut self, shape: (usize, usize), scale_pixels: bool) -> BatchSource<'_, P, A> {
        BatchSource {
            dataset: self,
            subset: Subset::Train,
            shape,
            scale_pixels,
        }
    }

    pub fn val_batches(&mut self, shape: (usize, usize), scale_pixels: bool) -> BatchSource<'_, P, A> {
        BatchSource {
            dataset: self,
            subset: Subset::Val,
            shape,
            scale_pixels,
        }
    }

    pub fn test_batches(&mut self, shape: (usize, usize), scale_pixels: bool) -> BatchSource<'_, P, A> {
        BatchSource {
            dataset: self,
            subset: Subset::Test,
            shape,
            scale_pixels,
        }
    }

    /// Resolve, resize, optionally augment, and stack the given ids.
    ///
    /// The sample source is scoped to the currently visible rows and lives
    /// only for this call; a failing sample aborts the whole batch.
    fn assemble(
        &mut self,
        ids: &[ImageId],
        augment: bool,
        shape: (usize, usize),
        scale_pixels: bool,
    ) -> DatasetResult<NnPair> {
        let (width, height) = shape;
        let mut images: Vec<Image> = Vec::with_capacity(ids.len());
        let mut masks: Vec<Mask> = Vec::with_capacity(ids.len());

        let source = SampleSource::new(&self.provider, self.table.visible_rows(&self.filter));
        for id in ids {
            let sample = source.resolve(id)?;
            let (_, _, channels) = sample.image.dim();
            if channels != 3 {
                return Err(DatasetError::ImageLoad {
                    image_id: id.clone(),
                    detail: format!("expected 3-channel imagery, got {channels} channels"),
                });
            }
            images.push(resize_image(&sample.image, width, height));
            masks.push(resize_mask(&sample.mask, width, height));
        }

        if augment {
            let (aug_images, aug_masks) = self.augmenter.augment(&images, &masks);
            images.extend(aug_images);
            masks.extend(aug_masks);
        }

        let n = images.len();
        let mut image_buf: Vec<f32> = Vec::with_capacity(n * height * width * 3);
        for image in &images {
            image_buf.extend(image.iter().map(|&v| v as f32));
        }
        if scale_pixels {
            for v in &mut image_buf {
                *v /= 255.0;
            }
        }
        let mut mask_buf: Vec<f32> = Vec::with_capacity(n * height * width);
        for mask in &masks {
            mask_buf.extend(mask.iter().map(|&v| v as f32));
        }

        let images_array = Array4::from_shape_vec((n, height, width, 3), image_buf)
            .expect("image buffer length matches stacked shape");
        // Masks get the trailing singleton channel the model interface wants.
        let masks_array = Array4::from_shape_vec((n, height, width, 1), mask_buf)
            .expect("mask buffer length matches stacked shape");
        Ok((images_array, masks_array))
    }
}

/// Deterministic count/data accessors over one partition. Iteration,
/// shuffling between epochs, and prefetching belong to the consumer.
pub struct BatchSource<'a, P: ImageProvider, A: Augmenter> {
    dataset: &'a mut Dataset<P, A>,
    subset: Subset,
    shape: (usize, usize),
    scale_pixels: bool,
}

impl<P: ImageProvider, A: Augmenter> BatchSource<'_, P, A> {
    pub fn subset(&self) -> Subset {
        self.subset
    }

    pub fn count(&mut self) -> DatasetResult<usize> {
        match self.subset {
            Subset::Train => self.dataset.train_batch_count(),
            Subset::Val => self.dataset.val_batch_count(),
            Subset::Test => self.dataset.test_batch_count(),
        }
    }

    pub fn batch(&mut self, index: usize) -> DatasetResult<NnPair> {
        match self.subset {
            Subset::Train => self.dataset.train_batch(index, self.shape, self.scale_pixels),
            Subset::Val => self.dataset.val_batch(index, self.shape, self.scale_pixels),
            Subset::Test => self.dataset.test_batch(index, self.shape, self.scale_pixels),
        }
    }
}

/// Nearest-neighbor resize to (width, height); resizing always happens
/// after rasterization at native resolution.
fn resize_image(image: &Image, width: usize, height: usize) -> Image {
    let (h, w, _) = image.dim();
    if (h, w) == (height, width) {
        return image.clone();
    }
    let buf: Vec<u8> = image.iter().copied().collect();
    let rgb = image::RgbImage::from_raw(w as u32, h as u32, buf)
        .expect("pixel buffer length matches dimensions");
    let resized = image::imageops::resize(&rgb, width as u32, height as u32, FilterType::Nearest);
    Image::from_shape_vec((height, width, 3), resized.into_raw())
        .expect("resized buffer length matches dimensions")
}

fn resize_mask(mask: &Mask, width: usize, height: usize) -> Mask {
    let (h, w) = mask.dim();
    if (h, w) == (height, width) {
        return mask.clone();
    }
    let buf: Vec<u8> = mask.iter().copied().collect();
    let gray = image::GrayImage::from_raw(w as u32, h as u32, buf)
        .expect("mask buffer length matches dimensions");
    let resized = image::imageops::resize(&gray, width as u32, height as u32, FilterType::Nearest);
    Mask::from_shape_vec((height, width), resized.into_raw())
        .expect("resized buffer length matches dimensions")
}
