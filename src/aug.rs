//! Joint image/mask augmentation.
//!
//! The dataset facade consumes augmentation behind [`Augmenter`]: one
//! synthetic sample out per sample in, with the geometric transform applied
//! identically to the image and its mask so correspondence is preserved
//! pixel-for-pixel.

use crate::types::{Image, Mask};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Maps a batch of image/mask pairs to an equally sized batch of
/// transformed pairs. Implementations must keep cardinality and preserve
/// the pixel correspondence between each image and its mask.
pub trait Augmenter {
    fn augment(&mut self, images: &[Image], masks: &[Mask]) -> (Vec<Image>, Vec<Mask>);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugConfig {
    /// Probability of mirroring along the width axis.
    pub flip_horizontal_prob: f32,
    /// Probability of mirroring along the height axis.
    pub flip_vertical_prob: f32,
    /// Max translation per axis, as a fraction of that axis' length.
    /// Vacated pixels are zero-filled in both image and mask.
    pub max_shift_frac: f32,
    /// Seed for reproducible draws; `None` uses the thread RNG.
    pub seed: Option<u64>,
}

impl Default for AugConfig {
    fn default() -> Self {
        Self {
            flip_horizontal_prob: 0.5,
            flip_vertical_prob: 0.5,
            max_shift_frac: 0.1,
            seed: None,
        }
    }
}

/// Default augmenter: per-sample flips and small integer pixel shifts.
#[derive(Debug, Clone)]
pub struct ShiftFlipAugmenter {
    cfg: AugConfig,
}

impl ShiftFlipAugmenter {
    pub fn new(cfg: AugConfig) -> Self {
        Self { cfg }
    }

    fn transform_pair(&self, image: &Image, mask: &Mask, rng: &mut dyn RngCore) -> (Image, Mask) {
        let mut image = image.clone();
        let mut mask = mask.clone();

        if self.cfg.flip_horizontal_prob > 0.0
            && rng.random_range(0.0..1.0f32) < self.cfg.flip_horizontal_prob
        {
            image.invert_axis(Axis(1));
            mask.invert_axis(Axis(1));
        }
        if self.cfg.flip_vertical_prob > 0.0
            && rng.random_range(0.0..1.0f32) < self.cfg.flip_vertical_prob
        {
            image.invert_axis(Axis(0));
            mask.invert_axis(Axis(0));
        }

        if self.cfg.max_shift_frac > 0.0 {
            let (height, width) = mask.dim();
            let max_dy = (height as f32 * self.cfg.max_shift_frac) as isize;
            let max_dx = (width as f32 * self.cfg.max_shift_frac) as isize;
            let dy = if max_dy > 0 {
                rng.random_range(-(max_dy as i64)..=max_dy as i64) as isize
            } else {
                0
            };
            let dx = if max_dx > 0 {
                rng.random_range(-(max_dx as i64)..=max_dx as i64) as isize
            } else {
                0
            };
            if dy != 0 || dx != 0 {
                image = shift_image(&image, dy, dx);
                mask = shift_mask(&mask, dy, dx);
            }
        }

        (image, mask)
    }
}

impl Augmenter for ShiftFlipAugmenter {
    fn augment(&mut self, images: &[Image], masks: &[Mask]) -> (Vec<Image>, Vec<Mask>) {
        let mut out_images = Vec::with_capacity(images.len());
        let mut out_masks = Vec::with_capacity(masks.len());
        for (index, (image, mask)) in images.iter().zip(masks.iter()).enumerate() {
            // Seeded draws are per-sample deterministic, independent of
            // batch composition.
            let mut seeded;
            let mut local;
            let rng: &mut dyn RngCore = match self.cfg.seed {
                Some(seed) => {
                    seeded = StdRng::seed_from_u64(seed ^ index as u64);
                    &mut seeded
                }
                None => {
                    local = rand::rng();
                    &mut local
                }
            };
            let (aug_image, aug_mask) = self.transform_pair(image, mask, rng);
            out_images.push(aug_image);
            out_masks.push(aug_mask);
        }
        (out_images, out_masks)
    }
}

fn shift_image(image: &Image, dy: isize, dx: isize) -> Image {
    let (height, width, channels) = image.dim();
    let mut out = Image::zeros((height, width, channels));
    for y in 0..height {
        let Some(src_y) = offset(y, -dy, height) else {
            continue;
        };
        for x in 0..width {
            let Some(src_x) = offset(x, -dx, width) else {
                continue;
            };
            for c in 0..channels {
                out[[y, x, c]] = image[[src_y, src_x, c]];
            }
        }
    }
    out
}

fn shift_mask(mask: &Mask, dy: isize, dx: isize) -> Mask {
    let (height, width) = mask.dim();
    let mut out = Mask::zeros((height, width));
    for y in 0..height {
        let Some(src_y) = offset(y, -dy, height) else {
            continue;
        };
        for x in 0..width {
            let Some(src_x) = offset(x, -dx, width) else {
                continue;
            };
            out[[y, x]] = mask[[src_y, src_x]];
        }
    }
    out
}

fn offset(index: usize, delta: isize, len: usize) -> Option<usize> {
    let shifted = index as isize + delta;
    (shifted >= 0 && (shifted as usize) < len).then_some(shifted as usize)
}
