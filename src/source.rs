//! Resolving an image identifier to its pixel image and rasterized mask.

use crate::geotransform::RasterMeta;
use crate::raster::rasterize;
use crate::table::AnnotationRow;
use crate::types::{DatasetError, DatasetResult, Image, ImageId, Mask};

/// A loaded raster: pixel data plus the metadata the mask must share.
#[derive(Debug, Clone)]
pub struct GeoImage {
    /// Pixels in (height, width, channel) layout.
    pub pixels: Image,
    pub meta: RasterMeta,
}

/// The external image-loading collaborator. A provider must expose the
/// pixel array and the raster metadata (width, height, geotransform,
/// projection) for the same file; if metadata cannot be read it should
/// return an alignment error rather than fabricating a transform.
pub trait ImageProvider {
    fn load_image(&self, image_id: &ImageId) -> DatasetResult<GeoImage>;
}

/// An (image, mask) pair for one image identifier. The mask is always
/// pixel-exact with the image at native resolution; any resizing happens
/// downstream in batch assembly.
#[derive(Debug, Clone)]
pub struct Sample {
    pub image: Image,
    pub mask: Mask,
}

/// Resolves identifiers against a scoped set of annotation rows.
pub struct SampleSource<'a, P: ImageProvider> {
    provider: &'a P,
    rows: Vec<&'a AnnotationRow>,
}

impl<'a, P: ImageProvider> SampleSource<'a, P> {
    pub fn new(provider: &'a P, rows: Vec<&'a AnnotationRow>) -> Self {
        Self { provider, rows }
    }

    /// Load the image and burn every polygon sharing its id into a mask
    /// aligned to the image's own raster metadata.
    pub fn resolve(&self, image_id: &ImageId) -> DatasetResult<Sample> {
        let wkts: Vec<&str> = self
            .rows
            .iter()
            .filter(|row| &row.image_id == image_id)
            .map(|row| row.wkt.as_str())
            .collect();
        if wkts.is_empty() {
            return Err(DatasetError::UnknownImageId(image_id.clone()));
        }

        let geo_image = self.provider.load_image(image_id)?;
        let (height, width, _) = geo_image.pixels.dim();
        if height != geo_image.meta.height || width != geo_image.meta.width {
            return Err(DatasetError::Alignment {
                image_id: image_id.clone(),
                detail: format!(
                    "pixel array is {height}x{width} but raster metadata says {}x{}",
                    geo_image.meta.height, geo_image.meta.width
                ),
            });
        }

        let mask = rasterize(image_id, &wkts, &geo_image.meta)?;
        debug_assert_eq!(mask.dim(), (height, width));
        Ok(Sample {
            image: geo_image.pixels,
            mask,
        })
    }
}
