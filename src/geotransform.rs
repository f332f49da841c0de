//! Affine geotransform between pixel and geographic coordinates.

use serde::{Deserialize, Serialize};

/// Six-coefficient affine transform in GDAL order: x origin, pixel width,
/// row rotation, y origin, column rotation, pixel height (negative for
/// north-up rasters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_coefficients(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// North-up transform with no rotation terms.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::from_coefficients([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    /// Map fractional pixel coordinates (column, row) to geographic (x, y).
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Map geographic (x, y) back to fractional pixel coordinates
    /// (column, row). Returns `None` when the transform is degenerate
    /// (zero determinant), in which case pixel alignment is undefined.
    pub fn pixel_of(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (dx * self.pixel_height - dy * self.row_rotation) / det;
        let row = (dy * self.pixel_width - dx * self.col_rotation) / det;
        Some((col, row))
    }
}

/// Raster metadata a mask must share with its source image: same transform,
/// projection, width, and height, or polygon-to-pixel alignment is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMeta {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub projection: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_and_invert_roundtrip() {
        let gt = GeoTransform::north_up(-115.3, 36.2, 0.0005, -0.0005);
        let (x, y) = gt.apply(12.0, 34.0);
        let (col, row) = gt.pixel_of(x, y).unwrap();
        assert!((col - 12.0).abs() < 1e-9);
        assert!((row - 34.0).abs() < 1e-9);
    }

    #[test]
    fn roundtrip_with_rotation_terms() {
        let gt = GeoTransform::from_coefficients([10.0, 0.001, 0.0002, 20.0, -0.0001, -0.001]);
        let (x, y) = gt.apply(7.5, 3.25);
        let (col, row) = gt.pixel_of(x, y).unwrap();
        assert!((col - 7.5).abs() < 1e-9);
        assert!((row - 3.25).abs() < 1e-9);
    }

    #[test]
    fn degenerate_transform_has_no_inverse() {
        let gt = GeoTransform::north_up(0.0, 0.0, 0.0, 0.0);
        assert!(gt.pixel_of(1.0, 1.0).is_none());
    }
}
