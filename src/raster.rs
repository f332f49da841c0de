//! Vector-to-raster mask synthesis.
//!
//! Converts WKT polygon annotations in geographic (lon/lat) coordinates into
//! a binary mask aligned to a target raster's pixel grid. The polygon
//! interior is burned with 1 over a zero background using an even-odd
//! scanline fill sampled at pixel centers; a pixel is fully in or out.

use crate::geotransform::{GeoTransform, RasterMeta};
use crate::types::{DatasetError, DatasetResult, ImageId, Mask};
use geo_types::{Geometry, Polygon};
use std::str::FromStr;

/// Rasterize all of `wkts` for one image into a mask of the target's exact
/// width and height. Overlapping polygons are idempotent: covered pixels are
/// always 1. Zero polygons yield an all-zero mask.
///
/// Fails with a geometry error when a polygon does not parse, and with an
/// alignment error when the target transform is degenerate. All scratch
/// geometry lives only for the duration of this call.
pub fn rasterize(image_id: &ImageId, wkts: &[&str], target: &RasterMeta) -> DatasetResult<Mask> {
    let mut mask = Mask::zeros((target.height, target.width));
    if target.height == 0 || target.width == 0 {
        return Ok(mask);
    }

    // Parse everything up front so a malformed polygon aborts before any
    // pixels are burned: a batch either succeeds wholly or fails wholly.
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for wkt in wkts {
        polygons.extend(parse_polygons(image_id, wkt)?);
    }

    for polygon in &polygons {
        let rings = pixel_rings(image_id, polygon, &target.transform)?;
        fill_even_odd(&mut mask, &rings);
    }

    Ok(mask)
}

/// Parse one WKT string into its component polygons.
pub(crate) fn parse_polygons(image_id: &ImageId, wkt: &str) -> DatasetResult<Vec<Polygon<f64>>> {
    let parsed = wkt::Wkt::<f64>::from_str(wkt).map_err(|e| DatasetError::Geometry {
        image_id: image_id.clone(),
        detail: e.to_string(),
    })?;
    let geometry = Geometry::try_from(parsed).map_err(|e| DatasetError::Geometry {
        image_id: image_id.clone(),
        detail: e.to_string(),
    })?;
    match geometry {
        Geometry::Polygon(p) => Ok(vec![p]),
        Geometry::MultiPolygon(mp) => Ok(mp.0),
        other => Err(DatasetError::Geometry {
            image_id: image_id.clone(),
            detail: format!("expected POLYGON or MULTIPOLYGON, got {other:?}"),
        }),
    }
}

/// Project every ring of `polygon` from geographic coordinates into
/// fractional pixel coordinates via the inverse geotransform.
fn pixel_rings(
    image_id: &ImageId,
    polygon: &Polygon<f64>,
    transform: &GeoTransform,
) -> DatasetResult<Vec<Vec<(f64, f64)>>> {
    let mut rings = Vec::with_capacity(1 + polygon.interiors().len());
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors().iter()) {
        let mut projected = Vec::with_capacity(ring.0.len());
        for coord in &ring.0 {
            let (col, row) = transform.pixel_of(coord.x, coord.y).ok_or_else(|| {
                DatasetError::Alignment {
                    image_id: image_id.clone(),
                    detail: "geotransform is not invertible".to_string(),
                }
            })?;
            projected.push((col, row));
        }
        rings.push(projected);
    }
    Ok(rings)
}

/// Even-odd scanline fill across all rings of one polygon, so interior
/// rings (holes) cancel the exterior. Burns only 1s, leaving pixels set by
/// earlier polygons untouched.
fn fill_even_odd(mask: &mut Mask, rings: &[Vec<(f64, f64)>]) {
    let (height, width) = mask.dim();
    let mut crossings: Vec<f64> = Vec::new();

    for row in 0..height {
        let y = row as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            if ring.len() < 2 {
                continue;
            }
            for edge in ring.windows(2) {
                let (x0, y0) = edge[0];
                let (x1, y1) = edge[1];
                // Half-open test so a scanline through a vertex counts once.
                if (y0 <= y) != (y1 <= y) {
                    let t = (y - y0) / (y1 - y0);
                    crossings.push(x0 + t * (x1 - x0));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            // Pixel centers at col + 0.5 inside [span0, span1).
            let start = (span[0] - 0.5).ceil().max(0.0) as usize;
            let end = ((span[1] - 0.5).ceil().max(0.0) as usize).min(width);
            for col in start..end {
                mask[[row, col]] = 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotransform::GeoTransform;

    fn meta(width: usize, height: usize) -> RasterMeta {
        RasterMeta {
            width,
            height,
            transform: GeoTransform::north_up(10.0, 50.0, 0.001, -0.001),
            projection: "EPSG:4326".to_string(),
        }
    }

    fn id() -> ImageId {
        ImageId::from("tile_0")
    }

    /// WKT polygon whose corners are the geographic positions of the given
    /// pixel corners under `meta`'s transform.
    fn pixel_rect_wkt(meta: &RasterMeta, c0: f64, r0: f64, c1: f64, r1: f64) -> String {
        let t = &meta.transform;
        let corners = [(c0, r0), (c1, r0), (c1, r1), (c0, r1), (c0, r0)];
        let coords: Vec<String> = corners
            .iter()
            .map(|&(c, r)| {
                let (x, y) = t.apply(c, r);
                format!("{x} {y}")
            })
            .collect();
        format!("POLYGON (({}))", coords.join(", "))
    }

    #[test]
    fn zero_polygons_yield_all_zeros() {
        let mask = rasterize(&id(), &[], &meta(8, 6)).unwrap();
        assert_eq!(mask.dim(), (6, 8));
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn full_extent_polygon_yields_all_ones() {
        let m = meta(8, 6);
        let wkt = pixel_rect_wkt(&m, 0.0, 0.0, 8.0, 6.0);
        let mask = rasterize(&id(), &[wkt.as_str()], &m).unwrap();
        assert!(mask.iter().all(|&v| v == 1));
    }

    #[test]
    fn rect_covers_exact_pixel_footprint() {
        let m = meta(10, 10);
        let wkt = pixel_rect_wkt(&m, 2.0, 3.0, 6.0, 7.0);
        let mask = rasterize(&id(), &[wkt.as_str()], &m).unwrap();
        assert_eq!(mask.iter().map(|&v| v as usize).sum::<usize>(), 16);
        assert_eq!(mask[[3, 2]], 1);
        assert_eq!(mask[[6, 5]], 1);
        assert_eq!(mask[[2, 2]], 0);
        assert_eq!(mask[[3, 6]], 0);
    }

    #[test]
    fn overlapping_polygons_are_idempotent() {
        let m = meta(10, 10);
        let a = pixel_rect_wkt(&m, 1.0, 1.0, 5.0, 5.0);
        let b = pixel_rect_wkt(&m, 3.0, 3.0, 7.0, 7.0);
        let mask = rasterize(&id(), &[a.as_str(), b.as_str()], &m).unwrap();
        // 16 + 16 - 4 overlapping pixels, all burned to exactly 1.
        assert_eq!(mask.iter().map(|&v| v as usize).sum::<usize>(), 28);
        assert!(mask.iter().all(|&v| v <= 1));
    }

    #[test]
    fn interior_ring_is_left_unburned() {
        let m = meta(10, 10);
        let t = &m.transform;
        let ring = |c0: f64, r0: f64, c1: f64, r1: f64| {
            let corners = [(c0, r0), (c1, r0), (c1, r1), (c0, r1), (c0, r0)];
            corners
                .iter()
                .map(|&(c, r)| {
                    let (x, y) = t.apply(c, r);
                    format!("{x} {y}")
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let wkt = format!(
            "POLYGON (({}), ({}))",
            ring(1.0, 1.0, 9.0, 9.0),
            ring(4.0, 4.0, 6.0, 6.0)
        );
        let mask = rasterize(&id(), &[wkt.as_str()], &m).unwrap();
        assert_eq!(mask[[2, 2]], 1);
        assert_eq!(mask[[4, 4]], 0);
        assert_eq!(mask[[5, 5]], 0);
        assert_eq!(mask.iter().map(|&v| v as usize).sum::<usize>(), 64 - 4);
    }

    #[test]
    fn malformed_wkt_is_a_geometry_error() {
        let err = rasterize(&id(), &["POLYGON ((not numbers))"], &meta(4, 4)).unwrap_err();
        assert!(matches!(err, DatasetError::Geometry { .. }));
    }

    #[test]
    fn non_polygon_wkt_is_rejected() {
        let err = rasterize(&id(), &["POINT (10 50)"], &meta(4, 4)).unwrap_err();
        assert!(matches!(err, DatasetError::Geometry { .. }));
    }

    #[test]
    fn degenerate_transform_is_an_alignment_error() {
        let m = RasterMeta {
            width: 4,
            height: 4,
            transform: GeoTransform::north_up(0.0, 0.0, 0.0, 0.0),
            projection: String::new(),
        };
        let err = rasterize(&id(), &["POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))"], &m).unwrap_err();
        assert!(matches!(err, DatasetError::Alignment { .. }));
    }

    #[test]
    fn rasterize_is_deterministic() {
        let m = meta(16, 16);
        let wkt = pixel_rect_wkt(&m, 2.5, 1.5, 11.0, 13.25);
        let first = rasterize(&id(), &[wkt.as_str()], &m).unwrap();
        let second = rasterize(&id(), &[wkt.as_str()], &m).unwrap();
        assert_eq!(first, second);
    }
}
