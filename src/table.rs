//! Annotation table: polygon records grouped by image identity.
//!
//! Ingestion (CSV parsing, path handling) is owned by the caller; the table
//! takes in-memory records, derives the square-footage column from the
//! geometry, and serves grouped lookups and filtered views.

use crate::raster::parse_polygons;
use crate::types::{DatasetResult, ImageId};
use geo::ChamberlainDuquetteArea;

const SQUARE_FEET_PER_SQUARE_METER: f64 = 10.763_910_416_709_722;

/// One annotation as supplied by the caller: an image identifier plus a
/// polygon geometry in geographic (lon/lat) WKT.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRecord {
    pub image_id: ImageId,
    pub wkt: String,
}

impl PolygonRecord {
    pub fn new(image_id: impl Into<ImageId>, wkt: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            wkt: wkt.into(),
        }
    }
}

/// A record with its derived geodesic area in square feet.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub image_id: ImageId,
    pub wkt: String,
    pub sq_ft: f64,
}

/// Restricts which annotation rows are visible to a dataset view.
pub enum RecordFilter {
    /// The unrestricted view; every row passes.
    All,
    Predicate(Box<dyn Fn(&AnnotationRow) -> bool>),
}

impl RecordFilter {
    pub fn predicate(f: impl Fn(&AnnotationRow) -> bool + 'static) -> Self {
        RecordFilter::Predicate(Box::new(f))
    }

    pub fn accepts(&self, row: &AnnotationRow) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Predicate(f) => f(row),
        }
    }
}

impl Default for RecordFilter {
    fn default() -> Self {
        RecordFilter::All
    }
}

impl std::fmt::Debug for RecordFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFilter::All => f.write_str("RecordFilter::All"),
            RecordFilter::Predicate(_) => f.write_str("RecordFilter::Predicate(..)"),
        }
    }
}

/// Immutable once constructed; loaded once per dataset and then read-only.
#[derive(Debug, Clone)]
pub struct AnnotationTable {
    rows: Vec<AnnotationRow>,
}

impl AnnotationTable {
    /// Build the table, deriving each record's area. A record whose WKT does
    /// not parse surfaces a geometry error here, before any batch work.
    pub fn from_records(records: Vec<PolygonRecord>) -> DatasetResult<Self> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let polygons = parse_polygons(&record.image_id, &record.wkt)?;
            let sq_m: f64 = polygons
                .iter()
                .map(|p| p.chamberlain_duquette_unsigned_area())
                .sum();
            rows.push(AnnotationRow {
                image_id: record.image_id,
                wkt: record.wkt,
                sq_ft: sq_m * SQUARE_FEET_PER_SQUARE_METER,
            });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[AnnotationRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows passing the filter, in table order.
    pub fn visible_rows(&self, filter: &RecordFilter) -> Vec<&AnnotationRow> {
        self.rows.iter().filter(|r| filter.accepts(r)).collect()
    }

    /// Unique visible image ids in first-seen order.
    pub fn unique_ids(&self, filter: &RecordFilter) -> Vec<ImageId> {
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for row in self.rows.iter().filter(|r| filter.accepts(r)) {
            if seen.insert(row.image_id.clone()) {
                ids.push(row.image_id.clone());
            }
        }
        ids
    }

    /// Visible rows sharing `image_id`. Empty when the id is absent or
    /// filtered out; the caller decides whether that is an error.
    pub fn rows_for<'a>(&'a self, image_id: &ImageId, filter: &RecordFilter) -> Vec<&'a AnnotationRow> {
        self.rows
            .iter()
            .filter(|r| &r.image_id == image_id && filter.accepts(r))
            .collect()
    }
}
