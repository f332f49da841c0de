//! Deterministic batch planning over a partition's identifier sequence.
//!
//! Planning never touches pixels: it only slices the ordered id sequence.
//! When augmentation later doubles a batch, the planner halves the slice so
//! the assembled batch still reaches the configured size.

use crate::types::{DatasetError, DatasetResult, ImageId};

/// Number of ids to pull per batch before augmentation doubles them.
/// Augmentation requires an even batch size; this is checked here and at
/// dataset construction so planning fails before any pixel work.
pub fn effective_batch_size(batch_size: usize, augment: bool) -> DatasetResult<usize> {
    if batch_size == 0 {
        return Err(DatasetError::Precondition(
            "batch size must be positive".to_string(),
        ));
    }
    if augment {
        if batch_size % 2 != 0 {
            return Err(DatasetError::Precondition(format!(
                "batch size must be even when augmentation is enabled, got {batch_size}"
            )));
        }
        Ok(batch_size / 2)
    } else {
        Ok(batch_size)
    }
}

/// `ceil(partition_len / effective)`; an empty partition yields 0.
pub fn batch_count(partition_len: usize, effective: usize) -> usize {
    partition_len.div_ceil(effective)
}

/// The contiguous id slice for one batch index, clipped to the partition's
/// end. An index at or beyond the batch count yields an empty slice, never
/// an error. Identical inputs always yield the identical slice.
pub fn batch_slice(partition: &[ImageId], effective: usize, index: usize) -> &[ImageId] {
    let start = index.saturating_mul(effective).min(partition.len());
    let end = start.saturating_add(effective).min(partition.len());
    &partition[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<ImageId> {
        (0..n).map(|i| ImageId::from(format!("img_{i}"))).collect()
    }

    #[test]
    fn effective_size_halves_under_augmentation() {
        assert_eq!(effective_batch_size(16, true).unwrap(), 8);
        assert_eq!(effective_batch_size(16, false).unwrap(), 16);
    }

    #[test]
    fn odd_batch_size_with_augmentation_fails_fast() {
        let err = effective_batch_size(15, true).unwrap_err();
        assert!(matches!(err, DatasetError::Precondition(_)));
        assert_eq!(effective_batch_size(15, false).unwrap(), 15);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(effective_batch_size(0, false).is_err());
        assert!(effective_batch_size(0, true).is_err());
    }

    #[test]
    fn empty_partition_yields_zero_batches() {
        assert_eq!(batch_count(0, 8), 0);
        assert_eq!(batch_count(0, 1), 0);
        assert!(batch_slice(&[], 8, 0).is_empty());
    }

    #[test]
    fn count_rounds_up_for_partial_last_batch() {
        assert_eq!(batch_count(17, 8), 3);
        assert_eq!(batch_count(16, 8), 2);
        assert_eq!(batch_count(1, 8), 1);
    }

    #[test]
    fn slices_are_disjoint_and_reproduce_the_partition() {
        let partition = ids(17);
        let effective = 8;
        let mut concatenated = Vec::new();
        for index in 0..batch_count(partition.len(), effective) {
            concatenated.extend_from_slice(batch_slice(&partition, effective, index));
        }
        assert_eq!(concatenated, partition);
    }

    #[test]
    fn slice_beyond_count_is_empty_not_an_error() {
        let partition = ids(5);
        assert!(batch_slice(&partition, 8, 1).is_empty());
        assert!(batch_slice(&partition, 8, 1000).is_empty());
    }

    #[test]
    fn last_batch_is_clipped() {
        let partition = ids(10);
        assert_eq!(batch_slice(&partition, 8, 1).len(), 2);
    }
}
