//! Batch planning
//!
//! Maps a page range and a resume point to the ordered list of batches that
//! still have to run.

use crate::batch::BatchDescriptor;
use crate::PlanError;
use chrono::Utc;

/// Plans the batches covering `[resume_offset, total_units)`
///
/// Windows are `units_per_batch` pages wide; the last one is truncated to end
/// at `total_units - 1`. Numbering starts at `first_batch_number` (the caller
/// passes `batches_completed + 1`) so numbers stay globally ordered across
/// resumed runs. An empty list means there is nothing left to do.
///
/// # Example
///
/// ```
/// use pagebatch::batch::plan;
///
/// let batches = plan(20, 5, 10, 3).unwrap();
/// let ranges: Vec<_> = batches.iter().map(|b| (b.start_offset, b.end_offset)).collect();
/// assert_eq!(ranges, vec![(10, 14), (15, 19)]);
/// assert_eq!(batches[0].batch_number, 3);
/// ```
pub fn plan(
    total_units: u64,
    units_per_batch: u64,
    resume_offset: u64,
    first_batch_number: u64,
) -> Result<Vec<BatchDescriptor>, PlanError> {
    if units_per_batch == 0 {
        return Err(PlanError::ZeroBatchSize);
    }
    if resume_offset > total_units {
        return Err(PlanError::ResumeBeyondTotal {
            resume_offset,
            total_units,
        });
    }
    if first_batch_number == 0 {
        return Err(PlanError::ZeroBatchNumber);
    }

    let created_at = Utc::now();
    let mut batches = Vec::new();
    let mut start_offset = resume_offset;
    let mut batch_number = first_batch_number;

    while start_offset < total_units {
        let end_offset = start_offset
            .saturating_add(units_per_batch - 1)
            .min(total_units - 1);

        batches.push(BatchDescriptor {
            batch_number,
            start_offset,
            end_offset,
            created_at,
        });

        start_offset = end_offset + 1;
        batch_number += 1;
    }

    Ok(batches)
}
