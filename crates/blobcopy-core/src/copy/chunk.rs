//! Byte-range planning for multipart transfers.

use std::ops::Range;

/// Ordered byte ranges for one multipart transfer.
///
/// Ranges are contiguous, non-overlapping and cover exactly the size the
/// plan was built from; transferring them in index order reproduces the
/// object.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    ranges: Vec<Range<u64>>,
}

impl ChunkPlan {
    /// Split `total_size` bytes into `chunk_size` ranges; the final range
    /// carries the remainder.
    pub fn build(total_size: u64, chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");

        let mut ranges = Vec::new();
        let mut offset = 0;
        while offset < total_size {
            let end = (offset + chunk_size).min(total_size);
            ranges.push(offset..end);
            offset = end;
        }
        Self { ranges }
    }

    pub fn ranges(&self) -> &[Range<u64>] {
        &self.ranges
    }

    pub fn part_count(&self) -> usize {
        self.ranges.len()
    }
}
