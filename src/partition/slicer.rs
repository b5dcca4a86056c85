use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::core::{AxisRange, Extents};

/// Slices handed out per worker. More, smaller slices let early finishers pick up work instead of
/// waiting on one long chunk.
pub const DEFAULT_OVERSUBSCRIPTION: u32 = 4;

/// Axis a parallel launch is cut along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceAxis {
    /// Slices are row ranges; each row is walked left to right.
    Rows,
    /// Slices are column ranges of a single row.
    Columns,
}

impl SliceAxis {
    /// Rows when the buffer has more than one row, columns otherwise.
    pub fn choose(dims: Extents) -> Self {
        if dims.y > 1 { Self::Rows } else { Self::Columns }
    }
}

/// Length of one slice: `axis_extent / (worker_count * oversubscription)`, floored to 1.
///
/// `axis_extent` is the clipped length of the sliced axis, not the full buffer dimension.
pub fn slice_size(axis_extent: u32, worker_count: usize, oversubscription: u32) -> u32 {
    let divisor = (worker_count.max(1) as u64).saturating_mul(u64::from(oversubscription.max(1)));
    let size = u64::from(axis_extent) / divisor;
    (size as u32).max(1)
}

/// Number of non-empty slices `axis` splits into.
pub fn slice_count(axis: AxisRange, slice_size: u32) -> usize {
    axis.len().div_ceil(slice_size.max(1)) as usize
}

/// Sub-range of `axis` covered by slice `index`; empty once `index` runs past the end.
pub fn slice_range(index: usize, slice_size: u32, axis: AxisRange) -> AxisRange {
    let size = u64::from(slice_size);
    let end_bound = u64::from(axis.end);
    let start = (index as u64)
        .saturating_mul(size)
        .saturating_add(u64::from(axis.start));
    let end = start.saturating_add(size).min(end_bound);
    AxisRange {
        start: start.min(end_bound) as u32,
        end: end as u32,
    }
}

/// One slice handed to a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimedSlice {
    /// Ticket drawn from the shared counter.
    pub index: usize,
    /// Indices along the sliced axis.
    pub range: AxisRange,
}

impl ClaimedSlice {
    /// An empty slice tells the worker to stop.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Draw the next slice ticket from `counter`.
///
/// Lock-free; any number of callers may race on the same counter and each ticket is handed out
/// once. Callers stop at the first empty slice.
pub fn claim_next_slice(counter: &AtomicUsize, slice_size: u32, axis: AxisRange) -> ClaimedSlice {
    let index = counter.fetch_add(1, Ordering::Relaxed);
    ClaimedSlice {
        index,
        range: slice_range(index, slice_size, axis),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/partition/slicer.rs"]
mod tests;
