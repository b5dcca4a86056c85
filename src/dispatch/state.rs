use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

use crate::buffer::view::{BufferView, BufferViewMut, StridedLayout};
use crate::foundation::core::{AxisRange, Coord};
use crate::kernel::{ElementArgs, Kernel};
use crate::launch::domain::IterationDomain;
use crate::partition::slicer::{SliceAxis, claim_next_slice, slice_count, slice_range};

/// Shared state of one parallel launch.
///
/// Created when the launch goes parallel and dropped when it returns. Workers only read it, apart
/// from the slice counter and taking their claimed output window.
pub(crate) struct DispatchState<'a, K: ?Sized> {
    kernel: &'a K,
    input: Option<BufferView<'a>>,
    output: Option<OutputSlices<'a>>,
    user: &'a [u8],
    domain: IterationDomain,
    axis: SliceAxis,
    slice_size: u32,
    slice_count: usize,
    counter: AtomicUsize,
}

impl<'a, K: Kernel + ?Sized> DispatchState<'a, K> {
    /// `domain` must be a single plane.
    pub(crate) fn new(
        kernel: &'a K,
        input: Option<BufferView<'a>>,
        output: Option<BufferViewMut<'a>>,
        user: &'a [u8],
        domain: IterationDomain,
        axis: SliceAxis,
        slice_size: u32,
    ) -> Self {
        debug_assert!(domain.is_single_plane());
        let slice_count = slice_count(sliced_range(&domain, axis), slice_size);
        let output = output.map(|o| OutputSlices::split(o, &domain, axis, slice_size));
        Self {
            kernel,
            input,
            output,
            user,
            domain,
            axis,
            slice_size,
            slice_count,
            counter: AtomicUsize::new(0),
        }
    }

    pub(crate) fn slice_count(&self) -> usize {
        self.slice_count
    }

    /// Worker loop: claim slices until the counter runs past the last one.
    pub(crate) fn run_worker(&self, worker: usize) {
        let axis_range = sliced_range(&self.domain, self.axis);
        let z = self.domain.z.start;
        let a = self.domain.array.start;
        loop {
            let slice = claim_next_slice(&self.counter, self.slice_size, axis_range);
            if slice.is_empty() {
                return;
            }
            tracing::trace!(
                worker,
                slice = slice.index,
                start = slice.range.start,
                end = slice.range.end,
                "claimed slice"
            );

            let mut window = self.output.as_ref().and_then(|o| o.take(slice.index));
            match self.axis {
                SliceAxis::Rows => {
                    for y in slice.range.iter() {
                        for x in self.domain.x.iter() {
                            self.invoke_at(Coord::new(x, y, z, a), window.as_mut());
                        }
                    }
                }
                SliceAxis::Columns => {
                    let y = self.domain.y.start;
                    for x in slice.range.iter() {
                        self.invoke_at(Coord::new(x, y, z, a), window.as_mut());
                    }
                }
            }
        }
    }

    fn invoke_at(&self, coord: Coord, window: Option<&mut OutputWindow<'a>>) {
        let input = self.input.as_ref().map(|v| v.element(coord));
        let output = match (window, self.output.as_ref()) {
            (Some(w), Some(o)) => Some(w.element_mut(&o.layout, coord)),
            _ => None,
        };
        self.kernel.invoke(ElementArgs {
            input,
            output,
            user: self.user,
            coord,
        });
    }
}

fn sliced_range(domain: &IterationDomain, axis: SliceAxis) -> AxisRange {
    match axis {
        SliceAxis::Rows => domain.y,
        SliceAxis::Columns => domain.x,
    }
}

/// Exclusive byte window of the output buffer covering one slice.
struct OutputWindow<'a> {
    base: usize,
    bytes: &'a mut [u8],
}

impl OutputWindow<'_> {
    fn element_mut(&mut self, layout: &StridedLayout, coord: Coord) -> &mut [u8] {
        let off = layout.offset(coord) - self.base;
        &mut self.bytes[off..off + layout.element_stride()]
    }
}

/// Output buffer pre-split into one window per slice, indexed by slice ticket.
struct OutputSlices<'a> {
    layout: StridedLayout,
    slots: Vec<Mutex<Option<OutputWindow<'a>>>>,
}

impl<'a> OutputSlices<'a> {
    fn split(
        view: BufferViewMut<'a>,
        domain: &IterationDomain,
        axis: SliceAxis,
        slice_size: u32,
    ) -> Self {
        let (mut rest, layout) = view.into_parts();
        let axis_range = sliced_range(domain, axis);
        let count = slice_count(axis_range, slice_size);
        let (z, a) = (domain.z.start, domain.array.start);

        let mut slots = Vec::with_capacity(count);
        let mut consumed = 0usize;
        for index in 0..count {
            let r = slice_range(index, slice_size, axis_range);
            let (first, last) = match axis {
                SliceAxis::Rows => (
                    Coord::new(domain.x.start, r.start, z, a),
                    Coord::new(domain.x.end - 1, r.end - 1, z, a),
                ),
                SliceAxis::Columns => (
                    Coord::new(r.start, domain.y.start, z, a),
                    Coord::new(r.end - 1, domain.y.start, z, a),
                ),
            };
            let start = layout.offset(first);
            let end = layout.offset(last) + layout.element_stride();

            // Windows ascend and never overlap; bytes between them (row padding, clipped columns)
            // are left untouched.
            let tail = std::mem::take(&mut rest);
            let (_, tail) = tail.split_at_mut(start - consumed);
            let (bytes, tail) = tail.split_at_mut(end - start);
            rest = tail;
            consumed = end;

            slots.push(Mutex::new(Some(OutputWindow { base: start, bytes })));
        }
        Self { layout, slots }
    }

    fn take(&self, index: usize) -> Option<OutputWindow<'a>> {
        let slot = self.slots.get(index)?;
        let window = match slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        debug_assert!(window.is_some(), "slice {index} claimed twice");
        window
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/state.rs"]
mod tests;
