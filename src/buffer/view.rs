use crate::foundation::core::{Coord, Extents};
use crate::foundation::error::{DispatchError, DispatchResult};

/// How to compute a byte offset for any coordinate of a buffer.
///
/// Offsets follow one formula everywhere:
/// `array * array_stride + z * plane_stride + y * row_stride + x * element_stride`, where
/// `plane_stride = row_stride * y_extent` and `array_stride = plane_stride * z_extent` (unset
/// extents count as 1). A tightly packed buffer is the case `row_stride == x_extent * element_stride`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StridedLayout {
    extents: Extents,
    element_stride: usize,
    row_stride: usize,
    byte_len: usize,
}

impl StridedLayout {
    /// Create a layout with an explicit row stride (rows may carry trailing padding).
    pub fn new(extents: Extents, element_stride: usize, row_stride: usize) -> DispatchResult<Self> {
        if element_stride == 0 {
            return Err(DispatchError::validation(
                "layout element_stride must be > 0",
            ));
        }
        let e = extents.at_least_one();
        let min_row = (e.x as usize)
            .checked_mul(element_stride)
            .ok_or_else(|| DispatchError::validation("layout row size overflows usize"))?;
        if row_stride < min_row {
            return Err(DispatchError::validation(format!(
                "layout row_stride {row_stride} is smaller than one row ({min_row} bytes)"
            )));
        }

        let byte_len = (|| {
            let plane = row_stride.checked_mul(e.y as usize)?;
            let layer = plane.checked_mul(e.z as usize)?;
            let last = layer
                .checked_mul(e.array as usize - 1)?
                .checked_add(plane.checked_mul(e.z as usize - 1)?)?
                .checked_add(row_stride.checked_mul(e.y as usize - 1)?)?
                .checked_add(min_row)?;
            Some(last)
        })()
        .ok_or_else(|| DispatchError::validation("layout byte length overflows usize"))?;

        Ok(Self {
            extents,
            element_stride,
            row_stride,
            byte_len,
        })
    }

    /// Create a tightly packed layout (`row_stride == x * element_size`).
    pub fn packed(extents: Extents, element_size: usize) -> DispatchResult<Self> {
        let row = (extents.x.max(1) as usize)
            .checked_mul(element_size)
            .ok_or_else(|| DispatchError::validation("layout row size overflows usize"))?;
        Self::new(extents, element_size, row)
    }

    /// Logical extents as supplied (unset axes remain 0).
    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Bytes between neighbouring elements of a row; also the size of one kernel element.
    pub fn element_stride(&self) -> usize {
        self.element_stride
    }

    /// Bytes between the starts of neighbouring rows.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Bytes between the starts of neighbouring planes.
    pub fn plane_stride(&self) -> usize {
        self.row_stride * self.extents.y.max(1) as usize
    }

    /// Bytes between the starts of neighbouring array layers.
    pub fn array_stride(&self) -> usize {
        self.plane_stride() * self.extents.z.max(1) as usize
    }

    /// Minimum number of bytes a backing slice needs.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Return `true` when `c` addresses an element inside the extents.
    pub fn contains(&self, c: Coord) -> bool {
        let e = self.extents.at_least_one();
        c.x < e.x && c.y < e.y && c.z < e.z && c.array < e.array
    }

    /// Byte offset of the first byte of element `c`.
    ///
    /// `c` must be inside the extents; out-of-range coordinates trip a debug assertion and are
    /// caught by slice bounds checks when the offset is used.
    pub fn offset(&self, c: Coord) -> usize {
        debug_assert!(self.contains(c), "coordinate {c:?} outside {:?}", self.extents);
        c.array as usize * self.array_stride()
            + c.z as usize * self.plane_stride()
            + c.y as usize * self.row_stride
            + c.x as usize * self.element_stride
    }
}

/// Read-only strided view over a borrowed input buffer.
#[derive(Clone, Copy, Debug)]
pub struct BufferView<'a> {
    data: &'a [u8],
    layout: StridedLayout,
}

impl<'a> BufferView<'a> {
    /// Wrap `data` with `layout`, checking the slice is long enough.
    pub fn new(data: &'a [u8], layout: StridedLayout) -> DispatchResult<Self> {
        check_len(data.len(), &layout)?;
        Ok(Self { data, layout })
    }

    /// Wrap a tightly packed buffer.
    pub fn packed(data: &'a [u8], extents: Extents, element_size: usize) -> DispatchResult<Self> {
        Self::new(data, StridedLayout::packed(extents, element_size)?)
    }

    /// Layout of this view.
    pub fn layout(&self) -> &StridedLayout {
        &self.layout
    }

    /// Underlying bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Bytes of element `c` (exactly `element_stride` long).
    pub fn element(&self, c: Coord) -> &'a [u8] {
        let off = self.layout.offset(c);
        &self.data[off..off + self.layout.element_stride]
    }
}

/// Exclusive strided view over a borrowed output buffer.
#[derive(Debug)]
pub struct BufferViewMut<'a> {
    data: &'a mut [u8],
    layout: StridedLayout,
}

impl<'a> BufferViewMut<'a> {
    /// Wrap `data` with `layout`, checking the slice is long enough.
    pub fn new(data: &'a mut [u8], layout: StridedLayout) -> DispatchResult<Self> {
        check_len(data.len(), &layout)?;
        Ok(Self { data, layout })
    }

    /// Wrap a tightly packed buffer.
    pub fn packed(
        data: &'a mut [u8],
        extents: Extents,
        element_size: usize,
    ) -> DispatchResult<Self> {
        let layout = StridedLayout::packed(extents, element_size)?;
        Self::new(data, layout)
    }

    /// Layout of this view.
    pub fn layout(&self) -> &StridedLayout {
        &self.layout
    }

    /// Mutable bytes of element `c` (exactly `element_stride` long).
    pub fn element_mut(&mut self, c: Coord) -> &mut [u8] {
        let off = self.layout.offset(c);
        &mut self.data[off..off + self.layout.element_stride]
    }

    /// Give up the view and return the raw bytes with their layout.
    pub(crate) fn into_parts(self) -> (&'a mut [u8], StridedLayout) {
        (self.data, self.layout)
    }
}

fn check_len(len: usize, layout: &StridedLayout) -> DispatchResult<()> {
    if len < layout.byte_len() {
        return Err(DispatchError::validation(format!(
            "buffer holds {len} bytes but its layout needs {}",
            layout.byte_len()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/view.rs"]
mod tests;
