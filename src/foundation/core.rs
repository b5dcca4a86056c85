use crate::foundation::error::{DispatchError, DispatchResult};

/// Logical buffer extents along the four launch axes.
///
/// A zero extent means the axis is unset (a 1D buffer has `y == 0`). Iteration treats unset axes
/// as a single step, see [`Extents::at_least_one`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Extents {
    /// Elements per row.
    pub x: u32,
    /// Rows per plane.
    pub y: u32,
    /// Planes per array layer.
    pub z: u32,
    /// Array layers.
    pub array: u32,
}

impl Extents {
    /// One-dimensional extents.
    pub fn new_1d(x: u32) -> Self {
        Self {
            x,
            ..Self::default()
        }
    }

    /// Two-dimensional extents.
    pub fn new_2d(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// Three-dimensional extents.
    pub fn new_3d(x: u32, y: u32, z: u32) -> Self {
        Self {
            x,
            y,
            z,
            array: 0,
        }
    }

    /// Same extents with `array` layers.
    pub fn with_array(self, array: u32) -> Self {
        Self { array, ..self }
    }

    /// Floor every axis to 1 so flat axes still yield one iteration step.
    pub fn at_least_one(self) -> Self {
        Self {
            x: self.x.max(1),
            y: self.y.max(1),
            z: self.z.max(1),
            array: self.array.max(1),
        }
    }

    /// Number of addressable elements once unset axes are floored to 1.
    pub fn element_count(self) -> u64 {
        let e = self.at_least_one();
        u64::from(e.x) * u64::from(e.y) * u64::from(e.z) * u64::from(e.array)
    }
}

/// One position of the iteration domain, handed to every kernel invocation.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
pub struct Coord {
    /// Array layer.
    pub array: u32,
    /// Plane.
    pub z: u32,
    /// Row.
    pub y: u32,
    /// Column.
    pub x: u32,
}

impl Coord {
    /// Build a coordinate from `(x, y, z, array)`.
    pub fn new(x: u32, y: u32, z: u32, array: u32) -> Self {
        Self { array, z, y, x }
    }
}

/// Half-open axis range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AxisRange {
    /// Inclusive range start.
    pub start: u32,
    /// Exclusive range end.
    pub end: u32,
}

impl AxisRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: u32, end: u32) -> DispatchResult<Self> {
        if start > end {
            return Err(DispatchError::validation("AxisRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Full range `[0, extent)`.
    pub fn full(extent: u32) -> Self {
        Self {
            start: 0,
            end: extent,
        }
    }

    /// Number of indices contained in the range.
    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Return `true` when the range has no indices.
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// Return `true` when `v` is inside `[start, end)`.
    pub fn contains(self, v: u32) -> bool {
        self.start <= v && v < self.end
    }

    /// Iterate indices in increasing order.
    pub fn iter(self) -> std::ops::Range<u32> {
        self.start..self.end
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
