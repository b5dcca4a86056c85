use std::ops::Range;

use crate::foundation::core::{AxisRange, Coord, Extents};
use crate::launch::clip::ClipRange;

/// Resolved iteration domain of one launch.
///
/// Built fresh per dispatch from the bound buffer's extents and the caller's clip; never mutated
/// afterwards. Every axis range is non-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationDomain {
    /// Buffer extents with unset axes floored to 1.
    pub dims: Extents,
    /// Column range.
    pub x: AxisRange,
    /// Row range.
    pub y: AxisRange,
    /// Plane range.
    pub z: AxisRange,
    /// Array layer range.
    pub array: AxisRange,
}

impl IterationDomain {
    /// Resolve `clip` against `dims`.
    ///
    /// Returns `None` when any axis collapses to an empty range; that launch does no work.
    pub fn resolve(dims: Extents, clip: &ClipRange) -> Option<Self> {
        let dims = dims.at_least_one();
        let x = resolve_axis("x", dims.x, clip.x.as_ref())?;
        let y = resolve_axis("y", dims.y, clip.y.as_ref())?;
        let z = resolve_axis("z", dims.z, clip.z.as_ref())?;
        let array = resolve_axis("array", dims.array, clip.array.as_ref())?;
        Some(Self {
            dims,
            x,
            y,
            z,
            array,
        })
    }

    /// Number of coordinates in the domain.
    pub fn element_count(&self) -> u64 {
        u64::from(self.x.len())
            * u64::from(self.y.len())
            * u64::from(self.z.len())
            * u64::from(self.array.len())
    }

    /// `true` when the domain spans exactly one (array, z) plane.
    pub fn is_single_plane(&self) -> bool {
        self.z.len() == 1 && self.array.len() == 1
    }

    /// Exclusive upper bound on each axis, for checking a view covers the domain.
    pub fn ends(&self) -> Extents {
        Extents {
            x: self.x.end,
            y: self.y.end,
            z: self.z.end,
            array: self.array.end,
        }
    }

    /// All coordinates in `array -> z -> y -> x` nesting order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let Self { x, y, z, array, .. } = *self;
        array.iter().flat_map(move |a| {
            z.iter().flat_map(move |zz| {
                y.iter()
                    .flat_map(move |yy| x.iter().map(move |xx| Coord::new(xx, yy, zz, a)))
            })
        })
    }
}

fn resolve_axis(name: &str, dim: u32, clip: Option<&Range<u32>>) -> Option<AxisRange> {
    let Some(r) = clip else {
        return Some(AxisRange::full(dim));
    };
    debug_assert!(
        r.start <= r.end,
        "clip {name} range {}..{} is inverted",
        r.start,
        r.end
    );
    debug_assert!(
        r.end <= dim,
        "clip {name} end {} exceeds dimension {dim}",
        r.end
    );
    clamp_axis(dim, r.start, r.end)
}

/// Release-build handling of a bad clip: both bounds clamp to `dim`, inverted or empty ranges
/// resolve to `None`.
fn clamp_axis(dim: u32, start: u32, end: u32) -> Option<AxisRange> {
    let start = start.min(dim);
    let end = end.min(dim);
    if start >= end {
        return None;
    }
    Some(AxisRange { start, end })
}

#[cfg(test)]
#[path = "../../tests/unit/launch/domain.rs"]
mod tests;
