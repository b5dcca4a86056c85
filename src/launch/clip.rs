use std::ops::Range;

/// Optional per-axis sub-range a launch is clipped to.
///
/// `None` on an axis means "the whole dimension". Explicit ranges must satisfy
/// `start <= end <= dim`; `start == end` is an empty launch, anything else outside that is a caller
/// bug (asserted in debug builds, clamped in release).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipRange {
    /// Column range.
    pub x: Option<Range<u32>>,
    /// Row range.
    pub y: Option<Range<u32>>,
    /// Plane range.
    pub z: Option<Range<u32>>,
    /// Array layer range.
    pub array: Option<Range<u32>>,
}

impl ClipRange {
    /// Clip the X axis.
    pub fn x(mut self, r: Range<u32>) -> Self {
        self.x = Some(r);
        self
    }

    /// Clip the Y axis.
    pub fn y(mut self, r: Range<u32>) -> Self {
        self.y = Some(r);
        self
    }

    /// Clip the Z axis.
    pub fn z(mut self, r: Range<u32>) -> Self {
        self.z = Some(r);
        self
    }

    /// Clip the array axis.
    pub fn array(mut self, r: Range<u32>) -> Self {
        self.array = Some(r);
        self
    }

    /// Return `true` when no axis is clipped.
    pub fn is_unclipped(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none() && self.array.is_none()
    }
}

/// Raw launch bounds as they arrive from a script call.
///
/// An axis whose `*_end` is 0 is not clipped and covers the full dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScriptCall {
    /// First column.
    pub x_start: u32,
    /// One past the last column, 0 = whole row.
    pub x_end: u32,
    /// First row.
    pub y_start: u32,
    /// One past the last row, 0 = all rows.
    pub y_end: u32,
    /// First plane.
    pub z_start: u32,
    /// One past the last plane, 0 = all planes.
    pub z_end: u32,
    /// First array layer.
    pub array_start: u32,
    /// One past the last array layer, 0 = all layers.
    pub array_end: u32,
}

impl From<ScriptCall> for ClipRange {
    fn from(sc: ScriptCall) -> Self {
        fn axis(start: u32, end: u32) -> Option<Range<u32>> {
            (end != 0).then_some(start..end)
        }

        Self {
            x: axis(sc.x_start, sc.x_end),
            y: axis(sc.y_start, sc.y_end),
            z: axis(sc.z_start, sc.z_end),
            array: axis(sc.array_start, sc.array_end),
        }
    }
}

/// Per-launch parameters: opaque user bytes plus the optional clip.
#[derive(Clone, Debug, Default)]
pub struct LaunchParams<'a> {
    /// Bytes forwarded verbatim to every kernel invocation.
    pub user: &'a [u8],
    /// Sub-range to iterate over.
    pub clip: ClipRange,
}

impl<'a> LaunchParams<'a> {
    /// Launch over the whole buffer with no user bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach user parameter bytes.
    pub fn with_user(mut self, user: &'a [u8]) -> Self {
        self.user = user;
        self
    }

    /// Attach a clip range.
    pub fn with_clip(mut self, clip: impl Into<ClipRange>) -> Self {
        self.clip = clip.into();
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/launch/clip.rs"]
mod tests;
