//! The scrollbar contract.
//!
//! The grid does not own scrollbar widgets; it talks to them through this
//! thin value/page interface, normalized so the widget needs no knowledge of
//! content extents. The widget feeds user gestures back through the grid's
//! `scrollbar_thumb_moved` / `scrollbar_page_requested` /
//! `scrollbar_step_requested` entry points.

/// A scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal = 0,
    Vertical = 1,
}

impl Axis {
    /// Convert to an index, e.g., for indexing into per-axis arrays.
    pub(crate) fn i(self) -> usize {
        self as usize
    }
}

/// Specifies the direction of page and single step scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dir {
    Incr = 1,
    Decr = -1,
}

/// A scrollbar widget as seen from the grid.
pub trait Scrollbar {
    /// The current value in range `[0, 1]`.
    fn value(&self) -> f64;

    /// Set the current value in range `[0, 1]`. Must not feed back into the
    /// grid.
    fn set_value(&self, new_value: f64);

    /// The page step size relative to the scrollable range.
    fn page_step(&self) -> f64;

    /// Set the page step size. May be infinity, in which case the scrollbar
    /// should render itself disabled.
    fn set_page_step(&self, new_value: f64);
}

/// A no-op implementation of [`Scrollbar`].
impl Scrollbar for () {
    fn value(&self) -> f64 {
        0.0
    }
    fn set_value(&self, _: f64) {}
    fn page_step(&self) -> f64 {
        0.0
    }
    fn set_page_step(&self, _: f64) {}
}
