//! A headless, high-performance tabular grid engine.
//!
//! The engine maintains a viewport over an abstract data source of arbitrary
//! row and column count, rendering only the cells that intersect the visible
//! area. It owns the machinery a data-grid widget needs (variable-size row
//! and column tracking, a dirty-rectangle paint pipeline, incremental
//! blit-then-paint scrolling, hit testing, selections, and a pointer/keyboard
//! state machine) while delegating the surroundings to the host:
//!
//! - cell painting goes through the [`render::CellRenderer`] interface,
//! - cell values come from the [`model::DataModel`] interface,
//! - surfaces, timers, deferred calls, and the mouse cursor are supplied via
//!   [`platform::Platform`],
//! - scrollbar widgets talk through the thin [`scrollbar::Scrollbar`]
//!   value/page contract.
//!
//! Everything runs on one thread; the types use interior mutability and are
//! neither `Send` nor `Sync`.
//!
//! The entry point is [`grid::Grid`].
pub mod geom;
pub mod gfx;
pub mod grid;
pub mod model;
pub mod platform;
pub mod render;
pub mod scrollbar;
pub mod sections;
pub mod selection;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub mod prelude {
    #[doc(no_inline)]
    pub use crate::gfx::Surface;
    #[doc(no_inline)]
    pub use crate::model::DataModel;
    #[doc(no_inline)]
    pub use crate::platform::Platform;
    #[doc(no_inline)]
    pub use crate::render::CellRenderer;
}
