//! Host platform services.
//!
//! The engine is headless: surfaces, deferred calls, one-shot timers, and
//! the document-wide mouse cursor are all supplied by the host through the
//! [`Platform`] trait.
use std::{cell::RefCell, fmt::Debug, rc::Rc, time::Duration};

use crate::gfx::Surface;

/// Describes the appearance of the mouse cursor. Only the shapes the engine
/// produces are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorShape {
    Default,
    ColResize,
    RowResize,
    Grabbing,
}

impl Default for CursorShape {
    fn default() -> Self {
        CursorShape::Default
    }
}

/// A host platform.
///
/// All methods are called from the single thread that owns the grid.
pub trait Platform: Clone + 'static {
    /// The concrete surface type. The on-screen surface and the off-screen
    /// buffer share it so they can blit to each other.
    type Surface: Surface;

    /// Represents a function call pended by [`Platform::invoke_after`].
    type Timer: Debug + Clone + PartialEq;

    /// Create a surface of the given pixel size.
    fn new_surface(&self, size: [u32; 2]) -> Self::Surface;

    /// Enqueue a call to the specified function. Used to conflate repaint
    /// requests; the call must not run re-entrantly from inside `invoke`.
    fn invoke(&self, f: Box<dyn FnOnce()>);

    /// Enqueue a call to the specified function after the specified delay.
    fn invoke_after(&self, delay: Duration, f: Box<dyn FnOnce()>) -> Self::Timer;

    /// Cancel a pending function call enqueued by `invoke_after`. Does
    /// nothing if the function was already called.
    fn cancel_invoke(&self, timer: &Self::Timer);

    /// Set the document-wide cursor shape. `None` restores the default.
    fn set_cursor(&self, shape: Option<CursorShape>);
}

/// Owns the stack of active cursor overrides for one grid.
///
/// Overrides nest LIFO; the topmost override's shape wins. The host cursor
/// is restored once the stack drains.
#[derive(Debug)]
pub(crate) struct CursorStack<P: Platform> {
    platform: P,
    stack: Rc<RefCell<Vec<(u64, CursorShape)>>>,
    next_id: std::cell::Cell<u64>,
}

impl<P: Platform> CursorStack<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            stack: Rc::new(RefCell::new(Vec::new())),
            next_id: std::cell::Cell::new(0),
        }
    }

    /// Acquire the cursor, setting its shape until the returned token is
    /// dropped.
    pub fn acquire(&self, shape: CursorShape) -> CursorOverride<P> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.stack.borrow_mut().push((id, shape));
        self.platform.set_cursor(Some(shape));
        CursorOverride {
            platform: self.platform.clone(),
            stack: Rc::clone(&self.stack),
            id,
        }
    }
}

/// Scoped acquisition of the document-wide cursor style. Dropping the token
/// releases the acquisition on every exit path.
pub(crate) struct CursorOverride<P: Platform> {
    platform: P,
    stack: Rc<RefCell<Vec<(u64, CursorShape)>>>,
    id: u64,
}

impl<P: Platform> Debug for CursorOverride<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorOverride").field("id", &self.id).finish()
    }
}

impl<P: Platform> Drop for CursorOverride<P> {
    fn drop(&mut self) {
        let mut stack = self.stack.borrow_mut();
        if let Some(pos) = stack.iter().rposition(|&(id, _)| id == self.id) {
            stack.remove(pos);
        }
        self.platform
            .set_cursor(stack.last().map(|&(_, shape)| shape));
    }
}
