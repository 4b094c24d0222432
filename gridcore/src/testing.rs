//! A recording platform backend for tests.
//!
//! [`TestSurface`] records every drawing operation instead of rasterizing;
//! the op log stands in for surface bytes in determinism and blit tests.
//! [`TestPlatform`] queues deferred and timed calls so tests can drive them
//! explicitly.
use cgmath::{Point2, Vector2};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::Rc,
    time::Duration,
};

use crate::geom::Rect;
use crate::gfx::{CompositeMode, Surface, TextAlign, TextBaseline, RGBAF32};
use crate::platform::{CursorShape, Platform};

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Resize([u32; 2]),
    Save,
    Restore,
    SetFillRgb(RGBAF32),
    SetStrokeRgb(RGBAF32),
    SetLineWidth(f64),
    SetLineDash(f64, Vec<f64>),
    SetFont(String),
    SetTextAlign(TextAlign),
    SetTextBaseline(TextBaseline),
    SetCompositeMode(CompositeMode),
    Translate(f64, f64),
    BeginPath,
    ClosePath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    RectPath(Rect),
    Fill,
    Stroke,
    Clip,
    FillRect(Rect),
    FillText(String, f64, f64),
    CopyFrom { src_rect: Rect, dst: (i64, i64) },
}

/// A surface that records operations.
#[derive(Debug)]
pub struct TestSurface {
    size: [u32; 2],
    ops: RefCell<Vec<DrawOp>>,
}

impl TestSurface {
    pub fn new(size: [u32; 2]) -> Self {
        Self {
            size,
            ops: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, op: DrawOp) {
        self.ops.borrow_mut().push(op);
    }

    /// Take the recorded operations, clearing the log.
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    /// Borrow the recorded operations without clearing them.
    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.borrow().clone()
    }
}

impl Surface for TestSurface {
    fn size(&self) -> [u32; 2] {
        self.size
    }

    fn resize(&mut self, size: [u32; 2]) {
        self.size = size;
        self.push(DrawOp::Resize(size));
    }

    fn save(&mut self) {
        self.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.push(DrawOp::Restore);
    }

    fn set_fill_rgb(&mut self, rgb: RGBAF32) {
        self.push(DrawOp::SetFillRgb(rgb));
    }

    fn set_stroke_rgb(&mut self, rgb: RGBAF32) {
        self.push(DrawOp::SetStrokeRgb(rgb));
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawOp::SetLineWidth(width));
    }

    fn set_line_dash(&mut self, phase: f64, lengths: &[f64]) {
        self.push(DrawOp::SetLineDash(phase, lengths.to_vec()));
    }

    fn set_font(&mut self, font: &str) {
        self.push(DrawOp::SetFont(font.to_string()));
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.push(DrawOp::SetTextAlign(align));
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.push(DrawOp::SetTextBaseline(baseline));
    }

    fn set_composite_mode(&mut self, mode: CompositeMode) {
        self.push(DrawOp::SetCompositeMode(mode));
    }

    fn translate(&mut self, d: Vector2<f64>) {
        self.push(DrawOp::Translate(d.x, d.y));
    }

    fn begin_path(&mut self) {
        self.push(DrawOp::BeginPath);
    }

    fn close_path(&mut self) {
        self.push(DrawOp::ClosePath);
    }

    fn move_to(&mut self, p: Point2<f64>) {
        self.push(DrawOp::MoveTo(p.x, p.y));
    }

    fn line_to(&mut self, p: Point2<f64>) {
        self.push(DrawOp::LineTo(p.x, p.y));
    }

    fn rect(&mut self, bx: Rect) {
        self.push(DrawOp::RectPath(bx));
    }

    fn fill(&mut self) {
        self.push(DrawOp::Fill);
    }

    fn stroke(&mut self) {
        self.push(DrawOp::Stroke);
    }

    fn clip(&mut self) {
        self.push(DrawOp::Clip);
    }

    fn fill_rect(&mut self, bx: Rect) {
        self.push(DrawOp::FillRect(bx));
    }

    fn fill_text(&mut self, text: &str, p: Point2<f64>) {
        self.push(DrawOp::FillText(text.to_string(), p.x, p.y));
    }

    fn copy_from(&mut self, src: &Self, src_rect: Rect, dst: Point2<i64>) {
        let _ = src;
        self.push(DrawOp::CopyFrom {
            src_rect,
            dst: (dst.x, dst.y),
        });
    }
}

/// A pending `invoke_after` call.
struct PendingTimer {
    id: u64,
    delay: Duration,
    f: Box<dyn FnOnce()>,
}

/// The timer handle type of [`TestPlatform`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestTimer(u64);

#[derive(Default)]
struct Shared {
    invokes: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    timers: RefCell<Vec<PendingTimer>>,
    next_timer_id: Cell<u64>,
    cursor_log: RefCell<Vec<Option<CursorShape>>>,
}

/// A [`Platform`] whose deferred calls and timers are driven by the test.
#[derive(Clone)]
pub struct TestPlatform {
    shared: Rc<Shared>,
}

impl fmt::Debug for TestPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestPlatform")
            .field("pending_invokes", &self.shared.invokes.borrow().len())
            .field("pending_timers", &self.shared.timers.borrow().len())
            .finish()
    }
}

impl Default for TestPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPlatform {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared::default()),
        }
    }

    /// Run queued `invoke` calls, including ones queued while stepping.
    pub fn step(&self) {
        // Bounded drain; a requeue loop fails the test instead of hanging.
        for _ in 0..1000 {
            let f = self.shared.invokes.borrow_mut().pop_front();
            match f {
                Some(f) => f(),
                None => return,
            }
        }
        panic!("invoke queue did not drain after 1000 calls");
    }

    pub fn pending_invokes(&self) -> usize {
        self.shared.invokes.borrow().len()
    }

    pub fn pending_timers(&self) -> usize {
        self.shared.timers.borrow().len()
    }

    /// The delay of the most recently scheduled timer.
    pub fn last_timer_delay(&self) -> Option<Duration> {
        self.shared.timers.borrow().last().map(|t| t.delay)
    }

    /// Fire the oldest pending timer. Returns `false` if there is none.
    pub fn fire_next_timer(&self) -> bool {
        let timer = {
            let mut timers = self.shared.timers.borrow_mut();
            if timers.is_empty() {
                return false;
            }
            timers.remove(0)
        };
        (timer.f)();
        true
    }

    /// Every `set_cursor` call observed so far.
    pub fn cursor_log(&self) -> Vec<Option<CursorShape>> {
        self.shared.cursor_log.borrow().clone()
    }

    pub fn current_cursor(&self) -> Option<CursorShape> {
        self.shared.cursor_log.borrow().last().cloned().flatten()
    }
}

impl Platform for TestPlatform {
    type Surface = TestSurface;
    type Timer = TestTimer;

    fn new_surface(&self, size: [u32; 2]) -> TestSurface {
        TestSurface::new(size)
    }

    fn invoke(&self, f: Box<dyn FnOnce()>) {
        self.shared.invokes.borrow_mut().push_back(f);
    }

    fn invoke_after(&self, delay: Duration, f: Box<dyn FnOnce()>) -> TestTimer {
        let id = self.shared.next_timer_id.get();
        self.shared.next_timer_id.set(id + 1);
        self.shared
            .timers
            .borrow_mut()
            .push(PendingTimer { id, delay, f });
        TestTimer(id)
    }

    fn cancel_invoke(&self, timer: &TestTimer) {
        self.shared.timers.borrow_mut().retain(|t| t.id != timer.0);
    }

    fn set_cursor(&self, shape: Option<CursorShape>) {
        self.shared.cursor_log.borrow_mut().push(shape);
    }
}
