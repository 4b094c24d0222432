//! The pointer input state machine.
//!
//! Raw mouse events enter here and are dispatched according to the current
//! automaton state. Only `Default` accepts a new press; the press decides
//! the gesture (resize, move, or select) and carries its transient state in
//! [`PressData`] until the matching mouse-up returns the automaton to
//! `Default`.
//!
//! While a gesture is active the host is expected to route document-level
//! mouse, key, and context-menu events to the grid; the `true` return values
//! tell it to swallow them.
use bitflags::bitflags;
use cgmath::Point2;
use log::{trace, warn};
use std::cell::{Cell, RefCell};
use std::cmp::{max, min};
use std::rc::Rc;
use std::time::Duration;

use super::hittest::{resize_handle_for, ResizeHandle};
use super::Inner;
use crate::model::{CellRegion, ColumnRegion, RowRegion};
use crate::platform::{CursorOverride, CursorShape, Platform};
use crate::sections::{Index, Size};
use crate::selection::{Clear, SelectArgs, SECTION_MAX};

bitflags! {
    /// Keyboard modifiers carried by pointer and key events.
    pub struct Modifiers: u8 {
        const CTRL = 1;
        const SHIFT = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

impl Modifiers {
    /// The platform accelerator (ctrl, or the command key where that is the
    /// convention).
    pub fn accel(self) -> bool {
        self.intersects(Modifiers::CTRL | Modifiers::META)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MouseEvent {
    pub client_x: f64,
    pub client_y: f64,
    pub button: u8,
    pub modifiers: Modifiers,
}

/// The unit `delta_x`/`delta_y` are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDeltaMode {
    Pixel = 0,
    Line = 1,
    Page = 2,
}

#[derive(Debug, Clone, Copy)]
pub struct WheelEvent {
    pub client_x: f64,
    pub client_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_mode: WheelDeltaMode,
    pub modifiers: Modifiers,
}

/// A normalized key. Keys the grid does not handle arrive as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Other,
}

#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// The states of the input automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Default,
    Resize,
    Move,
    Select,
    Alt,
}

/// The axis of a row/column move gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAxis {
    Rows,
    Columns,
}

/// A request to reorder rows or columns, reported at the end of a move
/// gesture. The host applies it to its model; the resulting
/// `rows-moved`/`columns-moved` signal updates the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub axis: MoveAxis,
    pub index: Index,
    pub destination: Index,
}

/// Transient state of a pointer press.
pub(crate) enum PressData<P: Platform> {
    RowResize {
        region: RowRegion,
        index: Index,
        original_size: Size,
        client_y0: f64,
        _cursor: CursorOverride<P>,
    },
    ColumnResize {
        region: ColumnRegion,
        index: Index,
        original_size: Size,
        client_x0: f64,
        _cursor: CursorOverride<P>,
    },
    Select(SelectPress<P>),
    Move {
        axis: MoveAxis,
        index: Index,
        destination: Cell<Index>,
        _cursor: CursorOverride<P>,
    },
}

pub(crate) struct SelectPress<P: Platform> {
    region: CellRegion,
    row: Index,
    column: Index,
    /// Pending autoscroll delay in milliseconds; negative cancels the loop
    /// cooperatively (the timer callback checks it before continuing).
    autoscroll_timeout: Cell<i32>,
    autoscroll_dir: Cell<(i8, i8)>,
    timer_active: Cell<bool>,
    timer: RefCell<Option<P::Timer>>,
}

pub(crate) struct InputData<P: Platform> {
    pub state: InputState,
    pub press: Option<PressData<P>>,
}

impl<P: Platform> InputData<P> {
    pub fn new() -> Self {
        Self {
            state: InputState::Default,
            press: None,
        }
    }
}

impl<P: Platform> Inner<P> {
    pub(crate) fn on_mouse_down(this: &Rc<Self>, ev: &MouseEvent) -> bool {
        if this.disposed.get() {
            return false;
        }
        if this.input.borrow().state != InputState::Default {
            // Only `Default` accepts a new press.
            return true;
        }
        if ev.button != 0 {
            return false;
        }

        let hit = this.hit_test(Point2::new(ev.client_x, ev.client_y));
        if hit.region == CellRegion::Void {
            return false;
        }

        if ev.modifiers.contains(Modifiers::ALT) {
            trace!("alt-press at {:?}", (ev.client_x, ev.client_y));
            this.input.borrow_mut().state = InputState::Alt;
            return true;
        }

        let handle = resize_handle_for(&hit);
        if handle != ResizeHandle::None {
            return this.begin_resize(ev, &hit, handle);
        }

        if let Some(press) = this.begin_move(&hit) {
            let mut input = this.input.borrow_mut();
            input.press = Some(press);
            input.state = InputState::Move;
            return true;
        }

        this.begin_select(ev, &hit)
    }

    fn begin_resize(
        &self,
        ev: &MouseEvent,
        hit: &super::hittest::HitTestResult,
        handle: ResizeHandle,
    ) -> bool {
        let press = match handle {
            ResizeHandle::Left | ResizeHandle::Right => {
                let region = if hit.region == CellRegion::ColumnHeader {
                    ColumnRegion::Body
                } else {
                    ColumnRegion::RowHeader
                };
                let index = if handle == ResizeHandle::Left {
                    hit.column - 1
                } else {
                    hit.column
                };
                let original_size = match self.state.borrow().column_list(region).section_size(index)
                {
                    Some(size) => size,
                    None => return false,
                };
                PressData::ColumnResize {
                    region,
                    index,
                    original_size,
                    client_x0: ev.client_x,
                    _cursor: self.cursor_stack.acquire(CursorShape::ColResize),
                }
            }
            ResizeHandle::Top | ResizeHandle::Bottom => {
                let region = if hit.region == CellRegion::RowHeader {
                    RowRegion::Body
                } else {
                    RowRegion::ColumnHeader
                };
                let index = if handle == ResizeHandle::Top {
                    hit.row - 1
                } else {
                    hit.row
                };
                let original_size = match self.state.borrow().row_list(region).section_size(index) {
                    Some(size) => size,
                    None => return false,
                };
                PressData::RowResize {
                    region,
                    index,
                    original_size,
                    client_y0: ev.client_y,
                    _cursor: self.cursor_stack.acquire(CursorShape::RowResize),
                }
            }
            ResizeHandle::None => return false,
        };

        trace!("resize gesture started");
        let mut input = self.input.borrow_mut();
        input.press = Some(press);
        input.state = InputState::Resize;
        true
    }

    /// A press on a selected header cell starts a move gesture when the
    /// matching `*_movable` flag is set.
    fn begin_move(&self, hit: &super::hittest::HitTestResult) -> Option<PressData<P>> {
        let st = self.state.borrow();
        let selection = st.selection.as_ref()?;
        match hit.region {
            CellRegion::ColumnHeader
                if st.columns_movable && selection.is_column_selected(hit.column) =>
            {
                Some(PressData::Move {
                    axis: MoveAxis::Columns,
                    index: hit.column,
                    destination: Cell::new(hit.column),
                    _cursor: self.cursor_stack.acquire(CursorShape::Grabbing),
                })
            }
            CellRegion::RowHeader if st.rows_movable && selection.is_row_selected(hit.row) => {
                Some(PressData::Move {
                    axis: MoveAxis::Rows,
                    index: hit.row,
                    destination: Cell::new(hit.row),
                    _cursor: self.cursor_stack.acquire(CursorShape::Grabbing),
                })
            }
            _ => None,
        }
    }

    fn begin_select(&self, ev: &MouseEvent, hit: &super::hittest::HitTestResult) -> bool {
        let selection = match self.state.borrow().selection.clone() {
            Some(selection) => selection,
            None => return false,
        };

        let shift = ev.modifiers.contains(Modifiers::SHIFT);
        let accel = ev.modifiers.accel();

        let cr = selection.cursor_row();
        let cc = selection.cursor_column();
        if shift && cr >= 0 && cc >= 0 {
            // Extend from the anchor, replacing the current selection.
            let (r1, c1, r2, c2) = match hit.region {
                CellRegion::RowHeader => (cr, 0, hit.row, SECTION_MAX),
                CellRegion::ColumnHeader => (0, cc, SECTION_MAX, hit.column),
                CellRegion::CornerHeader => (0, 0, SECTION_MAX, SECTION_MAX),
                _ => (cr, cc, hit.row, hit.column),
            };
            selection.select(SelectArgs {
                r1,
                c1,
                r2,
                c2,
                cursor_row: cr,
                cursor_column: cc,
                clear: Clear::Current,
            });
        } else {
            let (r1, c1, r2, c2) = match hit.region {
                CellRegion::RowHeader => (hit.row, 0, hit.row, SECTION_MAX),
                CellRegion::ColumnHeader => (0, hit.column, SECTION_MAX, hit.column),
                CellRegion::CornerHeader => (0, 0, SECTION_MAX, SECTION_MAX),
                _ => (hit.row, hit.column, hit.row, hit.column),
            };
            selection.select(SelectArgs {
                r1,
                c1,
                r2,
                c2,
                cursor_row: r1,
                cursor_column: c1,
                clear: if accel { Clear::None } else { Clear::All },
            });
        }

        trace!("select gesture started in {:?}", hit.region);
        let mut input = self.input.borrow_mut();
        input.press = Some(PressData::Select(SelectPress {
            region: hit.region,
            row: hit.row,
            column: hit.column,
            autoscroll_timeout: Cell::new(-1),
            autoscroll_dir: Cell::new((0, 0)),
            timer_active: Cell::new(false),
            timer: RefCell::new(None),
        }));
        input.state = InputState::Select;
        true
    }

    pub(crate) fn on_mouse_move(this: &Rc<Self>, ev: &MouseEvent) -> bool {
        if this.disposed.get() {
            return false;
        }
        let state = this.input.borrow().state;
        match state {
            InputState::Default => false,
            InputState::Alt => true,
            InputState::Resize => {
                Inner::resize_motion(this, ev);
                true
            }
            InputState::Select => {
                Inner::select_motion(this, ev);
                true
            }
            InputState::Move => {
                this.move_motion(ev);
                true
            }
        }
    }

    fn resize_motion(this: &Rc<Self>, ev: &MouseEvent) {
        enum Apply {
            Row(RowRegion, Index, Size),
            Column(ColumnRegion, Index, Size),
            Invalid,
        }

        let apply = {
            let input = this.input.borrow();
            match &input.press {
                Some(PressData::RowResize {
                    region,
                    index,
                    original_size,
                    client_y0,
                    ..
                }) => {
                    let size = (*original_size as f64 + (ev.client_y - client_y0)).floor();
                    Apply::Row(*region, *index, size as Size)
                }
                Some(PressData::ColumnResize {
                    region,
                    index,
                    original_size,
                    client_x0,
                    ..
                }) => {
                    let size = (*original_size as f64 + (ev.client_x - client_x0)).floor();
                    Apply::Column(*region, *index, size as Size)
                }
                _ => Apply::Invalid,
            }
        };

        match apply {
            Apply::Row(region, index, size) => Inner::resize_row(this, region, index, size),
            Apply::Column(region, index, size) => {
                Inner::resize_column(this, region, index, size)
            }
            Apply::Invalid => {
                // A move event in `Resize` without press data means the
                // bookkeeping went wrong somewhere; recover to `Default`.
                warn!("mouse-move in Resize without press data");
                let mut input = this.input.borrow_mut();
                input.press = None;
                input.state = InputState::Default;
            }
        }
    }

    fn move_motion(&self, ev: &MouseEvent) {
        let hit = self.hit_test(Point2::new(ev.client_x, ev.client_y));
        let input = self.input.borrow();
        if let Some(PressData::Move {
            axis, destination, ..
        }) = &input.press
        {
            match (axis, hit.region) {
                (MoveAxis::Columns, CellRegion::ColumnHeader) => destination.set(hit.column),
                (MoveAxis::Rows, CellRegion::RowHeader) => destination.set(hit.row),
                _ => {}
            }
        }
    }

    /// Mouse motion during a select gesture: update the selection toward
    /// the pointer, or start the edge autoscroll loop when the pointer
    /// leaves the scrollable interior.
    fn select_motion(this: &Rc<Self>, ev: &MouseEvent) {
        let px = ev.client_x.floor() as Size;
        let py = ev.client_y.floor() as Size;

        let (hw, hh, w, h, sx, sy, max_x, max_y) = {
            let st = this.state.borrow();
            (
                st.header_width(),
                st.header_height(),
                st.viewport_width(),
                st.viewport_height(),
                st.scroll_x,
                st.scroll_y,
                st.max_scroll_x(),
                st.max_scroll_y(),
            )
        };

        // The pointer is "outside" only in directions that can still scroll.
        let (mut dir_x, mut excess_x) = (0i8, 0);
        if px < hw && sx > 0 {
            dir_x = -1;
            excess_x = hw - px;
        } else if px >= w && sx < max_x {
            dir_x = 1;
            excess_x = px - w;
        }
        let (mut dir_y, mut excess_y) = (0i8, 0);
        if py < hh && sy > 0 {
            dir_y = -1;
            excess_y = hh - py;
        } else if py >= h && sy < max_y {
            dir_y = 1;
            excess_y = py - h;
        }

        if dir_x != 0 || dir_y != 0 {
            let excess = max(excess_x, excess_y);
            let timeout =
                (5.0 + 120.0 * (1.0 - min(128, excess) as f64 / 128.0)) as i32;

            let schedule = {
                let input = this.input.borrow();
                match &input.press {
                    Some(PressData::Select(sp)) => {
                        sp.autoscroll_dir.set((dir_x, dir_y));
                        sp.autoscroll_timeout.set(timeout);
                        !sp.timer_active.replace(true)
                    }
                    _ => false,
                }
            };
            if schedule {
                Inner::schedule_autoscroll(this, timeout);
            }
            return;
        }

        // Back inside: cancel the loop cooperatively and track the pointer.
        let press = {
            let input = this.input.borrow();
            match &input.press {
                Some(PressData::Select(sp)) => {
                    sp.autoscroll_timeout.set(-1);
                    Some((sp.region, sp.row, sp.column))
                }
                _ => None,
            }
        };
        let (press_region, press_row, press_column) = match press {
            Some(press) => press,
            None => return,
        };

        let target = {
            let st = this.state.borrow();
            let row_extent = st.row_sections.total_size();
            let col_extent = st.column_sections.total_size();
            if row_extent == 0 || col_extent == 0 {
                return;
            }
            let vy = clamp(py - hh + sy, 0, row_extent - 1);
            let vx = clamp(px - hw + sx, 0, col_extent - 1);
            let row = st.row_sections.section_index(vy);
            let column = st.column_sections.section_index(vx);
            match (row, column) {
                (Some(row), Some(column)) => (row, column),
                _ => return,
            }
        };

        let selection = match this.state.borrow().selection.clone() {
            Some(selection) => selection,
            None => return,
        };
        let cr = selection.cursor_row();
        let cc = selection.cursor_column();
        let (r1, c1, r2, c2) = match press_region {
            // Header presses keep their full-axis span while dragging.
            CellRegion::RowHeader => (press_row, 0, target.0, SECTION_MAX),
            CellRegion::ColumnHeader => (0, press_column, SECTION_MAX, target.1),
            CellRegion::CornerHeader => return,
            _ => (cr, cc, target.0, target.1),
        };
        selection.select(SelectArgs {
            r1,
            c1,
            r2,
            c2,
            cursor_row: cr,
            cursor_column: cc,
            clear: Clear::Current,
        });
    }

    fn schedule_autoscroll(this: &Rc<Self>, delay_ms: i32) {
        let weak = Rc::downgrade(this);
        let timer = this.platform.invoke_after(
            Duration::from_millis(delay_ms.max(0) as u64),
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Inner::autoscroll_tick(&inner);
                }
            }),
        );

        let input = this.input.borrow();
        match &input.press {
            Some(PressData::Select(sp)) => {
                *sp.timer.borrow_mut() = Some(timer);
            }
            _ => this.platform.cancel_invoke(&timer),
        }
    }

    /// One autoscroll step: extend the selection's far corner toward the
    /// edge, scroll it into view, and reschedule unless cancelled.
    fn autoscroll_tick(this: &Rc<Self>) {
        if this.disposed.get() {
            return;
        }

        let dir = {
            let input = this.input.borrow();
            match (&input.press, input.state) {
                (Some(PressData::Select(sp)), InputState::Select) => {
                    if sp.autoscroll_timeout.get() < 0 {
                        sp.timer_active.set(false);
                        None
                    } else {
                        Some(sp.autoscroll_dir.get())
                    }
                }
                _ => None,
            }
        };
        let (dx, dy) = match dir {
            Some(dir) => dir,
            None => return,
        };

        let selection = this.state.borrow().selection.clone();
        if let Some(selection) = selection {
            if let Some(sel) = selection.resize_by(dy as Index, dx as Index) {
                let (row, column) = {
                    let st = this.state.borrow();
                    (
                        resolve(sel.r2, st.row_sections.count() - 1),
                        resolve(sel.c2, st.column_sections.count() - 1),
                    )
                };
                match (dx != 0, dy != 0) {
                    (true, true) => this.scroll_to_cell(row, column),
                    (true, false) => this.scroll_to_column(column),
                    (false, true) => this.scroll_to_row(row),
                    (false, false) => {}
                }
            }
        }

        let again = {
            let input = this.input.borrow();
            match (&input.press, input.state) {
                (Some(PressData::Select(sp)), InputState::Select) => {
                    let timeout = sp.autoscroll_timeout.get();
                    if timeout >= 0 {
                        Some(timeout)
                    } else {
                        sp.timer_active.set(false);
                        None
                    }
                }
                _ => None,
            }
        };
        if let Some(timeout) = again {
            Inner::schedule_autoscroll(this, timeout);
        }
    }

    pub(crate) fn on_mouse_up(&self, _ev: &MouseEvent) -> bool {
        let (prev_state, press) = {
            let mut input = self.input.borrow_mut();
            if input.state == InputState::Default {
                return false;
            }
            let prev = input.state;
            input.state = InputState::Default;
            (prev, input.press.take())
        };
        trace!("press gesture ended ({:?})", prev_state);

        match &press {
            Some(PressData::Select(sp)) => {
                sp.autoscroll_timeout.set(-1);
                if let Some(timer) = sp.timer.borrow_mut().take() {
                    self.platform.cancel_invoke(&timer);
                }
            }
            Some(PressData::Move {
                axis,
                index,
                destination,
                ..
            }) => {
                let destination = destination.get();
                if destination != *index {
                    let handler = self.state.borrow().move_handler.clone();
                    if let Some(handler) = handler {
                        handler(&MoveRequest {
                            axis: *axis,
                            index: *index,
                            destination,
                        });
                    }
                }
            }
            _ => {}
        }
        drop(press);
        true
    }

    pub(crate) fn on_wheel(&self, ev: &WheelEvent) -> bool {
        if self.disposed.get() {
            return false;
        }
        if self.input.borrow().state != InputState::Default {
            return true;
        }

        let (dx, dy) = {
            let st = self.state.borrow();
            match ev.delta_mode {
                WheelDeltaMode::Pixel => (ev.delta_x, ev.delta_y),
                WheelDeltaMode::Line => (
                    ev.delta_x * st.column_sections.base_size() as f64,
                    ev.delta_y * st.row_sections.base_size() as f64,
                ),
                WheelDeltaMode::Page => (
                    ev.delta_x * st.page_width() as f64,
                    ev.delta_y * st.page_height() as f64,
                ),
            }
        };
        self.scroll_by(dx.floor() as Size, dy.floor() as Size);
        true
    }

    pub(crate) fn on_context_menu(&self) -> bool {
        self.input.borrow().state != InputState::Default
    }

    /// Abort any active press without running gesture finalizers. Used by
    /// `dispose`.
    pub(crate) fn abort_press(&self) {
        let press = {
            let mut input = self.input.borrow_mut();
            input.state = InputState::Default;
            input.press.take()
        };
        if let Some(PressData::Select(sp)) = &press {
            sp.autoscroll_timeout.set(-1);
            if let Some(timer) = sp.timer.borrow_mut().take() {
                self.platform.cancel_invoke(&timer);
            }
        }
        // Cursor overrides are released by dropping the press data.
        drop(press);
    }
}

fn clamp(x: Size, lo: Size, hi: Size) -> Size {
    max(lo, min(x, hi))
}

fn resolve(x: Index, last: Index) -> Index {
    if x == SECTION_MAX {
        max(last, 0)
    } else {
        x
    }
}

/// Install a cell-mode selection model on a grid. Test helper.
#[cfg(test)]
pub(crate) fn attach_selection(
    grid: &super::Grid<crate::testing::TestPlatform>,
    model: Rc<dyn crate::model::DataModel>,
) -> Rc<crate::selection::SelectionModel> {
    let selection = Rc::new(crate::selection::SelectionModel::new(
        model,
        Default::default(),
    ));
    grid.set_selection_model(Some(selection.clone()));
    selection
}

#[cfg(test)]
mod tests {
    use super::super::tests::make_grid;
    use super::*;
    use crate::model::DataModel;
    use crate::selection::{Selection, SelectionMode, SelectionModel, SelectionOptions};
    use flags_macro::flags;
    use try_match::try_match;

    fn mouse(x: f64, y: f64) -> MouseEvent {
        MouseEvent {
            client_x: x,
            client_y: y,
            button: 0,
            modifiers: Modifiers::empty(),
        }
    }

    fn mouse_mod(x: f64, y: f64, modifiers: Modifiers) -> MouseEvent {
        MouseEvent {
            modifiers,
            ..mouse(x, y)
        }
    }

    fn press(grid: &super::super::Grid<crate::testing::TestPlatform>, ev: MouseEvent) -> bool {
        grid.on_mouse_down(&ev)
    }

    #[test]
    fn void_press_stays_default() {
        let (grid, platform, _) = make_grid(3, 2);
        grid.set_viewport_size([400, 300]);
        platform.step();

        assert!(!press(&grid, mouse(350.0, 250.0)));
        assert_eq!(grid.input_state(), InputState::Default);
    }

    #[test]
    fn alt_press_swallows_until_release() {
        let (grid, platform, _) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();

        assert!(press(
            &grid,
            mouse_mod(100.0, 100.0, flags![Modifiers::{ALT}])
        ));
        assert_eq!(grid.input_state(), InputState::Alt);
        assert!(grid.on_mouse_move(&mouse(120.0, 120.0)));
        assert!(grid.on_mouse_up(&mouse(120.0, 120.0)));
        assert_eq!(grid.input_state(), InputState::Default);
    }

    #[test]
    fn mouse_down_is_swallowed_outside_default() {
        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        attach_selection(&grid, model);

        assert!(press(&grid, mouse(100.0, 100.0)));
        assert_eq!(grid.input_state(), InputState::Select);
        // A second press must not restart the gesture.
        assert!(press(&grid, mouse(200.0, 200.0)));
        assert_eq!(grid.input_state(), InputState::Select);
        grid.on_mouse_up(&mouse(100.0, 100.0));
        assert_eq!(grid.input_state(), InputState::Default);
    }

    #[test]
    fn column_resize_drag() {
        let (grid, platform, _) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();

        // Column 0 of the body spans x 64..128; its trailing edge handle
        // is in the column header.
        let x = 64.0 + 60.0;
        assert!(press(&grid, mouse(x, 10.0)));
        assert_eq!(grid.input_state(), InputState::Resize);
        assert_eq!(platform.current_cursor(), Some(CursorShape::ColResize));
        {
            let input = grid.inner.input.borrow();
            assert!(try_match!(
                Some(PressData::ColumnResize {
                    region: ColumnRegion::Body,
                    index: 0,
                    original_size: 64,
                    ..
                }) = &input.press
            )
            .is_ok());
        }

        grid.on_mouse_move(&mouse(x + 30.0, 10.0));
        assert_eq!(
            grid.column_size(ColumnRegion::Body, 0),
            Some(64 + 30)
        );

        // Dragging left clamps at zero.
        grid.on_mouse_move(&mouse(x - 200.0, 10.0));
        assert_eq!(grid.column_size(ColumnRegion::Body, 0), Some(0));

        assert!(grid.on_mouse_up(&mouse(x + 30.0, 10.0)));
        assert_eq!(grid.input_state(), InputState::Default);
        assert_eq!(platform.current_cursor(), None);
    }

    #[test]
    fn corner_resize_targets_the_row_header_columns() {
        let (grid, platform, _) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();

        // The row-header column's trailing edge inside the corner header.
        assert!(press(&grid, mouse(60.0, 10.0)));
        grid.on_mouse_move(&mouse(80.0, 10.0));
        assert_eq!(
            grid.column_size(ColumnRegion::RowHeader, 0),
            Some(64 + 20)
        );
        assert_eq!(grid.header_width(), 84);
        grid.on_mouse_up(&mouse(80.0, 10.0));
    }

    #[test]
    fn row_resize_from_the_row_header() {
        let (grid, platform, _) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();

        // Row 0 spans y 20..40; grab its trailing edge in the row header.
        assert!(press(&grid, mouse(30.0, 38.0)));
        assert_eq!(grid.input_state(), InputState::Resize);
        assert_eq!(platform.current_cursor(), Some(CursorShape::RowResize));
        grid.on_mouse_move(&mouse(30.0, 38.0 + 15.0));
        assert_eq!(grid.row_size(RowRegion::Body, 0), Some(35));
        grid.on_mouse_up(&mouse(30.0, 53.0));
    }

    #[test]
    fn resize_never_mutates_the_selection() {
        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        let selection = attach_selection(&grid, model);
        selection.select(SelectArgs {
            r1: 1,
            c1: 1,
            r2: 1,
            c2: 1,
            cursor_row: 1,
            cursor_column: 1,
            clear: Clear::All,
        });
        let before = selection.current_selection();

        assert!(press(&grid, mouse(124.0, 10.0)));
        assert_eq!(grid.input_state(), InputState::Resize);
        grid.on_mouse_move(&mouse(200.0, 10.0));
        grid.on_mouse_up(&mouse(200.0, 10.0));

        assert_eq!(selection.current_selection(), before);
    }

    #[test]
    fn body_press_selects_and_drag_extends() {
        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        let selection = attach_selection(&grid, model);

        // Cell (2, 1): x 128..192, y 60..80.
        assert!(press(&grid, mouse(130.0, 65.0)));
        assert_eq!(
            selection.current_selection(),
            Some(Selection {
                r1: 2,
                c1: 1,
                r2: 2,
                c2: 1
            })
        );

        // Drag to cell (4, 2).
        grid.on_mouse_move(&mouse(200.0, 110.0));
        assert_eq!(
            selection.current_selection(),
            Some(Selection {
                r1: 2,
                c1: 1,
                r2: 4,
                c2: 2
            })
        );
        assert_eq!(
            (selection.cursor_row(), selection.cursor_column()),
            (2, 1)
        );
        grid.on_mouse_up(&mouse(200.0, 110.0));
    }

    #[test]
    fn accel_press_accumulates_selections() {
        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        let selection = attach_selection(&grid, model);

        press(&grid, mouse(100.0, 30.0));
        grid.on_mouse_up(&mouse(100.0, 30.0));
        press(&grid, mouse_mod(200.0, 110.0, flags![Modifiers::{CTRL}]));
        grid.on_mouse_up(&mouse(200.0, 110.0));

        assert_eq!(selection.selections().count(), 2);
    }

    #[test]
    fn shift_press_extends_from_the_cursor() {
        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        let selection = attach_selection(&grid, model);

        press(&grid, mouse(100.0, 30.0)); // cell (0, 0)
        grid.on_mouse_up(&mouse(100.0, 30.0));
        press(&grid, mouse_mod(200.0, 110.0, flags![Modifiers::{SHIFT}])); // cell (4, 2)
        grid.on_mouse_up(&mouse(200.0, 110.0));

        assert_eq!(
            selection.current_selection(),
            Some(Selection {
                r1: 0,
                c1: 0,
                r2: 4,
                c2: 2
            })
        );
        assert_eq!(selection.selections().count(), 1);
    }

    #[test]
    fn header_presses_select_whole_lines() {
        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        let selection = attach_selection(&grid, model);

        // Column header of body column 1.
        press(&grid, mouse(64.0 + 70.0, 10.0));
        grid.on_mouse_up(&mouse(134.0, 10.0));
        let sel = selection.current_selection().unwrap();
        assert_eq!((sel.r1, sel.c1, sel.c2), (0, 1, 1));
        assert_eq!(sel.r2, SECTION_MAX);
        assert!(selection.contains(9, 1));

        // Row header of body row 3.
        press(&grid, mouse(10.0, 20.0 + 3.0 * 20.0 + 5.0));
        grid.on_mouse_up(&mouse(10.0, 85.0));
        let sel = selection.current_selection().unwrap();
        assert_eq!((sel.r1, sel.r2, sel.c1), (3, 3, 0));
        assert_eq!(sel.c2, SECTION_MAX);

        // Corner header selects everything.
        press(&grid, mouse(10.0, 10.0));
        grid.on_mouse_up(&mouse(10.0, 10.0));
        let sel = selection.current_selection().unwrap();
        assert_eq!((sel.r1, sel.c1), (0, 0));
        assert_eq!((sel.r2, sel.c2), (SECTION_MAX, SECTION_MAX));
    }

    #[test]
    fn body_press_without_a_selection_model_is_ignored() {
        let (grid, platform, _) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();

        assert!(!press(&grid, mouse(100.0, 100.0)));
        assert_eq!(grid.input_state(), InputState::Default);
    }

    #[test]
    fn autoscroll_schedules_with_the_edge_timeout() {
        let (grid, platform, model) = make_grid(100, 100);
        grid.set_viewport_size([400, 300]);
        platform.step();
        let selection = attach_selection(&grid, model);

        press(&grid, mouse(100.0, 100.0));
        // 64 px beyond the right edge.
        grid.on_mouse_move(&mouse(400.0 + 64.0, 100.0));
        assert_eq!(platform.pending_timers(), 1);
        assert_eq!(
            platform.last_timer_delay(),
            Some(Duration::from_millis(65))
        );

        // Each tick extends the selection toward the edge and reschedules;
        // once the far corner passes the fold the grid starts scrolling.
        let before = selection.current_selection().unwrap();
        assert!(platform.fire_next_timer());
        let after = selection.current_selection().unwrap();
        assert_eq!(after.c2, before.c2 + 1);
        assert_eq!(platform.pending_timers(), 1);
        for _ in 0..9 {
            assert!(platform.fire_next_timer());
        }
        assert!(grid.scroll_x() > 0);
        assert_eq!(platform.pending_timers(), 1);

        grid.on_mouse_up(&mouse(100.0, 100.0));
        assert_eq!(platform.pending_timers(), 0);
    }

    #[test]
    fn autoscroll_stops_when_the_pointer_returns() {
        let (grid, platform, model) = make_grid(100, 100);
        grid.set_viewport_size([400, 300]);
        platform.step();
        attach_selection(&grid, model);

        press(&grid, mouse(100.0, 100.0));
        grid.on_mouse_move(&mouse(500.0, 100.0));
        assert_eq!(platform.pending_timers(), 1);

        // Re-entering the interior clears the timeout; the pending tick
        // must not reschedule.
        grid.on_mouse_move(&mouse(200.0, 100.0));
        assert!(platform.fire_next_timer());
        assert_eq!(platform.pending_timers(), 0);

        grid.on_mouse_up(&mouse(200.0, 100.0));
    }

    #[test]
    fn wheel_scrolls_in_default_and_is_consumed_during_gestures() {
        let (grid, platform, model) = make_grid(100, 100);
        grid.set_viewport_size([400, 300]);
        platform.step();
        attach_selection(&grid, model);

        assert!(grid.on_wheel(&WheelEvent {
            client_x: 100.0,
            client_y: 100.0,
            delta_x: 0.0,
            delta_y: 3.0,
            delta_mode: WheelDeltaMode::Line,
            modifiers: Modifiers::empty(),
        }));
        assert_eq!(grid.scroll_y(), 60);

        assert!(grid.on_wheel(&WheelEvent {
            client_x: 100.0,
            client_y: 100.0,
            delta_x: 1.0,
            delta_y: 0.0,
            delta_mode: WheelDeltaMode::Page,
            modifiers: Modifiers::empty(),
        }));
        assert_eq!(grid.scroll_x(), 336);

        press(&grid, mouse(100.0, 100.0));
        let y = grid.scroll_y();
        assert!(grid.on_wheel(&WheelEvent {
            client_x: 100.0,
            client_y: 100.0,
            delta_x: 0.0,
            delta_y: 3.0,
            delta_mode: WheelDeltaMode::Pixel,
            modifiers: Modifiers::empty(),
        }));
        assert_eq!(grid.scroll_y(), y);
        grid.on_mouse_up(&mouse(100.0, 100.0));
    }

    #[test]
    fn context_menu_is_swallowed_during_gestures() {
        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        attach_selection(&grid, model);

        assert!(!grid.on_context_menu());
        press(&grid, mouse(100.0, 100.0));
        assert!(grid.on_context_menu());
        grid.on_mouse_up(&mouse(100.0, 100.0));
        assert!(!grid.on_context_menu());
    }

    #[test]
    fn move_gesture_reports_a_request() {
        use enclose::enc;
        use std::cell::RefCell;

        let (grid, platform, model) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();
        let selection = Rc::new(SelectionModel::new(
            model.clone() as Rc<dyn DataModel>,
            SelectionOptions {
                mode: SelectionMode::Column,
                ..Default::default()
            },
        ));
        grid.set_selection_model(Some(selection.clone()));
        grid.set_columns_movable(true);

        let requests = Rc::new(RefCell::new(Vec::new()));
        grid.set_on_move_requested(enc!((requests) move |request: &MoveRequest| {
            requests.borrow_mut().push(*request);
        }));

        // Select column 1, then drag its header onto column 3.
        selection.select(SelectArgs {
            r1: 0,
            c1: 1,
            r2: 0,
            c2: 1,
            cursor_row: 0,
            cursor_column: 1,
            clear: Clear::All,
        });
        assert!(press(&grid, mouse(64.0 + 70.0, 10.0)));
        assert_eq!(grid.input_state(), InputState::Move);
        assert_eq!(platform.current_cursor(), Some(CursorShape::Grabbing));

        grid.on_mouse_move(&mouse(64.0 + 3.0 * 64.0 + 10.0, 10.0));
        grid.on_mouse_up(&mouse(64.0 + 3.0 * 64.0 + 10.0, 10.0));

        assert_eq!(
            *requests.borrow(),
            vec![MoveRequest {
                axis: MoveAxis::Columns,
                index: 1,
                destination: 3,
            }]
        );
        assert_eq!(grid.input_state(), InputState::Default);
        assert_eq!(platform.current_cursor(), None);
    }

    #[test]
    fn invalid_resize_state_recovers_to_default() {
        let (grid, platform, _) = make_grid(10, 5);
        grid.set_viewport_size([400, 300]);
        platform.step();

        grid.inner.input.borrow_mut().state = InputState::Resize;
        assert!(grid.on_mouse_move(&mouse(100.0, 100.0)));
        assert_eq!(grid.input_state(), InputState::Default);
    }

    #[test]
    fn dispose_during_a_press_releases_everything() {
        let (grid, platform, model) = make_grid(100, 100);
        grid.set_viewport_size([400, 300]);
        platform.step();
        attach_selection(&grid, model);

        press(&grid, mouse(100.0, 100.0));
        grid.on_mouse_move(&mouse(500.0, 100.0));
        assert_eq!(platform.pending_timers(), 1);

        grid.dispose();
        assert_eq!(grid.input_state(), InputState::Default);
        assert_eq!(platform.pending_timers(), 0);
        assert_eq!(platform.current_cursor(), None);
    }

    /// Randomized event storms always leave the automaton in `Default`
    /// after the final mouse-up.
    #[test]
    fn event_storms_end_in_default() {
        struct Xorshift32(u32);

        impl Xorshift32 {
            fn next(&mut self) -> u32 {
                self.0 ^= self.0 << 13;
                self.0 ^= self.0 >> 17;
                self.0 ^= self.0 << 5;
                self.0
            }
        }

        let mut rng = Xorshift32(0x1d2e3f40);
        let (grid, platform, model) = make_grid(50, 20);
        grid.set_viewport_size([400, 300]);
        platform.step();
        attach_selection(&grid, model);
        grid.set_rows_movable(true);
        grid.set_columns_movable(true);

        for _ in 0..500 {
            let x = (rng.next() % 500) as f64 - 50.0;
            let y = (rng.next() % 400) as f64 - 50.0;
            let modifiers = Modifiers::from_bits_truncate((rng.next() % 16) as u8);
            match rng.next() % 4 {
                0 => {
                    grid.on_mouse_down(&mouse_mod(x, y, modifiers));
                }
                1 => {
                    grid.on_mouse_move(&mouse_mod(x, y, modifiers));
                }
                2 => {
                    grid.on_mouse_up(&mouse(x, y));
                }
                _ => {
                    grid.on_wheel(&WheelEvent {
                        client_x: x,
                        client_y: y,
                        delta_x: x / 10.0,
                        delta_y: y / 10.0,
                        delta_mode: WheelDeltaMode::Pixel,
                        modifiers,
                    });
                }
            }
            // Autoscroll keeps rescheduling while the pointer is outside,
            // so drain only a bounded number of ticks.
            for _ in 0..2 {
                if !platform.fire_next_timer() {
                    break;
                }
            }
            platform.step();
        }

        grid.on_mouse_up(&mouse(0.0, 0.0));
        assert_eq!(grid.input_state(), InputState::Default);
        assert_eq!(platform.current_cursor(), None);
        assert_eq!(platform.pending_timers(), 0);
    }
}
