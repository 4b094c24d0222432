//! Implements the grid engine, a viewport over an abstract data source that
//! renders only the cells intersecting the visible area.
//!
//! # General Properties
//!
//! - The grid supports displaying models with very large row and column
//!   counts. Per-frame work is proportional to the number of visible cells
//!   and the number of explicitly resized sections, not the model size.
//! - Every row and column can be resized independently (see
//!   [`crate::sections::SectionList`]).
//! - The grid stores no cell data; values are pulled from the
//!   [`DataModel`](crate::model::DataModel) while painting and forgotten.
//!
//! # Structure
//!
//! [`Grid`] is a thin handle over a shared `Inner`. The four subsystems
//! (painting, scrolling, hit testing, and input) are implemented as `impl
//! Inner` blocks in the respective submodules. The host drives the grid by
//! feeding it raw pointer/keyboard/wheel events, viewport sizes, and expose
//! rectangles, and supplies the ambient services through
//! [`Platform`](crate::platform::Platform).
//!
//! The grid paints into four regions: the scrollable *body*, the *row
//! header* on the left, the *column header* on the top, and the *corner
//! header* where the two headers meet. Surface area covered by none of them
//! is *void*.
use std::{
    cell::{Cell, RefCell},
    cmp::min,
    fmt,
    rc::Rc,
};

use handlerlist::Ticket;

use crate::geom::Rect;
use crate::gfx::{CompositeMode, RGBAF32};
use crate::model::{CellRegion, ColumnRegion, DataModel, ModelChange, RowRegion};
use crate::platform::{CursorStack, Platform};
use crate::render::{CellRenderer, Striping};
use crate::scrollbar::{Axis, Scrollbar};
use crate::sections::{Index, SectionList, Size};
use crate::selection::SelectionModel;

mod hittest;
mod input;
mod keyboard;
mod paint;
mod scroll;

pub use self::hittest::{HitTestResult, ResizeHandle};
pub use self::input::{
    InputState, Key, KeyEvent, Modifiers, MouseEvent, MoveAxis, MoveRequest, WheelDeltaMode,
    WheelEvent,
};
pub use self::scroll::ScrollDir;

use self::input::InputData;

/// The uniform base sizes the four section lists start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSizes {
    pub row_height: Size,
    pub column_width: Size,
    pub row_header_width: Size,
    pub column_header_height: Size,
}

impl Default for DefaultSizes {
    fn default() -> Self {
        Self {
            row_height: 20,
            column_width: 64,
            row_header_width: 64,
            column_header_height: 20,
        }
    }
}

/// Colors and striping for the grid chrome. Cell interiors are the
/// renderer's business.
#[derive(Clone)]
pub struct GridStyle {
    pub void_color: RGBAF32,
    pub background_color: RGBAF32,
    pub grid_line_color: RGBAF32,
    pub header_background_color: RGBAF32,
    pub header_grid_line_color: RGBAF32,
    /// The composite mode used to stroke grid lines. The default,
    /// `Multiply`, darkens cell backgrounds uniformly; see
    /// [`CompositeMode::Multiply`] for the fallback story.
    pub grid_line_composite: CompositeMode,
    pub row_striping: Option<Rc<dyn Striping>>,
    pub column_striping: Option<Rc<dyn Striping>>,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            void_color: RGBAF32::new(0.953, 0.953, 0.953, 1.0),
            background_color: RGBAF32::new(1.0, 1.0, 1.0, 1.0),
            grid_line_color: RGBAF32::new(0.078, 0.078, 0.078, 0.15),
            header_background_color: RGBAF32::new(0.953, 0.953, 0.953, 1.0),
            header_grid_line_color: RGBAF32::new(0.078, 0.078, 0.078, 0.25),
            grid_line_composite: CompositeMode::Multiply,
            row_striping: None,
            column_striping: None,
        }
    }
}

impl fmt::Debug for GridStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridStyle")
            .field("void_color", &self.void_color)
            .field("background_color", &self.background_color)
            .field("grid_line_color", &self.grid_line_color)
            .field("header_background_color", &self.header_background_color)
            .field("header_grid_line_color", &self.header_grid_line_color)
            .field("grid_line_composite", &self.grid_line_composite)
            .field("row_striping", &self.row_striping.is_some())
            .field("column_striping", &self.column_striping.is_some())
            .finish()
    }
}

/// A scrollable, resizable grid viewport over an abstract data source.
pub struct Grid<P: Platform> {
    inner: Rc<Inner<P>>,
}

impl<P: Platform> fmt::Debug for Grid<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Grid")
            .field("scroll", &(state.scroll_x, state.scroll_y))
            .field("viewport_size", &state.viewport_size)
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

pub(crate) struct Inner<P: Platform> {
    platform: P,
    state: RefCell<State<P>>,
    input: RefCell<InputData<P>>,
    cursor_stack: CursorStack<P>,
    /// Reentrancy guard for the paint pipeline.
    in_paint: Cell<bool>,
    /// Set while a conflated repaint request is queued.
    update_pending: Cell<bool>,
    disposed: Cell<bool>,
}

pub(crate) struct State<P: Platform> {
    pub model: Option<Rc<dyn DataModel>>,
    pub model_ticket: Option<Ticket>,
    pub renderer: Option<Rc<dyn CellRenderer<P::Surface>>>,
    pub selection: Option<Rc<SelectionModel>>,
    pub selection_ticket: Option<Ticket>,

    /// Body rows.
    pub row_sections: SectionList,
    /// Body columns.
    pub column_sections: SectionList,
    /// Columns of the row header.
    pub row_header_sections: SectionList,
    /// Rows of the column header.
    pub column_header_sections: SectionList,

    pub scroll_x: Size,
    pub scroll_y: Size,
    pub viewport_size: [u32; 2],
    pub visible: bool,

    /// The on-screen surface. Lazily created at the first non-empty size.
    pub screen: Option<P::Surface>,
    /// Scratch surface for blits; never handed out.
    pub buffer: Option<P::Surface>,

    pub style: GridStyle,
    pub scrollbars: [Option<Rc<dyn Scrollbar>>; 2],

    pub rows_movable: bool,
    pub columns_movable: bool,
    pub move_handler: Option<Rc<dyn Fn(&MoveRequest)>>,
}

impl<P: Platform> State<P> {
    pub fn viewport_width(&self) -> Size {
        self.viewport_size[0] as Size
    }

    pub fn viewport_height(&self) -> Size {
        self.viewport_size[1] as Size
    }

    pub fn header_width(&self) -> Size {
        self.row_header_sections.total_size()
    }

    pub fn header_height(&self) -> Size {
        self.column_header_sections.total_size()
    }

    pub fn page_width(&self) -> Size {
        (self.viewport_width() - self.header_width()).max(0)
    }

    pub fn page_height(&self) -> Size {
        (self.viewport_height() - self.header_height()).max(0)
    }

    pub fn max_scroll_x(&self) -> Size {
        (self.column_sections.total_size() - self.page_width()).max(0)
    }

    pub fn max_scroll_y(&self) -> Size {
        (self.row_sections.total_size() - self.page_height()).max(0)
    }

    /// The row and column lists of a paintable region.
    pub fn lists_for(&self, region: CellRegion) -> (&SectionList, &SectionList) {
        match region {
            CellRegion::Body => (&self.row_sections, &self.column_sections),
            CellRegion::RowHeader => (&self.row_sections, &self.row_header_sections),
            CellRegion::ColumnHeader => (&self.column_header_sections, &self.column_sections),
            CellRegion::CornerHeader => {
                (&self.column_header_sections, &self.row_header_sections)
            }
            CellRegion::Void => (&self.row_sections, &self.column_sections),
        }
    }

    pub fn row_list(&self, region: RowRegion) -> &SectionList {
        match region {
            RowRegion::Body => &self.row_sections,
            RowRegion::ColumnHeader => &self.column_header_sections,
        }
    }

    pub fn row_list_mut(&mut self, region: RowRegion) -> &mut SectionList {
        match region {
            RowRegion::Body => &mut self.row_sections,
            RowRegion::ColumnHeader => &mut self.column_header_sections,
        }
    }

    pub fn column_list(&self, region: ColumnRegion) -> &SectionList {
        match region {
            ColumnRegion::Body => &self.column_sections,
            ColumnRegion::RowHeader => &self.row_header_sections,
        }
    }

    pub fn column_list_mut(&mut self, region: ColumnRegion) -> &mut SectionList {
        match region {
            ColumnRegion::Body => &mut self.column_sections,
            ColumnRegion::RowHeader => &mut self.row_header_sections,
        }
    }

    /// The viewport coordinates of a region's content origin, and the scroll
    /// offset that applies inside the region.
    pub fn region_origin_and_scroll(
        &self,
        region: CellRegion,
    ) -> (cgmath::Point2<Size>, cgmath::Vector2<Size>) {
        let hw = self.header_width();
        let hh = self.header_height();
        match region {
            CellRegion::Body => (
                cgmath::Point2::new(hw, hh),
                cgmath::Vector2::new(self.scroll_x, self.scroll_y),
            ),
            CellRegion::RowHeader => (
                cgmath::Point2::new(0, hh),
                cgmath::Vector2::new(0, self.scroll_y),
            ),
            CellRegion::ColumnHeader => (
                cgmath::Point2::new(hw, 0),
                cgmath::Vector2::new(self.scroll_x, 0),
            ),
            CellRegion::CornerHeader | CellRegion::Void => {
                (cgmath::Point2::new(0, 0), cgmath::Vector2::new(0, 0))
            }
        }
    }

    /// The visible extent of a region in viewport coordinates, clipped to
    /// the viewport and to the region's content.
    pub fn region_bounds(&self, region: CellRegion) -> Rect {
        let w = self.viewport_width();
        let h = self.viewport_height();
        let hw = self.header_width();
        let hh = self.header_height();
        let body_w = self.column_sections.total_size() - self.scroll_x;
        let body_h = self.row_sections.total_size() - self.scroll_y;
        let rect = match region {
            CellRegion::Body => Rect::from_xywh(hw, hh, body_w, body_h),
            CellRegion::RowHeader => Rect::from_xywh(0, hh, hw, body_h),
            CellRegion::ColumnHeader => Rect::from_xywh(hw, 0, body_w, hh),
            CellRegion::CornerHeader => Rect::from_xywh(0, 0, hw, hh),
            CellRegion::Void => Rect::from_xywh(0, 0, w, h),
        };
        rect.intersection(&Rect::from_xywh(0, 0, w, h))
    }
}

impl<P: Platform> Grid<P> {
    /// Construct a grid with the default base sizes.
    pub fn new(platform: P) -> Self {
        Self::with_default_sizes(platform, DefaultSizes::default())
    }

    pub fn with_default_sizes(platform: P, sizes: DefaultSizes) -> Self {
        let inner = Rc::new(Inner {
            cursor_stack: CursorStack::new(platform.clone()),
            platform,
            state: RefCell::new(State {
                model: None,
                model_ticket: None,
                renderer: None,
                selection: None,
                selection_ticket: None,
                row_sections: SectionList::new(sizes.row_height),
                column_sections: SectionList::new(sizes.column_width),
                row_header_sections: SectionList::new(sizes.row_header_width),
                column_header_sections: SectionList::new(sizes.column_header_height),
                scroll_x: 0,
                scroll_y: 0,
                viewport_size: [0, 0],
                visible: true,
                screen: None,
                buffer: None,
                style: GridStyle::default(),
                scrollbars: [None, None],
                rows_movable: false,
                columns_movable: false,
                move_handler: None,
            }),
            input: RefCell::new(InputData::new()),
            in_paint: Cell::new(false),
            update_pending: Cell::new(false),
            disposed: Cell::new(false),
        });
        Self { inner }
    }

    pub fn model(&self) -> Option<Rc<dyn DataModel>> {
        self.inner.state.borrow().model.clone()
    }

    /// Replace the data model. The section lists are rebuilt from the new
    /// model's counts, the scroll position is reset, and a repaint is
    /// scheduled.
    pub fn set_model(&self, model: Option<Rc<dyn DataModel>>) {
        if self.inner.disposed.get() {
            return;
        }
        let selection = {
            let st = &mut *self.inner.state.borrow_mut();
            if let Some(ticket) = st.model_ticket.take() {
                ticket.detach();
            }
            st.model = model.clone();
            st.scroll_x = 0;
            st.scroll_y = 0;
            resync_sections(st);
            st.selection.clone()
        };
        if let Some(selection) = selection {
            selection.clear();
        }
        if let Some(model) = &model {
            let weak = Rc::downgrade(&self.inner);
            let ticket = model.connect_changed(Box::new(move |change| {
                if let Some(inner) = weak.upgrade() {
                    Inner::handle_model_change(&inner, change);
                }
            }));
            self.inner.state.borrow_mut().model_ticket = ticket;
        }
        self.inner.sync_scrollbars();
        Inner::schedule_repaint(&self.inner);
    }

    pub fn renderer(&self) -> Option<Rc<dyn CellRenderer<P::Surface>>> {
        self.inner.state.borrow().renderer.clone()
    }

    pub fn set_renderer(&self, renderer: Option<Rc<dyn CellRenderer<P::Surface>>>) {
        if self.inner.disposed.get() {
            return;
        }
        self.inner.state.borrow_mut().renderer = renderer;
        Inner::schedule_repaint(&self.inner);
    }

    pub fn selection_model(&self) -> Option<Rc<SelectionModel>> {
        self.inner.state.borrow().selection.clone()
    }

    pub fn set_selection_model(&self, selection: Option<Rc<SelectionModel>>) {
        if self.inner.disposed.get() {
            return;
        }
        {
            let st = &mut *self.inner.state.borrow_mut();
            if let Some(ticket) = st.selection_ticket.take() {
                ticket.detach();
            }
            st.selection = selection.clone();
        }
        if let Some(selection) = &selection {
            let weak = Rc::downgrade(&self.inner);
            let ticket = selection.connect_changed(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Inner::schedule_repaint(&inner);
                }
            }));
            self.inner.state.borrow_mut().selection_ticket = Some(ticket);
        }
        Inner::schedule_repaint(&self.inner);
    }

    pub fn style(&self) -> GridStyle {
        self.inner.state.borrow().style.clone()
    }

    pub fn set_style(&self, style: GridStyle) {
        if self.inner.disposed.get() {
            return;
        }
        self.inner.state.borrow_mut().style = style;
        Inner::schedule_repaint(&self.inner);
    }

    pub fn set_row_striping(&self, striping: Option<Rc<dyn Striping>>) {
        if self.inner.disposed.get() {
            return;
        }
        self.inner.state.borrow_mut().style.row_striping = striping;
        Inner::schedule_repaint(&self.inner);
    }

    pub fn set_column_striping(&self, striping: Option<Rc<dyn Striping>>) {
        if self.inner.disposed.get() {
            return;
        }
        self.inner.state.borrow_mut().style.column_striping = striping;
        Inner::schedule_repaint(&self.inner);
    }

    /// Attach or detach a scrollbar. The grid immediately pushes the current
    /// value and page step.
    pub fn set_scrollbar(&self, axis: Axis, scrollbar: Option<Rc<dyn Scrollbar>>) {
        if self.inner.disposed.get() {
            return;
        }
        self.inner.state.borrow_mut().scrollbars[axis.i()] = scrollbar;
        self.inner.sync_scrollbars();
    }

    pub fn scroll_x(&self) -> Size {
        self.inner.state.borrow().scroll_x
    }

    pub fn scroll_y(&self) -> Size {
        self.inner.state.borrow().scroll_y
    }

    pub fn max_scroll_x(&self) -> Size {
        self.inner.state.borrow().max_scroll_x()
    }

    pub fn max_scroll_y(&self) -> Size {
        self.inner.state.borrow().max_scroll_y()
    }

    pub fn page_width(&self) -> Size {
        self.inner.state.borrow().page_width()
    }

    pub fn page_height(&self) -> Size {
        self.inner.state.borrow().page_height()
    }

    pub fn total_width(&self) -> Size {
        self.inner.state.borrow().column_sections.total_size()
    }

    pub fn total_height(&self) -> Size {
        self.inner.state.borrow().row_sections.total_size()
    }

    pub fn header_width(&self) -> Size {
        self.inner.state.borrow().header_width()
    }

    pub fn header_height(&self) -> Size {
        self.inner.state.borrow().header_height()
    }

    pub fn default_sizes(&self) -> DefaultSizes {
        let st = self.inner.state.borrow();
        DefaultSizes {
            row_height: st.row_sections.base_size(),
            column_width: st.column_sections.base_size(),
            row_header_width: st.row_header_sections.base_size(),
            column_header_height: st.column_header_sections.base_size(),
        }
    }

    pub fn row_count(&self, region: RowRegion) -> Index {
        self.inner.state.borrow().row_list(region).count()
    }

    pub fn column_count(&self, region: ColumnRegion) -> Index {
        self.inner.state.borrow().column_list(region).count()
    }

    pub fn row_size(&self, region: RowRegion, index: Index) -> Option<Size> {
        self.inner.state.borrow().row_list(region).section_size(index)
    }

    pub fn column_size(&self, region: ColumnRegion, index: Index) -> Option<Size> {
        self.inner
            .state
            .borrow()
            .column_list(region)
            .section_size(index)
    }

    /// Resize a row. Out-of-range indices are ignored.
    pub fn resize_row(&self, region: RowRegion, index: Index, size: Size) {
        Inner::resize_row(&self.inner, region, index, size);
    }

    /// Resize a column. Out-of-range indices are ignored.
    pub fn resize_column(&self, region: ColumnRegion, index: Index, size: Size) {
        Inner::resize_column(&self.inner, region, index, size);
    }

    /// Tell the grid how large its on-screen surface should be. The first
    /// non-empty size creates the surfaces; later calls resize them in place
    /// and repaint only the newly exposed strips.
    pub fn set_viewport_size(&self, size: [u32; 2]) {
        self.inner.set_viewport_size(size);
    }

    pub fn viewport_size(&self) -> [u32; 2] {
        self.inner.state.borrow().viewport_size
    }

    /// While invisible, scrolls update only the logical offsets and paints
    /// are skipped.
    pub fn set_visible(&self, visible: bool) {
        if self.inner.disposed.get() {
            return;
        }
        let changed = {
            let st = &mut *self.inner.state.borrow_mut();
            let changed = st.visible != visible;
            st.visible = visible;
            changed
        };
        if changed && visible {
            Inner::schedule_repaint(&self.inner);
        }
    }

    /// Schedule a full repaint. Multiple synchronous requests collapse into
    /// a single paint.
    pub fn repaint(&self) {
        Inner::schedule_repaint(&self.inner);
    }

    /// Repaint a rectangle of the viewport immediately, e.g., from a host
    /// expose event.
    pub fn paint(&self, rect: Rect) {
        self.inner.paint(rect);
    }

    pub fn scroll_to(&self, x: f64, y: f64) {
        self.inner
            .scroll_to(x.floor() as Size, y.floor() as Size);
    }

    pub fn scroll_by(&self, dx: f64, dy: f64) {
        self.inner
            .scroll_by(dx.floor() as Size, dy.floor() as Size);
    }

    /// Scroll by one section in the given direction.
    pub fn scroll_by_step(&self, dir: ScrollDir) {
        self.inner.scroll_by_step(dir);
    }

    /// Scroll by one page (the visible content extent) in the given
    /// direction.
    pub fn scroll_by_page(&self, dir: ScrollDir) {
        self.inner.scroll_by_page(dir);
    }

    /// Scroll the minimal amount that makes the row visible.
    pub fn scroll_to_row(&self, row: Index) {
        self.inner.scroll_to_row(row);
    }

    /// Scroll the minimal amount that makes the column visible.
    pub fn scroll_to_column(&self, column: Index) {
        self.inner.scroll_to_column(column);
    }

    /// Scroll the minimal amount that makes the cell visible.
    pub fn scroll_to_cell(&self, row: Index, column: Index) {
        self.inner.scroll_to_cell(row, column);
    }

    /// Map a point in viewport coordinates to the cell under it.
    pub fn hit_test(&self, client_x: f64, client_y: f64) -> HitTestResult {
        self.inner
            .hit_test(cgmath::Point2::new(client_x, client_y))
    }

    /// The resize handle at a hit-test position, if any. Useful for hover
    /// cursor feedback.
    pub fn resize_handle_for(&self, hit: &HitTestResult) -> ResizeHandle {
        hittest::resize_handle_for(hit)
    }

    /// Feed a mouse-down event. Returns `true` if the grid consumed it; the
    /// host must then route subsequent document-level mouse, key, and
    /// context-menu events to this grid until the press ends.
    pub fn on_mouse_down(&self, ev: &MouseEvent) -> bool {
        Inner::on_mouse_down(&self.inner, ev)
    }

    pub fn on_mouse_move(&self, ev: &MouseEvent) -> bool {
        Inner::on_mouse_move(&self.inner, ev)
    }

    pub fn on_mouse_up(&self, ev: &MouseEvent) -> bool {
        self.inner.on_mouse_up(ev)
    }

    pub fn on_wheel(&self, ev: &WheelEvent) -> bool {
        self.inner.on_wheel(ev)
    }

    pub fn on_key_down(&self, ev: &KeyEvent) -> bool {
        self.inner.on_key_down(ev)
    }

    /// A context-menu request is swallowed while a press gesture is active.
    pub fn on_context_menu(&self) -> bool {
        self.inner.on_context_menu()
    }

    /// The current input automaton state.
    pub fn input_state(&self) -> InputState {
        self.inner.input.borrow().state
    }

    /// The scrollbar thumb was dragged to `value ∈ [0, 1]`.
    pub fn scrollbar_thumb_moved(&self, axis: Axis, value: f64) {
        self.inner.scrollbar_thumb_moved(axis, value);
    }

    pub fn scrollbar_page_requested(&self, axis: Axis, dir: crate::scrollbar::Dir) {
        self.inner.scrollbar_page_requested(axis, dir);
    }

    pub fn scrollbar_step_requested(&self, axis: Axis, dir: crate::scrollbar::Dir) {
        self.inner.scrollbar_step_requested(axis, dir);
    }

    /// Allow dragging selected row headers to reorder rows. The actual move
    /// is reported through the handler set with
    /// [`Grid::set_on_move_requested`]; the host applies it to its model.
    pub fn set_rows_movable(&self, movable: bool) {
        self.inner.state.borrow_mut().rows_movable = movable;
    }

    /// Allow dragging selected column headers to reorder columns.
    pub fn set_columns_movable(&self, movable: bool) {
        self.inner.state.borrow_mut().columns_movable = movable;
    }

    pub fn set_on_move_requested(&self, handler: impl Fn(&MoveRequest) + 'static) {
        self.inner.state.borrow_mut().move_handler = Some(Rc::new(handler));
    }

    /// Release everything. Every later operation on the grid is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

/// Rebuild the four section lists from the model's counts.
fn resync_sections<P: Platform>(st: &mut State<P>) {
    let (rows, columns, header_columns, header_rows) = match &st.model {
        Some(model) => (
            count(model.row_count(RowRegion::Body)),
            count(model.column_count(ColumnRegion::Body)),
            count(model.column_count(ColumnRegion::RowHeader)),
            count(model.row_count(RowRegion::ColumnHeader)),
        ),
        None => (0, 0, 0, 0),
    };
    reset_sections(&mut st.row_sections, rows);
    reset_sections(&mut st.column_sections, columns);
    reset_sections(&mut st.row_header_sections, header_columns);
    reset_sections(&mut st.column_header_sections, header_rows);
}

fn reset_sections(list: &mut SectionList, count: Index) {
    list.clear();
    list.insert_sections(0, count);
}

fn count(n: u64) -> Index {
    min(n, Index::MAX as u64) as Index
}

impl<P: Platform> Inner<P> {
    /// Handle a `changed` emission from the data model.
    fn handle_model_change(this: &Rc<Self>, change: &ModelChange) {
        if this.disposed.get() {
            return;
        }
        match *change {
            ModelChange::RowsInserted {
                region,
                index,
                span,
            } => {
                this.state
                    .borrow_mut()
                    .row_list_mut(region)
                    .insert_sections(index, span);
                Inner::after_structure_change(this);
            }
            ModelChange::RowsRemoved {
                region,
                index,
                span,
            } => {
                this.state
                    .borrow_mut()
                    .row_list_mut(region)
                    .remove_sections(index, span);
                Inner::after_structure_change(this);
            }
            ModelChange::ColumnsInserted {
                region,
                index,
                span,
            } => {
                this.state
                    .borrow_mut()
                    .column_list_mut(region)
                    .insert_sections(index, span);
                Inner::after_structure_change(this);
            }
            ModelChange::ColumnsRemoved {
                region,
                index,
                span,
            } => {
                this.state
                    .borrow_mut()
                    .column_list_mut(region)
                    .remove_sections(index, span);
                Inner::after_structure_change(this);
            }
            ModelChange::RowsMoved {
                region,
                index,
                span,
                destination,
            } => {
                this.state
                    .borrow_mut()
                    .row_list_mut(region)
                    .move_sections(index, span, destination);
                Inner::after_structure_change(this);
            }
            ModelChange::ColumnsMoved {
                region,
                index,
                span,
                destination,
            } => {
                this.state
                    .borrow_mut()
                    .column_list_mut(region)
                    .move_sections(index, span, destination);
                Inner::after_structure_change(this);
            }
            ModelChange::CellsChanged {
                region,
                row,
                column,
                row_span,
                column_span,
            } => {
                if let Some(rect) =
                    this.cells_changed_rect(region, row, column, row_span, column_span)
                {
                    this.paint(rect);
                }
            }
            ModelChange::ModelReset => {
                resync_sections(&mut *this.state.borrow_mut());
                Inner::after_structure_change(this);
            }
        }
    }

    /// Re-clamp the scroll position, refresh the scrollbars, and schedule a
    /// repaint after a section list changed shape.
    fn after_structure_change(this: &Rc<Self>) {
        let (sx, sy) = {
            let st = this.state.borrow();
            (st.scroll_x, st.scroll_y)
        };
        this.scroll_to(sx, sy);
        this.sync_scrollbars();
        Inner::schedule_repaint(this);
    }

    /// The viewport rectangle covering a changed cell range, or `None` when
    /// nothing visible is affected.
    fn cells_changed_rect(
        &self,
        region: CellRegion,
        row: Index,
        column: Index,
        row_span: Index,
        column_span: Index,
    ) -> Option<Rect> {
        if region == CellRegion::Void || row_span <= 0 || column_span <= 0 {
            return None;
        }
        let st = self.state.borrow();
        let (rows, cols) = st.lists_for(region);

        let y1 = rows.section_offset(row)?;
        let y2 = match rows.section_offset(row + row_span - 1) {
            Some(offset) => offset + rows.section_size(row + row_span - 1).unwrap_or(0),
            None => rows.total_size(),
        };
        let x1 = cols.section_offset(column)?;
        let x2 = match cols.section_offset(column + column_span - 1) {
            Some(offset) => offset + cols.section_size(column + column_span - 1).unwrap_or(0),
            None => cols.total_size(),
        };

        let (origin, scroll) = st.region_origin_and_scroll(region);
        let rect = Rect::new(
            cgmath::Point2::new(x1 - scroll.x + origin.x - 1, y1 - scroll.y + origin.y - 1),
            cgmath::Point2::new(x2 - scroll.x + origin.x, y2 - scroll.y + origin.y),
        );
        let rect = rect.intersection(&st.region_bounds(region));
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }

    pub(crate) fn resize_row(this: &Rc<Self>, region: RowRegion, index: Index, size: Size) {
        if this.disposed.get() {
            return;
        }
        this.state
            .borrow_mut()
            .row_list_mut(region)
            .resize_section(index, size);
        Inner::after_structure_change(this);
    }

    pub(crate) fn resize_column(
        this: &Rc<Self>,
        region: ColumnRegion,
        index: Index,
        size: Size,
    ) {
        if this.disposed.get() {
            return;
        }
        this.state
            .borrow_mut()
            .column_list_mut(region)
            .resize_section(index, size);
        Inner::after_structure_change(this);
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.abort_press();
        let st = &mut *self.state.borrow_mut();
        if let Some(ticket) = st.model_ticket.take() {
            ticket.detach();
        }
        if let Some(ticket) = st.selection_ticket.take() {
            ticket.detach();
        }
        st.model = None;
        st.renderer = None;
        st.selection = None;
        st.screen = None;
        st.buffer = None;
        st.scrollbars = [None, None];
        st.move_handler = None;
    }
}
