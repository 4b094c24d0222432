//! The paint pipeline: dirty rectangle → regions → cell ranges → draw calls.
use cgmath::{Point2, Vector2};
use log::{error, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use super::{Inner, State};
use crate::geom::Rect;
use crate::gfx::{CompositeMode, GraphicsContext, Surface, RGBAF32};
use crate::model::{CellRegion, DataModel};
use crate::platform::Platform;
use crate::render::{CellConfig, CellRenderer, Striping};
use crate::sections::{Index, SectionList, Size};

/// Everything needed to draw one region, in viewport coordinates.
struct RegionSpec<'a> {
    region: CellRegion,
    /// The region's visible extent, already clipped to the viewport and to
    /// the region's content.
    bounds: Rect,
    /// Viewport coordinates of the region's content origin.
    origin: Point2<Size>,
    /// The scroll offset that applies inside the region.
    scroll: Vector2<Size>,
    rows: &'a SectionList,
    cols: &'a SectionList,
    background: RGBAF32,
    grid_line: RGBAF32,
    row_striping: Option<&'a Rc<dyn Striping>>,
    column_striping: Option<&'a Rc<dyn Striping>>,
}

impl<P: Platform> Inner<P> {
    /// Schedule a full repaint. Multiple synchronous requests collapse into
    /// a single deferred paint.
    pub(crate) fn schedule_repaint(this: &Rc<Self>) {
        if this.disposed.get() {
            return;
        }
        if this.update_pending.replace(true) {
            return;
        }
        let weak = Rc::downgrade(this);
        this.platform.invoke(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.update_pending.set(false);
                if inner.disposed.get() {
                    return;
                }
                let viewport = {
                    let st = inner.state.borrow();
                    Rect::from_xywh(0, 0, st.viewport_width(), st.viewport_height())
                };
                inner.paint(viewport);
            }
        }));
    }

    /// Repaint a rectangle of the viewport.
    ///
    /// Reentrant calls are refused; a renderer must never trigger a paint.
    pub(crate) fn paint(&self, rect: Rect) {
        if self.disposed.get() {
            return;
        }
        if self.in_paint.get() {
            warn!("rejecting reentrant paint of {:?}", rect);
            return;
        }
        self.in_paint.set(true);
        self.paint_inner(rect);
        self.in_paint.set(false);
    }

    fn paint_inner(&self, rect: Rect) {
        let st = &mut *self.state.borrow_mut();
        if !st.visible {
            return;
        }
        let viewport = Rect::from_xywh(0, 0, st.viewport_width(), st.viewport_height());
        let rect = rect.intersection(&viewport);
        if rect.is_empty() {
            return;
        }

        let body_bounds = st.region_bounds(CellRegion::Body);
        let row_header_bounds = st.region_bounds(CellRegion::RowHeader);
        let column_header_bounds = st.region_bounds(CellRegion::ColumnHeader);
        let corner_bounds = st.region_bounds(CellRegion::CornerHeader);

        let State {
            screen,
            row_sections,
            column_sections,
            row_header_sections,
            column_header_sections,
            scroll_x,
            scroll_y,
            style,
            model,
            renderer,
            ..
        } = st;
        let screen = match screen.as_mut() {
            Some(screen) => screen,
            None => return,
        };

        let hw = row_header_sections.total_size();
        let hh = column_header_sections.total_size();
        let scroll = Vector2::new(*scroll_x, *scroll_y);

        let mut gc = GraphicsContext::new(screen);

        // Void first; the regions overpaint their share of it.
        gc.set_fill_rgb(style.void_color);
        gc.fill_rect(rect);

        let model = match model {
            Some(model) => model,
            None => return,
        };

        let specs = [
            RegionSpec {
                region: CellRegion::Body,
                bounds: body_bounds,
                origin: Point2::new(hw, hh),
                scroll,
                rows: row_sections,
                cols: column_sections,
                background: style.background_color,
                grid_line: style.grid_line_color,
                row_striping: style.row_striping.as_ref(),
                column_striping: style.column_striping.as_ref(),
            },
            RegionSpec {
                region: CellRegion::RowHeader,
                bounds: row_header_bounds,
                origin: Point2::new(0, hh),
                scroll: Vector2::new(0, scroll.y),
                rows: row_sections,
                cols: row_header_sections,
                background: style.header_background_color,
                grid_line: style.header_grid_line_color,
                row_striping: None,
                column_striping: None,
            },
            RegionSpec {
                region: CellRegion::ColumnHeader,
                bounds: column_header_bounds,
                origin: Point2::new(hw, 0),
                scroll: Vector2::new(scroll.x, 0),
                rows: column_header_sections,
                cols: column_sections,
                background: style.header_background_color,
                grid_line: style.header_grid_line_color,
                row_striping: None,
                column_striping: None,
            },
            RegionSpec {
                region: CellRegion::CornerHeader,
                bounds: corner_bounds,
                origin: Point2::new(0, 0),
                scroll: Vector2::new(0, 0),
                rows: column_header_sections,
                cols: row_header_sections,
                background: style.header_background_color,
                grid_line: style.header_grid_line_color,
                row_striping: None,
                column_striping: None,
            },
        ];

        for spec in &specs {
            draw_region(
                &mut gc,
                spec,
                rect,
                model,
                renderer.as_ref(),
                style.grid_line_composite,
            );
        }
    }
}

/// Draw the part of one region that intersects the dirty rectangle.
fn draw_region<S: Surface>(
    gc: &mut GraphicsContext<'_, S>,
    spec: &RegionSpec<'_>,
    dirty: Rect,
    model: &Rc<dyn DataModel>,
    renderer: Option<&Rc<dyn CellRenderer<S>>>,
    grid_line_composite: CompositeMode,
) {
    let r = spec.bounds.intersection(&dirty);
    if r.is_empty() {
        return;
    }

    // Translate the damage to a cell range.
    let vx1 = r.min.x - spec.origin.x + spec.scroll.x;
    let vy1 = r.min.y - spec.origin.y + spec.scroll.y;
    let vx2 = r.max.x - 1 - spec.origin.x + spec.scroll.x;
    let vy2 = r.max.y - 1 - spec.origin.y + spec.scroll.y;

    let (c1, r1) = match (spec.cols.section_index(vx1), spec.rows.section_index(vy1)) {
        (Some(c1), Some(r1)) => (c1, r1),
        _ => return,
    };
    let c2 = spec.cols.section_index(vx2).unwrap_or(spec.cols.count() - 1);
    let r2 = spec.rows.section_index(vy2).unwrap_or(spec.rows.count() - 1);

    // The leading cell's origin in viewport coordinates.
    let x0 = spec.cols.section_offset(c1).unwrap_or(0) - spec.scroll.x + spec.origin.x;
    let y0 = spec.rows.section_offset(r1).unwrap_or(0) - spec.scroll.y + spec.origin.y;

    let row_sizes: Vec<Size> = (r1..=r2)
        .map(|i| spec.rows.section_size(i).unwrap_or(0))
        .collect();
    let col_sizes: Vec<Size> = (c1..=c2)
        .map(|i| spec.cols.section_size(i).unwrap_or(0))
        .collect();

    let base_depth = gc.depth();
    gc.save();

    let result = catch_unwind(AssertUnwindSafe(|| {
        gc.begin_path();
        gc.rect(r);
        gc.clip();

        gc.set_fill_rgb(spec.background);
        gc.fill_rect(r);

        if let Some(striping) = spec.row_striping {
            draw_row_striping(gc, striping, r, y0, r1, &row_sizes);
        }
        if let Some(striping) = spec.column_striping {
            draw_column_striping(gc, striping, r, x0, c1, &col_sizes);
        }

        if let Some(renderer) = renderer {
            draw_cells(
                gc, spec, model, renderer, r, x0, y0, r1, c1, &row_sizes, &col_sizes,
            );
        }

        draw_grid_lines(gc, spec, r, x0, y0, &row_sizes, &col_sizes, grid_line_composite);
    }));
    if result.is_err() {
        error!(
            "a renderer or striping provider panicked; aborting the {:?} region",
            spec.region
        );
    }

    gc.restore_to(base_depth);
}

fn draw_row_striping<S: Surface>(
    gc: &mut GraphicsContext<'_, S>,
    striping: &Rc<dyn Striping>,
    r: Rect,
    y0: Size,
    r1: Index,
    row_sizes: &[Size],
) {
    let mut y = y0;
    for (i, &size) in row_sizes.iter().enumerate() {
        if size > 0 {
            if let Some(color) = striping.background_color(r1 + i as Index) {
                gc.set_fill_rgb(color);
                // Extended by one pixel so the grid lines blend over it.
                gc.fill_rect(Rect::from_xywh(r.min.x, y - 1, r.width(), size + 1));
            }
        }
        y += size;
    }
}

fn draw_column_striping<S: Surface>(
    gc: &mut GraphicsContext<'_, S>,
    striping: &Rc<dyn Striping>,
    r: Rect,
    x0: Size,
    c1: Index,
    col_sizes: &[Size],
) {
    let mut x = x0;
    for (j, &size) in col_sizes.iter().enumerate() {
        if size > 0 {
            if let Some(color) = striping.background_color(c1 + j as Index) {
                gc.set_fill_rgb(color);
                gc.fill_rect(Rect::from_xywh(x - 1, r.min.y, size + 1, r.height()));
            }
        }
        x += size;
    }
}

/// Draw the cells in column-major order, one clipped band per column.
fn draw_cells<S: Surface>(
    gc: &mut GraphicsContext<'_, S>,
    spec: &RegionSpec<'_>,
    model: &Rc<dyn DataModel>,
    renderer: &Rc<dyn CellRenderer<S>>,
    r: Rect,
    x0: Size,
    y0: Size,
    r1: Index,
    c1: Index,
    row_sizes: &[Size],
    col_sizes: &[Size],
) {
    let mut x = x0;
    for (j, &width) in col_sizes.iter().enumerate() {
        if width == 0 {
            continue;
        }
        let column = c1 + j as Index;

        gc.save();
        gc.begin_path();
        gc.rect(Rect::from_xywh(x - 1, r.min.y, width + 1, r.height()));
        gc.clip();

        let mut y = y0;
        for (i, &height) in row_sizes.iter().enumerate() {
            if height > 0 {
                let row = r1 + i as Index;
                let value = model.data(spec.region, row as u64, column as u64);
                if !value.is_blank() {
                    let metadata = model.metadata(spec.region, row as u64, column as u64);
                    let config = CellConfig {
                        // One pixel of bleed under the neighboring grid
                        // lines.
                        x: x - 1,
                        y: y - 1,
                        width: width + 1,
                        height: height + 1,
                        region: spec.region,
                        row,
                        column,
                        value,
                        metadata,
                    };
                    renderer.paint(gc, &config);
                }
            }
            y += height;
        }

        gc.restore();
        x += width;
    }
}

/// Stroke all grid lines of the region as a single path of 1-pixel crisp
/// lines.
fn draw_grid_lines<S: Surface>(
    gc: &mut GraphicsContext<'_, S>,
    spec: &RegionSpec<'_>,
    r: Rect,
    x0: Size,
    y0: Size,
    row_sizes: &[Size],
    col_sizes: &[Size],
    composite: CompositeMode,
) {
    gc.begin_path();

    let mut y = y0;
    for &size in row_sizes {
        if size > 0 {
            let line_y = (y + size) as f64 - 0.5;
            gc.move_to(Point2::new(r.min.x as f64, line_y));
            gc.line_to(Point2::new(r.max.x as f64, line_y));
        }
        y += size;
    }

    let mut x = x0;
    for &size in col_sizes {
        if size > 0 {
            let line_x = (x + size) as f64 - 0.5;
            gc.move_to(Point2::new(line_x, r.min.y as f64));
            gc.line_to(Point2::new(line_x, r.max.y as f64));
        }
        x += size;
    }

    gc.set_stroke_rgb(spec.grid_line);
    gc.set_line_width(1.0);
    gc.set_composite_mode(composite);
    gc.stroke();
    gc.set_composite_mode(CompositeMode::SourceOver);
}

#[cfg(test)]
mod tests {
    use super::super::tests::make_grid;
    use super::*;
    use crate::grid::Grid;
    use crate::testing::{DrawOp, TestPlatform};

    fn screen_ops(grid: &Grid<TestPlatform>) -> Vec<DrawOp> {
        let mut st = grid.inner.state.borrow_mut();
        st.screen.as_mut().map(|s| s.take_ops()).unwrap_or_default()
    }

    fn full_paint(grid: &Grid<TestPlatform>) -> Vec<DrawOp> {
        let viewport = {
            let st = grid.inner.state.borrow();
            Rect::from_xywh(0, 0, st.viewport_width(), st.viewport_height())
        };
        grid.inner.paint(viewport);
        screen_ops(grid)
    }

    #[test]
    fn paint_is_deterministic() {
        let (grid, platform, _) = make_grid(50, 8);
        grid.set_viewport_size([300, 200]);
        platform.step();
        screen_ops(&grid);

        let first = full_paint(&grid);
        let second = full_paint(&grid);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn recursive_paint_is_refused() {
        let (grid, platform, _) = make_grid(5, 3);
        grid.set_viewport_size([300, 200]);
        platform.step();
        screen_ops(&grid);

        grid.inner.in_paint.set(true);
        grid.paint(Rect::from_xywh(0, 0, 10, 10));
        grid.inner.in_paint.set(false);
        assert!(screen_ops(&grid).is_empty());

        // The guard resets after a normal paint.
        grid.paint(Rect::from_xywh(0, 0, 10, 10));
        assert!(!grid.inner.in_paint.get());
        assert!(!screen_ops(&grid).is_empty());
    }

    #[test]
    fn empty_damage_paints_nothing() {
        let (grid, platform, _) = make_grid(50, 8);
        grid.set_viewport_size([300, 200]);
        platform.step();
        screen_ops(&grid);

        grid.paint(Rect::from_xywh(400, 400, 50, 50));
        assert!(screen_ops(&grid).is_empty());
    }

    #[test]
    fn headers_use_the_header_background() {
        let (grid, platform, _) = make_grid(50, 8);
        grid.set_viewport_size([300, 200]);
        platform.step();
        screen_ops(&grid);

        let style = grid.style();
        let ops = full_paint(&grid);

        // Corner header: 64×20 at the origin.
        let corner = Rect::from_xywh(0, 0, 64, 20);
        let mut saw_corner_fill = false;
        let mut last_fill = None;
        for op in &ops {
            match op {
                DrawOp::SetFillRgb(color) => last_fill = Some(*color),
                DrawOp::FillRect(rect) if *rect == corner => {
                    saw_corner_fill = last_fill == Some(style.header_background_color);
                }
                _ => {}
            }
        }
        assert!(saw_corner_fill);
    }

    #[test]
    fn panicking_renderer_aborts_only_that_region() {
        struct Panicky;

        impl CellRenderer<crate::testing::TestSurface> for Panicky {
            fn paint(
                &self,
                _gc: &mut GraphicsContext<'_, crate::testing::TestSurface>,
                config: &CellConfig,
            ) {
                if config.region == CellRegion::Body {
                    panic!("boom");
                }
            }
        }

        let (grid, platform, _) = make_grid(5, 3);
        grid.set_viewport_size([300, 200]);
        grid.set_renderer(Some(std::rc::Rc::new(Panicky)));
        platform.step();

        let ops = full_paint(&grid);
        // The save/restore pairing survived the panic.
        let saves = ops.iter().filter(|op| **op == DrawOp::Save).count();
        let restores = ops.iter().filter(|op| **op == DrawOp::Restore).count();
        assert_eq!(saves, restores);
        // Later regions still painted: the corner header fill is present.
        assert!(ops.contains(&DrawOp::FillRect(Rect::from_xywh(0, 0, 64, 20))));
    }

    #[test]
    fn zero_size_sections_are_skipped() {
        let (grid, platform, _) = make_grid(5, 3);
        grid.set_viewport_size([300, 200]);
        platform.step();
        grid.resize_row(crate::model::RowRegion::Body, 1, 0);
        platform.step();
        screen_ops(&grid);

        let ops = full_paint(&grid);
        // Grid lines: 4 nonzero rows and 1 header row in the body column
        // bands... simply assert no horizontal line is emitted twice.
        let mut line_ys: Vec<i64> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::MoveTo(x, y) if *x == 64.0 => Some(*y as i64),
                _ => None,
            })
            .collect();
        let before = line_ys.len();
        line_ys.dedup();
        assert_eq!(before, line_ys.len());
    }
}
