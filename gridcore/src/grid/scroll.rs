//! The scroll engine: incremental blit-then-paint scrolling, paging, and
//! scrollbar synchronization.
use cgmath::Point2;
use std::cmp::{max, min};
use std::rc::Rc;

use super::Inner;
use crate::geom::Rect;
use crate::gfx::Surface;
use crate::platform::Platform;
use crate::scrollbar::{Axis, Dir, Scrollbar};
use crate::sections::{Index, Size};

/// A scroll direction for stepping and paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDir {
    Up,
    Down,
    Left,
    Right,
}

impl<P: Platform> Inner<P> {
    /// Scroll to the given offset, clamped into the scrollable range.
    ///
    /// Small deltas blit the still-valid part of the on-screen surface and
    /// repaint only the exposed strip; deltas of a page or more repaint the
    /// whole content band. The vertical pass runs first; the horizontal pass
    /// sees the already-updated vertical offset.
    pub(crate) fn scroll_to(&self, x: Size, y: Size) {
        if self.disposed.get() {
            return;
        }

        let (x, y, dx, dy, blittable) = {
            let st = &mut *self.state.borrow_mut();
            let x = clamp(x, 0, st.max_scroll_x());
            let y = clamp(y, 0, st.max_scroll_y());
            let dx = x - st.scroll_x;
            let dy = y - st.scroll_y;
            let blittable = st.visible
                && st.viewport_size[0] > 0
                && st.viewport_size[1] > 0
                && st.screen.is_some();
            if !blittable {
                // Only the logical offsets move.
                st.scroll_x = x;
                st.scroll_y = y;
            }
            (x, y, dx, dy, blittable)
        };

        self.sync_scrollbars();

        if (dx == 0 && dy == 0) || !blittable {
            return;
        }

        if dy != 0 {
            let strip = {
                let st = &mut *self.state.borrow_mut();
                st.scroll_y = y;
                let w = st.viewport_width();
                let h = st.viewport_height();
                let hh = st.header_height();
                let vh = max(h - hh, 0);
                if dy.abs() >= vh {
                    Rect::from_xywh(0, hh, w, vh)
                } else {
                    // Rows scroll under the column header; the row header
                    // moves with them, so the band spans the full width.
                    let (src, dst_y) = if dy > 0 {
                        (Rect::from_xywh(0, hh + dy, w, vh - dy), hh)
                    } else {
                        (Rect::from_xywh(0, hh, w, vh + dy), hh - dy)
                    };
                    blit(st, src, Point2::new(0, dst_y));
                    if dy > 0 {
                        Rect::from_xywh(0, hh + vh - dy, w, dy)
                    } else {
                        Rect::from_xywh(0, hh, w, -dy)
                    }
                }
            };
            self.paint(strip);
        }

        if dx != 0 {
            let strip = {
                let st = &mut *self.state.borrow_mut();
                st.scroll_x = x;
                let w = st.viewport_width();
                let h = st.viewport_height();
                let hw = st.header_width();
                let vw = max(w - hw, 0);
                if dx.abs() >= vw {
                    Rect::from_xywh(hw, 0, vw, h)
                } else {
                    let (src, dst_x) = if dx > 0 {
                        (Rect::from_xywh(hw + dx, 0, vw - dx, h), hw)
                    } else {
                        (Rect::from_xywh(hw, 0, vw + dx, h), hw - dx)
                    };
                    blit(st, src, Point2::new(dst_x, 0));
                    if dx > 0 {
                        Rect::from_xywh(hw + vw - dx, 0, dx, h)
                    } else {
                        Rect::from_xywh(hw, 0, -dx, h)
                    }
                }
            };
            self.paint(strip);
        }
    }

    pub(crate) fn scroll_by(&self, dx: Size, dy: Size) {
        let (x, y) = {
            let st = self.state.borrow();
            (
                st.scroll_x.saturating_add(dx),
                st.scroll_y.saturating_add(dy),
            )
        };
        self.scroll_to(x, y);
    }

    /// Scroll by one section: to the previous section edge when decrementing,
    /// or past the section at the leading scroll edge when incrementing.
    pub(crate) fn scroll_by_step(&self, dir: ScrollDir) {
        let target = {
            let st = self.state.borrow();
            let mut x = st.scroll_x;
            let mut y = st.scroll_y;
            match dir {
                ScrollDir::Up => match st.row_sections.section_index(y - 1) {
                    Some(row) => y = st.row_sections.section_offset(row).unwrap_or(y),
                    None => return,
                },
                ScrollDir::Down => match st.row_sections.section_index(y) {
                    Some(row) => {
                        y = st.row_sections.section_offset(row).unwrap_or(y)
                            + st.row_sections.section_size(row).unwrap_or(0)
                    }
                    None => return,
                },
                ScrollDir::Left => match st.column_sections.section_index(x - 1) {
                    Some(column) => x = st.column_sections.section_offset(column).unwrap_or(x),
                    None => return,
                },
                ScrollDir::Right => match st.column_sections.section_index(x) {
                    Some(column) => {
                        x = st.column_sections.section_offset(column).unwrap_or(x)
                            + st.column_sections.section_size(column).unwrap_or(0)
                    }
                    None => return,
                },
            }
            (x, y)
        };
        self.scroll_to(target.0, target.1);
    }

    /// Scroll by one page, i.e., the visible content extent on the axis.
    pub(crate) fn scroll_by_page(&self, dir: ScrollDir) {
        let (dx, dy) = {
            let st = self.state.borrow();
            match dir {
                ScrollDir::Up => (0, -st.page_height()),
                ScrollDir::Down => (0, st.page_height()),
                ScrollDir::Left => (-st.page_width(), 0),
                ScrollDir::Right => (st.page_width(), 0),
            }
        };
        self.scroll_by(dx, dy);
    }

    /// Scroll the minimal amount that makes the row fully visible.
    pub(crate) fn scroll_to_row(&self, row: Index) {
        let target = {
            let st = self.state.borrow();
            scroll_target(
                &st.row_sections,
                row,
                st.scroll_y,
                st.page_height(),
            )
            .map(|y| (st.scroll_x, y))
        };
        if let Some((x, y)) = target {
            self.scroll_to(x, y);
        }
    }

    /// Scroll the minimal amount that makes the column fully visible.
    pub(crate) fn scroll_to_column(&self, column: Index) {
        let target = {
            let st = self.state.borrow();
            scroll_target(
                &st.column_sections,
                column,
                st.scroll_x,
                st.page_width(),
            )
            .map(|x| (x, st.scroll_y))
        };
        if let Some((x, y)) = target {
            self.scroll_to(x, y);
        }
    }

    pub(crate) fn scroll_to_cell(&self, row: Index, column: Index) {
        let target = {
            let st = self.state.borrow();
            let y = scroll_target(&st.row_sections, row, st.scroll_y, st.page_height());
            let x = scroll_target(
                &st.column_sections,
                column,
                st.scroll_x,
                st.page_width(),
            );
            match (x, y) {
                (None, None) => None,
                (x, y) => Some((x.unwrap_or(st.scroll_x), y.unwrap_or(st.scroll_y))),
            }
        };
        if let Some((x, y)) = target {
            self.scroll_to(x, y);
        }
    }

    /// Resize the viewport surfaces in place, preserving their contents, and
    /// repaint only the newly exposed strips.
    pub(crate) fn set_viewport_size(&self, size: [u32; 2]) {
        if self.disposed.get() {
            return;
        }

        let strips: Vec<Rect> = {
            let st = &mut *self.state.borrow_mut();
            if st.viewport_size == size {
                return;
            }
            let old = st.viewport_size;
            st.viewport_size = size;

            if size[0] == 0 || size[1] == 0 {
                Vec::new()
            } else if st.screen.is_none() {
                st.screen = Some(self.platform.new_surface(size));
                st.buffer = Some(self.platform.new_surface(size));
                vec![Rect::from_xywh(0, 0, size[0] as Size, size[1] as Size)]
            } else {
                // The buffer is resized first and carries the on-screen
                // content through both resizes.
                let keep = Rect::from_xywh(
                    0,
                    0,
                    min(old[0], size[0]) as Size,
                    min(old[1], size[1]) as Size,
                );
                if let (Some(screen), Some(buffer)) = (st.screen.as_mut(), st.buffer.as_mut())
                {
                    buffer.resize(size);
                    buffer.copy_from(screen, keep, keep.min);
                    screen.resize(size);
                    screen.copy_from(buffer, keep, keep.min);
                }

                let mut strips = Vec::new();
                if size[0] > old[0] {
                    strips.push(Rect::from_xywh(
                        old[0] as Size,
                        0,
                        (size[0] - old[0]) as Size,
                        size[1] as Size,
                    ));
                }
                if size[1] > old[1] {
                    strips.push(Rect::from_xywh(
                        0,
                        old[1] as Size,
                        size[0] as Size,
                        (size[1] - old[1]) as Size,
                    ));
                }
                strips
            }
        };

        for strip in strips {
            self.paint(strip);
        }

        // The page size changed; re-clamp the scroll position and let the
        // scrollbars know.
        let (sx, sy) = {
            let st = self.state.borrow();
            (st.scroll_x, st.scroll_y)
        };
        self.scroll_to(sx, sy);
        self.sync_scrollbars();
    }

    /// Push the current scroll position and page size to the attached
    /// scrollbars, normalized to their `[0, 1]` contract.
    pub(crate) fn sync_scrollbars(&self) {
        let bars: Vec<(Rc<dyn Scrollbar>, f64, f64)> = {
            let st = self.state.borrow();
            let per_axis = [
                (st.scroll_x, st.max_scroll_x(), st.page_width()),
                (st.scroll_y, st.max_scroll_y(), st.page_height()),
            ];
            st.scrollbars
                .iter()
                .zip(per_axis.iter())
                .filter_map(|(bar, &(pos, max_scroll, page))| {
                    let bar = bar.clone()?;
                    let (value, page_step) = if max_scroll > 0 {
                        (
                            pos as f64 / max_scroll as f64,
                            page as f64 / max_scroll as f64,
                        )
                    } else {
                        (0.0, f64::INFINITY)
                    };
                    Some((bar, value, page_step))
                })
                .collect()
        };
        for (bar, value, page_step) in bars {
            bar.set_value(value);
            bar.set_page_step(page_step);
        }
    }

    pub(crate) fn scrollbar_thumb_moved(&self, axis: Axis, value: f64) {
        let target = {
            let st = self.state.borrow();
            let value = value.max(0.0).min(1.0);
            match axis {
                Axis::Horizontal => {
                    let x = (value * st.max_scroll_x() as f64).floor() as Size;
                    (x, st.scroll_y)
                }
                Axis::Vertical => {
                    let y = (value * st.max_scroll_y() as f64).floor() as Size;
                    (st.scroll_x, y)
                }
            }
        };
        self.scroll_to(target.0, target.1);
    }

    pub(crate) fn scrollbar_page_requested(&self, axis: Axis, dir: Dir) {
        self.scroll_by_page(scroll_dir(axis, dir));
    }

    pub(crate) fn scrollbar_step_requested(&self, axis: Axis, dir: Dir) {
        self.scroll_by_step(scroll_dir(axis, dir));
    }
}

fn scroll_dir(axis: Axis, dir: Dir) -> ScrollDir {
    match (axis, dir) {
        (Axis::Horizontal, Dir::Incr) => ScrollDir::Right,
        (Axis::Horizontal, Dir::Decr) => ScrollDir::Left,
        (Axis::Vertical, Dir::Incr) => ScrollDir::Down,
        (Axis::Vertical, Dir::Decr) => ScrollDir::Up,
    }
}

fn clamp(x: Size, lo: Size, hi: Size) -> Size {
    max(lo, min(x, hi))
}

/// The scroll offset that brings the section into view, or `None` when no
/// scrolling is needed or the index is out of range.
fn scroll_target(
    list: &crate::sections::SectionList,
    index: Index,
    scroll: Size,
    page: Size,
) -> Option<Size> {
    let offset = list.section_offset(index)?;
    let size = list.section_size(index)?;
    if offset < scroll {
        Some(offset)
    } else if offset + size > scroll + page {
        Some(offset + size - page)
    } else {
        None
    }
}

/// Copy a band of the on-screen surface to a new position, bouncing through
/// the off-screen buffer so the copy never overlaps itself.
fn blit<P: Platform>(st: &mut super::State<P>, src: Rect, dst: Point2<Size>) {
    if let (Some(screen), Some(buffer)) = (st.screen.as_mut(), st.buffer.as_mut()) {
        buffer.copy_from(screen, src, src.min);
        screen.copy_from(buffer, src, dst);
    }
}
