//! Keyboard navigation.
//!
//! Arrows move the cursor, ctrl jumps to the axis extremity, shift extends
//! instead of moving, and PageUp/PageDown work in page-height batches of
//! rows. Without a selection model, keys fall back to plain scrolling.
use std::cmp::{max, min};
use std::rc::Rc;

use super::input::{InputState, Key, KeyEvent};
use super::scroll::ScrollDir;
use super::Inner;
use crate::platform::Platform;
use crate::sections::Index;
use crate::selection::{Clear, SelectArgs, SelectionModel, SECTION_MAX};

impl<P: Platform> Inner<P> {
    pub(crate) fn on_key_down(&self, ev: &KeyEvent) -> bool {
        if self.disposed.get() {
            return false;
        }
        if self.input.borrow().state != InputState::Default {
            // Document-level keys are silently consumed while a pointer
            // gesture is active.
            return true;
        }

        let selection = self.state.borrow().selection.clone();
        match selection {
            Some(selection) => self.key_with_selection(&selection, ev),
            None => self.key_without_selection(ev),
        }
    }

    fn key_without_selection(&self, ev: &KeyEvent) -> bool {
        match ev.key {
            Key::ArrowUp => self.scroll_by_step(ScrollDir::Up),
            Key::ArrowDown => self.scroll_by_step(ScrollDir::Down),
            Key::ArrowLeft => self.scroll_by_step(ScrollDir::Left),
            Key::ArrowRight => self.scroll_by_step(ScrollDir::Right),
            Key::PageUp => self.scroll_by_page(ScrollDir::Up),
            Key::PageDown => self.scroll_by_page(ScrollDir::Down),
            Key::Other => return false,
        }
        true
    }

    fn key_with_selection(&self, selection: &Rc<SelectionModel>, ev: &KeyEvent) -> bool {
        let (dr, dc) = match ev.key {
            Key::ArrowUp => (-1, 0),
            Key::ArrowDown => (1, 0),
            Key::ArrowLeft => (0, -1),
            Key::ArrowRight => (0, 1),
            Key::PageUp => (-self.page_rows(), 0),
            Key::PageDown => (self.page_rows(), 0),
            Key::Other => return false,
        };
        let is_arrow = matches!(
            ev.key,
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight
        );

        let (lr, lc) = {
            let st = self.state.borrow();
            (
                st.row_sections.count() - 1,
                st.column_sections.count() - 1,
            )
        };
        if lr < 0 || lc < 0 {
            return true;
        }

        let shift = ev.modifiers.contains(super::input::Modifiers::SHIFT);
        let accel = ev.modifiers.accel();

        if shift {
            if accel && is_arrow {
                // Extend all the way to the axis extremity.
                if let Some(sel) = selection.current_selection() {
                    let (r2, c2) = match ev.key {
                        Key::ArrowUp => (0, sel.c2),
                        Key::ArrowDown => (SECTION_MAX, sel.c2),
                        Key::ArrowLeft => (sel.r2, 0),
                        _ => (sel.r2, SECTION_MAX),
                    };
                    selection.select(SelectArgs {
                        r1: sel.r1,
                        c1: sel.c1,
                        r2,
                        c2,
                        cursor_row: selection.cursor_row(),
                        cursor_column: selection.cursor_column(),
                        clear: Clear::Current,
                    });
                    self.scroll_corner_into_view(resolve(r2, lr), resolve(c2, lc), dr, dc);
                }
            } else if let Some(sel) = selection.resize_by(dr, dc) {
                self.scroll_corner_into_view(resolve(sel.r2, lr), resolve(sel.c2, lc), dr, dc);
            }
            return true;
        }

        let had_cursor = selection.cursor_row() >= 0 && selection.cursor_column() >= 0;
        let cr = max(selection.cursor_row(), 0);
        let cc = max(selection.cursor_column(), 0);
        let (row, column) = if accel && is_arrow {
            match ev.key {
                Key::ArrowUp => (0, cc),
                Key::ArrowDown => (lr, cc),
                Key::ArrowLeft => (cr, 0),
                _ => (cr, lc),
            }
        } else if !had_cursor {
            // The first navigation lands on the origin cell.
            (0, 0)
        } else {
            (clamp(cr + dr, 0, lr), clamp(cc + dc, 0, lc))
        };

        selection.select(SelectArgs {
            r1: row,
            c1: column,
            r2: row,
            c2: column,
            cursor_row: row,
            cursor_column: column,
            clear: Clear::All,
        });
        self.scroll_to_cell(row, column);
        true
    }

    /// The number of rows in one page of the viewport.
    fn page_rows(&self) -> Index {
        let st = self.state.borrow();
        let row_height = st.row_sections.base_size();
        if row_height <= 0 {
            1
        } else {
            max(st.page_height() / row_height, 1)
        }
    }

    fn scroll_corner_into_view(&self, row: Index, column: Index, dr: Index, dc: Index) {
        match (dc != 0, dr != 0) {
            (true, true) => self.scroll_to_cell(row, column),
            (true, false) => self.scroll_to_column(column),
            (false, true) => self.scroll_to_row(row),
            (false, false) => {}
        }
    }
}

fn clamp(x: Index, lo: Index, hi: Index) -> Index {
    max(lo, min(x, hi))
}

fn resolve(x: Index, last: Index) -> Index {
    if x == SECTION_MAX {
        max(last, 0)
    } else {
        x
    }
}
