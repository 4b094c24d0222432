//! Maintains the set of selected cell rectangles, the cursor, and the
//! selection mode.
//!
//! A selection is a rectangle `(r1, c1)-(r2, c2)` whose corners need not be
//! ordered: `(r1, c1)` is the anchor and is preserved so downstream cursor
//! placement can tell which corner the user started from. Far corners may
//! carry the [`SECTION_MAX`] sentinel, meaning "to the last row/column at
//! query time"; the sentinel is resolved only when a selection is
//! interpreted, so it keeps tracking the model as lines are inserted.
use std::{
    cell::{Cell, RefCell},
    cmp::{max, min},
    fmt,
    rc::Rc,
};

use handlerlist::{HandlerList, Ticket};

use crate::model::{ColumnRegion, DataModel, RowRegion};
use crate::sections::Index;

/// The sentinel far-corner coordinate meaning "the last section at query
/// time".
pub const SECTION_MAX: Index = Index::MAX;

/// A selected rectangle. `(r1, c1)` is the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub r1: Index,
    pub c1: Index,
    pub r2: Index,
    pub c2: Index,
}

impl Selection {
    pub fn first_row(&self) -> Index {
        min(self.r1, self.r2)
    }

    pub fn last_row(&self) -> Index {
        max(self.r1, self.r2)
    }

    pub fn first_column(&self) -> Index {
        min(self.c1, self.c2)
    }

    pub fn last_column(&self) -> Index {
        max(self.c1, self.c2)
    }
}

/// How new selections are shaped when they enter the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// Selections span entire rows.
    Row,
    /// Selections span entire columns.
    Column,
    /// Selections are free rectangles.
    Cell,
}

/// Which existing selections a [`SelectionModel::select`] call replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clear {
    None,
    Current,
    All,
}

/// Arguments for [`SelectionModel::select`].
#[derive(Debug, Clone, Copy)]
pub struct SelectArgs {
    pub r1: Index,
    pub c1: Index,
    pub r2: Index,
    pub c2: Index,
    pub cursor_row: Index,
    pub cursor_column: Index,
    pub clear: Clear,
}

/// Options fixed at [`SelectionModel`] construction.
#[derive(Debug, Clone, Copy)]
pub struct SelectionOptions {
    pub mode: SelectionMode,
    pub allow_multiple: bool,
    pub allow_ranges: bool,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Cell,
            allow_multiple: true,
            allow_ranges: true,
        }
    }
}

struct State {
    selections: Vec<Selection>,
    cursor_row: Index,
    cursor_column: Index,
}

/// The selection model.
pub struct SelectionModel {
    model: Rc<dyn DataModel>,
    mode: Cell<SelectionMode>,
    allow_multiple: bool,
    allow_ranges: bool,
    state: RefCell<State>,
    changed: HandlerList<Box<dyn Fn()>>,
}

impl fmt::Debug for SelectionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SelectionModel")
            .field("mode", &self.mode.get())
            .field("selections", &state.selections)
            .field("cursor", &(state.cursor_row, state.cursor_column))
            .finish()
    }
}

impl SelectionModel {
    pub fn new(model: Rc<dyn DataModel>, options: SelectionOptions) -> Self {
        Self {
            model,
            mode: Cell::new(options.mode),
            allow_multiple: options.allow_multiple,
            allow_ranges: options.allow_ranges,
            state: RefCell::new(State {
                selections: Vec::new(),
                cursor_row: -1,
                cursor_column: -1,
            }),
            changed: HandlerList::new(),
        }
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.mode.get()
    }

    /// Change the selection mode. Existing selections are dropped because
    /// they may not satisfy the new mode's shape.
    pub fn set_selection_mode(&self, mode: SelectionMode) {
        if self.mode.get() == mode {
            return;
        }
        self.mode.set(mode);
        self.clear();
    }

    pub fn allow_multiple(&self) -> bool {
        self.allow_multiple
    }

    pub fn allow_ranges(&self) -> bool {
        self.allow_ranges
    }

    fn last_row(&self) -> Index {
        count_to_last(self.model.row_count(RowRegion::Body))
    }

    fn last_column(&self) -> Index {
        count_to_last(self.model.column_count(ColumnRegion::Body))
    }

    /// Add a selection.
    ///
    /// Coordinates are clamped to the model's body extents, with far corners
    /// equal to [`SECTION_MAX`] passing through unclamped. The mode rewrite
    /// and the range collapse are applied, the cursor is recomputed if the
    /// requested position falls outside the new selection, and `changed` is
    /// emitted.
    pub fn select(&self, args: SelectArgs) {
        let lr = self.last_row();
        let lc = self.last_column();
        if lr < 0 || lc < 0 {
            return;
        }

        let mut r1 = clamp(args.r1, 0, lr);
        let mut c1 = clamp(args.c1, 0, lc);
        let mut r2 = clamp_far(args.r2, lr);
        let mut c2 = clamp_far(args.c2, lc);

        match self.mode.get() {
            SelectionMode::Row => {
                c1 = 0;
                c2 = lc;
            }
            SelectionMode::Column => {
                r1 = 0;
                r2 = lr;
            }
            SelectionMode::Cell => {}
        }

        if !self.allow_ranges {
            r2 = r1;
            c2 = c1;
        }

        let clear = if self.allow_multiple {
            args.clear
        } else {
            Clear::All
        };

        let sel = Selection { r1, c1, r2, c2 };

        // The cursor must land inside the new selection's bounding box.
        let row_lo = min(r1, resolve(r2, lr));
        let row_hi = max(r1, resolve(r2, lr));
        let col_lo = min(c1, resolve(c2, lc));
        let col_hi = max(c1, resolve(c2, lc));
        let mut cr = args.cursor_row;
        let mut cc = args.cursor_column;
        if cr < row_lo || cr > row_hi {
            cr = r1;
        }
        if cc < col_lo || cc > col_hi {
            cc = c1;
        }

        {
            let mut state = self.state.borrow_mut();
            match clear {
                Clear::None => {}
                Clear::Current => {
                    state.selections.pop();
                }
                Clear::All => state.selections.clear(),
            }
            state.selections.push(sel);
            state.cursor_row = cr;
            state.cursor_column = cc;
        }
        self.emit_changed();
    }

    /// Drop all selections and reset the cursor. Emits `changed` only if
    /// there was something to drop.
    pub fn clear(&self) {
        let had_selections = {
            let mut state = self.state.borrow_mut();
            let had = !state.selections.is_empty();
            state.selections.clear();
            state.cursor_row = -1;
            state.cursor_column = -1;
            had
        };
        if had_selections {
            self.emit_changed();
        }
    }

    /// Move the current selection's far corner by the given amount,
    /// clamping into the model extents. Sentinel corners stay sentinels.
    /// Returns the adjusted selection, or `None` if the model is empty.
    pub fn resize_by(&self, dr: Index, dc: Index) -> Option<Selection> {
        let lr = self.last_row();
        let lc = self.last_column();
        let sel = {
            let mut state = self.state.borrow_mut();
            let sel = state.selections.last_mut()?;
            sel.r2 = step_far(sel.r2, dr, lr);
            sel.c2 = step_far(sel.c2, dc, lc);
            *sel
        };
        self.emit_changed();
        Some(sel)
    }

    pub fn current_selection(&self) -> Option<Selection> {
        self.state.borrow().selections.last().copied()
    }

    /// A snapshot iterator over the selections, oldest first. Mutating the
    /// model does not affect an already obtained iterator.
    pub fn selections(&self) -> impl Iterator<Item = Selection> {
        self.state.borrow().selections.clone().into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().selections.is_empty()
    }

    pub fn cursor_row(&self) -> Index {
        self.state.borrow().cursor_row
    }

    pub fn cursor_column(&self) -> Index {
        self.state.borrow().cursor_column
    }

    /// Whether any selection covers the cell, with sentinels resolved
    /// against the current model extents.
    pub fn contains(&self, row: Index, column: Index) -> bool {
        let lr = self.last_row();
        let lc = self.last_column();
        self.state.borrow().selections.iter().any(|sel| {
            let r2 = resolve(sel.r2, lr);
            let c2 = resolve(sel.c2, lc);
            row >= min(sel.r1, r2)
                && row <= max(sel.r1, r2)
                && column >= min(sel.c1, c2)
                && column <= max(sel.c1, c2)
        })
    }

    /// Whether any selection intersects the given row.
    pub fn is_row_selected(&self, row: Index) -> bool {
        let lr = self.last_row();
        self.state.borrow().selections.iter().any(|sel| {
            let r2 = resolve(sel.r2, lr);
            row >= min(sel.r1, r2) && row <= max(sel.r1, r2)
        })
    }

    /// Whether any selection intersects the given column.
    pub fn is_column_selected(&self, column: Index) -> bool {
        let lc = self.last_column();
        self.state.borrow().selections.iter().any(|sel| {
            let c2 = resolve(sel.c2, lc);
            column >= min(sel.c1, c2) && column <= max(sel.c1, c2)
        })
    }

    pub fn connect_changed(&self, handler: Box<dyn Fn()>) -> Ticket {
        self.changed.insert(handler)
    }

    fn emit_changed(&self) {
        for handler in self.changed.snapshot() {
            handler();
        }
    }
}

fn count_to_last(count: u64) -> Index {
    min(count, Index::MAX as u64) as Index - 1
}

fn clamp(x: Index, lo: Index, hi: Index) -> Index {
    max(lo, min(x, hi))
}

/// Clamp a far-corner coordinate, letting the sentinel through.
fn clamp_far(x: Index, last: Index) -> Index {
    if x == SECTION_MAX {
        x
    } else {
        clamp(x, 0, last)
    }
}

/// Resolve a far-corner coordinate for interpretation.
fn resolve(x: Index, last: Index) -> Index {
    if x == SECTION_MAX {
        last
    } else {
        x
    }
}

/// Step a far-corner coordinate. Sentinels are absorbing.
fn step_far(x: Index, d: Index, last: Index) -> Index {
    if x == SECTION_MAX {
        x
    } else {
        clamp(x.saturating_add(d), 0, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellRegion, CellValue};
    use std::cell::Cell;

    struct CountModel {
        rows: u64,
        columns: u64,
    }

    impl DataModel for CountModel {
        fn row_count(&self, region: RowRegion) -> u64 {
            match region {
                RowRegion::Body => self.rows,
                RowRegion::ColumnHeader => 1,
            }
        }

        fn column_count(&self, region: ColumnRegion) -> u64 {
            match region {
                ColumnRegion::Body => self.columns,
                ColumnRegion::RowHeader => 1,
            }
        }

        fn data(&self, _: CellRegion, _: u64, _: u64) -> CellValue {
            CellValue::Null
        }
    }

    fn model(rows: u64, columns: u64) -> Rc<dyn DataModel> {
        Rc::new(CountModel { rows, columns })
    }

    fn args(r1: Index, c1: Index, r2: Index, c2: Index) -> SelectArgs {
        SelectArgs {
            r1,
            c1,
            r2,
            c2,
            cursor_row: r1,
            cursor_column: c1,
            clear: Clear::All,
        }
    }

    #[test]
    fn row_mode_rewrite() {
        let sm = SelectionModel::new(
            model(10, 8),
            SelectionOptions {
                mode: SelectionMode::Row,
                ..Default::default()
            },
        );
        sm.select(SelectArgs {
            cursor_row: 2,
            cursor_column: 3,
            ..args(2, 3, 2, 3)
        });

        assert_eq!(
            sm.current_selection(),
            Some(Selection {
                r1: 2,
                c1: 0,
                r2: 2,
                c2: 7
            })
        );
        assert_eq!((sm.cursor_row(), sm.cursor_column()), (2, 3));
    }

    #[test]
    fn column_mode_rewrite() {
        let sm = SelectionModel::new(
            model(10, 8),
            SelectionOptions {
                mode: SelectionMode::Column,
                ..Default::default()
            },
        );
        sm.select(args(4, 5, 4, 5));
        assert_eq!(
            sm.current_selection(),
            Some(Selection {
                r1: 0,
                c1: 5,
                r2: 9,
                c2: 5
            })
        );
    }

    #[test]
    fn range_collapse() {
        let sm = SelectionModel::new(
            model(10, 8),
            SelectionOptions {
                allow_ranges: false,
                ..Default::default()
            },
        );
        sm.select(args(2, 2, 6, 6));
        assert_eq!(
            sm.current_selection(),
            Some(Selection {
                r1: 2,
                c1: 2,
                r2: 2,
                c2: 2
            })
        );
    }

    #[test]
    fn single_selection_mode_always_clears() {
        let sm = SelectionModel::new(
            model(10, 8),
            SelectionOptions {
                allow_multiple: false,
                ..Default::default()
            },
        );
        sm.select(SelectArgs {
            clear: Clear::None,
            ..args(1, 1, 1, 1)
        });
        sm.select(SelectArgs {
            clear: Clear::None,
            ..args(2, 2, 2, 2)
        });
        assert_eq!(sm.selections().count(), 1);
    }

    #[test]
    fn anchors_are_preserved_unordered() {
        let sm = SelectionModel::new(model(10, 8), Default::default());
        sm.select(args(5, 6, 2, 1));
        let sel = sm.current_selection().unwrap();
        assert_eq!((sel.r1, sel.c1, sel.r2, sel.c2), (5, 6, 2, 1));
        assert_eq!(sel.first_row(), 2);
        assert_eq!(sel.last_column(), 6);
    }

    #[test]
    fn sentinel_far_corners_survive_selection() {
        let sm = SelectionModel::new(model(10, 8), Default::default());
        sm.select(args(0, 3, SECTION_MAX, 3));
        let sel = sm.current_selection().unwrap();
        assert_eq!(sel.r2, SECTION_MAX);
        // Interpretation resolves against the current extents.
        assert!(sm.contains(9, 3));
        assert!(!sm.contains(9, 4));
    }

    #[test]
    fn cursor_outside_the_selection_snaps_to_the_anchor() {
        let sm = SelectionModel::new(model(10, 8), Default::default());
        sm.select(SelectArgs {
            cursor_row: 9,
            cursor_column: 0,
            ..args(2, 2, 4, 4)
        });
        assert_eq!((sm.cursor_row(), sm.cursor_column()), (2, 2));
    }

    #[test]
    fn clear_emits_only_when_nonempty() {
        let sm = SelectionModel::new(model(10, 8), Default::default());
        let fired = Rc::new(Cell::new(0));
        let fired2 = Rc::clone(&fired);
        sm.connect_changed(Box::new(move || {
            fired2.set(fired2.get() + 1);
        }));

        sm.clear();
        assert_eq!(fired.get(), 0);

        sm.select(args(1, 1, 1, 1));
        sm.clear();
        assert_eq!(fired.get(), 2);
        assert_eq!((sm.cursor_row(), sm.cursor_column()), (-1, -1));
    }

    #[test]
    fn resize_by_clamps_and_keeps_sentinels() {
        let sm = SelectionModel::new(model(10, 8), Default::default());
        assert!(sm.resize_by(1, 1).is_none());

        sm.select(args(2, 2, 4, 4));
        let sel = sm.resize_by(100, -100).unwrap();
        assert_eq!((sel.r2, sel.c2), (9, 0));

        sm.select(args(0, 0, SECTION_MAX, 0));
        let sel = sm.resize_by(-3, 0).unwrap();
        assert_eq!(sel.r2, SECTION_MAX);
    }

    #[test]
    fn selections_iterator_is_a_snapshot() {
        let sm = SelectionModel::new(model(10, 8), Default::default());
        sm.select(SelectArgs {
            clear: Clear::None,
            ..args(1, 1, 1, 1)
        });
        sm.select(SelectArgs {
            clear: Clear::None,
            ..args(2, 2, 2, 2)
        });

        let iter = sm.selections();
        sm.clear();
        assert_eq!(iter.count(), 2);
    }

    #[test]
    fn mode_change_clears() {
        let sm = SelectionModel::new(model(10, 8), Default::default());
        sm.select(args(1, 1, 2, 2));
        sm.set_selection_mode(SelectionMode::Row);
        assert!(sm.is_empty());
    }
}
