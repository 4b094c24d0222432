//! Maps viewport points to cells and resize handles.
use cgmath::Point2;

use super::Inner;
use crate::model::CellRegion;
use crate::platform::Platform;
use crate::sections::{Index, SectionList, Size};

/// The cell under a point.
///
/// `x`/`y` are the point's offset inside the cell and `width`/`height` the
/// cell's size. In the void all cell fields are `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTestResult {
    pub region: CellRegion,
    pub row: Index,
    pub column: Index,
    pub x: Size,
    pub y: Size,
    pub width: Size,
    pub height: Size,
}

impl HitTestResult {
    fn void() -> Self {
        Self {
            region: CellRegion::Void,
            row: -1,
            column: -1,
            x: -1,
            y: -1,
            width: -1,
            height: -1,
        }
    }
}

/// A resize handle under the pointer. Vertical edges (`Left`/`Right`) resize
/// columns; horizontal edges (`Top`/`Bottom`) resize rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    Top,
    Left,
    Right,
    Bottom,
    None,
}

/// Pointer distance from a leading edge that grabs the previous section's
/// handle.
const LEADING_THRESHOLD: Size = 5;
/// Pointer distance from a trailing edge that grabs the handle. The trailing
/// edge is the common grab and gets the larger zone.
const TRAILING_THRESHOLD: Size = 6;

impl<P: Platform> Inner<P> {
    /// Map a point in viewport coordinates to the cell under it.
    pub(crate) fn hit_test(&self, client: Point2<f64>) -> HitTestResult {
        let st = self.state.borrow();

        let px = client.x.floor() as Size;
        let py = client.y.floor() as Size;
        let w = st.viewport_width();
        let h = st.viewport_height();
        if px < 0 || py < 0 || px >= w || py >= h {
            return HitTestResult::void();
        }

        let hw = st.header_width();
        let hh = st.header_height();
        let body_w = st.column_sections.total_size() - st.scroll_x;
        let body_h = st.row_sections.total_size() - st.scroll_y;

        let in_x_header = px < hw;
        let in_y_header = py < hh;
        let in_body_x = px >= hw && px < hw + body_w;
        let in_body_y = py >= hh && py < hh + body_h;

        let (region, rows, cols, vx, vy): (_, &SectionList, &SectionList, Size, Size) =
            if in_x_header && in_y_header {
                (
                    CellRegion::CornerHeader,
                    &st.column_header_sections,
                    &st.row_header_sections,
                    px,
                    py,
                )
            } else if in_x_header && in_body_y {
                (
                    CellRegion::RowHeader,
                    &st.row_sections,
                    &st.row_header_sections,
                    px,
                    py - hh + st.scroll_y,
                )
            } else if in_body_x && in_y_header {
                (
                    CellRegion::ColumnHeader,
                    &st.column_header_sections,
                    &st.column_sections,
                    px - hw + st.scroll_x,
                    py,
                )
            } else if in_body_x && in_body_y {
                (
                    CellRegion::Body,
                    &st.row_sections,
                    &st.column_sections,
                    px - hw + st.scroll_x,
                    py - hh + st.scroll_y,
                )
            } else {
                return HitTestResult::void();
            };

        let (row, column) = match (rows.section_index(vy), cols.section_index(vx)) {
            (Some(row), Some(column)) => (row, column),
            _ => return HitTestResult::void(),
        };

        let row_offset = rows.section_offset(row).unwrap_or(0);
        let column_offset = cols.section_offset(column).unwrap_or(0);
        HitTestResult {
            region,
            row,
            column,
            x: vx - column_offset,
            y: vy - row_offset,
            width: cols.section_size(column).unwrap_or(0),
            height: rows.section_size(row).unwrap_or(0),
        }
    }
}

/// The resize handle at a hit-test position.
///
/// Handles exist only in the header regions. A leading-edge handle grabs the
/// *previous* section, so it requires one to exist.
pub(crate) fn resize_handle_for(hit: &HitTestResult) -> ResizeHandle {
    match hit.region {
        CellRegion::RowHeader | CellRegion::ColumnHeader | CellRegion::CornerHeader => {}
        CellRegion::Body | CellRegion::Void => return ResizeHandle::None,
    }

    if hit.x < LEADING_THRESHOLD && hit.column > 0 {
        ResizeHandle::Left
    } else if hit.width - hit.x <= TRAILING_THRESHOLD {
        ResizeHandle::Right
    } else if hit.y < LEADING_THRESHOLD && hit.row > 0 {
        ResizeHandle::Top
    } else if hit.height - hit.y <= TRAILING_THRESHOLD {
        ResizeHandle::Bottom
    } else {
        ResizeHandle::None
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::make_grid;
    use super::*;

    #[test]
    fn regions_are_resolved() {
        let (grid, platform, _) = make_grid(100, 10);
        grid.set_viewport_size([400, 300]);
        platform.step();

        assert_eq!(grid.hit_test(10.0, 10.0).region, CellRegion::CornerHeader);
        assert_eq!(grid.hit_test(10.0, 100.0).region, CellRegion::RowHeader);
        assert_eq!(grid.hit_test(100.0, 10.0).region, CellRegion::ColumnHeader);
        assert_eq!(grid.hit_test(100.0, 100.0).region, CellRegion::Body);
        assert_eq!(grid.hit_test(-1.0, 10.0).region, CellRegion::Void);
        assert_eq!(grid.hit_test(10000.0, 10.0).region, CellRegion::Void);
    }

    #[test]
    fn body_cells_account_for_scroll() {
        let (grid, platform, _) = make_grid(100, 10);
        grid.set_viewport_size([400, 300]);
        platform.step();
        grid.scroll_to(64.0, 40.0);

        let hit = grid.hit_test(64.0 + 5.0, 20.0 + 3.0);
        assert_eq!(hit.region, CellRegion::Body);
        assert_eq!((hit.row, hit.column), (2, 1));
        assert_eq!((hit.x, hit.y), (5, 3));
        assert_eq!((hit.width, hit.height), (64, 20));
    }

    #[test]
    fn beyond_content_is_void() {
        let (grid, platform, _) = make_grid(3, 2);
        grid.set_viewport_size([400, 300]);
        platform.step();

        // Content ends at x = 64 + 128, y = 20 + 60.
        assert_eq!(grid.hit_test(250.0, 30.0).region, CellRegion::Void);
        assert_eq!(grid.hit_test(100.0, 150.0).region, CellRegion::Void);
        let hit = grid.hit_test(250.0, 150.0);
        assert_eq!(hit.region, CellRegion::Void);
        assert_eq!((hit.row, hit.column), (-1, -1));
    }

    #[test]
    fn header_cells_resolve_in_header_lists() {
        let (grid, platform, _) = make_grid(100, 10);
        grid.set_viewport_size([400, 300]);
        platform.step();
        grid.scroll_to(0.0, 45.0);

        // Row headers scroll with the body rows: y 20 maps to offset 45,
        // which is inside row 2.
        let hit = grid.hit_test(5.0, 20.0);
        assert_eq!(hit.region, CellRegion::RowHeader);
        assert_eq!(hit.row, 2);
        assert_eq!(hit.column, 0);

        // The corner header does not scroll.
        let hit = grid.hit_test(5.0, 5.0);
        assert_eq!(hit.region, CellRegion::CornerHeader);
        assert_eq!((hit.row, hit.column), (0, 0));
    }

    #[test]
    fn resize_handles_in_the_column_header() {
        let hit = |x: Size, column: Index| HitTestResult {
            region: CellRegion::ColumnHeader,
            row: 0,
            column,
            x,
            y: 5,
            width: 60,
            height: 20,
        };

        // A leading-edge grab needs a previous column.
        assert_eq!(resize_handle_for(&hit(3, 0)), ResizeHandle::None);
        assert_eq!(resize_handle_for(&hit(3, 1)), ResizeHandle::Left);
        assert_eq!(resize_handle_for(&hit(57, 0)), ResizeHandle::Right);
        assert_eq!(resize_handle_for(&hit(30, 0)), ResizeHandle::None);
    }

    #[test]
    fn no_resize_handles_in_the_body() {
        let hit = HitTestResult {
            region: CellRegion::Body,
            row: 1,
            column: 1,
            x: 0,
            y: 0,
            width: 60,
            height: 20,
        };
        assert_eq!(resize_handle_for(&hit), ResizeHandle::None);
    }

    #[test]
    fn row_handles_in_the_row_header() {
        let hit = |y: Size, row: Index| HitTestResult {
            region: CellRegion::RowHeader,
            row,
            column: 0,
            x: 30,
            y,
            width: 64,
            height: 20,
        };
        assert_eq!(resize_handle_for(&hit(2, 0)), ResizeHandle::None);
        assert_eq!(resize_handle_for(&hit(2, 3)), ResizeHandle::Top);
        assert_eq!(resize_handle_for(&hit(15, 3)), ResizeHandle::Bottom);
    }
}
