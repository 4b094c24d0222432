//! The cell renderer interface and striping.
use std::rc::Rc;

use crate::gfx::{GraphicsContext, Surface, RGBAF32};
use crate::model::{CellMetadata, CellRegion, CellValue};
use crate::sections::{Index, Size};

/// Everything a renderer needs to paint one cell.
///
/// The bounding box is expanded by one pixel to the left and top so the
/// painted background bleeds under the neighboring grid lines; `width` and
/// `height` include that expansion.
#[derive(Debug, Clone)]
pub struct CellConfig {
    pub x: Size,
    pub y: Size,
    pub width: Size,
    pub height: Size,
    pub region: CellRegion,
    pub row: Index,
    pub column: Index,
    pub value: CellValue,
    pub metadata: Rc<CellMetadata>,
}

/// Paints individual cells.
///
/// Implementations must not panic, must not mutate the model or the grid,
/// and must not draw below the cell bounding box; the pipeline clips each
/// column band horizontally but relies on renderers to respect the vertical
/// extent.
pub trait CellRenderer<S: Surface> {
    fn paint(&self, gc: &mut GraphicsContext<'_, S>, config: &CellConfig);
}

/// A no-op implementation of [`CellRenderer`].
impl<S: Surface> CellRenderer<S> for () {
    fn paint(&self, _: &mut GraphicsContext<'_, S>, _: &CellConfig) {}
}

/// Per-index background coloring for one axis. `None` leaves the region
/// background showing through for that index.
pub trait Striping {
    fn background_color(&self, index: Index) -> Option<RGBAF32>;
}

impl<F: Fn(Index) -> Option<RGBAF32>> Striping for F {
    fn background_color(&self, index: Index) -> Option<RGBAF32> {
        self(index)
    }
}

/// The common two-phase striping.
#[derive(Debug, Clone, Copy)]
pub struct AlternatingStriping {
    pub even: Option<RGBAF32>,
    pub odd: Option<RGBAF32>,
}

impl Striping for AlternatingStriping {
    fn background_color(&self, index: Index) -> Option<RGBAF32> {
        if index % 2 == 0 {
            self.even
        } else {
            self.odd
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA;

    #[test]
    fn alternating_striping() {
        let striping = AlternatingStriping {
            even: Some(RGBA::new(1.0, 1.0, 1.0, 1.0)),
            odd: None,
        };
        assert!(striping.background_color(0).is_some());
        assert!(striping.background_color(1).is_none());
        assert!(striping.background_color(2).is_some());
    }

    #[test]
    fn closures_are_stripings() {
        let striping = |index: Index| {
            if index == 3 {
                Some(RGBA::new(0.5, 0.5, 0.5, 1.0))
            } else {
                None
            }
        };
        assert!(Striping::background_color(&striping, 3).is_some());
        assert!(Striping::background_color(&striping, 4).is_none());
    }
}
