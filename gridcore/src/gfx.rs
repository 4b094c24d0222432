//! Drawing surface abstraction and the cached-state graphics context.
use arrayvec::ArrayVec;
use cgmath::{Point2, Vector2};
use log::warn;
use rgb::RGBA;
use std::fmt::Debug;

use crate::geom::Rect;

pub type RGBAF32 = RGBA<f32>;

/// How source pixels are combined with destination pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeMode {
    SourceOver,
    /// Multiplies destination pixels by the source. Strokes drawn with this
    /// mode darken whatever they cover uniformly, which is how the grid-line
    /// overlay blends with cell backgrounds. Backends that cannot composite
    /// this way cheaply may pre-blend the stroke color against the known
    /// background instead.
    Multiply,
}

impl Default for CompositeMode {
    fn default() -> Self {
        CompositeMode::SourceOver
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl Default for TextAlign {
    fn default() -> Self {
        TextAlign::Left
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextBaseline {
    Top,
    Middle,
    Alphabetic,
    Bottom,
}

impl Default for TextBaseline {
    fn default() -> Self {
        TextBaseline::Alphabetic
    }
}

/// A 2D raster surface supporting drawing operations.
///
/// A freshly created surface is assumed to be in the state described by the
/// `Default` values of the settable attributes (see [`GraphicsContext`]),
/// with an identity transform and no clip.
pub trait Surface: Debug {
    /// Get the dimensions of the surface in pixels.
    fn size(&self) -> [u32; 2];

    /// Resize the surface in place. The contents become unspecified.
    fn resize(&mut self, size: [u32; 2]);

    /// Push a copy of the current graphics state onto the state stack.
    fn save(&mut self);
    /// Pop a graphics state from the state stack.
    fn restore(&mut self);

    /// Set the current fill brush to a solid color.
    fn set_fill_rgb(&mut self, rgb: RGBAF32);
    /// Set the current stroke brush to a solid color.
    fn set_stroke_rgb(&mut self, rgb: RGBAF32);
    /// Set the line width in pixels. Defaults to `1.0`.
    fn set_line_width(&mut self, width: f64);
    fn set_line_dash(&mut self, phase: f64, lengths: &[f64]);
    fn set_font(&mut self, font: &str);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    fn set_composite_mode(&mut self, mode: CompositeMode);

    /// Translate the local coordinate system.
    fn translate(&mut self, d: Vector2<f64>);

    /// Start a new empty path.
    fn begin_path(&mut self);
    /// Close the current figure of the current path.
    fn close_path(&mut self);
    /// Begin a new subpath at the specified point.
    fn move_to(&mut self, p: Point2<f64>);
    /// Append a straight line to the specified point.
    fn line_to(&mut self, p: Point2<f64>);
    /// Add a rectangle to the current path.
    fn rect(&mut self, bx: Rect);

    /// Fill the area within the current path.
    fn fill(&mut self);
    /// Draw a line along the current path.
    fn stroke(&mut self);
    /// Set the current clipping region to its intersection with the area
    /// within the current path.
    fn clip(&mut self);

    /// Fill the specified rectangle.
    ///
    /// The implementation of this method may invalidate the current path.
    fn fill_rect(&mut self, bx: Rect) {
        self.begin_path();
        self.rect(bx);
        self.fill();
    }

    /// Draw a run of text with the current font, alignment, and fill brush.
    fn fill_text(&mut self, text: &str, p: Point2<f64>);

    /// Copy `src_rect` of `src` into this surface so that the rectangle's
    /// top-left corner lands at `dst`. Clips and transforms do not apply.
    fn copy_from(&mut self, src: &Self, src_rect: Rect, dst: Point2<i64>)
    where
        Self: Sized;
}

/// The settable surface attributes mirrored by [`GraphicsContext`].
#[derive(Debug, Clone, PartialEq)]
struct PaintState {
    fill_rgb: RGBAF32,
    stroke_rgb: RGBAF32,
    line_width: f64,
    line_dash: (f64, Vec<f64>),
    font: String,
    text_align: TextAlign,
    text_baseline: TextBaseline,
    composite_mode: CompositeMode,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            fill_rgb: RGBA::new(0.0, 0.0, 0.0, 1.0),
            stroke_rgb: RGBA::new(0.0, 0.0, 0.0, 1.0),
            line_width: 1.0,
            line_dash: (0.0, Vec::new()),
            font: String::new(),
            text_align: TextAlign::default(),
            text_baseline: TextBaseline::default(),
            composite_mode: CompositeMode::default(),
        }
    }
}

/// The maximum supported depth of [`GraphicsContext::save`] nesting. The
/// paint pipeline itself nests two levels; the rest is headroom for cell
/// renderers.
const STATE_STACK_CAP: usize = 32;

/// Wraps a [`Surface`], mirroring its settable state so that writes which
/// would not change the underlying value are suppressed. Setting surface
/// state is a measurable cost on real backends even when the value does not
/// change.
///
/// Reads return the mirrored values without touching the surface. Draw calls
/// pass through. `save`/`restore` must be balanced across each paint
/// invocation; any frames left on the stack are popped (with a warning) when
/// the context is dropped.
#[derive(Debug)]
pub struct GraphicsContext<'a, S: Surface> {
    surface: &'a mut S,
    state: PaintState,
    stack: ArrayVec<[PaintState; STATE_STACK_CAP]>,
}

impl<'a, S: Surface> GraphicsContext<'a, S> {
    /// Wrap a surface whose settable state is in the default configuration.
    pub fn new(surface: &'a mut S) -> Self {
        Self {
            surface,
            state: PaintState::default(),
            stack: ArrayVec::new(),
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.surface.size()
    }

    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
        self.surface.save();
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
            self.surface.restore();
        } else {
            warn!("restore without a matching save");
        }
    }

    /// The current depth of the save/restore stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pop frames until the stack depth is `depth`. Used to rebalance the
    /// stack after a cell renderer bails out mid-paint.
    pub fn restore_to(&mut self, depth: usize) {
        while self.stack.len() > depth {
            self.restore();
        }
    }

    pub fn fill_rgb(&self) -> RGBAF32 {
        self.state.fill_rgb
    }

    pub fn set_fill_rgb(&mut self, rgb: RGBAF32) {
        if self.state.fill_rgb != rgb {
            self.state.fill_rgb = rgb;
            self.surface.set_fill_rgb(rgb);
        }
    }

    pub fn stroke_rgb(&self) -> RGBAF32 {
        self.state.stroke_rgb
    }

    pub fn set_stroke_rgb(&mut self, rgb: RGBAF32) {
        if self.state.stroke_rgb != rgb {
            self.state.stroke_rgb = rgb;
            self.surface.set_stroke_rgb(rgb);
        }
    }

    pub fn line_width(&self) -> f64 {
        self.state.line_width
    }

    pub fn set_line_width(&mut self, width: f64) {
        if self.state.line_width != width {
            self.state.line_width = width;
            self.surface.set_line_width(width);
        }
    }

    pub fn set_line_dash(&mut self, phase: f64, lengths: &[f64]) {
        if self.state.line_dash.0 != phase || self.state.line_dash.1 != lengths {
            self.state.line_dash = (phase, lengths.to_vec());
            self.surface.set_line_dash(phase, lengths);
        }
    }

    pub fn font(&self) -> &str {
        &self.state.font
    }

    pub fn set_font(&mut self, font: &str) {
        if self.state.font != font {
            self.state.font = font.to_string();
            self.surface.set_font(font);
        }
    }

    pub fn text_align(&self) -> TextAlign {
        self.state.text_align
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        if self.state.text_align != align {
            self.state.text_align = align;
            self.surface.set_text_align(align);
        }
    }

    pub fn text_baseline(&self) -> TextBaseline {
        self.state.text_baseline
    }

    pub fn set_text_baseline(&mut self, baseline: TextBaseline) {
        if self.state.text_baseline != baseline {
            self.state.text_baseline = baseline;
            self.surface.set_text_baseline(baseline);
        }
    }

    pub fn composite_mode(&self) -> CompositeMode {
        self.state.composite_mode
    }

    pub fn set_composite_mode(&mut self, mode: CompositeMode) {
        if self.state.composite_mode != mode {
            self.state.composite_mode = mode;
            self.surface.set_composite_mode(mode);
        }
    }

    // Transforms and paths are not value-cached; they pass through.

    pub fn translate(&mut self, d: Vector2<f64>) {
        self.surface.translate(d);
    }

    pub fn begin_path(&mut self) {
        self.surface.begin_path();
    }

    pub fn close_path(&mut self) {
        self.surface.close_path();
    }

    pub fn move_to(&mut self, p: Point2<f64>) {
        self.surface.move_to(p);
    }

    pub fn line_to(&mut self, p: Point2<f64>) {
        self.surface.line_to(p);
    }

    pub fn rect(&mut self, bx: Rect) {
        self.surface.rect(bx);
    }

    pub fn fill(&mut self) {
        self.surface.fill();
    }

    pub fn stroke(&mut self) {
        self.surface.stroke();
    }

    pub fn clip(&mut self) {
        self.surface.clip();
    }

    pub fn fill_rect(&mut self, bx: Rect) {
        self.surface.fill_rect(bx);
    }

    pub fn fill_text(&mut self, text: &str, p: Point2<f64>) {
        self.surface.fill_text(text, p);
    }
}

impl<S: Surface> Drop for GraphicsContext<'_, S> {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            warn!(
                "dropping a graphics context with {} unbalanced save frame(s)",
                self.stack.len()
            );
            while self.stack.pop().is_some() {
                self.surface.restore();
            }
        }
    }
}
