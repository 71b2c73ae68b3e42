use serde::{Deserialize, Serialize};

use crate::canvas::{Color, PixelBuffer, Point, Rect, Surface, WriteMode};
use crate::ops::fill::{flood_erase, flood_fill};
use crate::ops::shapes::{self, ShapeKind};

/// Largest brush edge the freehand tools accept.
pub const MAX_BRUSH_SIZE: u32 = 64;

/// Paint used to show where the eraser has been (the real edit is a clear).
const ERASER_PREVIEW: Color = Color::rgba(255, 255, 255, 128);

// ============================================================================
// OPTIONS / RESULTS
// ============================================================================

/// User-facing tool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOptions {
    /// CSS color string.
    pub color: String,
    #[serde(rename = "brushSize")]
    pub brush_size: u32,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            brush_size: 1,
        }
    }
}

impl ToolOptions {
    pub fn new(color: impl Into<String>, brush_size: u32) -> Self {
        Self {
            color: color.into(),
            brush_size: brush_size.clamp(1, MAX_BRUSH_SIZE),
        }
    }

    /// Parsed paint color; opaque black when the string is not a color.
    pub fn paint(&self) -> Color {
        match self.color.parse::<Color>() {
            Ok(c) => c,
            Err(e) => {
                log_warn!("{}; painting with black", e);
                Color::BLACK
            }
        }
    }
}

/// Outcome of a completed interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolResult {
    /// A new bitmap to replace the caller's.
    AffectsBitmap(PixelBuffer),
    /// Only the tool configuration changed (color picker).
    AffectsOptions(ToolOptions),
}

// ============================================================================
// TOOL PROTOCOL
// ============================================================================

/// Pointer-driven editing strategy: `start → move_to* → end | cancel`.
///
/// A tool never mutates the buffer passed to `start`; it works on a private
/// copy and hands a fresh buffer back from `end`. Calls that arrive in the
/// wrong state (e.g. `end` while idle) are ignored.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Idle → Active. Binds a private copy of `buffer`.
    fn start(&mut self, point: Point, buffer: &PixelBuffer, surface: &mut dyn Surface);

    /// Active: extend the interaction. Idle: move the cursor indicator.
    fn move_to(&mut self, point: Point, surface: &mut dyn Surface);

    /// Active → Idle, committing the edit.
    fn end(&mut self, point: Point, surface: &mut dyn Surface) -> Option<ToolResult>;

    /// Active → Idle, discarding the edit.
    fn cancel(&mut self, surface: &mut dyn Surface);

    fn options(&self) -> &ToolOptions;

    /// Replace the options. Takes effect on the next redraw, also mid-stroke.
    fn set_options(&mut self, options: ToolOptions, surface: &mut dyn Surface);

    fn is_active(&self) -> bool;
}

/// Idle/Active bookkeeping shared by every tool.
#[derive(Debug)]
pub struct ToolBase {
    current: Point,
    buffer: Option<PixelBuffer>,
    drawing: bool,
    options: ToolOptions,
    paint: Color,
}

impl ToolBase {
    pub fn new(options: ToolOptions) -> Self {
        let paint = options.paint();
        Self {
            current: Point::OUTSIDE,
            buffer: None,
            drawing: false,
            options,
            paint,
        }
    }

    pub fn current(&self) -> Point {
        self.current
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn paint(&self) -> Color {
        self.paint
    }

    fn bind(&mut self, point: Point, buffer: &PixelBuffer) {
        self.buffer = Some(buffer.clone());
        self.current = point;
        self.drawing = true;
    }

    /// Track a new active-pointer position. False when nothing changed or the
    /// pointer is off-canvas.
    fn advance(&mut self, point: Point) -> bool {
        if point.is_outside() || point == self.current {
            return false;
        }
        self.current = point;
        true
    }

    /// Leave the Active state, handing over the bound buffer.
    fn finish(&mut self, point: Point) -> Option<PixelBuffer> {
        if !self.drawing {
            return None;
        }
        self.advance(point);
        self.drawing = false;
        self.buffer.take()
    }

    /// [`ToolBase::finish`] for tools that act on the release point: letting
    /// go off-canvas leaves no current position to act on.
    fn finish_at(&mut self, point: Point) -> Option<PixelBuffer> {
        let buffer = self.finish(point)?;
        if point.is_outside() {
            self.current = Point::OUTSIDE;
        }
        Some(buffer)
    }

    /// Points whose `w`×`h` stamp can still touch the bound buffer.
    fn reach(&self, (w, h): (u32, u32)) -> Option<Rect> {
        let bounds = self.buffer.as_ref()?.bounds();
        let (w, h) = (w as i32, h as i32);
        Some(Rect::new(-w, -h, bounds.w + 2 * w, bounds.h + 2 * h))
    }

    fn reset(&mut self) {
        self.drawing = false;
        self.buffer = None;
    }

    fn set_options(&mut self, options: ToolOptions) {
        self.paint = options.paint();
        self.options = options;
    }

    /// Clear the surface and draw a `w`×`h` cursor around the current point.
    fn redraw_cursor(&self, surface: &mut dyn Surface, paint: Color, extent: (u32, u32)) {
        surface.clear();
        if !self.current.is_outside() {
            surface.set_paint(paint);
            surface.fill_rect(brush_rect(self.current, extent));
        }
    }
}

/// Offset that centres an `n`-pixel brush on the pointer. Even sizes lean
/// towards the top-left: 1→0, 2→0, 3→1, 4→1, 5→2.
pub fn brush_shift(n: u32) -> i32 {
    let odd_part = if n % 2 == 0 { n.saturating_sub(1) } else { n };
    (odd_part / 2) as i32
}

/// Stamp rectangle of a `w`×`h` brush at `p`.
pub fn brush_rect(p: Point, (w, h): (u32, u32)) -> Rect {
    Rect::new(
        p.x.saturating_sub(brush_shift(w)),
        p.y.saturating_sub(brush_shift(h)),
        w as i32,
        h as i32,
    )
}

const PIXEL: (u32, u32) = (1, 1);

// ============================================================================
// BOUNDED SHAPE - line / rectangle / ellipse
// ============================================================================

pub struct ShapeTool {
    base: ToolBase,
    shape: ShapeKind,
    anchor: Point,
}

impl ShapeTool {
    pub fn new(shape: ShapeKind, options: ToolOptions) -> Self {
        Self {
            base: ToolBase::new(options),
            shape,
            anchor: Point::OUTSIDE,
        }
    }

    fn redraw_preview(&self, surface: &mut dyn Surface) {
        surface.clear();
        let Some(bounds) = self.base.reach((0, 0)) else { return };
        if self.anchor.is_outside() {
            return;
        }
        surface.set_paint(self.base.paint());
        self.shape
            .rasterize_within(self.anchor, self.base.current(), bounds, &mut |p| {
                surface.fill_rect(Rect::new(p.x, p.y, 1, 1))
            });
    }
}

impl Tool for ShapeTool {
    fn kind(&self) -> ToolKind {
        match self.shape {
            ShapeKind::Line => ToolKind::Line,
            ShapeKind::Rectangle => ToolKind::Rectangle,
            ShapeKind::Ellipse => ToolKind::Ellipse,
        }
    }

    fn start(&mut self, point: Point, buffer: &PixelBuffer, surface: &mut dyn Surface) {
        self.base.bind(point, buffer);
        self.anchor = point;
        self.redraw_preview(surface);
    }

    fn move_to(&mut self, point: Point, surface: &mut dyn Surface) {
        if !self.base.is_drawing() {
            self.base.current = point;
            self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        } else if self.base.advance(point) {
            self.redraw_preview(surface);
        }
    }

    fn end(&mut self, point: Point, surface: &mut dyn Surface) -> Option<ToolResult> {
        let mut buffer = self.base.finish(point)?;
        if !self.anchor.is_outside() {
            self.shape
                .put(&mut buffer, self.anchor, self.base.current(), self.base.paint());
        }
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        Some(ToolResult::AffectsBitmap(buffer))
    }

    fn cancel(&mut self, surface: &mut dyn Surface) {
        self.base.reset();
        surface.clear();
    }

    fn options(&self) -> &ToolOptions {
        self.base.options()
    }

    fn set_options(&mut self, options: ToolOptions, surface: &mut dyn Surface) {
        self.base.set_options(options);
        if self.base.is_drawing() {
            self.redraw_preview(surface);
        } else {
            self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        }
    }

    fn is_active(&self) -> bool {
        self.base.is_drawing()
    }
}

// ============================================================================
// FREEHAND - pencil, markers, eraser
// ============================================================================

/// Brush footprint of a freehand tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushKind {
    /// `n`×`n` square.
    Pencil,
    /// `n` wide, 1 tall.
    HorizontalMarker,
    /// 1 wide, `n` tall.
    VerticalMarker,
    /// `n`×`n` square of transparency.
    Eraser,
}

impl BrushKind {
    pub fn extent(&self, brush_size: u32) -> (u32, u32) {
        let n = brush_size.clamp(1, MAX_BRUSH_SIZE);
        match self {
            BrushKind::Pencil | BrushKind::Eraser => (n, n),
            BrushKind::HorizontalMarker => (n, 1),
            BrushKind::VerticalMarker => (1, n),
        }
    }
}

pub struct FreehandTool {
    base: ToolBase,
    brush: BrushKind,
    extent: (u32, u32),
    stroke: Vec<Rect>,
}

impl FreehandTool {
    pub fn new(brush: BrushKind, options: ToolOptions) -> Self {
        let extent = brush.extent(options.brush_size);
        Self {
            base: ToolBase::new(options),
            brush,
            extent,
            stroke: Vec::new(),
        }
    }

    /// Color written into the bitmap on commit.
    fn ink(&self) -> Color {
        match self.brush {
            BrushKind::Eraser => Color::TRANSPARENT,
            _ => self.base.paint(),
        }
    }

    /// Color shown on the preview surface.
    fn preview_paint(&self) -> Color {
        match self.brush {
            BrushKind::Eraser => ERASER_PREVIEW,
            _ => self.base.paint(),
        }
    }

    fn stamp(&mut self, p: Point, surface: &mut dyn Surface) {
        let rect = brush_rect(p, self.extent);
        self.stroke.push(rect);
        surface.set_paint(self.preview_paint());
        surface.fill_rect(rect);
    }

    /// Stamp every point from `from` (exclusive) to `to` (inclusive) so fast
    /// pointer motion leaves no gaps. Points too far out to reach the buffer
    /// are skipped.
    fn stamp_segment(&mut self, from: Point, to: Point, surface: &mut dyn Surface) {
        let Some(reach) = self.base.reach(self.extent) else { return };
        let mut points = Vec::new();
        shapes::line_within(from, to, reach, &mut |p| {
            if p != from {
                points.push(p);
            }
        });
        for p in points {
            self.stamp(p, surface);
        }
    }
}

impl Tool for FreehandTool {
    fn kind(&self) -> ToolKind {
        match self.brush {
            BrushKind::Pencil => ToolKind::Pencil,
            BrushKind::HorizontalMarker => ToolKind::HorizontalMarker,
            BrushKind::VerticalMarker => ToolKind::VerticalMarker,
            BrushKind::Eraser => ToolKind::Eraser,
        }
    }

    fn start(&mut self, point: Point, buffer: &PixelBuffer, surface: &mut dyn Surface) {
        self.base.bind(point, buffer);
        self.stroke.clear();
        surface.clear();
        if !point.is_outside() {
            self.stamp(point, surface);
        }
    }

    fn move_to(&mut self, point: Point, surface: &mut dyn Surface) {
        if !self.base.is_drawing() {
            self.base.current = point;
            self.base.redraw_cursor(surface, self.preview_paint(), self.extent);
            return;
        }
        let last = self.base.current();
        if !self.base.advance(point) {
            return;
        }
        if last.is_outside() {
            self.stamp(point, surface);
        } else {
            self.stamp_segment(last, point, surface);
        }
    }

    fn end(&mut self, point: Point, surface: &mut dyn Surface) -> Option<ToolResult> {
        if !self.base.is_drawing() {
            return None;
        }
        self.move_to(point, surface);
        let mut buffer = self.base.finish(point)?;
        let ink = self.ink();
        for rect in self.stroke.drain(..) {
            buffer.fill(rect, ink, WriteMode::Replace);
        }
        self.base
            .redraw_cursor(surface, self.preview_paint(), self.extent);
        Some(ToolResult::AffectsBitmap(buffer))
    }

    fn cancel(&mut self, surface: &mut dyn Surface) {
        self.base.reset();
        self.stroke.clear();
        surface.clear();
    }

    fn options(&self) -> &ToolOptions {
        self.base.options()
    }

    fn set_options(&mut self, options: ToolOptions, surface: &mut dyn Surface) {
        self.extent = self.brush.extent(options.brush_size);
        self.base.set_options(options);
        if !self.base.is_drawing() {
            self.base
                .redraw_cursor(surface, self.preview_paint(), self.extent);
        }
    }

    fn is_active(&self) -> bool {
        self.base.is_drawing()
    }
}

// ============================================================================
// FLOOD - bucket / area eraser
// ============================================================================

pub struct FloodTool {
    base: ToolBase,
    erase: bool,
}

impl FloodTool {
    pub fn new(erase: bool, options: ToolOptions) -> Self {
        Self {
            base: ToolBase::new(options),
            erase,
        }
    }
}

impl Tool for FloodTool {
    fn kind(&self) -> ToolKind {
        if self.erase {
            ToolKind::AreaEraser
        } else {
            ToolKind::Bucket
        }
    }

    fn start(&mut self, point: Point, buffer: &PixelBuffer, surface: &mut dyn Surface) {
        self.base.bind(point, buffer);
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn move_to(&mut self, point: Point, surface: &mut dyn Surface) {
        if !self.base.is_drawing() {
            self.base.current = point;
        } else if !self.base.advance(point) {
            return;
        }
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn end(&mut self, point: Point, surface: &mut dyn Surface) -> Option<ToolResult> {
        let mut buffer = self.base.finish_at(point)?;
        let at = self.base.current();
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        if !buffer.contains(at.x, at.y) {
            return None;
        }
        if self.erase {
            flood_erase(&mut buffer, at);
        } else {
            flood_fill(&mut buffer, at, self.base.paint());
        }
        Some(ToolResult::AffectsBitmap(buffer))
    }

    fn cancel(&mut self, surface: &mut dyn Surface) {
        self.base.reset();
        surface.clear();
    }

    fn options(&self) -> &ToolOptions {
        self.base.options()
    }

    fn set_options(&mut self, options: ToolOptions, surface: &mut dyn Surface) {
        self.base.set_options(options);
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn is_active(&self) -> bool {
        self.base.is_drawing()
    }
}

// ============================================================================
// MOVE - translate the whole bitmap
// ============================================================================

pub struct MoveTool {
    base: ToolBase,
    anchor: Point,
    /// Dimmed copy of the source drawn at the current offset while dragging.
    ghost: Option<PixelBuffer>,
}

impl MoveTool {
    pub fn new(options: ToolOptions) -> Self {
        Self {
            base: ToolBase::new(options),
            anchor: Point::OUTSIDE,
            ghost: None,
        }
    }

    fn offset(&self) -> (i32, i32) {
        self.base.current().delta_from(self.anchor)
    }

    fn redraw_ghost(&self, surface: &mut dyn Surface) {
        surface.clear();
        if let Some(ghost) = &self.ghost {
            let (dx, dy) = self.offset();
            surface.draw_image(ghost, dx, dy);
        }
    }
}

impl Tool for MoveTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Move
    }

    fn start(&mut self, point: Point, buffer: &PixelBuffer, surface: &mut dyn Surface) {
        self.base.bind(point, buffer);
        self.anchor = point;
        self.ghost = Some(buffer.dimmed());
        self.redraw_ghost(surface);
    }

    fn move_to(&mut self, point: Point, surface: &mut dyn Surface) {
        if !self.base.is_drawing() {
            self.base.current = point;
            self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        } else if self.base.advance(point) {
            self.redraw_ghost(surface);
        }
    }

    fn end(&mut self, point: Point, surface: &mut dyn Surface) -> Option<ToolResult> {
        let source = self.base.finish(point)?;
        self.ghost = None;
        let (dx, dy) = if self.anchor.is_outside() {
            (0, 0)
        } else {
            self.offset()
        };
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        Some(ToolResult::AffectsBitmap(source.translated(dx, dy)))
    }

    fn cancel(&mut self, surface: &mut dyn Surface) {
        self.base.reset();
        self.ghost = None;
        surface.clear();
    }

    fn options(&self) -> &ToolOptions {
        self.base.options()
    }

    fn set_options(&mut self, options: ToolOptions, surface: &mut dyn Surface) {
        self.base.set_options(options);
        if !self.base.is_drawing() {
            self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        }
    }

    fn is_active(&self) -> bool {
        self.base.is_drawing()
    }
}

// ============================================================================
// COLOR PICKER
// ============================================================================

pub struct ColorPickerTool {
    base: ToolBase,
}

impl ColorPickerTool {
    pub fn new(options: ToolOptions) -> Self {
        Self {
            base: ToolBase::new(options),
        }
    }
}

impl Tool for ColorPickerTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ColorPicker
    }

    fn start(&mut self, point: Point, buffer: &PixelBuffer, surface: &mut dyn Surface) {
        self.base.bind(point, buffer);
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn move_to(&mut self, point: Point, surface: &mut dyn Surface) {
        if !self.base.is_drawing() {
            self.base.current = point;
        } else if !self.base.advance(point) {
            return;
        }
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn end(&mut self, point: Point, surface: &mut dyn Surface) -> Option<ToolResult> {
        let buffer = self.base.finish_at(point)?;
        let at = self.base.current();
        if !buffer.contains(at.x, at.y) {
            self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
            return None;
        }
        let picked = ToolOptions {
            color: buffer.get(at.x, at.y).to_css(),
            brush_size: self.base.options().brush_size,
        };
        self.base.set_options(picked.clone());
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
        Some(ToolResult::AffectsOptions(picked))
    }

    fn cancel(&mut self, surface: &mut dyn Surface) {
        self.base.reset();
        surface.clear();
    }

    fn options(&self) -> &ToolOptions {
        self.base.options()
    }

    fn set_options(&mut self, options: ToolOptions, surface: &mut dyn Surface) {
        self.base.set_options(options);
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn is_active(&self) -> bool {
        self.base.is_drawing()
    }
}

// ============================================================================
// NO-OP - fallback for unknown tool indices
// ============================================================================

pub struct NoopTool {
    base: ToolBase,
}

impl NoopTool {
    pub fn new(options: ToolOptions) -> Self {
        Self {
            base: ToolBase::new(options),
        }
    }
}

impl Tool for NoopTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Noop
    }

    fn start(&mut self, point: Point, _buffer: &PixelBuffer, surface: &mut dyn Surface) {
        self.base.current = point;
        self.base.drawing = true;
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn move_to(&mut self, point: Point, surface: &mut dyn Surface) {
        self.base.current = point;
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn end(&mut self, point: Point, surface: &mut dyn Surface) -> Option<ToolResult> {
        self.base.reset();
        self.move_to(point, surface);
        None
    }

    fn cancel(&mut self, surface: &mut dyn Surface) {
        self.base.reset();
        surface.clear();
    }

    fn options(&self) -> &ToolOptions {
        self.base.options()
    }

    fn set_options(&mut self, options: ToolOptions, surface: &mut dyn Surface) {
        self.base.set_options(options);
        self.base.redraw_cursor(surface, self.base.paint(), PIXEL);
    }

    fn is_active(&self) -> bool {
        self.base.is_drawing()
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// Every tool, addressed by a stable catalog index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    Line,
    Rectangle,
    Ellipse,
    #[default]
    Pencil,
    HorizontalMarker,
    VerticalMarker,
    Bucket,
    ColorPicker,
    Eraser,
    AreaEraser,
    Move,
    Noop,
}

impl ToolKind {
    /// Catalog order. Indices into this list are persisted; append only.
    pub const CATALOG: [ToolKind; 11] = [
        ToolKind::Line,
        ToolKind::Rectangle,
        ToolKind::Ellipse,
        ToolKind::Pencil,
        ToolKind::HorizontalMarker,
        ToolKind::VerticalMarker,
        ToolKind::Bucket,
        ToolKind::ColorPicker,
        ToolKind::Eraser,
        ToolKind::AreaEraser,
        ToolKind::Move,
    ];

    /// Resolve a catalog index; anything out of range is the no-op tool.
    pub fn from_index(index: i64) -> ToolKind {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::CATALOG.get(i).copied())
            .unwrap_or(ToolKind::Noop)
    }

    pub fn index(&self) -> Option<usize> {
        Self::CATALOG.iter().position(|k| k == self)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Line => "Line",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Ellipse => "Ellipse",
            ToolKind::Pencil => "Pencil",
            ToolKind::HorizontalMarker => "Horizontal Marker",
            ToolKind::VerticalMarker => "Vertical Marker",
            ToolKind::Bucket => "Bucket",
            ToolKind::ColorPicker => "Color Picker",
            ToolKind::Eraser => "Eraser",
            ToolKind::AreaEraser => "Area Eraser",
            ToolKind::Move => "Move",
            ToolKind::Noop => "None",
        }
    }

    pub fn create(&self, options: ToolOptions) -> Box<dyn Tool> {
        match self {
            ToolKind::Line => Box::new(ShapeTool::new(ShapeKind::Line, options)),
            ToolKind::Rectangle => Box::new(ShapeTool::new(ShapeKind::Rectangle, options)),
            ToolKind::Ellipse => Box::new(ShapeTool::new(ShapeKind::Ellipse, options)),
            ToolKind::Pencil => Box::new(FreehandTool::new(BrushKind::Pencil, options)),
            ToolKind::HorizontalMarker => {
                Box::new(FreehandTool::new(BrushKind::HorizontalMarker, options))
            }
            ToolKind::VerticalMarker => {
                Box::new(FreehandTool::new(BrushKind::VerticalMarker, options))
            }
            ToolKind::Bucket => Box::new(FloodTool::new(false, options)),
            ToolKind::ColorPicker => Box::new(ColorPickerTool::new(options)),
            ToolKind::Eraser => Box::new(FreehandTool::new(BrushKind::Eraser, options)),
            ToolKind::AreaEraser => Box::new(FloodTool::new(true, options)),
            ToolKind::Move => Box::new(MoveTool::new(options)),
            ToolKind::Noop => Box::new(NoopTool::new(options)),
        }
    }
}

/// Catalog index of the pencil, the tool a fresh session starts with.
pub const DEFAULT_TOOL_INDEX: i64 = 3;

/// Build the tool at catalog `index`, falling back to the no-op tool.
pub fn tool_for_index(index: i64, options: ToolOptions) -> Box<dyn Tool> {
    let kind = ToolKind::from_index(index);
    if kind == ToolKind::Noop {
        log_warn!("Tool index {} is not in the catalog, using no-op tool", index);
    }
    kind.create(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BufferSurface;

    const RED: Color = Color::rgb(255, 0, 0);

    fn opts(color: &str, size: u32) -> ToolOptions {
        ToolOptions::new(color, size)
    }

    fn bitmap(result: Option<ToolResult>) -> PixelBuffer {
        match result {
            Some(ToolResult::AffectsBitmap(b)) => b,
            other => panic!("expected a bitmap, got {:?}", other),
        }
    }

    fn painted(buf: &PixelBuffer) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..buf.height() as i32 {
            for x in 0..buf.width() as i32 {
                if buf.get(x, y).a != 0 {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn end_without_start_yields_nothing() {
        let buf = PixelBuffer::new(4, 4);
        let mut surface = BufferSurface::for_buffer(&buf);
        for kind in ToolKind::CATALOG.iter().chain([ToolKind::Noop].iter()) {
            let mut tool = kind.create(ToolOptions::default());
            assert!(tool.end(Point::new(1, 1), &mut surface).is_none(), "{:?}", kind);
            assert!(!tool.is_active());
        }
    }

    #[test]
    fn brush_shift_leans_even_sizes() {
        let shifts: Vec<i32> = (1..=6).map(brush_shift).collect();
        assert_eq!(shifts, vec![0, 0, 1, 1, 2, 2]);
        assert_eq!(brush_rect(Point::new(5, 5), (4, 1)), Rect::new(4, 5, 4, 1));
    }

    #[test]
    fn line_tool_commits_on_a_copy() {
        let buf = PixelBuffer::new(8, 2);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Line.create(opts("#ff0000", 1));

        tool.start(Point::new(0, 0), &buf, &mut surface);
        tool.move_to(Point::new(3, 0), &mut surface);
        assert_eq!(painted(surface.pixels()), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);

        let out = bitmap(tool.end(Point::new(5, 0), &mut surface));
        assert_eq!(painted(&out), (0..=5).map(|x| (x, 0)).collect::<Vec<_>>());
        assert_eq!(out.get(5, 0), RED);
        // Caller's buffer is untouched.
        assert!(painted(&buf).is_empty());
        assert!(!tool.is_active());
    }

    #[test]
    fn cancel_discards_the_interaction() {
        let buf = PixelBuffer::new(8, 8);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Rectangle.create(ToolOptions::default());
        tool.start(Point::new(1, 1), &buf, &mut surface);
        tool.move_to(Point::new(6, 6), &mut surface);
        assert!(!painted(surface.pixels()).is_empty());

        tool.cancel(&mut surface);
        assert!(painted(surface.pixels()).is_empty());
        assert!(tool.end(Point::new(6, 6), &mut surface).is_none());
    }

    #[test]
    fn idle_move_draws_cursor_only() {
        let buf = PixelBuffer::new(8, 8);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Pencil.create(opts("#ff0000", 3));
        tool.move_to(Point::new(4, 4), &mut surface);
        assert_eq!(painted(surface.pixels()).len(), 9);
        // Clipped by the top-left corner.
        tool.move_to(Point::new(0, 0), &mut surface);
        assert_eq!(painted(surface.pixels()).len(), 4);
        tool.move_to(Point::OUTSIDE, &mut surface);
        assert!(painted(surface.pixels()).is_empty());
        assert!(!tool.is_active());
    }

    #[test]
    fn pencil_stroke_fills_gaps_between_samples() {
        let buf = PixelBuffer::new(8, 3);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Pencil.create(opts("red", 1));
        tool.start(Point::new(0, 1), &buf, &mut surface);
        tool.move_to(Point::new(6, 1), &mut surface);
        let out = bitmap(tool.end(Point::new(6, 1), &mut surface));
        assert_eq!(painted(&out), (0..=6).map(|x| (x, 1)).collect::<Vec<_>>());
    }

    #[test]
    fn even_pencil_size_centres_towards_top_left() {
        let buf = PixelBuffer::new(6, 6);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Pencil.create(opts("red", 2));
        tool.start(Point::new(2, 2), &buf, &mut surface);
        let out = bitmap(tool.end(Point::new(2, 2), &mut surface));
        assert_eq!(painted(&out), vec![(2, 2), (3, 2), (2, 3), (3, 3)]);
    }

    #[test]
    fn markers_have_one_pixel_thickness() {
        let buf = PixelBuffer::new(7, 7);
        let mut surface = BufferSurface::for_buffer(&buf);

        let mut tool = ToolKind::HorizontalMarker.create(opts("red", 3));
        tool.start(Point::new(3, 3), &buf, &mut surface);
        let out = bitmap(tool.end(Point::new(3, 3), &mut surface));
        assert_eq!(painted(&out), vec![(2, 3), (3, 3), (4, 3)]);

        let mut tool = ToolKind::VerticalMarker.create(opts("red", 3));
        tool.start(Point::new(3, 3), &buf, &mut surface);
        let out = bitmap(tool.end(Point::new(3, 3), &mut surface));
        assert_eq!(painted(&out), vec![(3, 2), (3, 3), (3, 4)]);
    }

    #[test]
    fn eraser_clears_to_transparent() {
        let buf = PixelBuffer::new_filled(5, 5, Color::WHITE);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Eraser.create(opts("red", 3));
        tool.start(Point::new(2, 2), &buf, &mut surface);
        let out = bitmap(tool.end(Point::new(2, 2), &mut surface));
        assert_eq!(out.get(2, 2), Color::TRANSPARENT);
        assert_eq!(out.get(1, 1), Color::TRANSPARENT);
        assert_eq!(out.get(0, 0), Color::WHITE);
        assert_eq!(painted(&out).len(), 25 - 9);
    }

    #[test]
    fn options_change_mid_stroke_applies_on_commit() {
        let buf = PixelBuffer::new(4, 4);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Line.create(opts("red", 1));
        tool.start(Point::new(0, 0), &buf, &mut surface);
        tool.set_options(opts("#0000ff", 1), &mut surface);
        assert_eq!(surface.pixels().get(0, 0), Color::rgb(0, 0, 255));
        let out = bitmap(tool.end(Point::new(3, 0), &mut surface));
        assert_eq!(out.get(3, 0), Color::rgb(0, 0, 255));
    }

    #[test]
    fn bucket_and_area_eraser_flood_at_release_point() {
        let mut buf = PixelBuffer::new_filled(6, 6, Color::WHITE);
        buf.fill(Rect::new(0, 0, 2, 6), RED, WriteMode::Replace);
        let mut surface = BufferSurface::for_buffer(&buf);

        let mut bucket = ToolKind::Bucket.create(opts("#00ff00", 1));
        bucket.start(Point::new(0, 0), &buf, &mut surface);
        bucket.move_to(Point::new(4, 4), &mut surface);
        let out = bitmap(bucket.end(Point::new(4, 4), &mut surface));
        assert_eq!(out.get(5, 5), Color::rgb(0, 255, 0));
        assert_eq!(out.get(0, 0), RED);

        let mut eraser = ToolKind::AreaEraser.create(ToolOptions::default());
        eraser.start(Point::new(1, 1), &buf, &mut surface);
        let out = bitmap(eraser.end(Point::new(1, 1), &mut surface));
        assert_eq!(out.get(0, 5), Color::TRANSPARENT);
        assert_eq!(out.get(2, 0), Color::WHITE);

        // Releasing off-canvas fills nothing.
        bucket.start(Point::new(0, 0), &buf, &mut surface);
        assert!(bucket.end(Point::new(-1, 3), &mut surface).is_none());
    }

    #[test]
    fn flood_tools_ignore_release_off_canvas() {
        let buf = PixelBuffer::new_filled(4, 4, Color::WHITE);
        let mut surface = BufferSurface::for_buffer(&buf);
        for kind in [ToolKind::Bucket, ToolKind::AreaEraser] {
            let mut tool = kind.create(opts("red", 1));
            tool.start(Point::new(1, 1), &buf, &mut surface);
            tool.move_to(Point::OUTSIDE, &mut surface);
            assert!(tool.end(Point::OUTSIDE, &mut surface).is_none(), "{:?}", kind);
            assert!(!tool.is_active());
            assert!(painted(surface.pixels()).is_empty());
        }
    }

    #[test]
    fn far_off_canvas_pointer_is_clipped() {
        let buf = PixelBuffer::new(16, 16);
        let mut surface = BufferSurface::for_buffer(&buf);
        let far = Point::new(2_000_000, 2_000_000);

        let mut line = ToolKind::Line.create(opts("red", 1));
        line.start(Point::new(0, 0), &buf, &mut surface);
        line.move_to(far, &mut surface);
        let out = bitmap(line.end(far, &mut surface));
        assert_eq!(painted(&out), (0..16).map(|i| (i, i)).collect::<Vec<_>>());

        let mut ellipse = ToolKind::Ellipse.create(opts("red", 1));
        ellipse.start(Point::new(0, 0), &buf, &mut surface);
        ellipse.move_to(Point::new(-2_000_000, 2_000_000), &mut surface);
        let out = bitmap(ellipse.end(far, &mut surface));
        assert!(painted(&out).is_empty());

        let mut pencil = ToolKind::Pencil.create(opts("red", 3));
        pencil.start(Point::new(8, 8), &buf, &mut surface);
        pencil.move_to(Point::new(2_000_000_000, 8), &mut surface);
        pencil.move_to(Point::new(-2_000_000_000, 8), &mut surface);
        let out = bitmap(pencil.end(Point::new(-2_000_000_000, 8), &mut surface));
        let band: Vec<(i32, i32)> = (7..=9).flat_map(|y| (0..16).map(move |x| (x, y))).collect();
        assert_eq!(painted(&out), band);
    }

    #[test]
    fn move_translates_and_drops_overflow() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.set(0, 0, RED);
        buf.set(3, 3, Color::WHITE);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Move.create(ToolOptions::default());

        tool.start(Point::new(1, 1), &buf, &mut surface);
        tool.move_to(Point::new(2, 2), &mut surface);
        // Ghost is dimmed and offset by (1, 1).
        assert_eq!(surface.pixels().get(1, 1).a, 127);
        assert_eq!(surface.pixels().get(0, 0).a, 0);

        let out = bitmap(tool.end(Point::new(2, 2), &mut surface));
        assert_eq!(out.get(1, 1), RED);
        assert_eq!(painted(&out), vec![(1, 1)]);
    }

    #[test]
    fn move_cancel_keeps_nothing() {
        let buf = PixelBuffer::new_filled(3, 3, RED);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::Move.create(ToolOptions::default());
        tool.start(Point::new(0, 0), &buf, &mut surface);
        tool.move_to(Point::new(1, 0), &mut surface);
        tool.cancel(&mut surface);
        assert!(painted(surface.pixels()).is_empty());
        assert!(tool.end(Point::new(1, 0), &mut surface).is_none());
    }

    #[test]
    fn color_picker_returns_options() {
        let mut buf = PixelBuffer::new(3, 3);
        buf.set(2, 1, Color::rgba(16, 32, 48, 64));
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = ToolKind::ColorPicker.create(opts("#000000", 5));
        tool.start(Point::new(0, 0), &buf, &mut surface);
        tool.move_to(Point::new(2, 1), &mut surface);
        match tool.end(Point::new(2, 1), &mut surface) {
            Some(ToolResult::AffectsOptions(o)) => {
                assert_eq!(o, opts("#10203040", 5));
                assert_eq!(tool.options(), &o);
            }
            other => panic!("expected options, got {:?}", other),
        }

        tool.start(Point::new(2, 1), &buf, &mut surface);
        assert!(tool.end(Point::OUTSIDE, &mut surface).is_none());
        assert_eq!(tool.options(), &opts("#10203040", 5));
    }

    #[test]
    fn catalog_index_resolution() {
        assert_eq!(ToolKind::from_index(0), ToolKind::Line);
        assert_eq!(ToolKind::from_index(3), ToolKind::Pencil);
        assert_eq!(ToolKind::from_index(10), ToolKind::Move);
        assert_eq!(ToolKind::from_index(11), ToolKind::Noop);
        assert_eq!(ToolKind::from_index(-1), ToolKind::Noop);
        for (i, kind) in ToolKind::CATALOG.iter().enumerate() {
            assert_eq!(kind.index(), Some(i));
            assert_eq!(kind.create(ToolOptions::default()).kind(), *kind);
        }
    }

    #[test]
    fn noop_tool_never_commits() {
        let buf = PixelBuffer::new(3, 3);
        let mut surface = BufferSurface::for_buffer(&buf);
        let mut tool = tool_for_index(42, ToolOptions::default());
        assert_eq!(tool.kind(), ToolKind::Noop);
        tool.start(Point::new(1, 1), &buf, &mut surface);
        assert!(tool.is_active());
        assert_eq!(painted(surface.pixels()), vec![(1, 1)]);
        assert!(tool.end(Point::new(2, 2), &mut surface).is_none());
        assert!(!tool.is_active());
    }

    #[test]
    fn invalid_color_paints_black() {
        assert_eq!(opts("not-a-color", 1).paint(), Color::BLACK);
        assert_eq!(opts("#abc", 500).brush_size, MAX_BRUSH_SIZE);
    }
}
