use std::fmt;
use std::str::FromStr;

/// Largest accepted edge length (per axis) of a [`PixelBuffer`].
pub const MAX_DIMENSION: u32 = 4096;

/// Bytes per RGBA8888 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Floor + clamp an untrusted dimension into `[1, MAX_DIMENSION]`.
/// NaN and negative values collapse to 1.
pub fn clamp_dimension(value: f64) -> u32 {
    if value.is_nan() {
        return 1;
    }
    value.floor().clamp(1.0, MAX_DIMENSION as f64) as u32
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Integer pixel coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// No current pointer position: the pointer has left the canvas or
    /// never entered it.
    pub const OUTSIDE: Point = Point {
        x: i32::MIN,
        y: i32::MIN,
    };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_outside(&self) -> bool {
        *self == Self::OUTSIDE
    }

    /// `self - origin`, saturating so the sentinel never overflows.
    pub fn delta_from(&self, origin: Point) -> (i32, i32) {
        (
            self.x.saturating_sub(origin.x),
            self.y.saturating_sub(origin.y),
        )
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::OUTSIDE
    }
}

/// Integer rectangle. `w`/`h` are expected to be non-negative; a rectangle
/// with a non-positive extent covers nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

// ============================================================================
// COLOR
// ============================================================================

/// How a color is written onto a destination pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Overwrite the destination.
    #[default]
    Replace,
    /// Alpha-composite with [`Color::mix`].
    Blend,
}

/// Straight (non-premultiplied) RGBA8888 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Build a color from out-of-range channel values, clamping each into
    /// `[0, 255]`.
    pub fn clamped(r: i32, g: i32, b: i32, a: i32) -> Self {
        Self {
            r: clamp_channel(r),
            g: clamp_channel(g),
            b: clamp_channel(b),
            a: clamp_channel(a),
        }
    }

    pub fn set_red(&mut self, value: i32) {
        self.r = clamp_channel(value);
    }

    pub fn set_green(&mut self, value: i32) {
        self.g = clamp_channel(value);
    }

    pub fn set_blue(&mut self, value: i32) {
        self.b = clamp_channel(value);
    }

    pub fn set_alpha(&mut self, value: i32) {
        self.a = clamp_channel(value);
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_array(c: [u8; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }

    /// Composite `src` onto `self`.
    ///
    /// Each color channel is `dst.a/255 * dst.c + src.a/255 * src.c` and the
    /// alpha channels are summed, everything clamped to 255. This is not
    /// Porter-Duff "over"; effects built on top depend on the accumulation.
    pub fn mix(self, src: Color) -> Color {
        let da = self.a as f32 / 255.0;
        let sa = src.a as f32 / 255.0;
        let channel = |d: u8, s: u8| -> u8 { (da * d as f32 + sa * s as f32).round().min(255.0) as u8 };
        Color {
            r: channel(self.r, src.r),
            g: channel(self.g, src.g),
            b: channel(self.b, src.b),
            a: (self.a as u16 + src.a as u16).min(255) as u8,
        }
    }

    /// Same color at half the alpha (used for move previews).
    pub fn dimmed(self) -> Color {
        Color { a: self.a / 2, ..self }
    }

    /// CSS representation: `#rrggbb` when opaque, `#rrggbbaa` otherwise.
    pub fn to_css(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// A CSS color string that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised color '{}'", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Parses the CSS subset the editor stores in its options:
    /// hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`), `rgb()`, `rgba()` and a
    /// handful of named colors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let text = s.trim().to_ascii_lowercase();

        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }
        if let Some(args) = text
            .strip_prefix("rgba(")
            .or_else(|| text.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args).ok_or_else(err);
        }
        named_color(&text).ok_or_else(err)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |p: &str| p.parse::<f64>().ok().map(|v| v.round() as i32);
    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;
    let a = match parts.get(3) {
        Some(p) => (p.parse::<f64>().ok()? * 255.0).round() as i32,
        None => 255,
    };
    Some(Color::clamped(r, g, b, a))
}

fn named_color(name: &str) -> Option<Color> {
    Some(match name {
        "transparent" => Color::TRANSPARENT,
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "blue" => Color::rgb(0, 0, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "cyan" | "aqua" => Color::rgb(0, 255, 255),
        "magenta" | "fuchsia" => Color::rgb(255, 0, 255),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "orange" => Color::rgb(255, 165, 0),
        "purple" => Color::rgb(128, 0, 128),
        _ => return None,
    })
}

// ============================================================================
// PIXEL BUFFER - flat RGBA8888 storage
// ============================================================================

/// Error raised when building a [`PixelBuffer`] from foreign bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmapError {
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for BitmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitmapError::SizeMismatch { expected, actual } => write!(
                f,
                "pixel data has {} bytes, expected {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for BitmapError {}

/// Fixed-size RGBA8888 bitmap. `data.len() == width * height * 4` always.
///
/// Pixel accessors do not bounds-check; test [`PixelBuffer::contains`] first
/// when coordinates come from outside (pointer input, fill neighbours).
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Zero-filled (fully transparent black) buffer. Dimensions are clamped
    /// into `[1, MAX_DIMENSION]`.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_DIMENSION);
        let height = height.clamp(1, MAX_DIMENSION);
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Wrap existing bytes. Dimensions are clamped first; the byte length must
    /// then match exactly.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BitmapError> {
        let width = width.clamp(1, MAX_DIMENSION);
        let height = height.clamp(1, MAX_DIMENSION);
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(BitmapError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn new_filled(width: u32, height: u32, color: Color) -> Self {
        let mut buffer = Self::new(width, height);
        buffer.fill_all(color);
        buffer
    }

    // ---- accessors ----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Full extent as a rectangle at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.contains(x, y), "pixel ({}, {}) out of bounds", x, y);
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    // ---- pixel access -------------------------------------------------------

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Color {
        let o = self.offset(x, y);
        Color::rgba(
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        )
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, color: Color) {
        let o = self.offset(x, y);
        self.data[o..o + BYTES_PER_PIXEL].copy_from_slice(&color.to_array());
    }

    /// Composite `color` onto the pixel. Opaque colors are plain writes.
    #[inline]
    pub fn blend(&mut self, x: i32, y: i32, color: Color) {
        if color.is_opaque() {
            self.set(x, y, color);
        } else {
            let mixed = self.get(x, y).mix(color);
            self.set(x, y, mixed);
        }
    }

    #[inline]
    pub fn write(&mut self, x: i32, y: i32, color: Color, mode: WriteMode) {
        match mode {
            WriteMode::Replace => self.set(x, y, color),
            WriteMode::Blend => self.blend(x, y, color),
        }
    }

    // ---- bulk operations ----------------------------------------------------

    /// Fill `rect` clipped to the buffer. Scans `top..=bottom` and
    /// `left..=right` where the far edges stop one short of `height`/`width`.
    pub fn fill(&mut self, rect: Rect, color: Color, mode: WriteMode) {
        let left = rect.x.max(0);
        let top = rect.y.max(0);
        let right = rect.x.saturating_add(rect.w).min(self.width as i32) - 1;
        let bottom = rect.y.saturating_add(rect.h).min(self.height as i32) - 1;
        if right < left || bottom < top {
            return;
        }

        if mode == WriteMode::Replace || color.is_opaque() {
            let px = color.to_array();
            for y in top..=bottom {
                let start = self.offset(left, y);
                let end = self.offset(right, y) + BYTES_PER_PIXEL;
                for chunk in self.data[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                    chunk.copy_from_slice(&px);
                }
            }
        } else {
            for y in top..=bottom {
                for x in left..=right {
                    self.blend(x, y, color);
                }
            }
        }
    }

    /// Overwrite every pixel with `color`.
    pub fn fill_all(&mut self, color: Color) {
        let px = color.to_array();
        for chunk in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Copy `src_rect` of `self` to `dest_rect.{x,y}` of `dest`, row by row.
    ///
    /// Both rectangles default to the full extents. Only the part that lies
    /// inside both buffers and inside both rectangles is copied; anything
    /// hanging off an edge is dropped.
    pub fn copy_to(&self, dest: &mut PixelBuffer, src_rect: Option<Rect>, dest_rect: Option<Rect>) {
        let src = src_rect.unwrap_or_else(|| self.bounds());
        let dst = dest_rect.unwrap_or_else(|| dest.bounds());

        let (mut sx, mut sy) = (src.x as i64, src.y as i64);
        let (mut dx, mut dy) = (dst.x as i64, dst.y as i64);
        let mut w = (src.w as i64).min(dst.w as i64);
        let mut h = (src.h as i64).min(dst.h as i64);

        // Clip the leading edges; whichever side moves drags the other along.
        if sx < 0 {
            dx -= sx;
            w += sx;
            sx = 0;
        }
        if sy < 0 {
            dy -= sy;
            h += sy;
            sy = 0;
        }
        if dx < 0 {
            sx -= dx;
            w += dx;
            dx = 0;
        }
        if dy < 0 {
            sy -= dy;
            h += dy;
            dy = 0;
        }
        w = w
            .min(self.width as i64 - sx)
            .min(dest.width as i64 - dx);
        h = h
            .min(self.height as i64 - sy)
            .min(dest.height as i64 - dy);
        if w <= 0 || h <= 0 {
            return;
        }

        let row_bytes = w as usize * BYTES_PER_PIXEL;
        for row in 0..h {
            let s = self.offset(sx as i32, (sy + row) as i32);
            let d = dest.offset(dx as i32, (dy + row) as i32);
            dest.data[d..d + row_bytes].copy_from_slice(&self.data[s..s + row_bytes]);
        }
    }

    /// Same-size copy shifted by `(dx, dy)`; uncovered pixels are transparent.
    pub fn translated(&self, dx: i32, dy: i32) -> PixelBuffer {
        let mut out = PixelBuffer::new(self.width, self.height);
        let dest_rect = Rect::new(dx, dy, self.width as i32, self.height as i32);
        self.copy_to(&mut out, None, Some(dest_rect));
        out
    }

    /// Copy with every pixel's alpha halved.
    pub fn dimmed(&self) -> PixelBuffer {
        let mut out = self.clone();
        for chunk in out.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk[3] /= 2;
        }
        out
    }
}

// ============================================================================
// PREVIEW SURFACE
// ============================================================================

/// Raster target the tools draw live feedback onto (stroke in progress,
/// cursor, move ghost). Coordinates are buffer pixels; the host applies any
/// zoom.
pub trait Surface {
    /// Color used by subsequent [`Surface::fill_rect`] calls.
    fn set_paint(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect);
    fn clear_rect(&mut self, rect: Rect);
    fn clear(&mut self);
    fn draw_image(&mut self, image: &PixelBuffer, dx: i32, dy: i32);
}

/// A [`Surface`] backed by its own [`PixelBuffer`]: used headless and in tests.
#[derive(Clone, Debug)]
pub struct BufferSurface {
    pixels: PixelBuffer,
    paint: Color,
}

impl BufferSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: PixelBuffer::new(width, height),
            paint: Color::BLACK,
        }
    }

    /// Surface matching a buffer's size.
    pub fn for_buffer(buffer: &PixelBuffer) -> Self {
        Self::new(buffer.width(), buffer.height())
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn paint(&self) -> Color {
        self.paint
    }
}

impl Surface for BufferSurface {
    fn set_paint(&mut self, color: Color) {
        self.paint = color;
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.pixels.fill(rect, self.paint, WriteMode::Blend);
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.pixels.fill(rect, Color::TRANSPARENT, WriteMode::Replace);
    }

    fn clear(&mut self) {
        self.pixels.fill_all(Color::TRANSPARENT);
    }

    fn draw_image(&mut self, image: &PixelBuffer, dx: i32, dy: i32) {
        for y in 0..image.height() as i32 {
            for x in 0..image.width() as i32 {
                let (tx, ty) = (x.saturating_add(dx), y.saturating_add(dy));
                if self.pixels.contains(tx, ty) {
                    let c = image.get(x, y);
                    if c.a > 0 {
                        self.pixels.blend(tx, ty, c);
                    }
                }
            }
        }
    }
}
