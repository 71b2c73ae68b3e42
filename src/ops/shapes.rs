//! Pixel geometry: lines, ellipse outlines and rectangle outlines.
//!
//! Every algorithm emits points through a `plot` callback so the same
//! geometry drives the live preview (one 1×1 `fill_rect` per point) and the
//! committed edit (`put_*`, which writes straight into a [`PixelBuffer`]).
//! Both go through the `*_within` forms, which only do work for the part of
//! a shape that lands inside the target, however far off it the pointer is.

use crate::canvas::{Color, PixelBuffer, Point, Rect};

/// Longest bounding-box edge the ellipse rasterizer accepts. Larger boxes
/// plot nothing.
pub const MAX_ELLIPSE_SPAN: i64 = 1 << 16;

/// Outline shapes drawn between two corner points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Rectangle,
    Ellipse,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Line => "Line",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Ellipse => "Ellipse",
        }
    }

    /// Run the matching rasterizer.
    pub fn rasterize(&self, from: Point, to: Point, plot: &mut impl FnMut(Point)) {
        match self {
            ShapeKind::Line => line(from, to, plot),
            ShapeKind::Rectangle => rectangle(from, to, plot),
            ShapeKind::Ellipse => ellipse(from, to, plot),
        }
    }

    /// Run the matching rasterizer, emitting only the points inside `bounds`.
    pub fn rasterize_within(
        &self,
        from: Point,
        to: Point,
        bounds: Rect,
        plot: &mut impl FnMut(Point),
    ) {
        match self {
            ShapeKind::Line => line_within(from, to, bounds, plot),
            ShapeKind::Rectangle => rectangle_within(from, to, bounds, plot),
            ShapeKind::Ellipse => ellipse_within(from, to, bounds, plot),
        }
    }

    /// Rasterize straight into `buffer`, skipping points outside it.
    pub fn put(&self, buffer: &mut PixelBuffer, from: Point, to: Point, color: Color) {
        let bounds = buffer.bounds();
        self.rasterize_within(from, to, bounds, &mut |p| buffer.set(p.x, p.y, color));
    }
}

fn rect_contains(r: Rect, x: i64, y: i64) -> bool {
    let (left, top) = (r.x as i64, r.y as i64);
    x >= left && y >= top && x < left + r.w as i64 && y < top + r.h as i64
}

// ============================================================================
// LINE - integer Bresenham, both endpoints inclusive
// ============================================================================

pub fn line(from: Point, to: Point, plot: &mut impl FnMut(Point)) {
    let (mut x0, mut y0) = (from.x as i64, from.y as i64);
    let (x1, y1) = (to.x as i64, to.y as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot(Point::new(x0 as i32, y0 as i32));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// The points of [`line`] that lie inside `bounds`, in the same order.
///
/// The major axis advances on every Bresenham step, so the minor offset after
/// `i` steps is `floor((2·minor·i + major) / (2·major))`. That lets the walk
/// start and stop at the steps where the major coordinate enters and leaves
/// `bounds` instead of tracing the whole segment.
pub fn line_within(from: Point, to: Point, bounds: Rect, plot: &mut impl FnMut(Point)) {
    if bounds.is_empty() {
        return;
    }
    let (x0, y0) = (from.x as i64, from.y as i64);
    let (x1, y1) = (to.x as i64, to.y as i64);
    let (adx, ady) = ((x1 - x0).abs(), (y1 - y0).abs());
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let x_major = adx >= ady;
    let (major, minor, start, step, lo, len) = if x_major {
        (adx, ady, x0, sx, bounds.x as i64, bounds.w as i64)
    } else {
        (ady, adx, y0, sy, bounds.y as i64, bounds.h as i64)
    };
    let hi = lo + len - 1;
    let (first, last) = if step > 0 {
        (lo - start, hi - start)
    } else {
        (start - hi, start - lo)
    };

    for i in first.max(0)..=last.min(major) {
        let offset = if major == 0 {
            0
        } else {
            ((2 * minor as i128 * i as i128 + major as i128) / (2 * major as i128)) as i64
        };
        let (x, y) = if x_major {
            (x0 + sx * i, y0 + sy * offset)
        } else {
            (x0 + sx * offset, y0 + sy * i)
        };
        if rect_contains(bounds, x, y) {
            plot(Point::new(x as i32, y as i32));
        }
    }
}

pub fn put_line(buffer: &mut PixelBuffer, from: Point, to: Point, color: Color) {
    ShapeKind::Line.put(buffer, from, to, color);
}

// ============================================================================
// ELLIPSE - midpoint ellipse inscribed in the box spanned by two corners
// ============================================================================

/// Boxes wider or taller than [`MAX_ELLIPSE_SPAN`] plot nothing; the error
/// terms grow with `a·b²` and would overflow.
pub fn ellipse(from: Point, to: Point, plot: &mut impl FnMut(Point)) {
    let (mut x0, mut y0) = (from.x as i64, from.y as i64);
    let (mut x1, mut y1) = (to.x as i64, to.y as i64);

    let mut a = (x1 - x0).abs();
    let b = (y1 - y0).abs();
    if a > MAX_ELLIPSE_SPAN || b > MAX_ELLIPSE_SPAN {
        return;
    }
    let mut b1 = b & 1;
    let mut dx = 4 * (1 - a) * b * b;
    let mut dy = 4 * (b1 + 1) * a * a;
    let mut err = dx + dy + b1 * a * a;

    if x0 > x1 {
        x0 = x1;
        x1 += a;
    }
    if y0 > y1 {
        y0 = y1;
    }
    y0 += (b + 1) / 2;
    y1 = y0 - b1;
    a *= 8 * a;
    b1 = 8 * b * b;

    let mut emit = |x: i64, y: i64| plot(Point::new(x as i32, y as i32));

    loop {
        emit(x1, y0);
        emit(x0, y0);
        emit(x0, y1);
        emit(x1, y1);
        let e2 = 2 * err;
        if e2 <= dy {
            y0 += 1;
            y1 -= 1;
            dy += a;
            err += dy;
        }
        if e2 >= dx || 2 * err > dy {
            x0 += 1;
            x1 -= 1;
            dx += b1;
            err += dx;
        }
        if x0 > x1 {
            break;
        }
    }

    // Flat ellipses (a == 1) stop before reaching the tips; finish them.
    while y0 - y1 <= b {
        emit(x0 - 1, y0);
        emit(x1 + 1, y0);
        y0 += 1;
        emit(x0 - 1, y1);
        emit(x1 + 1, y1);
        y1 -= 1;
    }
}

pub fn ellipse_within(from: Point, to: Point, bounds: Rect, plot: &mut impl FnMut(Point)) {
    let (left, right) = (from.x.min(to.x) as i64, from.x.max(to.x) as i64);
    let (top, bottom) = (from.y.min(to.y) as i64, from.y.max(to.y) as i64);
    let misses = right < bounds.x as i64
        || bottom < bounds.y as i64
        || left >= bounds.x as i64 + bounds.w as i64
        || top >= bounds.y as i64 + bounds.h as i64;
    if bounds.is_empty() || misses {
        return;
    }
    ellipse(from, to, &mut |p| {
        if rect_contains(bounds, p.x as i64, p.y as i64) {
            plot(p);
        }
    });
}

pub fn put_ellipse(buffer: &mut PixelBuffer, from: Point, to: Point, color: Color) {
    ShapeKind::Ellipse.put(buffer, from, to, color);
}

// ============================================================================
// RECTANGLE - unfilled outline
// ============================================================================

fn corners(from: Point, to: Point) -> [Point; 4] {
    let (left, right) = (from.x.min(to.x), from.x.max(to.x));
    let (top, bottom) = (from.y.min(to.y), from.y.max(to.y));
    [
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ]
}

pub fn rectangle(from: Point, to: Point, plot: &mut impl FnMut(Point)) {
    let [tl, tr, br, bl] = corners(from, to);
    line(tl, tr, plot);
    line(tr, br, plot);
    line(br, bl, plot);
    line(bl, tl, plot);
}

pub fn rectangle_within(from: Point, to: Point, bounds: Rect, plot: &mut impl FnMut(Point)) {
    let [tl, tr, br, bl] = corners(from, to);
    line_within(tl, tr, bounds, plot);
    line_within(tr, br, bounds, plot);
    line_within(br, bl, bounds, plot);
    line_within(bl, tl, bounds, plot);
}

pub fn put_rectangle(buffer: &mut PixelBuffer, from: Point, to: Point, color: Color) {
    ShapeKind::Rectangle.put(buffer, from, to, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn collect(kind: ShapeKind, from: Point, to: Point) -> Vec<Point> {
        let mut pts = Vec::new();
        kind.rasterize(from, to, &mut |p| pts.push(p));
        pts
    }

    #[test]
    fn horizontal_line_plots_each_point_once() {
        let pts = collect(ShapeKind::Line, Point::new(0, 0), Point::new(5, 0));
        let expected: Vec<Point> = (0..=5).map(|x| Point::new(x, 0)).collect();
        assert_eq!(pts, expected);
    }

    #[test]
    fn line_includes_both_endpoints_in_any_direction() {
        for (a, b) in [
            (Point::new(7, 3), Point::new(-2, 9)),
            (Point::new(0, 0), Point::new(3, 11)),
            (Point::new(4, 4), Point::new(4, 4)),
        ] {
            let pts = collect(ShapeKind::Line, a, b);
            assert_eq!(pts.first(), Some(&a));
            assert_eq!(pts.last(), Some(&b));
            let unique: HashSet<_> = pts.iter().collect();
            assert_eq!(unique.len(), pts.len());
            // One step per major-axis unit.
            let major = (a.x - b.x).abs().max((a.y - b.y).abs()) as usize;
            assert_eq!(pts.len(), major + 1);
        }
    }

    #[test]
    fn diagonal_line_steps_both_axes() {
        let pts = collect(ShapeKind::Line, Point::new(0, 0), Point::new(3, 3));
        assert_eq!(
            pts,
            vec![
                Point::new(0, 0),
                Point::new(1, 1),
                Point::new(2, 2),
                Point::new(3, 3)
            ]
        );
    }

    #[test]
    fn rectangle_outline_is_hollow() {
        let mut buf = PixelBuffer::new(6, 6);
        put_rectangle(&mut buf, Point::new(4, 4), Point::new(1, 1), Color::BLACK);
        for y in 0..6 {
            for x in 0..6 {
                let on_edge = (1..=4).contains(&x)
                    && (1..=4).contains(&y)
                    && (x == 1 || x == 4 || y == 1 || y == 4);
                let expected = if on_edge { Color::BLACK } else { Color::TRANSPARENT };
                assert_eq!(buf.get(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn ellipse_stays_in_bounding_box_and_touches_each_side() {
        let (a, b) = (Point::new(2, 1), Point::new(12, 7));
        let pts = collect(ShapeKind::Ellipse, a, b);
        assert!(pts.iter().all(|p| (2..=12).contains(&p.x) && (1..=7).contains(&p.y)));
        assert!(pts.iter().any(|p| p.x == 2));
        assert!(pts.iter().any(|p| p.x == 12));
        assert!(pts.iter().any(|p| p.y == 1));
        assert!(pts.iter().any(|p| p.y == 7));
    }

    #[test]
    fn thin_ellipse_reaches_its_tips() {
        // a == 1: without the tip correction the outline stops short of y=0/y=8.
        let pts = collect(ShapeKind::Ellipse, Point::new(0, 0), Point::new(1, 8));
        let ys: HashSet<i32> = pts.iter().map(|p| p.y).collect();
        for y in 0..=8 {
            assert!(ys.contains(&y), "row {y} missing");
        }
    }

    #[test]
    fn clipped_line_matches_full_line_inside_bounds() {
        let bounds = Rect::new(-3, 2, 12, 9);
        let coords: Vec<i32> = (-20..=20).step_by(5).collect();
        for &x0 in &coords {
            for &y0 in &coords {
                for &x1 in &coords {
                    for &y1 in &coords {
                        let (a, b) = (Point::new(x0, y0), Point::new(x1, y1));
                        let expected: Vec<Point> = collect(ShapeKind::Line, a, b)
                            .into_iter()
                            .filter(|p| rect_contains(bounds, p.x as i64, p.y as i64))
                            .collect();
                        let mut got = Vec::new();
                        line_within(a, b, bounds, &mut |p| got.push(p));
                        assert_eq!(got, expected, "{:?} -> {:?}", a, b);
                    }
                }
            }
        }
    }

    #[test]
    fn far_endpoints_only_touch_the_visible_part() {
        let bounds = Rect::new(0, 0, 16, 16);
        let mut pts = Vec::new();
        line_within(
            Point::new(0, 0),
            Point::new(2_000_000, 2_000_000),
            bounds,
            &mut |p| pts.push(p),
        );
        assert_eq!(pts, (0..16).map(|i| Point::new(i, i)).collect::<Vec<_>>());

        let mut pts = Vec::new();
        line_within(
            Point::new(i32::MIN + 1, 5),
            Point::new(i32::MAX, 9),
            bounds,
            &mut |p| pts.push(p),
        );
        assert_eq!(pts.len(), 16);
        assert!(pts.iter().all(|p| (5..=9).contains(&p.y)));

        let mut buf = PixelBuffer::new(16, 16);
        let far = Point::new(-2_000_000, 2_000_000);
        ShapeKind::Rectangle.put(&mut buf, Point::new(4, 4), far, Color::WHITE);
        assert_eq!(buf.get(4, 15), Color::WHITE);
        assert_eq!(buf.get(0, 4), Color::WHITE);
        assert_eq!(buf.get(5, 5), Color::TRANSPARENT);
    }

    #[test]
    fn oversized_ellipse_plots_nothing() {
        let mut count = 0;
        ellipse(Point::new(0, 0), Point::new(3_000_000, 3_000_000), &mut |_| count += 1);
        assert_eq!(count, 0);

        // At the limit the arithmetic still fits and the outline reaches its edges.
        let span = MAX_ELLIPSE_SPAN as i32;
        let mut buf = PixelBuffer::new(8, 8);
        let (from, to) = (Point::new(0, -span / 2), Point::new(span, span / 2));
        ShapeKind::Ellipse.put(&mut buf, from, to, Color::WHITE);
        assert_eq!(buf.get(0, 0), Color::WHITE);
        assert_eq!(buf.get(7, 7), Color::TRANSPARENT);
    }

    #[test]
    fn put_skips_points_outside_buffer() {
        let mut buf = PixelBuffer::new(3, 3);
        ShapeKind::Line.put(&mut buf, Point::new(-5, 1), Point::new(10, 1), Color::WHITE);
        for x in 0..3 {
            assert_eq!(buf.get(x, 1), Color::WHITE);
        }
        assert_eq!(buf.get(0, 0), Color::TRANSPARENT);
    }
}
