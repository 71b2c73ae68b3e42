use crate::canvas::{Color, PixelBuffer, Point};

/// 4-connected flood fill from `start`, replacing every pixel that matches the
/// starting pixel's color exactly.
///
/// `start` must lie inside the buffer. Uses an explicit `Vec` stack so large
/// regions never hit a recursion limit. Returns the number of pixels painted
/// (zero when the region already has the fill color).
pub fn flood_fill(buffer: &mut PixelBuffer, start: Point, fill: Color) -> usize {
    let target = buffer.get(start.x, start.y);
    if target == fill {
        return 0;
    }

    // Pixels are stamped when pushed; a stamped pixel no longer matches
    // `target`, so nothing is pushed twice.
    let mut stack: Vec<Point> = Vec::with_capacity(1024);
    buffer.set(start.x, start.y, fill);
    stack.push(start);
    let mut painted = 1;

    while let Some(p) = stack.pop() {
        for (nx, ny) in [(p.x, p.y - 1), (p.x + 1, p.y), (p.x, p.y + 1), (p.x - 1, p.y)] {
            if buffer.contains(nx, ny) && buffer.get(nx, ny) == target {
                buffer.set(nx, ny, fill);
                stack.push(Point::new(nx, ny));
                painted += 1;
            }
        }
    }

    painted
}

/// Flood fill with full transparency.
pub fn flood_erase(buffer: &mut PixelBuffer, start: Point) -> usize {
    flood_fill(buffer, start, Color::TRANSPARENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Rect, WriteMode};

    fn red_square_on_white() -> PixelBuffer {
        let mut buf = PixelBuffer::new_filled(10, 10, Color::WHITE);
        buf.fill(Rect::new(2, 2, 3, 3), Color::rgb(255, 0, 0), WriteMode::Replace);
        buf
    }

    #[test]
    fn filling_with_same_color_is_a_noop() {
        let mut buf = red_square_on_white();
        let before = buf.clone();
        assert_eq!(flood_fill(&mut buf, Point::new(0, 0), Color::WHITE), 0);
        assert_eq!(buf, before);
    }

    #[test]
    fn fill_stays_inside_the_matching_region() {
        let mut buf = red_square_on_white();
        let green = Color::rgb(0, 255, 0);
        let painted = flood_fill(&mut buf, Point::new(3, 3), green);
        assert_eq!(painted, 9);
        assert_eq!(buf.get(4, 4), green);
        assert_eq!(buf.get(2, 2), green);
        assert_eq!(buf.get(5, 5), Color::WHITE);
        assert_eq!(buf.get(1, 3), Color::WHITE);
    }

    #[test]
    fn filling_square_with_background_merges_it() {
        let mut buf = red_square_on_white();
        flood_fill(&mut buf, Point::new(3, 3), Color::WHITE);
        assert_eq!(buf.get(4, 4), Color::WHITE);
        assert_eq!(buf, PixelBuffer::new_filled(10, 10, Color::WHITE));
    }

    #[test]
    fn fill_is_four_connected() {
        // Diagonal neighbours must not leak.
        let mut buf = PixelBuffer::new_filled(3, 3, Color::WHITE);
        buf.set(1, 0, Color::BLACK);
        buf.set(0, 1, Color::BLACK);
        flood_fill(&mut buf, Point::new(0, 0), Color::rgb(0, 0, 255));
        assert_eq!(buf.get(0, 0), Color::rgb(0, 0, 255));
        assert_eq!(buf.get(1, 1), Color::WHITE);
    }

    #[test]
    fn erase_clears_region_and_is_idempotent() {
        let mut buf = red_square_on_white();
        assert_eq!(flood_erase(&mut buf, Point::new(0, 0)), 100 - 9);
        assert_eq!(buf.get(9, 9), Color::TRANSPARENT);
        assert_eq!(buf.get(3, 3), Color::rgb(255, 0, 0));
        assert_eq!(flood_erase(&mut buf, Point::new(0, 0)), 0);
    }

    #[test]
    fn large_region_does_not_overflow_the_stack() {
        let mut buf = PixelBuffer::new(1024, 1024);
        let painted = flood_fill(&mut buf, Point::new(512, 512), Color::BLACK);
        assert_eq!(painted, 1024 * 1024);
    }
}
