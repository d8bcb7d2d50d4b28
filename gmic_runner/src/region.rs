/// Axis-aligned rectangle in buffer coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Covers any buffer extent in practice; narrowed by intersecting.
    pub const UNBOUNDED: Rect = Rect::new(i32::MIN / 2, i32::MIN / 2, i32::MAX, i32::MAX);

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Overlap of two rectangles, `None` when they do not touch.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Number of pixels, zero for empty rectangles.
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// Exclusive right edge, saturated at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturated at `i32::MAX`.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// The one-pixel-high scanline `y` spanning this rectangle's columns.
    pub fn row(&self, y: i32) -> Rect {
        Rect::new(self.x, y, self.width, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_clips_to_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 3, 3)), None);
    }

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(2, 2, 3, 3);
        assert!(r.contains(2, 2));
        assert!(r.contains(4, 4));
        assert!(!r.contains(5, 4));
    }

    #[test]
    fn edges_near_the_integer_limit_saturate() {
        let r = Rect::new(0, i32::MAX, 1, 10);
        assert_eq!(r.bottom(), i32::MAX);
        assert!(!r.contains(0, i32::MAX));
        assert_eq!(r.intersect(&Rect::new(0, 0, 10, 10)), None);
    }

    #[test]
    fn unbounded_narrows_to_the_other_rect() {
        let r = Rect::new(-5, 7, 30, 2);
        assert_eq!(Rect::UNBOUNDED.intersect(&r), Some(r));
    }

    #[test]
    fn empty_rect_has_no_area() {
        assert_eq!(Rect::new(0, 0, -1, 4).area(), 0);
        assert_eq!(Rect::new(1, 1, 2, 3).area(), 6);
    }
}
