use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Left-top-width-height rectangle in pixel space.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline(always)]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let r = self.right().max(other.right());
        let b = self.bottom().max(other.bottom());

        Rect::new(x, y, r - x, b - y)
    }

    /// Overlapping region; a zero-area rectangle when disjoint.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());

        if r <= x || b <= y {
            Rect::default()
        } else {
            Rect::new(x, y, r - x, b - y)
        }
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).area() > 0.0
    }

    /// Copy translated so its top edge sits at `y`.
    #[inline]
    pub fn at_y(&self, y: f32) -> Rect {
        Rect::new(self.x, y, self.w, self.h)
    }

    /// Distance between the facing horizontal edges of the two rectangles.
    pub fn vertical_gap(&self, other: &Rect) -> f32 {
        if self.y < other.y {
            (self.bottom() - other.y).abs()
        } else {
            (other.bottom() - self.y).abs()
        }
    }

    /// Distance between the facing vertical edges of the two rectangles.
    pub fn horizontal_gap(&self, other: &Rect) -> f32 {
        if self.x < other.x {
            (self.right() - other.x).abs()
        } else {
            (other.right() - self.x).abs()
        }
    }

    /// Crop the rectangle to a `cols x rows` image; overhang past any
    /// border is cut off, not translated inward.
    pub fn clip(&self, cols: f32, rows: f32) -> Rect {
        let x = self.x.clamp(0.0, cols);
        let y = self.y.clamp(0.0, rows);
        let w = (self.w - (x - self.x)).clamp(0.0, cols - x);
        let h = (self.h - (y - self.y)).clamp(0.0, rows - y);

        Rect::new(x, y, w, h)
    }

    /// Detector noise: non-positive dimensions or negative origin.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0 || self.x < 0.0 || self.y < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn union_covers_both() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 10.0, 10.0);
        let u = a.union(&b);

        assert_eq!(u, Rect::new(0.0, 0.0, 30.0, 15.0));
    }

    #[test]
    fn intersection_of_disjoint_is_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);

        assert_eq!(a.intersection(&b).area(), 0.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn intersection_of_overlapping() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let i = a.intersection(&b);

        assert_eq!(i, Rect::new(5.0, 5.0, 5.0, 5.0));
        assert_relative_eq!(i.area(), 25.0);
    }

    #[test]
    fn gaps_between_separated_rects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(30.0, 25.0, 10.0, 10.0);

        assert_relative_eq!(a.vertical_gap(&b), 15.0);
        assert_relative_eq!(b.vertical_gap(&a), 15.0);
        assert_relative_eq!(a.horizontal_gap(&b), 20.0);
    }

    #[test]
    fn clip_to_image_bounds() {
        let r = Rect::new(-5.0, 10.0, 50.0, 100.0);
        let c = r.clip(40.0, 60.0);

        assert_eq!(c.x, 0.0);
        assert_eq!(c.right(), 40.0);
        assert_eq!(c.bottom(), 60.0);
    }

    #[test]
    fn clip_truncates_overhang_past_the_origin() {
        // The part hanging left of x = 0 is cut off, not shifted inside.
        let c = Rect::new(-5.0, 0.0, 20.0, 10.0).clip(40.0, 60.0);
        assert_eq!(c.x, 0.0);
        assert_relative_eq!(c.w, 15.0);

        let c = Rect::new(10.0, -8.0, 10.0, 20.0).clip(40.0, 60.0);
        assert_eq!(c.y, 0.0);
        assert_relative_eq!(c.h, 12.0);

        // Fully outside collapses to an empty crop, never negative dims.
        let c = Rect::new(-30.0, 5.0, 20.0, 10.0).clip(40.0, 60.0);
        assert_eq!(c.w, 0.0);
    }

    #[test]
    fn degenerate_detection() {
        assert!(Rect::new(-1.0, 0.0, 5.0, 5.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_degenerate());
        assert!(!Rect::new(0.0, 0.0, 5.0, 5.0).is_degenerate());
    }
}
