use crate::math::Vec2;

/// Axis-aligned 2D bounding box in screen or projected space.
///
/// An empty box has `min > max` on both axes; including the first point makes
/// it a zero-area box around that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.include(p);
        }
        b
    }

    /// Grows the box to contain `p`. Non-finite points are ignored.
    pub fn include(&mut self, p: Vec2) {
        if !p.x.is_finite() || !p.y.is_finite() {
            return;
        }
        self.min[0] = self.min[0].min(p.x);
        self.min[1] = self.min[1].min(p.y);
        self.max[0] = self.max[0].max(p.x);
        self.max[1] = self.max[1].max(p.y);
    }

    pub fn union(&self, other: &Self) -> Self {
        Aabb2 {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min[0] <= self.max[0] && self.min[1] <= self.max[1])
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
        )
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }

    /// True when `other` lies inside `self`, allowing `eps` of slack on every edge.
    pub fn contains_box(&self, other: &Self, eps: f64) -> bool {
        other.min[0] >= self.min[0] - eps
            && other.min[1] >= self.min[1] - eps
            && other.max[0] <= self.max[0] + eps
            && other.max[1] <= self.max[1] + eps
    }
}
