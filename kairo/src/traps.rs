//! Device-space trapezoids in 16.16 fixed point, the geometry fed to the
//! compositor by path filling and stroking.

use crate::{
    geom::{DeviceBox, Fixed, IntRect},
    region::Region,
};
use euclid::Point2D;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PointFixed {
    pub x: Fixed,
    pub y: Fixed,
}

impl PointFixed {
    pub fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(Fixed::from_f64(x), Fixed::from_f64(y))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LineFixed {
    pub p1: PointFixed,
    pub p2: PointFixed,
}

impl LineFixed {
    pub fn new(p1: PointFixed, p2: PointFixed) -> Self {
        Self { p1, p2 }
    }

    pub fn vertical(x: Fixed, top: Fixed, bottom: Fixed) -> Self {
        Self::new(PointFixed::new(x, top), PointFixed::new(x, bottom))
    }

    pub fn is_vertical(&self) -> bool {
        self.p1.x == self.p2.x
    }

    /// X coordinate of the (extended) line at height `y`.
    pub fn x_at(&self, y: f64) -> f64 {
        let (x1, y1) = (self.p1.x.to_f64(), self.p1.y.to_f64());
        let (x2, y2) = (self.p2.x.to_f64(), self.p2.y.to_f64());
        if y1 == y2 {
            return x1;
        }
        x1 + (y - y1) * (x2 - x1) / (y2 - y1)
    }
}

/// Area between `left` and `right` restricted to `top <= y < bottom`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Trapezoid {
    pub top: Fixed,
    pub bottom: Fixed,
    pub left: LineFixed,
    pub right: LineFixed,
}

impl Trapezoid {
    /// If the trapezoid is a rectangle with integer edges, return it.
    pub fn pixel_rect(&self) -> Option<IntRect> {
        let (l, r) = (&self.left, &self.right);
        let aligned = l.is_vertical()
            && r.is_vertical()
            && l.p1.x.is_integer()
            && r.p1.x.is_integer()
            && self.top.is_integer()
            && self.bottom.is_integer();
        aligned.then(|| {
            IntRect::from_ltrb(
                l.p1.x.floor(),
                self.top.floor(),
                r.p1.x.floor(),
                self.bottom.floor(),
            )
        })
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        y >= self.top.to_f64()
            && y < self.bottom.to_f64()
            && x >= self.left.x_at(y)
            && x < self.right.x_at(y)
    }

    fn translate(&mut self, dx: Fixed, dy: Fixed) {
        self.top = self.top + dy;
        self.bottom = self.bottom + dy;
        for line in [&mut self.left, &mut self.right] {
            for p in [&mut line.p1, &mut line.p2] {
                p.x = p.x + dx;
                p.y = p.y + dy;
            }
        }
    }
}

/// List of non-overlapping trapezoids plus their bounding box.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Traps {
    traps: Vec<Trapezoid>,
    extents: Option<DeviceBox>,
}

impl Traps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: IntRect) -> Self {
        let mut r = Self::new();
        r.push_rect(rect);
        r
    }

    pub fn from_region(region: &Region) -> Self {
        let mut r = Self::new();
        region.rects().iter().for_each(|rect| r.push_rect(*rect));
        r
    }

    pub fn push_rect(&mut self, rect: IntRect) {
        if rect.is_empty() {
            return;
        }
        let (top, bottom) = (Fixed::from_int(rect.y), Fixed::from_int(rect.bottom()));
        self.push(
            top,
            bottom,
            LineFixed::vertical(Fixed::from_int(rect.x), top, bottom),
            LineFixed::vertical(Fixed::from_int(rect.right()), top, bottom),
        );
    }

    /// Add a trapezoid, degenerate ones (`top >= bottom`) are dropped.
    pub fn push(&mut self, top: Fixed, bottom: Fixed, left: LineFixed, right: LineFixed) {
        if top >= bottom {
            return;
        }
        let trap = Trapezoid {
            top,
            bottom,
            left,
            right,
        };
        let (t, b) = (top.to_f64(), bottom.to_f64());
        let x_min = left.x_at(t).min(left.x_at(b));
        let x_max = right.x_at(t).max(right.x_at(b));
        let bbox = DeviceBox::new(Point2D::new(x_min, t), Point2D::new(x_max, b));
        self.extents = Some(match self.extents {
            Some(e) => e.union(&bbox),
            None => bbox,
        });
        self.traps.push(trap);
    }

    pub fn traps(&self) -> &[Trapezoid] {
        &self.traps
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn extents_box(&self) -> Option<DeviceBox> {
        self.extents
    }

    /// Bounding box rounded out to whole pixels.
    pub fn extents(&self) -> IntRect {
        self.extents
            .as_ref()
            .map(IntRect::round_out)
            .unwrap_or_default()
    }

    /// The exact pixel region covered, if every trapezoid is a pixel-aligned
    /// rectangle. Antialiasing makes no difference to such a shape.
    pub fn extract_region(&self) -> Option<Region> {
        let mut rects = Vec::with_capacity(self.traps.len());
        for t in &self.traps {
            rects.push(t.pixel_rect()?);
        }
        Some(Region::from_rects(rects))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.traps.iter().any(|t| t.contains(x, y))
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        let (fx, fy) = (Fixed::from_int(dx), Fixed::from_int(dy));
        self.traps.iter_mut().for_each(|t| t.translate(fx, fy));
        self.extents = self
            .extents
            .map(|e| e.translate(euclid::vec2(dx as f64, dy as f64)));
    }
}
