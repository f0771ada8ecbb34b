use crate::{error::Result, geom::IntRect};

/// A set of pixels described by pairwise disjoint, non-empty rectangles.
///
/// Rectangles are kept sorted by `(y, x)`, so two regions covering the same
/// pixels with the same decomposition compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<IntRect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: IntRect) -> Self {
        let mut r = Self::new();
        if !rect.is_empty() {
            r.rects.push(rect);
        }
        r
    }

    /// Union of possibly overlapping rectangles.
    pub fn from_rects(rects: impl IntoIterator<Item = IntRect>) -> Self {
        let mut r = Self::new();
        for rect in rects {
            r.union_rect(rect);
        }
        r
    }

    pub fn rects(&self) -> &[IntRect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn extents(&self) -> IntRect {
        self.rects
            .iter()
            .fold(IntRect::default(), |acc, r| acc.union(r))
    }

    pub fn area(&self) -> i64 {
        self.rects.iter().map(IntRect::area).sum()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains(x, y))
    }

    /// Copy that reports allocation failure instead of aborting.
    pub fn try_clone(&self) -> Result<Self> {
        let mut rects = Vec::new();
        rects.try_reserve_exact(self.rects.len())?;
        rects.extend_from_slice(&self.rects);
        Ok(Self { rects })
    }

    pub fn union_rect(&mut self, rect: IntRect) {
        if rect.is_empty() {
            return;
        }
        let mut pieces = vec![rect];
        for existing in &self.rects {
            pieces = pieces
                .into_iter()
                .flat_map(|p| subtract(&p, existing))
                .collect();
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
        self.normalize();
    }

    pub fn intersect_rect(&mut self, rect: &IntRect) {
        self.rects = self
            .rects
            .iter()
            .map(|r| r.intersect(rect))
            .filter(|r| !r.is_empty())
            .collect();
    }

    pub fn intersect(&mut self, other: &Region) {
        let mut rects = Vec::with_capacity(self.rects.len());
        for a in &self.rects {
            for b in &other.rects {
                let r = a.intersect(b);
                if !r.is_empty() {
                    rects.push(r);
                }
            }
        }
        self.rects = rects;
        self.normalize();
    }

    pub fn subtract_rect(&mut self, rect: &IntRect) {
        if rect.is_empty() {
            return;
        }
        self.rects = self.rects.iter().flat_map(|r| subtract(r, rect)).collect();
        self.normalize();
    }

    pub fn subtract(&mut self, other: &Region) {
        for r in &other.rects {
            self.subtract_rect(r);
        }
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        for r in &mut self.rects {
            *r = r.translate(dx, dy);
        }
    }

    fn normalize(&mut self) {
        self.rects.sort_by_key(|r| (r.y, r.x));
    }
}

/// `a` minus `b` as up to four disjoint rectangles: full-width bands above
/// and below, then the left and right remainders of the middle band.
fn subtract(a: &IntRect, b: &IntRect) -> Vec<IntRect> {
    let i = a.intersect(b);
    if i.is_empty() {
        return vec![*a];
    }
    [
        IntRect::from_ltrb(a.x, a.y, a.right(), i.y),
        IntRect::from_ltrb(a.x, i.bottom(), a.right(), a.bottom()),
        IntRect::from_ltrb(a.x, i.y, i.x, i.bottom()),
        IntRect::from_ltrb(i.right(), i.y, a.right(), i.bottom()),
    ]
    .into_iter()
    .filter(|r| !r.is_empty())
    .collect()
}
