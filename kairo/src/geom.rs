//! Coordinate spaces, matrices and integer/fixed-point geometry.
//!
//! User space is what the client draws in, device space is the pixel grid of
//! the target surface, pattern space is the pixel grid of a pattern's source.

use crate::error::{Error, Result};
use euclid::{Box2D, Point2D, Transform2D};

pub enum UserSpace {}
pub enum DeviceSpace {}
pub enum PatternSpace {}

pub type Matrix = Transform2D<f64, UserSpace, UserSpace>;
pub type UserToDevice = Transform2D<f64, UserSpace, DeviceSpace>;
pub type DeviceToUser = Transform2D<f64, DeviceSpace, UserSpace>;
pub type UserToPattern = Transform2D<f64, UserSpace, PatternSpace>;
pub type DeviceToPattern = Transform2D<f64, DeviceSpace, PatternSpace>;

pub type UserPoint = Point2D<f64, UserSpace>;
pub type DevicePoint = Point2D<f64, DeviceSpace>;
pub type PatternPoint = Point2D<f64, PatternSpace>;
pub type UserVector = euclid::Vector2D<f64, UserSpace>;
pub type UserBox = Box2D<f64, UserSpace>;
pub type DeviceBox = Box2D<f64, DeviceSpace>;

/// Return `Err(InvalidMatrix)` if `m` has no inverse.
pub fn check_invertible<S, D>(m: &Transform2D<f64, S, D>) -> Result<()> {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(Error::InvalidMatrix);
    }
    Ok(())
}

/// If `m` only translates by whole pixels, return that translation.
pub fn integer_translation<S, D>(m: &Transform2D<f64, S, D>) -> Option<(i32, i32)> {
    let is_int = |v: f64| v == v.trunc() && v.abs() < i32::MAX as f64;
    let pure_translate = m.m11 == 1.0 && m.m12 == 0.0 && m.m21 == 0.0 && m.m22 == 1.0;
    (pure_translate && is_int(m.m31) && is_int(m.m32)).then(|| (m.m31 as i32, m.m32 as i32))
}

/// Translation from device pixels to an image whose origin sits at `(x, y)`.
pub fn device_to_origin(x: i32, y: i32) -> DeviceToPattern {
    Transform2D::translation(-x as f64, -y as f64)
}

/// Convert a geometric object into its tiny-skia counterpart.
pub trait IntoSkia {
    type Output;
    fn into_skia(self) -> Self::Output;
}

impl<S, D> IntoSkia for Transform2D<f64, S, D> {
    type Output = tiny_skia::Transform;

    fn into_skia(self) -> Self::Output {
        tiny_skia::Transform::from_row(
            self.m11 as f32,
            self.m12 as f32,
            self.m21 as f32,
            self.m22 as f32,
            self.m31 as f32,
            self.m32 as f32,
        )
    }
}

impl IntoSkia for IntRect {
    type Output = Option<tiny_skia::Rect>;

    fn into_skia(self) -> Self::Output {
        tiny_skia::Rect::from_xywh(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

/// 16.16 signed fixed point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Fixed(pub i32);

impl Fixed {
    pub const ONE: Fixed = Fixed(1 << 16);
    pub const ZERO: Fixed = Fixed(0);

    /// Largest integer part a `Fixed` can hold.
    pub const MAX_INT: i32 = i16::MAX as i32;

    /// Saturates outside `-MAX_INT - 1..=MAX_INT`.
    pub fn from_int(i: i32) -> Self {
        Self(i.clamp(-Self::MAX_INT - 1, Self::MAX_INT) << 16)
    }

    /// Saturates out of range values, NaN maps to zero.
    pub fn from_f64(v: f64) -> Self {
        Self((v * 65536.0).round() as i32)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 65536.0
    }

    pub fn is_integer(self) -> bool {
        self.0 & 0xffff == 0
    }

    pub fn floor(self) -> i32 {
        self.0 >> 16
    }

    pub fn ceil(self) -> i32 {
        ((self.0 as i64 + 0xffff) >> 16) as i32
    }
}

impl std::ops::Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

/// Integer rectangle in device pixels. Width and height are never negative,
/// a rectangle with zero area is empty.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IntRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, (right - left).max(0), (bottom - top).max(0))
    }

    /// Smallest integer rectangle containing `b`.
    pub fn round_out(b: &DeviceBox) -> Self {
        if b.is_empty() || !b.min.x.is_finite() || !b.max.x.is_finite() {
            return Self::default();
        }
        let clamp = |v: f64| v.clamp(i32::MIN as f64 / 2.0, i32::MAX as f64 / 2.0) as i32;
        Self::from_ltrb(
            clamp(b.min.x.floor()),
            clamp(b.min.y.floor()),
            clamp(b.max.x.ceil()),
            clamp(b.max.y.ceil()),
        )
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// Intersection, an empty rectangle if they do not overlap.
    pub fn intersect(&self, other: &IntRect) -> IntRect {
        let r = Self::from_ltrb(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        );
        if r.is_empty() {
            Self::default()
        } else {
            r
        }
    }

    pub fn union(&self, other: &IntRect) -> IntRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::from_ltrb(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn contains_rect(&self, other: &IntRect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    pub fn translate(&self, dx: i32, dy: i32) -> IntRect {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn to_box(self) -> DeviceBox {
        Box2D::new(
            Point2D::new(self.x as f64, self.y as f64),
            Point2D::new(self.right() as f64, self.bottom() as f64),
        )
    }
}
