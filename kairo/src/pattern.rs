//! Paint sources.
//!
//! [`Pattern`] is what clients build, positioned in user space and shared as
//! `Rc<Pattern>` once handed to a context. Before reaching a backend it is
//! resolved into a [`DevicePattern`] whose matrix maps device pixels straight
//! into pattern space.

use crate::{
    color::Color,
    error::{Error, Result, Sticky},
    geom::{
        check_invertible, integer_translation, DeviceToPattern, DeviceToUser, IntRect,
        PatternPoint, UserToPattern,
    },
    surface::SurfaceRef,
};
use euclid::Transform2D;
use std::rc::Rc;

pub mod acquire;

/// How a pattern is sampled outside its natural area.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum Extend {
    None,
    Repeat,
    Reflect,
    Pad,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, strum::Display)]
pub enum Filter {
    Fast,
    #[default]
    Good,
    Best,
    Nearest,
    Bilinear,
}

impl Filter {
    pub fn is_nearest(self) -> bool {
        matches!(self, Filter::Fast | Filter::Nearest)
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub p1: PatternPoint,
    pub p2: PatternPoint,
    pub stops: Vec<ColorStop>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    pub c1: PatternPoint,
    pub r1: f64,
    pub c2: PatternPoint,
    pub r2: f64,
    pub stops: Vec<ColorStop>,
}

#[derive(Clone, Debug)]
pub enum PatternKind {
    Solid(Color),
    Surface(SurfaceRef),
    Linear(LinearGradient),
    Radial(RadialGradient),
}

impl PatternKind {
    fn stops_mut(&mut self) -> Option<&mut Vec<ColorStop>> {
        match self {
            PatternKind::Linear(g) => Some(&mut g.stops),
            PatternKind::Radial(g) => Some(&mut g.stops),
            _ => None,
        }
    }

    pub fn stops(&self) -> Option<&[ColorStop]> {
        match self {
            PatternKind::Linear(g) => Some(&g.stops),
            PatternKind::Radial(g) => Some(&g.stops),
            _ => None,
        }
    }

    fn default_extend(&self) -> Extend {
        match self {
            PatternKind::Solid(_) | PatternKind::Surface(_) => Extend::None,
            PatternKind::Linear(_) | PatternKind::Radial(_) => Extend::Pad,
        }
    }
}

/// User-facing paint source. Mutable until shared.
#[derive(Debug)]
pub struct Pattern {
    kind: PatternKind,
    matrix: UserToPattern,
    extend: Extend,
    filter: Filter,
    status: Sticky,
}

pub type PatternRef = Rc<Pattern>;

impl Pattern {
    fn new(kind: PatternKind) -> Self {
        Self {
            extend: kind.default_extend(),
            kind,
            matrix: UserToPattern::identity(),
            filter: Filter::default(),
            status: Sticky::new(),
        }
    }

    /// Pattern permanently in error state `err`.
    pub fn nil(err: Error) -> Self {
        let r = Self::new(PatternKind::Solid(Color::TRANSPARENT));
        r.status.set(err);
        r
    }

    pub fn solid(color: Color) -> Self {
        Self::new(PatternKind::Solid(color))
    }

    pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::solid(Color::rgb(red, green, blue))
    }

    pub fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self::solid(Color::new(red, green, blue, alpha))
    }

    /// Pattern drawing `surface`, a nil pattern if the surface is in error.
    pub fn for_surface(surface: &SurfaceRef) -> Self {
        match surface.status() {
            Ok(()) => Self::new(PatternKind::Surface(Rc::clone(surface))),
            Err(e) => Self::nil(e),
        }
    }

    pub fn linear(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(PatternKind::Linear(LinearGradient {
            p1: PatternPoint::new(x1, y1),
            p2: PatternPoint::new(x2, y2),
            stops: Vec::new(),
        }))
    }

    pub fn radial(cx1: f64, cy1: f64, r1: f64, cx2: f64, cy2: f64, r2: f64) -> Self {
        Self::new(PatternKind::Radial(RadialGradient {
            c1: PatternPoint::new(cx1, cy1),
            r1,
            c2: PatternPoint::new(cx2, cy2),
            r2,
            stops: Vec::new(),
        }))
    }

    pub fn status(&self) -> Result<()> {
        self.status.check()
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    pub fn matrix(&self) -> &UserToPattern {
        &self.matrix
    }

    /// Set the user to pattern space matrix, it must be invertible.
    pub fn set_matrix(&mut self, matrix: UserToPattern) -> Result<()> {
        self.status.check()?;
        check_invertible(&matrix)?;
        self.matrix = matrix;
        Ok(())
    }

    pub fn extend(&self) -> Extend {
        self.extend
    }

    pub fn set_extend(&mut self, extend: Extend) {
        self.extend = extend;
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Append a stop to a gradient, offset is clamped to `[0, 1]`.
    ///
    /// Stops keep insertion order, equal offsets keep their relative order
    /// when sorted at use.
    pub fn add_color_stop(&mut self, offset: f64, color: Color) -> Result<()> {
        self.status.check()?;
        let Some(stops) = self.kind.stops_mut() else {
            return Err(Error::PatternTypeMismatch);
        };
        if let Err(e) = stops.try_reserve(1) {
            return Err(self.status.set(e.into()));
        }
        stops.push(ColorStop {
            offset: offset.clamp(0.0, 1.0),
            color,
        });
        Ok(())
    }

    pub fn add_color_stop_rgba(
        &mut self,
        offset: f64,
        red: f64,
        green: f64,
        blue: f64,
        alpha: f64,
    ) -> Result<()> {
        self.add_color_stop(offset, Color::new(red, green, blue, alpha))
    }

    pub fn color_stops(&self) -> Result<&[ColorStop]> {
        self.kind.stops().ok_or(Error::PatternTypeMismatch)
    }
}

/// A pattern as seen by backends: its matrix maps device pixels of the
/// destination into pattern space.
#[derive(Clone, Debug)]
pub struct DevicePattern {
    pub kind: PatternKind,
    pub matrix: DeviceToPattern,
    pub extend: Extend,
    pub filter: Filter,
}

impl DevicePattern {
    /// Resolve `pattern` for drawing with `device_to_user`.
    pub fn resolve(pattern: &Pattern, device_to_user: &DeviceToUser) -> Result<Self> {
        pattern.status()?;
        if let PatternKind::Surface(s) = &pattern.kind {
            s.status()?;
        }
        Ok(Self {
            kind: pattern.kind.clone(),
            matrix: device_to_user.then(&pattern.matrix),
            extend: pattern.extend,
            filter: pattern.filter,
        })
    }

    pub fn solid(color: Color) -> Self {
        Self {
            kind: PatternKind::Solid(color),
            matrix: Transform2D::identity(),
            extend: Extend::Repeat,
            filter: Filter::default(),
        }
    }

    /// Surface pattern whose pixel `(0, 0)` lands on device pixel `(x, y)`.
    pub fn for_surface_at(surface: &SurfaceRef, x: i32, y: i32) -> Self {
        Self {
            kind: PatternKind::Surface(Rc::clone(surface)),
            matrix: crate::geom::device_to_origin(x, y),
            extend: Extend::None,
            filter: Filter::Nearest,
        }
    }

    pub fn solid_color(&self) -> Option<Color> {
        match &self.kind {
            PatternKind::Solid(c) => Some(*c),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<&SurfaceRef> {
        match &self.kind {
            PatternKind::Surface(s) => Some(s),
            _ => None,
        }
    }

    /// Device rectangle outside which the pattern is transparent, `None` if
    /// it covers the whole plane.
    ///
    /// Only untransformed, non-repeating surface patterns have one.
    pub fn footprint(&self) -> Option<IntRect> {
        let PatternKind::Surface(s) = &self.kind else {
            return None;
        };
        if self.extend != Extend::None {
            return None;
        }
        let (tx, ty) = integer_translation(&self.matrix)?;
        s.extents().map(|e| e.translate(-tx, -ty))
    }
}

#[cfg(test)]
mod tests;
