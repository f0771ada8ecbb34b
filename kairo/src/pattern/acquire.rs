//! Turning a pattern into a surface a backend can sample.
//!
//! Every pattern kind comes out as the same [`Acquired`] value: a surface plus
//! [`SurfaceAttributes`] placing it. Destination pixel `p` of the requested
//! area samples the surface at `attrs.matrix * (p + offset + 0.5)`.

use super::{ColorStop, DevicePattern, Extend, Filter, PatternKind};
use crate::{
    color::{Color, Pixel},
    error::{Error, Result},
    geom::{integer_translation, DevicePoint, DeviceToPattern, Fixed, IntRect, PatternPoint},
    surface::{
        image::{Format, ImageSurface},
        Backend, CompositeRect, Surface, SurfaceRef,
    },
};
use euclid::Transform2D;
use log::debug;
use std::rc::Rc;

const FIXED_ONE: i64 = 1 << 16;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SurfaceAttributes {
    pub matrix: DeviceToPattern,
    pub extend: Extend,
    pub filter: Filter,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Surface is borrowed from the pattern's own surface and given back on
    /// release, not a private copy.
    pub acquired: bool,
}

impl SurfaceAttributes {
    fn placed(extend: Extend, x_offset: i32, y_offset: i32) -> Self {
        Self {
            matrix: Transform2D::identity(),
            extend,
            filter: Filter::Nearest,
            x_offset,
            y_offset,
            acquired: false,
        }
    }
}

/// Result of acquiring a pattern, releases a borrowed image when dropped.
#[derive(Debug)]
pub struct Acquired {
    pub surface: SurfaceRef,
    pub attrs: SurfaceAttributes,
    origin: Option<SurfaceRef>,
}

impl Acquired {
    fn owned(surface: SurfaceRef, attrs: SurfaceAttributes) -> Self {
        Self {
            surface,
            attrs,
            origin: None,
        }
    }
}

impl Drop for Acquired {
    fn drop(&mut self) {
        if let Some(origin) = self.origin.take() {
            origin.release_source_image(&self.surface);
        }
    }
}

/// Realize `pattern` for sampling the device area `rect` of `dst`.
pub fn acquire(pattern: &DevicePattern, dst: &mut dyn Backend, rect: IntRect) -> Result<Acquired> {
    match &pattern.kind {
        PatternKind::Solid(c) => solid(*c),
        PatternKind::Linear(g) => gradient(pattern, &g.stops, rect),
        PatternKind::Radial(g) => gradient(pattern, &g.stops, rect),
        PatternKind::Surface(s) => surface(pattern, s, dst, rect),
    }
}

/// Acquire source and optional mask together.
///
/// Two solid colors collapse into one solid source and no mask.
pub fn acquire_pair(
    src: &DevicePattern,
    mask: Option<&DevicePattern>,
    dst: &mut dyn Backend,
    rect: &CompositeRect,
) -> Result<(Acquired, Option<Acquired>)> {
    if let (Some(color), Some(m)) = (src.solid_color(), mask.and_then(DevicePattern::solid_color)) {
        return Ok((solid(color.multiply_alpha(m.alpha))?, None));
    }
    let src = acquire(src, dst, rect.src_rect())?;
    let mask = mask.map(|m| acquire(m, dst, rect.mask_rect())).transpose()?;
    Ok((src, mask))
}

fn into_surface(image: ImageSurface) -> SurfaceRef {
    Surface::from_backend(Box::new(image))
}

fn solid(color: Color) -> Result<Acquired> {
    let mut image = ImageSurface::new(Format::Argb32, 1, 1)?;
    image.set_pixel(0, 0, color.to_pixel());
    Ok(Acquired::owned(
        into_surface(image),
        SurfaceAttributes::placed(Extend::Repeat, 0, 0),
    ))
}

fn surface(
    pattern: &DevicePattern,
    src: &SurfaceRef,
    dst: &mut dyn Backend,
    rect: IntRect,
) -> Result<Acquired> {
    let (surface, origin) = if dst.consumes_images() {
        (src.acquire_source_image()?, Some(Rc::clone(src)))
    } else {
        match dst.clone_similar(src, rect) {
            Ok(clone) => (clone, None),
            Err(Error::Unsupported) => {
                debug!("clone_similar unsupported, sample source image");
                (src.acquire_source_image()?, Some(Rc::clone(src)))
            }
            Err(e) => return Err(e),
        }
    };
    let mut attrs = SurfaceAttributes {
        matrix: pattern.matrix,
        extend: pattern.extend,
        filter: pattern.filter,
        x_offset: 0,
        y_offset: 0,
        acquired: origin.is_some(),
    };
    if let Some((tx, ty)) = integer_translation(&pattern.matrix) {
        attrs.matrix = Transform2D::identity();
        attrs.x_offset = tx;
        attrs.y_offset = ty;
    }
    Ok(Acquired {
        surface,
        attrs,
        origin,
    })
}

/// Fold a raw 16.16 gradient factor into `[0, 65536]` by `extend`, `None`
/// where the gradient is transparent.
pub fn fold_factor(f: i64, extend: Extend) -> Option<i64> {
    match extend {
        Extend::None => (0..=FIXED_ONE).contains(&f).then_some(f),
        Extend::Pad => Some(f.clamp(0, FIXED_ONE)),
        Extend::Repeat => Some(f.rem_euclid(FIXED_ONE)),
        Extend::Reflect => {
            let f = f.abs();
            let frac = f & (FIXED_ONE - 1);
            Some(if (f >> 16) & 1 == 1 { FIXED_ONE - frac } else { frac })
        }
    }
}

fn to_fixed(t: f64) -> i64 {
    let limit = i32::MAX as f64;
    Fixed::from_f64(t.clamp(-limit / 65536.0, limit / 65536.0)).0 as i64
}

fn premultiplied(c: &Color) -> [f64; 4] {
    [c.red * c.alpha, c.green * c.alpha, c.blue * c.alpha, c.alpha]
}

/// Color of the sorted `stops` at folded factor `f`.
fn color_at(stops: &[ColorStop], f: i64) -> Pixel {
    let quantize = |c: [f64; 4]| c.map(|v| (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8);
    let first = &stops[0];
    if f <= to_fixed(first.offset) {
        return first.color.to_pixel();
    }
    for w in stops.windows(2) {
        let (o0, o1) = (to_fixed(w[0].offset), to_fixed(w[1].offset));
        if f < o1 {
            let t = (f - o0) as f64 / (o1 - o0) as f64;
            let (a, b) = (premultiplied(&w[0].color), premultiplied(&w[1].color));
            return quantize(std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t));
        }
    }
    stops[stops.len() - 1].color.to_pixel()
}

/// Raw gradient parameter at a pattern space point.
enum Parametrization {
    Linear {
        p1: PatternPoint,
        d: euclid::Vector2D<f64, crate::geom::PatternSpace>,
        len2: f64,
    },
    Radial {
        c1: PatternPoint,
        r1: f64,
        cdx: f64,
        cdy: f64,
        dr: f64,
        a: f64,
    },
}

impl Parametrization {
    fn new(kind: &PatternKind) -> Option<Self> {
        match kind {
            PatternKind::Linear(g) => {
                let d = g.p2 - g.p1;
                Some(Self::Linear {
                    p1: g.p1,
                    d,
                    len2: d.square_length(),
                })
            }
            PatternKind::Radial(g) => {
                let (cdx, cdy, dr) = (g.c2.x - g.c1.x, g.c2.y - g.c1.y, g.r2 - g.r1);
                Some(Self::Radial {
                    c1: g.c1,
                    r1: g.r1,
                    cdx,
                    cdy,
                    dr,
                    a: cdx * cdx + cdy * cdy - dr * dr,
                })
            }
            _ => None,
        }
    }

    /// Parameter `t` in 16.16, `None` if no circle of a radial gradient
    /// passes through `p`.
    fn factor(&self, p: PatternPoint) -> Option<i64> {
        match *self {
            Self::Linear { p1, d, len2 } => {
                if len2 == 0.0 {
                    return Some(0);
                }
                Some(to_fixed((p - p1).dot(d) / len2))
            }
            Self::Radial {
                c1,
                r1,
                cdx,
                cdy,
                dr,
                a,
            } => {
                let (pdx, pdy) = (p.x - c1.x, p.y - c1.y);
                let b = 2.0 * (pdx * cdx + pdy * cdy + r1 * dr);
                let c = pdx * pdx + pdy * pdy - r1 * r1;
                let radius_ok = |t: f64| r1 + t * dr >= 0.0;
                if a == 0.0 {
                    if b == 0.0 {
                        return None;
                    }
                    let t = c / b;
                    return radius_ok(t).then(|| to_fixed(t));
                }
                let disc = b * b - 4.0 * a * c;
                if disc < 0.0 {
                    return None;
                }
                let sq = disc.sqrt();
                let (t1, t2) = ((b + sq) / (2.0 * a), (b - sq) / (2.0 * a));
                let (hi, lo) = if t1 >= t2 { (t1, t2) } else { (t2, t1) };
                [hi, lo]
                    .into_iter()
                    .find(|t| radius_ok(*t))
                    .map(to_fixed)
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Layout {
    Horizontal,
    Vertical,
    General,
}

fn classify(param: &Parametrization, matrix: &DeviceToPattern, rect: IntRect) -> Layout {
    if matches!(param, Parametrization::Radial { .. }) {
        return Layout::General;
    }
    let at = |x: i32, y: i32| {
        let p = DevicePoint::new(x as f64 + 0.5, y as f64 + 0.5);
        param.factor(matrix.transform_point(p))
    };
    let (l, t, r, b) = (rect.x, rect.y, rect.right() - 1, rect.bottom() - 1);
    let (tl, tr, bl, br) = (at(l, t), at(r, t), at(l, b), at(r, b));
    if tl == bl && tr == br {
        Layout::Horizontal
    } else if tl == tr && bl == br {
        Layout::Vertical
    } else {
        Layout::General
    }
}

fn gradient(pattern: &DevicePattern, stops: &[ColorStop], rect: IntRect) -> Result<Acquired> {
    if stops.len() < 2 {
        return solid(stops.first().map_or(Color::TRANSPARENT, |s| s.color));
    }
    if rect.is_empty() {
        return Err(Error::InvalidSize);
    }
    let Some(param) = Parametrization::new(&pattern.kind) else {
        return Err(Error::PatternTypeMismatch);
    };
    let mut sorted = Vec::new();
    sorted.try_reserve_exact(stops.len())?;
    sorted.extend_from_slice(stops);
    sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));

    let layout = classify(&param, &pattern.matrix, rect);
    let (w, h, extend) = match layout {
        Layout::Horizontal => (rect.width, 1, Extend::Repeat),
        Layout::Vertical => (1, rect.height, Extend::Repeat),
        Layout::General => (rect.width, rect.height, Extend::Pad),
    };
    debug!("rasterize {layout:?} gradient {w}x{h}");

    let mut image = ImageSurface::new(Format::Argb32, w, h)?;
    for y in 0..h {
        for x in 0..w {
            let p = DevicePoint::new(
                (rect.x + x) as f64 + 0.5,
                (rect.y + y) as f64 + 0.5,
            );
            let pixel = param
                .factor(pattern.matrix.transform_point(p))
                .and_then(|f| fold_factor(f, pattern.extend))
                .map_or([0; 4], |f| color_at(&sorted, f));
            image.set_pixel(x, y, pixel);
        }
    }
    Ok(Acquired::owned(
        into_surface(image),
        SurfaceAttributes::placed(extend, -rect.x, -rect.y),
    ))
}

#[cfg(test)]
mod tests;
