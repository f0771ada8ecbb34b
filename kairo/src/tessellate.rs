//! Conversion of device-space paths into trapezoids.
//!
//! Curves are flattened to within `tolerance` device pixels, then a sweep over
//! every vertex and edge crossing height builds one trapezoid per covered span
//! of each horizontal band. Stroke outlines come from the tiny-skia stroker and
//! are filled with the non-zero rule.

use crate::{
    error::{Error, Result},
    geom::{Fixed, IntoSkia, UserToDevice},
    traps::{LineFixed, PointFixed, Traps},
};
use log::debug;
use tiny_skia::{FillRule, Path, PathSegment, PathStroker, Point, Stroke};

const MAX_CURVE_SEGMENTS: usize = 256;

/// Flattened geometry is clipped to this many device pixels around the
/// origin, so trapezoid coordinates stay well inside 16.16 fixed point even
/// after translation by an in-range offset.
const COORD_LIMIT: f32 = 16_000.0;

#[derive(Clone, Copy, Debug)]
struct Edge {
    line: LineFixed,
    // +1 if the original segment went down, -1 if up
    dir: i32,
}

impl Edge {
    fn new(a: PointFixed, b: PointFixed) -> Option<Self> {
        match a.y.cmp(&b.y) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some(Self {
                line: LineFixed::new(a, b),
                dir: 1,
            }),
            std::cmp::Ordering::Greater => Some(Self {
                line: LineFixed::new(b, a),
                dir: -1,
            }),
        }
    }

    fn top(&self) -> Fixed {
        self.line.p1.y
    }

    fn bottom(&self) -> Fixed {
        self.line.p2.y
    }
}

fn curve_segments(control_deviation: f32, tolerance: f64) -> usize {
    let n = (control_deviation as f64 / (4.0 * tolerance.max(1e-6))).sqrt().ceil();
    (n as usize).clamp(1, MAX_CURVE_SEGMENTS)
}

fn lerp(a: Point, b: Point, t: f32) -> Point {
    Point::from_xy(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

fn deviation(a: Point, b: Point, c: Point) -> f32 {
    (a.x - 2.0 * b.x + c.x).hypot(a.y - 2.0 * b.y + c.y)
}

/// Flatten `path` into closed polygons.
fn flatten(path: &Path, tolerance: f64) -> Vec<Vec<Point>> {
    let mut polygons = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut last = Point::zero();
    for seg in path.segments() {
        match seg {
            PathSegment::MoveTo(p) => {
                if current.len() > 1 {
                    polygons.push(std::mem::take(&mut current));
                }
                current.clear();
                current.push(p);
                last = p;
            }
            PathSegment::LineTo(p) => {
                current.push(p);
                last = p;
            }
            PathSegment::QuadTo(p1, p2) => {
                let n = curve_segments(deviation(last, p1, p2), tolerance);
                for i in 1..=n {
                    let t = i as f32 / n as f32;
                    current.push(lerp(lerp(last, p1, t), lerp(p1, p2, t), t));
                }
                last = p2;
            }
            PathSegment::CubicTo(p1, p2, p3) => {
                let d = deviation(last, p1, p2).max(deviation(p1, p2, p3)) * 1.5;
                let n = curve_segments(d, tolerance);
                for i in 1..=n {
                    let t = i as f32 / n as f32;
                    let (a, b, c) = (lerp(last, p1, t), lerp(p1, p2, t), lerp(p2, p3, t));
                    current.push(lerp(lerp(a, b, t), lerp(b, c, t), t));
                }
                last = p3;
            }
            PathSegment::Close => {
                if current.len() > 1 {
                    let start = current[0];
                    polygons.push(std::mem::take(&mut current));
                    current.push(start);
                    last = start;
                }
            }
        }
    }
    if current.len() > 1 {
        polygons.push(current);
    }
    polygons
}

/// Clip the implicitly closed polygon `poly` to the `COORD_LIMIT` square.
fn clip_polygon(poly: Vec<Point>) -> Vec<Point> {
    let in_range = |p: &Point| p.x.abs() <= COORD_LIMIT && p.y.abs() <= COORD_LIMIT;
    if poly.iter().all(in_range) {
        return poly;
    }
    let mut poly = poly;
    for (along_x, limit) in [
        (true, COORD_LIMIT),
        (true, -COORD_LIMIT),
        (false, COORD_LIMIT),
        (false, -COORD_LIMIT),
    ] {
        if poly.len() < 2 {
            return Vec::new();
        }
        // positive on the kept side of the line `coord == limit`
        let distance = |p: &Point| (limit - if along_x { p.x } else { p.y }) * limit.signum();
        let mut clipped = Vec::with_capacity(poly.len() + 2);
        let mut a = poly[poly.len() - 1];
        for &b in &poly {
            let (da, db) = (distance(&a), distance(&b));
            if (da >= 0.0) != (db >= 0.0) {
                let mut p = lerp(a, b, da / (da - db));
                if along_x {
                    p.x = limit;
                } else {
                    p.y = limit;
                }
                clipped.push(p);
            }
            if db >= 0.0 {
                clipped.push(b);
            }
            a = b;
        }
        poly = clipped;
    }
    poly
}

fn collect_edges(polygons: &[Vec<Point>]) -> Vec<Edge> {
    let to_fixed = |p: &Point| PointFixed::from_f64(p.x as f64, p.y as f64);
    let mut edges = Vec::new();
    for poly in polygons {
        // fill closes every sub path implicitly
        let closing = [poly[poly.len() - 1], poly[0]];
        edges.extend(
            poly.windows(2)
                .chain(std::iter::once(&closing[..]))
                .filter_map(|w| Edge::new(to_fixed(&w[0]), to_fixed(&w[1]))),
        );
    }
    edges
}

/// Height at which two edges cross strictly inside both their y ranges.
fn crossing(a: &Edge, b: &Edge) -> Option<Fixed> {
    let top = a.top().max(b.top());
    let bottom = a.bottom().min(b.bottom());
    if top >= bottom {
        return None;
    }
    let (t, bt) = (top.to_f64(), bottom.to_f64());
    let d_top = a.line.x_at(t) - b.line.x_at(t);
    let d_bottom = a.line.x_at(bt) - b.line.x_at(bt);
    if d_top.signum() == d_bottom.signum() || d_top == 0.0 || d_bottom == 0.0 {
        return None;
    }
    let y = t + (bt - t) * d_top / (d_top - d_bottom);
    Some(Fixed::from_f64(y)).filter(|y| *y > top && *y < bottom)
}

fn is_inside(winding: i32, rule: FillRule) -> bool {
    match rule {
        FillRule::Winding => winding != 0,
        FillRule::EvenOdd => winding % 2 != 0,
    }
}

/// Trapezoids covering the interior of `path` under `rule`.
pub fn fill(path: &Path, rule: FillRule, tolerance: f64) -> Traps {
    let polygons: Vec<_> = flatten(path, tolerance)
        .into_iter()
        .map(clip_polygon)
        .filter(|poly| poly.len() > 1)
        .collect();
    let edges = collect_edges(&polygons);
    let mut traps = Traps::new();
    if edges.len() < 2 {
        return traps;
    }

    let mut ys: Vec<Fixed> = edges.iter().flat_map(|e| [e.top(), e.bottom()]).collect();
    for (i, a) in edges.iter().enumerate() {
        ys.extend(edges[i + 1..].iter().filter_map(|b| crossing(a, b)));
    }
    ys.sort_unstable();
    ys.dedup();

    let mut active: Vec<(f64, &Edge)> = Vec::new();
    for band in ys.windows(2) {
        let (top, bottom) = (band[0], band[1]);
        let mid = (top.to_f64() + bottom.to_f64()) / 2.0;
        active.clear();
        active.extend(
            edges
                .iter()
                .filter(|e| e.top() <= top && e.bottom() >= bottom)
                .map(|e| (e.line.x_at(mid), e)),
        );
        active.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        let mut left: Option<&Edge> = None;
        for (_, edge) in &active {
            let was_inside = is_inside(winding, rule);
            winding += edge.dir;
            match (was_inside, is_inside(winding, rule)) {
                (false, true) => left = Some(edge),
                (true, false) => {
                    if let Some(l) = left.take() {
                        traps.push(top, bottom, l.line, edge.line);
                    }
                }
                _ => {}
            }
        }
    }
    debug!(
        "tessellated {} edges into {} trapezoids",
        edges.len(),
        traps.len()
    );
    traps
}

/// Trapezoids covering the stroke of the device-space `path`.
///
/// The pen is applied in user space, so non-uniform `ctm` scaling distorts
/// the stroke the same way it distorts the path.
pub fn stroke(path: &Path, pen: &Stroke, ctm: &UserToDevice, tolerance: f64) -> Result<Traps> {
    let to_device = ctm.into_skia();
    let to_user = to_device.invert().ok_or(Error::InvalidMatrix)?;
    let Some(user_path) = path.clone().transform(to_user) else {
        return Ok(Traps::new());
    };
    let res_scale = PathStroker::compute_resolution_scale(&to_device);
    let dashed = match &pen.dash {
        Some(dash) => user_path.dash(dash, res_scale),
        None => Some(user_path),
    };
    let outline = dashed
        .and_then(|p| p.stroke(pen, res_scale))
        .and_then(|p| p.transform(to_device));
    Ok(outline.map_or_else(Traps::new, |p| fill(&p, FillRule::Winding, tolerance)))
}

#[cfg(test)]
mod tests;
