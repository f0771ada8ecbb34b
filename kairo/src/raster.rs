//! Trapezoid scan conversion into A8 coverage.

use crate::{
    error::{Error, Result},
    geom::IntRect,
    traps::{Trapezoid, Traps},
};
use tiny_skia::{
    BlendMode, Color, FillRule, Mask, MaskType, Paint, PathBuilder, Pixmap, Transform,
};

/// Antialiasing requested for shape edges.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, strum::Display)]
pub enum Antialias {
    #[default]
    Default,
    None,
    Gray,
    Subpixel,
}

impl Antialias {
    pub fn is_enabled(self) -> bool {
        self != Antialias::None
    }
}

fn add_pixel_rect(pixmap: &mut Pixmap, r: &IntRect) {
    let width = pixmap.width() as usize;
    let data = pixmap.data_mut();
    for y in r.y..r.bottom() {
        let row = y as usize * width;
        for x in r.x..r.right() {
            let px = &mut data[(row + x as usize) * 4..][..4];
            px.fill(255);
        }
    }
}

fn trapezoid_path(t: &Trapezoid, dx: f64, dy: f64) -> Option<tiny_skia::Path> {
    let (top, bottom) = (t.top.to_f64(), t.bottom.to_f64());
    let pt = |x: f64, y: f64| ((x - dx) as f32, (y - dy) as f32);
    let corners = [
        pt(t.left.x_at(top), top),
        pt(t.right.x_at(top), top),
        pt(t.right.x_at(bottom), bottom),
        pt(t.left.x_at(bottom), bottom),
    ];
    let mut pb = PathBuilder::new();
    pb.move_to(corners[0].0, corners[0].1);
    for (x, y) in &corners[1..] {
        pb.line_to(*x, *y);
    }
    pb.close();
    pb.finish()
}

/// Coverage of `traps` clipped to `rect`, as a mask of `rect`'s size whose
/// pixel `(i, j)` is device pixel `(rect.x + i, rect.y + j)`.
///
/// Coverage of overlapping trapezoids adds up and saturates.
pub fn coverage(traps: &Traps, rect: IntRect, antialias: Antialias) -> Result<Mask> {
    if rect.is_empty() {
        return Err(Error::InvalidSize);
    }
    let mut pixmap = Pixmap::new(rect.width as u32, rect.height as u32).ok_or(Error::NoMemory)?;
    let mut paint = Paint::default();
    paint.set_color(Color::WHITE);
    paint.blend_mode = BlendMode::Plus;
    paint.anti_alias = antialias.is_enabled();

    for t in traps.traps() {
        if let Some(r) = t.pixel_rect() {
            let r = r.intersect(&rect).translate(-rect.x, -rect.y);
            if !r.is_empty() {
                add_pixel_rect(&mut pixmap, &r);
            }
            continue;
        }
        if let Some(path) = trapezoid_path(t, rect.x as f64, rect.y as f64) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
    Ok(Mask::from_pixmap(pixmap.as_ref(), MaskType::Alpha))
}
