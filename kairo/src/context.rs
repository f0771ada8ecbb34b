//! Public drawing context.
//!
//! A [`Context`] draws on one target surface. It owns the save stack of
//! [`GState`]s and the current path, which is transformed into device space
//! as it is built. Every operation on a context in error state does nothing
//! and returns that error, the first error raised is recorded.

use crate::{
    error::{Error, Result, Sticky},
    geom::{DevicePoint, IntRect, Matrix, UserBox, UserPoint, UserToDevice, UserToPattern},
    glyph_cache::{Glyph, ScaledFont},
    gstate::{GState, LineCap, LineJoin},
    operator::Operator,
    option::ContextOption,
    pattern::{Pattern, PatternRef},
    raster::Antialias,
    surface::SurfaceRef,
};
use euclid::Vector2D;
use log::info;
use std::{f64::consts::FRAC_PI_2, rc::Rc};
use tiny_skia::FillRule;

mod path;

use path::Path;

#[derive(Debug)]
pub struct Context {
    stack: Vec<GState>,
    path: Path,
    status: Sticky,
}

impl Context {
    pub fn new(target: &SurfaceRef) -> Self {
        Self::with_option(target, &ContextOption::default())
    }

    pub fn with_option(target: &SurfaceRef, option: &ContextOption) -> Self {
        let status = match target.status() {
            Ok(()) => Sticky::new(),
            Err(e) => Sticky::with_error(e),
        };
        Self {
            stack: vec![GState::new(target, option)],
            path: Path::default(),
            status,
        }
    }

    pub fn status(&self) -> Result<()> {
        self.status.check()
    }

    /// Record the error of `r`, `Unsupported` never leaves the context.
    fn record<T>(&self, r: Result<T>) -> Result<T> {
        r.map_err(|e| {
            debug_assert_ne!(e, Error::Unsupported, "unsupported operation escaped dispatch");
            if e == Error::Unsupported {
                self.status.set(Error::SurfaceTypeMismatch)
            } else {
                self.status.set(e)
            }
        })
    }

    fn gstate(&self) -> &GState {
        &self.stack[self.stack.len() - 1]
    }

    fn gstate_mut(&mut self) -> &mut GState {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Check the status, then run `f` on the current graphics state.
    fn update(&mut self, f: impl FnOnce(&mut GState) -> Result<()>) -> Result<()> {
        self.status.check()?;
        let r = f(self.gstate_mut());
        self.record(r)
    }

    fn set(&mut self, f: impl FnOnce(&mut GState)) -> Result<()> {
        self.update(|gs| {
            f(gs);
            Ok(())
        })
    }

    pub fn target(&self) -> &SurfaceRef {
        self.gstate().target()
    }

    pub fn save(&mut self) -> Result<()> {
        self.status.check()?;
        let r = self.gstate().try_clone().and_then(|gs| {
            self.stack.try_reserve(1)?;
            self.stack.push(gs);
            Ok(())
        });
        self.record(r)
    }

    pub fn restore(&mut self) -> Result<()> {
        self.status.check()?;
        if self.stack.len() <= 1 {
            info!("restore without matching save");
            return self.record(Err(Error::InvalidRestore));
        }
        self.stack.pop();
        Ok(())
    }

    pub fn operator(&self) -> Operator {
        self.gstate().operator()
    }

    pub fn set_operator(&mut self, op: Operator) -> Result<()> {
        self.set(|gs| gs.set_operator(op))
    }

    pub fn source(&self) -> PatternRef {
        Rc::clone(self.gstate().source())
    }

    /// Use `source` for drawing, it is shared and must not be in error.
    pub fn set_source(&mut self, source: &PatternRef) -> Result<()> {
        self.update(|gs| {
            source.status()?;
            gs.set_source(Rc::clone(source));
            Ok(())
        })
    }

    pub fn set_source_rgb(&mut self, red: f64, green: f64, blue: f64) -> Result<()> {
        self.set_source(&Rc::new(Pattern::rgb(red, green, blue)))
    }

    pub fn set_source_rgba(&mut self, red: f64, green: f64, blue: f64, alpha: f64) -> Result<()> {
        self.set_source(&Rc::new(Pattern::rgba(red, green, blue, alpha)))
    }

    /// Draw from `surface` with its origin at user space `(x, y)`.
    pub fn set_source_surface(&mut self, surface: &SurfaceRef, x: f64, y: f64) -> Result<()> {
        self.status.check()?;
        let mut pattern = Pattern::for_surface(surface);
        let r = pattern.set_matrix(UserToPattern::translation(-x, -y));
        self.record(r)?;
        self.set_source(&Rc::new(pattern))
    }

    pub fn tolerance(&self) -> f64 {
        self.gstate().tolerance()
    }

    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<()> {
        self.set(|gs| gs.set_tolerance(tolerance))
    }

    pub fn antialias(&self) -> Antialias {
        self.gstate().antialias()
    }

    pub fn set_antialias(&mut self, antialias: Antialias) -> Result<()> {
        self.set(|gs| gs.set_antialias(antialias))
    }

    pub fn fill_rule(&self) -> FillRule {
        self.gstate().fill_rule()
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) -> Result<()> {
        self.set(|gs| gs.set_fill_rule(rule))
    }

    pub fn line_width(&self) -> f64 {
        self.gstate().line_width()
    }

    pub fn set_line_width(&mut self, width: f64) -> Result<()> {
        self.set(|gs| gs.set_line_width(width))
    }

    pub fn line_cap(&self) -> LineCap {
        self.gstate().line_cap()
    }

    pub fn set_line_cap(&mut self, cap: LineCap) -> Result<()> {
        self.set(|gs| gs.set_line_cap(cap))
    }

    pub fn line_join(&self) -> LineJoin {
        self.gstate().line_join()
    }

    pub fn set_line_join(&mut self, join: LineJoin) -> Result<()> {
        self.set(|gs| gs.set_line_join(join))
    }

    pub fn miter_limit(&self) -> f64 {
        self.gstate().miter_limit()
    }

    pub fn set_miter_limit(&mut self, limit: f64) -> Result<()> {
        self.set(|gs| gs.set_miter_limit(limit))
    }

    pub fn dash(&self) -> (&[f64], f64) {
        self.gstate().dash()
    }

    pub fn set_dash(&mut self, dash: &[f64], offset: f64) -> Result<()> {
        self.update(|gs| gs.set_dash(dash, offset))
    }

    pub fn scaled_font(&self) -> Option<Rc<dyn ScaledFont>> {
        self.gstate().font().cloned()
    }

    pub fn set_scaled_font(&mut self, font: Rc<dyn ScaledFont>) -> Result<()> {
        self.set(|gs| gs.set_font(font))
    }

    pub fn translate(&mut self, tx: f64, ty: f64) -> Result<()> {
        self.update(|gs| gs.translate(tx, ty))
    }

    pub fn scale(&mut self, sx: f64, sy: f64) -> Result<()> {
        self.update(|gs| gs.scale(sx, sy))
    }

    pub fn rotate(&mut self, radians: f64) -> Result<()> {
        self.update(|gs| gs.rotate(radians))
    }

    pub fn transform(&mut self, m: &Matrix) -> Result<()> {
        self.update(|gs| gs.transform(m))
    }

    pub fn set_matrix(&mut self, m: &UserToDevice) -> Result<()> {
        self.update(|gs| gs.set_matrix(m))
    }

    pub fn identity_matrix(&mut self) -> Result<()> {
        self.set(GState::identity_matrix)
    }

    pub fn matrix(&self) -> UserToDevice {
        *self.gstate().matrix()
    }

    pub fn user_to_device(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.gstate().matrix().transform_point(UserPoint::new(x, y));
        (p.x, p.y)
    }

    pub fn user_to_device_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        let v = self.gstate().matrix().transform_vector(Vector2D::new(dx, dy));
        (v.x, v.y)
    }

    pub fn device_to_user(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self
            .gstate()
            .inverse_matrix()
            .transform_point(DevicePoint::new(x, y));
        (p.x, p.y)
    }

    pub fn device_to_user_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        let v = self
            .gstate()
            .inverse_matrix()
            .transform_vector(Vector2D::new(dx, dy));
        (v.x, v.y)
    }

    /// User space point to the device space of the path.
    fn to_path_space(&self, x: f64, y: f64) -> DevicePoint {
        self.gstate()
            .device_matrix()
            .transform_point(UserPoint::new(x, y))
    }

    fn path_op(
        &mut self,
        f: impl FnOnce(&Self) -> Result<DevicePoint>,
        op: impl FnOnce(&mut Path, DevicePoint),
    ) -> Result<()> {
        self.status.check()?;
        let r = f(self);
        let p = self.record(r)?;
        op(&mut self.path, p);
        Ok(())
    }

    pub fn new_path(&mut self) -> Result<()> {
        self.status.check()?;
        self.path.reset();
        Ok(())
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.path_op(|c| Ok(c.to_path_space(x, y)), Path::move_to)
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.path_op(|c| Ok(c.to_path_space(x, y)), Path::line_to)
    }

    pub fn curve_to(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    ) -> Result<()> {
        self.status.check()?;
        let (p1, p2, p3) = (
            self.to_path_space(x1, y1),
            self.to_path_space(x2, y2),
            self.to_path_space(x3, y3),
        );
        self.path.curve_to(p1, p2, p3);
        Ok(())
    }

    /// Device space point displaced from the current point by the user
    /// space distance `(dx, dy)`.
    fn relative(&self, dx: f64, dy: f64) -> Result<DevicePoint> {
        let cur = self.path.current_point().ok_or(Error::NoCurrentPoint)?;
        Ok(cur + self.gstate().matrix().transform_vector(Vector2D::new(dx, dy)))
    }

    pub fn rel_move_to(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.path_op(|c| c.relative(dx, dy), Path::move_to)
    }

    pub fn rel_line_to(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.path_op(|c| c.relative(dx, dy), Path::line_to)
    }

    pub fn rel_curve_to(
        &mut self,
        dx1: f64,
        dy1: f64,
        dx2: f64,
        dy2: f64,
        dx3: f64,
        dy3: f64,
    ) -> Result<()> {
        self.status.check()?;
        let r = self.relative(dx1, dy1).and_then(|p1| {
            Ok((p1, self.relative(dx2, dy2)?, self.relative(dx3, dy3)?))
        });
        let (p1, p2, p3) = self.record(r)?;
        self.path.curve_to(p1, p2, p3);
        Ok(())
    }

    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        self.move_to(x, y)?;
        self.rel_line_to(width, 0.0)?;
        self.rel_line_to(0.0, height)?;
        self.rel_line_to(-width, 0.0)?;
        self.close_path()
    }

    /// Circular arc around `(xc, yc)` from `angle1` to `angle2`, increasing
    /// angles. A line joins the current point to the start of the arc.
    pub fn arc(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) -> Result<()> {
        self.status.check()?;
        let mut end = angle2;
        while end < angle1 {
            end += 2.0 * std::f64::consts::PI;
        }
        let at = |a: f64| (xc + radius * a.cos(), yc + radius * a.sin());

        let (sx, sy) = at(angle1);
        self.line_to(sx, sy)?;
        if radius <= 0.0 || end == angle1 {
            return Ok(());
        }

        let segments = ((end - angle1) / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = (end - angle1) / segments as f64;
        let h = 4.0 / 3.0 * (step / 4.0).tan();
        let mut a = angle1;
        for _ in 0..segments {
            let b = a + step;
            let (x0, y0) = at(a);
            let (x3, y3) = at(b);
            self.curve_to(
                x0 - h * radius * a.sin(),
                y0 + h * radius * a.cos(),
                x3 + h * radius * b.sin(),
                y3 - h * radius * b.cos(),
                x3,
                y3,
            )?;
            a = b;
        }
        Ok(())
    }

    pub fn close_path(&mut self) -> Result<()> {
        self.status.check()?;
        self.path.close_path();
        Ok(())
    }

    /// Current point in user space.
    pub fn current_point(&self) -> Option<(f64, f64)> {
        self.path.current_point().map(|p| {
            let u = self.gstate().device_inverse().transform_point(p);
            (u.x, u.y)
        })
    }

    pub fn paint(&mut self) -> Result<()> {
        self.status.check()?;
        let r = self.gstate().paint();
        self.record(r)
    }

    pub fn paint_with_alpha(&mut self, alpha: f64) -> Result<()> {
        self.status.check()?;
        let r = self.gstate().paint_with_alpha(alpha);
        self.record(r)
    }

    /// Draw the source with the alpha channel of `pattern` as coverage.
    pub fn mask(&mut self, pattern: &Pattern) -> Result<()> {
        self.status.check()?;
        let r = self.gstate().mask(pattern);
        self.record(r)
    }

    /// Like [`mask`](Self::mask) with `surface` placed at user space `(x, y)`.
    pub fn mask_surface(&mut self, surface: &SurfaceRef, x: f64, y: f64) -> Result<()> {
        self.status.check()?;
        let mut pattern = Pattern::for_surface(surface);
        let r = pattern.set_matrix(UserToPattern::translation(-x, -y));
        self.record(r)?;
        self.mask(&pattern)
    }

    fn draw_path(
        &mut self,
        f: impl FnOnce(&GState, &tiny_skia::Path) -> Result<()>,
    ) -> Result<()> {
        self.status.check()?;
        let gs = &self.stack[self.stack.len() - 1];
        let Some(path) = self.path.finish() else {
            return Ok(());
        };
        let r = f(gs, path);
        self.record(r)
    }

    pub fn fill_preserve(&mut self) -> Result<()> {
        self.draw_path(GState::fill)
    }

    pub fn fill(&mut self) -> Result<()> {
        self.fill_preserve()?;
        self.path.reset();
        Ok(())
    }

    pub fn stroke_preserve(&mut self) -> Result<()> {
        self.draw_path(GState::stroke)
    }

    pub fn stroke(&mut self) -> Result<()> {
        self.stroke_preserve()?;
        self.path.reset();
        Ok(())
    }

    pub fn in_fill(&mut self, x: f64, y: f64) -> Result<bool> {
        self.status.check()?;
        let gs = &self.stack[self.stack.len() - 1];
        Ok(self.path.finish().is_some_and(|p| gs.in_fill(p, x, y)))
    }

    pub fn in_stroke(&mut self, x: f64, y: f64) -> Result<bool> {
        self.status.check()?;
        let gs = &self.stack[self.stack.len() - 1];
        let r = match self.path.finish() {
            Some(p) => gs.in_stroke(p, x, y),
            None => Ok(false),
        };
        self.record(r)
    }

    /// User space bounds of the area `fill` would cover.
    pub fn fill_extents(&mut self) -> Result<UserBox> {
        self.status.check()?;
        let gs = &self.stack[self.stack.len() - 1];
        Ok(self
            .path
            .finish()
            .map_or_else(UserBox::zero, |p| gs.fill_extents(p)))
    }

    pub fn stroke_extents(&mut self) -> Result<UserBox> {
        self.status.check()?;
        let gs = &self.stack[self.stack.len() - 1];
        let r = match self.path.finish() {
            Some(p) => gs.stroke_extents(p),
            None => Ok(UserBox::zero()),
        };
        self.record(r)
    }

    pub fn clip_preserve(&mut self) -> Result<()> {
        self.status.check()?;
        let last = self.stack.len() - 1;
        let gs = &mut self.stack[last];
        let r = gs.clip(self.path.finish());
        self.record(r)
    }

    pub fn clip(&mut self) -> Result<()> {
        self.clip_preserve()?;
        self.path.reset();
        Ok(())
    }

    pub fn reset_clip(&mut self) -> Result<()> {
        self.set(GState::reset_clip)
    }

    /// User space bounds of the visible area.
    pub fn clip_extents(&self) -> Result<UserBox> {
        self.status.check()?;
        Ok(self.gstate().clip_extents())
    }

    pub fn device_clip_extents(&self) -> Result<IntRect> {
        self.status.check()?;
        Ok(self.gstate().device_clip_extents())
    }

    /// Draw `glyphs` with the current scaled font, `NullPointer` without
    /// one.
    pub fn show_glyphs(&mut self, glyphs: &[Glyph]) -> Result<()> {
        self.status.check()?;
        let r = self.gstate().show_glyphs(glyphs);
        self.record(r)
    }

    pub fn copy_page(&mut self) -> Result<()> {
        self.status.check()?;
        let r = self.gstate().copy_page();
        self.record(r)
    }

    pub fn show_page(&mut self) -> Result<()> {
        self.status.check()?;
        let r = self.gstate().show_page();
        self.record(r)
    }
}
