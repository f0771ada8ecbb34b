//! Graphics state: drawing attributes, transformation, clip, source and
//! target of a context.

use crate::{
    clip::Clip,
    color::Color,
    compositor::{clip_and_composite, Shape},
    error::{Error, Result},
    geom::{
        check_invertible, DeviceBox, DeviceToUser, IntRect, IntoSkia, Matrix, UserBox, UserPoint,
        UserToDevice, UserVector,
    },
    glyph_cache::{Glyph, GlyphCache, ScaledFont},
    operator::Operator,
    option::ContextOption,
    pattern::{DevicePattern, Pattern, PatternRef},
    raster::Antialias,
    surface::SurfaceRef,
    tessellate,
    traps::Traps,
};
use euclid::{Angle, Transform2D};
use log::debug;
use std::rc::Rc;
use tiny_skia::{FillRule, Path, PathBuilder, PathSegment, Stroke, StrokeDash};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, strum::Display)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl IntoSkia for LineCap {
    type Output = tiny_skia::LineCap;

    fn into_skia(self) -> Self::Output {
        match self {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, strum::Display)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl IntoSkia for LineJoin {
    type Output = tiny_skia::LineJoin;

    fn into_skia(self) -> Self::Output {
        match self {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        }
    }
}

/// Append every segment of `path` to `pb`.
pub(crate) fn append_path(pb: &mut PathBuilder, path: &Path) {
    for seg in path.segments() {
        match seg {
            PathSegment::MoveTo(p) => pb.move_to(p.x, p.y),
            PathSegment::LineTo(p) => pb.line_to(p.x, p.y),
            PathSegment::QuadTo(p1, p) => pb.quad_to(p1.x, p1.y, p.x, p.y),
            PathSegment::CubicTo(p1, p2, p) => pb.cubic_to(p1.x, p1.y, p2.x, p2.y, p.x, p.y),
            PathSegment::Close => pb.close(),
        }
    }
}

#[derive(Debug)]
pub struct GState {
    op: Operator,
    tolerance: f64,
    antialias: Antialias,
    fill_rule: FillRule,
    line_width: f64,
    line_cap: LineCap,
    line_join: LineJoin,
    miter_limit: f64,
    dash: Vec<f64>,
    dash_offset: f64,
    /// Pen derived from the stroke attributes above.
    pen: Stroke,
    font: Option<Rc<dyn ScaledFont>>,
    clip: Clip,
    ctm: UserToDevice,
    ctm_inverse: DeviceToUser,
    source: PatternRef,
    target: SurfaceRef,
}

impl GState {
    pub fn new(target: &SurfaceRef, option: &ContextOption) -> Self {
        let mut r = Self {
            op: option.operator,
            tolerance: option.tolerance,
            antialias: option.antialias,
            fill_rule: option.fill_rule,
            line_width: option.line_width,
            line_cap: option.line_cap,
            line_join: option.line_join,
            miter_limit: option.miter_limit,
            dash: Vec::new(),
            dash_offset: 0.0,
            pen: Stroke::default(),
            font: None,
            clip: Clip::new(target),
            ctm: Transform2D::identity(),
            ctm_inverse: Transform2D::identity(),
            source: Rc::new(Pattern::solid(Color::BLACK)),
            target: Rc::clone(target),
        };
        r.update_pen();
        r
    }

    /// Copy for the save stack. Owned sub state is duplicated, surfaces,
    /// patterns, fonts and the clip path chain are shared.
    pub fn try_clone(&self) -> Result<Self> {
        let mut dash = Vec::new();
        dash.try_reserve_exact(self.dash.len())?;
        dash.extend_from_slice(&self.dash);
        Ok(Self {
            op: self.op,
            tolerance: self.tolerance,
            antialias: self.antialias,
            fill_rule: self.fill_rule,
            line_width: self.line_width,
            line_cap: self.line_cap,
            line_join: self.line_join,
            miter_limit: self.miter_limit,
            dash,
            dash_offset: self.dash_offset,
            pen: self.pen.clone(),
            font: self.font.clone(),
            clip: self.clip.try_clone()?,
            ctm: self.ctm,
            ctm_inverse: self.ctm_inverse,
            source: Rc::clone(&self.source),
            target: Rc::clone(&self.target),
        })
    }

    fn update_pen(&mut self) {
        let dash = match self.dash.len() {
            0 => None,
            n => {
                // odd arrays repeat once to alternate on and off
                let cycle = self.dash.iter().cycle().take(if n % 2 == 1 { n * 2 } else { n });
                StrokeDash::new(cycle.map(|v| *v as f32).collect(), self.dash_offset as f32)
            }
        };
        self.pen = Stroke {
            width: self.line_width as f32,
            miter_limit: self.miter_limit as f32,
            line_cap: self.line_cap.into_skia(),
            line_join: self.line_join.into_skia(),
            dash,
        };
    }

    pub fn target(&self) -> &SurfaceRef {
        &self.target
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn set_operator(&mut self, op: Operator) {
        self.op = op;
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    pub fn antialias(&self) -> Antialias {
        self.antialias
    }

    pub fn set_antialias(&mut self, antialias: Antialias) {
        self.antialias = antialias;
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) {
        self.fill_rule = rule;
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
        self.update_pen();
    }

    pub fn line_cap(&self) -> LineCap {
        self.line_cap
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.line_cap = cap;
        self.update_pen();
    }

    pub fn line_join(&self) -> LineJoin {
        self.line_join
    }

    pub fn set_line_join(&mut self, join: LineJoin) {
        self.line_join = join;
        self.update_pen();
    }

    pub fn miter_limit(&self) -> f64 {
        self.miter_limit
    }

    pub fn set_miter_limit(&mut self, limit: f64) {
        self.miter_limit = limit;
        self.update_pen();
    }

    pub fn dash(&self) -> (&[f64], f64) {
        (&self.dash, self.dash_offset)
    }

    /// An empty `dash` turns dashing off. Negative lengths or an all zero
    /// array fail with `InvalidDash`.
    pub fn set_dash(&mut self, dash: &[f64], offset: f64) -> Result<()> {
        if dash.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::InvalidDash);
        }
        if !dash.is_empty() && dash.iter().all(|v| *v == 0.0) {
            return Err(Error::InvalidDash);
        }
        let mut copy = Vec::new();
        copy.try_reserve_exact(dash.len())?;
        copy.extend_from_slice(dash);
        self.dash = copy;
        self.dash_offset = offset;
        self.update_pen();
        Ok(())
    }

    pub fn pen(&self) -> &Stroke {
        &self.pen
    }

    pub fn font(&self) -> Option<&Rc<dyn ScaledFont>> {
        self.font.as_ref()
    }

    pub fn set_font(&mut self, font: Rc<dyn ScaledFont>) {
        self.font = Some(font);
    }

    pub fn source(&self) -> &PatternRef {
        &self.source
    }

    pub fn set_source(&mut self, source: PatternRef) {
        self.source = source;
    }

    pub fn clip_descriptor(&self) -> &Clip {
        &self.clip
    }

    pub fn matrix(&self) -> &UserToDevice {
        &self.ctm
    }

    pub fn inverse_matrix(&self) -> &DeviceToUser {
        &self.ctm_inverse
    }

    fn set_ctm(&mut self, ctm: UserToDevice) -> Result<()> {
        check_invertible(&ctm)?;
        let inverse = ctm.inverse().ok_or(Error::InvalidMatrix)?;
        self.ctm = ctm;
        self.ctm_inverse = inverse;
        Ok(())
    }

    /// Prepend `m` to the CTM, it must be invertible.
    pub fn transform(&mut self, m: &Matrix) -> Result<()> {
        check_invertible(m)?;
        self.set_ctm(m.then(&self.ctm))
    }

    pub fn translate(&mut self, tx: f64, ty: f64) -> Result<()> {
        self.transform(&Matrix::translation(tx, ty))
    }

    pub fn scale(&mut self, sx: f64, sy: f64) -> Result<()> {
        if sx * sy == 0.0 {
            return Err(Error::InvalidMatrix);
        }
        self.transform(&Matrix::scale(sx, sy))
    }

    pub fn rotate(&mut self, radians: f64) -> Result<()> {
        self.transform(&Matrix::rotation(Angle::radians(radians)))
    }

    pub fn set_matrix(&mut self, m: &UserToDevice) -> Result<()> {
        self.set_ctm(*m)
    }

    pub fn identity_matrix(&mut self) {
        self.ctm = Transform2D::identity();
        self.ctm_inverse = Transform2D::identity();
    }

    /// User space to the pixel grid of the target, the CTM followed by the
    /// target's device offset.
    pub fn device_matrix(&self) -> UserToDevice {
        self.ctm.then_translate(self.target.device_offset())
    }

    pub fn device_inverse(&self) -> DeviceToUser {
        Transform2D::translation(-self.target.device_offset().x, -self.target.device_offset().y)
            .then(&self.ctm_inverse)
    }

    fn device_source(&self) -> Result<DevicePattern> {
        DevicePattern::resolve(&self.source, &self.device_inverse())
    }

    fn composite_traps(&self, traps: &Traps) -> Result<()> {
        let src = self.device_source()?;
        clip_and_composite(
            &self.clip,
            self.op,
            &src,
            Shape::Traps(traps),
            &self.target,
            self.antialias,
        )
    }

    fn composite_mask(&self, mask: &DevicePattern) -> Result<()> {
        let src = self.device_source()?;
        clip_and_composite(
            &self.clip,
            self.op,
            &src,
            Shape::Mask(mask),
            &self.target,
            self.antialias,
        )
    }

    /// Draw the source everywhere inside the clip.
    pub fn paint(&self) -> Result<()> {
        match self.target.extents() {
            Some(_) => {
                let extents = self.clip.extents(&self.target);
                if extents.is_empty() {
                    return Ok(());
                }
                self.composite_traps(&Traps::from_rect(extents))
            }
            None => self.composite_mask(&DevicePattern::solid(Color::WHITE)),
        }
    }

    pub fn paint_with_alpha(&self, alpha: f64) -> Result<()> {
        if alpha >= 1.0 {
            return self.paint();
        }
        self.composite_mask(&DevicePattern::solid(Color::new(0.0, 0.0, 0.0, alpha)))
    }

    /// Draw the source using the alpha of `mask` as coverage.
    pub fn mask(&self, mask: &Pattern) -> Result<()> {
        let mask = DevicePattern::resolve(mask, &self.device_inverse())?;
        self.composite_mask(&mask)
    }

    /// Fill the device space `path`.
    pub fn fill(&self, path: &Path) -> Result<()> {
        let src = self.device_source()?;
        if self.clip.mask().is_none() && !self.clip.is_all_clipped() {
            self.clip.apply(&self.target)?;
            match self.target.fill_path(
                self.op,
                &src,
                path,
                self.fill_rule,
                self.tolerance,
                self.antialias,
            ) {
                Err(Error::Unsupported) => {}
                r => return r,
            }
        }
        let traps = tessellate::fill(path, self.fill_rule, self.tolerance);
        self.composite_traps(&traps)
    }

    pub fn stroke(&self, path: &Path) -> Result<()> {
        let traps = tessellate::stroke(path, &self.pen, &self.device_matrix(), self.tolerance)?;
        self.composite_traps(&traps)
    }

    fn user_point_to_device(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.device_matrix().transform_point(UserPoint::new(x, y));
        (p.x, p.y)
    }

    pub fn in_fill(&self, path: &Path, x: f64, y: f64) -> bool {
        let (dx, dy) = self.user_point_to_device(x, y);
        tessellate::fill(path, self.fill_rule, self.tolerance).contains(dx, dy)
    }

    pub fn in_stroke(&self, path: &Path, x: f64, y: f64) -> Result<bool> {
        let (dx, dy) = self.user_point_to_device(x, y);
        let traps = tessellate::stroke(path, &self.pen, &self.device_matrix(), self.tolerance)?;
        Ok(traps.contains(dx, dy))
    }

    fn to_user_box(&self, b: Option<DeviceBox>) -> UserBox {
        b.map_or_else(UserBox::zero, |b| self.device_inverse().outer_transformed_box(&b))
    }

    pub fn fill_extents(&self, path: &Path) -> UserBox {
        let traps = tessellate::fill(path, self.fill_rule, self.tolerance);
        self.to_user_box(traps.extents_box())
    }

    pub fn stroke_extents(&self, path: &Path) -> Result<UserBox> {
        let traps = tessellate::stroke(path, &self.pen, &self.device_matrix(), self.tolerance)?;
        Ok(self.to_user_box(traps.extents_box()))
    }

    /// Intersect the clip with `path`, `None` for an empty path which
    /// leaves nothing visible.
    pub fn clip(&mut self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => self.clip.intersect_path(
                &self.target,
                path,
                self.fill_rule,
                self.tolerance,
                self.antialias,
            ),
            None => {
                self.clip.clip_all(&self.target);
                Ok(())
            }
        }
    }

    pub fn reset_clip(&mut self) {
        self.clip.reset();
    }

    pub fn device_clip_extents(&self) -> IntRect {
        self.clip.extents(&self.target)
    }

    pub fn clip_extents(&self) -> UserBox {
        let e = self.device_clip_extents();
        if e.is_empty() {
            return UserBox::zero();
        }
        self.to_user_box(Some(e.to_box()))
    }

    /// Outline of `glyphs` in device space, `None` if every glyph is blank.
    fn glyph_path(&self, glyphs: &[Glyph], font: &dyn ScaledFont) -> Option<Path> {
        let cache = GlyphCache::global();
        let device = self.device_matrix();
        let mut pb = PathBuilder::new();
        for g in glyphs {
            let Some(outline) = cache.outline(font, g.index) else {
                continue;
            };
            let m = font
                .font_matrix()
                .then_translate(UserVector::new(g.x, g.y))
                .then(&device);
            if let Some(p) = outline.as_ref().clone().transform(m.into_skia()) {
                append_path(&mut pb, &p);
            }
        }
        pb.finish()
    }

    pub fn show_glyphs(&self, glyphs: &[Glyph]) -> Result<()> {
        let font = self.font.as_deref().ok_or(Error::NullPointer)?;
        if glyphs.is_empty() {
            return Ok(());
        }
        let src = self.device_source()?;
        if self.clip.mask().is_none() && !self.clip.is_all_clipped() {
            self.clip.apply(&self.target)?;
            let device = self.device_matrix();
            let mut placed = Vec::new();
            placed.try_reserve_exact(glyphs.len())?;
            placed.extend(glyphs.iter().map(|g| {
                let p = device.transform_point(UserPoint::new(g.x, g.y));
                Glyph {
                    index: g.index,
                    x: p.x,
                    y: p.y,
                }
            }));
            match self.target.show_glyphs(self.op, &src, &placed, font) {
                Err(Error::Unsupported) => debug!("show_glyphs: fill outlines"),
                r => return r,
            }
        }
        let Some(path) = self.glyph_path(glyphs, font) else {
            return Ok(());
        };
        let traps = tessellate::fill(&path, FillRule::Winding, self.tolerance);
        self.composite_traps(&traps)
    }

    pub fn copy_page(&self) -> Result<()> {
        self.target.copy_page()
    }

    pub fn show_page(&self) -> Result<()> {
        self.target.show_page()
    }
}

#[cfg(test)]
mod tests;
