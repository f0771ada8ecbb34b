//! Clip descriptor.
//!
//! The accumulated intersection of every clip operation on a graphics state,
//! held as exactly one of: a chain of paths for backends clipping paths
//! natively, a rectangle region, or an A8 mask surface. The mask form is
//! reached when neither native primitive fits and is never left again.

use crate::{
    color::Color,
    error::Result,
    geom::{DeviceBox, DevicePoint, IntRect},
    operator::Operator,
    pattern::DevicePattern,
    raster::Antialias,
    region::Region,
    surface::{
        ClipSupport, CompositeRect, Content, Surface, SurfaceRef, UNKNOWN_CLIP_SERIAL,
    },
    tessellate,
    traps::Traps,
};
use log::debug;
use std::rc::Rc;
use tiny_skia::{FillRule, Path};

/// Node of the persistent clip path list, newest first.
#[derive(Debug)]
pub struct ClipPath {
    /// Device space outline.
    pub path: Path,
    pub fill_rule: FillRule,
    pub tolerance: f64,
    pub antialias: Antialias,
    /// Bounds of this path intersected with all older ones.
    pub bounds: IntRect,
    prev: Option<Rc<ClipPath>>,
}

impl ClipPath {
    pub fn prev(&self) -> Option<&Rc<ClipPath>> {
        self.prev.as_ref()
    }

    /// All nodes of the chain ending at `self`, oldest first.
    pub fn chain(&self) -> Vec<&ClipPath> {
        let mut nodes = vec![self];
        let mut cur = self.prev.as_deref();
        while let Some(node) = cur {
            nodes.push(node);
            cur = node.prev.as_deref();
        }
        nodes.reverse();
        nodes
    }
}

/// Coverage surface of a mask clip, its pixel `(0, 0)` sits on device pixel
/// `(rect.x, rect.y)`.
#[derive(Clone, Debug)]
pub struct ClipMask {
    pub surface: SurfaceRef,
    pub rect: IntRect,
}

impl ClipMask {
    pub fn pattern(&self) -> DevicePattern {
        DevicePattern::for_surface_at(&self.surface, self.rect.x, self.rect.y)
    }
}

#[derive(Clone, Debug, Default)]
pub enum ClipMode {
    #[default]
    None,
    Path(Rc<ClipPath>),
    Region(Region),
    Mask(ClipMask),
}

#[derive(Clone, Debug)]
pub struct Clip {
    mode: ClipMode,
    all_clipped: bool,
    serial: u32,
    support: ClipSupport,
}

fn path_bounds(path: &Path) -> IntRect {
    let b = path.bounds();
    IntRect::round_out(&DeviceBox::new(
        DevicePoint::new(b.left() as f64, b.top() as f64),
        DevicePoint::new(b.right() as f64, b.bottom() as f64),
    ))
}

/// Extents used for unbounded surfaces.
const UNBOUNDED: IntRect = IntRect::new(i32::MIN / 2, i32::MIN / 2, i32::MAX, i32::MAX);

fn target_extents(target: &Surface) -> IntRect {
    target.extents().unwrap_or(UNBOUNDED)
}

impl Clip {
    /// Unclipped descriptor for drawing on `target`.
    pub fn new(target: &Surface) -> Self {
        Self {
            mode: ClipMode::None,
            all_clipped: false,
            serial: 0,
            support: target.clip_support(),
        }
    }

    /// Independent copy, the region payload is duplicated, path chain and
    /// mask surface are shared.
    pub fn try_clone(&self) -> Result<Self> {
        let mode = match &self.mode {
            ClipMode::Region(r) => ClipMode::Region(r.try_clone()?),
            m => m.clone(),
        };
        Ok(Self { mode, ..*self })
    }

    pub fn mode(&self) -> &ClipMode {
        &self.mode
    }

    pub fn is_all_clipped(&self) -> bool {
        self.all_clipped
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn region(&self) -> Option<&Region> {
        match &self.mode {
            ClipMode::Region(r) => Some(r),
            _ => None,
        }
    }

    pub fn mask(&self) -> Option<&ClipMask> {
        match &self.mode {
            ClipMode::Mask(m) => Some(m),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.mode = ClipMode::None;
        self.all_clipped = false;
        self.serial = 0;
    }

    /// Clip away everything.
    pub fn clip_all(&mut self, target: &Surface) {
        debug!("clip: nothing visible");
        self.all_clipped = true;
        self.serial = target.allocate_clip_serial();
    }

    /// Intersect with the device space `path`.
    ///
    /// On error the descriptor is left unchanged.
    pub fn intersect_path(
        &mut self,
        target: &SurfaceRef,
        path: &Path,
        fill_rule: FillRule,
        tolerance: f64,
        antialias: Antialias,
    ) -> Result<()> {
        if self.all_clipped {
            return Ok(());
        }

        if self.support == ClipSupport::Path {
            if let ClipMode::None | ClipMode::Path(_) = &self.mode {
                let prev = match &self.mode {
                    ClipMode::Path(p) => Some(Rc::clone(p)),
                    _ => None,
                };
                let mut bounds = path_bounds(path);
                if let Some(p) = &prev {
                    bounds = bounds.intersect(&p.bounds);
                }
                if bounds.is_empty() {
                    self.clip_all(target);
                    return Ok(());
                }
                self.mode = ClipMode::Path(Rc::new(ClipPath {
                    path: path.clone(),
                    fill_rule,
                    tolerance,
                    antialias,
                    bounds,
                    prev,
                }));
                self.serial = target.allocate_clip_serial();
                debug!("clip: path chain, bounds {bounds:?}");
                return Ok(());
            }
        }

        let traps = tessellate::fill(path, fill_rule, tolerance);
        if traps.is_empty() {
            self.clip_all(target);
            return Ok(());
        }

        if self.support == ClipSupport::Region {
            if let ClipMode::None | ClipMode::Region(_) = &self.mode {
                if let Some(mut region) = traps.extract_region() {
                    if let ClipMode::Region(prev) = &self.mode {
                        region.intersect(prev);
                    }
                    if region.is_empty() {
                        self.clip_all(target);
                    } else {
                        debug!("clip: region of {} rectangles", region.rects().len());
                        self.mode = ClipMode::Region(region);
                        self.serial = target.allocate_clip_serial();
                    }
                    return Ok(());
                }
            }
        }

        self.intersect_mask(target, &traps, antialias)
    }

    fn intersect_mask(
        &mut self,
        target: &SurfaceRef,
        traps: &Traps,
        antialias: Antialias,
    ) -> Result<()> {
        let mut rect = traps.extents().intersect(&target_extents(target));
        match &self.mode {
            ClipMode::Mask(m) => rect = rect.intersect(&m.rect),
            ClipMode::Region(r) => rect = rect.intersect(&r.extents()),
            ClipMode::Path(p) => rect = rect.intersect(&p.bounds),
            ClipMode::None => {}
        }
        if rect.is_empty() {
            self.clip_all(target);
            return Ok(());
        }

        let local = IntRect::new(0, 0, rect.width, rect.height);
        let surface = target.try_create_similar(Content::Alpha, rect.width, rect.height)?;
        let mut traps = traps.clone();
        traps.translate(-rect.x, -rect.y);
        surface.composite_trapezoids(
            Operator::Add,
            &DevicePattern::solid(Color::WHITE),
            antialias,
            &CompositeRect::aligned(local),
            &traps,
        )?;

        match &self.mode {
            ClipMode::Mask(prev) => {
                let pattern = DevicePattern::for_surface_at(
                    &prev.surface,
                    prev.rect.x - rect.x,
                    prev.rect.y - rect.y,
                );
                surface.composite(Operator::In, &pattern, None, &CompositeRect::aligned(local))?;
            }
            ClipMode::Region(region) => {
                let mut outside = Region::from_rect(rect);
                outside.subtract(region);
                outside.translate(-rect.x, -rect.y);
                surface.fill_rectangles(Operator::Source, Color::TRANSPARENT, outside.rects())?;
            }
            ClipMode::Path(_) | ClipMode::None => {}
        }

        debug!("clip: mask surface {rect:?}");
        self.mode = ClipMode::Mask(ClipMask { surface, rect });
        self.serial = target.allocate_clip_serial();
        Ok(())
    }

    /// Device rectangle containing everything still visible, empty if nothing
    /// is.
    pub fn extents(&self, target: &Surface) -> IntRect {
        if self.all_clipped {
            return IntRect::default();
        }
        let base = target_extents(target);
        match &self.mode {
            ClipMode::None => base,
            ClipMode::Path(p) => base.intersect(&p.bounds),
            ClipMode::Region(r) => base.intersect(&r.extents()),
            ClipMode::Mask(m) => base.intersect(&m.rect),
        }
    }

    /// Install the native part of the clip on `target`.
    pub fn apply(&self, target: &Surface) -> Result<()> {
        if self.serial == target.current_clip_serial() {
            return Ok(());
        }
        match &self.mode {
            ClipMode::Path(head) => {
                target.reset_clip(UNKNOWN_CLIP_SERIAL)?;
                for node in head.chain() {
                    target.intersect_clip_path(node, self.serial)?;
                }
                Ok(())
            }
            ClipMode::Region(r) => target.set_clip_region(r, self.serial),
            ClipMode::None | ClipMode::Mask(_) => target.reset_clip(self.serial),
        }
    }
}

#[cfg(test)]
mod tests;
