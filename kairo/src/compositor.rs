//! Clip and composite dispatch.
//!
//! Every drawing operation ends up here as an operator, a source pattern and
//! a shape. The dispatch picks the cheapest strategy the clip and the target
//! backend allow:
//!
//! * (a) mask clip and a region shape: native region clip plus the clip mask
//!   as composite mask
//! * (b) mask clip otherwise: shape coverage multiplied by the clip mask in a
//!   temporary A8 surface
//! * (c) region shape and solid source: `fill_rectangles`
//! * (d) region shape: native region clip and a plain composite
//! * (e) `composite_trapezoids`, or a composite through the mask pattern

use crate::{
    clip::{Clip, ClipMask},
    color::Color,
    error::{Error, Result},
    geom::IntRect,
    operator::Operator,
    pattern::DevicePattern,
    raster::Antialias,
    region::Region,
    surface::{ClipSupport, CompositeRect, Content, SurfaceRef},
    traps::Traps,
};
use log::debug;

const UNBOUNDED: IntRect = IntRect::new(i32::MIN / 2, i32::MIN / 2, i32::MAX, i32::MAX);

/// Coverage of a drawing operation.
#[derive(Clone, Copy, Debug)]
pub enum Shape<'a> {
    Traps(&'a Traps),
    /// Alpha of the pattern is the coverage.
    Mask(&'a DevicePattern),
}

impl Shape<'_> {
    fn extents(&self) -> IntRect {
        match self {
            Shape::Traps(t) => t.extents(),
            Shape::Mask(p) => p.footprint().unwrap_or(UNBOUNDED),
        }
    }
}

/// Operators whose effect is confined to the shape, `Source` replaces the
/// destination inside the shape only.
fn bounded_by_shape(op: Operator) -> bool {
    op.is_bounded() || op == Operator::Source
}

/// Draw `src` with `op` through `shape` onto `dst`, honoring `clip`.
pub fn clip_and_composite(
    clip: &Clip,
    op: Operator,
    src: &DevicePattern,
    shape: Shape<'_>,
    dst: &SurfaceRef,
    antialias: Antialias,
) -> Result<()> {
    dst.status()?;
    if clip.is_all_clipped() {
        return Ok(());
    }
    let white = DevicePattern::solid(Color::WHITE);
    let (op, src) = match op {
        Operator::Clear => (Operator::DestOut, &white),
        op => (op, src),
    };

    let mut extents = dst.extents().unwrap_or(UNBOUNDED);
    if bounded_by_shape(op) {
        extents = extents.intersect(&shape.extents());
    }
    extents = extents.intersect(&clip.extents(dst));
    if extents.is_empty() {
        return Ok(());
    }

    let region = match shape {
        Shape::Traps(t) => t.extract_region().map(|mut r| {
            r.intersect_rect(&extents);
            if let Some(clip_region) = clip.region() {
                r.intersect(clip_region);
            }
            r
        }),
        Shape::Mask(_) => None,
    };
    if region.as_ref().is_some_and(Region::is_empty) && bounded_by_shape(op) {
        return Ok(());
    }

    clip.apply(dst)?;

    if let Some(mask) = clip.mask() {
        if let Some(region) = &region {
            if op.is_bounded() && dst.clip_support() == ClipSupport::Region {
                match composite_region_through_mask(op, src, region, mask, dst) {
                    Err(Error::Unsupported) => {}
                    r => return r,
                }
            }
        }
        return composite_through_mask(op, src, shape, mask, dst, extents, antialias);
    }

    if let Some(region) = &region {
        if bounded_by_shape(op) {
            if let Some(color) = src.solid_color() {
                debug!("composite: fill {} rectangles", region.rects().len());
                return dst.fill_rectangles(op, color, region.rects());
            }
            if dst.clip_support() == ClipSupport::Region {
                match composite_region(op, src, region, dst) {
                    Err(Error::Unsupported) => {}
                    r => return r,
                }
            }
        }
    }

    if op == Operator::Source {
        let coverage = shape_mask(shape, dst, extents, antialias, None)?;
        return lerp(src, &coverage, dst, extents);
    }

    debug!("composite: direct {op}");
    match shape {
        Shape::Traps(traps) => {
            dst.composite_trapezoids(op, src, antialias, &CompositeRect::aligned(extents), traps)
        }
        Shape::Mask(mask) => dst.composite(op, src, Some(mask), &CompositeRect::aligned(extents)),
    }
}

/// Tier (a).
fn composite_region_through_mask(
    op: Operator,
    src: &DevicePattern,
    region: &Region,
    mask: &ClipMask,
    dst: &SurfaceRef,
) -> Result<()> {
    debug!("composite: region clip with clip mask");
    let serial = dst.allocate_clip_serial();
    dst.set_clip_region(region, serial)?;
    dst.composite(
        op,
        src,
        Some(&mask.pattern()),
        &CompositeRect::aligned(region.extents()),
    )
}

/// Tier (d).
fn composite_region(
    op: Operator,
    src: &DevicePattern,
    region: &Region,
    dst: &SurfaceRef,
) -> Result<()> {
    debug!("composite: region clip");
    let serial = dst.allocate_clip_serial();
    dst.set_clip_region(region, serial)?;
    dst.composite(op, src, None, &CompositeRect::aligned(region.extents()))
}

/// Tier (b).
fn composite_through_mask(
    op: Operator,
    src: &DevicePattern,
    shape: Shape<'_>,
    clip: &ClipMask,
    dst: &SurfaceRef,
    extents: IntRect,
    antialias: Antialias,
) -> Result<()> {
    if !bounded_by_shape(op) {
        return combine_through_mask(op, src, shape, clip, dst, extents, antialias);
    }
    debug!("composite: shape through clip mask {extents:?}");
    let coverage = shape_mask(shape, dst, extents, antialias, Some(clip))?;
    if op == Operator::Source {
        return lerp(src, &coverage, dst, extents);
    }
    dst.composite(op, src, Some(&coverage), &CompositeRect::aligned(extents))
}

/// A8 coverage of `shape` over `extents`, multiplied by `clip` if given.
/// Returns a pattern placing the coverage on `extents`.
fn shape_mask(
    shape: Shape<'_>,
    dst: &SurfaceRef,
    extents: IntRect,
    antialias: Antialias,
    clip: Option<&ClipMask>,
) -> Result<DevicePattern> {
    let surface = dst.try_create_similar(Content::Alpha, extents.width, extents.height)?;
    let local = CompositeRect {
        dst_x: 0,
        dst_y: 0,
        ..CompositeRect::aligned(extents)
    };
    match shape {
        Shape::Traps(traps) => {
            let mut traps = traps.clone();
            traps.translate(-extents.x, -extents.y);
            surface.composite_trapezoids(
                Operator::Add,
                &DevicePattern::solid(Color::WHITE),
                antialias,
                &CompositeRect::aligned(local.dst_rect()),
                &traps,
            )?;
        }
        Shape::Mask(mask) => surface.composite(Operator::Add, mask, None, &local)?,
    }
    if let Some(clip) = clip {
        surface.composite(Operator::In, &clip.pattern(), None, &local)?;
    }
    Ok(DevicePattern::for_surface_at(&surface, extents.x, extents.y))
}

/// Replace `dst` by `src` in proportion to `coverage`.
fn lerp(
    src: &DevicePattern,
    coverage: &DevicePattern,
    dst: &SurfaceRef,
    extents: IntRect,
) -> Result<()> {
    debug!("composite: source lerp {extents:?}");
    let rect = CompositeRect::aligned(extents);
    dst.composite(Operator::DestOut, coverage, None, &rect)?;
    dst.composite(Operator::Add, src, Some(coverage), &rect)
}

/// Unbounded operator under a mask clip: draw on a copy of the destination,
/// then blend the copy back through the clip mask.
fn combine_through_mask(
    op: Operator,
    src: &DevicePattern,
    shape: Shape<'_>,
    clip: &ClipMask,
    dst: &SurfaceRef,
    extents: IntRect,
    antialias: Antialias,
) -> Result<()> {
    debug!("composite: combine {op} through clip mask {extents:?}");
    let tmp = dst.try_create_similar(dst.content(), extents.width, extents.height)?;
    let local = CompositeRect {
        dst_x: 0,
        dst_y: 0,
        ..CompositeRect::aligned(extents)
    };
    tmp.composite(
        Operator::Source,
        &DevicePattern::for_surface_at(dst, 0, 0),
        None,
        &local,
    )?;
    match shape {
        Shape::Traps(traps) => {
            let mut traps = traps.clone();
            traps.translate(-extents.x, -extents.y);
            tmp.composite_trapezoids(op, src, antialias, &local, &traps)?;
        }
        Shape::Mask(mask) => tmp.composite(op, src, Some(mask), &local)?,
    }
    let result = DevicePattern::for_surface_at(&tmp, extents.x, extents.y);
    let rect = CompositeRect::aligned(extents);
    let clip = clip.pattern();
    dst.composite(Operator::DestOut, &clip, None, &rect)?;
    dst.composite(Operator::Add, &result, Some(&clip), &rect)
}
