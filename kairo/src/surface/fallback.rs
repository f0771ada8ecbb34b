//! Optional operations synthesized from the required image primitives.
//!
//! Each operation acquires a destination image for the smallest area it
//! touches, replays itself on that image with coordinates re-based to the
//! image origin, then hands the image back for writing.

use super::{
    image::{Format, ImageSurface},
    CompositeRect, Content, DestImage, Surface, SurfaceRef,
};
use crate::{
    color::Color,
    error::Result,
    geom::IntRect,
    operator::Operator,
    pattern::DevicePattern,
    raster::Antialias,
    traps::Traps,
};
use log::debug;

/// Run `f` on the image standing in for `interest` of `dst`.
fn with_dest_image(
    dst: &SurfaceRef,
    interest: IntRect,
    f: impl FnOnce(&DestImage, IntRect) -> Result<()>,
) -> Result<()> {
    let Some(dest) = dst.acquire_dest_image(interest)? else {
        debug!("fallback: {interest:?} not visible");
        return Ok(());
    };
    let visible = interest.intersect(&dest.rect);
    let r = if visible.is_empty() {
        Ok(())
    } else {
        f(&dest, visible)
    };
    let released = dst.release_dest_image(dest);
    r.and(released)
}

pub(super) fn composite(
    dst: &SurfaceRef,
    op: Operator,
    src: &DevicePattern,
    mask: Option<&DevicePattern>,
    rect: &CompositeRect,
) -> Result<()> {
    with_dest_image(dst, rect.dst_rect(), |dest, visible| {
        let r = rect
            .restrict(visible)
            .translate_dst(-dest.rect.x, -dest.rect.y);
        dest.image.composite(op, src, mask, &r)
    })
}

pub(super) fn fill_rectangles(
    dst: &SurfaceRef,
    op: Operator,
    color: Color,
    rects: &[IntRect],
) -> Result<()> {
    let interest = rects.iter().fold(IntRect::default(), |acc, r| acc.union(r));
    with_dest_image(dst, interest, |dest, visible| {
        let rebased: Vec<_> = rects
            .iter()
            .map(|r| r.intersect(&visible).translate(-dest.rect.x, -dest.rect.y))
            .filter(|r| !r.is_empty())
            .collect();
        dest.image.fill_rectangles(op, color, &rebased)
    })
}

pub(super) fn composite_trapezoids(
    dst: &SurfaceRef,
    op: Operator,
    src: &DevicePattern,
    antialias: Antialias,
    rect: &CompositeRect,
    traps: &Traps,
) -> Result<()> {
    with_dest_image(dst, rect.dst_rect(), |dest, visible| {
        let r = rect
            .restrict(visible)
            .translate_dst(-dest.rect.x, -dest.rect.y);
        let mut traps = traps.clone();
        traps.translate(-dest.rect.x, -dest.rect.y);
        dest.image.composite_trapezoids(op, src, antialias, &r, &traps)
    })
}

pub(super) fn create_similar(content: Content, width: i32, height: i32) -> Result<SurfaceRef> {
    let image = ImageSurface::new(Format::for_content(content), width, height)?;
    Ok(Surface::from_backend(Box::new(image)))
}
