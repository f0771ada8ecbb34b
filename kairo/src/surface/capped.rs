//! A surface exposing only part of the optional operation table.
//!
//! Pixels live in a private image surface. Operations enabled in
//! [`Capabilities`] are forwarded to it, the rest are declined and go
//! through the fallback layer. Path clipping keeps a coverage mask that every
//! write is blended through.

use super::{
    image::{Format, ImageSurface},
    Backend, ClipSupport, CompositeRect, Content, DestImage, Surface, SurfaceRef,
};
use crate::{
    clip::ClipPath,
    color::Color,
    error::{Error, Result},
    geom::{IntRect, IntoSkia},
    operator::Operator,
    pattern::DevicePattern,
    raster::Antialias,
    region::Region,
    traps::Traps,
};
use bitflags::bitflags;
use log::debug;
use std::any::Any;
use tiny_skia::{FillRule, Mask, PathBuilder, Transform};

bitflags! {
    /// Optional operations a [`CappedSurface`] performs natively.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Capabilities: u32 {
        const COMPOSITE = 1;
        const FILL_RECTANGLES = 1 << 1;
        const COMPOSITE_TRAPEZOIDS = 1 << 2;
        const CREATE_SIMILAR = 1 << 3;
        const CLONE_SIMILAR = 1 << 4;
    }
}

#[derive(Debug)]
pub struct CappedSurface {
    inner: SurfaceRef,
    caps: Capabilities,
    clip_support: ClipSupport,
    clip_mask: Option<Mask>,
}

impl CappedSurface {
    pub fn create(
        format: Format,
        width: i32,
        height: i32,
        caps: Capabilities,
        clip_support: ClipSupport,
    ) -> SurfaceRef {
        match ImageSurface::new(format, width, height) {
            Ok(image) => Surface::from_backend(Box::new(Self::new(image, caps, clip_support))),
            Err(e) => Surface::nil(e),
        }
    }

    pub(crate) fn new(image: ImageSurface, caps: Capabilities, clip_support: ClipSupport) -> Self {
        Self {
            inner: Surface::from_backend(Box::new(image)),
            caps,
            clip_support,
            clip_mask: None,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn bounds(&self) -> Result<IntRect> {
        Ok(self.inner.image()?.bounds())
    }

    fn require(&self, cap: Capabilities) -> Result<()> {
        if self.caps.contains(cap) {
            Ok(())
        } else {
            Err(Error::Unsupported)
        }
    }

    /// Run `f` on the inner image, then undo its effect outside the path
    /// clip within `area`.
    fn clipped(&self, area: IntRect, f: impl FnOnce(&SurfaceRef) -> Result<()>) -> Result<()> {
        let Some(mask) = &self.clip_mask else {
            return f(&self.inner);
        };
        let bounds = self.bounds()?;
        let area = area.intersect(&bounds);
        if area.is_empty() {
            return Ok(());
        }
        let saved = self.inner.image()?.copy_rect(area)?;
        f(&self.inner)?;
        let data = mask.data();
        let stride = bounds.width as usize;
        self.inner.image_mut()?.draw_image(
            &saved,
            area.x,
            area.y,
            |x, y| 255 - data[y as usize * stride + x as usize],
        );
        Ok(())
    }

    fn full_mask(&self) -> Result<Mask> {
        let bounds = self.bounds()?;
        let mut mask =
            Mask::new(bounds.width as u32, bounds.height as u32).ok_or(Error::NoMemory)?;
        if let Some(rect) = bounds.into_skia() {
            let p = PathBuilder::from_rect(rect);
            mask.fill_path(&p, FillRule::Winding, false, Transform::identity());
        }
        Ok(mask)
    }
}

impl Backend for CappedSurface {
    fn content(&self) -> Content {
        self.inner.content()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn acquire_source_image(&mut self, _this: &SurfaceRef) -> Result<SurfaceRef> {
        Ok(SurfaceRef::clone(&self.inner))
    }

    fn acquire_dest_image(
        &mut self,
        _this: &SurfaceRef,
        interest: IntRect,
    ) -> Result<Option<DestImage>> {
        let rect = interest.intersect(&self.bounds()?);
        if rect.is_empty() {
            return Ok(None);
        }
        let copy = self.inner.image()?.copy_rect(rect)?;
        Ok(Some(DestImage {
            image: Surface::from_backend(Box::new(copy)),
            rect,
        }))
    }

    fn release_dest_image(&mut self, dest: DestImage) -> Result<()> {
        let image = dest.image.image()?;
        let mut inner = self.inner.image_mut()?;
        match &self.clip_mask {
            None => inner.draw_image(&image, dest.rect.x, dest.rect.y, |_, _| 255),
            Some(mask) => {
                let data = mask.data();
                let stride = inner.width() as usize;
                inner.draw_image(
                    &image,
                    dest.rect.x,
                    dest.rect.y,
                    |x, y| data[y as usize * stride + x as usize],
                );
            }
        }
        Ok(())
    }

    fn extents(&self) -> Option<IntRect> {
        self.bounds().ok()
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.finish()
    }

    fn clip_support(&self) -> ClipSupport {
        self.clip_support
    }

    fn set_clip_region(&mut self, region: Option<&Region>) -> Result<()> {
        if self.clip_support != ClipSupport::Region {
            return Err(Error::Unsupported);
        }
        self.inner.image_mut()?.set_clip_region(region)
    }

    fn intersect_clip_path(&mut self, path: Option<&ClipPath>) -> Result<()> {
        if self.clip_support != ClipSupport::Path {
            return Err(Error::Unsupported);
        }
        let Some(path) = path else {
            self.clip_mask = None;
            return Ok(());
        };
        let mut mask = match self.clip_mask.take() {
            Some(m) => m,
            None => self.full_mask()?,
        };
        mask.intersect_path(
            &path.path,
            path.fill_rule,
            path.antialias.is_enabled(),
            Transform::identity(),
        );
        self.clip_mask = Some(mask);
        Ok(())
    }

    fn create_similar(&mut self, content: Content, width: i32, height: i32) -> Result<SurfaceRef> {
        self.require(Capabilities::CREATE_SIMILAR)?;
        let image = ImageSurface::new(Format::for_content(content), width, height)?;
        Ok(Surface::from_backend(Box::new(Self::new(
            image,
            self.caps,
            self.clip_support,
        ))))
    }

    fn clone_similar(&mut self, src: &SurfaceRef, _rect: IntRect) -> Result<SurfaceRef> {
        self.require(Capabilities::CLONE_SIMILAR)?;
        let image = src.acquire_source_image()?;
        let copy = image.image().and_then(|i| i.try_clone());
        src.release_source_image(&image);
        debug!("clone {src:?} into capped surface");
        Ok(Surface::from_backend(Box::new(Self::new(
            copy?,
            self.caps,
            ClipSupport::None,
        ))))
    }

    fn composite(
        &mut self,
        op: Operator,
        src: &DevicePattern,
        mask: Option<&DevicePattern>,
        rect: &CompositeRect,
    ) -> Result<()> {
        self.require(Capabilities::COMPOSITE)?;
        self.clipped(rect.dst_rect(), |inner| inner.composite(op, src, mask, rect))
    }

    fn fill_rectangles(&mut self, op: Operator, color: Color, rects: &[IntRect]) -> Result<()> {
        self.require(Capabilities::FILL_RECTANGLES)?;
        let area = rects.iter().fold(IntRect::default(), |acc, r| acc.union(r));
        self.clipped(area, |inner| inner.fill_rectangles(op, color, rects))
    }

    fn composite_trapezoids(
        &mut self,
        op: Operator,
        src: &DevicePattern,
        antialias: Antialias,
        rect: &CompositeRect,
        traps: &Traps,
    ) -> Result<()> {
        self.require(Capabilities::COMPOSITE_TRAPEZOIDS)?;
        self.clipped(rect.dst_rect(), |inner| {
            inner.composite_trapezoids(op, src, antialias, rect, traps)
        })
    }
}

#[cfg(test)]
mod tests;
