//! Drawing surfaces.
//!
//! A [`Surface`] wraps a [`Backend`]: a small set of required image access
//! primitives plus optional operations a backend may decline with
//! [`Error::Unsupported`]. Declined operations are synthesized by
//! [`fallback`] from the required primitives, so callers never see
//! `Unsupported` from the dispatch methods here unless noted.

use crate::{
    clip::ClipPath,
    color::Color,
    error::{Error, Result, Sticky},
    geom::{DeviceSpace, IntRect},
    glyph_cache::{Glyph, ScaledFont},
    operator::Operator,
    pattern::{DevicePattern, PatternKind},
    raster::Antialias,
    region::Region,
    traps::Traps,
};
use log::{debug, error};
use std::{
    any::Any,
    cell::{Cell, Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};
use tiny_skia::FillRule;

pub mod capped;
pub mod fallback;
pub mod image;

use image::ImageSurface;

pub type SurfaceRef = Rc<Surface>;
pub type DeviceVector = euclid::Vector2D<f64, DeviceSpace>;

#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum Content {
    Color,
    Alpha,
    ColorAlpha,
}

/// Native clipping primitive offered by a backend, at most one.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, strum::Display)]
pub enum ClipSupport {
    #[default]
    None,
    Region,
    Path,
}

/// Placement of a composite: destination pixel `(dst_x + i, dst_y + j)`
/// samples the source at device pixel `(src_x + i, src_y + j)` and the mask
/// at `(mask_x + i, mask_y + j)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CompositeRect {
    pub src_x: i32,
    pub src_y: i32,
    pub mask_x: i32,
    pub mask_y: i32,
    pub dst_x: i32,
    pub dst_y: i32,
    pub width: i32,
    pub height: i32,
}

impl CompositeRect {
    /// Source, mask and destination all aligned on `rect`.
    pub fn aligned(rect: IntRect) -> Self {
        Self {
            src_x: rect.x,
            src_y: rect.y,
            mask_x: rect.x,
            mask_y: rect.y,
            dst_x: rect.x,
            dst_y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }

    pub fn dst_rect(&self) -> IntRect {
        IntRect::new(self.dst_x, self.dst_y, self.width, self.height)
    }

    pub fn src_rect(&self) -> IntRect {
        IntRect::new(self.src_x, self.src_y, self.width, self.height)
    }

    pub fn mask_rect(&self) -> IntRect {
        IntRect::new(self.mask_x, self.mask_y, self.width, self.height)
    }

    /// Restrict to the destination area `dst` (in the same coordinates as
    /// `dst_x`/`dst_y`), moving source and mask along.
    pub fn restrict(&self, dst: IntRect) -> Self {
        let dst = dst.intersect(&self.dst_rect());
        let (dx, dy) = (dst.x - self.dst_x, dst.y - self.dst_y);
        Self {
            src_x: self.src_x + dx,
            src_y: self.src_y + dy,
            mask_x: self.mask_x + dx,
            mask_y: self.mask_y + dy,
            dst_x: dst.x,
            dst_y: dst.y,
            width: dst.width,
            height: dst.height,
        }
    }

    /// Move the destination by `(dx, dy)`, source and mask stay.
    pub fn translate_dst(&self, dx: i32, dy: i32) -> Self {
        Self {
            dst_x: self.dst_x + dx,
            dst_y: self.dst_y + dy,
            ..*self
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FontOptions {
    pub antialias: Antialias,
    pub hint_metrics: bool,
}

/// Image standing in for part of a destination. Image pixel `(0, 0)` is
/// destination pixel `(rect.x, rect.y)`.
#[derive(Debug)]
pub struct DestImage {
    pub image: SurfaceRef,
    pub rect: IntRect,
}

/// Operation table of a surface implementation.
///
/// Optional operations default to `Err(Error::Unsupported)`.
pub trait Backend: fmt::Debug {
    fn content(&self) -> Content;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Image with the current contents, `this` is the surface owning `self`.
    fn acquire_source_image(&mut self, this: &SurfaceRef) -> Result<SurfaceRef>;
    fn release_source_image(&mut self, _image: &SurfaceRef) {}
    /// Image to draw the `interest` area into, `None` if nothing of it is
    /// visible.
    fn acquire_dest_image(&mut self, this: &SurfaceRef, interest: IntRect)
        -> Result<Option<DestImage>>;
    /// Write `image` back and release it.
    fn release_dest_image(&mut self, image: DestImage) -> Result<()>;
    /// `None` for unbounded surfaces.
    fn extents(&self) -> Option<IntRect>;
    fn finish(&mut self) -> Result<()>;

    /// Whether image surfaces can be used as sources without conversion.
    fn consumes_images(&self) -> bool {
        false
    }

    fn clip_support(&self) -> ClipSupport {
        ClipSupport::None
    }

    /// Replace the native clip, `None` resets it.
    fn set_clip_region(&mut self, _region: Option<&Region>) -> Result<()> {
        Err(Error::Unsupported)
    }

    /// Intersect the native clip with `path`, `None` resets it.
    fn intersect_clip_path(&mut self, _path: Option<&ClipPath>) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn create_similar(
        &mut self,
        _content: Content,
        _width: i32,
        _height: i32,
    ) -> Result<SurfaceRef> {
        Err(Error::Unsupported)
    }

    /// Copy of `src` in a form this backend draws from natively, covering at
    /// least `rect`. Pixel coordinates of the copy match `src`.
    fn clone_similar(&mut self, _src: &SurfaceRef, _rect: IntRect) -> Result<SurfaceRef> {
        Err(Error::Unsupported)
    }

    fn composite(
        &mut self,
        _op: Operator,
        _src: &DevicePattern,
        _mask: Option<&DevicePattern>,
        _rect: &CompositeRect,
    ) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn fill_rectangles(&mut self, _op: Operator, _color: Color, _rects: &[IntRect]) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn composite_trapezoids(
        &mut self,
        _op: Operator,
        _src: &DevicePattern,
        _antialias: Antialias,
        _rect: &CompositeRect,
        _traps: &Traps,
    ) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn copy_page(&mut self) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn show_page(&mut self) -> Result<()> {
        Err(Error::Unsupported)
    }

    /// `glyphs` positions are in device space.
    fn show_glyphs(
        &mut self,
        _op: Operator,
        _src: &DevicePattern,
        _glyphs: &[Glyph],
        _font: &dyn ScaledFont,
    ) -> Result<()> {
        Err(Error::Unsupported)
    }

    /// `path` is in device space.
    fn fill_path(
        &mut self,
        _op: Operator,
        _src: &DevicePattern,
        _path: &tiny_skia::Path,
        _fill_rule: FillRule,
        _tolerance: f64,
        _antialias: Antialias,
    ) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn font_options(&self) -> Result<FontOptions> {
        Err(Error::Unsupported)
    }

    fn flush(&mut self) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn mark_dirty_rectangle(&mut self, _rect: IntRect) -> Result<()> {
        Err(Error::Unsupported)
    }
}

/// Backend of nil surfaces, never reached past the status checks.
#[derive(Debug)]
struct NilBackend;

impl Backend for NilBackend {
    fn content(&self) -> Content {
        Content::ColorAlpha
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn acquire_source_image(&mut self, _this: &SurfaceRef) -> Result<SurfaceRef> {
        Err(Error::NullPointer)
    }

    fn acquire_dest_image(&mut self, _: &SurfaceRef, _: IntRect) -> Result<Option<DestImage>> {
        Err(Error::NullPointer)
    }

    fn release_dest_image(&mut self, _image: DestImage) -> Result<()> {
        Ok(())
    }

    fn extents(&self) -> Option<IntRect> {
        Some(IntRect::default())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Clip serial no clip descriptor carries, marks a native clip in an
/// unknown state. Serial 0 is the unclipped state of a fresh surface.
pub(crate) const UNKNOWN_CLIP_SERIAL: u32 = u32::MAX;

/// Reference counted drawing target and paint source.
pub struct Surface {
    backend: RefCell<Box<dyn Backend>>,
    content: Content,
    status: Sticky,
    finished: Cell<bool>,
    device_offset: Cell<DeviceVector>,
    next_clip_serial: Cell<u32>,
    current_clip_serial: Cell<u32>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("content", &self.content)
            .field("status", &self.status)
            .field("finished", &self.finished.get())
            .finish_non_exhaustive()
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        if !self.finished.get() {
            if let Err(e) = self.backend.get_mut().finish() {
                error!("finish surface on drop: {e}");
            }
        }
    }
}

impl Surface {
    pub fn from_backend(backend: Box<dyn Backend>) -> SurfaceRef {
        Rc::new(Self {
            content: backend.content(),
            backend: RefCell::new(backend),
            status: Sticky::new(),
            finished: Cell::new(false),
            device_offset: Cell::new(DeviceVector::zero()),
            next_clip_serial: Cell::new(1),
            current_clip_serial: Cell::new(0),
        })
    }

    /// Surface permanently in error state `err`.
    pub fn nil(err: Error) -> SurfaceRef {
        let r = Self::from_backend(Box::new(NilBackend));
        r.status.set(err);
        r.finished.set(true);
        r
    }

    pub fn status(&self) -> Result<()> {
        self.status.check()
    }

    pub fn content(&self) -> Content {
        self.content
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    pub fn extents(&self) -> Option<IntRect> {
        self.backend.borrow().extents()
    }

    pub fn device_offset(&self) -> DeviceVector {
        self.device_offset.get()
    }

    /// Offset added to device coordinates of everything drawn on the surface.
    pub fn set_device_offset(&self, x: f64, y: f64) {
        self.device_offset.set(DeviceVector::new(x, y));
    }

    pub fn clip_support(&self) -> ClipSupport {
        self.backend.borrow().clip_support()
    }

    /// Borrow the backend as an image surface.
    pub fn image(&self) -> Result<Ref<'_, ImageSurface>> {
        Ref::filter_map(self.backend.borrow(), |b| {
            b.as_any().downcast_ref::<ImageSurface>()
        })
        .map_err(|_| Error::SurfaceTypeMismatch)
    }

    pub(crate) fn image_mut(&self) -> Result<RefMut<'_, ImageSurface>> {
        RefMut::filter_map(self.backend.borrow_mut(), |b| {
            b.as_any_mut().downcast_mut::<ImageSurface>()
        })
        .map_err(|_| Error::SurfaceTypeMismatch)
    }

    /// Borrow the backend as `T`.
    pub fn backend<T: Backend + 'static>(&self) -> Result<Ref<'_, T>> {
        Ref::filter_map(self.backend.borrow(), |b| b.as_any().downcast_ref::<T>())
            .map_err(|_| Error::SurfaceTypeMismatch)
    }

    /// Status check done by every drawing operation.
    fn check_drawable(&self) -> Result<()> {
        self.status.check()?;
        if self.finished.get() {
            return Err(self.status.set(Error::SurfaceFinished));
        }
        Ok(())
    }

    fn call<T>(&self, f: impl FnOnce(&mut dyn Backend) -> Result<T>) -> Result<T> {
        let mut backend = self.backend.borrow_mut();
        f(backend.as_mut())
    }

    /// Release backend resources. Drawing afterwards fails with
    /// `SurfaceFinished`, metadata stays readable.
    pub fn finish(&self) -> Result<()> {
        self.status.check()?;
        if self.finished.get() {
            return Err(self.status.set(Error::SurfaceFinished));
        }
        let r = self.call(|b| match b.flush() {
            Ok(()) | Err(Error::Unsupported) => b.finish(),
            Err(e) => Err(e),
        });
        self.finished.set(true);
        self.status.record(r)
    }

    pub fn flush(&self) -> Result<()> {
        self.status.check()?;
        if self.finished.get() {
            return Ok(());
        }
        match self.call(|b| b.flush()) {
            Err(Error::Unsupported) => Ok(()),
            r => self.status.record(r),
        }
    }

    pub fn mark_dirty(&self) -> Result<()> {
        match self.extents() {
            Some(e) => self.mark_dirty_rectangle(e),
            None => Ok(()),
        }
    }

    pub fn mark_dirty_rectangle(&self, rect: IntRect) -> Result<()> {
        self.check_drawable()?;
        // pixels changed behind our back, the native clip may be gone too
        self.current_clip_serial.set(UNKNOWN_CLIP_SERIAL);
        match self.call(|b| b.mark_dirty_rectangle(rect)) {
            Err(Error::Unsupported) => Ok(()),
            r => self.status.record(r),
        }
    }

    pub fn font_options(&self) -> FontOptions {
        if self.status.check().is_err() {
            return FontOptions::default();
        }
        self.backend.borrow().font_options().unwrap_or_default()
    }

    pub(crate) fn try_create_similar(
        &self,
        content: Content,
        width: i32,
        height: i32,
    ) -> Result<SurfaceRef> {
        self.check_drawable()?;
        match self.call(|b| b.create_similar(content, width, height)) {
            Err(Error::Unsupported) => fallback::create_similar(content, width, height),
            r => r,
        }
    }

    /// New surface of the same kind, a nil surface on failure.
    pub fn create_similar(&self, content: Content, width: i32, height: i32) -> SurfaceRef {
        self.try_create_similar(content, width, height)
            .unwrap_or_else(Surface::nil)
    }

    pub fn copy_page(&self) -> Result<()> {
        self.check_drawable()?;
        match self.call(|b| b.copy_page()) {
            Err(Error::Unsupported) => Ok(()),
            r => self.status.record(r),
        }
    }

    pub fn show_page(&self) -> Result<()> {
        self.check_drawable()?;
        match self.call(|b| b.show_page()) {
            Err(Error::Unsupported) => Ok(()),
            r => self.status.record(r),
        }
    }

    pub fn acquire_source_image(self: &Rc<Self>) -> Result<SurfaceRef> {
        self.status.check()?;
        let r = self.call(|b| b.acquire_source_image(self));
        self.status.record(r)
    }

    pub fn release_source_image(&self, image: &SurfaceRef) {
        self.backend.borrow_mut().release_source_image(image);
    }

    pub fn acquire_dest_image(self: &Rc<Self>, interest: IntRect) -> Result<Option<DestImage>> {
        self.check_drawable()?;
        let r = self.call(|b| b.acquire_dest_image(self, interest));
        self.status.record(r)
    }

    pub fn release_dest_image(&self, image: DestImage) -> Result<()> {
        let r = self.call(|b| b.release_dest_image(image));
        self.status.record(r)
    }

    /// Independent image copy of the current contents.
    pub fn snapshot(self: &Rc<Self>) -> Result<SurfaceRef> {
        let image = self.acquire_source_image()?;
        let copy = image.image().and_then(|img| img.try_clone());
        self.release_source_image(&image);
        Ok(Surface::from_backend(Box::new(copy?)))
    }

    /// If `pattern` draws from this surface, a copy of it reading a snapshot.
    fn detach(self: &Rc<Self>, pattern: &DevicePattern) -> Result<Option<DevicePattern>> {
        match pattern.surface() {
            Some(s) if Rc::ptr_eq(s, self) => {
                debug!("surface used as its own source, snapshot it");
                let mut p = pattern.clone();
                p.kind = PatternKind::Surface(self.snapshot()?);
                Ok(Some(p))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn allocate_clip_serial(&self) -> u32 {
        let serial = self.next_clip_serial.get();
        let next = match serial.checked_add(1) {
            Some(n) if n != UNKNOWN_CLIP_SERIAL => n,
            _ => 1,
        };
        self.next_clip_serial.set(next);
        serial
    }

    pub(crate) fn current_clip_serial(&self) -> u32 {
        self.current_clip_serial.get()
    }

    /// Remove any native clip, tagging the unclipped state `serial`.
    pub(crate) fn reset_clip(&self, serial: u32) -> Result<()> {
        self.check_drawable()?;
        let r = self.call(|b| match b.clip_support() {
            ClipSupport::None => Ok(()),
            ClipSupport::Region => b.set_clip_region(None),
            ClipSupport::Path => b.intersect_clip_path(None),
        });
        self.status.record(r)?;
        self.current_clip_serial.set(serial);
        Ok(())
    }

    /// Replace the native clip by `region`, tagging it `serial`.
    pub(crate) fn set_clip_region(&self, region: &Region, serial: u32) -> Result<()> {
        self.check_drawable()?;
        let r = self.call(|b| b.set_clip_region(Some(region)));
        self.status.record(r)?;
        self.current_clip_serial.set(serial);
        Ok(())
    }

    /// Intersect the native clip with `path`, tagging the result `serial`.
    pub(crate) fn intersect_clip_path(&self, path: &ClipPath, serial: u32) -> Result<()> {
        self.check_drawable()?;
        let r = self.call(|b| b.intersect_clip_path(Some(path)));
        self.status.record(r)?;
        self.current_clip_serial.set(serial);
        Ok(())
    }

    /// Composite `src` through `mask` onto `rect`.
    ///
    /// For unbounded operators the parts of `rect` outside the source and mask
    /// footprints are cleared afterwards.
    pub fn composite(
        self: &Rc<Self>,
        op: Operator,
        src: &DevicePattern,
        mask: Option<&DevicePattern>,
        rect: &CompositeRect,
    ) -> Result<()> {
        self.check_drawable()?;
        if rect.width <= 0 || rect.height <= 0 {
            return Ok(());
        }
        let src_owned = self.detach(src)?;
        let src = src_owned.as_ref().unwrap_or(src);
        let mask_owned = match mask {
            Some(m) => self.detach(m)?,
            None => None,
        };
        let mask = mask_owned.as_ref().or(mask);

        let r = match self.call(|b| b.composite(op, src, mask, rect)) {
            Err(Error::Unsupported) => {
                debug!("composite: fallback");
                fallback::composite(self, op, src, mask, rect)
            }
            r => r,
        };
        self.status.record(r)?;
        if !op.is_bounded() {
            self.clear_unbounded(src, mask, rect)?;
        }
        Ok(())
    }

    fn clear_unbounded(
        self: &Rc<Self>,
        src: &DevicePattern,
        mask: Option<&DevicePattern>,
        rect: &CompositeRect,
    ) -> Result<()> {
        let dst = rect.dst_rect();
        let mut drawn = dst;
        if let Some(fp) = src.footprint() {
            let fp = fp.translate(rect.dst_x - rect.src_x, rect.dst_y - rect.src_y);
            drawn = drawn.intersect(&fp);
        }
        if let Some(fp) = mask.and_then(DevicePattern::footprint) {
            drawn =
                drawn.intersect(&fp.translate(rect.dst_x - rect.mask_x, rect.dst_y - rect.mask_y));
        }
        if drawn == dst {
            return Ok(());
        }
        let mut outside = Region::from_rect(dst);
        outside.subtract_rect(&drawn);
        debug!("clear {} rectangles outside unbounded footprint", outside.rects().len());
        self.fill_rectangles(Operator::Source, Color::TRANSPARENT, outside.rects())
    }

    pub fn fill_rectangles(
        self: &Rc<Self>,
        op: Operator,
        color: Color,
        rects: &[IntRect],
    ) -> Result<()> {
        self.check_drawable()?;
        if rects.iter().all(IntRect::is_empty) {
            return Ok(());
        }
        let r = match self.call(|b| b.fill_rectangles(op, color, rects)) {
            Err(Error::Unsupported) => {
                debug!("fill_rectangles: fallback");
                fallback::fill_rectangles(self, op, color, rects)
            }
            r => r,
        };
        self.status.record(r)
    }

    pub fn composite_trapezoids(
        self: &Rc<Self>,
        op: Operator,
        src: &DevicePattern,
        antialias: Antialias,
        rect: &CompositeRect,
        traps: &Traps,
    ) -> Result<()> {
        self.check_drawable()?;
        if rect.width <= 0 || rect.height <= 0 {
            return Ok(());
        }
        let src_owned = self.detach(src)?;
        let src = src_owned.as_ref().unwrap_or(src);
        let r = match self.call(|b| b.composite_trapezoids(op, src, antialias, rect, traps)) {
            Err(Error::Unsupported) => {
                debug!("composite_trapezoids: fallback");
                fallback::composite_trapezoids(self, op, src, antialias, rect, traps)
            }
            r => r,
        };
        self.status.record(r)
    }

    /// Native glyph drawing, `Unsupported` when the backend has none.
    pub(crate) fn show_glyphs(
        self: &Rc<Self>,
        op: Operator,
        src: &DevicePattern,
        glyphs: &[Glyph],
        font: &dyn ScaledFont,
    ) -> Result<()> {
        self.check_drawable()?;
        let src_owned = self.detach(src)?;
        let src = src_owned.as_ref().unwrap_or(src);
        let r = self.call(|b| b.show_glyphs(op, src, glyphs, font));
        self.status.record(r)
    }

    /// Native path filling, `Unsupported` when the backend has none.
    pub(crate) fn fill_path(
        self: &Rc<Self>,
        op: Operator,
        src: &DevicePattern,
        path: &tiny_skia::Path,
        fill_rule: FillRule,
        tolerance: f64,
        antialias: Antialias,
    ) -> Result<()> {
        self.check_drawable()?;
        let src_owned = self.detach(src)?;
        let src = src_owned.as_ref().unwrap_or(src);
        let r = self.call(|b| b.fill_path(op, src, path, fill_rule, tolerance, antialias));
        self.status.record(r)
    }
}
