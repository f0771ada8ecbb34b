//! In-memory image surfaces backed by tiny-skia pixmaps and masks.

use super::{Backend, ClipSupport, CompositeRect, Content, DestImage, Surface, SurfaceRef};
use crate::{
    color::{in_alpha, lerp, Color, Pixel, TRANSPARENT_PIXEL},
    error::{Error, Result},
    geom::IntRect,
    operator::Operator,
    pattern::{
        acquire::{acquire, acquire_pair, SurfaceAttributes},
        DevicePattern, Extend,
    },
    raster::{self, Antialias},
    region::Region,
    traps::Traps,
};
use euclid::Point2D;
use image::{Rgba, RgbaImage};
use std::any::Any;
use tiny_skia::{Mask, Pixmap, PremultipliedColorU8};

#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum Format {
    Argb32,
    A8,
}

impl Format {
    pub fn for_content(content: Content) -> Self {
        match content {
            Content::Alpha => Format::A8,
            Content::Color | Content::ColorAlpha => Format::Argb32,
        }
    }

    pub fn content(self) -> Content {
        match self {
            Format::Argb32 => Content::ColorAlpha,
            Format::A8 => Content::Alpha,
        }
    }
}

#[derive(Clone, Debug)]
enum Pixels {
    Color(Pixmap),
    Alpha(Mask),
}

/// Image backend, draws every operation natively.
#[derive(Clone, Debug)]
pub struct ImageSurface {
    pixels: Pixels,
    width: i32,
    height: i32,
    clip: Option<Region>,
}

impl ImageSurface {
    pub fn new(format: Format, width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidSize);
        }
        let (w, h) = (width as u32, height as u32);
        let pixels = match format {
            Format::Argb32 => Pixels::Color(Pixmap::new(w, h).ok_or(Error::InvalidSize)?),
            Format::A8 => Pixels::Alpha(Mask::new(w, h).ok_or(Error::InvalidSize)?),
        };
        Ok(Self {
            pixels,
            width,
            height,
            clip: None,
        })
    }

    /// New image surface, a nil surface if the size is invalid.
    pub fn create(format: Format, width: i32, height: i32) -> SurfaceRef {
        match Self::new(format, width, height) {
            Ok(image) => Surface::from_backend(Box::new(image)),
            Err(e) => Surface::nil(e),
        }
    }

    pub fn from_pixmap(pixmap: Pixmap) -> SurfaceRef {
        let (width, height) = (pixmap.width() as i32, pixmap.height() as i32);
        Surface::from_backend(Box::new(Self {
            pixels: Pixels::Color(pixmap),
            width,
            height,
            clip: None,
        }))
    }

    pub fn format(&self) -> Format {
        match self.pixels {
            Pixels::Color(_) => Format::Argb32,
            Pixels::Alpha(_) => Format::A8,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bounds(&self) -> IntRect {
        IntRect::new(0, 0, self.width, self.height)
    }

    /// Premultiplied RGBA of a pixel, alpha images read as black.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Pixel> {
        self.bounds().contains(x, y).then(|| self.get(x, y))
    }

    pub(crate) fn try_clone(&self) -> Result<Self> {
        self.copy_rect(self.bounds())
    }

    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn get(&self, x: i32, y: i32) -> Pixel {
        let i = self.index(x, y);
        match &self.pixels {
            Pixels::Color(p) => {
                let d = &p.data()[i * 4..i * 4 + 4];
                [d[0], d[1], d[2], d[3]]
            }
            Pixels::Alpha(m) => [0, 0, 0, m.data()[i]],
        }
    }

    fn put(&mut self, x: i32, y: i32, v: Pixel) {
        let i = self.index(x, y);
        match &mut self.pixels {
            Pixels::Color(p) => p.data_mut()[i * 4..i * 4 + 4].copy_from_slice(&v),
            Pixels::Alpha(m) => m.data_mut()[i] = v[3],
        }
    }

    /// Write a pixel ignoring the clip.
    pub(crate) fn set_pixel(&mut self, x: i32, y: i32, v: Pixel) {
        if self.bounds().contains(x, y) {
            self.put(x, y, v);
        }
    }

    /// New image of the same format holding `rect` of this one, pixels
    /// outside the bounds read transparent.
    pub(crate) fn copy_rect(&self, rect: IntRect) -> Result<Self> {
        let mut r = Self::new(self.format(), rect.width, rect.height)?;
        let area = rect.intersect(&self.bounds());
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                r.put(x - rect.x, y - rect.y, self.get(x, y));
            }
        }
        Ok(r)
    }

    /// Copy `src` to `(x, y)` through the clip, moving each pixel from its
    /// current value towards `src` by `coverage`.
    pub(crate) fn draw_image(
        &mut self,
        src: &ImageSurface,
        x: i32,
        y: i32,
        coverage: impl Fn(i32, i32) -> u8,
    ) {
        let area = src.bounds().translate(x, y);
        for r in self.writable(area) {
            for dy in r.y..r.bottom() {
                for dx in r.x..r.right() {
                    let s = src.get(dx - x, dy - y);
                    let v = lerp(self.get(dx, dy), s, coverage(dx, dy));
                    self.put(dx, dy, v);
                }
            }
        }
    }

    /// Parts of `area` inside the image and the clip.
    fn writable(&self, area: IntRect) -> Vec<IntRect> {
        let area = area.intersect(&self.bounds());
        if area.is_empty() {
            return Vec::new();
        }
        match &self.clip {
            None => vec![area],
            Some(clip) => clip
                .rects()
                .iter()
                .map(|r| r.intersect(&area))
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    fn blend_area(
        &mut self,
        op: Operator,
        area: IntRect,
        src: impl Fn(i32, i32) -> Pixel,
        coverage: impl Fn(i32, i32) -> u8,
    ) {
        for r in self.writable(area) {
            for y in r.y..r.bottom() {
                for x in r.x..r.right() {
                    let s = in_alpha(src(x, y), coverage(x, y));
                    let d = self.get(x, y);
                    self.put(x, y, op.blend(s, d));
                }
            }
        }
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let [r, g, b, a] = self.get(x as i32, y as i32);
            let c = PremultipliedColorU8::from_rgba(r, g, b, a)
                .map_or([0; 4], |c| {
                    let c = c.demultiply();
                    [c.red(), c.green(), c.blue(), c.alpha()]
                });
            Rgba(c)
        })
    }
}

fn reflect(v: i32, n: i32) -> i32 {
    let m = v.rem_euclid(2 * n);
    if m < n {
        m
    } else {
        2 * n - 1 - m
    }
}

/// Reads an acquired surface the way its attributes place it.
pub(crate) struct Sampler<'a> {
    image: &'a ImageSurface,
    attrs: SurfaceAttributes,
    identity: bool,
}

impl<'a> Sampler<'a> {
    pub(crate) fn new(image: &'a ImageSurface, attrs: SurfaceAttributes) -> Self {
        Self {
            image,
            identity: attrs.matrix == euclid::Transform2D::identity(),
            attrs,
        }
    }

    fn fetch(&self, x: i32, y: i32) -> Pixel {
        let (w, h) = (self.image.width, self.image.height);
        let (x, y) = match self.attrs.extend {
            Extend::None => {
                if !self.image.bounds().contains(x, y) {
                    return TRANSPARENT_PIXEL;
                }
                (x, y)
            }
            Extend::Pad => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
            Extend::Repeat => (x.rem_euclid(w), y.rem_euclid(h)),
            Extend::Reflect => (reflect(x, w), reflect(y, h)),
        };
        self.image.get(x, y)
    }

    /// Sample for pattern device pixel `(x, y)`.
    pub(crate) fn at(&self, x: i32, y: i32) -> Pixel {
        let (x, y) = (x + self.attrs.x_offset, y + self.attrs.y_offset);
        if self.identity {
            return self.fetch(x, y);
        }
        let p = self
            .attrs
            .matrix
            .transform_point(Point2D::new(x as f64 + 0.5, y as f64 + 0.5));
        if self.attrs.filter.is_nearest() {
            return self.fetch(p.x.floor() as i32, p.y.floor() as i32);
        }
        let (fx, fy) = (p.x - 0.5, p.y - 0.5);
        let (x0, y0) = (fx.floor(), fy.floor());
        let (wx, wy) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i32, y0 as i32);
        let (a, b) = (self.fetch(x0, y0), self.fetch(x0 + 1, y0));
        let (c, d) = (self.fetch(x0, y0 + 1), self.fetch(x0 + 1, y0 + 1));
        std::array::from_fn(|i| {
            let top = a[i] as f64 * (1.0 - wx) + b[i] as f64 * wx;
            let bottom = c[i] as f64 * (1.0 - wx) + d[i] as f64 * wx;
            (top * (1.0 - wy) + bottom * wy + 0.5) as u8
        })
    }
}

impl Backend for ImageSurface {
    fn content(&self) -> Content {
        self.format().content()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn acquire_source_image(&mut self, this: &SurfaceRef) -> Result<SurfaceRef> {
        Ok(SurfaceRef::clone(this))
    }

    fn acquire_dest_image(
        &mut self,
        this: &SurfaceRef,
        interest: IntRect,
    ) -> Result<Option<DestImage>> {
        if interest.intersect(&self.bounds()).is_empty() {
            return Ok(None);
        }
        Ok(Some(DestImage {
            image: SurfaceRef::clone(this),
            rect: self.bounds(),
        }))
    }

    fn release_dest_image(&mut self, _image: DestImage) -> Result<()> {
        Ok(())
    }

    fn extents(&self) -> Option<IntRect> {
        Some(self.bounds())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn consumes_images(&self) -> bool {
        true
    }

    fn clip_support(&self) -> ClipSupport {
        ClipSupport::Region
    }

    fn set_clip_region(&mut self, region: Option<&Region>) -> Result<()> {
        self.clip = region.map(Region::try_clone).transpose()?;
        Ok(())
    }

    fn create_similar(&mut self, content: Content, width: i32, height: i32) -> Result<SurfaceRef> {
        let image = Self::new(Format::for_content(content), width, height)?;
        Ok(Surface::from_backend(Box::new(image)))
    }

    fn composite(
        &mut self,
        op: Operator,
        src: &DevicePattern,
        mask: Option<&DevicePattern>,
        rect: &CompositeRect,
    ) -> Result<()> {
        let (src_acq, mask_acq) = acquire_pair(src, mask, self, rect)?;
        let mut area = rect.dst_rect();
        // pixels outside the footprints are left alone, surface dispatch
        // clears them for unbounded operators
        if let Some(fp) = src.footprint() {
            area = area.intersect(&fp.translate(rect.dst_x - rect.src_x, rect.dst_y - rect.src_y));
        }
        if let Some(fp) = mask.and_then(DevicePattern::footprint) {
            let fp = fp.translate(rect.dst_x - rect.mask_x, rect.dst_y - rect.mask_y);
            area = area.intersect(&fp);
        }
        if area.is_empty() {
            return Ok(());
        }

        let src_image = src_acq.surface.image()?;
        let src = Sampler::new(&src_image, src_acq.attrs);
        let (sx, sy) = (rect.src_x - rect.dst_x, rect.src_y - rect.dst_y);
        match &mask_acq {
            None => self.blend_area(op, area, |x, y| src.at(x + sx, y + sy), |_, _| 255),
            Some(m) => {
                let mask_image = m.surface.image()?;
                let mask = Sampler::new(&mask_image, m.attrs);
                let (mx, my) = (rect.mask_x - rect.dst_x, rect.mask_y - rect.dst_y);
                self.blend_area(
                    op,
                    area,
                    |x, y| src.at(x + sx, y + sy),
                    |x, y| mask.at(x + mx, y + my)[3],
                );
            }
        }
        Ok(())
    }

    fn fill_rectangles(&mut self, op: Operator, color: Color, rects: &[IntRect]) -> Result<()> {
        let pixel = color.to_pixel();
        for r in rects {
            self.blend_area(op, *r, |_, _| pixel, |_, _| 255);
        }
        Ok(())
    }

    fn composite_trapezoids(
        &mut self,
        op: Operator,
        src: &DevicePattern,
        antialias: Antialias,
        rect: &CompositeRect,
        traps: &Traps,
    ) -> Result<()> {
        let rect = rect.restrict(self.bounds());
        let area = rect.dst_rect();
        if area.is_empty() {
            return Ok(());
        }
        let coverage = raster::coverage(traps, area, antialias)?;
        let cov = coverage.data();
        let src_acq = acquire(src, self, rect.src_rect())?;
        let src_image = src_acq.surface.image()?;
        let src = Sampler::new(&src_image, src_acq.attrs);
        let (sx, sy) = (rect.src_x - rect.dst_x, rect.src_y - rect.dst_y);
        let stride = area.width as usize;
        self.blend_area(
            op,
            area,
            |x, y| src.at(x + sx, y + sy),
            |x, y| cov[(y - area.y) as usize * stride + (x - area.x) as usize],
        );
        Ok(())
    }
}
