/// Premultiplied RGBA pixel, the layout of tiny-skia pixmap data.
pub type Pixel = [u8; 4];

pub const TRANSPARENT_PIXEL: Pixel = [0; 4];

/// Non-premultiplied color with components clamped to `[0, 1]`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new_unchecked(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::new_unchecked(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new_unchecked(1.0, 1.0, 1.0, 1.0);

    const fn new_unchecked(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        let c = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self::new_unchecked(c(red), c(green), c(blue), c(alpha))
    }

    pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::new(red, green, blue, 1.0)
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }

    pub fn is_clear(&self) -> bool {
        self.alpha <= 0.0
    }

    pub fn multiply_alpha(self, alpha: f64) -> Self {
        Self::new(self.red, self.green, self.blue, self.alpha * alpha)
    }

    pub fn to_pixel(self) -> Pixel {
        let q = |v: f64| (v * self.alpha * 255.0 + 0.5) as u8;
        [
            q(self.red),
            q(self.green),
            q(self.blue),
            (self.alpha * 255.0 + 0.5) as u8,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// `a * b / 255` rounded.
#[inline]
pub fn mul_un8(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 128;
    ((t + (t >> 8)) >> 8) as u8
}

/// Scale every channel of `p` by `a`.
#[inline]
pub fn in_alpha(p: Pixel, a: u8) -> Pixel {
    match a {
        255 => p,
        0 => TRANSPARENT_PIXEL,
        _ => p.map(|c| mul_un8(c, a)),
    }
}

/// `dst` moved towards `src` by `t`.
#[inline]
pub fn lerp(dst: Pixel, src: Pixel, t: u8) -> Pixel {
    match t {
        0 => dst,
        255 => src,
        _ => std::array::from_fn(|i| {
            mul_un8(src[i], t).saturating_add(mul_un8(dst[i], 255 - t))
        }),
    }
}
