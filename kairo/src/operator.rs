use crate::color::{mul_un8, Pixel};

/// Compositing operators, Porter-Duff plus `Add` and `Saturate`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, strum::Display, strum::EnumIter)]
pub enum Operator {
    Clear,
    Source,
    #[default]
    Over,
    In,
    Out,
    Atop,
    Dest,
    DestOver,
    DestIn,
    DestOut,
    DestAtop,
    Xor,
    Add,
    Saturate,
}

impl Operator {
    /// False for operators that modify the destination outside the
    /// source and mask footprint.
    pub fn is_bounded(self) -> bool {
        !matches!(
            self,
            Operator::Clear
                | Operator::Source
                | Operator::In
                | Operator::Out
                | Operator::DestIn
                | Operator::DestAtop
        )
    }

    /// Source and destination factors for the given alphas.
    fn factors(self, sa: u8, da: u8) -> (u8, u8) {
        use Operator::*;
        match self {
            Clear => (0, 0),
            Source => (255, 0),
            Over => (255, 255 - sa),
            In => (da, 0),
            Out => (255 - da, 0),
            Atop => (da, 255 - sa),
            Dest => (0, 255),
            DestOver => (255 - da, 255),
            DestIn => (0, sa),
            DestOut => (0, 255 - sa),
            DestAtop => (255 - da, sa),
            Xor => (255 - da, 255 - sa),
            Add => (255, 255),
            Saturate => {
                let room = 255 - da;
                if sa <= room {
                    (255, 255)
                } else {
                    ((room as u32 * 255 / sa as u32) as u8, 255)
                }
            }
        }
    }

    /// Combine one premultiplied source pixel with one destination pixel.
    pub fn blend(self, src: Pixel, dst: Pixel) -> Pixel {
        match self {
            Operator::Source => return src,
            Operator::Dest => return dst,
            Operator::Over if src[3] == 255 => return src,
            Operator::Over if src[3] == 0 => return dst,
            _ => {}
        }
        let (fa, fb) = self.factors(src[3], dst[3]);
        std::array::from_fn(|i| mul_un8(src[i], fa).saturating_add(mul_un8(dst[i], fb)))
    }
}
