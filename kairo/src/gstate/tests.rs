use super::*;
use crate::{
    option::ContextOptionBuilder,
    pattern::PatternKind,
    surface::image::{Format, ImageSurface},
};
use assert_approx_eq::assert_approx_eq;
use test_case::test_case;
use test_log::test;
use tiny_skia::Rect;

fn target() -> SurfaceRef {
    ImageSurface::create(Format::Argb32, 20, 20)
}

fn gstate(target: &SurfaceRef) -> GState {
    GState::new(target, &ContextOption::default())
}

fn pixel(s: &SurfaceRef, x: i32, y: i32) -> [u8; 4] {
    s.image().unwrap().pixel(x, y).unwrap()
}

fn square(x: f32, y: f32, size: f32) -> Path {
    PathBuilder::from_rect(Rect::from_xywh(x, y, size, size).unwrap())
}

/// Unit square glyphs, scaled to `size` pixels.
#[derive(Debug)]
struct SquareFont {
    id: u64,
    size: f64,
}

impl ScaledFont for SquareFont {
    fn id(&self) -> u64 {
        self.id
    }

    fn glyph_path(&self, index: u32) -> Option<Path> {
        (index != 0).then(|| square(0.0, 0.0, 1.0))
    }

    fn font_matrix(&self) -> Matrix {
        Matrix::scale(self.size, self.size)
    }
}

#[test]
fn initial_state_follows_option() {
    let s = target();
    let option = ContextOptionBuilder::new()
        .operator(Operator::Source)
        .line_width(3.0)
        .line_cap(LineCap::Round)
        .build();
    let gs = GState::new(&s, &option);
    assert_eq!(Operator::Source, gs.operator());
    assert_eq!(3.0, gs.line_width());
    assert_eq!(3.0, gs.pen().width);
    assert_eq!(tiny_skia::LineCap::Round, gs.pen().line_cap);
    assert!(matches!(gs.source().kind(), PatternKind::Solid(c) if *c == Color::BLACK));
    assert!(gs.font().is_none());
}

#[test_case(&[-1.0, 2.0]; "negative")]
#[test_case(&[0.0, 0.0]; "all zero")]
#[test_case(&[f64::NAN]; "nan")]
fn invalid_dash(dash: &[f64]) {
    let s = target();
    let mut gs = gstate(&s);
    gs.set_dash(&[4.0, 2.0], 1.0).unwrap();
    assert_eq!(Err(Error::InvalidDash), gs.set_dash(dash, 0.0));
    assert_eq!((&[4.0, 2.0][..], 1.0), gs.dash());
}

#[test]
fn dash_reaches_pen() {
    let s = target();
    let mut gs = gstate(&s);
    gs.set_dash(&[3.0], 0.0).unwrap();
    assert!(gs.pen().dash.is_some());
    gs.set_dash(&[0.0, 2.0], 0.0).unwrap();
    assert!(gs.pen().dash.is_some());
    gs.set_dash(&[], 0.0).unwrap();
    assert!(gs.pen().dash.is_none());
}

#[test]
fn transforms_prepend() {
    let s = target();
    let mut gs = gstate(&s);
    gs.translate(10.0, 0.0).unwrap();
    gs.scale(2.0, 2.0).unwrap();
    let p = gs.matrix().transform_point(UserPoint::new(1.0, 1.0));
    assert_approx_eq!(12.0, p.x);
    assert_approx_eq!(2.0, p.y);
    let back = gs
        .inverse_matrix()
        .transform_point(euclid::point2(12.0, 2.0));
    assert_approx_eq!(1.0, back.x);
    assert_approx_eq!(1.0, back.y);
}

#[test]
fn rotate_quarter_turn() {
    let s = target();
    let mut gs = gstate(&s);
    gs.rotate(std::f64::consts::FRAC_PI_2).unwrap();
    let p = gs.matrix().transform_point(UserPoint::new(1.0, 0.0));
    assert_approx_eq!(0.0, p.x);
    assert_approx_eq!(1.0, p.y);
}

#[test]
fn singular_transforms_are_rejected() {
    let s = target();
    let mut gs = gstate(&s);
    gs.translate(5.0, 5.0).unwrap();
    let before = *gs.matrix();
    assert_eq!(Err(Error::InvalidMatrix), gs.scale(0.0, 1.0));
    assert_eq!(Err(Error::InvalidMatrix), gs.transform(&Matrix::scale(1.0, 0.0)));
    assert_eq!(
        Err(Error::InvalidMatrix),
        gs.set_matrix(&UserToDevice::new(1.0, 2.0, 2.0, 4.0, 0.0, 0.0))
    );
    assert_eq!(before, *gs.matrix());
    gs.identity_matrix();
    assert_eq!(UserToDevice::identity(), *gs.matrix());
}

#[test]
fn device_offset_joins_ctm() {
    let s = target();
    s.set_device_offset(3.0, 4.0);
    let gs = gstate(&s);
    let p = gs.device_matrix().transform_point(UserPoint::new(1.0, 1.0));
    assert_eq!((4.0, 5.0), (p.x, p.y));
    let u = gs.device_inverse().transform_point(euclid::point2(4.0, 5.0));
    assert_eq!((1.0, 1.0), (u.x, u.y));
}

#[test]
fn clone_shares_source() {
    let s = target();
    let mut gs = gstate(&s);
    gs.set_dash(&[1.0, 1.0], 0.0).unwrap();
    let copy = gs.try_clone().unwrap();
    assert!(Rc::ptr_eq(gs.source(), copy.source()));
    assert!(Rc::ptr_eq(gs.target(), copy.target()));
    assert_eq!(gs.dash(), copy.dash());
    gs.set_line_width(7.0);
    assert_eq!(2.0, copy.line_width());
}

#[test]
fn paint_covers_clip() {
    let s = target();
    let mut gs = gstate(&s);
    gs.clip(Some(&square(5.0, 5.0, 5.0))).unwrap();
    gs.paint().unwrap();
    assert_eq!([0, 0, 0, 255], pixel(&s, 7, 7));
    assert_eq!([0; 4], pixel(&s, 2, 2));
}

#[test]
fn paint_with_alpha_scales_source() {
    let s = target();
    let gs = gstate(&s);
    gs.paint_with_alpha(0.5).unwrap();
    for (x, y) in [(0, 0), (19, 19)] {
        let p = pixel(&s, x, y);
        assert_eq!([0, 0, 0], [p[0], p[1], p[2]]);
        assert!((127..=128).contains(&p[3]), "{p:?}");
    }
}

#[test]
fn fill_with_source_color() {
    let s = target();
    let mut gs = gstate(&s);
    gs.set_source(Rc::new(Pattern::rgb(0.0, 1.0, 0.0)));
    gs.fill(&square(2.0, 2.0, 4.0)).unwrap();
    assert_eq!([0, 255, 0, 255], pixel(&s, 3, 3));
    assert_eq!([0; 4], pixel(&s, 8, 8));
}

#[test]
fn stroke_leaves_interior() {
    let s = target();
    let mut gs = gstate(&s);
    gs.set_line_width(2.0);
    gs.stroke(&square(4.0, 4.0, 12.0)).unwrap();
    assert_eq!([0, 0, 0, 255], pixel(&s, 4, 10));
    assert_eq!([0; 4], pixel(&s, 10, 10));
}

#[test]
fn hit_testing_in_user_space() {
    let s = target();
    let mut gs = gstate(&s);
    gs.scale(2.0, 2.0).unwrap();
    // device space square 4..12, user space 2..6
    let path = square(4.0, 4.0, 8.0);
    assert!(gs.in_fill(&path, 3.0, 3.0));
    assert!(!gs.in_fill(&path, 7.0, 3.0));
    assert!(gs.in_stroke(&path, 2.0, 4.0).unwrap());
    assert!(!gs.in_stroke(&path, 4.0, 4.0).unwrap());
}

#[test]
fn extents_in_user_space() {
    let s = target();
    let mut gs = gstate(&s);
    gs.scale(2.0, 2.0).unwrap();
    let path = square(4.0, 4.0, 8.0);
    let fill = gs.fill_extents(&path);
    assert_approx_eq!(2.0, fill.min.x);
    assert_approx_eq!(6.0, fill.max.y);
    let stroke = gs.stroke_extents(&path).unwrap();
    // line width 2 in user space is 4 device pixels
    assert_approx_eq!(1.0, stroke.min.x, 1e-3);
    assert_approx_eq!(7.0, stroke.max.x, 1e-3);
}

#[test]
fn empty_clip_hides_everything() {
    let s = target();
    let mut gs = gstate(&s);
    gs.clip(None).unwrap();
    assert!(gs.device_clip_extents().is_empty());
    assert_eq!(UserBox::zero(), gs.clip_extents());
    gs.paint().unwrap();
    assert_eq!([0; 4], pixel(&s, 0, 0));
    gs.reset_clip();
    assert_eq!(IntRect::new(0, 0, 20, 20), gs.device_clip_extents());
}

#[test]
fn clip_extents_follow_ctm() {
    let s = target();
    let mut gs = gstate(&s);
    gs.clip(Some(&square(4.0, 4.0, 8.0))).unwrap();
    gs.scale(2.0, 2.0).unwrap();
    let e = gs.clip_extents();
    assert_approx_eq!(2.0, e.min.x);
    assert_approx_eq!(6.0, e.max.x);
}

#[test]
fn glyphs_need_a_font() {
    let s = target();
    let gs = gstate(&s);
    let glyphs = [Glyph {
        index: 1,
        x: 0.0,
        y: 0.0,
    }];
    assert_eq!(Err(Error::NullPointer), gs.show_glyphs(&glyphs));
}

#[test]
fn glyph_outlines_are_filled() {
    let s = target();
    let mut gs = gstate(&s);
    gs.set_font(Rc::new(SquareFont {
        id: 0x6773_0001,
        size: 4.0,
    }));
    let glyphs = [
        Glyph {
            index: 1,
            x: 2.0,
            y: 2.0,
        },
        // blank
        Glyph {
            index: 0,
            x: 10.0,
            y: 2.0,
        },
        Glyph {
            index: 1,
            x: 14.0,
            y: 2.0,
        },
    ];
    gs.show_glyphs(&glyphs).unwrap();
    assert_eq!([0, 0, 0, 255], pixel(&s, 3, 3));
    assert_eq!([0; 4], pixel(&s, 11, 3));
    assert_eq!([0, 0, 0, 255], pixel(&s, 15, 3));
    assert_eq!([0; 4], pixel(&s, 3, 8));
}
