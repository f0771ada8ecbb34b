use super::*;
use crate::{
    pattern::Pattern,
    surface::{
        capped::{Capabilities, CappedSurface},
        ClipSupport,
    },
};
use test_case::test_case;

fn dst() -> ImageSurface {
    ImageSurface::new(Format::Argb32, 16, 16).unwrap()
}

fn device(p: &Pattern) -> DevicePattern {
    DevicePattern::resolve(p, &Transform2D::identity()).unwrap()
}

fn pixel(a: &Acquired, x: i32, y: i32) -> Pixel {
    a.surface.image().unwrap().pixel(x, y).unwrap()
}

#[test_case(0, Extend::Repeat => Some(0))]
#[test_case(65536, Extend::Repeat => Some(0); "repeat wraps at one")]
#[test_case(-16384, Extend::Repeat => Some(49152))]
#[test_case(65536, Extend::Reflect => Some(65536); "reflect keeps one")]
#[test_case(98304, Extend::Reflect => Some(32768))]
#[test_case(-16384, Extend::Reflect => Some(16384))]
#[test_case(-5, Extend::Pad => Some(0))]
#[test_case(70000, Extend::Pad => Some(65536))]
#[test_case(65536, Extend::None => Some(65536))]
#[test_case(65537, Extend::None => None)]
#[test_case(-1, Extend::None => None)]
fn fold(f: i64, extend: Extend) -> Option<i64> {
    fold_factor(f, extend)
}

#[test]
fn solid_is_repeated_pixel() {
    let p = DevicePattern::solid(Color::new(1.0, 0.0, 0.0, 0.5));
    let a = acquire(&p, &mut dst(), IntRect::new(3, 3, 5, 5)).unwrap();
    assert_eq!(Extend::Repeat, a.attrs.extend);
    assert!(!a.attrs.acquired);
    assert_eq!(IntRect::new(0, 0, 1, 1), a.surface.image().unwrap().bounds());
    assert_eq!([128, 0, 0, 128], pixel(&a, 0, 0));
}

#[test]
fn gradient_with_one_stop_is_solid() {
    let mut p = Pattern::linear(0.0, 0.0, 10.0, 0.0);
    p.add_color_stop(0.3, Color::rgb(0.0, 0.0, 1.0)).unwrap();
    let a = acquire(&device(&p), &mut dst(), IntRect::new(0, 0, 8, 8)).unwrap();
    assert_eq!(Extend::Repeat, a.attrs.extend);
    assert_eq!([0, 0, 255, 255], pixel(&a, 0, 0));
}

#[test]
fn gradient_without_stops_is_transparent() {
    let p = Pattern::radial(5.0, 5.0, 0.0, 5.0, 5.0, 5.0);
    let a = acquire(&device(&p), &mut dst(), IntRect::new(0, 0, 8, 8)).unwrap();
    assert_eq!([0, 0, 0, 0], pixel(&a, 0, 0));
}

fn black_to_white(mut p: Pattern) -> Pattern {
    p.add_color_stop(0.0, Color::BLACK).unwrap();
    p.add_color_stop(1.0, Color::WHITE).unwrap();
    p
}

#[test]
fn horizontal_gradient_is_a_row() {
    let p = black_to_white(Pattern::linear(0.0, 0.0, 10.0, 0.0));
    let rect = IntRect::new(0, 0, 10, 5);
    let a = acquire(&device(&p), &mut dst(), rect).unwrap();
    let image = a.surface.image().unwrap();
    assert_eq!((10, 1), (image.width(), image.height()));
    assert_eq!(Extend::Repeat, a.attrs.extend);
    assert_eq!(Some([13, 13, 13, 255]), image.pixel(0, 0));
    assert_eq!(Some([242, 242, 242, 255]), image.pixel(9, 0));
}

#[test]
fn vertical_gradient_is_a_column() {
    let p = black_to_white(Pattern::linear(0.0, 0.0, 0.0, 10.0));
    let rect = IntRect::new(2, 0, 6, 10);
    let a = acquire(&device(&p), &mut dst(), rect).unwrap();
    let image = a.surface.image().unwrap();
    assert_eq!((1, 10), (image.width(), image.height()));
    assert_eq!((-2, 0), (a.attrs.x_offset, a.attrs.y_offset));
}

#[test]
fn diagonal_gradient_covers_rect() {
    let p = black_to_white(Pattern::linear(0.0, 0.0, 10.0, 10.0));
    let a = acquire(&device(&p), &mut dst(), IntRect::new(0, 0, 4, 6)).unwrap();
    let image = a.surface.image().unwrap();
    assert_eq!((4, 6), (image.width(), image.height()));
    assert_eq!(Extend::Pad, a.attrs.extend);
}

#[test]
fn stops_are_sorted_stably() {
    let mut p = Pattern::linear(0.0, 0.0, 10.0, 0.0);
    p.add_color_stop(1.0, Color::WHITE).unwrap();
    p.add_color_stop(0.5, Color::rgb(1.0, 0.0, 0.0)).unwrap();
    p.add_color_stop(0.5, Color::rgb(0.0, 0.0, 1.0)).unwrap();
    p.add_color_stop(0.0, Color::BLACK).unwrap();
    let a = acquire(&device(&p), &mut dst(), IntRect::new(0, 0, 10, 1)).unwrap();
    let image = a.surface.image().unwrap();
    // left half blends towards red, right half starts from blue
    let left = image.pixel(4, 0).unwrap();
    let right = image.pixel(5, 0).unwrap();
    assert!(left[0] > left[2]);
    assert!(right[2] > right[0]);
}

#[test]
fn repeat_extend_folds_factor() {
    let mut p = black_to_white(Pattern::linear(0.0, 0.0, 4.0, 0.0));
    p.set_extend(Extend::Repeat);
    let a = acquire(&device(&p), &mut dst(), IntRect::new(0, 0, 8, 1)).unwrap();
    let image = a.surface.image().unwrap();
    assert_eq!(image.pixel(1, 0), image.pixel(5, 0));
}

#[test]
fn two_solids_collapse() {
    let src = DevicePattern::solid(Color::rgb(1.0, 0.0, 0.0));
    let mask = DevicePattern::solid(Color::new(0.0, 0.0, 0.0, 0.5));
    let rect = CompositeRect::aligned(IntRect::new(0, 0, 4, 4));
    let (s, m) = acquire_pair(&src, Some(&mask), &mut dst(), &rect).unwrap();
    assert!(m.is_none());
    assert_eq!([128, 0, 0, 128], pixel(&s, 0, 0));
}

#[test]
fn image_destination_borrows_source() {
    let src = ImageSurface::create(Format::Argb32, 4, 4);
    let p = DevicePattern::for_surface_at(&src, 3, 4);
    let a = acquire(&p, &mut dst(), IntRect::new(3, 4, 4, 4)).unwrap();
    assert!(a.attrs.acquired);
    assert!(Rc::ptr_eq(&src, &a.surface));
    assert_eq!((-3, -4), (a.attrs.x_offset, a.attrs.y_offset));
    assert_eq!(DeviceToPattern::identity(), a.attrs.matrix);
}

#[test]
fn non_integer_placement_keeps_matrix() {
    let src = ImageSurface::create(Format::Argb32, 4, 4);
    let mut p = DevicePattern::for_surface_at(&src, 0, 0);
    p.matrix = DeviceToPattern::scale(0.5, 0.5);
    let a = acquire(&p, &mut dst(), IntRect::new(0, 0, 8, 8)).unwrap();
    assert_eq!((0, 0), (a.attrs.x_offset, a.attrs.y_offset));
    assert_eq!(p.matrix, a.attrs.matrix);
}

fn capped_dst(caps: Capabilities) -> CappedSurface {
    CappedSurface::new(dst(), caps, ClipSupport::None)
}

#[test]
fn clone_similar_transfers_ownership() {
    let src = ImageSurface::create(Format::Argb32, 4, 4);
    let p = DevicePattern::for_surface_at(&src, 0, 0);
    let mut dst = capped_dst(Capabilities::CLONE_SIMILAR);
    let a = acquire(&p, &mut dst, IntRect::new(0, 0, 4, 4)).unwrap();
    assert!(!a.attrs.acquired);
    assert!(!Rc::ptr_eq(&src, &a.surface));
    assert!(a.surface.backend::<CappedSurface>().is_ok());
}

#[test]
fn declined_clone_samples_source_image() {
    let src = ImageSurface::create(Format::Argb32, 4, 4);
    let p = DevicePattern::for_surface_at(&src, 0, 0);
    let mut dst = capped_dst(Capabilities::empty());
    let a = acquire(&p, &mut dst, IntRect::new(0, 0, 4, 4)).unwrap();
    assert!(a.attrs.acquired);
    assert!(Rc::ptr_eq(&src, &a.surface));
}
