use super::*;
use crate::surface::image::{Format, ImageSurface};
use assert_approx_eq::assert_approx_eq;

#[test]
fn default_extend_by_kind() {
    assert_eq!(Extend::None, Pattern::rgb(1.0, 0.0, 0.0).extend());
    assert_eq!(Extend::Pad, Pattern::linear(0.0, 0.0, 1.0, 0.0).extend());
    let s = ImageSurface::create(Format::Argb32, 2, 2);
    assert_eq!(Extend::None, Pattern::for_surface(&s).extend());
}

#[test]
fn singular_matrix_is_rejected() {
    let mut p = Pattern::rgb(0.0, 0.0, 0.0);
    let m = UserToPattern::translation(3.0, 4.0);
    p.set_matrix(m).unwrap();
    assert_eq!(
        Err(Error::InvalidMatrix),
        p.set_matrix(UserToPattern::scale(0.0, 1.0))
    );
    assert_eq!(&m, p.matrix());
    // a bad argument does not poison the pattern
    assert_eq!(Ok(()), p.status());
}

#[test]
fn color_stops_keep_insertion_order() {
    let mut p = Pattern::linear(0.0, 0.0, 10.0, 0.0);
    p.add_color_stop(0.8, Color::WHITE).unwrap();
    p.add_color_stop(1.5, Color::BLACK).unwrap();
    p.add_color_stop(-1.0, Color::BLACK).unwrap();
    let offsets: Vec<_> = p.color_stops().unwrap().iter().map(|s| s.offset).collect();
    assert_eq!(vec![0.8, 1.0, 0.0], offsets);
}

#[test]
fn color_stop_on_solid_is_type_mismatch() {
    let mut p = Pattern::rgb(0.0, 0.0, 0.0);
    assert_eq!(
        Err(Error::PatternTypeMismatch),
        p.add_color_stop(0.0, Color::WHITE)
    );
    assert_eq!(Err(Error::PatternTypeMismatch), p.color_stops().map(|_| ()));
    assert_eq!(Ok(()), p.status());
}

#[test]
fn nil_pattern_is_sticky() {
    let mut p = Pattern::nil(Error::NoMemory);
    assert_eq!(Err(Error::NoMemory), p.status());
    assert_eq!(
        Err(Error::NoMemory),
        p.set_matrix(UserToPattern::identity())
    );
}

#[test]
fn surface_pattern_of_errored_surface_is_nil() {
    let s = ImageSurface::create(Format::Argb32, 0, 10);
    let p = Pattern::for_surface(&s);
    assert_eq!(Err(Error::InvalidSize), p.status());
}

#[test]
fn resolve_composes_matrices() {
    let mut p = Pattern::rgb(0.0, 0.0, 0.0);
    p.set_matrix(UserToPattern::translation(5.0, 0.0)).unwrap();
    // device is user scaled by 2
    let device_to_user = DeviceToUser::scale(0.5, 0.5);
    let d = DevicePattern::resolve(&p, &device_to_user).unwrap();
    let q = d.matrix.transform_point(euclid::point2(10.0, 10.0));
    assert_approx_eq!(10.0, q.x);
    assert_approx_eq!(5.0, q.y);
}

#[test]
fn footprint_only_for_untransformed_surfaces() {
    let s = ImageSurface::create(Format::Argb32, 10, 20);
    let at = DevicePattern::for_surface_at(&s, 3, 4);
    assert_eq!(Some(IntRect::new(3, 4, 10, 20)), at.footprint());

    let mut repeated = at.clone();
    repeated.extend = Extend::Repeat;
    assert_eq!(None, repeated.footprint());

    let mut scaled = at;
    scaled.matrix = DeviceToPattern::scale(2.0, 2.0);
    assert_eq!(None, scaled.footprint());

    assert_eq!(None, DevicePattern::solid(Color::BLACK).footprint());
}
