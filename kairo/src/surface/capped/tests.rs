use super::*;
use crate::{
    clip::{Clip, ClipMode},
    pattern::acquire::acquire,
};
use tiny_skia::PathBuilder;

fn capped(caps: Capabilities, clip_support: ClipSupport) -> SurfaceRef {
    CappedSurface::create(Format::Argb32, 8, 8, caps, clip_support)
}

fn pixel(s: &SurfaceRef, x: i32, y: i32) -> [u8; 4] {
    let snap = s.snapshot().unwrap();
    let image = snap.image().unwrap();
    image.pixel(x, y).unwrap()
}

/// Clip `s` natively to its left half.
fn clip_left_half(s: &SurfaceRef) {
    let mut clip = Clip::new(s);
    let path = PathBuilder::from_rect(tiny_skia::Rect::from_xywh(0.0, 0.0, 4.0, 8.0).unwrap());
    clip.intersect_path(s, &path, FillRule::Winding, 0.1, Antialias::None)
        .unwrap();
    assert!(matches!(clip.mode(), ClipMode::Path(_)));
    clip.apply(s).unwrap();
}

#[test]
fn reports_capabilities() {
    let s = capped(Capabilities::COMPOSITE | Capabilities::FILL_RECTANGLES, ClipSupport::Path);
    let b = s.backend::<CappedSurface>().unwrap();
    assert!(b.capabilities().contains(Capabilities::COMPOSITE));
    assert!(!b.capabilities().contains(Capabilities::COMPOSITE_TRAPEZOIDS));
    drop(b);
    assert_eq!(ClipSupport::Path, s.clip_support());
    assert_eq!(Some(IntRect::new(0, 0, 8, 8)), s.extents());
}

#[test]
fn invalid_size_is_nil() {
    let s = CappedSurface::create(
        Format::Argb32,
        -1,
        8,
        Capabilities::all(),
        ClipSupport::None,
    );
    assert_eq!(Err(Error::InvalidSize), s.status());
}

#[test]
fn declined_operations_fall_back() {
    let native = capped(Capabilities::all(), ClipSupport::None);
    let fallback = capped(Capabilities::empty(), ClipSupport::None);
    for s in [&native, &fallback] {
        s.fill_rectangles(Operator::Over, Color::WHITE, &[IntRect::new(2, 2, 3, 3)])
            .unwrap();
    }
    assert_eq!([255; 4], pixel(&native, 3, 3));
    assert_eq!([255; 4], pixel(&fallback, 3, 3));
    assert_eq!([0; 4], pixel(&fallback, 6, 6));
}

#[test]
fn region_clip_needs_region_support() {
    let region = Region::from_rect(IntRect::new(0, 0, 2, 2));
    let mut none = CappedSurface::new(
        ImageSurface::new(Format::Argb32, 4, 4).unwrap(),
        Capabilities::all(),
        ClipSupport::None,
    );
    assert_eq!(Err(Error::Unsupported), none.set_clip_region(Some(&region)));
    assert_eq!(Err(Error::Unsupported), none.intersect_clip_path(None));

    let s = capped(Capabilities::all(), ClipSupport::Region);
    s.set_clip_region(&region, 1).unwrap();
    s.fill_rectangles(Operator::Source, Color::WHITE, &[IntRect::new(0, 0, 8, 8)])
        .unwrap();
    assert_eq!([255; 4], pixel(&s, 1, 1));
    assert_eq!([0; 4], pixel(&s, 5, 5));
}

#[test]
fn path_clip_masks_native_and_fallback_writes() {
    for caps in [Capabilities::all(), Capabilities::empty()] {
        let s = capped(caps, ClipSupport::Path);
        clip_left_half(&s);
        s.fill_rectangles(Operator::Source, Color::WHITE, &[IntRect::new(0, 0, 8, 8)])
            .unwrap();
        assert_eq!([255; 4], pixel(&s, 1, 1), "{caps:?}");
        assert_eq!([0; 4], pixel(&s, 6, 1), "{caps:?}");
    }
}

#[test]
fn path_clip_reset() {
    let s = capped(Capabilities::all(), ClipSupport::Path);
    clip_left_half(&s);
    s.reset_clip(0).unwrap();
    s.fill_rectangles(Operator::Source, Color::WHITE, &[IntRect::new(0, 0, 8, 8)])
        .unwrap();
    assert_eq!([255; 4], pixel(&s, 6, 1));
}

#[test]
fn dest_image_is_a_private_copy() {
    let s = capped(Capabilities::empty(), ClipSupport::None);
    let dest = s.acquire_dest_image(IntRect::new(2, 2, 10, 10)).unwrap().unwrap();
    assert_eq!(IntRect::new(2, 2, 6, 6), dest.rect);
    assert!(dest.image.image().is_ok());
    s.release_dest_image(dest).unwrap();

    assert!(s.acquire_dest_image(IntRect::new(20, 20, 2, 2)).unwrap().is_none());
}

#[test]
fn clone_similar_keeps_pixels() {
    let src = ImageSurface::create(Format::Argb32, 2, 2);
    src.fill_rectangles(Operator::Source, Color::WHITE, &[IntRect::new(0, 0, 1, 1)])
        .unwrap();
    let mut dst = CappedSurface::new(
        ImageSurface::new(Format::Argb32, 4, 4).unwrap(),
        Capabilities::CLONE_SIMILAR,
        ClipSupport::None,
    );
    let pattern = DevicePattern::for_surface_at(&src, 0, 0);
    let acquired = acquire(&pattern, &mut dst, IntRect::new(0, 0, 2, 2)).unwrap();
    assert_eq!([255; 4], pixel(&acquired.surface, 0, 0));
    assert_eq!([0; 4], pixel(&acquired.surface, 1, 1));
}
