use super::*;
use crate::surface::{
    capped::{Capabilities, CappedSurface},
    image::{Format, ImageSurface},
};
use test_case::test_case;
use test_log::test;
use tiny_skia::{PathBuilder, Rect};

fn rect_path(x: f32, y: f32, w: f32, h: f32) -> Path {
    PathBuilder::from_rect(Rect::from_xywh(x, y, w, h).unwrap())
}

fn circle(cx: f32, cy: f32, r: f32) -> Path {
    PathBuilder::from_circle(cx, cy, r).unwrap()
}

fn intersect(clip: &mut Clip, target: &SurfaceRef, path: &Path) {
    clip.intersect_path(target, path, FillRule::Winding, 0.1, Antialias::None)
        .unwrap();
}

fn image() -> SurfaceRef {
    ImageSurface::create(Format::Argb32, 100, 100)
}

fn capped(support: ClipSupport) -> SurfaceRef {
    CappedSurface::create(Format::Argb32, 100, 100, Capabilities::all(), support)
}

fn mask_alpha(clip: &Clip, x: i32, y: i32) -> u8 {
    let m = clip.mask().unwrap();
    let image = m.surface.image().unwrap();
    image.pixel(x - m.rect.x, y - m.rect.y).unwrap()[3]
}

#[test_case(image, "Region")]
#[test_case(|| capped(ClipSupport::None), "Mask")]
#[test_case(|| capped(ClipSupport::Path), "Path")]
fn rectangle_extents(target: fn() -> SurfaceRef, mode: &str) {
    let dst = target();
    let mut clip = Clip::new(&dst);
    assert_eq!(IntRect::new(0, 0, 100, 100), clip.extents(&dst));
    intersect(&mut clip, &dst, &rect_path(25.0, 25.0, 25.0, 25.0));
    assert_eq!(IntRect::new(25, 25, 25, 25), clip.extents(&dst));
    let actual = match clip.mode() {
        ClipMode::None => "None",
        ClipMode::Path(_) => "Path",
        ClipMode::Region(_) => "Region",
        ClipMode::Mask(_) => "Mask",
    };
    assert_eq!(mode, actual);
}

#[test]
fn path_support_builds_chain() {
    let dst = capped(ClipSupport::Path);
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &circle(50.0, 50.0, 20.0));
    intersect(&mut clip, &dst, &rect_path(50.0, 0.0, 50.0, 100.0));
    let ClipMode::Path(head) = clip.mode() else {
        panic!("expected path clip, got {:?}", clip.mode());
    };
    let chain = head.chain();
    assert_eq!(2, chain.len());
    assert!(chain[1].prev().is_some());
    assert!(chain[0].prev().is_none());
    let e = clip.extents(&dst);
    assert_eq!(50, e.x);
    assert!((70..=71).contains(&e.right()), "{e:?}");
}

#[test]
fn mask_mode_is_never_left() {
    let dst = image();
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &circle(50.0, 50.0, 20.0));
    assert!(clip.mask().is_some());
    intersect(&mut clip, &dst, &rect_path(0.0, 0.0, 50.0, 100.0));
    assert!(clip.mask().is_some());
    // left half of the circle survives
    assert_eq!(255, mask_alpha(&clip, 40, 50));
    assert_eq!(0, mask_alpha(&clip, 31, 31));
    assert!(clip.extents(&dst).right() <= 50);
}

#[test]
fn masks_multiply() {
    let dst = image();
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &circle(40.0, 50.0, 20.0));
    intersect(&mut clip, &dst, &circle(60.0, 50.0, 20.0));
    assert_eq!(255, mask_alpha(&clip, 50, 50));
    // in the first circle only
    assert_eq!(0, mask_alpha(&clip, 40, 33));
}

#[test]
fn mask_keeps_previous_region() {
    let dst = image();
    let mut clip = Clip::new(&dst);
    let mut pb = PathBuilder::new();
    pb.push_rect(Rect::from_xywh(0.0, 0.0, 10.0, 20.0).unwrap());
    pb.push_rect(Rect::from_xywh(12.0, 0.0, 8.0, 20.0).unwrap());
    intersect(&mut clip, &dst, &pb.finish().unwrap());
    assert_eq!(2, clip.region().unwrap().rects().len());

    intersect(&mut clip, &dst, &circle(10.0, 10.0, 8.0));
    assert_eq!(255, mask_alpha(&clip, 8, 10));
    // gap between the two rectangles
    assert_eq!(0, mask_alpha(&clip, 11, 10));
    assert_eq!(255, mask_alpha(&clip, 13, 10));
}

#[test_case(image)]
#[test_case(|| capped(ClipSupport::Path))]
#[test_case(|| capped(ClipSupport::None))]
fn disjoint_rectangles_clip_all(target: fn() -> SurfaceRef) {
    let dst = target();
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &rect_path(0.0, 0.0, 10.0, 10.0));
    intersect(&mut clip, &dst, &rect_path(50.0, 50.0, 10.0, 10.0));
    assert!(clip.is_all_clipped());
    assert!(clip.extents(&dst).is_empty());

    // stays empty
    intersect(&mut clip, &dst, &rect_path(0.0, 0.0, 100.0, 100.0));
    assert!(clip.is_all_clipped());
}

#[test]
fn path_outside_target_clips_all() {
    let dst = capped(ClipSupport::None);
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &circle(500.0, 500.0, 10.0));
    assert!(clip.is_all_clipped());
}

#[test]
fn reset_restores_unclipped() {
    let dst = image();
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &rect_path(0.0, 0.0, 10.0, 10.0));
    intersect(&mut clip, &dst, &rect_path(50.0, 50.0, 10.0, 10.0));
    clip.reset();
    assert!(!clip.is_all_clipped());
    assert!(matches!(clip.mode(), ClipMode::None));
    assert_eq!(0, clip.serial());
}

#[test]
fn clone_shares_path_chain() {
    let dst = capped(ClipSupport::Path);
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &circle(50.0, 50.0, 20.0));
    let mut copy = clip.try_clone().unwrap();
    let (ClipMode::Path(a), ClipMode::Path(b)) = (clip.mode(), copy.mode()) else {
        panic!("expected path clips");
    };
    assert!(Rc::ptr_eq(a, b));

    intersect(&mut copy, &dst, &rect_path(0.0, 0.0, 50.0, 100.0));
    let ClipMode::Path(head) = copy.mode() else {
        panic!("expected path clip");
    };
    assert!(Rc::ptr_eq(head.prev().unwrap(), a));
    assert_ne!(clip.serial(), copy.serial());
}

#[test]
fn apply_installs_once() {
    let dst = image();
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &rect_path(10.0, 10.0, 20.0, 20.0));
    assert_ne!(clip.serial(), dst.current_clip_serial());
    clip.apply(&dst).unwrap();
    assert_eq!(clip.serial(), dst.current_clip_serial());
    clip.apply(&dst).unwrap();
    assert_eq!(clip.serial(), dst.current_clip_serial());

    let unclipped = Clip::new(&dst);
    unclipped.apply(&dst).unwrap();
    assert_eq!(0, dst.current_clip_serial());
}

#[test]
fn serials_differ_per_intersection() {
    let dst = image();
    let mut clip = Clip::new(&dst);
    intersect(&mut clip, &dst, &rect_path(0.0, 0.0, 80.0, 80.0));
    let first = clip.serial();
    intersect(&mut clip, &dst, &rect_path(10.0, 10.0, 80.0, 80.0));
    assert_ne!(0, first);
    assert_ne!(first, clip.serial());
    assert_eq!(IntRect::new(10, 10, 70, 70), clip.extents(&dst));
}
