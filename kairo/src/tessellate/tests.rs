use super::*;
use crate::{geom::IntRect, region::Region};
use tiny_skia::{PathBuilder, Rect};
use test_case::test_case;

fn rect_path(x: f32, y: f32, w: f32, h: f32) -> Path {
    PathBuilder::from_rect(Rect::from_xywh(x, y, w, h).unwrap())
}

#[test]
fn axis_aligned_rect_is_exact_region() {
    let traps = fill(&rect_path(10.0, 10.0, 20.0, 20.0), FillRule::Winding, 0.1);
    assert_eq!(
        Some(Region::from_rect(IntRect::new(10, 10, 20, 20))),
        traps.extract_region()
    );
}

#[test]
fn triangle_coverage() {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, 0.0);
    pb.line_to(10.0, 10.0);
    pb.line_to(0.0, 10.0);
    pb.close();
    let traps = fill(&pb.finish().unwrap(), FillRule::Winding, 0.1);
    assert_eq!(None, traps.extract_region());
    assert!(traps.contains(1.0, 9.0));
    assert!(!traps.contains(9.0, 1.0));
    assert_eq!(IntRect::new(0, 0, 10, 10), traps.extents());
}

#[test_case(FillRule::Winding, true; "winding fills hole")]
#[test_case(FillRule::EvenOdd, false; "even odd leaves hole")]
fn nested_rects(rule: FillRule, center_filled: bool) {
    let mut pb = PathBuilder::new();
    pb.push_rect(Rect::from_xywh(0.0, 0.0, 30.0, 30.0).unwrap());
    pb.push_rect(Rect::from_xywh(10.0, 10.0, 10.0, 10.0).unwrap());
    let traps = fill(&pb.finish().unwrap(), rule, 0.1);
    assert_eq!(center_filled, traps.contains(15.0, 15.0));
    assert!(traps.contains(5.0, 15.0));
    let area = traps.extract_region().unwrap().area();
    assert_eq!(if center_filled { 900 } else { 800 }, area);
}

#[test]
fn self_intersecting_bowtie() {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, 0.0);
    pb.line_to(10.0, 10.0);
    pb.line_to(10.0, 0.0);
    pb.line_to(0.0, 10.0);
    pb.close();
    let traps = fill(&pb.finish().unwrap(), FillRule::EvenOdd, 0.1);
    assert!(traps.contains(1.0, 5.0));
    assert!(traps.contains(9.0, 5.0));
    assert!(!traps.contains(5.0, 1.0));
    assert!(!traps.contains(5.0, 9.0));
}

#[test]
fn curve_is_flattened_within_bounds() {
    let mut pb = PathBuilder::new();
    pb.push_circle(50.0, 50.0, 20.0);
    let traps = fill(&pb.finish().unwrap(), FillRule::Winding, 0.1);
    assert_eq!(IntRect::new(30, 30, 40, 40), traps.extents());
    assert!(traps.contains(50.0, 50.0));
    assert!(!traps.contains(32.0, 32.0));
}

#[test]
fn stroke_horizontal_line() {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, 10.0);
    pb.line_to(10.0, 10.0);
    let pen = Stroke {
        width: 2.0,
        ..Stroke::default()
    };
    let traps = stroke(&pb.finish().unwrap(), &pen, &UserToDevice::identity(), 0.1).unwrap();
    assert_eq!(IntRect::new(0, 9, 10, 2), traps.extents());
}

#[test]
fn stroke_is_scaled_by_ctm() {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, 20.0);
    pb.line_to(20.0, 20.0);
    let pen = Stroke {
        width: 2.0,
        ..Stroke::default()
    };
    let ctm = UserToDevice::scale(2.0, 2.0);
    let traps = stroke(&pb.finish().unwrap(), &pen, &ctm, 0.1).unwrap();
    assert_eq!(IntRect::new(0, 18, 20, 4), traps.extents());
}

#[test]
fn huge_coordinates_are_clipped() {
    let traps = fill(&rect_path(-40000.0, 20.0, 40080.0, 60.0), FillRule::Winding, 0.1);
    assert_eq!(
        Some(Region::from_rect(IntRect::new(-16000, 20, 16080, 60))),
        traps.extract_region()
    );
    assert!(traps.contains(50.5, 50.5));
    assert!(!traps.contains(90.5, 50.5));
}

#[test]
fn polygon_outside_limit_vanishes() {
    let traps = fill(&rect_path(20000.0, 0.0, 100.0, 100.0), FillRule::Winding, 0.1);
    assert!(traps.is_empty());
}
