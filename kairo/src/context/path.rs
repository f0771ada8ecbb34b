use crate::{geom::DevicePoint, gstate::append_path};
use educe::Educe;
use either::Either::{self, Left, Right};
use log::debug;
use tiny_skia::{Path as SkiaPath, PathBuilder};

/// Current path of a context, in device space.
///
/// Built lazily: segments go to a builder, `finish()` turns it into a path
/// that is kept until the next segment is added.
#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub(crate) struct Path {
    #[educe(Default(expression = "Either::Left(PathBuilder::new())"))]
    path: Either<PathBuilder, SkiaPath>,
    current: Option<DevicePoint>,
    subpath_start: Option<DevicePoint>,
}

fn reopen(path: &SkiaPath) -> PathBuilder {
    let mut pb = PathBuilder::new();
    append_path(&mut pb, path);
    pb
}

impl Path {
    fn path_builder(&mut self) -> &mut PathBuilder {
        if let Right(p) = &self.path {
            self.path = Left(reopen(p));
        }
        match &mut self.path {
            Left(pb) => pb,
            Right(_) => unreachable!("path reopened above"),
        }
    }

    pub fn current_point(&self) -> Option<DevicePoint> {
        self.current
    }

    pub fn move_to(&mut self, p: DevicePoint) {
        self.path_builder().move_to(p.x as f32, p.y as f32);
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    /// Without a current point this starts a sub path at `p`.
    pub fn line_to(&mut self, p: DevicePoint) {
        if self.current.is_none() {
            return self.move_to(p);
        }
        self.path_builder().line_to(p.x as f32, p.y as f32);
        self.current = Some(p);
    }

    pub fn curve_to(&mut self, p1: DevicePoint, p2: DevicePoint, p3: DevicePoint) {
        if self.current.is_none() {
            self.move_to(p1);
        }
        self.path_builder().cubic_to(
            p1.x as f32,
            p1.y as f32,
            p2.x as f32,
            p2.y as f32,
            p3.x as f32,
            p3.y as f32,
        );
        self.current = Some(p3);
    }

    /// Close the current sub path, the current point moves to its start.
    pub fn close_path(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.path_builder().close();
        self.current = self.subpath_start;
    }

    /// Built path, `None` if it has no drawable segment.
    pub fn finish(&mut self) -> Option<&SkiaPath> {
        if let Left(pb) = &self.path {
            match pb.clone().finish() {
                Some(p) => self.path = Right(p),
                None => debug!("empty or invalid path"),
            }
        }
        self.path.as_ref().right()
    }

    pub fn reset(&mut self) {
        let temp = Left(PathBuilder::new());
        let p = std::mem::replace(&mut self.path, temp);
        self.path = match p {
            Left(mut pb) => {
                pb.clear();
                Left(pb)
            }
            Right(p) => Left(p.clear()),
        };
        self.current = None;
        self.subpath_start = None;
    }
}
