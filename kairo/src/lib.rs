//! Graphics state, clipping and compositing core of a 2D vector renderer.
//!
//! Drawing goes through a [`Context`] bound to a target [`Surface`]. Surfaces
//! are backed by a [`Backend`](surface::Backend) offering a few required
//! image primitives and any subset of optional operations, the rest is
//! synthesized in software.

pub mod clip;
pub mod color;
pub mod compositor;
pub mod context;
pub mod error;
pub mod geom;
pub mod glyph_cache;
pub mod gstate;
pub mod operator;
pub mod option;
pub mod pattern;
pub mod raster;
pub mod region;
pub mod surface;
pub mod tessellate;
pub mod traps;

pub use color::Color;
pub use context::Context;
pub use error::{Error, Result};
pub use glyph_cache::{Glyph, ScaledFont};
pub use gstate::{LineCap, LineJoin};
pub use operator::Operator;
pub use option::{ContextOption, ContextOptionBuilder};
pub use pattern::{Extend, Filter, Pattern, PatternRef};
pub use raster::Antialias;
pub use surface::{
    capped::{Capabilities, CappedSurface},
    image::{Format, ImageSurface},
    ClipSupport, Content, Surface, SurfaceRef,
};
pub use tiny_skia::FillRule;
