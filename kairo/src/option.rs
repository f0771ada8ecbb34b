use crate::{
    gstate::{LineCap, LineJoin},
    operator::Operator,
    raster::Antialias,
};
use educe::Educe;
use tiny_skia::FillRule;

/// Initial graphics state of a new [`Context`](crate::context::Context).
#[derive(Debug, Clone, Copy, PartialEq, Educe)]
#[educe(Default)]
pub struct ContextOption {
    pub operator: Operator,
    #[educe(Default = 0.1)]
    pub tolerance: f64,
    pub antialias: Antialias,
    #[educe(Default(expression = "FillRule::Winding"))]
    pub fill_rule: FillRule,
    #[educe(Default = 2.0)]
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    #[educe(Default = 10.0)]
    pub miter_limit: f64,
}

#[derive(Educe)]
#[educe(Default(new))]
pub struct ContextOptionBuilder(ContextOption);

impl ContextOptionBuilder {
    pub fn operator(mut self, op: Operator) -> Self {
        self.0.operator = op;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    pub fn antialias(mut self, antialias: Antialias) -> Self {
        self.0.antialias = antialias;
        self
    }

    pub fn fill_rule(mut self, rule: FillRule) -> Self {
        self.0.fill_rule = rule;
        self
    }

    pub fn line_width(mut self, width: f64) -> Self {
        self.0.line_width = width;
        self
    }

    pub fn line_cap(mut self, cap: LineCap) -> Self {
        self.0.line_cap = cap;
        self
    }

    pub fn line_join(mut self, join: LineJoin) -> Self {
        self.0.line_join = join;
        self
    }

    pub fn miter_limit(mut self, limit: f64) -> Self {
        self.0.miter_limit = limit;
        self
    }

    pub fn build(self) -> ContextOption {
        self.0
    }
}
