//! The closed taxonomy of node kinds.
//!
//! Every capability of the engine (domain resolution, simplification,
//! differentiation, evaluation) dispatches on [`Kind`] with an exhaustive
//! `match`, so adding a node kind forces every capability to say what it
//! does with it.

use crate::numerical::sparse::CsrMatrix;
use crate::symbol::Expr;
use ndarray::Array2;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Side identifiers accepted by boundary and delta-function operators.
///
/// The tab sides only make sense for quantities on the current collector;
/// the boundary-value builder enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    NegativeTab,
    PositiveTab,
}

impl Side {
    pub fn is_tab(&self) -> bool {
        matches!(self, Self::NegativeTab | Self::PositiveTab)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::NegativeTab => "negative tab",
            Self::PositiveTab => "positive tab",
        })
    }
}

/// A slice into the external state vector `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateSlice {
    pub start: usize,
    pub stop: usize,
}

impl StateSlice {
    pub fn len(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The argument of the index operator: a single entry or a half-open range.
///
/// A single non-negative index `i` addresses the unit slice `i..i + 1`; the
/// single index `-1` addresses the last element via the `(-1, None)` slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSpec {
    Single(i64),
    Range {
        start: Option<i64>,
        stop: Option<i64>,
    },
}

impl IndexSpec {
    /// The equivalent `(start, stop)` slice, `None` meaning "to the end".
    pub fn as_slice(&self) -> (Option<i64>, Option<i64>) {
        match *self {
            Self::Single(-1) => (Some(-1), None),
            Self::Single(i) => (Some(i), Some(i + 1)),
            Self::Range { start, stop } => (start, stop),
        }
    }

    /// The slice length, when it is known without the child's size.
    pub fn len(&self) -> Option<usize> {
        match self.as_slice() {
            (Some(start), Some(stop)) if start >= 0 && stop >= start => {
                Some((stop - start) as usize)
            }
            (None, Some(stop)) if stop >= 0 => Some(stop as usize),
            (Some(-1), None) => Some(1),
            _ => None,
        }
    }

    /// The display label, e.g. `Index[-1]` or `Index[1:3]`.
    pub fn label(&self) -> String {
        match *self {
            Self::Single(i) => format!("Index[{i}]"),
            Self::Range { start, stop } => {
                let fmt_bound = |b: Option<i64>| b.map(|v| v.to_string()).unwrap_or_default();
                format!("Index[{}:{}]", fmt_bound(start), fmt_bound(stop))
            }
        }
    }
}

impl From<i64> for IndexSpec {
    fn from(i: i64) -> Self {
        Self::Single(i)
    }
}

impl From<std::ops::Range<i64>> for IndexSpec {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::Range {
            start: Some(r.start),
            stop: Some(r.end),
        }
    }
}

impl From<std::ops::RangeTo<i64>> for IndexSpec {
    fn from(r: std::ops::RangeTo<i64>) -> Self {
        Self::Range {
            start: None,
            stop: Some(r.end),
        }
    }
}

/// Flavors of the integral operator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegralKind {
    /// Definite integral over a whole level of the integrand's domain stack;
    /// removes that level.
    Definite,
    /// Running integral from the left edge; keeps the domain.
    Indefinite,
    /// Running integral from the right edge; keeps the domain.
    BackwardIndefinite,
    /// Integral over the boundary of the primary domain.
    Boundary,
}

/// Binary operator tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Power,
    /// `lhs <= rhs`, evaluated as a 0/1 step function.
    EqualHeaviside,
    /// `lhs < rhs`, evaluated as a 0/1 step function.
    NotEqualHeaviside,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Subtraction => "-",
            Self::Multiplication => "*",
            Self::Division => "/",
            Self::Power => "**",
            Self::EqualHeaviside => "<=",
            Self::NotEqualHeaviside => "<",
        }
    }
}

/// Which level of the child's domain stack a broadcast expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastLevel {
    Primary,
    Secondary,
    Full,
}

/// Every node kind the engine knows about.
#[derive(Debug, Clone)]
pub enum Kind {
    // leaves
    Scalar(f64),
    Vector(Array2<f64>),
    Matrix(CsrMatrix),
    StateVector(StateSlice),
    InputParameter,
    Time,
    Variable,
    SpatialVariable,

    // unary operators
    Negate,
    AbsoluteValue,
    Sign,
    Floor,
    Ceiling,
    Index(IndexSpec),
    NotConstant,
    /// Generic named unary passthrough.
    UnaryOperator,

    // spatial operators
    Gradient,
    Divergence,
    Laplacian,
    GradientSquared,
    Upwind,
    Downwind,
    /// Generic named spatial operator.
    SpatialOperator,
    DeltaFunction(Side),

    /// The integral family; the integration variables are part of the
    /// payload (and of the structural id), not children.
    Integral {
        op: IntegralKind,
        variables: Vec<Expr>,
    },

    // boundary operators
    BoundaryValue(Side),
    /// Generic named boundary operator.
    BoundaryOperator(Side),

    Binary(BinaryOp),

    Broadcast {
        level: BroadcastLevel,
        to_edges: bool,
    },
    Concatenation,
}

impl Kind {
    /// Feeds the kind discriminant and payload into the structural-id hash.
    ///
    /// Children and domain metadata are hashed by the caller; this function
    /// only covers what is specific to the kind itself.
    pub(crate) fn hash_structure<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Kind::Scalar(v) => v.to_bits().hash(state),
            Kind::Vector(a) => {
                a.dim().hash(state);
                for v in a.iter() {
                    v.to_bits().hash(state);
                }
            }
            Kind::Matrix(m) => m.hash_structure(state),
            Kind::StateVector(s) => s.hash(state),
            Kind::Index(i) => i.hash(state),
            Kind::DeltaFunction(side)
            | Kind::BoundaryValue(side)
            | Kind::BoundaryOperator(side) => side.hash(state),
            Kind::Integral { op, variables } => {
                op.hash(state);
                for v in variables {
                    v.id().hash(state);
                }
            }
            Kind::Binary(op) => op.hash(state),
            Kind::Broadcast { level, to_edges } => {
                level.hash(state);
                to_edges.hash(state);
            }
            _ => {}
        }
    }

    /// True for the spatial-operator family, none of which may be
    /// differentiated symbolically by this engine.
    pub(crate) fn is_spatial(&self) -> bool {
        matches!(
            self,
            Kind::Gradient
                | Kind::Divergence
                | Kind::Laplacian
                | Kind::GradientSquared
                | Kind::Upwind
                | Kind::Downwind
                | Kind::SpatialOperator
                | Kind::DeltaFunction(_)
                | Kind::Integral { .. }
                | Kind::BoundaryValue(_)
                | Kind::BoundaryOperator(_)
        )
    }
}
