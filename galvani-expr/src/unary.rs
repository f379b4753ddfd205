//! Pointwise unary operators: negation, absolute value, sign, floor,
//! ceiling, indexing, and the generic named passthrough.
//!
//! Cheap local rewrites are applied at construction: operators fold through
//! constant scalars, and negation/absolute value push through (arbitrarily
//! nested) broadcasts, so `-Broadcast(x)` and `Broadcast(-x)` are the same
//! node by structural id.

use crate::broadcast::rebroadcast;
use crate::kind::{IndexSpec, Kind};
use crate::symbol::{Expr, Symbol};
use galvani_error::{Error, Result};

/// Controls whether expensive construction-time invariant checks run.
///
/// The strict mode replaces the original design's process-wide debug flag:
/// callers opt into the expensive checks per construction call instead of
/// toggling ambient mutable state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Checks {
    #[default]
    Relaxed,
    Strict,
}

/// `-e`, pushing the sign through broadcasts and folding constants.
pub fn neg(expr: &Expr) -> Expr {
    match expr.kind() {
        Kind::Scalar(v) => Expr::scalar(-v),
        Kind::Negate => expr.children()[0].clone(),
        Kind::Broadcast { .. } => {
            log::debug!("pushing negation through broadcast '{}'", expr.name());
            rebroadcast(expr, neg(&expr.children()[0]))
        }
        _ => Symbol::raw(Kind::Negate, "-", expr.domains().clone(), vec![expr.clone()]),
    }
}

/// `|e|`, pushing through broadcasts and folding constants.
pub fn abs(expr: &Expr) -> Expr {
    match expr.kind() {
        Kind::Scalar(v) => Expr::scalar(v.abs()),
        Kind::Broadcast { .. } => rebroadcast(expr, abs(&expr.children()[0])),
        _ => Symbol::raw(
            Kind::AbsoluteValue,
            "abs",
            expr.domains().clone(),
            vec![expr.clone()],
        ),
    }
}

/// The sign of `e` in `{-1, 0, 1}`, folding constants.
///
/// Its derivative is defined to be zero everywhere; see
/// [`diff`](crate::symbol::Expr::diff).
pub fn sign(expr: &Expr) -> Expr {
    match expr.kind() {
        Kind::Scalar(v) => Expr::scalar(scalar_sign(*v)),
        _ => Symbol::raw(Kind::Sign, "sign", expr.domains().clone(), vec![expr.clone()]),
    }
}

pub(crate) fn scalar_sign(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v.signum()
    }
}

/// `⌊e⌋`, folding constants. Derivative defined as zero everywhere.
pub fn floor(expr: &Expr) -> Expr {
    match expr.kind() {
        Kind::Scalar(v) => Expr::scalar(v.floor()),
        _ => Symbol::raw(Kind::Floor, "floor", expr.domains().clone(), vec![expr.clone()]),
    }
}

/// `⌈e⌉`, folding constants. Derivative defined as zero everywhere.
pub fn ceiling(expr: &Expr) -> Expr {
    match expr.kind() {
        Kind::Scalar(v) => Expr::scalar(v.ceil()),
        _ => Symbol::raw(Kind::Ceiling, "ceil", expr.domains().clone(), vec![expr.clone()]),
    }
}

/// Marks a subtree as non-constant, blocking constant-directed rewrites.
pub fn not_constant(expr: &Expr) -> Expr {
    Symbol::raw(
        Kind::NotConstant,
        "not_constant",
        expr.domains().clone(),
        vec![expr.clone()],
    )
}

/// A generic named unary operator that inherits its child's domain stack.
pub fn unary_operator(name: &str, expr: &Expr) -> Expr {
    Symbol::raw(Kind::UnaryOperator, name, expr.domains().clone(), vec![expr.clone()])
}

impl Expr {
    /// Selects an entry or sub-slice of this symbol's evaluated column.
    ///
    /// A non-negative integer `i` addresses the unit slice `i..i + 1` and
    /// evaluates to a scalar; the integer `-1` addresses the last element.
    /// Under [`Checks::Strict`], a slice reaching past the child's known
    /// evaluation size is rejected.
    pub fn index(&self, spec: impl Into<IndexSpec>, checks: Checks) -> Result<Expr> {
        let spec = spec.into();
        if checks == Checks::Strict {
            if let (Some(size), Some(extent)) = (self.evaluation_size(), slice_extent(&spec)) {
                if extent > size {
                    return Err(Error::value(format!(
                        "slice size exceeds child size: '{}' evaluates to {size} entries \
                         but the slice needs {extent}",
                        self.name()
                    )));
                }
            }
        }
        Ok(Symbol::raw(
            Kind::Index(spec),
            spec.label(),
            self.domains().clone(),
            vec![self.clone()],
        ))
    }

    /// The absolute value of this expression.
    pub fn abs(&self) -> Expr {
        abs(self)
    }

    /// The sign of this expression.
    pub fn sign(&self) -> Expr {
        sign(self)
    }

    /// This expression rounded down.
    pub fn floor(&self) -> Expr {
        floor(self)
    }

    /// This expression rounded up.
    pub fn ceil(&self) -> Expr {
        ceiling(self)
    }
}

/// How many child entries the slice needs to exist, counted from whichever
/// end it anchors to.
fn slice_extent(spec: &IndexSpec) -> Option<usize> {
    match spec.as_slice() {
        (Some(start), _) if start < 0 => Some(start.unsigned_abs() as usize),
        (_, Some(stop)) if stop >= 0 => Some(stop as usize),
        _ => None,
    }
}

impl std::ops::Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        neg(self)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        neg(&self)
    }
}
