//! Binary operators: arithmetic, powers and step-function comparisons.
//!
//! Construction merges the operands' domain stacks (an empty side inherits
//! the other side's) and applies cheap local rewrites first. Each rewrite is
//! a small function returning `Some(expr)` when it applies, tried in order;
//! falling through builds the plain node.
//!
//! The `std::ops` implementations delegate to the fallible constructors and
//! panic on a domain mismatch; use the `try_*` methods to propagate the
//! error instead.

use crate::broadcast::rebroadcast;
use crate::kind::{BinaryOp, Kind};
use crate::symbol::{Expr, Symbol};
use galvani_error::Result;

pub(crate) fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Expr> {
    if let Some(folded) = fold_scalars(op, lhs, rhs) {
        return Ok(folded);
    }
    if let Some(reduced) = eliminate_identities(op, lhs, rhs) {
        return Ok(reduced);
    }
    if let Some(pushed) = push_into_broadcast(op, lhs, rhs)? {
        return Ok(pushed);
    }
    let domains = crate::domain::Domains::combine(lhs.domains(), rhs.domains())?;
    Ok(Symbol::raw(
        Kind::Binary(op),
        op.symbol(),
        domains,
        vec![lhs.clone(), rhs.clone()],
    ))
}

fn as_scalar(expr: &Expr) -> Option<f64> {
    match expr.kind() {
        Kind::Scalar(v) => Some(*v),
        _ => None,
    }
}

/// `c ∘ d` folds numerically for the arithmetic operators.
fn fold_scalars(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    let (a, b) = (as_scalar(lhs)?, as_scalar(rhs)?);
    let value = match op {
        BinaryOp::Addition => a + b,
        BinaryOp::Subtraction => a - b,
        BinaryOp::Multiplication => a * b,
        BinaryOp::Division => a / b,
        BinaryOp::Power => a.powf(b),
        BinaryOp::EqualHeaviside | BinaryOp::NotEqualHeaviside => return None,
    };
    Some(Expr::scalar(value))
}

/// `x + 0 = x`, `0 + x = x`, `x - 0 = x`, `0 - x = -x`, `1 * x = x`,
/// `x * 1 = x`, `x / 1 = x`, `x ** 1 = x`, and multiplication/division of a
/// domain-free zero.
fn eliminate_identities(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    let lhs_scalar = as_scalar(lhs);
    let rhs_scalar = as_scalar(rhs);
    match op {
        BinaryOp::Addition => {
            if lhs_scalar == Some(0.0) {
                Some(rhs.clone())
            } else if rhs_scalar == Some(0.0) {
                Some(lhs.clone())
            } else {
                None
            }
        }
        BinaryOp::Subtraction => {
            if rhs_scalar == Some(0.0) {
                Some(lhs.clone())
            } else if lhs_scalar == Some(0.0) {
                Some(-rhs)
            } else {
                None
            }
        }
        BinaryOp::Multiplication => {
            if lhs_scalar == Some(1.0) {
                Some(rhs.clone())
            } else if rhs_scalar == Some(1.0) {
                Some(lhs.clone())
            } else if (lhs_scalar == Some(0.0) && rhs.domains().is_empty())
                || (rhs_scalar == Some(0.0) && lhs.domains().is_empty())
            {
                Some(Expr::scalar(0.0))
            } else {
                None
            }
        }
        BinaryOp::Division => {
            if rhs_scalar == Some(1.0) {
                Some(lhs.clone())
            } else if lhs_scalar == Some(0.0) && rhs.domains().is_empty() {
                Some(Expr::scalar(0.0))
            } else {
                None
            }
        }
        BinaryOp::Power => {
            if rhs_scalar == Some(1.0) {
                Some(lhs.clone())
            } else {
                None
            }
        }
        BinaryOp::EqualHeaviside | BinaryOp::NotEqualHeaviside => None,
    }
}

/// A domain-free factor multiplies (or divides) into a node-valued
/// broadcast, keeping constants next to each other for folding. This is the
/// rewrite that lets an average of `c * broadcast(x)` collapse all the way
/// to `c * x`.
fn push_into_broadcast(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Option<Expr>> {
    let is_node_broadcast = |e: &Expr| {
        matches!(e.kind(), Kind::Broadcast { to_edges: false, .. })
    };
    match op {
        BinaryOp::Multiplication => {
            if lhs.domains().is_empty() && is_node_broadcast(rhs) {
                let inner = binary(op, lhs, &rhs.children()[0])?;
                return Ok(Some(rebroadcast(rhs, inner)));
            }
            if rhs.domains().is_empty() && is_node_broadcast(lhs) {
                let inner = binary(op, &lhs.children()[0], rhs)?;
                return Ok(Some(rebroadcast(lhs, inner)));
            }
        }
        BinaryOp::Division => {
            if rhs.domains().is_empty() && is_node_broadcast(lhs) {
                let inner = binary(op, &lhs.children()[0], rhs)?;
                return Ok(Some(rebroadcast(lhs, inner)));
            }
            if lhs.domains().is_empty() && is_node_broadcast(rhs) {
                let inner = binary(op, lhs, &rhs.children()[0])?;
                return Ok(Some(rebroadcast(rhs, inner)));
            }
        }
        _ => {}
    }
    Ok(None)
}

impl Expr {
    pub fn try_add(&self, rhs: &Expr) -> Result<Expr> {
        binary(BinaryOp::Addition, self, rhs)
    }

    pub fn try_sub(&self, rhs: &Expr) -> Result<Expr> {
        binary(BinaryOp::Subtraction, self, rhs)
    }

    pub fn try_mul(&self, rhs: &Expr) -> Result<Expr> {
        binary(BinaryOp::Multiplication, self, rhs)
    }

    pub fn try_div(&self, rhs: &Expr) -> Result<Expr> {
        binary(BinaryOp::Division, self, rhs)
    }

    /// `self ** rhs`.
    pub fn pow(&self, rhs: impl Into<Expr>) -> Result<Expr> {
        binary(BinaryOp::Power, self, &rhs.into())
    }

    /// The step function `self <= rhs`, evaluated as 0/1.
    pub fn leq(&self, rhs: &Expr) -> Result<Expr> {
        binary(BinaryOp::EqualHeaviside, self, rhs)
    }

    /// The step function `self < rhs`, evaluated as 0/1.
    pub fn lt(&self, rhs: &Expr) -> Result<Expr> {
        binary(BinaryOp::NotEqualHeaviside, self, rhs)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<'a, 'b> std::ops::$trait<&'b Expr> for &'a Expr {
            type Output = Expr;

            /// # Panics
            ///
            /// Panics when the operands' domain stacks are incompatible.
            fn $method(self, rhs: &'b Expr) -> Expr {
                binary($op, self, rhs).unwrap_or_else(|e| panic!("{e}"))
            }
        }

        impl std::ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                std::ops::$trait::$method(&self, &rhs)
            }
        }

        impl std::ops::$trait<f64> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                std::ops::$trait::$method(self, &Expr::scalar(rhs))
            }
        }

        impl<'a> std::ops::$trait<&'a Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: &'a Expr) -> Expr {
                std::ops::$trait::$method(&Expr::scalar(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Addition);
impl_binary_op!(Sub, sub, BinaryOp::Subtraction);
impl_binary_op!(Mul, mul, BinaryOp::Multiplication);
impl_binary_op!(Div, div, BinaryOp::Division);

#[cfg(test)]
mod tests {
    use crate::broadcast::primary_broadcast;
    use crate::domain::Domains;
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn scalars_fold() {
        assert_eq!(Expr::scalar(2.0) * Expr::scalar(4.0), Expr::scalar(8.0));
        assert_eq!(Expr::scalar(1.0) + Expr::scalar(2.0), Expr::scalar(3.0));
        assert_eq!(Expr::scalar(3.0).pow(2.0).unwrap(), Expr::scalar(9.0));
    }

    #[test]
    fn identities_eliminate() {
        let a = Expr::state_vector(0..1);
        assert_eq!(&a * &Expr::scalar(1.0), a);
        assert_eq!(&Expr::scalar(1.0) * &a, a);
        assert_eq!(&a + &Expr::scalar(0.0), a);
        assert_eq!(&a / &Expr::scalar(1.0), a);
        assert_eq!((&Expr::scalar(0.0) - &a).id(), (-&a).id());
        assert_eq!(&Expr::scalar(0.0) * &a, Expr::scalar(0.0));
        assert_eq!(a.pow(1.0).unwrap(), a);
    }

    #[test]
    fn empty_domain_inherits_the_other_side() {
        let a = Expr::variable_in("a", Domains::new("test")).unwrap();
        let sum = &a + &Expr::variable("b");
        assert_eq!(sum.domain(), ["test"]);
    }

    #[test]
    fn mismatched_domains_are_rejected() {
        let a = Expr::variable_in("a", Domains::new("separator")).unwrap();
        let b = Expr::variable_in("b", Domains::new("positive electrode")).unwrap();
        assert!(a.try_add(&b).is_err());
    }

    #[test]
    fn constants_multiply_into_broadcasts() {
        let broad = primary_broadcast(Expr::scalar(4.0), "negative electrode").unwrap();
        let doubled = &Expr::scalar(2.0) * &broad;
        assert_eq!(
            doubled.id(),
            primary_broadcast(Expr::scalar(8.0), "negative electrode").unwrap().id()
        );

        // non-constant but domain-free factors push through too
        let t = Expr::time();
        let scaled = &t * &broad;
        assert_eq!(
            scaled.id(),
            primary_broadcast(&t * &Expr::scalar(4.0), "negative electrode")
                .unwrap()
                .id()
        );
    }

    #[test]
    fn heaviside_nodes_do_not_fold() {
        let a = Expr::state_vector(0..1);
        let h = a.lt(&Expr::scalar(1.0)).unwrap();
        assert!(matches!(h.kind(), Kind::Binary(BinaryOp::NotEqualHeaviside)));
        assert_eq!(h.name(), "<");
    }
}
