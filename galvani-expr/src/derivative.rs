//! Symbolic differentiation with respect to a state-vector slice (or any
//! node, by structural id).
//!
//! The chain rule is applied per node kind. Three conventions are
//! deliberate and load-bearing:
//!
//! - The derivative of `Sign`, `Floor`, `Ceiling` and the Heaviside
//!   comparisons is defined to be exactly zero everywhere. These functions
//!   are discontinuous, but gradient-based solvers want a locally flat
//!   answer rather than a distributional one. This is a documented
//!   smoothing approximation, not a bug.
//! - The derivative of `AbsoluteValue` is the subgradient
//!   `sign(child) * child'`, so it follows the sign of the child *at the
//!   evaluation point*.
//! - Spatial operators are never differentiated symbolically; solvers that
//!   need spatial Jacobians get them from discretization-time linear
//!   operators instead. Asking is an error, by design.

use crate::broadcast::rebroadcast;
use crate::concatenation::concatenation;
use crate::kind::{BinaryOp, Kind};
use crate::symbol::Expr;
use galvani_error::{Error, Result};

impl Expr {
    /// The derivative of this expression with respect to `wrt`.
    pub fn diff(&self, wrt: &Expr) -> Result<Expr> {
        if self.id() == wrt.id() {
            return Ok(Expr::scalar(1.0));
        }
        match self.kind() {
            Kind::Scalar(_)
            | Kind::Vector(_)
            | Kind::Matrix(_)
            | Kind::StateVector(_)
            | Kind::InputParameter
            | Kind::Time
            | Kind::Variable
            | Kind::SpatialVariable => Ok(Expr::scalar(0.0)),

            Kind::Negate => Ok(-self.children()[0].diff(wrt)?),
            Kind::AbsoluteValue => {
                let child = &self.children()[0];
                child.sign().try_mul(&child.diff(wrt)?)
            }
            Kind::Sign | Kind::Floor | Kind::Ceiling => Ok(Expr::scalar(0.0)),
            Kind::NotConstant => self.children()[0].diff(wrt),

            Kind::Binary(op) => self.diff_binary(*op, wrt),

            Kind::Broadcast { .. } => {
                let child_diff = self.children()[0].diff(wrt)?;
                Ok(rebroadcast(self, child_diff))
            }
            Kind::Concatenation => {
                let parts = self
                    .children()
                    .iter()
                    .map(|c| c.diff(wrt))
                    .collect::<Result<Vec<_>>>()?;
                concatenation(&parts)
            }

            Kind::Index(_) | Kind::UnaryOperator => Err(Error::not_implemented(format!(
                "derivative of '{}' is not implemented",
                self.name()
            ))),
            kind if kind.is_spatial() => Err(Error::not_implemented(format!(
                "derivative of spatial operator '{}' is not implemented",
                self.name()
            ))),
            _ => unreachable!("every kind is matched above"),
        }
    }

    fn diff_binary(&self, op: BinaryOp, wrt: &Expr) -> Result<Expr> {
        let (lhs, rhs) = (&self.children()[0], &self.children()[1]);
        match op {
            BinaryOp::Addition => lhs.diff(wrt)?.try_add(&rhs.diff(wrt)?),
            BinaryOp::Subtraction => lhs.diff(wrt)?.try_sub(&rhs.diff(wrt)?),
            BinaryOp::Multiplication => {
                // f'g + fg'
                let left = lhs.diff(wrt)?.try_mul(rhs)?;
                let right = lhs.try_mul(&rhs.diff(wrt)?)?;
                left.try_add(&right)
            }
            BinaryOp::Division => {
                // (f'g - fg') / g^2
                let left = lhs.diff(wrt)?.try_mul(rhs)?;
                let right = lhs.try_mul(&rhs.diff(wrt)?)?;
                left.try_sub(&right)?.try_div(&rhs.try_mul(rhs)?)
            }
            BinaryOp::Power => {
                // power rule for a constant exponent; there is no logarithm
                // node in this algebra, so a symbolic exponent has no
                // derivative here
                if !(rhs.is_constant() && rhs.domains().is_empty()) {
                    return Err(Error::not_implemented(format!(
                        "derivative of a power with a non-constant exponent, '{self}'"
                    )));
                }
                let reduced = rhs.try_sub(&Expr::scalar(1.0))?;
                rhs.try_mul(&lhs.pow(reduced)?)?.try_mul(&lhs.diff(wrt)?)
            }
            BinaryOp::EqualHeaviside | BinaryOp::NotEqualHeaviside => Ok(Expr::scalar(0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::numerical::eval::EvalArgs;
    use crate::numerical::value::Value;
    use crate::spatial::spatial_operator;
    use ndarray::array;
    use pretty_assertions::assert_eq;
    use super::*;

    fn eval_at(expr: &Expr, y: f64) -> f64 {
        let y = array![y];
        let value = expr.evaluate(&EvalArgs::default().with_y(&y)).unwrap();
        match value {
            Value::Scalar(v) => v,
            Value::Dense(a) => a[[0, 0]],
            Value::Sparse(_) => panic!("expected a scalar-like value"),
        }
    }

    #[test]
    fn derivative_through_negation() {
        let a = Expr::state_vector(0..1);
        assert_eq!(eval_at(&(-&a).diff(&a).unwrap(), 5.0), -1.0);

        // w.r.t. its own negation
        let diff = (-&a).diff(&-&a).unwrap();
        assert_eq!(diff.evaluate(&EvalArgs::default()).unwrap(), Value::Scalar(1.0));
    }

    #[test]
    fn power_rule() {
        let a = Expr::state_vector(0..1);
        let cubed = a.pow(3.0).unwrap();
        assert_eq!(eval_at(&cubed.diff(&a).unwrap(), 5.0), 3.0 * 25.0);
        assert_eq!(eval_at(&cubed.diff(&a).unwrap(), -5.0), 3.0 * 25.0);
    }

    #[test]
    fn absolute_value_follows_the_sign_of_the_base() {
        let a = Expr::state_vector(0..1);
        let expr = a.pow(3.0).unwrap().abs();
        let diff = expr.diff(&a).unwrap();
        assert_eq!(eval_at(&diff, 5.0), 3.0 * 25.0);
        assert_eq!(eval_at(&diff, -5.0), -3.0 * 25.0);
    }

    #[test]
    fn flat_derivatives_for_discontinuous_operators() {
        let a = Expr::state_vector(0..1);
        for expr in [a.sign(), a.floor(), a.ceil()] {
            let diff = expr.diff(&a).unwrap();
            assert_eq!(eval_at(&diff, 5.0), 0.0);
        }
        let heaviside = a.lt(&Expr::scalar(1.0)).unwrap();
        assert_eq!(heaviside.diff(&a).unwrap(), Expr::scalar(0.0));
    }

    #[test]
    fn product_and_quotient_rules() {
        let a = Expr::state_vector(0..1);
        let product = &a * &a.pow(2.0).unwrap();
        // d/da (a^3) = 3a^2, assembled through the product rule
        assert_eq!(eval_at(&product.diff(&a).unwrap(), 2.0), 12.0);

        let quotient = &Expr::scalar(1.0) / &a;
        // d/da (1/a) = -1/a^2
        assert_eq!(eval_at(&quotient.diff(&a).unwrap(), 2.0), -0.25);
    }

    #[test]
    fn derivative_matches_finite_differences() {
        use assert_float_eq::assert_float_absolute_eq;

        // a^3 + 2a - 1, differentiated symbolically and checked against a
        // one-sided difference quotient
        let a = Expr::state_vector(0..1);
        let expr = (&a.pow(3.0).unwrap() + &(&a * &Expr::scalar(2.0)))
            .try_sub(&Expr::scalar(1.0))
            .unwrap();
        let diff = expr.diff(&a).unwrap();

        const DX: f64 = 1e-6;
        for point in [0.0, 1.0, 2.0, 5.0, -3.0] {
            let numeric = (eval_at(&expr, point + DX) - eval_at(&expr, point)) / DX;
            let symbolic = eval_at(&diff, point);
            assert_float_absolute_eq!(symbolic, numeric, 1e-3);
        }
    }

    #[test]
    fn symbolic_exponents_are_not_differentiable() {
        let a = Expr::state_vector(0..1);
        let b = Expr::state_vector(1..2);
        assert!(matches!(
            a.pow(b).unwrap().diff(&a).unwrap_err(),
            Error::NotImplemented(_)
        ));
    }

    #[test]
    fn spatial_operators_are_not_differentiable() {
        let a = Expr::state_vector(0..1);
        let spatial = spatial_operator("name", &a);
        assert!(matches!(
            spatial.diff(&a).unwrap_err(),
            Error::NotImplemented(_)
        ));
    }
}
