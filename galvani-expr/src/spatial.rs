//! Spatial operators: gradient, divergence, Laplacian, upwinding and the
//! delta function.
//!
//! The node/edge discipline is enforced here: a gradient consumes a
//! node-valued field and produces an edge-valued one, a divergence does the
//! reverse, and upwinding maps nodes to edges. The smart builders [`grad`]
//! and [`div`] additionally commute with negation, so `div(-grad(a))` is
//! the same node, by structural id, as `-div(grad(a))`.

use crate::domain::{DomainLevel, Domains, IntoDomain};
use crate::kind::{BinaryOp, BroadcastLevel, Kind, Side};
use crate::symbol::{Expr, Symbol};
use crate::broadcast::{full_broadcast, full_broadcast_to_edges, primary_broadcast,
    primary_broadcast_to_edges};
use galvani_error::{Error, Result};

/// The gradient operator. Requires a node-valued operand with a non-empty
/// domain; the result is edge-valued.
pub fn gradient(expr: &Expr) -> Result<Expr> {
    if expr.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot take gradient of '{}' since its domain is empty",
            expr.name()
        )));
    }
    if expr.evaluates_on_edges(DomainLevel::Primary) {
        return Err(Error::type_error(format!(
            "Cannot take gradient of '{}' since it evaluates on edges",
            expr.name()
        )));
    }
    Ok(Symbol::raw(Kind::Gradient, "grad", expr.domains().clone(), vec![expr.clone()]))
}

/// The divergence operator. Requires an edge-valued operand with a
/// non-empty domain; the result is node-valued.
pub fn divergence(expr: &Expr) -> Result<Expr> {
    if expr.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot take divergence of '{}' since its domain is empty",
            expr.name()
        )));
    }
    if !expr.evaluates_on_edges(DomainLevel::Primary) {
        return Err(Error::type_error(format!(
            "Cannot take divergence of '{}' since it does not evaluate on edges",
            expr.name()
        )));
    }
    Ok(Symbol::raw(Kind::Divergence, "div", expr.domains().clone(), vec![expr.clone()]))
}

/// The Laplacian operator.
pub fn laplacian(expr: &Expr) -> Result<Expr> {
    if expr.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot take laplacian of '{}' since its domain is empty",
            expr.name()
        )));
    }
    Ok(Symbol::raw(Kind::Laplacian, "laplacian", expr.domains().clone(), vec![expr.clone()]))
}

/// The inner product of a gradient with itself, `∇a⋅∇a`. Node-valued.
pub fn grad_squared(expr: &Expr) -> Result<Expr> {
    if expr.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot take grad squared of '{}' since its domain is empty",
            expr.name()
        )));
    }
    Ok(Symbol::raw(
        Kind::GradientSquared,
        "grad squared",
        expr.domains().clone(),
        vec![expr.clone()],
    ))
}

/// Upwinds a node-valued field onto edges, taking values from the upstream
/// side.
pub fn upwind(expr: &Expr) -> Result<Expr> {
    wind(expr, Kind::Upwind, "upwind")
}

/// Downwinds a node-valued field onto edges, taking values from the
/// downstream side.
pub fn downwind(expr: &Expr) -> Result<Expr> {
    wind(expr, Kind::Downwind, "downwind")
}

fn wind(expr: &Expr, kind: Kind, name: &str) -> Result<Expr> {
    if expr.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot {name} '{}' since its domain is empty",
            expr.name()
        )));
    }
    if expr.evaluates_on_edges(DomainLevel::Primary) {
        return Err(Error::type_error(format!(
            "Cannot {name} '{}' since it does not evaluate on nodes",
            expr.name()
        )));
    }
    Ok(Symbol::raw(kind, name, expr.domains().clone(), vec![expr.clone()]))
}

/// A generic named spatial operator that inherits its child's domain stack.
pub fn spatial_operator(name: &str, expr: &Expr) -> Expr {
    Symbol::raw(Kind::SpatialOperator, name, expr.domains().clone(), vec![expr.clone()])
}

/// A Dirac delta concentrated on one side of an explicitly given domain.
///
/// The domain argument is required; the child's own domain, if any, becomes
/// the secondary domain of the result.
pub fn delta_function(
    expr: &Expr,
    side: Side,
    domain: Option<impl IntoDomain>,
) -> Result<Expr> {
    let Some(domain) = domain else {
        return Err(Error::domain("Delta function domain cannot be None"));
    };
    let mut domains = Domains::new(domain.into_domain());
    if !expr.domain().is_empty() {
        domains = domains.with_secondary(expr.domain().to_vec());
    }
    Symbol::create(
        Kind::DeltaFunction(side),
        format!("delta function ({side})"),
        domains,
        vec![expr.clone()],
    )
}

/// Smart gradient builder.
///
/// Commutes with negation (a negated operand, or a negated factor inside a
/// product, moves outside the gradient) and short-circuits the gradient of
/// a broadcast field to a broadcast zero on edges.
pub fn grad(expr: &Expr) -> Result<Expr> {
    match expr.kind() {
        Kind::Negate => {
            log::debug!("moving negation outside grad of '{}'", expr.name());
            Ok(-grad(&expr.children()[0])?)
        }
        Kind::Binary(BinaryOp::Multiplication) => match negated_factor_removed(expr)? {
            Some(product) => Ok(-grad(&product)?),
            None => gradient(expr),
        },
        Kind::Broadcast {
            level: BroadcastLevel::Primary | BroadcastLevel::Full,
            to_edges: false,
        } => zero_on_edges(expr),
        _ => gradient(expr),
    }
}

/// Smart divergence builder; the counterpart of [`grad`].
pub fn div(expr: &Expr) -> Result<Expr> {
    match expr.kind() {
        Kind::Negate => {
            log::debug!("moving negation outside div of '{}'", expr.name());
            Ok(-div(&expr.children()[0])?)
        }
        Kind::Binary(BinaryOp::Multiplication) => match negated_factor_removed(expr)? {
            Some(product) => Ok(-div(&product)?),
            None => divergence(expr),
        },
        Kind::Broadcast { to_edges: true, .. } => zero_on_nodes(expr),
        _ => divergence(expr),
    }
}

/// When one operand of a product is a negation, rebuilds the product with
/// the negation stripped so the caller can move the sign outside.
fn negated_factor_removed(product: &Expr) -> Result<Option<Expr>> {
    let (lhs, rhs) = (&product.children()[0], &product.children()[1]);
    if let Kind::Negate = lhs.kind() {
        return Ok(Some(lhs.children()[0].try_mul(rhs)?));
    }
    if let Kind::Negate = rhs.kind() {
        return Ok(Some(lhs.try_mul(&rhs.children()[0])?));
    }
    Ok(None)
}

/// The spatial derivative of any broadcast field is identically zero.
fn zero_on_edges(expr: &Expr) -> Result<Expr> {
    let domains = expr.domains();
    if domains.secondary.is_empty() {
        primary_broadcast_to_edges(Expr::scalar(0.0), domains.primary.clone())
    } else {
        full_broadcast_to_edges(Expr::scalar(0.0), domains.clone())
    }
}

fn zero_on_nodes(expr: &Expr) -> Result<Expr> {
    let domains = expr.domains();
    if domains.secondary.is_empty() {
        primary_broadcast(Expr::scalar(0.0), domains.primary.clone())
    } else {
        full_broadcast(Expr::scalar(0.0), domains.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::broadcast::primary_broadcast_to_edges;
    use galvani_error::Error;
    use pretty_assertions::assert_eq;
    use super::*;

    fn field(name: &str) -> Expr {
        Expr::variable_in(name, Domains::new("test domain")).unwrap()
    }

    #[test]
    fn gradient_requires_a_domain() {
        let a = Expr::variable("a");
        let err = gradient(&a).unwrap_err();
        assert_eq!(
            err,
            Error::domain("Cannot take gradient of 'a' since its domain is empty")
        );
    }

    #[test]
    fn gradient_rejects_edge_valued_operands() {
        let a = primary_broadcast_to_edges(Expr::scalar(1.0), "test").unwrap();
        let err = gradient(&a).unwrap_err();
        assert!(matches!(err, Error::Type(msg) if msg.contains("evaluates on edges")));
    }

    #[test]
    fn gradient_maps_nodes_to_edges() {
        let a = field("a");
        let grad_a = gradient(&a).unwrap();
        assert_eq!(grad_a.name(), "grad");
        assert_eq!(grad_a.to_string(), "grad(a)");
        assert_eq!(grad_a.children()[0].name(), a.name());
        assert_eq!(grad_a.domain(), a.domain());
        assert!(grad_a.evaluates_on_edges(DomainLevel::Primary));
    }

    #[test]
    fn divergence_requires_an_edge_valued_operand() {
        let a = Expr::variable("a");
        assert!(matches!(divergence(&a).unwrap_err(), Error::Domain(_)));

        let nodes = primary_broadcast(Expr::scalar(1.0), "test").unwrap();
        assert!(matches!(divergence(&nodes).unwrap_err(), Error::Type(_)));

        let a = field("a");
        let div_a = divergence(&gradient(&a).unwrap()).unwrap();
        assert_eq!(div_a.domain(), a.domain());
        assert!(!div_a.evaluates_on_edges(DomainLevel::Primary));
    }

    #[test]
    fn div_commutes_with_negation() {
        let a = field("a");
        let lhs = div(&-gradient(&a).unwrap()).unwrap();
        let rhs = -divergence(&gradient(&a).unwrap()).unwrap();
        assert_eq!(lhs.id(), rhs.id());
    }

    #[test]
    fn div_moves_a_negated_factor_outside() {
        let a = field("a");
        let lhs = div(&(&-&a * &gradient(&a).unwrap())).unwrap();
        let rhs = -divergence(&(&a * &gradient(&a).unwrap())).unwrap();
        assert_eq!(lhs.id(), rhs.id());
    }

    #[test]
    fn grad_of_a_broadcast_is_a_broadcast_zero_on_edges() {
        let broad = primary_broadcast(Expr::variable("a"), "test domain").unwrap();
        let grad_a = grad(&broad).unwrap();
        assert!(grad_a.evaluates_on_edges(DomainLevel::Primary));
        assert!(matches!(grad_a.kind(), Kind::Broadcast { to_edges: true, .. }));
        assert!(matches!(grad_a.children()[0].kind(), Kind::Scalar(v) if *v == 0.0));
    }

    #[test]
    fn div_of_an_edge_broadcast_is_a_broadcast_zero_on_nodes() {
        let broad = primary_broadcast_to_edges(Expr::variable("a"), "test domain").unwrap();
        let div_a = div(&broad).unwrap();
        assert!(!div_a.evaluates_on_edges(DomainLevel::Primary));
        assert!(matches!(div_a.kind(), Kind::Broadcast { to_edges: false, .. }));
        assert!(matches!(div_a.children()[0].kind(), Kind::Scalar(v) if *v == 0.0));
    }

    #[test]
    fn upwind_and_downwind() {
        let a = Expr::variable("a");
        let err = upwind(&a).unwrap_err();
        assert_eq!(err, Error::domain("Cannot upwind 'a' since its domain is empty"));

        let edges = primary_broadcast_to_edges(Expr::scalar(1.0), "test").unwrap();
        assert!(matches!(
            upwind(&edges).unwrap_err(),
            Error::Type(msg) if msg.contains("does not evaluate on nodes")
        ));

        let a = field("a");
        let up = upwind(&a).unwrap();
        assert_eq!(up.name(), "upwind");
        assert_eq!(up.children()[0].name(), a.name());
        assert_eq!(up.domain(), a.domain());
        assert!(up.evaluates_on_edges(DomainLevel::Primary));

        let down = downwind(&a).unwrap();
        assert_eq!(down.name(), "downwind");
        assert!(down.evaluates_on_edges(DomainLevel::Primary));
    }

    #[test]
    fn delta_function_wiring() {
        let a = Expr::variable("a");
        let delta = delta_function(&a, Side::Right, Some("some domain")).unwrap();
        assert!(matches!(delta.kind(), Kind::DeltaFunction(Side::Right)));
        assert_eq!(delta.children()[0].id(), a.id());
        assert_eq!(delta.domain(), ["some domain"]);
        assert!(!delta.evaluates_on_edges(DomainLevel::Primary));

        let a = Expr::variable_in("a", Domains::new("some domain")).unwrap();
        let delta = delta_function(&a, Side::Left, Some("another domain")).unwrap();
        assert_eq!(delta.domain(), ["another domain"]);
        assert_eq!(delta.domains().secondary, ["some domain"]);

        let err = delta_function(&a, Side::Right, None::<&str>).unwrap_err();
        assert_eq!(err, Error::domain("Delta function domain cannot be None"));
    }
}
