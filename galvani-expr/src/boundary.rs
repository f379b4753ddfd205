//! Boundary operators: the value of a quantity on one side of its primary
//! domain.
//!
//! Extracting a boundary value consumes the primary domain the same way a
//! definite integral does: the auxiliary levels shift down one rank.

use crate::broadcast::reduce_broadcast;
use crate::domain::DomainLevel;
use crate::kind::{Kind, Side};
use crate::symbol::{Expr, Symbol};
use galvani_error::{Error, Result};

/// A generic named boundary operator with no special-case collapses.
pub fn boundary_operator(name: &str, expr: &Expr, side: Side) -> Result<Expr> {
    if expr.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot take the boundary of '{}' since its domain is empty",
            expr.name()
        )));
    }
    let domains = expr.domains().strip(DomainLevel::Primary);
    Ok(Symbol::raw(
        Kind::BoundaryOperator(side),
        name,
        domains,
        vec![expr.clone()],
    ))
}

/// The value of `expr` on the given side of its primary domain.
///
/// The boundary value of a domain-free symbol is the symbol itself, and the
/// boundary value of a broadcast field is the broadcast's child (the field
/// is constant along the consumed domain). Tab sides only exist on the
/// current collector.
pub fn boundary_value(expr: &Expr, side: Side) -> Result<Expr> {
    if expr.evaluates_on_edges(DomainLevel::Primary) {
        return Err(Error::value(
            "Can't take the boundary value of a symbol that evaluates on edges",
        ));
    }
    if side.is_tab() && expr.domain() != ["current collector"] {
        return Err(Error::model(format!(
            "Can only take boundary value on the tabs in the domain 'current collector', \
             but '{}' has domain {:?}",
            expr.name(),
            expr.domain()
        )));
    }
    if expr.domain().is_empty() {
        return Ok(expr.clone());
    }
    if let Some(reduced) = reduce_broadcast(expr) {
        log::debug!("collapsing boundary value of broadcast '{}'", expr.name());
        return reduced;
    }
    let domains = expr.domains().strip(DomainLevel::Primary);
    Ok(Symbol::raw(
        Kind::BoundaryValue(side),
        format!("boundary value ({side})"),
        domains,
        vec![expr.clone()],
    ))
}
