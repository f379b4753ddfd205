//! The broadcast family: symbolic expansion of a quantity across an
//! additional domain, deferred until evaluation after discretization.
//!
//! A broadcast records *which* level of the domain stack it expanded, so
//! that later operators can undo it symbolically: averaging over the
//! broadcast domain collapses to the child, and negation/absolute value
//! push straight through.

use crate::domain::{DomainLevel, Domains, IntoDomain};
use crate::kind::{BroadcastLevel, Kind};
use crate::symbol::{Expr, Symbol};
use galvani_error::{Error, Result};

/// Broadcasts a quantity across a new primary domain; the child's existing
/// levels shift up one rank.
pub fn primary_broadcast(child: impl Into<Expr>, domain: impl IntoDomain) -> Result<Expr> {
    primary(child.into(), domain.into_domain(), false)
}

/// Like [`primary_broadcast`], but the result is edge-valued.
pub fn primary_broadcast_to_edges(
    child: impl Into<Expr>,
    domain: impl IntoDomain,
) -> Result<Expr> {
    primary(child.into(), domain.into_domain(), true)
}

/// Broadcasts a quantity with a primary domain across a new secondary
/// domain; existing auxiliary levels shift up one rank.
pub fn secondary_broadcast(child: impl Into<Expr>, domain: impl IntoDomain) -> Result<Expr> {
    secondary(child.into(), domain.into_domain(), false)
}

/// Like [`secondary_broadcast`], but the result is edge-valued.
pub fn secondary_broadcast_to_edges(
    child: impl Into<Expr>,
    domain: impl IntoDomain,
) -> Result<Expr> {
    secondary(child.into(), domain.into_domain(), true)
}

/// Broadcasts a domain-free quantity across a full domain stack at once.
pub fn full_broadcast(child: impl Into<Expr>, domains: Domains) -> Result<Expr> {
    full(child.into(), domains, false)
}

/// Like [`full_broadcast`], but the result is edge-valued.
pub fn full_broadcast_to_edges(child: impl Into<Expr>, domains: Domains) -> Result<Expr> {
    full(child.into(), domains, true)
}

fn primary(child: Expr, domain: Vec<String>, to_edges: bool) -> Result<Expr> {
    if domain.is_empty() {
        return Err(Error::domain("cannot broadcast to an empty domain"));
    }
    let domains = child.domains().shift_up(domain)?;
    Symbol::create(
        Kind::Broadcast {
            level: BroadcastLevel::Primary,
            to_edges,
        },
        broadcast_name(to_edges),
        domains,
        vec![child],
    )
}

fn secondary(child: Expr, domain: Vec<String>, to_edges: bool) -> Result<Expr> {
    if child.domain().is_empty() {
        return Err(Error::type_error(format!(
            "cannot take a secondary broadcast of '{}' since its domain is empty; \
             use a primary broadcast instead",
            child.name()
        )));
    }
    let domains = child.domains().insert_secondary(domain)?;
    Symbol::create(
        Kind::Broadcast {
            level: BroadcastLevel::Secondary,
            to_edges,
        },
        broadcast_name(to_edges),
        domains,
        vec![child],
    )
}

fn full(child: Expr, domains: Domains, to_edges: bool) -> Result<Expr> {
    if !child.domains().is_empty() {
        return Err(Error::type_error(format!(
            "cannot take a full broadcast of '{}' since it already has a domain",
            child.name()
        )));
    }
    if domains.primary.is_empty() {
        return Err(Error::domain("cannot broadcast to an empty domain"));
    }
    Symbol::create(
        Kind::Broadcast {
            level: BroadcastLevel::Full,
            to_edges,
        },
        broadcast_name(to_edges),
        domains,
        vec![child],
    )
}

fn broadcast_name(to_edges: bool) -> &'static str {
    if to_edges {
        "broadcast to edges"
    } else {
        "broadcast"
    }
}

/// Rebuilds a broadcast around a new child with the same level, valuedness
/// and domain stack. The new child must have the same domain stack as the
/// old one.
pub(crate) fn rebroadcast(original: &Expr, new_child: Expr) -> Expr {
    Symbol::raw(
        original.kind().clone(),
        original.name().to_owned(),
        original.domains().clone(),
        vec![new_child],
    )
}

/// Collapses a node-valued broadcast over its primary domain: the child,
/// re-broadcast over whatever auxiliary levels survive.
///
/// Returns `None` for secondary and edge-valued broadcasts, which do not
/// collapse this way.
pub(crate) fn reduce_broadcast(expr: &Expr) -> Option<Result<Expr>> {
    match expr.kind() {
        Kind::Broadcast {
            level: BroadcastLevel::Primary,
            to_edges: false,
        } => Some(Ok(expr.children()[0].clone())),
        Kind::Broadcast {
            level: BroadcastLevel::Full,
            to_edges: false,
        } => {
            let child = expr.children()[0].clone();
            let remaining = expr.domains().strip(DomainLevel::Primary);
            Some(if remaining.is_empty() {
                Ok(child)
            } else if remaining.secondary.is_empty() {
                primary_broadcast(child, remaining.primary)
            } else {
                full_broadcast(child, remaining)
            })
        }
        _ => None,
    }
}

/// A constant one shaped like `expr`: a scalar when `expr` is domain-free,
/// otherwise a full broadcast over `expr`'s domain stack with the same
/// valuedness.
pub fn ones_like(expr: &Expr) -> Expr {
    constant_like(expr, 1.0)
}

/// A constant zero shaped like `expr`.
pub fn zeros_like(expr: &Expr) -> Expr {
    constant_like(expr, 0.0)
}

fn constant_like(expr: &Expr, value: f64) -> Expr {
    if expr.domains().is_empty() {
        Expr::scalar(value)
    } else {
        let to_edges = expr.evaluates_on_edges(DomainLevel::Primary);
        Symbol::raw(
            Kind::Broadcast {
                level: BroadcastLevel::Full,
                to_edges,
            },
            broadcast_name(to_edges),
            expr.domains().clone(),
            vec![Expr::scalar(value)],
        )
    }
}
