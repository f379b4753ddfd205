//! Domain averages: x (electrode thickness), r (particle radius), size
//! (particle-size distribution) and z / yz (through-plane current
//! collector).
//!
//! An average is the definite integral of the quantity divided by the
//! definite integral of one over the same support, built symbolically. The
//! builders recognize the cases where that ratio is the identity and
//! collapse them instead of emitting the integrals:
//!
//! - a domain-free quantity is its own average;
//! - a broadcast is constant along the broadcast domain, so its average is
//!   the broadcast's child;
//! - a concatenation of broadcasts averages to the width-weighted mean of
//!   the children.
//!
//! Averaging a quantity that lives on mesh edges is rejected: the integral
//! of an edge-valued field over cell volumes is not defined.

use crate::binary::binary;
use crate::broadcast::{full_broadcast, ones_like, primary_broadcast, reduce_broadcast};
use crate::domain::{DomainLevel, Domains};
use crate::integral::integral;
use crate::kind::{BinaryOp, BroadcastLevel, Kind};
use crate::symbol::Expr;
use galvani_error::{Error, Result};

/// The average over the through-cell (x) direction.
pub fn x_average(expr: &Expr) -> Result<Expr> {
    if expr.domains().is_empty() {
        return Ok(expr.clone());
    }
    reject_edges(expr, "x-average")?;
    if let Some(reduced) = reduce_broadcast(expr) {
        log::debug!("collapsing x-average of broadcast '{}'", expr.name());
        return reduced;
    }
    if let Kind::Concatenation = expr.kind() {
        if let Some(mean) = average_of_broadcast_concatenation(expr)? {
            return Ok(mean);
        }
    }

    // integrate over whichever level holds the x direction
    let (x_domain, level) = if is_x_domain(expr.domains().secondary.as_slice())
        && !is_x_domain(expr.domain())
    {
        (expr.domains().secondary.clone(), DomainLevel::Secondary)
    } else {
        (expr.domain().to_vec(), DomainLevel::Primary)
    };
    let x = Expr::spatial_variable("x", Domains::new(x_domain.clone()))?;
    let numerator = integral(expr, std::slice::from_ref(&x))?;
    // the whole cell has unit nondimensional thickness, so the denominator
    // integral is the constant one and division by it drops out
    let denominator = if level == DomainLevel::Primary && is_whole_cell(&x_domain) {
        Expr::scalar(1.0)
    } else if level == DomainLevel::Primary {
        integral(&ones_like(expr), std::slice::from_ref(&x))?
    } else {
        integral(&ones_over(x_domain)?, std::slice::from_ref(&x))?
    };
    numerator.try_div(&denominator)
}

/// The average over the particle radius (r) direction.
pub fn r_average(expr: &Expr) -> Result<Expr> {
    if expr.domains().is_empty() {
        return Ok(expr.clone());
    }
    reject_edges(expr, "r-average")?;
    // a quantity broadcast from the particle onto the electrode averages in
    // the particle first, then broadcasts back out
    if let Kind::Broadcast {
        level: BroadcastLevel::Secondary,
        to_edges: false,
    } = expr.kind()
    {
        let child_average = r_average(&expr.children()[0])?;
        return primary_broadcast(child_average, expr.domains().secondary.clone());
    }
    if let Some(reduced) = reduce_broadcast(expr) {
        return reduced;
    }
    average_by_integral(expr, "r")
}

/// The average over a particle-size distribution.
///
/// A quantity with no particle-size domain anywhere in its stack is its own
/// size average.
pub fn size_average(expr: &Expr) -> Result<Expr> {
    if expr.domains().is_empty() {
        return Ok(expr.clone());
    }
    reject_edges(expr, "size-average")?;
    if !has_size_domain(expr.domain()) {
        // the size domain may sit at the secondary level via a broadcast
        if matches!(
            expr.kind(),
            Kind::Broadcast {
                level: BroadcastLevel::Secondary,
                to_edges: false,
            }
        ) && has_size_domain(&expr.domains().secondary)
        {
            return Ok(expr.children()[0].clone());
        }
        return Ok(expr.clone());
    }
    if let Some(reduced) = reduce_broadcast(expr) {
        return reduced;
    }
    average_by_integral(expr, "R")
}

/// The average over the through-plane (z) direction of the current
/// collector.
pub fn z_average(expr: &Expr) -> Result<Expr> {
    if expr.domains().is_empty() {
        return Ok(expr.clone());
    }
    reject_edges(expr, "z-average")?;
    require_current_collector(expr, "z-average")?;
    if let Some(reduced) = reduce_broadcast(expr) {
        return reduced;
    }
    average_by_integral(expr, "z")
}

/// The average over both in-plane directions (y and z) of the current
/// collector.
pub fn yz_average(expr: &Expr) -> Result<Expr> {
    if expr.domains().is_empty() {
        return Ok(expr.clone());
    }
    reject_edges(expr, "yz-average")?;
    require_current_collector(expr, "yz-average")?;
    if let Some(reduced) = reduce_broadcast(expr) {
        return reduced;
    }
    let y = Expr::spatial_variable("y", expr.domains().clone())?;
    let z = Expr::spatial_variable("z", expr.domains().clone())?;
    let variables = [y, z];
    let numerator = integral(expr, &variables)?;
    let denominator = integral(&ones_like(expr), &variables)?;
    numerator.try_div(&denominator)
}

fn reject_edges(expr: &Expr, label: &str) -> Result<()> {
    if expr.evaluates_on_edges(DomainLevel::Primary) {
        return Err(Error::value(format!(
            "Can't take the {label} of a symbol that evaluates on edges"
        )));
    }
    Ok(())
}

fn require_current_collector(expr: &Expr, label: &str) -> Result<()> {
    if expr.domain() != ["current collector"] {
        return Err(Error::domain(format!(
            "{label} only implemented in the 'current collector' domain, \
             but '{}' has domain {:?}",
            expr.name(),
            expr.domain()
        )));
    }
    Ok(())
}

/// `Integral(f) / Integral(1)` over the primary domain.
fn average_by_integral(expr: &Expr, variable_name: &str) -> Result<Expr> {
    let var = Expr::spatial_variable(variable_name, expr.domains().clone())?;
    let numerator = integral(expr, std::slice::from_ref(&var))?;
    let denominator = integral(&ones_like(expr), std::slice::from_ref(&var))?;
    numerator.try_div(&denominator)
}

fn is_x_domain(domain: &[String]) -> bool {
    !domain.is_empty()
        && domain
            .iter()
            .all(|name| name.contains("electrode") || name.contains("separator"))
}

fn is_whole_cell(domain: &[String]) -> bool {
    domain == ["negative electrode", "separator", "positive electrode"]
}

fn has_size_domain(domain: &[String]) -> bool {
    domain.iter().any(|name| name.contains("particle size"))
}

fn ones_over(domain: Vec<String>) -> Result<Expr> {
    full_broadcast(Expr::scalar(1.0), Domains::new(domain))
}

/// The x-average of a concatenation of broadcasts over adjacent
/// sub-domains: the width-weighted mean of the broadcast children, wrapped
/// back over whatever auxiliary levels survive the average.
///
/// The sub-domain widths are expressed symbolically as integrals of one, so
/// the weights stay exact under any later parameterization.
fn average_of_broadcast_concatenation(expr: &Expr) -> Result<Option<Expr>> {
    let is_collapsible = |child: &Expr| {
        matches!(
            child.kind(),
            Kind::Broadcast {
                level: BroadcastLevel::Primary | BroadcastLevel::Full,
                to_edges: false,
            }
        ) && child.children()[0].domains().is_empty()
    };
    if !expr.children().iter().all(is_collapsible) {
        return Ok(None);
    }

    let mut numerator = Expr::scalar(0.0);
    let mut denominator = Expr::scalar(0.0);
    for child in expr.children() {
        let sub_domain = child.domain().to_vec();
        let x = Expr::spatial_variable("x", Domains::new(sub_domain.clone()))?;
        let width = integral(&ones_over(sub_domain)?, &[x])?;
        let value = &child.children()[0];
        numerator = numerator.try_add(&value.try_mul(&width)?)?;
        denominator = denominator.try_add(&width)?;
    }
    // keep the ratio un-simplified; the widths are not compile-time known
    let mean = binary(BinaryOp::Division, &numerator, &denominator)?;

    let remaining = expr.domains().strip(DomainLevel::Primary);
    let wrapped = if remaining.is_empty() {
        mean
    } else if remaining.secondary.is_empty() {
        primary_broadcast(mean, remaining.primary)?
    } else {
        full_broadcast(mean, remaining)?
    };
    Ok(Some(wrapped))
}
