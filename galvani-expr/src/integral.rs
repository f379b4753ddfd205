//! The integral operator family.
//!
//! A definite integral consumes one whole level of the integrand's domain
//! stack: integrating over the primary domain promotes every auxiliary
//! level one rank (secondary becomes primary, and so on); integrating over
//! an auxiliary level strips just that level. The indefinite (running)
//! integrals keep the domain unchanged.

use crate::domain::DomainLevel;
use crate::kind::{IntegralKind, Kind};
use crate::symbol::{Expr, Symbol};
use galvani_error::{Error, Result};

/// A definite integral of `integrand` over its domain level matching the
/// integration variables' domain.
///
/// Multiple variables integrate jointly over the same domain (e.g. `y` and
/// `z` over the current collector).
pub fn integral(integrand: &Expr, variables: &[Expr]) -> Result<Expr> {
    build(IntegralKind::Definite, integrand, variables)
}

/// A running integral from the left boundary; keeps the integrand's domain.
pub fn indefinite_integral(integrand: &Expr, variables: &[Expr]) -> Result<Expr> {
    build(IntegralKind::Indefinite, integrand, variables)
}

/// A running integral from the right boundary; keeps the integrand's
/// domain.
pub fn backward_indefinite_integral(integrand: &Expr, variables: &[Expr]) -> Result<Expr> {
    build(IntegralKind::BackwardIndefinite, integrand, variables)
}

/// An integral over the boundary of the integrand's primary domain.
pub fn boundary_integral(integrand: &Expr) -> Result<Expr> {
    if integrand.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot take boundary integral of '{}' since its domain is empty",
            integrand.name()
        )));
    }
    let domains = integrand.domains().strip(DomainLevel::Primary);
    Ok(Symbol::raw(
        Kind::Integral {
            op: IntegralKind::Boundary,
            variables: Vec::new(),
        },
        "boundary integral",
        domains,
        vec![integrand.clone()],
    ))
}

fn build(op: IntegralKind, integrand: &Expr, variables: &[Expr]) -> Result<Expr> {
    if matches!(op, IntegralKind::Indefinite | IntegralKind::BackwardIndefinite)
        && variables.len() != 1
    {
        return Err(Error::not_implemented(
            "Indefinite integral only implemented w.r.t. one variable",
        ));
    }
    if variables.is_empty() {
        return Err(Error::type_error(
            "integration_variable must be a SpatialVariable or a sequence of them",
        ));
    }
    for variable in variables {
        if !matches!(variable.kind(), Kind::SpatialVariable) {
            return Err(Error::type_error(format!(
                "integration_variable must be a SpatialVariable, not '{}'",
                variable.name()
            )));
        }
    }
    let integration_domain = variables[0].domain().to_vec();
    if variables.iter().any(|v| v.domain() != integration_domain) {
        return Err(Error::type_error(
            "integration_variable must be a sequence of SpatialVariables sharing one domain",
        ));
    }
    if integrand.domain().is_empty() {
        return Err(Error::domain(format!(
            "Cannot integrate '{}' since its domain is empty",
            integrand.name()
        )));
    }
    let Some(level) = integrand.domains().find(&integration_domain) else {
        return Err(Error::domain(format!(
            "integration variable domain {:?} does not appear in the domain stack of '{}'",
            integration_domain,
            integrand.name()
        )));
    };

    let domains = match op {
        IntegralKind::Definite => integrand.domains().strip(level),
        _ => integrand.domains().clone(),
    };
    let name = match op {
        IntegralKind::Definite => format!(
            "integral {}{:?}",
            variables
                .iter()
                .map(|v| format!("d{} ", v.name()))
                .collect::<String>(),
            integration_domain
        ),
        IntegralKind::Indefinite => format!(
            "{} integrated w.r.t {} on {:?}",
            integrand.name(),
            variables[0].name(),
            integration_domain
        ),
        IntegralKind::BackwardIndefinite => format!(
            "{} integrated backward w.r.t {} on {:?}",
            integrand.name(),
            variables[0].name(),
            integration_domain
        ),
        IntegralKind::Boundary => unreachable!("boundary integrals take no variables"),
    };
    Ok(Symbol::raw(
        Kind::Integral {
            op,
            variables: variables.to_vec(),
        },
        name,
        domains,
        vec![integrand.clone()],
    ))
}

/// The integration variables stored in an integral node.
pub fn integration_variables(expr: &Expr) -> &[Expr] {
    match expr.kind() {
        Kind::Integral { variables, .. } => variables,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::Domains;
    use galvani_error::Error;
    use pretty_assertions::assert_eq;
    use super::*;

    fn spatial(name: &str, domain: &str) -> Expr {
        Expr::spatial_variable(name, Domains::new(domain)).unwrap()
    }

    #[test]
    fn integral_over_the_primary_domain_removes_it() {
        let a = Expr::variable_in("a", Domains::new("negative electrode")).unwrap();
        let x = spatial("x", "negative electrode");
        let inta = integral(&a, &[x.clone()]).unwrap();
        assert_eq!(inta.name(), "integral dx [\"negative electrode\"]");
        assert_eq!(inta.children()[0].name(), a.name());
        assert_eq!(integration_variables(&inta)[0], x);
        assert!(inta.domains().is_empty());
    }

    #[test]
    fn integral_promotes_auxiliary_levels() {
        let x = spatial("x", "negative electrode");

        let a_sec = Expr::variable_in(
            "a",
            Domains::new("negative electrode").with_secondary("current collector"),
        )
        .unwrap();
        let inta_sec = integral(&a_sec, &[x.clone()]).unwrap();
        assert_eq!(inta_sec.domain(), ["current collector"]);
        assert!(inta_sec.domains().secondary.is_empty());

        let a_tert = Expr::variable_in(
            "a",
            Domains::new("negative electrode")
                .with_secondary("current collector")
                .with_tertiary("some extra domain"),
        )
        .unwrap();
        let inta_tert = integral(&a_tert, &[x.clone()]).unwrap();
        assert_eq!(inta_tert.domain(), ["current collector"]);
        assert_eq!(inta_tert.domains().secondary, ["some extra domain"]);

        let a_quat = Expr::variable_in(
            "a",
            Domains::new("negative electrode")
                .with_secondary("current collector")
                .with_tertiary("some extra domain")
                .with_quaternary("another extra domain"),
        )
        .unwrap();
        let inta_quat = integral(&a_quat, &[x]).unwrap();
        assert_eq!(inta_quat.domain(), ["current collector"]);
        assert_eq!(inta_quat.domains().secondary, ["some extra domain"]);
        assert_eq!(inta_quat.domains().tertiary, ["another extra domain"]);
    }

    #[test]
    fn integral_in_an_auxiliary_level_strips_that_level() {
        let a_tert = Expr::variable_in(
            "a",
            Domains::new("negative electrode")
                .with_secondary("current collector")
                .with_tertiary("some extra domain"),
        )
        .unwrap();
        let a_quat = Expr::variable_in(
            "a",
            Domains::new("negative electrode")
                .with_secondary("current collector")
                .with_tertiary("some extra domain")
                .with_quaternary("another extra domain"),
        )
        .unwrap();

        // in the secondary domain
        let y = spatial("y", "current collector");
        let inta_sec_y = integral(&a_tert, &[y.clone()]).unwrap();
        assert_eq!(inta_sec_y.domain(), ["negative electrode"]);
        assert_eq!(inta_sec_y.domains().secondary, ["some extra domain"]);

        let inta_quat_y = integral(&a_quat, &[y]).unwrap();
        assert_eq!(inta_quat_y.domain(), ["negative electrode"]);
        assert_eq!(inta_quat_y.domains().secondary, ["some extra domain"]);
        assert_eq!(inta_quat_y.domains().tertiary, ["another extra domain"]);

        // in the tertiary domain
        let z = spatial("z", "some extra domain");
        let inta_tert_z = integral(&a_tert, &[z.clone()]).unwrap();
        assert_eq!(inta_tert_z.domain(), ["negative electrode"]);
        assert_eq!(inta_tert_z.domains().secondary, ["current collector"]);

        let inta_quat_z = integral(&a_quat, &[z]).unwrap();
        assert_eq!(inta_quat_z.domain(), ["negative electrode"]);
        assert_eq!(inta_quat_z.domains().secondary, ["current collector"]);
        assert_eq!(inta_quat_z.domains().tertiary, ["another extra domain"]);

        // in the quaternary domain
        let zz = spatial("Z", "another extra domain");
        let inta_quat_zz = integral(&a_quat, &[zz]).unwrap();
        assert_eq!(inta_quat_zz.domain(), ["negative electrode"]);
        assert_eq!(inta_quat_zz.domains().secondary, ["current collector"]);
        assert_eq!(inta_quat_zz.domains().tertiary, ["some extra domain"]);
        assert!(inta_quat_zz.domains().quaternary.is_empty());
    }

    #[test]
    fn joint_integral_over_two_variables() {
        let b = Expr::variable_in("b", Domains::new("current collector")).unwrap();
        let y = spatial("y", "current collector");
        let z = spatial("z", "current collector");
        let intb = integral(&b, &[y.clone(), z.clone()]).unwrap();
        assert_eq!(intb.name(), "integral dy dz [\"current collector\"]");
        assert_eq!(integration_variables(&intb).to_vec(), vec![y, z]);
        assert!(intb.domain().is_empty());
    }

    #[test]
    fn indefinite_integral_keeps_the_domain()  {
        let a = Expr::variable_in("a", Domains::new("negative electrode")).unwrap();
        let x = spatial("x", "negative electrode");
        let inta = indefinite_integral(&a, &[x.clone()]).unwrap();
        assert_eq!(inta.name(), "a integrated w.r.t x on [\"negative electrode\"]");
        assert_eq!(inta.domain(), ["negative electrode"]);

        let a_sec = Expr::variable_in(
            "a",
            Domains::new("negative electrode").with_secondary("current collector"),
        )
        .unwrap();
        let inta_sec = indefinite_integral(&a_sec, &[x.clone()]).unwrap();
        assert_eq!(inta_sec.domain(), ["negative electrode"]);
        assert_eq!(inta_sec.domains().secondary, ["current collector"]);

        let backward = backward_indefinite_integral(&a, &[x]).unwrap();
        assert_eq!(
            backward.name(),
            "a integrated backward w.r.t x on [\"negative electrode\"]"
        );
    }

    #[test]
    fn expected_errors() {
        let a = Expr::variable_in("a", Domains::new("negative electrode")).unwrap();
        let x = spatial("x", "separator");
        let y = Expr::variable("y");
        let z = spatial("z", "negative electrode");

        assert!(matches!(integral(&a, &[x.clone()]).unwrap_err(), Error::Domain(_)));
        assert!(matches!(
            integral(&a, &[y.clone()]).unwrap_err(),
            Error::Type(msg) if msg.contains("integration_variable must be")
        ));
        assert_eq!(
            indefinite_integral(&a, &[x, y]).unwrap_err(),
            Error::not_implemented("Indefinite integral only implemented w.r.t. one variable")
        );

        let scalar = Expr::scalar(4.0);
        assert!(matches!(integral(&scalar, &[z]).unwrap_err(), Error::Domain(_)));
    }
}
