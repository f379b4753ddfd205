//! Concatenation of quantities over adjacent sub-domains.
//!
//! The children are joined in order along the primary domain (e.g. negative
//! electrode / separator / positive electrode); their auxiliary levels must
//! agree and are carried through unchanged.

use crate::domain::Domains;
use crate::kind::Kind;
use crate::symbol::{Expr, Symbol};
use galvani_error::{Error, Result};

/// Joins `children` over their adjacent primary domains.
pub fn concatenation(children: &[Expr]) -> Result<Expr> {
    if children.is_empty() {
        return Err(Error::value("cannot concatenate zero symbols"));
    }
    let mut primary = Vec::new();
    for child in children {
        if child.domain().is_empty() {
            return Err(Error::domain(format!(
                "cannot concatenate '{}' since its domain is empty",
                child.name()
            )));
        }
        for name in child.domain() {
            if primary.contains(name) {
                return Err(Error::domain(format!(
                    "domain '{name}' appears in more than one concatenated symbol"
                )));
            }
            primary.push(name.clone());
        }
    }
    let first = children[0].domains();
    for child in &children[1..] {
        let other = child.domains();
        if other.secondary != first.secondary
            || other.tertiary != first.tertiary
            || other.quaternary != first.quaternary
        {
            return Err(Error::domain(format!(
                "cannot concatenate symbols with different auxiliary domains \
                 ({:?} and {:?})",
                first.secondary, other.secondary
            )));
        }
    }
    let domains = Domains {
        primary,
        secondary: first.secondary.clone(),
        tertiary: first.tertiary.clone(),
        quaternary: first.quaternary.clone(),
    };
    Symbol::create(Kind::Concatenation, "concatenation", domains, children.to_vec())
}

#[cfg(test)]
mod tests {
    use crate::broadcast::{full_broadcast, primary_broadcast};
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn domains_join_in_order() {
        let conc = concatenation(&[
            primary_broadcast(1.0, "negative electrode").unwrap(),
            primary_broadcast(2.0, "separator").unwrap(),
            primary_broadcast(3.0, "positive electrode").unwrap(),
        ])
        .unwrap();
        assert_eq!(
            conc.domain(),
            ["negative electrode", "separator", "positive electrode"]
        );
        assert_eq!(conc.name(), "concatenation");
    }

    #[test]
    fn auxiliary_domains_carry_through() {
        let conc = concatenation(&[
            full_broadcast(1.0, Domains::new("negative electrode").with_secondary("current collector")).unwrap(),
            full_broadcast(2.0, Domains::new("separator").with_secondary("current collector")).unwrap(),
        ])
        .unwrap();
        assert_eq!(conc.domains().secondary, ["current collector"]);
    }

    #[test]
    fn mismatched_auxiliary_domains_are_rejected() {
        let result = concatenation(&[
            full_broadcast(1.0, Domains::new("negative electrode").with_secondary("current collector")).unwrap(),
            primary_broadcast(2.0, "separator").unwrap(),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_domains_are_rejected() {
        let result = concatenation(&[
            primary_broadcast(1.0, "separator").unwrap(),
            primary_broadcast(2.0, "separator").unwrap(),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_domains_are_rejected() {
        assert!(concatenation(&[Expr::scalar(1.0)]).is_err());
        assert!(concatenation(&[]).is_err());
    }
}
