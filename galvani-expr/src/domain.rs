//! Domain metadata attached to every node, and the rules for combining it.
//!
//! A quantity in a battery model is defined over an ordered stack of named
//! spatial regions. The *primary* domain is the region the quantity varies
//! over most rapidly (e.g. `"negative particle"`); the *secondary*,
//! *tertiary* and *quaternary* levels record the coarser regions each point
//! of the primary domain is additionally indexed by (e.g. the electrode the
//! particle sits in, then the current-collector point the electrode sits
//! at). An empty primary domain means the quantity has no spatial extent at
//! all.
//!
//! The stack is strictly ordered: a level may only be populated when every
//! level below it is, and a domain name may appear at most once across the
//! stack. Operators that consume a level (integration, boundary values,
//! averaging) remove it and shift every higher level down one rank.

use galvani_error::{Error, Result};

/// One level of the domain stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainLevel {
    Primary,
    Secondary,
    Tertiary,
    Quaternary,
}

impl DomainLevel {
    /// The level name as it appears in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Quaternary => "quaternary",
        }
    }
}

/// Conversion of the various ways callers spell a domain (a single name, a
/// list of adjacent sub-domains) into the canonical representation.
pub trait IntoDomain {
    fn into_domain(self) -> Vec<String>;
}

impl IntoDomain for &str {
    fn into_domain(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoDomain for String {
    fn into_domain(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoDomain for Vec<String> {
    fn into_domain(self) -> Vec<String> {
        self
    }
}

impl IntoDomain for Vec<&str> {
    fn into_domain(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl<const N: usize> IntoDomain for [&str; N] {
    fn into_domain(self) -> Vec<String> {
        self.iter().map(|s| (*s).to_owned()).collect()
    }
}

impl IntoDomain for &[String] {
    fn into_domain(self) -> Vec<String> {
        self.to_vec()
    }
}

/// The full domain stack of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Domains {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub tertiary: Vec<String>,
    pub quaternary: Vec<String>,
}

impl Domains {
    /// A stack with no spatial extent.
    pub fn none() -> Self {
        Self::default()
    }

    /// A stack with only a primary domain.
    pub fn new(primary: impl IntoDomain) -> Self {
        Self {
            primary: primary.into_domain(),
            ..Self::default()
        }
    }

    pub fn with_secondary(mut self, secondary: impl IntoDomain) -> Self {
        self.secondary = secondary.into_domain();
        self
    }

    pub fn with_tertiary(mut self, tertiary: impl IntoDomain) -> Self {
        self.tertiary = tertiary.into_domain();
        self
    }

    pub fn with_quaternary(mut self, quaternary: impl IntoDomain) -> Self {
        self.quaternary = quaternary.into_domain();
        self
    }

    /// The domain names at the given level.
    pub fn level(&self, level: DomainLevel) -> &[String] {
        match level {
            DomainLevel::Primary => &self.primary,
            DomainLevel::Secondary => &self.secondary,
            DomainLevel::Tertiary => &self.tertiary,
            DomainLevel::Quaternary => &self.quaternary,
        }
    }

    /// True if no level is populated.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
            && self.secondary.is_empty()
            && self.tertiary.is_empty()
            && self.quaternary.is_empty()
    }

    /// Checks the ordering and disjointness invariants.
    ///
    /// A level may only be populated when every level below it is, and no
    /// domain name may appear at more than one level.
    pub fn validate(&self) -> Result<()> {
        let levels = [
            (&self.primary, DomainLevel::Primary),
            (&self.secondary, DomainLevel::Secondary),
            (&self.tertiary, DomainLevel::Tertiary),
            (&self.quaternary, DomainLevel::Quaternary),
        ];

        for window in levels.windows(2) {
            let (lower, _) = &window[0];
            let (upper, upper_level) = &window[1];
            if lower.is_empty() && !upper.is_empty() {
                return Err(Error::domain(format!(
                    "{} domain {:?} is set but a lower level is empty",
                    upper_level.as_str(),
                    upper
                )));
            }
        }

        for (i, (level, level_name)) in levels.iter().enumerate() {
            for (other, _) in levels.iter().skip(i + 1) {
                if let Some(name) = level.iter().find(|name| other.contains(*name)) {
                    return Err(Error::domain(format!(
                        "domain '{}' appears at the {} level and at a higher level",
                        name,
                        level_name.as_str()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Merges the domains of two operands of a binary operator.
    ///
    /// An empty side inherits the other side's stack; two populated stacks
    /// must agree level by level.
    pub fn combine(lhs: &Self, rhs: &Self) -> Result<Self> {
        if lhs.is_empty() {
            return Ok(rhs.clone());
        }
        if rhs.is_empty() || lhs == rhs {
            return Ok(lhs.clone());
        }

        let mut merged = Self::none();
        for level in [
            DomainLevel::Primary,
            DomainLevel::Secondary,
            DomainLevel::Tertiary,
            DomainLevel::Quaternary,
        ] {
            let l = lhs.level(level);
            let r = rhs.level(level);
            let out = match (l.is_empty(), r.is_empty()) {
                (true, _) => r,
                (_, true) => l,
                (false, false) if l == r => l,
                _ => {
                    return Err(Error::domain(format!(
                        "mismatched {} domains {:?} and {:?}",
                        level.as_str(),
                        l,
                        r
                    )))
                }
            };
            merged.set(level, out.to_vec());
        }
        Ok(merged)
    }

    /// Removes one level and shifts every higher level down a rank.
    ///
    /// This is the domain arithmetic of integration and boundary values:
    /// consuming the primary domain promotes secondary to primary and so on;
    /// consuming an auxiliary level leaves the levels below it untouched.
    pub fn strip(&self, level: DomainLevel) -> Self {
        let mut out = self.clone();
        match level {
            DomainLevel::Primary => {
                out.primary = self.secondary.clone();
                out.secondary = self.tertiary.clone();
                out.tertiary = self.quaternary.clone();
                out.quaternary = Vec::new();
            }
            DomainLevel::Secondary => {
                out.secondary = self.tertiary.clone();
                out.tertiary = self.quaternary.clone();
                out.quaternary = Vec::new();
            }
            DomainLevel::Tertiary => {
                out.tertiary = self.quaternary.clone();
                out.quaternary = Vec::new();
            }
            DomainLevel::Quaternary => {
                out.quaternary = Vec::new();
            }
        }
        out
    }

    /// Pushes every level up one rank and installs a new primary domain.
    ///
    /// Fails when the stack already uses its quaternary level, since there is
    /// no fifth level to shift into.
    pub fn shift_up(&self, new_primary: Vec<String>) -> Result<Self> {
        if !self.quaternary.is_empty() {
            return Err(Error::domain(
                "cannot add a domain level: the quaternary level is already in use",
            ));
        }
        Ok(Self {
            primary: new_primary,
            secondary: self.primary.clone(),
            tertiary: self.secondary.clone(),
            quaternary: self.tertiary.clone(),
        })
    }

    /// Inserts a new secondary domain, pushing the old auxiliary levels up.
    pub fn insert_secondary(&self, secondary: Vec<String>) -> Result<Self> {
        if !self.quaternary.is_empty() {
            return Err(Error::domain(
                "cannot add a domain level: the quaternary level is already in use",
            ));
        }
        Ok(Self {
            primary: self.primary.clone(),
            secondary,
            tertiary: self.secondary.clone(),
            quaternary: self.tertiary.clone(),
        })
    }

    /// The level at which `domain` appears, if any.
    pub fn find(&self, domain: &[String]) -> Option<DomainLevel> {
        if !domain.is_empty() {
            for level in [
                DomainLevel::Primary,
                DomainLevel::Secondary,
                DomainLevel::Tertiary,
                DomainLevel::Quaternary,
            ] {
                if self.level(level) == domain {
                    return Some(level);
                }
            }
        }
        None
    }

    fn set(&mut self, level: DomainLevel, names: Vec<String>) {
        match level {
            DomainLevel::Primary => self.primary = names,
            DomainLevel::Secondary => self.secondary = names,
            DomainLevel::Tertiary => self.tertiary = names,
            DomainLevel::Quaternary => self.quaternary = names,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn ordering_invariant() {
        let gap = Domains {
            primary: Vec::new(),
            secondary: vec!["current collector".to_owned()],
            ..Domains::none()
        };
        assert!(gap.validate().is_err());

        let ok = Domains::new("negative electrode").with_secondary("current collector");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn disjointness_invariant() {
        let dup = Domains::new("negative electrode").with_secondary("negative electrode");
        assert!(dup.validate().is_err());
    }

    #[test]
    fn strip_primary_promotes_all_levels() {
        let domains = Domains::new("negative electrode")
            .with_secondary("current collector")
            .with_tertiary("some extra domain")
            .with_quaternary("another extra domain");
        let stripped = domains.strip(DomainLevel::Primary);
        assert_eq!(stripped.primary, vec!["current collector"]);
        assert_eq!(stripped.secondary, vec!["some extra domain"]);
        assert_eq!(stripped.tertiary, vec!["another extra domain"]);
        assert!(stripped.quaternary.is_empty());
    }

    #[test]
    fn strip_tertiary_keeps_lower_levels() {
        let domains = Domains::new("negative electrode")
            .with_secondary("current collector")
            .with_tertiary("some extra domain")
            .with_quaternary("another extra domain");
        let stripped = domains.strip(DomainLevel::Tertiary);
        assert_eq!(stripped.primary, vec!["negative electrode"]);
        assert_eq!(stripped.secondary, vec!["current collector"]);
        assert_eq!(stripped.tertiary, vec!["another extra domain"]);
        assert!(stripped.quaternary.is_empty());
    }

    #[test]
    fn combine_inherits_from_the_non_empty_side() {
        let lhs = Domains::none();
        let rhs = Domains::new("separator");
        assert_eq!(Domains::combine(&lhs, &rhs).unwrap(), rhs);
        assert_eq!(Domains::combine(&rhs, &lhs).unwrap(), rhs);
    }

    #[test]
    fn combine_rejects_conflicting_domains() {
        let lhs = Domains::new("separator");
        let rhs = Domains::new("positive electrode");
        assert!(Domains::combine(&lhs, &rhs).is_err());
    }

    #[test]
    fn shift_up_refuses_a_fifth_level() {
        let full = Domains::new("a")
            .with_secondary("b")
            .with_tertiary("c")
            .with_quaternary("d");
        assert!(full.shift_up(vec!["e".to_owned()]).is_err());
    }
}
