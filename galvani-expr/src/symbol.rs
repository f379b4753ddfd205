//! The expression node type and its shared, immutable handle.
//!
//! An expression is a DAG of [`Symbol`] nodes: subtrees may be shared by
//! reference (an [`Expr`] is a cheap reference-counted handle), and no node
//! is ever mutated after construction. Simplification and differentiation
//! rebuild the parts of a tree they change and share the rest.
//!
//! # Structural identity
//!
//! A recurring problem in symbolic computation is deciding whether two
//! expressions are semantically equal. Full semantic equality is
//! intractable: `x^2 + 2x + 1` and `(x + 1)^2` denote the same function but
//! no local inspection reveals it. This engine therefore defines and uses a
//! cheaper relation, **structural identity**: two nodes are identical when
//! they have the same kind (including any payload such as a scalar value,
//! state slice or boundary side), the same name, the same domain stack, and
//! structurally identical children in the same order.
//!
//! Structural identity is a strict subset of semantic equality, so it can
//! never report a false positive, and it is cheap: every node exposes a
//! 64-bit fingerprint, [`Symbol::id`], computed lazily from exactly the
//! inputs above and memoized. Two nodes built independently with the same
//! structure produce the same id even though they are distinct allocations,
//! which is what makes the id usable for deduplication, for the evaluator's
//! memoization cache, and as the canonical equality in tests.
//!
//! The [`PartialEq`]/[`Eq`]/[`Hash`] implementations for [`Symbol`] and
//! [`Expr`] compare structural ids, never allocation identity.

use crate::domain::{DomainLevel, Domains};
use crate::kind::{Kind, StateSlice};
use crate::numerical::sparse::CsrMatrix;
use galvani_error::Result;
use ndarray::Array2;
use once_cell::unsync::OnceCell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A node in an expression DAG.
///
/// Nodes are created through the typed constructors on [`Expr`] and the
/// operator builders; every constructor validates its domain and operand
/// preconditions eagerly, so a `Symbol` that exists is a valid one.
#[derive(Debug)]
pub struct Symbol {
    kind: Kind,
    name: String,
    domains: Domains,
    children: Vec<Expr>,
    id: OnceCell<u64>,
}

/// A shared handle to an immutable [`Symbol`].
///
/// Cloning an `Expr` clones the handle, not the tree.
#[derive(Debug, Clone)]
pub struct Expr(Rc<Symbol>);

impl std::ops::Deref for Expr {
    type Target = Symbol;

    fn deref(&self) -> &Symbol {
        &self.0
    }
}

impl Symbol {
    /// Builds a node after validating its domain stack.
    pub(crate) fn create(
        kind: Kind,
        name: impl Into<String>,
        domains: Domains,
        children: Vec<Expr>,
    ) -> Result<Expr> {
        domains.validate()?;
        Ok(Self::raw(kind, name, domains, children))
    }

    /// Builds a node whose domain stack is taken from an already-validated
    /// source, skipping re-validation.
    pub(crate) fn raw(
        kind: Kind,
        name: impl Into<String>,
        domains: Domains,
        children: Vec<Expr>,
    ) -> Expr {
        Expr(Rc::new(Symbol {
            kind,
            name: name.into(),
            domains,
            children,
            id: OnceCell::new(),
        }))
    }

    /// The node kind.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The display label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary domain.
    pub fn domain(&self) -> &[String] {
        &self.domains.primary
    }

    /// The full domain stack, auxiliary levels included.
    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    /// The ordered children.
    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    /// The only child of a unary operator.
    ///
    /// # Panics
    ///
    /// Panics when called on a leaf.
    pub fn child(&self) -> &Expr {
        &self.children[0]
    }

    /// The structural id: a deterministic fingerprint of kind, payload,
    /// name, domain stack and children ids, memoized per node.
    pub fn id(&self) -> u64 {
        *self.id.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.kind.hash_structure(&mut hasher);
            self.name.hash(&mut hasher);
            self.domains.hash(&mut hasher);
            for child in &self.children {
                child.id().hash(&mut hasher);
            }
            hasher.finish()
        })
    }

    /// Whether this node is (recursively) built only from constant leaves.
    ///
    /// `StateVector`, `InputParameter`, `Time` and the abstract placeholder
    /// leaves are not constant; [`NotConstant`](Kind::NotConstant) forces
    /// its subtree to report non-constant.
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            Kind::Scalar(_) | Kind::Vector(_) | Kind::Matrix(_) => true,
            Kind::StateVector(_)
            | Kind::InputParameter
            | Kind::Time
            | Kind::Variable
            | Kind::SpatialVariable
            | Kind::NotConstant => false,
            _ => self.children.iter().all(|c| c.is_constant()),
        }
    }

    /// Whether the discretized quantity lives on mesh edges (cell faces)
    /// rather than nodes (cell centres) at the given domain level.
    ///
    /// Gradients and upwinding produce edge values; divergence consumes
    /// them and produces node values; broadcasts record the valuedness they
    /// were built with; arithmetic inherits from its operands.
    pub fn evaluates_on_edges(&self, level: DomainLevel) -> bool {
        match &self.kind {
            Kind::Gradient | Kind::Upwind | Kind::Downwind => level == DomainLevel::Primary,
            Kind::Broadcast {
                level: broadcast_level,
                to_edges,
            } => {
                *to_edges
                    && match broadcast_level {
                        crate::kind::BroadcastLevel::Primary | crate::kind::BroadcastLevel::Full => {
                            level == DomainLevel::Primary
                        }
                        crate::kind::BroadcastLevel::Secondary => level == DomainLevel::Secondary,
                    }
            }
            Kind::Divergence
            | Kind::Laplacian
            | Kind::GradientSquared
            | Kind::Index(_)
            | Kind::DeltaFunction(_)
            | Kind::Integral { .. }
            | Kind::BoundaryValue(_)
            | Kind::BoundaryOperator(_) => false,
            Kind::Binary(_) | Kind::Concatenation => {
                self.children.iter().any(|c| c.evaluates_on_edges(level))
            }
            Kind::Negate
            | Kind::AbsoluteValue
            | Kind::Sign
            | Kind::Floor
            | Kind::Ceiling
            | Kind::NotConstant
            | Kind::UnaryOperator
            | Kind::SpatialOperator => self
                .children
                .first()
                .map(|c| c.evaluates_on_edges(level))
                .unwrap_or(false),
            Kind::Scalar(_)
            | Kind::Vector(_)
            | Kind::Matrix(_)
            | Kind::StateVector(_)
            | Kind::InputParameter
            | Kind::Time
            | Kind::Variable
            | Kind::SpatialVariable => false,
        }
    }

    /// The number of entries this node evaluates to, when it is known
    /// without evaluating. Used by the strict slice-bounds check.
    pub(crate) fn evaluation_size(&self) -> Option<usize> {
        match &self.kind {
            Kind::Scalar(_) => Some(1),
            Kind::Vector(a) => Some(a.nrows()),
            Kind::Matrix(m) => Some(m.nrows()),
            Kind::StateVector(slice) => Some(slice.len()),
            Kind::Index(spec) => spec.len(),
            Kind::Negate | Kind::AbsoluteValue | Kind::Sign | Kind::Floor | Kind::Ceiling
            | Kind::NotConstant => self.children[0].evaluation_size(),
            _ => None,
        }
    }
}

/// Structural identity, not allocation identity.
impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// leaf constructors

impl Expr {
    /// A literal numeric value. The primary target of constant folding.
    pub fn scalar(value: f64) -> Expr {
        Symbol::raw(Kind::Scalar(value), format!("{value}"), Domains::none(), Vec::new())
    }

    /// A constant dense column vector.
    pub fn vector(values: Array2<f64>) -> Expr {
        Symbol::raw(Kind::Vector(values), "vector", Domains::none(), Vec::new())
    }

    /// A constant sparse matrix.
    pub fn matrix(values: CsrMatrix) -> Expr {
        Symbol::raw(Kind::Matrix(values), "matrix", Domains::none(), Vec::new())
    }

    /// A slice of the external state vector `y`.
    pub fn state_vector(slice: std::ops::Range<usize>) -> Expr {
        let state_slice = StateSlice {
            start: slice.start,
            stop: slice.end,
        };
        Symbol::raw(
            Kind::StateVector(state_slice),
            format!("y[{}:{}]", state_slice.start, state_slice.stop),
            Domains::none(),
            Vec::new(),
        )
    }

    /// A state-vector slice carrying a domain stack.
    pub fn state_vector_in(slice: std::ops::Range<usize>, domains: Domains) -> Result<Expr> {
        let state_slice = StateSlice {
            start: slice.start,
            stop: slice.end,
        };
        Symbol::create(
            Kind::StateVector(state_slice),
            format!("y[{}:{}]", state_slice.start, state_slice.stop),
            domains,
            Vec::new(),
        )
    }

    /// A named external input, read from the `inputs` map at evaluation.
    pub fn input_parameter(name: &str) -> Expr {
        Symbol::raw(Kind::InputParameter, name, Domains::none(), Vec::new())
    }

    /// The time variable, read from `t` at evaluation.
    pub fn time() -> Expr {
        Symbol::raw(Kind::Time, "time", Domains::none(), Vec::new())
    }

    /// An abstract named placeholder with no spatial extent.
    pub fn variable(name: &str) -> Expr {
        Symbol::raw(Kind::Variable, name, Domains::none(), Vec::new())
    }

    /// An abstract named placeholder defined over a domain stack.
    pub fn variable_in(name: &str, domains: Domains) -> Result<Expr> {
        Symbol::create(Kind::Variable, name, domains, Vec::new())
    }

    /// A spatial coordinate over a domain stack; the only legal integration
    /// variable.
    pub fn spatial_variable(name: &str, domains: Domains) -> Result<Expr> {
        Symbol::create(Kind::SpatialVariable, name, domains, Vec::new())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::scalar(value)
    }
}

impl From<&Expr> for Expr {
    fn from(value: &Expr) -> Self {
        value.clone()
    }
}

// display

impl Symbol {
    fn fmt_operand(child: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if matches!(child.kind(), Kind::Binary(_)) {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Scalar(value) => write!(f, "{value}"),
            Kind::Vector(_)
            | Kind::Matrix(_)
            | Kind::StateVector(_)
            | Kind::InputParameter
            | Kind::Time
            | Kind::Variable
            | Kind::SpatialVariable => f.write_str(&self.name),
            Kind::Negate => {
                f.write_str("-")?;
                Self::fmt_operand(&self.children[0], f)
            }
            Kind::Binary(op) => {
                Self::fmt_operand(&self.children[0], f)?;
                write!(f, " {} ", op.symbol())?;
                Self::fmt_operand(&self.children[1], f)
            }
            _ => {
                write!(f, "{}(", self.name)?;
                let mut iter = self.children.iter();
                if let Some(child) = iter.next() {
                    write!(f, "{child}")?;
                    for child in iter {
                        write!(f, ", {child}")?;
                    }
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl Symbol {
    /// A pretty symbolic form for reporting. Not consumed by solvers.
    pub fn to_equation(&self) -> String {
        match &self.kind {
            Kind::Gradient => format!("∇({})", self.children[0].to_equation()),
            Kind::Divergence => format!("∇⋅({})", self.children[0].to_equation()),
            Kind::Laplacian => format!("∇²({})", self.children[0].to_equation()),
            Kind::Integral { variables, .. } => {
                let vars = variables
                    .iter()
                    .map(|v| format!(" d{}", v.name()))
                    .collect::<String>();
                format!("∫ {}{vars}", self.children[0].to_equation())
            }
            Kind::BoundaryValue(side) => {
                format!("{}|{side}", self.children[0].to_equation())
            }
            Kind::Negate => format!("-{}", self.children[0].to_equation()),
            Kind::Binary(op) => format!(
                "{} {} {}",
                self.children[0].to_equation(),
                op.symbol(),
                self.children[1].to_equation()
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::unary::unary_operator;
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn ids_are_equal_across_allocations() {
        let a = Expr::scalar(4.0);
        let un1 = unary_operator("test", &a);
        let un2 = unary_operator("test", &a);
        let un3 = unary_operator("new test", &a);
        assert_eq!(un1.id(), un2.id());
        assert_ne!(un1.id(), un3.id());

        // a fresh, structurally identical leaf still matches
        let b = Expr::scalar(4.0);
        let un4 = unary_operator("test", &b);
        assert_eq!(un1.id(), un4.id());

        // a different child does not
        let d = Expr::scalar(42.0);
        let un5 = unary_operator("test", &d);
        assert_ne!(un1.id(), un5.id());
    }

    #[test]
    fn ids_depend_on_the_domain_stack() {
        let plain = Expr::variable_in("a", Domains::new("negative electrode")).unwrap();
        let stacked = Expr::variable_in(
            "a",
            Domains::new("negative electrode").with_secondary("current collector"),
        )
        .unwrap();
        assert_ne!(plain.id(), stacked.id());
    }

    #[test]
    fn equality_is_structural_not_allocation() {
        let a = Expr::state_vector(0..5);
        let b = Expr::state_vector(0..5);
        assert_eq!(a, b);
        assert_ne!(a, Expr::state_vector(0..4));
    }

    #[test]
    fn generic_unary_operator_inherits_the_domain() {
        let a = Expr::variable_in("a", Domains::new("test")).unwrap();
        let un = unary_operator("unary test", &a);
        assert_eq!(un.children()[0].name(), a.name());
        assert_eq!(un.domain(), a.domain());
    }

    #[test]
    fn state_vector_display() {
        let v = Expr::state_vector(0..5);
        assert_eq!(v.to_string(), "y[0:5]");
        assert_eq!(v.name(), "y[0:5]");
    }

    #[test]
    fn constantness() {
        assert!(Expr::scalar(1.0).is_constant());
        assert!(!Expr::state_vector(0..1).is_constant());
        assert!(!Expr::input_parameter("p").is_constant());
        assert!(!Expr::time().is_constant());
    }
}
