//! A symbolic expression framework for building, simplifying, differentiating
//! and numerically evaluating the PDE/DAE systems of battery models.
//!
//! The engine is a small compiler over an implicit domain-specific algebra:
//! submodels build a typed tree of [`Symbol`] nodes through the constructors
//! in this crate, every constructor proves its domain and node/edge
//! invariants eagerly (an invalid tree cannot be built), cheap rewrites run
//! opportunistically during construction, and the finished tree is consumed
//! through three contracts:
//!
//! - [`evaluate`](symbol::Symbol::evaluate) — numeric evaluation against an
//!   external state vector, inputs map and time,
//! - [`diff`](symbol::Expr::diff) — symbolic differentiation with respect to
//!   a state-vector slice,
//! - structural identity ([`Symbol::id`](symbol::Symbol::id)) — the
//!   canonical equality used for deduplication and memoization.
//!
//! Physical submodels, parameter databases, meshes, time integrators and
//! plotting are external collaborators; none of them live here.
//!
//! # Example
//!
//! ```
//! use galvani_expr::{grad, div, Domains, Expr};
//!
//! let c = Expr::variable_in("c", Domains::new("negative electrode"))?;
//! let flux = -grad(&c)?;
//! let rate = div(&flux)?;
//!
//! // the sign commutes outside the divergence structurally
//! assert_eq!(rate.id(), (-div(&grad(&c)?)?).id());
//! # Ok::<(), galvani_expr::Error>(())
//! ```

pub mod average;
pub mod binary;
pub mod boundary;
pub mod broadcast;
pub mod concatenation;
pub mod derivative;
pub mod domain;
pub mod integral;
pub mod kind;
pub mod numerical;
pub mod spatial;
pub mod symbol;
pub mod unary;

pub use average::{r_average, size_average, x_average, yz_average, z_average};
pub use boundary::{boundary_operator, boundary_value};
pub use broadcast::{
    full_broadcast, full_broadcast_to_edges, ones_like, primary_broadcast,
    primary_broadcast_to_edges, secondary_broadcast, secondary_broadcast_to_edges, zeros_like,
};
pub use concatenation::concatenation;
pub use domain::{DomainLevel, Domains, IntoDomain};
pub use integral::{
    backward_indefinite_integral, boundary_integral, indefinite_integral, integral,
    integration_variables,
};
pub use kind::{BinaryOp, BroadcastLevel, IndexSpec, IntegralKind, Kind, Side, StateSlice};
pub use numerical::eval::{EvalArgs, KnownEvals};
pub use numerical::sparse::CsrMatrix;
pub use numerical::value::Value;
pub use spatial::{
    delta_function, div, divergence, downwind, grad, grad_squared, gradient, laplacian,
    spatial_operator, upwind,
};
pub use symbol::{Expr, Symbol};
pub use unary::{abs, ceiling, floor, neg, not_constant, sign, unary_operator, Checks};

pub use galvani_error::{Error, Result};
