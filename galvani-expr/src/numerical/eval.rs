//! Bottom-up numeric evaluation of expression trees.
//!
//! Evaluation is a pure function of the tree plus externally supplied
//! buffers: the time `t`, the state vector `y` and the named `inputs`. A
//! missing buffer that a leaf needs is a hard error, never a default —
//! silent approximation is worse than failure in a physical simulation.
//!
//! Shared subtrees can be evaluated once per call by passing a
//! [`KnownEvals`] cache, keyed by structural id. This is the main consumer
//! of the id contract: two structurally identical nodes must hit the same
//! cache slot.

use super::value::Value;
use crate::kind::{BinaryOp, IndexSpec, Kind};
use crate::symbol::Symbol;
use crate::unary::scalar_sign;
use galvani_error::{Error, Result};
use ndarray::{s, Array1, Axis};
use std::collections::HashMap;

/// Memoized per-node results of one evaluation call, keyed by structural
/// id.
pub type KnownEvals = HashMap<u64, Value>;

/// The external numeric state an evaluation reads from.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalArgs<'a> {
    pub t: Option<f64>,
    pub y: Option<&'a Array1<f64>>,
    pub inputs: Option<&'a HashMap<String, f64>>,
}

impl<'a> EvalArgs<'a> {
    pub fn with_t(mut self, t: f64) -> Self {
        self.t = Some(t);
        self
    }

    pub fn with_y(mut self, y: &'a Array1<f64>) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_inputs(mut self, inputs: &'a HashMap<String, f64>) -> Self {
        self.inputs = Some(inputs);
        self
    }
}

impl Symbol {
    /// Evaluates this tree against the given state.
    pub fn evaluate(&self, args: &EvalArgs) -> Result<Value> {
        self.eval_inner(args, None)
    }

    /// Like [`evaluate`](Self::evaluate), reusing results for subtrees
    /// whose ids already appear in `known_evals`.
    pub fn evaluate_with_cache(
        &self,
        args: &EvalArgs,
        known_evals: &mut KnownEvals,
    ) -> Result<Value> {
        self.eval_inner(args, Some(known_evals))
    }

    fn eval_inner(&self, args: &EvalArgs, mut cache: Option<&mut KnownEvals>) -> Result<Value> {
        if let Some(known) = cache.as_deref_mut() {
            if let Some(hit) = known.get(&self.id()) {
                log::trace!("evaluation cache hit for '{}'", self.name());
                return Ok(hit.clone());
            }
        }
        let value = self.eval_node(args, cache.as_deref_mut())?;
        if let Some(known) = cache {
            known.insert(self.id(), value.clone());
        }
        Ok(value)
    }

    fn eval_node(&self, args: &EvalArgs, mut cache: Option<&mut KnownEvals>) -> Result<Value> {
        match self.kind() {
            Kind::Scalar(v) => Ok(Value::Scalar(*v)),
            Kind::Vector(a) => Ok(Value::Dense(a.clone())),
            Kind::Matrix(m) => Ok(Value::Sparse(m.clone())),
            Kind::StateVector(slice) => {
                let y = args.y.ok_or_else(|| {
                    Error::evaluate(format!(
                        "cannot evaluate '{}': no state vector `y` was provided",
                        self.name()
                    ))
                })?;
                if slice.stop > y.len() {
                    return Err(Error::shape(format!(
                        "state slice {}..{} is out of range for a state vector of length {}",
                        slice.start,
                        slice.stop,
                        y.len()
                    )));
                }
                let column = y
                    .slice(s![slice.start..slice.stop])
                    .to_owned()
                    .insert_axis(Axis(1));
                Ok(Value::Dense(column))
            }
            Kind::InputParameter => {
                let inputs = args.inputs.ok_or_else(|| {
                    Error::evaluate(format!(
                        "cannot evaluate input parameter '{}': no inputs were provided",
                        self.name()
                    ))
                })?;
                inputs
                    .get(self.name())
                    .copied()
                    .map(Value::Scalar)
                    .ok_or_else(|| {
                        Error::evaluate(format!("missing input parameter '{}'", self.name()))
                    })
            }
            Kind::Time => args
                .t
                .map(Value::Scalar)
                .ok_or_else(|| Error::evaluate("cannot evaluate time: no `t` was provided")),

            Kind::Negate => Ok(self.eval_child(0, args, cache)?.map(|v| -v)),
            Kind::AbsoluteValue => Ok(self.eval_child(0, args, cache)?.map(f64::abs)),
            Kind::Sign => Ok(self.eval_child(0, args, cache)?.map(scalar_sign)),
            Kind::Floor => Ok(self.eval_child(0, args, cache)?.map(f64::floor)),
            Kind::Ceiling => Ok(self.eval_child(0, args, cache)?.map(f64::ceil)),
            Kind::NotConstant => self.eval_child(0, args, cache),
            Kind::Index(spec) => {
                let value = self.eval_child(0, args, cache)?;
                apply_index(spec, value, self.name())
            }

            Kind::Binary(op) => {
                let lhs = self.eval_child(0, args, cache.as_deref_mut())?;
                let rhs = self.eval_child(1, args, cache)?;
                apply_binary(*op, lhs, rhs)
            }

            Kind::Concatenation => {
                let mut columns = Vec::with_capacity(self.children().len());
                for i in 0..self.children().len() {
                    columns.push(self.eval_child(i, args, cache.as_deref_mut())?.into_column()?);
                }
                let views: Vec<_> = columns.iter().map(|c| c.view()).collect();
                let joined = ndarray::concatenate(Axis(0), &views)
                    .map_err(|e| Error::shape(e.to_string()))?;
                Ok(Value::Dense(joined))
            }

            Kind::Variable | Kind::SpatialVariable | Kind::UnaryOperator => {
                Err(Error::not_implemented(format!(
                    "cannot evaluate abstract symbol '{}'",
                    self.name()
                )))
            }
            _ => Err(Error::not_implemented(format!(
                "cannot evaluate '{}' before discretisation",
                self.name()
            ))),
        }
    }

    fn eval_child(
        &self,
        index: usize,
        args: &EvalArgs,
        cache: Option<&mut KnownEvals>,
    ) -> Result<Value> {
        self.children()[index].eval_inner(args, cache)
    }
}

fn apply_index(spec: &IndexSpec, value: Value, name: &str) -> Result<Value> {
    let column = value.into_column()?;
    let len = column.nrows() as i64;
    let resolve = |bound: i64| if bound < 0 { len + bound } else { bound };
    let (start, stop) = spec.as_slice();
    let start = start.map(resolve).unwrap_or(0);
    let stop = stop.map(resolve).unwrap_or(len);
    if start < 0 || stop > len || start > stop {
        return Err(Error::shape(format!(
            "{name} is out of range for a column of length {len}"
        )));
    }
    match spec {
        IndexSpec::Single(_) => Ok(Value::Scalar(column[[start as usize, 0]])),
        IndexSpec::Range { .. } => Ok(Value::Dense(
            column.slice(s![start as usize..stop as usize, ..]).to_owned(),
        )),
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    // scaling keeps sparsity; every other combination goes elementwise
    if op == BinaryOp::Multiplication {
        if let (Value::Sparse(m), Value::Scalar(s)) = (&lhs, &rhs) {
            return Ok(Value::Sparse(m.map_values(|v| v * s)));
        }
        if let (Value::Scalar(s), Value::Sparse(m)) = (&lhs, &rhs) {
            return Ok(Value::Sparse(m.map_values(|v| v * s)));
        }
    }
    match op {
        BinaryOp::Addition => lhs.zip_with(rhs, |a, b| a + b),
        BinaryOp::Subtraction => lhs.zip_with(rhs, |a, b| a - b),
        BinaryOp::Multiplication => lhs.zip_with(rhs, |a, b| a * b),
        BinaryOp::Division => lhs.zip_with(rhs, |a, b| a / b),
        BinaryOp::Power => lhs.zip_with(rhs, f64::powf),
        BinaryOp::EqualHeaviside => lhs.zip_with(rhs, |a, b| if a <= b { 1.0 } else { 0.0 }),
        BinaryOp::NotEqualHeaviside => lhs.zip_with(rhs, |a, b| if a < b { 1.0 } else { 0.0 }),
    }
}
