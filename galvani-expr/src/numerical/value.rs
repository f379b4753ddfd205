//! The result of evaluating a node: a scalar, a dense column, or a sparse
//! matrix.

use super::sparse::CsrMatrix;
use galvani_error::{Error, Result};
use ndarray::Array2;

/// A numeric evaluation result.
///
/// Columns are dense `(n, 1)` arrays; sparse results keep their sparsity
/// through the elementwise unary operators.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Dense(Array2<f64>),
    Sparse(CsrMatrix),
}

impl Value {
    /// The typename used in error messages.
    pub fn typename(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "Scalar",
            Self::Dense(_) => "Dense",
            Self::Sparse(_) => "Sparse",
        }
    }

    /// The scalar content, if this is a scalar or a 1×1 column.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Dense(a) if a.len() == 1 => Some(a[[0, 0]]),
            _ => None,
        }
    }

    /// Applies an elementwise map.
    ///
    /// The map must fix zero (`f(0) == 0`) so that sparse operands can keep
    /// their pattern; every unary operator in the engine satisfies this.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Self::Scalar(v) => Self::Scalar(f(*v)),
            Self::Dense(a) => Self::Dense(a.mapv(|v| f(v))),
            Self::Sparse(m) => Self::Sparse(m.map_values(f)),
        }
    }

    /// Combines two values elementwise, broadcasting scalars against
    /// arrays. Sparse operands are densified first; binary operators do not
    /// preserve sparsity in general.
    pub fn zip_with(self, other: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Ok(Self::Scalar(f(a, b))),
            (Self::Scalar(a), Self::Dense(b)) => Ok(Self::Dense(b.mapv(|v| f(a, v)))),
            (Self::Dense(a), Self::Scalar(b)) => Ok(Self::Dense(a.mapv(|v| f(v, b)))),
            (Self::Dense(a), Self::Dense(b)) => {
                if a.dim() != b.dim() {
                    return Err(Error::shape(format!(
                        "cannot combine arrays of shapes {:?} and {:?}",
                        a.dim(),
                        b.dim()
                    )));
                }
                let mut out = a;
                out.zip_mut_with(&b, |l, &r| *l = f(*l, r));
                Ok(Self::Dense(out))
            }
            (Self::Sparse(a), other) => Self::Dense(a.to_dense()).zip_with(other, f),
            (lhs, Self::Sparse(b)) => lhs.zip_with(Self::Dense(b.to_dense()), f),
        }
    }

    /// This value as a dense column, broadcasting scalars to one entry.
    pub fn into_column(self) -> Result<Array2<f64>> {
        match self {
            Self::Scalar(v) => Ok(Array2::from_elem((1, 1), v)),
            Self::Dense(a) => Ok(a),
            Self::Sparse(_) => Err(Error::shape(
                "a sparse matrix cannot be used as a column vector",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn map_preserves_sparsity() {
        let diag = Value::Sparse(CsrMatrix::from_diagonal(&[-1.0, -0.5, 0.0, 0.5, 1.0]));
        let signs = diag.map(crate::unary::scalar_sign);
        match signs {
            Value::Sparse(m) => {
                assert_eq!(m.diagonal(), vec![-1.0, -1.0, 0.0, 1.0, 1.0]);
                assert_eq!(m.nnz(), 5);
            }
            other => panic!("expected a sparse result, got {}", other.typename()),
        }
    }

    #[test]
    fn scalars_broadcast_against_columns() {
        let column = Value::Dense(array![[1.0], [2.0]]);
        let sum = Value::Scalar(10.0).zip_with(column, |a, b| a + b).unwrap();
        assert_eq!(sum, Value::Dense(array![[11.0], [12.0]]));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let a = Value::Dense(array![[1.0], [2.0]]);
        let b = Value::Dense(array![[1.0], [2.0], [3.0]]);
        assert!(a.zip_with(b, |l, r| l + r).is_err());
    }
}
