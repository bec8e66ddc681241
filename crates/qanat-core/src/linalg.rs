//! Linear-algebra kernel: Kronecker products and identity-padded expansion.
//!
//! Everything downstream (gate expansion, projective measurement) reduces
//! to the three primitives here. Operators are dense `Array2<Complex64>`
//! matrices in the computational basis, with qubit 0 as the leftmost
//! tensor factor.

use ndarray::linalg::kron;
use ndarray::Array2;
use num_complex::Complex64;

/// Kronecker product of two operators.
///
/// An empty operand acts as the identity element, so this function can be
/// folded over a sequence starting from the empty matrix (see [`tensors`]).
pub fn tensor_product(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    if a.is_empty() {
        b.clone()
    } else if b.is_empty() {
        a.clone()
    } else {
        kron(a, b)
    }
}

/// Iterated Kronecker product of a sequence of operators (left fold).
pub fn tensors(operators: &[Array2<Complex64>]) -> Array2<Complex64> {
    operators
        .iter()
        .fold(Array2::zeros((0, 0)), |acc, op| tensor_product(&acc, op))
}

/// Expand a single-qubit operator to `n` qubits: `I ⊗ … ⊗ op ⊗ … ⊗ I`,
/// with `op` at zero-based slot `index`.
///
/// The caller guarantees `index < n_qubits`.
pub fn tensor_fill_identity(
    op: &Array2<Complex64>,
    n_qubits: usize,
    index: usize,
) -> Array2<Complex64> {
    debug_assert!(index < n_qubits, "qubit index out of range");
    let left = Array2::<Complex64>::eye(1 << index);
    let right = Array2::<Complex64>::eye(1 << (n_qubits - index - 1));
    tensors(&[left, op.clone(), right])
}

/// Conjugate transpose.
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

/// Trace of a square matrix.
pub fn trace(m: &Array2<Complex64>) -> Complex64 {
    m.diag().sum()
}

/// Whether an operator equals its own conjugate transpose (within `1e-12`).
pub fn is_hermitian(m: &Array2<Complex64>) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    m.indexed_iter()
        .all(|((i, j), z)| (*z - m[(j, i)].conj()).norm() < 1e-12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates;

    fn approx_eq(a: &Array2<Complex64>, b: &Array2<Complex64>) -> bool {
        a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| (*x - *y).norm() < 1e-10)
    }

    #[test]
    fn test_tensor_product_dims() {
        let x = gates::pauli_x();
        let i = gates::identity();
        let xi = tensor_product(&x, &i);
        assert_eq!(xi.shape(), &[4, 4]);
        // ⟨10|X⊗I|00⟩ = 1
        assert!((xi[(2, 0)] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_empty_operand_is_identity_element() {
        let h = gates::hadamard();
        let empty = Array2::<Complex64>::zeros((0, 0));
        assert!(approx_eq(&tensor_product(&empty, &h), &h));
        assert!(approx_eq(&tensor_product(&h, &empty), &h));
        assert!(approx_eq(&tensors(&[h.clone()]), &h));
    }

    #[test]
    fn test_tensor_fill_identity_matches_kron() {
        let x = gates::pauli_x();
        let direct = tensor_product(&gates::identity(), &x);
        assert!(approx_eq(&tensor_fill_identity(&x, 2, 1), &direct));

        let expanded = tensor_fill_identity(&x, 3, 0);
        assert_eq!(expanded.shape(), &[8, 8]);
        // X on qubit 0 maps |000⟩ (index 0) to |100⟩ (index 4).
        assert!((expanded[(4, 0)] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_is_hermitian() {
        assert!(is_hermitian(&gates::pauli_y()));
        assert!(is_hermitian(&gates::hadamard()));
        assert!(!is_hermitian(&gates::rotation_x(0.3)));
    }

    #[test]
    fn test_dagger_and_trace() {
        let y = gates::pauli_y();
        assert!(approx_eq(&dagger(&y), &y));
        let t = trace(&Array2::<Complex64>::eye(4));
        assert!((t - Complex64::new(4.0, 0.0)).norm() < 1e-12);
    }
}
