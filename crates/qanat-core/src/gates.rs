//! Gate library and expansion cache.
//!
//! Primitive gates are 2×2 unitaries; applying one to a qubit of an
//! n-qubit system requires promoting it to the full `2^n × 2^n` dimension
//! with identity padding. That expansion cost grows with the Hilbert-space
//! dimension, so expanded operators are memoized in a [`GateCache`] keyed
//! by gate identity, the involved qubit indices, and the system qubit
//! count. Rotation keys additionally encode the angle, since distinct
//! angles are distinct operators.
//!
//! The cache is an explicitly-owned object with a lifecycle scoped to one
//! simulation context (each agent carries its own) rather than module-wide
//! shared state. Entries are immutable once inserted.
//!
//! Multi-qubit controlled gates are built as a sum of block projectors,
//! `|0⟩⟨0|_c ⊗ I ⊗ … + |1⟩⟨1|_c ⊗ (… ⊗ U_t ⊗ …)`, generalized to a
//! four-term sum over control-bit combinations for Toffoli. Control and
//! target may be any distinct indices.

use std::sync::{Arc, Mutex};

use ndarray::{array, Array2};
use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::error::{CoreError, CoreResult};
use crate::linalg;
use crate::qsystem::Qubit;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

// =============================================================================
// Primitive 2×2 matrices
// =============================================================================

/// Identity.
pub fn identity() -> Array2<Complex64> {
    Array2::eye(2)
}

/// Hadamard.
pub fn hadamard() -> Array2<Complex64> {
    let f = std::f64::consts::FRAC_1_SQRT_2;
    array![[c(f, 0.0), c(f, 0.0)], [c(f, 0.0), c(-f, 0.0)]]
}

/// Pauli-X (bit flip).
pub fn pauli_x() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]
}

/// Pauli-Y (bit + phase flip).
pub fn pauli_y() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]]
}

/// Pauli-Z (phase flip).
pub fn pauli_z() -> Array2<Complex64> {
    array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]]
}

/// Rotation about X by `theta`.
pub fn rotation_x(theta: f64) -> Array2<Complex64> {
    let (cos, sin) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    array![[c(cos, 0.0), c(0.0, -sin)], [c(0.0, -sin), c(cos, 0.0)]]
}

/// Rotation about Y by `theta`.
pub fn rotation_y(theta: f64) -> Array2<Complex64> {
    let (cos, sin) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    array![[c(cos, 0.0), c(-sin, 0.0)], [c(sin, 0.0), c(cos, 0.0)]]
}

/// Rotation about Z by `theta`.
pub fn rotation_z(theta: f64) -> Array2<Complex64> {
    array![
        [Complex64::from_polar(1.0, -theta / 2.0), c(0.0, 0.0)],
        [c(0.0, 0.0), Complex64::from_polar(1.0, theta / 2.0)]
    ]
}

/// Phase shift of the |1⟩ amplitude by `theta`.
pub fn phase_shift(theta: f64) -> Array2<Complex64> {
    array![
        [c(1.0, 0.0), c(0.0, 0.0)],
        [c(0.0, 0.0), Complex64::from_polar(1.0, theta)]
    ]
}

/// Projector onto |0⟩.
pub fn proj0() -> Array2<Complex64> {
    array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, 0.0)]]
}

/// Projector onto |1⟩.
pub fn proj1() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(1.0, 0.0)]]
}

// =============================================================================
// Expansion cache
// =============================================================================

/// Identity of a primitive gate for cache-key purposes.
///
/// Rotations carry the angle as `f64::to_bits`, so distinct angles hash to
/// distinct entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateId {
    I,
    H,
    X,
    Y,
    Z,
    Rx(u64),
    Ry(u64),
    Rz(u64),
    Phase(u64),
    Proj0,
    Proj1,
}

/// Key for a memoized full-dimension operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Single-qubit gate at `index` in an `num_qubits`-qubit system.
    Single {
        gate: GateId,
        index: usize,
        num_qubits: usize,
    },
    /// Controlled primitive gate.
    Controlled {
        gate: GateId,
        control: usize,
        target: usize,
        num_qubits: usize,
    },
    /// Controlled user-supplied unitary, keyed by caller label.
    ControlledCustom {
        label: String,
        control: usize,
        target: usize,
        num_qubits: usize,
    },
    /// Double-controlled NOT.
    Toffoli {
        controls: (usize, usize),
        target: usize,
        num_qubits: usize,
    },
}

/// Memoization table for identity-padded operators.
///
/// For a fixed key, the cached and freshly-computed expansions are
/// numerically identical; lookups return a shared handle to the immutable
/// entry.
#[derive(Debug, Default)]
pub struct GateCache {
    entries: Mutex<FxHashMap<CacheKey, Arc<Array2<Complex64>>>>,
}

impl GateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached expansions.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("gate cache lock poisoned").len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_insert(
        &self,
        key: CacheKey,
        build: impl FnOnce() -> Array2<Complex64>,
    ) -> Arc<Array2<Complex64>> {
        let mut entries = self.entries.lock().expect("gate cache lock poisoned");
        entries.entry(key).or_insert_with(|| Arc::new(build())).clone()
    }

    /// Expanded single-qubit operator `op` at `index` among `num_qubits`.
    pub fn expand_single(
        &self,
        gate: GateId,
        op: &Array2<Complex64>,
        index: usize,
        num_qubits: usize,
    ) -> Arc<Array2<Complex64>> {
        self.get_or_insert(
            CacheKey::Single {
                gate,
                index,
                num_qubits,
            },
            || linalg::tensor_fill_identity(op, num_qubits, index),
        )
    }
}

// =============================================================================
// Composite matrix construction
// =============================================================================

/// `|0⟩⟨0|_c ⊗ I… + |1⟩⟨1|_c ⊗ (…op_t…)` over `n` qubits.
fn controlled_matrix(
    target_op: &Array2<Complex64>,
    control: usize,
    target: usize,
    n: usize,
) -> Array2<Complex64> {
    let mut off: Vec<Array2<Complex64>> = Vec::with_capacity(n);
    let mut on: Vec<Array2<Complex64>> = Vec::with_capacity(n);
    for k in 0..n {
        off.push(if k == control { proj0() } else { identity() });
        on.push(if k == control {
            proj1()
        } else if k == target {
            target_op.clone()
        } else {
            identity()
        });
    }
    linalg::tensors(&off) + linalg::tensors(&on)
}

/// Four-term block-projector sum for the double-controlled NOT.
fn toffoli_matrix(c1: usize, c2: usize, target: usize, n: usize) -> Array2<Complex64> {
    let dim = 1 << n;
    let mut acc = Array2::<Complex64>::zeros((dim, dim));
    for bits in 0u8..4 {
        let (b1, b2) = (bits & 1 != 0, bits & 2 != 0);
        let mut slots: Vec<Array2<Complex64>> = Vec::with_capacity(n);
        for k in 0..n {
            slots.push(if k == c1 {
                if b1 { proj1() } else { proj0() }
            } else if k == c2 {
                if b2 { proj1() } else { proj0() }
            } else if k == target && b1 && b2 {
                pauli_x()
            } else {
                identity()
            });
        }
        acc = acc + linalg::tensors(&slots);
    }
    acc
}

// =============================================================================
// Gate application
// =============================================================================

fn two_qubit_context(a: &Qubit, b: &Qubit) -> CoreResult<usize> {
    if !a.in_same_system(b) {
        return Err(CoreError::CrossSystemGate);
    }
    if a.index() == b.index() {
        return Err(CoreError::DuplicateQubit(a.index()));
    }
    Ok(a.num_qubits())
}

/// Hadamard.
pub fn h(q: &Qubit, cache: &GateCache) -> CoreResult<()> {
    q.apply(&hadamard(), GateId::H, cache)
}

/// Pauli-X.
pub fn x(q: &Qubit, cache: &GateCache) -> CoreResult<()> {
    q.apply(&pauli_x(), GateId::X, cache)
}

/// Pauli-Y.
pub fn y(q: &Qubit, cache: &GateCache) -> CoreResult<()> {
    q.apply(&pauli_y(), GateId::Y, cache)
}

/// Pauli-Z.
pub fn z(q: &Qubit, cache: &GateCache) -> CoreResult<()> {
    q.apply(&pauli_z(), GateId::Z, cache)
}

/// X rotation by `theta`.
pub fn rx(q: &Qubit, theta: f64, cache: &GateCache) -> CoreResult<()> {
    q.apply(&rotation_x(theta), GateId::Rx(theta.to_bits()), cache)
}

/// Y rotation by `theta`.
pub fn ry(q: &Qubit, theta: f64, cache: &GateCache) -> CoreResult<()> {
    q.apply(&rotation_y(theta), GateId::Ry(theta.to_bits()), cache)
}

/// Z rotation by `theta`.
pub fn rz(q: &Qubit, theta: f64, cache: &GateCache) -> CoreResult<()> {
    q.apply(&rotation_z(theta), GateId::Rz(theta.to_bits()), cache)
}

/// Phase shift by `theta`.
pub fn phase(q: &Qubit, theta: f64, cache: &GateCache) -> CoreResult<()> {
    q.apply(&phase_shift(theta), GateId::Phase(theta.to_bits()), cache)
}

/// Controlled-NOT.
pub fn cnot(control: &Qubit, target: &Qubit, cache: &GateCache) -> CoreResult<()> {
    let n = two_qubit_context(control, target)?;
    let u = cache.get_or_insert(
        CacheKey::Controlled {
            gate: GateId::X,
            control: control.index(),
            target: target.index(),
            num_qubits: n,
        },
        || controlled_matrix(&pauli_x(), control.index(), target.index(), n),
    );
    control.system().apply(&u)
}

/// Controlled phase shift by `theta`.
pub fn cphase(control: &Qubit, target: &Qubit, theta: f64, cache: &GateCache) -> CoreResult<()> {
    let n = two_qubit_context(control, target)?;
    let u = cache.get_or_insert(
        CacheKey::Controlled {
            gate: GateId::Phase(theta.to_bits()),
            control: control.index(),
            target: target.index(),
            num_qubits: n,
        },
        || controlled_matrix(&phase_shift(theta), control.index(), target.index(), n),
    );
    control.system().apply(&u)
}

/// Controlled arbitrary single-qubit unitary.
///
/// The expansion is cached only when a `label` is supplied; unlabeled
/// operators are expanded fresh on each call.
pub fn cu(
    control: &Qubit,
    target: &Qubit,
    operator: &Array2<Complex64>,
    label: Option<&str>,
    cache: &GateCache,
) -> CoreResult<()> {
    let n = two_qubit_context(control, target)?;
    match label {
        Some(label) => {
            let u = cache.get_or_insert(
                CacheKey::ControlledCustom {
                    label: label.to_string(),
                    control: control.index(),
                    target: target.index(),
                    num_qubits: n,
                },
                || controlled_matrix(operator, control.index(), target.index(), n),
            );
            control.system().apply(&u)
        }
        None => {
            let u = controlled_matrix(operator, control.index(), target.index(), n);
            control.system().apply(&u)
        }
    }
}

/// Toffoli (double-controlled NOT).
pub fn toffoli(c1: &Qubit, c2: &Qubit, target: &Qubit, cache: &GateCache) -> CoreResult<()> {
    let n = two_qubit_context(c1, c2)?;
    two_qubit_context(c1, target)?;
    two_qubit_context(c2, target)?;
    let u = cache.get_or_insert(
        CacheKey::Toffoli {
            controls: (c1.index(), c2.index()),
            target: target.index(),
            num_qubits: n,
        },
        || toffoli_matrix(c1.index(), c2.index(), target.index(), n),
    );
    c1.system().apply(&u)
}

/// SWAP, as the uncached composite of three CNOTs.
pub fn swap(a: &Qubit, b: &Qubit, _cache: &GateCache) -> CoreResult<()> {
    let n = two_qubit_context(a, b)?;
    let c_ab = controlled_matrix(&pauli_x(), a.index(), b.index(), n);
    let c_ba = controlled_matrix(&pauli_x(), b.index(), a.index(), n);
    let u = c_ab.dot(&c_ba).dot(&c_ab);
    a.system().apply(&u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qstream::QStream;

    fn approx_eq(a: &Array2<Complex64>, b: &Array2<Complex64>) -> bool {
        a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| (*x - *y).norm() < 1e-10)
    }

    fn is_unitary(u: &Array2<Complex64>) -> bool {
        let id = Array2::<Complex64>::eye(u.nrows());
        approx_eq(&u.dot(&linalg::dagger(u)), &id)
    }

    #[test]
    fn test_primitives_are_unitary() {
        for u in [
            identity(),
            hadamard(),
            pauli_x(),
            pauli_y(),
            pauli_z(),
            rotation_x(0.7),
            rotation_y(-1.3),
            rotation_z(2.1),
            phase_shift(0.4),
        ] {
            assert!(is_unitary(&u));
        }
    }

    #[test]
    fn test_cnot_matrix_adjacent() {
        // Control 0, target 1 reproduces the canonical 4×4 CNOT.
        let u = controlled_matrix(&pauli_x(), 0, 1, 2);
        let expected = array![
            [c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)],
            [c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)],
            [c(0.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)],
            [c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)],
        ];
        assert!(approx_eq(&u, &expected));
    }

    #[test]
    fn test_cnot_reversed_control() {
        // Control 1, target 0: |01⟩ ↦ |11⟩.
        let u = controlled_matrix(&pauli_x(), 1, 0, 2);
        assert!(is_unitary(&u));
        assert!((u[(3, 1)] - c(1.0, 0.0)).norm() < 1e-12);
        assert!((u[(1, 3)] - c(1.0, 0.0)).norm() < 1e-12);
        assert!((u[(0, 0)] - c(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_toffoli_truth_table() {
        let u = toffoli_matrix(0, 1, 2, 3);
        assert!(is_unitary(&u));
        // |110⟩ (index 6) ↔ |111⟩ (index 7); everything else fixed.
        for i in 0..6 {
            assert!((u[(i, i)] - c(1.0, 0.0)).norm() < 1e-12);
        }
        assert!((u[(7, 6)] - c(1.0, 0.0)).norm() < 1e-12);
        assert!((u[(6, 7)] - c(1.0, 0.0)).norm() < 1e-12);
        assert!((u[(6, 6)]).norm() < 1e-12);
    }

    #[test]
    fn test_cache_returns_identical_expansion() {
        let cache = GateCache::new();
        let first = cache.expand_single(GateId::H, &hadamard(), 1, 3);
        let second = cache.expand_single(GateId::H, &hadamard(), 1, 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let direct = linalg::tensor_fill_identity(&hadamard(), 3, 1);
        assert!(approx_eq(&first, &direct));
    }

    #[test]
    fn test_rotation_angles_are_distinct_keys() {
        let cache = GateCache::new();
        let a = cache.expand_single(GateId::Rx(0.5f64.to_bits()), &rotation_x(0.5), 0, 1);
        let b = cache.expand_single(GateId::Rx(1.5f64.to_bits()), &rotation_x(1.5), 0, 1);
        assert_eq!(cache.len(), 2);
        assert!(!approx_eq(&a, &b));
    }

    #[test]
    fn test_swap_exchanges_qubits() {
        let stream = QStream::new(2, 1);
        let cache = GateCache::new();
        let sys = stream.system(0).unwrap();
        let (a, b) = (sys.qubit(0).unwrap(), sys.qubit(1).unwrap());

        x(&a, &cache).unwrap(); // |10⟩
        swap(&a, &b, &cache).unwrap(); // |01⟩

        assert_eq!(a.measure(&cache).unwrap(), 0);
        assert_eq!(b.measure(&cache).unwrap(), 1);
    }

    #[test]
    fn test_cross_system_gate_rejected() {
        let stream = QStream::new(2, 2);
        let cache = GateCache::new();
        let a = stream.system(0).unwrap().qubit(0).unwrap();
        let b = stream.system(1).unwrap().qubit(0).unwrap();
        assert_eq!(cnot(&a, &b, &cache), Err(CoreError::CrossSystemGate));
    }

    #[test]
    fn test_cphase_and_cu_agree() {
        let stream = QStream::new(2, 2);
        let cache = GateCache::new();
        let theta = 0.9;

        let sys_a = stream.system(0).unwrap();
        let (a0, a1) = (sys_a.qubit(0).unwrap(), sys_a.qubit(1).unwrap());
        x(&a0, &cache).unwrap();
        x(&a1, &cache).unwrap();
        cphase(&a0, &a1, theta, &cache).unwrap();

        let sys_b = stream.system(1).unwrap();
        let (b0, b1) = (sys_b.qubit(0).unwrap(), sys_b.qubit(1).unwrap());
        x(&b0, &cache).unwrap();
        x(&b1, &cache).unwrap();
        cu(&b0, &b1, &phase_shift(theta), None, &cache).unwrap();

        let (ra, rb) = (sys_a.state().unwrap(), sys_b.state().unwrap());
        assert!(approx_eq(&ra, &rb));
    }
}
