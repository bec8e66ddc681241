//! Quantum system and qubit views.
//!
//! A [`QSystem`] is an n-qubit, maximally-entangleable subsystem viewing
//! one density matrix in the pool arena; a [`Qubit`] is a
//! `(system, index)` handle into it. Neither carries state of its own:
//! all mutation flows through the owning arena slot.
//!
//! Measurement is the sole randomness-driven state mutation here: the
//! outcome is drawn against `p0 = tr(P₀ρ)` and the state collapses by the
//! projector sandwich `ρ ← PρP / p`, which renormalizes the trace to 1.

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::gates::{self, GateCache, GateId};
use crate::linalg;
use crate::qstream::Arena;

/// Wire address of a qubit: `(system index, qubit index)` within a shared
/// pool. This is all that crosses a channel, never the state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QubitAddr {
    /// Index of the owning system in the pool.
    pub system: usize,
    /// Qubit index within the system.
    pub index: usize,
}

/// View of one n-qubit system in a [`crate::QStream`].
#[derive(Debug, Clone)]
pub struct QSystem {
    arena: Arc<Arena>,
    index: usize,
}

impl PartialEq for QSystem {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena) && self.index == other.index
    }
}

impl QSystem {
    pub(crate) fn new(arena: Arc<Arena>, index: usize) -> Self {
        Self { arena, index }
    }

    /// Index of this system within its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of qubits in this system.
    pub fn num_qubits(&self) -> usize {
        self.arena.system_size()
    }

    /// Handle to the `index`-th qubit.
    pub fn qubit(&self, index: usize) -> CoreResult<Qubit> {
        if index >= self.num_qubits() {
            return Err(CoreError::QubitIndexOutOfRange {
                index,
                num_qubits: self.num_qubits(),
            });
        }
        Ok(Qubit {
            arena: Arc::clone(&self.arena),
            system: self.index,
            index,
        })
    }

    /// Index-based iterator over this system's qubits.
    pub fn qubits(&self) -> impl Iterator<Item = Qubit> + '_ {
        (0..self.num_qubits()).map(|i| Qubit {
            arena: Arc::clone(&self.arena),
            system: self.index,
            index: i,
        })
    }

    /// Apply a full-dimension unitary: `ρ ← UρU†`.
    ///
    /// `operator` must already be expanded to this system's dimension;
    /// single-qubit gates go through [`Qubit::apply`] instead.
    pub fn apply(&self, operator: &Array2<Complex64>) -> CoreResult<()> {
        let dim = 1 << self.num_qubits();
        if operator.nrows() != dim || operator.ncols() != dim {
            return Err(CoreError::DimensionMismatch {
                expected: dim,
                rows: operator.nrows(),
                cols: operator.ncols(),
            });
        }
        let operator_dag = linalg::dagger(operator);
        self.arena.with_state(self.index, |state| {
            *state = operator.dot(state).dot(&operator_dag);
        })
    }

    /// Measure the qubit at `index`, partially collapsing the state.
    ///
    /// Computes `p0 = tr(P₀ρ)` with the expanded |0⟩ projector, draws a
    /// uniform sample, and collapses to the observed branch, renormalized
    /// by the branch probability. Returns the classical outcome bit.
    pub fn measure_qubit(&self, index: usize, cache: &GateCache) -> CoreResult<u8> {
        if index >= self.num_qubits() {
            return Err(CoreError::QubitIndexOutOfRange {
                index,
                num_qubits: self.num_qubits(),
            });
        }
        let n = self.num_qubits();
        let measure0 = cache.expand_single(GateId::Proj0, &gates::proj0(), index, n);

        self.arena.with_state(self.index, |state| {
            let p0 = linalg::trace(&measure0.dot(state)).re;
            if rand::thread_rng().r#gen::<f64>() < p0 {
                let collapsed = measure0.dot(state).dot(&*measure0);
                *state = collapsed.mapv(|z| z / p0);
                0
            } else {
                let measure1 = cache.expand_single(GateId::Proj1, &gates::proj1(), index, n);
                let collapsed = measure1.dot(state).dot(&*measure1);
                *state = collapsed.mapv(|z| z / (1.0 - p0));
                1
            }
        })
    }

    /// Snapshot of the density matrix (for inspection and tests).
    pub fn state(&self) -> CoreResult<Array2<Complex64>> {
        self.arena.with_state(self.index, |state| state.clone())
    }
}

/// Handle to a single qubit of a system in the pool.
///
/// Qubits are lightweight references: cloning one aliases the same
/// underlying state, and dropping one loses nothing.
#[derive(Debug, Clone)]
pub struct Qubit {
    arena: Arc<Arena>,
    system: usize,
    index: usize,
}

impl Qubit {
    /// Qubit index within its system.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the owning system in the pool.
    pub fn system_index(&self) -> usize {
        self.system
    }

    /// View of the owning system.
    pub fn system(&self) -> QSystem {
        QSystem::new(Arc::clone(&self.arena), self.system)
    }

    /// Number of qubits in the owning system.
    pub fn num_qubits(&self) -> usize {
        self.arena.system_size()
    }

    /// Whether two qubit handles point into the same system of the same
    /// pool (required for multi-qubit gates).
    pub fn in_same_system(&self, other: &Qubit) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena) && self.system == other.system
    }

    /// Apply a single-qubit operator, expanding it to the owning system's
    /// dimension through the gate cache under `id`.
    pub fn apply(&self, operator: &Array2<Complex64>, id: GateId, cache: &GateCache) -> CoreResult<()> {
        let expanded = cache.expand_single(id, operator, self.index, self.num_qubits());
        self.system().apply(&expanded)
    }

    /// Measure this qubit, collapsing the owning system's state.
    pub fn measure(&self, cache: &GateCache) -> CoreResult<u8> {
        self.system().measure_qubit(self.index, cache)
    }

    /// Wire address for cross-task transport.
    pub fn serialize(&self) -> QubitAddr {
        QubitAddr {
            system: self.system,
            index: self.index,
        }
    }
}
