//! Error handling for the quantum state engine.

use thiserror::Error;

/// Result type for state-engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while operating on quantum state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// System index outside the pool.
    #[error("system index out of range: {index} (pool holds {len} systems)")]
    SystemIndexOutOfRange { index: usize, len: usize },

    /// Qubit index outside its system.
    #[error("qubit index out of range: {index} (system holds {num_qubits} qubits)")]
    QubitIndexOutOfRange { index: usize, num_qubits: usize },

    /// Operator dimension does not match the system's Hilbert space.
    #[error("operator dimension mismatch: expected {expected}×{expected}, found {rows}×{cols}")]
    DimensionMismatch {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    /// A multi-qubit gate was applied to qubits of different systems.
    #[error("multi-qubit gate spans different systems")]
    CrossSystemGate,

    /// A multi-qubit gate was applied to the same qubit twice.
    #[error("multi-qubit gate targets duplicate qubit index {0}")]
    DuplicateQubit(usize),
}
