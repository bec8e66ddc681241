//! Qanat quantum state engine
//!
//! This crate provides the density-matrix simulation core of the qanat
//! network simulator: a linear-algebra kernel, a memoizing gate library,
//! and an arena of independent multi-qubit systems that agents in
//! `qanat-net` operate on concurrently.
//!
//! # Overview
//!
//! Quantum state lives in a [`QStream`]: a pool of `num_systems`
//! independent systems of `system_size` qubits each, every one holding a
//! `2^n × 2^n` density matrix initialized to `|0…0⟩⟨0…0|`. Systems in the
//! pool never interact; entanglement only arises within a system. A
//! [`QSystem`] is an indexed view into the pool and a [`Qubit`] is a
//! `(system, index)` handle; neither owns state of its own.
//!
//! Gates are applied through a [`GateCache`], which memoizes the
//! identity-padded full-dimension operators so that repeated application
//! of the same logical gate at the same position never reconstructs the
//! matrix.
//!
//! # Example: Bell pair
//!
//! ```rust
//! use qanat_core::{gates, GateCache, QStream};
//!
//! let stream = QStream::new(2, 1);
//! let cache = GateCache::new();
//!
//! let system = stream.system(0).unwrap();
//! let (a, b) = (system.qubit(0).unwrap(), system.qubit(1).unwrap());
//!
//! // (|00⟩ + |11⟩)/√2
//! gates::h(&a, &cache).unwrap();
//! gates::cnot(&a, &b, &cache).unwrap();
//!
//! // Outcomes are perfectly correlated.
//! let (ma, mb) = (a.measure(&cache).unwrap(), b.measure(&cache).unwrap());
//! assert_eq!(ma, mb);
//! ```
//!
//! # Conventions
//!
//! Unitaries evolve the state as `ρ ← UρU†`; measurement projects with
//! `ρ ← PρP / tr(Pρ)`. Qubit 0 is the leftmost tensor factor, so basis
//! index bits read `|q0 q1 … q(n-1)⟩`.

pub mod error;
pub mod gates;
pub mod linalg;
pub mod qstream;
pub mod qsystem;

pub use error::{CoreError, CoreResult};
pub use gates::{CacheKey, GateCache, GateId};
pub use qstream::{QStream, Systems};
pub use qsystem::{QSystem, Qubit, QubitAddr};
