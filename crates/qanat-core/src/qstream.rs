//! Shared pool of independent quantum systems.
//!
//! A [`QStream`] backs many separable n-qubit systems with one shared
//! arena of density matrices. Agents in different tasks each hold their
//! own `QStream` view (shared state, private read cursor); only small
//! `(system, qubit)` index handles ever cross task boundaries.
//!
//! Systems in the pool are block-diagonal by construction and never
//! interact. Each system's matrix sits behind its own lock, held only for
//! the duration of a single gate application or measurement; exclusivity
//! over a system across a protocol step remains the caller's
//! responsibility.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::{CoreError, CoreResult};
use crate::qsystem::{QSystem, Qubit, QubitAddr};

/// Shared backing storage: `num_systems` density matrices of dimension
/// `2^system_size`, each initialized to `|0…0⟩⟨0…0|`.
#[derive(Debug)]
pub(crate) struct Arena {
    system_size: usize,
    slots: Vec<Mutex<Array2<Complex64>>>,
}

impl Arena {
    fn new(system_size: usize, num_systems: usize) -> Self {
        let slots = (0..num_systems)
            .map(|_| Mutex::new(Self::zero_state(system_size)))
            .collect();
        Self { system_size, slots }
    }

    fn zero_state(system_size: usize) -> Array2<Complex64> {
        let dim = 1 << system_size;
        let mut state = Array2::zeros((dim, dim));
        state[(0, 0)] = Complex64::new(1.0, 0.0);
        state
    }

    pub(crate) fn system_size(&self) -> usize {
        self.system_size
    }

    pub(crate) fn num_systems(&self) -> usize {
        self.slots.len()
    }

    /// Run `f` with exclusive access to the `index`-th density matrix.
    pub(crate) fn with_state<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut Array2<Complex64>) -> R,
    ) -> CoreResult<R> {
        let slot = self
            .slots
            .get(index)
            .ok_or(CoreError::SystemIndexOutOfRange {
                index,
                len: self.slots.len(),
            })?;
        let mut state = slot.lock().expect("system state lock poisoned");
        Ok(f(&mut state))
    }
}

/// A stream of many independent quantum systems in shared memory.
///
/// Cloning a view with [`QStream::view`] shares the backing state but
/// starts a fresh read cursor, mirroring how each agent wraps the same
/// pool independently.
#[derive(Debug)]
pub struct QStream {
    arena: Arc<Arena>,
    cursor: Arc<AtomicUsize>,
}

impl QStream {
    /// Allocate a pool of `num_systems` systems of `system_size` qubits,
    /// all in the all-zero state.
    pub fn new(system_size: usize, num_systems: usize) -> Self {
        Self {
            arena: Arc::new(Arena::new(system_size, num_systems)),
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A new view onto the same backing state with its own cursor.
    pub fn view(&self) -> QStream {
        Self {
            arena: Arc::clone(&self.arena),
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of systems in the pool.
    pub fn len(&self) -> usize {
        self.arena.num_systems()
    }

    /// Whether the pool holds no systems.
    pub fn is_empty(&self) -> bool {
        self.arena.num_systems() == 0
    }

    /// Qubits per system.
    pub fn system_size(&self) -> usize {
        self.arena.system_size()
    }

    /// View of the `index`-th system (not a copy).
    pub fn system(&self, index: usize) -> CoreResult<QSystem> {
        if index >= self.len() {
            return Err(CoreError::SystemIndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(QSystem::new(Arc::clone(&self.arena), index))
    }

    /// Reconstruct a qubit handle from its wire address.
    pub fn qubit(&self, addr: QubitAddr) -> CoreResult<Qubit> {
        self.system(addr.system)?.qubit(addr.index)
    }

    /// Reset every system in the pool to the all-zero state.
    pub fn reformat(&self) {
        for index in 0..self.len() {
            // Index is in range by construction.
            let _ = self.arena.with_state(index, |state| {
                *state = Arena::zero_state(self.arena.system_size());
            });
        }
    }

    /// Current position of this view's read cursor.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst).min(self.len())
    }

    /// Rewind this view's cursor to the start of the pool.
    pub fn reset_cursor(&self) {
        self.cursor.store(0, Ordering::SeqCst);
    }

    /// The system at the cursor, advancing it by one; `None` once the
    /// stream is exhausted.
    pub fn next_system(&self) -> Option<QSystem> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        if index < self.len() {
            Some(QSystem::new(Arc::clone(&self.arena), index))
        } else {
            None
        }
    }

    /// Forward-only traversal of the pool from this view's cursor.
    ///
    /// The traversal is finite and single-pass: it advances the view's
    /// cursor, so a second call continues where the first stopped and an
    /// exhausted stream yields nothing until [`QStream::reset_cursor`].
    pub fn iter(&self) -> Systems {
        Systems {
            arena: Arc::clone(&self.arena),
            cursor: Arc::clone(&self.cursor),
            progress: None,
        }
    }

    /// Like [`QStream::iter`], invoking `progress` with each yielded
    /// system index.
    pub fn iter_with(&self, progress: impl FnMut(usize) + Send + 'static) -> Systems {
        Systems {
            arena: Arc::clone(&self.arena),
            cursor: Arc::clone(&self.cursor),
            progress: Some(Box::new(progress)),
        }
    }
}

/// Single-pass iterator over the systems of a [`QStream`] view.
pub struct Systems {
    arena: Arc<Arena>,
    cursor: Arc<AtomicUsize>,
    progress: Option<Box<dyn FnMut(usize) + Send>>,
}

impl Iterator for Systems {
    type Item = QSystem;

    fn next(&mut self) -> Option<QSystem> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        if index >= self.arena.num_systems() {
            return None;
        }
        if let Some(progress) = self.progress.as_mut() {
            progress(index);
        }
        Some(QSystem::new(Arc::clone(&self.arena), index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .arena
            .num_systems()
            .saturating_sub(self.cursor.load(Ordering::SeqCst));
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{self, GateCache};

    #[test]
    fn test_zero_initialized() {
        let stream = QStream::new(2, 3);
        let state = stream.system(0).unwrap().state().unwrap();
        assert_eq!(state.shape(), &[4, 4]);
        assert!((state[(0, 0)] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        assert!(state.iter().skip(1).all(|z| z.norm() < 1e-12));
    }

    #[test]
    fn test_index_bounds() {
        let stream = QStream::new(1, 2);
        assert!(stream.system(1).is_ok());
        assert_eq!(
            stream.system(2),
            Err(CoreError::SystemIndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_cursor_single_pass() {
        let stream = QStream::new(1, 3);
        let indices: Vec<usize> = stream.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        // Exhausted without a cursor rebuild.
        assert!(stream.next_system().is_none());
        assert_eq!(stream.iter().count(), 0);

        stream.reset_cursor();
        assert_eq!(stream.next_system().unwrap().index(), 0);
    }

    #[test]
    fn test_views_share_state_not_cursor() {
        let stream = QStream::new(1, 2);
        let view = stream.view();
        let cache = GateCache::new();

        // Mutate through one view, observe through the other.
        let q = stream.system(0).unwrap().qubit(0).unwrap();
        gates::x(&q, &cache).unwrap();
        let q_view = view.system(0).unwrap().qubit(0).unwrap();
        assert_eq!(q_view.measure(&cache).unwrap(), 1);

        // Cursors advance independently.
        assert_eq!(stream.next_system().unwrap().index(), 0);
        assert_eq!(view.next_system().unwrap().index(), 0);
    }

    #[test]
    fn test_iter_with_progress() {
        let stream = QStream::new(1, 4);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let count = stream
            .iter_with(move |i| sink.lock().unwrap().push(i))
            .count();
        assert_eq!(count, 4);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reformat() {
        let stream = QStream::new(1, 1);
        let cache = GateCache::new();
        let q = stream.system(0).unwrap().qubit(0).unwrap();
        gates::x(&q, &cache).unwrap();
        stream.reformat();
        assert_eq!(q.measure(&cache).unwrap(), 0);
    }
}
