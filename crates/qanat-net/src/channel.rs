//! Timed, lossy, point-to-point channels.
//!
//! A channel is an ordered FIFO of `(payload, arrival timestamp)` wire
//! items between one sender and one receiver, carried over a bounded
//! queue with backpressure. Quantum channels transport `(system, qubit)`
//! addresses (never state) and thread the reconstructed qubit through
//! their chained noise models on retrieval. Classical channels carry
//! arbitrary JSON payloads unchanged, with a pulse time proportional to
//! the payload's serialized bit size.
//!
//! Arrival time is `sender clock + pulse time + length / signal speed`.
//! Retrieval blocks until an item is available; there is no timeout or
//! cancellation, so an asymmetric protocol can deadlock. Avoiding that
//! is the caller's contract, not a channel guarantee.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use qanat_core::{GateCache, QStream, Qubit, QubitAddr};

use crate::error::{NetError, NetResult};
use crate::noise::NoiseModel;

/// Signal propagation speed in km/s (speed of light in fiber-adjacent
/// units used throughout the simulator).
pub const SIGNAL_SPEED: f64 = 2.998e5;

/// Default bounded-queue capacity for both channel kinds.
pub const DEFAULT_CAPACITY: usize = 64;

/// Wire item of a quantum channel: a qubit address (or a lost-qubit
/// marker) plus its simulated arrival time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QWireItem {
    /// `None` marks "no qubit" (sent as lost or dropped upstream).
    pub addr: Option<QubitAddr>,
    /// Simulated arrival timestamp.
    pub arrival: f64,
}

/// Wire item of a classical channel.
#[derive(Debug, Clone)]
pub struct CWireItem {
    /// The transmitted object, unchanged.
    pub payload: Value,
    /// Simulated arrival timestamp.
    pub arrival: f64,
}

/// Configuration for one quantum channel direction pair.
#[derive(Debug, Clone)]
pub struct QChannelConfig {
    /// Physical channel length in km.
    pub length: f64,
    /// Bounded queue capacity.
    pub capacity: usize,
    /// Noise models, applied in order on retrieval.
    pub noise: Vec<NoiseModel>,
}

impl Default for QChannelConfig {
    fn default() -> Self {
        Self {
            length: 0.0,
            capacity: DEFAULT_CAPACITY,
            noise: Vec::new(),
        }
    }
}

impl QChannelConfig {
    /// Ideal channel of the given length, no noise.
    pub fn with_length(length: f64) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// Fiber-optic line: attenuation parameterized by the channel length
    /// as the sole error model.
    pub fn fiber(length: f64) -> Self {
        Self {
            length,
            capacity: DEFAULT_CAPACITY,
            noise: vec![NoiseModel::attenuation(length)],
        }
    }

    /// Append a noise model to the chain.
    #[must_use]
    pub fn with_noise(mut self, model: NoiseModel) -> Self {
        self.noise.push(model);
        self
    }
}

/// Configuration for one classical channel direction pair.
#[derive(Debug, Clone)]
pub struct CChannelConfig {
    /// Physical channel length in km.
    pub length: f64,
    /// Bounded queue capacity.
    pub capacity: usize,
}

impl Default for CChannelConfig {
    fn default() -> Self {
        Self {
            length: 0.0,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CChannelConfig {
    /// Classical line of the given length.
    pub fn with_length(length: f64) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }
}

/// Sending endpoint of a quantum channel.
#[derive(Debug)]
pub struct QChannelTx {
    tx: mpsc::Sender<QWireItem>,
    length: f64,
}

impl QChannelTx {
    /// Serialize and push a qubit (or a lost-qubit marker) into the
    /// channel, stamped with its simulated arrival time.
    pub async fn put(
        &self,
        qubit: Option<&Qubit>,
        sender_time: f64,
        pulse_length: f64,
    ) -> NetResult<()> {
        let arrival = sender_time + pulse_length + self.length / SIGNAL_SPEED;
        let item = QWireItem {
            addr: qubit.map(Qubit::serialize),
            arrival,
        };
        self.tx
            .send(item)
            .await
            .map_err(|_| NetError::ChannelClosed("quantum channel receiver dropped".to_string()))
    }
}

/// Receiving endpoint of a quantum channel.
#[derive(Debug)]
pub struct QChannelRx {
    rx: mpsc::Receiver<QWireItem>,
    stream: QStream,
    noise: Vec<NoiseModel>,
}

impl QChannelRx {
    /// Dequeue the next wire item in FIFO order, reconstruct the qubit
    /// from the receiver's pool, and thread it through the noise chain.
    pub async fn get(&mut self, cache: &GateCache) -> NetResult<(Option<Qubit>, f64)> {
        let item = self
            .rx
            .recv()
            .await
            .ok_or_else(|| NetError::ChannelClosed("quantum channel sender dropped".to_string()))?;
        let qubit = match item.addr {
            Some(addr) => Some(self.stream.qubit(addr)?),
            None => None,
        };
        let qubit = NoiseModel::apply_chain(&self.noise, qubit, cache);
        Ok((qubit, item.arrival))
    }
}

/// Build one directed quantum channel; the receiver reconstructs qubits
/// from `stream`.
pub fn qchannel(config: QChannelConfig, stream: QStream) -> (QChannelTx, QChannelRx) {
    let (tx, rx) = mpsc::channel(config.capacity);
    (
        QChannelTx {
            tx,
            length: config.length,
        },
        QChannelRx {
            rx,
            stream,
            noise: config.noise,
        },
    )
}

/// Sending endpoint of a classical channel.
#[derive(Debug)]
pub struct CChannelTx {
    tx: mpsc::Sender<CWireItem>,
    length: f64,
}

impl CChannelTx {
    /// Push a payload, stamped with its arrival time. `pulse_time` is the
    /// size-proportional transmission duration already computed by the
    /// sender.
    pub async fn put(&self, payload: Value, sender_time: f64, pulse_time: f64) -> NetResult<()> {
        let arrival = sender_time + pulse_time + self.length / SIGNAL_SPEED;
        let item = CWireItem { payload, arrival };
        self.tx
            .send(item)
            .await
            .map_err(|_| NetError::ChannelClosed("classical channel receiver dropped".to_string()))
    }
}

/// Receiving endpoint of a classical channel.
#[derive(Debug)]
pub struct CChannelRx {
    rx: mpsc::Receiver<CWireItem>,
}

impl CChannelRx {
    /// Dequeue the next payload in FIFO order.
    pub async fn get(&mut self) -> NetResult<(Value, f64)> {
        let item = self.rx.recv().await.ok_or_else(|| {
            NetError::ChannelClosed("classical channel sender dropped".to_string())
        })?;
        Ok((item.payload, item.arrival))
    }
}

/// Build one directed classical channel.
pub fn cchannel(config: CChannelConfig) -> (CChannelTx, CChannelRx) {
    let (tx, rx) = mpsc::channel(config.capacity);
    (
        CChannelTx {
            tx,
            length: config.length,
        },
        CChannelRx { rx },
    )
}

/// Serialized size of a classical payload in bits, which scales its
/// transmission time.
pub fn bit_size(value: &Value) -> NetResult<usize> {
    Ok(serde_json::to_vec(value)?.len() * 8)
}
