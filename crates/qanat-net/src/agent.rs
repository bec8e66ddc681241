//! Agents: independently-scheduled protocol participants.
//!
//! An agent owns its channel endpoints, peer-keyed memory partitions, a
//! logical clock, and a gate cache scoped to the simulation run. Agents
//! are connected pairwise before the simulation starts (`qconnect` /
//! `cconnect`), then each runs its [`Protocol`] body once in its own
//! task.
//!
//! Clock discipline: `qsend` advances the sender by one pulse length and
//! `csend` by one pulse length per transmitted bit; every receive forces
//! the clock forward to at least the arrival timestamp, so an agent's
//! clock never regresses below what it has observed.

use std::fmt;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use qanat_core::{GateCache, QStream, Qubit, Systems};

use crate::channel::{
    self, CChannelConfig, CChannelRx, CChannelTx, QChannelConfig, QChannelRx, QChannelTx,
};
use crate::error::{NetError, NetResult};
use crate::output::SharedOutput;

/// Default pulse length: a 10 ps photon pulse.
pub const DEFAULT_PULSE_LENGTH: f64 = 10e-12;

/// Runtime logic of an agent, invoked exactly once when its task starts.
#[async_trait]
pub trait Protocol: Send + 'static {
    /// The protocol body. Results are published with [`Agent::output`].
    async fn run(&mut self, agent: &mut Agent) -> NetResult<()>;
}

/// A named protocol participant with channel endpoints, memory, and a
/// logical clock.
pub struct Agent {
    name: String,
    time: f64,
    pulse_length: f64,
    qstream: QStream,
    cache: GateCache,
    data: Option<Value>,
    out: SharedOutput,
    qchannels_out: FxHashMap<String, QChannelTx>,
    qchannels_in: FxHashMap<String, QChannelRx>,
    cchannels_out: FxHashMap<String, CChannelTx>,
    cchannels_in: FxHashMap<String, CChannelRx>,
    qmem: FxHashMap<String, Vec<Option<Qubit>>>,
    cmem: FxHashMap<String, Vec<Value>>,
}

impl Agent {
    /// Create an agent over a view of the shared pool, registering its
    /// output and progress slots.
    pub fn new(name: impl Into<String>, qstream: QStream, out: SharedOutput) -> Self {
        let name = name.into();
        out.register(&name, qstream.len() as u64);
        Self {
            name,
            time: 0.0,
            pulse_length: DEFAULT_PULSE_LENGTH,
            qstream,
            cache: GateCache::new(),
            data: None,
            out,
            qchannels_out: FxHashMap::default(),
            qchannels_in: FxHashMap::default(),
            cchannels_out: FxHashMap::default(),
            cchannels_in: FxHashMap::default(),
            qmem: FxHashMap::default(),
            cmem: FxHashMap::default(),
        }
    }

    /// Attach arbitrary input data readable from the protocol body.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The agent's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current logical clock in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Simulated duration of one quantum pulse.
    pub fn pulse_length(&self) -> f64 {
        self.pulse_length
    }

    /// Override the pulse length.
    pub fn set_pulse_length(&mut self, pulse_length: f64) {
        self.pulse_length = pulse_length;
    }

    /// Input data attached with [`Agent::with_data`].
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// This agent's view of the shared pool.
    pub fn qstream(&self) -> &QStream {
        &self.qstream
    }

    /// The simulation-scoped gate expansion cache.
    pub fn cache(&self) -> &GateCache {
        &self.cache
    }

    /// Qubits received from `peer`, in arrival order.
    pub fn qmem(&self, peer: &str) -> &[Option<Qubit>] {
        self.qmem.get(peer).map_or(&[], Vec::as_slice)
    }

    /// Classical payloads received from `peer`, in arrival order.
    pub fn cmem(&self, peer: &str) -> &[Value] {
        self.cmem.get(peer).map_or(&[], Vec::as_slice)
    }

    /// Connect two agents bidirectionally with quantum channels built
    /// from `config`, and open a quantum-memory partition on both sides.
    pub fn qconnect(&mut self, other: &mut Agent, config: QChannelConfig) {
        let (tx_here, rx_there) = channel::qchannel(config.clone(), other.qstream.view());
        let (tx_there, rx_here) = channel::qchannel(config, self.qstream.view());
        self.qchannels_out.insert(other.name.clone(), tx_here);
        self.qchannels_in.insert(other.name.clone(), rx_here);
        other.qchannels_out.insert(self.name.clone(), tx_there);
        other.qchannels_in.insert(self.name.clone(), rx_there);
        self.qmem.entry(other.name.clone()).or_default();
        other.qmem.entry(self.name.clone()).or_default();
    }

    /// Connect two agents bidirectionally with classical channels, and
    /// open a classical-memory partition on both sides.
    pub fn cconnect(&mut self, other: &mut Agent, config: CChannelConfig) {
        let (tx_here, rx_there) = channel::cchannel(config.clone());
        let (tx_there, rx_here) = channel::cchannel(config);
        self.cchannels_out.insert(other.name.clone(), tx_here);
        self.cchannels_in.insert(other.name.clone(), rx_here);
        other.cchannels_out.insert(self.name.clone(), tx_there);
        other.cchannels_in.insert(self.name.clone(), rx_there);
        self.cmem.entry(other.name.clone()).or_default();
        other.cmem.entry(self.name.clone()).or_default();
    }

    /// Send a qubit (or a lost-qubit marker) to `target`, advancing the
    /// clock by one pulse length.
    pub async fn qsend(&mut self, target: &str, qubit: Option<Qubit>) -> NetResult<()> {
        let tx = self
            .qchannels_out
            .get(target)
            .ok_or_else(|| NetError::NotConnected(target.to_string()))?;
        tx.put(qubit.as_ref(), self.time, self.pulse_length).await?;
        self.time += self.pulse_length;
        debug!(agent = %self.name, target, time = self.time, "qsend");
        Ok(())
    }

    /// Receive a qubit from `origin`, blocking until one arrives.
    ///
    /// The clock is forced forward to at least the arrival timestamp and
    /// the (possibly lost) qubit is appended to the peer's quantum-memory
    /// partition.
    pub async fn qrecv(&mut self, origin: &str) -> NetResult<Option<Qubit>> {
        let rx = self
            .qchannels_in
            .get_mut(origin)
            .ok_or_else(|| NetError::NotConnected(origin.to_string()))?;
        let (qubit, arrival) = rx.get(&self.cache).await?;
        self.time = self.time.max(arrival);
        self.qmem.entry(origin.to_string()).or_default().push(qubit.clone());
        debug!(agent = %self.name, origin, time = self.time, lost = qubit.is_none(), "qrecv");
        Ok(qubit)
    }

    /// Send a serializable object to `target`, advancing the clock by one
    /// pulse length per transmitted bit.
    pub async fn csend(&mut self, target: &str, payload: impl Serialize) -> NetResult<()> {
        let value = serde_json::to_value(payload)?;
        let pulse_time = channel::bit_size(&value)? as f64 * self.pulse_length;
        let tx = self
            .cchannels_out
            .get(target)
            .ok_or_else(|| NetError::NotConnected(target.to_string()))?;
        tx.put(value, self.time, pulse_time).await?;
        self.time += pulse_time;
        debug!(agent = %self.name, target, time = self.time, "csend");
        Ok(())
    }

    /// Receive a classical object from `origin`, blocking until one
    /// arrives; appended to the peer's classical-memory partition.
    pub async fn crecv(&mut self, origin: &str) -> NetResult<Value> {
        let rx = self
            .cchannels_in
            .get_mut(origin)
            .ok_or_else(|| NetError::NotConnected(origin.to_string()))?;
        let (value, arrival) = rx.get().await?;
        self.time = self.time.max(arrival);
        self.cmem.entry(origin.to_string()).or_default().push(value.clone());
        debug!(agent = %self.name, origin, time = self.time, "crecv");
        Ok(value)
    }

    /// Store a qubit in this agent's own quantum-memory partition.
    pub fn qstore(&mut self, qubit: Option<Qubit>) {
        self.qmem.entry(self.name.clone()).or_default().push(qubit);
    }

    /// Publish the agent's final output into the shared results map.
    pub fn output(&self, value: impl Serialize) -> NetResult<()> {
        self.out.set(&self.name, serde_json::to_value(value)?);
        Ok(())
    }

    /// Overwrite this agent's progress counter.
    pub fn update_progress(&self, value: u64) {
        self.out.update_progress(&self.name, value);
    }

    /// Add one to this agent's progress counter.
    pub fn increment_progress(&self) {
        self.out.increment_progress(&self.name);
    }

    /// Handle to the shared results/progress map.
    pub fn shared_output(&self) -> &SharedOutput {
        &self.out
    }

    /// Traverse this agent's pool view, reporting each visited system
    /// index to the progress counter.
    pub fn systems(&self) -> Systems {
        let out = self.out.clone();
        let name = self.name.clone();
        self.qstream.iter_with(move |index| out.update_progress(&name, index as u64))
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Agent {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Agent {}

impl Hash for Agent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
