//! Qanat network layer
//!
//! Agents, timed lossy channels, and the simulation orchestrator on top
//! of the `qanat-core` state engine.
//!
//! # Overview
//!
//! An [`Agent`] is an independently scheduled protocol participant: it
//! owns channel endpoints to its peers, peer-keyed quantum and classical
//! memory, a logical clock, and a gate cache scoped to the run. Pairs of
//! agents are wired up before the simulation starts with
//! [`Agent::qconnect`] / [`Agent::cconnect`]; each then executes its
//! [`Protocol`] body in its own task under a [`Simulation`].
//!
//! Quantum channels carry `(system, qubit)` addresses into the shared
//! pool plus a simulated arrival timestamp, applying chained
//! [`NoiseModel`]s on retrieval; stochastic photon loss surfaces as a
//! `None` qubit, not an error. Classical channels carry JSON payloads
//! with size-proportional transmission time.
//!
//! # Example: ping-pong measurement
//!
//! ```rust
//! use async_trait::async_trait;
//! use qanat_core::{gates, QStream};
//! use qanat_net::{Agent, NetResult, Protocol, QChannelConfig, SharedOutput, Simulation};
//!
//! struct Send;
//!
//! #[async_trait]
//! impl Protocol for Send {
//!     async fn run(&mut self, agent: &mut Agent) -> NetResult<()> {
//!         let q = agent.qstream().system(0)?.qubit(0)?;
//!         gates::x(&q, agent.cache())?;
//!         agent.qsend("Bob", Some(q)).await
//!     }
//! }
//!
//! struct Recv;
//!
//! #[async_trait]
//! impl Protocol for Recv {
//!     async fn run(&mut self, agent: &mut Agent) -> NetResult<()> {
//!         let qubit = agent.qrecv("Alice").await?.expect("lossless channel");
//!         let bit = qubit.measure(agent.cache())?;
//!         agent.output(bit)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let stream = QStream::new(1, 1);
//! let out = SharedOutput::new();
//! let mut alice = Agent::new("Alice", stream.view(), out.clone());
//! let mut bob = Agent::new("Bob", stream.view(), out);
//! alice.qconnect(&mut bob, QChannelConfig::default());
//!
//! let results = Simulation::new()
//!     .with_agent(alice, Send)
//!     .with_agent(bob, Recv)
//!     .run()
//!     .await
//!     .unwrap();
//! assert_eq!(results["Bob"], serde_json::json!(1));
//! # }
//! ```

pub mod agent;
pub mod channel;
pub mod error;
pub mod noise;
pub mod output;
pub mod simulation;

pub use agent::{Agent, Protocol, DEFAULT_PULSE_LENGTH};
pub use channel::{
    cchannel, qchannel, CChannelConfig, CChannelRx, CChannelTx, CWireItem, QChannelConfig,
    QChannelRx, QChannelTx, QWireItem, DEFAULT_CAPACITY, SIGNAL_SPEED,
};
pub use error::{NetError, NetResult};
pub use noise::{NoiseModel, ATTENUATION_COEFFICIENT};
pub use output::SharedOutput;
pub use simulation::Simulation;
