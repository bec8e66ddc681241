//! End-to-end quantum teleportation between two agents.
//!
//! Alice teleports a classical bit pattern encoded in data qubits: for
//! each 3-qubit system she entangles a Bell pair, sends one half to Bob,
//! performs the Bell measurement on her side, and classically transmits
//! the two outcome bits. Bob applies the X/Z corrections and measures.
//! Over a zero-length (lossless) channel Bob's output must equal Alice's
//! input exactly.

use async_trait::async_trait;
use serde_json::json;

use qanat_core::{gates, QStream};
use qanat_net::{
    Agent, CChannelConfig, NetResult, Protocol, QChannelConfig, SharedOutput, Simulation,
};

const BITS: [u8; 16] = [1, 0, 1, 1, 0, 0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 1];

struct AliceTeleport;

#[async_trait]
impl Protocol for AliceTeleport {
    async fn run(&mut self, agent: &mut Agent) -> NetResult<()> {
        let bits: Vec<u8> = agent
            .data()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
            .unwrap_or_default();

        let mut sent = Vec::new();
        for (i, sys) in agent.systems().enumerate() {
            let data = sys.qubit(0)?;
            let here = sys.qubit(1)?;
            let there = sys.qubit(2)?;

            // Entangle the pair and ship one half ahead of measurement.
            gates::h(&here, agent.cache())?;
            gates::cnot(&here, &there, agent.cache())?;
            agent.qsend("Bob", Some(there)).await?;

            // Encode the classical bit, then Bell-measure.
            if bits[i] == 1 {
                gates::x(&data, agent.cache())?;
            }
            gates::cnot(&data, &here, agent.cache())?;
            gates::h(&data, agent.cache())?;
            let m_data = data.measure(agent.cache())?;
            let m_here = here.measure(agent.cache())?;
            agent.csend("Bob", json!([m_data, m_here])).await?;
            sent.push(bits[i]);
        }
        agent.output(sent)
    }
}

struct BobTeleport;

#[async_trait]
impl Protocol for BobTeleport {
    async fn run(&mut self, agent: &mut Agent) -> NetResult<()> {
        let rounds = agent.qstream().len();
        let mut decoded = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            let qubit = agent
                .qrecv("Alice")
                .await?
                .expect("zero-length channel is lossless");
            let outcomes = agent.crecv("Alice").await?;
            let m_data = outcomes[0].as_u64().unwrap_or(0);
            let m_here = outcomes[1].as_u64().unwrap_or(0);

            if m_here == 1 {
                gates::x(&qubit, agent.cache())?;
            }
            if m_data == 1 {
                gates::z(&qubit, agent.cache())?;
            }
            decoded.push(qubit.measure(agent.cache())?);
            agent.increment_progress();
        }
        agent.output(decoded)
    }
}

#[tokio::test]
async fn teleportation_is_exact_over_lossless_channel() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let stream = QStream::new(3, BITS.len());
    let out = SharedOutput::new();
    let mut alice =
        Agent::new("Alice", stream.view(), out.clone()).with_data(json!(BITS.to_vec()));
    let mut bob = Agent::new("Bob", stream.view(), out);

    alice.qconnect(&mut bob, QChannelConfig::default());
    alice.cconnect(&mut bob, CChannelConfig::default());

    let results = Simulation::new()
        .with_agent(alice, AliceTeleport)
        .with_agent(bob, BobTeleport)
        .run()
        .await
        .unwrap();

    assert_eq!(results["Bob"], json!(BITS.to_vec()));
    assert_eq!(results["Alice"], json!(BITS.to_vec()));
    assert_eq!(results["Bob:progress"], json!(BITS.len()));
}
