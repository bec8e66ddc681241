//! Simulation orchestrator.
//!
//! Spawns every agent's protocol as a task, optionally runs a polling
//! progress monitor, joins everything, and returns the shared results
//! map. If any agent fails, remaining tasks are aborted when the join
//! set is dropped and the first failure is reported.

use std::time::Duration;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::interval;
use tracing::{debug, info};

use crate::agent::{Agent, Protocol};
use crate::error::{NetError, NetResult};
use crate::output::SharedOutput;

/// A transient collection of agents sharing one results map, existing
/// only between `run` and its completion.
#[derive(Default)]
pub struct Simulation {
    agents: Vec<(Agent, Box<dyn Protocol>)>,
    out: Option<SharedOutput>,
}

impl Simulation {
    /// Create an empty simulation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent and its protocol body. All agents must share the
    /// same [`SharedOutput`]; the first one added supplies the handle the
    /// simulation reports from.
    #[must_use]
    pub fn with_agent(mut self, agent: Agent, protocol: impl Protocol) -> Self {
        self.add_agent(agent, protocol);
        self
    }

    /// Add an agent and its protocol body.
    pub fn add_agent(&mut self, agent: Agent, protocol: impl Protocol) {
        if self.out.is_none() {
            self.out = Some(agent.shared_output().clone());
        }
        self.agents.push((agent, Box::new(protocol)));
    }

    /// Run every agent to completion and return the results snapshot.
    pub async fn run(self) -> NetResult<FxHashMap<String, Value>> {
        self.run_inner(None).await
    }

    /// Like [`Simulation::run`], with a monitor task that samples each
    /// agent's progress counters every `poll_interval` and logs them.
    pub async fn run_monitored(
        self,
        poll_interval: Duration,
    ) -> NetResult<FxHashMap<String, Value>> {
        self.run_inner(Some(poll_interval)).await
    }

    async fn run_inner(self, monitor: Option<Duration>) -> NetResult<FxHashMap<String, Value>> {
        let out = self.out.unwrap_or_default();
        let names: Vec<String> = self
            .agents
            .iter()
            .map(|(agent, _)| agent.name().to_string())
            .collect();
        info!(agents = names.len(), "starting simulation");

        let mut tasks = JoinSet::new();
        for (mut agent, mut protocol) in self.agents {
            tasks.spawn(async move {
                let name = agent.name().to_string();
                let result = protocol.run(&mut agent).await;
                (name, result)
            });
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let monitor_task = monitor.map(|period| {
            tokio::spawn(monitor_progress(out.clone(), names, period, stop_rx))
        });

        let mut failure: Option<NetError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => debug!(agent = %name, "agent finished"),
                Ok((name, Err(err))) => {
                    failure.get_or_insert(NetError::AgentFailed(format!("{name}: {err}")));
                    break;
                }
                Err(err) => {
                    failure.get_or_insert(NetError::AgentFailed(err.to_string()));
                    break;
                }
            }
        }

        let _ = stop_tx.send(true);
        if let Some(task) = monitor_task {
            let _ = task.await;
        }

        match failure {
            Some(err) => Err(err),
            None => {
                info!("simulation finished");
                Ok(out.snapshot())
            }
        }
    }
}

async fn monitor_progress(
    out: SharedOutput,
    names: Vec<String>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for name in &names {
                    let (progress, total) = out.progress(name);
                    info!(agent = %name, progress, total, "progress");
                }
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
}
