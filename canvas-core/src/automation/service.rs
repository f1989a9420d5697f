use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::automation::{
    build_prompt, AgentOutcome, AgentRequest, AgentRunner, AutomationTool, InputSchemaRegistry,
    ProgressReporter, ToolContext,
};
use crate::config::RunConcurrency;
use crate::document::{DependencyKind, NodeData, NodeDataStatus};
use crate::errors::{AutomationError, AutomationResult};
use crate::services::NodeDataService;

/// Lifecycle of one automation run as seen by pollers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RunState {
    Running,
    Succeeded,
    Failed { message: String },
}

impl RunState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, RunState::Running)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub run_id: String,
    pub node_data_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: RunState,
}

struct RunRecord {
    node_data_id: String,
    started_at: DateTime<Utc>,
    state: watch::Receiver<RunState>,
}

/// A run that starts once the current lease holder settles.
struct QueuedRun {
    run_id: String,
    state_tx: watch::Sender<RunState>,
}

/// Per-node lease: the run holding it, plus at most one queued follow-up.
struct Lease {
    run_id: String,
    follow_up: Option<QueuedRun>,
}

/// Runs automation pipelines for node data in background tasks.
///
/// `trigger` returns a run id immediately. The run moves the record to
/// `working`, runs the agent and settles it as `idle` or `error`; no error
/// escapes the task.
#[derive(Clone)]
pub struct AutomationService {
    store: NodeDataService,
    registry: Arc<InputSchemaRegistry>,
    runner: Arc<dyn AgentRunner>,
    tools: Vec<Arc<dyn AutomationTool>>,
    concurrency: RunConcurrency,
    runs: Arc<DashMap<String, RunRecord>>,
    leases: Arc<DashMap<String, Lease>>,
}

impl AutomationService {
    pub fn new(
        store: NodeDataService,
        registry: InputSchemaRegistry,
        runner: Arc<dyn AgentRunner>,
        concurrency: RunConcurrency,
    ) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            runner,
            tools: Vec::new(),
            concurrency,
            runs: Arc::new(DashMap::new()),
            leases: Arc::new(DashMap::new()),
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn AutomationTool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Start a run for `node_data_id` and return its run id.
    ///
    /// In exclusive mode a trigger while another run holds the node's lease
    /// queues one follow-up run that starts when the holder settles, so
    /// inputs changed mid-run are picked up. Further triggers before that
    /// join the queued run. Must be called within a tokio runtime.
    pub fn trigger(&self, node_data_id: &str) -> String {
        let run_id = Uuid::new_v4().to_string();
        match self.leases.entry(node_data_id.to_string()) {
            Entry::Occupied(mut lease) if self.concurrency == RunConcurrency::Exclusive => {
                let lease = lease.get_mut();
                if let Some(queued) = &lease.follow_up {
                    debug!(
                        "Automation for node data {} already queued as {}",
                        node_data_id, queued.run_id
                    );
                    return queued.run_id.clone();
                }
                info!(
                    "Automation for node data {} busy with {}, queueing run {}",
                    node_data_id, lease.run_id, run_id
                );
                let state_tx = self.register_run(&run_id, node_data_id);
                lease.follow_up = Some(QueuedRun {
                    run_id: run_id.clone(),
                    state_tx,
                });
                return run_id;
            }
            Entry::Occupied(mut lease) => {
                warn!(
                    "Automation for node data {} overlaps run {}",
                    node_data_id,
                    lease.get().run_id
                );
                lease.get_mut().run_id = run_id.clone();
            }
            Entry::Vacant(slot) => {
                slot.insert(Lease {
                    run_id: run_id.clone(),
                    follow_up: None,
                });
            }
        }

        let state_tx = self.register_run(&run_id, node_data_id);
        self.spawn_run(run_id.clone(), node_data_id.to_string(), state_tx);
        run_id
    }

    fn register_run(&self, run_id: &str, node_data_id: &str) -> watch::Sender<RunState> {
        let (state_tx, state_rx) = watch::channel(RunState::Running);
        self.runs.insert(
            run_id.to_string(),
            RunRecord {
                node_data_id: node_data_id.to_string(),
                started_at: Utc::now(),
                state: state_rx,
            },
        );
        state_tx
    }

    /// Run on a background task, then any follow-ups queued meanwhile.
    fn spawn_run(&self, run_id: String, node_data_id: String, state_tx: watch::Sender<RunState>) {
        let service = self.clone();
        tokio::spawn(async move {
            let mut next = Some(QueuedRun { run_id, state_tx });
            while let Some(QueuedRun { run_id, state_tx }) = next.take() {
                info!("Starting automation run {} for node data {}", run_id, node_data_id);
                next = service.execute(run_id, &node_data_id, state_tx).await;
            }
        });
    }

    pub fn run_status(&self, run_id: &str) -> Option<RunStatus> {
        self.runs.get(run_id).map(|record| RunStatus {
            run_id: run_id.to_string(),
            node_data_id: record.node_data_id.clone(),
            started_at: record.started_at,
            state: record.state.borrow().clone(),
        })
    }

    /// Wait until the run settles. Returns `None` for unknown run ids.
    pub async fn wait(&self, run_id: &str) -> Option<RunState> {
        let mut state = self.runs.get(run_id).map(|record| record.state.clone())?;
        if state.wait_for(RunState::is_settled).await.is_err() {
            debug!("Run {} state channel closed", run_id);
        }
        let settled = state.borrow().clone();
        Some(settled)
    }

    /// Run id currently holding the node's lease, if any.
    pub fn active_run(&self, node_data_id: &str) -> Option<String> {
        self.leases.get(node_data_id).map(|lease| lease.run_id.clone())
    }

    /// Forget settled runs started more than `max_age` ago; returns how many
    /// were removed. Running and queued runs are kept.
    pub fn cleanup_settled(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let cutoff = Utc::now() - max_age;
        let before = self.runs.len();
        self.runs
            .retain(|_, record| !(record.state.borrow().is_settled() && record.started_at <= cutoff));
        before - self.runs.len()
    }

    /// Run one pipeline and settle it. Returns the follow-up queued on the
    /// lease while it ran, which now holds the lease.
    async fn execute(
        &self,
        run_id: String,
        node_data_id: &str,
        state_tx: watch::Sender<RunState>,
    ) -> Option<QueuedRun> {
        let work_started_at = Utc::now();
        let outcome = self.run_pipeline(&run_id, node_data_id, work_started_at).await;

        let (status, state) = match outcome {
            Ok(outcome) => {
                info!(
                    "Automation run {} for node data {} finished with {} tool calls",
                    run_id,
                    node_data_id,
                    outcome.tool_calls.len()
                );
                debug!("Run {} final text: {}", run_id, outcome.text);
                (NodeDataStatus::Idle, RunState::Succeeded)
            }
            Err(err) => {
                warn!(
                    "Automation run {} for node data {} failed [{}]: {}",
                    run_id,
                    node_data_id,
                    err.error_code(),
                    err
                );
                (
                    NodeDataStatus::Error,
                    RunState::Failed {
                        message: err.to_string(),
                    },
                )
            }
        };

        if let Err(err) = self.store.settle_run(node_data_id, &run_id, status).await {
            error!(
                "Failed to settle node data {} after run {}: {}",
                node_data_id, run_id, err
            );
        }

        let follow_up = self.release_lease(node_data_id, &run_id);
        state_tx.send_replace(state);
        follow_up
    }

    /// Hand the lease to the queued follow-up, or drop it. A lease taken
    /// over by an overlapping run is left alone.
    fn release_lease(&self, node_data_id: &str, run_id: &str) -> Option<QueuedRun> {
        match self.leases.entry(node_data_id.to_string()) {
            Entry::Occupied(mut lease) if lease.get().run_id == run_id => {
                match lease.get_mut().follow_up.take() {
                    Some(next) => {
                        lease.get_mut().run_id = next.run_id.clone();
                        Some(next)
                    }
                    None => {
                        lease.remove();
                        None
                    }
                }
            }
            _ => None,
        }
    }

    async fn run_pipeline(
        &self,
        run_id: &str,
        node_data_id: &str,
        work_started_at: DateTime<Utc>,
    ) -> AutomationResult<AgentOutcome> {
        let node = match self.store.begin_run(node_data_id, run_id).await {
            Ok(node) => node,
            Err(err) if err.is_not_found() => {
                return Err(AutomationError::NodeDataNotFound(node_data_id.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        let inputs = self.gather_inputs(&node).await?;

        let input_schema = self
            .registry
            .get(&node.node_type)
            .cloned()
            .ok_or_else(|| AutomationError::SchemaMissing(node.node_type.clone()))?;

        let progress = ProgressReporter::for_node_data(self.store.clone(), node_data_id, work_started_at);
        progress
            .report(
                "running_agent",
                Some(serde_json::json!({ "inputCount": inputs.len() })),
            )
            .await;

        let request = AgentRequest {
            model: node.agent.as_ref().map(|agent| agent.model.clone()),
            instructions: node
                .agent
                .as_ref()
                .map(|agent| agent.instructions.clone())
                .unwrap_or_default(),
            input_schema,
            prompt: build_prompt(&node, &inputs),
            tools: self.tools.clone(),
            context: ToolContext::for_run(self.store.clone(), node_data_id, progress),
        };

        self.runner.run(request).await
    }

    /// Load the records behind the node's `input` dependencies, skipping
    /// entries whose record no longer exists.
    async fn gather_inputs(&self, node: &NodeData) -> AutomationResult<Vec<NodeData>> {
        let mut inputs = Vec::new();
        for dependency in node.dependencies_of(DependencyKind::Input) {
            match self.store.get(&dependency.node_data_id).await {
                Ok(input) => inputs.push(input),
                Err(err) if err.is_not_found() => warn!(
                    "Input {} of node data {} no longer exists",
                    dependency.node_data_id, node.id
                ),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(inputs)
    }
}
