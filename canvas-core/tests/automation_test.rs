use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use canvas::automation::{
    AgentOutcome, AgentRequest, AgentRunner, InputSchemaRegistry, RunState, UPDATE_NODE_FIELDS,
};
use canvas::config::{CanvasConfig, RunConcurrency};
use canvas::document::NodeDataStatus;
use canvas::errors::{AutomationError, AutomationResult, CoreErrorKind};
use canvas::services::{HeaderAuthProvider, RequestContext, StoreEvent};
use canvas::AppContext;
use canvas_test_utils::{
    agent_node_data, ctx, new_node_data, node, triggering_edge, values, TestDb, ALICE,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Agent runtime double: counts calls, records prompts, optionally writes
/// fields through the built-in tool and optionally waits for a release
/// signal that decides success.
#[derive(Default)]
struct ScriptedRunner {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    fields: Option<Value>,
    fail: bool,
    gates: Mutex<VecDeque<oneshot::Receiver<bool>>>,
}

impl ScriptedRunner {
    fn writing(fields: Value) -> Self {
        Self {
            fields: Some(fields),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn gated(count: usize) -> (Self, Vec<oneshot::Sender<bool>>) {
        let mut senders = Vec::new();
        let mut gates = VecDeque::new();
        for _ in 0..count {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            gates.push_back(rx);
        }
        let runner = Self {
            gates: Mutex::new(gates),
            ..Default::default()
        };
        (runner, senders)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn run(&self, request: AgentRequest) -> AutomationResult<AgentOutcome> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let gate = self.gates.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut tool_calls = Vec::new();
        if let Some(fields) = &self.fields {
            tool_calls.push(
                request
                    .call_tool(UPDATE_NODE_FIELDS, json!({ "fields": fields }))
                    .await?,
            );
        }

        let succeed = match gate {
            Some(gate) => gate.await.unwrap_or(false),
            None => !self.fail,
        };
        if !succeed {
            return Err(AutomationError::Runner("scripted failure".to_string()));
        }
        Ok(AgentOutcome {
            text: "done".to_string(),
            tool_calls,
        })
    }
}

async fn setup_app(runner: Arc<ScriptedRunner>, concurrency: RunConcurrency) -> AppContext {
    let db = TestDb::new_in_memory().connect().await.unwrap();
    AppContext::with_collaborators(
        db,
        CanvasConfig {
            automation_concurrency: concurrency,
            ..Default::default()
        },
        Arc::new(HeaderAuthProvider),
        runner,
        InputSchemaRegistry::builtin(),
    )
}

async fn wait_for_calls(runner: &ScriptedRunner, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while runner.calls() < expected {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_missing_input_schema_fails_without_running_agent() {
    let runner = Arc::new(ScriptedRunner::default());
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let data = app
        .create_node_data(&ctx(ALICE), agent_node_data("mystery", None))
        .await
        .unwrap();

    let run_id = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    let state = app.automation_service().wait(&run_id).await.unwrap();

    assert!(matches!(state, RunState::Failed { .. }));
    assert_eq!(runner.calls(), 0);
    let data = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(data.status, NodeDataStatus::Error);
    assert_eq!(data.automation_run_id.as_deref(), Some(run_id.as_str()));
}

#[tokio::test]
async fn test_successful_run_settles_idle_and_writes_fields() {
    let runner = Arc::new(ScriptedRunner::writing(json!({ "summary": "All good" })));
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let data = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();

    let run_id = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(
        app.automation_service().wait(&run_id).await,
        Some(RunState::Succeeded)
    );

    let data = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(data.status, NodeDataStatus::Idle);
    assert_eq!(data.values.get("summary"), Some(&json!("All good")));

    let progress = data.automation_progress.unwrap();
    assert_eq!(progress.current_step_type, "updating_fields");
    assert_eq!(progress.current_step_data, json!({ "fields": ["summary"] }));
    assert!(progress.current_step_started_at >= progress.work_started_at);

    let status = app.automation_run_status(&ctx(ALICE), &run_id).unwrap();
    assert_eq!(status.node_data_id, data.id);
    assert_eq!(status.state, RunState::Succeeded);
}

#[tokio::test]
async fn test_runner_failure_settles_error() {
    let runner = Arc::new(ScriptedRunner::failing());
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let data = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();

    let run_id = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    let state = app.automation_service().wait(&run_id).await.unwrap();

    assert_eq!(
        state,
        RunState::Failed {
            message: "Agent run failed: scripted failure".to_string()
        }
    );
    assert_eq!(runner.calls(), 1);
    let data = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(data.status, NodeDataStatus::Error);
}

#[tokio::test]
async fn test_untouchable_fields_are_ignored() {
    let runner = Arc::new(ScriptedRunner::writing(
        json!({ "summary": "ok", "secret": "leak" }),
    ));
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let data = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", Some(&["summary"])))
        .await
        .unwrap();

    let run_id = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    app.automation_service().wait(&run_id).await.unwrap();

    let data = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(data.values.get("summary"), Some(&json!("ok")));
    assert!(data.values.get("secret").is_none());
}

#[tokio::test]
async fn test_prompt_includes_input_values() {
    let runner = Arc::new(ScriptedRunner::default());
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let canvas_id = app.create_canvas(&ctx(ALICE), "Flow").await.unwrap();

    let mut upstream = new_node_data("textNote");
    upstream.values = values(json!({ "text": "quarterly numbers" }));
    let upstream = app.create_node_data(&ctx(ALICE), upstream).await.unwrap();
    let downstream = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();
    app.add_nodes(
        &ctx(ALICE),
        &canvas_id,
        vec![node("up", &upstream.id), node("down", &downstream.id)],
    )
    .await
    .unwrap();
    app.add_edges(
        &ctx(ALICE),
        &canvas_id,
        vec![canvas_test_utils::edge("e1", "up", "down")],
    )
    .await
    .unwrap();

    let run_id = app
        .trigger_automation(&ctx(ALICE), &downstream.id)
        .await
        .unwrap();
    app.automation_service().wait(&run_id).await.unwrap();

    let prompts = runner.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("quarterly numbers"));
}

#[tokio::test]
async fn test_exclusive_trigger_during_run_queues_one_follow_up() {
    let (runner, mut gates) = ScriptedRunner::gated(1);
    let runner = Arc::new(runner);
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let data = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();

    let first = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    wait_for_calls(&runner, 1).await;
    let second = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    let third = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(second, third);
    assert_eq!(app.automation_service().active_run(&data.id), Some(first.clone()));
    assert_eq!(runner.calls(), 1);

    gates.remove(0).send(true).unwrap();
    assert_eq!(
        app.automation_service().wait(&first).await,
        Some(RunState::Succeeded)
    );
    assert_eq!(
        app.automation_service().wait(&second).await,
        Some(RunState::Succeeded)
    );
    assert_eq!(runner.calls(), 2);
    assert_eq!(app.automation_service().active_run(&data.id), None);

    let data = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(data.status, NodeDataStatus::Idle);
    assert_eq!(data.automation_run_id.as_deref(), Some(second.as_str()));
}

#[tokio::test]
async fn test_upstream_change_during_run_is_processed_afterwards() {
    let (runner, mut gates) = ScriptedRunner::gated(1);
    let runner = Arc::new(runner);
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let canvas_id = app.create_canvas(&ctx(ALICE), "Flow").await.unwrap();

    let mut upstream = new_node_data("textNote");
    upstream.values = values(json!({ "text": "old input" }));
    let upstream = app.create_node_data(&ctx(ALICE), upstream).await.unwrap();
    let downstream = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();
    app.add_nodes(
        &ctx(ALICE),
        &canvas_id,
        vec![node("up", &upstream.id), node("down", &downstream.id)],
    )
    .await
    .unwrap();
    app.add_edges(
        &ctx(ALICE),
        &canvas_id,
        vec![triggering_edge("e1", "up", "down")],
    )
    .await
    .unwrap();

    let first = app
        .trigger_automation(&ctx(ALICE), &downstream.id)
        .await
        .unwrap();
    wait_for_calls(&runner, 1).await;

    app.update_node_data_values(
        &ctx(ALICE),
        &upstream.id,
        values(json!({ "text": "new input" })),
    )
    .await
    .unwrap();
    gates.remove(0).send(true).unwrap();
    app.automation_service().wait(&first).await.unwrap();
    wait_for_calls(&runner, 2).await;

    let follow_up = app
        .get_node_data(&ctx(ALICE), &downstream.id)
        .await
        .unwrap()
        .automation_run_id
        .unwrap();
    assert_ne!(follow_up, first);
    assert_eq!(
        app.automation_service().wait(&follow_up).await,
        Some(RunState::Succeeded)
    );

    let prompts = runner.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("old input"));
    assert!(prompts[1].contains("new input"));
}

#[tokio::test]
async fn test_cleanup_forgets_only_settled_runs() {
    let (runner, mut gates) = ScriptedRunner::gated(1);
    let runner = Arc::new(runner);
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let busy = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();
    let broken = app
        .create_node_data(&ctx(ALICE), agent_node_data("mystery", None))
        .await
        .unwrap();

    let running = app.trigger_automation(&ctx(ALICE), &busy.id).await.unwrap();
    wait_for_calls(&runner, 1).await;
    let settled = app.trigger_automation(&ctx(ALICE), &broken.id).await.unwrap();
    app.automation_service().wait(&settled).await.unwrap();

    let service = app.automation_service();
    assert_eq!(service.cleanup_settled(Duration::from_secs(3600)), 0);
    assert_eq!(service.cleanup_settled(Duration::ZERO), 1);

    let err = app.automation_run_status(&ctx(ALICE), &settled).unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);
    assert!(app.automation_run_status(&ctx(ALICE), &running).is_ok());

    gates.remove(0).send(true).unwrap();
    service.wait(&running).await.unwrap();
}

#[tokio::test]
async fn test_overlapping_runs_last_settlement_wins() {
    let (runner, mut gates) = ScriptedRunner::gated(2);
    let runner = Arc::new(runner);
    let app = setup_app(runner.clone(), RunConcurrency::Overlapping).await;
    let data = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();

    let first = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    wait_for_calls(&runner, 1).await;
    let second = app.trigger_automation(&ctx(ALICE), &data.id).await.unwrap();
    wait_for_calls(&runner, 2).await;
    assert_ne!(first, second);

    let working = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(working.status, NodeDataStatus::Working);
    assert_eq!(working.automation_run_id.as_deref(), Some(second.as_str()));

    let first_gate = gates.remove(0);
    let second_gate = gates.remove(0);

    second_gate.send(true).unwrap();
    app.automation_service().wait(&second).await.unwrap();
    let after_second = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(after_second.status, NodeDataStatus::Idle);

    first_gate.send(false).unwrap();
    app.automation_service().wait(&first).await.unwrap();
    let after_first = app.get_node_data(&ctx(ALICE), &data.id).await.unwrap();
    assert_eq!(after_first.status, NodeDataStatus::Error);
}

#[tokio::test]
async fn test_upstream_update_triggers_flagged_downstream() {
    let runner = Arc::new(ScriptedRunner::default());
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let canvas_id = app.create_canvas(&ctx(ALICE), "Flow").await.unwrap();

    let upstream = app
        .create_node_data(&ctx(ALICE), new_node_data("textNote"))
        .await
        .unwrap();
    let downstream = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();
    app.add_nodes(
        &ctx(ALICE),
        &canvas_id,
        vec![node("up", &upstream.id), node("down", &downstream.id)],
    )
    .await
    .unwrap();
    app.add_edges(
        &ctx(ALICE),
        &canvas_id,
        vec![triggering_edge("e1", "up", "down")],
    )
    .await
    .unwrap();

    app.update_node_data_values(
        &ctx(ALICE),
        &upstream.id,
        values(json!({ "text": "fresh" })),
    )
    .await
    .unwrap();
    wait_for_calls(&runner, 1).await;

    let run_id = app
        .get_node_data(&ctx(ALICE), &downstream.id)
        .await
        .unwrap()
        .automation_run_id
        .unwrap();
    assert_eq!(
        app.automation_service().wait(&run_id).await,
        Some(RunState::Succeeded)
    );
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn test_upstream_update_without_flag_does_not_trigger() {
    let runner = Arc::new(ScriptedRunner::default());
    let app = setup_app(runner.clone(), RunConcurrency::Exclusive).await;
    let canvas_id = app.create_canvas(&ctx(ALICE), "Flow").await.unwrap();

    let upstream = app
        .create_node_data(&ctx(ALICE), new_node_data("textNote"))
        .await
        .unwrap();
    let downstream = app
        .create_node_data(&ctx(ALICE), agent_node_data("summary", None))
        .await
        .unwrap();
    app.add_nodes(
        &ctx(ALICE),
        &canvas_id,
        vec![node("up", &upstream.id), node("down", &downstream.id)],
    )
    .await
    .unwrap();
    app.add_edges(
        &ctx(ALICE),
        &canvas_id,
        vec![canvas_test_utils::edge("e1", "up", "down")],
    )
    .await
    .unwrap();
    let mut changes = app.events().subscribe_node_data(&upstream.id);

    app.update_node_data_values(
        &ctx(ALICE),
        &upstream.id,
        values(json!({ "text": "fresh" })),
    )
    .await
    .unwrap();

    match changes.recv().await.unwrap() {
        StoreEvent::NodeDataChanged(data) => {
            assert_eq!(data.values.get("text"), Some(&json!("fresh")))
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(app.automation_service().active_run(&downstream.id), None);
    let downstream = app.get_node_data(&ctx(ALICE), &downstream.id).await.unwrap();
    assert_eq!(downstream.status, NodeDataStatus::Idle);
    assert_eq!(downstream.automation_run_id, None);
}

#[tokio::test]
async fn test_trigger_checks_identity_and_existence() {
    let app = setup_app(
        Arc::new(ScriptedRunner::default()),
        RunConcurrency::Exclusive,
    )
    .await;

    let err = app
        .trigger_automation(&RequestContext::anonymous(), "any")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Unauthorized);

    let err = app
        .trigger_automation(&ctx(ALICE), "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    let err = app.automation_run_status(&ctx(ALICE), "unknown").unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);
}
