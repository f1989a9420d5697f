use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::AutomationProgress;
use crate::services::NodeDataService;

/// Reports step progress of an automation run onto its node data record.
///
/// A disabled reporter swallows every report, so tools can call it
/// unconditionally whether they run inside an automation or interactively.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    channel: Option<Arc<ProgressChannel>>,
}

struct ProgressChannel {
    node_data_id: String,
    work_started_at: DateTime<Utc>,
    store: NodeDataService,
}

impl ProgressReporter {
    pub fn disabled() -> Self {
        Self { channel: None }
    }

    pub fn for_node_data(
        store: NodeDataService,
        node_data_id: impl Into<String>,
        work_started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel: Some(Arc::new(ProgressChannel {
                node_data_id: node_data_id.into(),
                work_started_at,
                store,
            })),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    /// Write the current step. Failures are logged and dropped.
    pub async fn report(&self, step_type: &str, data: Option<Value>) {
        let Some(channel) = &self.channel else {
            return;
        };

        let progress = AutomationProgress {
            current_step_type: step_type.to_string(),
            current_step_data: data.unwrap_or_else(|| Value::Object(Map::new())),
            current_step_started_at: Utc::now(),
            work_started_at: channel.work_started_at,
        };

        match channel.store.set_progress(&channel.node_data_id, progress).await {
            Ok(()) => debug!("Node data {} entered step {}", channel.node_data_id, step_type),
            Err(err) => warn!(
                "Failed to report step {} for node data {}: {}",
                step_type, channel.node_data_id, err
            ),
        }
    }
}
