use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Automation status of a node data record
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeDataStatus {
    #[default]
    Idle,
    Working,
    Error,
}

impl NodeDataStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeDataStatus::Idle => "idle",
            NodeDataStatus::Working => "working",
            NodeDataStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(NodeDataStatus::Idle),
            "working" => Some(NodeDataStatus::Working),
            "error" => Some(NodeDataStatus::Error),
            _ => None,
        }
    }

    /// Any state may re-enter `working`; only `working` may settle.
    pub fn can_transition_to(&self, next: NodeDataStatus) -> bool {
        matches!(
            (self, next),
            (_, NodeDataStatus::Working)
                | (NodeDataStatus::Working, NodeDataStatus::Idle)
                | (NodeDataStatus::Working, NodeDataStatus::Error)
        )
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutomationMode {
    Agent,
    DataProcessing,
    #[default]
    Off,
}

impl AutomationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationMode::Agent => "agent",
            AutomationMode::DataProcessing => "dataProcessing",
            AutomationMode::Off => "off",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "agent" => Some(AutomationMode::Agent),
            "dataProcessing" => Some(AutomationMode::DataProcessing),
            "off" => Some(AutomationMode::Off),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub model: String,
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touchable_fields: Option<Vec<String>>,
}

impl AgentConfig {
    pub fn may_touch(&self, field: &str) -> bool {
        match &self.touchable_fields {
            Some(fields) => fields.iter().any(|f| f == field),
            None => true,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Input,
    Output,
}

/// One denormalized dependency link stored on a node data record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub node_data_id: String,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_trigger_update: Option<bool>,
}

impl Dependency {
    pub fn input(node_data_id: impl Into<String>) -> Self {
        Self::new(node_data_id, DependencyKind::Input)
    }

    pub fn output(node_data_id: impl Into<String>) -> Self {
        Self::new(node_data_id, DependencyKind::Output)
    }

    fn new(node_data_id: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            node_data_id: node_data_id.into(),
            kind,
            field: None,
            degree: None,
            should_trigger_update: None,
        }
    }

    pub fn with_field(mut self, field: Option<String>) -> Self {
        self.field = field;
        self
    }

    pub fn matches(&self, node_data_id: &str, kind: DependencyKind) -> bool {
        self.kind == kind && self.node_data_id == node_data_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationProgress {
    pub current_step_type: String,
    pub current_step_data: Value,
    pub current_step_started_at: DateTime<Utc>,
    pub work_started_at: DateTime<Utc>,
}

/// Automatable payload linked to a canvas node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub values: Map<String, Value>,
    pub status: NodeDataStatus,
    pub automation_mode: AutomationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentConfig>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_progress: Option<AutomationProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_run_id: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_from_canvas_at: Option<DateTime<Utc>>,
}

impl NodeData {
    /// Append a dependency unless one with the same `(node_data_id, kind)`
    /// pair already exists. `field` does not take part in deduplication.
    pub fn add_dependency(&mut self, dependency: Dependency) -> bool {
        if self
            .dependencies
            .iter()
            .any(|d| d.matches(&dependency.node_data_id, dependency.kind))
        {
            return false;
        }
        self.dependencies.push(dependency);
        true
    }

    /// Drop every entry matching `(node_data_id, kind)`; returns how many were removed.
    pub fn remove_dependency(&mut self, node_data_id: &str, kind: DependencyKind) -> usize {
        let before = self.dependencies.len();
        self.dependencies.retain(|d| !d.matches(node_data_id, kind));
        before - self.dependencies.len()
    }

    pub fn dependencies_of(&self, kind: DependencyKind) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(move |d| d.kind == kind)
    }

    pub fn is_on_canvas(&self) -> bool {
        self.removed_from_canvas_at.is_none()
    }
}

/// Input for `create_node_data`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNodeData {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub values: Map<String, Value>,
    #[serde(default)]
    pub automation_mode: AutomationMode,
    #[serde(default)]
    pub agent: Option<AgentConfig>,
}
