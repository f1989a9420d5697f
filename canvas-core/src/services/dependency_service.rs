use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::document::{CanvasEdge, CanvasNode, Dependency, DependencyKind, GraphIndex};
use crate::errors::CoreResult;
use crate::services::NodeDataService;

/// Edge data key that marks a link as re-triggering downstream automation.
pub const SHOULD_TRIGGER_UPDATE_KEY: &str = "shouldTriggerUpdate";

/// Counts of dependency entries written by one maintenance pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    pub linked: usize,
    pub unlinked: usize,
    /// Edges ignored because an endpoint has no node data
    pub skipped_edges: Vec<String>,
}

/// The node data pair an edge connects, in edge direction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Link {
    source: String,
    target: String,
}

/// Keeps the denormalized `dependencies` lists on node data in step with
/// canvas edges.
///
/// For an edge `source -> target` the target records an `input` entry
/// pointing at the source and the source records an `output` entry pointing
/// at the target. Each side is an independent read-modify-write.
#[derive(Clone)]
pub struct DependencyService {
    node_data: NodeDataService,
}

impl DependencyService {
    pub fn new(node_data: NodeDataService) -> Self {
        Self { node_data }
    }

    /// Record dependency entries for newly added edges.
    ///
    /// `nodes` must be the canvas nodes the edges refer to. Entries are
    /// deduplicated on `(nodeDataId, type)`, so re-adding is a no-op.
    pub async fn link_edges(
        &self,
        nodes: &[CanvasNode],
        edges: &[CanvasEdge],
    ) -> CoreResult<DependencyReport> {
        let index = GraphIndex::new(nodes.to_vec(), Vec::new());
        let mut report = DependencyReport::default();

        for edge in edges {
            let Some(link) = resolve(&index, edge) else {
                warn!("Skipping dependency link for edge {}: endpoint without node data", edge.id);
                report.skipped_edges.push(edge.id.clone());
                continue;
            };

            let mut input = Dependency::input(&link.source).with_field(edge.target_handle.clone());
            input.should_trigger_update = should_trigger_update(edge);
            if self.add_entry(&link.target, input).await? {
                report.linked += 1;
            }

            let output = Dependency::output(&link.target).with_field(edge.source_handle.clone());
            if self.add_entry(&link.source, output).await? {
                report.linked += 1;
            }
        }

        debug!("Linked {} dependency entries", report.linked);
        Ok(report)
    }

    /// Drop dependency entries for removed edges.
    ///
    /// An entry survives when one of `remaining` still connects the same
    /// node data pair in the same direction.
    pub async fn unlink_edges(
        &self,
        nodes: &[CanvasNode],
        removed: &[CanvasEdge],
        remaining: &[CanvasEdge],
    ) -> CoreResult<DependencyReport> {
        let index = GraphIndex::new(nodes.to_vec(), Vec::new());
        let still_linked: HashSet<Link> = remaining
            .iter()
            .filter_map(|edge| resolve(&index, edge))
            .collect();
        let mut report = DependencyReport::default();

        for edge in removed {
            let Some(link) = resolve(&index, edge) else {
                warn!("Skipping dependency unlink for edge {}: endpoint without node data", edge.id);
                report.skipped_edges.push(edge.id.clone());
                continue;
            };
            if still_linked.contains(&link) {
                debug!(
                    "Keeping dependency {} -> {}: another edge still connects them",
                    link.source, link.target
                );
                continue;
            }

            report.unlinked += self
                .remove_entry(&link.target, &link.source, DependencyKind::Input)
                .await?;
            report.unlinked += self
                .remove_entry(&link.source, &link.target, DependencyKind::Output)
                .await?;
        }

        debug!("Unlinked {} dependency entries", report.unlinked);
        Ok(report)
    }

    async fn add_entry(&self, owner: &str, dependency: Dependency) -> CoreResult<bool> {
        match self
            .node_data
            .modify(owner, |data| data.add_dependency(dependency))
            .await
        {
            Ok((_, changed)) => Ok(changed),
            Err(err) if err.is_not_found() => {
                warn!("Node data {} missing, dependency entry not recorded", owner);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn remove_entry(&self, owner: &str, other: &str, kind: DependencyKind) -> CoreResult<usize> {
        let mut removed = 0;
        let result = self
            .node_data
            .modify(owner, |data| {
                removed = data.remove_dependency(other, kind);
                removed > 0
            })
            .await;
        match result {
            Ok(_) => Ok(removed),
            Err(err) if err.is_not_found() => {
                warn!("Node data {} missing, dependency entry not removed", owner);
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }
}

fn resolve(index: &GraphIndex, edge: &CanvasEdge) -> Option<Link> {
    Some(Link {
        source: index.node_data_id(&edge.source)?.to_string(),
        target: index.node_data_id(&edge.target)?.to_string(),
    })
}

fn should_trigger_update(edge: &CanvasEdge) -> Option<bool> {
    edge.data
        .as_ref()
        .and_then(|data| data.get(SHOULD_TRIGGER_UPDATE_KEY))
        .and_then(|value| value.as_bool())
}
