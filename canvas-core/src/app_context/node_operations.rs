use tracing::debug;

use super::{AppContext, MutationOutcome};
use crate::document::{CanvasNode, GraphSnapshot, NodeDisplayPatch, NodeGeometryPatch};
use crate::errors::{CoreError, CoreResult};
use crate::services::{DependencyReport, RequestContext};

impl AppContext {
    // ----- Nodes -------------------------------------------------------------
    /// Insert nodes (replacing same-id nodes). Linked node data loses any
    /// removed-from-canvas mark.
    pub async fn add_nodes(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        nodes: Vec<CanvasNode>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        if nodes.iter().any(|n| n.id.trim().is_empty()) {
            return Err(CoreError::validation("Node id must not be empty"));
        }

        let (canvas, _) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, None, |index| {
                index.upsert_nodes(nodes.iter().cloned());
                Ok(())
            })
            .await?;

        let relinked: Vec<String> = nodes.iter().filter_map(|n| n.node_data_id.clone()).collect();
        if !relinked.is_empty() {
            self.node_data_service.mark_removed(&relinked, None).await?;
        }

        debug!("Added {} nodes to canvas {}", nodes.len(), canvas_id);
        Ok(MutationOutcome::new(&canvas, DependencyReport::default()))
    }

    pub async fn update_node_position_or_dimensions(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        patches: Vec<NodeGeometryPatch>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        let (canvas, _) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, None, |index| {
                for patch in &patches {
                    index.patch_node(&patch.id, |node| patch.apply(node));
                }
                Ok(())
            })
            .await?;
        Ok(MutationOutcome::new(&canvas, DependencyReport::default()))
    }

    pub async fn update_node_display_props(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        patches: Vec<NodeDisplayPatch>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        let (canvas, _) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, None, |index| {
                for patch in &patches {
                    index.patch_node(&patch.id, |node| patch.apply(node));
                }
                Ok(())
            })
            .await?;
        Ok(MutationOutcome::new(&canvas, DependencyReport::default()))
    }

    /// Remove nodes, their attached edges and the dependencies those edges
    /// carried. Linked node data is soft-marked, never deleted.
    pub async fn remove_nodes(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        node_ids: Vec<String>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        let (canvas, (removed_nodes, removed_edges)) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, None, |index| Ok(index.remove_nodes(&node_ids)))
            .await?;

        let mut known_nodes = canvas.nodes.clone();
        known_nodes.extend(removed_nodes.iter().cloned());
        let report = self
            .dependency_service
            .unlink_edges(&known_nodes, &removed_edges, &canvas.edges)
            .await?;

        let before = GraphSnapshot::new(known_nodes, Vec::new());
        self.sync_node_membership(&before, &canvas.snapshot()).await?;

        debug!(
            "Removed {} nodes and {} attached edges from canvas {}",
            removed_nodes.len(),
            removed_edges.len(),
            canvas_id
        );
        Ok(MutationOutcome::new(&canvas, report))
    }
}
