use chrono::Utc;
use tokio::sync::broadcast;
use tracing::info;

use super::{AppContext, MutationOutcome};
use crate::document::{Canvas, CanvasPatch, CanvasSummary, EdgeDiff, GraphIndex, GraphSnapshot};
use crate::errors::CoreResult;
use crate::services::{DependencyReport, RequestContext, StoreEvent};

impl AppContext {
    // ----- Canvas document --------------------------------------------------
    pub async fn list_user_canvases(&self, ctx: &RequestContext) -> CoreResult<Vec<CanvasSummary>> {
        let caller = self.caller(ctx)?;
        self.canvas_service.list(&caller).await
    }

    pub async fn get_canvas(&self, ctx: &RequestContext, canvas_id: &str) -> CoreResult<Canvas> {
        let caller = self.caller(ctx)?;
        self.canvas_service.get(&caller, canvas_id).await
    }

    pub async fn create_canvas(&self, ctx: &RequestContext, name: &str) -> CoreResult<String> {
        let caller = self.caller(ctx)?;
        let canvas = self.canvas_service.create(&caller, name).await?;
        Ok(canvas.id)
    }

    pub async fn delete_canvas(&self, ctx: &RequestContext, canvas_id: &str) -> CoreResult<String> {
        let caller = self.caller(ctx)?;
        self.canvas_service.delete(&caller, canvas_id).await
    }

    /// Whole-field replacement. Graph arrays written this way bypass
    /// dependency maintenance; use `save_canvas_graph` for graph saves.
    pub async fn patch_canvas(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        patch: CanvasPatch,
        expected_version: Option<i64>,
    ) -> CoreResult<Canvas> {
        let caller = self.caller(ctx)?;
        self.canvas_service
            .patch(&caller, canvas_id, patch, expected_version)
            .await
    }

    /// Replace the whole graph and derive dependency changes from the edge diff.
    pub async fn save_canvas_graph(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        graph: GraphSnapshot,
        expected_version: Option<i64>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        let (saved, previous) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, expected_version, |index| {
                let previous = index.to_snapshot();
                *index = GraphIndex::from_snapshot(graph.clone());
                Ok(previous)
            })
            .await?;

        let diff = EdgeDiff::between(&previous.edges, &saved.edges);
        let mut dependencies = DependencyReport::default();
        if !diff.is_empty() {
            let mut known_nodes = previous.nodes.clone();
            known_nodes.extend(saved.nodes.iter().cloned());

            let unlinked = self
                .dependency_service
                .unlink_edges(&known_nodes, &diff.removed, &saved.edges)
                .await?;
            let linked = self
                .dependency_service
                .link_edges(&saved.nodes, &diff.added)
                .await?;
            dependencies = merge_reports(unlinked, linked);
        }

        self.sync_node_membership(&previous, &saved.snapshot()).await?;

        info!(
            "Saved canvas {} at version {} (+{} / -{} edges)",
            saved.id,
            saved.version,
            diff.added.len(),
            diff.removed.len()
        );
        Ok(MutationOutcome::new(&saved, dependencies))
    }

    /// Change notifications for one canvas, after the creator check.
    pub async fn subscribe_canvas(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
    ) -> CoreResult<broadcast::Receiver<StoreEvent>> {
        let caller = self.caller(ctx)?;
        self.canvas_service.get(&caller, canvas_id).await?;
        Ok(self.events.subscribe_canvas(canvas_id))
    }

    /// Soft-mark node data whose nodes left the canvas and clear the mark on
    /// node data that came back.
    pub(super) async fn sync_node_membership(
        &self,
        before: &GraphSnapshot,
        after: &GraphSnapshot,
    ) -> CoreResult<()> {
        let linked = |snapshot: &GraphSnapshot| -> Vec<String> {
            snapshot
                .nodes
                .iter()
                .filter_map(|n| n.node_data_id.clone())
                .collect()
        };
        let old_ids = linked(before);
        let new_ids = linked(after);

        let departed: Vec<String> = old_ids
            .iter()
            .filter(|id| !new_ids.contains(*id))
            .cloned()
            .collect();
        let arrived: Vec<String> = new_ids
            .iter()
            .filter(|id| !old_ids.contains(*id))
            .cloned()
            .collect();

        if !departed.is_empty() {
            self.node_data_service
                .mark_removed(&departed, Some(Utc::now()))
                .await?;
        }
        if !arrived.is_empty() {
            self.node_data_service.mark_removed(&arrived, None).await?;
        }
        Ok(())
    }
}

pub(super) fn merge_reports(mut first: DependencyReport, second: DependencyReport) -> DependencyReport {
    first.linked += second.linked;
    first.unlinked += second.unlinked;
    first.skipped_edges.extend(second.skipped_edges);
    first
}
