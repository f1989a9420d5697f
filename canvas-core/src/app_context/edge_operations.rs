use tracing::debug;

use super::canvas_operations::merge_reports;
use super::{AppContext, MutationOutcome};
use crate::document::{CanvasEdge, EdgeDataUpdate};
use crate::errors::{CoreError, CoreResult};
use crate::services::{DependencyReport, RequestContext};

impl AppContext {
    // ----- Edges -------------------------------------------------------------
    /// Insert edges (replacing same-id edges) and record their dependencies.
    pub async fn add_edges(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        edges: Vec<CanvasEdge>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        if edges.iter().any(|e| e.id.trim().is_empty()) {
            return Err(CoreError::validation("Edge id must not be empty"));
        }

        let (canvas, replaced) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, None, |index| {
                let rewired: Vec<CanvasEdge> = index
                    .upsert_edges(edges.iter().cloned())
                    .into_iter()
                    .filter_map(|(edge, previous)| {
                        previous.filter(|previous| !previous.same_endpoints(&edge))
                    })
                    .collect();
                Ok(rewired)
            })
            .await?;

        let mut report = DependencyReport::default();
        if !replaced.is_empty() {
            report = self
                .dependency_service
                .unlink_edges(&canvas.nodes, &replaced, &canvas.edges)
                .await?;
        }
        let linked = self
            .dependency_service
            .link_edges(&canvas.nodes, &edges)
            .await?;

        debug!("Added {} edges to canvas {}", edges.len(), canvas_id);
        Ok(MutationOutcome::new(&canvas, merge_reports(report, linked)))
    }

    /// Data-only edge updates; unknown edge ids are ignored.
    pub async fn update_edge_data(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        updates: Vec<EdgeDataUpdate>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        let (canvas, missing) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, None, |index| {
                let mut missing = 0;
                for update in &updates {
                    if !index.patch_edge(&update.edge_id, |edge| edge.data = update.data.clone()) {
                        missing += 1;
                    }
                }
                Ok(missing)
            })
            .await?;

        if missing > 0 {
            debug!("{} edge data updates referenced unknown edges on canvas {}", missing, canvas_id);
        }
        Ok(MutationOutcome::new(&canvas, DependencyReport::default()))
    }

    /// Remove edges by id and drop the dependencies they carried.
    pub async fn remove_edges(
        &self,
        ctx: &RequestContext,
        canvas_id: &str,
        edge_ids: Vec<String>,
    ) -> CoreResult<MutationOutcome> {
        let caller = self.caller(ctx)?;
        let (canvas, removed) = self
            .canvas_service
            .edit_graph(&caller, canvas_id, None, |index| Ok(index.remove_edges(&edge_ids)))
            .await?;

        let report = self
            .dependency_service
            .unlink_edges(&canvas.nodes, &removed, &canvas.edges)
            .await?;

        debug!("Removed {} edges from canvas {}", removed.len(), canvas_id);
        Ok(MutationOutcome::new(&canvas, report))
    }
}
