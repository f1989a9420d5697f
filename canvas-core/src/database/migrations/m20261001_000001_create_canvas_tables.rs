use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Canvas aggregate: nodes and edges are stored as JSON arrays
        manager
            .create_table(
                Table::create()
                    .table(Canvases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Canvases::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Canvases::CreatorId).string().not_null())
                    .col(ColumnDef::new(Canvases::Name).string().not_null())
                    .col(ColumnDef::new(Canvases::NodesJson).text().not_null())
                    .col(ColumnDef::new(Canvases::EdgesJson).text().not_null())
                    .col(
                        ColumnDef::new(Canvases::Version)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Canvases::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Canvases::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_canvases_creator_id")
                    .table(Canvases::Table)
                    .col(Canvases::CreatorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NodeData::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NodeData::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(NodeData::NodeType).string().not_null())
                    .col(ColumnDef::new(NodeData::ValuesJson).text().not_null())
                    .col(
                        ColumnDef::new(NodeData::Status)
                            .string()
                            .not_null()
                            .default("idle"),
                    )
                    .col(
                        ColumnDef::new(NodeData::AutomationMode)
                            .string()
                            .not_null()
                            .default("off"),
                    )
                    .col(ColumnDef::new(NodeData::AgentJson).text())
                    .col(ColumnDef::new(NodeData::DependenciesJson).text().not_null())
                    .col(ColumnDef::new(NodeData::AutomationProgressJson).text())
                    .col(ColumnDef::new(NodeData::AutomationRunId).string())
                    .col(ColumnDef::new(NodeData::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(NodeData::RemovedFromCanvasAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NodeData::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Canvases::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Canvases {
    Table,
    Id,
    CreatorId,
    Name,
    NodesJson,
    EdgesJson,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum NodeData {
    Table,
    Id,
    NodeType,
    ValuesJson,
    Status,
    AutomationMode,
    AgentJson,
    DependenciesJson,
    AutomationProgressJson,
    AutomationRunId,
    UpdatedAt,
    RemovedFromCanvasAt,
}
