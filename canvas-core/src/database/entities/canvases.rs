use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::document::Canvas;
use crate::errors::CoreError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "canvases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub creator_id: String,
    pub name: String,
    pub nodes_json: String,
    pub edges_json: String,
    pub version: i64,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Canvas {
    type Error = CoreError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Canvas {
            nodes: serde_json::from_str(&model.nodes_json)?,
            edges: serde_json::from_str(&model.edges_json)?,
            id: model.id,
            creator_id: model.creator_id,
            name: model.name,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
