//! Document row entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::infra::store::Document;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub collection: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub version: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub body: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database row to a store document
impl From<Model> for Document {
    fn from(model: Model) -> Self {
        Document {
            id: model.id,
            version: u64::try_from(model.version).unwrap_or_default(),
            body: model.body,
        }
    }
}
