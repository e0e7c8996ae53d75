use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 标签，`tag` 全局唯一，被多个条目共享
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text", unique)]
    pub tag: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item_tags::Entity")]
    ItemTags,
}

impl Related<super::item_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemTags.def()
    }
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_tags::Relation::Item.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::item_tags::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
