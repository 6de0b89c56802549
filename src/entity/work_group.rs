use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A team of workers. The team leader is recorded here only, a worker's
/// leadership is looked up from this table instead of being stored twice.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "work_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    pub team_leader_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::TeamLeaderId",
        to = "super::worker::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    TeamLeader,
}

impl ActiveModelBehavior for ActiveModel {}
