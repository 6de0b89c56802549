use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "worker")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Text", unique)]
    pub code: String,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub phone: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub position: String,
    #[sea_orm(column_type = "Double")]
    pub salary: f64,
    /// Anchors the worker's monthly pay cycle
    pub hire_date: Date,
    /// Moved forward whenever a salary payment is recorded
    pub next_payment: Option<Date>,
    pub birthday: Option<Date>,
    pub is_active: bool,
    pub group_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::work_group::Entity",
        from = "Column::GroupId",
        to = "super::work_group::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    WorkGroup,
    #[sea_orm(has_many = "super::work_session::Entity")]
    WorkSession,
    #[sea_orm(has_many = "super::advance::Entity")]
    Advance,
    #[sea_orm(has_many = "super::loan::Entity")]
    Loan,
}

impl Related<super::work_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkGroup.def()
    }
}

impl Related<super::work_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkSession.def()
    }
}

impl Related<super::advance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advance.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
