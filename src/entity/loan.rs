use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Long-term loan (douyoun) repaid through installments.
///
/// `amount_paid_back + remaining_balance` always equals `total_amount`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub worker_id: Uuid,
    #[sea_orm(column_type = "Double")]
    pub total_amount: f64,
    #[sea_orm(column_type = "Double")]
    pub amount_paid_back: f64,
    #[sea_orm(column_type = "Double")]
    pub remaining_balance: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,
    pub date_given: Date,
    pub is_fully_paid: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::WorkerId",
        to = "super::worker::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Worker,
    #[sea_orm(has_many = "super::loan_payment::Entity")]
    LoanPayment,
}

impl Related<super::worker::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Worker.def()
    }
}

impl Related<super::loan_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanPayment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
