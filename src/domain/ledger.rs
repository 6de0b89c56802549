//! Read-side aggregation over attendance, advances and loans.

use chrono::{Months, NaiveDate};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Select};
use uuid::Uuid;

use crate::{entity::{advance, loan, prelude::*, work_session}, error::Result, utils};

async fn sum_of<C, E>(db: &C, select: Select<E>, column: E::Column) -> Result<f64>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let total: Option<Option<f64>> = select
        .select_only()
        .column_as(column.sum(), "total")
        .into_tuple()
        .one(db).await?;

    Ok(total.flatten().unwrap_or_default())
}

/// Hours of closed sessions dated within `start..=end`
pub async fn hours_in_range<C: ConnectionTrait>(db: &C, worker_id: Uuid, start: NaiveDate, end: NaiveDate) -> Result<f64> {
    let select = WorkSession::find()
        .filter(work_session::Column::WorkerId.eq(worker_id))
        .filter(work_session::Column::Date.between(start, end))
        .filter(work_session::Column::HoursWorked.is_not_null());

    sum_of(db, select, work_session::Column::HoursWorked).await
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Outstanding {
    pub total: f64,
    pub count: u64,
}

/// Advances not yet settled by a salary payment, whenever they were given
pub async fn unpaid_advances<C: ConnectionTrait>(db: &C, worker_id: Uuid) -> Result<Outstanding> {
    let select = Advance::find()
        .filter(advance::Column::WorkerId.eq(worker_id))
        .filter(advance::Column::IsPaidBack.eq(false));

    Ok(Outstanding {
        count: select.clone().count(db).await?,
        total: sum_of(db, select, advance::Column::Amount).await?,
    })
}

/// Every advance given during the calendar month of `day`
pub async fn advances_in_month<C: ConnectionTrait>(db: &C, day: NaiveDate) -> Result<Vec<advance::Model>> {
    let advances = Advance::find()
        .filter(advance::Column::DateGiven.between(utils::first_of_month(day), utils::last_of_month(day)))
        .all(db).await?;

    Ok(advances)
}

/// Total lent during the calendar month of `day`
pub async fn loans_in_month<C: ConnectionTrait>(db: &C, day: NaiveDate) -> Result<f64> {
    let select = Loan::find()
        .filter(loan::Column::DateGiven.between(utils::first_of_month(day), utils::last_of_month(day)));

    sum_of(db, select, loan::Column::TotalAmount).await
}

pub async fn total_loans_given<C: ConnectionTrait>(db: &C) -> Result<f64> {
    sum_of(db, Loan::find(), loan::Column::TotalAmount).await
}

/// Advances given in the month leading up to the salary payment that set `next_payment`
///
/// Covers `next_payment - 1 month` inclusive up to `next_payment` exclusive, paid back or not.
pub async fn advances_since_last_payment<C: ConnectionTrait>(db: &C, worker_id: Uuid, next_payment: NaiveDate) -> Result<f64> {
    let select = Advance::find()
        .filter(advance::Column::WorkerId.eq(worker_id))
        .filter(advance::Column::DateGiven.gte(next_payment - Months::new(1)))
        .filter(advance::Column::DateGiven.lt(next_payment));

    sum_of(db, select, advance::Column::Amount).await
}
