//! Advances (massarif) and loans (douyoun).

use std::{collections::HashMap, str::FromStr};

use sea_orm::{
    prelude::DateTimeWithTimeZone, ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    consts::BALANCE_EPSILON,
    domain::{ledger, roster, UnknownPolicy},
    entity::{advance, loan, loan_payment, prelude::*, worker},
    error::{Error, Result},
};

/// Upper bound on what a worker may owe in advances at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceCap {
    /// Unpaid advances plus the new one may not exceed the monthly salary
    #[default]
    Salary,
    Uncapped,
}

impl FromStr for AdvanceCap {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "salary" => Ok(Self::Salary),
            "none" | "uncapped" => Ok(Self::Uncapped),
            _ => Err(UnknownPolicy { kind: "advance cap", value: s.to_owned() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceView {
    #[serde(flatten)]
    pub advance: advance::Model,
    pub worker_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: loan::Model,
    pub worker_name: Option<String>,
    pub payments_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStatement {
    pub loan: LoanView,
    pub payments: Vec<loan_payment::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: loan_payment::Model,
    pub updated_loan: LoanView,
}

fn positive_amount(amount: f64, what: &str) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Validation(format!("invalid {what} amount")));
    }

    Ok(amount)
}

/// Advances and loans may only go to workers still on the payroll
async fn payable_worker<C: ConnectionTrait>(db: &C, worker_id: Uuid) -> Result<worker::Model> {
    let worker = roster::find_worker(db, worker_id).await?;
    if !worker.is_active {
        return Err(Error::Validation("worker is not active".to_owned()));
    }

    Ok(worker)
}

pub async fn give_advance(
    db: &DatabaseConnection,
    worker_id: Uuid,
    amount: f64,
    reason: Option<String>,
    cap: AdvanceCap,
    now: DateTimeWithTimeZone,
) -> Result<AdvanceView> {
    let amount = positive_amount(amount, "advance")?;

    let txn = db.begin().await?;

    let worker = payable_worker(&txn, worker_id).await?;

    if cap == AdvanceCap::Salary {
        let unpaid = ledger::unpaid_advances(&txn, worker_id).await?;

        if unpaid.total + amount > worker.salary {
            return Err(Error::Validation(format!(
                "total unpaid advances ({}) would exceed worker salary ({}), currently unpaid: {}",
                unpaid.total + amount, worker.salary, unpaid.total,
            )));
        }
    }

    let advance = advance::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        worker_id: Set(worker_id),
        amount: Set(amount),
        reason: Set(reason),
        date_given: Set(now.date_naive()),
        is_paid_back: Set(false),
    }.insert(&txn).await?;

    txn.commit().await?;

    info!(worker = %worker.code, amount, "advance given");

    Ok(AdvanceView { advance, worker_name: Some(worker.name) })
}

/// Settles one advance outside of a salary payment; a second call changes nothing
pub async fn mark_advance_paid(db: &DatabaseConnection, advance_id: Uuid, now: DateTimeWithTimeZone) -> Result<AdvanceView> {
    let (advance, worker) = Advance::find_by_id(advance_id)
        .find_also_related(Worker)
        .one(db).await?
        .ok_or_else(|| Error::NotFound("advance not found".to_owned()))?;

    let advance = if advance.is_paid_back {
        advance
    } else {
        let mut model: advance::ActiveModel = advance.into();
        model.is_paid_back = Set(true);
        model.updated_at = Set(now);
        model.update(db).await?
    };

    Ok(AdvanceView { advance, worker_name: worker.map(|w| w.name) })
}

pub async fn list_advances(db: &DatabaseConnection) -> Result<Vec<AdvanceView>> {
    let advances = Advance::find()
        .find_also_related(Worker)
        .order_by_desc(advance::Column::DateGiven)
        .order_by_desc(advance::Column::CreatedAt)
        .all(db).await?;

    Ok(advances.into_iter()
        .map(|(advance, worker)| AdvanceView { advance, worker_name: worker.map(|w| w.name) })
        .collect())
}

async fn loan_views<C: ConnectionTrait>(db: &C, loans: Vec<(loan::Model, Option<worker::Model>)>) -> Result<Vec<LoanView>> {
    let ids: Vec<Uuid> = loans.iter().map(|(loan, _)| loan.id).collect();

    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for payment in LoanPayment::find().filter(loan_payment::Column::LoanId.is_in(ids)).all(db).await? {
        *counts.entry(payment.loan_id).or_default() += 1;
    }

    Ok(loans.into_iter().map(|(loan, worker)| LoanView {
        payments_count: counts.get(&loan.id).copied().unwrap_or_default(),
        worker_name: worker.map(|w| w.name),
        loan,
    }).collect())
}

async fn loan_view<C: ConnectionTrait>(db: &C, loan_id: Uuid) -> Result<LoanView> {
    let loan = Loan::find_by_id(loan_id)
        .find_also_related(Worker)
        .one(db).await?
        .ok_or_else(|| Error::NotFound("loan not found".to_owned()))?;

    let mut views = loan_views(db, vec![loan]).await?;

    views.pop().ok_or_else(|| Error::NotFound("loan not found".to_owned()))
}

pub async fn give_loan(
    db: &DatabaseConnection,
    worker_id: Uuid,
    amount: f64,
    reason: Option<String>,
    now: DateTimeWithTimeZone,
) -> Result<loan::Model> {
    let amount = positive_amount(amount, "loan")?;

    let worker = payable_worker(db, worker_id).await?;

    let loan = loan::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        worker_id: Set(worker_id),
        total_amount: Set(amount),
        amount_paid_back: Set(0.0),
        remaining_balance: Set(amount),
        reason: Set(reason),
        date_given: Set(now.date_naive()),
        is_fully_paid: Set(false),
    }.insert(db).await?;

    info!(worker = %worker.code, amount, "loan given");

    Ok(loan)
}

/// Appends an installment and moves the balance; both land together or not at all
pub async fn record_loan_payment(
    db: &DatabaseConnection,
    loan_id: Uuid,
    amount: f64,
    notes: Option<String>,
    now: DateTimeWithTimeZone,
) -> Result<PaymentReceipt> {
    let txn = db.begin().await?;

    let loan = Loan::find_by_id(loan_id)
        .one(&txn).await?
        .ok_or_else(|| Error::NotFound("loan not found".to_owned()))?;

    if loan.is_fully_paid {
        return Err(Error::Validation("loan is already fully paid".to_owned()));
    }

    let amount = positive_amount(amount, "payment")?;
    if amount - loan.remaining_balance > BALANCE_EPSILON {
        return Err(Error::Validation("payment amount exceeds remaining balance".to_owned()));
    }

    let payment = loan_payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        loan_id: Set(loan_id),
        payment_amount: Set(amount),
        payment_date: Set(now.date_naive()),
        notes: Set(notes),
    }.insert(&txn).await?;

    let mut amount_paid_back = loan.amount_paid_back + amount;
    let mut remaining_balance = loan.remaining_balance - amount;
    let is_fully_paid = remaining_balance <= BALANCE_EPSILON;
    if is_fully_paid {
        remaining_balance = 0.0;
        amount_paid_back = loan.total_amount;
    }

    let mut model: loan::ActiveModel = loan.into();
    model.amount_paid_back = Set(amount_paid_back);
    model.remaining_balance = Set(remaining_balance);
    model.is_fully_paid = Set(is_fully_paid);
    model.updated_at = Set(now);
    model.update(&txn).await?;

    let updated_loan = loan_view(&txn, loan_id).await?;
    txn.commit().await?;

    info!(loan = %loan_id, amount, remaining_balance, "loan payment recorded");

    Ok(PaymentReceipt { payment, updated_loan })
}

pub async fn list_loans(db: &DatabaseConnection) -> Result<Vec<LoanView>> {
    let loans = Loan::find()
        .find_also_related(Worker)
        .order_by_desc(loan::Column::DateGiven)
        .order_by_desc(loan::Column::CreatedAt)
        .all(db).await?;

    loan_views(db, loans).await
}

pub async fn worker_loans(db: &DatabaseConnection, worker_id: Uuid) -> Result<Vec<LoanView>> {
    let loans = Loan::find()
        .find_also_related(Worker)
        .filter(loan::Column::WorkerId.eq(worker_id))
        .order_by_desc(loan::Column::DateGiven)
        .order_by_desc(loan::Column::CreatedAt)
        .all(db).await?;

    loan_views(db, loans).await
}

pub async fn loan_statement(db: &DatabaseConnection, loan_id: Uuid) -> Result<LoanStatement> {
    let loan = loan_view(db, loan_id).await?;

    let payments = LoanPayment::find()
        .filter(loan_payment::Column::LoanId.eq(loan_id))
        .order_by_desc(loan_payment::Column::PaymentDate)
        .order_by_desc(loan_payment::Column::CreatedAt)
        .all(db).await?;

    Ok(LoanStatement { loan, payments })
}
