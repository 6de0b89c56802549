use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AdminPin, Authority, Operation},
    domain::lending,
    entity::loan,
    error::Result,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_loans)
        .service(give_loan)
        .service(worker_loans)
        .service(loan_payments)
        .service(record_payment);
}

#[derive(Debug, Serialize, Deserialize)]
struct GiveLoan {
    worker_id: Uuid,
    amount: f64,
    reason: Option<String>,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LoanGiven {
    message: String,
    loan: loan::Model,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordPayment {
    payment_amount: f64,
    notes: Option<String>,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[get("")]
async fn list_loans(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
) -> Result<impl Responder> {
    authority.authorize(Operation::ListLoans, &pin)?;

    Ok(web::Json(lending::list_loans(&db).await?))
}

#[post("")]
async fn give_loan(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    payload: web::Json<GiveLoan>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::GiveLoan, &pin.or(payload.admin_pin))?;

    let loan = lending::give_loan(&db, payload.worker_id, payload.amount, payload.reason, Local::now().fixed_offset()).await?;

    Ok(HttpResponse::Created().json(LoanGiven {
        message: format!("Loan of {} recorded", loan.total_amount),
        loan,
    }))
}

#[get("/{worker_id}/worker")]
async fn worker_loans(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    worker_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ListLoans, &pin)?;

    Ok(web::Json(lending::worker_loans(&db, *worker_id).await?))
}

#[get("/{loan_id}/payments")]
async fn loan_payments(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    loan_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ListLoans, &pin)?;

    Ok(web::Json(lending::loan_statement(&db, *loan_id).await?))
}

#[post("/{loan_id}/payment")]
async fn record_payment(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    loan_id: web::Path<Uuid>,
    payload: web::Json<RecordPayment>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::RecordLoanPayment, &pin.or(payload.admin_pin))?;

    let receipt = lending::record_loan_payment(
        &db,
        *loan_id,
        payload.payment_amount,
        payload.notes,
        Local::now().fixed_offset(),
    ).await?;

    Ok(HttpResponse::Created().json(receipt))
}
