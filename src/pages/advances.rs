use actix_web::{get, post, put, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AdminPin, Authority, Operation},
    domain::{lending::{self, AdvanceView}, Policies},
    error::Result,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_advances)
        .service(give_advance)
        .service(mark_paid);
}

#[derive(Debug, Serialize, Deserialize)]
struct GiveAdvance {
    worker_id: Uuid,
    amount: f64,
    reason: Option<String>,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AdvanceGiven {
    message: String,
    advance: AdvanceView,
}

#[get("")]
async fn list_advances(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
) -> Result<impl Responder> {
    authority.authorize(Operation::ListAdvances, &pin)?;

    Ok(web::Json(lending::list_advances(&db).await?))
}

#[post("")]
async fn give_advance(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    policies: web::Data<Policies>,
    pin: AdminPin,
    payload: web::Json<GiveAdvance>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::GiveAdvance, &pin.or(payload.admin_pin))?;

    let advance = lending::give_advance(
        &db,
        payload.worker_id,
        payload.amount,
        payload.reason,
        policies.advance_cap,
        Local::now().fixed_offset(),
    ).await?;

    Ok(HttpResponse::Created().json(AdvanceGiven {
        message: format!(
            "Advance of {} given to {}",
            advance.advance.amount,
            advance.worker_name.as_deref().unwrap_or_default(),
        ),
        advance,
    }))
}

#[put("/{advance_id}/payback")]
async fn mark_paid(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    advance_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::MarkAdvancePaid, &pin)?;

    let advance = lending::mark_advance_paid(&db, *advance_id, Local::now().fixed_offset()).await?;

    Ok(web::Json(advance))
}
