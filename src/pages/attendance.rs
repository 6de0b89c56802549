use actix_web::{get, post, web, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AdminPin, Authority, Operation},
    domain::attendance::{self, SessionView},
    error::Result,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(clock_in)
        .service(clock_out)
        .service(recent_sessions)
        .service(worker_sessions);
}

#[derive(Debug, Serialize, Deserialize)]
struct Clock {
    worker_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Clocked {
    message: String,
    session: SessionView,
}

#[post("/clock-in")]
async fn clock_in(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    payload: web::Json<Clock>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ClockIn, &pin)?;

    let session = attendance::clock_in(&db, &payload.worker_code, Local::now().fixed_offset()).await?;

    Ok(web::Json(Clocked {
        message: format!("{} clocked in successfully", session.worker_name.as_deref().unwrap_or_default()),
        session,
    }))
}

#[post("/clock-out")]
async fn clock_out(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    payload: web::Json<Clock>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ClockOut, &pin)?;

    let session = attendance::clock_out(&db, &payload.worker_code, Local::now().fixed_offset()).await?;

    Ok(web::Json(Clocked {
        message: format!("{} clocked out successfully", session.worker_name.as_deref().unwrap_or_default()),
        session,
    }))
}

#[get("/sessions")]
async fn recent_sessions(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
) -> Result<impl Responder> {
    authority.authorize(Operation::ViewSessions, &pin)?;

    Ok(web::Json(attendance::recent_sessions(&db).await?))
}

#[get("/sessions/{worker_id}")]
async fn worker_sessions(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    worker_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ViewSessions, &pin)?;

    Ok(web::Json(attendance::worker_sessions(&db, *worker_id).await?))
}
