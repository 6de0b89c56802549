use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::{AdminPin, Authority, Operation},
    domain::roster::{self, NewWorker, WorkerChanges},
    error::Result,
    pages::Message,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_workers)
        .service(create_worker)
        .service(get_worker)
        .service(update_worker)
        .service(delete_worker);
}

#[derive(Debug, Deserialize)]
struct CreateWorker {
    #[serde(flatten)]
    worker: NewWorker,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateWorker {
    #[serde(flatten)]
    changes: WorkerChanges,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[get("")]
async fn list_workers(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
) -> Result<impl Responder> {
    authority.authorize(Operation::ListWorkers, &pin)?;

    Ok(web::Json(roster::list_workers(&db).await?))
}

#[post("")]
async fn create_worker(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    payload: web::Json<CreateWorker>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::CreateWorker, &pin.or(payload.admin_pin))?;

    let worker = roster::create_worker(&db, payload.worker, Local::now().fixed_offset()).await?;

    Ok(HttpResponse::Created().json(worker))
}

#[get("/{worker_id}")]
async fn get_worker(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    worker_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ViewWorker, &pin)?;

    Ok(web::Json(roster::get_worker(&db, *worker_id).await?))
}

#[put("/{worker_id}")]
async fn update_worker(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    worker_id: web::Path<Uuid>,
    payload: web::Json<UpdateWorker>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::UpdateWorker, &pin.or(payload.admin_pin))?;

    let update = roster::update_worker(&db, *worker_id, payload.changes, Local::now().fixed_offset()).await?;

    Ok(web::Json(update))
}

#[delete("/{worker_id}")]
async fn delete_worker(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    worker_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::DeleteWorker, &pin)?;

    let code = roster::delete_worker(&db, *worker_id).await?;

    Ok(Message::new(format!("worker {code} permanently deleted")))
}
