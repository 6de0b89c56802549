use actix_web::{get, web, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;

use crate::{
    auth::{AdminPin, Authority, Operation},
    domain::{payroll, Policies},
    error::Result,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(summary);
}

#[get("/summary")]
async fn summary(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    policies: web::Data<Policies>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ViewPaymentSummary, &pin)?;

    let summary = payroll::summarize(db.get_ref(), *policies.get_ref(), Local::now().date_naive()).await?;

    Ok(web::Json(summary))
}
