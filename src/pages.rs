use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// App with every route and in-memory state, for handler tests
#[cfg(test)]
macro_rules! test_app {
    ($db:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($db))
                .app_data(actix_web::web::Data::new(crate::auth::Authority::new(crate::pages::TEST_PIN)))
                .app_data(actix_web::web::Data::new(crate::domain::Policies::default()))
                .service(actix_web::web::scope("/api").configure(crate::pages::config))
        ).await
    };
}

mod advances;
mod attendance;
mod groups;
mod loans;
mod payments;
mod workers;

#[cfg(test)]
pub(crate) const TEST_PIN: &str = "1234";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .app_data(web::JsonConfig::default()
            .error_handler(|err, _| Error::Validation(err.to_string()).into()))
        .app_data(web::PathConfig::default()
            .error_handler(|_, _| Error::NotFound("not found".to_owned()).into()))
        .service(liveness)
        .configure(attendance::config)
        .service(web::scope("/groups")
            .configure(groups::config))
        .service(web::scope("/workers")
            .configure(workers::config))
        .service(web::scope("/advances")
            .configure(advances::config))
        .service(web::scope("/loans")
            .configure(loans::config))
        .service(web::scope("/payments")
            .configure(payments::config));
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Message {
    pub(crate) message: String,
}

impl Message {
    pub(crate) fn new(message: impl Into<String>) -> web::Json<Self> {
        web::Json(Self { message: message.into() })
    }
}

#[get("/test")]
async fn liveness() -> impl Responder {
    Message::new("Workforce payroll API is running")
}
