use std::fs::OpenOptions;

use actix_web::{web, App, HttpServer};
use migration::{Migrator, MigratorTrait as _};
use sea_orm::Database;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::auth::Authority;

mod config;
mod consts;
mod error;
mod utils;

mod entity;
mod domain;
mod auth;
mod pages;

#[cfg(test)]
mod test_utils;

#[actix_web::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("trace.log")
        .expect("Unable to open `trace.log`");

    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );

    tracing::subscriber::set_global_default(subscriber).expect("Unable to install the tracing subscriber");

    let config::Config {
        host_address,
        database_opt,
        admin_pin,
        policies,
    } = config::load();

    let connection = Database::connect(database_opt).await.expect("Unable to connect to database");
    Migrator::up(&connection, None).await.expect("Unable to migrate the database");

    info!(payroll = ?policies.payroll, advance_cap = ?policies.advance_cap, "policies loaded");

    let database = web::Data::new(connection);
    let authority = web::Data::new(Authority::new(admin_pin));
    let policies = web::Data::new(policies);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(database.clone())
            .app_data(authority.clone())
            .app_data(policies.clone())
            .wrap(TracingLogger::default())
            .service(web::scope("/api")
                .configure(pages::config))
    });

    info!(%host_address, "listening");

    server
        .bind(host_address).expect("Unable to bind `HOST_ADDRESS`")
        .run().await.expect("Server stopped unexpectedly");
}
