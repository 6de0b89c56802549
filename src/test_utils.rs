use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait as _};
use sea_orm::{
    prelude::DateTimeWithTimeZone, ActiveModelTrait as _, ActiveValue::Set, ConnectOptions, Database,
    DatabaseConnection,
};
use uuid::Uuid;

use crate::{
    domain::roster::{self, NewWorker},
    entity::{advance, loan, work_session, worker},
    error::Result,
};

/// Fresh in-memory database with the real schema
///
/// A single connection keeps every query on the same in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `day` at `h:m` UTC
pub fn at(day: NaiveDate, h: u32, m: u32) -> DateTimeWithTimeZone {
    day.and_hms_opt(h, m, 0).unwrap().and_utc().fixed_offset()
}

pub fn new_worker(code: &str, salary: f64, hire_date: NaiveDate) -> NewWorker {
    NewWorker {
        code: code.to_owned(),
        name: format!("Worker {code}"),
        phone: None,
        position: "Operator".to_owned(),
        salary,
        hire_date,
        birthday: None,
        group_id: None,
    }
}

/// Worker registered on its hire date
pub async fn create_test_worker(db: &DatabaseConnection, code: &str, salary: f64, hire_date: NaiveDate) -> Result<worker::Model> {
    let view = roster::create_worker(db, new_worker(code, salary, hire_date), at(hire_date, 8, 0)).await?;

    Ok(view.worker)
}

pub async fn insert_advance(db: &DatabaseConnection, worker_id: Uuid, amount: f64, date_given: NaiveDate, is_paid_back: bool) -> advance::Model {
    let now = at(date_given, 12, 0);

    advance::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        worker_id: Set(worker_id),
        amount: Set(amount),
        reason: Set(None),
        date_given: Set(date_given),
        is_paid_back: Set(is_paid_back),
    }.insert(db).await.unwrap()
}

pub async fn insert_loan(db: &DatabaseConnection, worker_id: Uuid, amount: f64, date_given: NaiveDate) -> loan::Model {
    let now = at(date_given, 12, 0);

    loan::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        worker_id: Set(worker_id),
        total_amount: Set(amount),
        amount_paid_back: Set(0.0),
        remaining_balance: Set(amount),
        reason: Set(None),
        date_given: Set(date_given),
        is_fully_paid: Set(false),
    }.insert(db).await.unwrap()
}

/// Session clocked in at 08:00, closed after `hours` when given
pub async fn insert_session(db: &DatabaseConnection, worker_id: Uuid, day: NaiveDate, hours: Option<f64>) -> work_session::Model {
    let clock_in = at(day, 8, 0);
    let clock_out = hours.map(|h| clock_in + chrono::Duration::minutes((h * 60.0).round() as i64));

    work_session::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(clock_in),
        updated_at: Set(clock_out.unwrap_or(clock_in)),
        worker_id: Set(worker_id),
        date: Set(day),
        clock_in: Set(clock_in),
        clock_out: Set(clock_out),
        hours_worked: Set(hours),
    }.insert(db).await.unwrap()
}
