//! Daily clock-in / clock-out.
//!
//! A worker has at most one session per day. It opens on clock-in, closes on
//! clock-out and stays closed for the rest of that day.

use sea_orm::{
    prelude::DateTimeWithTimeZone, ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    consts::RECENT_SESSIONS_LIMIT,
    entity::{prelude::*, work_session, worker},
    error::{Error, Result},
    utils,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: work_session::Model,
    pub worker_name: Option<String>,
}

async fn active_worker_by_code<C: ConnectionTrait>(db: &C, code: &str) -> Result<worker::Model> {
    Worker::find()
        .filter(worker::Column::Code.eq(code.trim()))
        .filter(worker::Column::IsActive.eq(true))
        .one(db).await?
        .ok_or_else(|| Error::NotFound("worker not found".to_owned()))
}

pub async fn clock_in(db: &DatabaseConnection, code: &str, now: DateTimeWithTimeZone) -> Result<SessionView> {
    let today = now.date_naive();

    let txn = db.begin().await?;

    let worker = active_worker_by_code(&txn, code).await?;

    let existing = WorkSession::find()
        .filter(work_session::Column::WorkerId.eq(worker.id))
        .filter(work_session::Column::Date.eq(today))
        .one(&txn).await?;

    match existing {
        Some(session) if session.clock_out.is_none() => {
            return Err(Error::Conflict("worker already clocked in today".to_owned()));
        }
        Some(_) => return Err(Error::Conflict("worker already clocked out today".to_owned())),
        None => {}
    }

    // A concurrent clock-in that slipped past the check above trips the (worker_id, date) index
    let session = work_session::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        worker_id: Set(worker.id),
        date: Set(today),
        clock_in: Set(now),
        clock_out: Set(None),
        hours_worked: Set(None),
    }.insert(&txn).await?;

    txn.commit().await?;

    info!(worker = %worker.code, "clocked in");

    Ok(SessionView { session, worker_name: Some(worker.name) })
}

pub async fn clock_out(db: &DatabaseConnection, code: &str, now: DateTimeWithTimeZone) -> Result<SessionView> {
    let txn = db.begin().await?;

    let worker = active_worker_by_code(&txn, code).await?;

    let session = WorkSession::find()
        .filter(work_session::Column::WorkerId.eq(worker.id))
        .filter(work_session::Column::Date.eq(now.date_naive()))
        .filter(work_session::Column::ClockOut.is_null())
        .one(&txn).await?
        .ok_or_else(|| Error::Conflict("no active clock-in session found".to_owned()))?;

    let hours_worked = utils::hours_between(&session.clock_in, &now);

    let mut model: work_session::ActiveModel = session.into();
    model.clock_out = Set(Some(now));
    model.hours_worked = Set(Some(hours_worked));
    model.updated_at = Set(now);
    let session = model.update(&txn).await?;

    txn.commit().await?;

    info!(worker = %worker.code, hours_worked, "clocked out");

    Ok(SessionView { session, worker_name: Some(worker.name) })
}

fn views(sessions: Vec<(work_session::Model, Option<worker::Model>)>) -> Vec<SessionView> {
    sessions.into_iter()
        .map(|(session, worker)| SessionView { session, worker_name: worker.map(|w| w.name) })
        .collect()
}

pub async fn recent_sessions(db: &DatabaseConnection) -> Result<Vec<SessionView>> {
    let sessions = WorkSession::find()
        .find_also_related(Worker)
        .order_by_desc(work_session::Column::Date)
        .order_by_desc(work_session::Column::ClockIn)
        .limit(RECENT_SESSIONS_LIMIT)
        .all(db).await?;

    Ok(views(sessions))
}

pub async fn worker_sessions(db: &DatabaseConnection, worker_id: Uuid) -> Result<Vec<SessionView>> {
    let sessions = WorkSession::find()
        .find_also_related(Worker)
        .filter(work_session::Column::WorkerId.eq(worker_id))
        .order_by_desc(work_session::Column::Date)
        .all(db).await?;

    Ok(views(sessions))
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, PaginatorTrait as _};

    use super::*;
    use crate::test_utils::*;

    #[actix_web::test]
    async fn test_clock_cycle() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_worker(&db, "W-1", 50_000.0, date(2024, 1, 15)).await?;

        let opened = clock_in(&db, "W-1", at(date(2024, 9, 20), 9, 0)).await?;
        assert_eq!(opened.session.date, date(2024, 9, 20));
        assert_eq!(opened.session.clock_out, None);
        assert_eq!(opened.worker_name.as_deref(), Some("Worker W-1"));

        let closed = clock_out(&db, "W-1", at(date(2024, 9, 20), 17, 30)).await?;
        assert_eq!(closed.session.id, opened.session.id);
        assert_eq!(closed.session.hours_worked, Some(8.5));

        Ok(())
    }

    #[actix_web::test]
    async fn test_one_session_per_day() -> Result<()> {
        let db = setup_test_db().await?;
        let worker = create_test_worker(&db, "W-1", 50_000.0, date(2024, 1, 15)).await?;
        let day = date(2024, 9, 20);

        clock_in(&db, "W-1", at(day, 9, 0)).await?;
        assert!(matches!(clock_in(&db, "W-1", at(day, 9, 5)).await, Err(Error::Conflict(_))));

        clock_out(&db, "W-1", at(day, 12, 0)).await?;
        assert!(matches!(clock_out(&db, "W-1", at(day, 12, 5)).await, Err(Error::Conflict(_))));
        assert!(matches!(clock_in(&db, "W-1", at(day, 13, 0)).await, Err(Error::Conflict(_))));

        clock_in(&db, "W-1", at(day + Days::new(1), 9, 0)).await?;

        let open = WorkSession::find()
            .filter(work_session::Column::WorkerId.eq(worker.id))
            .filter(work_session::Column::ClockOut.is_null())
            .count(&db).await?;
        assert_eq!(open, 1);

        Ok(())
    }

    #[actix_web::test]
    async fn test_concurrent_clock_in_hits_unique_index() -> Result<()> {
        let db = setup_test_db().await?;
        let worker = create_test_worker(&db, "W-1", 50_000.0, date(2024, 1, 15)).await?;
        let day = date(2024, 9, 20);

        let opened = clock_in(&db, "W-1", at(day, 9, 0)).await?;

        // a second request that passed the open-session check before the first one committed
        let raced = work_session::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(at(day, 9, 0)),
            updated_at: Set(at(day, 9, 0)),
            worker_id: Set(worker.id),
            date: Set(day),
            clock_in: Set(at(day, 9, 0)),
            clock_out: Set(None),
            hours_worked: Set(None),
        }.insert(&db).await.map_err(Error::from);
        assert!(matches!(raced, Err(Error::Conflict(_))), "{raced:?}");

        let sessions = worker_sessions(&db, worker.id).await?;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session.id, opened.session.id);

        Ok(())
    }

    #[actix_web::test]
    async fn test_clock_out_without_clock_in() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_worker(&db, "W-1", 50_000.0, date(2024, 1, 15)).await?;

        clock_in(&db, "W-1", at(date(2024, 9, 19), 22, 0)).await?;

        // Sessions left open overnight cannot be closed the next day
        let result = clock_out(&db, "W-1", at(date(2024, 9, 20), 6, 0)).await;
        assert!(matches!(result, Err(Error::Conflict(_))));

        Ok(())
    }

    #[actix_web::test]
    async fn test_unknown_or_inactive_worker() -> Result<()> {
        let db = setup_test_db().await?;
        let now = at(date(2024, 9, 20), 9, 0);
        let worker = create_test_worker(&db, "W-1", 50_000.0, date(2024, 1, 15)).await?;

        assert!(matches!(clock_in(&db, "nobody", now).await, Err(Error::NotFound(_))));
        assert!(matches!(clock_out(&db, "nobody", now).await, Err(Error::NotFound(_))));

        let changes = crate::domain::roster::WorkerChanges { is_active: Some(false), ..Default::default() };
        crate::domain::roster::update_worker(&db, worker.id, changes, now).await?;
        assert!(matches!(clock_in(&db, "W-1", now).await, Err(Error::NotFound(_))));

        Ok(())
    }

    #[actix_web::test]
    async fn test_session_listings() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_worker(&db, "W-1", 50_000.0, date(2024, 1, 15)).await?;
        create_test_worker(&db, "W-2", 50_000.0, date(2024, 1, 15)).await?;

        for offset in 0..3 {
            let day = date(2024, 9, 20) + Days::new(offset);
            clock_in(&db, "W-1", at(day, 9, 0)).await?;
            clock_in(&db, "W-2", at(day, 9, 30)).await?;
        }

        let recent = recent_sessions(&db).await?;
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].session.date, date(2024, 9, 22));

        let own = worker_sessions(&db, first.id).await?;
        assert_eq!(own.len(), 3);
        assert!(own.iter().all(|s| s.session.worker_id == first.id));

        Ok(())
    }

    #[actix_web::test]
    async fn test_database_failure_is_internal() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection reset".to_owned())])
            .into_connection();

        let result = clock_in(&db, "W-1", at(date(2024, 9, 20), 9, 0)).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}
