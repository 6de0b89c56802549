//! Groups, workers and the links between them.
//!
//! Team leadership is stored on the group only. Whether a worker leads a team
//! is answered by looking at the active groups when a worker is read.

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{
    prelude::DateTimeWithTimeZone, ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, ModelTrait as _, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    domain::cycle,
    entity::{advance, loan, loan_payment, prelude::*, work_group, work_session, worker},
    error::{Error, Result},
    utils,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerView {
    #[serde(flatten)]
    pub worker: worker::Model,
    pub is_team_leader: bool,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: work_group::Model,
    pub team_leader_name: Option<String>,
    pub workers_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorker {
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub position: String,
    pub salary: f64,
    pub hire_date: NaiveDate,
    pub birthday: Option<NaiveDate>,
    pub group_id: Option<Uuid>,
}

/// Partial update, absent fields are left untouched and `null` clears nullable ones
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "utils::nullable")]
    pub phone: Option<Option<String>>,
    pub position: Option<String>,
    pub salary: Option<f64>,
    #[serde(default, deserialize_with = "utils::nullable")]
    pub birthday: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "utils::nullable")]
    pub group_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
    /// Setting a date records a salary payment
    #[serde(default, deserialize_with = "utils::nullable")]
    pub next_payment: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "utils::nullable")]
    pub team_leader_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerUpdate {
    pub worker: WorkerView,
    /// Number of advances settled when the update recorded a salary payment
    pub advances_cleared: Option<u64>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
    }

    Ok(value.to_owned())
}

fn valid_salary(salary: f64) -> Result<f64> {
    if !salary.is_finite() || salary <= 0.0 {
        return Err(Error::Validation("salary must be a positive amount".to_owned()));
    }

    Ok(salary)
}

async fn active_groups<C: ConnectionTrait>(db: &C) -> Result<Vec<work_group::Model>> {
    let groups = WorkGroup::find()
        .filter(work_group::Column::IsActive.eq(true))
        .order_by_asc(work_group::Column::Name)
        .all(db).await?;

    Ok(groups)
}

pub async fn find_worker<C: ConnectionTrait>(db: &C, worker_id: Uuid) -> Result<worker::Model> {
    Worker::find_by_id(worker_id)
        .one(db).await?
        .ok_or_else(|| Error::NotFound("worker not found".to_owned()))
}

pub async fn find_active_worker<C: ConnectionTrait>(db: &C, worker_id: Uuid) -> Result<worker::Model> {
    let worker = find_worker(db, worker_id).await?;
    if !worker.is_active {
        return Err(Error::NotFound("worker not found".to_owned()));
    }

    Ok(worker)
}

async fn find_active_group<C: ConnectionTrait>(db: &C, group_id: Uuid) -> Result<work_group::Model> {
    WorkGroup::find_by_id(group_id)
        .filter(work_group::Column::IsActive.eq(true))
        .one(db).await?
        .ok_or_else(|| Error::NotFound("group not found".to_owned()))
}

async fn ensure_group_assignable<C: ConnectionTrait>(db: &C, group_id: Uuid) -> Result<()> {
    match find_active_group(db, group_id).await {
        Err(Error::NotFound(_)) => Err(Error::Validation("invalid group".to_owned())),
        other => other.map(|_| ()),
    }
}

async fn ensure_group_name_free<C: ConnectionTrait>(db: &C, name: &str) -> Result<()> {
    let taken = WorkGroup::find()
        .filter(work_group::Column::Name.eq(name))
        .filter(work_group::Column::IsActive.eq(true))
        .count(db).await?;

    if taken > 0 {
        return Err(Error::Validation("group name already exists".to_owned()));
    }

    Ok(())
}

/// Checks a worker may lead `group_id` (or a group about to be created when `None`)
async fn ensure_leader_available<C: ConnectionTrait>(db: &C, leader_id: Uuid, group_id: Option<Uuid>) -> Result<worker::Model> {
    let leader = Worker::find_by_id(leader_id)
        .filter(worker::Column::IsActive.eq(true))
        .one(db).await?
        .ok_or_else(|| Error::Validation("invalid team leader".to_owned()))?;

    let led = WorkGroup::find()
        .filter(work_group::Column::TeamLeaderId.eq(leader_id))
        .filter(work_group::Column::IsActive.eq(true))
        .one(db).await?;

    match led {
        Some(led) if Some(led.id) != group_id => {
            Err(Error::Conflict(format!("worker {} is already the team leader of {}", leader.code, led.name)))
        }
        _ => Ok(leader),
    }
}

async fn move_to_group<C: ConnectionTrait>(db: &C, worker: worker::Model, group_id: Option<Uuid>, now: DateTimeWithTimeZone) -> Result<worker::Model> {
    let mut model: worker::ActiveModel = worker.into();
    model.group_id = Set(group_id);
    model.updated_at = Set(now);

    Ok(model.update(db).await?)
}

/// Drops the worker's leadership of any group they are no longer an active member of
async fn release_stale_leadership<C: ConnectionTrait>(db: &C, worker: &worker::Model, now: DateTimeWithTimeZone) -> Result<u64> {
    let mut stale = WorkGroup::update_many()
        .set(work_group::ActiveModel {
            team_leader_id: Set(None),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(work_group::Column::TeamLeaderId.eq(worker.id));

    if let (true, Some(group_id)) = (worker.is_active, worker.group_id) {
        stale = stale.filter(work_group::Column::Id.ne(group_id));
    }

    Ok(stale.exec(db).await?.rows_affected)
}

pub async fn worker_views<C: ConnectionTrait>(db: &C, workers: Vec<worker::Model>) -> Result<Vec<WorkerView>> {
    let groups = WorkGroup::find().all(db).await?;
    let names: HashMap<Uuid, String> = groups.iter().map(|g| (g.id, g.name.clone())).collect();

    let views = workers.into_iter().map(|worker| {
        let is_team_leader = groups.iter()
            .any(|g| g.is_active && g.team_leader_id == Some(worker.id));
        let group_name = worker.group_id.and_then(|id| names.get(&id).cloned());

        WorkerView { worker, is_team_leader, group_name }
    }).collect();

    Ok(views)
}

async fn worker_view<C: ConnectionTrait>(db: &C, worker: worker::Model) -> Result<WorkerView> {
    let mut views = worker_views(db, vec![worker]).await?;

    views.pop().ok_or_else(|| Error::NotFound("worker not found".to_owned()))
}

async fn group_view<C: ConnectionTrait>(db: &C, group: work_group::Model) -> Result<GroupView> {
    let team_leader_name = match group.team_leader_id {
        Some(leader_id) => Worker::find_by_id(leader_id).one(db).await?.map(|w| w.name),
        None => None,
    };

    let workers_count = Worker::find()
        .filter(worker::Column::GroupId.eq(group.id))
        .filter(worker::Column::IsActive.eq(true))
        .count(db).await?;

    Ok(GroupView { group, team_leader_name, workers_count })
}

pub async fn list_groups(db: &DatabaseConnection) -> Result<Vec<GroupView>> {
    let mut views = Vec::new();
    for group in active_groups(db).await? {
        views.push(group_view(db, group).await?);
    }

    Ok(views)
}

pub async fn create_group(db: &DatabaseConnection, name: &str, team_leader_id: Option<Uuid>, now: DateTimeWithTimeZone) -> Result<GroupView> {
    let name = required("group name", name)?;

    let txn = db.begin().await?;

    ensure_group_name_free(&txn, &name).await?;

    let leader = match team_leader_id {
        Some(leader_id) => Some(ensure_leader_available(&txn, leader_id, None).await?),
        None => None,
    };

    let group = work_group::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        name: Set(name),
        team_leader_id: Set(team_leader_id),
        is_active: Set(true),
    }.insert(&txn).await?;

    if let Some(leader) = leader {
        move_to_group(&txn, leader, Some(group.id), now).await?;
    }

    let view = group_view(&txn, group).await?;
    txn.commit().await?;

    info!(group = %view.group.id, name = %view.group.name, "group created");

    Ok(view)
}

pub async fn update_group(db: &DatabaseConnection, group_id: Uuid, changes: GroupChanges, now: DateTimeWithTimeZone) -> Result<GroupView> {
    let txn = db.begin().await?;

    let group = find_active_group(&txn, group_id).await?;
    let mut model: work_group::ActiveModel = group.clone().into();

    if let Some(name) = changes.name {
        let name = required("group name", &name)?;
        if name != group.name {
            ensure_group_name_free(&txn, &name).await?;
            model.name = Set(name);
        }
    }

    if let Some(team_leader_id) = changes.team_leader_id {
        if let Some(leader_id) = team_leader_id {
            let leader = ensure_leader_available(&txn, leader_id, Some(group_id)).await?;
            move_to_group(&txn, leader, Some(group_id), now).await?;
        }

        model.team_leader_id = Set(team_leader_id);
    }

    model.updated_at = Set(now);
    let group = model.update(&txn).await?;

    let view = group_view(&txn, group).await?;
    txn.commit().await?;

    info!(group = %group_id, "group updated");

    Ok(view)
}

/// Soft delete: the group is deactivated, its leader released and its members detached
pub async fn delete_group(db: &DatabaseConnection, group_id: Uuid, now: DateTimeWithTimeZone) -> Result<()> {
    let txn = db.begin().await?;

    let group = find_active_group(&txn, group_id).await?;

    let detached = Worker::update_many()
        .set(worker::ActiveModel {
            group_id: Set(None),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(worker::Column::GroupId.eq(group_id))
        .exec(&txn).await?
        .rows_affected;

    let mut model: work_group::ActiveModel = group.into();
    model.is_active = Set(false);
    model.team_leader_id = Set(None);
    model.updated_at = Set(now);
    model.update(&txn).await?;

    txn.commit().await?;

    info!(group = %group_id, detached, "group deleted");

    Ok(())
}

pub async fn group_workers(db: &DatabaseConnection, group_id: Uuid) -> Result<Vec<WorkerView>> {
    find_active_group(db, group_id).await?;

    let workers = Worker::find()
        .filter(worker::Column::GroupId.eq(group_id))
        .filter(worker::Column::IsActive.eq(true))
        .order_by_asc(worker::Column::Code)
        .all(db).await?;

    worker_views(db, workers).await
}

pub async fn add_worker_to_group(db: &DatabaseConnection, group_id: Uuid, worker_id: Uuid, now: DateTimeWithTimeZone) -> Result<WorkerView> {
    let txn = db.begin().await?;

    find_active_group(&txn, group_id).await?;
    let worker = find_active_worker(&txn, worker_id).await?;

    if worker.group_id.is_some() {
        return Err(Error::Conflict(format!("worker {} is already assigned to a group", worker.code)));
    }

    let worker = move_to_group(&txn, worker, Some(group_id), now).await?;
    let view = worker_view(&txn, worker).await?;
    txn.commit().await?;

    Ok(view)
}

pub async fn remove_worker_from_group(db: &DatabaseConnection, group_id: Uuid, worker_id: Uuid, now: DateTimeWithTimeZone) -> Result<WorkerView> {
    let txn = db.begin().await?;

    let group = find_active_group(&txn, group_id).await?;
    let worker = find_worker(&txn, worker_id).await?;

    if worker.group_id != Some(group_id) {
        return Err(Error::Validation("worker is not in this group".to_owned()));
    }

    if group.team_leader_id == Some(worker_id) {
        let mut model: work_group::ActiveModel = group.into();
        model.team_leader_id = Set(None);
        model.updated_at = Set(now);
        model.update(&txn).await?;
    }

    let worker = move_to_group(&txn, worker, None, now).await?;
    let view = worker_view(&txn, worker).await?;
    txn.commit().await?;

    Ok(view)
}

pub async fn list_workers(db: &DatabaseConnection) -> Result<Vec<WorkerView>> {
    let workers = Worker::find()
        .filter(worker::Column::IsActive.eq(true))
        .order_by_asc(worker::Column::Code)
        .all(db).await?;

    worker_views(db, workers).await
}

pub async fn get_worker(db: &DatabaseConnection, worker_id: Uuid) -> Result<WorkerView> {
    let worker = find_worker(db, worker_id).await?;

    worker_view(db, worker).await
}

pub async fn create_worker(db: &DatabaseConnection, new: NewWorker, now: DateTimeWithTimeZone) -> Result<WorkerView> {
    let code = required("worker code", &new.code)?;
    let name = required("name", &new.name)?;
    let position = required("position", &new.position)?;
    let salary = valid_salary(new.salary)?;

    let txn = db.begin().await?;

    let taken = Worker::find()
        .filter(worker::Column::Code.eq(&code))
        .count(&txn).await?;
    if taken > 0 {
        return Err(Error::Validation("worker code already exists".to_owned()));
    }

    if let Some(group_id) = new.group_id {
        ensure_group_assignable(&txn, group_id).await?;
    }

    let worker = worker::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        code: Set(code),
        name: Set(name),
        phone: Set(new.phone),
        position: Set(position),
        salary: Set(salary),
        hire_date: Set(new.hire_date),
        next_payment: Set(Some(cycle::next_payment_for(new.hire_date, now.date_naive()))),
        birthday: Set(new.birthday),
        is_active: Set(true),
        group_id: Set(new.group_id),
    }.insert(&txn).await?;

    let view = worker_view(&txn, worker).await?;
    txn.commit().await?;

    info!(worker = %view.worker.id, code = %view.worker.code, "worker created");

    Ok(view)
}

/// Records a salary payment: every unpaid advance of the worker is settled and
/// `next_payment` moves to the given date
///
/// Must run inside the caller's transaction so both changes land together.
pub async fn record_payroll_run<C: ConnectionTrait>(
    db: &C,
    worker: worker::Model,
    next_payment: NaiveDate,
    now: DateTimeWithTimeZone,
) -> Result<(worker::Model, u64)> {
    let cleared = Advance::update_many()
        .set(advance::ActiveModel {
            is_paid_back: Set(true),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(advance::Column::WorkerId.eq(worker.id))
        .filter(advance::Column::IsPaidBack.eq(false))
        .exec(db).await?
        .rows_affected;

    let mut model: worker::ActiveModel = worker.into();
    model.next_payment = Set(Some(next_payment));
    model.updated_at = Set(now);
    let worker = model.update(db).await?;

    info!(worker = %worker.id, %next_payment, cleared, "salary payment recorded");

    Ok((worker, cleared))
}

pub async fn update_worker(db: &DatabaseConnection, worker_id: Uuid, changes: WorkerChanges, now: DateTimeWithTimeZone) -> Result<WorkerUpdate> {
    let txn = db.begin().await?;

    let worker = find_worker(&txn, worker_id).await?;
    let mut model: worker::ActiveModel = worker.into();

    if let Some(name) = changes.name {
        model.name = Set(required("name", &name)?);
    }
    if let Some(phone) = changes.phone {
        model.phone = Set(phone);
    }
    if let Some(position) = changes.position {
        model.position = Set(required("position", &position)?);
    }
    if let Some(salary) = changes.salary {
        model.salary = Set(valid_salary(salary)?);
    }
    if let Some(birthday) = changes.birthday {
        model.birthday = Set(birthday);
    }
    if let Some(group_id) = changes.group_id {
        if let Some(group_id) = group_id {
            ensure_group_assignable(&txn, group_id).await?;
        }
        model.group_id = Set(group_id);
    }
    if let Some(is_active) = changes.is_active {
        model.is_active = Set(is_active);
    }

    let mut advances_cleared = None;
    match changes.next_payment {
        Some(Some(next_payment)) => {
            model.updated_at = Set(now);
            let worker = model.update(&txn).await?;

            let (worker, cleared) = record_payroll_run(&txn, worker, next_payment, now).await?;
            advances_cleared = Some(cleared);
            model = worker.into();
        }
        Some(None) => model.next_payment = Set(None),
        None => {}
    }

    model.updated_at = Set(now);
    let worker = model.update(&txn).await?;

    let released = release_stale_leadership(&txn, &worker, now).await?;
    if released > 0 {
        info!(worker = %worker_id, released, "team leadership released");
    }

    let view = worker_view(&txn, worker).await?;
    txn.commit().await?;

    debug!(worker = %worker_id, "worker updated");

    Ok(WorkerUpdate { worker: view, advances_cleared })
}

/// Hard delete with everything the worker owns; the code becomes reusable
pub async fn delete_worker(db: &DatabaseConnection, worker_id: Uuid) -> Result<String> {
    let txn = db.begin().await?;

    let worker = find_worker(&txn, worker_id).await?;

    WorkSession::delete_many()
        .filter(work_session::Column::WorkerId.eq(worker_id))
        .exec(&txn).await?;

    Advance::delete_many()
        .filter(advance::Column::WorkerId.eq(worker_id))
        .exec(&txn).await?;

    let loans = Loan::find()
        .filter(loan::Column::WorkerId.eq(worker_id))
        .all(&txn).await?;
    for loan in loans {
        LoanPayment::delete_many()
            .filter(loan_payment::Column::LoanId.eq(loan.id))
            .exec(&txn).await?;
        loan.delete(&txn).await?;
    }

    WorkGroup::update_many()
        .set(work_group::ActiveModel {
            team_leader_id: Set(None),
            ..Default::default()
        })
        .filter(work_group::Column::TeamLeaderId.eq(worker_id))
        .exec(&txn).await?;

    let code = worker.code.clone();
    worker.delete(&txn).await?;

    txn.commit().await?;

    info!(worker = %worker_id, %code, "worker permanently deleted");

    Ok(code)
}
