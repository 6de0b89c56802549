use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AdminPin, Authority, Operation},
    domain::roster::{self, GroupChanges},
    error::Result,
    pages::Message,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_groups)
        .service(create_group)
        .service(update_group)
        .service(delete_group)
        .service(group_workers)
        .service(add_worker)
        .service(remove_worker);
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateGroup {
    name: String,
    team_leader_id: Option<Uuid>,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateGroup {
    #[serde(flatten)]
    changes: GroupChanges,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Membership {
    worker_id: Uuid,
    #[serde(default)]
    admin_pin: Option<String>,
}

#[get("")]
async fn list_groups(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
) -> Result<impl Responder> {
    authority.authorize(Operation::ListGroups, &pin)?;

    Ok(web::Json(roster::list_groups(&db).await?))
}

#[post("")]
async fn create_group(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    payload: web::Json<CreateGroup>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::CreateGroup, &pin.or(payload.admin_pin))?;

    let group = roster::create_group(&db, &payload.name, payload.team_leader_id, Local::now().fixed_offset()).await?;

    Ok(HttpResponse::Created().json(group))
}

#[put("/{group_id}")]
async fn update_group(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    group_id: web::Path<Uuid>,
    payload: web::Json<UpdateGroup>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::UpdateGroup, &pin.or(payload.admin_pin))?;

    let group = roster::update_group(&db, *group_id, payload.changes, Local::now().fixed_offset()).await?;

    Ok(web::Json(group))
}

#[delete("/{group_id}")]
async fn delete_group(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    group_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::DeleteGroup, &pin)?;

    roster::delete_group(&db, *group_id, Local::now().fixed_offset()).await?;

    Ok(Message::new("group deleted"))
}

#[get("/{group_id}/workers")]
async fn group_workers(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    group_id: web::Path<Uuid>,
) -> Result<impl Responder> {
    authority.authorize(Operation::ViewGroupWorkers, &pin)?;

    Ok(web::Json(roster::group_workers(&db, *group_id).await?))
}

#[post("/{group_id}/add_worker")]
async fn add_worker(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    group_id: web::Path<Uuid>,
    payload: web::Json<Membership>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::AddGroupMember, &pin.or(payload.admin_pin))?;

    let worker = roster::add_worker_to_group(&db, *group_id, payload.worker_id, Local::now().fixed_offset()).await?;

    Ok(web::Json(worker))
}

#[post("/{group_id}/remove_worker")]
async fn remove_worker(
    db: web::Data<DatabaseConnection>,
    authority: web::Data<Authority>,
    pin: AdminPin,
    group_id: web::Path<Uuid>,
    payload: web::Json<Membership>,
) -> Result<impl Responder> {
    let payload = payload.into_inner();
    authority.authorize(Operation::RemoveGroupMember, &pin.or(payload.admin_pin))?;

    let worker = roster::remove_worker_from_group(&db, *group_id, payload.worker_id, Local::now().fixed_offset()).await?;

    Ok(web::Json(worker))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};

    use super::*;
    use crate::{consts::ADMIN_PIN_HEADER, domain::roster::{GroupView, WorkerView}, pages::TEST_PIN, test_utils::*};

    #[actix_web::test]
    async fn test_group_lifecycle() {
        let db = setup_test_db().await.unwrap();
        let leader = create_test_worker(&db, "L-1", 70_000.0, date(2024, 1, 10)).await.unwrap();
        let member = create_test_worker(&db, "W-1", 40_000.0, date(2024, 1, 10)).await.unwrap();
        let app = test_app!(db);

        let create = CreateGroup { name: "Extrusion".to_owned(), team_leader_id: Some(leader.id), admin_pin: None };

        let req = test::TestRequest::post()
            .uri("/api/groups")
            .set_json(&create)
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // PIN in the body works as well as the header
        let req = test::TestRequest::post()
            .uri("/api/groups")
            .set_json(CreateGroup { admin_pin: Some(TEST_PIN.to_owned()), ..create })
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let group: GroupView = test::read_body_json(response).await;
        assert_eq!(group.team_leader_name.as_deref(), Some("Worker L-1"));

        let req = test::TestRequest::post()
            .uri(&format!("/api/groups/{}/add_worker", group.group.id))
            .insert_header((ADMIN_PIN_HEADER, TEST_PIN))
            .set_json(Membership { worker_id: member.id, admin_pin: None })
            .to_request();
        let added: WorkerView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(added.group_name.as_deref(), Some("Extrusion"));

        let req = test::TestRequest::post()
            .uri(&format!("/api/groups/{}/add_worker", group.group.id))
            .insert_header((ADMIN_PIN_HEADER, TEST_PIN))
            .set_json(Membership { worker_id: member.id, admin_pin: None })
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/groups/{}/workers", group.group.id))
            .to_request();
        let workers: Vec<WorkerView> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(workers.len(), 2);

        let req = test::TestRequest::put()
            .uri(&format!("/api/groups/{}", group.group.id))
            .insert_header((ADMIN_PIN_HEADER, TEST_PIN))
            .set_json(serde_json::json!({ "name": "Packing", "team_leader_id": null }))
            .to_request();
        let updated: GroupView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.group.name, "Packing");
        assert_eq!(updated.group.team_leader_id, None);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/groups/{}", group.group.id))
            .insert_header((ADMIN_PIN_HEADER, TEST_PIN))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/groups")
            .to_request();
        let groups: Vec<GroupView> = test::call_and_read_body_json(&app, req).await;
        assert!(groups.is_empty());
    }

    #[actix_web::test]
    async fn test_leader_conflict_status() {
        let db = setup_test_db().await.unwrap();
        let leader = create_test_worker(&db, "L-1", 70_000.0, date(2024, 1, 10)).await.unwrap();
        let app = test_app!(db);

        for (name, status) in [("A", StatusCode::CREATED), ("B", StatusCode::CONFLICT)] {
            let req = test::TestRequest::post()
                .uri("/api/groups")
                .insert_header((ADMIN_PIN_HEADER, TEST_PIN))
                .set_json(CreateGroup { name: name.to_owned(), team_leader_id: Some(leader.id), admin_pin: None })
                .to_request();

            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), status);
        }
    }
}
