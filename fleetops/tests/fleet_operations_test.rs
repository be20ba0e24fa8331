use axum::http::StatusCode;
use chrono::{Days, Utc};
use fleetcrud::{CRUDOperations, Scope};
use fleetops::api::inspections::InspectionOperations;
use fleetops::entities::inspection::{self, InspectionCreate};
use fleetops::entities::{InspectionStatus, InspectionType};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use uuid::Uuid;

mod common;
use common::{TestApp, Tenant, setup_app, vehicle};

async fn add_vehicle(app: &TestApp, tenant: &Tenant, registration: &str) -> Uuid {
    let created = app
        .post("/api/v1/vehicles", &tenant.manager, vehicle(registration, "Volvo", "active"))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    created.id()
}

#[tokio::test]
async fn test_assign_driver_requires_active_driver() {
    let (app, tenant) = setup_app().await;
    let vehicle_id = add_vehicle(&app, &tenant, "AB12 CDE").await;
    let assign = format!("/api/v1/vehicles/{vehicle_id}/assign-driver");

    let dispatcher = app
        .post(&assign, &tenant.manager, json!({"driver_id": tenant.dispatcher.id()}))
        .await;
    assert_eq!(dispatcher.status, StatusCode::BAD_REQUEST);

    let inactive = app
        .post(
            "/api/v1/profiles",
            &tenant.manager,
            json!({"full_name": "Ivy Inactive", "email": "ivy@example.test", "role": "driver", "status": "inactive"}),
        )
        .await;
    assert_eq!(inactive.status, StatusCode::CREATED, "{:?}", inactive.body);
    let rejected = app.post(&assign, &tenant.manager, json!({"driver_id": inactive.id()})).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    let unknown = app.post(&assign, &tenant.manager, json!({"driver_id": Uuid::new_v4()})).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let by_driver = app.post(&assign, &tenant.driver, json!({"driver_id": tenant.driver.id()})).await;
    assert_eq!(by_driver.status, StatusCode::FORBIDDEN);

    let assigned = app.post(&assign, &tenant.manager, json!({"driver_id": tenant.driver.id()})).await;
    assert_eq!(assigned.status, StatusCode::OK, "{:?}", assigned.body);
    assert_eq!(assigned.body["driver_id"], tenant.driver.id().to_string());

    let cleared = app.post(&assign, &tenant.manager, json!({"driver_id": null})).await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert!(cleared.body["driver_id"].is_null());

    let stored = app.get(&format!("/api/v1/vehicles/{vehicle_id}"), &tenant.manager).await;
    assert!(stored.body["driver_id"].is_null());
}

#[tokio::test]
async fn test_failed_inspection_sends_vehicle_to_maintenance() {
    let (app, tenant) = setup_app().await;
    let failing = add_vehicle(&app, &tenant, "AB12 CDE").await;
    let passing = add_vehicle(&app, &tenant, "XY34 ZZZ").await;

    let failed = app
        .post(
            "/api/v1/inspections",
            &tenant.driver,
            json!({"vehicle_id": failing, "inspection_type": "pre_trip", "defect_count": 2, "status": "failed"}),
        )
        .await;
    assert_eq!(failed.status, StatusCode::CREATED, "{:?}", failed.body);
    assert_eq!(failed.body["inspector_id"], tenant.driver.id().to_string());

    let vehicle = app.get(&format!("/api/v1/vehicles/{failing}"), &tenant.driver).await;
    assert_eq!(vehicle.body["status"], "maintenance");

    let passed = app
        .post(
            "/api/v1/inspections",
            &tenant.driver,
            json!({"vehicle_id": passing, "inspection_type": "periodic", "status": "passed"}),
        )
        .await;
    assert_eq!(passed.status, StatusCode::CREATED);
    let vehicle = app.get(&format!("/api/v1/vehicles/{passing}"), &tenant.driver).await;
    assert_eq!(vehicle.body["status"], "active");

    let downgraded = app
        .put(
            &format!("/api/v1/inspections/{}", passed.id()),
            &tenant.dispatcher,
            json!({"status": "failed"}),
        )
        .await;
    assert_eq!(downgraded.status, StatusCode::OK);
    let vehicle = app.get(&format!("/api/v1/vehicles/{passing}"), &tenant.driver).await;
    assert_eq!(vehicle.body["status"], "maintenance");

    let maintenance = app.get("/api/v1/vehicles?status=maintenance", &tenant.manager).await;
    assert_eq!(maintenance.array().len(), 2);
}

#[tokio::test]
async fn test_failed_inspection_is_not_kept_when_vehicle_update_fails() {
    let (app, tenant) = setup_app().await;
    let scope = Scope::new(tenant.organization.id, tenant.driver.id());
    let create = InspectionCreate {
        vehicle_id: Uuid::new_v4(),
        inspector_id: Some(tenant.driver.id()),
        inspection_type: InspectionType::PreTrip,
        odometer_km: None,
        defect_count: 1,
        notes: None,
        status: Some(InspectionStatus::Failed),
    };

    let result = InspectionOperations.perform_create(&app.db, &scope, create).await;
    assert!(result.is_err());
    let stored = inspection::Entity::find()
        .count(&app.db)
        .await
        .expect("count inspections");
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_expiring_licenses_window_and_order() {
    let (app, tenant) = setup_app().await;
    let today = Utc::now().date_naive();
    let date = |offset: i64| {
        let shifted = if offset >= 0 {
            today.checked_add_days(Days::new(offset.unsigned_abs()))
        } else {
            today.checked_sub_days(Days::new(offset.unsigned_abs()))
        };
        shifted.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
    };

    for (number, offset, status) in [
        ("DL-SOON", 10, "valid"),
        ("DL-LATER", 60, "valid"),
        ("DL-OVERDUE", -5, "valid"),
        ("DL-SUSPENDED", 3, "suspended"),
    ] {
        let created = app
            .post(
                "/api/v1/licenses",
                &tenant.manager,
                json!({
                    "holder_id": tenant.driver.id(),
                    "license_number": number,
                    "license_class": "C",
                    "expires_on": date(offset),
                    "status": status,
                }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    }

    let numbers = |body: &serde_json::Value| -> Vec<String> {
        body.as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row["license_number"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };

    let default_window = app.get("/api/v1/licenses/expiring", &tenant.manager).await;
    assert_eq!(default_window.status, StatusCode::OK);
    assert_eq!(numbers(&default_window.body), vec!["DL-OVERDUE", "DL-SOON"]);

    let wide = app.get("/api/v1/licenses/expiring?days=90", &tenant.manager).await;
    assert_eq!(numbers(&wide.body), vec!["DL-OVERDUE", "DL-SOON", "DL-LATER"]);

    let too_wide = app.get("/api/v1/licenses/expiring?days=4000", &tenant.manager).await;
    assert_eq!(too_wide.status, StatusCode::BAD_REQUEST);

    let driver = app.get("/api/v1/licenses/expiring", &tenant.driver).await;
    assert_eq!(driver.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_overlapping_schedule_for_driver_is_conflict() {
    let (app, tenant) = setup_app().await;
    let entry = |title: &str, starts_at: &str, ends_at: &str| {
        json!({
            "title": title,
            "driver_id": tenant.driver.id(),
            "starts_at": starts_at,
            "ends_at": ends_at,
        })
    };

    let morning = app
        .post(
            "/api/v1/schedules",
            &tenant.dispatcher,
            entry("Morning run", "2030-03-05T08:00:00Z", "2030-03-05T12:00:00Z"),
        )
        .await;
    assert_eq!(morning.status, StatusCode::CREATED, "{:?}", morning.body);

    let clash = app
        .post(
            "/api/v1/schedules",
            &tenant.dispatcher,
            entry("Late morning", "2030-03-05T10:00:00Z", "2030-03-05T14:00:00Z"),
        )
        .await;
    assert_eq!(clash.status, StatusCode::CONFLICT);

    let afternoon = app
        .post(
            "/api/v1/schedules",
            &tenant.dispatcher,
            entry("Afternoon run", "2030-03-05T12:00:00Z", "2030-03-05T16:00:00Z"),
        )
        .await;
    assert_eq!(afternoon.status, StatusCode::CREATED);

    let mut cancelled = entry("Cancelled run", "2030-03-05T09:00:00Z", "2030-03-05T11:00:00Z");
    cancelled["status"] = json!("cancelled");
    let cancelled = app.post("/api/v1/schedules", &tenant.dispatcher, cancelled).await;
    assert_eq!(cancelled.status, StatusCode::CREATED);

    let moved = app
        .put(
            &format!("/api/v1/schedules/{}", afternoon.id()),
            &tenant.dispatcher,
            json!({"starts_at": "2030-03-05T11:00:00Z"}),
        )
        .await;
    assert_eq!(moved.status, StatusCode::CONFLICT);

    let listed = app.get("/api/v1/schedules?status=all", &tenant.dispatcher).await;
    assert_eq!(listed.array().len(), 3);
}

#[tokio::test]
async fn test_notifications_stay_in_their_inbox() {
    let (app, tenant) = setup_app().await;

    let sent = app
        .post(
            "/api/v1/notifications",
            &tenant.dispatcher,
            json!({"recipient_id": tenant.driver.id(), "title": "Gate code", "message": "Use 4411 at the depot"}),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED, "{:?}", sent.body);
    let notification_id = sent.id();

    let foreign = app.get(&format!("/api/v1/notifications/{notification_id}"), &tenant.manager).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    let foreign_read = app
        .post(&format!("/api/v1/notifications/{notification_id}/read"), &tenant.manager, json!({}))
        .await;
    assert_eq!(foreign_read.status, StatusCode::NOT_FOUND);
    let manager_inbox = app.get("/api/v1/notifications", &tenant.manager).await;
    assert!(manager_inbox.array().is_empty());

    let own = app.get(&format!("/api/v1/notifications/{notification_id}"), &tenant.driver).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["status"], "unread");
    let unread = app.get("/api/v1/notifications/unread-count", &tenant.driver).await;
    assert_eq!(unread.body, json!({"unread": 1}));

    let read = app
        .post(&format!("/api/v1/notifications/{notification_id}/read"), &tenant.driver, json!({}))
        .await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["status"], "read");
    let unread = app.get("/api/v1/notifications/unread-count", &tenant.driver).await;
    assert_eq!(unread.body, json!({"unread": 0}));

    let refused = app
        .post(
            "/api/v1/notifications/broadcast",
            &tenant.driver,
            json!({"title": "Party", "message": "Friday"}),
        )
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    let broadcast = app
        .post(
            "/api/v1/notifications/broadcast",
            &tenant.manager,
            json!({"role": "driver", "title": "Depot closed", "message": "No pickups on Friday"}),
        )
        .await;
    assert_eq!(broadcast.status, StatusCode::CREATED, "{:?}", broadcast.body);
    assert_eq!(broadcast.body, json!({"recipients": 1}));

    let manager_unread = app.get("/api/v1/notifications/unread-count", &tenant.manager).await;
    assert_eq!(manager_unread.body, json!({"unread": 0}));
    let driver_unread = app.get("/api/v1/notifications/unread-count", &tenant.driver).await;
    assert_eq!(driver_unread.body, json!({"unread": 1}));

    let all_read = app.post("/api/v1/notifications/read-all", &tenant.driver, json!({})).await;
    assert_eq!(all_read.status, StatusCode::OK);
    assert_eq!(all_read.body, json!({"updated": 1}));
    let driver_unread = app.get("/api/v1/notifications/unread-count", &tenant.driver).await;
    assert_eq!(driver_unread.body, json!({"unread": 0}));

    let inbox = app.get("/api/v1/notifications", &tenant.driver).await;
    assert_eq!(inbox.array().len(), 2);
}
