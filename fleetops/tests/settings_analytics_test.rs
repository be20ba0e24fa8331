use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{job, setup_app, vehicle};

#[tokio::test]
async fn test_toggling_one_setting_preserves_siblings() {
    let (app, tenant) = setup_app().await;

    let before = app.get("/api/v1/settings/notifications", &tenant.manager).await;
    assert_eq!(before.status, StatusCode::OK);
    assert_eq!(before.body["values"]["email_enabled"], true);

    let patched = app
        .patch("/api/v1/settings/notifications", &tenant.manager, json!({"email_enabled": false}))
        .await;
    assert_eq!(patched.status, StatusCode::OK, "{:?}", patched.body);

    let mut expected = before.body["values"].clone();
    expected["email_enabled"] = json!(false);
    assert_eq!(patched.body["values"], expected);
    assert_eq!(patched.body["updated_by"], tenant.manager.id().to_string());

    let reread = app.get("/api/v1/settings/notifications", &tenant.admin).await;
    assert_eq!(reread.body["values"], expected);
}

#[tokio::test]
async fn test_settings_patch_rejects_unknown_keys_and_wrong_types() {
    let (app, tenant) = setup_app().await;

    let unknown = app
        .patch("/api/v1/settings/notifications", &tenant.admin, json!({"carrier_pigeons": true}))
        .await;
    assert_eq!(unknown.status, StatusCode::UNPROCESSABLE_ENTITY);

    let wrong_type = app
        .patch("/api/v1/settings/notifications", &tenant.admin, json!({"email_enabled": "yes"}))
        .await;
    assert_eq!(wrong_type.status, StatusCode::UNPROCESSABLE_ENTITY);

    let missing_section = app.get("/api/v1/settings/payroll", &tenant.admin).await;
    assert_eq!(missing_section.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_list_follows_role() {
    let (app, tenant) = setup_app().await;

    let admin = app.get("/api/v1/settings", &tenant.admin).await;
    assert_eq!(admin.array().len(), 9);

    let manager = app.get("/api/v1/settings", &tenant.manager).await;
    let sections: Vec<&str> = manager
        .array()
        .iter()
        .filter_map(|section| section["section"].as_str())
        .collect();
    assert_eq!(sections.len(), 6);
    assert!(!sections.contains(&"system"));
}

#[tokio::test]
async fn test_dashboard_counts_every_status() {
    let (app, tenant) = setup_app().await;
    app.post("/api/v1/vehicles", &tenant.manager, vehicle("AB12 CDE", "Volvo", "active"))
        .await;
    app.post("/api/v1/vehicles", &tenant.manager, vehicle("LM56 NOP", "Volvo", "in_use"))
        .await;
    app.post("/api/v1/jobs", &tenant.dispatcher, job("Steel coils")).await;

    let response = app.get("/api/v1/analytics/dashboard", &tenant.dispatcher).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    let counts = &response.body["counts"];
    assert_eq!(counts["vehicles"]["active"], 1);
    assert_eq!(counts["vehicles"]["in_use"], 1);
    assert_eq!(counts["vehicles"]["retired"], 0);
    assert_eq!(counts["jobs"]["open"], 1);
    assert_eq!(response.body["fleet_utilization"], 0.5);

    let driver = app.get("/api/v1/analytics/dashboard", &tenant.driver).await;
    assert_eq!(driver.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_clear_data_needs_admin_and_phrase() {
    let (app, tenant) = setup_app().await;
    app.post("/api/v1/vehicles", &tenant.manager, vehicle("AB12 CDE", "Volvo", "active"))
        .await;
    app.post("/api/v1/jobs", &tenant.dispatcher, job("Steel coils")).await;
    let warm = app.get("/api/v1/jobs", &tenant.admin).await;
    assert_eq!(warm.array().len(), 1);

    let manager = app
        .post(
            "/api/v1/analytics/clear-data",
            &tenant.manager,
            json!({"confirm": "DELETE Northwind Haulage"}),
        )
        .await;
    assert_eq!(manager.status, StatusCode::FORBIDDEN);

    let wrong = app
        .post("/api/v1/analytics/clear-data", &tenant.admin, json!({"confirm": "DELETE everything"}))
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);

    let cleared = app
        .post(
            "/api/v1/analytics/clear-data",
            &tenant.admin,
            json!({"confirm": "DELETE Northwind Haulage"}),
        )
        .await;
    assert_eq!(cleared.status, StatusCode::OK, "{:?}", cleared.body);
    assert_eq!(cleared.body["jobs"], 1);

    let jobs = app.get("/api/v1/jobs", &tenant.admin).await;
    assert!(jobs.array().is_empty());
    let vehicles = app.get("/api/v1/vehicles", &tenant.admin).await;
    assert_eq!(vehicles.array().len(), 1);
}
