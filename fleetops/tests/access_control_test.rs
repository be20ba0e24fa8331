use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::{add_tenant, setup_app, vehicle};

#[tokio::test]
async fn test_driver_is_redirected_from_settings_page() {
    let (app, tenant) = setup_app().await;

    let driver = app.get("/api/v1/navigation?path=/settings", &tenant.driver).await;
    assert_eq!(driver.status, StatusCode::OK);
    assert_eq!(driver.body, json!({"outcome": "redirect", "to": "/dashboard"}));

    let admin = app.get("/api/v1/navigation?path=/settings", &tenant.admin).await;
    assert_eq!(admin.body["outcome"], "render");
    assert_eq!(admin.body["page"], "settings");
    assert_eq!(admin.body["tabs"].as_array().map(Vec::len), Some(9));

    let manager = app.get("/api/v1/navigation?path=/settings", &tenant.manager).await;
    let tabs = manager.body["tabs"].as_array().cloned().unwrap_or_default();
    assert_eq!(tabs.len(), 6);
    assert!(!tabs.contains(&json!("security")));
}

#[tokio::test]
async fn test_signed_out_navigation_redirects_to_login() {
    let (app, _tenant) = setup_app().await;

    let response = app.request(Method::GET, "/api/v1/navigation?path=/jobs", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"outcome": "redirect", "to": "/login"}));

    let unknown = app.request(Method::GET, "/api/v1/navigation?path=/nowhere", None, None).await;
    assert_eq!(unknown.body["outcome"], "not_found");
}

#[tokio::test]
async fn test_role_gated_endpoints_answer_forbidden() {
    let (app, tenant) = setup_app().await;

    let settings = app.get("/api/v1/settings", &tenant.driver).await;
    assert_eq!(settings.status, StatusCode::FORBIDDEN);

    let create = app.post("/api/v1/vehicles", &tenant.driver, vehicle("AB12 CDE", "Volvo", "active")).await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);

    let restricted = app.get("/api/v1/settings/security", &tenant.manager).await;
    assert_eq!(restricted.status, StatusCode::FORBIDDEN);

    let keys = app.get("/api/v1/api-keys", &tenant.manager).await;
    assert_eq!(keys.status, StatusCode::FORBIDDEN);

    let allowed = app.get("/api/v1/settings/security", &tenant.admin).await;
    assert_eq!(allowed.status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_or_revoked_key_is_unauthorized() {
    let (app, tenant) = setup_app().await;

    let anonymous = app.request(Method::GET, "/api/v1/vehicles", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let issued = app
        .post(
            "/api/v1/api-keys",
            &tenant.admin,
            json!({"profile_id": tenant.dispatcher.id(), "name": "dispatch console"}),
        )
        .await;
    assert_eq!(issued.status, StatusCode::CREATED, "{:?}", issued.body);
    let token = issued.body["token"].as_str().map(str::to_string).unwrap_or_default();
    let key_id = issued.id();

    let before = app.request(Method::GET, "/api/v1/vehicles", Some(&token), None).await;
    assert_eq!(before.status, StatusCode::OK);

    let revoked = app.post(&format!("/api/v1/api-keys/{key_id}/revoke"), &tenant.admin, json!({})).await;
    assert_eq!(revoked.status, StatusCode::OK);
    assert_eq!(revoked.body["status"], "revoked");

    let after = app.request(Method::GET, "/api/v1/vehicles", Some(&token), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_organization_rows_are_invisible() {
    let (app, tenant) = setup_app().await;
    let rival = add_tenant(&app.db, "Southern Freight").await;

    let created = app.post("/api/v1/vehicles", &rival.manager, vehicle("ZZ99 RIV", "MAN", "active")).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let foreign_id = created.id();

    let show = app.get(&format!("/api/v1/vehicles/{foreign_id}"), &tenant.admin).await;
    assert_eq!(show.status, StatusCode::NOT_FOUND);

    let update = app
        .put(&format!("/api/v1/vehicles/{foreign_id}"), &tenant.admin, json!({"make": "Hijacked"}))
        .await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);

    let delete = app.delete(&format!("/api/v1/vehicles/{foreign_id}"), &tenant.admin).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let list = app.get("/api/v1/vehicles?status=all", &tenant.admin).await;
    assert!(list.array().iter().all(|row| row["id"] != foreign_id.to_string()));

    let still_there = app.get(&format!("/api/v1/vehicles/{foreign_id}"), &rival.manager).await;
    assert_eq!(still_there.status, StatusCode::OK);
    assert_eq!(still_there.body["make"], "MAN");
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _tenant) = setup_app().await;
    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_manager_cannot_grant_admin_role() {
    let (app, tenant) = setup_app().await;
    let manager_id = tenant.manager.id();

    let own = app
        .put(&format!("/api/v1/profiles/{manager_id}"), &tenant.manager, json!({"role": "admin"}))
        .await;
    assert_eq!(own.status, StatusCode::FORBIDDEN);
    let keys = app.get("/api/v1/api-keys", &tenant.manager).await;
    assert_eq!(keys.status, StatusCode::FORBIDDEN);

    let promote = app
        .put(
            &format!("/api/v1/profiles/{}", tenant.dispatcher.id()),
            &tenant.manager,
            json!({"role": "admin"}),
        )
        .await;
    assert_eq!(promote.status, StatusCode::FORBIDDEN);

    let demote = app
        .put(&format!("/api/v1/profiles/{}", tenant.admin.id()), &tenant.manager, json!({"role": "driver"}))
        .await;
    assert_eq!(demote.status, StatusCode::FORBIDDEN);

    let create = app
        .post(
            "/api/v1/profiles",
            &tenant.manager,
            json!({"full_name": "Sly Admin", "email": "sly@example.test", "role": "admin"}),
        )
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
    let profiles = app.get("/api/v1/profiles", &tenant.manager).await;
    assert_eq!(profiles.array().len(), 4);
    assert!(profiles.array().iter().all(|profile| profile["email"] != "sly@example.test"));

    let dispatcher = app.get(&format!("/api/v1/profiles/{}", tenant.dispatcher.id()), &tenant.admin).await;
    assert_eq!(dispatcher.body["role"], "dispatcher");
}

#[tokio::test]
async fn test_role_changes_within_management_rules() {
    let (app, tenant) = setup_app().await;
    let manager_id = tenant.manager.id();

    let renamed = app
        .put(
            &format!("/api/v1/profiles/{manager_id}"),
            &tenant.manager,
            json!({"full_name": "Maxine Manager", "role": "manager"}),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK, "{:?}", renamed.body);
    assert_eq!(renamed.body["full_name"], "Maxine Manager");

    let reassigned = app
        .put(
            &format!("/api/v1/profiles/{}", tenant.dispatcher.id()),
            &tenant.manager,
            json!({"role": "driver"}),
        )
        .await;
    assert_eq!(reassigned.status, StatusCode::OK);
    assert_eq!(reassigned.body["role"], "driver");

    let hired = app
        .post(
            "/api/v1/profiles",
            &tenant.manager,
            json!({"full_name": "Nia Driver", "email": "nia@example.test", "role": "driver"}),
        )
        .await;
    assert_eq!(hired.status, StatusCode::CREATED);

    let own_admin = app
        .put(&format!("/api/v1/profiles/{}", tenant.admin.id()), &tenant.admin, json!({"role": "manager"}))
        .await;
    assert_eq!(own_admin.status, StatusCode::FORBIDDEN);

    let promoted = app
        .put(&format!("/api/v1/profiles/{manager_id}"), &tenant.admin, json!({"role": "admin"}))
        .await;
    assert_eq!(promoted.status, StatusCode::OK);
    let keys = app.get("/api/v1/api-keys", &tenant.manager).await;
    assert_eq!(keys.status, StatusCode::OK);
}

#[tokio::test]
async fn test_profiles_cannot_delete_themselves() {
    let (app, tenant) = setup_app().await;
    let admin_id = tenant.admin.id();

    let single = app.delete(&format!("/api/v1/profiles/{admin_id}"), &tenant.admin).await;
    assert_eq!(single.status, StatusCode::BAD_REQUEST);

    let batch = app
        .request(
            Method::DELETE,
            "/api/v1/profiles/batch",
            Some(&tenant.admin.token),
            Some(json!([tenant.driver.id(), admin_id])),
        )
        .await;
    assert_eq!(batch.status, StatusCode::BAD_REQUEST);

    let still_there = app.get(&format!("/api/v1/profiles/{admin_id}"), &tenant.admin).await;
    assert_eq!(still_there.status, StatusCode::OK);
    let driver = app.get(&format!("/api/v1/profiles/{}", tenant.driver.id()), &tenant.admin).await;
    assert_eq!(driver.status, StatusCode::OK);

    let other = app.delete(&format!("/api/v1/profiles/{}", tenant.dispatcher.id()), &tenant.admin).await;
    assert_eq!(other.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_updates_organization() {
    let (app, tenant) = setup_app().await;

    let updated = app
        .put(
            "/api/v1/organization",
            &tenant.admin,
            json!({"name": "Northwind Freight", "contact_email": "ops@northwind.example"}),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{:?}", updated.body);
    assert_eq!(updated.body["name"], "Northwind Freight");

    let seen = app.get("/api/v1/organization", &tenant.driver).await;
    assert_eq!(seen.status, StatusCode::OK);
    assert_eq!(seen.body["name"], "Northwind Freight");
    assert_eq!(seen.body["contact_email"], "ops@northwind.example");

    let manager = app.put("/api/v1/organization", &tenant.manager, json!({"name": "Hijacked"})).await;
    assert_eq!(manager.status, StatusCode::FORBIDDEN);

    let bad_email = app
        .put("/api/v1/organization", &tenant.admin, json!({"contact_email": "not-an-email"}))
        .await;
    assert_eq!(bad_email.status, StatusCode::UNPROCESSABLE_ENTITY);

    let blank = app.put("/api/v1/organization", &tenant.admin, json!({"name": "  "})).await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);

    let unchanged = app.get("/api/v1/organization", &tenant.admin).await;
    assert_eq!(unchanged.body["name"], "Northwind Freight");
}
