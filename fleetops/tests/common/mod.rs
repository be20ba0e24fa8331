#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use fleetcrud::{CRUDResource, Scope};
use fleetops::auth::issue_api_key;
use fleetops::entities::organization::{Organization, OrganizationCreate};
use fleetops::entities::profile::{Profile, ProfileCreate, Role};
use fleetops::migration::Migrator;
use fleetops::{AppState, Config, build_router, settings};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// A signed-in profile and its bearer token.
pub struct Member {
    pub profile: Profile,
    pub token: String,
}

impl Member {
    pub fn id(&self) -> Uuid {
        self.profile.id
    }
}

pub struct Tenant {
    pub organization: Organization,
    pub admin: Member,
    pub manager: Member,
    pub dispatcher: Member,
    pub driver: Member,
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn content_range(&self) -> Option<&str> {
        self.headers.get("Content-Range").and_then(|value| value.to_str().ok())
    }

    pub fn array(&self) -> &Vec<Value> {
        self.body.as_array().expect("response body is not an array")
    }

    pub fn id(&self) -> Uuid {
        self.body["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("response body has no id")
    }
}

pub async fn setup_test_db() -> DatabaseConnection {
    fleetops::logging::init_test_logging();
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

pub async fn add_member(db: &DatabaseConnection, organization_id: Uuid, name: &str, role: Role) -> Member {
    let scope = Scope::new(organization_id, Uuid::nil());
    let email = format!("{}.{}@example.test", name.to_lowercase().replace(' ', "."), &organization_id.simple().to_string()[..8]);
    let profile = Profile::create(
        db,
        &scope,
        ProfileCreate {
            full_name: name.to_string(),
            email,
            phone: None,
            role,
            status: None,
        },
    )
    .await
    .expect("Failed to create profile");
    let (_, token) = issue_api_key(db, &Scope::new(organization_id, profile.id), profile.id, "tests")
        .await
        .expect("Failed to issue API key");
    Member { profile, token }
}

pub async fn add_tenant(db: &DatabaseConnection, name: &str) -> Tenant {
    let organization = Organization::create(
        db,
        &Scope::new(Uuid::new_v4(), Uuid::nil()),
        OrganizationCreate {
            name: name.to_string(),
            contact_email: None,
        },
    )
    .await
    .expect("Failed to create organization");
    let admin = add_member(db, organization.id, "Ada Admin", Role::Admin).await;
    settings::seed_defaults(db, &Scope::new(organization.id, admin.id()))
        .await
        .expect("Failed to seed settings");

    Tenant {
        manager: add_member(db, organization.id, "Max Manager", Role::Manager).await,
        dispatcher: add_member(db, organization.id, "Dana Dispatcher", Role::Dispatcher).await,
        driver: add_member(db, organization.id, "Dev Driver", Role::Driver).await,
        admin,
        organization,
    }
}

/// One app with one seeded organization.
pub async fn setup_app() -> (TestApp, Tenant) {
    let db = setup_test_db().await;
    let tenant = add_tenant(&db, "Northwind Haulage").await;
    let router = build_router(AppState::new(db.clone(), Config::default()));
    (TestApp { router, db }, tenant)
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self.router.clone().oneshot(request).await.expect("Request failed");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, member: &Member) -> TestResponse {
        self.request(Method::GET, uri, Some(&member.token), None).await
    }

    pub async fn post(&self, uri: &str, member: &Member, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(&member.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, member: &Member, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(&member.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, member: &Member, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(&member.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, member: &Member) -> TestResponse {
        self.request(Method::DELETE, uri, Some(&member.token), None).await
    }
}

pub fn vehicle(registration: &str, make: &str, status: &str) -> Value {
    serde_json::json!({
        "registration": registration,
        "make": make,
        "model": "FH16",
        "year": 2021,
        "status": status,
    })
}

pub fn job(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "pickup_location": "Leeds depot",
        "dropoff_location": "Manchester port",
    })
}
