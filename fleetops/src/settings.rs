//! Organization settings: per-section defaults, shallow merging of partial updates,
//! and persistence of one row per (organization, section).
//!
//! A stored row only needs the keys that differ from the defaults; reads always
//! return the full section with defaults filled in.

use chrono::{DateTime, Utc};
use fleetcrud::{ApiError, CRUDResource, Scope, ValidationError, ValidationErrors};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::setting::{self, Setting, SettingCreate, SettingSection, parse_values};
use crate::entities::Role;

/// The complete set of keys for a section with their default values. A `null`
/// default accepts a value of any type.
#[must_use]
pub fn defaults(section: SettingSection) -> Map<String, Value> {
    let value = match section {
        SettingSection::General => json!({
            "company_name": "",
            "timezone": "UTC",
            "date_format": "MMM d, yyyy",
            "currency": "USD",
            "distance_unit": "km",
            "logo_url": null,
        }),
        SettingSection::Security => json!({
            "session_timeout_minutes": 60,
            "require_two_factor": false,
            "password_min_length": 12,
            "api_key_rotation_days": 90,
            "allowed_ip_ranges": [],
        }),
        SettingSection::Notifications => json!({
            "email_enabled": true,
            "sms_enabled": false,
            "push_enabled": true,
            "license_expiry_days": 30,
            "inspection_reminders": true,
            "job_updates": true,
        }),
        SettingSection::Routes => json!({
            "optimize_routes": true,
            "avoid_tolls": false,
            "avoid_highways": false,
            "default_buffer_minutes": 15,
        }),
        SettingSection::Vehicles => json!({
            "inspection_interval_days": 30,
            "maintenance_odometer_interval_km": 15000,
            "require_pre_trip_inspection": true,
            "fuel_type_default": null,
        }),
        SettingSection::Drivers => json!({
            "max_daily_hours": 10,
            "require_license_on_file": true,
            "allow_self_bidding": true,
            "min_rest_hours": 11,
        }),
        SettingSection::System => json!({
            "maintenance_mode": false,
            "data_retention_days": 365,
            "log_level": "info",
        }),
        SettingSection::Integrations => json!({
            "webhook_url": null,
            "gps_provider": null,
            "accounting_export_enabled": false,
        }),
        SettingSection::Theme => json!({
            "mode": "light",
            "primary_color": "#2563eb",
            "compact_tables": false,
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Whether `role` may read and change `section`.
#[must_use]
pub fn can_access(role: Role, section: SettingSection) -> bool {
    match role {
        Role::Admin => true,
        Role::Manager => !section.is_admin_only(),
        Role::Dispatcher | Role::Driver => false,
    }
}

/// Defaults overlaid with the stored values. Stored keys that are no longer part of
/// the section are dropped.
#[must_use]
pub fn effective(section: SettingSection, stored: &Map<String, Value>) -> Map<String, Value> {
    let mut values = defaults(section);
    for (key, value) in stored {
        if let Some(slot) = values.get_mut(key) {
            *slot = value.clone();
        }
    }
    values
}

fn same_kind(default: &Value, value: &Value) -> bool {
    match default {
        Value::Null => true,
        Value::Bool(_) => value.is_boolean(),
        Value::Number(_) => value.is_number(),
        Value::String(_) => value.is_string(),
        Value::Array(_) => value.is_array(),
        Value::Object(_) => value.is_object(),
    }
}

/// Shallow-merge `patch` over `current`. Only the keys in `patch` change.
///
/// # Errors
///
/// Collects one error per unknown key or mistyped value; a non-object patch is a
/// single `values` error.
pub fn merge_patch(
    section: SettingSection,
    current: &Map<String, Value>,
    patch: &Value,
) -> Result<Map<String, Value>, ValidationErrors> {
    let Value::Object(changes) = patch else {
        return Err(ValidationError::new("values", "Must be a JSON object").into());
    };

    let defaults = defaults(section);
    let mut errors = ValidationErrors::new();
    for (key, value) in changes {
        match defaults.get(key) {
            None => errors.add(ValidationError::new(key.clone(), "Unknown setting")),
            Some(default) if !same_kind(default, value) => errors.add(ValidationError::new(
                key.clone(),
                format!("Expected a value of type {}", kind_name(default)),
            )),
            Some(_) => {}
        }
    }
    errors.result()?;

    let mut merged = effective(section, current);
    for (key, value) in changes {
        merged.insert(key.clone(), value.clone());
    }
    Ok(merged)
}

const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "any",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One settings section as returned by the API.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct SectionSettings {
    pub section: SettingSection,
    #[schema(value_type = Object)]
    pub values: Map<String, Value>,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SectionSettings {
    fn from_row(section: SettingSection, row: Option<&setting::Model>) -> Self {
        let stored = row.map(|row| parse_values(&row.values)).unwrap_or_default();
        Self {
            section,
            values: effective(section, &stored),
            updated_by: row.and_then(|row| row.updated_by),
            updated_at: row.map(|row| row.updated_at),
        }
    }
}

async fn find_row<C>(db: &C, scope: &Scope, section: SettingSection) -> Result<Option<setting::Model>, ApiError>
where
    C: ConnectionTrait,
{
    Ok(setting::Entity::find()
        .filter(Setting::tenant_condition(scope))
        .filter(setting::Column::Section.eq(section))
        .one(db)
        .await?)
}

/// # Errors
///
/// Propagates database errors.
pub async fn load_section<C>(db: &C, scope: &Scope, section: SettingSection) -> Result<SectionSettings, ApiError>
where
    C: ConnectionTrait,
{
    let row = find_row(db, scope, section).await?;
    Ok(SectionSettings::from_row(section, row.as_ref()))
}

/// Every section in `sections`, in the given order.
///
/// # Errors
///
/// Propagates database errors.
pub async fn load_sections<C>(
    db: &C,
    scope: &Scope,
    sections: &[SettingSection],
) -> Result<Vec<SectionSettings>, ApiError>
where
    C: ConnectionTrait,
{
    let rows = setting::Entity::find()
        .filter(Setting::tenant_condition(scope))
        .all(db)
        .await?;
    Ok(sections
        .iter()
        .map(|section| {
            let row = rows.iter().find(|row| row.section == *section);
            SectionSettings::from_row(*section, row)
        })
        .collect())
}

/// Merge `patch` into the stored section and persist the full result.
///
/// # Errors
///
/// Returns `ValidationFailed` for unknown keys or mistyped values, otherwise
/// propagates database errors.
pub async fn update_section<C>(
    db: &C,
    scope: &Scope,
    section: SettingSection,
    patch: &Value,
) -> Result<SectionSettings, ApiError>
where
    C: ConnectionTrait,
{
    let row = find_row(db, scope, section).await?;
    let stored = row.as_ref().map(|row| parse_values(&row.values)).unwrap_or_default();
    let merged = merge_patch(section, &stored, patch)?;

    let saved = match row {
        Some(row) => {
            let mut active: setting::ActiveModel = row.into_active_model();
            active.values = Set(Value::Object(merged).to_string());
            active.updated_by = Set(Some(scope.actor_id));
            active.updated_at = Set(Utc::now());
            SectionSettings::from_row(section, Some(&active.update(db).await?))
        }
        None => {
            let create = SettingCreate {
                section,
                values: Value::Object(merged),
                updated_by: Some(scope.actor_id),
            };
            let created = Setting::create(db, scope, create).await?;
            SectionSettings {
                section,
                values: effective(section, &created.values),
                updated_by: created.updated_by,
                updated_at: Some(created.updated_at),
            }
        }
    };
    tracing::info!(section = section.as_str(), actor = %scope.actor_id, "Settings updated");
    Ok(saved)
}

/// Insert a defaults row for every section that has none yet.
///
/// # Errors
///
/// Propagates database errors.
pub async fn seed_defaults<C>(db: &C, scope: &Scope) -> Result<(), ApiError>
where
    C: ConnectionTrait,
{
    for section in SettingSection::ALL {
        if find_row(db, scope, section).await?.is_none() {
            let create = SettingCreate {
                section,
                values: Value::Object(defaults(section)),
                updated_by: None,
            };
            Setting::create(db, scope, create).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_section_has_defaults() {
        for section in SettingSection::ALL {
            assert!(!defaults(section).is_empty(), "{section:?} has no defaults");
        }
    }

    #[test]
    fn test_toggle_preserves_siblings() {
        let mut stored = Map::new();
        stored.insert("sms_enabled".to_string(), json!(true));
        stored.insert("license_expiry_days".to_string(), json!(14));

        let merged = merge_patch(
            SettingSection::Notifications,
            &stored,
            &json!({"email_enabled": false}),
        )
        .unwrap();

        assert_eq!(merged["email_enabled"], json!(false));
        assert_eq!(merged["sms_enabled"], json!(true));
        assert_eq!(merged["license_expiry_days"], json!(14));
        assert_eq!(merged["push_enabled"], json!(true));
    }

    #[test]
    fn test_unknown_and_mistyped_keys_rejected() {
        let errors = merge_patch(
            SettingSection::Theme,
            &Map::new(),
            &json!({"mode": 3, "sparkles": true}),
        )
        .unwrap_err();
        let mut fields = errors.fields();
        fields.sort_unstable();
        assert_eq!(fields, vec!["mode", "sparkles"]);
    }

    #[test]
    fn test_null_default_accepts_any_type() {
        let merged = merge_patch(
            SettingSection::Integrations,
            &Map::new(),
            &json!({"webhook_url": "https://example.com/hook", "gps_provider": {"name": "acme"}}),
        )
        .unwrap();
        assert_eq!(merged["webhook_url"], json!("https://example.com/hook"));
    }

    #[test]
    fn test_patch_must_be_object() {
        let errors = merge_patch(SettingSection::General, &Map::new(), &json!([1])).unwrap_err();
        assert_eq!(errors.fields(), vec!["values"]);
    }

    #[test]
    fn test_stale_stored_keys_are_dropped() {
        let mut stored = Map::new();
        stored.insert("retired_option".to_string(), json!(1));
        let values = effective(SettingSection::Routes, &stored);
        assert!(!values.contains_key("retired_option"));
    }

    #[test]
    fn test_section_access() {
        assert!(can_access(Role::Admin, SettingSection::Security));
        assert!(!can_access(Role::Manager, SettingSection::Security));
        assert!(can_access(Role::Manager, SettingSection::Theme));
        assert!(!can_access(Role::Driver, SettingSection::General));
    }
}
