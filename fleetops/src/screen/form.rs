use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;

use super::modal::{IllegalTransition, ModalController, ModalState};

pub const REQUIRED_MESSAGE: &str = "This field is required";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("{} required field(s) are empty", .0.len())]
    Blocked(BTreeMap<String, String>),
    #[error(transparent)]
    Modal(#[from] IllegalTransition),
    #[error("{0}")]
    Failed(String),
}

/// Field values behind a create or edit modal.
#[derive(Debug, Clone)]
pub struct FormSession {
    initial: Map<String, Value>,
    values: Map<String, Value>,
    required: BTreeSet<String>,
    errors: BTreeMap<String, String>,
    modal: ModalController,
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

impl FormSession {
    pub fn new<I, S>(initial: Map<String, Value>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: initial.clone(),
            initial,
            required: required.into_iter().map(Into::into).collect(),
            errors: BTreeMap::new(),
            modal: ModalController::new(),
        }
    }

    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    #[must_use]
    pub const fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    #[must_use]
    pub const fn modal(&self) -> &ModalState {
        self.modal.state()
    }

    pub fn open(&mut self) -> Result<(), IllegalTransition> {
        self.modal.open()
    }

    /// Dismissing the modal discards whatever was entered.
    pub fn close(&mut self) -> Result<(), IllegalTransition> {
        self.modal.close()?;
        self.reset();
        Ok(())
    }

    pub fn set_field(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.errors.remove(&field);
        self.values.insert(field, value.into());
    }

    /// Flip a boolean field and return its new value. A missing field counts as `false`.
    pub fn toggle(&mut self, field: &str) -> bool {
        let next = !self.values.get(field).and_then(Value::as_bool).unwrap_or(false);
        self.set_field(field, next);
        next
    }

    /// Required fields that are missing, null or blank.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|field| is_blank(self.values.get(field.as_str())))
            .map(String::as_str)
            .collect()
    }

    fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
    }

    /// Run `mutation` with the entered values once every required field is filled.
    pub async fn submit<F, Fut, T, E>(&mut self, mutation: F) -> Result<T, SubmitError>
    where
        F: FnOnce(Map<String, Value>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let missing: BTreeMap<String, String> = self
            .missing_required()
            .into_iter()
            .map(|field| (field.to_string(), REQUIRED_MESSAGE.to_string()))
            .collect();
        if !missing.is_empty() {
            self.errors.extend(missing.clone());
            return Err(SubmitError::Blocked(missing));
        }

        self.modal.submit()?;
        match mutation(self.values.clone()).await {
            Ok(saved) => {
                self.modal.succeed()?;
                self.reset();
                Ok(saved)
            }
            Err(err) => {
                let message = err.to_string();
                self.modal.fail(message.clone())?;
                Err(SubmitError::Failed(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn vehicle_form() -> FormSession {
        let initial = json!({"registration": "", "make": "", "year": 2024})
            .as_object()
            .cloned()
            .unwrap();
        FormSession::new(initial, ["registration", "make"])
    }

    #[tokio::test]
    async fn test_blocked_submit_never_calls_mutation() {
        let mut form = vehicle_form();
        form.open().unwrap();
        form.set_field("make", "Volvo");
        let called = Cell::new(false);

        let result = form
            .submit(|_| async {
                called.set(true);
                Ok::<_, String>(())
            })
            .await;

        assert!(!called.get());
        match result {
            Err(SubmitError::Blocked(missing)) => {
                assert_eq!(missing.keys().collect::<Vec<_>>(), vec!["registration"]);
            }
            other => panic!("expected a blocked submit, got {other:?}"),
        }
        assert_eq!(form.errors().get("registration").map(String::as_str), Some(REQUIRED_MESSAGE));
        assert_eq!(form.modal(), &ModalState::Open);
    }

    #[tokio::test]
    async fn test_success_closes_and_resets() {
        let mut form = vehicle_form();
        form.open().unwrap();
        form.set_field("registration", "AB12 CDE");
        form.set_field("make", "Volvo");

        let saved = form
            .submit(|values| async move { Ok::<_, String>(values["registration"].clone()) })
            .await
            .unwrap();

        assert_eq!(saved, json!("AB12 CDE"));
        assert_eq!(form.modal(), &ModalState::Closed);
        assert_eq!(form.value("registration"), Some(&json!("")));
    }

    #[tokio::test]
    async fn test_failure_keeps_values_and_allows_retry() {
        let mut form = vehicle_form();
        form.open().unwrap();
        form.set_field("registration", "AB12 CDE");
        form.set_field("make", "Volvo");

        let err = form
            .submit(|_| async { Err::<(), _>("Registration already exists") })
            .await
            .unwrap_err();

        assert_eq!(err, SubmitError::Failed("Registration already exists".to_string()));
        assert_eq!(form.modal(), &ModalState::Error("Registration already exists".to_string()));
        assert_eq!(form.value("registration"), Some(&json!("AB12 CDE")));

        form.submit(|_| async { Ok::<_, String>(()) }).await.unwrap();
        assert_eq!(form.modal(), &ModalState::Closed);
    }

    #[test]
    fn test_toggle_changes_one_field() {
        let initial = json!({"email_enabled": true, "sms_enabled": false, "digest": "daily"})
            .as_object()
            .cloned()
            .unwrap();
        let mut form = FormSession::new(initial, Vec::<String>::new());

        assert!(!form.toggle("email_enabled"));
        assert_eq!(
            form.values(),
            json!({"email_enabled": false, "sms_enabled": false, "digest": "daily"}).as_object().unwrap()
        );
        assert!(form.toggle("push_enabled"));
        assert_eq!(form.values().len(), 4);
    }

    #[test]
    fn test_close_discards_entered_values() {
        let mut form = vehicle_form();
        form.open().unwrap();
        form.set_field("make", "Scania");
        form.close().unwrap();
        assert_eq!(form.value("make"), Some(&json!("")));
    }
}
