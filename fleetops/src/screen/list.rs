use chrono::{DateTime, Utc};
use sea_orm::ActiveEnum;

use crate::entities::{Bid, Inspection, Job, License, Notification, Profile, Schedule, Vehicle};

pub const ALL_STATUSES: &str = "all";
pub const EMPTY_MESSAGE: &str = "No results";

/// A row that a list screen can filter by status and search.
pub trait Listable {
    /// The row's status in its serialized form, e.g. `in_use`.
    fn status(&self) -> String;

    /// Text fields the search box matches against.
    fn search_fields(&self) -> Vec<&str>;

    /// Case-insensitive substring match on any search field. An empty term matches.
    fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Loading,
    Ready(Vec<T>),
    Failed(String),
}

/// What the list area renders.
#[derive(Debug, PartialEq)]
pub enum Visible<'a, T> {
    Loading,
    Failed(&'a str),
    Empty { message: &'static str },
    Rows(Vec<&'a T>),
}

/// State behind a list screen: the status filter, the search term and the last fetch.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    status_filter: String,
    search: String,
    state: FetchState<T>,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            status_filter: ALL_STATUSES.to_string(),
            search: String::new(),
            state: FetchState::Loading,
        }
    }
}

fn status_matches(filter: &str, status: &str) -> bool {
    let filter = filter.trim();
    filter.is_empty() || filter.eq_ignore_ascii_case(ALL_STATUSES) || filter.eq_ignore_ascii_case(status)
}

impl<T: Listable> ListView<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status_filter(&mut self, status: impl Into<String>) {
        self.status_filter = status.into();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    #[must_use]
    pub fn status_filter(&self) -> &str {
        &self.status_filter
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub const fn state(&self) -> &FetchState<T> {
        &self.state
    }

    /// Back to `Loading`, e.g. after a mutation invalidated the list.
    pub fn reload(&mut self) {
        self.state = FetchState::Loading;
    }

    pub fn load(&mut self, rows: Vec<T>) {
        self.state = FetchState::Ready(rows);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = FetchState::Failed(message.into());
    }

    #[must_use]
    pub fn visible(&self) -> Visible<'_, T> {
        match &self.state {
            FetchState::Loading => Visible::Loading,
            FetchState::Failed(message) => Visible::Failed(message),
            FetchState::Ready(rows) => {
                let rows: Vec<&T> = rows
                    .iter()
                    .filter(|row| status_matches(&self.status_filter, &row.status()))
                    .filter(|row| row.matches_search(&self.search))
                    .collect();
                if rows.is_empty() {
                    Visible::Empty { message: EMPTY_MESSAGE }
                } else {
                    Visible::Rows(rows)
                }
            }
        }
    }
}

impl Listable for Vehicle {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.registration.as_str(), self.make.as_str(), self.model.as_str()];
        fields.extend(self.vin.as_deref());
        fields
    }
}

impl Listable for Profile {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.full_name.as_str(), self.email.as_str()];
        fields.extend(self.phone.as_deref());
        fields
    }
}

impl Listable for Job {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.pickup_location.as_str(),
            self.dropoff_location.as_str(),
        ]
    }
}

impl Listable for Bid {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        self.note.as_deref().into_iter().collect()
    }
}

impl Listable for Inspection {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        self.notes.as_deref().into_iter().collect()
    }
}

impl Listable for Notification {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.message.as_str()]
    }
}

impl Listable for License {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.license_number.as_str(), self.license_class.as_str()];
        fields.extend(self.issuing_authority.as_deref());
        fields
    }
}

impl Listable for Schedule {
    fn status(&self) -> String {
        self.status.to_value()
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str()]
    }
}

/// Rows whose `at` falls on or after `from`, for calendar-style screens.
pub fn upcoming<T, F>(rows: &[T], from: DateTime<Utc>, at: F) -> Vec<&T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut rows: Vec<&T> = rows.iter().filter(|row| at(row) >= from).collect();
    rows.sort_by_key(|row| at(row));
    rows
}
