//! Client route table and the navigation guard.
//!
//! `resolve` decides, for a client path and the caller's role, whether the page
//! renders, redirects or does not exist. The API enforces the same role sets on the
//! matching endpoints.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::{Role, SettingSection};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/dashboard";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Roles(&'static [Role]),
}

impl Access {
    #[must_use]
    pub fn permits(self, role: Role) -> bool {
        match self {
            Self::Public | Self::Authenticated => true,
            Self::Roles(roles) => roles.contains(&role),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Login,
    Dashboard,
    Vehicles,
    VehicleDetail,
    Drivers,
    DriverDetail,
    Jobs,
    JobDetail,
    Inspections,
    Notifications,
    Licenses,
    Schedule,
    Analytics,
    Settings,
    ApiManagement,
    Profile,
}

#[derive(Clone, Copy, Debug)]
pub struct Route {
    pub pattern: &'static str,
    pub page: Page,
    pub access: Access,
}

const fn route(pattern: &'static str, page: Page, access: Access) -> Route {
    Route { pattern, page, access }
}

pub const ROUTES: &[Route] = &[
    route("/login", Page::Login, Access::Public),
    route("/dashboard", Page::Dashboard, Access::Authenticated),
    route("/vehicles", Page::Vehicles, Access::Authenticated),
    route("/vehicles/:id", Page::VehicleDetail, Access::Authenticated),
    route("/drivers", Page::Drivers, Access::Roles(Role::STAFF)),
    route("/drivers/:id", Page::DriverDetail, Access::Roles(Role::STAFF)),
    route("/jobs", Page::Jobs, Access::Authenticated),
    route("/jobs/:id", Page::JobDetail, Access::Authenticated),
    route("/inspections", Page::Inspections, Access::Authenticated),
    route("/notifications", Page::Notifications, Access::Authenticated),
    route("/licenses", Page::Licenses, Access::Roles(Role::MANAGEMENT)),
    route("/schedule", Page::Schedule, Access::Authenticated),
    route("/analytics", Page::Analytics, Access::Roles(Role::STAFF)),
    route("/settings", Page::Settings, Access::Roles(Role::MANAGEMENT)),
    route("/api-management", Page::ApiManagement, Access::Roles(Role::ADMIN)),
    route("/profile", Page::Profile, Access::Authenticated),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageView {
    pub page: Page,
    /// Values of `:name` segments in the matched pattern.
    pub params: BTreeMap<String, String>,
    /// Settings tabs visible to the caller; empty for every other page.
    pub tabs: Vec<SettingSection>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    Redirect { to: String },
    NotFound { path: String },
    Render(PageView),
}

impl RouteOutcome {
    fn redirect(to: &str) -> Self {
        Self::Redirect { to: to.to_string() }
    }
}

/// Settings sections a role may open, in tab order.
#[must_use]
pub fn settings_tabs(role: Role) -> Vec<SettingSection> {
    match role {
        Role::Admin => SettingSection::ALL.to_vec(),
        Role::Manager => SettingSection::ALL
            .into_iter()
            .filter(|section| !section.is_admin_only())
            .collect(),
        Role::Dispatcher | Role::Driver => Vec::new(),
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());
    let mut params = BTreeMap::new();
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => {
                if let Some(name) = expected.strip_prefix(':') {
                    params.insert(name.to_string(), actual.to_string());
                } else if expected != actual {
                    return None;
                }
            }
            _ => return None,
        }
    }
}

#[must_use]
pub fn find_route(path: &str) -> Option<(&'static Route, BTreeMap<String, String>)> {
    let path = normalize(path);
    ROUTES
        .iter()
        .find_map(|route| match_pattern(route.pattern, path).map(|params| (route, params)))
}

/// Decide what the client should show for `path` given the caller's role (`None`
/// when signed out).
#[must_use]
pub fn resolve(path: &str, role: Option<Role>) -> RouteOutcome {
    if normalize(path) == "/" {
        return RouteOutcome::redirect(if role.is_some() { HOME_PATH } else { LOGIN_PATH });
    }

    let Some((route, params)) = find_route(path) else {
        return RouteOutcome::NotFound {
            path: normalize(path).to_string(),
        };
    };

    match (route.access, role) {
        (Access::Public, Some(_)) if route.page == Page::Login => RouteOutcome::redirect(HOME_PATH),
        (Access::Public, _) => RouteOutcome::Render(PageView {
            page: route.page,
            params,
            tabs: Vec::new(),
        }),
        (_, None) => RouteOutcome::redirect(LOGIN_PATH),
        (access, Some(role)) if !access.permits(role) => RouteOutcome::redirect(HOME_PATH),
        (_, Some(role)) => RouteOutcome::Render(PageView {
            page: route.page,
            params,
            tabs: if route.page == Page::Settings {
                settings_tabs(role)
            } else {
                Vec::new()
            },
        }),
    }
}
