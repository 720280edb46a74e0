//! HTTP routes for signlearn
//!
//! [`dispatch`] maps a fully read request onto a handler. It takes plain
//! values rather than a hyper request so the whole router can be driven
//! directly from tests.

pub mod analytics;
pub mod auth_routes;
pub mod courses;
pub mod health;
pub mod packages;
pub mod response;
pub mod users;

pub use health::{health_check, HealthResponse};
pub use response::{
    error_response, json_response, method_not_allowed_response, not_found_response,
    preflight_response, HttpResponse, QueryParams,
};

use bytes::Bytes;
use hyper::Method;

use crate::server::AppState;
use response::decode_segment;

/// Known paths, with decoded path parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    Courses,
    PopularCourses,
    Course(String),
    Categories,
    Category(String),
    Packages,
    PopularPackages,
    Package(String),
    Register,
    Login,
    Users,
    User(String),
    Enroll { user_id: String, package_id: String },
    Progress { user_id: String, course_id: String },
    Dashboard,
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .collect();
        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match parts.as_slice() {
            ["health"] => Self::Health,
            ["courses"] => Self::Courses,
            ["courses", "popular"] => Self::PopularCourses,
            ["courses", id] | ["videolib", id] => Self::Course(id.to_string()),
            ["categories"] => Self::Categories,
            ["categories", group] => Self::Category(group.to_string()),
            ["packages"] => Self::Packages,
            ["packages", "popular"] => Self::PopularPackages,
            ["packages", id] => Self::Package(id.to_string()),
            ["auth", "register"] => Self::Register,
            ["auth", "login"] => Self::Login,
            ["users"] => Self::Users,
            ["users", id] => Self::User(id.to_string()),
            ["users", user, "enroll", package] => Self::Enroll {
                user_id: user.to_string(),
                package_id: package.to_string(),
            },
            ["users", user, "progress", course] => Self::Progress {
                user_id: user.to_string(),
                course_id: course.to_string(),
            },
            ["analytics", "dashboard"] => Self::Dashboard,
            _ => return None,
        };
        Some(route)
    }
}

/// Route one request. Never fails: errors become JSON error responses.
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
) -> HttpResponse {
    if method == Method::OPTIONS {
        return preflight_response();
    }

    let Some(route) = Route::parse(path) else {
        return not_found_response(path);
    };
    let params = QueryParams::parse(query);

    let result = match (method, &route) {
        (&Method::GET, Route::Health) => Ok(health_check(state)),

        (&Method::GET, Route::Courses) => courses::handle_list_courses(state, &params).await,
        (&Method::GET, Route::PopularCourses) => {
            courses::handle_popular_courses(state, &params).await
        }
        (&Method::GET, Route::Course(id)) => courses::handle_get_course(state, id).await,
        (&Method::GET, Route::Categories) => courses::handle_categories(state).await,
        (&Method::GET, Route::Category(group)) => courses::handle_category(state, group).await,

        (&Method::GET, Route::Packages) => packages::handle_list_packages(state, &params).await,
        (&Method::GET, Route::PopularPackages) => {
            packages::handle_popular_packages(state, &params).await
        }
        (&Method::GET, Route::Package(id)) => packages::handle_get_package(state, id).await,

        (&Method::POST, Route::Register) => auth_routes::handle_register(state, &body).await,
        (&Method::POST, Route::Login) => auth_routes::handle_login(state, &body).await,

        (&Method::POST, Route::Users) => users::handle_upsert_user(state, &body).await,
        (&Method::GET, Route::User(id)) => users::handle_get_user(state, id).await,
        (&Method::POST, Route::Enroll { user_id, package_id }) => {
            users::handle_enroll(state, user_id, package_id).await
        }
        (&Method::GET, Route::Progress { user_id, course_id }) => {
            users::handle_get_progress(state, user_id, course_id).await
        }
        (&Method::POST, Route::Progress { user_id, course_id }) => {
            users::handle_record_progress(state, user_id, course_id, &body).await
        }

        (&Method::GET, Route::Dashboard) => analytics::handle_dashboard(state).await,

        // Known path, wrong method
        _ => return method_not_allowed_response(),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        assert_eq!(Route::parse("/health"), Some(Route::Health));
        assert_eq!(Route::parse("/courses/"), Some(Route::Courses));
        assert_eq!(Route::parse("/courses/popular"), Some(Route::PopularCourses));
        assert_eq!(
            Route::parse("/videolib/asl-101"),
            Some(Route::Course("asl-101".into()))
        );
        assert_eq!(
            Route::parse("/categories/15+"),
            Some(Route::Category("15+".into()))
        );
        assert_eq!(
            Route::parse("/users/u1/progress/c%201"),
            Some(Route::Progress {
                user_id: "u1".into(),
                course_id: "c 1".into(),
            })
        );
        assert_eq!(Route::parse("/users/u1/enroll"), None);
        assert_eq!(Route::parse("/nope"), None);
    }
}
