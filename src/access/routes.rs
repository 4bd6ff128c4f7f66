//! Route table and navigation dispatch
//!
//! Maps a client path to a view and decides, from the cached access state,
//! whether that view renders or the client navigates elsewhere.

use crate::access::gate::{GateDecision, resolve};
use crate::baas::Role;
use crate::config::RoutesConfig;
use crate::freshness::AccessState;
use std::fmt;
use tracing::debug;

/// Views known to the client router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    AuthCallback,
    Pending,
    StudentCalendar,
    StudentAbsence,
    StudentProfile,
    StudentProfileEdit,
    TeacherDashboard,
    TeacherStudents,
    TeacherAbsences,
    TeacherCalendar { student_id: String },
    TeacherWeekly,
    TeacherTeachers,
    TeacherProfile,
    TeacherProfileEdit,
    NotFound,
}

impl View {
    /// Match a path (query string and trailing slash ignored).
    /// `None` means the path is the root, which has no view of its own.
    pub fn from_path(path: &str) -> Option<View> {
        let trimmed = normalize(path);
        if trimmed.is_empty() {
            return None;
        }

        let segments: Vec<&str> = trimmed.trim_start_matches('/').split('/').collect();

        let view = match segments.as_slice() {
            ["login"] => View::Login,
            ["auth", "callback"] => View::AuthCallback,
            ["pending"] => View::Pending,
            ["student", "calendar"] => View::StudentCalendar,
            ["student", "absence"] => View::StudentAbsence,
            ["student", "profile"] => View::StudentProfile,
            ["student", "profile", "edit"] => View::StudentProfileEdit,
            ["teacher"] => View::TeacherDashboard,
            ["teacher", "students"] => View::TeacherStudents,
            ["teacher", "absences"] => View::TeacherAbsences,
            ["teacher", "calendar", id] if !id.is_empty() => View::TeacherCalendar {
                student_id: (*id).to_string(),
            },
            ["teacher", "weekly"] => View::TeacherWeekly,
            ["teacher", "teachers"] => View::TeacherTeachers,
            ["teacher", "profile"] => View::TeacherProfile,
            ["teacher", "profile", "edit"] => View::TeacherProfileEdit,
            _ => View::NotFound,
        };

        Some(view)
    }

    /// Role a view is restricted to, if any
    pub fn required_role(&self) -> Option<Role> {
        match self {
            View::StudentCalendar
            | View::StudentAbsence
            | View::StudentProfile
            | View::StudentProfileEdit => Some(Role::Student),
            View::TeacherDashboard
            | View::TeacherStudents
            | View::TeacherAbsences
            | View::TeacherCalendar { .. }
            | View::TeacherWeekly
            | View::TeacherTeachers
            | View::TeacherProfile
            | View::TeacherProfileEdit => Some(Role::Teacher),
            View::Login | View::AuthCallback | View::Pending | View::NotFound => None,
        }
    }

    /// Whether the view sits behind the access gate
    pub fn is_protected(&self) -> bool {
        self.required_role().is_some()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::TeacherCalendar { student_id } => write!(f, "TeacherCalendar({})", student_id),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Path without query, fragment or trailing slash
fn normalize(path: &str) -> &str {
    path.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
}

/// A home path that already names a view for its role keeps that view
fn home_view(path: &str, role: Role, fallback: View) -> View {
    View::from_path(path)
        .filter(|view| view.required_role() == Some(role))
        .unwrap_or(fallback)
}

/// What the client should do for a requested path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Access state still loading; show a placeholder
    Loading,
    Render(View),
    Redirect(String),
}

/// Client-side router applying the access gate to protected views
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: RoutesConfig,
}

impl Router {
    pub fn new(routes: RoutesConfig) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RoutesConfig {
        &self.routes
    }

    /// Resolve a path against the current access state
    pub fn dispatch(&self, path: &str, state: &AccessState) -> Navigation {
        let navigation = match self.view_for(path) {
            None => Navigation::Redirect(self.routes.login.clone()),
            Some(view) => self.navigate(view, state),
        };

        debug!(path, navigation = ?navigation, "Dispatched");
        navigation
    }

    /// Configured route paths take precedence over the built-in table
    fn view_for(&self, path: &str) -> Option<View> {
        let path = normalize(path);
        if !path.is_empty() {
            let configured = [
                (&self.routes.login, View::Login),
                (&self.routes.pending, View::Pending),
                (
                    &self.routes.teacher_home,
                    home_view(&self.routes.teacher_home, Role::Teacher, View::TeacherStudents),
                ),
                (
                    &self.routes.student_home,
                    home_view(&self.routes.student_home, Role::Student, View::StudentCalendar),
                ),
            ];
            if let Some((_, view)) = configured
                .into_iter()
                .find(|(route, _)| normalize(route) == path)
            {
                return Some(view);
            }
        }
        View::from_path(path)
    }

    fn navigate(&self, view: View, state: &AccessState) -> Navigation {
        match view {
            View::AuthCallback => self.after_callback(state),
            View::Pending => self.pending(state),
            view if view.is_protected() => {
                if state.loading {
                    return Navigation::Loading;
                }
                match resolve(
                    state.session.as_ref(),
                    state.profile.as_ref(),
                    view.required_role(),
                ) {
                    GateDecision::Render => Navigation::Render(view),
                    GateDecision::Redirect(destination) => {
                        Navigation::Redirect(self.routes.path_for(destination).to_string())
                    }
                }
            }
            view => Navigation::Render(view),
        }
    }

    /// Landing page after the auth redirect: signed in goes to the student
    /// home (the gate bounces teachers onward), otherwise back to login.
    fn after_callback(&self, state: &AccessState) -> Navigation {
        if state.loading {
            Navigation::Loading
        } else if state.session.is_some() {
            Navigation::Redirect(self.routes.student_home.clone())
        } else {
            Navigation::Redirect(self.routes.login.clone())
        }
    }

    /// The waiting page leaves as soon as the profile is approved
    fn pending(&self, state: &AccessState) -> Navigation {
        if state.loading {
            return Navigation::Loading;
        }
        match (&state.session, &state.profile) {
            (None, _) => Navigation::Redirect(self.routes.login.clone()),
            (Some(_), Some(profile)) if profile.approved => Navigation::Redirect(
                self.routes
                    .path_for(crate::access::Destination::RoleHome(profile.role))
                    .to_string(),
            ),
            _ => Navigation::Render(View::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(View::from_path("/"), None);
        assert_eq!(View::from_path(""), None);
        assert_eq!(View::from_path("/login"), Some(View::Login));
        assert_eq!(View::from_path("/student/calendar/"), Some(View::StudentCalendar));
        assert_eq!(
            View::from_path("/teacher/calendar/abc?order=class"),
            Some(View::TeacherCalendar {
                student_id: "abc".into()
            })
        );
        assert_eq!(View::from_path("/teacher/calendar"), Some(View::NotFound));
        assert_eq!(View::from_path("/nope"), Some(View::NotFound));
    }

    #[test]
    fn test_required_roles() {
        assert_eq!(View::StudentAbsence.required_role(), Some(Role::Student));
        assert_eq!(View::TeacherWeekly.required_role(), Some(Role::Teacher));
        assert!(!View::Pending.is_protected());
        assert!(!View::NotFound.is_protected());
    }

    #[test]
    fn test_root_redirects_to_login() {
        let router = Router::default();
        assert_eq!(
            router.dispatch("/", &AccessState::default()),
            Navigation::Redirect("/login".into())
        );
    }

    #[test]
    fn test_public_views_render_while_loading() {
        let router = Router::default();
        let state = AccessState {
            loading: true,
            ..Default::default()
        };
        assert_eq!(
            router.dispatch("/login", &state),
            Navigation::Render(View::Login)
        );
        assert_eq!(router.dispatch("/student/absence", &state), Navigation::Loading);
    }
}
