use std::fmt;

use tokio::sync::watch;

use super::verifier::SessionVerifier;
use crate::models::session::{Role, Session};

/// Redirect chains longer than this are cut off.
const MAX_REDIRECTS: usize = 4;

/// Every view the app can show.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    AdminLogin,
    Dashboard,
    Profile,
    AdminDashboard,
    AdminProfile,
    AdminStudent(String),
    AdminCourses(String),
    Logout,
    AdminLogoutLogin,
    NotFound(String),
}

/// What a route requires of the session before it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Rendered without verification.
    Public,
    /// Login and registration: signed-in users go to their dashboard.
    GuestOnly,
    Authenticated,
    Role(Role),
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Login,
            ["register"] => Route::Register,
            ["dashboard"] => Route::Dashboard,
            ["profile"] => Route::Profile,
            ["logout"] => Route::Logout,
            ["admin", "login"] => Route::AdminLogin,
            ["admin", "dashboard"] => Route::AdminDashboard,
            ["admin", "profile"] => Route::AdminProfile,
            ["admin", "students", id] => Route::AdminStudent(id.to_string()),
            ["admin", "courses", id] => Route::AdminCourses(id.to_string()),
            ["admin", "logout", "login"] => Route::AdminLogoutLogin,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/".into(),
            Route::Register => "/register".into(),
            Route::AdminLogin => "/admin/login".into(),
            Route::Dashboard => "/dashboard".into(),
            Route::Profile => "/profile".into(),
            Route::AdminDashboard => "/admin/dashboard".into(),
            Route::AdminProfile => "/admin/profile".into(),
            Route::AdminStudent(id) => format!("/admin/students/{id}"),
            Route::AdminCourses(id) => format!("/admin/courses/{id}"),
            Route::Logout => "/logout".into(),
            Route::AdminLogoutLogin => "/admin/logout/login".into(),
            Route::NotFound(path) => path.clone(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Register | Route::AdminLogin => Access::GuestOnly,
            Route::Dashboard | Route::Profile => Access::Authenticated,
            Route::AdminDashboard
            | Route::AdminProfile
            | Route::AdminStudent(_)
            | Route::AdminCourses(_) => Access::Role(Role::Admin),
            Route::Logout | Route::AdminLogoutLogin | Route::NotFound(_) => Access::Public,
        }
    }

    /// Landing view for a signed-in role.
    pub fn dashboard_for(role: Option<Role>) -> Route {
        match role {
            Some(Role::Admin) => Route::AdminDashboard,
            _ => Route::Dashboard,
        }
    }

    /// Entry view for a portal.
    pub fn login_for(role: Role) -> Route {
        match role {
            Role::Admin => Route::AdminLogin,
            Role::Student => Route::Login,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Render,
    Redirect(Route),
}

/// Pure guard decision for a verified session.
pub fn decide(route: &Route, session: &Session) -> Decision {
    match route.access() {
        Access::Public => Decision::Render,
        Access::GuestOnly if session.is_authenticated => {
            Decision::Redirect(Route::dashboard_for(session.role))
        }
        Access::GuestOnly => Decision::Render,
        Access::Authenticated | Access::Role(_) if !session.is_authenticated => {
            Decision::Redirect(Route::Login)
        }
        Access::Authenticated => Decision::Render,
        Access::Role(required) if session.role == Some(required) => Decision::Render,
        Access::Role(_) => Decision::Redirect(Route::dashboard_for(session.role)),
    }
}

/// What the view layer should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// Verification in flight; nothing protected is shown.
    Loading,
    Render(Route),
    Redirect(Route),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub state: GuardState,
    /// `None` for public routes, which are not verified.
    pub session: Option<Session>,
}

/// Gates every navigation on a fresh session verification.
pub struct RouteGuard {
    verifier: SessionVerifier,
    state: watch::Sender<GuardState>,
}

impl RouteGuard {
    pub fn new(verifier: SessionVerifier) -> Self {
        let (state, _) = watch::channel(GuardState::Loading);
        Self { verifier, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> GuardState {
        self.state.borrow().clone()
    }

    /// One navigation step: `Loading`, then `Render` or `Redirect`.
    pub async fn navigate(&self, path: &str) -> Navigation {
        let route = Route::parse(path);
        if route.access() == Access::Public {
            return self.publish(GuardState::Render(route), None);
        }

        self.state.send_replace(GuardState::Loading);
        let session = self.verifier.verify().await;
        let state = match decide(&route, &session) {
            Decision::Render => GuardState::Render(route),
            Decision::Redirect(to) => {
                tracing::debug!(from = %route, %to, "guard redirect");
                GuardState::Redirect(to)
            }
        };
        self.publish(state, Some(session))
    }

    /// Navigate and follow redirects, re-verifying at each hop.
    pub async fn follow(&self, path: &str) -> Navigation {
        let mut nav = self.navigate(path).await;
        for _ in 0..MAX_REDIRECTS {
            match &nav.state {
                GuardState::Redirect(to) => nav = self.navigate(&to.path()).await,
                _ => break,
            }
        }
        nav
    }

    fn publish(&self, state: GuardState, session: Option<Session>) -> Navigation {
        self.state.send_replace(state.clone());
        Navigation { state, session }
    }
}
