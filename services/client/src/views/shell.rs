//! services/client/src/views/shell.rs
//!
//! The top-level chrome: greeting, navigation and route gating by session
//! state and role.

use std::sync::Arc;

use studysearch_core::domain::SessionState;
use studysearch_core::ports::AuthService;
use tracing::debug;

use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    SignUp,
    Documents,
    Settings,
    Evaluation,
    Admin,
}

/// Navigation for regular users.
pub const USER_NAV: [Route; 3] = [Route::Documents, Route::Settings, Route::Evaluation];
/// Navigation for super admins. Disjoint from `USER_NAV`.
pub const ADMIN_NAV: [Route; 1] = [Route::Admin];

impl Route {
    pub fn label(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::SignUp => "Sign Up",
            Route::Documents => "Documents",
            Route::Settings => "Settings",
            Route::Evaluation => "Evaluation",
            Route::Admin => "Dashboard",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::SignUp)
    }

    /// Where a session in `state` lands by default.
    pub fn landing(state: SessionState) -> Route {
        match state {
            SessionState::Anonymous => Route::Login,
            SessionState::AuthenticatedUser => Route::Documents,
            SessionState::AuthenticatedAdmin => Route::Admin,
        }
    }

    pub fn allowed_for(&self, state: SessionState) -> bool {
        match state {
            SessionState::Anonymous => self.is_public(),
            SessionState::AuthenticatedUser => USER_NAV.contains(self),
            SessionState::AuthenticatedAdmin => ADMIN_NAV.contains(self),
        }
    }
}

pub struct Shell {
    session: Arc<SessionStore>,
    route: Route,
}

impl Shell {
    pub fn new(session: Arc<SessionStore>) -> Self {
        let route = Route::landing(session.state());
        Self { session, route }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn nav_items(&self) -> &'static [Route] {
        match self.session.state() {
            SessionState::Anonymous => &[],
            SessionState::AuthenticatedUser => &USER_NAV,
            SessionState::AuthenticatedAdmin => &ADMIN_NAV,
        }
    }

    /// The route actually shown for `requested` under the current session.
    pub fn resolve(&self, requested: Route) -> Route {
        let state = self.session.state();
        if requested.allowed_for(state) {
            requested
        } else {
            Route::landing(state)
        }
    }

    pub fn navigate(&mut self, requested: Route) -> Route {
        let resolved = self.resolve(requested);
        if resolved != requested {
            debug!("Route {:?} redirected to {:?}", requested, resolved);
        }
        self.route = resolved;
        resolved
    }

    /// Re-applies gating after the session changed underneath the shell. An
    /// expired session torn down by the HTTP adapter lands on login.
    pub fn sync(&mut self) -> Route {
        self.navigate(self.route)
    }

    pub fn greeting(&self) -> Option<String> {
        self.session
            .current()
            .map(|session| format!("Welcome, {}", session.display_name()))
    }

    pub fn shows_admin_badge(&self) -> bool {
        self.session.is_admin()
    }

    pub async fn logout(&mut self, auth: &dyn AuthService) -> Route {
        self.session.logout(auth).await;
        self.route = Route::Login;
        self.route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryCredentialStore;
    use crate::session::tests::login_results;
    use crate::views::fakes::FakeBackend;

    fn shell_for(role_name: Option<&str>) -> Shell {
        let session = Arc::new(SessionStore::hydrate(Arc::new(MemoryCredentialStore::new())));
        if let Some(name) = role_name {
            session.establish(login_results(Some(name))).unwrap();
        }
        Shell::new(session)
    }

    #[test]
    fn anonymous_users_only_reach_public_routes() {
        let mut shell = shell_for(None);
        assert_eq!(shell.route(), Route::Login);
        assert_eq!(shell.navigate(Route::Documents), Route::Login);
        assert_eq!(shell.navigate(Route::Admin), Route::Login);
        assert_eq!(shell.navigate(Route::SignUp), Route::SignUp);
        assert!(shell.nav_items().is_empty());
        assert_eq!(shell.greeting(), None);
    }

    #[test]
    fn route_sets_are_mutually_exclusive() {
        let mut user = shell_for(Some("Regular User"));
        assert_eq!(user.route(), Route::Documents);
        assert_eq!(user.navigate(Route::Admin), Route::Documents);
        assert_eq!(user.navigate(Route::Evaluation), Route::Evaluation);
        assert_eq!(user.nav_items(), &USER_NAV);
        assert!(!user.shows_admin_badge());

        let mut admin = shell_for(Some("Super Admin"));
        assert_eq!(admin.route(), Route::Admin);
        assert_eq!(admin.navigate(Route::Settings), Route::Admin);
        assert_eq!(admin.nav_items(), &ADMIN_NAV);
        assert!(admin.shows_admin_badge());
        assert!(USER_NAV.iter().all(|r| !ADMIN_NAV.contains(r)));
    }

    #[test]
    fn logged_in_users_skip_the_login_screen() {
        let mut shell = shell_for(Some("Regular User"));
        assert_eq!(shell.navigate(Route::Login), Route::Documents);
    }

    #[test]
    fn greeting_uses_the_display_name() {
        let shell = shell_for(Some("Regular User"));
        assert_eq!(shell.greeting().as_deref(), Some("Welcome, A B"));
    }

    #[test]
    fn sync_follows_an_external_teardown() {
        let mut shell = shell_for(Some("Regular User"));
        shell.navigate(Route::Settings);
        shell.session.teardown();
        assert_eq!(shell.sync(), Route::Login);
    }

    #[tokio::test]
    async fn logout_calls_backend_and_lands_on_login() {
        let mut shell = shell_for(Some("Super Admin"));
        let fake = FakeBackend::default();
        assert_eq!(shell.logout(&fake).await, Route::Login);
        assert_eq!(fake.count("logout"), 1);
        assert_eq!(shell.greeting(), None);
    }
}
