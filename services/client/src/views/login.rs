//! services/client/src/views/login.rs

use studysearch_core::domain::{LoginReply, SessionState};
use tracing::{info, warn};

use crate::views::shell::Route;
use crate::views::state::{failure_message, AppState};

/// Shown when the server answered but did not accept the credentials.
pub const LOGIN_REJECTED: &str = "Login failed. Please try again.";
/// Shown when the request itself failed.
pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials and try again.";

#[derive(Debug, Default)]
pub struct LoginView {
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub in_flight: bool,
}

impl LoginView {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Submits the credentials. Returns the landing route on success; on
    /// failure the session stays anonymous and `error` is set.
    pub async fn submit(&mut self, state: &AppState) -> Option<Route> {
        self.error = None;
        self.in_flight = true;
        let outcome = state.auth.login(self.email.trim(), &self.password).await;
        self.in_flight = false;

        match outcome {
            Ok(LoginReply {
                status: Some(200),
                results: Some(results),
                ..
            }) => match state.session.establish(results) {
                Ok(session) => {
                    self.password.clear();
                    Some(Route::landing(SessionState::of(Some(&session))))
                }
                Err(e) => {
                    self.error = Some(failure_message(&e, LOGIN_FAILED));
                    None
                }
            },
            Ok(reply) => {
                info!("Login for {} rejected with status {:?}", self.email, reply.status);
                self.error = Some(
                    reply
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| LOGIN_REJECTED.to_string()),
                );
                None
            }
            Err(e) => {
                warn!("Login request failed: {}", e);
                self.error = Some(failure_message(&e, LOGIN_FAILED));
                None
            }
        }
    }
}
