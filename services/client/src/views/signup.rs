//! services/client/src/views/signup.rs

use studysearch_core::domain::SignUpRequest;
use tracing::{info, warn};

use crate::views::shell::Route;
use crate::views::state::{failure_message, AppState};

pub const MIN_PASSWORD_CHARS: usize = 6;

pub const PASSWORDS_DIFFER: &str = "Passwords do not match. Please try again.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters long.";
pub const SIGN_UP_REJECTED: &str = "Sign up failed. Please try again.";
pub const SIGN_UP_FAILED: &str = "Sign up failed. Please check your information and try again.";

#[derive(Debug, Default)]
pub struct SignUpView {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub error: Option<String>,
    pub in_flight: bool,
}

impl SignUpView {
    /// Local checks run before anything is sent.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.password != self.confirm_password {
            return Err(PASSWORDS_DIFFER);
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(PASSWORD_TOO_SHORT);
        }
        Ok(())
    }

    /// Returns `Route::Login` once the account exists.
    pub async fn submit(&mut self, state: &AppState) -> Option<Route> {
        self.error = None;
        if let Err(message) = self.validate() {
            self.error = Some(message.to_string());
            return None;
        }

        let request = SignUpRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        };
        self.in_flight = true;
        let outcome = state.auth.sign_up(&request).await;
        self.in_flight = false;

        match outcome {
            Ok(reply) if matches!(reply.status, Some(200) | Some(201)) => {
                info!("Account created for {}", request.email);
                Some(Route::Login)
            }
            Ok(reply) => {
                self.error = Some(
                    reply
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| SIGN_UP_REJECTED.to_string()),
                );
                None
            }
            Err(e) => {
                warn!("Sign-up request failed: {}", e);
                self.error = Some(failure_message(&e, SIGN_UP_FAILED));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fakes::{app_state, FakeBackend};
    use std::sync::Arc;
    use studysearch_core::domain::SignUpReply;
    use studysearch_core::ports::PortError;

    fn form(password: &str, confirm: &str) -> SignUpView {
        SignUpView {
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
            ..SignUpView::default()
        }
    }

    #[tokio::test]
    async fn validation_runs_before_any_request() {
        let fake = Arc::new(FakeBackend::default());
        let state = app_state(fake.clone());

        let mut view = form("secret1", "secret2");
        assert_eq!(view.submit(&state).await, None);
        assert_eq!(view.error.as_deref(), Some(PASSWORDS_DIFFER));

        let mut view = form("abc", "abc");
        assert_eq!(view.submit(&state).await, None);
        assert_eq!(view.error.as_deref(), Some(PASSWORD_TOO_SHORT));

        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn created_account_routes_to_login() {
        for status in [200, 201] {
            let fake = Arc::new(FakeBackend::default());
            *fake.sign_up.lock().unwrap() = Ok(SignUpReply {
                status: Some(status),
                message: None,
            });
            let state = app_state(fake);
            let mut view = form("secret1", "secret1");
            assert_eq!(view.submit(&state).await, Some(Route::Login));
            assert_eq!(view.error, None);
        }
    }

    #[tokio::test]
    async fn failures_show_message_detail_or_fallback() {
        let fake = Arc::new(FakeBackend::default());
        *fake.sign_up.lock().unwrap() = Ok(SignUpReply {
            status: Some(400),
            message: None,
        });
        let state = app_state(fake.clone());
        let mut view = form("secret1", "secret1");
        view.submit(&state).await;
        assert_eq!(view.error.as_deref(), Some(SIGN_UP_REJECTED));

        *fake.sign_up.lock().unwrap() = Err(PortError::Rejected {
            status: 400,
            detail: Some("Email already registered".into()),
        });
        view.submit(&state).await;
        assert_eq!(view.error.as_deref(), Some("Email already registered"));

        *fake.sign_up.lock().unwrap() = Err(PortError::Transport("refused".into()));
        view.submit(&state).await;
        assert_eq!(view.error.as_deref(), Some(SIGN_UP_FAILED));
    }
}
