//! services/client/src/views/state.rs
//!
//! Defines the application's shared state and the small pieces of view state
//! every screen reuses.

use std::sync::Arc;

use studysearch_core::ports::{
    AdminService, AuthService, DocumentService, EvaluationService, PortError, PreferencesService,
};

use crate::adapters::HttpBackend;
use crate::config::{Config, EndpointAvailability};
use crate::session::SessionStore;

//=========================================================================================
// AppState (Shared Across All Views)
//=========================================================================================

/// The shared application state, created once at startup and handed to every view.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionStore>,
    pub auth: Arc<dyn AuthService>,
    pub documents: Arc<dyn DocumentService>,
    pub preferences: Arc<dyn PreferencesService>,
    pub evaluation: Arc<dyn EvaluationService>,
    pub admin: Arc<dyn AdminService>,
}

impl AppState {
    /// Wires every port to the one HTTP backend.
    pub fn with_backend(
        config: Arc<Config>,
        session: Arc<SessionStore>,
        backend: Arc<HttpBackend>,
    ) -> Self {
        Self {
            config,
            session,
            auth: backend.clone(),
            documents: backend.clone(),
            preferences: backend.clone(),
            evaluation: backend.clone(),
            admin: backend,
        }
    }

    pub fn availability(&self) -> &EndpointAvailability {
        &self.config.availability
    }
}

//=========================================================================================
// Inline status messages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// A one-line success or error message shown inline on a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub kind: BannerKind,
    pub message: String,
}

impl StatusBanner {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }
}

/// The server's detail text when it sent one, else the screen's generic message.
pub(crate) fn failure_message(error: &PortError, fallback: &str) -> String {
    error
        .detail()
        .filter(|detail| !detail.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_prefers_server_detail() {
        let rejected = PortError::Rejected {
            status: 400,
            detail: Some("File too large".into()),
        };
        assert_eq!(failure_message(&rejected, "Failed"), "File too large");
        assert_eq!(
            failure_message(&PortError::Transport("refused".into()), "Failed"),
            "Failed"
        );
        let blank = PortError::Rejected {
            status: 500,
            detail: Some("  ".into()),
        };
        assert_eq!(failure_message(&blank, "Failed"), "Failed");
    }
}
