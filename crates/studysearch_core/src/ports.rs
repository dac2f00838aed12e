//! crates/studysearch_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client views depend on.
//! These traits form the boundary between the views and the remote backend,
//! allowing the views to be driven by in-memory fakes in tests and by the
//! HTTP adapter in the binary.

use async_trait::async_trait;

use crate::domain::{
    AdminMetrics, AdminUser, Document, DocumentPage, DocumentQuery, EvaluationMetrics,
    EvaluationReport, LoginReply, PdfUpload, Preferences, QaPair, QueryAnswer, RefreshedTokens,
    SignUpReply, SignUpRequest,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, storage).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The session could not be renewed and has been torn down.
    #[error("Session expired, please log in again")]
    SessionExpired,
    /// The server answered with a non-success status.
    #[error("Request rejected with status {status}")]
    Rejected { status: u16, detail: Option<String> },
    #[error("Transport error: {0}")]
    Transport(String),
}

impl PortError {
    /// Server-provided detail text, when the failure carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            PortError::Rejected {
                detail: Some(detail),
                ..
            } => Some(detail.as_str()),
            _ => None,
        }
    }

    /// True when the failure means the endpoint does not exist server-side.
    pub fn is_missing_endpoint(&self) -> bool {
        match self {
            PortError::NotFound(_) => true,
            PortError::Rejected { status, .. } => matches!(status, 404 | 405 | 501),
            _ => false,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Posts credentials without any bearer token.
    async fn login(&self, email: &str, password: &str) -> PortResult<LoginReply>;

    async fn sign_up(&self, request: &SignUpRequest) -> PortResult<SignUpReply>;

    /// Invalidates the current tokens server-side.
    async fn logout(&self) -> PortResult<()>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> PortResult<RefreshedTokens>;
}

#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn upload_pdf(&self, upload: &PdfUpload) -> PortResult<()>;

    /// Asks a question against a single indexed document.
    async fn query(&self, question: &str, document_id: &str) -> PortResult<QueryAnswer>;

    /// The legacy, non-paginated store listing.
    async fn list_documents(&self) -> PortResult<Vec<Document>>;

    async fn list_documents_filtered(&self, query: &DocumentQuery) -> PortResult<DocumentPage>;
}

#[async_trait]
pub trait PreferencesService: Send + Sync {
    async fn get_preferences(&self) -> PortResult<Preferences>;

    async fn save_preferences(&self, preferences: &Preferences) -> PortResult<()>;
}

#[async_trait]
pub trait EvaluationService: Send + Sync {
    /// Submits QA pairs for RAGAS scoring.
    async fn run_evaluation(&self, pairs: &[QaPair]) -> PortResult<EvaluationReport>;

    async fn get_metrics(&self) -> PortResult<EvaluationMetrics>;
}

#[async_trait]
pub trait AdminService: Send + Sync {
    async fn list_all_documents(&self) -> PortResult<Vec<Document>>;

    async fn get_metrics(&self) -> PortResult<AdminMetrics>;

    async fn list_users(&self) -> PortResult<Vec<AdminUser>>;
}

//=========================================================================================
// Credential Storage Port
//=========================================================================================

/// The three independent entries a session is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    User,
    AccessToken,
    RefreshToken,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [
        StorageKey::User,
        StorageKey::AccessToken,
        StorageKey::RefreshToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::User => "user",
            StorageKey::AccessToken => "accessToken",
            StorageKey::RefreshToken => "refreshToken",
        }
    }
}

/// Durable key/value storage for session credentials.
pub trait CredentialStore: Send + Sync {
    fn read(&self, key: StorageKey) -> PortResult<Option<String>>;

    fn write(&self, key: StorageKey, value: &str) -> PortResult<()>;

    fn remove(&self, key: StorageKey) -> PortResult<()>;
}
