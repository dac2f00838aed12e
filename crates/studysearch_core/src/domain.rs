//! crates/studysearch_core/src/domain.rs
//!
//! Defines the pure, core data structures for the client.
//! These structs are independent of any wire or storage format; the adapters
//! map their own serde records into them.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Session
//=========================================================================================

/// The client-side role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    SuperAdmin,
}

impl Role {
    /// The only server role name that grants the admin route set.
    pub const ADMIN_ROLE_NAME: &'static str = "Super Admin";
    /// Role name assumed when the server omits one.
    pub const DEFAULT_ROLE_NAME: &'static str = "Regular User";

    /// Maps the server-supplied role name to a client role.
    pub fn from_role_name(name: &str) -> Self {
        if name == Self::ADMIN_ROLE_NAME {
            Role::SuperAdmin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::SuperAdmin => "superadmin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "superadmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

/// The identity half of a session, as persisted under the `user` key.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
    pub role_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// An authenticated session. Never partially populated.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: UserProfile,
    pub tokens: AuthTokens,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.user.role == Role::SuperAdmin
    }

    /// Name shown in the shell header: full name, first name, email, then "User".
    pub fn display_name(&self) -> &str {
        [
            self.user.full_name.as_str(),
            self.user.first_name.as_str(),
            self.user.email.as_str(),
        ]
        .into_iter()
        .find(|candidate| !candidate.trim().is_empty())
        .unwrap_or("User")
    }
}

/// The three states the session store can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    AuthenticatedUser,
    AuthenticatedAdmin,
}

impl SessionState {
    pub fn of(session: Option<&Session>) -> Self {
        match session {
            None => SessionState::Anonymous,
            Some(s) if s.is_admin() => SessionState::AuthenticatedAdmin,
            Some(_) => SessionState::AuthenticatedUser,
        }
    }
}

/// The user object returned inside a successful login reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteUser {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginResults {
    pub tokens: AuthTokens,
    pub user: RemoteUser,
}

/// What the backend answered to a login that reached it with a 2xx status.
/// The body carries its own `status` which still has to be checked.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginReply {
    pub status: Option<u16>,
    pub message: Option<String>,
    pub results: Option<LoginResults>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpReply {
    pub status: Option<u16>,
    pub message: Option<String>,
}

/// Tokens handed back by the refresh endpoint. `refresh` is only present when
/// the server rotates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access: String,
    pub refresh: Option<String>,
}

//=========================================================================================
// Documents
//=========================================================================================

/// A server-side indexed unit corresponding to one uploaded PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub file_url: Option<String>,
}

/// Pagination as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub page_info: PageInfo,
}

/// Parameters of the paged, filtered store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub page: u32,
    pub page_size: u32,
    pub title: Option<String>,
}

/// A PDF ready to be submitted to the upload endpoint.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub file_name: String,
    pub title: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl PdfUpload {
    pub const PDF_CONTENT_TYPE: &'static str = "application/pdf";
    pub const UNTITLED: &'static str = "Untitled Document";

    pub fn is_pdf(&self) -> bool {
        self.content_type == Self::PDF_CONTENT_TYPE
    }

    /// The title sent with the upload. Never empty.
    pub fn resolved_title(&self) -> String {
        [self.title.as_deref(), Some(self.file_name.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .unwrap_or(Self::UNTITLED)
            .to_string()
    }
}

//=========================================================================================
// Conversations
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// A grounding chunk returned alongside an answer, kept as opaque text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub text: String,
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub citations: Vec<Citation>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into(), Vec::new())
    }

    pub fn assistant(content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self::new(MessageRole::Assistant, content.into(), citations)
    }

    fn new(role: MessageRole, content: String, citations: Vec<Citation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            citations,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub document_id: String,
    pub document_title: String,
    pub timestamp: DateTime<Utc>,
}

impl Conversation {
    pub const TITLE_MAX_CHARS: usize = 50;

    /// Derives a conversation title from its first query.
    pub fn title_from_query(query: &str) -> String {
        let query = query.trim();
        if query.chars().count() <= Self::TITLE_MAX_CHARS {
            return query.to_string();
        }
        let truncated: String = query.chars().take(Self::TITLE_MAX_CHARS).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// The answer half of a query exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub answer: Option<String>,
    pub citations: Vec<Citation>,
}

//=========================================================================================
// Preferences
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Academic,
    Friendly,
    Concise,
    Detailed,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Academic, Tone::Friendly, Tone::Concise, Tone::Detailed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Academic => "academic",
            Tone::Friendly => "friendly",
            Tone::Concise => "concise",
            Tone::Detailed => "detailed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tone::Academic => "Formal and scholarly",
            Tone::Friendly => "Warm and approachable",
            Tone::Concise => "Brief and to the point",
            Tone::Detailed => "Comprehensive explanations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preferences {
    pub name: String,
    pub tone: Tone,
}

//=========================================================================================
// Evaluation
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// A pair is submitted only when both sides carry text.
    pub fn is_complete(&self) -> bool {
        !self.question.trim().is_empty() && !self.answer.trim().is_empty()
    }
}

/// RAGAS scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvaluationMetrics {
    pub relevancy: f64,
    pub recall: f64,
    pub faithfulness: f64,
    pub overall: f64,
}

impl EvaluationMetrics {
    pub const QUALITY_THRESHOLD: f64 = 0.6;

    pub fn meets_threshold(score: f64) -> bool {
        score >= Self::QUALITY_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub metrics: EvaluationMetrics,
    pub message: Option<String>,
}

//=========================================================================================
// Admin
//=========================================================================================

/// System metrics as far as the server reported them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdminMetrics {
    pub total_stores: Option<u64>,
    pub total_queries: u64,
    pub avg_response_time_ms: f64,
    pub accuracy_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role_name: Option<String>,
}
