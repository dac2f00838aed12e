pub mod domain;
pub mod ports;

pub use domain::{
    AdminMetrics, AdminUser, AuthTokens, Citation, Conversation, Document, DocumentPage,
    DocumentQuery, EvaluationMetrics, EvaluationReport, LoginReply, LoginResults, Message,
    MessageRole, PageInfo, PdfUpload, Preferences, QaPair, QueryAnswer, RefreshedTokens,
    RemoteUser, Role, Session, SessionState, SignUpReply, SignUpRequest, Tone, UserProfile,
};
pub use ports::{
    AdminService, AuthService, CredentialStore, DocumentService, EvaluationService, PortError,
    PortResult, PreferencesService, StorageKey,
};
