//! services/client/src/adapters/records.rs
//!
//! "Impure" wire records for the backend's JSON bodies. Each record knows how
//! to turn itself into the matching domain type; the HTTP adapter never hands
//! a record to the views.
//!
//! The backend is lenient about shapes (enveloped or bare bodies, camelCase or
//! snake_case, ids as numbers or strings), so the records are too.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studysearch_core::domain::{
    AdminMetrics, AdminUser, AuthTokens, Citation, Document, DocumentPage, DocumentQuery,
    EvaluationMetrics, EvaluationReport, LoginReply, LoginResults, PageInfo, Preferences, QaPair,
    QueryAnswer, RefreshedTokens, RemoteUser, SignUpReply, Tone,
};
use studysearch_core::ports::{PortError, PortResult};

//=========================================================================================
// Helpers
//=========================================================================================

/// Accepts an id given either as a JSON string or a JSON number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Ok(Some(other.to_string())),
    }
}

/// Unwraps a `{ status, message, results: {...} }` envelope when present.
/// Only an object-valued `results` counts as an envelope; an array-valued one
/// is a paginated listing and is left alone.
pub(crate) fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if matches!(map.get("results"), Some(Value::Object(_))) => {
            map.remove("results").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: Value) -> PortResult<T> {
    serde_json::from_value(body)
        .map_err(|e| PortError::Unexpected(format!("unexpected response body: {}", e)))
}

/// The `message` or `detail` text of an error body.
pub(crate) fn error_detail(body: &Value) -> Option<String> {
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Serialize)]
pub(crate) struct LoginPayload<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SignUpPayload<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshPayload<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
struct RoleRecord {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RemoteUserRecord {
    #[serde(deserialize_with = "string_or_number", alias = "id")]
    pk: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    role: Option<RoleRecord>,
}

#[derive(Deserialize)]
struct LoginResultsRecord {
    access: String,
    refresh: String,
    user: RemoteUserRecord,
}

#[derive(Deserialize)]
pub(crate) struct LoginReplyRecord {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Option<Value>,
}

impl LoginReplyRecord {
    /// A `results` object that does not carry tokens and a user counts as missing.
    pub(crate) fn to_domain(self) -> LoginReply {
        let results = self
            .results
            .and_then(|value| serde_json::from_value::<LoginResultsRecord>(value).ok())
            .map(|r| LoginResults {
                tokens: AuthTokens {
                    access: r.access,
                    refresh: r.refresh,
                },
                user: RemoteUser {
                    user_id: r.user.pk,
                    email: r.user.email,
                    first_name: r.user.first_name,
                    last_name: r.user.last_name,
                    role_name: r.user.role.and_then(|role| role.name),
                },
            });
        LoginReply {
            status: self.status,
            message: self.message,
            results,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct SignUpReplyRecord {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

impl SignUpReplyRecord {
    pub(crate) fn to_domain(self) -> SignUpReply {
        SignUpReply {
            status: self.status,
            message: self.message,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RefreshRecord {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

impl RefreshRecord {
    pub(crate) fn to_domain(self) -> RefreshedTokens {
        RefreshedTokens {
            access: self.access,
            refresh: self.refresh,
        }
    }
}

//=========================================================================================
// Documents
//=========================================================================================

#[derive(Deserialize)]
pub(crate) struct StoreRecord {
    #[serde(default, deserialize_with = "opt_string_or_number", alias = "pk")]
    id: Option<String>,
    #[serde(default, alias = "name", alias = "store_name")]
    title: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<String>,
    #[serde(default, alias = "fileURL", alias = "fileUrl")]
    file_url: Option<String>,
}

/// Legacy listings mix bare store names with store objects.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum StoreEntry {
    Name(String),
    Record(StoreRecord),
}

impl StoreEntry {
    pub(crate) fn to_domain(self) -> Document {
        match self {
            StoreEntry::Name(name) => Document {
                id: name.clone(),
                title: name,
                status: None,
                created_at: None,
                file_url: None,
            },
            StoreEntry::Record(r) => {
                let title = r.title.unwrap_or_default();
                Document {
                    id: r.id.unwrap_or_else(|| title.clone()),
                    title,
                    status: r.status,
                    created_at: r.created_at,
                    file_url: r.file_url,
                }
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoreListRecord {
    Bare(Vec<StoreEntry>),
    Wrapped {
        #[serde(alias = "results", alias = "documents", alias = "data")]
        stores: Vec<StoreEntry>,
    },
}

/// Decodes `[...]`, `{ "stores": [...] }` and enveloped variants of both.
pub(crate) fn decode_store_list(body: Value) -> PortResult<Vec<Document>> {
    let body = unwrap_envelope(body);
    if body.is_null() {
        return Ok(Vec::new());
    }
    let record: StoreListRecord = decode(body)?;
    let entries = match record {
        StoreListRecord::Bare(entries) => entries,
        StoreListRecord::Wrapped { stores } => stores,
    };
    Ok(entries.into_iter().map(StoreEntry::to_domain).collect())
}

#[derive(Deserialize, Default)]
struct PaginationRecord {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default, alias = "pageSize")]
    page_size: Option<u32>,
    #[serde(default, alias = "totalCount", alias = "count", alias = "total")]
    total_count: Option<u64>,
    #[serde(default, alias = "hasNext")]
    has_next: Option<bool>,
    #[serde(default, alias = "hasPrevious")]
    has_previous: Option<bool>,
    #[serde(default)]
    next: Option<Value>,
    #[serde(default)]
    previous: Option<Value>,
}

impl PaginationRecord {
    /// Explicit flags win; DRF-style `next`/`previous` links are the fallback.
    fn to_domain(self, requested: &DocumentQuery) -> PageInfo {
        let link_present = |link: &Option<Value>| matches!(link, Some(v) if !v.is_null());
        PageInfo {
            page: self.page.unwrap_or(requested.page),
            page_size: self.page_size.unwrap_or(requested.page_size),
            total_count: self.total_count.unwrap_or(0),
            has_next: self.has_next.unwrap_or_else(|| link_present(&self.next)),
            has_previous: self
                .has_previous
                .unwrap_or_else(|| link_present(&self.previous)),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct StorePageRecord {
    #[serde(default, alias = "results", alias = "documents", alias = "data")]
    stores: Vec<StoreEntry>,
    #[serde(default)]
    pagination: Option<PaginationRecord>,
    #[serde(flatten)]
    inline: PaginationRecord,
}

impl StorePageRecord {
    pub(crate) fn to_domain(self, requested: &DocumentQuery) -> DocumentPage {
        let pagination = self.pagination.unwrap_or(self.inline);
        DocumentPage {
            documents: self.stores.into_iter().map(StoreEntry::to_domain).collect(),
            page_info: pagination.to_domain(requested),
        }
    }
}

//=========================================================================================
// Query
//=========================================================================================

#[derive(Serialize)]
pub(crate) struct QueryPayload<'a> {
    pub query: &'a str,
    pub document_id: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct QueryRecord {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    citations: Option<Vec<Value>>,
    #[serde(default)]
    retrieved_context: Option<Vec<Value>>,
    #[serde(default)]
    grounding_chunks: Option<Vec<Value>>,
}

impl QueryRecord {
    pub(crate) fn to_domain(self) -> QueryAnswer {
        let citations = self
            .citations
            .or(self.retrieved_context)
            .or(self.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .map(citation_from_value)
            .collect();
        QueryAnswer {
            answer: self.answer.or(self.response),
            citations,
        }
    }
}

/// Citations are opaque: use `text` or `content` when the chunk has one,
/// otherwise show the raw JSON.
fn citation_from_value(value: Value) -> Citation {
    let page = value.get("page").and_then(|page| match page {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    });
    let text = match &value {
        Value::String(s) => s.clone(),
        _ => ["text", "content"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
    };
    Citation { text, page }
}

//=========================================================================================
// Preferences
//=========================================================================================

#[derive(Serialize, Deserialize)]
pub(crate) struct PreferencesRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tone: Option<String>,
}

impl PreferencesRecord {
    pub(crate) fn from_domain(preferences: &Preferences) -> Self {
        Self {
            name: Some(preferences.name.clone()),
            tone: Some(preferences.tone.as_str().to_string()),
        }
    }

    /// Unknown or missing tones read as the default tone.
    pub(crate) fn to_domain(self) -> Preferences {
        Preferences {
            name: self.name.unwrap_or_default(),
            tone: self
                .tone
                .as_deref()
                .and_then(Tone::parse)
                .unwrap_or_default(),
        }
    }
}

//=========================================================================================
// Evaluation
//=========================================================================================

#[derive(Serialize)]
struct QaPairRecord<'a> {
    question: &'a str,
    answer: &'a str,
}

#[derive(Serialize)]
pub(crate) struct EvaluationPayload<'a> {
    qa_pairs: Vec<QaPairRecord<'a>>,
}

impl<'a> EvaluationPayload<'a> {
    pub(crate) fn from_domain(pairs: &'a [QaPair]) -> Self {
        Self {
            qa_pairs: pairs
                .iter()
                .map(|p| QaPairRecord {
                    question: &p.question,
                    answer: &p.answer,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize, Default)]
pub(crate) struct MetricsRecord {
    #[serde(default)]
    relevancy: f64,
    #[serde(default)]
    recall: f64,
    #[serde(default)]
    faithfulness: f64,
    #[serde(default)]
    overall: f64,
}

impl MetricsRecord {
    pub(crate) fn to_domain(self) -> EvaluationMetrics {
        EvaluationMetrics {
            relevancy: self.relevancy,
            recall: self.recall,
            faithfulness: self.faithfulness,
            overall: self.overall,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct EvaluationRecord {
    #[serde(default)]
    metrics: Option<MetricsRecord>,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    inline: MetricsRecord,
}

impl EvaluationRecord {
    /// The `metrics` object when present, otherwise the body itself.
    pub(crate) fn to_domain(self) -> EvaluationReport {
        EvaluationReport {
            metrics: self.metrics.unwrap_or(self.inline).to_domain(),
            message: self.message,
        }
    }
}

//=========================================================================================
// Admin
//=========================================================================================

#[derive(Deserialize)]
pub(crate) struct AdminMetricsRecord {
    #[serde(default)]
    total_stores: Option<u64>,
    #[serde(default)]
    total_queries: Option<u64>,
    #[serde(default)]
    avg_response_time: Option<f64>,
    #[serde(default)]
    accuracy_score: Option<f64>,
}

impl AdminMetricsRecord {
    pub(crate) fn to_domain(self) -> AdminMetrics {
        AdminMetrics {
            total_stores: self.total_stores,
            total_queries: self.total_queries.unwrap_or(0),
            avg_response_time_ms: self.avg_response_time.unwrap_or(0.0),
            accuracy_score: self.accuracy_score.unwrap_or(0.0),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct AdminUserRecord {
    #[serde(deserialize_with = "string_or_number", alias = "pk")]
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    role: Option<RoleRecord>,
}

impl AdminUserRecord {
    pub(crate) fn to_domain(self) -> AdminUser {
        let full_name = [self.first_name, self.last_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        AdminUser {
            user_id: self.id,
            email: self.email,
            full_name: (!full_name.is_empty()).then_some(full_name),
            role_name: self.role.and_then(|role| role.name),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AdminUserListRecord {
    Bare(Vec<AdminUserRecord>),
    Wrapped {
        #[serde(alias = "results", alias = "data")]
        users: Vec<AdminUserRecord>,
    },
}

pub(crate) fn decode_admin_users(body: Value) -> PortResult<Vec<AdminUser>> {
    let body = unwrap_envelope(body);
    if body.is_null() {
        return Ok(Vec::new());
    }
    let users = match decode::<AdminUserListRecord>(body)? {
        AdminUserListRecord::Bare(users) => users,
        AdminUserListRecord::Wrapped { users } => users,
    };
    Ok(users.into_iter().map(AdminUserRecord::to_domain).collect())
}
