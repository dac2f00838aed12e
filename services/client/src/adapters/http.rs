//! services/client/src/adapters/http.rs
//!
//! The HTTP adapter: the concrete implementation of every backend port. It
//! centralizes the base address, attaches the session's bearer token, and owns
//! the refresh-and-replay handling of 401 responses.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use studysearch_core::domain::{
    AdminMetrics, AdminUser, Document, DocumentPage, DocumentQuery, EvaluationMetrics,
    EvaluationReport, LoginReply, PdfUpload, Preferences, QaPair, QueryAnswer, RefreshedTokens,
    SignUpReply, SignUpRequest,
};
use studysearch_core::ports::{
    AdminService, AuthService, DocumentService, EvaluationService, PortError, PortResult,
    PreferencesService,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::adapters::endpoints;
use crate::adapters::records::{
    decode, decode_admin_users, decode_store_list, error_detail, unwrap_envelope,
    AdminMetricsRecord, EvaluationPayload, EvaluationRecord, LoginPayload, LoginReplyRecord,
    MetricsRecord, PreferencesRecord, QueryPayload, QueryRecord, RefreshPayload, RefreshRecord,
    SignUpPayload, SignUpReplyRecord, StorePageRecord,
};
use crate::config::RefreshPolicy;
use crate::session::SessionStore;

/// The result of a single authorized attempt.
#[derive(Debug)]
pub(crate) enum RequestOutcome {
    Ok(Value),
    /// A 401 on a first attempt: refresh the access token, then replay once.
    NeedsRefreshRetry,
    Failed(PortError),
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
    refresh_policy: RefreshPolicy,
}

impl HttpBackend {
    pub fn new(
        base_url: Url,
        session: Arc<SessionStore>,
        refresh_policy: RefreshPolicy,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("studysearch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            session,
            refresh_policy,
        })
    }

    fn endpoint(&self, path: &str) -> PortResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PortError::Unexpected(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Sends a request and reads its body. An empty body reads as `null`; a
    /// body that is not JSON is kept as a string.
    async fn send(&self, path: &str, request: RequestBuilder) -> PortResult<(StatusCode, Value)> {
        let response = request.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", path, e);
            PortError::Transport(e.to_string())
        })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;
        debug!("{} -> {}", path, status);

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, body))
    }

    fn classify(&self, path: &str, status: StatusCode, body: Value, retried: bool) -> RequestOutcome {
        if status.is_success() {
            return RequestOutcome::Ok(body);
        }
        match status {
            StatusCode::UNAUTHORIZED
                if !retried && self.refresh_policy == RefreshPolicy::Enabled =>
            {
                RequestOutcome::NeedsRefreshRetry
            }
            StatusCode::UNAUTHORIZED => RequestOutcome::Failed(PortError::Unauthorized),
            StatusCode::NOT_FOUND => RequestOutcome::Failed(PortError::NotFound(path.to_string())),
            _ => RequestOutcome::Failed(PortError::Rejected {
                status: status.as_u16(),
                detail: error_detail(&body),
            }),
        }
    }

    /// One authorized attempt, with the current access token attached.
    async fn attempt<F>(&self, path: &str, build: &F, retried: bool) -> RequestOutcome
    where
        F: Fn(&Client) -> PortResult<RequestBuilder>,
    {
        let mut request = match build(&self.client) {
            Ok(request) => request,
            Err(e) => return RequestOutcome::Failed(e),
        };
        if let Some(token) = self.session.access_token() {
            request = request.bearer_auth(token);
        }
        match self.send(path, request).await {
            Ok((status, body)) => self.classify(path, status, body, retried),
            Err(e) => RequestOutcome::Failed(e),
        }
    }

    /// Runs an authorized request, refreshing the token and replaying once on a 401.
    async fn execute<F>(&self, path: &str, build: F) -> PortResult<Value>
    where
        F: Fn(&Client) -> PortResult<RequestBuilder>,
    {
        match self.attempt(path, &build, false).await {
            RequestOutcome::Ok(body) => Ok(body),
            RequestOutcome::Failed(e) => Err(e),
            RequestOutcome::NeedsRefreshRetry => {
                self.refresh_access_token().await?;
                match self.attempt(path, &build, true).await {
                    RequestOutcome::Ok(body) => Ok(body),
                    RequestOutcome::Failed(e) => Err(e),
                    RequestOutcome::NeedsRefreshRetry => Err(PortError::Unauthorized),
                }
            }
        }
    }

    /// Renews the access token from the stored refresh token. Any failure
    /// tears the session down and reports `SessionExpired`.
    pub async fn refresh_access_token(&self) -> PortResult<()> {
        let Some(refresh_token) = self.session.refresh_token() else {
            warn!("Received 401 without a refresh token, ending session");
            self.session.teardown();
            return Err(PortError::SessionExpired);
        };
        let refreshed = self
            .refresh(&refresh_token)
            .await
            .and_then(|tokens| self.session.replace_tokens(tokens));
        match refreshed {
            Ok(()) => {
                info!("Access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!("Token refresh failed, ending session: {}", e);
                self.session.teardown();
                Err(PortError::SessionExpired)
            }
        }
    }

    /// Requests that must not carry a bearer token (login, sign-up, refresh).
    async fn send_public<T: Serialize + Sync + ?Sized>(&self, path: &str, payload: &T) -> PortResult<Value> {
        let url = self.endpoint(path)?;
        let (status, body) = self.send(path, self.client.post(url).json(payload)).await?;
        if status.is_success() {
            return Ok(body);
        }
        // A 401 here means bad credentials, not an expired session.
        Err(match status {
            StatusCode::NOT_FOUND => PortError::NotFound(path.to_string()),
            _ => PortError::Rejected {
                status: status.as_u16(),
                detail: error_detail(&body),
            },
        })
    }

    async fn get_json(&self, path: &str) -> PortResult<Value> {
        let url = self.endpoint(path)?;
        self.execute(path, |client| Ok(client.get(url.clone())))
            .await
    }

    async fn post_json<T: Serialize + Sync + ?Sized>(&self, path: &str, payload: &T) -> PortResult<Value> {
        let url = self.endpoint(path)?;
        self.execute(path, |client| Ok(client.post(url.clone()).json(payload)))
            .await
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl AuthService for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> PortResult<LoginReply> {
        let body = self
            .send_public(endpoints::LOGIN, &LoginPayload { email, password })
            .await?;
        Ok(decode::<LoginReplyRecord>(body)?.to_domain())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> PortResult<SignUpReply> {
        let payload = SignUpPayload {
            email: &request.email,
            password: &request.password,
            first_name: &request.first_name,
            last_name: &request.last_name,
        };
        let body = self.send_public(endpoints::SIGN_UP, &payload).await?;
        if body.is_null() {
            return Ok(SignUpReply {
                status: None,
                message: None,
            });
        }
        Ok(decode::<SignUpReplyRecord>(body)?.to_domain())
    }

    /// A single attempt: an expired token is not worth refreshing just to log out.
    async fn logout(&self) -> PortResult<()> {
        let url = self.endpoint(endpoints::LOGOUT)?;
        let build = |client: &Client| -> PortResult<RequestBuilder> {
            Ok(client.post(url.clone()).json(&serde_json::json!({})))
        };
        match self.attempt(endpoints::LOGOUT, &build, true).await {
            RequestOutcome::Ok(_) => Ok(()),
            RequestOutcome::Failed(e) => Err(e),
            RequestOutcome::NeedsRefreshRetry => Err(PortError::Unauthorized),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> PortResult<RefreshedTokens> {
        let body = self
            .send_public(
                endpoints::REFRESH_TOKEN,
                &RefreshPayload {
                    refresh: refresh_token,
                },
            )
            .await?;
        Ok(decode::<RefreshRecord>(unwrap_envelope(body))?.to_domain())
    }
}

#[async_trait]
impl DocumentService for HttpBackend {
    async fn upload_pdf(&self, upload: &PdfUpload) -> PortResult<()> {
        let url = self.endpoint(endpoints::FILE_UPLOAD)?;
        let title = upload.resolved_title();
        info!("Uploading {} as '{}'", upload.file_name, title);
        let build = |client: &Client| -> PortResult<RequestBuilder> {
            let file = Part::bytes(upload.bytes.to_vec())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.content_type)
                .map_err(|e| PortError::Unexpected(format!("invalid content type: {}", e)))?;
            let form = Form::new().part("file", file).text("title", title.clone());
            Ok(client.post(url.clone()).multipart(form))
        };
        self.execute(endpoints::FILE_UPLOAD, build).await?;
        Ok(())
    }

    async fn query(&self, question: &str, document_id: &str) -> PortResult<QueryAnswer> {
        let body = self
            .post_json(
                endpoints::FILE_QUERY,
                &QueryPayload {
                    query: question,
                    document_id,
                },
            )
            .await?;
        Ok(decode::<QueryRecord>(unwrap_envelope(body))?.to_domain())
    }

    async fn list_documents(&self) -> PortResult<Vec<Document>> {
        let body = self.get_json(endpoints::FILE_STORES_LIST).await?;
        decode_store_list(body)
    }

    async fn list_documents_filtered(&self, query: &DocumentQuery) -> PortResult<DocumentPage> {
        let url = self.endpoint(endpoints::FILE_STORES_LIST_FILTER)?;
        let mut params = vec![
            ("page", query.page.to_string()),
            ("page_size", query.page_size.to_string()),
        ];
        if let Some(title) = query.title.as_deref().filter(|t| !t.is_empty()) {
            params.push(("title", title.to_string()));
        }
        let body = self
            .execute(endpoints::FILE_STORES_LIST_FILTER, |client| {
                Ok(client.get(url.clone()).query(&params))
            })
            .await?;
        Ok(decode::<StorePageRecord>(unwrap_envelope(body))?.to_domain(query))
    }
}

#[async_trait]
impl PreferencesService for HttpBackend {
    async fn get_preferences(&self) -> PortResult<Preferences> {
        let body = self.get_json(endpoints::PERSONALIZATION_PREFERENCES).await?;
        if body.is_null() {
            return Ok(Preferences::default());
        }
        Ok(decode::<PreferencesRecord>(unwrap_envelope(body))?.to_domain())
    }

    async fn save_preferences(&self, preferences: &Preferences) -> PortResult<()> {
        self.post_json(
            endpoints::PERSONALIZATION_PREFERENCES,
            &PreferencesRecord::from_domain(preferences),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EvaluationService for HttpBackend {
    async fn run_evaluation(&self, pairs: &[QaPair]) -> PortResult<EvaluationReport> {
        let body = self
            .post_json(endpoints::EVALUATION_RAGAS, &EvaluationPayload::from_domain(pairs))
            .await?;
        Ok(decode::<EvaluationRecord>(unwrap_envelope(body))?.to_domain())
    }

    async fn get_metrics(&self) -> PortResult<EvaluationMetrics> {
        let body = unwrap_envelope(self.get_json(endpoints::EVALUATION_METRICS).await?);
        let metrics = match body.get("metrics") {
            Some(nested) => decode::<MetricsRecord>(nested.clone())?,
            None => decode::<MetricsRecord>(body)?,
        };
        Ok(metrics.to_domain())
    }
}

#[async_trait]
impl AdminService for HttpBackend {
    async fn list_all_documents(&self) -> PortResult<Vec<Document>> {
        let body = self.get_json(endpoints::ADMIN_STORES).await?;
        decode_store_list(body)
    }

    async fn get_metrics(&self) -> PortResult<AdminMetrics> {
        let body = self.get_json(endpoints::ADMIN_METRICS).await?;
        Ok(decode::<AdminMetricsRecord>(unwrap_envelope(body))?.to_domain())
    }

    async fn list_users(&self) -> PortResult<Vec<AdminUser>> {
        let body = self.get_json(endpoints::ADMIN_USERS).await?;
        decode_admin_users(body)
    }
}
