//! In-memory fakes of every backend port, shared by the view tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use studysearch_core::domain::{
    AdminMetrics, AdminUser, Document, DocumentPage, DocumentQuery, EvaluationMetrics,
    EvaluationReport, LoginReply, PageInfo, PdfUpload, Preferences, QaPair, QueryAnswer,
    RefreshedTokens, SignUpReply, SignUpRequest,
};
use studysearch_core::ports::{
    AdminService, AuthService, DocumentService, EvaluationService, PortError, PortResult,
    PreferencesService,
};

use crate::adapters::MemoryCredentialStore;
use crate::config::{Config, EndpointAvailability};
use crate::session::SessionStore;
use crate::views::state::AppState;

pub(crate) fn doc(id: &str, title: &str) -> Document {
    Document {
        id: id.into(),
        title: title.into(),
        status: None,
        created_at: None,
        file_url: None,
    }
}

pub(crate) struct FakeBackend {
    pub login: Mutex<PortResult<LoginReply>>,
    pub sign_up: Mutex<PortResult<SignUpReply>>,
    pub logout: Mutex<PortResult<()>>,
    /// Every indexed document; the filtered listing pages over these.
    pub corpus: Mutex<Vec<Document>>,
    /// Replaces the computed pagination flags when set.
    pub page_override: Mutex<Option<PageInfo>>,
    pub listing_error: Mutex<Option<PortError>>,
    pub upload: Mutex<PortResult<()>>,
    pub answer: Mutex<PortResult<QueryAnswer>>,
    pub preferences: Mutex<PortResult<Preferences>>,
    pub save: Mutex<PortResult<()>>,
    pub evaluation: Mutex<PortResult<EvaluationReport>>,
    pub evaluation_metrics: Mutex<PortResult<EvaluationMetrics>>,
    pub admin_stores: Mutex<PortResult<Vec<Document>>>,
    pub admin_metrics: Mutex<PortResult<AdminMetrics>>,
    pub admin_users: Mutex<PortResult<Vec<AdminUser>>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub listing_queries: Mutex<Vec<DocumentQuery>>,
    pub questions: Mutex<Vec<(String, String)>>,
    pub saved: Mutex<Vec<Preferences>>,
    pub evaluated: Mutex<Vec<Vec<QaPair>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            login: Mutex::new(Err(PortError::Unauthorized)),
            sign_up: Mutex::new(Ok(SignUpReply {
                status: Some(201),
                message: None,
            })),
            logout: Mutex::new(Ok(())),
            corpus: Mutex::new(Vec::new()),
            page_override: Mutex::new(None),
            listing_error: Mutex::new(None),
            upload: Mutex::new(Ok(())),
            answer: Mutex::new(Ok(QueryAnswer {
                answer: Some("42".into()),
                citations: Vec::new(),
            })),
            preferences: Mutex::new(Ok(Preferences::default())),
            save: Mutex::new(Ok(())),
            evaluation: Mutex::new(Ok(EvaluationReport {
                metrics: EvaluationMetrics {
                    relevancy: 0.9,
                    recall: 0.5,
                    faithfulness: 0.8,
                    overall: 0.7,
                },
                message: None,
            })),
            evaluation_metrics: Mutex::new(Ok(EvaluationMetrics::default())),
            admin_stores: Mutex::new(Ok(Vec::new())),
            admin_metrics: Mutex::new(Ok(AdminMetrics::default())),
            admin_users: Mutex::new(Ok(Vec::new())),
            calls: Mutex::new(Vec::new()),
            listing_queries: Mutex::new(Vec::new()),
            questions: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            evaluated: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn with_corpus(documents: Vec<Document>) -> Self {
        let fake = Self::default();
        *fake.corpus.lock().unwrap() = documents;
        fake
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthService for FakeBackend {
    async fn login(&self, _: &str, _: &str) -> PortResult<LoginReply> {
        self.record("login");
        self.login.lock().unwrap().clone()
    }

    async fn sign_up(&self, _: &SignUpRequest) -> PortResult<SignUpReply> {
        self.record("sign_up");
        self.sign_up.lock().unwrap().clone()
    }

    async fn logout(&self) -> PortResult<()> {
        self.record("logout");
        self.logout.lock().unwrap().clone()
    }

    async fn refresh(&self, _: &str) -> PortResult<RefreshedTokens> {
        self.record("refresh");
        Err(PortError::Unauthorized)
    }
}

#[async_trait]
impl DocumentService for FakeBackend {
    async fn upload_pdf(&self, _: &PdfUpload) -> PortResult<()> {
        self.record("upload");
        self.upload.lock().unwrap().clone()
    }

    async fn query(&self, question: &str, document_id: &str) -> PortResult<QueryAnswer> {
        self.record("query");
        self.questions
            .lock()
            .unwrap()
            .push((question.to_string(), document_id.to_string()));
        self.answer.lock().unwrap().clone()
    }

    async fn list_documents(&self) -> PortResult<Vec<Document>> {
        self.record("list");
        Ok(self.corpus.lock().unwrap().clone())
    }

    async fn list_documents_filtered(&self, query: &DocumentQuery) -> PortResult<DocumentPage> {
        self.record("list_filtered");
        self.listing_queries.lock().unwrap().push(query.clone());
        if let Some(e) = self.listing_error.lock().unwrap().clone() {
            return Err(e);
        }
        let needle = query.title.clone().unwrap_or_default().to_lowercase();
        let matching: Vec<Document> = self
            .corpus
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        let start = ((query.page.max(1) - 1) * query.page_size) as usize;
        let documents: Vec<Document> = matching
            .iter()
            .skip(start)
            .take(query.page_size as usize)
            .cloned()
            .collect();
        let computed = PageInfo {
            page: query.page,
            page_size: query.page_size,
            total_count: matching.len() as u64,
            has_next: start + documents.len() < matching.len(),
            has_previous: query.page > 1,
        };
        let page_info = self.page_override.lock().unwrap().unwrap_or(computed);
        Ok(DocumentPage {
            documents,
            page_info,
        })
    }
}

#[async_trait]
impl PreferencesService for FakeBackend {
    async fn get_preferences(&self) -> PortResult<Preferences> {
        self.record("get_preferences");
        self.preferences.lock().unwrap().clone()
    }

    async fn save_preferences(&self, preferences: &Preferences) -> PortResult<()> {
        self.record("save_preferences");
        self.saved.lock().unwrap().push(preferences.clone());
        self.save.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvaluationService for FakeBackend {
    async fn run_evaluation(&self, pairs: &[QaPair]) -> PortResult<EvaluationReport> {
        self.record("run_evaluation");
        self.evaluated.lock().unwrap().push(pairs.to_vec());
        self.evaluation.lock().unwrap().clone()
    }

    async fn get_metrics(&self) -> PortResult<EvaluationMetrics> {
        self.record("evaluation_metrics");
        self.evaluation_metrics.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminService for FakeBackend {
    async fn list_all_documents(&self) -> PortResult<Vec<Document>> {
        self.record("admin_stores");
        self.admin_stores.lock().unwrap().clone()
    }

    async fn get_metrics(&self) -> PortResult<AdminMetrics> {
        self.record("admin_metrics");
        self.admin_metrics.lock().unwrap().clone()
    }

    async fn list_users(&self) -> PortResult<Vec<AdminUser>> {
        self.record("admin_users");
        self.admin_users.lock().unwrap().clone()
    }
}

pub(crate) fn app_state(fake: Arc<FakeBackend>) -> AppState {
    app_state_with(fake, EndpointAvailability::all_available())
}

pub(crate) fn app_state_with(fake: Arc<FakeBackend>, availability: EndpointAvailability) -> AppState {
    let mut config = Config::from_lookup(|_| None).unwrap();
    config.availability = availability;
    AppState {
        config: Arc::new(config),
        session: Arc::new(SessionStore::hydrate(Arc::new(MemoryCredentialStore::new()))),
        auth: fake.clone(),
        documents: fake.clone(),
        preferences: fake.clone(),
        evaluation: fake.clone(),
        admin: fake,
    }
}
