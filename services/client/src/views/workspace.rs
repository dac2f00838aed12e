//! services/client/src/views/workspace.rs
//!
//! The document workspace: upload, the paginated listing, the document
//! selector, and the question/answer conversation with its history.
//!
//! Conversations live only in this view. Nothing here is persisted.

use std::collections::VecDeque;

use chrono::Utc;
use studysearch_core::domain::{
    Conversation, Document, DocumentQuery, Message, PageInfo, PdfUpload,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::views::state::{failure_message, AppState};

pub const LISTING_PAGE_SIZE: u32 = 10;
pub const SELECTOR_PAGE_SIZE: u32 = 5;
pub const HISTORY_LIMIT: usize = 20;

pub const NOT_A_PDF: &str = "Please upload a PDF file";
pub const UPLOAD_SUCCEEDED: &str = "PDF uploaded and processed successfully!";
pub const UPLOAD_FAILED: &str = "Failed to upload PDF";
pub const LISTING_FAILED: &str = "Failed to load documents";
pub const NO_ANSWER: &str = "No answer found";
pub const QUERY_FAILED: &str = "Failed to process query";

//=========================================================================================
// Listing
//=========================================================================================

/// The paginated, title-filtered document table.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub documents: Vec<Document>,
    pub page: u32,
    pub title_filter: String,
    pub page_info: Option<PageInfo>,
    pub error: Option<String>,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            page: 1,
            title_filter: String::new(),
            page_info: None,
            error: None,
        }
    }
}

impl Listing {
    fn query(&self) -> DocumentQuery {
        DocumentQuery {
            page: self.page,
            page_size: LISTING_PAGE_SIZE,
            title: non_empty(&self.title_filter),
        }
    }

    /// Enabled only when the server said there is a next page.
    pub fn can_go_next(&self) -> bool {
        self.page_info.is_some_and(|info| info.has_next)
    }

    pub fn can_go_previous(&self) -> bool {
        self.page_info.is_some_and(|info| info.has_previous)
    }
}

/// The short list the question form picks its document from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSelector {
    pub documents: Vec<Document>,
    pub filter: String,
    pub selected: Option<Document>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    InFlight,
    Succeeded(String),
    Failed(String),
}

//=========================================================================================
// Conversation history
//=========================================================================================

/// Most recent first, never more than `HISTORY_LIMIT` entries.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: VecDeque<Conversation>,
}

impl ConversationHistory {
    /// Moves `conversation` to the front, replacing an older copy of it and
    /// evicting the oldest entry when full.
    pub fn record(&mut self, conversation: Conversation) {
        self.entries.retain(|c| c.id != conversation.id);
        self.entries.push_front(conversation);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Conversation> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.entries.iter()
    }
}

//=========================================================================================
// WorkspaceView
//=========================================================================================

#[derive(Debug, Default)]
pub struct WorkspaceView {
    pub listing: Listing,
    pub selector: DocumentSelector,
    pub upload: UploadStatus,
    pub conversation: Option<Conversation>,
    pub history: ConversationHistory,
    query_in_flight: bool,
}

impl WorkspaceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both document lists, as on entering the screen.
    pub async fn enter(&mut self, state: &AppState) {
        self.refresh_listing(state).await;
        self.refresh_selector(state).await;
    }

    pub async fn refresh_listing(&mut self, state: &AppState) {
        let query = self.listing.query();
        match state.documents.list_documents_filtered(&query).await {
            Ok(page) => {
                debug!(
                    "Listing page {} holds {} of {} documents",
                    page.page_info.page,
                    page.documents.len(),
                    page.page_info.total_count
                );
                self.listing.page = page.page_info.page.max(1);
                self.listing.documents = page.documents;
                self.listing.page_info = Some(page.page_info);
                self.listing.error = None;
            }
            Err(e) => {
                warn!("Failed to load document listing: {}", e);
                self.listing.documents.clear();
                self.listing.page_info = None;
                self.listing.error = Some(failure_message(&e, LISTING_FAILED));
            }
        }
    }

    /// Any filter change starts over at page 1.
    pub async fn set_title_filter(&mut self, state: &AppState, title: &str) {
        self.listing.title_filter = title.to_string();
        self.listing.page = 1;
        self.refresh_listing(state).await;
    }

    pub async fn next_page(&mut self, state: &AppState) -> bool {
        if !self.listing.can_go_next() {
            return false;
        }
        self.listing.page += 1;
        self.refresh_listing(state).await;
        true
    }

    pub async fn previous_page(&mut self, state: &AppState) -> bool {
        if !self.listing.can_go_previous() {
            return false;
        }
        self.listing.page = self.listing.page.saturating_sub(1).max(1);
        self.refresh_listing(state).await;
        true
    }

    /// Jumps straight to `page`, used when the page is given up front.
    pub async fn open_page(&mut self, state: &AppState, page: u32) {
        self.listing.page = page.max(1);
        self.refresh_listing(state).await;
    }

    pub async fn refresh_selector(&mut self, state: &AppState) {
        let query = DocumentQuery {
            page: 1,
            page_size: SELECTOR_PAGE_SIZE,
            title: non_empty(&self.selector.filter),
        };
        match state.documents.list_documents_filtered(&query).await {
            Ok(page) => {
                self.selector.documents = page.documents;
                if self.selector.selected.is_none() {
                    self.selector.selected = self.selector.documents.first().cloned();
                }
            }
            Err(e) => warn!("Failed to load document selector: {}", e),
        }
    }

    pub async fn set_selector_filter(&mut self, state: &AppState, filter: &str) {
        self.selector.filter = filter.to_string();
        self.refresh_selector(state).await;
    }

    /// Switching to another document starts a new conversation.
    pub fn select_document(&mut self, document: Document) {
        let changed = self
            .selector
            .selected
            .as_ref()
            .map_or(true, |current| current.id != document.id);
        if changed {
            debug!("Selected document {} ({})", document.title, document.id);
            self.conversation = None;
            self.selector.selected = Some(document);
        }
    }

    /// Selects the document whose id or title is exactly `wanted`. Titles match
    /// case-insensitively. An id missing from the title-filtered selector is
    /// looked up on the unfiltered first page. Partial title matches never win.
    pub async fn choose_document(&mut self, state: &AppState, wanted: &str) -> bool {
        let wanted = wanted.trim();
        self.set_selector_filter(state, wanted).await;
        let documents = &self.selector.documents;
        let mut found = documents
            .iter()
            .find(|d| d.id == wanted)
            .or_else(|| documents.iter().find(|d| d.title.eq_ignore_ascii_case(wanted)))
            .cloned();
        if found.is_none() {
            self.set_selector_filter(state, "").await;
            found = self
                .selector
                .documents
                .iter()
                .find(|d| d.id == wanted)
                .cloned();
        }
        match found {
            Some(document) => {
                self.select_document(document);
                true
            }
            None => {
                debug!("No document matches {:?}", wanted);
                false
            }
        }
    }

    /// Uploads a PDF, refetching both lists on success. Non-PDF content is
    /// refused without contacting the server.
    pub async fn upload(&mut self, state: &AppState, upload: &PdfUpload) -> bool {
        if !upload.is_pdf() {
            self.upload = UploadStatus::Failed(NOT_A_PDF.to_string());
            return false;
        }
        self.upload = UploadStatus::InFlight;
        match state.documents.upload_pdf(upload).await {
            Ok(()) => {
                info!("Uploaded {}", upload.file_name);
                self.upload = UploadStatus::Succeeded(UPLOAD_SUCCEEDED.to_string());
                self.refresh_listing(state).await;
                self.refresh_selector(state).await;
                true
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", upload.file_name, e);
                self.upload = UploadStatus::Failed(failure_message(&e, UPLOAD_FAILED));
                false
            }
        }
    }

    pub fn can_submit(&self, question: &str) -> bool {
        !self.query_in_flight
            && !question.trim().is_empty()
            && self.selector.selected.is_some()
    }

    /// Asks `question` about the selected document. Returns false, without
    /// sending anything, when the question is blank or nothing is selected.
    pub async fn submit_query(&mut self, state: &AppState, question: &str) -> bool {
        if !self.can_submit(question) {
            return false;
        }
        let Some(document) = self.selector.selected.clone() else {
            return false;
        };
        let question = question.trim();

        let conversation = self.conversation.get_or_insert_with(|| Conversation {
            id: Uuid::new_v4(),
            title: Conversation::title_from_query(question),
            messages: Vec::new(),
            document_id: document.id.clone(),
            document_title: document.title.clone(),
            timestamp: Utc::now(),
        });
        conversation.messages.push(Message::user(question));

        self.query_in_flight = true;
        let outcome = state.documents.query(question, &document.id).await;
        self.query_in_flight = false;

        let reply = match outcome {
            Ok(answer) => Message::assistant(
                answer
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER.to_string()),
                answer.citations,
            ),
            Err(e) => {
                warn!("Query against {} failed: {}", document.id, e);
                Message::assistant(
                    format!("Error: {}", failure_message(&e, QUERY_FAILED)),
                    Vec::new(),
                )
            }
        };

        if let Some(conversation) = self.conversation.as_mut() {
            conversation.messages.push(reply);
            conversation.timestamp = Utc::now();
            self.history.record(conversation.clone());
        }
        true
    }

    pub fn new_conversation(&mut self) {
        self.conversation = None;
    }

    /// Reopens a recorded conversation, selecting its document again.
    pub fn open_conversation(&mut self, index: usize) -> bool {
        let Some(conversation) = self.history.get(index).cloned() else {
            return false;
        };
        let already_selected = self
            .selector
            .selected
            .as_ref()
            .is_some_and(|d| d.id == conversation.document_id);
        if !already_selected {
            self.selector.selected = Some(
                self.selector
                    .documents
                    .iter()
                    .find(|d| d.id == conversation.document_id)
                    .cloned()
                    .unwrap_or_else(|| Document {
                        id: conversation.document_id.clone(),
                        title: conversation.document_title.clone(),
                        status: None,
                        created_at: None,
                        file_url: None,
                    }),
            );
        }
        self.conversation = Some(conversation);
        true
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation
            .as_ref()
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
