//! services/client/src/views/admin.rs
//!
//! The super-admin dashboard: every store, system metrics and users. Each of
//! the three reads is non-critical and falls back to a placeholder.

use studysearch_core::domain::{AdminMetrics, AdminUser, Document};
use tracing::warn;

use crate::config::Feature;
use crate::views::state::AppState;

/// A labelled value on the dashboard's metric strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct AdminDashboard {
    pub stores: Vec<Document>,
    pub metrics: AdminMetrics,
    pub users: Vec<AdminUser>,
}

impl AdminDashboard {
    /// Stores load first since the metrics placeholder counts them.
    pub async fn load(&mut self, state: &AppState) {
        self.load_stores(state).await;
        self.load_metrics(state).await;
        self.load_users(state).await;
    }

    async fn load_stores(&mut self, state: &AppState) {
        if state.availability().is_available(Feature::AdminStores) {
            match state.admin.list_all_documents().await {
                Ok(stores) => {
                    self.stores = stores;
                    return;
                }
                Err(e) => warn!("Admin store listing failed, using the legacy listing: {}", e),
            }
        }
        self.stores = state.documents.list_documents().await.unwrap_or_else(|e| {
            warn!("Failed to load stores: {}", e);
            Vec::new()
        });
    }

    async fn load_metrics(&mut self, state: &AppState) {
        let fetched = if state.availability().is_available(Feature::AdminMetrics) {
            state
                .admin
                .get_metrics()
                .await
                .map_err(|e| warn!("Failed to load admin metrics: {}", e))
                .ok()
        } else {
            None
        };
        self.metrics = fetched.unwrap_or_else(|| self.placeholder_metrics());
    }

    async fn load_users(&mut self, state: &AppState) {
        if !state.availability().is_available(Feature::AdminUsers) {
            self.users = Vec::new();
            return;
        }
        self.users = state.admin.list_users().await.unwrap_or_else(|e| {
            warn!("Failed to load users: {}", e);
            Vec::new()
        });
    }

    fn placeholder_metrics(&self) -> AdminMetrics {
        AdminMetrics {
            total_stores: Some(self.stores.len() as u64),
            ..AdminMetrics::default()
        }
    }

    pub fn cards(&self) -> [MetricCard; 4] {
        [
            MetricCard {
                label: "Total Stores",
                value: self.stores.len().to_string(),
            },
            MetricCard {
                label: "Total Queries",
                value: self.metrics.total_queries.to_string(),
            },
            MetricCard {
                label: "Avg Response Time",
                value: format!("{}ms", self.metrics.avg_response_time_ms),
            },
            MetricCard {
                label: "Accuracy Score",
                value: format!("{}%", self.metrics.accuracy_score),
            },
        ]
    }
}
