//! services/client/src/views/evaluation.rs
//!
//! Editable QA pairs submitted for RAGAS scoring, plus the stored metrics.
//! Until the backend ships the evaluation endpoint, a missing endpoint shows
//! the placeholder report instead of an error.

use studysearch_core::domain::{EvaluationMetrics, EvaluationReport, QaPair};
use tracing::{info, warn};

use crate::config::Feature;
use crate::views::state::{failure_message, AppState};

pub const PLACEHOLDER_METRICS: EvaluationMetrics = EvaluationMetrics {
    relevancy: 0.75,
    recall: 0.68,
    faithfulness: 0.82,
    overall: 0.75,
};
pub const PLACEHOLDER_MESSAGE: &str = "Evaluation API not yet implemented. Showing mock results.";
pub const NO_PAIRS: &str = "Please add at least one question-answer pair";
pub const EVALUATION_FAILED: &str = "Evaluation failed";

pub fn placeholder_report() -> EvaluationReport {
    EvaluationReport {
        metrics: PLACEHOLDER_METRICS,
        message: Some(PLACEHOLDER_MESSAGE.to_string()),
    }
}

/// One scored metric as shown on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRow {
    pub label: &'static str,
    pub score: f64,
    pub meets_target: bool,
}

pub fn metric_rows(metrics: &EvaluationMetrics) -> [MetricRow; 4] {
    let row = |label, score| MetricRow {
        label,
        score,
        meets_target: EvaluationMetrics::meets_threshold(score),
    };
    [
        row("Relevancy", metrics.relevancy),
        row("Recall", metrics.recall),
        row("Faithfulness", metrics.faithfulness),
        row("Overall", metrics.overall),
    ]
}

#[derive(Debug)]
pub struct EvaluationView {
    pairs: Vec<QaPair>,
    pub report: Option<EvaluationReport>,
    pub error: Option<String>,
    pub stored_metrics: Option<EvaluationMetrics>,
    pub running: bool,
}

impl Default for EvaluationView {
    fn default() -> Self {
        Self {
            pairs: vec![QaPair::default()],
            report: None,
            error: None,
            stored_metrics: None,
            running: false,
        }
    }
}

impl EvaluationView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pairs(&self) -> &[QaPair] {
        &self.pairs
    }

    pub fn add_pair(&mut self) {
        self.pairs.push(QaPair::default());
    }

    /// The last remaining pair cannot be removed.
    pub fn remove_pair(&mut self, index: usize) -> bool {
        if self.pairs.len() <= 1 || index >= self.pairs.len() {
            return false;
        }
        self.pairs.remove(index);
        true
    }

    pub fn update_pair(&mut self, index: usize, question: &str, answer: &str) -> bool {
        match self.pairs.get_mut(index) {
            Some(pair) => {
                *pair = QaPair::new(question, answer);
                true
            }
            None => false,
        }
    }

    /// Submits every complete pair. With none, nothing is sent.
    pub async fn run(&mut self, state: &AppState) -> bool {
        self.error = None;
        let complete: Vec<QaPair> = self
            .pairs
            .iter()
            .filter(|p| p.is_complete())
            .cloned()
            .collect();
        if complete.is_empty() {
            self.error = Some(NO_PAIRS.to_string());
            return false;
        }

        if !state.availability().is_available(Feature::Evaluation) {
            self.report = Some(placeholder_report());
            return true;
        }

        self.report = None;
        self.running = true;
        let outcome = state.evaluation.run_evaluation(&complete).await;
        self.running = false;
        match outcome {
            Ok(report) => {
                info!(
                    "Evaluated {} pairs, overall {:.2}",
                    complete.len(),
                    report.metrics.overall
                );
                self.report = Some(report);
                true
            }
            Err(e) if e.is_missing_endpoint() => {
                info!("Evaluation endpoint missing, showing placeholder: {}", e);
                self.report = Some(placeholder_report());
                true
            }
            Err(e) => {
                warn!("Evaluation failed: {}", e);
                self.error = Some(failure_message(&e, EVALUATION_FAILED));
                false
            }
        }
    }

    /// Reads the stored metrics, falling back to all zeros.
    pub async fn load_metrics(&mut self, state: &AppState) {
        if !state.availability().is_available(Feature::EvaluationMetrics) {
            self.stored_metrics = Some(EvaluationMetrics::default());
            return;
        }
        let metrics = state.evaluation.get_metrics().await.unwrap_or_else(|e| {
            warn!("Failed to load evaluation metrics: {}", e);
            EvaluationMetrics::default()
        });
        self.stored_metrics = Some(metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointAvailability;
    use crate::views::fakes::{app_state, app_state_with, FakeBackend};
    use std::sync::Arc;
    use studysearch_core::ports::PortError;

    #[test]
    fn pairs_can_be_edited_but_never_emptied() {
        let mut view = EvaluationView::new();
        assert_eq!(view.pairs().len(), 1);
        assert!(!view.remove_pair(0));

        view.add_pair();
        assert!(view.update_pair(1, "Q", "A"));
        assert!(!view.update_pair(5, "Q", "A"));
        assert!(view.remove_pair(0));
        assert_eq!(view.pairs(), &[QaPair::new("Q", "A")]);
    }

    #[tokio::test]
    async fn no_complete_pairs_is_rejected_locally() {
        let fake = Arc::new(FakeBackend::default());
        let state = app_state(fake.clone());
        let mut view = EvaluationView::new();
        view.update_pair(0, "Question without answer", "   ");

        assert!(!view.run(&state).await);
        assert_eq!(view.error.as_deref(), Some(NO_PAIRS));
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn only_complete_pairs_are_submitted() {
        let fake = Arc::new(FakeBackend::default());
        let state = app_state(fake.clone());
        let mut view = EvaluationView::new();
        view.update_pair(0, "What is ATP?", "Energy currency");
        view.add_pair();
        view.add_pair();
        view.update_pair(2, "", "orphan answer");

        assert!(view.run(&state).await);
        let submitted = fake.evaluated.lock().unwrap()[0].clone();
        assert_eq!(submitted, vec![QaPair::new("What is ATP?", "Energy currency")]);
        assert_eq!(view.report.as_ref().unwrap().metrics.relevancy, 0.9);
    }

    #[tokio::test]
    async fn missing_endpoint_shows_placeholder() {
        for error in [
            PortError::NotFound("evaluation/ragas/".into()),
            PortError::Rejected {
                status: 501,
                detail: None,
            },
        ] {
            let fake = Arc::new(FakeBackend::default());
            *fake.evaluation.lock().unwrap() = Err(error);
            let state = app_state(fake);
            let mut view = EvaluationView::new();
            view.update_pair(0, "Q", "A");

            assert!(view.run(&state).await);
            assert_eq!(view.report, Some(placeholder_report()));
            assert_eq!(view.error, None);
        }
    }

    #[tokio::test]
    async fn flagged_endpoint_skips_the_request() {
        let fake = Arc::new(FakeBackend::default());
        let state = app_state_with(
            fake.clone(),
            EndpointAvailability::all_available().without(Feature::Evaluation),
        );
        let mut view = EvaluationView::new();
        view.update_pair(0, "Q", "A");
        assert!(view.run(&state).await);
        assert_eq!(view.report.unwrap().metrics, PLACEHOLDER_METRICS);
        assert_eq!(fake.count("run_evaluation"), 0);
    }

    #[tokio::test]
    async fn other_failures_surface_detail() {
        let fake = Arc::new(FakeBackend::default());
        *fake.evaluation.lock().unwrap() = Err(PortError::Rejected {
            status: 500,
            detail: Some("RAGAS worker crashed".into()),
        });
        let state = app_state(fake.clone());
        let mut view = EvaluationView::new();
        view.update_pair(0, "Q", "A");
        assert!(!view.run(&state).await);
        assert_eq!(view.error.as_deref(), Some("RAGAS worker crashed"));

        *fake.evaluation.lock().unwrap() = Err(PortError::Transport("refused".into()));
        view.run(&state).await;
        assert_eq!(view.error.as_deref(), Some(EVALUATION_FAILED));
        assert_eq!(view.report, None);
    }

    #[tokio::test]
    async fn stored_metrics_fall_back_to_zero() {
        let fake = Arc::new(FakeBackend::default());
        *fake.evaluation_metrics.lock().unwrap() = Err(PortError::Unauthorized);
        let state = app_state(fake);
        let mut view = EvaluationView::new();
        view.load_metrics(&state).await;
        assert_eq!(view.stored_metrics, Some(EvaluationMetrics::default()));
    }

    #[test]
    fn rows_mark_scores_against_threshold() {
        let rows = metric_rows(&PLACEHOLDER_METRICS);
        assert!(rows.iter().all(|r| r.meets_target));
        let rows = metric_rows(&EvaluationMetrics {
            relevancy: 0.59,
            recall: 0.6,
            faithfulness: 0.0,
            overall: 1.0,
        });
        assert_eq!(
            rows.map(|r| r.meets_target),
            [false, true, false, true]
        );
    }
}
