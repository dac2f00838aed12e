//! services/client/src/views/settings.rs

use studysearch_core::domain::{Preferences, Tone};
use tracing::{debug, info, warn};

use crate::config::Feature;
use crate::views::state::{failure_message, AppState, StatusBanner};

pub const SAVE_SUCCEEDED: &str = "Preferences saved successfully!";
pub const SAVE_FAILED: &str = "Failed to save preferences";

#[derive(Debug, Default)]
pub struct SettingsView {
    pub preferences: Preferences,
    pub banner: Option<StatusBanner>,
    pub saving: bool,
}

impl SettingsView {
    /// Fetches the stored preferences. Any failure leaves the defaults in place.
    pub async fn load(&mut self, state: &AppState) {
        if !state.availability().is_available(Feature::Preferences) {
            debug!("Preferences endpoint unavailable, using defaults");
            self.preferences = Preferences::default();
            return;
        }
        self.preferences = match state.preferences.get_preferences().await {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!("Failed to load preferences, using defaults: {}", e);
                Preferences::default()
            }
        };
    }

    pub fn set_name(&mut self, name: &str) {
        self.preferences.name = name.to_string();
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.preferences.tone = tone;
    }

    pub async fn save(&mut self, state: &AppState) -> bool {
        self.banner = None;
        if !state.availability().is_available(Feature::Preferences) {
            self.banner = Some(StatusBanner::error(SAVE_FAILED));
            return false;
        }
        self.saving = true;
        let outcome = state.preferences.save_preferences(&self.preferences).await;
        self.saving = false;
        match outcome {
            Ok(()) => {
                info!("Preferences saved (tone {})", self.preferences.tone.as_str());
                self.banner = Some(StatusBanner::success(SAVE_SUCCEEDED));
                true
            }
            Err(e) => {
                warn!("Failed to save preferences: {}", e);
                self.banner = Some(StatusBanner::error(failure_message(&e, SAVE_FAILED)));
                false
            }
        }
    }
}
