pub mod progress;
pub mod proposal;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::config::{CONFIG, RECONCILE_PROMPT_TEMPLATE};
use crate::llm::{extract_json, GenerateOptions, GenerativeModel};
use crate::settings::defaults::{
    factory_default_document, FALLBACK_THEME_EN, FALLBACK_THEME_ZH,
};
use crate::settings::document::SettingsDocument;
use crate::state::AppState;
use crate::utils::language::language_hint_or;
use crate::utils::template::fill_template;

use self::progress::ProgressReporter;
use self::proposal::apply_proposal;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("a reconciliation is already running")]
    Busy,
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model response could not be parsed: {0}")]
    MalformedResponse(String),
}

const STEPS: [&str; 6] = [
    "Resetting to factory defaults",
    "Building the rewrite request",
    "Asking the model for a themed rewrite",
    "Parsing the model response",
    "Applying the proposal",
    "Saving the new settings",
];

/// Orchestrates a themed rewrite of the whole settings document: factory
/// reset, one model call, tolerant parse, per-section application,
/// atomic commit. A failed run still commits a safe document.
pub struct ReconcileEngine<G> {
    model: G,
    in_flight: AtomicBool,
}

impl<G: GenerativeModel> ReconcileEngine<G> {
    pub fn new(model: G) -> Self {
        ReconcileEngine {
            model,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runs one reconciliation. Rejects with [`ReconcileError::Busy`]
    /// while another run is pending, touching nothing in that case.
    pub async fn reconcile(
        &self,
        state: &AppState,
        theme_input: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<SettingsDocument, ReconcileError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ReconcileError::Busy);
        }
        let result = self.run(state, theme_input, progress).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run(
        &self,
        state: &AppState,
        theme_input: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<SettingsDocument, ReconcileError> {
        // Every run restarts from factory defaults, never from the live
        // document.
        progress.report(&STEPS, 0, STEPS.len(), None);
        let baseline = factory_default_document();

        progress.report(&STEPS, 1, STEPS.len(), None);
        let prompt = build_rewrite_prompt(&baseline, theme_input);

        progress.report(&STEPS, 2, STEPS.len(), None);
        let opts = GenerateOptions { expect_json: true };
        let raw = match self.model.generate(&prompt, &opts).await {
            Ok(raw) => raw,
            Err(err) => {
                return Err(self.fail(state, progress, 2, ReconcileError::Transport(err.to_string())));
            }
        };

        progress.report(&STEPS, 3, STEPS.len(), None);
        let parsed = match extract_json(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "Could not parse model proposal near: {}",
                    err.context.trim()
                );
                return Err(self.fail(
                    state,
                    progress,
                    3,
                    ReconcileError::MalformedResponse(err.to_string()),
                ));
            }
        };

        progress.report(&STEPS, 4, STEPS.len(), None);
        let document = apply_proposal(&baseline, &parsed, theme_input);

        progress.report(&STEPS, 5, STEPS.len(), None);
        state.commit_settings(document.clone());
        info!(
            "Reconciled settings for theme '{}' -> '{}' / '{}'",
            theme_input.trim(),
            document.theme_en,
            document.theme_zh
        );
        Ok(document)
    }

    /// Commits the safe fallback document, reports the failure, and hands
    /// the error back for the caller. The document is never left
    /// half-applied.
    fn fail(
        &self,
        state: &AppState,
        progress: &dyn ProgressReporter,
        step: usize,
        error: ReconcileError,
    ) -> ReconcileError {
        let mut fallback = factory_default_document();
        fallback.theme_en = FALLBACK_THEME_EN.to_string();
        fallback.theme_zh = FALLBACK_THEME_ZH.to_string();
        state.commit_settings(fallback);
        progress.report(&STEPS, step, STEPS.len(), Some(&error.to_string()));
        error
    }
}

fn section_json<T: serde::Serialize>(section: &T) -> String {
    serde_json::to_string_pretty(section).unwrap_or_else(|_| "{}".to_string())
}

fn build_rewrite_prompt(baseline: &SettingsDocument, theme_input: &str) -> String {
    let mut values = HashMap::new();
    values.insert("themeInput".to_string(), theme_input.trim().to_string());
    values.insert(
        "inputLanguage".to_string(),
        language_hint_or(theme_input, &CONFIG.default_input_language),
    );
    values.insert(
        "promptTemplates".to_string(),
        section_json(&baseline.prompt_templates),
    );
    values.insert("uiTexts".to_string(), section_json(&baseline.ui_texts));
    values.insert("categories".to_string(), section_json(&baseline.categories));
    values.insert("roomTypes".to_string(), section_json(&baseline.room_types));
    values.insert("styles".to_string(), section_json(&baseline.styles));
    fill_template(RECONCILE_PROMPT_TEMPLATE, &values)
}
