use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

use crate::profiles::{ProfileError, ProfileStore};
use crate::settings::defaults::factory_default_document;
use crate::settings::document::SettingsDocument;
use crate::settings::merge::deep_merge;
use crate::storage::KeyValueStore;

const SETTINGS_KEY: &str = "settings";

/// Owns the canonical live settings document and the profile store. All
/// document mutation goes through [`AppState::commit_settings`] or a
/// profile load; there is no ad hoc field assignment from outside.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn KeyValueStore>,
    settings: Arc<RwLock<SettingsDocument>>,
    pub profiles: Arc<ProfileStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = load_settings(store.as_ref());
        AppState {
            profiles: Arc::new(ProfileStore::new(store.clone())),
            settings: Arc::new(RwLock::new(settings)),
            store,
        }
    }

    /// A snapshot of the current canonical document.
    pub fn settings(&self) -> SettingsDocument {
        self.settings.read().clone()
    }

    /// Replaces the canonical document and persists it. The in-memory
    /// document is updated even when persistence fails, so the session
    /// keeps working on its current state.
    pub fn commit_settings(&self, document: SettingsDocument) {
        match serde_json::to_string(&document) {
            Ok(raw) => {
                if let Err(err) = self.store.set(SETTINGS_KEY, &raw) {
                    warn!("Could not persist settings: {}", err);
                }
            }
            Err(err) => warn!("Could not serialize settings: {}", err),
        }
        *self.settings.write() = document;
    }

    /// Loads a profile (or the factory baseline) into the canonical slot.
    pub fn load_profile(&self, id: &str) -> Result<(), ProfileError> {
        let document = self.profiles.load(id)?;
        self.commit_settings(document);
        Ok(())
    }
}

/// Builds the startup document: factory defaults, with any persisted
/// document deep-merged on top. Unknown keys in the persisted JSON are
/// dropped and structural damage falls back to pure defaults.
fn load_settings(store: &dyn KeyValueStore) -> SettingsDocument {
    let defaults = factory_default_document();
    let Some(raw) = store.get(SETTINGS_KEY) else {
        return defaults;
    };
    let persisted: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("Persisted settings are not valid JSON, using defaults: {}", err);
            return defaults;
        }
    };
    let base = match serde_json::to_value(&defaults) {
        Ok(value) => value,
        Err(err) => {
            warn!("Could not serialize defaults for merge: {}", err);
            return defaults;
        }
    };
    match serde_json::from_value::<SettingsDocument>(deep_merge(&base, &persisted)) {
        Ok(mut document) => {
            document.enforce_detail_invariants();
            document
        }
        Err(err) => {
            warn!("Persisted settings did not fit the document shape, using defaults: {}", err);
            defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn starts_from_factory_defaults_when_store_is_empty() {
        let state = AppState::new(Arc::new(MemoryStore::new()));
        assert_eq!(state.settings(), factory_default_document());
    }

    #[test]
    fn commit_persists_and_survives_a_restart() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone());

        let mut document = factory_default_document();
        document.theme_en = "Vintage Café".to_string();
        state.commit_settings(document);

        let reloaded = AppState::new(store);
        assert_eq!(reloaded.settings().theme_en, "Vintage Café");
    }

    #[test]
    fn persisted_unknown_fields_are_dropped_on_load() {
        let store = Arc::new(MemoryStore::new());
        let mut raw: Value =
            serde_json::to_value(factory_default_document()).unwrap();
        raw["themeEn"] = Value::String("Persisted".to_string());
        raw["invented"] = Value::String("dropped".to_string());
        store.set(SETTINGS_KEY, &raw.to_string()).unwrap();

        let state = AppState::new(store);
        let settings = state.settings();
        assert_eq!(settings.theme_en, "Persisted");
        // Shape is canonical again; a round trip carries no extras.
        let round_trip = serde_json::to_value(&settings).unwrap();
        assert!(round_trip.get("invented").is_none());
    }

    #[test]
    fn corrupt_persisted_settings_fall_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(SETTINGS_KEY, "{not json").unwrap();
        let state = AppState::new(store);
        assert_eq!(state.settings(), factory_default_document());
    }

    #[test]
    fn load_profile_replaces_the_live_document() {
        let state = AppState::new(Arc::new(MemoryStore::new()));
        let mut snapshot = factory_default_document();
        snapshot.theme_en = "Saved look".to_string();
        let id = state.profiles.save("look", &snapshot, None).unwrap();

        state.load_profile(&id).unwrap();
        assert_eq!(state.settings().theme_en, "Saved look");
    }
}
