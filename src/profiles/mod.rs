use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::settings::defaults::factory_default_document;
use crate::settings::document::SettingsDocument;
use crate::storage::{KeyValueStore, StorageError};

/// Reserved id that always resolves to the computed factory-default
/// document instead of a stored record.
pub const FACTORY_PROFILE_ID: &str = "factory-defaults";

const PROFILES_KEY: &str = "profiles";
const THUMBNAIL_MAX_EDGE: u32 = 256;

static PROFILE_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile '{0}' was not found")]
    NotFound(String),
    #[error("the factory profile is computed and cannot be modified")]
    ReservedId,
    #[error("could not persist profiles: {0}")]
    Storage(#[from] StorageError),
    #[error("could not encode profiles: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("thumbnail bytes are not a usable image: {0}")]
    Thumbnail(String),
}

/// A named snapshot of the full settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Base64-encoded PNG, downscaled on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub settings: SettingsDocument,
}

/// Stores profile snapshots under a single key so every mutation is one
/// `set` call: it either fully succeeds or leaves the previous list
/// intact.
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        ProfileStore { store }
    }

    fn read_all(&self) -> Vec<Profile> {
        self.store
            .get(PROFILES_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn write_all(&self, profiles: &[Profile]) -> Result<(), ProfileError> {
        let raw = serde_json::to_string(profiles)?;
        self.store.set(PROFILES_KEY, &raw)?;
        Ok(())
    }

    pub fn save(
        &self,
        name: &str,
        settings: &SettingsDocument,
        thumbnail: Option<&[u8]>,
    ) -> Result<String, ProfileError> {
        let id = next_profile_id();
        let thumbnail = thumbnail.map(encode_thumbnail).transpose()?;
        let mut profiles = self.read_all();
        profiles.push(Profile {
            id: id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
            thumbnail,
            settings: settings.clone(),
        });
        self.write_all(&profiles)?;
        info!("Saved profile '{}' as {}", name, id);
        Ok(id)
    }

    /// Loading the reserved factory id never fails; everything else must
    /// exist in the store.
    pub fn load(&self, id: &str) -> Result<SettingsDocument, ProfileError> {
        if id == FACTORY_PROFILE_ID {
            return Ok(factory_default_document());
        }
        self.read_all()
            .into_iter()
            .find(|profile| profile.id == id)
            .map(|profile| {
                let mut settings = profile.settings;
                settings.enforce_detail_invariants();
                settings
            })
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<(), ProfileError> {
        if id == FACTORY_PROFILE_ID {
            return Err(ProfileError::ReservedId);
        }
        let mut profiles = self.read_all();
        let before = profiles.len();
        profiles.retain(|profile| profile.id != id);
        if profiles.len() == before {
            return Err(ProfileError::NotFound(id.to_string()));
        }
        self.write_all(&profiles)
    }

    pub fn rename(&self, id: &str, new_name: &str) -> Result<(), ProfileError> {
        if id == FACTORY_PROFILE_ID {
            return Err(ProfileError::ReservedId);
        }
        self.update_profile(id, |profile| profile.name = new_name.to_string())
    }

    pub fn set_thumbnail(&self, id: &str, thumbnail: &[u8]) -> Result<(), ProfileError> {
        if id == FACTORY_PROFILE_ID {
            return Err(ProfileError::ReservedId);
        }
        let encoded = encode_thumbnail(thumbnail)?;
        self.update_profile(id, |profile| profile.thumbnail = Some(encoded.clone()))
    }

    pub fn list(&self) -> Vec<Profile> {
        self.read_all()
    }

    pub fn clear(&self) -> Result<(), ProfileError> {
        self.write_all(&[])
    }

    fn update_profile(
        &self,
        id: &str,
        mutate: impl Fn(&mut Profile),
    ) -> Result<(), ProfileError> {
        let mut profiles = self.read_all();
        let Some(profile) = profiles.iter_mut().find(|profile| profile.id == id) else {
            return Err(ProfileError::NotFound(id.to_string()));
        };
        mutate(profile);
        self.write_all(&profiles)
    }
}

fn next_profile_id() -> String {
    let counter = PROFILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("profile-{}-{}", Utc::now().timestamp_millis(), counter)
}

/// Sniffs, decodes, downscales, and re-encodes thumbnail bytes as PNG,
/// returned base64-encoded.
fn encode_thumbnail(bytes: &[u8]) -> Result<String, ProfileError> {
    let is_image = infer::get(bytes)
        .map(|kind| kind.mime_type().starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(ProfileError::Thumbnail(
            "unrecognized image format".to_string(),
        ));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|err| ProfileError::Thumbnail(err.to_string()))?;
    let resized = decoded.thumbnail(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE);
    let mut out = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|err| ProfileError::Thumbnail(err.to_string()))?;
    Ok(general_purpose::STANDARD.encode(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn fresh_store() -> ProfileStore {
        ProfileStore::new(Arc::new(MemoryStore::new()))
    }

    fn png_bytes() -> Vec<u8> {
        let buffer = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 90, 60]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = fresh_store();
        let mut settings = factory_default_document();
        settings.theme_en = "Vintage Café".to_string();

        let id = store.save("cafe look", &settings, None).unwrap();
        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.theme_en, "Vintage Café");

        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "cafe look");
    }

    #[test]
    fn factory_id_always_loads_the_computed_baseline() {
        let store = fresh_store();
        let loaded = store.load(FACTORY_PROFILE_ID).unwrap();
        assert_eq!(loaded, factory_default_document());
        assert!(matches!(
            store.delete(FACTORY_PROFILE_ID),
            Err(ProfileError::ReservedId)
        ));
    }

    #[test]
    fn delete_and_rename() {
        let store = fresh_store();
        let settings = factory_default_document();
        let id = store.save("first", &settings, None).unwrap();

        store.rename(&id, "renamed").unwrap();
        assert_eq!(store.list()[0].name, "renamed");

        store.delete(&id).unwrap();
        assert!(store.list().is_empty());
        assert!(matches!(store.load(&id), Err(ProfileError::NotFound(_))));
    }

    #[test]
    fn missing_ids_are_not_found() {
        let store = fresh_store();
        assert!(matches!(
            store.rename("profile-nope", "x"),
            Err(ProfileError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("profile-nope"),
            Err(ProfileError::NotFound(_))
        ));
    }

    #[test]
    fn thumbnails_are_normalized_to_png_base64() {
        let store = fresh_store();
        let settings = factory_default_document();
        let id = store
            .save("with thumb", &settings, Some(&png_bytes()))
            .unwrap();

        let profile = store.list().into_iter().find(|p| p.id == id).unwrap();
        let encoded = profile.thumbnail.unwrap();
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        assert!(image::load_from_memory(&decoded).is_ok());
    }

    #[test]
    fn garbage_thumbnail_bytes_are_rejected() {
        let store = fresh_store();
        let settings = factory_default_document();
        let result = store.save("bad thumb", &settings, Some(b"not an image"));
        assert!(matches!(result, Err(ProfileError::Thumbnail(_))));
        // The failed save left nothing behind.
        assert!(store.list().is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let store = fresh_store();
        let settings = factory_default_document();
        store.save("one", &settings, None).unwrap();
        store.save("two", &settings, None).unwrap();
        store.clear().unwrap();
        assert!(store.list().is_empty());
    }
}
