pub mod defaults;
pub mod document;
pub mod merge;

pub use defaults::{factory_default_document, FALLBACK_THEME_EN, FALLBACK_THEME_ZH, HEADER_TITLE_TEXT_ID};
pub use document::SettingsDocument;
pub use merge::deep_merge;
