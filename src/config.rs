use std::env;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub data_dir: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_image_model: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: i32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: i32,
    pub gemini_safety_settings: String,
    pub request_timeout_seconds: u64,
    pub default_input_language: String,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_safety_settings(value: String) -> String {
    let lowered = value.trim().to_lowercase();
    match lowered.as_str() {
        "" | "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            "permissive".to_string()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            data_dir: env_string("DATA_DIR", "data"),
            gemini_api_key: env_string("GEMINI_API_KEY", ""),
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-3-pro-image-preview"),
            gemini_temperature: env_f32("GEMINI_TEMPERATURE", 0.7),
            gemini_top_k: env_i32("GEMINI_TOP_K", 40),
            gemini_top_p: env_f32("GEMINI_TOP_P", 0.95),
            gemini_max_output_tokens: env_i32("GEMINI_MAX_OUTPUT_TOKENS", 8192),
            gemini_safety_settings: normalize_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            request_timeout_seconds: env_u64("REQUEST_TIMEOUT_SECONDS", 90),
            default_input_language: env_string("DEFAULT_INPUT_LANGUAGE", "English"),
        })
    }
}

/// Request template for a themed catalog rewrite. The engine fills the
/// `{{...}}` tokens; tokens inside the serialized sections belong to the
/// document's own prompt templates and come through untouched.
pub const RECONCILE_PROMPT_TEMPLATE: &str = r#"You are restyling the configuration of a bilingual (English/Chinese) interior-design prompt studio around a user-provided theme.

User theme: {{themeInput}}
The user wrote the theme in {{inputLanguage}}.

First derive the theme pair:
- "themeEn": the direct English equivalent of the user theme.
- "themeZh": the direct Chinese equivalent of the user theme.
Translate only. Do not expand, embellish, or explain the theme.

Then rewrite the rewritable text of each section below to fit the theme. Keep every "id" exactly as given, keep every key, and never add or remove entries.

Prompt templates (rewrite only each "template" string; keep its placeholder tokens intact):
{{promptTemplates}}

UI labels (rewrite only "textEn" and "textZh"):
{{uiTexts}}

Categories (rewrite only "nameEn", "nameZh", "termEn", "termZh"):
{{categories}}

Room types (rewrite only "termEn" and "termZh"; both must be non-empty):
{{roomTypes}}

Styles (rewrite "nameEn", "nameZh", "basePromptEn", "basePromptZh"; keep "relatedCategoryIds" as given):
{{styles}}

Respond with one JSON object containing exactly these keys: "themeEn", "themeZh", "promptTemplates", "uiTexts", "categories", "roomTypes", "styles". Each section must keep the structure it was given. Return only JSON.
"#;
