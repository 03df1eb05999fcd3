pub mod extract;
pub mod gemini;

pub use extract::{extract_json, ExtractError};
pub use gemini::{generate_image, GeminiClient, ImageGenerationError};

use anyhow::Result;

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Ask the model to return JSON-formatted output.
    pub expect_json: bool,
}

/// Text-generation capability the reconciliation engine depends on. The
/// production implementation talks to Gemini; tests substitute canned
/// responses.
#[allow(async_fn_in_trait)]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<String>;
}
