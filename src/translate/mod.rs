pub mod analysis;
pub mod openai;
pub mod orchestrator;
pub mod prompt;

pub use analysis::{analyze_content, DEFAULT_SUMMARY};
pub use openai::OpenAiTranslator;
pub use orchestrator::{
    ContextLog, Degradation, GroupTranslator, RetryPolicy, TranslationUnit, UnitStatus,
};

use crate::error::Result;
use async_trait::async_trait;

/// Text completion service used for both content analysis and translation.
///
/// Implementations are called concurrently and should not retry on their own;
/// retry, timeout and fallback policy live in [`GroupTranslator`].
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, system_prompt: &str, temperature: f32) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Convert language code to human-readable name for better prompting.
pub fn language_code_to_name(code: &str) -> &'static str {
    let lowercase = code.to_lowercase();
    match lowercase.as_str() {
        "en" => "English",
        "zh" | "zh-cn" | "zh-hans" => "Simplified Chinese",
        "zh-tw" | "zh-hk" | "zh-hant" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        _ => "the target language",
    }
}
