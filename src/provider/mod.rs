use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::errors::GenerationError;

pub mod openai;

/// Sends one composed prompt to a language model and returns its raw text.
///
/// Implementations never retry; a failed call is reported once and the caller
/// decides whether to resubmit.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn name(&self) -> &str;
}

pub type DynProvider = Arc<dyn Provider>;

pub fn make_provider(cfg: &Config) -> Result<DynProvider, GenerationError> {
    Ok(Arc::new(openai::OpenAIProvider::from_config(cfg)?))
}
