pub mod ai_service;
pub mod models;

pub use ai_service::{AiProvider, ProviderError};
#[allow(unused_imports)]
pub use models::{AiConfig, AiMessage, AiProviderResponse, ResponseFormat};
