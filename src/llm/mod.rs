pub mod error;
pub mod openai;
pub mod parser;
pub mod provider;
pub mod service;
pub mod types;

pub use error::LlmError;
pub use openai::OpenAiProvider;
pub use parser::{parse_article, ParseMode, ParsedArticle};
pub use provider::LlmProvider;
pub use service::LlmService;
pub use types::{ChatMessage, ChatRequest};
