use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to load sample corpus: {0}")]
    Samples(#[source] anyhow::Error),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to compile entity patterns: {0}")]
    Protect(#[source] anyhow::Error),
}
