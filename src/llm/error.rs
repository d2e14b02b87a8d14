use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request timed out after {0} attempt(s)")]
    Timeout(u32),
    #[error("LLM endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM transport error: {0}")]
    Transport(String),
    #[error("failed to decode LLM response: {0}")]
    Decode(String),
    #[error("LLM returned no content")]
    EmptyResponse,
    #[error("{0} is not configured")]
    Disabled(&'static str),
}

impl LlmError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(1)
        } else if err.is_decode() {
            LlmError::Decode(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}
