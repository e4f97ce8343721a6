use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisualizerError {
    /// Microphone denied, absent, or blocked by the OS.
    #[error("microphone access failed: {0}")]
    Access(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VisualizerError {
    pub fn access(err: impl std::fmt::Display) -> Self {
        Self::Access(err.to_string())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
