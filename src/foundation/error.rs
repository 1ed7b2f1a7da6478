pub type GifforgeResult<T> = Result<T, GifforgeError>;

#[derive(thiserror::Error, Debug)]
pub enum GifforgeError {
    #[error("encoder resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("decode failure: {0}")]
    DecodeFailure(String),

    #[error("encoding failure: {0}")]
    EncodingFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GifforgeError {
    pub fn resource_unavailable(msg: impl Into<String>) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn decode_failure(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn encoding_failure(msg: impl Into<String>) -> Self {
        Self::EncodingFailure(msg.into())
    }
}
