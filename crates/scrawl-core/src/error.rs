use thiserror::Error;

/// Errors produced by the scrawl protocol and relay layers.
#[derive(Debug, Error)]
pub enum ScrawlError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrawlError {
    /// Whether this error concerns a single inbound message only.
    ///
    /// Protocol errors are logged and the message dropped; the connection
    /// that sent it stays open.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ScrawlError::Codec(_) | ScrawlError::InvalidMessage(_) | ScrawlError::UnknownType(_)
        )
    }
}

impl From<serde_json::Error> for ScrawlError {
    fn from(e: serde_json::Error) -> Self {
        ScrawlError::Codec(e.to_string())
    }
}

pub type ScrawlResult<T> = Result<T, ScrawlError>;
