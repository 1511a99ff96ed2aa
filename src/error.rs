use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("Polygon needs at least 3 vertices, got {0}")]
    InsufficientVertices(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by (or while talking to) an external collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("{endpoint} unreachable: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} rejected the request: {message}")]
    Status { endpoint: String, message: String },

    #[error("{endpoint} returned an unreadable payload: {message}")]
    Decode { endpoint: String, message: String },
}

impl ServiceError {
    pub fn status(endpoint: &str, message: impl Into<String>) -> Self {
        ServiceError::Status {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// The message meant for the user, without the endpoint prefix.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::Transport { message, .. }
            | ServiceError::Status { message, .. }
            | ServiceError::Decode { message, .. } => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
