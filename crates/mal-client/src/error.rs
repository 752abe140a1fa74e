//! Error taxonomy shared by the transport client and every decorator.
//!
//! Decorators only ever look at [`MalError::kind`]; messages are for humans.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MalError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MalError {
    /// The user does not exist or has no list.
    #[error("{0}")]
    UserNotFound(String),

    /// No anime with the requested id exists.
    #[error("{0}")]
    AnimeNotFound(String),

    /// Network, transport or non-success HTTP status. Worth retrying.
    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// MAL answered, but not in a shape we understand.
    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("operation was canceled")]
    Canceled,
}

/// The classification decorators act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Request,
    Api,
    Canceled,
}

impl MalError {
    pub fn request(message: impl Into<String>) -> Self {
        MalError::Request {
            message: message.into(),
            source: None,
        }
    }

    pub fn request_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MalError::Request {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        MalError::Api {
            message: message.into(),
            source: None,
        }
    }

    pub fn api_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MalError::Api {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn user_not_found(user: &str) -> Self {
        MalError::UserNotFound(format!("No MAL list exists for {}.", user))
    }

    pub fn anime_not_found(anime_id: u32) -> Self {
        MalError::AnimeNotFound(format!("No anime with id {} exists.", anime_id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MalError::UserNotFound(_) | MalError::AnimeNotFound(_) => ErrorKind::NotFound,
            MalError::Request { .. } => ErrorKind::Request,
            MalError::Api { .. } => ErrorKind::Api,
            MalError::Canceled => ErrorKind::Canceled,
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Request
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_canceled(&self) -> bool {
        self.kind() == ErrorKind::Canceled
    }
}
