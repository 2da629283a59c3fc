use crate::validation::ValidationError;
use thiserror::Error;

/// Failure of a Task Service or Auth Context call. The store never looks
/// inside it beyond success/failure; the page uses `kind()` and
/// `feedback_message()` to tell the user something sensible.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("not authorized (status {status}) for {url}")]
    Unauthorized { status: u16, url: String },
    #[error("credentials unavailable: {0}")]
    Credentials(String),
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("{url} responded with status {status}: {body}")]
    Status { status: u16, url: String, body: String },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    Network,
    Server,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Unauthorized { .. } | ServiceError::Credentials(_) => {
                ErrorKind::Authorization
            }
            ServiceError::Network { .. } => ErrorKind::Network,
            ServiceError::Status { .. } | ServiceError::Decode { .. } => ErrorKind::Server,
        }
    }

    pub fn feedback_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Authorization => "Your session has expired. Please log in again.",
            ErrorKind::Network => {
                "Could not reach the server. Check your connection and try again."
            }
            ErrorKind::Server => "Something went wrong on our side. Please try again later.",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}", .0.feedback_message())]
    Service(#[from] ServiceError),
    #[error("invalid {field}: {source}")]
    Validation {
        field: &'static str,
        source: ValidationError,
    },
    #[error("no task with id {0}")]
    TaskNotFound(crate::task::TaskId),
    #[error("not authenticated: set access_token in the config or TAREFAS_ACCESS_TOKEN")]
    NotAuthenticated,
}
