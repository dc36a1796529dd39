// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Failures talking to the generative service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("API key not configured")]
    MissingCredential,
}

#[derive(Error, Debug)]
pub enum StylistError {
    #[error("Unreadable input: {0}")]
    Io(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Another operation is in progress")]
    Busy,

    #[error("Clothing analysis failed: {0}")]
    Analysis(#[source] ServiceError),

    #[error("Outfit generation failed: {0}")]
    Generation(#[source] ServiceError),

    #[error("Refinement failed: {0}")]
    Refinement(#[source] ServiceError),

    #[error("Visualization failed: {0}")]
    Visualization(#[source] ServiceError),
}

/// Coarse classification used when surfacing a failure to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Transport,
    Parse,
    Validation,
    Storage,
    Busy,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Transport(_) | ServiceError::Status { .. } => ErrorKind::Transport,
            ServiceError::Parse(_) => ErrorKind::Parse,
            ServiceError::MissingCredential => ErrorKind::Validation,
        }
    }
}

impl StylistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StylistError::Io(_) => ErrorKind::Io,
            StylistError::Validation(_) => ErrorKind::Validation,
            StylistError::Storage(_) | StylistError::Serialization(_) => ErrorKind::Storage,
            StylistError::Busy => ErrorKind::Busy,
            StylistError::Analysis(e)
            | StylistError::Generation(e)
            | StylistError::Refinement(e)
            | StylistError::Visualization(e) => e.kind(),
        }
    }
}

impl ResponseError for StylistError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Io | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Busy => StatusCode::CONFLICT,
            ErrorKind::Transport => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Parse => StatusCode::BAD_GATEWAY,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let label = match self.kind() {
            ErrorKind::Io => "Image processing error",
            ErrorKind::Validation => "Validation error",
            ErrorKind::Busy => "Busy",
            ErrorKind::Transport => "AI service error",
            ErrorKind::Parse => "AI response error",
            ErrorKind::Storage => "Storage error",
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": label,
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_errors_take_the_kind_of_their_cause() {
        let err = StylistError::Generation(ServiceError::Parse("no outfits".into()));
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = StylistError::Analysis(ServiceError::Status {
            status: 503,
            message: "overloaded".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = StylistError::Refinement(ServiceError::MissingCredential);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn busy_maps_to_conflict() {
        assert_eq!(StylistError::Busy.status_code(), StatusCode::CONFLICT);
    }
}
