use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirestoreErrorCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl FirestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirestoreErrorCode::Cancelled => "firestore/cancelled",
            FirestoreErrorCode::Unknown => "firestore/unknown",
            FirestoreErrorCode::InvalidArgument => "firestore/invalid-argument",
            FirestoreErrorCode::DeadlineExceeded => "firestore/deadline-exceeded",
            FirestoreErrorCode::NotFound => "firestore/not-found",
            FirestoreErrorCode::AlreadyExists => "firestore/already-exists",
            FirestoreErrorCode::PermissionDenied => "firestore/permission-denied",
            FirestoreErrorCode::ResourceExhausted => "firestore/resource-exhausted",
            FirestoreErrorCode::FailedPrecondition => "firestore/failed-precondition",
            FirestoreErrorCode::Aborted => "firestore/aborted",
            FirestoreErrorCode::OutOfRange => "firestore/out-of-range",
            FirestoreErrorCode::Unimplemented => "firestore/unimplemented",
            FirestoreErrorCode::Internal => "firestore/internal",
            FirestoreErrorCode::Unavailable => "firestore/unavailable",
            FirestoreErrorCode::DataLoss => "firestore/data-loss",
            FirestoreErrorCode::Unauthenticated => "firestore/unauthenticated",
        }
    }

    /// Parses the code reported by a native engine.
    ///
    /// Engines report either the bare code (`permission-denied`) or the
    /// namespaced form (`firestore/permission-denied`). Anything else maps to
    /// [`FirestoreErrorCode::Unknown`].
    pub fn from_native(code: &str) -> Self {
        let code = code.strip_prefix("firestore/").unwrap_or(code);
        match code {
            "cancelled" => FirestoreErrorCode::Cancelled,
            "invalid-argument" => FirestoreErrorCode::InvalidArgument,
            "deadline-exceeded" => FirestoreErrorCode::DeadlineExceeded,
            "not-found" => FirestoreErrorCode::NotFound,
            "already-exists" => FirestoreErrorCode::AlreadyExists,
            "permission-denied" => FirestoreErrorCode::PermissionDenied,
            "resource-exhausted" => FirestoreErrorCode::ResourceExhausted,
            "failed-precondition" => FirestoreErrorCode::FailedPrecondition,
            "aborted" => FirestoreErrorCode::Aborted,
            "out-of-range" => FirestoreErrorCode::OutOfRange,
            "unimplemented" => FirestoreErrorCode::Unimplemented,
            "internal" => FirestoreErrorCode::Internal,
            "unavailable" => FirestoreErrorCode::Unavailable,
            "data-loss" => FirestoreErrorCode::DataLoss,
            "unauthenticated" => FirestoreErrorCode::Unauthenticated,
            _ => FirestoreErrorCode::Unknown,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FirestoreError {
    pub code: FirestoreErrorCode,
    message: String,
    stack: Option<String>,
}

impl FirestoreError {
    pub fn new(code: FirestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            stack: None,
        }
    }

    /// Builds an error from the `{code, message}` body delivered by the engine.
    pub fn from_native(code: &str, message: impl Into<String>) -> Self {
        Self::new(FirestoreErrorCode::from_native(code), message)
    }

    /// Attaches the call site that started the failing operation.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Prepends the failing operation's name, e.g. `firebase.firestore().doc().set(*) `.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.message = format!("{prefix}{}", self.message);
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

impl Display for FirestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())?;
        if let Some(stack) = &self.stack {
            write!(f, "\n    at {stack}")?;
        }
        Ok(())
    }
}

impl Error for FirestoreError {}

pub type FirestoreResult<T> = Result<T, FirestoreError>;

pub fn invalid_argument(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Internal, message)
}

pub fn failed_precondition(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::FailedPrecondition, message)
}
