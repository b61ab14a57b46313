use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowflatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("Reserved identifier: {0}")]
    ReservedIdentifier(String),

    #[error("Type not found: {0}")]
    TypeNotFound(String),

    #[error("Type mismatch: {0}")]
    TypeCompatibility(String),

    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Payload-free classification of a [`FlowflatError`], for drivers that map
/// errors to exit codes and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    DuplicateDefinition,
    ReservedIdentifier,
    TypeResolution,
    TypeCompatibility,
    Structural,
    Value,
    UnknownAttribute,
    Internal,
}

impl FlowflatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowflatError::Io(_)                  => ErrorKind::Io,
            FlowflatError::ParseError { .. }      => ErrorKind::Parse,
            FlowflatError::DuplicateDefinition(_) => ErrorKind::DuplicateDefinition,
            FlowflatError::ReservedIdentifier(_)  => ErrorKind::ReservedIdentifier,
            FlowflatError::TypeNotFound(_)        => ErrorKind::TypeResolution,
            FlowflatError::TypeCompatibility(_)   => ErrorKind::TypeCompatibility,
            FlowflatError::Structural(_)          => ErrorKind::Structural,
            FlowflatError::InvalidValue(_)        => ErrorKind::Value,
            FlowflatError::UnknownAttribute(_)    => ErrorKind::UnknownAttribute,
            FlowflatError::Internal(_)            => ErrorKind::Internal,
        }
    }
}
