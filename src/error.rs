use thiserror::Error;

use crate::core::reflect::InvocationError;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("Malformed method signature: {0}")]
    MalformedSignature(String),

    #[error("No method {owner}#{name} with {arity} parameters")]
    NoSuchMethod {
        owner: String,
        name: String,
        arity: usize,
    },

    #[error("Ambiguity between {first} and {second}")]
    AmbiguousMethod { first: String, second: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Can't resolve all input fields for: {}", .0.join(", "))]
    UnresolvedPipeline(Vec<String>),

    #[error("Pipeline already compiled; reset before compiling again")]
    AlreadyCompiled,

    #[error("'{0}' already defined as output field")]
    PassThroughOverlap(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    #[error("Missing field '{0}' in record")]
    MissingField(String),

    #[error("Context error: {0}")]
    Context(String),

    #[error("{0} used before preparation")]
    NotPrepared(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
