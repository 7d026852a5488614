// Error kinds raised by the store, codec, materializer and query client

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScigraError {
    /// A bare value could map to more than one term kind. Declared for callers that
    /// want to match on it; the safe-term rule never produces it.
    CoercionAmbiguity(String),
    /// A coerced term ended up in a triple position it may not occupy.
    InvalidTriple(String),
    /// The JSON-LD input does not have the node-object shape the codec reads.
    MalformedDocument(String),
    /// The remote endpoint could not be reached or answered with something unusable.
    QueryExecution(String),
    /// A results row lacks one of the subject/predicate/object variables or carries an
    /// unknown type tag.
    MalformedBinding(String),
    /// A query was requested before any query text was configured.
    MissingQuery,
}

impl fmt::Display for ScigraError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScigraError::CoercionAmbiguity(v) => write!(f, "Ambiguous term coercion for {}", v),
            ScigraError::InvalidTriple(m) => write!(f, "Invalid triple: {}", m),
            ScigraError::MalformedDocument(m) => write!(f, "Malformed JSON-LD document: {}", m),
            ScigraError::QueryExecution(m) => write!(f, "Query execution failed: {}", m),
            ScigraError::MalformedBinding(m) => write!(f, "Malformed result binding: {}", m),
            ScigraError::MissingQuery => write!(f, "No query configured"),
        }
    }
}

impl std::error::Error for ScigraError {}

impl ScigraError {
    /// Returns the `ScigraError` carried by an `anyhow::Error`, if any.
    pub fn kind_of(err: &anyhow::Error) -> Option<&ScigraError> {
        err.downcast_ref::<ScigraError>()
    }
}
