use crate::term::{BareValue, Term};
use std::fmt;

/// Base IRI bound to a prefix. Builds IRIs by plain concatenation; nothing is validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    base: String,
}

impl Namespace {
    pub fn new(base: impl Into<String>) -> Self {
        Namespace { base: base.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// IRI reference for `local` under this namespace.
    pub fn term(&self, local: &str) -> Term {
        Term::Iri(format!("{}{}", self.base, local))
    }

    /// Shortens `iri` to `prefix:local` if it starts with this namespace.
    pub(crate) fn compact(&self, prefix: &str, iri: &str) -> Option<String> {
        iri.strip_prefix(self.base.as_str())
            .map(|local| format!("{}:{}", prefix, local))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

impl From<Namespace> for BareValue {
    fn from(ns: Namespace) -> Self {
        BareValue::Term(Term::Iri(ns.base))
    }
}
