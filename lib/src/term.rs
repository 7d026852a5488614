//! RDF terms and triples held by a [`crate::store::TripleStore`].
//!
//! A [`Term`] is one of three kinds: an IRI reference, a literal (with an optional datatype
//! or language tag, never both) or a blank node. Blank node labels only mean something
//! inside the store that owns them; comparing graphs across stores goes through
//! [`crate::isomorphism`].
//!
//! Values that arrive untyped (plain strings, numbers) are turned into terms by
//! [`safe_term`], which applies one fixed rule:
//!
//! - an already-typed [`Term`] is kept as is,
//! - text becomes a plain [`Literal`],
//! - any other scalar becomes an IRI reference of its display form.
//!
//! Text is never inspected: `"_:b0"` becomes the literal `"_:b0"`, not a blank node.
//! Blank nodes have to be built explicitly with [`Term::blank`].

use crate::errors::ScigraError;
use anyhow::{anyhow, Result};
use oxigraph::model as ox;
use std::fmt;

/// Literal value with an optional datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    lexical: String,
    datatype: Option<String>,
    lang: Option<String>,
}

impl Literal {
    /// Literal without datatype or language tag.
    pub fn simple(lexical: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            lang: None,
        }
    }

    pub fn language_tagged(lexical: impl Into<String>, lang: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            datatype: None,
            lang: Some(lang.into()),
        }
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn is_plain(&self) -> bool {
        self.datatype.is_none() && self.lang.is_none()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.lexical.chars() {
            match c {
                '"' => write!(f, "\\\"")?,
                '\\' => write!(f, "\\\\")?,
                '\n' => write!(f, "\\n")?,
                '\r' => write!(f, "\\r")?,
                c => write!(f, "{}", c)?,
            }
        }
        write!(f, "\"")?;
        if let Some(dt) = &self.datatype {
            write!(f, "^^<{}>", dt)
        } else if let Some(lang) = &self.lang {
            write!(f, "@{}", lang)
        } else {
            Ok(())
        }
    }
}

/// An RDF term. Equality is per kind: IRIs and blank nodes by their string,
/// literals by lexical form, datatype and language tag together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    /// IRI reference. The text is not validated; an IRI starting with `_:` does not
    /// survive a JSON-LD round trip (see [`crate::codec`]).
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Blank node with the given store-local label (without the `_:` prefix).
    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(lexical))
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(lexical, datatype))
    }

    pub fn lang_literal(lexical: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(Literal::language_tagged(lexical, lang))
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// IRI string, blank node label or lexical form, depending on the kind.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::BlankNode(label) => label,
            Term::Literal(lit) => lit.lexical(),
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

/// An input value that has not been given a term kind yet.
#[derive(Debug, Clone, PartialEq)]
pub enum BareValue {
    /// Already a term; kept unchanged.
    Term(Term),
    /// Text; becomes a plain literal.
    Text(String),
    /// Any other scalar (numbers, booleans) in display form; becomes an IRI reference.
    Scalar(String),
}

impl From<Term> for BareValue {
    fn from(t: Term) -> Self {
        BareValue::Term(t)
    }
}

impl From<&Term> for BareValue {
    fn from(t: &Term) -> Self {
        BareValue::Term(t.clone())
    }
}

impl From<Literal> for BareValue {
    fn from(l: Literal) -> Self {
        BareValue::Term(Term::Literal(l))
    }
}

impl From<&str> for BareValue {
    fn from(s: &str) -> Self {
        BareValue::Text(s.to_string())
    }
}

impl From<String> for BareValue {
    fn from(s: String) -> Self {
        BareValue::Text(s)
    }
}

macro_rules! scalar_bare_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for BareValue {
                fn from(v: $t) -> Self {
                    BareValue::Scalar(v.to_string())
                }
            }
        )*
    };
}

scalar_bare_value!(i32, i64, u32, u64, usize, f32, f64, bool);

/// Turns a bare value into a term. Total and deterministic: the same input always yields
/// the same kind of term.
///
/// Text is not inspected, so a `_:`-prefixed string is a literal, not a blank node.
pub fn safe_term(value: impl Into<BareValue>) -> Term {
    match value.into() {
        BareValue::Term(t) => t,
        BareValue::Text(s) => Term::Literal(Literal::simple(s)),
        BareValue::Scalar(s) => Term::Iri(s),
    }
}

/// A subject/predicate/object statement. The subject is an IRI or blank node and the
/// predicate is an IRI; [`Triple::new`] refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    subject: Term,
    predicate: Term,
    object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Result<Self> {
        if subject.is_literal() {
            return Err(anyhow!(ScigraError::InvalidTriple(format!(
                "literal {} cannot be a subject",
                subject
            ))));
        }
        if !predicate.is_iri() {
            return Err(anyhow!(ScigraError::InvalidTriple(format!(
                "{} cannot be a predicate",
                predicate
            ))));
        }
        Ok(Triple {
            subject,
            predicate,
            object,
        })
    }

    pub fn subject(&self) -> &Term {
        &self.subject
    }

    pub fn predicate(&self) -> &Term {
        &self.predicate
    }

    pub fn object(&self) -> &Term {
        &self.object
    }

    /// Rebuilds the triple with every term passed through `f`. Used for blank node
    /// relabelling, so `f` must keep IRIs as IRIs.
    pub(crate) fn map_terms(&self, mut f: impl FnMut(&Term) -> Term) -> Triple {
        Triple {
            subject: f(&self.subject),
            predicate: f(&self.predicate),
            object: f(&self.object),
        }
    }

    pub fn has_blank_node(&self) -> bool {
        self.subject.is_blank_node() || self.object.is_blank_node()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

// conversions to and from oxigraph, used for file I/O

impl From<&Term> for ox::Term {
    fn from(t: &Term) -> Self {
        match t {
            Term::Iri(iri) => ox::NamedNode::new_unchecked(iri.as_str()).into(),
            Term::BlankNode(label) => ox::BlankNode::new_unchecked(label.as_str()).into(),
            Term::Literal(lit) => {
                if let Some(dt) = lit.datatype() {
                    ox::Literal::new_typed_literal(lit.lexical(), ox::NamedNode::new_unchecked(dt))
                        .into()
                } else if let Some(lang) = lit.lang() {
                    ox::Literal::new_language_tagged_literal_unchecked(lit.lexical(), lang).into()
                } else {
                    ox::Literal::new_simple_literal(lit.lexical()).into()
                }
            }
        }
    }
}

impl TryFrom<ox::TermRef<'_>> for Term {
    type Error = anyhow::Error;

    #[allow(unreachable_patterns)]
    fn try_from(t: ox::TermRef<'_>) -> Result<Self> {
        match t {
            ox::TermRef::NamedNode(nn) => Ok(Term::Iri(nn.as_str().to_string())),
            ox::TermRef::BlankNode(bn) => Ok(Term::BlankNode(bn.as_str().to_string())),
            ox::TermRef::Literal(lit) => {
                let value = lit.value().to_string();
                if let Some(lang) = lit.language() {
                    Ok(Term::lang_literal(value, lang))
                } else if lit.datatype() == ox::vocab::xsd::STRING {
                    Ok(Term::literal(value))
                } else {
                    Ok(Term::typed_literal(value, lit.datatype().as_str()))
                }
            }
            other => Err(anyhow!(ScigraError::InvalidTriple(format!(
                "unsupported term {}",
                other
            )))),
        }
    }
}

impl From<&Triple> for ox::Triple {
    fn from(t: &Triple) -> Self {
        let subject: ox::NamedOrBlankNode = match &t.subject {
            Term::BlankNode(label) => ox::BlankNode::new_unchecked(label.as_str()).into(),
            other => ox::NamedNode::new_unchecked(other.value()).into(),
        };
        ox::Triple::new(
            subject,
            ox::NamedNode::new_unchecked(t.predicate.value()),
            ox::Term::from(&t.object),
        )
    }
}

impl TryFrom<ox::TripleRef<'_>> for Triple {
    type Error = anyhow::Error;

    fn try_from(t: ox::TripleRef<'_>) -> Result<Self> {
        let subject = match t.subject {
            ox::NamedOrBlankNodeRef::NamedNode(nn) => Term::Iri(nn.as_str().to_string()),
            ox::NamedOrBlankNodeRef::BlankNode(bn) => Term::BlankNode(bn.as_str().to_string()),
        };
        Triple::new(
            subject,
            Term::Iri(t.predicate.as_str().to_string()),
            Term::try_from(t.object)?,
        )
    }
}
