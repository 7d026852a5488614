//! Turns SPARQL results rows bound to `subject`, `predicate` and `object` into triples.
//!
//! - the predicate is always an IRI,
//! - the subject is a blank node when tagged `bnode` and an IRI otherwise,
//! - the object is a blank node (`bnode`), an IRI (`uri`) or a literal. A literal carries
//!   its datatype if one is given, else its language tag, else nothing. An object with a
//!   missing or unknown tag is read as a plain literal.
//!
//! A row that lacks one of the three variables, or whose subject or predicate carries a
//! tag outside the SPARQL results vocabulary, fails the whole call with
//! [`ScigraError::MalformedBinding`] before anything is inserted.

use crate::errors::ScigraError;
use crate::results::{Binding, BindingRow, ResultsPayload};
use crate::store::TripleStore;
use crate::term::{Term, Triple};
use anyhow::{anyhow, Result};
use log::{debug, info};

pub const SUBJECT_VAR: &str = "subject";
pub const PREDICATE_VAR: &str = "predicate";
pub const OBJECT_VAR: &str = "object";

// "typed-literal" is what SPARQL JSON writers of the pre-1.1 era emit
const KNOWN_TAGS: [&str; 4] = ["uri", "bnode", "literal", "typed-literal"];

fn malformed(index: usize, msg: impl std::fmt::Display) -> anyhow::Error {
    anyhow!(ScigraError::MalformedBinding(format!("row {}: {}", index, msg)))
}

fn variable<'a>(row: &'a BindingRow, index: usize, name: &str) -> Result<&'a Binding> {
    row.get(name)
        .ok_or_else(|| malformed(index, format!("missing variable ?{}", name)))
}

fn check_tag(binding: &Binding, index: usize, name: &str) -> Result<()> {
    match binding.kind.as_deref() {
        Some(tag) if KNOWN_TAGS.contains(&tag) => Ok(()),
        Some(tag) => Err(malformed(index, format!("unknown type tag {:?} for ?{}", tag, name))),
        None => Err(malformed(index, format!("missing type tag for ?{}", name))),
    }
}

fn object_term(binding: &Binding) -> Term {
    match binding.kind.as_deref() {
        Some("bnode") => Term::blank(binding.value.as_str()),
        Some("uri") => Term::iri(binding.value.as_str()),
        Some("literal") | Some("typed-literal") => {
            if let Some(dt) = &binding.datatype {
                Term::typed_literal(binding.value.as_str(), dt.as_str())
            } else if let Some(lang) = &binding.lang {
                Term::lang_literal(binding.value.as_str(), lang.as_str())
            } else {
                Term::literal(binding.value.as_str())
            }
        }
        other => {
            debug!("Object tag {:?} read as a plain literal", other);
            Term::literal(binding.value.as_str())
        }
    }
}

/// Converts one results row to a triple.
pub fn row_to_triple(row: &BindingRow, index: usize) -> Result<Triple> {
    let s = variable(row, index, SUBJECT_VAR)?;
    let p = variable(row, index, PREDICATE_VAR)?;
    let o = variable(row, index, OBJECT_VAR)?;
    check_tag(s, index, SUBJECT_VAR)?;
    if p.kind.is_some() {
        check_tag(p, index, PREDICATE_VAR)?;
    }

    let subject = if s.kind.as_deref() == Some("bnode") {
        Term::blank(s.value.as_str())
    } else {
        Term::iri(s.value.as_str())
    };
    let predicate = Term::iri(p.value.as_str());
    Triple::new(subject, predicate, object_term(o)).map_err(|e| malformed(index, e))
}

/// Adds every row of `payload` to `store`. All rows are converted first, so a malformed
/// row leaves `store` unchanged.
pub fn materialize_into(payload: &ResultsPayload, store: &mut TripleStore) -> Result<usize> {
    let triples = payload
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| row_to_triple(row, i))
        .collect::<Result<Vec<_>>>()?;
    let before = store.len();
    store.extend(triples);
    let added = store.len() - before;
    info!(
        "Materialized {} rows into {} new triples",
        payload.rows().len(),
        added
    );
    Ok(added)
}

/// Builds a fresh store from `payload`; duplicate rows collapse.
pub fn materialize(payload: &ResultsPayload) -> Result<TripleStore> {
    let mut store = TripleStore::new();
    materialize_into(payload, &mut store)?;
    Ok(store)
}
