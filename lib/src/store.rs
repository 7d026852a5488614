//! The in-memory triple store.
//!
//! A [`TripleStore`] is a set of [`Triple`]s plus a prefix table used when serializing.
//! Adding a triple that is already present does nothing. Prefix bindings never affect
//! term identity.

use crate::codec;
use crate::namespace::Namespace;
use crate::term::{safe_term, BareValue, Term, Triple};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model as ox;
use std::collections::{btree_set, BTreeMap, BTreeSet};
use std::io::BufReader;
use std::path::Path;

/// On-disk serializations understood by [`TripleStore::load`] and
/// [`TripleStore::write_to_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Turtle,
    NTriples,
    RdfXml,
    JsonLd,
}

impl StoreFormat {
    /// Guesses the format from a file extension. Unknown extensions yield `None`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ttl" | "n3" => Some(StoreFormat::Turtle),
            "nt" => Some(StoreFormat::NTriples),
            "xml" | "rdf" | "owl" => Some(StoreFormat::RdfXml),
            "jsonld" | "json" => Some(StoreFormat::JsonLd),
            _ => None,
        }
    }

    fn rdf_format(self) -> Option<RdfFormat> {
        match self {
            StoreFormat::Turtle => Some(RdfFormat::Turtle),
            StoreFormat::NTriples => Some(RdfFormat::NTriples),
            StoreFormat::RdfXml => Some(RdfFormat::RdfXml),
            StoreFormat::JsonLd => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleStore {
    triples: BTreeSet<Triple>,
    namespaces: BTreeMap<String, Namespace>,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an already-built triple. Returns `true` if it was not present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Coerces each of `s`, `p`, `o` with [`safe_term`] and inserts the resulting triple.
    ///
    /// Plain text turns into a literal, so text in subject or predicate position is
    /// refused with [`crate::errors::ScigraError::InvalidTriple`]; build IRIs and blank
    /// nodes explicitly (e.g. through a [`Namespace`]) for those positions. The store is
    /// left untouched on error.
    pub fn add(
        &mut self,
        s: impl Into<BareValue>,
        p: impl Into<BareValue>,
        o: impl Into<BareValue>,
    ) -> Result<bool> {
        let triple = Triple::new(safe_term(s), safe_term(p), safe_term(o))?;
        Ok(self.insert(triple))
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Iterates the triples in a stable order. The iterator borrows the store, so the
    /// store cannot be mutated while it is alive; calling `iter` again restarts it.
    pub fn iter(&self) -> btree_set::Iter<'_, Triple> {
        self.triples.iter()
    }

    pub fn triples_for_subject<'a>(&'a self, subject: &'a Term) -> impl Iterator<Item = &'a Triple> {
        self.triples.iter().filter(move |t| t.subject() == subject)
    }

    /// Distinct subjects, in term order.
    pub fn subjects(&self) -> BTreeSet<&Term> {
        self.triples.iter().map(|t| t.subject()).collect()
    }

    /// Every blank node appearing in subject or object position.
    pub fn blank_nodes(&self) -> BTreeSet<&Term> {
        self.triples
            .iter()
            .flat_map(|t| [t.subject(), t.object()])
            .filter(|t| t.is_blank_node())
            .collect()
    }

    /// Registers `prefix` for `iri`, replacing any earlier binding of the same prefix.
    pub fn bind(&mut self, prefix: &str, iri: &str) -> Namespace {
        let ns = Namespace::new(iri);
        if let Some(old) = self.namespaces.insert(prefix.to_string(), ns.clone()) {
            if old != ns {
                debug!("Rebinding prefix {} from {} to {}", prefix, old, ns);
            }
        }
        ns
    }

    pub fn namespace(&self, prefix: &str) -> Option<&Namespace> {
        self.namespaces.get(prefix)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &Namespace)> {
        self.namespaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Adds every triple and prefix binding of `other` to this store.
    pub fn merge(&mut self, other: TripleStore) {
        self.triples.extend(other.triples);
        self.namespaces.extend(other.namespaces);
    }

    /// Parses the RDF file at `path` into this store. When `format` is `None` it is
    /// guessed from the extension, defaulting to Turtle. Returns the number of triples
    /// that were new to the store. A file that fails to parse adds nothing.
    pub fn load(&mut self, path: &Path, format: Option<StoreFormat>) -> Result<usize> {
        let format = format
            .or_else(|| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(StoreFormat::from_extension)
            })
            .unwrap_or(StoreFormat::Turtle);
        debug!("Reading file: {} as {:?}", path.display(), format);
        let before = self.len();

        match format.rdf_format() {
            Some(rdf_format) => {
                let file = std::fs::File::open(path)?;
                let parser = RdfParser::from_format(rdf_format).for_reader(BufReader::new(file));
                // nothing is inserted until the whole file has parsed
                let mut parsed = Vec::new();
                for quad in parser {
                    let quad = quad?;
                    let triple = ox::Triple::new(quad.subject, quad.predicate, quad.object);
                    parsed.push(Triple::try_from(triple.as_ref())?);
                }
                self.extend(parsed);
            }
            None => {
                let content = std::fs::read_to_string(path)?;
                self.merge(codec::from_jsonld_str(&content)?);
            }
        }

        let added = self.len() - before;
        info!("Loaded {} new triples from {}", added, path.display());
        Ok(added)
    }

    pub fn from_oxigraph(graph: &ox::Graph) -> Result<Self> {
        let mut store = TripleStore::new();
        for triple in graph.iter() {
            store.insert(Triple::try_from(triple)?);
        }
        Ok(store)
    }

    pub fn to_oxigraph(&self) -> ox::Graph {
        let mut graph = ox::Graph::new();
        for triple in &self.triples {
            graph.insert(&ox::Triple::from(triple));
        }
        graph
    }

    /// Renders the store in `format`, declaring the bound prefixes where the format allows.
    pub fn to_format(&self, format: StoreFormat) -> Result<String> {
        let Some(rdf_format) = format.rdf_format() else {
            return codec::to_jsonld_string(self);
        };
        let mut serializer = RdfSerializer::from_format(rdf_format);
        for (prefix, ns) in &self.namespaces {
            if ox::NamedNode::new(ns.as_str()).is_err() {
                warn!("Skipping prefix {} with invalid namespace IRI {}", prefix, ns);
                continue;
            }
            serializer = serializer.with_prefix(prefix.as_str(), ns.as_str())?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for triple in &self.triples {
            writer.serialize_triple(ox::Triple::from(triple).as_ref())?;
        }
        let bytes = writer.finish()?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Serializer produced invalid UTF-8: {}", e))
    }

    pub fn to_turtle(&self) -> Result<String> {
        self.to_format(StoreFormat::Turtle)
    }

    pub fn write_to_file(&self, path: &Path, format: StoreFormat) -> Result<()> {
        info!(
            "Writing store to file: {} with length {}",
            path.display(),
            self.len()
        );
        std::fs::write(path, self.to_format(format)?)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TripleStore {
    type Item = &'a Triple;
    type IntoIter = btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

impl FromIterator<Triple> for TripleStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        TripleStore {
            triples: iter.into_iter().collect(),
            namespaces: BTreeMap::new(),
        }
    }
}

impl Extend<Triple> for TripleStore {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScigraError;

    fn ex() -> Namespace {
        Namespace::new("http://example.org/")
    }

    #[test]
    fn test_add_is_idempotent() {
        let ex = ex();
        let mut store = TripleStore::new();
        assert!(store
            .add(ex.term("Alice"), ex.term("name"), "Alice")
            .unwrap());
        assert!(!store
            .add(ex.term("Alice"), ex.term("name"), "Alice")
            .unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_coerces_object_text_to_literal() {
        let ex = ex();
        let mut store = TripleStore::new();
        store.add(ex.term("a"), ex.term("p"), "text").unwrap();
        let triple = store.iter().next().unwrap();
        assert_eq!(triple.object(), &Term::literal("text"));
    }

    #[test]
    fn test_add_rejects_text_subject() {
        let ex = ex();
        let mut store = TripleStore::new();
        let err = store
            .add("_:b0", ex.term("p"), ex.term("o"))
            .unwrap_err();
        assert!(matches!(
            ScigraError::kind_of(&err),
            Some(ScigraError::InvalidTriple(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_bind_overwrites() {
        let mut store = TripleStore::new();
        store.bind("ex", "http://example.org/");
        let ns = store.bind("ex", "http://example.com/");
        assert_eq!(ns.as_str(), "http://example.com/");
        assert_eq!(store.namespace("ex"), Some(&ns));
        assert_eq!(store.namespaces().count(), 1);
    }

    #[test]
    fn test_iteration_restarts() {
        let ex = ex();
        let mut store = TripleStore::new();
        store.add(ex.term("a"), ex.term("p"), 1).unwrap();
        store.add(ex.term("b"), ex.term("p"), 2).unwrap();
        assert_eq!(store.iter().count(), 2);
        assert_eq!((&store).into_iter().count(), 2);
    }

    #[test]
    fn test_blank_nodes_and_subjects() {
        let ex = ex();
        let mut store = TripleStore::new();
        store
            .add(Term::blank("x"), ex.term("p"), Term::blank("y"))
            .unwrap();
        store.add(ex.term("a"), ex.term("p"), Term::blank("x")).unwrap();
        assert_eq!(store.blank_nodes().len(), 2);
        assert_eq!(store.subjects().len(), 2);
        assert_eq!(store.triples_for_subject(&Term::blank("x")).count(), 1);
    }

    #[test]
    fn test_turtle_output_uses_prefixes() {
        let mut store = TripleStore::new();
        let ex = store.bind("ex", "http://example.org/");
        store.add(ex.term("a"), ex.term("p"), "v").unwrap();
        let ttl = store.to_turtle().unwrap();
        assert!(ttl.contains("@prefix ex:"));
        assert!(ttl.contains("\"v\""));
    }
}
