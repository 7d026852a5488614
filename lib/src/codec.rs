//! JSON-LD interchange for [`TripleStore`]s.
//!
//! [`serialize`] groups triples by subject into node objects:
//!
//! ```json
//! [
//!   {
//!     "@id": "http://example.org/Alice",
//!     "@type": ["http://example.org/Person"],
//!     "http://example.org/knows": [{"@id": "_:b0"}],
//!     "http://example.org/age": [{"@value": "42", "@type": "http://www.w3.org/2001/XMLSchema#integer"}],
//!     "http://example.org/name": ["Alice", {"@value": "Alicia", "@language": "es"}]
//!   }
//! ]
//! ```
//!
//! Plain literals are bare strings, typed and language-tagged literals are value objects,
//! IRIs and blank nodes are `{"@id": ...}` references. Blank node labels are written as
//! `_:<label>`. `rdf:type` statements pointing at IRIs go into the node's `@type` list.
//!
//! [`deserialize`] reads that shape back, as well as a single node object, nested lists
//! of node objects, and wrapper objects carrying `@graph` and a flat `@context`.
//! Anything else fails with [`ScigraError::MalformedDocument`]; no triple is dropped
//! silently.
//!
//! Known limitation: JSON-LD reserves the `_:` prefix for blank nodes, so an IRI whose
//! text starts with `_:` (which a `uri` binding from an endpoint can carry) is written
//! as `{"@id": "_:..."}` and reads back as a blank node. Such IRIs are not valid
//! absolute IRIs; producers should not emit them.

use crate::consts::*;
use crate::errors::ScigraError;
use crate::namespace::Namespace;
use crate::store::TripleStore;
use crate::term::{Literal, Term, Triple};
use anyhow::{anyhow, Result};
use log::debug;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

fn malformed(msg: impl Into<String>) -> anyhow::Error {
    anyhow!(ScigraError::MalformedDocument(msg.into()))
}

/// Maps IRIs to the strings written in the document. Identity unless the store has
/// prefixes bound and compact output was requested.
struct Compactor<'a> {
    namespaces: Vec<(&'a str, &'a Namespace)>,
}

impl<'a> Compactor<'a> {
    fn identity() -> Self {
        Compactor { namespaces: vec![] }
    }

    fn for_store(store: &'a TripleStore) -> Self {
        let mut namespaces: Vec<(&str, &Namespace)> = store.namespaces().collect();
        // longest namespace wins when several match
        namespaces.sort_by(|a, b| b.1.as_str().len().cmp(&a.1.as_str().len()));
        Compactor { namespaces }
    }

    fn iri(&self, iri: &str) -> String {
        self.namespaces
            .iter()
            .find_map(|(prefix, ns)| ns.compact(prefix, iri))
            .unwrap_or_else(|| iri.to_string())
    }

    fn node_id(&self, term: &Term) -> String {
        match term {
            Term::BlankNode(label) => format!("{}{}", BLANK_NODE_PREFIX, label),
            other => self.iri(other.value()),
        }
    }

    fn value(&self, term: &Term) -> Value {
        match term {
            Term::Iri(_) | Term::BlankNode(_) => json!({ JSONLD_ID: self.node_id(term) }),
            Term::Literal(lit) => {
                if let Some(dt) = lit.datatype() {
                    json!({ JSONLD_VALUE: lit.lexical(), JSONLD_TYPE: self.iri(dt) })
                } else if let Some(lang) = lit.lang() {
                    json!({ JSONLD_VALUE: lit.lexical(), JSONLD_LANGUAGE: lang })
                } else {
                    Value::String(lit.lexical().to_string())
                }
            }
        }
    }
}

fn push_value(node: &mut Map<String, Value>, key: String, value: Value) {
    if let Value::Array(values) = node.entry(key).or_insert_with(|| Value::Array(vec![])) {
        values.push(value);
    }
}

fn node_objects(store: &TripleStore, compactor: &Compactor) -> Vec<Value> {
    let mut nodes: BTreeMap<&Term, Map<String, Value>> = BTreeMap::new();
    for triple in store {
        let node = nodes.entry(triple.subject()).or_insert_with(|| {
            let mut m = Map::new();
            m.insert(
                JSONLD_ID.to_string(),
                Value::String(compactor.node_id(triple.subject())),
            );
            m
        });
        if triple.predicate().value() == RDF_TYPE && triple.object().is_iri() {
            let ty = Value::String(compactor.node_id(triple.object()));
            push_value(node, JSONLD_TYPE.to_string(), ty);
        } else {
            let key = compactor.iri(triple.predicate().value());
            push_value(node, key, compactor.value(triple.object()));
        }
    }
    nodes.into_values().map(Value::Object).collect()
}

/// Serializes `store` to the expanded list of node objects, one per subject.
pub fn serialize(store: &TripleStore) -> Value {
    let nodes = node_objects(store, &Compactor::identity());
    debug!("Serialized {} triples into {} node objects", store.len(), nodes.len());
    Value::Array(nodes)
}

/// Like [`serialize`], but a document holding exactly one node object is unwrapped to
/// that object.
pub fn to_dict(store: &TripleStore) -> Value {
    match serialize(store) {
        Value::Array(mut nodes) if nodes.len() == 1 => nodes.remove(0),
        other => other,
    }
}

/// Embeds the store in a catalog document: `{"@id": catalog_id, "@graph": [to_dict(store)]}`.
///
/// The dict is always wrapped in a one-element list, so a store with several subjects
/// yields a list nested in `@graph`. Catalog consumers rely on this exact shape;
/// [`deserialize`] flattens it.
pub fn in_graph(store: &TripleStore, catalog_id: &str) -> Value {
    json!({
        JSONLD_ID: catalog_id,
        JSONLD_GRAPH: [to_dict(store)],
    })
}

/// Serializes with the store's prefix bindings: `{"@context": {...}, "@graph": [...]}`
/// where predicates, `@id`s, `@type`s and datatypes are shortened to `prefix:local`.
pub fn serialize_compact(store: &TripleStore) -> Value {
    let context: Map<String, Value> = store
        .namespaces()
        .map(|(prefix, ns)| (prefix.to_string(), Value::String(ns.as_str().to_string())))
        .collect();
    let nodes = node_objects(store, &Compactor::for_store(store));
    json!({
        JSONLD_CONTEXT: context,
        JSONLD_GRAPH: nodes,
    })
}

/// Pretty-printed [`serialize`] output, indented by four spaces.
pub fn to_jsonld_string(store: &TripleStore) -> Result<String> {
    let doc = serialize(store);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

/// Term definitions collected from a flat `@context`.
#[derive(Default)]
struct Context {
    terms: BTreeMap<String, String>,
    vocab: Option<String>,
}

impl Context {
    fn parse(value: &Value) -> Result<Self> {
        let mut ctx = Context::default();
        ctx.merge(value)?;
        Ok(ctx)
    }

    fn merge(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Array(items) => items.iter().try_for_each(|item| self.merge(item)),
            Value::Object(map) => {
                for (key, def) in map {
                    match (key.as_str(), def) {
                        ("@vocab", Value::String(v)) => self.vocab = Some(v.clone()),
                        ("@vocab", Value::Null) => self.vocab = None,
                        ("@version", _) => {}
                        (k, _) if k.starts_with('@') => {
                            return Err(malformed(format!("unsupported context keyword {}", k)))
                        }
                        (k, Value::String(iri)) => {
                            self.terms.insert(k.to_string(), iri.clone());
                        }
                        (k, Value::Object(d)) => match d.get(JSONLD_ID) {
                            Some(Value::String(iri)) => {
                                self.terms.insert(k.to_string(), iri.clone());
                            }
                            _ => {
                                return Err(malformed(format!(
                                    "term definition for {} has no string @id",
                                    k
                                )))
                            }
                        },
                        (k, _) => {
                            return Err(malformed(format!("unsupported term definition for {}", k)))
                        }
                    }
                }
                Ok(())
            }
            Value::String(url) => Err(malformed(format!("remote context {} is not supported", url))),
            _ => Err(malformed("@context must be an object, list or null")),
        }
    }

    /// Expands a term, compact IRI or absolute IRI. `vocab` enables `@vocab` expansion
    /// for bare words, which only applies to property keys and `@type` values.
    fn expand(&self, s: &str, vocab: bool) -> String {
        if s.starts_with(BLANK_NODE_PREFIX) {
            return s.to_string();
        }
        if let Some(iri) = self.terms.get(s) {
            return iri.clone();
        }
        if let Some((prefix, rest)) = s.split_once(':') {
            if !rest.starts_with("//") {
                if let Some(ns) = self.terms.get(prefix) {
                    return format!("{}{}", ns, rest);
                }
            }
            return s.to_string();
        }
        match (&self.vocab, vocab) {
            (Some(v), true) => format!("{}{}", v, s),
            _ => s.to_string(),
        }
    }

    fn node_term(&self, id: &str) -> Term {
        match id.strip_prefix(BLANK_NODE_PREFIX) {
            Some(label) => Term::BlankNode(label.to_string()),
            None => Term::Iri(self.expand(id, false)),
        }
    }
}

struct Decoder<'a> {
    ctx: &'a Context,
    triples: Vec<Triple>,
}

impl Decoder<'_> {
    fn push(&mut self, s: &Term, p: Term, o: Term) -> Result<()> {
        let triple = Triple::new(s.clone(), p, o).map_err(|e| malformed(e.to_string()))?;
        self.triples.push(triple);
        Ok(())
    }

    /// Decodes a node object and returns its subject. `top_level` allows a `@context`
    /// entry, which the caller has already parsed.
    fn node(&mut self, value: &Value, top_level: bool) -> Result<Term> {
        let Value::Object(map) = value else {
            return Err(malformed(format!("expected a node object, found {}", value)));
        };
        let subject = match map.get(JSONLD_ID) {
            Some(Value::String(id)) => self.ctx.node_term(id),
            Some(other) => return Err(malformed(format!("@id must be a string, found {}", other))),
            None => return Err(malformed("node object without @id")),
        };
        for (key, values) in map {
            match key.as_str() {
                JSONLD_ID => {}
                JSONLD_CONTEXT if top_level => {}
                JSONLD_CONTEXT => {
                    // nested contexts could silently change how keys expand
                    return Err(malformed("nested @context is not supported"));
                }
                JSONLD_TYPE => {
                    for ty in as_list(values) {
                        let Value::String(ty) = ty else {
                            return Err(malformed(format!("@type entries must be strings, found {}", ty)));
                        };
                        let object = match ty.strip_prefix(BLANK_NODE_PREFIX) {
                            Some(label) => Term::BlankNode(label.to_string()),
                            None => Term::Iri(self.ctx.expand(ty, true)),
                        };
                        self.push(&subject, Term::iri(RDF_TYPE), object)?;
                    }
                }
                k if k.starts_with('@') => {
                    return Err(malformed(format!("unsupported keyword {} in node object", k)))
                }
                k => {
                    let predicate = Term::Iri(self.ctx.expand(k, true));
                    for v in as_list(values) {
                        let object = self.value(v)?;
                        self.push(&subject, predicate.clone(), object)?;
                    }
                }
            }
        }
        Ok(subject)
    }

    fn value(&mut self, value: &Value) -> Result<Term> {
        match value {
            Value::String(s) => Ok(Term::literal(s.as_str())),
            Value::Bool(_) | Value::Number(_) => native_literal(value, None),
            Value::Object(map) if map.contains_key(JSONLD_VALUE) => {
                let lexical = &map[JSONLD_VALUE];
                let datatype = match map.get(JSONLD_TYPE) {
                    Some(Value::String(dt)) => Some(self.ctx.expand(dt, true)),
                    Some(other) => return Err(malformed(format!("literal @type must be a string, found {}", other))),
                    None => None,
                };
                let lang = match map.get(JSONLD_LANGUAGE) {
                    Some(Value::String(lang)) => Some(lang.as_str()),
                    Some(other) => return Err(malformed(format!("@language must be a string, found {}", other))),
                    None => None,
                };
                if let Some(extra) = map.keys().find(|k| {
                    !matches!(k.as_str(), JSONLD_VALUE | JSONLD_TYPE | JSONLD_LANGUAGE)
                }) {
                    return Err(malformed(format!("unexpected {} in value object", extra)));
                }
                match (lexical, datatype, lang) {
                    (_, Some(_), Some(_)) => Err(malformed("value object has both @type and @language")),
                    (Value::String(s), Some(dt), None) => Ok(Term::typed_literal(s.as_str(), dt)),
                    (Value::String(s), None, Some(lang)) => Ok(Term::lang_literal(s.as_str(), lang)),
                    (Value::String(s), None, None) => Ok(Term::literal(s.as_str())),
                    (Value::Bool(_) | Value::Number(_), dt, None) => native_literal(lexical, dt),
                    (other, _, _) => Err(malformed(format!("unsupported @value {}", other))),
                }
            }
            Value::Object(map) if map.contains_key(JSONLD_ID) => {
                if map.len() == 1 {
                    match &map[JSONLD_ID] {
                        Value::String(id) => Ok(self.ctx.node_term(id)),
                        other => Err(malformed(format!("@id must be a string, found {}", other))),
                    }
                } else {
                    // embedded node object
                    self.node(value, false)
                }
            }
            other => Err(malformed(format!("unknown value shape {}", other))),
        }
    }
}

/// Literal for a JSON number or boolean, typed the way JSON-LD maps native values unless
/// an explicit datatype is given.
fn native_literal(value: &Value, datatype: Option<String>) -> Result<Term> {
    let (lexical, default_dt) = match value {
        Value::Bool(b) => (b.to_string(), XSD_BOOLEAN),
        Value::Number(n) if n.is_i64() || n.is_u64() => (n.to_string(), XSD_INTEGER),
        Value::Number(n) => match n.as_f64() {
            Some(f) => (format!("{:E}", f), XSD_DOUBLE),
            None => return Err(malformed(format!("unrepresentable number {}", n))),
        },
        other => return Err(malformed(format!("not a native value: {}", other))),
    };
    let datatype = datatype.unwrap_or_else(|| default_dt.to_string());
    Ok(Term::Literal(Literal::typed(lexical, datatype)))
}

/// Treats a non-list value as a one-element list and flattens nested lists and `@set`.
fn as_list(value: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    fn walk<'v>(value: &'v Value, out: &mut Vec<&'v Value>) {
        match value {
            Value::Array(items) => items.iter().for_each(|item| walk(item, out)),
            Value::Object(map) if map.len() == 1 && map.contains_key("@set") => {
                walk(&map["@set"], out)
            }
            other => out.push(other),
        }
    }
    walk(value, &mut out);
    out
}

/// Rebuilds a store from a JSON-LD document. Term kinds, datatypes and language tags come
/// back exactly; blank node labels are kept.
pub fn deserialize(doc: &Value) -> Result<TripleStore> {
    let (ctx, nodes) = match doc {
        Value::Array(_) => (Context::default(), as_list(doc)),
        Value::Object(map) => {
            let ctx = match map.get(JSONLD_CONTEXT) {
                Some(c) => Context::parse(c)?,
                None => Context::default(),
            };
            match map.get(JSONLD_GRAPH) {
                Some(graph) => {
                    let mut nodes = as_list(graph);
                    // only @id and @context may sit beside @graph
                    let own_props = map.keys().any(|k| {
                        !matches!(k.as_str(), JSONLD_ID | JSONLD_GRAPH | JSONLD_CONTEXT)
                    });
                    if own_props {
                        return Err(malformed(
                            "object carrying @graph must not have other properties",
                        ));
                    }
                    nodes.retain(|n| !n.is_null());
                    (ctx, nodes)
                }
                None => (ctx, vec![doc]),
            }
        }
        other => return Err(malformed(format!("expected an object or a list, found {}", other))),
    };

    let mut decoder = Decoder {
        ctx: &ctx,
        triples: Vec::new(),
    };
    let top_level = nodes.len() == 1 && std::ptr::eq(nodes[0], doc);
    for node in nodes {
        decoder.node(node, top_level)?;
    }

    let mut store: TripleStore = decoder.triples.into_iter().collect();
    for (prefix, iri) in &ctx.terms {
        store.bind(prefix, iri);
    }
    debug!("Deserialized {} triples", store.len());
    Ok(store)
}

/// Parses JSON-LD text and rebuilds the store; syntax errors are reported as
/// [`ScigraError::MalformedDocument`].
pub fn from_jsonld_str(s: &str) -> Result<TripleStore> {
    let doc: Value = serde_json::from_str(s).map_err(|e| malformed(e.to_string()))?;
    deserialize(&doc)
}
