use anyhow::Result;
use scigra::consts::XSD_INTEGER;
use scigra::materialize::{materialize, materialize_into};
use scigra::{
    codec, QueryConfig, RemoteQueryClient, ResultsPayload, ScigraError, Term, TripleStore,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ENDPOINT: &str = "http://localhost:3030/ds/sparql";

const TWO_ROWS: &str = r#"{
    "head": {"vars": ["subject", "predicate", "object"]},
    "results": {"bindings": [
        {"subject": {"type": "uri", "value": "http://example.org/S"},
         "predicate": {"type": "uri", "value": "http://example.org/P"},
         "object": {"type": "literal", "value": "42",
                    "datatype": "http://www.w3.org/2001/XMLSchema#integer"}},
        {"subject": {"type": "bnode", "value": "b0"},
         "predicate": {"type": "uri", "value": "http://example.org/name"},
         "object": {"type": "literal", "value": "sensor", "xml:lang": "en"}}
    ]}
}"#;

fn payload(text: &str) -> ResultsPayload {
    serde_json::from_str(text).unwrap()
}

fn fake_client(text: &'static str, calls: Arc<AtomicUsize>) -> RemoteQueryClient {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = QueryConfig::new(ENDPOINT).unwrap();
    RemoteQueryClient::with_transport(config, move |endpoint: &str, _: &str| -> Result<ResultsPayload> {
        assert_eq!(endpoint, ENDPOINT);
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_str(text)?)
    })
    .with_query("SELECT ?subject ?predicate ?object WHERE { ?subject ?predicate ?object }")
}

#[test]
fn test_materialize_typed_literal() {
    let store = materialize(&payload(TWO_ROWS)).unwrap();
    assert_eq!(store.len(), 2);
    let s = Term::iri("http://example.org/S");
    let triples: Vec<_> = store.triples_for_subject(&s).collect();
    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].object(), &Term::typed_literal("42", XSD_INTEGER));
}

#[test]
fn test_missing_object_adds_nothing() {
    let text = r#"{"results": {"bindings": [
        {"subject": {"type": "uri", "value": "http://example.org/S"},
         "predicate": {"type": "uri", "value": "http://example.org/P"}}
    ]}}"#;
    let mut store = TripleStore::new();
    let err = materialize_into(&payload(text), &mut store).unwrap_err();
    assert!(matches!(
        ScigraError::kind_of(&err),
        Some(ScigraError::MalformedBinding(_))
    ));
    assert!(store.is_empty());
}

#[test]
fn test_client_graph() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = fake_client(TWO_ROWS, calls.clone());
    let store = client.get_rdf_graph().unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.blank_nodes().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_client_jsonld() {
    let client = fake_client(TWO_ROWS, Arc::new(AtomicUsize::new(0)));
    let text = client.get_jsonld().unwrap();
    let back = codec::from_jsonld_str(&text).unwrap();
    assert!(scigra::is_isomorphic(&back, &client.get_rdf_graph().unwrap()));
}

#[test]
fn test_client_catalog() {
    let client = fake_client(TWO_ROWS, Arc::new(AtomicUsize::new(0)));
    let doc = client.get_catalog().unwrap();
    assert_eq!(
        doc["@id"],
        Value::String(client.config().catalog_id.clone())
    );
    // two subjects: the node list is nested inside the one-element @graph
    let graph = doc["@graph"].as_array().unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(graph[0].as_array().map(|nodes| nodes.len()), Some(2));
}

#[test]
fn test_client_without_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = QueryConfig::new(ENDPOINT).unwrap();
    let counter = calls.clone();
    let client = RemoteQueryClient::with_transport(config, move |_: &str, _: &str| -> Result<ResultsPayload> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(ResultsPayload::default())
    });
    let err = client.get_jsonld().unwrap_err();
    assert_eq!(ScigraError::kind_of(&err), Some(&ScigraError::MissingQuery));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_results() {
    let client = fake_client(r#"{"results": {"bindings": []}}"#, Arc::new(AtomicUsize::new(0)));
    let store = client.get_rdf_graph().unwrap();
    assert!(store.is_empty());
    assert_eq!(client.get_jsonld().unwrap().trim(), "[]");
}
