use scigra::codec::{deserialize, from_jsonld_str, in_graph, serialize, to_jsonld_string};
use scigra::consts::{DEFAULT_CATALOG_ID, XSD_INTEGER};
use scigra::{is_isomorphic, Namespace, StoreFormat, Term, Triple, TripleStore};
use serde_json::Value;
use tempfile::tempdir;

fn ex() -> Namespace {
    Namespace::new("http://example.org/")
}

fn people() -> TripleStore {
    let ex = ex();
    let mut store = TripleStore::new();
    store.bind("ex", ex.as_str());
    store
        .add(ex.term("Alice"), ex.term("knows"), ex.term("Bob"))
        .unwrap();
    store
        .add(ex.term("Bob"), ex.term("knows"), ex.term("Alice"))
        .unwrap();
    store
}

fn with_blank_nodes() -> TripleStore {
    let ex = ex();
    let mut store = people();
    store
        .add(ex.term("Alice"), ex.term("address"), Term::blank("addr"))
        .unwrap();
    store
        .add(Term::blank("addr"), ex.term("city"), "Oslo")
        .unwrap();
    store
        .add(Term::blank("addr"), ex.term("zip"), Term::typed_literal("0150", XSD_INTEGER))
        .unwrap();
    store
        .add(ex.term("Bob"), ex.term("motto"), Term::lang_literal("carpe diem", "la"))
        .unwrap();
    store
}

#[test]
fn test_two_people_round_trip() {
    let store = people();
    let doc = serialize(&store);
    let nodes = doc.as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    for node in nodes {
        let knows = node["http://example.org/knows"].as_array().unwrap();
        assert_eq!(knows.len(), 1);
    }
    let back = deserialize(&doc).unwrap();
    assert_eq!(back.len(), 2);
    for triple in &store {
        assert!(back.contains(triple));
    }
}

#[test]
fn test_round_trip_with_blank_nodes() {
    let store = with_blank_nodes();
    let text = to_jsonld_string(&store).unwrap();
    let back = from_jsonld_str(&text).unwrap();
    assert_eq!(back.len(), store.len());
    assert!(is_isomorphic(&store, &back));
}

#[test]
fn test_catalog_wrapper_reads_back() {
    let store = people();
    let doc = in_graph(&store, DEFAULT_CATALOG_ID);
    assert_eq!(doc["@id"], Value::String(DEFAULT_CATALOG_ID.to_string()));
    let back = deserialize(&doc).unwrap();
    assert!(is_isomorphic(&store, &back));
}

#[test]
fn test_insert_is_idempotent() {
    let ex = ex();
    let mut store = TripleStore::new();
    let t = Triple::new(ex.term("s"), ex.term("p"), Term::literal("o")).unwrap();
    assert!(store.insert(t.clone()));
    assert!(!store.insert(t.clone()));
    assert!(!store.add(ex.term("s"), ex.term("p"), "o").unwrap());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_turtle_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.ttl");
    let store = with_blank_nodes();
    store.write_to_file(&path, StoreFormat::Turtle).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("@prefix ex:"));

    let mut loaded = TripleStore::new();
    let added = loaded.load(&path, None).unwrap();
    assert_eq!(added, store.len());
    assert!(is_isomorphic(&store, &loaded));
}

#[test]
fn test_jsonld_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.jsonld");
    let store = people();
    store.write_to_file(&path, StoreFormat::JsonLd).unwrap();

    let mut loaded = TripleStore::new();
    loaded.load(&path, None).unwrap();
    assert!(loaded.iter().eq(store.iter()));

    // loading twice adds nothing
    assert_eq!(loaded.load(&path, Some(StoreFormat::JsonLd)).unwrap(), 0);
}

#[test]
fn test_load_missing_file() {
    let mut store = TripleStore::new();
    assert!(store
        .load(std::path::Path::new("does/not/exist.ttl"), None)
        .is_err());
    assert!(store.is_empty());
}

#[test]
fn test_merge() {
    let mut a = people();
    let mut b = TripleStore::new();
    b.bind("foaf", "http://xmlns.com/foaf/0.1/");
    b.add(ex().term("Carol"), ex().term("knows"), ex().term("Alice"))
        .unwrap();
    a.merge(b);
    assert_eq!(a.len(), 3);
    assert!(a.namespace("foaf").is_some());
    assert!(a.namespace("ex").is_some());
}

#[test]
fn test_broken_turtle_adds_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.ttl");
    std::fs::write(
        &path,
        "<http://example.org/a> <http://example.org/p> \"1\" .\n\
         <http://example.org/b> <http://example.org/p> \"2\" .\n\
         this is not turtle\n",
    )
    .unwrap();

    let mut store = people();
    let before = store.clone();
    assert!(store.load(&path, None).is_err());
    assert_eq!(store, before);
}

#[test]
fn test_broken_jsonld_adds_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.jsonld");
    std::fs::write(
        &path,
        r#"[{"@id": "http://example.org/a", "http://example.org/p": ["1"]},
            {"http://example.org/p": ["no id"]}]"#,
    )
    .unwrap();

    let mut store = TripleStore::new();
    assert!(store.load(&path, None).is_err());
    assert!(store.is_empty());
}
