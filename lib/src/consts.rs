//! Defines constant IRIs for the handful of RDF and XSD terms the store treats specially,
//! plus the identifier of the catalog document that embeds serialized stores.

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

// datatypes for JSON-native values inside `@value`
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// `@id` of the wrapper object produced by [`crate::codec::in_graph`].
pub const DEFAULT_CATALOG_ID: &str = "http://dome40.io/dataset/data/dome-all-data";

/// Media type requested from SPARQL endpoints.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

// JSON-LD keywords
pub const JSONLD_ID: &str = "@id";
pub const JSONLD_VALUE: &str = "@value";
pub const JSONLD_TYPE: &str = "@type";
pub const JSONLD_LANGUAGE: &str = "@language";
pub const JSONLD_GRAPH: &str = "@graph";
pub const JSONLD_CONTEXT: &str = "@context";

/// Prefix marking a blank node label in `@id` positions.
pub const BLANK_NODE_PREFIX: &str = "_:";
