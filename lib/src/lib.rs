//! An in-memory RDF triple store with a JSON-LD codec, a SPARQL results materializer,
//! a remote query client and blank-node-aware graph comparison.
//!
//! ```no_run
//! use scigra::{QueryConfig, RemoteQueryClient};
//!
//! let config = QueryConfig::new("http://localhost:3030/ds/sparql")?;
//! let client = RemoteQueryClient::new(config)?
//!     .with_query("SELECT ?subject ?predicate ?object WHERE { ?subject ?predicate ?object }");
//! let store = client.get_rdf_graph()?;
//! println!("{}", scigra::codec::to_jsonld_string(&store)?);
//! # Ok::<(), anyhow::Error>(())
//! ```

extern crate derive_builder;

pub mod codec;
pub mod config;
pub mod consts;
pub mod errors;
pub mod isomorphism;
pub mod materialize;
pub mod namespace;
pub mod query;
pub mod results;
pub mod store;
pub mod term;

pub use config::{QueryConfig, QueryMethod};
pub use errors::ScigraError;
pub use isomorphism::{canonicalize, diff, is_isomorphic, GraphDiff};
pub use namespace::Namespace;
pub use query::{HttpTransport, QueryTransport, RemoteQueryClient};
pub use results::{Binding, BindingRow, ResultsPayload};
pub use store::{StoreFormat, TripleStore};
pub use term::{safe_term, BareValue, Literal, Term, Triple};

/// Lets `SCIGRA_LOG` override `RUST_LOG`. Call before initializing a logger such as
/// `env_logger`; the library itself only emits through `log`.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("SCIGRA_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
