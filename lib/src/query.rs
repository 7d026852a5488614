//! Running SPARQL queries against a remote endpoint and turning the answers into stores.
//!
//! The network side is behind [`QueryTransport`] so it can be swapped for a fake in tests.
//! [`HttpTransport`] is the real implementation: one blocking request per query, no
//! retries. Timeouts come from the [`QueryConfig`].

use crate::codec;
use crate::config::{QueryConfig, QueryMethod};
use crate::consts::SPARQL_RESULTS_JSON;
use crate::errors::ScigraError;
use crate::materialize::materialize;
use crate::results::ResultsPayload;
use crate::store::TripleStore;
use anyhow::{anyhow, Result};
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;

fn query_error(msg: impl Into<String>) -> anyhow::Error {
    anyhow!(ScigraError::QueryExecution(msg.into()))
}

/// Sends a query to an endpoint and returns the decoded results. Implementations report
/// every failure (connection, status, body) as [`ScigraError::QueryExecution`].
pub trait QueryTransport: Send + Sync {
    fn execute(&self, endpoint: &str, query: &str) -> Result<ResultsPayload>;
}

impl<F> QueryTransport for F
where
    F: Fn(&str, &str) -> Result<ResultsPayload> + Send + Sync,
{
    fn execute(&self, endpoint: &str, query: &str) -> Result<ResultsPayload> {
        self(endpoint, query)
    }
}

/// [`QueryTransport`] over HTTP using the SPARQL 1.1 protocol.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    method: QueryMethod,
}

impl HttpTransport {
    pub fn new(config: &QueryConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(HttpTransport {
            client,
            method: config.method,
        })
    }
}

impl QueryTransport for HttpTransport {
    fn execute(&self, endpoint: &str, query: &str) -> Result<ResultsPayload> {
        let request = match self.method {
            QueryMethod::Get => self.client.get(endpoint).query(&[("query", query)]),
            QueryMethod::Post => self.client.post(endpoint).form(&[("query", query)]),
        };
        let resp = request
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .send()
            .map_err(|e| query_error(format!("request to {} failed: {}", endpoint, e)))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(query_error(format!(
                "{} answered {}: {}",
                endpoint, status, snippet
            )));
        }
        resp.json::<ResultsPayload>()
            .map_err(|e| query_error(format!("unreadable results from {}: {}", endpoint, e)))
    }
}

/// Holds an endpoint configuration and, optionally, the query to run against it.
pub struct RemoteQueryClient {
    config: QueryConfig,
    transport: Box<dyn QueryTransport>,
    query: Option<String>,
}

impl RemoteQueryClient {
    /// Client that talks HTTP to `config.endpoint`.
    pub fn new(config: QueryConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: QueryConfig, transport: impl QueryTransport + 'static) -> Self {
        RemoteQueryClient {
            config,
            transport: Box::new(transport),
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.set_query(query);
        self
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = Some(query.into());
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Runs the configured query and returns the raw results. Fails with
    /// [`ScigraError::MissingQuery`] without touching the transport when no (or only
    /// blank) query text is set.
    pub fn results(&self) -> Result<ResultsPayload> {
        let query = match self.query.as_deref() {
            Some(q) if !q.trim().is_empty() => q,
            _ => return Err(anyhow!(ScigraError::MissingQuery)),
        };
        debug!("Querying {}: {}", self.config.endpoint, query);
        let payload = self.transport.execute(&self.config.endpoint, query)?;
        info!(
            "Endpoint {} returned {} rows",
            self.config.endpoint,
            payload.rows().len()
        );
        Ok(payload)
    }

    /// Runs the query and materializes the `subject`/`predicate`/`object` bindings.
    pub fn get_rdf_graph(&self) -> Result<TripleStore> {
        materialize(&self.results()?)
    }

    /// Runs the query and returns the materialized store as pretty JSON-LD text.
    pub fn get_jsonld(&self) -> Result<String> {
        codec::to_jsonld_string(&self.get_rdf_graph()?)
    }

    /// Runs the query and wraps the result in the configured catalog document.
    pub fn get_catalog(&self) -> Result<Value> {
        let store = self.get_rdf_graph()?;
        Ok(codec::in_graph(&store, &self.config.catalog_id))
    }
}
