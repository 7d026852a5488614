//! Configuration for talking to a SPARQL endpoint. Nothing about the endpoint is
//! hardwired in the library; callers build a [`QueryConfig`] or load one from JSON.

use crate::consts::DEFAULT_CATALOG_ID;
use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

/// HTTP method used to submit the query, as in the SPARQL 1.1 protocol.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryMethod {
    /// `GET endpoint?query=...`
    #[default]
    Get,
    /// `POST` with an `application/x-www-form-urlencoded` body.
    Post,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_catalog_id() -> String {
    DEFAULT_CATALOG_ID.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct QueryConfig {
    /// SPARQL endpoint URL, e.g. `http://localhost:3030/dataset/sparql`.
    pub endpoint: String,
    #[serde(default)]
    #[builder(default)]
    pub method: QueryMethod,
    // per-request timeout
    #[serde(default = "default_timeout_secs")]
    #[builder(default = "default_timeout_secs()")]
    pub timeout_secs: u64,
    /// `@id` of the catalog wrapper produced from query results.
    #[serde(default = "default_catalog_id")]
    #[builder(default = "default_catalog_id()")]
    pub catalog_id: String,
}

impl QueryConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        match &self.endpoint {
            Some(e) if e.trim().is_empty() => Err("endpoint must not be empty".to_string()),
            _ => Ok(()),
        }
    }
}

impl QueryConfig {
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }

    /// Config for `endpoint` with every other field at its default.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self::builder().endpoint(endpoint).build()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: QueryConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }
}
