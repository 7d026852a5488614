//! The slice of the SPARQL 1.1 JSON results format that the materializer reads:
//!
//! ```json
//! {"head": {"vars": ["subject", "predicate", "object"]},
//!  "results": {"bindings": [
//!    {"subject": {"type": "uri", "value": "http://example.org/s"},
//!     "predicate": {"type": "uri", "value": "http://example.org/p"},
//!     "object": {"type": "literal", "value": "42", "datatype": "http://www.w3.org/2001/XMLSchema#integer"}}
//!  ]}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Head>,
    pub results: Results,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Results {
    #[serde(default)]
    pub bindings: Vec<BindingRow>,
}

/// Variable name to bound value, for one solution.
pub type BindingRow = BTreeMap<String, Binding>;

/// One bound value. The type tag is kept as free text so that unknown tags reach the
/// materializer, which decides how lenient to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Binding {
    pub fn uri(value: impl Into<String>) -> Self {
        Binding {
            kind: Some("uri".to_string()),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn bnode(value: impl Into<String>) -> Self {
        Binding {
            kind: Some("bnode".to_string()),
            ..Binding::uri(value)
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Binding {
            kind: Some("literal".to_string()),
            ..Binding::uri(value)
        }
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

impl ResultsPayload {
    pub fn from_rows(rows: Vec<BindingRow>) -> Self {
        ResultsPayload {
            head: None,
            results: Results { bindings: rows },
        }
    }

    pub fn rows(&self) -> &[BindingRow] {
        &self.results.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        let text = r#"{
            "head": {"vars": ["subject", "predicate", "object"]},
            "results": {"bindings": [
                {"subject": {"type": "bnode", "value": "b0"},
                 "predicate": {"type": "uri", "value": "http://example.org/p"},
                 "object": {"type": "literal", "value": "chat", "xml:lang": "fr"}}
            ]}
        }"#;
        let payload: ResultsPayload = serde_json::from_str(text).unwrap();
        assert_eq!(payload.head.as_ref().map(|h| h.vars.len()), Some(3));
        let row = &payload.rows()[0];
        assert_eq!(row["subject"], Binding::bnode("b0"));
        assert_eq!(row["object"], Binding::literal("chat").with_lang("fr"));
    }

    #[test]
    fn test_missing_type_tag_parses() {
        let text = r#"{"results": {"bindings": [{"object": {"value": "x"}}]}}"#;
        let payload: ResultsPayload = serde_json::from_str(text).unwrap();
        assert_eq!(payload.rows()[0]["object"].kind, None);
    }
}
