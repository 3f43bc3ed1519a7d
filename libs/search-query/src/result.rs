//! Search results parsed from engine responses

use crate::{QueryError, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Fields lifted out of a returned document into typed [`Match`] members.
const KNOWN_FIELDS: &[&str] = &[
    "id",
    "score",
    "server_date_modified",
    "fulltext_id_success",
    "fulltext_id_failure",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: u64,
    pub score: Option<f64>,
    pub server_date_modified: Option<DateTime<Utc>>,
    pub fulltext_id_success: Option<Vec<String>>,
    pub fulltext_id_failure: Option<Vec<String>>,
    /// Every other returned field.
    pub assets: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// One page of matches with the total hit count and facet counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    total: u64,
    #[serde(with = "millis")]
    query_time: Duration,
    matches: Vec<Match>,
    facets: BTreeMap<String, Vec<FacetCount>>,
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

impl SearchResult {
    /// Parse a JSON select response (`responseHeader`, `response`, `facet_counts`).
    pub fn from_engine_response(body: &Value) -> Result<Self> {
        let query_time = body
            .pointer("/responseHeader/QTime")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or_default();

        let response = body
            .get("response")
            .ok_or_else(|| QueryError::MalformedResponse("missing 'response' section".into()))?;
        let total = response
            .get("numFound")
            .and_then(Value::as_u64)
            .ok_or_else(|| QueryError::MalformedResponse("missing 'numFound'".into()))?;

        let matches = response
            .get("docs")
            .and_then(Value::as_array)
            .map(|docs| docs.iter().map(parse_match).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        let facets = body
            .pointer("/facet_counts/facet_fields")
            .and_then(Value::as_object)
            .map(parse_facets)
            .unwrap_or_default();

        Ok(Self {
            total,
            query_time,
            matches,
            facets,
        })
    }

    /// Hits across all pages, not just the returned matches.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn query_time(&self) -> Duration {
        self.query_time
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<Match> {
        self.matches
    }

    pub fn facets(&self) -> &BTreeMap<String, Vec<FacetCount>> {
        &self.facets
    }

    pub fn ids(&self) -> Vec<u64> {
        self.matches.iter().map(|m| m.id).collect()
    }
}

fn parse_match(doc: &Value) -> Result<Match> {
    let fields = doc
        .as_object()
        .ok_or_else(|| QueryError::MalformedResponse("document is not an object".into()))?;

    let id = fields
        .get("id")
        .and_then(|id| match id {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .ok_or_else(|| QueryError::MalformedResponse("document without numeric id".into()))?;

    let assets = fields
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Match {
        id,
        score: fields.get("score").and_then(Value::as_f64),
        server_date_modified: fields.get("server_date_modified").and_then(parse_timestamp),
        fulltext_id_success: fields.get("fulltext_id_success").map(string_list),
        fulltext_id_failure: fields.get("fulltext_id_failure").map(string_list),
        assets,
    })
}

/// Unix seconds (number or numeric string) or an RFC 3339 date.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|s| Utc.timestamp_opt(s, 0).single()),
        Value::String(s) => match s.parse::<i64>() {
            Ok(secs) => Utc.timestamp_opt(secs, 0).single(),
            Err(_) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        },
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Facet values arrive as a flat `[value, count, value, count, ...]` list.
fn parse_facets(fields: &Map<String, Value>) -> BTreeMap<String, Vec<FacetCount>> {
    fields
        .iter()
        .map(|(field, pairs)| {
            let counts = pairs
                .as_array()
                .map(|items| {
                    items
                        .chunks(2)
                        .filter_map(|pair| match pair {
                            [value, count] => Some(FacetCount {
                                value: match value {
                                    Value::String(s) => s.clone(),
                                    other => other.to_string(),
                                },
                                count: count.as_u64()?,
                            }),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default();
            (field.clone(), counts)
        })
        .collect()
}
