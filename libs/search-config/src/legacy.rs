//! Deprecated single-endpoint options
//!
//! Older deployments configure one engine endpoint per capability:
//!
//! ```toml
//! [searchengine.index]
//! host = "localhost"
//! port = 8983
//! app = "solr/opus4"
//! timeout = 10
//!
//! [searchengine.extract]
//! host = "localhost"
//! port = 8983
//! app = "solr/opus4"
//! ```
//!
//! When present they replace any `endpoint` assembled from the new-style
//! layers, mapped into the `endpoint.primary.*` shape.

use crate::resolver::ServiceType;
use crate::Settings;
use serde_json::{Map, Value};

/// Top-level keys under `searchengine` that are not domains.
pub(crate) const RESERVED_KEYS: &[&str] = &["index", "extract", "domain"];

fn legacy_section(service_type: ServiceType) -> &'static str {
    match service_type {
        ServiceType::Index | ServiceType::Search => "searchengine.index",
        ServiceType::Extract => "searchengine.extract",
    }
}

/// Build the replacement `endpoint` option from deprecated settings, if any.
pub(crate) fn legacy_endpoint(settings: &Settings, service_type: ServiceType) -> Option<Value> {
    let section = settings.get(legacy_section(service_type))?.as_object()?;
    let host = section.get("host")?;

    let mut primary = Map::new();
    primary.insert("host".to_string(), host.clone());
    if let Some(port) = section.get("port") {
        primary.insert("port".to_string(), port.clone());
    }
    if let Some(app) = section.get("app").and_then(Value::as_str) {
        let path = if app.starts_with('/') {
            app.to_string()
        } else {
            format!("/{}", app)
        };
        primary.insert("path".to_string(), Value::String(path));
    }
    if let Some(timeout) = section.get("timeout") {
        primary.insert("timeout".to_string(), timeout.clone());
    }

    let mut endpoint = Map::new();
    endpoint.insert("primary".to_string(), Value::Object(primary));
    Some(Value::Object(endpoint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_app_to_path() {
        let settings = Settings::from_value(json!({
            "searchengine": {"index": {"host": "legacy", "port": 8080, "app": "solr/core", "timeout": 5}}
        }));

        let endpoint = legacy_endpoint(&settings, ServiceType::Index).unwrap();
        assert_eq!(
            endpoint,
            json!({"primary": {"host": "legacy", "port": 8080, "path": "/solr/core", "timeout": 5}})
        );
    }

    #[test]
    fn search_shares_index_section() {
        let settings = Settings::from_value(json!({
            "searchengine": {"index": {"host": "legacy"}}
        }));
        assert!(legacy_endpoint(&settings, ServiceType::Search).is_some());
        assert!(legacy_endpoint(&settings, ServiceType::Extract).is_none());
    }

    #[test]
    fn section_without_host_is_ignored() {
        let settings = Settings::from_value(json!({
            "searchengine": {"extract": {"port": 8983}}
        }));
        assert!(legacy_endpoint(&settings, ServiceType::Extract).is_none());
    }
}
