//! Tiered configuration resolution
//!
//! For a (service type, service name, domain) triple the options are
//! assembled from six layers of the `searchengine.<domain>` tree, each one
//! overlaid on the previous:
//!
//! 1. `<domain>.default`
//! 2. `<domain>.<name>` (only for non-default names)
//! 3. `<domain>.default.service.default`
//! 4. `<domain>.default.service.<type>`
//! 5. `<domain>.<name>.service.default`
//! 6. `<domain>.<name>.service.<type>`
//!
//! Layers 1 and 2 contribute everything except their `service` subtree.
//! Finally the deprecated single-endpoint options replace `endpoint`
//! wholesale (see [`crate::legacy`]).

use crate::cache::ResolutionCache;
use crate::legacy::{legacy_endpoint, RESERVED_KEYS};
use crate::merge::{overlay_into, without_key};
use crate::settings::{value_as_bool, value_as_u64};
use crate::{ConfigError, Result, Settings};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SERVICE_NAME: &str = "default";
const DEFAULT_DOMAIN: &str = "solr";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Index,
    Search,
    Extract,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Index => "index",
            ServiceType::Search => "search",
            ServiceType::Extract => "extract",
        }
    }

    pub fn all() -> [ServiceType; 3] {
        [ServiceType::Index, ServiceType::Search, ServiceType::Extract]
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "index" => Ok(ServiceType::Index),
            "search" => Ok(ServiceType::Search),
            "extract" => Ok(ServiceType::Extract),
            other => Err(ConfigError::UnknownServiceType(other.to_string())),
        }
    }
}

/// Engine endpoint as described by `endpoint.<name>.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn base_url(&self) -> String {
        let path = self.path.trim_end_matches('/');
        match self.port {
            Some(port) => format!("{}://{}:{}{}", self.scheme, self.host, port, path),
            None => format!("{}://{}{}", self.scheme, self.host, path),
        }
    }
}

/// Read-only option set resolved for one (domain, type, name) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    domain: String,
    service_type: ServiceType,
    service_name: String,
    options: Map<String, Value>,
}

impl ServiceOptions {
    pub fn new(
        domain: impl Into<String>,
        service_type: ServiceType,
        service_name: impl Into<String>,
        options: Map<String, Value>,
    ) -> Self {
        Self {
            domain: domain.into(),
            service_type,
            service_name: service_name.into(),
            options,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Dotted-path lookup inside the option set.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = self.options.get(segments.next()?)?;
        segments.try_fold(first, |current, segment| current.as_object()?.get(segment))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(value_as_u64)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(value_as_bool)
    }

    /// Parse `endpoint.<name>` into an [`Endpoint`].
    pub fn endpoint(&self, name: &str) -> Result<Endpoint> {
        let context = format!(
            "{} service '{}' in domain '{}'",
            self.service_type, self.service_name, self.domain
        );
        let prefix = format!("endpoint.{}", name);
        let host = self
            .get_str(&format!("{}.host", prefix))
            .ok_or_else(|| ConfigError::MissingOption {
                option: format!("{}.host", prefix),
                context: context.clone(),
            })?
            .to_string();

        let port = match self.get(&format!("{}.port", prefix)) {
            None => None,
            Some(raw) => Some(
                value_as_u64(raw)
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| {
                        ConfigError::InvalidConfiguration(format!(
                            "{}.port must be a valid port number ({})",
                            prefix, context
                        ))
                    })?,
            ),
        };

        let path = self
            .get_str(&format!("{}.path", prefix))
            .unwrap_or("")
            .to_string();
        let scheme = self
            .get_str(&format!("{}.scheme", prefix))
            .unwrap_or("http")
            .to_string();
        let timeout = self
            .get_u64(&format!("{}.timeout", prefix))
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Endpoint {
            scheme,
            host,
            port,
            path,
            timeout: Duration::from_secs(timeout),
        })
    }
}

/// Resolves and caches [`ServiceOptions`].
#[derive(Debug)]
pub struct ConfigResolver {
    settings: Arc<Settings>,
    cache: ResolutionCache<ServiceOptions>,
}

impl ConfigResolver {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            cache: ResolutionCache::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Domain used when callers do not name one (`searchengine.domain`, default `solr`).
    pub fn default_domain(&self) -> &str {
        self.settings
            .get_str("searchengine.domain")
            .unwrap_or(DEFAULT_DOMAIN)
    }

    /// All configured domains (tables under `searchengine` that are not legacy sections).
    pub fn domains(&self) -> Vec<String> {
        self.settings
            .get("searchengine")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter(|(key, value)| {
                        value.is_object() && !RESERVED_KEYS.contains(&key.as_str())
                    })
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve the option set for a service, using the cache.
    pub fn resolve(
        &self,
        service_type: ServiceType,
        service_name: Option<&str>,
        domain: &str,
    ) -> Result<Arc<ServiceOptions>> {
        let name = service_name.unwrap_or(DEFAULT_SERVICE_NAME);
        let key = format!("{}::{}::{}", domain, name, service_type);
        self.cache
            .get_or_compute(&key, || self.compute(service_type, name, domain))
    }

    /// Drop all cached option sets.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    fn compute(&self, service_type: ServiceType, name: &str, domain: &str) -> Result<ServiceOptions> {
        let domain_tree = self.domain_tree(domain)?;
        let section = |path: &str| crate::settings::lookup(domain_tree, path);

        let mut options = Map::new();

        if let Some(defaults) = section(DEFAULT_SERVICE_NAME) {
            overlay_into(&mut options, &without_key(defaults, "service"));
        }
        if name != DEFAULT_SERVICE_NAME {
            if let Some(named) = section(name) {
                overlay_into(&mut options, &without_key(named, "service"));
            }
        }

        let mut service_layers = vec![
            format!("{}.service.{}", DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_NAME),
            format!("{}.service.{}", DEFAULT_SERVICE_NAME, service_type),
        ];
        if name != DEFAULT_SERVICE_NAME {
            service_layers.push(format!("{}.service.{}", name, DEFAULT_SERVICE_NAME));
            service_layers.push(format!("{}.service.{}", name, service_type));
        }
        for layer in &service_layers {
            if let Some(values) = section(layer) {
                overlay_into(&mut options, values);
            }
        }

        if let Some(endpoint) = legacy_endpoint(&self.settings, service_type) {
            tracing::debug!(
                domain,
                service = %service_type,
                "Deprecated endpoint options override configured endpoint"
            );
            options.insert("endpoint".to_string(), endpoint);
        }

        tracing::debug!(
            domain,
            service = %service_type,
            name,
            options = options.len(),
            "Resolved service configuration"
        );

        Ok(ServiceOptions::new(domain, service_type, name, options))
    }

    fn domain_tree(&self, domain: &str) -> Result<&Value> {
        if domain.is_empty() || RESERVED_KEYS.contains(&domain) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "'{}' is not a valid search domain",
                domain
            )));
        }
        self.settings
            .get("searchengine")
            .and_then(|engines| engines.get(domain))
            .filter(|tree| tree.is_object())
            .ok_or_else(|| {
                ConfigError::InvalidConfiguration(format!(
                    "search domain '{}' is not configured",
                    domain
                ))
            })
    }
}
