//! Pooled adapter construction from resolved configuration

use crate::adapter::{AdapterSettings, IndexingAdapter};
use crate::client::{EngineClient, HttpEngineClient};
use crate::Result;
use scriptorium_config::{
    ConfigError, ConfigResolver, FacetPolicy, ResolutionCache, ServiceOptions, ServiceType,
};
use scriptorium_fulltext::FulltextCache;
use std::sync::Arc;

/// Adapter implementations selectable through the `adapter` option.
pub const SUPPORTED_ADAPTERS: &[&str] = &["solr"];
const DEFAULT_ADAPTER: &str = "solr";

/// Builds one [`IndexingAdapter`] per (domain, service name, service type)
/// and hands out the pooled instance on later calls.
pub struct ServiceLocator {
    resolver: Arc<ConfigResolver>,
    facets: Arc<FacetPolicy>,
    cache: FulltextCache,
    adapters: ResolutionCache<IndexingAdapter>,
}

impl ServiceLocator {
    pub fn new(resolver: Arc<ConfigResolver>, cache: FulltextCache) -> Self {
        let facets = Arc::new(FacetPolicy::new(resolver.clone()));
        Self {
            resolver,
            facets,
            cache,
            adapters: ResolutionCache::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    pub fn facets(&self) -> &Arc<FacetPolicy> {
        &self.facets
    }

    pub fn default_domain(&self) -> String {
        self.resolver.default_domain().to_string()
    }

    pub fn indexer(&self, name: Option<&str>, domain: &str) -> Result<Arc<IndexingAdapter>> {
        self.adapter(ServiceType::Index, name, domain)
    }

    pub fn searcher(&self, name: Option<&str>, domain: &str) -> Result<Arc<IndexingAdapter>> {
        self.adapter(ServiceType::Search, name, domain)
    }

    pub fn extractor(&self, name: Option<&str>, domain: &str) -> Result<Arc<IndexingAdapter>> {
        self.adapter(ServiceType::Extract, name, domain)
    }

    pub fn adapter(
        &self,
        service_type: ServiceType,
        name: Option<&str>,
        domain: &str,
    ) -> Result<Arc<IndexingAdapter>> {
        let key = format!(
            "{}::{}::{}",
            domain,
            name.unwrap_or(scriptorium_config::DEFAULT_SERVICE_NAME),
            service_type
        );
        self.adapters
            .get_or_compute(&key, || self.build(service_type, name, domain))
    }

    /// Drop pooled adapters and every cached configuration value.
    pub fn invalidate(&self) {
        self.adapters.invalidate_all();
        self.facets.invalidate();
    }

    fn build(
        &self,
        service_type: ServiceType,
        name: Option<&str>,
        domain: &str,
    ) -> Result<IndexingAdapter> {
        let options = self.resolver.resolve(service_type, name, domain)?;
        check_adapter(&options)?;
        let extract_options = self.resolver.resolve(ServiceType::Extract, name, domain)?;

        let client: Arc<dyn EngineClient> =
            Arc::new(HttpEngineClient::new(&options.endpoint("primary")?)?);
        let extract_client: Arc<dyn EngineClient> = if service_type == ServiceType::Extract {
            client.clone()
        } else {
            match extract_options.endpoint("primary") {
                Ok(endpoint) => Arc::new(HttpEngineClient::new(&endpoint)?),
                Err(ConfigError::MissingOption { option, .. }) => {
                    tracing::debug!(
                        domain,
                        service = %service_type,
                        missing = %option,
                        "No extraction endpoint configured, extracting through the service endpoint"
                    );
                    client.clone()
                }
                Err(e) => return Err(e.into()),
            }
        };

        let settings = AdapterSettings::from_options(&options, &extract_options)?;
        tracing::info!(
            domain,
            service = %service_type,
            name = options.service_name(),
            chunk_size = settings.index_chunk_size,
            "Created search adapter"
        );

        Ok(IndexingAdapter::new(client, self.cache.clone(), settings)
            .with_extract_client(extract_client)
            .with_facets(self.facets.clone()))
    }
}

fn check_adapter(options: &ServiceOptions) -> std::result::Result<(), ConfigError> {
    let adapter = options.get_str("adapter").unwrap_or(DEFAULT_ADAPTER);
    if SUPPORTED_ADAPTERS.contains(&adapter.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfiguration(format!(
            "unknown adapter '{}' for {} service in domain '{}'",
            adapter,
            options.service_type(),
            options.domain()
        )))
    }
}
