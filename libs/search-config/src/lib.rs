//! Search engine configuration resolution
//!
//! Resolves the layered `searchengine.<domain>` configuration tree into flat,
//! read-only option sets per (domain, service type, service name), applies the
//! deprecated single-endpoint overlay, and derives facet policies from the
//! resolved search options.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use scriptorium_config::{ConfigResolver, ServiceType, Settings};
//!
//! # fn example() -> scriptorium_config::Result<()> {
//! let settings = Settings::from_toml_str(
//!     r#"
//!     [searchengine.solr.default.endpoint.primary]
//!     host = "localhost"
//!     port = 8983
//!     path = "/solr/opus4"
//!     "#,
//! )?;
//! let resolver = ConfigResolver::new(Arc::new(settings));
//! let options = resolver.resolve(ServiceType::Index, None, "solr")?;
//! assert_eq!(options.endpoint("primary")?.host, "localhost");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod facets;
mod legacy;
pub mod merge;
pub mod resolver;
pub mod settings;

pub use cache::ResolutionCache;
pub use error::{ConfigError, Result};
pub use facets::{FacetPolicy, FacetSettings, FacetSort, DEFAULT_FACET_LIMIT, GLOBAL_LIMIT_KEY};
pub use resolver::{ConfigResolver, Endpoint, ServiceOptions, ServiceType, DEFAULT_SERVICE_NAME};
pub use settings::Settings;
