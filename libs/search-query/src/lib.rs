//! Search query model
//!
//! - [`Query`]: typed search request (paging, fields, sort, filter, facets)
//! - [`Filter`]: boolean filter tree and its compilation into engine syntax
//! - [`FacetSpec`]: caller facet overrides merged with configured settings
//! - [`SearchResult`]: parsed engine response
//!
//! # Examples
//!
//! ```rust
//! use scriptorium_query::{Filter, Query};
//!
//! # fn example() -> scriptorium_query::Result<()> {
//! let mut query = Query::new();
//! query
//!     .set_rows(20)
//!     .set_filter(Filter::all(vec![
//!         Filter::equals("server_state", ["published"])?,
//!         Filter::equals("doctype", ["article", "book"])?,
//!     ]));
//! query.set_sort(["year"], "desc")?;
//!
//! assert_eq!(
//!     query.filter().unwrap().compile(),
//!     "(server_state:published AND (doctype:article OR doctype:book))"
//! );
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod error;
pub mod escape;
pub mod facet;
pub mod filter;
pub mod model;
pub mod result;

pub use compile::MATCH_ALL;
pub use error::{QueryError, Result};
pub use escape::escape_phrase;
pub use facet::{EffectiveFacet, FacetSpec};
pub use filter::{Combinator, Comparator, ComplexFilter, Condition, Filter, SimpleFilter};
pub use model::{Query, SortDirection, DEFAULT_ROWS};
pub use result::{FacetCount, Match, SearchResult};
