//! Facet fields, limits and sort modes
//!
//! Facet configuration is read from the resolved `search` options of a
//! domain. Both the current layout (`facet_sets`, `facet.<field>.*`) and the
//! deprecated one (`facets`, `facet_limit`, `global_facet_limit`, `sort_crit`)
//! are understood; where both define a value the current layout wins.

use crate::cache::ResolutionCache;
use crate::resolver::{ConfigResolver, ServiceOptions, ServiceType};
use crate::settings::{value_as_bool, value_as_u64};
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Key of the global default inside a limit map.
pub const GLOBAL_LIMIT_KEY: &str = "__global__";
pub const DEFAULT_FACET_LIMIT: u32 = 10;

const DEFAULT_SET: &str = "default";
const MANDATORY_FIELDS: &[&str] = &["server_state", "doctype"];
const YEAR: &str = "year";
const YEAR_INVERTED: &str = "year_inverted";
const ENRICHMENT_PREFIX: &str = "enrichment_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetSort {
    /// By hit count, the engine default.
    Count,
    /// Lexically by value.
    Index,
}

impl FacetSort {
    /// Parse a configured criterion. `lexi` and `index` both mean lexical.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lexi" | "index" => Some(FacetSort::Index),
            "count" => Some(FacetSort::Count),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacetSort::Count => "count",
            FacetSort::Index => "index",
        }
    }
}

impl fmt::Display for FacetSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective facet configuration for one (set, domain) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FacetSettings {
    pub fields: Vec<String>,
    /// Field → limit, always including [`GLOBAL_LIMIT_KEY`].
    pub limits: BTreeMap<String, u32>,
    /// Only fields sorted lexically appear here.
    pub sorting: BTreeMap<String, FacetSort>,
}

impl FacetSettings {
    pub fn global_limit(&self) -> u32 {
        self.limits
            .get(GLOBAL_LIMIT_KEY)
            .copied()
            .unwrap_or(DEFAULT_FACET_LIMIT)
    }

    pub fn limit_for(&self, field: &str) -> u32 {
        self.limits
            .get(field)
            .copied()
            .unwrap_or_else(|| self.global_limit())
    }

    pub fn sort_for(&self, field: &str) -> FacetSort {
        self.sorting.get(field).copied().unwrap_or(FacetSort::Count)
    }
}

#[derive(Debug)]
pub struct FacetPolicy {
    resolver: Arc<ConfigResolver>,
    cache: ResolutionCache<FacetSettings>,
}

impl FacetPolicy {
    pub fn new(resolver: Arc<ConfigResolver>) -> Self {
        Self {
            resolver,
            cache: ResolutionCache::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    /// Fields, limits and sorting for a facet set, cached per `domain::set`.
    pub fn settings(&self, set_name: Option<&str>, domain: &str) -> Result<Arc<FacetSettings>> {
        let set = set_name.unwrap_or(DEFAULT_SET);
        let key = format!("{}::{}", domain, set);
        self.cache.get_or_compute(&key, || {
            let options = self.resolver.resolve(ServiceType::Search, None, domain)?;
            let fields = facet_fields(&options, set);
            let limits = facet_limits(&options, &fields);
            let sorting = facet_sorting(&options, &fields);
            tracing::debug!(domain, set, fields = fields.len(), "Computed facet settings");
            Ok(FacetSettings {
                fields,
                limits,
                sorting,
            })
        })
    }

    pub fn facet_fields(&self, set_name: Option<&str>, domain: &str) -> Result<Vec<String>> {
        Ok(self.settings(set_name, domain)?.fields.clone())
    }

    pub fn facet_limits(
        &self,
        set_name: Option<&str>,
        domain: &str,
    ) -> Result<BTreeMap<String, u32>> {
        Ok(self.settings(set_name, domain)?.limits.clone())
    }

    pub fn facet_sorting(
        &self,
        set_name: Option<&str>,
        domain: &str,
    ) -> Result<BTreeMap<String, FacetSort>> {
        Ok(self.settings(set_name, domain)?.sorting.clone())
    }

    /// Drop cached facet settings together with the resolver's option sets.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
        self.resolver.invalidate();
    }
}

fn field_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn is_active(options: &ServiceOptions, field: &str) -> bool {
    options
        .get_bool(&format!("facet.{}.active", field))
        .unwrap_or(true)
}

fn push_unique(fields: &mut Vec<String>, field: &str) {
    if !fields.iter().any(|f| f == field) {
        fields.push(field.to_string());
    }
}

fn facet_fields(options: &ServiceOptions, set: &str) -> Vec<String> {
    let configured = options
        .get(&format!("facet_sets.{}", set))
        .or_else(|| options.get(&format!("facet_sets.{}", DEFAULT_SET)))
        .or_else(|| options.get("facets"))
        .map(field_list)
        .unwrap_or_default();

    let mut fields = Vec::with_capacity(configured.len() + MANDATORY_FIELDS.len() + 1);
    for field in &configured {
        push_unique(&mut fields, field);
    }

    for field in MANDATORY_FIELDS {
        if is_active(options, field) {
            push_unique(&mut fields, field);
        }
    }

    let has_year = fields.iter().any(|f| f == YEAR || f == YEAR_INVERTED);
    if !has_year && is_active(options, YEAR) {
        fields.push(YEAR.to_string());
    }

    // serde_json maps iterate in key order
    if let Some(facets) = options.get("facet").and_then(Value::as_object) {
        for (key, entry) in facets {
            if !key.starts_with(ENRICHMENT_PREFIX) {
                continue;
            }
            let active = entry
                .get("active")
                .and_then(value_as_bool)
                .unwrap_or(false);
            if active {
                push_unique(&mut fields, key);
            }
        }
    }

    fields
}

fn facet_limits(options: &ServiceOptions, fields: &[String]) -> BTreeMap<String, u32> {
    let as_limit = |value: &Value| value_as_u64(value).and_then(|v| u32::try_from(v).ok());

    let global = options
        .get("facet.default.limit")
        .and_then(as_limit)
        .or_else(|| options.get("global_facet_limit").and_then(as_limit))
        .unwrap_or(DEFAULT_FACET_LIMIT);

    let mut limits = BTreeMap::new();
    limits.insert(GLOBAL_LIMIT_KEY.to_string(), global);

    if let Some(legacy) = options.get("facet_limit").and_then(Value::as_object) {
        for (field, value) in legacy {
            if let Some(limit) = as_limit(value) {
                limits.insert(field.clone(), limit);
            }
        }
    }

    if let Some(facets) = options.get("facet").and_then(Value::as_object) {
        for (field, entry) in facets {
            if field == DEFAULT_SET {
                continue;
            }
            if let Some(limit) = entry.get("limit").and_then(as_limit) {
                limits.insert(field.clone(), limit);
            }
        }
    }

    // year_inverted hands its limit to year and keeps its own entry
    if let Some(limit) = limits.get(YEAR_INVERTED).copied() {
        limits.insert(YEAR.to_string(), limit);
    }

    for field in fields {
        limits.entry(field.clone()).or_insert(global);
    }

    limits
}

fn facet_sorting(options: &ServiceOptions, fields: &[String]) -> BTreeMap<String, FacetSort> {
    let global = options
        .get_str("facet.default.sort")
        .or_else(|| options.get_str(&format!("sort_crit.{}", GLOBAL_LIMIT_KEY)))
        .and_then(FacetSort::parse)
        .unwrap_or(FacetSort::Count);

    let mut candidates: Vec<String> = fields.to_vec();
    let configured = options
        .get("facet")
        .and_then(Value::as_object)
        .into_iter()
        .chain(options.get("sort_crit").and_then(Value::as_object))
        .flat_map(|map| map.keys());
    for field in configured {
        if field != DEFAULT_SET && field != GLOBAL_LIMIT_KEY {
            push_unique(&mut candidates, field);
        }
    }

    let mut sorting = BTreeMap::new();
    for field in candidates {
        let criterion = options
            .get_str(&format!("facet.{}.sort", field))
            .or_else(|| options.get_str(&format!("sort_crit.{}", field)))
            .and_then(FacetSort::parse);

        if criterion.unwrap_or(global) == FacetSort::Index {
            sorting.insert(field, FacetSort::Index);
        }
    }
    sorting
}
