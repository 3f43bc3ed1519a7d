//! Caller facet overrides merged with configured facet settings

use crate::{QueryError, Result};
use scriptorium_config::{FacetSettings, FacetSort};
use std::collections::BTreeMap;

/// Facet request attached to a [`Query`](crate::Query).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSpec {
    set: Option<String>,
    fields: Option<Vec<String>>,
    limits: BTreeMap<String, u32>,
    sorting: BTreeMap<String, FacetSort>,
}

/// One facet as it will be requested from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveFacet {
    pub field: String,
    pub limit: u32,
    pub sort: FacetSort,
}

impl FacetSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the configured facet set `name` instead of `default`.
    pub fn for_set(name: impl Into<String>) -> Self {
        Self {
            set: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn set_name(&self) -> Option<&str> {
        self.set.as_deref()
    }

    /// Request exactly these fields; mandatory fields are not re-added.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, field: impl Into<String>, limit: u32) -> Self {
        self.limits.insert(field.into(), limit);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, sort: FacetSort) -> Self {
        self.sorting.insert(field.into(), sort);
        self
    }

    /// Merge with configured settings. Every effective field gets exactly one
    /// limit and one sort mode.
    pub fn merge(&self, settings: &FacetSettings) -> Result<Vec<EffectiveFacet>> {
        let fields: Vec<String> = match &self.fields {
            Some(fields) => {
                let mut unique: Vec<String> = Vec::with_capacity(fields.len());
                for field in fields {
                    let field = field.trim();
                    if field.is_empty() || field.contains(char::is_whitespace) {
                        return Err(QueryError::invalid(format!(
                            "invalid facet field '{}'",
                            field
                        )));
                    }
                    if !unique.iter().any(|f| f == field) {
                        unique.push(field.to_string());
                    }
                }
                unique
            }
            None => settings.fields.clone(),
        };

        Ok(fields
            .into_iter()
            .map(|field| {
                let limit = self
                    .limits
                    .get(&field)
                    .copied()
                    .unwrap_or_else(|| settings.limit_for(&field));
                let sort = self
                    .sorting
                    .get(&field)
                    .copied()
                    .unwrap_or_else(|| settings.sort_for(&field));
                EffectiveFacet { field, limit, sort }
            })
            .collect())
    }
}
