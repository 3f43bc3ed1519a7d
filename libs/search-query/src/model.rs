//! Search request descriptor

use crate::facet::FacetSpec;
use crate::filter::Filter;
use crate::{QueryError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ROWS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(QueryError::invalid(format!(
                "invalid sort direction '{}'",
                other
            ))),
        }
    }
}

/// A search request. Scalar parameters are last-write-wins; `fields` and
/// `sort` additionally support appending.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    start: u64,
    rows: u64,
    fields: Vec<String>,
    sort: Vec<(String, SortDirection)>,
    union: bool,
    filter: Option<Filter>,
    facet: Option<FacetSpec>,
    subfilters: BTreeMap<String, Filter>,
    weighted_search: bool,
    weighted_fields: BTreeMap<String, f32>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            start: 0,
            rows: DEFAULT_ROWS,
            fields: Vec::new(),
            sort: Vec::new(),
            union: false,
            filter: None,
            facet: None,
            subfilters: BTreeMap::new(),
            weighted_search: false,
            weighted_fields: BTreeMap::new(),
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn set_start(&mut self, start: u64) -> &mut Self {
        self.start = start;
        self
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn set_rows(&mut self, rows: u64) -> &mut Self {
        self.rows = rows;
        self
    }

    /// Returned fields; empty means the engine default.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn set_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.clear();
        for field in fields {
            self.add_field(field);
        }
        self
    }

    pub fn add_field(&mut self, field: impl Into<String>) -> &mut Self {
        let field = field.into();
        let field = field.trim();
        if !field.is_empty() && !self.fields.iter().any(|f| f == field) {
            self.fields.push(field.to_string());
        }
        self
    }

    pub fn sort(&self) -> &[(String, SortDirection)] {
        &self.sort
    }

    /// Replace the sort order with `fields`, all in `direction`.
    pub fn set_sort<I, S>(&mut self, fields: I, direction: &str) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = normalize_sort(fields, direction)?;
        self.sort = entries;
        Ok(self)
    }

    /// Append to the sort order. A field already present keeps its position
    /// and takes the new direction.
    pub fn add_sort<I, S>(&mut self, fields: I, direction: &str) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (field, direction) in normalize_sort(fields, direction)? {
            match self.sort.iter_mut().find(|entry| entry.0 == field) {
                Some(entry) => entry.1 = direction,
                None => self.sort.push((field, direction)),
            }
        }
        Ok(self)
    }

    pub fn is_union(&self) -> bool {
        self.union
    }

    /// OR-combine query terms instead of AND-combining them.
    pub fn set_union(&mut self, union: bool) -> &mut Self {
        self.union = union;
        self
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = Some(filter);
        self
    }

    pub fn facet(&self) -> Option<&FacetSpec> {
        self.facet.as_ref()
    }

    pub fn set_facet(&mut self, facet: FacetSpec) -> &mut Self {
        self.facet = Some(facet);
        self
    }

    pub fn subfilters(&self) -> &BTreeMap<String, Filter> {
        &self.subfilters
    }

    /// Register a named filter that narrows results without affecting facet counts
    /// of other subfilters.
    pub fn set_subfilter(&mut self, name: &str, filter: Filter) -> Result<&mut Self> {
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(QueryError::invalid(format!(
                "invalid subfilter name '{}'",
                name
            )));
        }
        self.subfilters.insert(name.to_string(), filter);
        Ok(self)
    }

    pub fn remove_subfilter(&mut self, name: &str) -> Option<Filter> {
        self.subfilters.remove(name)
    }

    pub fn is_weighted_search(&self) -> bool {
        self.weighted_search
    }

    pub fn set_weighted_search(&mut self, weighted: bool) -> &mut Self {
        self.weighted_search = weighted;
        self
    }

    pub fn weighted_fields(&self) -> &BTreeMap<String, f32> {
        &self.weighted_fields
    }

    pub fn set_weighted_fields(&mut self, fields: BTreeMap<String, f32>) -> Result<&mut Self> {
        let invalid = fields
            .iter()
            .find(|(_, boost)| !boost.is_finite() || **boost < 0.0);
        if let Some((field, boost)) = invalid {
            return Err(QueryError::invalid(format!(
                "invalid boost {} for field '{}'",
                boost, field
            )));
        }
        self.weighted_fields = fields;
        Ok(self)
    }
}

fn normalize_sort<I, S>(fields: I, direction: &str) -> Result<Vec<(String, SortDirection)>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let direction: SortDirection = direction.parse()?;
    let mut entries: Vec<(String, SortDirection)> = Vec::new();
    for field in fields {
        let field = field.as_ref().trim();
        if field.is_empty() {
            continue;
        }
        if field == "*" {
            return Err(QueryError::invalid("cannot sort by wildcard field"));
        }
        match entries.iter_mut().find(|entry| entry.0 == field) {
            Some(entry) => entry.1 = direction,
            None => entries.push((field.to_string(), direction)),
        }
    }
    Ok(entries)
}
