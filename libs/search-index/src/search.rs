//! Read side: query execution against the search service

use crate::adapter::IndexingAdapter;
use crate::client::EngineRequest;
use crate::Result;
use async_trait::async_trait;
use scriptorium_config::{FacetSettings, FacetSort};
use scriptorium_query::{Filter, Match, Query, SearchResult, MATCH_ALL};
use std::sync::Arc;

const LOOKUP_ROWS: u64 = 10;
const ID_PAGE_SIZE: u64 = 1000;

#[async_trait]
pub trait IndexReader: Send + Sync {
    async fn search(&self, query: &Query) -> Result<SearchResult>;

    /// Every indexed entry for document `id` (more than one means a corrupt index).
    async fn find_by_id(&self, id: u64) -> Result<Vec<Match>> {
        let mut query = Query::new();
        query
            .set_rows(LOOKUP_ROWS)
            .set_fields(["id", "server_date_modified"])
            .set_filter(Filter::equals("id", [id.to_string()])?);
        Ok(self.search(&query).await?.into_matches())
    }

    /// Ids of all indexed documents, ascending.
    async fn all_ids(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        let mut start = 0;
        loop {
            let mut query = Query::new();
            query
                .set_start(start)
                .set_rows(ID_PAGE_SIZE)
                .set_fields(["id"]);
            query.set_sort(["id"], "asc")?;

            let page = self.search(&query).await?;
            if page.matches().is_empty() {
                break;
            }
            start += page.matches().len() as u64;
            ids.extend(page.ids());
            if start >= page.total() {
                break;
            }
        }
        Ok(ids)
    }
}

/// Engine parameters for `query`, with facet defaults from `facets`.
pub fn select_params(
    query: &Query,
    facets: Option<&FacetSettings>,
) -> Result<Vec<(String, String)>> {
    let mut params: Vec<(String, String)> = Vec::new();
    let mut push = |key: &str, value: String| params.push((key.to_string(), value));

    push(
        "q",
        query
            .filter()
            .map(Filter::compile)
            .unwrap_or_else(|| MATCH_ALL.to_string()),
    );
    push("start", query.start().to_string());
    push("rows", query.rows().to_string());
    push(
        "fl",
        if query.fields().is_empty() {
            "*,score".to_string()
        } else {
            query.fields().join(",")
        },
    );
    if !query.sort().is_empty() {
        let sort = query
            .sort()
            .iter()
            .map(|(field, direction)| format!("{} {}", field, direction))
            .collect::<Vec<_>>()
            .join(",");
        push("sort", sort);
    }
    push(
        "q.op",
        if query.is_union() { "OR" } else { "AND" }.to_string(),
    );

    if query.is_weighted_search() {
        push("defType", "edismax".to_string());
        if !query.weighted_fields().is_empty() {
            let qf = query
                .weighted_fields()
                .iter()
                .map(|(field, boost)| format!("{}^{}", field, boost))
                .collect::<Vec<_>>()
                .join(" ");
            push("qf", qf);
        }
    }

    for (name, filter) in query.subfilters() {
        push("fq", format!("{{!tag={}}}{}", name, filter.compile()));
    }

    if let Some(spec) = query.facet() {
        let defaults = FacetSettings::default();
        let effective = spec.merge(facets.unwrap_or(&defaults))?;
        if !effective.is_empty() {
            push("facet", "true".to_string());
            push("facet.mincount", "1".to_string());
            for facet in effective {
                let field_param = if query.subfilters().contains_key(&facet.field) {
                    format!("{{!ex={}}}{}", facet.field, facet.field)
                } else {
                    facet.field.clone()
                };
                push("facet.field", field_param);
                push(
                    &format!("f.{}.facet.limit", facet.field),
                    facet.limit.to_string(),
                );
                if facet.sort == FacetSort::Index {
                    push(&format!("f.{}.facet.sort", facet.field), "index".to_string());
                }
            }
        }
    }

    Ok(params)
}

impl IndexingAdapter {
    fn facet_settings(&self, query: &Query) -> Result<Option<Arc<FacetSettings>>> {
        let (Some(policy), Some(spec)) = (&self.facets, query.facet()) else {
            return Ok(None);
        };
        let set = spec.set_name().or(self.settings.facet_set.as_deref());
        Ok(Some(policy.settings(set, &self.settings.domain)?))
    }
}

#[async_trait]
impl IndexReader for IndexingAdapter {
    async fn search(&self, query: &Query) -> Result<SearchResult> {
        let facets = self.facet_settings(query)?;
        let params = select_params(query, facets.as_deref())?;
        let response = self.client.execute(EngineRequest::Select { params }).await?;
        let result = SearchResult::from_engine_response(&response.body)?;
        tracing::debug!(
            total = result.total(),
            returned = result.matches().len(),
            query_time_ms = result.query_time().as_millis() as u64,
            "Search executed"
        );
        Ok(result)
    }
}
