//! Scriptorium CLI
//!
//! Maintenance commands for the search index: (re)index document ranges,
//! remove entries, run the consistency check, extract fulltext and query the
//! search service.

mod logging;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use scriptorium_config::{
    merge::overlay, ConfigResolver, ServiceType, Settings, DEFAULT_SERVICE_NAME,
};
use scriptorium_fulltext::FulltextCache;
use scriptorium_index::{
    Document, DocumentFile, DocumentStore, Error, ExecutionMode, FulltextExtractor, IdRange,
    IndexDispatcher, IndexReader, IndexingAdapter, InlineJobQueue, MemoryDocumentStore,
    ReconciliationEngine, ServiceLocator,
};
use scriptorium_query::{FacetSpec, Filter, Query};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "config/scriptorium.toml";
const DEFAULT_WORKSPACE: &str = "workspace";

#[derive(Parser)]
#[command(name = "scriptorium", version, about = "Search index maintenance")]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Search domain; defaults to `searchengine.domain`.
    #[arg(short, long, global = true)]
    domain: Option<String>,

    /// Service name within the domain.
    #[arg(long, global = true)]
    service: Option<String>,

    /// Document snapshot (JSON array of documents).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log level, overrides `logging.level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index documents in an id range.
    Index {
        #[command(flatten)]
        range: RangeArgs,

        /// Documents per update request.
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Empty the fulltext cache before indexing.
        #[arg(long)]
        clear_cache: bool,

        /// Remove all index entries before indexing.
        #[arg(long)]
        remove_all: bool,
    },
    /// Remove index entries in an id range.
    Remove {
        #[command(flatten)]
        range: RangeArgs,

        /// Remove every entry, ignoring the range.
        #[arg(long)]
        all: bool,
    },
    /// Compare the document store with the index and repair drift.
    Reconcile,
    /// Extract the fulltext of a single file.
    Extract {
        file: PathBuf,

        #[arg(long, default_value = "application/pdf")]
        mime_type: String,
    },
    /// Check that a search service is reachable.
    Ping {
        #[arg(long, default_value = "search")]
        service_type: ServiceType,
    },
    /// Run a search and print the result as JSON.
    Search {
        /// Search terms; all documents when omitted.
        terms: Vec<String>,

        #[arg(long, default_value = "text")]
        field: String,

        /// Additional `field=value` filters.
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,

        #[arg(long, default_value_t = 0)]
        start: u64,

        #[arg(long, default_value_t = scriptorium_query::DEFAULT_ROWS)]
        rows: u64,

        /// Request facets, optionally from a named facet set.
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        facets: Option<String>,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// First id (`-` for unbounded).
    start: Option<String>,
    /// Last id (`-` for unbounded).
    end: Option<String>,
}

impl RangeArgs {
    fn parse(&self) -> anyhow::Result<IdRange> {
        Ok(IdRange::new(
            parse_bound(self.start.as_deref())?,
            parse_bound(self.end.as_deref())?,
        ))
    }
}

fn parse_bound(bound: Option<&str>) -> anyhow::Result<Option<u64>> {
    match bound {
        None | Some("-") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("'{}' is not a document id", value)),
    }
}

/// Shared state built from the configuration file and global flags.
struct App {
    settings: Arc<Settings>,
    locator: ServiceLocator,
    domain: String,
    service: Option<String>,
    store: Option<PathBuf>,
}

impl App {
    fn indexer(&self) -> anyhow::Result<Arc<IndexingAdapter>> {
        Ok(self.locator.indexer(self.service.as_deref(), &self.domain)?)
    }

    fn searcher(&self) -> anyhow::Result<Arc<IndexingAdapter>> {
        Ok(self.locator.searcher(self.service.as_deref(), &self.domain)?)
    }

    async fn store(&self) -> anyhow::Result<Arc<MemoryDocumentStore>> {
        let path = self
            .store
            .clone()
            .or_else(|| self.settings.get_str("store.path").map(PathBuf::from))
            .context("No document store given (use --store or set store.path)")?;
        let store = MemoryDocumentStore::from_json_file(&path)
            .await
            .with_context(|| format!("Failed to load documents from {}", path.display()))?;
        Ok(Arc::new(store))
    }

    fn dispatcher(
        &self,
        adapter: Arc<IndexingAdapter>,
        store: Arc<MemoryDocumentStore>,
    ) -> IndexDispatcher {
        if self.settings.get_bool("indexing.async_mode").unwrap_or(false) {
            let queue = Arc::new(InlineJobQueue::new(store, adapter.clone()));
            IndexDispatcher::with_queue(adapter, queue, ExecutionMode::Asynchronous)
        } else {
            IndexDispatcher::synchronous(adapter)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    logging::init_logging(&logging::LoggingConfig::from_settings(
        &settings,
        cli.log_level.as_deref(),
        cli.json_logs,
    ))
    .context("Failed to initialize logging")?;

    let resolver = ConfigResolver::new(Arc::new(settings.clone()));
    let domain = match cli.domain {
        Some(domain) => domain,
        None => resolver.default_domain().to_string(),
    };

    if let Command::Index {
        chunk_size: Some(size),
        ..
    } = &cli.command
    {
        settings = with_chunk_size(&settings, &domain, cli.service.as_deref(), *size);
    }

    let settings = Arc::new(settings);
    let workspace = settings
        .get_str("workspace.path")
        .unwrap_or(DEFAULT_WORKSPACE)
        .to_string();
    let cache = FulltextCache::in_workspace(Path::new(&workspace));
    let locator = ServiceLocator::new(Arc::new(ConfigResolver::new(settings.clone())), cache);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        domain = %domain,
        workspace = %workspace,
        "Configuration loaded"
    );

    let ctx = App {
        settings,
        locator,
        domain,
        service: cli.service,
        store: cli.store,
    };

    match cli.command {
        Command::Index {
            range,
            clear_cache,
            remove_all,
            ..
        } => index(&ctx, range.parse()?, clear_cache, remove_all).await,
        Command::Remove { range, all } => remove(&ctx, range.parse()?, all).await,
        Command::Reconcile => reconcile(&ctx).await,
        Command::Extract { file, mime_type } => extract(&ctx, file, mime_type).await,
        Command::Ping { service_type } => ping(&ctx, service_type).await,
        Command::Search {
            terms,
            field,
            filters,
            start,
            rows,
            facets,
        } => {
            let query = build_query(&terms, &field, &filters, start, rows, facets)?;
            search(&ctx, &query).await
        }
    }
}

/// Settings with `chunk_size` overridden for the selected index service.
fn with_chunk_size(
    settings: &Settings,
    domain: &str,
    service: Option<&str>,
    size: u64,
) -> Settings {
    let mut services = serde_json::Map::new();
    services.insert(
        service.unwrap_or(DEFAULT_SERVICE_NAME).to_string(),
        json!({ "service": { "index": { "chunk_size": size } } }),
    );
    let mut domains = serde_json::Map::new();
    domains.insert(domain.to_string(), serde_json::Value::Object(services));
    let patch = json!({ "searchengine": domains });
    Settings::from_value(overlay(settings.root(), &patch))
}

async fn index(
    ctx: &App,
    range: IdRange,
    clear_cache: bool,
    remove_all: bool,
) -> anyhow::Result<()> {
    let adapter = ctx.indexer()?;
    if clear_cache {
        let removed = adapter
            .cache()
            .clear()
            .context("Failed to clear fulltext cache")?;
        tracing::info!(removed, "Fulltext cache cleared");
    }

    let store = ctx.store().await?;
    let ids = store.document_ids(None, range).await?;
    let mut documents: Vec<Document> = Vec::with_capacity(ids.len());
    for id in ids {
        documents.push(store.document(id).await?);
    }

    if remove_all {
        if let Err(e) = adapter.remove_all_documents_from_index().await {
            return report_batch_error(e);
        }
    }

    tracing::info!(%range, documents = documents.len(), "Indexing documents");
    match adapter.add_documents_to_index(&documents).await {
        Ok(()) => {
            println!("Indexed {} documents ({})", documents.len(), range);
            Ok(())
        }
        Err(e) => report_batch_error(e),
    }
}

async fn remove(ctx: &App, range: IdRange, all: bool) -> anyhow::Result<()> {
    let adapter = ctx.indexer()?;
    let result = if all {
        adapter.remove_all_documents_from_index().await
    } else {
        let ids: Vec<u64> = ctx
            .searcher()?
            .all_ids()
            .await?
            .into_iter()
            .filter(|id| range.contains(*id))
            .collect();
        println!("Removing {} index entries ({})", ids.len(), range);
        adapter.remove_documents_from_index_by_id(&ids).await
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) => report_batch_error(e),
    }
}

async fn reconcile(ctx: &App) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let indexer = ctx.indexer()?;
    let dispatcher = Arc::new(ctx.dispatcher(indexer, store.clone()));
    let engine = ReconciliationEngine::new(store, ctx.searcher()?, dispatcher);

    let report = engine.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn extract(ctx: &App, path: PathBuf, mime_type: String) -> anyhow::Result<()> {
    let extractor = ctx
        .locator
        .extractor(ctx.service.as_deref(), &ctx.domain)?;
    let file = DocumentFile {
        id: 0,
        path,
        mime_type,
        visible: true,
    };
    let text = extractor.extract_document_file(&file, None).await?;
    println!("{}", text);
    Ok(())
}

async fn ping(ctx: &App, service_type: ServiceType) -> anyhow::Result<()> {
    let adapter = ctx
        .locator
        .adapter(service_type, ctx.service.as_deref(), &ctx.domain)?;
    adapter
        .ping()
        .await
        .with_context(|| format!("{} service of domain '{}' is not reachable", service_type, ctx.domain))?;
    println!("{} service of domain '{}' is reachable", service_type, ctx.domain);
    Ok(())
}

fn build_query(
    terms: &[String],
    field: &str,
    filters: &[String],
    start: u64,
    rows: u64,
    facets: Option<String>,
) -> anyhow::Result<Query> {
    let mut query = Query::new();
    query.set_start(start).set_rows(rows);

    let phrase = terms.join(" ");
    if !phrase.trim().is_empty() {
        query.set_filter(Filter::equals(field, [phrase])?);
    }

    for filter in filters {
        let Some((name, value)) = filter.split_once('=') else {
            bail!("filter '{}' is not of the form FIELD=VALUE", filter);
        };
        query.set_subfilter(name, Filter::equals(name, [value])?)?;
    }

    match facets.as_deref() {
        None => {}
        Some("") => {
            query.set_facet(FacetSpec::new());
        }
        Some(set) => {
            query.set_facet(FacetSpec::for_set(set));
        }
    }
    Ok(query)
}

async fn search(ctx: &App, query: &Query) -> anyhow::Result<()> {
    let result = ctx.searcher()?.search(query).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Partial batch failures are reported but do not fail the process;
/// configuration problems do.
fn report_batch_error(error: Error) -> anyhow::Result<()> {
    if error.is_configuration() {
        return Err(error.into());
    }
    tracing::error!(error = %error, "Batch failed");
    eprintln!("{}", error_chain(&error));
    Ok(())
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
