mod render;

use anyhow::{bail, Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use lineage_ai::{EnrichmentRequest, GeneratorFactory};
use lineage_catalog::{
    CatalogClient, CatalogResponse, ClassType, ClassTypeSelector, InMemoryCatalog, SearchFilters,
};
use lineage_core::{ConfigManager, LineageConfig, LineageDirection, LoggingConfig};
use lineage_graph::{BuildOptions, LineageBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

#[derive(Parser)]
#[command(name = "lineage")]
#[command(about = "LineageGraph - data lineage trees from a remote catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Configuration file (defaults to .lineage.toml, then ~/.lineage/config.toml)
    #[arg(short, long, global = true, env = "LINEAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Serve catalog lookups from a JSON file of items instead of the network
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Upstream,
    Downstream,
    Both,
}

impl From<DirectionArg> for LineageDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Upstream => LineageDirection::Upstream,
            DirectionArg::Downstream => LineageDirection::Downstream,
            DirectionArg::Both => LineageDirection::Both,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the lineage tree of an asset
    Tree {
        /// Asset ID
        asset_id: String,

        /// Traversal direction (defaults to traversal.default_direction)
        #[arg(short, long, value_enum)]
        direction: Option<DirectionArg>,

        /// Maximum tree depth
        #[arg(long, value_parser = positive())]
        max_depth: Option<usize>,

        /// Maximum number of nodes
        #[arg(long, value_parser = positive())]
        max_nodes: Option<usize>,
    },

    /// Immediate upstream/downstream links of an asset
    Links {
        /// Asset ID
        asset_id: String,

        #[arg(short, long, value_enum, default_value = "both")]
        direction: DirectionArg,
    },

    /// Show an asset's catalog record
    Asset {
        /// Asset ID
        asset_id: String,

        /// Ask the configured text generator for a business description
        #[arg(long)]
        enrich: bool,

        /// Schema or domain context passed to the text generator
        #[arg(long)]
        schema_context: Option<String>,
    },

    /// Search the catalog
    Search {
        /// Query expression, e.g. "*CUSTOMER*"
        query: String,

        /// Class type: a full identifier or a keyword such as "tables"
        #[arg(long = "class-type")]
        class_types: Vec<String>,

        /// Named category (columns, tables, views, tables_and_views, all, ...)
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    generated_at: String,
    #[serde(flatten)]
    body: T,
}

fn print_json<T: Serialize>(body: T) -> Result<()> {
    let envelope = Envelope {
        generated_at: chrono::Utc::now().to_rfc3339(),
        body,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = load_config(cli.config.as_deref())?;
    init_logging(&manager.config().logging, cli.verbose);
    manager.log_summary();
    let config = manager.into_config();

    let client = Arc::new(create_client(&config, cli.fixture.as_deref())?);
    let builder = LineageBuilder::new(client.clone());

    match cli.command {
        Commands::Tree {
            asset_id,
            direction,
            max_depth,
            max_nodes,
        } => {
            let mut options = BuildOptions::from(&config.traversal);
            if let Some(direction) = direction {
                options.direction = direction.into();
            }
            if let Some(max_depth) = max_depth {
                options.max_depth = max_depth;
            }
            if let Some(max_nodes) = max_nodes {
                options.max_total_nodes = max_nodes;
            }
            handle_tree(&builder, &asset_id, &options, cli.output).await?
        }
        Commands::Links {
            asset_id,
            direction,
        } => handle_links(&builder, &asset_id, direction.into(), cli.output).await?,
        Commands::Asset {
            asset_id,
            enrich,
            schema_context,
        } => {
            handle_asset(
                &builder,
                &config,
                &asset_id,
                enrich,
                schema_context,
                cli.output,
            )
            .await?
        }
        Commands::Search {
            query,
            class_types,
            category,
            limit,
        } => {
            let filters = search_filters(&class_types, category.as_deref())?;
            handle_search(&client, &query, &filters, limit, cli.output).await?
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    match path {
        Some(path) => ConfigManager::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => ConfigManager::load().context("Failed to load configuration"),
    }
}

/// Parser for limits that must be at least 1.
fn positive() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}

/// Logs go to stderr so JSON output on stdout stays parseable.
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match logging.format.as_str() {
        "json" => {
            let subscriber = Registry::default().with(env_filter()).with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            );
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        "compact" => {
            let subscriber = Registry::default().with(env_filter()).with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            );
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        _ => {
            let subscriber = Registry::default()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

fn create_client(config: &LineageConfig, fixture: Option<&Path>) -> Result<CatalogClient> {
    if let Some(path) = fixture {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let response: CatalogResponse = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        info!(
            "Serving {} fixture item(s) from {}",
            response.items.len(),
            path.display()
        );
        let catalog = InMemoryCatalog::with_items(response.items);
        return Ok(CatalogClient::new(Arc::new(catalog), &config.catalog));
    }

    if config.catalog.base_url.is_empty() {
        bail!("No catalog URL configured; set LINEAGE_CATALOG_URL or catalog.base_url, or pass --fixture");
    }

    CatalogClient::from_config(&config.catalog).context("Failed to create catalog client")
}

fn search_filters(class_types: &[String], category: Option<&str>) -> Result<SearchFilters> {
    let mut resolved: Vec<ClassType> = Vec::new();

    for value in class_types {
        match value.parse::<ClassType>() {
            Ok(class_type) => resolved.push(class_type),
            Err(_) => {
                let inferred = ClassTypeSelector::infer(value, false);
                if inferred.is_empty() {
                    bail!("Unknown class type: {}", value);
                }
                resolved.extend(inferred);
            }
        }
    }

    if let Some(category) = category {
        resolved.extend(ClassTypeSelector::by_category(category));
    }

    resolved.sort();
    resolved.dedup();
    Ok(SearchFilters::new().with_class_types(resolved))
}

async fn handle_tree(
    builder: &LineageBuilder,
    asset_id: &str,
    options: &BuildOptions,
    output: OutputFormat,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with a partial tree");
            on_interrupt.cancel();
        }
    });

    let result = builder
        .build_with_cancellation(asset_id, options, cancel)
        .await;

    match output {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Pretty => {
            let title = format!("{} lineage of {}", options.direction, asset_id);
            println!("{}", title.bold());
            match &result.tree {
                Some(tree) => print!("{}", render::render_tree(tree)),
                None => println!("{}", "No tree: the root asset could not be fetched".red()),
            }
            println!();
            println!("{}", render::render_stats(&result.stats).dimmed());
        }
    }

    if result.tree.is_none() {
        bail!("Failed to fetch root asset {}", asset_id);
    }
    Ok(())
}

async fn handle_links(
    builder: &LineageBuilder,
    asset_id: &str,
    direction: LineageDirection,
    output: OutputFormat,
) -> Result<()> {
    let links = builder
        .immediate_lineage(asset_id, direction)
        .await
        .with_context(|| format!("Failed to fetch links of {}", asset_id))?;

    match output {
        OutputFormat::Json => print_json(serde_json::json!({
            "asset_id": asset_id,
            "direction": direction,
            "links": links,
        }))?,
        OutputFormat::Pretty => {
            println!("{} {} link(s) of {}", links.len(), direction, asset_id.bold());
            print!("{}", render::render_links(&links));
        }
    }
    Ok(())
}

async fn handle_asset(
    builder: &LineageBuilder,
    config: &LineageConfig,
    asset_id: &str,
    enrich: bool,
    schema_context: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    let record = builder
        .asset_metadata(asset_id)
        .await
        .with_context(|| format!("Failed to fetch {}", asset_id))?;

    let enriched = if enrich {
        let generator =
            GeneratorFactory::from_config(&config.llm).context("Text generator unavailable")?;
        let context = schema_context.unwrap_or_else(|| parent_segment(asset_id).to_string());
        let request = EnrichmentRequest::from_record(&record, context);
        Some(
            generator
                .enhance_description(&request)
                .await
                .context("Failed to enrich description")?,
        )
    } else {
        None
    };

    match output {
        OutputFormat::Json => print_json(serde_json::json!({
            "asset": &*record,
            "enriched_description": enriched,
        }))?,
        OutputFormat::Pretty => {
            print!("{}", render::render_asset(&record));
            if let Some(text) = enriched {
                println!("{} {}", "Enriched:".green(), text);
            }
        }
    }
    Ok(())
}

async fn handle_search(
    client: &CatalogClient,
    query: &str,
    filters: &SearchFilters,
    limit: usize,
    output: OutputFormat,
) -> Result<()> {
    let mut records = client
        .search(query, filters)
        .await
        .with_context(|| format!("Search for '{}' failed", query))?;
    let total = records.len();
    records.truncate(limit);

    match output {
        OutputFormat::Json => print_json(serde_json::json!({
            "query": query,
            "total": total,
            "results": records,
        }))?,
        OutputFormat::Pretty => {
            println!("{} result(s) for {}", total, query.bold());
            for record in &records {
                println!(
                    "  {} [{}] {}",
                    record.name,
                    ClassType::describe(&record.class_type),
                    record.id.dimmed()
                );
            }
        }
    }
    Ok(())
}

/// Segment before the last `/` of an asset id, used as default schema context.
fn parent_segment(asset_id: &str) -> &str {
    let mut segments = asset_id.rsplit('/');
    segments.next();
    segments.next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_segment() {
        assert_eq!(parent_segment("server://db/SALES/ORDERS"), "SALES");
        assert_eq!(parent_segment("ORDERS"), "");
    }

    #[test]
    fn test_search_filters_resolution() {
        let filters = search_filters(
            &[
                "com.infa.ldm.relational.View".to_string(),
                "tables".to_string(),
            ],
            Some("views"),
        )
        .unwrap();
        assert_eq!(filters.class_types, vec![ClassType::Table, ClassType::View]);

        assert!(search_filters(&["nonsense".to_string()], None).is_err());
    }

    #[test]
    fn test_cli_parses_tree_command() {
        let cli = Cli::try_parse_from([
            "lineage",
            "--output",
            "json",
            "tree",
            "db/T",
            "--direction",
            "both",
            "--max-depth",
            "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Tree {
                asset_id,
                direction,
                max_depth,
                max_nodes,
            } => {
                assert_eq!(asset_id, "db/T");
                assert!(matches!(direction, Some(DirectionArg::Both)));
                assert_eq!(max_depth, Some(4));
                assert_eq!(max_nodes, None);
            }
            _ => panic!("expected tree command"),
        }
    }

    #[test]
    fn test_cli_rejects_zero_limits() {
        for flag in ["--max-depth", "--max-nodes"] {
            let parsed = Cli::try_parse_from(["lineage", "tree", "db/T", flag, "0"]);
            assert!(parsed.is_err(), "{} 0 should be rejected", flag);
        }

        let cli = Cli::try_parse_from(["lineage", "tree", "db/T", "--max-nodes", "1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tree {
                max_nodes: Some(1),
                ..
            }
        ));
    }
}
