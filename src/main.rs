//! thing-discovery CLI: discover thing ecosystems for SPARQL queries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use thing_discovery::catalog::SchemaCatalog;
use thing_discovery::config::ShellConfig;
use thing_discovery::discovery::{Discoverer, DiscoveryContext, SearchMode};
use thing_discovery::query::QueryInput;
use thing_discovery::store::OxigraphStore;

#[derive(Parser)]
#[command(name = "thing-discovery", version, about = "Thing ecosystem discovery")]
struct Cli {
    /// Shell configuration (TOML).
    #[arg(long, global = true, default_value = "discovery.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct QueryArgs {
    /// SPARQL query text.
    #[arg(long, conflicts_with = "query_file")]
    query: Option<String>,

    /// File containing the SPARQL query.
    #[arg(long)]
    query_file: Option<PathBuf>,
}

impl QueryArgs {
    fn text(&self) -> Result<String> {
        match (&self.query, &self.query_file) {
            (Some(q), _) => Ok(q.clone()),
            (None, Some(path)) => std::fs::read_to_string(path).into_diagnostic(),
            (None, None) => miette::bail!("provide --query or --query-file"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the ecosystem of things relevant to a query and print it as JSON.
    Discover {
        #[command(flatten)]
        query: QueryArgs,

        /// Only check type reachability, skipping the per-thing structural check.
        #[arg(long)]
        reachability_only: bool,
    },

    /// Print the most general root types of a query.
    RootTypes {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Validate the configuration, catalog and data files.
    CheckConfig,
}

fn build(config: &ShellConfig) -> Result<(Discoverer, Arc<OxigraphStore>)> {
    let store = match &config.store_dir {
        Some(dir) => OxigraphStore::open(dir)?,
        None => OxigraphStore::in_memory()?,
    };
    for path in &config.data {
        store.load_file(path)?;
    }
    let store = Arc::new(store);

    let catalog = SchemaCatalog::load(&config.catalog)?
        .with_store(store.clone(), &config.discovery);
    let discoverer =
        Discoverer::with_graph_composer(Arc::new(catalog), store.clone(), config.discovery.clone());
    Ok((discoverer, store))
}

fn load_config(path: &Path) -> Result<ShellConfig> {
    Ok(ShellConfig::load(path)?)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Discover {
            query,
            reachability_only,
        } => {
            let (discoverer, _) = build(&config)?;
            let text = query.text()?;
            let mode = if reachability_only {
                SearchMode::ReachabilityOnly
            } else {
                SearchMode::Full
            };
            let ted = discoverer.discover(&text, mode)?;
            println!("{}", ted.to_json_pretty().into_diagnostic()?);
        }

        Commands::RootTypes { query } => {
            let (discoverer, _) = build(&config)?;
            let text = query.text()?;
            let roots = discoverer
                .root_types(QueryInput::Text(&text), &mut DiscoveryContext::new())?;
            for (id, desc) in &roots {
                println!("{id}");
                for sub in &desc.sub_types {
                    println!("  <- {sub}");
                }
            }
        }

        Commands::CheckConfig => {
            let (_, store) = build(&config)?;
            println!(
                "Configuration OK: {} data file(s), {} quad(s) loaded",
                config.data.len(),
                store.len()?
            );
        }
    }

    Ok(())
}
