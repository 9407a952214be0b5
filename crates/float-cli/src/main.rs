mod config;
mod extract;
mod oracle;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use float_core::{FloatAST, FloatQuery, QueryEngine, export_json, import_json};
use float_store::Store;

use crate::oracle::OracleClient;

#[derive(Parser)]
#[command(name = "floatctl", about = "Parse conversations into FloatAST and run FloatQL")]
struct Cli {
    /// Database file (default: $FLOAT_DATA_DIR/float.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a conversation file into a stored FloatAST document
    Parse {
        /// Conversation text file
        file: PathBuf,

        /// Document title (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,

        /// Ask the semantic oracle for concepts (falls back silently)
        #[arg(long)]
        oracle: bool,
    },

    /// Evaluate a FloatQL request against a stored document
    Query {
        /// Document id
        id: Uuid,

        /// FloatQL request as inline JSON, or @path to a JSON file
        request: String,
    },

    /// Extract ranked fragments for a free-text query
    Extract {
        /// Document id
        id: Uuid,

        /// Free-text query
        query: String,

        /// Maximum fragments (clamped to the configured ceiling)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Print the concepts of a stored document
    Concepts {
        /// Document id
        id: Uuid,

        /// Re-derive concepts via the semantic oracle and persist them
        #[arg(long)]
        refresh: bool,
    },

    /// Print a stored document as JSON
    Show {
        /// Document id
        id: Uuid,
    },

    /// List stored documents
    List,

    /// Show pattern counters and collection sizes for a document
    Stats {
        /// Document id
        id: Uuid,
    },

    /// Export a document to a JSON file
    Export {
        /// Document id
        id: Uuid,

        /// Output file path
        path: PathBuf,
    },

    /// Import a document JSON file (version-gated)
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn db_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.db {
        return path.clone();
    }
    std::env::var("FLOAT_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(float_store::default_base_dir)
        .join("float.db")
}

fn open_store(cli: &Cli) -> Result<Store> {
    let path = db_path(cli);
    Store::open(&path).with_context(|| format!("failed to open store at {}", path.display()))
}

fn load_document(store: &Store, id: Uuid) -> Result<FloatAST> {
    match store.get_document(id)? {
        Some(ast) => Ok(ast),
        None => bail!("no document with id {id}"),
    }
}

fn oracle_client() -> Option<OracleClient> {
    let config = config::load_oracle_config(&config::default_config_path());
    OracleClient::from_config(&config)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Parse { file, title, oracle } => {
            cmd_parse(&cli, file, title.as_deref(), *oracle).await
        }
        Commands::Query { id, request } => cmd_query(&cli, *id, request),
        Commands::Extract { id, query, max } => cmd_extract(&cli, *id, query, *max).await,
        Commands::Concepts { id, refresh } => cmd_concepts(&cli, *id, *refresh).await,
        Commands::Show { id } => cmd_show(&cli, *id),
        Commands::List => cmd_list(&cli),
        Commands::Stats { id } => cmd_stats(&cli, *id),
        Commands::Export { id, path } => cmd_export(&cli, *id, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

async fn cmd_parse(cli: &Cli, file: &PathBuf, title: Option<&str>, oracle: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let title = title
        .map(str::to_string)
        .or_else(|| {
            file.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let mut ast = FloatAST::parse_conversation(&text, &title);
    if ast.nodes.is_empty() {
        println!("no content found in {}", file.display());
        return Ok(());
    }

    if oracle {
        extract::enrich_concepts(oracle_client().as_ref(), &mut ast).await;
    }

    let warnings = ast
        .validate()
        .map_err(|e| anyhow::anyhow!("assembled document failed validation: {e}"))?;
    for warning in warnings {
        tracing::warn!("{warning}");
    }

    let store = open_store(cli)?;
    store.put_document(&ast)?;
    println!(
        "{} ({} nodes, {} edges, {} concepts)",
        ast.id,
        ast.nodes.len(),
        ast.edges.len(),
        ast.concepts.len()
    );
    Ok(())
}

fn cmd_query(cli: &Cli, id: Uuid, request: &str) -> Result<()> {
    let json = match request.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read query file {path}"))?,
        None => request.to_string(),
    };
    let query = FloatQuery::from_json(&json).map_err(|e| anyhow::anyhow!("{e}"))?;

    let store = open_store(cli)?;
    let ast = load_document(&store, id)?;
    let response = QueryEngine::evaluate(&ast, &query).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn cmd_extract(cli: &Cli, id: Uuid, query: &str, max: Option<usize>) -> Result<()> {
    let store = open_store(cli)?;
    let ast = load_document(&store, id)?;
    let fragments = extract::extract_fragments(oracle_client().as_ref(), &ast, query, max).await;
    println!("{}", serde_json::to_string_pretty(&fragments)?);
    Ok(())
}

async fn cmd_concepts(cli: &Cli, id: Uuid, refresh: bool) -> Result<()> {
    let store = open_store(cli)?;
    let mut ast = load_document(&store, id)?;
    if refresh {
        extract::enrich_concepts(oracle_client().as_ref(), &mut ast).await;
        store.put_document(&ast)?;
    }
    println!("{}", serde_json::to_string_pretty(&ast.concepts)?);
    Ok(())
}

fn cmd_show(cli: &Cli, id: Uuid) -> Result<()> {
    let store = open_store(cli)?;
    let ast = load_document(&store, id)?;
    println!("{}", export_json(&ast).map_err(anyhow::Error::from)?);
    Ok(())
}

fn cmd_list(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let documents = store.list_documents()?;
    if documents.is_empty() {
        println!("no documents stored");
        return Ok(());
    }
    for (id, source) in documents {
        println!("{id}  {source}");
    }
    Ok(())
}

fn cmd_stats(cli: &Cli, id: Uuid) -> Result<()> {
    let store = open_store(cli)?;
    let ast = load_document(&store, id)?;
    let stats = serde_json::json!({
        "nodes": ast.nodes.len(),
        "edges": ast.edges.len(),
        "concepts": ast.concepts.len(),
        "patterns": ast.patterns,
    });
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn cmd_export(cli: &Cli, id: Uuid, path: &PathBuf) -> Result<()> {
    let store = open_store(cli)?;
    let ast = load_document(&store, id)?;
    let json = export_json(&ast).map_err(anyhow::Error::from)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("exported {} to {}", id, path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &PathBuf) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let ast = import_json(&json).map_err(|e| anyhow::anyhow!("{e}"))?;
    ast.validate()
        .map_err(|e| anyhow::anyhow!("imported document failed validation: {e}"))?;

    let store = open_store(cli)?;
    store.put_document(&ast)?;
    println!("imported {}", ast.id);
    Ok(())
}
