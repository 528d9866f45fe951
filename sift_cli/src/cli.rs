use clap::{Parser, Subcommand, ValueEnum};
use sift_core::{EntityKind, SearchMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Sift - Federated entity search over genes, experiments and annotations")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  sift search grin1 --catalog catalog.yaml             Search every kind
  sift search \"brain AND epilepsy\" -c catalog.yaml -k experiment
  sift search \"\" -c catalog.yaml --term-uri http://purl.obolibrary.org/obo/UBERON_0000955
  sift kinds                                           List searchable kinds

\x1b[1;36mConfiguration:\x1b[0m
  sift config show                                     View effective configuration
  sift config init                                     Write the defaults to disk
  sift config path                                     Print the config file location")]
#[command(long_about = "
\x1b[1mSift\x1b[0m - Federated Entity Search

Resolves a query against an exact-match store, a full-text index and an
ontology annotation store, then merges, ranks and filters the matches per
entity kind. Free-text queries support \x1b[1mAND\x1b[0m, \x1b[1mOR\x1b[0m, \x1b[1mNOT\x1b[0m, quoted phrases and
trailing \x1b[1m*\x1b[0m prefixes.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output (-v for debug logging)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the configuration file
    #[arg(long, global = true, env = "SIFT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a catalog
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  sift search grin1 -c catalog.yaml
  sift search grin1 -c catalog.yaml --taxon mouse -k gene
  sift search \"hippocampus OR cortex\" -c catalog.yaml --mode accurate
  sift search \"grin*\" -c catalog.yaml --no-index --output json")]
    Search(SearchArgs),

    /// List searchable entity kinds
    Kinds,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub struct SearchArgs {
    /// Query text, or an ontology term URI
    pub query: String,

    /// Catalog file (YAML or JSON)
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// Entity kinds to search (repeatable, default: all)
    #[arg(short, long = "kind", value_parser = parse_kind)]
    pub kinds: Vec<EntityKind>,

    /// Restrict results to a taxon (id, scientific or common name)
    #[arg(short, long)]
    pub taxon: Option<String>,

    /// Search by ontology term URI instead of the query text
    #[arg(long)]
    pub term_uri: Option<String>,

    /// Maximum results per kind (0 for unlimited)
    #[arg(short = 'n', long, default_value_t = sift_core::model::DEFAULT_MAX_RESULTS)]
    pub max_results: usize,

    /// Latency tolerance
    #[arg(short, long, value_enum, default_value_t = ModeArg::Balanced)]
    pub mode: ModeArg,

    /// Skip the exact-match store
    #[arg(long)]
    pub no_db: bool,

    /// Skip the full-text index
    #[arg(long)]
    pub no_index: bool,

    /// Skip ontology annotations
    #[arg(long)]
    pub no_characteristics: bool,

    /// Also match genes through GO annotations
    #[arg(long)]
    pub go: bool,

    /// Stop gene search at the first exact-match hit
    #[arg(long)]
    pub return_on_db_hit: bool,

    /// Drop kinds without a taxon when a taxon is set
    #[arg(long)]
    pub strict_taxon: bool,

    /// Return only identifiers and scores
    #[arg(long)]
    pub ids_only: bool,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration if no file exists
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Fast,
    Balanced,
    Accurate,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fast => SearchMode::Fast,
            ModeArg::Balanced => SearchMode::Balanced,
            ModeArg::Accurate => SearchMode::Accurate,
        }
    }
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    s.parse().map_err(|e: sift_core::model::UnknownEntityKind| e.to_string())
}
