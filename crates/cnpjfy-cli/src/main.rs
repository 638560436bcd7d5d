mod commands;
mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use cnpjfy_api::{ApiClient, ApiConfig, DEFAULT_BASE_URL};
use cnpjfy_core::{Locale, ReferenceTable};
use cnpjfy_store::{DEFAULT_RETENTION_DAYS, FileStorage, LocalStore, Storage};
use tracing::{Level, debug};

use commands::{App, ExportFormat, ExportRequest, ExportSource};

#[derive(Parser)]
#[command(name = "cnpjfy", version)]
#[command(about = "Look up Brazilian companies by CNPJ, keep a local history, compare and export")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Base URL of the CNPJ lookup API
    #[arg(long, global = true, env = "CNPJFY_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Request timeout in seconds (no timeout when unset)
    #[arg(long, global = true, env = "CNPJFY_API_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Directory for the local store (default: ~/.cnpjfy)
    #[arg(long, global = true, env = "CNPJFY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Storage backend for the local store
    #[arg(long, global = true, value_enum, default_value = "json")]
    store: StoreKind,

    /// JSON dictionary of CNAE / legal-nature descriptions layered over the built-in table
    #[arg(long, global = true, env = "CNPJFY_REFERENCE_TABLE")]
    reference: Option<PathBuf>,

    /// More log output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Json,
    Duckdb,
}

#[derive(Subcommand)]
enum Command {
    /// Check a CNPJ's check digits without calling the API
    Validate { input: String },
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that need the local store and the API client.
#[derive(Subcommand)]
enum StoreCommand {
    /// Look up a company and record it in the local history
    Lookup {
        cnpj: String,
        /// Print the company as JSON instead of a card
        #[arg(long)]
        json: bool,
        /// Do not write anything to the local store
        #[arg(long)]
        no_save: bool,
    },
    /// Recent searches and the search log
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Most recently viewed cached companies
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Cached companies by number of lookups
    Trending {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Search cached companies by name or CNPJ digits
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Search CNAE descriptions in the reference table
    Cnae {
        term: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Manage the comparison set (up to 4 companies)
    Compare {
        #[command(subcommand)]
        action: CompareAction,
    },
    /// Manage favorites
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Export companies as CSV or JSON
    Export(ExportArgs),
    /// Write every local collection to a JSON file
    Backup { file: PathBuf },
    /// Replace every local collection with a backup file
    Restore { file: PathBuf },
    /// Remove history and cached companies older than N days (favorites are kept)
    Cleanup {
        #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
        days: u32,
    },
    /// Show dataset information from the API
    Info,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Clear recent searches and the search log
    Clear,
}

#[derive(Subcommand)]
enum CompareAction {
    Add { cnpj: String },
    Remove { cnpj: String },
    List,
    Clear,
}

#[derive(Subcommand)]
enum FavoriteAction {
    Add { cnpj: String },
    Remove { cnpj: String },
    List,
}

#[derive(Args)]
struct ExportArgs {
    /// CNPJs to export (cached copies are used when available)
    #[arg(required_unless_present_any = ["comparison", "history"])]
    cnpjs: Vec<String>,

    /// Export the comparison set
    #[arg(long, conflicts_with_all = ["history", "cnpjs"])]
    comparison: bool,

    /// Export the companies in the recent-search history
    #[arg(long, conflicts_with = "cnpjs")]
    history: bool,

    #[arg(long, value_enum, default_value = "csv")]
    format: ExportFormat,

    /// Header labels for CSV output (pt-BR or en)
    #[arg(long, default_value = "pt-BR")]
    locale: Locale,

    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Leave out the metadata block in JSON output
    #[arg(long)]
    no_metadata: bool,

    /// Export only the partner roster of a single company (CSV)
    #[arg(long)]
    partners: bool,

    /// Output file, `-` for stdout (default: a dated file name in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ExportArgs {
    fn into_request(self) -> ExportRequest {
        let source = if self.comparison {
            ExportSource::Comparison
        } else if self.history {
            ExportSource::History
        } else {
            ExportSource::Companies(self.cnpjs)
        };
        ExportRequest {
            source,
            format: self.format,
            locale: self.locale,
            delimiter: self.delimiter,
            include_metadata: !self.no_metadata,
            partners_only: self.partners,
            output: self.output,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet);
    debug!("cnpjfy v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let command = match cli.command {
        // Validation needs neither the store nor the API.
        Command::Validate { input } => return Ok(commands::validate(&input)),
        Command::Store(command) => command,
    };

    let app = build_app(&cli.global)?;
    match command {
        StoreCommand::Lookup {
            cnpj,
            json,
            no_save,
        } => return commands::lookup(&app, &cnpj, json, !no_save).await,
        StoreCommand::History { action, limit } => match action {
            Some(HistoryAction::Clear) => commands::clear_history(&app).await,
            None => commands::history(&app, limit).await,
        },
        StoreCommand::Recent { limit } => commands::recent(&app, limit).await,
        StoreCommand::Trending { limit } => commands::trending(&app, limit).await,
        StoreCommand::Search { query, limit } => commands::search(&app, &query, limit).await,
        StoreCommand::Cnae { term, limit } => commands::cnae(&app, &term, limit),
        StoreCommand::Compare { action } => match action {
            CompareAction::Add { cnpj } => commands::compare_add(&app, &cnpj).await?,
            CompareAction::Remove { cnpj } => commands::compare_remove(&app, &cnpj).await?,
            CompareAction::List => commands::compare_list(&app).await,
            CompareAction::Clear => commands::compare_clear(&app).await,
        },
        StoreCommand::Favorite { action } => match action {
            FavoriteAction::Add { cnpj } => commands::favorite_add(&app, &cnpj).await?,
            FavoriteAction::Remove { cnpj } => commands::favorite_remove(&app, &cnpj).await?,
            FavoriteAction::List => commands::favorite_list(&app).await,
        },
        StoreCommand::Export(args) => commands::export(&app, &args.into_request()).await?,
        StoreCommand::Backup { file } => {
            commands::backup(&app.store, &file).await?;
            println!("Backup written to {}", file.display());
        }
        StoreCommand::Restore { file } => commands::restore(&app.store, &file).await?,
        StoreCommand::Cleanup { days } => commands::cleanup(&app, days).await,
        StoreCommand::Info => return commands::info(&app).await,
    }
    Ok(ExitCode::SUCCESS)
}

fn build_app(cli: &GlobalArgs) -> anyhow::Result<App> {
    let reference = load_reference(cli.reference.as_deref())?;

    let mut config = ApiConfig::new(&cli.api_url);
    if let Some(secs) = cli.timeout.filter(|&s| s > 0) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let api = ApiClient::new(config)
        .context("building HTTP client")?
        .with_code_table(reference.clone());

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let storage = open_storage(cli.store, &data_dir)?;
    debug!(data_dir = %data_dir.display(), store = ?cli.store, "opened local store");

    Ok(App {
        store: LocalStore::new(storage),
        api,
        reference,
    })
}

fn load_reference(path: Option<&Path>) -> anyhow::Result<ReferenceTable> {
    let builtin = ReferenceTable::builtin();
    let Some(path) = path else {
        return Ok(builtin);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading reference table {}", path.display()))?;
    let loaded = ReferenceTable::from_json(&text)
        .with_context(|| format!("parsing reference table {}", path.display()))?;
    debug!(
        cnae = loaded.cnae_len(),
        legal_nature = loaded.legal_nature_len(),
        "loaded reference table"
    );
    Ok(builtin.merge(loaded))
}

fn open_storage(kind: StoreKind, dir: &Path) -> anyhow::Result<Arc<dyn Storage>> {
    match kind {
        StoreKind::Json => {
            let storage = FileStorage::open(dir)
                .with_context(|| format!("opening data directory {}", dir.display()))?;
            Ok(Arc::new(storage))
        }
        #[cfg(feature = "duckdb")]
        StoreKind::Duckdb => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating data directory {}", dir.display()))?;
            let storage = cnpjfy_store::DuckStorage::open_persistent(&dir.join("cnpjfy.duckdb"))?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "duckdb"))]
        StoreKind::Duckdb => anyhow::bail!("this build has no DuckDB support (enable the `duckdb` feature)"),
    }
}

fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".cnpjfy"),
        None => PathBuf::from(".cnpjfy"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_export_flags() {
        let cli = Cli::try_parse_from([
            "cnpjfy", "export", "--format", "json", "--locale", "en", "11222333000181",
        ])
        .unwrap();
        let Command::Store(StoreCommand::Export(args)) = cli.command else {
            panic!("expected export");
        };
        let request = args.into_request();
        assert_eq!(request.format, ExportFormat::Json);
        assert_eq!(request.locale, Locale::En);
        assert_eq!(
            request.source,
            ExportSource::Companies(vec!["11222333000181".into()])
        );
    }

    #[test]
    fn export_needs_a_source() {
        assert!(Cli::try_parse_from(["cnpjfy", "export"]).is_err());
        assert!(Cli::try_parse_from(["cnpjfy", "export", "--comparison"]).is_ok());
        assert!(
            Cli::try_parse_from(["cnpjfy", "export", "--comparison", "11222333000181"]).is_err()
        );
    }

    #[test]
    fn validate_is_separate_from_store_commands() {
        let cli = Cli::try_parse_from(["cnpjfy", "validate", "11222333000181"]).unwrap();
        assert!(matches!(cli.command, Command::Validate { input } if input == "11222333000181"));
        let cli = Cli::try_parse_from(["cnpjfy", "info"]).unwrap();
        assert!(matches!(cli.command, Command::Store(StoreCommand::Info)));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["cnpjfy", "-q", "-v", "info"]).is_err());
    }

    #[test]
    fn reference_file_is_layered_over_builtin() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cnae.json");
        std::fs::write(&path, r#"{"0111301": "Cultivo de arroz"}"#).unwrap();
        let table = load_reference(Some(&path)).unwrap();
        assert_eq!(table.search_cnae("arroz", 5).len(), 1);
        assert!(table.cnae_len() > 1);
        assert!(load_reference(Some(&dir.path().join("missing.json"))).is_err());
    }
}
