//! Command handlers. Each one calls into the data layer explicitly; nothing
//! is persisted behind the caller's back.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use chrono::Local;
use cnpjfy_api::{ApiClient, ApiError};
use cnpjfy_core::cnpj::{self, clean};
use cnpjfy_core::export::csv::{CsvOptions, companies_to_csv, partners_to_csv};
use cnpjfy_core::export::json::{JsonOptions, companies_to_json};
use cnpjfy_core::export::{ExportKind, default_filename};
use cnpjfy_core::{Cnpj, Company, Locale, ReferenceTable};
use cnpjfy_store::{COMPARISON_LIMIT, ComparisonEntry, LocalStore, Snapshot};
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::display;

pub struct App {
    pub store: LocalStore,
    pub api: ApiClient,
    pub reference: ReferenceTable,
}

// ── lookup / validate ──

pub async fn lookup(app: &App, input: &str, as_json: bool, save: bool) -> anyhow::Result<ExitCode> {
    let company = match app.api.lookup(input).await {
        Ok(company) => company,
        Err(e) => {
            if save {
                let message = e.to_string();
                app.store
                    .log_search(input, input, false, Some(&message))
                    .await;
            }
            eprintln!("{}", describe_api_error(&e));
            return Ok(ExitCode::FAILURE);
        }
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&company)?);
    } else {
        display::print_company_card(&company);
        if app.store.is_favorite(&company.cnpj).await {
            println!("★ in favorites");
        }
    }

    if save {
        record_lookup(&app.store, &company, input).await;
    }
    Ok(ExitCode::SUCCESS)
}

/// Persist a successful lookup: cache, recent searches, search log.
async fn record_lookup(store: &LocalStore, company: &Company, query: &str) {
    store.save_company(company).await;
    store
        .add_recent_search(&company.cnpj, &company.registered_name)
        .await;
    store
        .log_search(company.cnpj.as_str(), query, true, None)
        .await;
}

pub fn validate(input: &str) -> ExitCode {
    let digits = clean(input);
    let valid = cnpj::validate(input);
    println!("cleaned: {digits}");
    println!("masked:  {}", cnpj::mask(&digits));
    println!("valid:   {}", if valid { "yes" } else { "no" });
    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// User-facing text for a failed lookup.
pub fn describe_api_error(e: &ApiError) -> String {
    match e {
        ApiError::Validation(_) => "Invalid CNPJ: check the 14 digits and try again.".to_string(),
        ApiError::NotFound => "CNPJ not found.".to_string(),
        ApiError::RateLimited => {
            "Too many requests. Try again in a few minutes.".to_string()
        }
        ApiError::Server { status, .. } => {
            format!("Server error ({status}). Try again later.")
        }
        other => format!("Lookup failed: {other}"),
    }
}

/// Cached copy when there is one, otherwise a fresh lookup that is recorded
/// like an interactive one.
async fn resolve_company(app: &App, cnpj: &Cnpj) -> anyhow::Result<Company> {
    if let Some(cached) = app.store.get_company(cnpj).await {
        return Ok(cached.company);
    }
    let company = app
        .api
        .fetch_company(cnpj)
        .await
        .map_err(|e| anyhow::anyhow!(describe_api_error(&e)))
        .with_context(|| format!("fetching {cnpj}"))?;
    record_lookup(&app.store, &company, cnpj.as_str()).await;
    Ok(company)
}

fn parse_cnpj(input: &str) -> anyhow::Result<Cnpj> {
    Cnpj::parse(input).with_context(|| format!("{input:?} is not a valid CNPJ"))
}

// ── history and cache queries ──

pub async fn history(app: &App, limit: usize) {
    display::print_recent_searches(&app.store.recent_searches().await);
    let log = app.store.search_log(limit).await;
    if !log.is_empty() {
        println!();
        display::print_search_log(&log);
    }
}

pub async fn clear_history(app: &App) {
    app.store.clear_recent_searches().await;
    app.store.clear_search_log().await;
    println!("History cleared.");
}

pub async fn recent(app: &App, limit: usize) {
    display::print_cached_companies("Recently viewed", &app.store.recent_companies(limit).await);
}

pub async fn trending(app: &App, limit: usize) {
    display::print_cached_companies("Most searched", &app.store.most_searched(limit).await);
}

pub async fn search(app: &App, query: &str, limit: usize) {
    let hits = app.store.search_local(query, limit).await;
    display::print_cached_companies(&format!("Matches for {query:?}"), &hits);
}

pub fn cnae(app: &App, term: &str, limit: usize) {
    let hits = app.reference.search_cnae(term, limit);
    if hits.is_empty() {
        println!("No CNAE matches {term:?}.");
    }
    for hit in hits {
        println!(
            "  {}  {}",
            cnpjfy_core::reference::format_cnae(&hit.code),
            hit.label()
        );
    }
}

// ── comparison ──

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompareRejection {
    #[error("{0} is already in the comparison set")]
    AlreadyPresent(Cnpj),
    #[error("the comparison set is full ({0} companies); remove one first")]
    Full(usize),
}

/// The comparison set accepts a company only when it is new and there is room.
pub fn check_comparison_room(
    current: &[ComparisonEntry],
    cnpj: &Cnpj,
) -> Result<(), CompareRejection> {
    if current.iter().any(|e| &e.company.cnpj == cnpj) {
        return Err(CompareRejection::AlreadyPresent(cnpj.clone()));
    }
    if current.len() >= COMPARISON_LIMIT {
        return Err(CompareRejection::Full(COMPARISON_LIMIT));
    }
    Ok(())
}

pub async fn compare_add(app: &App, input: &str) -> anyhow::Result<()> {
    let cnpj = parse_cnpj(input)?;
    check_comparison_room(&app.store.comparison().await, &cnpj)?;
    let company = resolve_company(app, &cnpj).await?;
    app.store.add_to_comparison(&company).await;
    println!("Added {} to the comparison set.", company.display_name());
    Ok(())
}

pub async fn compare_remove(app: &App, input: &str) -> anyhow::Result<()> {
    let cnpj = parse_cnpj(input)?;
    app.store.remove_from_comparison(&cnpj).await;
    println!("Removed {cnpj} from the comparison set.");
    Ok(())
}

pub async fn compare_list(app: &App) {
    display::print_comparison(&app.store.comparison().await);
}

pub async fn compare_clear(app: &App) {
    app.store.clear_comparison().await;
    println!("Comparison set cleared.");
}

// ── favorites ──

pub async fn favorite_add(app: &App, input: &str) -> anyhow::Result<()> {
    let cnpj = parse_cnpj(input)?;
    let company = resolve_company(app, &cnpj).await?;
    app.store
        .add_favorite(&company.cnpj, &company.registered_name)
        .await;
    println!("★ {} added to favorites.", company.display_name());
    Ok(())
}

pub async fn favorite_remove(app: &App, input: &str) -> anyhow::Result<()> {
    let cnpj = parse_cnpj(input)?;
    app.store.remove_favorite(&cnpj).await;
    println!("Removed {cnpj} from favorites.");
    Ok(())
}

pub async fn favorite_list(app: &App) {
    display::print_favorites(&app.store.favorites().await);
}

// ── export ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// What to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSource {
    Comparison,
    History,
    Companies(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source: ExportSource,
    pub format: ExportFormat,
    pub locale: Locale,
    pub delimiter: char,
    pub include_metadata: bool,
    pub partners_only: bool,
    /// `-` writes to stdout; `None` picks the default file name.
    pub output: Option<PathBuf>,
}

pub async fn export(app: &App, request: &ExportRequest) -> anyhow::Result<()> {
    let (kind, companies) = match &request.source {
        ExportSource::Comparison => {
            let companies = app
                .store
                .comparison()
                .await
                .into_iter()
                .map(|e| e.company)
                .collect();
            (ExportKind::Comparison, companies)
        }
        ExportSource::History => (ExportKind::History, history_companies(&app.store).await),
        ExportSource::Companies(inputs) => {
            let ids = inputs
                .iter()
                .map(|i| parse_cnpj(i))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let fetched = join_all(ids.iter().map(|id| resolve_company(app, id))).await;
            let companies = fetched.into_iter().collect::<anyhow::Result<Vec<_>>>()?;
            let kind = match ids.as_slice() {
                [single] => ExportKind::Company(single.clone()),
                _ => ExportKind::Comparison,
            };
            (kind, companies)
        }
    };

    if companies.is_empty() {
        bail!("nothing to export");
    }

    let (kind, text) = render_export(kind, &companies, request)?;
    let date = Local::now().date_naive();
    let target = request
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_filename(&kind, date, request.format.extension())));
    write_output(&target, &text)?;
    if target != Path::new("-") {
        println!("Exported {} companies to {}", companies.len(), target.display());
    }
    Ok(())
}

/// Render the export body; the returned kind reflects a partners-only export.
pub fn render_export(
    kind: ExportKind,
    companies: &[Company],
    request: &ExportRequest,
) -> anyhow::Result<(ExportKind, String)> {
    match request.format {
        ExportFormat::Csv => {
            let options = CsvOptions {
                delimiter: request.delimiter,
                include_headers: true,
                locale: request.locale,
            };
            if request.partners_only {
                let [company] = companies else {
                    bail!("--partners needs exactly one company");
                };
                let text = partners_to_csv(&company.partners, &options)?;
                return Ok((ExportKind::Partners(company.registered_name.clone()), text));
            }
            Ok((kind, companies_to_csv(companies, &options)?))
        }
        ExportFormat::Json => {
            let options = JsonOptions {
                include_metadata: request.include_metadata,
                ..JsonOptions::default()
            };
            Ok((kind, companies_to_json(companies, &options)?))
        }
    }
}

/// Cached companies for the recent-search list, in list order.
async fn history_companies(store: &LocalStore) -> Vec<Company> {
    let mut companies = Vec::new();
    for recent in store.recent_searches().await {
        match store.get_company(&recent.cnpj).await {
            Some(cached) => companies.push(cached.company),
            None => warn!(cnpj = %recent.cnpj, "recent search has no cached company; skipped"),
        }
    }
    companies
}

fn write_output(target: &Path, text: &str) -> anyhow::Result<()> {
    if target == Path::new("-") {
        print!("{text}");
        return Ok(());
    }
    std::fs::write(target, text).with_context(|| format!("writing {}", target.display()))
}

// ── backup / maintenance ──

pub async fn backup(store: &LocalStore, path: &Path) -> anyhow::Result<()> {
    let snapshot = store.export_all().await;
    let text = serde_json::to_string_pretty(&snapshot)?;
    write_output(path, &text)?;
    info!(
        path = %path.display(),
        companies = snapshot.companies.len(),
        favorites = snapshot.favorites.len(),
        "backup written"
    );
    Ok(())
}

pub async fn restore(store: &LocalStore, path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a cnpjfy backup", path.display()))?;
    store.import_all(&snapshot).await;
    println!(
        "Restored {} companies, {} favorites, {} recent searches.",
        snapshot.companies.len(),
        snapshot.favorites.len(),
        snapshot.recent_searches.len()
    );
    Ok(())
}

pub async fn cleanup(app: &App, days: u32) {
    let report = app.store.cleanup(days).await;
    println!(
        "Removed {} entries older than {days} days ({} recent searches, {} companies, {} log entries).",
        report.total(),
        report.recent_searches,
        report.companies,
        report.search_log
    );
}

pub async fn info(app: &App) -> anyhow::Result<ExitCode> {
    match app.api.info().await {
        Ok(info) => {
            let show = |label: &str, value: Option<String>| {
                if let Some(value) = value {
                    println!("  {label:<16} {value}");
                }
            };
            println!("OpenCNPJ dataset ({})", app.api.base_url());
            show("companies", info.total.map(|t| t.to_string()));
            show("last updated", info.last_updated);
            show("zip size", info.zip_size.map(|s| format!("{:.1} GiB", s as f64 / 1024f64.powi(3))));
            show("zip url", info.zip_url);
            show("zip md5", info.zip_md5checksum);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", describe_api_error(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cnpjfy_store::Favorite;
    use tempfile::TempDir;

    fn entry(id: &str) -> ComparisonEntry {
        ComparisonEntry {
            company: Company::new(Cnpj::from_digits_padded(id), format!("C{id}")),
            timestamp: Utc::now(),
        }
    }

    fn request(format: ExportFormat) -> ExportRequest {
        ExportRequest {
            source: ExportSource::Comparison,
            format,
            locale: Locale::En,
            delimiter: ',',
            include_metadata: true,
            partners_only: false,
            output: None,
        }
    }

    #[test]
    fn comparison_rejects_duplicates_and_fifth_company() {
        let current: Vec<ComparisonEntry> = ["1", "2", "3"].into_iter().map(entry).collect();
        assert_eq!(check_comparison_room(&current, &Cnpj::from_digits_padded("4")), Ok(()));
        assert_eq!(
            check_comparison_room(&current, &Cnpj::from_digits_padded("2")),
            Err(CompareRejection::AlreadyPresent(Cnpj::from_digits_padded("2")))
        );

        let full: Vec<ComparisonEntry> = ["1", "2", "3", "4"].into_iter().map(entry).collect();
        assert_eq!(
            check_comparison_room(&full, &Cnpj::from_digits_padded("5")),
            Err(CompareRejection::Full(4))
        );
    }

    #[test]
    fn api_errors_read_as_messages() {
        assert_eq!(describe_api_error(&ApiError::NotFound), "CNPJ not found.");
        assert!(describe_api_error(&ApiError::Server {
            status: 502,
            body: String::new()
        })
        .contains("502"));
    }

    #[test]
    fn render_csv_and_json_exports() {
        let companies = vec![entry("11222333000181").company];
        let (kind, csv) =
            render_export(ExportKind::Comparison, &companies, &request(ExportFormat::Csv)).unwrap();
        assert_eq!(kind, ExportKind::Comparison);
        assert!(csv.starts_with("CNPJ,Company Name,"));

        let (_, json) =
            render_export(ExportKind::Comparison, &companies, &request(ExportFormat::Json)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["count"], 1);
    }

    #[test]
    fn partners_export_needs_a_single_company() {
        let companies = vec![entry("1").company, entry("2").company];
        let mut req = request(ExportFormat::Csv);
        req.partners_only = true;
        assert!(render_export(ExportKind::Comparison, &companies, &req).is_err());

        let (kind, _) = render_export(ExportKind::Comparison, &companies[..1], &req).unwrap();
        assert_eq!(kind, ExportKind::Partners("C1".into()));
    }

    #[tokio::test]
    async fn backup_then_restore_into_fresh_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.json");

        let store = LocalStore::in_memory();
        let company = Company::new(Cnpj::parse("11222333000181").unwrap(), "ACME LTDA");
        store.save_company(&company).await;
        store.add_favorite(&company.cnpj, "ACME LTDA").await;
        backup(&store, &path).await.unwrap();

        let fresh = LocalStore::in_memory();
        restore(&fresh, &path).await.unwrap();
        let favorites: Vec<Favorite> = fresh.favorites().await;
        assert_eq!(favorites.len(), 1);
        assert_eq!(fresh.get_company(&company.cnpj).await.unwrap().search_count, 1);
    }

    #[tokio::test]
    async fn restore_rejects_non_backup_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.json");
        std::fs::write(&path, "not a backup").unwrap();
        assert!(restore(&LocalStore::in_memory(), &path).await.is_err());
    }

    #[tokio::test]
    async fn history_export_uses_cached_companies_in_order() {
        let store = LocalStore::in_memory();
        let a = Company::new(Cnpj::from_digits_padded("1"), "A");
        let b = Company::new(Cnpj::from_digits_padded("2"), "B");
        store.save_company(&a).await;
        store.add_recent_search(&a.cnpj, "A").await;
        store.add_recent_search(&b.cnpj, "B").await;
        store.save_company(&b).await;
        store
            .add_recent_search(&Cnpj::from_digits_padded("3"), "NOT CACHED")
            .await;

        let names: Vec<String> = history_companies(&store)
            .await
            .into_iter()
            .map(|c| c.registered_name)
            .collect();
        assert_eq!(names, ["B", "A"]);
    }
}
