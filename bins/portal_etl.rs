//! Reporting-portal ETL CLI
//!
//! Usage:
//!   portal_etl clean "Kay July 2025.xlsx" --master data/master.parquet --mapping style_map.csv
//!   portal_etl merge memo.csv style_map.csv --out memo_ENRICHED.csv
//!   portal_etl dispositions memo.csv --select "rtv melt" --select "RTV - Closeout"
//!   portal_etl fetch memo

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

use portal_etl::config::Config;
use portal_etl::disposition::{
    distinct_dispositions, filter_by_dispositions, normalize, Disposition, DispositionSummary,
};
use portal_etl::extract::{load_raw, DedupPolicy, ExtractCleaner};
use portal_etl::merge::{apply_style_merge, MergeDiagnostics};
use portal_etl::period::{infer_report_month, ReportMonth};
use portal_etl::source::source_from_config;
use portal_etl::storage::{
    default_clean_path, enriched_path, write_clean_csv, write_table_csv, MasterDataset,
};

const DEFAULT_CONFIG: &str = "config/portal.toml";

#[derive(Parser)]
#[command(name = "portal_etl")]
#[command(about = "Clean vendor extracts, enrich with style mappings, summarize dispositions")]
struct Cli {
    /// TOML config; defaults to config/portal.toml when present
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a monthly sales/inventory extract
    Clean {
        input: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Reporting month (YYYY-MM); inferred from the file name otherwise
        #[arg(long)]
        period: Option<String>,
        /// Parquet master dataset to upsert into
        #[arg(long)]
        master: Option<PathBuf>,
        /// Append to the master instead of replacing the period
        #[arg(long)]
        no_replace: bool,
        #[arg(long, value_enum)]
        dedup_policy: Option<DedupPolicyArg>,
        /// Style mapping table; also writes <out>_ENRICHED.csv
        #[arg(long)]
        mapping: Option<PathBuf>,
    },
    /// Fill blank fields of a fact table from a style mapping
    Merge {
        primary: PathBuf,
        mapping: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        mapping_key: Option<String>,
        /// Fields to fill (repeatable)
        #[arg(long)]
        fill: Vec<String>,
    },
    /// Normalized disposition labels and KPIs for a memo table
    Dispositions {
        input: PathBuf,
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        amount_field: Option<String>,
        /// Restrict the summary to these labels (repeatable)
        #[arg(long)]
        select: Vec<String>,
    },
    /// Pull a dataset from the portal API (or its local fallback) into CSV
    Fetch {
        dataset: String,
        /// Defaults to <data_dir>/<dataset>.csv
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DedupPolicyArg {
    WholeTable,
    PerRow,
}

impl From<DedupPolicyArg> for DedupPolicy {
    fn from(arg: DedupPolicyArg) -> Self {
        match arg {
            DedupPolicyArg::WholeTable => DedupPolicy::WholeTable,
            DedupPolicyArg::PerRow => DedupPolicy::PerRow,
        }
    }
}

#[derive(Serialize)]
struct CleanSummary {
    clean_csv: PathBuf,
    report_month: String,
    rows: usize,
    duplicates_removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    master_parquet: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    master_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enriched_csv: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge: Option<MergeDiagnostics>,
}

#[derive(Serialize)]
struct MergeSummary {
    enriched_csv: PathBuf,
    rows: usize,
    #[serde(flatten)]
    diagnostics: MergeDiagnostics,
}

#[derive(Serialize)]
struct DispositionReport {
    field: String,
    dispositions: Vec<Disposition>,
    selected: Vec<Disposition>,
    summary: DispositionSummary,
}

#[derive(Serialize)]
struct FetchSummary {
    dataset: String,
    source: String,
    rows: usize,
    out: PathBuf,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG),
        None => {
            tracing::debug!("No {} found, using built-in defaults", DEFAULT_CONFIG);
            Ok(Config::default())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean {
            input,
            out,
            period,
            master,
            no_replace,
            dedup_policy,
            mapping,
        } => {
            let report_month = match period {
                Some(p) => p.parse::<ReportMonth>()?,
                None => infer_report_month(&input.to_string_lossy()),
            };
            if let Some(policy) = dedup_policy {
                config.clean.dedup_policy = policy.into();
            }

            let raw = load_raw(&input).with_context(|| format!("Failed to load {:?}", input))?;
            let cleaner = ExtractCleaner::new(config.clean.clone());
            let cleaned = cleaner.clean(&raw, report_month)?;
            let deduped = cleaner.dedupe_within_period(&cleaned);
            let duplicates_removed = cleaned.len() - deduped.len();

            // Nothing is written when the mapping is ambiguous
            let enriched = match &mapping {
                Some(mapping) => Some(apply_style_merge(&deduped.to_raw_table(), mapping, &config.merge)?),
                None => None,
            };

            let clean_csv = out.unwrap_or_else(|| default_clean_path(&input, report_month));
            write_clean_csv(&clean_csv, &deduped)?;

            let master_rows = match &master {
                Some(path) => Some(MasterDataset::new(path).upsert(&deduped, report_month, !no_replace)?),
                None => None,
            };

            let (enriched_csv, merge) = match enriched {
                Some((table, diagnostics)) => {
                    let path = enriched_path(&clean_csv);
                    write_table_csv(&path, &table)?;
                    (Some(path), Some(diagnostics))
                }
                None => (None, None),
            };

            print_json(&CleanSummary {
                clean_csv,
                report_month: report_month.to_string(),
                rows: deduped.len(),
                duplicates_removed,
                master_parquet: master,
                master_rows,
                enriched_csv,
                merge,
            })?;
        }
        Commands::Merge {
            primary,
            mapping,
            out,
            key,
            mapping_key,
            fill,
        } => {
            let mut spec = config.merge.clone();
            if let Some(key) = key {
                spec.primary_key = key;
            }
            if let Some(mapping_key) = mapping_key {
                spec.mapping_key = mapping_key;
            }
            if !fill.is_empty() {
                spec.fill_fields = fill;
            }

            let facts = load_raw(&primary).with_context(|| format!("Failed to load {:?}", primary))?;
            let (table, diagnostics) = apply_style_merge(&facts, &mapping, &spec)?;

            let enriched_csv = out.unwrap_or_else(|| enriched_path(&primary));
            write_table_csv(&enriched_csv, &table)?;

            print_json(&MergeSummary {
                enriched_csv,
                rows: table.len(),
                diagnostics,
            })?;
        }
        Commands::Dispositions {
            input,
            field,
            amount_field,
            select,
        } => {
            let field = field.unwrap_or(config.disposition.field);
            let amount_field = amount_field.unwrap_or(config.disposition.amount_field);

            let table = load_raw(&input).with_context(|| format!("Failed to load {:?}", input))?;
            let dispositions = distinct_dispositions(&table, &field)?;
            let selected: Vec<Disposition> = select.iter().map(|s| normalize(Some(s))).collect();
            let filtered = filter_by_dispositions(&table, &field, &selected)?;
            let summary = DispositionSummary::from_table(&filtered, &field, Some(amount_field.as_str()))?;

            print_json(&DispositionReport {
                field,
                dispositions,
                selected,
                summary,
            })?;
        }
        Commands::Fetch { dataset, out } => {
            let source = source_from_config(&config)?;
            let table = source.fetch(&dataset).await?;
            let out = out.unwrap_or_else(|| config.dataset_csv_path(&dataset));
            write_table_csv(&out, &table)?;

            print_json(&FetchSummary {
                dataset,
                source: source.name().to_string(),
                rows: table.len(),
                out,
            })?;
        }
    }

    Ok(())
}
