use super::Host;
use super::common::{CommonArgs, TokenArgs};
use crate::Result;
use crate::github::{RepoRef, fetch_created_at};
use crate::ledger::NOT_AVAILABLE;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use clap::Parser;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

const LOG_TARGET: &str = "       age";

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Parser, Debug)]
pub struct AgeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub tokens: TokenArgs,

    /// Ledger to enrich (default is the mutation ledger)
    #[arg(long, value_name = "PATH")]
    pub ledger: Option<Utf8PathBuf>,

    /// Where to write the result (default from the configuration)
    #[arg(long, value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,
}

/// The ledger columns the age report needs; everything else is ignored.
#[derive(Debug, Deserialize)]
struct LedgerEntry {
    #[serde(rename = "Name", alias = "Nome")]
    name: String,

    #[serde(rename = "Owner", alias = "Proprietário")]
    owner: String,

    #[serde(rename = "Architecture", alias = "Arquitetura", default)]
    architecture: String,

    #[serde(rename = "Mutation Score", default)]
    mutation_score: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct AgeRow {
    #[serde(rename = "Name")]
    name: String,

    #[serde(rename = "Architecture")]
    architecture: String,

    #[serde(rename = "Mutation Score")]
    mutation_score: String,

    #[serde(rename = "Age (years)")]
    age_years: f64,
}

/// Look up the creation date of every repository in a ledger and write its age.
pub async fn report_age<H: Host>(host: &mut H, args: &AgeArgs) -> Result<()> {
    let config = args.common.setup()?;
    let client = args.tokens.client(&config)?;

    let ledger_path = args
        .ledger
        .as_ref()
        .map_or_else(|| config.paths.mutation_ledger.clone(), |p| p.as_std_path().to_path_buf());
    let output_path = args
        .output
        .as_ref()
        .map_or_else(|| config.paths.age_output.clone(), |p| p.as_std_path().to_path_buf());

    let entries = read_entries(&ledger_path)?;
    let now = Utc::now();
    let mut rows = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for entry in entries {
        let repo = RepoRef::new(&entry.owner, &entry.name);
        match fetch_created_at(&client, &repo).await {
            Ok(created_at) => rows.push(AgeRow {
                name: entry.name,
                architecture: or_not_available(&entry.architecture.to_uppercase()),
                mutation_score: or_not_available(&entry.mutation_score),
                age_years: age_in_years(created_at, now),
            }),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Skipping '{repo}': {e:#}");
                skipped += 1;
            }
        }
    }

    write_rows(&output_path, &rows)?;
    let _ = writeln!(
        host.output(),
        "Wrote the age of {} repositories to '{}' ({skipped} skipped)",
        rows.len(),
        output_path.display()
    );

    Ok(())
}

fn read_entries(path: &Path) -> Result<Vec<LedgerEntry>> {
    let mut reader = csv::Reader::from_path(path).into_app_err_with(|| format!("opening ledger '{}'", path.display()))?;

    reader
        .deserialize::<LedgerEntry>()
        .enumerate()
        .map(|(i, row)| row.into_app_err_with(|| format!("parsing row {} of '{}'", i + 2, path.display())))
        .collect()
}

fn write_rows(path: &Path, rows: &[AgeRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path).into_app_err_with(|| format!("creating '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row).into_app_err("writing age row")?;
    }
    writer.flush().into_app_err_with(|| format!("writing '{}'", path.display()))?;
    Ok(())
}

fn or_not_available(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() { NOT_AVAILABLE.to_string() } else { value.to_string() }
}

/// Whole days between `created_at` and `now` in years, rounded to two decimals.
#[expect(clippy::cast_precision_loss, reason = "repository ages in days are far below 2^52")]
fn age_in_years(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created_at).num_days() as f64;
    (days / DAYS_PER_YEAR * 100.0).round() / 100.0
}
