//! `perspective status`: which configs drifted from their last export.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use perspective_core::state;
use perspective_sync::{
    staleness::{check_at, format_datetime_age},
    StalenessSignal,
};

/// Arguments for `perspective status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let keys = state::list_config_keys_at(root)
            .with_context(|| format!("failed to list configs in {}", root.display()))?;

        let mut rows = Vec::new();
        for key in keys {
            let signal = check_at(root, &key)
                .with_context(|| format!("status check failed for '{key}'"))?;
            rows.push(ConfigStatus { key, signal });
        }

        if self.json {
            print_json(&rows)?;
        } else {
            print_table(rows);
        }
        Ok(())
    }
}

struct ConfigStatus {
    key: String,
    signal: StalenessSignal,
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    configs: Vec<ConfigStatusJson>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    configs: usize,
    modified: usize,
    never_synced: usize,
}

#[derive(Serialize)]
struct ConfigStatusJson {
    key: String,
    status: String,
    changes: Vec<String>,
    last_sync_at: Option<String>,
    last_sync_age: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "config")]
    key: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

fn print_json(rows: &[ConfigStatus]) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            configs: rows.len(),
            modified: count(rows, |s| matches!(s, StalenessSignal::Modified { .. })),
            never_synced: count(rows, |s| matches!(s, StalenessSignal::NeverSynced)),
        },
        configs: rows
            .iter()
            .map(|row| ConfigStatusJson {
                key: row.key.clone(),
                status: signal_key(&row.signal).to_string(),
                changes: match &row.signal {
                    StalenessSignal::Modified { changes, .. } => changes.clone(),
                    _ => Vec::new(),
                },
                last_sync_at: synced_at(&row.signal).map(|t| t.to_rfc3339()),
                last_sync_age: last_sync_age(&row.signal),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: Vec<ConfigStatus>) {
    let modified = count(&rows, |s| matches!(s, StalenessSignal::Modified { .. }));
    println!(
        "Perspective v{} | {} configs | {} modified",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        modified,
    );

    if rows.is_empty() {
        println!("No configs found. Run `perspective import` first.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .iter()
        .map(|row| StatusTableRow {
            key: row.key.clone(),
            status: format!("{} {}", signal_indicator(&row.signal), signal_label(&row.signal)),
            detail: signal_detail(&row.signal),
            last_sync: last_sync_age(&row.signal),
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if rows
        .iter()
        .any(|r| !matches!(r.signal, StalenessSignal::Current { .. }))
    {
        println!("Run 'perspective export <config>' to push local changes.");
    }
}

fn count(rows: &[ConfigStatus], pred: impl Fn(&StalenessSignal) -> bool) -> usize {
    rows.iter().filter(|r| pred(&r.signal)).count()
}

fn synced_at(signal: &StalenessSignal) -> Option<chrono::DateTime<chrono::Utc>> {
    match signal {
        StalenessSignal::NeverSynced => None,
        StalenessSignal::Current { synced_at } | StalenessSignal::Modified { synced_at, .. } => {
            Some(*synced_at)
        }
    }
}

fn last_sync_age(signal: &StalenessSignal) -> String {
    synced_at(signal).map_or_else(|| "never".to_string(), format_datetime_age)
}

fn signal_key(signal: &StalenessSignal) -> &'static str {
    match signal {
        StalenessSignal::NeverSynced => "never_synced",
        StalenessSignal::Current { .. } => "current",
        StalenessSignal::Modified { .. } => "modified",
    }
}

fn signal_label(signal: &StalenessSignal) -> &'static str {
    match signal {
        StalenessSignal::NeverSynced => "NEVER SYNCED",
        StalenessSignal::Current { .. } => "CURRENT",
        StalenessSignal::Modified { .. } => "MODIFIED",
    }
}

fn signal_indicator(signal: &StalenessSignal) -> String {
    match signal {
        StalenessSignal::NeverSynced => "■".bright_black().bold().to_string(),
        StalenessSignal::Current { .. } => "■".green().bold().to_string(),
        StalenessSignal::Modified { .. } => "■".red().bold().to_string(),
    }
}

fn signal_detail(signal: &StalenessSignal) -> String {
    match signal {
        StalenessSignal::NeverSynced => "no snapshot".to_string(),
        StalenessSignal::Current { .. } => "up to date".to_string(),
        StalenessSignal::Modified { changes, .. } => summarize(changes),
    }
}

fn summarize(changes: &[String]) -> String {
    let mut shown: Vec<String> = changes.iter().take(2).cloned().collect();
    if changes.len() > shown.len() {
        shown.push(format!("+{} more", changes.len() - shown.len()));
    }
    shown.join(", ")
}
