//! `watchtower --report <file>`: Markdown report from the durable store.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};
use watchtower_config::{AppConfig, CliOverrides};
use watchtower_core::memory::{FindingStore, StoredFinding};
use watchtower_core::state::Severity;
use watchtower_memory::SqliteStore;

pub async fn run(path: &Path, overrides: CliOverrides) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    config.apply_cli_overrides(overrides);

    let store = SqliteStore::new(&config.database_path).await?;
    let written = write_report(&store, path).await;
    store.close().await;

    if let Some(out) = written? {
        println!("  Report written to {}", out.display());
    }
    Ok(())
}

/// Write the report for every stored finding.
///
/// Returns the path actually written (always `.md`), or `None` when the store
/// holds no findings.
pub async fn write_report(
    store: &dyn FindingStore,
    path: &Path,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let findings = store.all_findings().await?;
    if findings.is_empty() {
        warn!("No findings in the database, nothing to report");
        eprintln!("  ERROR: no findings found in the database. Run an assessment first.");
        return Ok(None);
    }

    let out = markdown_path(path);
    std::fs::write(&out, render(&findings))?;
    info!(path = %out.display(), findings = findings.len(), "Report written");
    Ok(Some(out))
}

/// `path` if it already ends in `.md`, otherwise `path` with `.md` appended.
fn markdown_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "md") {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".md");
    PathBuf::from(name)
}

fn severity_of(finding: &StoredFinding) -> Severity {
    Severity::parse_lenient(finding.detail("severity").unwrap_or_default())
}

fn render(findings: &[StoredFinding]) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Penetration Test Report\n");
    let _ = writeln!(md, "_Generated {}_\n", Utc::now().format("%Y-%m-%d %H:%M UTC"));

    let _ = writeln!(md, "## Executive Summary\n");
    let _ = writeln!(
        md,
        "The automated assessment recorded **{}** finding(s).\n",
        findings.len()
    );
    let _ = writeln!(md, "| Severity | Count |\n|---|---|");
    for severity in Severity::ALL {
        let count = findings.iter().filter(|f| severity_of(f) == severity).count();
        let _ = writeln!(md, "| {severity} | {count} |");
    }

    let _ = writeln!(md, "\n## Findings");
    for (i, finding) in findings.iter().enumerate() {
        let _ = writeln!(md, "\n### {}. {}\n", i + 1, finding.vulnerability);
        let _ = writeln!(md, "- **Severity:** {}", severity_of(finding));
        let _ = writeln!(md, "- **Target:** {}", finding.target);

        if let Some(description) = finding.detail("description").filter(|d| !d.trim().is_empty()) {
            let _ = writeln!(md, "\n{}", description.trim());
        }
        if let Some(evidence) = finding.detail("evidence").map(strip_fences).filter(|e| !e.is_empty()) {
            let _ = writeln!(md, "\n**Evidence**\n\n```\n{evidence}\n```");
        }
    }
    md
}

/// Drop Markdown code fences so evidence can be re-fenced.
fn strip_fences(evidence: &str) -> String {
    evidence
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
