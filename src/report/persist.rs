//! Report persistence
//!
//! Writes the finished report to disk as pretty-printed JSON. Filenames are
//! date-stamped and derived from the audited site's host, so repeated runs on
//! the same day overwrite each other and runs on different days accumulate.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, instrument};
use url::Url;

use crate::report::{ReportError, SiteReport};

/// Write `report` under `dir` as `{slug}-audit-{YYYY-MM-DD}.json`, creating
/// the directory if needed. Returns the path written.
#[instrument(skip(report), fields(pages = report.page_count))]
pub async fn persist_report(
    dir: &Path,
    slug: &str,
    report: &SiteReport,
) -> Result<PathBuf, ReportError> {
    tokio::fs::create_dir_all(dir).await?;

    let filename = format!("{}-audit-{}.json", slug, Utc::now().format("%Y-%m-%d"));
    let path = dir.join(filename);

    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(&path, json).await?;

    info!("wrote report to {}", path.display());
    Ok(path)
}

/// Filename-safe slug for a site URL: the host with dots replaced by dashes.
/// Falls back to `"site"` when the URL has no usable host.
pub fn site_slug(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.replace('.', "-")))
        .unwrap_or_else(|| "site".to_string())
}
