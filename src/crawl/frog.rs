//! Crawler CLI invocation
//!
//! Thin shell-out to the Screaming Frog command line. The crawl itself is an
//! external concern; this module only launches it, waits for completion, and
//! locates the tabular export it produced.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::crawl::CrawlConfig;
use crate::crawl::error::CrawlError;
use crate::retry::retry_with_policy;

/// Export filename produced for the Internal:HTML tab
const INTERNAL_HTML_EXPORT: &str = "internal_html.csv";

/// Crawl a site and return the path of the per-page CSV export.
///
/// The invocation is wrapped with the shared retry policy; a crawler that
/// exits non-zero or produces no export is retried like any other transient
/// external failure.
#[instrument(skip(config))]
pub async fn run_crawler(url: &str, config: &CrawlConfig) -> Result<PathBuf, CrawlError> {
    retry_with_policy(&config.retry, || invoke_crawler(url, config)).await
}

async fn invoke_crawler(url: &str, config: &CrawlConfig) -> Result<PathBuf, CrawlError> {
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let mut command = Command::new(&config.binary_path);
    command
        .arg("--crawl")
        .arg(url)
        .arg("--overwrite")
        .arg("--output-folder")
        .arg(&config.output_dir)
        .arg("--export-tabs")
        .arg(&config.export_tabs);
    if config.headless {
        command.arg("--headless");
    }

    debug!("launching crawler: {:?}", command.as_std());
    let output = command.output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(CrawlError::CrawlerExit {
            code: output.status.code(),
            stderr: tail,
        });
    }

    let export = config.output_dir.join(INTERNAL_HTML_EXPORT);
    if !export.exists() {
        return Err(CrawlError::ExportMissing(export));
    }

    info!("crawl of {} complete, export at {}", url, export.display());
    Ok(export)
}
