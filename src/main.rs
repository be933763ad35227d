//! # siteaudit CLI
//!
//! Command-line interface for running LLM-assisted SEO audits:
//!
//! - `audit`: crawl a site (or read an existing crawl export) and produce a
//!   scored site report
//! - `crawl`: run the crawler only and print where the export landed

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use siteaudit::audit::run_audit;
use siteaudit::config::AuditConfig;
use siteaudit::crawl::{CrawlConfig, read_page_rows, run_crawler};
use siteaudit::llm::{OpenAiClient, OpenAiOptions};
use siteaudit::pipeline::{ChunkLimits, DispatchOptions};
use tokio::sync::mpsc;
use tracing::instrument;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "LLM-assisted SEO audits over crawled sites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a site and produce a scored SEO report
    Audit(AuditArgs),

    /// Run the crawler only and print the export path
    Crawl(CrawlArgs),
}

#[derive(Args, Debug)]
struct AuditArgs {
    /// URL of the site to audit
    #[arg(required = true)]
    url: String,

    /// Read pages from an existing crawl export instead of crawling
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Model used for analysis
    #[arg(short, long, default_value = "gpt-4o-mini")]
    model: String,

    /// Directory reports are written to
    #[arg(short, long, default_value = "reports")]
    output: PathBuf,

    /// Batches analyzed concurrently
    #[arg(short, long, default_value = "3")]
    concurrency: usize,

    /// Records per batch when fixed-size chunking applies
    #[arg(short, long, default_value = "8")]
    batch_size: usize,

    /// Overall analysis deadline in seconds; 0 disables the deadline
    #[arg(long, default_value = "1800")]
    timeout: u64,

    /// Crawler binary to invoke
    #[arg(long, default_value = "screamingfrogseospider")]
    crawler: PathBuf,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to crawl
    #[arg(required = true)]
    url: String,

    /// Directory the crawler writes its export into
    #[arg(short, long, default_value = "crawl-output")]
    output: PathBuf,

    /// Crawler binary to invoke
    #[arg(long, default_value = "screamingfrogseospider")]
    crawler: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Audit(args) => audit_command(args).await?,
        Commands::Crawl(args) => crawl_command(args).await?,
    }

    Ok(())
}

#[instrument(skip(args), fields(url = args.url))]
async fn audit_command(args: AuditArgs) -> anyhow::Result<()> {
    let api_key =
        std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY environment variable must be set")?;

    let config = AuditConfig::builder(api_key)
        .model(&args.model)
        .chunk_limits(ChunkLimits::builder().batch_size(args.batch_size).build())
        .dispatch(
            DispatchOptions::builder()
                .concurrency_limit(args.concurrency)
                .build(),
        )
        .run_timeout((args.timeout > 0).then(|| Duration::from_secs(args.timeout)))
        .output_dir(&args.output)
        .crawl(CrawlConfig::builder().binary_path(&args.crawler).build())
        .build();
    config.validate()?;

    let export = match &args.csv {
        Some(path) => path.clone(),
        None => {
            println!("Crawling {}...", args.url);
            run_crawler(&args.url, &config.crawl).await?
        }
    };

    let records = read_page_rows(&export)?;
    println!("Read {} pages from {}", records.len(), export.display());

    let analyzer = OpenAiClient::new(OpenAiOptions::new(
        config.openai_api_key.clone(),
        config.model.clone(),
    ));

    // Drive a progress bar from per-batch updates; the first update carries
    // the total batch count
    let (progress_sender, mut progress_receiver) =
        mpsc::channel::<siteaudit::pipeline::ProgressUpdate>(100);
    let progress_handle = tokio::spawn(async move {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("valid progress template")
                .progress_chars("##-"),
        );
        let mut started = false;
        while let Some(update) = progress_receiver.recv().await {
            if !started {
                bar.set_length(update.total_batches as u64);
                bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                started = true;
            }
            bar.inc(1);
            bar.set_message(if update.degraded {
                format!("batch {} degraded", update.batch_index)
            } else {
                format!("batch {} analyzed", update.batch_index)
            });
        }
        bar.finish_with_message("analysis complete");
    });

    let summary = run_audit(&config, &args.url, records, &analyzer, Some(progress_sender)).await?;
    let _ = progress_handle.await;

    let report = &summary.report;
    println!();
    println!("Pages audited:   {}", report.page_count);
    println!("Average score:   {:.1}", report.average_score);
    println!(
        "Priorities:      {} high / {} medium / {} low",
        report.priority_counts.high, report.priority_counts.medium, report.priority_counts.low
    );
    if summary.degraded_batches > 0 {
        println!(
            "Degraded:        {} batches used fallback scoring",
            summary.degraded_batches
        );
    }
    if !report.common_issues.is_empty() {
        println!("Top issues:");
        for issue in report.common_issues.iter().take(5) {
            println!("  {} ({} pages)", issue.issue, issue.count);
        }
    }
    println!();
    println!("{}", report.narrative);
    if let Some(path) = &summary.report_path {
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}

#[instrument(skip(args), fields(url = args.url))]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let config = CrawlConfig::builder()
        .binary_path(&args.crawler)
        .output_dir(&args.output)
        .build();

    println!("Crawling {}...", args.url);
    let export = run_crawler(&args.url, &config).await?;

    let records = read_page_rows(&export)?;
    println!(
        "Crawl complete: {} pages exported to {}",
        records.len(),
        export.display()
    );

    Ok(())
}
