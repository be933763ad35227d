//! Crawl input module
//!
//! This module provides the page-level input data for an audit run: invoking
//! the external crawler CLI and reading its tabular export into typed records.

mod config;
mod csv_export;
mod error;
mod frog;

pub use config::CrawlConfig;
pub use csv_export::read_page_rows;
pub use error::CrawlError;
pub use frog::run_crawler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of crawl output for a single page.
///
/// Records are immutable once read from the crawl export and are owned by the
/// pipeline for the duration of one audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// URL of the page
    pub url: String,

    /// Title tag content, if present
    pub title: Option<String>,

    /// Meta description content, if present
    pub meta_description: Option<String>,

    /// Word count of the rendered page body
    pub word_count: u32,

    /// First H1 heading, if present
    pub h1: Option<String>,

    /// HTTP status code returned for the page
    pub status_code: Option<u16>,

    /// Whether the crawler considered the page indexable
    pub indexability: Indexability,

    /// Canonical URL declared by the page, if any
    pub canonical_url: Option<String>,

    /// Number of internal links pointing at the page
    pub inlinks: u32,

    /// Number of links from the page to other internal pages
    pub outlinks: u32,

    /// Last-Modified timestamp reported for the page, if any
    pub last_modified: Option<DateTime<Utc>>,
}

impl PageRecord {
    /// Render the record as the labeled text block sent to the analysis model.
    ///
    /// The same rendering feeds token estimation during chunking, so batch
    /// sizing tracks what is actually transmitted.
    pub fn render_for_analysis(&self) -> String {
        let missing = "(none)";
        format!(
            "URL: {}\nTitle: {}\nMeta Description: {}\nH1: {}\nWord Count: {}\nStatus Code: {}\nIndexability: {}\nCanonical URL: {}\nInlinks: {}\nOutlinks: {}",
            self.url,
            self.title.as_deref().unwrap_or(missing),
            self.meta_description.as_deref().unwrap_or(missing),
            self.h1.as_deref().unwrap_or(missing),
            self.word_count,
            self.status_code
                .map(|s| s.to_string())
                .unwrap_or_else(|| missing.to_string()),
            self.indexability,
            self.canonical_url.as_deref().unwrap_or(missing),
            self.inlinks,
            self.outlinks,
        )
    }
}

/// Indexability of a page as reported by the crawler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Indexability {
    /// The page can be indexed by search engines
    Indexable,

    /// The page is blocked from indexing (noindex, canonicalized away, etc.)
    NonIndexable,

    /// The crawler did not report an indexability verdict
    #[default]
    Unknown,
}

impl Indexability {
    /// Parse the crawler's indexability column value
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("indexable") {
            Indexability::Indexable
        } else if value.eq_ignore_ascii_case("non-indexable")
            || value.eq_ignore_ascii_case("non indexable")
        {
            Indexability::NonIndexable
        } else {
            Indexability::Unknown
        }
    }
}

impl std::fmt::Display for Indexability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Indexability::Indexable => write!(f, "Indexable"),
            Indexability::NonIndexable => write!(f, "Non-Indexable"),
            Indexability::Unknown => write!(f, "Unknown"),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_record(url: &str) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        title: Some("Test Page".to_string()),
        meta_description: Some("Test description".to_string()),
        word_count: 400,
        h1: Some("Test Heading".to_string()),
        status_code: Some(200),
        indexability: Indexability::Indexable,
        canonical_url: None,
        inlinks: 3,
        outlinks: 5,
        last_modified: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexability_parse() {
        assert_eq!(Indexability::parse("Indexable"), Indexability::Indexable);
        assert_eq!(
            Indexability::parse("Non-Indexable"),
            Indexability::NonIndexable
        );
        assert_eq!(
            Indexability::parse("non-indexable"),
            Indexability::NonIndexable
        );
        assert_eq!(Indexability::parse(""), Indexability::Unknown);
        assert_eq!(Indexability::parse("banana"), Indexability::Unknown);
    }

    #[test]
    fn test_render_for_analysis_includes_fields() {
        let record = test_record("https://example.com/pricing");
        let rendered = record.render_for_analysis();

        assert!(rendered.starts_with("URL: https://example.com/pricing"));
        assert!(rendered.contains("Title: Test Page"));
        assert!(rendered.contains("Word Count: 400"));
        assert!(rendered.contains("Status Code: 200"));
        assert!(rendered.contains("Indexability: Indexable"));
    }

    #[test]
    fn test_render_for_analysis_marks_missing_fields() {
        let mut record = test_record("https://example.com/");
        record.title = None;
        record.status_code = None;

        let rendered = record.render_for_analysis();
        assert!(rendered.contains("Title: (none)"));
        assert!(rendered.contains("Status Code: (none)"));
    }
}
