//! Crawl export reading
//!
//! Reads the crawler's per-page CSV export into [`PageRecord`]s. Malformed
//! rows are skipped with a warning rather than failing the run; a run only
//! fails here when no usable rows remain at all.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use tracing::{info, instrument, warn};
use url::Url;

use crate::crawl::error::CrawlError;
use crate::crawl::{Indexability, PageRecord};

/// Named columns of the crawl export. `Address` is the only required one.
const COL_ADDRESS: &str = "Address";
const COL_TITLE: &str = "Title 1";
const COL_META_DESCRIPTION: &str = "Meta Description 1";
const COL_WORD_COUNT: &str = "Word Count";
const COL_H1: &str = "H1-1";
const COL_STATUS_CODE: &str = "Status Code";
const COL_INDEXABILITY: &str = "Indexability";
const COL_CANONICAL: &str = "Canonical Link Element 1";
const COL_INLINKS: &str = "Inlinks";
const COL_OUTLINKS: &str = "Outlinks";
const COL_LAST_MODIFIED: &str = "Last Modified";

/// Read the crawl export into page records.
#[instrument]
pub fn read_page_rows(path: &Path) -> Result<Vec<PageRecord>, CrawlError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in reader.records().enumerate() {
        match row {
            Ok(row) => match columns.parse_row(&row) {
                Some(record) => records.push(record),
                None => {
                    warn!("skipping row {}: missing or invalid URL", line + 2);
                    skipped += 1;
                }
            },
            Err(err) => {
                warn!("skipping row {}: {}", line + 2, err);
                skipped += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(CrawlError::NoUsableRows { skipped });
    }

    info!(
        "loaded {} page records from {} ({} rows skipped)",
        records.len(),
        path.display(),
        skipped
    );
    Ok(records)
}

/// Header-name to column-index mapping for one export file
struct ColumnMap {
    address: usize,
    title: Option<usize>,
    meta_description: Option<usize>,
    word_count: Option<usize>,
    h1: Option<usize>,
    status_code: Option<usize>,
    indexability: Option<usize>,
    canonical: Option<usize>,
    inlinks: Option<usize>,
    outlinks: Option<usize>,
    last_modified: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, CrawlError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        Ok(Self {
            address: find(COL_ADDRESS).ok_or(CrawlError::MissingColumn(COL_ADDRESS))?,
            title: find(COL_TITLE),
            meta_description: find(COL_META_DESCRIPTION),
            word_count: find(COL_WORD_COUNT),
            h1: find(COL_H1),
            status_code: find(COL_STATUS_CODE),
            indexability: find(COL_INDEXABILITY),
            canonical: find(COL_CANONICAL),
            inlinks: find(COL_INLINKS),
            outlinks: find(COL_OUTLINKS),
            last_modified: find(COL_LAST_MODIFIED),
        })
    }

    fn parse_row(&self, row: &StringRecord) -> Option<PageRecord> {
        let url = row.get(self.address)?.trim();
        if url.is_empty() || Url::parse(url).is_err() {
            return None;
        }

        let text = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let number = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };

        Some(PageRecord {
            url: url.to_string(),
            title: text(self.title),
            meta_description: text(self.meta_description),
            word_count: number(self.word_count),
            h1: text(self.h1),
            status_code: self
                .status_code
                .and_then(|i| row.get(i))
                .and_then(|v| v.trim().parse::<u16>().ok()),
            indexability: self
                .indexability
                .and_then(|i| row.get(i))
                .map(Indexability::parse)
                .unwrap_or_default(),
            canonical_url: text(self.canonical),
            inlinks: number(self.inlinks),
            outlinks: number(self.outlinks),
            last_modified: text(self.last_modified).and_then(|v| parse_timestamp(&v)),
        })
    }
}

/// Parse the export's Last Modified value, which varies by server
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
