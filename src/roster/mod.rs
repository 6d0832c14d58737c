//! Roster loader: fetches legislator rows and derives filter options.

pub mod model;
pub mod sheets;

pub use model::{LegislatorRecord, jurisdiction_code};
pub use sheets::{RosterSource, SheetsConfig, SheetsRosterSource};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::FetchError;

/// One loaded roster. Replaced wholesale on reload, never edited in place.
#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    pub records: Vec<LegislatorRecord>,
    pub loaded_at: DateTime<Utc>,
}

impl Roster {
    pub fn new(records: Vec<LegislatorRecord>) -> Self {
        Self {
            records,
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LegislatorRecord> {
        self.records.get(index)
    }

    pub fn jurisdictions(&self) -> Vec<String> {
        extract_jurisdictions(&self.records)
    }
}

/// Load the roster from `source` in a single attempt.
///
/// The first row is the header and is dropped. An empty sheet is an empty
/// roster, not an error.
pub async fn load_roster(source: &dyn RosterSource) -> Result<Roster, FetchError> {
    let rows = source.fetch_rows().await?;
    let records: Vec<LegislatorRecord> = rows
        .iter()
        .skip(1)
        .map(|row| LegislatorRecord::from_row(row))
        .collect();

    info!(count = records.len(), "Roster loaded");
    Ok(Roster::new(records))
}

/// Sorted, de-duplicated jurisdiction codes present in `records`.
pub fn extract_jurisdictions(records: &[LegislatorRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(LegislatorRecord::jurisdiction)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Number of records per jurisdiction code.
pub fn jurisdiction_counts(records: &[LegislatorRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for code in records.iter().filter_map(LegislatorRecord::jurisdiction) {
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
}

/// Records matching an optional jurisdiction and a name query, with their
/// roster index.
///
/// An empty jurisdiction or query does not filter.
pub fn filter_records<'a>(
    records: &'a [LegislatorRecord],
    jurisdiction: Option<&str>,
    query: &str,
) -> Vec<(usize, &'a LegislatorRecord)> {
    let jurisdiction = jurisdiction
        .map(str::trim)
        .filter(|j| !j.is_empty())
        .map(str::to_ascii_uppercase);
    let query = query.trim().to_lowercase();

    records
        .iter()
        .enumerate()
        .filter(|(_, r)| match &jurisdiction {
            Some(code) => r.jurisdiction().as_deref() == Some(code.as_str()),
            None => true,
        })
        .filter(|(_, r)| query.is_empty() || r.name.to_lowercase().contains(&query))
        .collect()
}
