//! Legislator record model and row mapping.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Leading two-letter jurisdiction prefix, e.g. "CA" in "CA-12" or "ca12".
static JURISDICTION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{2})").expect("static regex"));

/// Cell value that marks a signing flag as set.
const AFFIRMATIVE_MARKER: &str = "y";

/// Values of the counterpart field that mean "nobody signed".
const COUNTERPART_SENTINELS: [&str; 3] = ["none", "no", "na"];

/// Fixed column positions in the roster sheet. Column 9 is unused.
mod column {
    pub const NAME: usize = 0;
    pub const DISTRICT: usize = 1;
    pub const SIGNED_CURRENT: usize = 2;
    pub const SIGNED_C: usize = 3;
    pub const SIGNED_B: usize = 4;
    pub const SIGNED_A: usize = 5;
    pub const CONTACTS: usize = 6;
    pub const DIRECTOR: usize = 7;
    pub const PHONE: usize = 8;
    pub const COUNTERPART_SIGNERS: usize = 10;
}

/// One legislator row from the roster. Never mutated after load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegislatorRecord {
    /// Display name.
    pub name: String,
    /// Jurisdiction prefix plus district, e.g. "CA-12".
    pub jurisdiction_district: String,
    /// Signed the current letter.
    #[serde(default)]
    pub signed_current: bool,
    /// Signed the 115th Congress letter (oldest).
    #[serde(default)]
    pub signed_a: bool,
    /// Signed the 117th Congress letter.
    #[serde(default)]
    pub signed_b: bool,
    /// Signed the 118th Congress letter (newest).
    #[serde(default)]
    pub signed_c: bool,
    /// Newline-separated staff email addresses.
    #[serde(default)]
    pub legislative_contacts: String,
    #[serde(default)]
    pub legislative_director: String,
    #[serde(default)]
    pub office_phone: String,
    /// Senate counterparts who signed the Senate version, free text.
    #[serde(default)]
    pub chamber_counterpart_signers: String,
}

impl LegislatorRecord {
    /// Map a raw sheet row by fixed column position.
    ///
    /// Missing trailing cells fall back to empty strings and `false`.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
        let flag = |idx: usize| {
            row.get(idx)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(AFFIRMATIVE_MARKER))
        };

        Self {
            name: cell(column::NAME),
            jurisdiction_district: cell(column::DISTRICT),
            signed_current: flag(column::SIGNED_CURRENT),
            signed_a: flag(column::SIGNED_A),
            signed_b: flag(column::SIGNED_B),
            signed_c: flag(column::SIGNED_C),
            legislative_contacts: cell(column::CONTACTS),
            legislative_director: cell(column::DIRECTOR),
            office_phone: cell(column::PHONE),
            chamber_counterpart_signers: cell(column::COUNTERPART_SIGNERS),
        }
    }

    /// Upper-cased two-letter jurisdiction code, if the district has one.
    pub fn jurisdiction(&self) -> Option<String> {
        jurisdiction_code(&self.jurisdiction_district)
    }

    /// Contact addresses, one per non-empty line.
    pub fn contact_addresses(&self) -> Vec<&str> {
        self.legislative_contacts
            .split('\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Surname of the first counterpart signer, or `None` when the field is
    /// empty or holds a sentinel such as "None".
    pub fn counterpart_surname(&self) -> Option<String> {
        let raw = self.chamber_counterpart_signers.trim();
        if raw.is_empty()
            || COUNTERPART_SENTINELS
                .iter()
                .any(|s| raw.eq_ignore_ascii_case(s))
        {
            return None;
        }

        let first = raw.split(',').next().unwrap_or_default();
        first
            .split_whitespace()
            .last()
            .map(str::to_string)
    }
}

/// Extract the jurisdiction code from a composite district string.
pub fn jurisdiction_code(district: &str) -> Option<String> {
    JURISDICTION_PREFIX
        .captures(district)
        .map(|c| c[1].to_ascii_uppercase())
}
