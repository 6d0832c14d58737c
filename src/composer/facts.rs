//! Rewrite payload helpers: the facts sent to the rewriting service and the
//! split/reassembly of the email around the reference letter.

use serde::{Deserialize, Serialize};

use super::{REFERENCE_LETTER, SEPARATOR};
use crate::roster::LegislatorRecord;

/// Reduced view of a record shared with the rewriting service.
///
/// Carries the counterpart surname only, never the raw free-text field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteFacts {
    pub district: String,
    pub signed_current: bool,
    pub signed_a: bool,
    pub signed_b: bool,
    pub signed_c: bool,
    /// Empty when no counterpart signed.
    pub counterpart_surname: String,
}

impl From<&LegislatorRecord> for RewriteFacts {
    fn from(record: &LegislatorRecord) -> Self {
        Self {
            district: record.jurisdiction_district.clone(),
            signed_current: record.signed_current,
            signed_a: record.signed_a,
            signed_b: record.signed_b,
            signed_c: record.signed_c,
            counterpart_surname: record.counterpart_surname().unwrap_or_default(),
        }
    }
}

/// The part of `email` before the reference letter and its separator, or
/// `None` when the letter is not present verbatim.
pub fn split_reference(email: &str) -> Option<&str> {
    let pos = email.find(REFERENCE_LETTER)?;
    let head = email[..pos].trim_end();
    Some(
        head.strip_suffix(SEPARATOR.trim())
            .map(str::trim_end)
            .unwrap_or(head),
    )
}

/// Like `split_reference`, but the whole text when the letter is absent.
pub fn main_body(email: &str) -> &str {
    split_reference(email).unwrap_or(email)
}

/// Append the separator and the untouched reference letter to rewritten text.
pub fn reattach_reference(rewritten: &str) -> String {
    format!("{}{SEPARATOR}{REFERENCE_LETTER}", rewritten.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::compose_email;

    #[test]
    fn main_body_strips_separator_and_letter() {
        let record = LegislatorRecord {
            name: "Jane Roe".into(),
            ..Default::default()
        };
        let email = compose_email(&record, "Acme");
        let body = main_body(&email);
        assert!(body.starts_with("Hi Jane Roe,"));
        assert!(body.ends_with("Best,\nAcme"));
        assert!(!body.contains("Letter Text"));
    }

    #[test]
    fn main_body_without_letter_is_whole_text() {
        assert_eq!(main_body("just a note"), "just a note");
        assert_eq!(split_reference("just a note"), None);
    }

    #[test]
    fn cleaned_email_does_not_split() {
        let record = LegislatorRecord {
            name: "Jane Roe".into(),
            ..Default::default()
        };
        let email = compose_email(&record, "Acme");
        assert!(split_reference(&email).is_some());

        let cleaned = crate::mail::clean_text(&email);
        assert_eq!(split_reference(&cleaned), None);
        assert_eq!(main_body(&cleaned), cleaned);
    }

    #[test]
    fn reattach_round_trips_with_main_body() {
        let text = reattach_reference("Hello there,\n\nThanks!\n");
        assert!(text.starts_with("Hello there,\n\nThanks!\n\n--\n\n"));
        assert!(text.ends_with(REFERENCE_LETTER));
        assert_eq!(main_body(&text), "Hello there,\n\nThanks!");
    }

    #[test]
    fn facts_carry_surname_not_raw_field() {
        let record = LegislatorRecord {
            jurisdiction_district: "MA-05".into(),
            signed_b: true,
            chamber_counterpart_signers: "Markey, Ed".into(),
            ..Default::default()
        };
        let facts = RewriteFacts::from(&record);
        assert_eq!(facts.district, "MA-05");
        assert!(facts.signed_b && !facts.signed_a && !facts.signed_c);
        assert_eq!(facts.counterpart_surname, "Markey");

        let json = serde_json::to_value(&facts).unwrap();
        assert!(json.get("chamberCounterpartSigners").is_none());
        assert_eq!(json["counterpartSurname"], "Markey");
    }
}
