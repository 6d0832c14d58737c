//! Email composer: renders the outreach email for one legislator.
//!
//! Rendering is a pure function of the record, the organization name and the
//! static link set: the same inputs always produce the same bytes.

pub mod facts;
pub mod names;

pub use facts::{RewriteFacts, main_body, reattach_reference, split_reference};
pub use names::{count_word, greeting_name, join_list};

use serde::{Deserialize, Serialize};

use crate::roster::LegislatorRecord;

/// Full text of the letter being circulated, appended to every email.
pub const REFERENCE_LETTER: &str = include_str!("../../assets/reference_letter.txt");

/// Placed between the signature and the reference letter.
pub const SEPARATOR: &str = "\n\n--\n\n";

/// Subject line used for every handoff.
pub const SUBJECT: &str = "Request to Sign Letter Opposing EATS Act Provisions";

/// Signature used when no organization name was given.
pub const SIGNATURE_PLACEHOLDER: &str = "[Your Name]";

/// History sentence used when the legislator signed none of the prior letters.
pub const HISTORY_FALLBACK: &str =
    "In 2023, over 170 House Democrats signed a similar opposition letter.";

const DEFAULT_QUILL_LINK: &str =
    "https://quill.senate.gov/letters/letter/28457/opt-in/view/aaaaac2a-acbd-4efa-885f-22cd234cbd8a/";

/// Static links rendered into the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLinks {
    /// Sign-on link for the current letter.
    pub quill: String,
    /// 115th Congress letter.
    pub letter_a: String,
    /// 117th Congress letter.
    pub letter_b: String,
    /// 118th Congress letter.
    pub letter_c: String,
    /// Current-session Senate letter.
    pub senate_letter: String,
}

impl Default for ReferenceLinks {
    fn default() -> Self {
        Self {
            quill: DEFAULT_QUILL_LINK.to_string(),
            letter_a: "https://outreach.example.org/letters/115th-congress".to_string(),
            letter_b: "https://outreach.example.org/letters/117th-congress".to_string(),
            letter_c: "https://outreach.example.org/letters/118th-congress".to_string(),
            senate_letter: "https://outreach.example.org/letters/senate-current".to_string(),
        }
    }
}

/// A prior letter the legislator signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedLetter<'a> {
    /// Ordinal of the Congress, e.g. "117th".
    pub label: &'static str,
    pub link: &'a str,
}

/// Renders outreach emails against a fixed link set.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    links: ReferenceLinks,
}

impl Composer {
    pub fn new(links: ReferenceLinks) -> Self {
        Self { links }
    }

    /// Prior letters signed, oldest first.
    pub fn signed_letters(&self, record: &LegislatorRecord) -> Vec<SignedLetter<'_>> {
        [
            (record.signed_a, "115th", self.links.letter_a.as_str()),
            (record.signed_b, "117th", self.links.letter_b.as_str()),
            (record.signed_c, "118th", self.links.letter_c.as_str()),
        ]
        .into_iter()
        .filter(|(signed, _, _)| *signed)
        .map(|(_, label, link)| SignedLetter { label, link })
        .collect()
    }

    /// Sentence summarizing the legislator's signing history.
    pub fn history_sentence(&self, record: &LegislatorRecord) -> String {
        let letters = self.signed_letters(record);
        if letters.is_empty() {
            return HISTORY_FALLBACK.to_string();
        }

        let labels: Vec<&str> = letters.iter().map(|l| l.label).collect();
        let plural = letters.len() > 1;
        format!(
            "We're grateful that Rep. {name} has signed {count} previous {letter} opposing this provision, in the {labels} {congress}.",
            name = record.name,
            count = count_word(letters.len()),
            letter = if plural { "letters" } else { "letter" },
            labels = join_list(&labels),
            congress = if plural { "Congresses" } else { "Congress" },
        )
    }

    /// Sentence naming the Senate counterpart, if one signed.
    pub fn counterpart_sentence(&self, record: &LegislatorRecord) -> Option<String> {
        record.counterpart_surname().map(|surname| {
            format!(
                "Earlier this year, Senator {surname} also joined a Senate letter expressing the same position."
            )
        })
    }

    /// Reference link lines, or `None` when no line applies.
    pub fn links_block(&self, record: &LegislatorRecord) -> Option<String> {
        let mut lines: Vec<String> = self
            .signed_letters(record)
            .iter()
            .map(|l| format!("Here is the {} Congress letter: {}", l.label, l.link))
            .collect();

        if record.counterpart_surname().is_some() {
            lines.push(format!(
                "Here is the current Senate letter: {}",
                self.links.senate_letter
            ));
        }

        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    /// Render the full email for `record`, signed by `org_name`.
    pub fn compose(&self, record: &LegislatorRecord, org_name: &str) -> String {
        let greeting = greeting_name(&record.legislative_contacts, &record.name);
        let org = org_name.trim();
        let signature = if org.is_empty() { SIGNATURE_PLACEHOLDER } else { org };

        let mut paragraphs: Vec<String> = vec![
            format!("Hi {greeting},"),
            "Thank you for your consistent support of efforts to promote a safe and sustainable food system.".to_string(),
            format!(
                "I'm reaching out to see if Rep. {name} would consider signing onto the letter below, which is being led by Reps. Simon, Costa, and McGovern. The letter urges the House Agriculture Committee to reject any provision that would override state-level standards for certain agricultural products. {history}",
                name = record.name,
                history = self.history_sentence(record),
            ),
        ];

        if let Some(counterpart) = self.counterpart_sentence(record) {
            paragraphs.push(counterpart);
        }

        paragraphs.push(
            "These letters oppose what was once known as the \"Steve King Amendment,\" later rebranded as the \"EATS Act,\" though the intent remains the same—stripping states of their right to protect animals, farmers, and consumers.".to_string(),
        );

        if let Some(block) = self.links_block(record) {
            paragraphs.push(block);
        }

        paragraphs.push(format!("Here is the Quill link to sign on: {}", self.links.quill));
        paragraphs.push(
            "For any questions or to add your boss's name, you can reach out to Sydney Dahiyat in Rep. Simon's office (Sydney.Dahiyat@mail.house.gov) or John Swords in Rep. McGovern's office (John.Swords@mail.house.gov).".to_string(),
        );
        paragraphs.push(
            "Thanks again for your leadership on this issue, and for considering this latest request. The full letter text is below.".to_string(),
        );
        paragraphs.push(format!("Best,\n{signature}"));

        format!("{}{SEPARATOR}{REFERENCE_LETTER}", paragraphs.join("\n\n"))
    }
}

/// Render with the canonical link set.
pub fn compose_email(record: &LegislatorRecord, org_name: &str) -> String {
    Composer::default().compose(record, org_name)
}
