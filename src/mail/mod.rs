//! Mail handoff: web-mail compose URLs, `mailto:` fallback, and `.eml`
//! drafts built with lettre.

use lettre::Message;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::MailError;

/// Default compose endpoint; `to`, `su` and `body` are appended.
pub const GMAIL_COMPOSE_BASE: &str = "https://mail.google.com/mail/?view=cm&fs=1";

/// Characters left as-is by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Replace typographic punctuation that mail clients mangle in URLs.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

/// Recipient string for URLs: contact lines joined with commas.
pub fn recipient_list(contacts: &str) -> String {
    contacts
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Build a web-mail compose URL on `base` with a cleaned body.
pub fn compose_url(base: &str, to: &str, subject: &str, body: &str) -> Result<String, MailError> {
    let mut url = Url::parse(base).map_err(|e| MailError::InvalidUrl(format!("{base}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("to", to)
        .append_pair("su", subject)
        .append_pair("body", &clean_text(body));
    Ok(url.into())
}

/// Build a `mailto:` URI with percent-encoded subject and body.
pub fn mailto_url(to: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{to}?subject={}&body={}",
        utf8_percent_encode(subject, URI_COMPONENT),
        utf8_percent_encode(body, URI_COMPONENT),
    )
}

/// The URL handed to the user's mail client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailHandoff {
    pub url: String,
    /// True when the compose URL could not be built and `mailto:` was used.
    pub fallback: bool,
}

/// Compose URL for the given message, falling back to `mailto:` when
/// `compose_base` does not parse.
pub fn handoff(compose_base: &str, to: &str, subject: &str, body: &str) -> MailHandoff {
    match compose_url(compose_base, to, subject, body) {
        Ok(url) => {
            debug!(url_len = url.len(), "Built compose URL");
            MailHandoff {
                url,
                fallback: false,
            }
        }
        Err(e) => {
            warn!(error = %e, "Compose URL failed, falling back to mailto");
            MailHandoff {
                url: mailto_url(to, subject, body),
                fallback: true,
            }
        }
    }
}

/// Build an RFC 5322 draft addressed to every valid contact.
///
/// Invalid contact lines are skipped; an empty result is an error.
pub fn draft_message(
    from: &str,
    contacts: &str,
    subject: &str,
    body: &str,
) -> Result<Vec<u8>, MailError> {
    let from: Mailbox = from.parse().map_err(|e| MailError::InvalidAddress {
        address: from.to_string(),
        reason: format!("{e}"),
    })?;

    let mut builder = Message::builder().from(from).subject(subject);
    let mut recipients = 0;
    for address in contacts.split('\n').map(str::trim).filter(|s| !s.is_empty()) {
        match address.parse::<Mailbox>() {
            Ok(mailbox) => {
                builder = builder.to(mailbox);
                recipients += 1;
            }
            Err(e) => warn!(address, error = %e, "Skipping invalid contact address"),
        }
    }
    if recipients == 0 {
        return Err(MailError::NoRecipients);
    }

    let message = builder
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| MailError::Build(e.to_string()))?;
    Ok(message.formatted())
}
