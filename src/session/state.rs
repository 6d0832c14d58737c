//! Composer state machine: which text is shown and sent for a selection.

use serde::{Deserialize, Serialize};

use crate::composer::{Composer, reattach_reference};
use crate::roster::LegislatorRecord;

/// Origin of the text currently held for a selection.
///
/// `Generated` ↔ `ManuallyEdited` ↔ `Personalized`; selection always starts
/// at `Generated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposerState {
    /// Text equals the composer output for the current record and org name.
    Generated,
    /// The user changed the text.
    ManuallyEdited,
    /// Text came back from the rewriting service.
    Personalized,
}

impl Default for ComposerState {
    fn default() -> Self {
        Self::Generated
    }
}

impl std::fmt::Display for ComposerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Generated => "generated",
            Self::ManuallyEdited => "manually_edited",
            Self::Personalized => "personalized",
        };
        write!(f, "{s}")
    }
}

/// Text and state for the selected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposerView {
    pub state: ComposerState,
    pub text: String,
    /// Composer output for the current record and org name.
    #[serde(skip)]
    generated: String,
}

impl ComposerView {
    /// Fresh view for a newly selected record.
    pub fn generate(composer: &Composer, record: &LegislatorRecord, org_name: &str) -> Self {
        let generated = composer.compose(record, org_name);
        Self {
            state: ComposerState::Generated,
            text: generated.clone(),
            generated,
        }
    }

    /// Last composer output, regardless of what the user sees.
    pub fn generated(&self) -> &str {
        &self.generated
    }

    /// Apply an org-name change.
    ///
    /// Generated text is refreshed. Edited or personalized text is kept,
    /// unless it still matches the output for the previous org name.
    pub fn org_changed(&mut self, composer: &Composer, record: &LegislatorRecord, org_name: &str) {
        let regenerated = composer.compose(record, org_name);
        if self.state == ComposerState::Generated || self.text == self.generated {
            self.text = regenerated.clone();
            self.state = ComposerState::Generated;
        }
        self.generated = regenerated;
    }

    /// The user typed over the text.
    pub fn edit(&mut self, text: String) {
        self.text = text;
        self.state = ComposerState::ManuallyEdited;
    }

    /// A rewrite came back; reattach the reference letter.
    pub fn personalize(&mut self, rewritten: &str) {
        self.text = reattach_reference(rewritten);
        self.state = ComposerState::Personalized;
    }
}
