//! Outreach sessions: roster, selection, composer state and notices for
//! one user, held in memory.
//!
//! The open record and the scroll lock tied to it are session state, as are
//! the once-per-session handoff tip and any rewrite in flight.

pub mod state;
pub mod store;

pub use state::{ComposerState, ComposerView};
pub use store::{DEFAULT_SESSION_TTL, SessionStore, spawn_expiry_task};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::composer::{Composer, SUBJECT};
use crate::error::{FetchError, RewriteError, SessionError};
use crate::mail::{self, MailHandoff};
use crate::rewrite::RewriteRequest;
use crate::roster::{self, LegislatorRecord, Roster};

/// Shown once per session, on the first send.
pub const HANDOFF_TIP: &str =
    "Your mail client opens in a new tab with the email filled in. Review it before sending.";

const REWRITE_FAILED_NOTICE: &str =
    "Failed to personalize the email. Your current text has been kept.";

const LOAD_FAILED_NOTICE: &str =
    "Failed to load representative data. Please try again.";

/// The record the user opened.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    /// Index into the roster at selection time.
    pub index: usize,
    pub record: LegislatorRecord,
    /// Bumped on every selection; identifies which record a rewrite is for.
    #[serde(skip)]
    pub epoch: u64,
}

/// Handle for one outstanding rewrite request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteTicket {
    pub epoch: u64,
    pub request_id: u64,
}

/// What happened to a completed rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The text was replaced.
    Applied,
    /// The selection changed while the request was out; result discarded.
    Stale,
    /// The request failed; a notice was raised and the text kept.
    Failed(Notice),
}

/// Kind of user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    RewriteFailed,
    LoadFailed,
}

/// A dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Result of the send action.
#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub to: String,
    pub subject: String,
    #[serde(flatten)]
    pub handoff: MailHandoff,
    /// Present on the first send of the session only.
    pub tip: Option<&'static str>,
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub roster_size: usize,
    pub roster_loaded_at: DateTime<Utc>,
    pub jurisdictions: Vec<String>,
    pub filter: Option<String>,
    pub query: String,
    pub org_name: String,
    pub selection: Option<Selection>,
    pub composer: Option<ComposerView>,
    pub rewrite_in_flight: bool,
    pub scroll_locked: bool,
    pub notices: Vec<Notice>,
}

/// A row of the filtered roster.
#[derive(Debug, Clone, Serialize)]
pub struct VisibleRecord {
    pub index: usize,
    #[serde(flatten)]
    pub record: LegislatorRecord,
}

/// One user's outreach session.
#[derive(Debug)]
pub struct OutreachSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    roster: Roster,
    filter: Option<String>,
    query: String,
    org_name: String,
    selection: Option<Selection>,
    view: Option<ComposerView>,
    epoch: u64,
    next_request_id: u64,
    in_flight: Option<RewriteTicket>,
    notices: Vec<Notice>,
    next_notice_id: u64,
    scroll_locked: bool,
    handoff_tip_shown: bool,
}

impl OutreachSession {
    pub fn new(roster: Roster) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            roster,
            filter: None,
            query: String::new(),
            org_name: String::new(),
            selection: None,
            view: None,
            epoch: 0,
            next_request_id: 0,
            in_flight: None,
            notices: Vec::new(),
            next_notice_id: 0,
            scroll_locked: false,
            handoff_tip_shown: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn view(&self) -> Option<&ComposerView> {
        self.view.as_ref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    pub fn rewrite_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    // ── Roster ──────────────────────────────────────────────────────────

    /// Swap in a freshly loaded roster. Any open selection is closed since
    /// its record belongs to the old roster.
    pub fn replace_roster(&mut self, roster: Roster) {
        info!(session = %self.id, count = roster.len(), "Roster replaced");
        self.roster = roster;
        self.close_selection();
    }

    /// Record a failed reload; the current roster stays as it was.
    pub fn roster_load_failed(&mut self, error: &FetchError) -> Notice {
        warn!(session = %self.id, error = %error, "Roster reload failed");
        self.push_notice(NoticeKind::LoadFailed, LOAD_FAILED_NOTICE)
    }

    pub fn set_filter(&mut self, jurisdiction: Option<String>) {
        self.filter = jurisdiction
            .map(|j| j.trim().to_ascii_uppercase())
            .filter(|j| !j.is_empty());
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Records passing the current filter and search, with roster indices.
    pub fn visible(&self) -> Vec<VisibleRecord> {
        roster::filter_records(&self.roster.records, self.filter.as_deref(), &self.query)
            .into_iter()
            .map(|(index, record)| VisibleRecord {
                index,
                record: record.clone(),
            })
            .collect()
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Open a record: composer text is regenerated and the page scroll is
    /// locked behind the selection.
    pub fn select(
        &mut self,
        composer: &Composer,
        index: usize,
    ) -> Result<&ComposerView, SessionError> {
        let record = self
            .roster
            .get(index)
            .cloned()
            .ok_or(SessionError::RecordOutOfRange {
                index,
                len: self.roster.len(),
            })?;

        self.epoch += 1;
        self.in_flight = None;
        self.scroll_locked = true;
        debug!(session = %self.id, index, epoch = self.epoch, "Record selected");

        let view = ComposerView::generate(composer, &record, &self.org_name);
        self.selection = Some(Selection {
            index,
            record,
            epoch: self.epoch,
        });
        Ok(self.view.insert(view))
    }

    /// Close the selection and release the scroll lock.
    pub fn close_selection(&mut self) {
        self.epoch += 1;
        self.selection = None;
        self.view = None;
        self.in_flight = None;
        self.scroll_locked = false;
    }

    // ── Composer ────────────────────────────────────────────────────────

    pub fn org_name(&self) -> &str {
        &self.org_name
    }

    pub fn set_org_name(&mut self, composer: &Composer, org_name: impl Into<String>) {
        self.org_name = org_name.into();
        if let (Some(selection), Some(view)) = (&self.selection, &mut self.view) {
            view.org_changed(composer, &selection.record, &self.org_name);
        }
    }

    pub fn edit_text(&mut self, text: String) -> Result<&ComposerView, SessionError> {
        let view = self.view.as_mut().ok_or(SessionError::NoSelection)?;
        view.edit(text);
        Ok(view)
    }

    /// Start a rewrite for the current selection.
    ///
    /// Only one rewrite may be outstanding per selection.
    pub fn begin_rewrite(
        &mut self,
        composer: &Composer,
    ) -> Result<(RewriteTicket, RewriteRequest), RewriteError> {
        let selection = self.selection.as_ref().ok_or(RewriteError::NoSelection)?;
        if self.in_flight.is_some() {
            return Err(RewriteError::InFlight);
        }

        self.next_request_id += 1;
        let ticket = RewriteTicket {
            epoch: selection.epoch,
            request_id: self.next_request_id,
        };
        let request = RewriteRequest::for_record(composer, &selection.record, &self.org_name);
        self.in_flight = Some(ticket);
        Ok((ticket, request))
    }

    /// Apply the result of a rewrite started with `begin_rewrite`.
    pub fn complete_rewrite(
        &mut self,
        ticket: RewriteTicket,
        result: Result<String, RewriteError>,
    ) -> RewriteOutcome {
        if self.in_flight != Some(ticket) {
            debug!(session = %self.id, request_id = ticket.request_id, "Discarding stale rewrite");
            return RewriteOutcome::Stale;
        }
        self.in_flight = None;

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Rewrite failed");
                let notice = self.push_notice(NoticeKind::RewriteFailed, REWRITE_FAILED_NOTICE);
                return RewriteOutcome::Failed(notice);
            }
        };

        match self.view.as_mut() {
            Some(view) => {
                view.personalize(&text);
                info!(session = %self.id, request_id = ticket.request_id, "Rewrite applied");
                RewriteOutcome::Applied
            }
            None => RewriteOutcome::Stale,
        }
    }

    // ── Send ────────────────────────────────────────────────────────────

    /// Hand the current text to the mail client, whatever its state.
    pub fn send(&mut self, compose_base: &str) -> Result<SendResult, SessionError> {
        let selection = self.selection.as_ref().ok_or(SessionError::NoSelection)?;
        let view = self.view.as_ref().ok_or(SessionError::NoSelection)?;

        let to = mail::recipient_list(&selection.record.legislative_contacts);
        let handoff = mail::handoff(compose_base, &to, SUBJECT, &view.text);
        info!(
            session = %self.id,
            legislator = %selection.record.name,
            state = %view.state,
            fallback = handoff.fallback,
            "Email handed off"
        );

        let tip = if self.handoff_tip_shown {
            None
        } else {
            self.handoff_tip_shown = true;
            Some(HANDOFF_TIP)
        };

        Ok(SendResult {
            to,
            subject: SUBJECT.to_string(),
            handoff,
            tip,
        })
    }

    /// Current text as an `.eml` draft addressed to the selection's contacts.
    pub fn draft(&self, from: &str) -> crate::error::Result<Vec<u8>> {
        let selection = self.selection.as_ref().ok_or(SessionError::NoSelection)?;
        let view = self.view.as_ref().ok_or(SessionError::NoSelection)?;
        let eml = mail::draft_message(
            from,
            &selection.record.legislative_contacts,
            SUBJECT,
            &view.text,
        )?;
        debug!(session = %self.id, bytes = eml.len(), "Draft built");
        Ok(eml)
    }

    // ── Notices ─────────────────────────────────────────────────────────

    fn push_notice(&mut self, kind: NoticeKind, message: &str) -> Notice {
        self.next_notice_id += 1;
        let notice = Notice {
            id: self.next_notice_id,
            kind,
            message: message.to_string(),
        };
        self.notices.push(notice.clone());
        notice
    }

    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            roster_size: self.roster.len(),
            roster_loaded_at: self.roster.loaded_at,
            jurisdictions: self.roster.jurisdictions(),
            filter: self.filter.clone(),
            query: self.query.clone(),
            org_name: self.org_name.clone(),
            selection: self.selection.clone(),
            composer: self.view.clone(),
            rewrite_in_flight: self.rewrite_in_flight(),
            scroll_locked: self.scroll_locked,
            notices: self.notices.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::REFERENCE_LETTER;

    fn rec(name: &str, district: &str, contacts: &str) -> LegislatorRecord {
        LegislatorRecord {
            name: name.into(),
            jurisdiction_district: district.into(),
            legislative_contacts: contacts.into(),
            ..Default::default()
        }
    }

    fn session() -> OutreachSession {
        OutreachSession::new(Roster::new(vec![
            rec("Jane Roe", "CA-12", "jane.doe@mail.house.gov"),
            rec("John Poe", "NY-03", "a@x.gov\nb@y.gov"),
            rec("Ann Lee", "CA-01", ""),
        ]))
    }

    #[test]
    fn select_generates_and_locks_scroll() {
        let composer = Composer::default();
        let mut s = session();
        let view = s.select(&composer, 0).unwrap();
        assert_eq!(view.state, ComposerState::Generated);
        assert!(view.text.starts_with("Hi Jane,"));
        assert!(s.scroll_locked());

        s.close_selection();
        assert!(!s.scroll_locked());
        assert!(s.view().is_none());
    }

    #[test]
    fn select_out_of_range() {
        let mut s = session();
        let err = s.select(&Composer::default(), 9).unwrap_err();
        assert!(matches!(err, SessionError::RecordOutOfRange { index: 9, len: 3 }));
    }

    #[test]
    fn filter_and_search_visible_rows() {
        let mut s = session();
        s.set_filter(Some("ca".into()));
        let rows: Vec<usize> = s.visible().iter().map(|v| v.index).collect();
        assert_eq!(rows, vec![0, 2]);

        s.set_search("ann");
        let rows: Vec<usize> = s.visible().iter().map(|v| v.index).collect();
        assert_eq!(rows, vec![2]);

        s.set_filter(None);
        s.set_search("");
        assert_eq!(s.visible().len(), 3);
    }

    #[test]
    fn org_change_before_selection_applies_on_select() {
        let composer = Composer::default();
        let mut s = session();
        s.set_org_name(&composer, "Acme");
        let view = s.select(&composer, 2).unwrap();
        assert!(view.text.contains("Best,\nAcme"));
    }

    #[test]
    fn rewrite_applies_and_reattaches_letter() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 0).unwrap();

        let (ticket, request) = s.begin_rewrite(&composer).unwrap();
        assert!(!request.main_body_text.contains(REFERENCE_LETTER));
        assert!(s.rewrite_in_flight());

        let outcome = s.complete_rewrite(ticket, Ok("Dear Jane, warm words.".into()));
        assert_eq!(outcome, RewriteOutcome::Applied);
        let view = s.view().unwrap();
        assert_eq!(view.state, ComposerState::Personalized);
        assert!(view.text.ends_with(REFERENCE_LETTER));
        assert!(!s.rewrite_in_flight());
    }

    #[test]
    fn second_rewrite_while_in_flight_is_rejected() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 0).unwrap();
        s.begin_rewrite(&composer).unwrap();
        assert!(matches!(s.begin_rewrite(&composer), Err(RewriteError::InFlight)));
    }

    #[test]
    fn rewrite_without_selection_is_rejected() {
        let mut s = session();
        assert!(matches!(
            s.begin_rewrite(&Composer::default()),
            Err(RewriteError::NoSelection)
        ));
    }

    #[test]
    fn failed_rewrite_keeps_text_and_raises_one_notice() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 0).unwrap();
        s.edit_text("hand written".into()).unwrap();

        let (ticket, _) = s.begin_rewrite(&composer).unwrap();
        let outcome = s.complete_rewrite(ticket, Err(RewriteError::EmptyOutput));
        assert!(matches!(outcome, RewriteOutcome::Failed(_)));

        assert_eq!(s.notices().len(), 1);
        assert_eq!(s.notices()[0].kind, NoticeKind::RewriteFailed);
        let view = s.view().unwrap();
        assert_eq!(view.text, "hand written");
        assert_eq!(view.state, ComposerState::ManuallyEdited);

        let id = s.notices()[0].id;
        assert!(s.dismiss_notice(id));
        assert!(s.notices().is_empty());
        assert!(!s.dismiss_notice(id));
    }

    #[test]
    fn stale_rewrite_does_not_touch_new_selection() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 0).unwrap();
        let (old_ticket, _) = s.begin_rewrite(&composer).unwrap();

        s.select(&composer, 1).unwrap();
        let before = s.view().unwrap().text.clone();

        let outcome = s.complete_rewrite(old_ticket, Ok("for Jane only".into()));
        assert_eq!(outcome, RewriteOutcome::Stale);
        assert_eq!(s.view().unwrap().text, before);
        assert_eq!(s.view().unwrap().state, ComposerState::Generated);

        // A new request for the current record is allowed.
        assert!(s.begin_rewrite(&composer).is_ok());
    }

    #[test]
    fn stale_failure_raises_no_notice() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 0).unwrap();
        let (ticket, _) = s.begin_rewrite(&composer).unwrap();
        s.close_selection();

        let outcome = s.complete_rewrite(ticket, Err(RewriteError::EmptyOutput));
        assert_eq!(outcome, RewriteOutcome::Stale);
        assert!(s.notices().is_empty());
    }

    #[test]
    fn send_uses_current_text_and_shows_tip_once() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 1).unwrap();
        s.edit_text("Short note".into()).unwrap();

        let first = s.send(mail::GMAIL_COMPOSE_BASE).unwrap();
        assert_eq!(first.to, "a@x.gov,b@y.gov");
        assert_eq!(first.subject, SUBJECT);
        assert!(first.handoff.url.contains("body=Short+note"));
        assert_eq!(first.tip, Some(HANDOFF_TIP));

        let second = s.send(mail::GMAIL_COMPOSE_BASE).unwrap();
        assert_eq!(second.tip, None);
    }

    #[test]
    fn send_without_selection_fails() {
        let mut s = session();
        assert!(matches!(
            s.send(mail::GMAIL_COMPOSE_BASE),
            Err(SessionError::NoSelection)
        ));
    }

    #[test]
    fn replace_roster_closes_selection() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 0).unwrap();
        let (ticket, _) = s.begin_rewrite(&composer).unwrap();

        s.replace_roster(Roster::new(vec![rec("New Person", "TX-01", "")]));
        assert!(s.selection().is_none());
        assert_eq!(s.roster().len(), 1);
        assert_eq!(s.complete_rewrite(ticket, Ok("x".into())), RewriteOutcome::Stale);
    }

    #[test]
    fn load_failure_keeps_roster() {
        let mut s = session();
        let notice = s.roster_load_failed(&FetchError::Transport("timeout".into()));
        assert_eq!(notice.kind, NoticeKind::LoadFailed);
        assert_eq!(s.roster().len(), 3);
    }

    #[test]
    fn snapshot_reflects_state() {
        let composer = Composer::default();
        let mut s = session();
        s.set_filter(Some("ny".into()));
        s.select(&composer, 1).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.roster_size, 3);
        assert_eq!(snap.jurisdictions, vec!["CA", "NY"]);
        assert_eq!(snap.filter.as_deref(), Some("NY"));
        assert_eq!(snap.selection.unwrap().index, 1);
        assert!(snap.scroll_locked);

        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["composer"]["state"], "generated");
    }

    #[test]
    fn draft_uses_current_text() {
        let composer = Composer::default();
        let mut s = session();
        assert!(matches!(
            s.draft("me@org.example"),
            Err(crate::error::Error::Session(SessionError::NoSelection))
        ));

        s.select(&composer, 1).unwrap();
        s.edit_text("Short note".into()).unwrap();
        let eml = String::from_utf8(s.draft("me@org.example").unwrap()).unwrap();
        assert!(eml.contains("a@x.gov"));
        assert!(eml.contains("b@y.gov"));
        assert!(eml.contains("Short note"));
    }

    #[test]
    fn draft_without_contacts_fails() {
        let composer = Composer::default();
        let mut s = session();
        s.select(&composer, 2).unwrap();
        assert!(matches!(
            s.draft("me@org.example"),
            Err(crate::error::Error::Mail(crate::error::MailError::NoRecipients))
        ));
    }
}
