//! The per-document state machine.
//!
//! One `Session` is the single synchronization point for a document:
//!
//! ```text
//! driver A ──┐                       ┌── driver A writer
//! driver B ──┼── submit / cursor ──► │   (delta_since + Notify)
//! driver C ──┘        │              └── driver B writer, …
//!                     ▼
//!          ┌───────────────────────┐
//!          │ revision log (append) │  text cache, participants,
//!          │ rebase via transform  │  language, change sequence
//!          └───────────────────────┘
//! ```
//!
//! Every mutation runs inside one short critical section on a single lock;
//! nothing in here suspends. Writers sleep on a [`Notify`] and, on each
//! wakeup, pull the delta since the revision and change sequence they last
//! flushed — a missed wakeup is harmless because the next one re-reads the
//! same watermark.
//!
//! A submission is accepted only after the full rebase succeeds and the
//! rebased operation's base length matches the current text, so a bad frame
//! can never corrupt the log.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use scrawl_ot::{utf16, OpComponent, OtError, TextOperation};

use crate::protocol::{CursorData, ServerMessage, UserInfo, UserOperation};

/// Departure tombstones kept for late-waking writers.
const TOMBSTONE_CAP: usize = 1024;

/// Why a session rejected a request. Every variant ends the offending
/// connection; none of them is ever surfaced to other participants.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The client claims a revision the log has not reached.
    #[error("parent revision {parent} is ahead of the log at {current}")]
    RevisionAhead { parent: u64, current: u64 },
    /// The operation is structurally unusable, before or after rebasing.
    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] OtError),
    /// The participant already detached (or never attached).
    #[error("unknown participant {0}")]
    UnknownParticipant(u64),
    /// Presence hue outside `0..360`.
    #[error("hue {0} out of range")]
    InvalidHue(u32),
}

/// What a writer has already flushed to its client.
///
/// `revision` indexes the operation log; `seq` tracks presence and language
/// changes via the session's change sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Watermark {
    pub revision: u64,
    pub seq: u64,
}

/// Counters reported through `/api/stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub participants: usize,
    pub revision: u64,
    pub logged_bytes: u64,
}

#[derive(Default)]
struct Participant {
    info: Option<UserInfo>,
    info_seq: u64,
    cursor: Option<CursorData>,
    cursor_seq: u64,
    acked_revision: u64,
}

struct SessionState {
    operations: Vec<UserOperation>,
    /// Materialized fold of the log; the log stays the source of truth.
    text: String,
    language: Option<String>,
    language_seq: u64,
    participants: HashMap<u64, Participant>,
    /// `(seq, participant)` pairs for departures not yet seen by every writer.
    departed: VecDeque<(u64, u64)>,
    /// Bumped on every presence or language change.
    seq: u64,
    /// Total UTF-8 bytes inserted over the session's lifetime.
    logged_bytes: u64,
    /// When the roster last became empty.
    idle_since: Instant,
}

/// The authoritative state of one document.
pub struct Session {
    state: RwLock<SessionState>,
    next_participant: AtomicU64,
    notify: Notify,
    killed: AtomicBool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// An empty document at revision 0.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState {
                operations: Vec::new(),
                text: String::new(),
                language: None,
                language_seq: 0,
                participants: HashMap::new(),
                departed: VecDeque::new(),
                seq: 0,
                logged_bytes: 0,
                idle_since: Instant::now(),
            }),
            next_participant: AtomicU64::new(0),
            notify: Notify::new(),
            killed: AtomicBool::new(false),
        }
    }

    /// A document pre-seeded from archived text: the text becomes a single
    /// insert at revision 1, so reopening looks like one committed edit.
    pub fn from_snapshot(text: String, language: Option<String>) -> Self {
        let session = Self::new();
        {
            let mut state = session.state.write().unwrap();
            if !text.is_empty() {
                let mut operation = TextOperation::new();
                operation.insert(text.as_str());
                state.logged_bytes = text.len() as u64;
                state.operations.push(UserOperation { id: 0, operation });
                state.text = text;
            }
            if let Some(language) = language {
                state.seq += 1;
                state.language_seq = state.seq;
                state.language = Some(language);
            }
        }
        session
    }

    /// Size of the log; also the revision of the current text.
    pub fn revision(&self) -> u64 {
        self.state.read().unwrap().operations.len() as u64
    }

    /// The current text.
    pub fn text(&self) -> String {
        self.state.read().unwrap().text.clone()
    }

    /// The current text together with the language tag, in one read.
    pub fn snapshot(&self) -> (String, Option<String>) {
        let state = self.state.read().unwrap();
        (state.text.clone(), state.language.clone())
    }

    /// The committed operations from revision `start` onward.
    pub fn operations_since(&self, start: u64) -> Vec<UserOperation> {
        let state = self.state.read().unwrap();
        state
            .operations
            .get(start as usize..)
            .map(<[UserOperation]>::to_vec)
            .unwrap_or_default()
    }

    /// Register a new participant and return its id. Ids are never reused
    /// within one session.
    pub fn attach(&self) -> u64 {
        let id = self.next_participant.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = self.state.write().unwrap();
            state.participants.insert(id, Participant::default());
        }
        self.notify.notify_waiters();
        id
    }

    /// Remove a participant and tell everyone else.
    pub fn detach(&self, id: u64) {
        let mut state = self.state.write().unwrap();
        if state.participants.remove(&id).is_none() {
            return;
        }
        state.seq += 1;
        let seq = state.seq;
        state.departed.push_back((seq, id));
        if state.departed.len() > TOMBSTONE_CAP {
            state.departed.pop_front();
        }
        if state.participants.is_empty() {
            state.idle_since = Instant::now();
        }
        drop(state);
        self.notify.notify_waiters();
    }

    /// Submit an operation made against `parent_revision`.
    ///
    /// The operation is rebased over every logged operation the client had
    /// not seen, re-checked against the current text, appended, and the new
    /// revision returned. Nothing is appended unless every check passes.
    pub fn submit(
        &self,
        id: u64,
        parent_revision: u64,
        operation: TextOperation,
    ) -> Result<u64, SessionError> {
        let mut state = self.state.write().unwrap();
        if !state.participants.contains_key(&id) {
            return Err(SessionError::UnknownParticipant(id));
        }
        let current = state.operations.len() as u64;
        if parent_revision > current {
            return Err(SessionError::RevisionAhead {
                parent: parent_revision,
                current,
            });
        }

        let mut rebased = operation;
        for missed in &state.operations[parent_revision as usize..] {
            // the committed operation is the first argument, so its inserts
            // stay in front of the late arrival's; the client acknowledges
            // `missed` from the broadcast stream, so only our side is kept
            rebased = missed.operation.transform(&rebased)?.1;
        }

        let text_len = utf16::len(&state.text);
        if rebased.base_len() != text_len {
            return Err(SessionError::InvalidOperation(OtError::LengthMismatch {
                expected: text_len,
                actual: rebased.base_len(),
            }));
        }
        let text = rebased.apply(&state.text)?;

        // carry every stored cursor across the committed operation so they
        // stay expressed at the head revision
        for participant in state.participants.values_mut() {
            if let Some(cursor) = participant.cursor.take() {
                participant.cursor = Some(cursor.transform(&rebased));
            }
        }

        state.logged_bytes += inserted_bytes(&rebased);
        state.text = text;
        state.operations.push(UserOperation { id, operation: rebased });
        let committed = state.operations.len() as u64;
        drop(state);
        self.notify.notify_waiters();
        Ok(committed)
    }

    /// Store a participant's cursor, reported at `at_revision`, transported
    /// to the current revision.
    pub fn update_cursor(
        &self,
        id: u64,
        data: CursorData,
        at_revision: u64,
    ) -> Result<(), SessionError> {
        let mut state = self.state.write().unwrap();
        if !state.participants.contains_key(&id) {
            return Err(SessionError::UnknownParticipant(id));
        }
        let current = state.operations.len() as u64;
        if at_revision > current {
            return Err(SessionError::RevisionAhead {
                parent: at_revision,
                current,
            });
        }
        let mut data = data;
        for missed in &state.operations[at_revision as usize..] {
            data = data.transform(&missed.operation);
        }
        state.seq += 1;
        let seq = state.seq;
        let participant = state
            .participants
            .get_mut(&id)
            .expect("participant checked above");
        participant.cursor = Some(data);
        participant.cursor_seq = seq;
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Update a participant's presence info.
    pub fn set_info(&self, id: u64, info: UserInfo) -> Result<(), SessionError> {
        if info.hue >= 360 {
            return Err(SessionError::InvalidHue(info.hue));
        }
        let mut state = self.state.write().unwrap();
        if !state.participants.contains_key(&id) {
            return Err(SessionError::UnknownParticipant(id));
        }
        state.seq += 1;
        let seq = state.seq;
        let participant = state
            .participants
            .get_mut(&id)
            .expect("participant checked above");
        participant.info = Some(info);
        participant.info_seq = seq;
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Change the document's language tag. The tag is opaque metadata and
    /// takes no part in the operation algebra.
    pub fn set_language(&self, language: String) {
        {
            let mut state = self.state.write().unwrap();
            state.seq += 1;
            state.language_seq = state.seq;
            state.language = Some(language);
        }
        self.notify.notify_waiters();
    }

    /// A future that resolves on the next state change. Register it before
    /// reading the delta, or a change between the two is lost.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Everything that changed since `watermark`, as wire messages for the
    /// participant `self_id`: log backlog (own echo included), roster and
    /// cursor deltas, language change. Advances the watermark.
    pub fn delta_since(&self, self_id: u64, watermark: &mut Watermark) -> Vec<ServerMessage> {
        let state = self.state.read().unwrap();
        let mut out = Vec::new();

        let revision = state.operations.len() as u64;
        if revision > watermark.revision {
            out.push(ServerMessage::History {
                start: watermark.revision,
                operations: state
                    .operations
                    .get(watermark.revision as usize..)
                    .map(<[UserOperation]>::to_vec)
                    .unwrap_or_default(),
            });
            watermark.revision = revision;
        }

        if state.language_seq > watermark.seq {
            if let Some(language) = &state.language {
                out.push(ServerMessage::Language(language.clone()));
            }
        }

        for &(seq, id) in &state.departed {
            if seq > watermark.seq {
                out.push(ServerMessage::UserInfo { id, info: None });
            }
        }

        for (&id, participant) in &state.participants {
            if participant.info_seq > watermark.seq {
                if let Some(info) = &participant.info {
                    out.push(ServerMessage::UserInfo {
                        id,
                        info: Some(info.clone()),
                    });
                }
            }
            if id != self_id && participant.cursor_seq > watermark.seq {
                if let Some(data) = &participant.cursor {
                    out.push(ServerMessage::UserCursor {
                        id,
                        data: data.clone(),
                    });
                }
            }
        }

        watermark.seq = state.seq;
        out
    }

    /// Record how far a driver has flushed to its client.
    pub fn record_ack(&self, id: u64, revision: u64) {
        let mut state = self.state.write().unwrap();
        if let Some(participant) = state.participants.get_mut(&id) {
            participant.acked_revision = participant.acked_revision.max(revision);
        }
    }

    /// Fold the log into a single base insert at revision 1.
    ///
    /// Allowed only while every attached participant has acknowledged the
    /// whole log; returns `false` (and changes nothing) otherwise. The
    /// janitor compacts quiescent sessions whose logs have grown long.
    pub fn compact(&self) -> bool {
        let mut state = self.state.write().unwrap();
        let current = state.operations.len() as u64;
        if current <= 1 {
            return false;
        }
        if state
            .participants
            .values()
            .any(|participant| participant.acked_revision < current)
        {
            return false;
        }
        state.operations.clear();
        if !state.text.is_empty() {
            let mut operation = TextOperation::new();
            operation.insert(state.text.as_str());
            state.operations.push(UserOperation { id: 0, operation });
        }
        true
    }

    /// How many participants are attached.
    pub fn participant_count(&self) -> usize {
        self.state.read().unwrap().participants.len()
    }

    /// Whether the roster has been empty for longer than `quiescence`.
    pub fn quiescent_for(&self, quiescence: std::time::Duration) -> bool {
        let state = self.state.read().unwrap();
        state.participants.is_empty() && state.idle_since.elapsed() >= quiescence
    }

    /// Counters for `/api/stats`.
    pub fn stats(&self) -> SessionStats {
        let state = self.state.read().unwrap();
        SessionStats {
            participants: state.participants.len(),
            revision: state.operations.len() as u64,
            logged_bytes: state.logged_bytes,
        }
    }

    /// Mark the session dead (evicted from the registry) and wake every
    /// driver so it can shut its connection down.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Whether [`kill`](Self::kill) has been called.
    pub fn killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }
}

fn inserted_bytes(operation: &TextOperation) -> u64 {
    operation
        .components()
        .iter()
        .map(|component| match component {
            OpComponent::Insert(s) => s.len() as u64,
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(build: impl FnOnce(&mut TextOperation)) -> TextOperation {
        let mut operation = TextOperation::default();
        build(&mut operation);
        operation
    }

    fn insert(s: &str) -> TextOperation {
        op(|o| o.insert(s))
    }

    /// Fold the full log from the empty string, independently of the cache.
    fn fold(session: &Session) -> String {
        session
            .operations_since(0)
            .iter()
            .fold(String::new(), |text, logged| {
                logged.operation.apply(&text).unwrap()
            })
    }

    // ── submission ───────────────────────────────────────────────

    #[test]
    fn test_basic_insert() {
        let session = Session::new();
        let a = session.attach();
        let committed = session.submit(a, 0, insert("hello")).unwrap();
        assert_eq!(committed, 1);
        assert_eq!(session.revision(), 1);
        assert_eq!(session.text(), "hello");
    }

    #[test]
    fn test_revisions_increase_by_one() {
        let session = Session::new();
        let a = session.attach();
        for expected in 1..=10 {
            let committed = session
                .submit(a, expected - 1, op(|o| {
                    o.retain(expected - 1);
                    o.insert("x");
                }))
                .unwrap();
            assert_eq!(committed, expected);
        }
        assert_eq!(session.text(), "x".repeat(10));
    }

    #[test]
    fn test_concurrent_inserts_first_committed_wins_tie() {
        // A and B both edit revision 0; A lands first, B rebases after it
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        session.submit(a, 0, insert("X")).unwrap();
        session.submit(b, 0, insert("Y")).unwrap();
        assert_eq!(session.text(), "XY");
        assert_eq!(session.revision(), 2);
    }

    #[test]
    fn test_insert_rebased_over_concurrent_delete() {
        // base "abcdef" at revision 1; A deletes "def", B inserts "X" at 3
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        session.submit(a, 0, insert("abcdef")).unwrap();
        session
            .submit(a, 1, op(|o| {
                o.retain(3);
                o.delete(3);
            }))
            .unwrap();
        session
            .submit(b, 1, op(|o| {
                o.retain(3);
                o.insert("X");
                o.retain(3);
            }))
            .unwrap();
        assert_eq!(session.text(), "abcX");
    }

    #[test]
    fn test_log_fold_matches_text() {
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        session.submit(a, 0, insert("hello")).unwrap();
        session.submit(b, 0, insert("world ")).unwrap();
        session
            .submit(a, 1, op(|o| {
                o.retain(5);
                o.insert("!");
            }))
            .unwrap();
        assert_eq!(fold(&session), session.text());
    }

    #[test]
    fn test_revision_ahead_rejected() {
        let session = Session::new();
        let a = session.attach();
        let result = session.submit(a, 5, insert("x"));
        assert!(matches!(result, Err(SessionError::RevisionAhead { .. })));
        assert_eq!(session.revision(), 0);
    }

    #[test]
    fn test_wrong_base_len_rejected() {
        let session = Session::new();
        let a = session.attach();
        session.submit(a, 0, insert("hello")).unwrap();
        // claims parent revision 1 but was built against an empty doc
        let result = session.submit(a, 1, insert("x"));
        assert!(matches!(
            result,
            Err(SessionError::InvalidOperation(OtError::LengthMismatch { .. }))
        ));
        // the log is untouched by the rejection
        assert_eq!(session.revision(), 1);
        assert_eq!(session.text(), "hello");
    }

    #[test]
    fn test_unknown_participant_rejected() {
        let session = Session::new();
        let result = session.submit(99, 0, insert("x"));
        assert!(matches!(result, Err(SessionError::UnknownParticipant(99))));
        let a = session.attach();
        session.detach(a);
        let result = session.submit(a, 0, insert("x"));
        assert!(matches!(result, Err(SessionError::UnknownParticipant(_))));
    }

    // ── participants & presence ──────────────────────────────────

    #[test]
    fn test_participant_ids_unique_and_not_reused() {
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        assert_ne!(a, b);
        session.detach(a);
        let c = session.attach();
        assert_ne!(c, a);
        assert_ne!(c, b);
    }

    #[test]
    fn test_set_info_rejects_out_of_range_hue() {
        let session = Session::new();
        let a = session.attach();
        let result = session.set_info(a, UserInfo { name: "Ada".into(), hue: 360 });
        assert!(matches!(result, Err(SessionError::InvalidHue(360))));
        session
            .set_info(a, UserInfo { name: "Ada".into(), hue: 359 })
            .unwrap();
    }

    #[test]
    fn test_delta_carries_roster_to_new_watermark() {
        let session = Session::new();
        let a = session.attach();
        session
            .set_info(a, UserInfo { name: "Ada".into(), hue: 10 })
            .unwrap();

        let b = session.attach();
        let mut watermark = Watermark::default();
        let messages = session.delta_since(b, &mut watermark);
        assert!(messages.iter().any(|message| matches!(
            message,
            ServerMessage::UserInfo { id, info: Some(info) } if *id == a && info.name == "Ada"
        )));

        // nothing new: the delta is empty and the watermark is stable
        assert!(session.delta_since(b, &mut watermark).is_empty());
    }

    #[test]
    fn test_delta_announces_departures() {
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        let mut watermark = Watermark::default();
        session.delta_since(b, &mut watermark);

        session.detach(a);
        let messages = session.delta_since(b, &mut watermark);
        assert!(messages
            .iter()
            .any(|message| matches!(message, ServerMessage::UserInfo { id, info: None } if *id == a)));
    }

    #[test]
    fn test_delta_includes_own_echo() {
        let session = Session::new();
        let a = session.attach();
        let mut watermark = Watermark::default();
        session.delta_since(a, &mut watermark);

        session.submit(a, 0, insert("hi")).unwrap();
        let messages = session.delta_since(a, &mut watermark);
        match &messages[..] {
            [ServerMessage::History { start, operations }] => {
                assert_eq!(*start, 0);
                assert_eq!(operations.len(), 1);
                assert_eq!(operations[0].id, a);
            }
            other => panic!("expected one History echo, got {other:?}"),
        }
        assert_eq!(watermark.revision, 1);
    }

    #[test]
    fn test_delta_skips_own_cursor() {
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        session
            .update_cursor(a, CursorData { cursors: vec![0], selections: vec![] }, 0)
            .unwrap();

        let mut own = Watermark::default();
        assert!(!session
            .delta_since(a, &mut own)
            .iter()
            .any(|message| matches!(message, ServerMessage::UserCursor { .. })));

        let mut other = Watermark::default();
        assert!(session
            .delta_since(b, &mut other)
            .iter()
            .any(|message| matches!(message, ServerMessage::UserCursor { id, .. } if *id == a)));
    }

    #[test]
    fn test_language_change_reaches_new_watermarks() {
        let session = Session::new();
        let a = session.attach();
        session.set_language("rust".into());
        let mut watermark = Watermark::default();
        let messages = session.delta_since(a, &mut watermark);
        assert!(messages
            .iter()
            .any(|message| matches!(message, ServerMessage::Language(tag) if tag == "rust")));
    }

    // ── cursors ──────────────────────────────────────────────────

    #[test]
    fn test_cursor_transported_from_reporting_revision() {
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        session.submit(a, 0, insert("hello world")).unwrap();

        // B inserts "!!" at 0 (revision 2); A's cursor was reported at 1
        session
            .submit(b, 1, op(|o| {
                o.insert("!!");
                o.retain(11);
            }))
            .unwrap();
        session
            .update_cursor(a, CursorData { cursors: vec![5], selections: vec![] }, 1)
            .unwrap();

        let mut watermark = Watermark::default();
        let messages = session.delta_since(b, &mut watermark);
        let cursor = messages
            .iter()
            .find_map(|message| match message {
                ServerMessage::UserCursor { id, data } if *id == a => Some(data.clone()),
                _ => None,
            })
            .expect("cursor broadcast");
        assert_eq!(cursor.cursors, vec![7]);
    }

    #[test]
    fn test_stored_cursor_follows_later_operations() {
        let session = Session::new();
        let a = session.attach();
        let b = session.attach();
        session.submit(a, 0, insert("hello world")).unwrap();
        session
            .update_cursor(a, CursorData { cursors: vec![5], selections: vec![] }, 1)
            .unwrap();

        // an insert at exactly 5 leaves the stored cursor in place
        session
            .submit(b, 1, op(|o| {
                o.retain(5);
                o.insert("x");
                o.retain(6);
            }))
            .unwrap();
        let mut watermark = Watermark::default();
        let cursor = session
            .delta_since(b, &mut watermark)
            .into_iter()
            .find_map(|message| match message {
                ServerMessage::UserCursor { id, data } if id == a => Some(data),
                _ => None,
            })
            .expect("cursor broadcast");
        assert_eq!(cursor.cursors, vec![5]);
    }

    // ── seeding, compaction, lifecycle ───────────────────────────

    #[test]
    fn test_snapshot_seed_is_revision_one() {
        let session = Session::from_snapshot("stored text".into(), Some("md".into()));
        assert_eq!(session.revision(), 1);
        assert_eq!(session.text(), "stored text");
        assert_eq!(fold(&session), "stored text");

        let a = session.attach();
        let mut watermark = Watermark::default();
        let messages = session.delta_since(a, &mut watermark);
        assert!(messages
            .iter()
            .any(|message| matches!(message, ServerMessage::Language(tag) if tag == "md")));
        assert!(messages
            .iter()
            .any(|message| matches!(message, ServerMessage::History { start: 0, .. })));
    }

    #[test]
    fn test_empty_snapshot_stays_at_revision_zero() {
        let session = Session::from_snapshot(String::new(), None);
        assert_eq!(session.revision(), 0);
        assert_eq!(session.text(), "");
    }

    #[test]
    fn test_compact_waits_for_acks() {
        let session = Session::new();
        let a = session.attach();
        session.submit(a, 0, insert("one ")).unwrap();
        session.submit(a, 1, op(|o| {
            o.retain(4);
            o.insert("two");
        }))
        .unwrap();

        assert!(!session.compact()); // A has acked nothing yet

        session.record_ack(a, session.revision());
        assert!(session.compact());
        assert_eq!(session.revision(), 1);
        assert_eq!(session.text(), "one two");
        assert_eq!(fold(&session), "one two");
    }

    #[test]
    fn test_compact_skips_trivial_logs() {
        let session = Session::new();
        assert!(!session.compact());
        let a = session.attach();
        session.submit(a, 0, insert("x")).unwrap();
        session.record_ack(a, 1);
        assert!(!session.compact());
    }

    #[test]
    fn test_quiescence_tracks_roster() {
        let session = Session::new();
        assert!(session.quiescent_for(std::time::Duration::ZERO));
        let a = session.attach();
        assert!(!session.quiescent_for(std::time::Duration::ZERO));
        session.detach(a);
        assert!(session.quiescent_for(std::time::Duration::ZERO));
    }

    #[test]
    fn test_kill_is_sticky() {
        let session = Session::new();
        assert!(!session.killed());
        session.kill();
        assert!(session.killed());
    }

    #[test]
    fn test_stats_counters() {
        let session = Session::new();
        let a = session.attach();
        session.submit(a, 0, insert("hello")).unwrap();
        let stats = session.stats();
        assert_eq!(stats.participants, 1);
        assert_eq!(stats.revision, 1);
        assert_eq!(stats.logged_bytes, 5);
    }
}
