//! Record storage behind the session lifecycle.
//!
//! The engine only needs lookups by session id, so the contract is a small
//! trait. Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local maps, used by tests and one-shot runs.
//! - [`JsonDirStore`]: one directory per session under a root directory.
//!
//! # JSON directory layout
//!
//! ```text
//! <root>/<session_id>/
//!     session.json          SessionState, replaced atomically on save
//!     patterns.jsonl        one OscillationPatternRecord per line
//!     conversations.jsonl   one ConversationRecord per line
//! ```

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::pattern::{ConversationRecord, OscillationPatternRecord};
use crate::session::SessionState;

const SESSION_FILE: &str = "session.json";
const PATTERNS_FILE: &str = "patterns.jsonl";
const CONVERSATIONS_FILE: &str = "conversations.jsonl";

/// Records read back for one session.
///
/// `malformed` counts stored entries inside the lookup window that could not
/// be decoded. They are not in `records`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecords<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

impl<T> StoredRecords<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            malformed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T> Default for StoredRecords<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Persistent record storage keyed by session id.
///
/// Lookups cover the most recent `limit` stored entries in insertion order.
/// An unknown session yields `Ok(None)` or an empty batch, not an error.
pub trait OscillationStore {
    fn load_session(&self, session_id: &str) -> Result<Option<SessionState>, StoreError>;

    fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError>;

    fn patterns_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<StoredRecords<OscillationPatternRecord>, StoreError>;

    fn conversations_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<StoredRecords<ConversationRecord>, StoreError>;

    fn save_pattern(&mut self, record: &OscillationPatternRecord) -> Result<(), StoreError>;

    fn save_conversation(&mut self, record: &ConversationRecord) -> Result<(), StoreError>;
}

fn tail<T: Clone>(records: &[T], limit: usize) -> StoredRecords<T> {
    StoredRecords::new(records[records.len().saturating_sub(limit)..].to_vec())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    sessions: HashMap<String, SessionState>,
    patterns: HashMap<String, Vec<OscillationPatternRecord>>,
    conversations: HashMap<String, Vec<ConversationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OscillationStore for MemoryStore {
    fn load_session(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        Ok(self.sessions.get(session_id).cloned())
    }

    fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError> {
        self.sessions.insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    fn patterns_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<StoredRecords<OscillationPatternRecord>, StoreError> {
        Ok(self
            .patterns
            .get(session_id)
            .map(|r| tail(r, limit))
            .unwrap_or_default())
    }

    fn conversations_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<StoredRecords<ConversationRecord>, StoreError> {
        Ok(self
            .conversations
            .get(session_id)
            .map(|r| tail(r, limit))
            .unwrap_or_default())
    }

    fn save_pattern(&mut self, record: &OscillationPatternRecord) -> Result<(), StoreError> {
        self.patterns
            .entry(record.session_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn save_conversation(&mut self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.conversations
            .entry(record.session_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON directory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids of every session with a saved `session.json`, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().join(SESSION_FILE).is_file() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn session_dir(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        validate_session_id(session_id)?;
        Ok(self.root.join(session_id))
    }

    fn append_line<T: Serialize>(&self, session_id: &str, file: &str, record: &T) -> Result<(), StoreError> {
        let dir = self.session_dir(session_id)?;
        fs::create_dir_all(&dir)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(file))?;
        f.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Decode the last `limit` non-empty lines of `file`. Lines that fail to
    /// decode are counted, not returned.
    fn read_lines<T: DeserializeOwned>(
        &self,
        session_id: &str,
        file: &str,
        limit: usize,
    ) -> Result<StoredRecords<T>, StoreError> {
        let path = self.session_dir(session_id)?.join(file);
        if !path.exists() {
            return Ok(StoredRecords::default());
        }
        let reader = BufReader::new(fs::File::open(&path)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        let window = lines.split_off(lines.len().saturating_sub(limit));

        let mut batch = StoredRecords::default();
        let mut first_error = None;
        for line in &window {
            match serde_json::from_str(line) {
                Ok(r) => batch.records.push(r),
                Err(e) => {
                    batch.malformed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            debug!("{}: {} malformed records, first: {e}", path.display(), batch.malformed);
        }
        Ok(batch)
    }
}

/// Session ids become directory names, so only `[A-Za-z0-9_.-]` is allowed
/// and the id may not be `.` or `..`.
fn validate_session_id(session_id: &str) -> Result<(), StoreError> {
    let ok = !session_id.is_empty()
        && session_id != "."
        && session_id != ".."
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}

impl OscillationStore for JsonDirStore {
    fn load_session(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        let path = self.session_dir(session_id)?.join(SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn save_session(&mut self, state: &SessionState) -> Result<(), StoreError> {
        let dir = self.session_dir(&state.session_id)?;
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(state)?;
        let tmp = dir.join(format!("{SESSION_FILE}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, dir.join(SESSION_FILE))?;
        debug!("saved session {} to {}", state.session_id, dir.display());
        Ok(())
    }

    fn patterns_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<StoredRecords<OscillationPatternRecord>, StoreError> {
        self.read_lines(session_id, PATTERNS_FILE, limit)
    }

    fn conversations_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<StoredRecords<ConversationRecord>, StoreError> {
        self.read_lines(session_id, CONVERSATIONS_FILE, limit)
    }

    fn save_pattern(&mut self, record: &OscillationPatternRecord) -> Result<(), StoreError> {
        self.append_line(&record.session_id, PATTERNS_FILE, record)
    }

    fn save_conversation(&mut self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.append_line(&record.session_id, CONVERSATIONS_FILE, record)
    }
}
