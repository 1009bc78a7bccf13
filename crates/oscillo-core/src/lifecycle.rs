//! Per-session oscillation lifecycle.
//!
//! [`OscillationEngine`] owns the entropy source, the pink noise generator and
//! one [`OscillationBuffer`] per session. It seeds buffers on session start,
//! rebuilds them from stored records on resume, tops them up before metrics
//! are computed and appends a value for every pattern or conversation event.
//!
//! Store failures never abort a lifecycle step: they are logged and treated as
//! "nothing recovered". Only caller mistakes (unknown session, mismatched
//! snapshot shape) surface as errors.
//!
//! The engine is not synchronized. One logical writer per session is assumed;
//! multi-threaded hosts wrap the whole engine in a `Mutex`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::buffer::{OscillationBuffer, OscillationSnapshot};
use crate::config::EngineConfig;
use crate::entropy::{EntropyQuality, EntropySource, EntropyStatus};
use crate::error::{OscillationError, Result};
use crate::metrics::{OscillationMetrics, compute_metrics, finite_or_zero};
use crate::pattern::{ConversationRecord, MAX_PATTERN_HISTORY, OscillationPattern};
use crate::pink_noise::PinkNoiseGenerator;
use crate::session::{SessionState, SessionUpdate, new_session_id};
use crate::store::{OscillationStore, StoredRecords};
use crate::timestamp::parse_iso8601;

/// Hard cap re-applied to a session buffer after every pattern event.
pub const MAX_SESSION_SAMPLES: usize = 1000;

/// Length of the history generated for an entropy-enabled pattern.
const ENHANCED_HISTORY_LEN: usize = 20;
/// Amplitude of the default conversation oscillation value.
const CONVERSATION_AMPLITUDE: f64 = 0.05;

// ---------------------------------------------------------------------------
// Restore report
// ---------------------------------------------------------------------------

/// Kind of problem met while rebuilding a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreFailure {
    /// The store could not be queried.
    StoreUnavailable,
    /// Values and timestamps of different lengths.
    ShapeMismatch,
    /// A stored record that could not be decoded, or a record or snapshot
    /// timestamp that is not ISO-8601.
    ParseError,
}

impl fmt::Display for RestoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StoreUnavailable => "store unavailable",
            Self::ShapeMismatch => "shape mismatch",
            Self::ParseError => "parse error",
        })
    }
}

/// Outcome of rebuilding a session buffer: "recovered N of M".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestoreReport {
    pub session_id: String,
    /// Values found in stored records or the snapshot. An undecodable stored
    /// record counts as one.
    pub attempted: usize,
    /// Values that made it into the buffer.
    pub recovered: usize,
    /// Thermal draws added to reach the minimum sample count.
    pub synthesized: usize,
    /// Occurrences of each failure kind.
    pub failures: BTreeMap<RestoreFailure, usize>,
}

impl RestoreReport {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            ..Default::default()
        }
    }

    /// Count a failure, logging only its first occurrence per kind.
    fn note(&mut self, kind: RestoreFailure, detail: &dyn fmt::Display) {
        self.note_many(kind, 1, detail);
    }

    fn note_many(&mut self, kind: RestoreFailure, n: usize, detail: &dyn fmt::Display) {
        if n == 0 {
            return;
        }
        let count = self.failures.entry(kind).or_insert(0);
        if *count == 0 {
            warn!("restoring session {}: {kind}: {detail}", self.session_id);
        }
        *count += n;
    }

    /// Account for stored records the store could not decode.
    fn note_malformed(&mut self, n: usize, what: &str) {
        self.attempted += n;
        self.note_many(
            RestoreFailure::ParseError,
            n,
            &format!("{n} undecodable {what} records"),
        );
    }

    pub fn failure_count(&self, kind: RestoreFailure) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RestoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recovered {} of {} values for session {} ({} synthesized)",
            self.recovered, self.attempted, self.session_id, self.synthesized
        )?;
        for (kind, n) in &self.failures {
            write!(f, ", {n} × {kind}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct OscillationEngine {
    config: EngineConfig,
    entropy: EntropySource,
    pink: PinkNoiseGenerator,
    store: Box<dyn OscillationStore + Send>,
    buffers: HashMap<String, OscillationBuffer>,
    sessions: HashMap<String, SessionState>,
}

impl OscillationEngine {
    /// Engine with an entropy source built from `config`.
    pub fn new(config: EngineConfig, store: Box<dyn OscillationStore + Send>) -> Self {
        let config = config.normalized();
        let entropy = EntropySource::from_config(&config);
        Self::with_entropy(config, entropy, store)
    }

    /// Engine around an existing entropy source.
    pub fn with_entropy(
        config: EngineConfig,
        mut entropy: EntropySource,
        store: Box<dyn OscillationStore + Send>,
    ) -> Self {
        let config = config.normalized();
        let pink = PinkNoiseGenerator::from_config(&mut entropy, &config);
        Self {
            config,
            entropy,
            pink,
            store,
            buffers: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn OscillationStore {
        self.store.as_ref()
    }

    pub fn entropy_mut(&mut self) -> &mut EntropySource {
        &mut self.entropy
    }

    pub fn entropy_quality(&self) -> EntropyQuality {
        self.entropy.assess_entropy_quality()
    }

    pub fn entropy_status(&mut self, samples: usize) -> EntropyStatus {
        self.entropy.entropy_status(samples)
    }

    pub fn session(&self, session_id: &str) -> Option<&SessionState> {
        self.sessions.get(session_id)
    }

    pub fn buffer(&self, session_id: &str) -> Option<&OscillationBuffer> {
        self.buffers.get(session_id)
    }

    /// Ids of sessions with an in-memory buffer, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.buffers.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn buffer_mut(&mut self, session_id: &str) -> Result<&mut OscillationBuffer> {
        self.buffers
            .get_mut(session_id)
            .ok_or_else(|| OscillationError::SessionNotFound(session_id.to_string()))
    }

    fn persist_session(&mut self, session_id: &str) {
        let Some(state) = self.sessions.get(session_id) else {
            return;
        };
        if let Err(e) = self.store.save_session(state) {
            warn!("could not save session {session_id}: {e}");
        }
    }

    /// One blended sample: `thermal_weight`·thermal(amplitude) plus the rest pink.
    fn blended_sample(&mut self, amplitude: f64, thermal_weight: f64) -> f64 {
        let thermal = self.entropy.get_thermal_oscillation(amplitude);
        let pink = self.pink.generate(&mut self.entropy);
        finite_or_zero(thermal * thermal_weight + pink * (1.0 - thermal_weight))
    }

    // -----------------------------------------------------------------------
    // Session start / resume
    // -----------------------------------------------------------------------

    /// Create a session for `character_id` with a freshly seeded buffer.
    pub fn start_session(&mut self, character_id: &str) -> String {
        let session_id = new_session_id();
        self.sessions
            .insert(session_id.clone(), SessionState::new(&session_id, character_id));
        self.persist_session(&session_id);
        self.create_buffer(&session_id);
        info!("started session {session_id} for character {character_id}");
        session_id
    }

    /// Replace the session's buffer with `min_samples` thermal draws.
    pub fn create_buffer(&mut self, session_id: &str) {
        let mut buffer = OscillationBuffer::new(self.config.buffer_capacity);
        let now = Utc::now();
        for _ in 0..self.config.min_samples {
            let v = self.entropy.get_thermal_oscillation(self.config.seed_amplitude);
            buffer.add(v, Some(now));
        }
        debug!("seeded session {session_id} with {} values", buffer.len());
        self.buffers.insert(session_id.to_string(), buffer);
    }

    /// Reactivate a stored session and rebuild its buffer from stored records.
    ///
    /// Fails with `SessionNotFound` only when the store positively has no
    /// such session and it is not known in memory. An unreachable store is
    /// logged and the session resumes with synthesized data.
    pub fn resume_session(&mut self, session_id: &str) -> Result<RestoreReport> {
        match self.store.load_session(session_id) {
            Ok(Some(state)) => {
                self.sessions.insert(session_id.to_string(), state);
            }
            Ok(None) if self.sessions.contains_key(session_id) => {}
            Ok(None) => return Err(OscillationError::SessionNotFound(session_id.to_string())),
            Err(e) => {
                warn!("could not load session {session_id}: {e}");
                self.sessions
                    .entry(session_id.to_string())
                    .or_insert_with(|| SessionState::new(session_id, ""));
            }
        }
        if let Some(state) = self.sessions.get_mut(session_id) {
            state.reactivate();
        }
        self.persist_session(session_id);

        let report = self.restore_buffer(session_id);
        info!("resumed session: {report}");
        Ok(report)
    }

    /// Rebuild the session's buffer from stored pattern histories and
    /// conversation values, overwriting any in-memory buffer.
    pub fn restore_buffer(&mut self, session_id: &str) -> RestoreReport {
        let mut report = RestoreReport::new(session_id);
        let limit = self.config.restore_record_limit;
        let mut merged: Vec<(DateTime<Utc>, f64)> = Vec::new();

        let patterns = self
            .store
            .patterns_for_session(session_id, limit)
            .unwrap_or_else(|e| {
                report.note(RestoreFailure::StoreUnavailable, &e);
                StoredRecords::default()
            });
        report.note_malformed(patterns.malformed, "pattern");
        for record in &patterns.records {
            report.attempted += record.history.len();
            match parse_iso8601(&record.timestamp) {
                Ok(ts) => merged.extend(record.history.iter().map(|&v| (ts, finite_or_zero(v)))),
                Err(e) => report.note(RestoreFailure::ParseError, &e),
            }
        }

        let conversations = self
            .store
            .conversations_for_session(session_id, limit)
            .unwrap_or_else(|e| {
                report.note(RestoreFailure::StoreUnavailable, &e);
                StoredRecords::default()
            });
        report.note_malformed(conversations.malformed, "conversation");
        for record in &conversations.records {
            report.attempted += 1;
            match parse_iso8601(&record.timestamp) {
                Ok(ts) => merged.push((ts, finite_or_zero(record.oscillation_value))),
                Err(e) => report.note(RestoreFailure::ParseError, &e),
            }
        }

        self.install_restored(session_id, merged, report)
    }

    /// Rebuild the session's buffer from an exported snapshot.
    ///
    /// A values/timestamps length mismatch is rejected outright. Individual
    /// unparseable timestamps drop their sample and are counted.
    pub fn restore_from_snapshot(
        &mut self,
        session_id: &str,
        snapshot: &OscillationSnapshot,
    ) -> Result<RestoreReport> {
        if snapshot.values.len() != snapshot.timestamps.len() {
            let mut report = RestoreReport::new(session_id);
            let err = OscillationError::shape_mismatch(snapshot.values.len(), snapshot.timestamps.len());
            report.note(RestoreFailure::ShapeMismatch, &err);
            return Err(err);
        }
        let mut report = RestoreReport::new(session_id);
        report.attempted = snapshot.len();
        let mut merged = Vec::with_capacity(snapshot.len());
        for (&v, ts) in snapshot.values.iter().zip(&snapshot.timestamps) {
            match parse_iso8601(ts) {
                Ok(ts) => merged.push((ts, finite_or_zero(v))),
                Err(e) => report.note(RestoreFailure::ParseError, &e),
            }
        }
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id, ""));
        Ok(self.install_restored(session_id, merged, report))
    }

    fn install_restored(
        &mut self,
        session_id: &str,
        mut merged: Vec<(DateTime<Utc>, f64)>,
        mut report: RestoreReport,
    ) -> RestoreReport {
        merged.sort_by(|a, b| a.0.cmp(&b.0));

        let mut buffer = OscillationBuffer::new(self.config.buffer_capacity);
        for &(ts, v) in &merged {
            buffer.add(v, Some(ts));
        }
        report.recovered = buffer.len();

        let shortage = self.config.min_samples.saturating_sub(buffer.len());
        if shortage > 0 {
            info!("session {session_id}: only {} values recovered, synthesizing {shortage}", buffer.len());
            let now = Utc::now();
            for _ in 0..shortage {
                let v = self.entropy.get_thermal_oscillation(self.config.seed_amplitude);
                buffer.add(v, Some(now));
            }
            report.synthesized = shortage;
        }
        buffer.sort_by_timestamp();

        for (kind, n) in &report.failures {
            if *n > 1 {
                debug!("session {session_id}: {n} × {kind} while restoring");
            }
        }
        self.buffers.insert(session_id.to_string(), buffer);
        report
    }

    // -----------------------------------------------------------------------
    // Buffer maintenance
    // -----------------------------------------------------------------------

    /// Top the buffer up to `min_samples` with blended thermal/pink draws.
    /// Returns the number of samples added.
    pub fn ensure_sufficient(&mut self, session_id: &str, min_samples: usize) -> Result<usize> {
        let len = self.buffer_mut(session_id)?.len();
        let shortage = min_samples.saturating_sub(len);
        if shortage == 0 {
            return Ok(0);
        }
        info!("supplementing {shortage} samples for session {session_id}");
        let amplitude = self.config.seed_amplitude;
        let values: Vec<f64> = (0..shortage)
            .map(|_| self.blended_sample(amplitude, 0.7))
            .collect();
        let buffer = self.buffer_mut(session_id)?;
        let now = Utc::now();
        for v in values {
            buffer.add(v, Some(now));
        }
        Ok(shortage)
    }

    /// Append the values a pattern event contributes. Returns how many.
    pub fn on_pattern_event(&mut self, session_id: &str, pattern: &OscillationPattern) -> Result<usize> {
        self.buffer_mut(session_id)?;
        let values: Vec<f64> = if pattern.secure_entropy_enabled {
            vec![self.blended_sample(pattern.amplitude, 0.3)]
        } else if !pattern.history.is_empty() {
            pattern.history.clone()
        } else {
            vec![self.entropy.get_thermal_oscillation(pattern.amplitude)]
        };

        let buffer = self.buffer_mut(session_id)?;
        for &v in &values {
            buffer.add(v, Some(pattern.timestamp));
        }
        buffer.truncate_front_to(MAX_SESSION_SAMPLES);
        debug!("session {session_id}: {} values after pattern event", buffer.len());
        Ok(values.len())
    }

    /// Record a pattern: attach the entropy quality snapshot, generate its
    /// history when entropy is enabled, persist it and apply it to the buffer.
    pub fn add_oscillation_pattern(
        &mut self,
        session_id: &str,
        mut pattern: OscillationPattern,
    ) -> Result<OscillationPattern> {
        self.buffer_mut(session_id)?;
        pattern.entropy_source_info = serde_json::to_value(self.entropy.assess_entropy_quality()).ok();

        if pattern.secure_entropy_enabled {
            pattern.history.clear();
            for _ in 0..ENHANCED_HISTORY_LEN {
                let v = self.blended_sample(pattern.amplitude, 0.6);
                pattern.add_to_history(v, MAX_PATTERN_HISTORY);
            }
        }

        if let Err(e) = self.store.save_pattern(&pattern.to_record(session_id)) {
            warn!("could not save pattern for session {session_id}: {e}");
        }
        self.on_pattern_event(session_id, &pattern)?;
        Ok(pattern)
    }

    /// Record a conversation turn carrying `oscillation_value` (a small
    /// thermal draw when `None`). Returns the value appended.
    pub fn record_conversation(&mut self, session_id: &str, oscillation_value: Option<f64>) -> Result<f64> {
        self.buffer_mut(session_id)?;
        let value = match oscillation_value {
            Some(v) => finite_or_zero(v),
            None => self.entropy.get_thermal_oscillation(CONVERSATION_AMPLITUDE),
        };
        let now = Utc::now();
        if let Err(e) = self.store.save_conversation(&ConversationRecord::new(session_id, value, now)) {
            warn!("could not save conversation for session {session_id}: {e}");
        }
        self.buffer_mut(session_id)?.add(value, Some(now));

        if let Some(state) = self.sessions.get_mut(session_id) {
            state.update_interaction();
            self.persist_session(session_id);
        }
        Ok(value)
    }

    /// Top up to the configured minimum, then compute metrics with the
    /// current entropy quality attached.
    pub fn metrics(&mut self, session_id: &str) -> Result<OscillationMetrics> {
        self.ensure_sufficient(session_id, self.config.min_samples)?;
        let quality = self.entropy.assess_entropy_quality();
        let values = self.buffer_mut(session_id)?.values();
        Ok(compute_metrics(&values, Some(&quality)))
    }

    /// Store-ready snapshot of the session's buffer.
    pub fn export(&self, session_id: &str) -> Result<OscillationSnapshot> {
        self.buffers
            .get(session_id)
            .map(OscillationBuffer::to_snapshot)
            .ok_or_else(|| OscillationError::SessionNotFound(session_id.to_string()))
    }

    /// Empty the session's buffer without discarding it.
    pub fn clear_buffer(&mut self, session_id: &str) -> Result<()> {
        self.buffer_mut(session_id)?.clear();
        Ok(())
    }

    /// Merge `update` into the session state and persist it.
    pub fn update_session(&mut self, session_id: &str, update: &SessionUpdate) -> Result<SessionState> {
        if !self.sessions.contains_key(session_id) {
            let state = self
                .store
                .load_session(session_id)?
                .ok_or_else(|| OscillationError::SessionNotFound(session_id.to_string()))?;
            self.sessions.insert(session_id.to_string(), state);
        }
        let state = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| OscillationError::SessionNotFound(session_id.to_string()))?;
        state.apply(update);
        let state = state.clone();
        self.store.save_session(&state)?;
        Ok(state)
    }

    /// Discard the session's buffer and mark it inactive.
    pub fn end_session(&mut self, session_id: &str) -> Result<()> {
        let had_buffer = self.buffers.remove(session_id).is_some();
        match self.sessions.get_mut(session_id) {
            Some(state) => {
                state.update_duration();
                state.deactivate();
            }
            None if had_buffer => {}
            None => return Err(OscillationError::SessionNotFound(session_id.to_string())),
        }
        self.persist_session(session_id);
        self.sessions.remove(session_id);
        info!("ended session {session_id}");
        Ok(())
    }

    /// Discard every in-memory session and restart the pink noise generator.
    pub fn reset(&mut self) {
        self.buffers.clear();
        self.sessions.clear();
        self.pink.reset(&mut self.entropy);
        info!("engine reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::metrics::DataLevel;
    use crate::pattern::OscillationPatternRecord;
    use crate::store::{JsonDirStore, MemoryStore};

    fn engine() -> OscillationEngine {
        engine_with(MemoryStore::new())
    }

    fn engine_with<S: OscillationStore + Send + 'static>(store: S) -> OscillationEngine {
        let config = EngineConfig {
            entropy_buffer_size: 128,
            ..Default::default()
        };
        OscillationEngine::new(config, Box::new(store))
    }

    /// Store whose every call fails.
    struct DownStore;

    impl OscillationStore for DownStore {
        fn load_session(&self, _: &str) -> std::result::Result<Option<SessionState>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn save_session(&mut self, _: &SessionState) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn patterns_for_session(
            &self,
            _: &str,
            _: usize,
        ) -> std::result::Result<StoredRecords<OscillationPatternRecord>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn conversations_for_session(
            &self,
            _: &str,
            _: usize,
        ) -> std::result::Result<StoredRecords<ConversationRecord>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn save_pattern(&mut self, _: &OscillationPatternRecord) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn save_conversation(&mut self, _: &ConversationRecord) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[test]
    fn test_start_session_seeds_five() {
        let mut e = engine();
        let id = e.start_session("alice");
        let buffer = e.buffer(&id).unwrap();
        assert_eq!(buffer.len(), 5);
        assert!(buffer.values().iter().all(|v| v.abs() <= 0.15));
        assert!(e.store().load_session(&id).unwrap().is_some());
    }

    #[test]
    fn test_ensure_sufficient() {
        let mut e = engine();
        let id = e.start_session("alice");
        e.clear_buffer(&id).unwrap();
        assert_eq!(e.ensure_sufficient(&id, 5).unwrap(), 5);
        assert_eq!(e.buffer(&id).unwrap().len(), 5);
        e.record_conversation(&id, Some(0.1)).unwrap();
        e.record_conversation(&id, Some(0.2)).unwrap();
        assert_eq!(e.ensure_sufficient(&id, 5).unwrap(), 0);
        assert_eq!(e.buffer(&id).unwrap().len(), 7);
    }

    #[test]
    fn test_unknown_session_errors() {
        let mut e = engine();
        assert!(matches!(
            e.ensure_sufficient("nope", 5),
            Err(OscillationError::SessionNotFound(_))
        ));
        assert!(e.export("nope").is_err());
        assert!(e.metrics("nope").is_err());
        assert!(e.resume_session("nope").is_err());
        assert!(e.end_session("nope").is_err());
    }

    #[test]
    fn test_pattern_event_branches() {
        let mut e = engine();
        let id = e.start_session("alice");

        let entropy_pattern = OscillationPattern::default();
        assert_eq!(e.on_pattern_event(&id, &entropy_pattern).unwrap(), 1);

        let literal = OscillationPattern {
            secure_entropy_enabled: false,
            history: vec![0.11, 0.22, 0.33],
            ..Default::default()
        };
        assert_eq!(e.on_pattern_event(&id, &literal).unwrap(), 3);
        assert_eq!(e.buffer(&id).unwrap().get_recent(3), vec![0.11, 0.22, 0.33]);

        let bare = OscillationPattern {
            secure_entropy_enabled: false,
            ..Default::default()
        };
        assert_eq!(e.on_pattern_event(&id, &bare).unwrap(), 1);
        assert_eq!(e.buffer(&id).unwrap().len(), 10);
    }

    #[test]
    fn test_pattern_event_cap() {
        let mut e = engine();
        let id = e.start_session("alice");
        let big = OscillationPattern {
            secure_entropy_enabled: false,
            history: vec![0.5; 1200],
            ..Default::default()
        };
        e.on_pattern_event(&id, &big).unwrap();
        assert_eq!(e.buffer(&id).unwrap().len(), MAX_SESSION_SAMPLES);
    }

    #[test]
    fn test_add_pattern_generates_and_persists() {
        let mut e = engine();
        let id = e.start_session("alice");
        let p = e.add_oscillation_pattern(&id, OscillationPattern::default()).unwrap();
        assert_eq!(p.history.len(), 20);
        assert!(p.entropy_source_info.is_some());
        assert_eq!(e.store().patterns_for_session(&id, 50).unwrap().len(), 1);
        assert_eq!(e.buffer(&id).unwrap().len(), 6);
    }

    #[test]
    fn test_record_conversation() {
        let mut e = engine();
        let id = e.start_session("alice");
        let v = e.record_conversation(&id, None).unwrap();
        assert!(v.abs() <= 0.025);
        assert_eq!(e.session(&id).unwrap().interaction_count, 1);
        assert_eq!(e.store().conversations_for_session(&id, 50).unwrap().len(), 1);
        assert_eq!(e.buffer(&id).unwrap().get_recent(1), vec![v]);
    }

    #[test]
    fn test_resume_from_store() {
        let mut e = engine();
        let id = e.start_session("alice");
        for i in 0..4 {
            e.record_conversation(&id, Some(i as f64 * 0.1)).unwrap();
        }
        let literal = OscillationPattern {
            secure_entropy_enabled: false,
            history: vec![0.7, 0.8],
            ..Default::default()
        };
        e.add_oscillation_pattern(&id, literal).unwrap();
        e.clear_buffer(&id).unwrap();

        let report = e.resume_session(&id).unwrap();
        assert_eq!(report.attempted, 6);
        assert_eq!(report.recovered, 6);
        assert_eq!(report.synthesized, 0);
        assert!(report.is_clean());
        let ts = e.buffer(&id).unwrap().timestamps();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        assert!(e.session(&id).unwrap().active);
    }

    #[test]
    fn test_resume_pads_to_minimum() {
        let mut e = engine();
        let id = e.start_session("alice");
        e.record_conversation(&id, Some(0.4)).unwrap();
        let report = e.resume_session(&id).unwrap();
        assert_eq!(report.recovered, 1);
        assert_eq!(report.synthesized, 4);
        assert_eq!(e.buffer(&id).unwrap().len(), 5);
        assert!(e.buffer(&id).unwrap().values().contains(&0.4));
    }

    #[test]
    fn test_store_down_degrades() {
        let mut e = engine_with(DownStore);
        let id = e.start_session("alice");
        e.record_conversation(&id, Some(0.3)).unwrap();
        let report = e.resume_session(&id).unwrap();
        assert_eq!(report.recovered, 0);
        assert_eq!(report.synthesized, 5);
        assert_eq!(report.failure_count(RestoreFailure::StoreUnavailable), 2);
        assert_eq!(e.buffer(&id).unwrap().len(), 5);
        assert!(report.to_string().starts_with("recovered 0 of 0"));
    }

    #[test]
    fn test_bad_record_timestamps_skipped() {
        let mut store = MemoryStore::new();
        store
            .save_conversation(&ConversationRecord {
                session_id: "s".into(),
                oscillation_value: 0.9,
                timestamp: "garbage".into(),
            })
            .unwrap();
        store
            .save_conversation(&ConversationRecord::new("s", 0.2, Utc::now()))
            .unwrap();
        store.save_session(&SessionState::new("s", "bob")).unwrap();
        let mut e = engine_with(store);
        let report = e.resume_session("s").unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.recovered, 1);
        assert_eq!(report.failure_count(RestoreFailure::ParseError), 1);
    }

    #[test]
    fn test_undecodable_records_reported() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = JsonDirStore::open(dir.path()).unwrap();
            let mut e = engine_with(store);
            let id = e.start_session("alice");
            for i in 0..6 {
                e.record_conversation(&id, Some(i as f64 * 0.01)).unwrap();
            }
            id
        };
        let path = dir.path().join(&id).join("conversations.jsonl");
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "{{\"session_id\": \"{id}\", \"oscillation_va").unwrap();
        drop(f);

        let mut e = engine_with(JsonDirStore::open(dir.path()).unwrap());
        let report = e.resume_session(&id).unwrap();
        assert_eq!(report.attempted, 7);
        assert_eq!(report.recovered, 6);
        assert_eq!(report.failure_count(RestoreFailure::ParseError), 1);
        assert!(!report.is_clean());
        let summary = report.to_string();
        assert!(summary.starts_with("recovered 6 of 7"), "{summary}");
        assert!(summary.contains("parse error"), "{summary}");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut e = engine();
        let id = e.start_session("alice");
        for i in 0..10 {
            e.record_conversation(&id, Some(i as f64 / 10.0)).unwrap();
        }
        let snap = e.export(&id).unwrap();
        e.clear_buffer(&id).unwrap();
        let report = e.restore_from_snapshot(&id, &snap).unwrap();
        assert_eq!(report.recovered, snap.len());
        let restored = e.buffer(&id).unwrap().values();
        for v in &snap.values {
            assert!(restored.contains(v));
        }
    }

    #[test]
    fn test_snapshot_shape_mismatch() {
        let mut e = engine();
        let id = e.start_session("alice");
        let snap = OscillationSnapshot {
            values: vec![0.1, 0.2],
            timestamps: vec!["2026-01-01T00:00:00Z".into()],
        };
        assert!(matches!(
            e.restore_from_snapshot(&id, &snap),
            Err(OscillationError::ShapeMismatch { .. })
        ));
        assert_eq!(e.buffer(&id).unwrap().len(), 5);
    }

    #[test]
    fn test_metrics_tops_up() {
        let mut e = engine();
        let id = e.start_session("alice");
        e.clear_buffer(&id).unwrap();
        let m = e.metrics(&id).unwrap();
        assert_eq!(m.data_level(), DataLevel::Intermediate);
        assert_eq!(m.entropy().unwrap().security_level, "high");
    }

    #[test]
    fn test_update_and_end_session() {
        let mut e = engine();
        let id = e.start_session("alice");
        let update = SessionUpdate {
            emotional_volatility: Some(0.9),
            ..Default::default()
        };
        let state = e.update_session(&id, &update).unwrap();
        assert_eq!(state.environment.emotional_volatility, 0.9);
        assert!(e.update_session("missing", &update).is_err());

        e.end_session(&id).unwrap();
        assert!(e.buffer(&id).is_none());
        let stored = e.store().load_session(&id).unwrap().unwrap();
        assert!(!stored.active);
    }

    #[test]
    fn test_reset() {
        let mut e = engine();
        e.start_session("a");
        e.start_session("b");
        assert_eq!(e.session_ids().len(), 2);
        e.reset();
        assert!(e.session_ids().is_empty());
    }
}
