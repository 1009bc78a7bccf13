//! Session state tracked alongside each oscillation buffer.
//!
//! A [`SessionState`] is the record persisted through
//! [`crate::store::OscillationStore::save_session`]. Updates go through
//! [`SessionUpdate`], which names every field a caller may change.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timestamp::seconds_between;

/// Fresh random session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Conversational environment of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEnvironment {
    /// Seconds since session start, refreshed by [`SessionState::update_duration`].
    pub session_duration: f64,
    pub interaction_count: u64,
    pub emotional_volatility: f64,
    pub topic_consistency: f64,
}

impl Default for SessionEnvironment {
    fn default() -> Self {
        Self {
            session_duration: 0.0,
            interaction_count: 0,
            emotional_volatility: 0.3,
            topic_consistency: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub character_id: String,
    pub start_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub interaction_count: u64,
    #[serde(default, rename = "environment_state")]
    pub environment: SessionEnvironment,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_active() -> bool {
    true
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, character_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            character_id: character_id.into(),
            start_time: now,
            last_update: now,
            interaction_count: 0,
            environment: SessionEnvironment::default(),
            active: true,
            metadata: HashMap::new(),
        }
    }

    pub fn update_interaction(&mut self) {
        self.interaction_count += 1;
        self.environment.interaction_count = self.interaction_count;
        self.last_update = Utc::now();
    }

    pub fn update_duration(&mut self) {
        let now = Utc::now();
        self.environment.session_duration = seconds_between(&self.start_time, &now).max(0.0);
        self.last_update = now;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.last_update = Utc::now();
    }

    pub fn reactivate(&mut self) {
        self.active = true;
        self.last_update = Utc::now();
    }

    /// Apply `update`, touching only the fields it sets.
    pub fn apply(&mut self, update: &SessionUpdate) {
        if let Some(id) = &update.character_id {
            self.character_id.clone_from(id);
        }
        if let Some(count) = update.interaction_count {
            self.interaction_count = count;
            self.environment.interaction_count = count;
        }
        if let Some(v) = update.emotional_volatility {
            self.environment.emotional_volatility = v;
        }
        if let Some(v) = update.topic_consistency {
            self.environment.topic_consistency = v;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        for (k, v) in &update.metadata {
            self.metadata.insert(k.clone(), v.clone());
        }
        self.last_update = Utc::now();
    }
}

/// Partial update of a [`SessionState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionUpdate {
    pub character_id: Option<String>,
    pub interaction_count: Option<u64>,
    pub emotional_volatility: Option<f64>,
    pub topic_consistency: Option<f64>,
    pub active: Option<bool>,
    /// Merged key by key into the existing metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}
