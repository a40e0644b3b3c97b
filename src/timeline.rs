//! Mix timelines: an ordered list of keyed tracks plus the operations that
//! edit it.
//!
//! Transition labels are never stored on tracks. `Mix::transitions` derives
//! them from adjacent keys each time, so reordering or deleting a track can
//! not leave a stale label behind.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::key::{DEFAULT_KEY, OpenKey};
use crate::rules::{self, Energy, Rule, Suggestion};

pub const DEFAULT_MIX_NAME: &str = "Untitled Mix";
pub const OPENING_TRACK_TITLE: &str = "Opening Track";

/// `"<prefix>-<32 hex chars>"` from 16 random bytes.
pub fn generate_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{prefix}-{hex}")
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Trimmed name, or `fallback` when nothing is left.
pub(crate) fn normalize_name(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub key: OpenKey,
    pub title: String,
    pub details: String,
}

impl Track {
    pub fn new(key: OpenKey) -> Self {
        Self {
            id: generate_id("track"),
            key,
            title: String::new(),
            details: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mix {
    pub id: String,
    pub name: String,
    pub start_key: OpenKey,
    /// Key `start_key` falls back to when the timeline is empty.
    pub seed_key: OpenKey,
    pub tracks: Vec<Track>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CreateMixOptions {
    pub name: Option<String>,
    pub seed_keys: Vec<OpenKey>,
    /// Start key for a mix created without seed keys.
    pub start_key: Option<OpenKey>,
}

/// Partial edit of a track's free-text fields. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionDescriptor {
    pub label: String,
    pub energy: Energy,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_rule_id")]
    pub rule: Option<&'static Rule>,
}

fn serialize_rule_id<S: serde::Serializer>(
    rule: &Option<&'static Rule>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match rule {
        Some(rule) => serializer.serialize_str(rule.id.as_str()),
        None => serializer.serialize_none(),
    }
}

pub const START_LABEL: &str = "Start";
pub const CUSTOM_LABEL: &str = "Custom";

/// Label a track against its predecessor.
pub fn describe_transition(previous: Option<OpenKey>, next: OpenKey) -> TransitionDescriptor {
    let Some(previous) = previous else {
        return TransitionDescriptor {
            label: START_LABEL.to_string(),
            energy: Energy::Smooth,
            rule: None,
        };
    };
    match rules::match_rule(previous, next) {
        Some(rule) => TransitionDescriptor {
            label: rule.name.to_string(),
            energy: rule.energy(),
            rule: Some(rule),
        },
        None => TransitionDescriptor {
            label: CUSTOM_LABEL.to_string(),
            energy: Energy::Smooth,
            rule: None,
        },
    }
}

impl Mix {
    pub fn create(options: CreateMixOptions) -> Self {
        let name = normalize_name(options.name.as_deref().unwrap_or_default(), DEFAULT_MIX_NAME);
        let seed_key = options
            .seed_keys
            .first()
            .copied()
            .or(options.start_key)
            .unwrap_or(DEFAULT_KEY);
        let tracks = options
            .seed_keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                let mut track = Track::new(*key);
                if index == 0 {
                    track.title = OPENING_TRACK_TITLE.to_string();
                }
                track
            })
            .collect();
        Self {
            id: generate_id("mix"),
            name,
            start_key: seed_key,
            seed_key,
            tracks,
            created_at: now_millis(),
        }
    }

    /// Mix seeded from already-built tracks, e.g. an import or a shared link.
    pub(crate) fn from_tracks(name: String, tracks: Vec<Track>) -> Self {
        let seed_key = tracks.first().map(|t| t.key).unwrap_or(DEFAULT_KEY);
        Self {
            id: generate_id("mix"),
            name,
            start_key: seed_key,
            seed_key,
            tracks,
            created_at: now_millis(),
        }
    }

    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    fn position(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    fn sync_start_key(&mut self) {
        self.start_key = self.tracks.first().map(|t| t.key).unwrap_or(self.seed_key);
    }

    pub fn append(&mut self, key: OpenKey) -> &Track {
        self.tracks.push(Track::new(key));
        self.sync_start_key();
        &self.tracks[self.tracks.len() - 1]
    }

    /// Returns `false` when no track has `track_id`.
    pub fn remove(&mut self, track_id: &str) -> bool {
        let Some(index) = self.position(track_id) else {
            return false;
        };
        self.tracks.remove(index);
        self.sync_start_key();
        true
    }

    /// Move a track to `to_index`, clamped to the last position.
    pub fn move_track(&mut self, track_id: &str, to_index: usize) -> bool {
        let Some(from) = self.position(track_id) else {
            return false;
        };
        let to = to_index.min(self.tracks.len() - 1);
        if from == to {
            return false;
        }
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        self.sync_start_key();
        true
    }

    pub fn rename(&mut self, name: &str) {
        self.name = normalize_name(name, DEFAULT_MIX_NAME);
    }

    pub fn update_track_fields(&mut self, track_id: &str, update: TrackUpdate) -> bool {
        let Some(track) = self.tracks.iter_mut().find(|t| t.id == track_id) else {
            return false;
        };
        if let Some(title) = update.title {
            track.title = title;
        }
        if let Some(details) = update.details {
            track.details = details;
        }
        true
    }

    pub fn update_track_key(&mut self, track_id: &str, key: OpenKey) -> bool {
        let Some(track) = self.tracks.iter_mut().find(|t| t.id == track_id) else {
            return false;
        };
        track.key = key;
        self.sync_start_key();
        true
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.sync_start_key();
    }

    /// Key the next suggestions are computed from.
    pub fn anchor_key(&self) -> OpenKey {
        self.tracks.last().map(|t| t.key).unwrap_or(self.start_key)
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        rules::suggest(self.anchor_key())
    }

    /// One descriptor per track, each against the track before it.
    pub fn transitions(&self) -> Vec<TransitionDescriptor> {
        let mut previous = None;
        self.tracks
            .iter()
            .map(|track| {
                let descriptor = describe_transition(previous, track.key);
                previous = Some(track.key);
                descriptor
            })
            .collect()
    }
}
