//! Achievement evaluation against live session metrics.
//!
//! Achievements come from a fixed, closed catalogue. Each rule is checked
//! independently against the current metrics of the running session
//! (instantaneous speed, cumulative distance, elapsed duration) on every
//! ingested sample. Evaluation is pure and idempotent: an id that is already
//! unlocked is never emitted again, and unlocked ids are never removed.
//!
//! ## Rules
//! - `speed_demon`: speed above 100 km/h
//! - `highway_cruiser`: speed above 50 km/h
//! - `century_rider`: more than 100 km in one session
//! - `explorer`: more than 10 km in one session
//! - `endurance_master`: session running for over an hour
//!
//! ## Example
//! ```rust
//! use speedsync::achievements::{evaluate, AchievementId, AchievementMetrics, AchievementSet};
//!
//! let mut unlocked = AchievementSet::new();
//! let metrics = AchievementMetrics { speed_kmh: 72.0, total_distance_km: 3.0, duration_seconds: 600 };
//!
//! let new_ids = evaluate(&metrics, &unlocked);
//! assert_eq!(new_ids, vec![AchievementId::HighwayCruiser]);
//!
//! unlocked.merge(new_ids);
//! assert!(evaluate(&metrics, &unlocked).is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Identifier of an achievement in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    SpeedDemon,
    HighwayCruiser,
    CenturyRider,
    Explorer,
    EnduranceMaster,
}

impl AchievementId {
    /// Stable string id, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::SpeedDemon => "speed_demon",
            AchievementId::HighwayCruiser => "highway_cruiser",
            AchievementId::CenturyRider => "century_rider",
            AchievementId::Explorer => "explorer",
            AchievementId::EnduranceMaster => "endurance_master",
        }
    }

    /// Look up an id by its persisted string.
    pub fn from_id(id: &str) -> Option<Self> {
        ID_LOOKUP.get(id).copied()
    }

    /// Display metadata for this achievement.
    pub fn def(&self) -> &'static AchievementDef {
        let index = match self {
            AchievementId::SpeedDemon => 0,
            AchievementId::HighwayCruiser => 1,
            AchievementId::CenturyRider => 2,
            AchievementId::Explorer => 3,
            AchievementId::EnduranceMaster => 4,
        };
        &CATALOGUE[index]
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display metadata for a catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// The full catalogue, in evaluation and display order.
pub static CATALOGUE: [AchievementDef; 5] = [
    AchievementDef {
        id: AchievementId::SpeedDemon,
        name: "Speed Demon",
        description: "Reached 100+ km/h",
        icon: "🏎️",
    },
    AchievementDef {
        id: AchievementId::HighwayCruiser,
        name: "Highway Cruiser",
        description: "Reached 50+ km/h",
        icon: "🛣️",
    },
    AchievementDef {
        id: AchievementId::CenturyRider,
        name: "Century Rider",
        description: "Traveled 100+ km",
        icon: "🚴",
    },
    AchievementDef {
        id: AchievementId::Explorer,
        name: "Explorer",
        description: "Traveled 10+ km",
        icon: "🗺️",
    },
    AchievementDef {
        id: AchievementId::EnduranceMaster,
        name: "Endurance Master",
        description: "Journey over 1 hour",
        icon: "⏱️",
    },
];

static ID_LOOKUP: Lazy<HashMap<&'static str, AchievementId>> =
    Lazy::new(|| CATALOGUE.iter().map(|d| (d.id.as_str(), d.id)).collect());

/// Speed thresholds (km/h)
const SPEED_DEMON_KMH: f64 = 100.0;
const HIGHWAY_CRUISER_KMH: f64 = 50.0;

/// Distance thresholds (km)
const CENTURY_RIDER_KM: f64 = 100.0;
const EXPLORER_KM: f64 = 10.0;

/// Duration threshold (seconds)
const ENDURANCE_MASTER_SECS: u64 = 3600;

/// Metrics a rule is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AchievementMetrics {
    /// Speed derived for the current sample (km/h)
    pub speed_kmh: f64,
    /// Distance covered so far this session (km)
    pub total_distance_km: f64,
    /// Time since the session started (seconds)
    pub duration_seconds: u64,
}

/// Rule table: each id with the condition that unlocks it.
const RULES: [(AchievementId, fn(&AchievementMetrics) -> bool); 5] = [
    (AchievementId::SpeedDemon, |m: &AchievementMetrics| {
        m.speed_kmh > SPEED_DEMON_KMH
    }),
    (AchievementId::HighwayCruiser, |m: &AchievementMetrics| {
        m.speed_kmh > HIGHWAY_CRUISER_KMH
    }),
    (AchievementId::CenturyRider, |m: &AchievementMetrics| {
        m.total_distance_km > CENTURY_RIDER_KM
    }),
    (AchievementId::Explorer, |m: &AchievementMetrics| {
        m.total_distance_km > EXPLORER_KM
    }),
    (AchievementId::EnduranceMaster, |m: &AchievementMetrics| {
        m.duration_seconds > ENDURANCE_MASTER_SECS
    }),
];

/// Evaluate every rule and return the ids newly unlocked by `metrics`.
///
/// Ids already in `already_unlocked` are never returned. The result is in
/// catalogue order and empty when nothing new was reached.
pub fn evaluate(metrics: &AchievementMetrics, already_unlocked: &AchievementSet) -> Vec<AchievementId> {
    RULES
        .iter()
        .filter(|(id, rule)| !already_unlocked.contains(*id) && rule(metrics))
        .map(|(id, _)| *id)
        .collect()
}

/// Append-only set of unlocked achievements, kept in unlock order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementSet {
    unlocked: Vec<AchievementId>,
}

impl AchievementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }

    /// Add an id. Returns false if it was already unlocked.
    pub fn insert(&mut self, id: AchievementId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.unlocked.push(id);
        true
    }

    /// Add every id, returning those that were not already present.
    pub fn merge<I>(&mut self, ids: I) -> Vec<AchievementId>
    where
        I: IntoIterator<Item = AchievementId>,
    {
        ids.into_iter().filter(|id| self.insert(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.unlocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AchievementId> + '_ {
        self.unlocked.iter().copied()
    }

    /// Most recently unlocked id.
    pub fn latest(&self) -> Option<AchievementId> {
        self.unlocked.last().copied()
    }

    pub fn progress(&self) -> AchievementProgress {
        AchievementProgress {
            unlocked: self.len() as u32,
            total: CATALOGUE.len() as u32,
        }
    }

    /// Serialize as a JSON array of id strings.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a persisted id list.
    ///
    /// Unknown ids are skipped and duplicates collapse. Returns `None` if the
    /// input is not a JSON array of strings.
    pub fn from_json(json: &str) -> Option<Self> {
        let raw: Vec<String> = serde_json::from_str(json).ok()?;
        let mut set = Self::new();
        for id in raw {
            match AchievementId::from_id(&id) {
                Some(known) => {
                    set.insert(known);
                }
                None => warn!("[Achievements] Skipping unknown achievement id '{}'", id),
            }
        }
        Some(set)
    }
}

/// Unlocked share of the catalogue, for the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementProgress {
    pub unlocked: u32,
    pub total: u32,
}

impl AchievementProgress {
    /// Percentage complete, rounded to the nearest whole percent.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.unlocked as f64 / self.total as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(speed_kmh: f64, total_distance_km: f64, duration_seconds: u64) -> AchievementMetrics {
        AchievementMetrics {
            speed_kmh,
            total_distance_km,
            duration_seconds,
        }
    }

    #[test]
    fn test_nothing_below_thresholds() {
        let m = metrics(50.0, 10.0, 3600);
        assert!(evaluate(&m, &AchievementSet::new()).is_empty());
    }

    #[test]
    fn test_each_rule() {
        let none = AchievementSet::new();
        assert_eq!(
            evaluate(&metrics(101.0, 0.0, 0), &none),
            vec![AchievementId::SpeedDemon, AchievementId::HighwayCruiser]
        );
        assert_eq!(
            evaluate(&metrics(0.0, 10.5, 0), &none),
            vec![AchievementId::Explorer]
        );
        assert_eq!(
            evaluate(&metrics(0.0, 100.5, 0), &none),
            vec![AchievementId::CenturyRider, AchievementId::Explorer]
        );
        assert_eq!(
            evaluate(&metrics(0.0, 0.0, 3601), &none),
            vec![AchievementId::EnduranceMaster]
        );
    }

    #[test]
    fn test_never_re_emits() {
        let mut unlocked = AchievementSet::new();
        let first = evaluate(&metrics(120.0, 150.0, 4000), &unlocked);
        assert_eq!(first.len(), 5);
        unlocked.merge(first);

        // Same and higher metrics emit nothing; nothing is removed
        assert!(evaluate(&metrics(120.0, 150.0, 4000), &unlocked).is_empty());
        assert!(evaluate(&metrics(300.0, 500.0, 9000), &unlocked).is_empty());
        assert_eq!(unlocked.len(), 5);
    }

    #[test]
    fn test_set_is_append_only() {
        let mut set = AchievementSet::new();
        assert!(set.insert(AchievementId::Explorer));
        assert!(!set.insert(AchievementId::Explorer));

        let added = set.merge([AchievementId::Explorer, AchievementId::SpeedDemon]);
        assert_eq!(added, vec![AchievementId::SpeedDemon]);
        assert_eq!(set.latest(), Some(AchievementId::SpeedDemon));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_json_round_trip_and_unknown_ids() {
        let mut set = AchievementSet::new();
        set.merge([AchievementId::HighwayCruiser, AchievementId::Explorer]);
        let json = set.to_json().unwrap();
        assert_eq!(json, r#"["highway_cruiser","explorer"]"#);
        assert_eq!(AchievementSet::from_json(&json), Some(set));

        let with_unknown =
            AchievementSet::from_json(r#"["first_journey","explorer","explorer"]"#).unwrap();
        assert_eq!(with_unknown.iter().collect::<Vec<_>>(), vec![AchievementId::Explorer]);

        assert!(AchievementSet::from_json("{not json").is_none());
        assert!(AchievementSet::from_json(r#"{"a":1}"#).is_none());
    }

    #[test]
    fn test_catalogue_and_progress() {
        for def in CATALOGUE.iter() {
            assert_eq!(AchievementId::from_id(def.id.as_str()), Some(def.id));
            assert_eq!(def.id.def(), def);
        }
        assert_eq!(AchievementId::SpeedDemon.def().name, "Speed Demon");

        let mut set = AchievementSet::new();
        assert_eq!(set.progress().percent(), 0);
        set.merge([AchievementId::Explorer, AchievementId::SpeedDemon]);
        let progress = set.progress();
        assert_eq!(progress.unlocked, 2);
        assert_eq!(progress.total, 5);
        assert_eq!(progress.percent(), 40);
    }
}
