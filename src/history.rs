//! # Journey History
//!
//! Persisted, newest-first journey collection and the unlocked achievement
//! set, both kept as JSON blobs in a [`BlobStore`].
//!
//! The stores hold an in-memory copy and take the blob store as an argument
//! on every write, so one backend can serve both keys. Malformed or missing
//! blobs load as empty; only writes report errors.

use std::collections::HashMap;

use log::{error, info, warn};

use crate::achievements::{AchievementId, AchievementSet};
use crate::error::Result;
use crate::journey::Journey;
use crate::persistence::BlobStore;
use crate::TransportMode;

// ============================================================================
// Journey Store
// ============================================================================

/// Ordered journey collection, newest first.
#[derive(Debug, Clone, Default)]
pub struct JourneyStore {
    key: String,
    journeys: Vec<Journey>,
}

impl JourneyStore {
    /// Empty store writing under `key`, without reading anything.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            journeys: Vec::new(),
        }
    }

    /// Open the store, loading whatever is persisted under `key`.
    pub fn open<S: BlobStore + ?Sized>(store: &S, key: impl Into<String>) -> Self {
        let key = key.into();
        let journeys = Self::load_all(store, &key);
        Self { key, journeys }
    }

    /// Read the persisted journeys, newest first.
    ///
    /// Returns an empty list when nothing is stored, the read fails, or the
    /// blob does not parse.
    pub fn load_all<S: BlobStore + ?Sized>(store: &S, key: &str) -> Vec<Journey> {
        let bytes = match store.read_blob(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("[JourneyStore] Failed to read '{}': {}", key, e);
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Journey>>(&bytes) {
            Ok(journeys) => {
                info!("[JourneyStore] Loaded {} journeys", journeys.len());
                journeys
            }
            Err(e) => {
                warn!(
                    "[JourneyStore] Ignoring malformed history ({} bytes): {}",
                    bytes.len(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Re-read the collection from storage.
    pub fn reload<S: BlobStore + ?Sized>(&mut self, store: &S) {
        self.journeys = Self::load_all(store, &self.key);
    }

    /// Prepend a journey and persist the whole collection.
    ///
    /// On a failed write the journey stays in memory and the error is returned.
    pub fn append<S: BlobStore + ?Sized>(&mut self, store: &mut S, journey: Journey) -> Result<()> {
        info!(
            "[JourneyStore] Saving journey {} ({:.2} km)",
            journey.id, journey.distance_km
        );
        self.journeys.insert(0, journey);
        self.persist(store)
    }

    /// Drop every journey, in memory and in storage.
    pub fn clear<S: BlobStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        self.journeys.clear();
        store.remove_blob(&self.key).inspect_err(|e| {
            error!("[JourneyStore] Failed to clear '{}': {}", self.key, e);
        })?;
        info!("[JourneyStore] History cleared");
        Ok(())
    }

    fn persist<S: BlobStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        let bytes = serde_json::to_vec(&self.journeys)?;
        store.write_blob(&self.key, &bytes).inspect_err(|e| {
            error!("[JourneyStore] Failed to write '{}': {}", self.key, e);
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// All journeys, newest first.
    pub fn journeys(&self) -> &[Journey] {
        &self.journeys
    }

    pub fn latest(&self) -> Option<&Journey> {
        self.journeys.first()
    }

    pub fn get(&self, id: &str) -> Option<&Journey> {
        self.journeys.iter().find(|j| j.id == id)
    }

    pub fn len(&self) -> usize {
        self.journeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.is_empty()
    }

    /// Aggregate statistics over the whole history.
    pub fn stats(&self) -> HistoryStats {
        #[cfg(feature = "parallel")]
        let stats = HistoryStats::from_journeys_parallel(&self.journeys);
        #[cfg(not(feature = "parallel"))]
        let stats = HistoryStats::from_journeys(&self.journeys);
        stats
    }
}

// ============================================================================
// Achievement Store
// ============================================================================

/// Persisted [`AchievementSet`].
#[derive(Debug, Clone, Default)]
pub struct AchievementStore {
    key: String,
    unlocked: AchievementSet,
}

impl AchievementStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            unlocked: AchievementSet::new(),
        }
    }

    /// Open the store, loading the persisted set or starting empty.
    pub fn open<S: BlobStore + ?Sized>(store: &S, key: impl Into<String>) -> Self {
        let key = key.into();
        let unlocked = Self::load(store, &key);
        Self { key, unlocked }
    }

    fn load<S: BlobStore + ?Sized>(store: &S, key: &str) -> AchievementSet {
        let bytes = match store.read_blob(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return AchievementSet::new(),
            Err(e) => {
                warn!("[AchievementStore] Failed to read '{}': {}", key, e);
                return AchievementSet::new();
            }
        };

        let parsed = std::str::from_utf8(&bytes)
            .ok()
            .and_then(AchievementSet::from_json);
        match parsed {
            Some(set) => set,
            None => {
                warn!("[AchievementStore] Ignoring malformed achievement blob");
                AchievementSet::new()
            }
        }
    }

    /// Add newly reached ids and persist if anything changed.
    ///
    /// Returns the ids that were actually new.
    pub fn unlock<S, I>(&mut self, store: &mut S, ids: I) -> Result<Vec<AchievementId>>
    where
        S: BlobStore + ?Sized,
        I: IntoIterator<Item = AchievementId>,
    {
        let added = self.unlocked.merge(ids);
        if added.is_empty() {
            return Ok(added);
        }

        for id in &added {
            info!("[AchievementStore] Unlocked '{}'", id.def().name);
        }
        let json = self.unlocked.to_json()?;
        store
            .write_blob(&self.key, json.as_bytes())
            .inspect_err(|e| error!("[AchievementStore] Failed to write '{}': {}", self.key, e))?;
        Ok(added)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn unlocked(&self) -> &AchievementSet {
        &self.unlocked
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Totals over a set of journeys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryStats {
    pub journey_count: usize,
    pub total_distance_km: f64,
    pub total_duration_seconds: u64,
    pub top_speed_kmh: f64,
    /// Total distance over total time (km/h); 0 when no time was recorded
    pub overall_avg_speed_kmh: f64,
    pub mode_counts: HashMap<TransportMode, usize>,
}

impl HistoryStats {
    /// Compute statistics sequentially.
    pub fn from_journeys(journeys: &[Journey]) -> Self {
        let mut stats = journeys.iter().fold(Self::default(), |mut acc, j| {
            acc.add(j);
            acc
        });
        stats.finish();
        stats
    }

    /// Compute statistics with rayon.
    /// Falls back to the sequential version for small histories.
    #[cfg(feature = "parallel")]
    pub fn from_journeys_parallel(journeys: &[Journey]) -> Self {
        use rayon::prelude::*;

        if journeys.len() < 1_000 {
            return Self::from_journeys(journeys);
        }

        let mut stats = journeys
            .par_iter()
            .fold(Self::default, |mut acc, j| {
                acc.add(j);
                acc
            })
            .reduce(Self::default, Self::combine);
        stats.finish();
        stats
    }

    /// Most used transport mode, ties broken by display order.
    pub fn favourite_mode(&self) -> Option<TransportMode> {
        TransportMode::ALL
            .iter()
            .copied()
            .filter_map(|m| self.mode_counts.get(&m).map(|&c| (m, c)))
            .fold(None, |best: Option<(TransportMode, usize)>, (m, c)| match best {
                Some((_, best_count)) if best_count >= c => best,
                _ => Some((m, c)),
            })
            .map(|(m, _)| m)
    }

    fn add(&mut self, journey: &Journey) {
        self.journey_count += 1;
        self.total_distance_km += journey.distance_km;
        self.total_duration_seconds += journey.duration_seconds;
        self.top_speed_kmh = self.top_speed_kmh.max(journey.max_speed_kmh);
        *self.mode_counts.entry(journey.transport_mode).or_insert(0) += 1;
    }

    #[cfg(feature = "parallel")]
    fn combine(mut self, other: Self) -> Self {
        self.journey_count += other.journey_count;
        self.total_distance_km += other.total_distance_km;
        self.total_duration_seconds += other.total_duration_seconds;
        self.top_speed_kmh = self.top_speed_kmh.max(other.top_speed_kmh);
        for (mode, count) in other.mode_counts {
            *self.mode_counts.entry(mode).or_insert(0) += count;
        }
        self
    }

    fn finish(&mut self) {
        self.overall_avg_speed_kmh = if self.total_duration_seconds > 0 {
            self.total_distance_km / (self.total_duration_seconds as f64 / 3600.0)
        } else {
            0.0
        };
    }
}
