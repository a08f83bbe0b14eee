//! End-to-end tracking scenarios: a scripted location source driving the
//! tracker, with history persisted to disk.

use speedsync::display::format_duration;
use speedsync::{
    AchievementId, Coordinate, FileBlobStore, JourneyStore, LocationError, MemoryBlobStore,
    Sample, ScriptedLocationSource, Tracker, TrackerConfig, TrackerUpdate, TransportMode,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn at(lat: f64, lng: f64, t: i64) -> Sample {
    Sample::new(Coordinate::new(lat, lng), t)
}

fn config() -> TrackerConfig {
    TrackerConfig::default().with_tick_interval(std::time::Duration::from_secs(3600))
}

#[test]
fn reference_scenario_two_samples() {
    init_logger();
    let mut tracker = Tracker::new(config(), MemoryBlobStore::new()).unwrap();
    let mut gps = ScriptedLocationSource::new();

    tracker.start(0, &mut gps);
    gps.emit_position(at(0.0, 0.0, 0).with_altitude(100.0));
    gps.emit_position(at(0.0, 0.001, 10_000).with_altitude(105.0));
    tracker.pump();

    let snapshot = tracker.snapshot(10_000);
    assert!((snapshot.distance_km - 0.111).abs() < 0.001);
    assert!((snapshot.current_speed_kmh - 40.0).abs() < 0.1);
    assert!((snapshot.max_speed_kmh - 40.0).abs() < 0.1);
    // First sample had nothing to derive a speed from and is not averaged
    assert!((snapshot.avg_speed_kmh - 40.0).abs() < 0.1);
    assert_eq!(snapshot.elevation_gain_m, 5.0);
    assert_eq!(snapshot.elevation_loss_m, 0.0);
    assert_eq!(snapshot.elapsed_seconds, 10);
}

#[test]
fn journey_survives_restart_on_disk() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();

    let journey = {
        let store = FileBlobStore::open(dir.path()).unwrap();
        let mut tracker = Tracker::new(config(), store).unwrap();
        let mut gps = ScriptedLocationSource::new();

        tracker.start(1_700_000_000_000, &mut gps);
        gps.resolve_initial(at(48.8566, 2.3522, 1_700_000_000_000));
        for i in 1..=60 {
            gps.emit_position(
                at(48.8566, 2.3522 + i as f64 * 0.0005, 1_700_000_000_000 + i * 5_000)
                    .with_speed(10.0),
            );
        }
        tracker.pump();

        tracker
            .stop(1_700_000_300_000, &mut gps)
            .journey
            .expect("journey recorded")
    };

    assert_eq!(journey.duration_seconds, 300);
    assert_eq!(journey.path.len(), 60);
    assert!((journey.avg_speed_kmh - 36.0).abs() < 1e-9);
    assert_eq!(format_duration(journey.duration_seconds), "00:05:00");
    // 60 legs of 0.0005 degrees of longitude at 48.86N
    assert!((journey.distance_km - 2.195).abs() < 0.01, "got {}", journey.distance_km);

    let reopened = FileBlobStore::open(dir.path()).unwrap();
    let tracker = Tracker::new(config(), reopened).unwrap();
    assert_eq!(tracker.journeys(), &[journey.clone()]);
    assert_eq!(tracker.journeys()[0].start_location.name, "48.8566, 2.3522");

    let stats = tracker.history_stats();
    assert_eq!(stats.journey_count, 1);
    assert_eq!(stats.mode_counts.get(&TransportMode::Car), Some(&1));
}

#[test]
fn stop_before_any_sample_records_nothing() {
    init_logger();
    let mut tracker = Tracker::new(config(), MemoryBlobStore::new()).unwrap();
    let mut gps = ScriptedLocationSource::new();

    tracker.start(0, &mut gps);
    assert!(tracker.stop(30_000, &mut gps).journey.is_none());
    assert!(tracker.journeys().is_empty());
    assert!(JourneyStore::load_all(tracker.store(), "speedometer-journeys").is_empty());
}

#[test]
fn permission_denied_keeps_session_usable() {
    init_logger();
    let mut tracker = Tracker::new(config(), MemoryBlobStore::new()).unwrap();
    let mut gps = ScriptedLocationSource::new();

    tracker.start(0, &mut gps);
    gps.fail_initial(LocationError::PermissionDenied);
    gps.emit_error(LocationError::Unavailable);

    let updates = tracker.pump();
    assert_eq!(updates.len(), 2);
    assert!(tracker.is_tracking());
    assert_eq!(tracker.last_error(), Some(LocationError::Unavailable));
    assert_eq!(tracker.snapshot(5_000).distance_km, 0.0);

    // No start location ever arrived, so there is nothing to save
    assert!(tracker.stop(10_000, &mut gps).journey.is_none());
}

#[test]
fn long_fast_drive_unlocks_every_achievement_once() {
    init_logger();
    let mut tracker = Tracker::new(config(), MemoryBlobStore::new()).unwrap();
    let mut gps = ScriptedLocationSource::new();

    tracker.start(0, &mut gps);
    gps.resolve_initial(at(0.0, 0.0, 0));

    // ~120 km/h along the equator for a little over an hour, one fix per minute
    let step_deg = 2.0 / 111.195;
    for minute in 1..=62 {
        gps.emit_position(
            at(0.0, minute as f64 * step_deg, minute * 60_000).with_speed(120.0 / 3.6),
        );
    }

    let unlocked: Vec<AchievementId> = tracker
        .pump()
        .into_iter()
        .filter_map(|u| match u {
            TrackerUpdate::AchievementsUnlocked(ids) => Some(ids),
            _ => None,
        })
        .flatten()
        .collect();

    assert_eq!(unlocked.len(), 5);
    for id in [
        AchievementId::SpeedDemon,
        AchievementId::HighwayCruiser,
        AchievementId::CenturyRider,
        AchievementId::Explorer,
        AchievementId::EnduranceMaster,
    ] {
        assert_eq!(unlocked.iter().filter(|u| **u == id).count(), 1);
    }
    assert_eq!(tracker.achievements().progress().percent(), 100);

    // A second session unlocks nothing new
    tracker.stop(62 * 60_000, &mut gps);
    tracker.start(10_000_000, &mut gps);
    gps.emit_position(at(0.0, 0.0, 10_001_000).with_speed(50.0));
    assert!(!tracker
        .pump()
        .iter()
        .any(|u| matches!(u, TrackerUpdate::AchievementsUnlocked(_))));
}

#[test]
fn history_is_newest_first_and_clearable() {
    init_logger();
    let mut tracker = Tracker::new(config(), MemoryBlobStore::new()).unwrap();
    let mut gps = ScriptedLocationSource::new();

    let mut ids = Vec::new();
    for (n, mode) in [TransportMode::Walking, TransportMode::Train]
        .into_iter()
        .enumerate()
    {
        let t0 = n as i64 * 1_000_000;
        tracker.set_transport_mode(mode);
        tracker.start(t0, &mut gps);
        gps.resolve_initial(at(0.0, 0.0, t0));
        gps.emit_position(at(0.0, 0.001, t0 + 10_000));
        tracker.pump();
        ids.push(tracker.stop(t0 + 10_000, &mut gps).journey.unwrap().id);
    }

    let stored: Vec<&str> = tracker.journeys().iter().map(|j| j.id.as_str()).collect();
    assert_eq!(stored, vec![ids[1].as_str(), ids[0].as_str()]);
    assert_eq!(tracker.journeys()[0].transport_mode, TransportMode::Train);

    tracker.clear_history().unwrap();
    assert!(tracker.journeys().is_empty());
    assert!(JourneyStore::load_all(tracker.store(), "speedometer-journeys").is_empty());
}
