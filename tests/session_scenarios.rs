//! End-to-end timing scenarios through the public `Session` API

use std::cell::RefCell;
use std::rc::Rc;

use race_timing::{
    format_lap_time, Event, EventKind, GeoPoint, LapTimerState, PositionSample, Session,
    SessionConfig, SkipReason, TrackConfig, TriggerPoint,
};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const START: (f64, f64) = (40.0, -8.0);
const FINISH: (f64, f64) = (40.01, -8.0);

fn point((lat, lon): (f64, f64)) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
}

/// Northbound fix `north_m` from `origin`
fn fix_near(origin: (f64, f64), north_m: f64, speed_kmh: f32, t: u32) -> PositionSample {
    let lat = origin.0 + (north_m / EARTH_RADIUS_M).to_degrees();
    PositionSample::new(lat, origin.1, 0.0, speed_kmh, t)
}

/// Straight northbound pass over `origin`, closest at `t_min`
fn pass(session: &mut Session, origin: (f64, f64), closest_m: f64, t_min: u32) {
    for (north, t) in [
        (-(closest_m + 4.0), t_min - 200),
        (-(closest_m + 2.0), t_min - 100),
        (-closest_m, t_min),
        (closest_m + 1.2, t_min + 100),
    ] {
        session.update_position(&fix_near(origin, north, 72.0, t));
    }
}

/// Somewhere out on the track, far from both points
fn out_on_track(session: &mut Session, t: u32) {
    session.update_position(&fix_near(START, 400.0, 120.0, t));
}

fn recording_session(track: TrackConfig) -> (Session, Rc<RefCell<Vec<Event>>>) {
    let mut session = Session::new(SessionConfig::default());
    session.setup_track(track);
    session.arm();

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    session.subscribe(move |e: &Event| sink.borrow_mut().push(*e));
    (session, log)
}

fn circuit() -> TrackConfig {
    TrackConfig::circuit(point(START), 3.0).unwrap()
}

fn stage() -> TrackConfig {
    TrackConfig::point_to_point(point(START), point(FINISH), 3.0).unwrap()
}

#[test]
fn circuit_start_and_first_lap_are_backdated() {
    let (mut session, log) = recording_session(circuit());

    // Closest 0.8 m at t=1000, receding 2.0 m at t=1100
    for (north, t) in [(-4.8, 800), (-2.8, 900), (-0.8, 1_000), (2.0, 1_100)] {
        session.update_position(&fix_near(START, north, 72.0, t));
    }
    assert_eq!(
        *log.borrow(),
        vec![
            Event::RaceStart { timestamp_ms: 1_000 },
            Event::LapStart {
                lap: 1,
                timestamp_ms: 1_000
            },
        ]
    );
    log.borrow_mut().clear();

    out_on_track(&mut session, 30_000);

    // Closest 0.9 m at t=61000, receding at t=61100
    for (north, t) in [(-4.9, 60_800), (-2.9, 60_900), (-0.9, 61_000), (2.1, 61_100)] {
        session.update_position(&fix_near(START, north, 72.0, t));
    }
    assert_eq!(
        *log.borrow(),
        vec![
            Event::LapFinish {
                lap: 1,
                lap_time_ms: 60_000,
                is_best: true,
                timestamp_ms: 61_000,
            },
            Event::LapStart {
                lap: 2,
                timestamp_ms: 61_000
            },
        ]
    );
    assert_eq!(session.lap_count(), 1);
    assert_eq!(session.last_lap_ms(), Some(60_000));
    assert_eq!(session.best_lap_ms(), Some(60_000));
}

#[test]
fn circuit_laps_keep_best_and_last() {
    let (mut session, log) = recording_session(circuit());

    pass(&mut session, START, 0.5, 1_000);
    let mut t = 1_000;
    for lap_time in [62_000, 59_500, 61_250, 59_900] {
        out_on_track(&mut session, t + lap_time / 2);
        t += lap_time;
        pass(&mut session, START, 0.5, t);
    }

    assert_eq!(session.lap_count(), 4);
    assert_eq!(session.last_lap_ms(), Some(59_900));
    assert_eq!(session.best_lap_ms(), Some(59_500));

    let finishes: Vec<(u32, bool)> = log
        .borrow()
        .iter()
        .filter_map(|e| match *e {
            Event::LapFinish { lap_time_ms, is_best, .. } => Some((lap_time_ms, is_best)),
            _ => None,
        })
        .collect();
    assert_eq!(
        finishes,
        vec![(62_000, true), (59_500, true), (61_250, false), (59_900, false)]
    );

    // Exactly one RaceStart for the whole session
    let starts = log.borrow().iter().filter(|e| e.kind() == EventKind::RaceStart).count();
    assert_eq!(starts, 1);
    assert_eq!(format_lap_time(session.best_lap_ms()), "00:59.500");
}

#[test]
fn stage_finishes_once_until_reset() {
    let (mut session, log) = recording_session(stage());

    pass(&mut session, START, 0.4, 1_000);
    out_on_track(&mut session, 20_000);
    pass(&mut session, FINISH, 0.6, 45_000);

    let kinds: Vec<EventKind> = log.borrow().iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::RaceStart,
            EventKind::LapStart,
            EventKind::LapFinish,
            EventKind::RaceFinish
        ]
    );
    assert_eq!(session.last_lap_ms(), Some(44_000));
    assert_eq!(session.lap_timer().state(), LapTimerState::Finished);
    assert!(!session.is_running());

    // Driving back through the start does nothing
    log.borrow_mut().clear();
    pass(&mut session, START, 0.4, 120_000);
    pass(&mut session, FINISH, 0.4, 180_000);
    assert!(log.borrow().is_empty());

    // A reset allows the next run
    session.reset_session();
    pass(&mut session, START, 0.4, 240_000);
    assert_eq!(log.borrow().first(), Some(&Event::RaceStart { timestamp_ms: 240_000 }));
}

#[test]
fn disarm_mid_lap_stops_all_transitions() {
    let (mut session, log) = recording_session(circuit());

    pass(&mut session, START, 0.5, 1_000);
    out_on_track(&mut session, 30_000);
    session.disarm();
    log.borrow_mut().clear();

    pass(&mut session, START, 0.5, 61_000);
    assert!(log.borrow().is_empty());
    assert!(!session.is_running());
    assert_eq!(session.lap_count(), 0);

    // Configuration survives; re-arming starts a fresh session
    assert!(session.is_track_setup());
    session.arm();
    pass(&mut session, START, 0.5, 90_000);
    assert!(session.is_running());
}

#[test]
fn shallow_pass_is_reported_not_timed() {
    let (mut session, log) = recording_session(circuit());

    // Passes 2.2 m east of the point: inside the 3 m radius, outside the
    // 1.5 m inner bound
    let east_deg = (2.2 / (EARTH_RADIUS_M * START.0.to_radians().cos())).to_degrees();
    let lane = (START.0, START.1 + east_deg);
    for (north, t) in [(-4.0, 800), (-1.5, 900), (0.0, 1_000), (1.0, 1_100)] {
        session.update_position(&fix_near(lane, north, 72.0, t));
    }
    assert!(log.borrow().is_empty());

    let skipped = session.last_skipped().copied().unwrap();
    assert_eq!(skipped.point, TriggerPoint::Start);
    assert_eq!(skipped.timestamp_ms, 1_000);
    match skipped.reason {
        SkipReason::InnerBoundMissed { closest_m } => assert!((closest_m - 2.2).abs() < 0.01),
        other => panic!("unexpected reason {:?}", other),
    }
}

#[test]
fn every_subscriber_receives_every_matching_event() {
    let (mut session, all) = recording_session(circuit());

    let laps = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&laps);
    session.subscribe_to(EventKind::LapFinish, move |e: &Event| {
        if let Event::LapFinish { lap_time_ms, .. } = *e {
            sink.borrow_mut().push(lap_time_ms);
        }
    });
    let audio_cues = Rc::new(RefCell::new(0u32));
    let cue = Rc::clone(&audio_cues);
    session.subscribe_to(EventKind::LapFinish, move |_: &Event| *cue.borrow_mut() += 1);

    pass(&mut session, START, 0.5, 1_000);
    out_on_track(&mut session, 30_000);
    pass(&mut session, START, 0.5, 61_000);

    assert_eq!(*laps.borrow(), vec![60_000]);
    assert_eq!(*audio_cues.borrow(), 1);
    assert_eq!(all.borrow().len(), 4);
}

#[test]
fn no_fix_samples_are_skipped_silently() {
    let (mut session, log) = recording_session(circuit());

    pass(&mut session, START, 0.5, 1_000);
    for t in (2_000..60_000).step_by(1_000) {
        session.update_position(&PositionSample::no_fix(t));
    }
    session.tick(31_000);
    assert_eq!(session.current_elapsed_ms(), 30_000);

    pass(&mut session, START, 0.5, 61_000);
    assert_eq!(session.last_lap_ms(), Some(60_000));
    assert_eq!(log.borrow().len(), 4);
}
