//! Simulates a track session to exercise the timing core end to end
//!
//! Two laps of a 200 m radius circle with 10 Hz GPS, then a standing-start
//! 0-100 km/h run with 50 Hz IMU data. Every event is printed as the session
//! dispatches it.
//!
//! Run with: cargo run --example drive_sim

use race_timing::{
    format_lap_time, ActiveTimer, Event, GeoPoint, MotionSample, PositionSample, Session,
    SessionConfig, SharedTelemetry, TrackConfig, PRECISION_TRIGGER_RADIUS_M,
};

const G: f32 = 9.80665;
const EARTH_RADIUS_M: f64 = 6_371_000.0;
const TRACK_RADIUS_M: f64 = 200.0;
const START_LAT: f64 = 40.0;
const START_LON: f64 = -8.0;

/// Simple pseudo-random noise generator (deterministic for reproducibility)
struct NoiseGen {
    state: u32,
}

impl NoiseGen {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns noise in range [-amplitude, +amplitude]
    fn next(&mut self, amplitude: f64) -> f64 {
        // Simple LCG
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        let normalized = (self.state as f64 / u32::MAX as f64) * 2.0 - 1.0;
        normalized * amplitude
    }
}

/// Fix at `east_m`/`north_m` from the start line
fn local_fix(east_m: f64, north_m: f64, heading: f64, speed_kmh: f32, t: u32) -> PositionSample {
    let lat = START_LAT + (north_m / EARTH_RADIUS_M).to_degrees();
    let lon = START_LON + (east_m / (EARTH_RADIUS_M * START_LAT.to_radians().cos())).to_degrees();
    PositionSample::new(lat, lon, heading, speed_kmh, t)
}

fn describe(event: &Event) -> String {
    match *event {
        Event::RaceStart { timestamp_ms } => format!("RACE START      t={}ms", timestamp_ms),
        Event::LapStart { lap, timestamp_ms } => format!("LAP {} START     t={}ms", lap, timestamp_ms),
        Event::LapFinish {
            lap,
            lap_time_ms,
            is_best,
            ..
        } => format!(
            "LAP {} FINISH    {}{}",
            lap,
            format_lap_time(Some(lap_time_ms)),
            if is_best { "  (best)" } else { "" }
        ),
        Event::RaceFinish { timestamp_ms } => format!("RACE FINISH     t={}ms", timestamp_ms),
        Event::SprintReady { timestamp_ms } => format!("SPRINT READY    t={}ms", timestamp_ms),
        Event::SprintLaunch { trigger, timestamp_ms } => {
            format!("SPRINT LAUNCH   t={}ms by {:?}", timestamp_ms, trigger)
        }
        Event::SprintFinish { result_ms, .. } => {
            format!("SPRINT FINISH   {}.{:03}s", result_ms / 1000, result_ms % 1000)
        }
        Event::SprintAbort { timestamp_ms } => format!("SPRINT ABORT    t={}ms", timestamp_ms),
    }
}

fn main() {
    let mut session = Session::new(SessionConfig::default());
    let telemetry = SharedTelemetry::new();
    let mut noise = NoiseGen::new(42);

    session.subscribe(|event: &Event| println!("  >> {}", describe(event)));

    println!("=== Race Timing Simulation ===\n");

    // ------------------------------------------------------------------
    // Circuit: start line on the west edge of a circle, driving north
    // ------------------------------------------------------------------
    let start = match GeoPoint::new(START_LAT, START_LON) {
        Some(p) => p,
        None => return,
    };
    let track = match TrackConfig::circuit(start, PRECISION_TRIGGER_RADIUS_M) {
        Ok(track) => track,
        Err(e) => {
            println!("bad track: {}", e);
            return;
        }
    };
    session.setup_track(track);
    session.arm();

    println!(
        "Phase 1: CIRCUIT ({:.0} m lap, 10 Hz GPS, {:.0} m trigger radius)",
        2.0 * std::f64::consts::PI * TRACK_RADIUS_M,
        PRECISION_TRIGGER_RADIUS_M
    );

    let lap_len = 2.0 * std::f64::consts::PI * TRACK_RADIUS_M;
    let dt = 0.1;
    let mut distance = -20.7; // along the track from the start line
    let mut t_ms: u32 = 0;

    while distance < 2.0 * lap_len + 40.0 {
        let theta = distance / TRACK_RADIUS_M;
        // Slow on the line, faster round the back; lap 2 pushes harder
        let push = if distance < lap_len { 4.0 } else { 8.0 };
        let speed_ms = 20.0 + push * (theta / 2.0).sin().powi(2);

        let east = TRACK_RADIUS_M - TRACK_RADIUS_M * theta.cos() + noise.next(0.15);
        let north = TRACK_RADIUS_M * theta.sin() + noise.next(0.15);
        let heading = theta.to_degrees().rem_euclid(360.0);

        session.update_position(&local_fix(east, north, heading, (speed_ms * 3.6) as f32, t_ms));
        telemetry.publish(session.snapshot());

        if t_ms % 10_000 == 0 && session.is_running() {
            println!(
                "  t={:>3}s lap {} running {}",
                t_ms / 1000,
                session.lap_timer().current_lap(),
                format_lap_time(Some(session.current_elapsed_ms()))
            );
        }

        distance += speed_ms * dt;
        t_ms += 100;
    }

    let snap = telemetry.snapshot();
    println!("\n  Laps: {}", snap.lap_count);
    println!("  Last: {}", format_lap_time(snap.last_lap_ms));
    println!("  Best: {}", format_lap_time(snap.best_lap_ms));
    if let Some(skipped) = session.last_skipped() {
        println!(
            "  Last skipped trigger: {:?} at {}ms ({:?})",
            skipped.point, skipped.timestamp_ms, skipped.reason
        );
    }
    println!();

    // ------------------------------------------------------------------
    // Sprint: stop, launch, 0-100 km/h, brake
    // ------------------------------------------------------------------
    session.select(ActiveTimer::Sprint);
    println!("Phase 2: SPRINT (50 Hz IMU, target 100 km/h)");

    let dt = 0.02;
    let mut t_ms: u32 = 0;

    // Stationary with engine vibration
    for _ in 0..150 {
        let g = noise.next(0.03) as f32;
        session.update_motion(&MotionSample::new(0.0, g, t_ms));
        t_ms += 20;
    }

    // Launch, pulling less as speed builds
    let mut speed_kmh = 0.0f32;
    while session.sprint_timer().result_ms().is_none() && t_ms < 30_000 {
        let accel_g = 0.6 - 0.003 * speed_kmh + noise.next(0.05) as f32;
        speed_kmh += accel_g * G * dt * 3.6;
        session.update_motion(&MotionSample::new(speed_kmh, accel_g, t_ms));
        t_ms += 20;
    }

    // Brake until the timer resets itself
    while speed_kmh > 0.0 {
        let accel_g = -0.8;
        speed_kmh = (speed_kmh + accel_g * G * dt * 3.6).max(0.0);
        session.update_motion(&MotionSample::new(speed_kmh, accel_g, t_ms));
        t_ms += 20;
    }

    let sprint = session.sprint_timer();
    println!("\n  State after braking: {:?}", sprint.state());
    match sprint.last_result_ms() {
        Some(ms) => println!("  0-100 km/h: {}.{:03}s", ms / 1000, ms % 1000),
        None => println!("  0-100 km/h: no result"),
    }
}
