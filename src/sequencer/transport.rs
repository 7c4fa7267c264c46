//! Transport loop — start/stop control and once-per-measure retriggering.
//!
//! The loop owns no clock. The host passes `now` (any monotonic time, usually
//! `Instant::elapsed` from a fixed origin) to [`TransportLoop::start`] and
//! [`TransportLoop::poll`], and can sleep for
//! [`TransportLoop::time_until_next`] in between.
//!
//! The period is derived from the tempo when the loop starts. Changing the
//! tempo while running does not re-arm it; stop and start again to pick up
//! the new tempo.

use std::time::Duration;

use crate::composition::Composition;
use crate::studio::Studio;

use super::scheduler::schedule_pass;

/// Length of one measure (4 beats) at `bpm`: `240000 / bpm` milliseconds.
/// `None` for tempo 0.
pub fn measure_period(bpm: u32) -> Option<Duration> {
    if bpm == 0 {
        return None;
    }
    Some(Duration::from_nanos(240_000_000_000 / u64::from(bpm)))
}

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Running {
        period: Duration,
        next_due: Duration,
        /// Passes run since start, including the immediate one.
        cycles: u64,
    },
}

/// Stopped/Running state machine retriggering the first snippet of every
/// unmuted track once per measure.
#[derive(Debug)]
pub struct TransportLoop {
    state: PlayState,
}

impl Default for TransportLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportLoop {
    /// Create a new transport in the stopped state.
    pub fn new() -> Self {
        Self {
            state: PlayState::Stopped,
        }
    }

    /// Current play state.
    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PlayState::Running { .. })
    }

    /// Armed period, while running.
    pub fn period(&self) -> Option<Duration> {
        match self.state {
            PlayState::Running { period, .. } => Some(period),
            PlayState::Stopped => None,
        }
    }

    /// Passes run since the last start.
    pub fn cycles(&self) -> u64 {
        match self.state {
            PlayState::Running { cycles, .. } => cycles,
            PlayState::Stopped => 0,
        }
    }

    /// Start the loop: run one pass immediately and arm the period.
    ///
    /// Returns `false` (and stays stopped) when the tempo is 0. Starting an
    /// already running loop does nothing and returns `true`.
    pub fn start(&mut self, studio: &mut Studio, composition: &Composition, now: Duration) -> bool {
        if self.is_running() {
            return true;
        }
        let Some(period) = measure_period(composition.bpm) else {
            log::warn!("transport not started: {:?} has tempo 0", composition.title);
            return false;
        };

        log::info!(
            "transport started at {} bpm, period {} ms",
            composition.bpm,
            period.as_millis()
        );
        schedule_pass(studio, composition);
        self.state = PlayState::Running {
            period,
            next_due: now + period,
            cycles: 1,
        };
        true
    }

    /// Disarm the loop. Voices already scheduled play to completion.
    pub fn stop(&mut self) {
        if let PlayState::Running { cycles, .. } = self.state {
            log::info!("transport stopped after {cycles} pass(es)");
        }
        self.state = PlayState::Stopped;
    }

    /// Run a pass if the armed deadline has been reached.
    ///
    /// Uses `composition` as it is now. Deadlines missed while the host was
    /// not polling are skipped, not replayed. Returns whether a pass ran.
    pub fn poll(&mut self, studio: &mut Studio, composition: &Composition, now: Duration) -> bool {
        let PlayState::Running {
            period,
            next_due,
            cycles,
        } = self.state
        else {
            return false;
        };
        if now < next_due {
            return false;
        }

        let late = now - next_due;
        let skipped = late.as_nanos() / period.as_nanos();
        if skipped > 0 {
            log::debug!("transport skipped {skipped} late period(s)");
        }
        let next_due = advance(next_due, period, skipped + 1).unwrap_or(now + period);

        schedule_pass(studio, composition);
        self.state = PlayState::Running {
            period,
            next_due,
            cycles: cycles + 1,
        };
        true
    }

    /// Time left until the next pass is due. `None` when stopped.
    pub fn time_until_next(&self, now: Duration) -> Option<Duration> {
        match self.state {
            PlayState::Running { next_due, .. } => Some(next_due.saturating_sub(now)),
            PlayState::Stopped => None,
        }
    }
}

fn advance(from: Duration, period: Duration, periods: u128) -> Option<Duration> {
    let nanos = period.as_nanos().checked_mul(periods)?;
    from.checked_add(Duration::from_nanos(u64::try_from(nanos).ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BusSettings, OfflineBackend, OutputBackend};
    use crate::composition::test_fixture::{composition, snippet, track};
    use crate::composition::{InstrumentType, Note};
    use crate::studio::StudioConfig;

    fn rig() -> (Studio, OfflineBackend) {
        let backend = OfflineBackend::new(8000, 1, &BusSettings::default());
        let handle = backend.clone();
        let studio = Studio::with_backend_factory(StudioConfig::default(), move |_| {
            Ok(Box::new(backend.clone()) as Box<dyn OutputBackend>)
        });
        (studio, handle)
    }

    fn one_note_piece(bpm: u32) -> Composition {
        composition(
            bpm,
            vec![track(
                "t1",
                vec![snippet(
                    "s1",
                    InstrumentType::Pluck,
                    vec![Note::new("C4", 0.0, 1.0, 0.8)],
                )],
            )],
        )
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn period_is_one_measure() {
        assert_eq!(measure_period(60), Some(Duration::from_millis(4000)));
        assert_eq!(measure_period(120), Some(Duration::from_millis(2000)));
        assert_eq!(measure_period(0), None);
    }

    #[test]
    fn start_runs_an_immediate_pass() {
        let (mut studio, backend) = rig();
        let comp = one_note_piece(120);
        let mut transport = TransportLoop::new();

        assert!(transport.start(&mut studio, &comp, Duration::ZERO));
        assert!(transport.is_running());
        assert_eq!(transport.cycles(), 1);
        assert_eq!(backend.scheduled().len(), 1);
        assert_eq!(transport.time_until_next(Duration::ZERO), Some(secs(2.0)));
    }

    #[test]
    fn poll_fires_once_per_period() {
        let (mut studio, backend) = rig();
        let comp = one_note_piece(120);
        let mut transport = TransportLoop::new();
        transport.start(&mut studio, &comp, Duration::ZERO);

        assert!(!transport.poll(&mut studio, &comp, secs(1.9)));
        assert!(transport.poll(&mut studio, &comp, secs(2.0)));
        assert!(!transport.poll(&mut studio, &comp, secs(2.1)));
        assert!(transport.poll(&mut studio, &comp, secs(4.0)));
        assert_eq!(backend.scheduled().len(), 3);
        assert_eq!(transport.cycles(), 3);
    }

    #[test]
    fn missed_periods_are_skipped() {
        let (mut studio, backend) = rig();
        let comp = one_note_piece(120);
        let mut transport = TransportLoop::new();
        transport.start(&mut studio, &comp, Duration::ZERO);

        assert!(transport.poll(&mut studio, &comp, secs(7.0)));
        assert_eq!(backend.scheduled().len(), 2);
        assert_eq!(transport.time_until_next(secs(7.0)), Some(secs(1.0)));
    }

    #[test]
    fn start_twice_is_a_no_op() {
        let (mut studio, backend) = rig();
        let comp = one_note_piece(120);
        let mut transport = TransportLoop::new();
        transport.start(&mut studio, &comp, Duration::ZERO);
        assert!(transport.start(&mut studio, &comp, secs(1.0)));
        assert_eq!(backend.scheduled().len(), 1);
        assert_eq!(transport.time_until_next(Duration::ZERO), Some(secs(2.0)));
    }

    #[test]
    fn zero_tempo_refuses_to_start() {
        let (mut studio, backend) = rig();
        let comp = one_note_piece(0);
        let mut transport = TransportLoop::new();
        assert!(!transport.start(&mut studio, &comp, Duration::ZERO));
        assert!(!transport.is_running());
        assert!(backend.scheduled().is_empty());
    }

    #[test]
    fn stop_disarms_without_cancelling() {
        let (mut studio, backend) = rig();
        let comp = one_note_piece(120);
        let mut transport = TransportLoop::new();
        transport.start(&mut studio, &comp, Duration::ZERO);
        transport.stop();

        assert!(!transport.is_running());
        assert!(!transport.poll(&mut studio, &comp, secs(10.0)));
        assert_eq!(transport.time_until_next(secs(10.0)), None);
        assert_eq!(backend.active_voices(), 1);
    }

    #[test]
    fn tempo_change_keeps_armed_period() {
        let (mut studio, backend) = rig();
        let mut comp = one_note_piece(120);
        let mut transport = TransportLoop::new();
        transport.start(&mut studio, &comp, Duration::ZERO);

        comp.bpm = 60;
        assert!(transport.poll(&mut studio, &comp, secs(2.0)));
        assert_eq!(transport.period(), Some(secs(2.0)));

        // The pass itself uses the new tempo: one beat at 60 bpm is 1s.
        let voices = backend.scheduled();
        let last = voices.last().unwrap();
        assert!((last.stop - last.start - 1.1).abs() < 1e-9);

        transport.stop();
        transport.start(&mut studio, &comp, secs(3.0));
        assert_eq!(transport.period(), Some(secs(4.0)));
    }

    #[test]
    fn muted_and_empty_tracks_are_skipped() {
        let (mut studio, backend) = rig();
        let mut muted = track(
            "muted",
            vec![snippet("m", InstrumentType::Bass, vec![Note::new("C2", 0.0, 1.0, 1.0)])],
        );
        muted.muted = true;
        let empty = track("empty", vec![]);
        let second = track(
            "two-snippets",
            vec![
                snippet("a", InstrumentType::Pad, vec![Note::new("E4", 0.0, 1.0, 1.0)]),
                snippet("b", InstrumentType::Pad, vec![Note::new("G4", 0.0, 1.0, 1.0)]),
            ],
        );
        let comp = composition(120, vec![muted, empty, second]);

        let mut transport = TransportLoop::new();
        transport.start(&mut studio, &comp, Duration::ZERO);

        let voices = backend.scheduled();
        assert_eq!(voices.len(), 1);
        assert!((voices[0].frequency - 329.63).abs() < 0.01);
    }
}
