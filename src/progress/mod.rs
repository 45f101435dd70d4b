//! Synthetic progress for operations whose real progress cannot be observed.
//!
//! The generation service reports nothing until it answers, so the client
//! fakes an organic-looking progress signal while the request is pending.
//! [`start`] spawns a ticking task that advances a value by bounded random
//! increments, never past [`PROGRESS_CAP`], and hands each tick to a
//! callback. The callback decides whether the tick still matters: returning
//! [`TickControl::Stop`] ends the simulator for good.
//!
//! # Example
//!
//! ```no_run
//! use deckgen_core::progress::{self, SimulatorSettings, TickControl};
//!
//! # async fn example() {
//! let settings = SimulatorSettings::default();
//! let handle = progress::start(&settings, settings.random_step(), |tick| {
//!     println!("{:>3}% {}", tick.value.percent(), tick.phase);
//!     TickControl::Continue
//! });
//! // ... real work completes ...
//! handle.stop();
//! # }
//! ```

mod phase;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

pub use phase::Phase;

/// Highest value the simulator reports while the real outcome is unknown.
pub const PROGRESS_CAP: f64 = 95.0;

/// Value reported once the operation has succeeded.
pub const PROGRESS_COMPLETE: f64 = 100.0;

/// Default time between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(450);

/// Shortest cadence [`start`] accepts; shorter ones are raised to this.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Default lower bound of a tick increment (inclusive).
pub const DEFAULT_MIN_STEP: f64 = 7.0;

/// Default upper bound of a tick increment (exclusive).
pub const DEFAULT_MAX_STEP: f64 = 17.0;

/// A progress percentage clamped to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct ProgressValue(f64);

impl ProgressValue {
    pub const ZERO: Self = Self(0.0);
    pub const COMPLETE: Self = Self(PROGRESS_COMPLETE);

    /// Creates a value, clamping into `[0, 100]`. NaN becomes zero.
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, PROGRESS_COMPLETE))
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Rounded whole percent, for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(self) -> u8 {
        // Clamped to [0, 100] on construction.
        self.0.round() as u8
    }
}

/// Tick cadence and increment bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorSettings {
    pub cadence: Duration,
    pub min_step: f64,
    pub max_step: f64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_TICK_INTERVAL,
            min_step: DEFAULT_MIN_STEP,
            max_step: DEFAULT_MAX_STEP,
        }
    }
}

impl SimulatorSettings {
    /// Step function drawing each increment uniformly from `[min_step, max_step)`.
    ///
    /// Degenerate bounds (`max_step <= min_step`, a non-finite bound or a
    /// span too wide to sample) yield a constant `min_step`.
    #[must_use]
    pub fn random_step(&self) -> impl FnMut(f64) -> f64 + Send + 'static {
        let min = self.min_step;
        let max = self.max_step;
        let sampleable = min.is_finite() && max.is_finite() && max > min && (max - min).is_finite();
        move |_current: f64| {
            if sampleable {
                rand::thread_rng().gen_range(min..max)
            } else {
                min
            }
        }
    }

    /// Cadence actually used by [`start`], never below [`MIN_TICK_INTERVAL`].
    #[must_use]
    pub fn effective_cadence(&self) -> Duration {
        self.cadence.max(MIN_TICK_INTERVAL)
    }
}

/// One simulator update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressTick {
    /// Reported value, never above [`PROGRESS_CAP`].
    pub value: ProgressValue,
    pub phase: Phase,
    /// 1-based tick counter within this simulator run.
    pub sequence: u64,
}

/// Returned by the tick callback to keep or end the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Handle to a running simulator. Dropping it stops the simulator.
#[derive(Debug)]
pub struct SimulatorHandle {
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SimulatorHandle {
    /// Stops the simulator. No tick is delivered after this returns.
    ///
    /// Safe to call any number of times, including after the simulator
    /// stopped itself. Returns `true` only for the call that stopped it.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.task.abort();
        trace!("progress simulator stopped");
        true
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts a simulator on the current Tokio runtime.
///
/// The first tick fires one cadence after the call; the cadence is
/// [`SimulatorSettings::effective_cadence`]. Each tick adds
/// `step(current)` to the running value (non-positive or non-finite
/// increments are ignored, so the value never decreases), caps the reported
/// value at [`PROGRESS_CAP`] and passes it to `on_tick`.
///
/// # Panics
///
/// Panics when called outside a Tokio runtime.
pub fn start<S, F>(settings: &SimulatorSettings, mut step: S, mut on_tick: F) -> SimulatorHandle
where
    S: FnMut(f64) -> f64 + Send + 'static,
    F: FnMut(ProgressTick) -> TickControl + Send + 'static,
{
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    let cadence = settings.effective_cadence();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + cadence, cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut current = 0.0_f64;
        let mut sequence = 0_u64;

        loop {
            interval.tick().await;
            if flag.load(Ordering::SeqCst) {
                break;
            }

            let increment = step(current);
            if increment.is_finite() && increment > 0.0 {
                current += increment;
            }
            sequence += 1;

            let tick = ProgressTick {
                value: ProgressValue::new(current.min(PROGRESS_CAP)),
                phase: Phase::for_progress(current, PROGRESS_CAP),
                sequence,
            };
            if on_tick(tick) == TickControl::Stop {
                flag.store(true, Ordering::SeqCst);
                trace!(sequence, "progress simulator stopped by its owner");
                break;
            }
        }
    });

    SimulatorHandle { stopped, task }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_sink(
        control_after: Option<u64>,
    ) -> (
        Arc<Mutex<Vec<ProgressTick>>>,
        impl FnMut(ProgressTick) -> TickControl + Send + 'static,
    ) {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink_ticks = Arc::clone(&ticks);
        let sink = move |tick: ProgressTick| {
            sink_ticks.lock().unwrap().push(tick);
            match control_after {
                Some(limit) if tick.sequence >= limit => TickControl::Stop,
                _ => TickControl::Continue,
            }
        };
        (ticks, sink)
    }

    fn fixed_step(step: f64) -> impl FnMut(f64) -> f64 + Send + 'static {
        move |_: f64| step
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_progress_is_non_decreasing_and_capped() {
        let settings = SimulatorSettings::default();
        let (ticks, sink) = recording_sink(None);
        let handle = start(&settings, settings.random_step(), sink);

        tokio::time::sleep(Duration::from_secs(30)).await;
        handle.stop();

        let ticks = ticks.lock().unwrap();
        assert!(ticks.len() > 20, "expected many ticks, got {}", ticks.len());
        for pair in ticks.windows(2) {
            assert!(pair[1].value >= pair[0].value, "progress decreased: {pair:?}");
        }
        for tick in ticks.iter() {
            assert!((0.0..=PROGRESS_CAP).contains(&tick.value.get()));
        }
        let last = ticks.last().unwrap();
        assert!((last.value.get() - PROGRESS_CAP).abs() < f64::EPSILON);
        assert_eq!(last.phase, Phase::WrappingUp);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_cadence() {
        let settings = SimulatorSettings::default();
        let (ticks, sink) = recording_sink(None);
        let _handle = start(&settings, fixed_step(10.0), sink);

        tokio::time::sleep(settings.cadence - Duration::from_millis(1)).await;
        assert!(ticks.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(ticks.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_steps_accumulate_with_phase_bands() {
        let settings = SimulatorSettings::default();
        let (ticks, sink) = recording_sink(None);
        let _handle = start(&settings, fixed_step(25.0), sink);

        tokio::time::sleep(settings.cadence * 5 + Duration::from_millis(1)).await;

        let ticks = ticks.lock().unwrap();
        let values: Vec<f64> = ticks.iter().map(|t| t.value.get()).collect();
        assert_eq!(values, vec![25.0, 50.0, 75.0, 95.0, 95.0]);
        let phases: Vec<Phase> = ticks.iter().map(|t| t.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::ContactingService,
                Phase::CraftingContent,
                Phase::AssemblingSlides,
                Phase::WrappingUp,
                Phase::WrappingUp,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_step_never_decreases_value() {
        let settings = SimulatorSettings::default();
        let (ticks, sink) = recording_sink(None);
        let mut calls = 0;
        let step = move |_: f64| {
            calls += 1;
            if calls % 2 == 0 { -40.0 } else { 10.0 }
        };
        let _handle = start(&settings, step, sink);

        tokio::time::sleep(settings.cadence * 4 + Duration::from_millis(1)).await;

        let values: Vec<f64> = ticks.lock().unwrap().iter().map(|t| t.value.get()).collect();
        assert_eq!(values, vec![10.0, 10.0, 20.0, 20.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_is_safe_and_no_further_ticks() {
        let settings = SimulatorSettings::default();
        let (ticks, sink) = recording_sink(None);
        let handle = start(&settings, fixed_step(5.0), sink);

        tokio::time::sleep(settings.cadence * 2 + Duration::from_millis(1)).await;
        assert!(handle.stop());
        assert!(!handle.stop());
        assert!(handle.is_stopped());

        let seen = ticks.lock().unwrap().len();
        tokio::time::sleep(settings.cadence * 10).await;
        assert_eq!(ticks.lock().unwrap().len(), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_control_stop_ends_simulator() {
        let settings = SimulatorSettings::default();
        let (ticks, sink) = recording_sink(Some(2));
        let handle = start(&settings, fixed_step(5.0), sink);

        tokio::time::sleep(settings.cadence * 10).await;

        assert_eq!(ticks.lock().unwrap().len(), 2);
        assert!(handle.is_stopped());
        assert!(!handle.stop(), "stop after auto-stop is a no-op");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_ticks() {
        let settings = SimulatorSettings::default();
        let (ticks, sink) = recording_sink(None);
        let handle = start(&settings, fixed_step(5.0), sink);

        tokio::time::sleep(settings.cadence + Duration::from_millis(1)).await;
        drop(handle);
        tokio::time::sleep(settings.cadence * 5).await;

        assert_eq!(ticks.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_random_step_stays_within_bounds() {
        let settings = SimulatorSettings::default();
        let mut step = settings.random_step();
        for _ in 0..1000 {
            let value = step(0.0);
            assert!((DEFAULT_MIN_STEP..DEFAULT_MAX_STEP).contains(&value));
        }
    }

    #[test]
    fn test_random_step_degenerate_bounds_is_constant() {
        let settings = SimulatorSettings {
            min_step: 3.0,
            max_step: 3.0,
            ..SimulatorSettings::default()
        };
        let mut step = settings.random_step();
        assert!((step(50.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_value_clamps() {
        assert_eq!(ProgressValue::new(-5.0), ProgressValue::ZERO);
        assert_eq!(ProgressValue::new(140.0), ProgressValue::COMPLETE);
        assert_eq!(ProgressValue::new(f64::NAN), ProgressValue::ZERO);
        assert_eq!(ProgressValue::new(42.4).percent(), 42);
        assert_eq!(ProgressValue::new(42.6).percent(), 43);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_cadence_is_raised_to_minimum_and_ticks() {
        let settings = SimulatorSettings {
            cadence: Duration::ZERO,
            ..SimulatorSettings::default()
        };
        assert_eq!(settings.effective_cadence(), MIN_TICK_INTERVAL);
        let (ticks, sink) = recording_sink(None);
        let handle = start(&settings, fixed_step(10.0), sink);

        tokio::time::sleep(MIN_TICK_INTERVAL * 20).await;

        let values: Vec<f64> = ticks.lock().unwrap().iter().map(|t| t.value.get()).collect();
        assert!(values.len() >= 5, "expected ticks, got {values:?}");
        assert_eq!(values[..5], [10.0, 20.0, 30.0, 40.0, 50.0]);
        assert!(!handle.is_stopped());
        assert!(handle.stop());
    }

    #[test]
    fn test_random_step_with_unusable_bounds_falls_back_to_min() {
        let cases = [
            (7.0, f64::INFINITY),
            (7.0, f64::NAN),
            (7.0, 7.0),
            (7.0, 3.0),
            (-f64::MAX, f64::MAX),
        ];
        for (min_step, max_step) in cases {
            let settings = SimulatorSettings {
                min_step,
                max_step,
                ..SimulatorSettings::default()
            };
            let mut step = settings.random_step();
            assert_eq!(step(0.0), min_step, "bounds {min_step}..{max_step}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_infinite_max_step_keeps_simulator_ticking() {
        let settings = SimulatorSettings {
            min_step: 7.0,
            max_step: f64::INFINITY,
            ..SimulatorSettings::default()
        };
        let (ticks, sink) = recording_sink(None);
        let handle = start(&settings, settings.random_step(), sink);

        tokio::time::sleep(settings.cadence * 2 + Duration::from_millis(1)).await;

        let values: Vec<f64> = ticks.lock().unwrap().iter().map(|t| t.value.get()).collect();
        assert_eq!(values, vec![7.0, 14.0]);
        assert!(!handle.is_stopped());
    }
}
