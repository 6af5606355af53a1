//! Per-stage timing of the tracking pipeline.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::filter::{Ema, Filter};

const EMA_ALPHA: f32 = 0.3;

/// Measures how long one stage of the pipeline takes, smoothed over the runs since the last report.
///
/// Displaying a timer with `{}` reports the smoothed duration and the number of runs, then starts
/// a new reporting period.
pub struct StageTimer {
    stage: &'static str,
    period: Mutex<Period>,
}

/// Measurements collected since the last report.
struct Period {
    seconds: Ema,
    runs: usize,
}

impl Period {
    fn new() -> Self {
        Self {
            seconds: Ema::new(EMA_ALPHA),
            runs: 0,
        }
    }

    fn average(&self) -> (Duration, usize) {
        let secs = self.seconds.last().unwrap_or(0.0);
        (Duration::from_secs_f32(secs), self.runs)
    }
}

impl StageTimer {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            period: Mutex::new(Period::new()),
        }
    }

    /// Runs `stage`, recording how long it took.
    pub fn time<T>(&self, stage: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        stage()
    }

    /// Starts a measurement that ends when the returned guard is dropped.
    pub fn start(&self) -> StageGuard<'_> {
        StageGuard {
            started: Instant::now(),
            timer: self,
        }
    }

    /// Returns the smoothed duration and the number of runs in the current reporting period.
    pub fn average(&self) -> (Duration, usize) {
        self.period().average()
    }

    /// Like [`StageTimer::average`], but also starts a new reporting period.
    pub fn take(&self) -> (Duration, usize) {
        let mut period = self.period();
        let average = period.average();
        *period = Period::new();
        average
    }

    fn period(&self) -> MutexGuard<'_, Period> {
        // A panic while holding the lock can only corrupt a timing value.
        self.period.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, elapsed: Duration) {
        let mut period = self.period();
        period.seconds.push(elapsed.as_secs_f32());
        period.runs += 1;
    }
}

impl fmt::Display for StageTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (avg, runs) = self.take();
        let avg_ms = avg.as_secs_f32() * 1000.0;
        write!(f, "{}: {runs}x{avg_ms:.01}ms", self.stage)
    }
}

impl fmt::Debug for StageTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (avg, runs) = self.average();
        f.debug_struct("StageTimer")
            .field("stage", &self.stage)
            .field("avg", &avg)
            .field("runs", &runs)
            .finish()
    }
}

/// Guard returned by [`StageTimer::start`].
pub struct StageGuard<'a> {
    started: Instant,
    timer: &'a StageTimer,
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.started.elapsed());
    }
}

/// Counts tracked frames and logs the frame rate, with a per-stage breakdown, once per second.
pub struct FpsCounter {
    name: String,
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            since: Instant::now(),
        }
    }

    /// Counts one frame. Once a second has passed, logs the frame rate and reports `stages`.
    pub fn tick(&mut self, stages: &[&StageTimer]) {
        self.frames += 1;
        if self.since.elapsed() <= Duration::from_secs(1) {
            return;
        }

        let breakdown = stages
            .iter()
            .map(|stage| stage.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        log::debug!("{}: {} FPS ({})", self.name, self.frames, breakdown);

        self.frames = 0;
        self.since = Instant::now();
    }
}
