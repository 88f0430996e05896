use std::{collections::VecDeque, fmt};

use geometry::Waypoint;
use model::sector_index;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::{config::SectorTiming, LapContext};

pub const PLACEHOLDER: &str = "--";

/// One split slot of the timing row.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SectorTime {
    #[default]
    Placeholder,
    Recorded(String),
}

impl SectorTime {
    pub fn as_str(&self) -> &str {
        match self {
            SectorTime::Placeholder => PLACEHOLDER,
            SectorTime::Recorded(s) => s,
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, SectorTime::Recorded(_))
    }
}

impl fmt::Display for SectorTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SectorTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Host clock reading for one animation frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub now_ms: f64,
    /// Elapsed wall-clock time since the previous frame.
    pub delta_ms: f64,
}

impl Tick {
    pub fn new(now_ms: f64, delta_ms: f64) -> Self {
        Self { now_ms, delta_ms }
    }
}

/// `m:ss.mmm`
pub fn format_lap_time(elapsed_ms: f64) -> String {
    let total_ms = if elapsed_ms.is_finite() { elapsed_ms.max(0.0).round() as u64 } else { 0 };
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) as f64 / 1000.0;
    format!("{}:{:06.3}", minutes, seconds)
}

/// `ss.mmm` below a minute, lap format above.
pub fn format_sector_time(elapsed_ms: f64) -> String {
    if elapsed_ms < 60_000.0 {
        format!("{:.3}", elapsed_ms.max(0.0) / 1000.0)
    } else {
        format_lap_time(elapsed_ms)
    }
}

/// Everything the simulator mutates frame to frame.
///
/// Transitions are by value: [`SimulationState::advance`] and
/// [`SimulationState::settle`] consume the old state and return the next one.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState<P> {
    pub(crate) progress: f64,
    pub(crate) current_sector: usize,
    pub(crate) sector_times: Vec<SectorTime>,
    pub(crate) lap_start_ms: f64,
    pub(crate) sector_start_ms: f64,
    /// Newest first.
    pub(crate) trail: VecDeque<P>,
    pub(crate) pending_lap_reset_at: Option<f64>,
    pub(crate) lap_time: String,
}

impl<P> Default for SimulationState<P> {
    fn default() -> Self {
        Self {
            progress: 0.0,
            current_sector: 0,
            sector_times: Vec::new(),
            lap_start_ms: 0.0,
            sector_start_ms: 0.0,
            trail: VecDeque::new(),
            pending_lap_reset_at: None,
            lap_time: String::new(),
        }
    }
}

impl<P: Waypoint> SimulationState<P> {
    /// Fresh lap at the start line with every slot on the placeholder.
    pub fn new(sector_count: usize, now_ms: f64) -> Self {
        Self {
            sector_times: vec![SectorTime::Placeholder; sector_count],
            lap_start_ms: now_ms,
            sector_start_ms: now_ms,
            lap_time: format_lap_time(0.0),
            ..Self::default()
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_sector(&self) -> usize {
        self.current_sector
    }

    pub fn sector_times(&self) -> &[SectorTime] {
        &self.sector_times
    }

    pub fn lap_start_ms(&self) -> f64 {
        self.lap_start_ms
    }

    pub fn trail(&self) -> &VecDeque<P> {
        &self.trail
    }

    pub fn pending_lap_reset_at(&self) -> Option<f64> {
        self.pending_lap_reset_at
    }

    pub fn lap_time(&self) -> &str {
        &self.lap_time
    }

    /// Moves the car one frame along the lap and updates timing.
    pub fn advance(mut self, lap: &LapContext<P>, tick: Tick) -> Self {
        let cfg = lap.config();
        let speed = lap.telemetry_at(self.progress).speed;
        let factor = cfg.speed_factor(speed);
        let delta = if tick.delta_ms.is_finite() { tick.delta_ms.max(0.0) } else { 0.0 };
        self.progress = (self.progress + delta / cfg.lap_duration_ms * factor).rem_euclid(1.0);

        let car = lap.path().sample(self.progress);
        self.trail.push_front(car.point);
        self.trail.truncate(cfg.trail_length);

        self.track_sector(lap, tick.now_ms);
        self.lap_time = format_lap_time(tick.now_ms - self.lap_start_ms);
        self
    }

    /// Applies a due lap reset: clears every slot and restarts the lap clock
    /// at the scheduled instant. Runs every frame, paused or not.
    pub fn settle(mut self, now_ms: f64) -> Self {
        if let Some(at) = self.pending_lap_reset_at {
            if now_ms >= at {
                self.sector_times.fill(SectorTime::Placeholder);
                self.lap_start_ms = at;
                self.pending_lap_reset_at = None;
            }
        }
        self
    }

    fn track_sector(&mut self, lap: &LapContext<P>, now_ms: f64) {
        let sectors = lap.sectors();
        // outside every configured sector: keep the last index
        let Some(index) = sector_index(sectors, self.progress) else {
            return;
        };
        if index == self.current_sector {
            return;
        }
        let prev = self.current_sector;
        let last = sectors.len() - 1;

        if index == 0 && prev == last {
            self.record(prev, lap, now_ms);
            self.pending_lap_reset_at = Some(now_ms + lap.config().lap_reset_delay_ms);
            info!(circuit = %lap.circuit_id(), lap_time = %self.lap_time, "lap complete");
        } else if index > prev {
            self.record(prev, lap, now_ms);
            debug!(circuit = %lap.circuit_id(), from = prev, to = index, "sector crossed");
        }
        self.current_sector = index;
    }

    fn record(&mut self, slot: usize, lap: &LapContext<P>, now_ms: f64) {
        let value = match lap.config().sector_timing {
            SectorTiming::Reference => lap.sectors()[slot].best_time.clone(),
            SectorTiming::Stopwatch => format_sector_time(now_ms - self.sector_start_ms),
        };
        if let Some(s) = self.sector_times.get_mut(slot) {
            *s = SectorTime::Recorded(value);
        }
        self.sector_start_ms = now_ms;
    }
}
