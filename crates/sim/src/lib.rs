//! Lap simulation: advances a car along a track path from cyclic telemetry
//! and derives sector and lap timing from its progress.

mod config;
mod simulator;
mod state;

pub use config::{SectorTiming, SimConfig, SimConfigError};
pub use simulator::{FrameSnapshot, LapContext, LapSimulator, LapTiming};
pub use state::{format_lap_time, format_sector_time, SectorTime, SimulationState, Tick, PLACEHOLDER};

pub type TimingTx = crossbeam_channel::Sender<LapTiming>;
pub type TimingRx = crossbeam_channel::Receiver<LapTiming>;

/// Channel for publishing per-frame timing to observers off the frame loop.
pub fn channel() -> (TimingTx, TimingRx) {
    crossbeam_channel::unbounded()
}
