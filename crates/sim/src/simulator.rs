use geometry::{PathSample, TrackPath, Waypoint};
use model::{telemetry_at, Circuit, Point2, Point3, Sector, TelemetrySample};
use serde::Serialize;
use tracing::info;

use crate::{SectorTime, SimConfig, SimulationState, Tick};

/// Static per-circuit inputs of the simulation, rebuilt on circuit change.
#[derive(Clone, Debug)]
pub struct LapContext<P> {
    pub(crate) circuit_id: String,
    pub(crate) path: TrackPath<P>,
    pub(crate) sectors: Vec<Sector>,
    pub(crate) telemetry: Vec<TelemetrySample>,
    pub(crate) config: SimConfig,
}

impl<P: Waypoint> LapContext<P> {
    pub fn new(circuit: &Circuit, path: TrackPath<P>, config: SimConfig) -> Self {
        Self {
            circuit_id: circuit.id.clone(),
            path,
            sectors: circuit.sectors.clone(),
            telemetry: circuit.telemetry.clone(),
            config,
        }
    }

    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    pub fn path(&self) -> &TrackPath<P> {
        &self.path
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn telemetry_at(&self, progress: f64) -> TelemetrySample {
        telemetry_at(&self.telemetry, progress)
    }
}

impl LapContext<Point2> {
    pub fn overlay(circuit: &Circuit, config: SimConfig) -> Self {
        Self::new(circuit, TrackPath::from_outline(&circuit.svg_path), config)
    }
}

impl LapContext<Point3> {
    pub fn scene(circuit: &Circuit, config: SimConfig) -> Self {
        Self::new(circuit, TrackPath::from_outline_normalized(&circuit.svg_path), config)
    }
}

/// Timing and telemetry part of a frame, shared by every view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LapTiming {
    pub circuit_id: String,
    pub progress: f64,
    pub telemetry: TelemetrySample,
    pub current_sector: usize,
    pub sector_times: Vec<SectorTime>,
    pub lap_time: String,
    pub animating: bool,
}

/// Read-only view of one simulated frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameSnapshot<P> {
    pub timing: LapTiming,
    pub car: PathSample<P>,
    /// Newest first.
    pub trail: Vec<P>,
    pub trail_capacity: usize,
}

/// Owns the simulation state of the active circuit.
pub struct LapSimulator<P> {
    context: LapContext<P>,
    state: SimulationState<P>,
}

impl<P: Waypoint> LapSimulator<P> {
    pub fn new(context: LapContext<P>, now_ms: f64) -> Self {
        let state = SimulationState::new(context.sectors.len(), now_ms);
        Self { context, state }
    }

    /// Switches circuits; nothing of the previous circuit survives.
    pub fn load(&mut self, context: LapContext<P>, now_ms: f64) {
        info!(
            from = %self.context.circuit_id,
            to = %context.circuit_id,
            points = context.path.points().len(),
            "circuit loaded"
        );
        self.context = context;
        self.reset(now_ms);
    }

    pub fn reset(&mut self, now_ms: f64) {
        self.state = SimulationState::new(self.context.sectors.len(), now_ms);
    }

    pub fn context(&self) -> &LapContext<P> {
        &self.context
    }

    pub fn state(&self) -> &SimulationState<P> {
        &self.state
    }

    /// One animation frame. Progress and trail only move while animating;
    /// a scheduled lap reset fires either way.
    pub fn frame(&mut self, tick: Tick, animating: bool) -> FrameSnapshot<P> {
        let mut state = std::mem::take(&mut self.state).settle(tick.now_ms);
        if animating {
            state = state.advance(&self.context, tick);
        }
        self.state = state;
        self.snapshot(animating)
    }

    pub fn snapshot(&self, animating: bool) -> FrameSnapshot<P> {
        let progress = self.state.progress();
        FrameSnapshot {
            timing: LapTiming {
                circuit_id: self.context.circuit_id.clone(),
                progress,
                telemetry: self.context.telemetry_at(progress),
                current_sector: self.state.current_sector(),
                sector_times: self.state.sector_times().to_vec(),
                lap_time: self.state.lap_time().to_string(),
                animating,
            },
            car: self.context.path.sample(progress),
            trail: self.state.trail().iter().copied().collect(),
            trail_capacity: self.context.config.trail_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{circuit, monaco};
    use crate::PLACEHOLDER;

    #[test]
    fn reset_invariant_after_circuit_change() {
        let mut sim = LapSimulator::new(monaco(SimConfig::overlay()), 0.0);
        for i in 1..=400 {
            sim.frame(Tick::new(i as f64 * 16.0, 16.0), true);
        }
        assert!(sim.state().progress() > 0.33);
        assert!(sim.state().sector_times()[0].is_recorded());

        let other = circuit("silverstone", "M 0 0 L 50 0 L 50 50 Z", &[0.0, 0.5, 1.0]);
        sim.load(LapContext::overlay(&other, SimConfig::overlay()), 7_000.0);
        let s = sim.state();
        assert_eq!(s.progress(), 0.0);
        assert!(s.trail().is_empty());
        assert_eq!(s.current_sector(), 0);
        assert_eq!(s.sector_times().len(), 2);
        assert!(s.sector_times().iter().all(|t| t.as_str() == PLACEHOLDER));
        assert_eq!(s.lap_start_ms(), 7_000.0);
        assert_eq!(sim.snapshot(true).timing.circuit_id, "silverstone");
    }

    #[test]
    fn paused_frames_freeze_progress_but_fire_reset() {
        let mut sim = LapSimulator::new(monaco(SimConfig::scene()), 0.0);
        let mut state = SimulationState::new(3, 0.0);
        state.progress = 0.98;
        state.current_sector = 2;
        sim.state = state.advance(&sim.context, Tick::new(10_000.0, 880.0));
        assert_eq!(sim.state().pending_lap_reset_at(), Some(10_500.0));

        let before = sim.state().progress();
        let trail = sim.state().trail().len();
        let snap = sim.frame(Tick::new(10_600.0, 600.0), false);
        assert_eq!(snap.timing.progress, before);
        assert_eq!(sim.state().trail().len(), trail);
        assert!(!snap.timing.animating);
        assert!(snap.timing.sector_times.iter().all(|t| !t.is_recorded()));
        assert_eq!(sim.state().lap_start_ms(), 10_500.0);
    }

    #[test]
    fn snapshot_reads_telemetry_at_progress() {
        let mut sim = LapSimulator::new(monaco(SimConfig::scene()), 0.0);
        let snap = sim.frame(Tick::new(16.0, 16.0), true);
        assert_eq!(snap.timing.telemetry.speed, 300.0);
        assert_eq!(snap.trail.len(), 1);
        assert_eq!(snap.trail[0], snap.car.point);
        assert_eq!(snap.trail_capacity, 35);
    }

    #[test]
    fn full_lap_cycles_every_sector() {
        let mut sim = LapSimulator::new(monaco(SimConfig::scene()), 0.0);
        let mut seen = vec![];
        let mut laps = 0;
        let mut last = 0.0;
        for i in 1..=2_000 {
            let snap = sim.frame(Tick::new(i as f64 * 16.0, 16.0), true);
            if snap.timing.progress < last {
                laps += 1;
            }
            last = snap.timing.progress;
            if seen.last() != Some(&snap.timing.current_sector) {
                seen.push(snap.timing.current_sector);
            }
        }
        // 32 s at a 22 s lap
        assert_eq!(laps, 1);
        assert_eq!(&seen[..4], &[0, 1, 2, 0]);
    }

    #[test]
    fn degenerate_circuits_still_run() {
        for outline in ["", "M 5 5", "M 1 1 L 1 1 L 1 1"] {
            let mut c = circuit("flat", outline, &[0.0, 0.33, 0.66, 1.0]);
            c.telemetry.clear();
            let mut overlay = LapSimulator::new(LapContext::overlay(&c, SimConfig::overlay()), 0.0);
            let mut scene = LapSimulator::new(LapContext::scene(&c, SimConfig::scene()), 0.0);
            for i in 1..=50 {
                let tick = Tick::new(i as f64 * 16.0, 16.0);
                let a = overlay.frame(tick, true);
                let b = scene.frame(tick, true);
                for t in [&a.timing, &b.timing] {
                    assert!((0.0..1.0).contains(&t.progress), "{outline:?}: {}", t.progress);
                    assert_eq!(t.telemetry.speed, 0.0);
                }
                assert!(a.car.point.x.is_finite() && a.car.point.y.is_finite());
                assert!(b.car.point.y.is_finite());
            }
            assert!(overlay.state().progress() > 0.0);
        }
    }
}
