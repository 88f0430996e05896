use anyhow::{anyhow, Result};
use camera::{raw_camera, CameraRig};
use circuit_io::Catalog;
use lap_sim::{LapContext, LapSimulator, LapTiming, Tick, TimingTx};
use model::{CameraMode, Circuit, Color, Point2, Point3};
use parking_lot::Mutex;
use render::{DisplayList, Hud, HudView, OverlayRenderer, SceneRenderer, Surface, SvgSurface};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    commands::Command,
    config::{ViewKind, ViewerConfig},
};

pub struct Session {
    inner: Mutex<Inner>,
}

enum Stage {
    Overlay { sim: LapSimulator<Point2>, renderer: OverlayRenderer },
    Scene { sim: LapSimulator<Point3>, renderer: SceneRenderer, rig: CameraRig },
}

impl Stage {
    fn build(circuit: &Circuit, view: ViewKind, config: &ViewerConfig, now_ms: f64) -> Self {
        let sim = config.sim(view);
        match view {
            ViewKind::Overlay => {
                let lap = LapContext::overlay(circuit, sim);
                let renderer = OverlayRenderer::new(circuit, &lap);
                Stage::Overlay { sim: LapSimulator::new(lap, now_ms), renderer }
            }
            ViewKind::Scene => {
                let lap = LapContext::scene(circuit, sim);
                let renderer = SceneRenderer::new(&lap);
                Stage::Scene { sim: LapSimulator::new(lap, now_ms), renderer, rig: CameraRig::new() }
            }
        }
    }

    fn describe(&self) -> Value {
        match self {
            Stage::Overlay { sim, .. } => geometry::describe_track(sim.context().path()),
            Stage::Scene { sim, .. } => geometry::describe_track(sim.context().path()),
        }
    }
}

pub struct Inner {
    catalog: Catalog,
    config: ViewerConfig,
    view: ViewKind,
    circuit_id: String,
    team: Color,
    camera: CameraMode,
    animating: bool,
    stage: Stage,
    hud: Hud,
    last_now: Option<f64>,
    frames: u64,
    quit: bool,
    timing_tx: Option<TimingTx>,
}

/// Everything one frame produced.
#[derive(Clone, Debug, Serialize)]
pub struct FrameOutput {
    pub index: u64,
    pub timing: LapTiming,
    pub hud: HudView,
    pub list: DisplayList,
    /// Set for the overlay, which draws in the circuit's own coordinates.
    pub view_box: Option<String>,
}

impl FrameOutput {
    pub fn to_svg(&self) -> String {
        let mut svg = SvgSurface::new(self.list.width(), self.list.height());
        if let Some(vb) = &self.view_box {
            svg = svg.with_view_box(vb.clone());
        }
        self.list.replay(&mut svg);
        svg.finish()
    }
}

/// Width and height of a `minx miny w h` view box.
fn view_box_size(view_box: &str) -> Option<(f64, f64)> {
    let nums = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match nums.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

fn team_color(hex: &str) -> Color {
    Color::from_hex(hex).unwrap_or_else(|e| {
        warn!(color = hex, error = %e, "bad team colour, using default");
        Color::team(None)
    })
}

impl Session {
    pub fn new(catalog: Catalog, config: ViewerConfig, now_ms: f64) -> Result<Self> {
        let circuit = match &config.circuit {
            Some(id) => catalog.get(id).ok_or_else(|| anyhow!("unknown circuit {:?}", id))?,
            None => catalog.first(),
        };
        let view = config.view;
        let stage = Stage::build(circuit, view, &config, now_ms);
        info!(circuit = %circuit.id, view = %view, "session started");
        let inner = Inner {
            circuit_id: circuit.id.clone(),
            team: team_color(&config.team_color),
            camera: config.camera,
            view,
            animating: true,
            stage,
            hud: Hud::new(),
            last_now: None,
            frames: 0,
            quit: false,
            timing_tx: None,
            catalog,
            config,
        };
        Ok(Self { inner: Mutex::new(inner) })
    }

    /// Publish every frame's timing on `tx` from now on.
    pub fn subscribe(&self, tx: TimingTx) {
        self.inner.lock().timing_tx = Some(tx);
    }

    pub fn apply(&self, cmd: Command, now_ms: f64) {
        self.inner.lock().apply(cmd, now_ms);
    }

    pub fn frame(&self, now_ms: f64) -> FrameOutput {
        self.inner.lock().frame(now_ms)
    }

    pub fn should_quit(&self) -> bool {
        self.inner.lock().quit
    }

    pub fn circuit_id(&self) -> String {
        self.inner.lock().circuit_id.clone()
    }

    pub fn view(&self) -> ViewKind {
        self.inner.lock().view
    }

    pub fn list(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .catalog
            .circuits()
            .iter()
            .map(|c| {
                let mark = if c.id == inner.circuit_id { '*' } else { ' ' };
                format!("{} {:<12} {} ({}, {:.3} km)", mark, c.id, c.name, c.country_code, c.length_km)
            })
            .collect()
    }

    pub fn describe(&self) -> Value {
        let inner = self.inner.lock();
        let circuit = inner.catalog.get(&inner.circuit_id);
        json!({
            "circuit": inner.circuit_id,
            "name": circuit.map(|c| c.name.as_str()),
            "view": inner.view.as_str(),
            "camera": inner.camera.as_str(),
            "animating": inner.animating,
            "sectors": circuit.map(|c| c.sectors.len()),
            "track": inner.stage.describe(),
        })
    }
}

impl Inner {
    fn rebuild(&mut self, now_ms: f64) {
        let Some(circuit) = self.catalog.get(&self.circuit_id) else {
            return;
        };
        self.stage = Stage::build(circuit, self.view, &self.config, now_ms);
        self.hud = Hud::new();
    }

    fn apply(&mut self, cmd: Command, now_ms: f64) {
        match cmd {
            Command::Circuit(id) => {
                if self.catalog.get(&id).is_none() {
                    warn!(circuit = %id, "unknown circuit, keeping {}", self.circuit_id);
                    return;
                }
                info!(from = %self.circuit_id, to = %id, "switching circuit");
                self.circuit_id = id;
                self.rebuild(now_ms);
            }
            Command::View(view) => {
                if view != self.view {
                    self.view = view;
                    self.rebuild(now_ms);
                    info!(view = %view, "view changed");
                }
            }
            // the rig keeps its pose and eases toward the new mode's target
            Command::Camera(mode) => {
                self.camera = mode;
                debug!(camera = %mode, "camera mode");
            }
            Command::Color(c) => self.team = c,
            Command::Play => self.animating = true,
            Command::Pause => self.animating = false,
            Command::Toggle => self.animating = !self.animating,
            Command::Quit => self.quit = true,
            Command::List | Command::Describe => {}
        }
    }

    fn frame(&mut self, now_ms: f64) -> FrameOutput {
        let delta = self.last_now.map_or(0.0, |prev| (now_ms - prev).max(0.0));
        self.last_now = Some(now_ms);
        let tick = Tick::new(now_ms, delta);
        let (width, height) = (self.config.render.width, self.config.render.height);

        let (timing, mut list, view_box) = match &mut self.stage {
            Stage::Overlay { sim, renderer } => {
                let frame = sim.frame(tick, self.animating);
                let (w, h) = view_box_size(renderer.view_box()).unwrap_or((width, height));
                let mut list = DisplayList::new(w, h);
                renderer.draw(&mut list, &frame, self.team);
                (frame.timing, list, Some(renderer.view_box().to_string()))
            }
            Stage::Scene { sim, renderer, rig } => {
                let frame = sim.frame(tick, self.animating);
                let raw = raw_camera(self.camera, now_ms, frame.car.point, frame.car.tangent);
                let cam = rig.update(self.camera, raw);
                let mut list = DisplayList::new(width, height);
                renderer.draw(&mut list, &frame, &cam, self.team);
                (frame.timing, list, None)
            }
        };

        let hud = self.hud.view(&timing, delta);
        if view_box.is_none() {
            self.hud.draw(&mut list, &hud, self.team);
        }

        if let Some(tx) = &self.timing_tx {
            if tx.send(timing.clone()).is_err() {
                debug!("timing observer gone");
                self.timing_tx = None;
            }
        }

        let index = self.frames;
        self.frames += 1;
        FrameOutput { index, timing, hud, list, view_box }
    }
}
