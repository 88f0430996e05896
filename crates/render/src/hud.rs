use lap_sim::LapTiming;
use model::{Color, Point2};
use serde::Serialize;

use crate::{Paint, Surface, TextAnchor, TextStyle};

pub const GAUGE_STIFFNESS: f64 = 140.0;
pub const GAUGE_DAMPING: f64 = 22.0;

/// Integration substep, seconds.
const MAX_STEP: f64 = 0.004;
/// Longer gaps (a paused or backgrounded host) are clipped to this.
const MAX_GAP: f64 = 1.0;

const THROTTLE_GREEN: Color = Color::rgb(0x00, 0xFF, 0x88);
const BRAKE_RED: Color = Color::rgb(0xE1, 0x06, 0x00);
const COMPLETE_GREEN: Color = Color::rgb(74, 222, 128);
const ACTIVE_CYAN: Color = Color::rgb(0x00, 0xD4, 0xFF);

/// Damped spring chasing a target value, unit mass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpringGauge {
    value: f64,
    velocity: f64,
    primed: bool,
}

impl SpringGauge {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The first call lands on `target` directly.
    pub fn step(&mut self, target: f64, dt_ms: f64) -> f64 {
        if !self.primed {
            self.value = target;
            self.velocity = 0.0;
            self.primed = true;
            return self.value;
        }
        let mut remaining = if dt_ms.is_finite() { (dt_ms / 1000.0).clamp(0.0, MAX_GAP) } else { 0.0 };
        while remaining > 0.0 {
            let h = remaining.min(MAX_STEP);
            let accel = GAUGE_STIFFNESS * (target - self.value) - GAUGE_DAMPING * self.velocity;
            self.velocity += accel * h;
            self.value += self.velocity * h;
            remaining -= h;
        }
        self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Pending,
    Active,
    Complete,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectorSlot {
    pub label: String,
    pub time: String,
    pub state: SlotState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LiveStatus {
    Live,
    Paused,
}

/// What the telemetry panel shows for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HudView {
    pub speed: i64,
    pub gear: i8,
    /// Spring-smoothed, percent.
    pub throttle: f64,
    pub brake: f64,
    pub sectors: Vec<SectorSlot>,
    pub lap_time: String,
    pub status: LiveStatus,
}

/// Telemetry and sector panel. Only its own gauges animate; timing is read
/// as given.
#[derive(Clone, Debug, Default)]
pub struct Hud {
    throttle: SpringGauge,
    brake: SpringGauge,
}

impl Hud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&mut self, timing: &LapTiming, dt_ms: f64) -> HudView {
        let t = &timing.telemetry;
        let throttle = self.throttle.step(t.throttle, dt_ms).clamp(0.0, 100.0);
        let brake = self.brake.step(t.brake, dt_ms).clamp(0.0, 100.0);
        let sectors = timing
            .sector_times
            .iter()
            .enumerate()
            .map(|(i, time)| SectorSlot {
                label: format!("S{}", i + 1),
                time: time.to_string(),
                state: if time.is_recorded() {
                    SlotState::Complete
                } else if i == timing.current_sector {
                    SlotState::Active
                } else {
                    SlotState::Pending
                },
            })
            .collect();
        HudView {
            speed: t.speed.round() as i64,
            gear: t.gear,
            throttle,
            brake,
            sectors,
            lap_time: timing.lap_time.clone(),
            status: if timing.animating { LiveStatus::Live } else { LiveStatus::Paused },
        }
    }

    /// Paints the panel along the bottom edge of the surface.
    pub fn draw<S: Surface>(&self, surface: &mut S, view: &HudView, team: Color) {
        let (w, h) = (surface.width(), surface.height());
        let top = h - 64.0;
        surface.fill_rect(12.0, top, (w - 24.0).max(0.0), 52.0, &Paint::Solid(Color::rgba(10, 15, 31, 0.72)));

        let caption = TextStyle::new(Color::WHITE.with_alpha(0.25), 7.0).weight(600);
        let base = top + 34.0;
        let mut x = 28.0;

        let big = TextStyle::new(Color::WHITE, 26.0).weight(700).anchor(TextAnchor::Start);
        surface.text(Point2::new(x, base), &view.speed.to_string(), &big);
        surface.text(Point2::new(x + 62.0, base), "KM/H", &caption.clone().anchor(TextAnchor::Start));
        x += 100.0;

        surface.text(Point2::new(x, base - 4.0), &view.gear.to_string(), &TextStyle::new(team, 20.0).weight(700));
        surface.text(Point2::new(x, base + 10.0), "GEAR", &caption);
        x += 34.0;

        for (label, value, color) in [("THR", view.throttle, THROTTLE_GREEN), ("BRK", view.brake, BRAKE_RED)] {
            let bar_h = 32.0;
            surface.fill_rect(x, top + 8.0, 10.0, bar_h, &Paint::Solid(Color::WHITE.with_alpha(0.06)));
            let fill = bar_h * value / 100.0;
            if fill > 0.0 {
                surface.fill_rect(x, top + 8.0 + bar_h - fill, 10.0, fill, &Paint::Solid(color));
            }
            surface.text(Point2::new(x + 5.0, base + 10.0), label, &caption);
            x += 20.0;
        }
        x += 14.0;

        for slot in &view.sectors {
            let color = match slot.state {
                SlotState::Complete => COMPLETE_GREEN,
                SlotState::Active => ACTIVE_CYAN,
                SlotState::Pending => Color::WHITE.with_alpha(0.15),
            };
            surface.text(Point2::new(x + 16.0, base - 12.0), &slot.label, &caption);
            surface.text(Point2::new(x + 16.0, base + 2.0), &slot.time, &TextStyle::new(color, 11.0).weight(700));
            x += 44.0;
        }

        surface.text(Point2::new(x + 24.0, base - 12.0), "LAP", &caption);
        surface.text(Point2::new(x + 24.0, base + 2.0), &view.lap_time, &TextStyle::new(Color::WHITE, 12.0).weight(700));

        let (dot, status) = match view.status {
            LiveStatus::Live => (COMPLETE_GREEN, "LIVE"),
            LiveStatus::Paused => (Color::WHITE.with_alpha(0.2), "PAUSED"),
        };
        let right = w - 28.0;
        surface.fill_circle(Point2::new(right - 30.0, base - 3.0), 3.0, &Paint::Solid(dot));
        surface.text(Point2::new(right, base), status, &caption.anchor(TextAnchor::End));
    }
}
