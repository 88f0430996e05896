use camera::{project, CameraState, Projected, Viewport};
use geometry::TrackPath;
use lap_sim::{FrameSnapshot, LapContext};
use model::{Color, Point2, Point3, Sector};
use serde::Serialize;
use tracing::debug;

use crate::{Glow, GradientStop, Paint, Stroke, Surface, TextStyle};

pub const STAR_COUNT: usize = 80;

const EDGE_HALF_WIDTH: f64 = 12.0;
const MARKER_HALF_WIDTH: f64 = 0.14;
const START_LINE_HALF: f64 = 0.1;
const CHEVRON_SIZE: f64 = 9.0;
/// Speed at which trail and glow reach full size.
const SPEED_SCALE: f64 = 360.0;

#[derive(Clone, Copy, Debug)]
struct SectorTint {
    fill: Color,
    edge: Color,
}

const SECTOR_TINTS: [SectorTint; 3] = [
    SectorTint { fill: Color::rgba(225, 6, 0, 0.06), edge: Color::rgba(225, 6, 0, 0.45) },
    SectorTint { fill: Color::rgba(0, 212, 255, 0.06), edge: Color::rgba(0, 212, 255, 0.45) },
    SectorTint { fill: Color::rgba(255, 215, 0, 0.06), edge: Color::rgba(255, 215, 0, 0.45) },
];

/// Normalised star position; `y` stays in the upper half.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub brightness: f64,
}

pub fn stars(count: usize) -> Vec<Star> {
    (0..count)
        .map(|i| Star {
            x: ((i * 7919 + 1013) % 10007) as f64 / 10007.0,
            y: ((i * 6271 + 2017) % 10007) as f64 / 10007.0 * 0.5,
            brightness: 0.04 + ((i * 3571) % 100) as f64 / 100.0 * 0.08,
        })
        .collect()
}

/// Perspective view of the normalised track.
#[derive(Clone, Debug)]
pub struct SceneRenderer {
    path: TrackPath<Point3>,
    sectors: Vec<Sector>,
    stars: Vec<Star>,
}

fn screen(p: Projected) -> Point2 {
    Point2::new(p.x, p.y)
}

fn shade(color: Color) -> Paint {
    Paint::Solid(color)
}

impl SceneRenderer {
    pub fn new(lap: &LapContext<Point3>) -> Self {
        debug!(circuit = %lap.circuit_id(), points = lap.path().points().len(), "scene prepared");
        Self {
            path: lap.path().clone(),
            sectors: lap.sectors().to_vec(),
            stars: stars(STAR_COUNT),
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn draw<S: Surface>(&self, surface: &mut S, frame: &FrameSnapshot<Point3>, camera: &CameraState, team: Color) {
        let (w, h) = (surface.width(), surface.height());
        let vp = Viewport::new(w, h);
        let speed = frame.timing.telemetry.speed;

        self.draw_backdrop(surface, w, h);

        let track: Vec<Point2> = self
            .path
            .points()
            .iter()
            .filter_map(|p| project(*p, camera, vp))
            .map(screen)
            .collect();
        if track.len() > 1 {
            self.draw_track(surface, &track);
        }

        self.draw_markers(surface, camera, vp);
        self.draw_start_line(surface, camera, vp);

        // oldest first so the newest dot ends on top
        let cap = frame.trail_capacity.max(1) as f64;
        for (i, p) in frame.trail.iter().enumerate().rev() {
            let Some(pt) = project(*p, camera, vp) else {
                continue;
            };
            let alpha = 1.0 - i as f64 / cap;
            let radius = ((4.0 + speed / SPEED_SCALE * 4.0) * alpha).max(0.5);
            surface.fill_circle(screen(pt), radius, &shade(team.faded(alpha * 0.45)));
        }

        self.draw_car(surface, frame, camera, vp, team);

        let vignette = Paint::radial(
            Point2::new(w / 2.0, h / 2.0),
            w.min(h) * 0.35,
            w.max(h) * 0.7,
            vec![
                GradientStop::new(0.0, Color::TRANSPARENT),
                GradientStop::new(1.0, Color::BLACK.with_alpha(0.35)),
            ],
        );
        surface.fill_background(&vignette);
    }

    fn draw_backdrop<S: Surface>(&self, surface: &mut S, w: f64, h: f64) {
        let sky = Paint::radial(
            Point2::new(w / 2.0, h * 0.35),
            0.0,
            w.max(h) * 0.85,
            vec![
                GradientStop::new(0.0, Color::rgb(0x0f, 0x15, 0x28)),
                GradientStop::new(0.4, Color::rgb(0x0a, 0x0f, 0x1f)),
                GradientStop::new(1.0, Color::rgb(0x02, 0x04, 0x08)),
            ],
        );
        surface.fill_background(&sky);

        for star in &self.stars {
            surface.fill_circle(
                Point2::new(star.x * w, star.y * h),
                0.7,
                &shade(Color::WHITE.with_alpha(star.brightness)),
            );
        }

        let cyan = Color::rgb(0, 212, 255);
        let ground = Paint::radial(
            Point2::new(w / 2.0, h * 0.55),
            0.0,
            w.min(h) * 0.5,
            vec![GradientStop::new(0.0, cyan.with_alpha(0.015)), GradientStop::new(1.0, cyan.with_alpha(0.0))],
        );
        surface.fill_background(&ground);
    }

    fn draw_track<S: Surface>(&self, surface: &mut S, track: &[Point2]) {
        let n = track.len();
        surface.stroke_polyline(track, false, &Stroke::new(Color::rgba(30, 32, 48, 0.7), 26.0).round());

        // index ranges over the visible points only
        for (s, sector) in self.sectors.iter().enumerate() {
            let start = (sector.start_percent * n as f64).floor().max(0.0) as usize;
            let end = ((sector.end_percent * n as f64).floor().max(0.0) as usize).min(n - 1);
            if end <= start {
                continue;
            }
            let tint = SECTOR_TINTS[s % SECTOR_TINTS.len()];
            surface.stroke_polyline(&track[start..=end], false, &Stroke::new(tint.fill, 22.0).round());
        }

        for sign in [1.0, -1.0] {
            let edge: Vec<Point2> = (0..n)
                .map(|i| {
                    let (a, b) = (track[i], track[(i + 1) % n]);
                    let (dx, dy) = (b.x - a.x, b.y - a.y);
                    let len = dx.hypot(dy);
                    let len = if len > 0.0 { len } else { 1.0 };
                    Point2::new(
                        a.x - dy / len * EDGE_HALF_WIDTH * sign,
                        a.y + dx / len * EDGE_HALF_WIDTH * sign,
                    )
                })
                .collect();
            surface.stroke_polyline(&edge, false, &Stroke::new(Color::WHITE.with_alpha(0.12), 1.0).round());
        }

        surface.stroke_polyline(
            track,
            false,
            &Stroke::new(Color::WHITE.with_alpha(0.04), 1.0).dashed(8.0, 16.0).round(),
        );
    }

    /// Ground-plane perpendicular at `progress`, scaled to `half`.
    fn across(&self, progress: f64, ahead: f64, half: f64) -> (Point3, Point3) {
        let here = self.path.sample(progress).point;
        let next = self.path.sample(ahead).point;
        let (dx, dz) = (next.x - here.x, next.z - here.z);
        let len = dx.hypot(dz);
        let len = if len > 0.0 { len } else { 1.0 };
        let (px, pz) = (-dz / len * half, dx / len * half);
        (
            Point3::new(here.x + px, here.y, here.z + pz),
            Point3::new(here.x - px, here.y, here.z - pz),
        )
    }

    fn draw_markers<S: Surface>(&self, surface: &mut S, camera: &CameraState, vp: Viewport) {
        for (i, sector) in self.sectors.iter().enumerate() {
            let start = sector.start_percent;
            let (left, right) = self.across(start, (start + 0.005).min(0.999), MARKER_HALF_WIDTH);
            let (Some(l), Some(r)) = (project(left, camera, vp), project(right, camera, vp)) else {
                continue;
            };
            let tint = SECTOR_TINTS[i % SECTOR_TINTS.len()];
            surface.line(screen(l), screen(r), &Stroke::new(tint.edge, 2.0));
            let label_at = Point2::new((l.x + r.x) / 2.0, l.y.min(r.y) - 12.0);
            surface.text(label_at, &format!("S{}", i + 1), &TextStyle::new(tint.edge, 9.0).weight(600));
        }
    }

    fn draw_start_line<S: Surface>(&self, surface: &mut S, camera: &CameraState, vp: Viewport) {
        let (a, b) = self.across(0.0, 0.005, START_LINE_HALF);
        if let (Some(a), Some(b)) = (project(a, camera, vp), project(b, camera, vp)) {
            surface.line(screen(a), screen(b), &Stroke::new(Color::WHITE.with_alpha(0.6), 1.5).dashed(3.0, 3.0));
        }
    }

    fn draw_car<S: Surface>(
        &self,
        surface: &mut S,
        frame: &FrameSnapshot<Point3>,
        camera: &CameraState,
        vp: Viewport,
        team: Color,
    ) {
        let Some(car) = project(frame.car.point, camera, vp) else {
            return;
        };
        let center = screen(car);
        let speed = frame.timing.telemetry.speed;

        let glow_radius = 14.0 + speed / SPEED_SCALE * 20.0;
        let glow = Paint::radial(
            center,
            0.0,
            glow_radius,
            vec![
                GradientStop::new(0.0, team.faded(53.0 / 255.0)),
                GradientStop::new(0.4, team.faded(21.0 / 255.0)),
                GradientStop::new(1.0, team.with_alpha(0.0)),
            ],
        );
        surface.fill_circle(center, glow_radius, &glow);

        let ahead = self.path.sample(frame.timing.progress + 0.01).point;
        let heading = project(ahead, camera, vp)
            .map(|a| (a.y - car.y).atan2(a.x - car.x))
            .unwrap_or(0.0);
        let (sin, cos) = heading.sin_cos();
        let s = CHEVRON_SIZE;
        let chevron: Vec<Point2> = [(s, 0.0), (-s * 0.6, -s * 0.55), (-s * 0.25, 0.0), (-s * 0.6, s * 0.55)]
            .iter()
            .map(|&(x, y)| Point2::new(center.x + x * cos - y * sin, center.y + x * sin + y * cos))
            .collect();
        surface.fill_polygon(
            &chevron,
            &shade(team),
            Some(&Stroke::new(Color::WHITE.with_alpha(0.75), 1.0)),
            Some(Glow { color: team, blur: 22.0 }),
        );
    }
}
