use geometry::TrackPath;
use lap_sim::{FrameSnapshot, LapContext};
use model::{Circuit, Color, Point2};
use serde::Serialize;
use tracing::debug;

use crate::{GradientStop, Paint, Stroke, Surface, TextStyle};

const START_LINE_HALF: f64 = 14.0;
const CAR_RADIUS: f64 = 5.0;
const CAR_GLOW_RADIUS: f64 = 16.0;

const TRACK_CYAN: Color = Color::rgb(0x00, 0xD4, 0xFF);
const TRACK_RED: Color = Color::rgba(225, 6, 0, 0.15);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectorMark {
    pub at: Point2,
    pub label: String,
}

/// Flat view drawn in the circuit's own coordinate space.
///
/// Sector marks and the start line depend only on the circuit, so they are
/// computed once when the renderer is built.
#[derive(Clone, Debug)]
pub struct OverlayRenderer {
    outline: String,
    view_box: String,
    start_line: Option<(Point2, Point2)>,
    sector_marks: Vec<SectorMark>,
}

fn start_line(path: &TrackPath<Point2>) -> Option<(Point2, Point2)> {
    if path.points().is_empty() {
        return None;
    }
    let start = path.sample(0.0).point;
    let near = path.sample(0.005).point;
    let angle = (near.y - start.y).atan2(near.x - start.x) + std::f64::consts::FRAC_PI_2;
    let (dx, dy) = (angle.cos() * START_LINE_HALF, angle.sin() * START_LINE_HALF);
    Some((
        Point2::new(start.x + dx, start.y + dy),
        Point2::new(start.x - dx, start.y - dy),
    ))
}

impl OverlayRenderer {
    pub fn new(circuit: &Circuit, lap: &LapContext<Point2>) -> Self {
        let path = lap.path();
        let sector_marks = lap
            .sectors()
            .iter()
            .map(|s| SectorMark { at: path.sample(s.start_percent).point, label: s.short_label() })
            .collect::<Vec<_>>();
        debug!(circuit = %circuit.id, marks = sector_marks.len(), "overlay prepared");
        Self {
            outline: circuit.svg_path.clone(),
            view_box: circuit.svg_view_box.clone(),
            start_line: start_line(path),
            sector_marks,
        }
    }

    pub fn view_box(&self) -> &str {
        &self.view_box
    }

    pub fn sector_marks(&self) -> &[SectorMark] {
        &self.sector_marks
    }

    pub fn start_line(&self) -> Option<(Point2, Point2)> {
        self.start_line
    }

    pub fn draw<S: Surface>(&self, surface: &mut S, frame: &FrameSnapshot<Point2>, team: Color) {
        // road ghost, red edge, cyan line
        surface.stroke_outline(&self.outline, &Stroke::new(Color::WHITE.with_alpha(0.03), 20.0).round());
        surface.stroke_outline(&self.outline, &Stroke::new(TRACK_RED, 6.0).round());
        surface.stroke_outline(&self.outline, &Stroke::new(TRACK_CYAN.with_alpha(0.9), 2.5).round());

        if let Some((a, b)) = self.start_line {
            surface.line(a, b, &Stroke::new(Color::WHITE.with_alpha(0.6), 2.0).dashed(3.0, 3.0));
        }

        let label = TextStyle::new(TRACK_CYAN.with_alpha(0.6), 11.0).weight(700);
        for mark in &self.sector_marks {
            surface.stroke_circle(mark.at, 4.0, &Stroke::new(TRACK_CYAN.with_alpha(0.5), 1.0));
            surface.text(Point2::new(mark.at.x, mark.at.y - 12.0), &mark.label, &label);
        }

        let cap = frame.trail_capacity.max(1) as f64;
        for (i, p) in frame.trail.iter().enumerate() {
            let k = i as f64 / cap;
            let radius = (3.0 - k * 3.0).max(1.0);
            let opacity = (1.0 - k).max(0.0) * 0.6;
            surface.fill_circle(*p, radius, &Paint::Solid(team.faded(opacity)));
        }

        let car = frame.car.point;
        let glow = Paint::radial(
            car,
            0.0,
            CAR_GLOW_RADIUS,
            vec![
                GradientStop::new(0.0, team),
                GradientStop::new(0.5, team.faded(0.4)),
                GradientStop::new(1.0, team.with_alpha(0.0)),
            ],
        );
        surface.fill_circle(car, CAR_GLOW_RADIUS, &glow.faded(0.5));
        surface.fill_circle(car, CAR_RADIUS, &Paint::Solid(team));
        surface.stroke_circle(car, CAR_RADIUS, &Stroke::new(Color::WHITE, 1.5));

        if frame.timing.animating {
            surface.stroke_circle(car, CAR_RADIUS, &Stroke::new(team.faded(0.4), 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing, DisplayList, DrawOp};
    use lap_sim::{LapSimulator, SimConfig, Tick};

    fn setup() -> (Circuit, OverlayRenderer, LapSimulator<Point2>) {
        let circuit = testing::circuit();
        let lap = LapContext::overlay(&circuit, SimConfig::overlay());
        let renderer = OverlayRenderer::new(&circuit, &lap);
        (circuit, renderer, LapSimulator::new(lap, 0.0))
    }

    #[test]
    fn marks_sit_on_sector_starts() {
        let (_, r, sim) = setup();
        let labels: Vec<_> = r.sector_marks().iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["S1", "S2", "S3"]);
        // 320 units of perimeter; sector 2 starts a third of the way round
        let at = r.sector_marks()[1].at;
        let expected = sim.context().path().sample(1.0 / 3.0).point;
        assert_eq!(at, expected);
        assert_eq!(r.sector_marks()[0].at, Point2::new(0.0, 0.0));
    }

    #[test]
    fn start_line_is_perpendicular() {
        let (_, r, _) = setup();
        // track leaves the origin along +x
        let (a, b) = r.start_line().unwrap();
        assert!((a.x).abs() < 1e-9 && (a.y - 14.0).abs() < 1e-9);
        assert!((b.x).abs() < 1e-9 && (b.y + 14.0).abs() < 1e-9);
    }

    #[test]
    fn draw_order_and_trail() {
        let (_, r, mut sim) = setup();
        for i in 1..=30 {
            sim.frame(Tick::new(i as f64 * 16.0, 16.0), true);
        }
        let frame = sim.snapshot(true);
        let mut list = DisplayList::new(100.0, 60.0);
        r.draw(&mut list, &frame, Color::team(Some("#FF8000")));

        let widths: Vec<f64> = list
            .ops()
            .iter()
            .take(3)
            .map(|op| match op {
                DrawOp::Outline { stroke, .. } => stroke.width,
                _ => 0.0,
            })
            .collect();
        assert_eq!(widths, [20.0, 6.0, 2.5]);
        assert!(matches!(list.ops()[3], DrawOp::Polyline { .. }));

        let trail: Vec<f64> = list
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillCircle { radius, paint: Paint::Solid(c), .. } if *radius <= 3.0 => Some(c.a),
                _ => None,
            })
            .collect();
        assert_eq!(trail.len(), 25);
        assert!((trail[0] - 0.6).abs() < 1e-9);
        assert!(trail.windows(2).all(|w| w[0] > w[1]));

        // pulse ring last
        assert!(matches!(list.ops().last(), Some(DrawOp::StrokeCircle { radius, .. }) if *radius == 5.0));
    }

    #[test]
    fn paused_frame_has_no_pulse() {
        let (_, r, mut sim) = setup();
        let frame = sim.frame(Tick::new(16.0, 16.0), false);
        let mut list = DisplayList::new(100.0, 60.0);
        r.draw(&mut list, &frame, Color::WHITE);
        let rings = list
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::StrokeCircle { radius, .. } if *radius == 5.0))
            .count();
        assert_eq!(rings, 1);
    }

    #[test]
    fn degenerate_outlines_draw_without_track() {
        for outline in ["", "M 5 5", "M 1 1 L 1 1 L 1 1"] {
            let mut circuit = testing::circuit();
            circuit.svg_path = outline.into();
            circuit.telemetry.clear();
            let lap = LapContext::overlay(&circuit, SimConfig::overlay());
            let r = OverlayRenderer::new(&circuit, &lap);
            let mut sim = LapSimulator::new(lap, 0.0);
            for i in 1..=10 {
                let frame = sim.frame(Tick::new(i as f64 * 16.0, 16.0), true);
                let mut list = DisplayList::new(120.0, 80.0);
                r.draw(&mut list, &frame, Color::team(None));
                assert!(!list.is_empty());
                for op in list.ops() {
                    if let DrawOp::FillCircle { center, .. } = op {
                        assert!(center.x.is_finite() && center.y.is_finite(), "{outline:?}");
                    }
                }
            }
            assert_eq!(r.start_line().is_some(), !outline.is_empty());
        }
    }
}
