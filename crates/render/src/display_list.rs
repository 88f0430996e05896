use model::Point2;
use serde::Serialize;

use crate::{Glow, Paint, Stroke, Surface, TextStyle};

/// One recorded drawing call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Background { paint: Paint },
    Polyline { points: Vec<Point2>, closed: bool, stroke: Stroke },
    Outline { d: String, stroke: Stroke },
    FillCircle { center: Point2, radius: f64, paint: Paint },
    StrokeCircle { center: Point2, radius: f64, stroke: Stroke },
    Polygon { points: Vec<Point2>, paint: Paint, outline: Option<Stroke>, glow: Option<Glow> },
    Text { at: Point2, text: String, style: TextStyle },
}

/// Surface that records instead of drawing. Replays onto any other surface.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayList {
    width: f64,
    height: f64,
    ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, ops: Vec::new() }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn replay<S: Surface>(&self, target: &mut S) {
        for op in &self.ops {
            match op {
                DrawOp::Background { paint } => target.fill_background(paint),
                DrawOp::Polyline { points, closed, stroke } => target.stroke_polyline(points, *closed, stroke),
                DrawOp::Outline { d, stroke } => target.stroke_outline(d, stroke),
                DrawOp::FillCircle { center, radius, paint } => target.fill_circle(*center, *radius, paint),
                DrawOp::StrokeCircle { center, radius, stroke } => target.stroke_circle(*center, *radius, stroke),
                DrawOp::Polygon { points, paint, outline, glow } => {
                    target.fill_polygon(points, paint, outline.as_ref(), *glow)
                }
                DrawOp::Text { at, text, style } => target.text(*at, text, style),
            }
        }
    }
}

impl Surface for DisplayList {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn fill_background(&mut self, paint: &Paint) {
        self.ops.push(DrawOp::Background { paint: paint.clone() });
    }

    fn stroke_polyline(&mut self, points: &[Point2], closed: bool, stroke: &Stroke) {
        if points.len() < 2 {
            return;
        }
        self.ops.push(DrawOp::Polyline { points: points.to_vec(), closed, stroke: stroke.clone() });
    }

    fn stroke_outline(&mut self, d: &str, stroke: &Stroke) {
        self.ops.push(DrawOp::Outline { d: d.to_string(), stroke: stroke.clone() });
    }

    fn fill_circle(&mut self, center: Point2, radius: f64, paint: &Paint) {
        self.ops.push(DrawOp::FillCircle { center, radius, paint: paint.clone() });
    }

    fn stroke_circle(&mut self, center: Point2, radius: f64, stroke: &Stroke) {
        self.ops.push(DrawOp::StrokeCircle { center, radius, stroke: stroke.clone() });
    }

    fn fill_polygon(&mut self, points: &[Point2], paint: &Paint, outline: Option<&Stroke>, glow: Option<Glow>) {
        if points.len() < 3 {
            return;
        }
        self.ops.push(DrawOp::Polygon {
            points: points.to_vec(),
            paint: paint.clone(),
            outline: outline.cloned(),
            glow,
        });
    }

    fn text(&mut self, at: Point2, text: &str, style: &TextStyle) {
        self.ops.push(DrawOp::Text { at, text: text.to_string(), style: style.clone() });
    }
}
