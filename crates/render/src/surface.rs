use model::{Color, Point2};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

impl GradientStop {
    pub fn new(offset: f64, color: Color) -> Self {
        Self { offset, color }
    }
}

/// Two concentric circles; stop offsets run from the inner to the outer
/// radius.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RadialGradient {
    pub center: Point2,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Paint {
    Solid(Color),
    Radial(RadialGradient),
}

impl Paint {
    pub fn radial(center: Point2, inner_radius: f64, outer_radius: f64, stops: Vec<GradientStop>) -> Self {
        Paint::Radial(RadialGradient { center, inner_radius, outer_radius, stops })
    }

    /// Multiplies every alpha by `opacity`.
    pub fn faded(self, opacity: f64) -> Self {
        match self {
            Paint::Solid(c) => Paint::Solid(c.faded(opacity)),
            Paint::Radial(mut g) => {
                for stop in &mut g.stops {
                    stop.color = stop.color.faded(opacity);
                }
                Paint::Radial(g)
            }
        }
    }
}

impl From<Color> for Paint {
    fn from(c: Color) -> Self {
        Paint::Solid(c)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    /// Dash and gap lengths.
    pub dash: Option<[f64; 2]>,
    /// Round caps and joins.
    pub round: bool,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width, dash: None, round: false }
    }

    pub fn dashed(mut self, dash: f64, gap: f64) -> Self {
        self.dash = Some([dash, gap]);
        self
    }

    pub fn round(mut self) -> Self {
        self.round = true;
        self
    }
}

/// Soft coloured shadow behind a filled shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Glow {
    pub color: Color,
    pub blur: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    #[default]
    Middle,
    End,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextStyle {
    pub color: Color,
    pub size: f64,
    pub weight: u16,
    pub anchor: TextAnchor,
}

impl TextStyle {
    pub fn new(color: Color, size: f64) -> Self {
        Self { color, size, weight: 400, anchor: TextAnchor::Middle }
    }

    pub fn weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Immediate-mode drawing target in screen (or view-box) units.
pub trait Surface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Covers the whole surface.
    fn fill_background(&mut self, paint: &Paint);
    fn stroke_polyline(&mut self, points: &[Point2], closed: bool, stroke: &Stroke);
    /// Strokes literal path data, untouched.
    fn stroke_outline(&mut self, d: &str, stroke: &Stroke);
    fn fill_circle(&mut self, center: Point2, radius: f64, paint: &Paint);
    fn stroke_circle(&mut self, center: Point2, radius: f64, stroke: &Stroke);
    fn fill_polygon(&mut self, points: &[Point2], paint: &Paint, outline: Option<&Stroke>, glow: Option<Glow>);
    fn text(&mut self, at: Point2, text: &str, style: &TextStyle);

    fn line(&mut self, a: Point2, b: Point2, stroke: &Stroke) {
        self.stroke_polyline(&[a, b], false, stroke);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, paint: &Paint) {
        let pts = [
            Point2::new(x, y),
            Point2::new(x + w, y),
            Point2::new(x + w, y + h),
            Point2::new(x, y + h),
        ];
        self.fill_polygon(&pts, paint, None, None);
    }
}
