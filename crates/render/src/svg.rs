use std::fmt::Write as _;

use model::{Color, Point2};

use crate::{Glow, Paint, Stroke, Surface, TextAnchor, TextStyle};

/// Renders into a standalone SVG document.
#[derive(Clone, Debug)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    view_box: Option<String>,
    defs: String,
    body: String,
    next_id: usize,
}

fn num(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn hex(c: &Color) -> String {
    format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn points_attr(points: &[Point2]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", num(p.x), num(p.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            view_box: None,
            defs: String::new(),
            body: String::new(),
            next_id: 0,
        }
    }

    /// Draw in the given user space (e.g. a circuit's own `viewBox`)
    /// instead of pixels.
    pub fn with_view_box(mut self, view_box: impl Into<String>) -> Self {
        self.view_box = Some(view_box.into());
        self
    }

    pub fn finish(self) -> String {
        let view_box = self
            .view_box
            .unwrap_or_else(|| format!("0 0 {} {}", num(self.width), num(self.height)));
        let mut doc = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"{}\">\n",
            num(self.width),
            num(self.height),
            escape(&view_box)
        );
        if !self.defs.is_empty() {
            doc.push_str("<defs>\n");
            doc.push_str(&self.defs);
            doc.push_str("</defs>\n");
        }
        doc.push_str(&self.body);
        doc.push_str("</svg>\n");
        doc
    }

    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn fill_attrs(&mut self, paint: &Paint) -> String {
        match paint {
            Paint::Solid(c) => {
                let mut s = format!("fill=\"{}\"", hex(c));
                if c.a < 1.0 {
                    let _ = write!(s, " fill-opacity=\"{}\"", num(c.a.max(0.0)));
                }
                s
            }
            Paint::Radial(g) => {
                let id = self.id("g");
                let outer = g.outer_radius.max(f64::EPSILON);
                let inner = g.inner_radius.clamp(0.0, outer);
                let _ = writeln!(
                    self.defs,
                    "<radialGradient id=\"{}\" gradientUnits=\"userSpaceOnUse\" cx=\"{}\" cy=\"{}\" r=\"{}\">",
                    id,
                    num(g.center.x),
                    num(g.center.y),
                    num(outer)
                );
                for stop in &g.stops {
                    // SVG stops start at the centre, not at the inner circle
                    let offset = (inner + stop.offset.clamp(0.0, 1.0) * (outer - inner)) / outer;
                    let _ = writeln!(
                        self.defs,
                        "<stop offset=\"{}\" stop-color=\"{}\" stop-opacity=\"{}\"/>",
                        num(offset),
                        hex(&stop.color),
                        num(stop.color.a)
                    );
                }
                self.defs.push_str("</radialGradient>\n");
                format!("fill=\"url(#{})\"", id)
            }
        }
    }

    fn stroke_attrs(stroke: &Stroke) -> String {
        let mut s = format!("fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"", hex(&stroke.color), num(stroke.width));
        if stroke.color.a < 1.0 {
            let _ = write!(s, " stroke-opacity=\"{}\"", num(stroke.color.a.max(0.0)));
        }
        if let Some([dash, gap]) = stroke.dash {
            let _ = write!(s, " stroke-dasharray=\"{} {}\"", num(dash), num(gap));
        }
        if stroke.round {
            s.push_str(" stroke-linecap=\"round\" stroke-linejoin=\"round\"");
        }
        s
    }

    fn glow_filter(&mut self, glow: Glow) -> String {
        let id = self.id("f");
        let _ = writeln!(
            self.defs,
            "<filter id=\"{}\" x=\"-100%\" y=\"-100%\" width=\"300%\" height=\"300%\"><feDropShadow dx=\"0\" dy=\"0\" stdDeviation=\"{}\" flood-color=\"{}\" flood-opacity=\"{}\"/></filter>",
            id,
            num(glow.blur / 2.0),
            hex(&glow.color),
            num(glow.color.a)
        );
        format!(" filter=\"url(#{})\"", id)
    }
}

impl Surface for SvgSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn fill_background(&mut self, paint: &Paint) {
        let fill = self.fill_attrs(paint);
        let _ = writeln!(
            self.body,
            "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" {}/>",
            num(self.width),
            num(self.height),
            fill
        );
    }

    fn stroke_polyline(&mut self, points: &[Point2], closed: bool, stroke: &Stroke) {
        if points.len() < 2 {
            return;
        }
        let tag = if closed { "polygon" } else { "polyline" };
        let _ = writeln!(self.body, "<{} points=\"{}\" {}/>", tag, points_attr(points), Self::stroke_attrs(stroke));
    }

    fn stroke_outline(&mut self, d: &str, stroke: &Stroke) {
        let _ = writeln!(self.body, "<path d=\"{}\" {}/>", escape(d), Self::stroke_attrs(stroke));
    }

    fn fill_circle(&mut self, center: Point2, radius: f64, paint: &Paint) {
        let fill = self.fill_attrs(paint);
        let _ = writeln!(
            self.body,
            "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" {}/>",
            num(center.x),
            num(center.y),
            num(radius),
            fill
        );
    }

    fn stroke_circle(&mut self, center: Point2, radius: f64, stroke: &Stroke) {
        let _ = writeln!(
            self.body,
            "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" {}/>",
            num(center.x),
            num(center.y),
            num(radius),
            Self::stroke_attrs(stroke)
        );
    }

    fn fill_polygon(&mut self, points: &[Point2], paint: &Paint, outline: Option<&Stroke>, glow: Option<Glow>) {
        if points.len() < 3 {
            return;
        }
        let fill = self.fill_attrs(paint);
        let filter = glow.map(|g| self.glow_filter(g)).unwrap_or_default();
        let pts = points_attr(points);
        let _ = writeln!(self.body, "<polygon points=\"{}\" {}{}/>", pts, fill, filter);
        if let Some(stroke) = outline {
            let _ = writeln!(self.body, "<polygon points=\"{}\" {}/>", pts, Self::stroke_attrs(stroke));
        }
    }

    fn text(&mut self, at: Point2, text: &str, style: &TextStyle) {
        let anchor = match style.anchor {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        };
        let mut fill = format!("fill=\"{}\"", hex(&style.color));
        if style.color.a < 1.0 {
            let _ = write!(fill, " fill-opacity=\"{}\"", num(style.color.a.max(0.0)));
        }
        let _ = writeln!(
            self.body,
            "<text x=\"{}\" y=\"{}\" font-size=\"{}\" font-weight=\"{}\" text-anchor=\"{}\" {}>{}</text>",
            num(at.x),
            num(at.y),
            num(style.size),
            style.weight,
            anchor,
            fill,
            escape(text)
        );
    }
}
