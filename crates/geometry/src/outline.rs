//! Track outline parsing.
//!
//! Outlines use the absolute subset of SVG path syntax: `M`, `L`, `C` and `Z`.
//! Parsing is best-effort: anything else is dropped and a short operand list
//! ends the current command, so a malformed outline yields a partial polyline
//! instead of an error.

use model::{Point2, Point3};
use svgtypes::Stream;

use crate::bbox_of;

/// Fixed number of parametric steps per cubic segment.
pub const CURVE_STEPS: usize = 16;

/// Longest dimension of a normalized track, in world units.
pub const TRACK_EXTENT: f64 = 2.6;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Command {
    Move,
    Line,
    Curve,
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Command(Command),
    Number(f64),
}

fn tokenize(d: &str) -> Vec<Token> {
    let bytes = d.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let command = match c {
            b'M' => Some(Command::Move),
            b'L' => Some(Command::Line),
            b'C' => Some(Command::Curve),
            b'Z' => Some(Command::Close),
            _ => None,
        };
        if let Some(cmd) = command {
            tokens.push(Token::Command(cmd));
            i += 1;
            continue;
        }
        if matches!(c, b'-' | b'+' | b'.') || c.is_ascii_digit() {
            // a stray sign or dot is skipped like any other unknown byte
            let mut s = Stream::from(&d[i..]);
            match s.parse_number() {
                Ok(v) if s.pos() > 0 => {
                    tokens.push(Token::Number(v));
                    i += s.pos();
                }
                _ => i += 1,
            }
            continue;
        }
        i += 1;
    }
    tokens
}

fn take_numbers<const N: usize>(tokens: &[Token], idx: &mut usize) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for (k, slot) in out.iter_mut().enumerate() {
        match tokens.get(*idx + k) {
            Some(Token::Number(v)) => *slot = *v,
            _ => return None,
        }
    }
    *idx += N;
    Some(out)
}

pub fn cubic_bezier(p0: Point2, p1: Point2, p2: Point2, p3: Point2, t: f64) -> Point2 {
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let t2 = t * t;
    Point2 {
        x: mt2 * mt * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t2 * t * p3.x,
        y: mt2 * mt * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t2 * t * p3.y,
    }
}

/// Tessellates an outline into a polyline in traversal order.
pub fn parse_outline(d: &str) -> Vec<Point2> {
    let tokens = tokenize(d);
    let mut points = Vec::with_capacity(tokens.len());
    let mut command: Option<Command> = None;
    let mut current = Point2::default();
    let mut start: Option<Point2> = None;
    let mut idx = 0;

    while idx < tokens.len() {
        match tokens[idx] {
            Token::Command(cmd) => {
                idx += 1;
                command = match cmd {
                    Command::Move => match take_numbers::<2>(&tokens, &mut idx) {
                        Some([x, y]) => {
                            current = Point2::new(x, y);
                            start = Some(current);
                            points.push(current);
                            // trailing pairs after a move are line-tos
                            Some(Command::Line)
                        }
                        None => None,
                    },
                    Command::Close => {
                        if let Some(s) = start {
                            points.push(s);
                            current = s;
                        }
                        None
                    }
                    other => Some(other),
                };
            }
            Token::Number(_) => match command {
                Some(Command::Line) => match take_numbers::<2>(&tokens, &mut idx) {
                    Some([x, y]) => {
                        current = Point2::new(x, y);
                        points.push(current);
                    }
                    None => idx += 1,
                },
                Some(Command::Curve) => match take_numbers::<6>(&tokens, &mut idx) {
                    Some([x1, y1, x2, y2, x, y]) => {
                        let c1 = Point2::new(x1, y1);
                        let c2 = Point2::new(x2, y2);
                        let end = Point2::new(x, y);
                        for step in 1..=CURVE_STEPS {
                            let t = step as f64 / CURVE_STEPS as f64;
                            points.push(cubic_bezier(current, c1, c2, end, t));
                        }
                        current = end;
                    }
                    None => idx += 1,
                },
                _ => idx += 1,
            },
        }
    }
    points
}

/// Centres and scales a 2D polyline into world space with cosmetic undulation.
///
/// The plane maps to x/z with the longest side spanning [`TRACK_EXTENT`]. The
/// vertical coordinate is two fixed sinusoids over traversal position, a
/// stand-in for real elevation data. Both complete whole cycles over the lap
/// so a closed outline stays closed.
pub fn normalize_track(points: &[Point2]) -> Vec<Point3> {
    if points.is_empty() {
        return Vec::new();
    }
    let b = bbox_of(points);
    let cx = (b.minx + b.maxx) / 2.0;
    let cy = (b.miny + b.maxy) / 2.0;
    let span = (b.maxx - b.minx).max(b.maxy - b.miny);
    let span = if span > 0.0 { span } else { 1.0 };
    let last = points.len().saturating_sub(1).max(1) as f64;

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let t = i as f64 / last;
            Point3 {
                x: (p.x - cx) / span * TRACK_EXTENT,
                y: elevation(t),
                z: (p.y - cy) / span * TRACK_EXTENT,
            }
        })
        .collect()
}

fn elevation(t: f64) -> f64 {
    use std::f64::consts::PI;
    0.12 * (t * PI * 6.0).sin() + 0.06 * (t * PI * 4.0).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn line_and_close() {
        let pts = parse_outline("M 0 0 L 10 0 L 10 10 Z");
        assert_eq!(
            pts,
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 0.0),
            ]
        );
    }

    #[test]
    fn curve_is_subdivided() {
        let pts = parse_outline("M0,0 C 0,10 10,10 10,0");
        assert_eq!(pts.len(), 1 + CURVE_STEPS);
        assert_eq!(*pts.last().unwrap(), Point2::new(10.0, 0.0));
        // symmetric control polygon peaks at t = 0.5
        let mid = pts[CURVE_STEPS / 2];
        assert!((mid.x - 5.0).abs() < 1e-9);
        assert!((mid.y - 7.5).abs() < 1e-9);
    }

    #[test]
    fn repeated_operands_continue_command() {
        let pts = parse_outline("M 0 0 1 1 2 2 L 3 3 4 4");
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[4], Point2::new(4.0, 4.0));
    }

    #[test]
    fn garbage_is_skipped() {
        let pts = parse_outline("M 0 0 H 5 Q L 3 x 3 C 1 2 Z");
        // unknown letters vanish, the lone operand after "H" and the short
        // curve operand list are dropped
        assert_eq!(pts, vec![Point2::new(0.0, 0.0), Point2::new(3.0, 3.0), Point2::new(0.0, 0.0)]);
        assert_eq!(*pts.last().unwrap(), Point2::new(0.0, 0.0));
        assert!(pts.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert!(parse_outline("").is_empty());
        assert!(parse_outline("Z Z 1 2").is_empty());
    }

    #[test]
    fn numbers_without_leading_digit() {
        let pts = parse_outline("M-.5.5L1e1-2");
        assert_eq!(pts, vec![Point2::new(-0.5, 0.5), Point2::new(10.0, -2.0)]);
        // lone signs and dots are noise, explicit plus signs are numbers
        let pts = parse_outline("M - 1 . 2 L +3,+4");
        assert_eq!(pts, vec![Point2::new(1.0, 2.0), Point2::new(3.0, 4.0)]);
    }

    #[test]
    fn closed_outline_has_no_elevation_seam() {
        let pts = parse_outline("M 0 0 L 100 0 C 120 20 120 40 100 60 L 0 60 Z");
        let n = normalize_track(&pts);
        let (first, last) = (n[0], n[n.len() - 1]);
        assert!((first.y - last.y).abs() < 1e-12);
        assert!((first.x - last.x).abs() < 1e-12);
        assert!((first.z - last.z).abs() < 1e-12);
    }

    #[test]
    fn normalize_centres_and_scales() {
        let pts = vec![Point2::new(100.0, 50.0), Point2::new(300.0, 50.0), Point2::new(300.0, 150.0)];
        let n = normalize_track(&pts);
        assert_eq!(n.len(), 3);
        assert!((n[0].x + 1.3).abs() < 1e-9);
        assert!((n[1].x - 1.3).abs() < 1e-9);
        assert!((n[0].z + 0.65).abs() < 1e-9);
        assert!((n[2].z - 0.65).abs() < 1e-9);
        assert!((n[0].y - 0.06).abs() < 1e-9);
        assert!(normalize_track(&[]).is_empty());

        let single = normalize_track(&[Point2::new(4.0, 4.0)]);
        assert_eq!(single[0].x, 0.0);
        assert_eq!(single[0].z, 0.0);
    }

    proptest! {
        #[test]
        fn parse_is_deterministic(coords in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 1..24)) {
            let mut d = format!("M {} {}", coords[0].0, coords[0].1);
            for (i, (x, y)) in coords.iter().enumerate().skip(1) {
                if i % 3 == 0 {
                    d.push_str(&format!(" C {x} {y} {y} {x} {x} {y}"));
                } else {
                    d.push_str(&format!(" L {x} {y}"));
                }
            }
            d.push_str(" Z");
            let a = parse_outline(&d);
            let b = parse_outline(&d);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.first(), a.last());
            prop_assert_eq!(normalize_track(&a), normalize_track(&b));
        }
    }
}
