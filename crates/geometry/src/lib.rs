mod arc;
mod outline;

pub use arc::{lerp, ArcLengthTable, PathSample, TrackPath, Waypoint};
pub use outline::{cubic_bezier, normalize_track, parse_outline, CURVE_STEPS, TRACK_EXTENT};

use model::{BBox, Point2};
use serde_json::{json, Value};

pub fn bbox_of<P: Waypoint>(points: &[P]) -> BBox {
    let (mut minx, mut maxx, mut miny, mut maxy) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);

    for p in points.iter().map(Waypoint::planar) {
        if p.x < minx { minx = p.x; }
        if p.x > maxx { maxx = p.x; }
        if p.y < miny { miny = p.y; }
        if p.y > maxy { maxy = p.y; }
    }

    if points.is_empty() {
        return BBox { minx: 0.0, maxx: 0.0, miny: 0.0, maxy: 0.0 };
    }
    BBox { minx, maxx, miny, maxy }
}

/// Unit planar normal of a tangent, or `None` when it has no length.
pub fn planar_normal<P: Waypoint>(tangent: &P) -> Option<Point2> {
    let t = tangent.planar();
    let len = t.x.hypot(t.y);
    if len <= f64::EPSILON {
        return None;
    }
    Some(Point2::new(-t.y / len, t.x / len))
}

/// Summary of a built track, for logs and the viewer's `describe` command.
pub fn describe_track<P: Waypoint>(path: &TrackPath<P>) -> Value {
    let bbox = bbox_of(path.points());
    json!({
        "points": path.points().len(),
        "total_length": path.total_length(),
        "closed": path.is_closed(),
        "degenerate": path.is_degenerate(),
        "bbox": {
            "minx": bbox.minx, "maxx": bbox.maxx,
            "miny": bbox.miny, "maxy": bbox.maxy
        }
    })
}
