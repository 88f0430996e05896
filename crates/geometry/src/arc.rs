use model::{Point2, Point3};
use serde::Serialize;

/// A polyline vertex type that can be measured and interpolated.
pub trait Waypoint: Copy + std::fmt::Debug + PartialEq {
    const ORIGIN: Self;
    /// Tangent reported for degenerate paths.
    const UNIT_X: Self;

    fn distance(&self, other: &Self) -> f64;
    fn lerp(&self, other: &Self, t: f64) -> Self;
    /// `other - self`
    fn delta(&self, other: &Self) -> Self;
    /// Ground-plane coordinates (x/y for 2D, x/z for 3D).
    fn planar(&self) -> Point2;
}

impl Waypoint for Point2 {
    const ORIGIN: Self = Point2::new(0.0, 0.0);
    const UNIT_X: Self = Point2::new(1.0, 0.0);

    fn distance(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point2::new(lerp(self.x, other.x, t), lerp(self.y, other.y, t))
    }

    fn delta(&self, other: &Self) -> Self {
        Point2::new(other.x - self.x, other.y - self.y)
    }

    fn planar(&self) -> Point2 {
        *self
    }
}

impl Waypoint for Point3 {
    const ORIGIN: Self = Point3::new(0.0, 0.0, 0.0);
    const UNIT_X: Self = Point3::new(1.0, 0.0, 0.0);

    fn distance(&self, other: &Self) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point3::new(
            lerp(self.x, other.x, t),
            lerp(self.y, other.y, t),
            lerp(self.z, other.z, t),
        )
    }

    fn delta(&self, other: &Self) -> Self {
        Point3::new(other.x - self.x, other.y - self.y, other.z - self.z)
    }

    fn planar(&self) -> Point2 {
        Point2::new(self.x, self.z)
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Cumulative distance along a polyline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArcLengthTable {
    cumulative: Vec<f64>,
    total: f64,
}

impl ArcLengthTable {
    pub fn build<P: Waypoint>(points: &[P]) -> Self {
        let mut cumulative = Vec::with_capacity(points.len().max(1));
        cumulative.push(0.0);
        let mut total = 0.0;
        for w in points.windows(2) {
            total += w[0].distance(&w[1]);
            cumulative.push(total);
        }
        Self { cumulative, total }
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Segment `(prev, next, t)` holding `distance`, found by binary search.
    fn locate(&self, distance: f64) -> (usize, usize, f64) {
        let last = self.cumulative.len() - 1;
        let next = self.cumulative.partition_point(|&c| c < distance).clamp(1, last);
        let prev = next - 1;
        let segment = (self.cumulative[next] - self.cumulative[prev]).max(1e-6);
        let t = ((distance - self.cumulative[prev]) / segment).clamp(0.0, 1.0);
        (prev, next, t)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PathSample<P> {
    pub point: P,
    /// Direction of the containing segment, not normalized.
    pub tangent: P,
}

/// A polyline with its arc-length table, sampled by lap progress.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackPath<P> {
    points: Vec<P>,
    arc: ArcLengthTable,
}

impl<P: Waypoint> TrackPath<P> {
    pub fn new(points: Vec<P>) -> Self {
        let arc = ArcLengthTable::build(&points);
        Self { points, arc }
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    pub fn arc(&self) -> &ArcLengthTable {
        &self.arc
    }

    pub fn total_length(&self) -> f64 {
        self.arc.total
    }

    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2 || self.arc.total <= 0.0
    }

    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) if self.points.len() > 1 => a.distance(b) < 1e-9,
            _ => false,
        }
    }

    /// Position at `progress` of the loop, at uniform speed along the path.
    ///
    /// Progress is wrapped into `[0, 1)` first.
    pub fn sample(&self, progress: f64) -> PathSample<P> {
        if self.is_degenerate() {
            return PathSample {
                point: self.points.first().copied().unwrap_or(P::ORIGIN),
                tangent: P::UNIT_X,
            };
        }
        let progress = if progress.is_finite() { progress.rem_euclid(1.0) } else { 0.0 };
        let (prev, next, t) = self.arc.locate(progress * self.arc.total);
        let (p0, p1) = (&self.points[prev], &self.points[next]);
        PathSample { point: p0.lerp(p1, t), tangent: p0.delta(p1) }
    }
}

impl TrackPath<Point2> {
    /// Literal outline geometry, as used by the flat overlay.
    pub fn from_outline(d: &str) -> Self {
        Self::new(crate::parse_outline(d))
    }
}

impl TrackPath<Point3> {
    /// Normalized world-space geometry, as used by the perspective scene.
    pub fn from_outline_normalized(d: &str) -> Self {
        Self::new(crate::normalize_track(&crate::parse_outline(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square() -> TrackPath<Point2> {
        TrackPath::from_outline("M 0 0 L 10 0 L 10 10 L 0 10 Z")
    }

    #[test]
    fn table_accumulates_segment_lengths() {
        let path = square();
        assert_eq!(path.arc().cumulative(), &[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(path.total_length(), 40.0);
        assert!(path.is_closed());
    }

    #[test]
    fn sample_is_uniform_in_distance() {
        let path = square();
        let s = path.sample(0.125);
        assert_eq!(s.point, Point2::new(5.0, 0.0));
        assert_eq!(s.tangent, Point2::new(10.0, 0.0));
        let s = path.sample(0.5);
        assert_eq!(s.point, Point2::new(10.0, 10.0));
        let s = path.sample(0.625);
        assert_eq!(s.point, Point2::new(5.0, 10.0));
        assert_eq!(s.tangent, Point2::new(-10.0, 0.0));
    }

    #[test]
    fn sample_wraps_progress() {
        let path = square();
        assert_eq!(path.sample(1.25).point, path.sample(0.25).point);
        assert_eq!(path.sample(-0.25).point, path.sample(0.75).point);
        assert_eq!(path.sample(1.0).point, path.sample(0.0).point);
        assert_eq!(path.sample(f64::NAN).point, Point2::new(0.0, 0.0));
    }

    #[test]
    fn degenerate_paths_fall_back() {
        let empty: TrackPath<Point3> = TrackPath::new(vec![]);
        assert_eq!(empty.arc().cumulative(), &[0.0]);
        assert_eq!(empty.total_length(), 0.0);
        let s = empty.sample(0.4);
        assert_eq!(s.point, Point3::ORIGIN);
        assert_eq!(s.tangent, Point3::UNIT_X);

        let single = TrackPath::new(vec![Point2::new(3.0, 4.0)]);
        assert_eq!(single.sample(0.7).point, Point2::new(3.0, 4.0));

        let stacked = TrackPath::new(vec![Point2::new(1.0, 1.0); 4]);
        assert!(stacked.is_degenerate());
        assert_eq!(stacked.sample(0.5).tangent, Point2::UNIT_X);
    }

    #[test]
    fn wraparound_has_no_jump() {
        let path = TrackPath::from_outline_normalized(
            "M 100 100 C 200 0 400 0 500 100 L 500 300 C 400 400 200 400 100 300 Z",
        );
        let step = 0.004;
        let mut progress = 0.99;
        let mut prev = path.sample(progress).point;
        for _ in 0..10 {
            progress = (progress + step) % 1.0;
            let next = path.sample(progress).point;
            let expected = step * path.total_length();
            let moved = prev.distance(&next);
            assert!(moved <= expected + 1e-9, "moved {moved} > {expected}");
            assert!(moved > 0.0);
            prev = next;
        }
    }

    proptest! {
        #[test]
        fn cumulative_is_monotonic(pts in prop::collection::vec((-100.0f64..100.0, -100.0f64..100.0, -5.0f64..5.0), 0..64)) {
            let pts: Vec<Point3> = pts.into_iter().map(|(x, y, z)| Point3::new(x, y, z)).collect();
            let table = ArcLengthTable::build(&pts);
            let c = table.cumulative();
            prop_assert_eq!(c[0], 0.0);
            prop_assert_eq!(c.len(), pts.len().max(1));
            for w in c.windows(2) {
                prop_assert!(w[0] <= w[1]);
            }
            prop_assert_eq!(*c.last().unwrap(), table.total());
        }
    }
}
