//! View transform for the perspective scene: per-mode target cameras, frame
//! to frame smoothing, and world to screen projection.

use std::f64::consts::PI;

use geometry::lerp;
use model::{CameraMode, Point3};
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Orbit yaw rate in radians per second.
pub const ORBIT_RATE: f64 = 0.28;
/// Points closer than this to the camera plane are culled.
pub const NEAR_EPSILON: f64 = 0.1;

const SMOOTHING: f64 = 0.06;
const ORBIT_SMOOTHING: f64 = 0.03;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub yaw: f64,
    pub pitch: f64,
    pub distance: f64,
    pub target: Point3,
}

/// The camera a mode wants this frame, before smoothing.
///
/// `tangent` is the car's direction of travel; only its ground-plane part
/// is used.
pub fn raw_camera(mode: CameraMode, time_ms: f64, car: Point3, tangent: Point3) -> CameraState {
    match mode {
        CameraMode::Overview => CameraState {
            yaw: -0.55,
            pitch: 1.0,
            distance: 5.2,
            target: Point3::default(),
        },
        CameraMode::Orbit => CameraState {
            yaw: time_ms / 1000.0 * ORBIT_RATE,
            pitch: 0.72,
            distance: 4.2,
            target: Point3::default(),
        },
        CameraMode::Chase => {
            let len = (tangent.x * tangent.x + tangent.y * tangent.y + tangent.z * tangent.z).sqrt();
            let len = if len > 0.0 { len } else { 1.0 };
            let (nx, nz) = (tangent.x / len, tangent.z / len);
            CameraState {
                yaw: nx.atan2(nz) + PI * 0.78,
                pitch: 0.48,
                distance: 2.8,
                target: Point3::new(car.x + nx * 0.2, car.y - 0.05, car.z + nz * 0.2),
            }
        }
    }
}

pub fn smoothing_factor(mode: CameraMode) -> f64 {
    match mode {
        CameraMode::Orbit => ORBIT_SMOOTHING,
        CameraMode::Overview | CameraMode::Chase => SMOOTHING,
    }
}

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(a: f64) -> f64 {
    let w = (a + PI).rem_euclid(2.0 * PI) - PI;
    if w <= -PI { w + 2.0 * PI } else { w }
}

/// Moves `from` toward `to` along the shorter arc.
pub fn lerp_angle(from: f64, to: f64, t: f64) -> f64 {
    from + wrap_angle(to - from) * t
}

/// The active camera, chasing whatever the current mode asks for.
///
/// Switching modes only changes the target; the rig never jumps except on
/// the very first frame after [`CameraRig::reset`].
#[derive(Clone, Debug, Default)]
pub struct CameraRig {
    smoothed: Option<CameraState>,
}

impl CameraRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.smoothed = None;
    }

    pub fn current(&self) -> Option<&CameraState> {
        self.smoothed.as_ref()
    }

    pub fn update(&mut self, mode: CameraMode, raw: CameraState) -> CameraState {
        let next = match self.smoothed {
            None => raw,
            Some(sc) => {
                let f = smoothing_factor(mode);
                CameraState {
                    yaw: if mode == CameraMode::Orbit { raw.yaw } else { lerp_angle(sc.yaw, raw.yaw, f) },
                    pitch: lerp(sc.pitch, raw.pitch, f),
                    distance: lerp(sc.distance, raw.distance, f),
                    target: Point3::new(
                        lerp(sc.target.x, raw.target.x, f),
                        lerp(sc.target.y, raw.target.y, f),
                        lerp(sc.target.z, raw.target.z, f),
                    ),
                }
            }
        };
        self.smoothed = Some(next);
        next
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn focal(&self) -> f64 {
        self.width.min(self.height) * 0.9
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Projected {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

/// World to camera space: yaw about the vertical axis, then pitch about x.
pub fn view_rotation(camera: &CameraState) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), camera.pitch)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), -camera.yaw)
}

/// Perspective projection; `None` for points at or behind the near plane.
pub fn project(point: Point3, camera: &CameraState, viewport: Viewport) -> Option<Projected> {
    let rel = Vector3::new(
        point.x - camera.target.x,
        point.y - camera.target.y,
        point.z - camera.target.z,
    );
    let v = view_rotation(camera) * rel;

    let depth = v.z + camera.distance;
    if !(depth > NEAR_EPSILON) {
        return None;
    }
    let scale = viewport.focal() / depth;
    Some(Projected {
        x: v.x * scale + viewport.width / 2.0,
        y: -v.y * scale + viewport.height / 2.0,
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(yaw: f64, distance: f64) -> CameraState {
        CameraState { yaw, pitch: 0.0, distance, target: Point3::default() }
    }

    #[test]
    fn target_projects_to_centre() {
        let cam = raw_camera(CameraMode::Overview, 0.0, Point3::default(), Point3::new(1.0, 0.0, 0.0));
        let p = project(Point3::default(), &cam, Viewport::new(800.0, 600.0)).unwrap();
        assert!((p.x - 400.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);
        assert!((p.depth - 5.2).abs() < 1e-9);
    }

    #[test]
    fn perspective_divide_and_y_flip() {
        let vp = Viewport::new(1000.0, 500.0);
        let cam = flat(0.0, 4.0);
        let p = project(Point3::new(1.0, 1.0, 0.0), &cam, vp).unwrap();
        let scale = 450.0 / 4.0;
        assert!((p.x - (500.0 + scale)).abs() < 1e-9);
        assert!((p.y - (250.0 - scale)).abs() < 1e-9);
        // farther away shrinks toward the centre
        let far = project(Point3::new(1.0, 1.0, 2.0), &cam, vp).unwrap();
        assert!(far.depth > p.depth);
        assert!(far.x < p.x);
    }

    #[test]
    fn rotations_follow_yaw_then_pitch() {
        let vp = Viewport::new(800.0, 600.0);
        let turned = flat(PI / 2.0, 4.0);
        // a quarter turn of yaw brings +x onto the view axis
        let p = project(Point3::new(1.0, 0.0, 0.0), &turned, vp).unwrap();
        assert!((p.depth - 5.0).abs() < 1e-9);
        assert!((p.x - 400.0).abs() < 1e-9);
        let q = project(Point3::new(0.0, 0.0, 1.0), &turned, vp).unwrap();
        assert!((q.depth - 4.0).abs() < 1e-9);
        assert!((q.x - (400.0 - 540.0 / 4.0)).abs() < 1e-9);

        let tilted = CameraState { yaw: 0.0, pitch: PI / 2.0, distance: 4.0, target: Point3::default() };
        let r = project(Point3::new(0.0, 1.0, 0.0), &tilted, vp).unwrap();
        assert!((r.depth - 5.0).abs() < 1e-9);
        assert!((r.y - 300.0).abs() < 1e-9);

        let rot = view_rotation(&CameraState { yaw: 0.4, pitch: -0.3, distance: 1.0, target: Point3::default() });
        let v = rot * Vector3::new(0.2, -1.0, 0.7);
        assert!((v.norm() - Vector3::<f64>::new(0.2, -1.0, 0.7).norm()).abs() < 1e-12);
    }

    #[test]
    fn points_behind_camera_are_culled() {
        let cam = flat(0.0, 2.0);
        let vp = Viewport::new(100.0, 100.0);
        assert!(project(Point3::new(0.0, 0.0, -2.0), &cam, vp).is_none());
        assert!(project(Point3::new(0.0, 0.0, -1.95), &cam, vp).is_none());
        assert!(project(Point3::new(0.0, 0.0, -1.85), &cam, vp).is_some());
        assert!(project(Point3::new(0.0, 0.0, -10.0), &cam, vp).is_none());
    }

    #[test]
    fn orbit_yaw_follows_clock() {
        let cam = raw_camera(CameraMode::Orbit, 10_000.0, Point3::default(), Point3::default());
        assert!((cam.yaw - 2.8).abs() < 1e-12);
        assert_eq!(cam.distance, 4.2);
    }

    #[test]
    fn chase_sits_ahead_of_car() {
        let car = Point3::new(1.0, 0.2, -0.5);
        let cam = raw_camera(CameraMode::Chase, 0.0, car, Point3::new(0.0, 0.0, 3.0));
        assert!((cam.yaw - PI * 0.78).abs() < 1e-12);
        assert!((cam.target.z - (-0.3)).abs() < 1e-12);
        assert!((cam.target.y - 0.15).abs() < 1e-12);
        // zero tangent does not produce NaN
        let still = raw_camera(CameraMode::Chase, 0.0, car, Point3::default());
        assert!(still.yaw.is_finite());
    }

    #[test]
    fn smoothing_converges_geometrically() {
        let mut rig = CameraRig::new();
        rig.update(CameraMode::Overview, flat(0.0, 10.0));
        let goal = CameraState { yaw: 1.0, pitch: 0.5, distance: 3.0, target: Point3::new(1.0, 0.0, -1.0) };
        let mut err = 7.0;
        for _ in 0..200 {
            let cam = rig.update(CameraMode::Chase, goal);
            let e = (cam.distance - goal.distance).abs();
            assert!(e <= err * (1.0 - SMOOTHING) + 1e-12);
            err = e;
        }
        let cam = rig.current().copied().unwrap();
        assert!((cam.yaw - 1.0).abs() < 1e-4);
        assert!((cam.pitch - 0.5).abs() < 1e-4);
        assert!((cam.target.z + 1.0).abs() < 1e-4);
    }

    #[test]
    fn first_frame_snaps_and_reset_clears() {
        let mut rig = CameraRig::new();
        let raw = flat(0.3, 4.0);
        assert_eq!(rig.update(CameraMode::Overview, raw), raw);
        rig.reset();
        assert!(rig.current().is_none());
    }

    #[test]
    fn orbit_overrides_yaw_only() {
        let mut rig = CameraRig::new();
        rig.update(CameraMode::Overview, flat(0.0, 5.0));
        let cam = rig.update(CameraMode::Orbit, CameraState { yaw: 2.0, pitch: 1.0, distance: 4.0, target: Point3::default() });
        assert_eq!(cam.yaw, 2.0);
        assert!((cam.pitch - 0.03).abs() < 1e-12);
        assert!((cam.distance - 4.97).abs() < 1e-12);
    }

    #[test]
    fn yaw_takes_short_way_round() {
        assert!((wrap_angle(2.0 * PI + 0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-12);
        assert!((lerp_angle(PI - 0.1, -PI + 0.1, 0.5) - PI).abs() < 1e-12);
        let mut rig = CameraRig::new();
        rig.update(CameraMode::Orbit, flat(20.0, 4.2));
        let cam = rig.update(CameraMode::Overview, flat(-0.55, 5.2));
        assert!((cam.yaw - 20.0).abs() < 0.2);
    }
}
