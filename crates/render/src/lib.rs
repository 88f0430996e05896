//! Drawing for both track views and the telemetry HUD.
//!
//! Renderers only read a [`lap_sim::FrameSnapshot`] and paint it onto a
//! [`Surface`]; the recording [`DisplayList`] and the [`SvgSurface`] are the
//! two built-in targets.

mod display_list;
mod hud;
mod overlay;
mod scene;
mod surface;
mod svg;

pub use display_list::{DisplayList, DrawOp};
pub use hud::{Hud, HudView, LiveStatus, SectorSlot, SlotState, SpringGauge, GAUGE_DAMPING, GAUGE_STIFFNESS};
pub use overlay::{OverlayRenderer, SectorMark};
pub use scene::{stars, SceneRenderer, Star, STAR_COUNT};
pub use surface::{GradientStop, Glow, Paint, RadialGradient, Stroke, Surface, TextAnchor, TextStyle};
pub use svg::SvgSurface;

#[cfg(test)]
pub(crate) mod testing {
    use model::{Circuit, Sector, TelemetrySample};

    /// 100 x 60 rectangle, three equal sectors, flat-out telemetry.
    pub fn circuit() -> Circuit {
        let bounds = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        Circuit {
            id: "box".into(),
            name: "Box Park".into(),
            location: String::new(),
            country_code: String::new(),
            svg_path: "M 0 0 L 100 0 L 100 60 L 0 60 Z".into(),
            svg_view_box: "-10 -10 120 80".into(),
            sectors: bounds
                .windows(2)
                .enumerate()
                .map(|(i, w)| Sector {
                    start_percent: w[0],
                    end_percent: w[1],
                    name: format!("Sector {}", i + 1),
                    best_time: "20.000".into(),
                })
                .collect(),
            telemetry: vec![TelemetrySample { speed: 300.0, throttle: 100.0, brake: 0.0, gear: 8 }; 8],
            length_km: 0.32,
            turns: 4,
            lap_record: String::new(),
        }
    }
}
