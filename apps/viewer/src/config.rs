use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context, Result};
use lap_sim::{SectorTiming, SimConfig};
use model::{CameraMode, DEFAULT_TEAM_COLOR};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// `<config dir>/circuit-viewer/viewer.toml`
pub static DEFAULT_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| dirs_next::config_dir().map(|d| d.join("circuit-viewer").join("viewer.toml")));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// Flat outline in the circuit's own coordinates.
    Overlay,
    #[default]
    Scene,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown view {0:?} (expected overlay or scene)")]
pub struct ViewKindError(String);

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Overlay => "overlay",
            ViewKind::Scene => "scene",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = ViewKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlay" | "2d" => Ok(ViewKind::Overlay),
            "scene" | "3d" => Ok(ViewKind::Scene),
            other => Err(ViewKindError(other.to_string())),
        }
    }
}

/// A `[overlay]` or `[scene]` table. Keys left out keep the view's preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimSection {
    pub lap_duration_ms: Option<f64>,
    pub nominal_max_speed: Option<f64>,
    pub min_speed_factor: Option<f64>,
    pub trail_length: Option<usize>,
    pub lap_reset_delay_ms: Option<f64>,
    pub sector_timing: Option<SectorTiming>,
}

impl SimSection {
    pub fn resolve(&self, preset: SimConfig) -> SimConfig {
        SimConfig {
            lap_duration_ms: self.lap_duration_ms.unwrap_or(preset.lap_duration_ms),
            nominal_max_speed: self.nominal_max_speed.unwrap_or(preset.nominal_max_speed),
            min_speed_factor: self.min_speed_factor.unwrap_or(preset.min_speed_factor),
            trail_length: self.trail_length.unwrap_or(preset.trail_length),
            lap_reset_delay_ms: self.lap_reset_delay_ms.unwrap_or(preset.lap_reset_delay_ms),
            sector_timing: self.sector_timing.unwrap_or(preset.sector_timing),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub fps: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { width: 1280.0, height: 720.0, fps: 60.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Export one frame out of this many.
    pub export_every: u64,
    /// Also write each exported frame's display list and HUD as JSON.
    pub display_list: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("frames"), export_every: 30, display_list: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Catalog file; the bundled circuits when unset.
    pub catalog: Option<PathBuf>,
    /// Starting circuit; the catalog's first when unset.
    pub circuit: Option<String>,
    pub view: ViewKind,
    pub camera: CameraMode,
    pub team_color: String,
    pub overlay: SimSection,
    pub scene: SimSection,
    pub render: RenderConfig,
    pub output: OutputConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            circuit: None,
            view: ViewKind::default(),
            camera: CameraMode::default(),
            team_color: DEFAULT_TEAM_COLOR.to_string(),
            overlay: SimSection::default(),
            scene: SimSection::default(),
            render: RenderConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: ViewerConfig = toml::from_str(s)?;
        Ok(cfg)
    }

    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match DEFAULT_PATH.as_ref() {
                Some(p) if p.exists() => p.clone(),
                _ => {
                    debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        let content = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let cfg = Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.sim(ViewKind::Overlay).validate().context("[overlay]")?;
        self.sim(ViewKind::Scene).validate().context("[scene]")?;
        if !(self.render.width > 0.0 && self.render.height > 0.0) {
            bail!("[render] width and height must be positive");
        }
        if !(self.render.fps > 0.0 && self.render.fps <= 240.0) {
            bail!("[render] fps must be in (0, 240], got {}", self.render.fps);
        }
        if self.output.export_every == 0 {
            bail!("[output] export_every must be at least 1");
        }
        Ok(())
    }

    pub fn frame_delta_ms(&self) -> f64 {
        1000.0 / self.render.fps
    }

    pub fn sim(&self, view: ViewKind) -> SimConfig {
        match view {
            ViewKind::Overlay => self.overlay.resolve(SimConfig::overlay()),
            ViewKind::Scene => self.scene.resolve(SimConfig::scene()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(ViewerConfig::from_toml("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn sections_override_partially() {
        let cfg = ViewerConfig::from_toml(
            r##"
            circuit = "spa"
            view = "overlay"
            camera = "chase"
            team_color = "#FF8000"

            [scene]
            trail_length = 50
            sector_timing = "stopwatch"

            [render]
            fps = 30.0

            [output]
            export_every = 5
            "##,
        )
        .unwrap();
        assert_eq!(cfg.circuit.as_deref(), Some("spa"));
        assert_eq!(cfg.view, ViewKind::Overlay);
        assert_eq!(cfg.camera, CameraMode::Chase);
        let scene = cfg.sim(ViewKind::Scene);
        assert_eq!(scene.trail_length, 50);
        assert_eq!(scene.sector_timing, SectorTiming::Stopwatch);
        assert_eq!(scene.lap_duration_ms, 22_000.0);
        assert_eq!(cfg.sim(ViewKind::Overlay), SimConfig::overlay());
        assert_eq!(cfg.render.width, 1280.0);
        assert!((cfg.frame_delta_ms() - 1000.0 / 30.0).abs() < 1e-12);
        assert_eq!(cfg.output.export_every, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = ViewerConfig::default();
        cfg.output.export_every = 0;
        assert!(cfg.validate().is_err());

        let cfg = ViewerConfig::from_toml("[overlay]\nlap_duration_ms = -1.0\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "[overlay]");

        // a partial overlay table keeps the overlay preset for the rest
        let cfg = ViewerConfig::from_toml("[overlay]\ntrail_length = 10\n").unwrap();
        let overlay = cfg.sim(ViewKind::Overlay);
        assert_eq!(overlay.trail_length, 10);
        assert_eq!(overlay.lap_duration_ms, 20_000.0);
        assert_eq!(overlay.nominal_max_speed, 280.0);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ViewerConfig::load(Some(Path::new("/nonexistent/viewer.toml"))).unwrap_err();
        assert!(err.to_string().starts_with("reading"));
    }

    #[test]
    fn view_kind_parses() {
        assert_eq!("3D".parse::<ViewKind>(), Ok(ViewKind::Scene));
        assert_eq!("overlay".parse::<ViewKind>(), Ok(ViewKind::Overlay));
        assert!("map".parse::<ViewKind>().is_err());
    }
}
