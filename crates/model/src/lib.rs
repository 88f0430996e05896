use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Fallback car colour when a team colour is missing or malformed.
pub const DEFAULT_TEAM_COLOR: &str = "#00D4FF";

const BOUND_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct BBox {
    pub minx: f64,
    pub maxx: f64,
    pub miny: f64,
    pub maxy: f64,
}

/// One recorded-lap data point. Throttle and brake are percentages (0..100).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct TelemetrySample {
    pub speed: f64,
    pub throttle: f64,
    pub brake: f64,
    pub gear: i8,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self { speed: 0.0, throttle: 0.0, brake: 0.0, gear: 1 }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Sector {
    pub start_percent: f64,
    pub end_percent: f64,
    pub name: String,
    /// Reference split shown when the car leaves this sector.
    pub best_time: String,
}

impl Sector {
    pub fn contains(&self, progress: f64) -> bool {
        progress >= self.start_percent && progress < self.end_percent
    }

    /// "Sector 2" -> "S2"
    pub fn short_label(&self) -> String {
        self.name.replace("Sector ", "S")
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Circuit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub country_code: String,
    pub svg_path: String,
    pub svg_view_box: String,
    pub sectors: Vec<Sector>,
    #[serde(default)]
    pub telemetry: Vec<TelemetrySample>,
    #[serde(default)]
    pub length_km: f64,
    #[serde(default)]
    pub turns: u32,
    #[serde(default)]
    pub lap_record: String,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CircuitError {
    #[error("circuit {0}: track outline is empty")]
    EmptyOutline(String),
    #[error("circuit {0}: no sectors configured")]
    NoSectors(String),
    #[error("circuit {circuit}: sector {index} starts at {found}, expected {expected}")]
    SectorGap { circuit: String, index: usize, expected: f64, found: f64 },
    #[error("circuit {circuit}: sector {index} is empty or reversed")]
    EmptySector { circuit: String, index: usize },
    #[error("circuit {circuit}: last sector ends at {found}, expected 1")]
    OpenLap { circuit: String, found: f64 },
}

impl Circuit {
    /// Checks that the sectors partition `[0, 1)` in ascending order.
    pub fn validate(&self) -> Result<(), CircuitError> {
        if self.svg_path.trim().is_empty() {
            return Err(CircuitError::EmptyOutline(self.id.clone()));
        }
        if self.sectors.is_empty() {
            return Err(CircuitError::NoSectors(self.id.clone()));
        }
        let mut expected = 0.0;
        for (index, s) in self.sectors.iter().enumerate() {
            if (s.start_percent - expected).abs() > BOUND_EPS {
                return Err(CircuitError::SectorGap {
                    circuit: self.id.clone(),
                    index,
                    expected,
                    found: s.start_percent,
                });
            }
            if s.end_percent <= s.start_percent {
                return Err(CircuitError::EmptySector { circuit: self.id.clone(), index });
            }
            expected = s.end_percent;
        }
        if (expected - 1.0).abs() > BOUND_EPS {
            return Err(CircuitError::OpenLap { circuit: self.id.clone(), found: expected });
        }
        Ok(())
    }

    pub fn telemetry_at(&self, progress: f64) -> TelemetrySample {
        telemetry_at(&self.telemetry, progress)
    }
}

/// `floor(progress * len) mod len`, or `None` for an empty recording.
pub fn telemetry_index(len: usize, progress: f64) -> Option<usize> {
    if len == 0 || !progress.is_finite() {
        return None;
    }
    let raw = (progress * len as f64).floor() as i64;
    Some(raw.rem_euclid(len as i64) as usize)
}

pub fn telemetry_at(samples: &[TelemetrySample], progress: f64) -> TelemetrySample {
    telemetry_index(samples.len(), progress)
        .map(|i| samples[i])
        .unwrap_or_default()
}

/// Index of the sector whose `[start, end)` contains `progress`.
pub fn sector_index(sectors: &[Sector], progress: f64) -> Option<usize> {
    sectors.iter().position(|s| s.contains(progress))
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Overview,
    Chase,
    Orbit,
}

impl CameraMode {
    pub const ALL: [CameraMode; 3] = [CameraMode::Overview, CameraMode::Chase, CameraMode::Orbit];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraMode::Overview => "overview",
            CameraMode::Chase => "chase",
            CameraMode::Orbit => "orbit",
        }
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown camera mode {0:?}")]
pub struct CameraModeError(pub String);

impl FromStr for CameraMode {
    type Err = CameraModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" | "ovr" => Ok(CameraMode::Overview),
            "chase" | "chs" => Ok(CameraMode::Chase),
            "orbit" | "orb" => Ok(CameraMode::Orbit),
            other => Err(CameraModeError(other.to_string())),
        }
    }
}

/// sRGB colour with straight alpha in `0..=1`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ColorError {
    #[error("colour {0:?} does not start with '#'")]
    MissingHash(String),
    #[error("colour {0:?} must have 6 or 8 hex digits")]
    BadLength(String),
    #[error("colour {0:?} contains a non-hex digit")]
    BadDigit(String),
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 1.0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0.0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(s: &str) -> Result<Self, ColorError> {
        let digits = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorError::MissingHash(s.to_string()))?;
        if !(digits.len() == 6 || digits.len() == 8) {
            return Err(ColorError::BadLength(s.to_string()));
        }
        let byte = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| ColorError::BadDigit(s.to_string()))
        };
        let (r, g, b) = (byte(0)?, byte(2)?, byte(4)?);
        let a = if digits.len() == 8 { byte(6)? as f64 / 255.0 } else { 1.0 };
        Ok(Self { r, g, b, a })
    }

    /// Parses a team colour, falling back to [`DEFAULT_TEAM_COLOR`].
    pub fn team(hex: Option<&str>) -> Self {
        hex.and_then(|h| Self::from_hex(h).ok())
            .unwrap_or(Self::rgb(0x00, 0xD4, 0xFF))
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    /// Multiplies the current alpha.
    pub fn faded(self, opacity: f64) -> Self {
        self.with_alpha(self.a * opacity)
    }

    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
