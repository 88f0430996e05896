use serde::{Deserialize, Serialize};

/// What gets written into a sector slot when the car leaves the sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SectorTiming {
    /// The sector's reference best-time label. Timing is illustrative.
    #[default]
    Reference,
    /// Wall-clock time spent in the sector.
    Stopwatch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Wall-clock duration of one lap at nominal speed.
    pub lap_duration_ms: f64,
    pub nominal_max_speed: f64,
    /// Floor for `speed / nominal_max_speed` so the car never stalls.
    pub min_speed_factor: f64,
    pub trail_length: usize,
    /// Freeze-frame of a completed lap's splits before the row clears.
    pub lap_reset_delay_ms: f64,
    pub sector_timing: SectorTiming,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SimConfigError {
    #[error("lap_duration_ms must be positive, got {0}")]
    LapDuration(f64),
    #[error("nominal_max_speed must be positive, got {0}")]
    MaxSpeed(f64),
    #[error("min_speed_factor must be in (0, 1], got {0}")]
    MinFactor(f64),
    #[error("lap_reset_delay_ms must not be negative, got {0}")]
    ResetDelay(f64),
}

impl SimConfig {
    /// Flat overlay preset.
    pub fn overlay() -> Self {
        Self {
            lap_duration_ms: 20_000.0,
            nominal_max_speed: 280.0,
            min_speed_factor: 0.3,
            trail_length: 25,
            lap_reset_delay_ms: 500.0,
            sector_timing: SectorTiming::Reference,
        }
    }

    /// Perspective scene preset.
    pub fn scene() -> Self {
        Self {
            lap_duration_ms: 22_000.0,
            nominal_max_speed: 300.0,
            min_speed_factor: 0.32,
            trail_length: 35,
            lap_reset_delay_ms: 500.0,
            sector_timing: SectorTiming::Reference,
        }
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if !(self.lap_duration_ms > 0.0) {
            return Err(SimConfigError::LapDuration(self.lap_duration_ms));
        }
        if !(self.nominal_max_speed > 0.0) {
            return Err(SimConfigError::MaxSpeed(self.nominal_max_speed));
        }
        if !(self.min_speed_factor > 0.0 && self.min_speed_factor <= 1.0) {
            return Err(SimConfigError::MinFactor(self.min_speed_factor));
        }
        if !(self.lap_reset_delay_ms >= 0.0) {
            return Err(SimConfigError::ResetDelay(self.lap_reset_delay_ms));
        }
        Ok(())
    }

    pub fn speed_factor(&self, speed: f64) -> f64 {
        let raw = speed / self.nominal_max_speed;
        if raw.is_finite() { raw.max(self.min_speed_factor) } else { self.min_speed_factor }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::scene()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_factor_is_floored() {
        let cfg = SimConfig::scene();
        assert_eq!(cfg.speed_factor(300.0), 1.0);
        assert_eq!(cfg.speed_factor(60.0), 0.32);
        assert_eq!(SimConfig::overlay().speed_factor(0.0), 0.3);
        assert_eq!(cfg.speed_factor(f64::NAN), 0.32);
    }

    #[test]
    fn validation() {
        assert_eq!(SimConfig::overlay().validate(), Ok(()));
        let bad = SimConfig { lap_duration_ms: 0.0, ..SimConfig::scene() };
        assert_eq!(bad.validate(), Err(SimConfigError::LapDuration(0.0)));
        let bad = SimConfig { min_speed_factor: 1.5, ..SimConfig::scene() };
        assert_eq!(bad.validate(), Err(SimConfigError::MinFactor(1.5)));
    }
}
