use anyhow::{Context, Result};
use model::TelemetrySample;
use serde::{Deserialize, Serialize};
use std::{io::Read, path::Path};
use tracing::warn;

#[derive(Serialize, Deserialize)]
struct CsvRow {
    speed: f64,
    throttle: f64,
    brake: f64,
    gear: i8,
}

fn clamp_pct(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 }
}

/// Reads `speed,throttle,brake,gear` rows. Pedal values outside 0..100 are
/// clamped; negative or non-finite speeds become 0.
pub fn read_telemetry_csv<R: Read>(rdr: R) -> Result<Vec<TelemetrySample>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut samples = vec![];
    for (n, rec) in rdr.deserialize().enumerate() {
        let r: CsvRow = rec.with_context(|| format!("telemetry row {}", n + 1))?;
        let speed = if r.speed.is_finite() && r.speed >= 0.0 { r.speed } else { 0.0 };
        if speed != r.speed {
            warn!(row = n + 1, speed = r.speed, "bad speed replaced with 0");
        }
        samples.push(TelemetrySample {
            speed,
            throttle: clamp_pct(r.throttle),
            brake: clamp_pct(r.brake),
            gear: r.gear,
        });
    }
    Ok(samples)
}

pub fn import_telemetry_csv(path: &Path) -> Result<Vec<TelemetrySample>> {
    let f = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_telemetry_csv(f).with_context(|| format!("reading {}", path.display()))
}

pub fn export_telemetry_csv(samples: &[TelemetrySample], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for s in samples {
        w.serialize(CsvRow { speed: s.speed, throttle: s.throttle, brake: s.brake, gear: s.gear })?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_sanitises_rows() {
        let data = "speed, throttle, brake, gear\n285.5,100,0,7\n92,-5,140,2\n-3,0,0,1\n";
        let samples = read_telemetry_csv(data.as_bytes()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], TelemetrySample { speed: 285.5, throttle: 100.0, brake: 0.0, gear: 7 });
        assert_eq!(samples[1].throttle, 0.0);
        assert_eq!(samples[1].brake, 100.0);
        assert_eq!(samples[2].speed, 0.0);
    }

    #[test]
    fn bad_row_is_reported() {
        let err = read_telemetry_csv("speed,throttle,brake,gear\n100,50,0,fourth\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "telemetry row 1");
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lap.csv");
        let samples = vec![
            TelemetrySample { speed: 300.0, throttle: 100.0, brake: 0.0, gear: 8 },
            TelemetrySample { speed: 80.0, throttle: 0.0, brake: 95.0, gear: 2 },
        ];
        export_telemetry_csv(&samples, &path).unwrap();
        assert_eq!(import_telemetry_csv(&path).unwrap(), samples);
    }
}
