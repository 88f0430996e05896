use anyhow::{Context, Result};
use model::{Circuit, CircuitError};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use tracing::{info, warn};

const BUILTIN: &str = include_str!("../data/circuits.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("rejected: {source}")]
    Invalid {
        id: String,
        #[source]
        source: CircuitError,
    },
    #[error("duplicate circuit id {0}")]
    Duplicate(String),
    #[error("catalog holds no usable circuit")]
    Empty,
    #[error("unsupported catalog extension {0:?} (expected .json or .ndjson)")]
    UnknownExtension(String),
}

/// Validated circuits, in file order.
#[derive(Clone, Debug)]
pub struct Catalog {
    circuits: Vec<Circuit>,
}

impl Catalog {
    /// Keeps every valid circuit; invalid or repeated ones are logged and
    /// dropped. Fails only when nothing usable is left.
    pub fn from_circuits(circuits: Vec<Circuit>) -> Result<Self, CatalogError> {
        let mut kept: Vec<Circuit> = Vec::with_capacity(circuits.len());
        for c in circuits {
            if let Err(source) = c.validate() {
                let err = CatalogError::Invalid { id: c.id.clone(), source };
                warn!(error = %err, "skipping circuit");
                continue;
            }
            if kept.iter().any(|k| k.id == c.id) {
                warn!(error = %CatalogError::Duplicate(c.id.clone()), "skipping circuit");
                continue;
            }
            kept.push(c);
        }
        if kept.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { circuits: kept })
    }

    /// Like [`Catalog::from_circuits`] but rejects the whole set on the
    /// first problem.
    pub fn strict(circuits: Vec<Circuit>) -> Result<Self, CatalogError> {
        for (i, c) in circuits.iter().enumerate() {
            c.validate().map_err(|source| CatalogError::Invalid { id: c.id.clone(), source })?;
            if circuits[..i].iter().any(|k| k.id == c.id) {
                return Err(CatalogError::Duplicate(c.id.clone()));
            }
        }
        if circuits.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { circuits })
    }

    pub fn circuits(&self) -> &[Circuit] {
        &self.circuits
    }

    pub fn get(&self, id: &str) -> Option<&Circuit> {
        self.circuits.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Circuit> {
        self.circuits.iter_mut().find(|c| c.id == id)
    }

    /// Circuit shown before any selection.
    pub fn first(&self) -> &Circuit {
        // never empty once constructed
        &self.circuits[0]
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.circuits.iter().map(|c| c.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}

/// The circuits shipped with the viewer.
pub fn builtin_catalog() -> Result<Catalog> {
    let circuits: Vec<Circuit> = serde_json::from_str(BUILTIN).context("parsing bundled circuits")?;
    Ok(Catalog::strict(circuits)?)
}

/// A JSON array of circuits.
pub fn import_json(path: &Path) -> Result<Vec<Circuit>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let circuits = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(circuits)
}

/// One circuit per line; blank lines are ignored.
pub fn import_ndjson(path: &Path) -> Result<Vec<Circuit>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut circuits = vec![];
    for (n, line) in BufReader::new(f).lines().enumerate() {
        let s = line?;
        if s.trim().is_empty() {
            continue;
        }
        let c: Circuit = serde_json::from_str(&s)
            .with_context(|| format!("{}:{}: bad circuit record", path.display(), n + 1))?;
        circuits.push(c);
    }
    Ok(circuits)
}

pub fn export_ndjson(circuits: &[Circuit], path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    for c in circuits {
        let s = serde_json::to_string(c)?;
        writeln!(w, "{}", s)?;
    }
    w.flush()?;
    Ok(())
}

/// Loads a catalog file, picking the format from its extension.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let circuits = match ext.as_str() {
        "json" => import_json(path)?,
        "ndjson" | "jsonl" => import_ndjson(path)?,
        _ => return Err(CatalogError::UnknownExtension(ext).into()),
    };
    let total = circuits.len();
    let catalog = Catalog::from_circuits(circuits).with_context(|| format!("loading {}", path.display()))?;
    info!(path = %path.display(), loaded = catalog.len(), skipped = total - catalog.len(), "catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Sector, TelemetrySample};

    fn circuit(id: &str, bounds: &[f64]) -> Circuit {
        Circuit {
            id: id.into(),
            name: id.into(),
            location: String::new(),
            country_code: String::new(),
            svg_path: "M 0 0 L 10 0 L 10 10 Z".into(),
            svg_view_box: "0 0 10 10".into(),
            sectors: bounds
                .windows(2)
                .map(|w| Sector {
                    start_percent: w[0],
                    end_percent: w[1],
                    name: "Sector 1".into(),
                    best_time: "10.000".into(),
                })
                .collect(),
            telemetry: vec![TelemetrySample::default()],
            length_km: 1.0,
            turns: 3,
            lap_record: String::new(),
        }
    }

    #[test]
    fn bundled_circuits_all_validate() {
        let cat = builtin_catalog().unwrap();
        assert!(cat.len() >= 3);
        let monaco = cat.get("monaco").unwrap();
        let starts: Vec<f64> = monaco.sectors.iter().map(|s| s.start_percent).collect();
        assert_eq!(starts, [0.0, 0.33, 0.66]);
        for c in cat.circuits() {
            assert!(c.validate().is_ok(), "{}", c.id);
            assert!(!c.telemetry.is_empty(), "{}", c.id);
            assert!(c.sectors.iter().all(|s| !s.best_time.is_empty()));
        }
    }

    #[test]
    fn lenient_catalog_drops_bad_entries() {
        let cat = Catalog::from_circuits(vec![
            circuit("a", &[0.0, 0.5, 1.0]),
            circuit("gap", &[0.0, 0.4]),
            circuit("a", &[0.0, 1.0]),
            circuit("b", &[0.0, 1.0]),
        ])
        .unwrap();
        assert_eq!(cat.ids().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(cat.first().id, "a");
        assert_eq!(cat.get("a").unwrap().sectors.len(), 2);

        let err = Catalog::from_circuits(vec![circuit("gap", &[0.0, 0.4])]).unwrap_err();
        assert!(matches!(err, CatalogError::Empty));
    }

    #[test]
    fn strict_catalog_names_the_culprit() {
        let err = Catalog::strict(vec![circuit("a", &[0.0, 1.0]), circuit("gap", &[0.0, 0.4])]).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid { ref id, .. } if id == "gap"));
        let err = Catalog::strict(vec![circuit("a", &[0.0, 1.0]), circuit("a", &[0.0, 1.0])]).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(ref id) if id == "a"));
    }

    #[test]
    fn ndjson_and_json_files_load() {
        let dir = tempfile::tempdir().unwrap();
        let circuits = vec![circuit("a", &[0.0, 0.5, 1.0]), circuit("b", &[0.0, 1.0])];

        let nd = dir.path().join("circuits.ndjson");
        export_ndjson(&circuits, &nd).unwrap();
        let back = import_ndjson(&nd).unwrap();
        assert_eq!(back, circuits);
        assert_eq!(load_catalog(&nd).unwrap().len(), 2);

        let js = dir.path().join("circuits.json");
        std::fs::write(&js, serde_json::to_string(&circuits).unwrap()).unwrap();
        assert_eq!(load_catalog(&js).unwrap().get("b").unwrap().turns, 3);

        let txt = dir.path().join("circuits.txt");
        std::fs::write(&txt, "").unwrap();
        let err = load_catalog(&txt).unwrap_err();
        assert!(err.downcast_ref::<CatalogError>().is_some());
    }

    #[test]
    fn bad_ndjson_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let nd = dir.path().join("broken.ndjson");
        let good = serde_json::to_string(&circuit("a", &[0.0, 1.0])).unwrap();
        std::fs::write(&nd, format!("{}\n\n{{not json\n", good)).unwrap();
        let err = import_ndjson(&nd).unwrap_err();
        assert!(err.to_string().ends_with(":3: bad circuit record"), "{err}");
    }
}
