use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::debug;
use uuid::Uuid;

/// Summary written next to the exported frames of a headless run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub session: Uuid,
    /// RFC 3339.
    pub started_at: String,
    pub circuit: String,
    pub view: String,
    pub frames: u64,
    pub frame_delta_ms: f64,
    pub exported: Vec<String>,
}

/// Writes numbered frame files into one directory.
#[derive(Debug)]
pub struct FrameExporter {
    dir: PathBuf,
    written: Vec<String>,
}

impl FrameExporter {
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf(), written: vec![] })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names written so far, in order.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    fn target(&mut self, frame: u64, ext: &str) -> PathBuf {
        let name = format!("frame_{:06}.{}", frame, ext);
        let path = self.dir.join(&name);
        self.written.push(name);
        path
    }

    pub fn write_svg(&mut self, frame: u64, svg: &str) -> Result<PathBuf> {
        let path = self.target(frame, "svg");
        fs::write(&path, svg).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "frame exported");
        Ok(path)
    }

    pub fn write_json<T: Serialize>(&mut self, frame: u64, value: &T) -> Result<PathBuf> {
        let path = self.target(frame, "json");
        write_json_file(&path, value)?;
        debug!(path = %path.display(), "frame exported");
        Ok(path)
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf> {
        let path = self.dir.join("run.json");
        write_json_file(&path, manifest)?;
        Ok(path)
    }
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), value).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
