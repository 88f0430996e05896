mod commands;
mod config;
mod session;

use std::{
    io::BufRead,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use circuit_io::{FrameExporter, RunManifest};
use lap_sim::{LapTiming, TimingRx};
use model::CameraMode;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use commands::Command;
use config::{ViewKind, ViewerConfig};
use session::{FrameOutput, Session};

#[derive(Parser, Debug)]
#[command(name = "circuit-viewer", version)]
#[command(about = "Animated lap replay over circuit outlines, as a flat overlay or a 3D scene")]
struct Args {
    /// Config file (default: <config dir>/circuit-viewer/viewer.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Circuit catalog (.json array or .ndjson); bundled circuits if omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Starting circuit id
    #[arg(long)]
    circuit: Option<String>,

    /// overlay | scene
    #[arg(long)]
    view: Option<ViewKind>,

    /// overview | chase | orbit
    #[arg(long)]
    camera: Option<CameraMode>,

    /// Team colour, #RRGGBB
    #[arg(long)]
    color: Option<String>,

    /// Replace the starting circuit's telemetry with a speed,throttle,brake,gear CSV
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Render this many frames on a simulated clock and exit
    #[arg(long)]
    frames: Option<u64>,

    /// Export directory; headless runs fall back to [output] dir
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long)]
    export_every: Option<u64>,

    /// Print the catalog and exit
    #[arg(long)]
    list: bool,

    /// Print the starting circuit's track summary and exit
    #[arg(long)]
    describe: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn apply_args(cfg: &mut ViewerConfig, args: &Args) {
    if let Some(p) = &args.catalog {
        cfg.catalog = Some(p.clone());
    }
    if let Some(id) = &args.circuit {
        cfg.circuit = Some(id.clone());
    }
    if let Some(v) = args.view {
        cfg.view = v;
    }
    if let Some(m) = args.camera {
        cfg.camera = m;
    }
    if let Some(c) = &args.color {
        cfg.team_color = c.clone();
    }
    if let Some(n) = args.export_every {
        cfg.output.export_every = n;
    }
}

/// One console line per sector or lap change.
fn status_line(t: &LapTiming) -> String {
    let sectors = t.sector_times.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" | ");
    format!("{:<12} S{}  [{}]  lap {}", t.circuit_id, t.current_sector + 1, sectors, t.lap_time)
}

fn export(exporter: &mut FrameExporter, frame: &FrameOutput, with_json: bool) -> Result<()> {
    exporter.write_svg(frame.index, &frame.to_svg())?;
    if with_json {
        exporter.write_json(frame.index, frame)?;
    }
    Ok(())
}

fn run_headless(session: &Session, cfg: &ViewerConfig, frames: u64, out: Option<&Path>) -> Result<()> {
    let started_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut exporter = FrameExporter::create(out.unwrap_or(&cfg.output.dir))?;
    let delta = cfg.frame_delta_ms();
    let mut last = None;
    for i in 0..frames {
        let frame = session.frame(i as f64 * delta);
        if i % cfg.output.export_every == 0 || i + 1 == frames {
            export(&mut exporter, &frame, cfg.output.display_list)?;
        }
        last = Some(frame.timing);
    }
    let manifest = RunManifest {
        session: Uuid::new_v4(),
        started_at,
        circuit: session.circuit_id(),
        view: session.view().to_string(),
        frames,
        frame_delta_ms: delta,
        exported: exporter.written().to_vec(),
    };
    let path = exporter.write_manifest(&manifest)?;
    info!(frames, exported = manifest.exported.len(), manifest = %path.display(), "headless run finished");
    if let Some(t) = last {
        println!("{}", status_line(&t));
    }
    Ok(())
}

/// Reads commands from stdin. Queries are answered here; everything else is
/// queued for the frame loop.
fn spawn_input(session: Arc<Session>, tx: crossbeam_channel::Sender<Command>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) if cmd.is_query() => {
                    if let Err(e) = answer(&session, &cmd) {
                        warn!(error = %e, "query failed");
                    }
                }
                Ok(cmd) => {
                    let quit = cmd == Command::Quit;
                    if tx.send(cmd).is_err() || quit {
                        break;
                    }
                }
                Err(e) => warn!(input = %line.trim(), "{e}"),
            }
        }
        debug!("input closed");
    });
}

fn answer(session: &Session, query: &Command) -> Result<()> {
    match query {
        Command::List => session.list().iter().for_each(|l| println!("{l}")),
        _ => println!("{}", serde_json::to_string_pretty(&session.describe())?),
    }
    Ok(())
}

fn spawn_status(rx: TimingRx) {
    thread::spawn(move || {
        let mut last: Option<(String, usize, Vec<String>)> = None;
        for t in rx.iter() {
            let key = (
                t.circuit_id.clone(),
                t.current_sector,
                t.sector_times.iter().map(|s| s.as_str().to_string()).collect::<Vec<_>>(),
            );
            if last.as_ref() != Some(&key) {
                println!("{}", status_line(&t));
                last = Some(key);
            }
        }
    });
}

async fn run_live(session: Session, cfg: &ViewerConfig, out: Option<&Path>) -> Result<()> {
    let session = Arc::new(session);
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    spawn_input(Arc::clone(&session), cmd_tx);
    let (timing_tx, timing_rx) = lap_sim::channel();
    session.subscribe(timing_tx);
    spawn_status(timing_rx);

    let mut exporter = out.map(FrameExporter::create).transpose()?;
    let clock = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(cfg.frame_delta_ms() / 1000.0));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    info!(fps = cfg.render.fps, "running; commands: circuit <id>, camera <mode>, color <#hex>, view <kind>, play, pause, toggle, list, describe, quit");

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            _ = ticker.tick() => {
                let now = clock.elapsed().as_secs_f64() * 1000.0;
                for cmd in cmd_rx.try_iter() {
                    session.apply(cmd, now);
                }
                if session.should_quit() {
                    break;
                }
                let frame = session.frame(now);
                if let Some(ex) = exporter.as_mut() {
                    if frame.index % cfg.output.export_every == 0 {
                        export(ex, &frame, cfg.output.display_list)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut cfg = ViewerConfig::load(args.config.as_deref())?;
    apply_args(&mut cfg, &args);
    cfg.validate()?;

    let mut catalog = match &cfg.catalog {
        Some(path) => circuit_io::load_catalog(path)?,
        None => circuit_io::builtin_catalog()?,
    };
    if let Some(path) = &args.telemetry {
        let id = cfg.circuit.clone().unwrap_or_else(|| catalog.first().id.clone());
        let samples = circuit_io::import_telemetry_csv(path)?;
        let circuit = catalog.get_mut(&id).ok_or_else(|| anyhow!("unknown circuit {:?}", id))?;
        circuit.telemetry = samples;
        circuit.validate().with_context(|| format!("telemetry from {}", path.display()))?;
        info!(circuit = %id, samples = circuit.telemetry.len(), "telemetry replaced");
    }

    let session = Session::new(catalog, cfg.clone(), 0.0)?;
    if args.list {
        return answer(&session, &Command::List);
    }
    if args.describe {
        return answer(&session, &Command::Describe);
    }

    match args.frames {
        Some(n) => run_headless(&session, &cfg, n, args.out.as_deref()),
        None => run_live(session, &cfg, args.out.as_deref()).await,
    }
}
