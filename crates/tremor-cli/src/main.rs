//! `tremor-fwi`: time-domain acoustic full waveform inversion.
//!
//! Arguments are SU-style `key=value` pairs (see
//! [`tremor_engine::InversionConfig`] for the recognized options):
//!
//! ```text
//! CHECKPOINTDIR=/tmp/ckpt tremor-fwi nz=100 nx=120 dz=5 dx=5 dt=0.001 \
//!     nt=1000 ns=8 ng=120 sxbeg=10 szbeg=2 jsx=12 jsz=0 gxbeg=0 gzbeg=1 \
//!     jgx=1 jgz=0 fm=15 amp=100 nb=30 niter=20 vinit=vinit.bin \
//!     shots=shots.bin vupdates=vupdates.bin
//! ```
//!
//! Exit codes: 0 success, 1 configuration error, 2 geometry outside the
//! computing zone, 3 I/O failure.

use std::error::Error;
use std::fmt;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tremor_core::{Gather, GeometryError, VelocityModel};
use tremor_engine::{
    ConfigError, InversionConfig, InversionError, InversionLoop, LoopSettings, ObjectiveStrategy,
};
use tremor_store::volume::{append_volume, read_volume, write_volume};
use tremor_store::{CheckpointStore, DirBackend, StoreError, VolumeHeader};

/// Environment variable naming the checkpoint directory.
const CHECKPOINT_DIR_VAR: &str = "CHECKPOINTDIR";

// ── Error / exit codes ──────────────────────────────────────────

#[derive(Debug)]
enum CliError {
    Usage(String),
    Environment { name: &'static str },
    Config(ConfigError),
    Geometry(GeometryError),
    Store(StoreError),
    Engine(InversionError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Environment { .. } => 1,
            Self::Config(e) => match e {
                ConfigError::Geometry(_) => 2,
                _ => 1,
            },
            Self::Geometry(_) => 2,
            Self::Store(_) => 3,
            Self::Engine(e) => match e {
                InversionError::Geometry(_) => 2,
                InversionError::Store(_) => 3,
                InversionError::Propagator(_) => 1,
            },
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(detail) => write!(f, "usage: {detail}"),
            Self::Environment { name } => {
                write!(f, "environment variable {name} must name a directory")
            }
            Self::Config(e) => write!(f, "{e}"),
            Self::Geometry(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GeometryError> for CliError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<InversionError> for CliError {
    fn from(e: InversionError) -> Self {
        Self::Engine(e)
    }
}

// ── Entry point ─────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<(), CliError> {
    let pairs = parse_args(std::env::args().skip(1))?;
    let config = InversionConfig::from_pairs(pairs)?;
    config.validate()?;

    let checkpoint_dir =
        std::env::var(CHECKPOINT_DIR_VAR).map_err(|_| CliError::Environment {
            name: CHECKPOINT_DIR_VAR,
        })?;
    let backend = DirBackend::new(checkpoint_dir)?;
    let store = CheckpointStore::new(backend, config.checkpoint_interval);

    let grid = config.grid()?;
    let interior = read_volume(&config.vinit, config.nz * config.nx)?;
    let vel = VelocityModel::expand(grid, &interior)?;
    let observed = read_volume(&config.shots, config.ns * config.nt * config.ng)?;
    let dobs = Gather::new(config.ns, config.nt, config.ng, observed)?;

    info!(
        nz = config.nz,
        nx = config.nx,
        ns = config.ns,
        ng = config.ng,
        nt = config.nt,
        niter = config.niter,
        "starting inversion"
    );

    // Truncate the output volume and write its sidecar header.
    write_volume(&config.vupdates, &[])?;
    write_header(&config)?;

    let settings = LoopSettings {
        fm: config.fm,
        amp: config.amp,
        vmin: config.vmin,
        vmax: config.vmax,
        seed: config.seed,
        strategy: ObjectiveStrategy::Encoded,
        mask_top_rows: 3,
    };
    let mut inversion = InversionLoop::new(
        vel,
        dobs,
        config.source_positions(),
        config.receiver_positions(),
        store,
        settings,
    )?;

    let vupdates = config.vupdates.clone();
    inversion.run(config.niter, |report, model| {
        append_volume(&vupdates, &model.shrink_physical()).map_err(InversionError::Store)?;
        info!(
            iteration = report.iteration,
            objective = report.objective,
            alpha = report.alpha,
            "model appended"
        );
        Ok(())
    })?;

    info!("inversion finished");
    Ok(())
}

fn parse_args<I: Iterator<Item = String>>(args: I) -> Result<Vec<(String, String)>, CliError> {
    let mut pairs = Vec::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| CliError::Usage(format!("expected key=value, got '{arg}'")))?;
        pairs.push((name.to_string(), value.to_string()));
    }
    if pairs.is_empty() {
        return Err(CliError::Usage(
            "no arguments; run with key=value options (see crate docs)".to_string(),
        ));
    }
    Ok(pairs)
}

/// Sidecar header describing the appended velocity volumes.
fn write_header(config: &InversionConfig) -> Result<(), CliError> {
    let mut header = VolumeHeader::new();
    header.set("n1", config.nz);
    header.set("n2", config.nx);
    header.set("n3", config.niter);
    header.set("d1", config.dz);
    header.set("d2", config.dx);
    header.set("unit", "m/s");
    let mut path = config.vupdates.clone().into_os_string();
    path.push(".hdr");
    std::fs::write(path, header.to_string()).map_err(StoreError::Io)?;
    Ok(())
}
