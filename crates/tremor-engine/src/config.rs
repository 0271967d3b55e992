//! Inversion configuration, `key=value` parsing, and validation.
//!
//! [`InversionConfig`] is the flat record of every recognized option.
//! [`from_pairs`](InversionConfig::from_pairs) builds one from SU-style
//! `key=value` arguments; [`validate`](InversionConfig::validate) checks
//! the structural invariants once at startup. Geometry violations are
//! fatal; a marginal CFL number is only warned about, since the velocity
//! clamps recover from it.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use tremor_core::{GeometryError, Grid, ShotPosition};

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected while parsing or validating the configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// A required option is absent.
    MissingOption {
        /// Name of the absent option.
        name: &'static str,
    },
    /// An option value could not be parsed or is out of range.
    InvalidOption {
        /// Name of the offending option.
        name: String,
        /// Description of the problem.
        reason: String,
    },
    /// An option name is not recognized.
    UnknownOption {
        /// The unrecognized name.
        name: String,
    },
    /// Two options contradict each other.
    Inconsistent {
        /// Description of the contradiction.
        reason: String,
    },
    /// Grid construction or acquisition geometry failed validation.
    Geometry(GeometryError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOption { name } => write!(f, "missing required option '{name}'"),
            Self::InvalidOption { name, reason } => {
                write!(f, "invalid option '{name}': {reason}")
            }
            Self::UnknownOption { name } => write!(f, "unknown option '{name}'"),
            Self::Inconsistent { reason } => write!(f, "inconsistent configuration: {reason}"),
            Self::Geometry(e) => write!(f, "geometry: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeometryError> for ConfigError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

// ── InversionConfig ─────────────────────────────────────────────

/// Every recognized option of an inversion run.
#[derive(Clone, Debug)]
pub struct InversionConfig {
    /// Interior grid depth extent (cells).
    pub nz: usize,
    /// Interior grid lateral extent (cells).
    pub nx: usize,
    /// Depth cell spacing (m); must equal `dx`.
    pub dz: f32,
    /// Lateral cell spacing (m).
    pub dx: f32,
    /// Time step (s).
    pub dt: f32,
    /// Time samples per trace.
    pub nt: usize,
    /// Shot count.
    pub ns: usize,
    /// Receivers per shot.
    pub ng: usize,
    /// Source array lateral origin.
    pub sxbeg: usize,
    /// Source array depth origin.
    pub szbeg: usize,
    /// Source array lateral stride.
    pub jsx: usize,
    /// Source array depth stride.
    pub jsz: usize,
    /// Receiver array lateral origin.
    pub gxbeg: usize,
    /// Receiver array depth origin.
    pub gzbeg: usize,
    /// Receiver array lateral stride.
    pub jgx: usize,
    /// Receiver array depth stride.
    pub jgz: usize,
    /// Ricker dominant frequency (Hz).
    pub fm: f32,
    /// Ricker peak amplitude.
    pub amp: f32,
    /// Damping border thickness (cells).
    pub nb: usize,
    /// Outer iteration count.
    pub niter: usize,
    /// Initial velocity file (`nz * nx` f32, column-major z-fast, m/s).
    pub vinit: PathBuf,
    /// Observed data file (`ns * nt * ng` f32, `(is, it, ig)` order).
    pub shots: PathBuf,
    /// Output file receiving the updated velocity per iteration.
    pub vupdates: PathBuf,
    /// Lower physical velocity clamp (m/s).
    pub vmin: f32,
    /// Upper physical velocity clamp (m/s).
    pub vmax: f32,
    /// RNG seed for the source encoding.
    pub seed: u64,
    /// Wavefield checkpoint interval (timesteps).
    pub checkpoint_interval: usize,
}

impl InversionConfig {
    /// Default lower velocity clamp (m/s).
    pub const DEFAULT_VMIN: f32 = 1000.0;
    /// Default upper velocity clamp (m/s).
    pub const DEFAULT_VMAX: f32 = 8000.0;
    /// Default encoding seed.
    pub const DEFAULT_SEED: u64 = 10;
    /// Default checkpoint interval.
    pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 50;

    /// Build a configuration from `key=value` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOption`] for an unrecognized key,
    /// [`ConfigError::MissingOption`] for an absent required key, or
    /// [`ConfigError::InvalidOption`] for an unparsable value.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = BTreeMap::new();
        for (name, value) in pairs {
            map.insert(name, value);
        }

        const RECOGNIZED: &[&str] = &[
            "nz", "nx", "dz", "dx", "dt", "nt", "ns", "ng", "sxbeg", "szbeg", "jsx", "jsz",
            "gxbeg", "gzbeg", "jgx", "jgz", "fm", "amp", "nb", "niter", "vinit", "shots",
            "vupdates", "vmin", "vmax", "seed", "checkpoint_interval",
        ];
        if let Some(name) = map.keys().find(|k| !RECOGNIZED.contains(&k.as_str())) {
            return Err(ConfigError::UnknownOption { name: name.clone() });
        }

        let config = Self {
            nz: req_parse(&map, "nz")?,
            nx: req_parse(&map, "nx")?,
            dz: req_parse(&map, "dz")?,
            dx: req_parse(&map, "dx")?,
            dt: req_parse(&map, "dt")?,
            nt: req_parse(&map, "nt")?,
            ns: req_parse(&map, "ns")?,
            ng: req_parse(&map, "ng")?,
            sxbeg: req_parse(&map, "sxbeg")?,
            szbeg: req_parse(&map, "szbeg")?,
            jsx: req_parse(&map, "jsx")?,
            jsz: req_parse(&map, "jsz")?,
            gxbeg: req_parse(&map, "gxbeg")?,
            gzbeg: req_parse(&map, "gzbeg")?,
            jgx: req_parse(&map, "jgx")?,
            jgz: req_parse(&map, "jgz")?,
            fm: req_parse(&map, "fm")?,
            amp: req_parse(&map, "amp")?,
            nb: req_parse(&map, "nb")?,
            niter: req_parse(&map, "niter")?,
            vinit: PathBuf::from(require(&map, "vinit")?),
            shots: PathBuf::from(require(&map, "shots")?),
            vupdates: PathBuf::from(require(&map, "vupdates")?),
            vmin: opt_parse(&map, "vmin")?.unwrap_or(Self::DEFAULT_VMIN),
            vmax: opt_parse(&map, "vmax")?.unwrap_or(Self::DEFAULT_VMAX),
            seed: opt_parse(&map, "seed")?.unwrap_or(Self::DEFAULT_SEED),
            checkpoint_interval: opt_parse(&map, "checkpoint_interval")?
                .unwrap_or(Self::DEFAULT_CHECKPOINT_INTERVAL),
        };
        Ok(config)
    }

    /// Validate all structural invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant. A marginal Courant number is
    /// not an error; it is logged as a warning because the clamps keep the
    /// model inside `[vmin, vmax]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Square cells: the stencil assumes dx == dz.
        if (self.dz - self.dx).abs() > f32::EPSILON * self.dx.abs() {
            return Err(ConfigError::Inconsistent {
                reason: format!("dz ({}) must equal dx ({})", self.dz, self.dx),
            });
        }
        // 2. The grid itself (extents and sampling).
        let grid = self.grid()?;
        // 3. The margin must cover the stencil halfwidth, or sources in
        //    the shallow rows would sit in the never-written border.
        if self.nb < 6 {
            return Err(ConfigError::InvalidOption {
                name: "nb".to_string(),
                reason: format!("damping border {} is below the stencil halfwidth 6", self.nb),
            });
        }
        // 4. Counts.
        if self.nt == 0 {
            return Err(ConfigError::InvalidOption {
                name: "nt".to_string(),
                reason: "at least one time sample is required".to_string(),
            });
        }
        if self.ns == 0 || self.ng == 0 {
            return Err(ConfigError::InvalidOption {
                name: if self.ns == 0 { "ns" } else { "ng" }.to_string(),
                reason: "at least one source and one receiver are required".to_string(),
            });
        }
        // 5. Wavelet parameters.
        if !(self.fm > 0.0 && self.fm.is_finite()) {
            return Err(ConfigError::InvalidOption {
                name: "fm".to_string(),
                reason: format!("dominant frequency must be finite and positive, got {}", self.fm),
            });
        }
        if !self.amp.is_finite() {
            return Err(ConfigError::InvalidOption {
                name: "amp".to_string(),
                reason: format!("amplitude must be finite, got {}", self.amp),
            });
        }
        // 6. Clamp bounds.
        if !(self.vmin > 0.0 && self.vmin < self.vmax && self.vmax.is_finite()) {
            return Err(ConfigError::Inconsistent {
                reason: format!("need 0 < vmin < vmax, got vmin={} vmax={}", self.vmin, self.vmax),
            });
        }
        // 7. Acquisition geometry inside the computing zone.
        self.source_positions().validate("source", self.nz, self.nx)?;
        self.receiver_positions().validate("receiver", self.nz, self.nx)?;
        // 8. Courant check: warn only, the clamps recover.
        let courant = grid.courant(self.vmax);
        if courant > 0.7 {
            warn!(
                courant = f64::from(courant),
                "Courant number exceeds 0.7; updates will clamp"
            );
        }
        Ok(())
    }

    /// The grid described by this configuration.
    ///
    /// # Errors
    ///
    /// Propagates [`GeometryError`] for unusable extents or sampling.
    pub fn grid(&self) -> Result<Grid, ConfigError> {
        Ok(Grid::new(self.nz, self.nx, self.nb, self.dx, self.dt)?)
    }

    /// The source array in interior coordinates.
    pub fn source_positions(&self) -> ShotPosition {
        ShotPosition::linear(self.szbeg, self.sxbeg, self.jsz, self.jsx, self.ns)
    }

    /// The receiver array in interior coordinates.
    pub fn receiver_positions(&self) -> ShotPosition {
        ShotPosition::linear(self.gzbeg, self.gxbeg, self.jgz, self.jgx, self.ng)
    }

    /// The direct-arrival mute width for observed data: `1.5 / fm`.
    pub fn observed_mute_width(&self) -> f32 {
        1.5 / self.fm
    }
}

fn require<'m>(
    map: &'m BTreeMap<String, String>,
    name: &'static str,
) -> Result<&'m str, ConfigError> {
    map.get(name)
        .map(String::as_str)
        .ok_or(ConfigError::MissingOption { name })
}

fn req_parse<T: std::str::FromStr>(
    map: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<T, ConfigError> {
    parse(require(map, name)?, name)
}

fn opt_parse<T: std::str::FromStr>(
    map: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    map.get(name).map(|v| parse(v, name)).transpose()
}

fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidOption {
        name: name.to_string(),
        reason: format!("cannot parse '{value}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_pairs() -> Vec<(String, String)> {
        [
            ("nz", "100"),
            ("nx", "120"),
            ("dz", "5"),
            ("dx", "5"),
            ("dt", "0.001"),
            ("nt", "1000"),
            ("ns", "8"),
            ("ng", "60"),
            ("sxbeg", "10"),
            ("szbeg", "2"),
            ("jsx", "12"),
            ("jsz", "0"),
            ("gxbeg", "0"),
            ("gzbeg", "1"),
            ("jgx", "2"),
            ("jgz", "0"),
            ("fm", "15"),
            ("amp", "1"),
            ("nb", "30"),
            ("niter", "20"),
            ("vinit", "vinit.bin"),
            ("shots", "shots.bin"),
            ("vupdates", "vupdates.bin"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn valid_config() -> InversionConfig {
        InversionConfig::from_pairs(valid_pairs()).unwrap()
    }

    #[test]
    fn from_pairs_applies_defaults() {
        let cfg = valid_config();
        assert_eq!(cfg.vmin, InversionConfig::DEFAULT_VMIN);
        assert_eq!(cfg.vmax, InversionConfig::DEFAULT_VMAX);
        assert_eq!(cfg.seed, 10);
        assert_eq!(cfg.checkpoint_interval, 50);
    }

    #[test]
    fn from_pairs_rejects_unknown_option() {
        let mut pairs = valid_pairs();
        pairs.push(("wavelets".to_string(), "3".to_string()));
        match InversionConfig::from_pairs(pairs) {
            Err(ConfigError::UnknownOption { name }) => assert_eq!(name, "wavelets"),
            other => panic!("expected UnknownOption, got {other:?}"),
        }
    }

    #[test]
    fn from_pairs_reports_missing_option() {
        let pairs: Vec<_> = valid_pairs()
            .into_iter()
            .filter(|(k, _)| k != "shots")
            .collect();
        match InversionConfig::from_pairs(pairs) {
            Err(ConfigError::MissingOption { name }) => assert_eq!(name, "shots"),
            other => panic!("expected MissingOption, got {other:?}"),
        }
    }

    #[test]
    fn from_pairs_rejects_garbage_value() {
        let mut pairs = valid_pairs();
        pairs.iter_mut().find(|(k, _)| k == "nt").unwrap().1 = "soon".to_string();
        assert!(matches!(
            InversionConfig::from_pairs(pairs),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_rectangular_cells() {
        let mut cfg = valid_config();
        cfg.dz = 4.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Inconsistent { .. })));
    }

    #[test]
    fn validate_rejects_thin_border() {
        let mut cfg = valid_config();
        cfg.nb = 4;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidOption { .. })));
    }

    #[test]
    fn validate_rejects_source_outside_zone() {
        let mut cfg = valid_config();
        cfg.sxbeg = 115; // last source lands at 115 + 7*12 > nx
        match cfg.validate() {
            Err(ConfigError::Geometry(GeometryError::OutOfComputingZone { what, .. })) => {
                assert_eq!(what, "source");
            }
            other => panic!("expected geometry error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_clamps() {
        let mut cfg = valid_config();
        cfg.vmin = 5000.0;
        cfg.vmax = 2000.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Inconsistent { .. })));
    }

    #[test]
    fn observed_mute_width_follows_dominant_frequency() {
        let cfg = valid_config();
        assert!((cfg.observed_mute_width() - 0.1).abs() < 1e-6);
    }
}
