//! TOML description of a coaxial crystal and its sweep.
//!
//! ```toml
//! repeat_count = 12
//! fold_threshold = 0.314
//!
//! [sweep]
//! start_hz = 1.0
//! stop_hz = 50e6
//! points = 100000
//!
//! [input]
//! name = "GBF"
//! impedance = 50.0
//!
//! [output]
//! name = "Termination"
//! impedance = 50.0
//!
//! [[layers]]
//! name = "RG59U"
//! length = 5.0
//! impedance = 75.0
//! velocity_factor = 0.66
//! attenuation = { kind = "table_file", path = "rg59u.txt", format = "alternating" }
//!
//! [[layers]]
//! name = "RG58U"
//! length = 5.0
//! impedance = 50.0
//! velocity_factor = 0.66
//! attenuation = { kind = "rg58u" }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attenuation::{Attenuation, InterpolationTable};
use crate::constants::{
    phase_velocity, DEFAULT_FOLD_THRESHOLD, POLYETHYLENE_VELOCITY_FACTOR,
};
use crate::error::{CoaxError, Result};
use crate::frequency_response::pulsation_linspace;
use crate::io::{read_alternating_table, read_column, read_delimited_table};
use crate::medium::{Layer, Termination};
use crate::model::LayeredModel;

/// Layout of an attenuation table file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// Two columns per line: frequency (Hz) and attenuation (Np/m).
    #[default]
    Delimited,
    /// One number per line, frequency and attenuation alternating.
    Alternating,
}

/// How a layer's attenuation is obtained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttenuationConfig {
    #[default]
    Lossless,
    /// Polynomial in pulsation, ascending powers.
    Polynomial { coefficients: Vec<f64> },
    /// Inline table, frequencies in Hz.
    Table {
        frequencies_hz: Vec<f64>,
        values: Vec<f64>,
    },
    /// Table read from a flat text file, relative to the config file.
    TableFile {
        path: PathBuf,
        #[serde(default)]
        format: TableFormat,
    },
    /// Amplitudes measured at both ends of a `measured_length` metre cable.
    Amplitudes {
        frequencies_hz: Vec<f64>,
        input: Vec<f64>,
        output: Vec<f64>,
        measured_length: f64,
    },
    /// Same as `Amplitudes`, each series read from a one-number-per-line
    /// file relative to the config file.
    AmplitudeFiles {
        frequencies: PathBuf,
        input: PathBuf,
        output: PathBuf,
        measured_length: f64,
    },
    LogLinear {
        slope: f64,
        intercept: f64,
        scale: f64,
    },
    Rg58u,
    Rg58uPublished,
    Rg59uPublished,
}

impl AttenuationConfig {
    fn resolve(&self, base_dir: Option<&Path>) -> Result<Attenuation> {
        Ok(match self {
            Self::Lossless => Attenuation::Lossless,
            Self::Polynomial { coefficients } => Attenuation::Polynomial {
                coefficients: coefficients.clone(),
            },
            Self::Table {
                frequencies_hz,
                values,
            } => Attenuation::Table(InterpolationTable::from_frequencies(
                frequencies_hz,
                values.clone(),
            )?),
            Self::TableFile { path, format } => {
                let path = resolve_path(base_dir, path);
                debug!(path = %path.display(), ?format, "reading attenuation table");
                let reader = BufReader::new(File::open(&path)?);
                let table = match format {
                    TableFormat::Delimited => read_delimited_table(reader)?,
                    TableFormat::Alternating => read_alternating_table(reader)?,
                };
                Attenuation::Table(table)
            }
            Self::Amplitudes {
                frequencies_hz,
                input,
                output,
                measured_length,
            } => Attenuation::Table(InterpolationTable::from_amplitudes(
                frequencies_hz,
                input,
                output,
                *measured_length,
            )?),
            Self::AmplitudeFiles {
                frequencies,
                input,
                output,
                measured_length,
            } => {
                let column = |path: &Path| -> Result<Vec<f64>> {
                    let path = resolve_path(base_dir, path);
                    debug!(path = %path.display(), "reading amplitude column");
                    read_column(BufReader::new(File::open(&path)?))
                };
                Attenuation::Table(InterpolationTable::from_amplitudes(
                    &column(frequencies.as_path())?,
                    &column(input.as_path())?,
                    &column(output.as_path())?,
                    *measured_length,
                )?)
            }
            Self::LogLinear {
                slope,
                intercept,
                scale,
            } => Attenuation::LogLinear {
                slope: *slope,
                intercept: *intercept,
                scale: *scale,
            },
            Self::Rg58u => Attenuation::rg58u(),
            Self::Rg58uPublished => Attenuation::rg58u_published(),
            Self::Rg59uPublished => Attenuation::rg59u_published(),
        })
    }
}

fn resolve_path(base_dir: Option<&Path>, path: &Path) -> PathBuf {
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

/// A boundary medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationConfig {
    pub name: String,
    pub impedance: f64,
}

/// One cable section. Give either `phase_velocity` (m/s) or
/// `velocity_factor` (fraction of c).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub length: f64,
    pub impedance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_factor: Option<f64>,
    #[serde(default)]
    pub attenuation: AttenuationConfig,
}

impl LayerConfig {
    fn to_layer(&self, base_dir: Option<&Path>) -> Result<Layer> {
        let velocity = match (self.phase_velocity, self.velocity_factor) {
            (Some(v), None) => v,
            (None, Some(factor)) => phase_velocity(factor),
            (None, None) => {
                return Err(CoaxError::config(format!(
                    "layer '{}' needs a phase_velocity or a velocity_factor",
                    self.name
                )))
            }
            (Some(_), Some(_)) => {
                return Err(CoaxError::config(format!(
                    "layer '{}' sets both phase_velocity and velocity_factor",
                    self.name
                )))
            }
        };
        let layer = Layer::new(
            self.name.clone(),
            self.length,
            self.impedance,
            velocity,
            self.attenuation.resolve(base_dir)?,
        );
        layer.validate()?;
        Ok(layer)
    }
}

/// Linear frequency sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub start_hz: f64,
    pub stop_hz: f64,
    pub points: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_hz: 1.0,
            stop_hz: 50e6,
            points: 100_000,
        }
    }
}

impl SweepConfig {
    /// Uniform pulsation grid (rad/s) for this sweep.
    pub fn pulsations(&self) -> Result<Vec<f64>> {
        if !(self.start_hz.is_finite() && self.start_hz > 0.0) {
            return Err(CoaxError::config(format!(
                "sweep must start above 0 Hz, got {}",
                self.start_hz
            )));
        }
        if !(self.stop_hz.is_finite() && self.stop_hz > self.start_hz) {
            return Err(CoaxError::config(format!(
                "sweep stop {} Hz must lie above start {} Hz",
                self.stop_hz, self.start_hz
            )));
        }
        if self.points < 2 {
            return Err(CoaxError::config(format!(
                "sweep needs at least 2 points, got {}",
                self.points
            )));
        }
        Ok(pulsation_linspace(self.start_hz, self.stop_hz, self.points))
    }
}

fn default_fold_threshold() -> f64 {
    DEFAULT_FOLD_THRESHOLD
}

/// Complete simulation description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Wave-number folding threshold (m⁻¹).
    #[serde(default = "default_fold_threshold")]
    pub fold_threshold: f64,
    /// Tile `layers` this many times; absent means the stack is `layers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<usize>,
    #[serde(default)]
    pub sweep: SweepConfig,
    pub input: TerminationConfig,
    pub output: TerminationConfig,
    pub layers: Vec<LayerConfig>,
    /// Directory relative table paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    /// The reference crystal: twelve RG59U/RG58U periods of 5 m sections
    /// between a 50 Ω generator and a 50 Ω termination.
    fn default() -> Self {
        let cable = |name: &str, impedance: f64, attenuation: AttenuationConfig| LayerConfig {
            name: name.to_string(),
            length: 5.0,
            impedance,
            phase_velocity: None,
            velocity_factor: Some(POLYETHYLENE_VELOCITY_FACTOR),
            attenuation,
        };
        Self {
            fold_threshold: DEFAULT_FOLD_THRESHOLD,
            repeat_count: Some(12),
            sweep: SweepConfig::default(),
            input: TerminationConfig {
                name: "GBF".to_string(),
                impedance: 50.0,
            },
            output: TerminationConfig {
                name: "Termination".to_string(),
                impedance: 50.0,
            },
            layers: vec![
                cable("RG59U", 75.0, AttenuationConfig::Rg59uPublished),
                cable("RG58U", 50.0, AttenuationConfig::Rg58u),
            ],
            base_dir: None,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file; relative table paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        debug!(path = %path.display(), layers = config.layers.len(), "loaded configuration");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CoaxError::config(format!("cannot serialise configuration: {e}")))
    }

    /// Assemble the layered model described by this configuration.
    pub fn build_model(&self) -> Result<LayeredModel> {
        let base_dir = self.base_dir.as_deref();
        let layers = self
            .layers
            .iter()
            .map(|l| l.to_layer(base_dir))
            .collect::<Result<Vec<_>>>()?;
        let model = match self.repeat_count {
            Some(n) => LayeredModel::periodic(layers, n)?,
            None => LayeredModel::direct(layers)?,
        };
        Ok(model
            .with_input(Termination::new(self.input.name.clone(), self.input.impedance))
            .with_output(Termination::new(self.output.name.clone(), self.output.impedance)))
    }
}
