//! Frequency-dependent line attenuation models.
//!
//! Every model answers the same question: the per-metre amplitude
//! attenuation α(ω) (Np/m) of a cable at angular frequency ω. The solver
//! multiplies it by the layer length, so `exp(-α·D)` is the one-way
//! amplitude factor of a layer.

use tracing::warn;

use crate::constants::angular_frequency;
use crate::error::{CoaxError, Result};

/// Piecewise-linear attenuation table over ascending pulsation knots.
///
/// Outside the knots the end values are held constant.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationTable {
    pulsations: Vec<f64>,
    values: Vec<f64>,
}

impl InterpolationTable {
    /// Build a table from pulsation knots (rad/s) and attenuations (Np/m).
    pub fn new(pulsations: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if pulsations.is_empty() {
            return Err(CoaxError::config("attenuation table is empty"));
        }
        if pulsations.len() != values.len() {
            return Err(CoaxError::config(format!(
                "attenuation table has {} knots but {} values",
                pulsations.len(),
                values.len()
            )));
        }
        if let Some(bad) = pulsations
            .iter()
            .chain(values.iter())
            .find(|v| !v.is_finite())
        {
            return Err(CoaxError::config(format!(
                "attenuation table contains non-finite entry {bad}"
            )));
        }
        if let Some(i) = pulsations.windows(2).position(|w| w[1] <= w[0]) {
            return Err(CoaxError::config(format!(
                "attenuation table knots must be strictly ascending (knot {} is {} after {})",
                i + 1,
                pulsations[i + 1],
                pulsations[i]
            )));
        }
        if let Some(i) = values.iter().position(|&v| v < 0.0) {
            warn!(
                knot = i,
                pulsation = pulsations[i],
                value = values[i],
                "attenuation table holds a negative value (gain)"
            );
        }
        Ok(Self { pulsations, values })
    }

    /// Build a table from frequencies in Hz.
    pub fn from_frequencies(frequencies_hz: &[f64], values: Vec<f64>) -> Result<Self> {
        let pulsations = frequencies_hz.iter().map(|&f| angular_frequency(f)).collect();
        Self::new(pulsations, values)
    }

    /// Derive attenuations from amplitudes measured at both ends of a cable
    /// of `length` metres: α = −ln(out/in) / length.
    pub fn from_amplitudes(
        frequencies_hz: &[f64],
        input: &[f64],
        output: &[f64],
        length: f64,
    ) -> Result<Self> {
        if !(length > 0.0) {
            return Err(CoaxError::config(format!(
                "measurement cable length must be positive, got {length}"
            )));
        }
        if input.len() != frequencies_hz.len() || output.len() != frequencies_hz.len() {
            return Err(CoaxError::config(format!(
                "amplitude series lengths differ: {} frequencies, {} inputs, {} outputs",
                frequencies_hz.len(),
                input.len(),
                output.len()
            )));
        }
        let values = input
            .iter()
            .zip(output)
            .map(|(&a_in, &a_out)| {
                if a_in > 0.0 && a_out > 0.0 {
                    Ok(-(a_out / a_in).ln() / length)
                } else {
                    Err(CoaxError::config(format!(
                        "amplitudes must be positive, got input {a_in} output {a_out}"
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_frequencies(frequencies_hz, values)
    }

    pub fn pulsations(&self) -> &[f64] {
        &self.pulsations
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Linearly interpolated attenuation at pulsation `w`.
    pub fn interpolate(&self, w: f64) -> f64 {
        let last = self.pulsations.len() - 1;
        if w <= self.pulsations[0] {
            return self.values[0];
        }
        if w >= self.pulsations[last] {
            return self.values[last];
        }

        // First knot strictly above w; w is inside the table so 1 <= upper <= last.
        let upper = self.pulsations.partition_point(|&p| p <= w);
        let lower = upper - 1;
        let (w0, w1) = (self.pulsations[lower], self.pulsations[upper]);
        let (a0, a1) = (self.values[lower], self.values[upper]);
        a0 + (a1 - a0) * (w - w0) / (w1 - w0)
    }
}

/// Attenuation strategy attached to a physical layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Attenuation {
    /// No loss at any frequency.
    #[default]
    Lossless,
    /// Polynomial in ω with coefficients in ascending powers.
    Polynomial { coefficients: Vec<f64> },
    /// Piecewise-linear interpolation of measured points.
    Table(InterpolationTable),
    /// α(ω) = −ln(slope·ω + intercept) / scale, the form of the published
    /// reference fits.
    LogLinear {
        slope: f64,
        intercept: f64,
        scale: f64,
    },
}

impl Attenuation {
    /// Fourth-degree fit of the RG58U bench measurements.
    pub fn rg58u() -> Self {
        Self::Polynomial {
            coefficients: vec![
                0.001_243_162_435_297_526_9,
                1.039_779_076_515_072_6e-10,
                -6.367_690_393_696_193e-19,
                2.735_326_073_454_789e-27,
                -3.788_179_118_764_273_5e-36,
            ],
        }
    }

    /// Published reference fit for RG58U.
    pub fn rg58u_published() -> Self {
        Self::LogLinear {
            slope: -1.7e-9,
            intercept: 0.9928,
            scale: 18.6,
        }
    }

    /// Published reference fit for RG59U.
    pub fn rg59u_published() -> Self {
        Self::LogLinear {
            slope: -1.3e-9,
            intercept: 0.9328,
            scale: 31.5,
        }
    }

    /// Per-metre attenuation at angular frequency `w`.
    ///
    /// A log-linear fit evaluated past the zero of its argument returns NaN;
    /// the fits are only meaningful inside the band they were measured on.
    pub fn evaluate(&self, w: f64) -> f64 {
        match self {
            Self::Lossless => 0.0,
            Self::Polynomial { coefficients } => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, &c| acc * w + c),
            Self::Table(table) => table.interpolate(w),
            Self::LogLinear {
                slope,
                intercept,
                scale,
            } => -(slope * w + intercept).ln() / scale,
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Lossless)
    }

    /// First of `pulsations` where the model evaluates below zero, i.e.
    /// where a layer would amplify instead of attenuate.
    pub fn first_negative(&self, pulsations: &[f64]) -> Option<f64> {
        if self.is_lossless() {
            return None;
        }
        pulsations.iter().copied().find(|&w| self.evaluate(w) < 0.0)
    }
}
