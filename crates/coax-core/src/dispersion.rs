//! Derived dispersion quantities of a sweep.
//!
//! The chain is strictly ordered:
//!
//! ```text
//! t(ω) → phase → phase shift → refractive index ─┬→ wave number
//!                                                └→ group velocity
//! ```
//!
//! Each stage is available as a pure function over slices, and the
//! [`Dispersion`] pipeline runs them against one sweep while refusing to
//! run a stage whose prerequisite is missing.

use std::f64::consts::PI;

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::constants::{DEFAULT_FOLD_THRESHOLD, SPEED_OF_LIGHT};
use crate::error::{CoaxError, Result};
use crate::frequency_response::Sweep;

/// Upper bound on reflections applied to a single wave number.
pub const MAX_FOLD_ITERATIONS: usize = 1_000_000;

/// Fold counts above this usually mean the index was computed against the
/// wrong stack length.
const SUSPICIOUS_FOLDS: usize = 10_000;

/// Relative tolerance on the spacing of a "uniform" pulsation grid.
const SPACING_TOLERANCE: f64 = 1e-6;

/// Phase of each transmission sample as `atan(Im t / Re t)`.
///
/// This is the bounded arctangent, not `arg`: values lie in (−π/2, π/2) and
/// the quadrant is lost. [`phase_shifts`] is built around exactly this
/// range, so the two must be changed together if ever.
pub fn phases(transmission: &[Complex64]) -> Vec<f64> {
    transmission.iter().map(|t| (t.im / t.re).atan()).collect()
}

/// Unwrap bounded phases into a continuous phase shift.
///
/// Every time the phase drops from non-negative to negative between two
/// consecutive samples a half turn is added to everything that follows.
pub fn phase_shifts(phases: &[f64]) -> Vec<f64> {
    let mut folds = 0u32;
    let mut previous: Option<f64> = None;
    phases
        .iter()
        .map(|&phase| {
            if let Some(prev) = previous {
                if prev >= 0.0 && phase < 0.0 {
                    folds += 1;
                }
            }
            previous = Some(phase);
            phase + f64::from(folds) * PI
        })
        .collect()
}

/// Effective refractive index n(ω) = φ(ω)·c / (L·ω).
pub fn refractive_indexes(
    phase_shifts: &[f64],
    pulsations: &[f64],
    total_length: f64,
) -> Result<Vec<f64>> {
    ensure_same_len("phase shifts", phase_shifts.len(), pulsations.len())?;
    if !(total_length.is_finite() && total_length > 0.0) {
        return Err(CoaxError::config(format!(
            "refractive index needs a positive stack length, got {total_length}"
        )));
    }
    Ok(phase_shifts
        .iter()
        .zip(pulsations)
        .map(|(&phi, &w)| phi * SPEED_OF_LIGHT / (total_length * w))
        .collect())
}

/// Outcome of folding one wave number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fold {
    pub value: f64,
    pub iterations: usize,
}

/// Fold a wave number back below `k0` by repeated reflection:
/// while `k >= k0`, `k ← |2·k0 − |k||`.
pub fn fold_wave_number(k: f64, k0: f64) -> Result<Fold> {
    if !(k0.is_finite() && k0 > 0.0) {
        return Err(CoaxError::numerical(format!(
            "fold threshold must be positive and finite, got {k0}"
        )));
    }
    let mut value = k;
    let mut iterations = 0;
    while value >= k0 {
        if iterations == MAX_FOLD_ITERATIONS {
            return Err(CoaxError::numerical(format!(
                "wave number {k} still above {k0} after {MAX_FOLD_ITERATIONS} folds"
            )));
        }
        value = (2.0 * k0 - value.abs()).abs();
        iterations += 1;
    }
    Ok(Fold { value, iterations })
}

/// Wave numbers k = n·ω/c folded into `[0, k0)`.
pub fn wave_numbers(indexes: &[f64], pulsations: &[f64], k0: f64) -> Result<Vec<f64>> {
    ensure_same_len("refractive indexes", indexes.len(), pulsations.len())?;
    let mut most_folds = 0;
    let folded = indexes
        .iter()
        .zip(pulsations)
        .map(|(&n, &w)| {
            let fold = fold_wave_number(n * w / SPEED_OF_LIGHT, k0)?;
            most_folds = most_folds.max(fold.iterations);
            Ok(fold.value)
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(points = folded.len(), most_folds, "folded wave numbers");
    if most_folds > SUSPICIOUS_FOLDS {
        warn!(most_folds, k0, "wave numbers needed an unusual number of folds");
    }
    Ok(folded)
}

/// Derivative of uniformly sampled `values`: centered differences inside,
/// one-sided differences at both ends.
pub fn gradient(values: &[f64], spacing: f64) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => (values[1] - values[0]) / spacing,
            _ if i == n - 1 => (values[n - 1] - values[n - 2]) / spacing,
            _ => (values[i + 1] - values[i - 1]) / (2.0 * spacing),
        })
        .collect()
}

/// Group velocity v_g = c / (n + ω·dn/dω) over a uniform pulsation grid.
pub fn group_velocities(indexes: &[f64], pulsations: &[f64]) -> Result<Vec<f64>> {
    ensure_same_len("refractive indexes", indexes.len(), pulsations.len())?;
    let dw = uniform_spacing(pulsations)?;
    let dndw = gradient(indexes, dw);
    Ok(indexes
        .iter()
        .zip(pulsations)
        .zip(&dndw)
        .map(|((&n, &w), &slope)| SPEED_OF_LIGHT / (n + w * slope))
        .collect())
}

/// Spacing of an ascending, uniformly spaced grid.
fn uniform_spacing(pulsations: &[f64]) -> Result<f64> {
    if pulsations.len() < 2 {
        return Err(CoaxError::config(format!(
            "group velocity needs at least two sweep points, got {}",
            pulsations.len()
        )));
    }
    let dw = pulsations[1] - pulsations[0];
    if !(dw > 0.0) {
        return Err(CoaxError::config(format!(
            "sweep must be ascending, first step is {dw}"
        )));
    }
    if let Some(i) = pulsations
        .windows(2)
        .position(|p| ((p[1] - p[0]) - dw).abs() > SPACING_TOLERANCE * dw)
    {
        warn!(index = i, "non-uniform pulsation grid");
        return Err(CoaxError::config(format!(
            "sweep must be uniformly spaced: step {} is {}, expected {dw}",
            i,
            pulsations[i + 1] - pulsations[i]
        )));
    }
    Ok(dw)
}

fn ensure_same_len(what: &str, len: usize, expected: usize) -> Result<()> {
    if len == expected {
        Ok(())
    } else {
        Err(CoaxError::config(format!(
            "{what} have {len} points but the sweep has {expected}"
        )))
    }
}

/// Dispersion stages computed for a single sweep.
///
/// Stages are filled in order; asking for one whose prerequisite has not
/// been computed yet yields [`CoaxError::Ordering`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dispersion {
    pulsations: Vec<f64>,
    transmission: Vec<Complex64>,
    total_length: f64,
    phases: Option<Vec<f64>>,
    phase_shifts: Option<Vec<f64>>,
    refractive_indexes: Option<Vec<f64>>,
    wave_numbers: Option<Vec<f64>>,
    group_velocities: Option<Vec<f64>>,
}

impl Dispersion {
    /// Bind the pipeline to a sweep of a stack `total_length` metres long.
    pub fn new(sweep: &Sweep, total_length: f64) -> Self {
        Self {
            pulsations: sweep.pulsations.clone(),
            transmission: sweep.transmission.clone(),
            total_length,
            phases: None,
            phase_shifts: None,
            refractive_indexes: None,
            wave_numbers: None,
            group_velocities: None,
        }
    }

    /// Run every stage in order.
    pub fn complete(sweep: &Sweep, total_length: f64, fold_threshold: f64) -> Result<Self> {
        let mut dispersion = Self::new(sweep, total_length);
        dispersion.compute_phases();
        dispersion.compute_phase_shifts()?;
        dispersion.compute_refractive_indexes()?;
        dispersion.compute_wave_numbers(fold_threshold)?;
        dispersion.compute_group_velocities()?;
        Ok(dispersion)
    }

    pub fn compute_phases(&mut self) -> &[f64] {
        self.phases.insert(phases(&self.transmission))
    }

    pub fn compute_phase_shifts(&mut self) -> Result<&[f64]> {
        let phases = require(&self.phases, "phase shift", "phase")?;
        let shifts = phase_shifts(phases);
        Ok(self.phase_shifts.insert(shifts))
    }

    pub fn compute_refractive_indexes(&mut self) -> Result<&[f64]> {
        let shifts = require(&self.phase_shifts, "refractive index", "phase shift")?;
        let indexes = refractive_indexes(shifts, &self.pulsations, self.total_length)?;
        Ok(self.refractive_indexes.insert(indexes))
    }

    pub fn compute_wave_numbers(&mut self, fold_threshold: f64) -> Result<&[f64]> {
        let indexes = require(&self.refractive_indexes, "wave number", "refractive index")?;
        let numbers = wave_numbers(indexes, &self.pulsations, fold_threshold)?;
        Ok(self.wave_numbers.insert(numbers))
    }

    pub fn compute_group_velocities(&mut self) -> Result<&[f64]> {
        let indexes = require(&self.refractive_indexes, "group velocity", "refractive index")?;
        let velocities = group_velocities(indexes, &self.pulsations)?;
        Ok(self.group_velocities.insert(velocities))
    }

    pub fn pulsations(&self) -> &[f64] {
        &self.pulsations
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    pub fn phases(&self) -> Option<&[f64]> {
        self.phases.as_deref()
    }

    pub fn phase_shifts(&self) -> Option<&[f64]> {
        self.phase_shifts.as_deref()
    }

    pub fn refractive_indexes(&self) -> Option<&[f64]> {
        self.refractive_indexes.as_deref()
    }

    pub fn wave_numbers(&self) -> Option<&[f64]> {
        self.wave_numbers.as_deref()
    }

    pub fn group_velocities(&self) -> Option<&[f64]> {
        self.group_velocities.as_deref()
    }
}

impl Sweep {
    /// Full dispersion chain for this sweep with the default fold threshold.
    pub fn dispersion(&self, total_length: f64) -> Result<Dispersion> {
        Dispersion::complete(self, total_length, DEFAULT_FOLD_THRESHOLD)
    }
}

fn require<'a>(
    stage: &'a Option<Vec<f64>>,
    name: &'static str,
    requires: &'static str,
) -> Result<&'a [f64]> {
    stage.as_deref().ok_or(CoaxError::Ordering {
        stage: name,
        requires,
    })
}
