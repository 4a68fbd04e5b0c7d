use crate::constants::{angular_frequency, frequency};
use num_complex::Complex64;

/// `n` evenly spaced samples from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Uniform pulsation grid (rad/s) for a frequency span given in Hz.
pub fn pulsation_linspace(f_start_hz: f64, f_stop_hz: f64, n: usize) -> Vec<f64> {
    linspace(f_start_hz, f_stop_hz, n)
        .into_iter()
        .map(angular_frequency)
        .collect()
}

/// End-to-end response of a layered model over one pulsation sweep.
///
/// Each call to [`LayeredModel::transfer`](crate::model::LayeredModel::transfer)
/// produces a fresh `Sweep`; nothing is cached on the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// Angular frequencies in rad/s.
    pub pulsations: Vec<f64>,
    /// Complex transmission t(ω).
    pub transmission: Vec<Complex64>,
    /// Complex reflection r(ω).
    pub reflection: Vec<Complex64>,
}

impl Sweep {
    pub fn new(
        pulsations: Vec<f64>,
        transmission: Vec<Complex64>,
        reflection: Vec<Complex64>,
    ) -> Self {
        debug_assert_eq!(pulsations.len(), transmission.len());
        debug_assert_eq!(pulsations.len(), reflection.len());
        Self {
            pulsations,
            transmission,
            reflection,
        }
    }

    pub fn len(&self) -> usize {
        self.pulsations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulsations.is_empty()
    }

    /// Sweep points in Hz.
    pub fn frequencies(&self) -> Vec<f64> {
        self.pulsations.iter().map(|&w| frequency(w)).collect()
    }

    /// |t(ω)|
    pub fn transmission_magnitude(&self) -> Vec<f64> {
        self.transmission.iter().map(|t| t.norm()).collect()
    }

    /// |r(ω)|
    pub fn reflection_magnitude(&self) -> Vec<f64> {
        self.reflection.iter().map(|r| r.norm()).collect()
    }

    /// Insertion loss −20·log₁₀|t| in dB.
    pub fn insertion_loss_db(&self) -> Vec<f64> {
        self.transmission
            .iter()
            .map(|t| -20.0 * t.norm().log10())
            .collect()
    }
}
