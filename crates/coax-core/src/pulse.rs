//! Gaussian wave-packet propagation through a layered model.
//!
//! A packet (Gaussian envelope on a sinusoidal carrier) is taken to the
//! frequency domain, filtered by the stack's transmission and brought back
//! to the time domain. The shift of the signal centroid between input and
//! output is the group delay at the carrier frequency.

use std::f64::consts::PI;

use num_complex::Complex64;
use realfft::RealFftPlanner;
use tracing::debug;

use crate::error::{CoaxError, Result};
use crate::frequency_response::linspace;
use crate::model::LayeredModel;

/// Spectral bins below this fraction of the peak bin are left at zero
/// instead of being filtered; the attenuation fits are not valid far from
/// the band they were measured on.
const SPECTRAL_FLOOR: f64 = 1e-12;

/// Carrier-modulated Gaussian packet, centred in its time window.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianPacket {
    /// Carrier frequency in Hz.
    pub carrier_hz: f64,
    /// Standard deviation of the envelope in seconds.
    pub width_s: f64,
    /// Sample rate of the generated trace in Hz.
    pub sample_rate_hz: f64,
    /// Total duration of the trace in seconds.
    pub window_s: f64,
    /// Peak envelope amplitude.
    pub amplitude: f64,
}

impl Default for GaussianPacket {
    fn default() -> Self {
        Self {
            carrier_hz: 10e6,
            width_s: 4e-6,
            sample_rate_hz: 200e6,
            window_s: 100e-6,
            amplitude: 10.0,
        }
    }
}

impl GaussianPacket {
    pub fn new(carrier_hz: f64, width_s: f64) -> Self {
        Self {
            carrier_hz,
            width_s,
            ..Self::default()
        }
    }

    pub fn sample_count(&self) -> usize {
        (self.sample_rate_hz * self.window_s).round() as usize
    }

    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("carrier frequency", self.carrier_hz),
            ("envelope width", self.width_s),
            ("sample rate", self.sample_rate_hz),
            ("window", self.window_s),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoaxError::config(format!(
                    "packet {what} must be positive, got {value}"
                )));
            }
        }
        if self.sample_count() < 2 {
            return Err(CoaxError::config(format!(
                "packet window holds {} samples, need at least 2",
                self.sample_count()
            )));
        }
        Ok(())
    }

    /// Sample instants spanning `[-window/2, window/2]`.
    pub fn times(&self) -> Vec<f64> {
        let half = self.window_s / 2.0;
        linspace(-half, half, self.sample_count())
    }

    /// `A·exp(−t²/2σ²)·sin(2π·f₀·t)` at each of `times`.
    pub fn samples(&self, times: &[f64]) -> Vec<f64> {
        let two_var = 2.0 * self.width_s * self.width_s;
        times
            .iter()
            .map(|&t| {
                self.amplitude * (-t * t / two_var).exp() * (2.0 * PI * self.carrier_hz * t).sin()
            })
            .collect()
    }
}

/// Input and output traces of a propagated packet on a shared time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    pub times: Vec<f64>,
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl Propagation {
    /// Centroid of the output minus centroid of the input, in seconds.
    pub fn delay(&self) -> Result<f64> {
        Ok(signal_centroid(&self.times, &self.output)? - signal_centroid(&self.times, &self.input)?)
    }

    /// Group velocity (m/s) over a stack of `length` metres.
    pub fn group_velocity(&self, length: f64) -> Result<f64> {
        let delay = self.delay()?;
        if !(delay > 0.0) {
            return Err(CoaxError::numerical(format!(
                "packet delay must be positive to define a velocity, got {delay} s"
            )));
        }
        Ok(length / delay)
    }

    /// Peak |output| over peak |input|.
    pub fn peak_ratio(&self) -> f64 {
        let peak = |s: &[f64]| s.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        peak(&self.output) / peak(&self.input)
    }
}

/// Send `packet` through `model`.
///
/// The solver's transfer functions follow the `exp(−iωt)` convention while
/// the inverse FFT synthesises with `exp(+iωt)`, so each bin is multiplied
/// by the conjugate transmission.
pub fn propagate(model: &LayeredModel, packet: &GaussianPacket) -> Result<Propagation> {
    packet.validate()?;
    let times = packet.times();
    let input = packet.samples(&times);
    let n = input.len();
    let dt = times[1] - times[0];

    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut scratch = input.clone();
    let mut spectrum = fft.make_output_vec();
    fft.process(&mut scratch, &mut spectrum)
        .map_err(|e| CoaxError::numerical(format!("forward FFT failed: {e}")))?;

    let peak = spectrum.iter().fold(0.0f64, |m, c| m.max(c.norm()));
    let active: Vec<usize> = (0..spectrum.len())
        .filter(|&k| spectrum[k].norm() > SPECTRAL_FLOOR * peak)
        .collect();
    let bin_width = 2.0 * PI / (n as f64 * dt);
    let pulsations: Vec<f64> = active.iter().map(|&k| k as f64 * bin_width).collect();

    debug!(
        samples = n,
        active_bins = active.len(),
        carrier_hz = packet.carrier_hz,
        "propagating packet"
    );

    let response = model.transfer(&pulsations)?;

    let mut filtered = vec![realfft::num_complex::Complex::new(0.0, 0.0); spectrum.len()];
    for ((&k, &w), t) in active.iter().zip(&pulsations).zip(&response.transmission) {
        if !(t.re.is_finite() && t.im.is_finite()) {
            return Err(CoaxError::numerical(format!(
                "transmission is not finite at {} Hz",
                w / (2.0 * PI)
            )));
        }
        let product = Complex64::new(spectrum[k].re, spectrum[k].im) * t.conj();
        filtered[k] = realfft::num_complex::Complex::new(product.re, product.im);
    }

    // realfft requires real DC and, for even lengths, real Nyquist bins.
    filtered[0].im = 0.0;
    if n % 2 == 0 {
        let last = filtered.len() - 1;
        filtered[last].im = 0.0;
    }

    let mut output = ifft.make_output_vec();
    ifft.process(&mut filtered, &mut output)
        .map_err(|e| CoaxError::numerical(format!("inverse FFT failed: {e}")))?;

    // Normalize by the transform length (realfft convention)
    let norm = 1.0 / n as f64;
    for s in &mut output {
        *s *= norm;
    }

    Ok(Propagation {
        times,
        input,
        output,
    })
}

/// Time centroid `∫t·|y|dt / ∫|y|dt` of a uniformly sampled signal, using
/// the trapezoid rule.
pub fn signal_centroid(times: &[f64], signal: &[f64]) -> Result<f64> {
    if times.len() != signal.len() || times.len() < 2 {
        return Err(CoaxError::config(format!(
            "centroid needs matching series of at least 2 points, got {} times and {} samples",
            times.len(),
            signal.len()
        )));
    }
    let dt = times[1] - times[0];
    let magnitude: Vec<f64> = signal.iter().map(|y| y.abs()).collect();
    let moment: Vec<f64> = times.iter().zip(&magnitude).map(|(t, y)| t * y).collect();

    let area = trapezoid(&magnitude, dt);
    if area == 0.0 || !area.is_finite() {
        return Err(CoaxError::numerical(format!(
            "signal area is {area}, centroid undefined"
        )));
    }
    Ok(trapezoid(&moment, dt) / area)
}

fn trapezoid(values: &[f64], dx: f64) -> f64 {
    values.windows(2).map(|w| (w[0] + w[1]) * dx / 2.0).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attenuation::Attenuation;
    use crate::medium::{Layer, Termination};
    use approx::assert_relative_eq;

    fn short_packet() -> GaussianPacket {
        GaussianPacket {
            carrier_hz: 10e6,
            width_s: 1e-6,
            sample_rate_hz: 200e6,
            window_s: 20e-6,
            amplitude: 1.0,
        }
    }

    fn matched_line(length: f64, velocity: f64, attenuation: Attenuation) -> LayeredModel {
        LayeredModel::direct(vec![Layer::new("line", length, 50.0, velocity, attenuation)])
            .unwrap()
            .with_input(Termination::new("GBF", 50.0))
            .with_output(Termination::new("load", 50.0))
    }

    #[test]
    fn test_packet_shape() {
        let packet = short_packet();
        let times = packet.times();
        assert_eq!(times.len(), 4000);
        assert_relative_eq!(times[0], -10e-6);
        assert_relative_eq!(*times.last().unwrap(), 10e-6, max_relative = 1e-12);
        let samples = packet.samples(&times);
        let peak = samples.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak <= 1.0 && peak > 0.98, "peak = {peak}");
    }

    #[test]
    fn test_centroid_of_shifted_box() {
        let times = linspace(0.0, 10.0, 101);
        let signal: Vec<f64> = times
            .iter()
            .map(|&t| if (4.0..=6.0).contains(&t) { -2.0 } else { 0.0 })
            .collect();
        let c = signal_centroid(&times, &signal).unwrap();
        assert_relative_eq!(c, 5.0, epsilon = 1e-9);
        assert!(signal_centroid(&times, &vec![0.0; 101]).is_err());
        assert!(signal_centroid(&times[..3], &signal).is_err());
    }

    #[test]
    fn test_matched_lossless_line_delays_packet() {
        let (length, velocity) = (100.0, 2e8);
        let model = matched_line(length, velocity, Attenuation::Lossless);
        let result = propagate(&model, &short_packet()).unwrap();

        let delay = result.delay().unwrap();
        assert_relative_eq!(delay, length / velocity, max_relative = 1e-2);
        let vg = result.group_velocity(model.total_length()).unwrap();
        assert_relative_eq!(vg, velocity, max_relative = 1e-2);
        assert_relative_eq!(result.peak_ratio(), 1.0, epsilon = 3e-2);
    }

    #[test]
    fn test_lossy_line_shrinks_packet() {
        let alpha = 0.005;
        let length = 100.0;
        let model = matched_line(
            length,
            2e8,
            Attenuation::Polynomial {
                coefficients: vec![alpha],
            },
        );
        let result = propagate(&model, &short_packet()).unwrap();
        assert_relative_eq!(result.peak_ratio(), (-alpha * length).exp(), max_relative = 3e-2);
    }

    #[test]
    fn test_invalid_packet_is_rejected() {
        let model = matched_line(1.0, 2e8, Attenuation::Lossless);
        let packet = GaussianPacket {
            width_s: 0.0,
            ..short_packet()
        };
        assert!(matches!(
            propagate(&model, &packet),
            Err(CoaxError::Configuration(_))
        ));
        let packet = GaussianPacket {
            window_s: 1e-9,
            ..short_packet()
        };
        assert!(packet.validate().is_err());
    }
}
