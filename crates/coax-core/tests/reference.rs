// Cross-checks of the recursive solver against an independent chain-matrix
// evaluation and against the full configured pipeline.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use coax_core::config::{SimConfig, SweepConfig};
use coax_core::{compute, Attenuation, Layer, LayeredModel, Termination};
use num_complex::Complex64;

/// 2×2 chain (ABCD) matrix of a transmission-line section:
///
/// [V_in]   [a  b] [V_out]
/// [I_in] = [c  d] [I_out]
#[derive(Debug, Clone, Copy)]
struct ChainMatrix {
    a: Complex64,
    b: Complex64,
    c: Complex64,
    d: Complex64,
}

impl ChainMatrix {
    fn identity() -> Self {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        Self { a: one, b: zero, c: zero, d: one }
    }

    fn line(layer: &Layer, w: f64) -> Self {
        let alpha = layer.attenuation.evaluate(w);
        let gamma_l = Complex64::new(alpha, -w / layer.phase_velocity) * layer.length;
        let z = layer.impedance;
        Self {
            a: gamma_l.cosh(),
            b: gamma_l.sinh() * z,
            c: gamma_l.sinh() / z,
            d: gamma_l.cosh(),
        }
    }

    fn chain(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
        }
    }

    fn transmission(&self, z_source: f64, z_load: f64) -> Complex64 {
        Complex64::new(2.0, 0.0)
            / (self.a + self.b / z_load + self.c * z_source + self.d * z_source / z_load)
    }
}

fn two_layer_stack() -> LayeredModel {
    let rg59 = Layer::new(
        "RG59-like",
        5.0,
        75.0,
        0.66 * 299_792_458.0,
        Attenuation::Polynomial { coefficients: vec![0.0025] },
    );
    let rg58 = Layer::new(
        "RG58-like",
        5.0,
        50.0,
        0.66 * 299_792_458.0,
        Attenuation::Polynomial { coefficients: vec![0.0012, 1e-10] },
    );
    LayeredModel::direct(vec![rg59, rg58])
        .unwrap()
        .with_input(Termination::new("source", 50.0))
        .with_output(Termination::new("load", 50.0))
}

#[test]
fn two_layer_transmission_matches_reference_values() {
    let expected = [
        0.878_984_720_739_976_7,
        0.920_850_758_628_932_8,
        0.825_593_029_346_530_9,
        0.864_520_506_841_271_2,
        0.775_572_974_142_130_9,
    ];
    let pulsations: Vec<f64> = (1..=5).map(|m| 2.0 * PI * m as f64 * 1e7).collect();
    let sweep = two_layer_stack().transfer(&pulsations).unwrap();
    for (t, want) in sweep.transmission.iter().zip(expected) {
        assert_relative_eq!(t.norm(), want, max_relative = 1e-9);
    }
}

#[test]
fn recursion_agrees_with_chain_matrices() {
    let model = two_layer_stack();
    let pulsations: Vec<f64> = (1..=40).map(|m| 2.0 * PI * m as f64 * 1.3e6).collect();
    let sweep = model.transfer(&pulsations).unwrap();

    for (&w, t) in pulsations.iter().zip(&sweep.transmission) {
        let chain = model
            .layers()
            .iter()
            .fold(ChainMatrix::identity(), |acc, layer| acc.chain(&ChainMatrix::line(layer, w)));
        let reference = chain.transmission(50.0, 50.0);
        assert_relative_eq!(t.norm(), reference.norm(), max_relative = 1e-9);
    }
}

#[test]
fn periodic_stack_agrees_with_chain_matrices() {
    let base = two_layer_stack().layers().to_vec();
    let model = LayeredModel::periodic(base, 4)
        .unwrap()
        .with_input(Termination::new("source", 50.0))
        .with_output(Termination::new("load", 50.0));
    assert_eq!(model.layers().len(), 8);

    let pulsations: Vec<f64> = (1..=20).map(|m| 2.0 * PI * m as f64 * 2.1e6).collect();
    let sweep = model.transfer(&pulsations).unwrap();
    for (&w, t) in pulsations.iter().zip(&sweep.transmission) {
        let chain = model
            .layers()
            .iter()
            .fold(ChainMatrix::identity(), |acc, layer| acc.chain(&ChainMatrix::line(layer, w)));
        assert_relative_eq!(t.norm(), chain.transmission(50.0, 50.0).norm(), max_relative = 1e-9);
    }
}

#[test]
fn default_configuration_runs_end_to_end() {
    let config = SimConfig {
        sweep: SweepConfig {
            start_hz: 1e6,
            stop_hz: 50e6,
            points: 2000,
        },
        ..SimConfig::default()
    };
    let result = compute(&config).unwrap();

    assert_relative_eq!(result.total_length, 120.0);
    assert!(result.layout.starts_with("Coaxial Model = | RG59U | RG58U | RG59U |"));
    assert_eq!(result.sweep.len(), 2000);

    let dispersion = &result.dispersion;
    let wave_numbers = dispersion.wave_numbers().unwrap();
    let velocities = dispersion.group_velocities().unwrap();
    assert_eq!(wave_numbers.len(), 2000);
    assert_eq!(velocities.len(), 2000);
    assert!(wave_numbers
        .iter()
        .all(|&k| k.is_finite() && k < config.fold_threshold));
    assert!(result
        .sweep
        .transmission_magnitude()
        .iter()
        .all(|&t| t.is_finite() && t < 1.0));
}
