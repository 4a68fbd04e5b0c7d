use std::fmt;

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::constants::frequency;
use crate::error::{CoaxError, Result};
use crate::frequency_response::Sweep;
use crate::interface::Interface;
use crate::medium::{Layer, Medium, Termination};

/// Running transmission/reflection of everything between a layer boundary
/// and the output termination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub t: Complex64,
    pub r: Complex64,
}

impl Section {
    /// The section seen through a bare interface.
    fn from_interface(interface: &Interface) -> Self {
        Self {
            t: Complex64::new(interface.t_forward, 0.0),
            r: Complex64::new(interface.r_forward, 0.0),
        }
    }

    /// Prepend `layer`, entered through `entry`, to this section.
    ///
    /// The multiple reflections bouncing inside the layer form a geometric
    /// series whose closed form is the `1 / (1 − r₋·r·e^{2iφ−2αD})` factor.
    fn prepend(self, layer: &Layer, entry: &Interface, w: f64) -> Self {
        let phase = layer.phase(w);
        let loss = layer.loss(w);

        let one_way = Complex64::new(-loss, phase).exp();
        let round_trip = Complex64::new(-2.0 * loss, 2.0 * phase).exp();
        let resonance = 1.0 - entry.r_backward * self.r * round_trip;

        Self {
            t: entry.t_forward * self.t * one_way / resonance,
            r: entry.r_forward
                + entry.t_forward * entry.t_backward * self.r * round_trip / resonance,
        }
    }
}

/// An ordered stack of cable sections between an input (source) and an
/// output (load) termination. Index 0 is the section next to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredModel {
    layers: Vec<Layer>,
    base_layers: Vec<Layer>,
    repeat_count: Option<usize>,
    /// Source-side boundary medium.
    pub input: Option<Termination>,
    /// Load-side boundary medium.
    pub output: Option<Termination>,
}

impl LayeredModel {
    /// Stack made of `layers` exactly as given.
    pub fn direct(layers: Vec<Layer>) -> Result<Self> {
        for layer in &layers {
            layer.validate()?;
        }
        Ok(Self {
            base_layers: layers.clone(),
            layers,
            repeat_count: None,
            input: None,
            output: None,
        })
    }

    /// Stack made of `base` tiled `repeat_count` times.
    pub fn periodic(base: Vec<Layer>, repeat_count: usize) -> Result<Self> {
        if base.is_empty() {
            return Err(CoaxError::config("periodic stack needs a non-empty base pattern"));
        }
        if repeat_count == 0 {
            return Err(CoaxError::config("periodic stack needs at least one period"));
        }
        for layer in &base {
            layer.validate()?;
        }

        let layers: Vec<Layer> = std::iter::repeat(&base)
            .take(repeat_count)
            .flatten()
            .cloned()
            .collect();
        if layers.len() != repeat_count * base.len() {
            return Err(CoaxError::config(format!(
                "periodic stack has {} layers, expected {} × {}",
                layers.len(),
                repeat_count,
                base.len()
            )));
        }

        Ok(Self {
            layers,
            base_layers: base,
            repeat_count: Some(repeat_count),
            input: None,
            output: None,
        })
    }

    pub fn with_input(mut self, input: Termination) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: Termination) -> Self {
        self.output = Some(output);
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Pattern the stack was built from (the whole stack for direct builds).
    pub fn base_layers(&self) -> &[Layer] {
        &self.base_layers
    }

    /// Number of periods for periodic builds.
    pub fn repeat_count(&self) -> Option<usize> {
        self.repeat_count
    }

    /// Total physical length in metres; terminations do not count.
    pub fn total_length(&self) -> f64 {
        self.layers.iter().map(|l| l.length).sum()
    }

    /// Human-readable stack layout, e.g. `Coaxial Model = | RG59U | RG58U | `.
    pub fn layout(&self) -> String {
        self.to_string()
    }

    /// Compute the complex transmission and reflection of the whole stack
    /// at every pulsation (rad/s) in `pulsations`.
    ///
    /// The stack is folded from the output termination back to the input
    /// termination in a single pass.
    pub fn transfer(&self, pulsations: &[f64]) -> Result<Sweep> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| CoaxError::config("no input medium defined"))?;
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| CoaxError::config("no output medium defined"))?;
        input.validate()?;
        output.validate()?;

        // Interfaces do not depend on frequency: evaluate them once.
        let exit = match self.layers.last() {
            Some(last) => Interface::between(last, output)?,
            None => Interface::between(input, output)?,
        };
        let entries = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let previous: &dyn Medium = match i {
                    0 => input,
                    _ => &self.layers[i - 1],
                };
                Interface::between(previous, layer)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            layers = self.layers.len(),
            points = pulsations.len(),
            input = %input.name,
            output = %output.name,
            "sweeping layered model"
        );

        for layer in &self.base_layers {
            if let Some(w) = layer.attenuation.first_negative(pulsations) {
                warn!(
                    layer = %layer.name,
                    frequency_hz = frequency(w),
                    alpha = layer.attenuation.evaluate(w),
                    "attenuation turns negative inside the sweep band"
                );
            }
        }

        let (transmission, reflection) = pulsations
            .iter()
            .map(|&w| {
                let section = self
                    .layers
                    .iter()
                    .zip(&entries)
                    .rev()
                    .fold(Section::from_interface(&exit), |acc, (layer, entry)| {
                        acc.prepend(layer, entry, w)
                    });
                (section.t, section.r)
            })
            .unzip();

        Ok(Sweep::new(pulsations.to_vec(), transmission, reflection))
    }
}

impl fmt::Display for LayeredModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coaxial Model = | ")?;
        for layer in &self.layers {
            write!(f, "{} | ", layer.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attenuation::Attenuation;
    use crate::frequency_response::pulsation_linspace;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn lossless(name: &str, length: f64, impedance: f64) -> Layer {
        Layer::new(name, length, impedance, 2e8, Attenuation::Lossless)
    }

    fn matched(model: LayeredModel) -> LayeredModel {
        model
            .with_input(Termination::new("source", 50.0))
            .with_output(Termination::new("load", 50.0))
    }

    #[test]
    fn test_empty_stack_matched_is_transparent() {
        let model = matched(LayeredModel::direct(vec![]).unwrap());
        let sweep = model.transfer(&pulsation_linspace(1e6, 50e6, 11)).unwrap();
        for (t, r) in sweep.transmission.iter().zip(&sweep.reflection) {
            assert_relative_eq!(t.norm(), 1.0, epsilon = 1e-15);
            assert_relative_eq!(r.norm(), 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_single_lossless_layer_conserves_energy() {
        let model = matched(LayeredModel::direct(vec![lossless("line", 3.0, 75.0)]).unwrap());
        let sweep = model.transfer(&pulsation_linspace(1e5, 50e6, 400)).unwrap();
        for (i, (t, r)) in sweep.transmission.iter().zip(&sweep.reflection).enumerate() {
            let energy = t.norm_sqr() + r.norm_sqr();
            assert!(
                (energy - 1.0).abs() < 1e-12,
                "|t|² + |r|² = {energy} at point {i}"
            );
        }
    }

    #[test]
    fn test_matched_layer_is_pure_delay() {
        // A layer with the boundary impedance has no interfaces to reflect
        // off: t = exp(iωD/v − αD).
        let alpha = 0.01;
        let layer = Layer::new(
            "line",
            4.0,
            50.0,
            2e8,
            Attenuation::Polynomial {
                coefficients: vec![alpha],
            },
        );
        let model = matched(LayeredModel::direct(vec![layer]).unwrap());
        let w = 2.0 * PI * 7e6;
        let sweep = model.transfer(&[w]).unwrap();
        let expected = Complex64::new(-alpha * 4.0, w * 4.0 / 2e8).exp();
        assert!((sweep.transmission[0] - expected).norm() < 1e-14);
        assert!(sweep.reflection[0].norm() < 1e-15);
    }

    #[test]
    fn test_half_wave_layer_is_transparent() {
        // Fabry–Pérot resonance: a lossless layer half a wavelength long
        // transmits fully whatever its impedance.
        let v = 2e8;
        let freq = 10e6;
        let layer = Layer::new("line", v / freq / 2.0, 75.0, v, Attenuation::Lossless);
        let model = matched(LayeredModel::direct(vec![layer]).unwrap());
        let sweep = model.transfer(&[2.0 * PI * freq]).unwrap();
        assert_relative_eq!(sweep.transmission[0].norm(), 1.0, epsilon = 1e-12);
        assert!(sweep.reflection[0].norm() < 1e-12);
    }

    #[test]
    fn test_quarter_wave_layer_reflection() {
        // Quarter-wave 75 Ω section between 50 Ω: Z_in = 75²/50 = 112.5 Ω,
        // |Γ| = (112.5 − 50) / (112.5 + 50).
        let v = 2e8;
        let freq = 10e6;
        let layer = Layer::new("line", v / freq / 4.0, 75.0, v, Attenuation::Lossless);
        let model = matched(LayeredModel::direct(vec![layer]).unwrap());
        let sweep = model.transfer(&[2.0 * PI * freq]).unwrap();
        let expected = 62.5 / 162.5;
        assert_relative_eq!(sweep.reflection[0].norm(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_periodic_tiles_base_in_order() {
        let a = lossless("A", 1.0, 50.0);
        let b = lossless("B", 2.0, 75.0);
        let model = LayeredModel::periodic(vec![a, b], 3).unwrap();
        let names: Vec<&str> = model.layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "A", "B", "A", "B"]);
        assert_eq!(model.layers().len(), 3 * model.base_layers().len());
        assert_eq!(model.repeat_count(), Some(3));
        assert_relative_eq!(model.total_length(), 9.0);
    }

    #[test]
    fn test_periodic_rejects_degenerate_patterns() {
        assert!(matches!(
            LayeredModel::periodic(vec![], 3),
            Err(CoaxError::Configuration(_))
        ));
        assert!(matches!(
            LayeredModel::periodic(vec![lossless("A", 1.0, 50.0)], 0),
            Err(CoaxError::Configuration(_))
        ));
        assert!(LayeredModel::periodic(vec![lossless("A", -1.0, 50.0)], 2).is_err());
    }

    #[test]
    fn test_missing_boundaries_fail_before_sweep() {
        let model = LayeredModel::direct(vec![lossless("A", 1.0, 50.0)]).unwrap();
        let err = model.transfer(&[1.0]).unwrap_err();
        assert!(matches!(err, CoaxError::Configuration(_)), "{err}");

        let half = model.clone().with_input(Termination::new("source", 50.0));
        assert!(matches!(
            half.transfer(&[1.0]),
            Err(CoaxError::Configuration(_))
        ));

        let other_half = model.with_output(Termination::new("load", 50.0));
        assert!(other_half.transfer(&[1.0]).is_err());
    }

    #[test]
    fn test_zero_impedance_pair_is_domain_error() {
        let model = LayeredModel::direct(vec![lossless("short", 1.0, 0.0)])
            .unwrap()
            .with_input(Termination::new("source", 0.0))
            .with_output(Termination::new("load", 50.0));
        assert!(matches!(
            model.transfer(&[1.0]),
            Err(CoaxError::Domain { .. })
        ));
    }

    #[test]
    fn test_layout_and_length() {
        let model = LayeredModel::periodic(vec![Layer::rg59u(5.0), Layer::rg58u(5.0)], 2).unwrap();
        assert_eq!(
            model.layout(),
            "Coaxial Model = | RG59U | RG58U | RG59U | RG58U | "
        );
        assert_relative_eq!(model.total_length(), 20.0);
    }

    #[test]
    fn test_repeated_sweeps_are_independent() {
        let model = matched(LayeredModel::direct(vec![lossless("line", 3.0, 75.0)]).unwrap());
        let first = model.transfer(&pulsation_linspace(1e6, 5e6, 3)).unwrap();
        let other = model.transfer(&pulsation_linspace(20e6, 30e6, 7)).unwrap();
        let again = model.transfer(&pulsation_linspace(1e6, 5e6, 3)).unwrap();
        assert_eq!(other.len(), 7);
        assert_eq!(first, again);
    }

    #[test]
    fn test_model_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LayeredModel>();
    }
}
