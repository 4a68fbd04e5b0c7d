pub mod attenuation;
pub mod config;
pub mod constants;
pub mod dispersion;
pub mod error;
pub mod frequency_response;
pub mod interface;
pub mod io;
pub mod medium;
pub mod model;
pub mod pulse;

use tracing::info;

pub use attenuation::{Attenuation, InterpolationTable};
pub use config::SimConfig;
pub use dispersion::Dispersion;
pub use error::{CoaxError, Result};
pub use frequency_response::Sweep;
pub use medium::{Layer, Medium, Termination};
pub use model::LayeredModel;

/// Results of a simulation run, consumed by the CLI for CSV export and
/// reporting.
#[derive(Debug, Clone)]
pub struct SimResult {
    /// Printable layer sequence of the simulated stack.
    pub layout: String,
    /// Sum of the layer lengths in metres.
    pub total_length: f64,
    /// Complex transmission and reflection over the configured sweep.
    pub sweep: Sweep,
    /// Every dispersion stage, computed with the configured fold threshold.
    pub dispersion: Dispersion,
}

/// Run the full simulation pipeline: build the stack from `config`, sweep
/// its response, then derive the dispersion relation.
pub fn compute(config: &SimConfig) -> Result<SimResult> {
    let model = config.build_model()?;
    let pulsations = config.sweep.pulsations()?;
    let total_length = model.total_length();

    info!(
        layers = model.layers().len(),
        total_length,
        points = pulsations.len(),
        "sweeping coaxial model"
    );
    let sweep = model.transfer(&pulsations)?;
    let dispersion = Dispersion::complete(&sweep, total_length, config.fold_threshold)?;
    info!("dispersion relation computed");

    Ok(SimResult {
        layout: model.layout(),
        total_length,
        sweep,
        dispersion,
    })
}
