use crate::attenuation::Attenuation;
use crate::constants::{phase_velocity, POLYETHYLENE_VELOCITY_FACTOR};
use crate::error::{CoaxError, Result};

/// Anything a wave can cross into: a physical cable section or a boundary
/// termination. The interface algebra only needs the impedance.
pub trait Medium {
    fn name(&self) -> &str;

    /// Characteristic impedance in ohms.
    fn impedance(&self) -> f64;
}

/// A homogeneous cable section of the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    /// Length in metres.
    pub length: f64,
    /// Characteristic impedance in ohms.
    pub impedance: f64,
    /// Phase velocity in m/s.
    pub phase_velocity: f64,
    /// Per-metre attenuation as a function of pulsation.
    pub attenuation: Attenuation,
}

impl Layer {
    pub fn new(
        name: impl Into<String>,
        length: f64,
        impedance: f64,
        phase_velocity: f64,
        attenuation: Attenuation,
    ) -> Self {
        Self {
            name: name.into(),
            length,
            impedance,
            phase_velocity,
            attenuation,
        }
    }

    /// Section with a phase velocity given as a fraction of c.
    pub fn with_velocity_factor(
        name: impl Into<String>,
        length: f64,
        impedance: f64,
        velocity_factor: f64,
        attenuation: Attenuation,
    ) -> Self {
        Self::new(name, length, impedance, phase_velocity(velocity_factor), attenuation)
    }

    /// 50 Ω RG58U section using the bench attenuation fit.
    pub fn rg58u(length: f64) -> Self {
        Self::with_velocity_factor(
            "RG58U",
            length,
            50.0,
            POLYETHYLENE_VELOCITY_FACTOR,
            Attenuation::rg58u(),
        )
    }

    /// 75 Ω RG59U section using the published attenuation fit.
    pub fn rg59u(length: f64) -> Self {
        Self::with_velocity_factor(
            "RG59U",
            length,
            75.0,
            POLYETHYLENE_VELOCITY_FACTOR,
            Attenuation::rg59u_published(),
        )
    }

    /// Check that every physical quantity is usable by the solver.
    pub fn validate(&self) -> Result<()> {
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(CoaxError::config(format!(
                "layer '{}' needs a positive length, got {}",
                self.name, self.length
            )));
        }
        if !(self.impedance.is_finite() && self.impedance >= 0.0) {
            return Err(CoaxError::config(format!(
                "layer '{}' needs a non-negative impedance, got {}",
                self.name, self.impedance
            )));
        }
        if !(self.phase_velocity.is_finite() && self.phase_velocity > 0.0) {
            return Err(CoaxError::config(format!(
                "layer '{}' needs a positive phase velocity, got {}",
                self.name, self.phase_velocity
            )));
        }
        Ok(())
    }

    /// One-way phase (rad) accumulated across the section at pulsation `w`.
    #[inline]
    pub fn phase(&self, w: f64) -> f64 {
        w * self.length / self.phase_velocity
    }

    /// One-way amplitude attenuation (Np) across the section at pulsation `w`.
    #[inline]
    pub fn loss(&self, w: f64) -> f64 {
        self.attenuation.evaluate(w) * self.length
    }
}

impl Medium for Layer {
    fn name(&self) -> &str {
        &self.name
    }

    fn impedance(&self) -> f64 {
        self.impedance
    }
}

/// Boundary medium (source or load). Only its impedance takes part in the
/// computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Termination {
    pub name: String,
    pub impedance: f64,
}

impl Termination {
    pub fn new(name: impl Into<String>, impedance: f64) -> Self {
        Self {
            name: name.into(),
            impedance,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.impedance.is_finite() && self.impedance >= 0.0 {
            Ok(())
        } else {
            Err(CoaxError::config(format!(
                "termination '{}' needs a non-negative impedance, got {}",
                self.name, self.impedance
            )))
        }
    }
}

impl Medium for Termination {
    fn name(&self) -> &str {
        &self.name
    }

    fn impedance(&self) -> f64 {
        self.impedance
    }
}
