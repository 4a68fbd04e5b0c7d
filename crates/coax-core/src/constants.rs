use std::f64::consts::PI;

/// Speed of light in vacuum (m/s), exact by SI definition.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Default upper edge (m⁻¹) of the interval the wave number is folded into.
pub const DEFAULT_FOLD_THRESHOLD: f64 = 0.314;

/// Velocity factor of solid-polyethylene coaxial cable (RG58U, RG59U).
pub const POLYETHYLENE_VELOCITY_FACTOR: f64 = 0.66;

/// Angular frequency (rad/s) for a frequency in Hz.
#[inline]
pub fn angular_frequency(hz: f64) -> f64 {
    2.0 * PI * hz
}

/// Frequency in Hz for an angular frequency in rad/s.
#[inline]
pub fn frequency(pulsation: f64) -> f64 {
    pulsation / (2.0 * PI)
}

/// Phase velocity (m/s) of a line with the given velocity factor.
#[inline]
pub fn phase_velocity(velocity_factor: f64) -> f64 {
    velocity_factor * SPEED_OF_LIGHT
}
