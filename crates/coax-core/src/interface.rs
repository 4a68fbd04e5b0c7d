use crate::error::{CoaxError, Result};
use crate::medium::Medium;

/// Amplitude transmission coefficient for a wave crossing from `a` into `b`.
///
/// ```text
/// t = 2·Zₐ / (Zₐ + Z_b)
/// ```
pub fn transmission(a: &dyn Medium, b: &dyn Medium) -> Result<f64> {
    let (za, zb) = (a.impedance(), b.impedance());
    checked_ratio(2.0 * za, za, zb)
}

/// Amplitude reflection coefficient for a wave in `a` hitting `b`.
///
/// ```text
/// r = (Zₐ − Z_b) / (Zₐ + Z_b)
/// ```
pub fn reflection(a: &dyn Medium, b: &dyn Medium) -> Result<f64> {
    let (za, zb) = (a.impedance(), b.impedance());
    checked_ratio(za - zb, za, zb)
}

fn checked_ratio(numerator: f64, za: f64, zb: f64) -> Result<f64> {
    let sum = za + zb;
    let ratio = numerator / sum;
    if sum == 0.0 || !ratio.is_finite() {
        return Err(CoaxError::Domain {
            left: za,
            right: zb,
        });
    }
    Ok(ratio)
}

/// The four coefficients of a single interface, seen from the medium on
/// the input side (`a`) towards the medium on the output side (`b`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interface {
    /// a → b transmission.
    pub t_forward: f64,
    /// b → a transmission.
    pub t_backward: f64,
    /// Reflection of a wave in `a` off `b`.
    pub r_forward: f64,
    /// Reflection of a wave in `b` off `a`.
    pub r_backward: f64,
}

impl Interface {
    pub fn between(a: &dyn Medium, b: &dyn Medium) -> Result<Self> {
        Ok(Self {
            t_forward: transmission(a, b)?,
            t_backward: transmission(b, a)?,
            r_forward: reflection(a, b)?,
            r_backward: reflection(b, a)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::Termination;

    #[test]
    fn test_matched_interface_is_transparent() {
        let a = Termination::new("a", 50.0);
        let b = Termination::new("b", 50.0);
        assert_eq!(transmission(&a, &b).unwrap(), 1.0);
        assert_eq!(reflection(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_coefficient_values() {
        let a = Termination::new("a", 50.0);
        let b = Termination::new("b", 75.0);
        assert!((transmission(&a, &b).unwrap() - 0.8).abs() < 1e-15);
        assert!((transmission(&b, &a).unwrap() - 1.2).abs() < 1e-15);
        assert!((reflection(&a, &b).unwrap() + 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_reflection_antisymmetry() {
        let impedances = [0.0, 1.0, 25.0, 50.0, 75.0, 93.0, 300.0, 1e6];
        for &za in &impedances {
            for &zb in &impedances {
                if za + zb == 0.0 {
                    continue;
                }
                let a = Termination::new("a", za);
                let b = Termination::new("b", zb);
                let ab = reflection(&a, &b).unwrap();
                let ba = reflection(&b, &a).unwrap();
                assert_eq!(ab, -ba, "r({za}, {zb}) = {ab}, r({zb}, {za}) = {ba}");
            }
        }
    }

    #[test]
    fn test_transmission_minus_reflection_is_one() {
        // 2Zₐ/(Zₐ+Z_b) − (Zₐ−Z_b)/(Zₐ+Z_b) = 1
        let a = Termination::new("a", 50.0);
        let b = Termination::new("b", 75.0);
        let t = transmission(&a, &b).unwrap();
        let r = reflection(&a, &b).unwrap();
        assert!((t - r - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_zero_impedance_sum_is_domain_error() {
        let a = Termination::new("short", 0.0);
        let b = Termination::new("short", 0.0);
        assert!(matches!(
            transmission(&a, &b),
            Err(CoaxError::Domain { .. })
        ));
        assert!(matches!(reflection(&a, &b), Err(CoaxError::Domain { .. })));
        assert!(Interface::between(&a, &b).is_err());
    }

    #[test]
    fn test_interface_bundle() {
        let a = Termination::new("a", 50.0);
        let b = Termination::new("b", 75.0);
        let i = Interface::between(&a, &b).unwrap();
        assert_eq!(i.t_forward, transmission(&a, &b).unwrap());
        assert_eq!(i.t_backward, transmission(&b, &a).unwrap());
        assert_eq!(i.r_forward, -i.r_backward);
        // t₊·t₋ = 1 − r²
        assert!((i.t_forward * i.t_backward - (1.0 - i.r_forward.powi(2))).abs() < 1e-15);
    }
}
