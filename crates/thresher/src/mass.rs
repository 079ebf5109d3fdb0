use serde::{Deserialize, Serialize};

pub const PROTON: f64 = 1.0072764;
pub const NEUTRON: f64 = 1.00335;

/// Mass error of `experimental` relative to `theoretical`, in parts-per-million
pub fn ppm(experimental: f64, theoretical: f64) -> f64 {
    (experimental - theoretical) / theoretical * 1_000_000.0
}

/// Precursor mass diagnostics for a single identification
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    pub isolation_mz: f64,
    /// Neutral mass implied by the isolation m/z and the assigned charge
    pub isolation_mass: f64,
    pub theoretical_mass: f64,
    /// Isolation mass after removing the isotope offset closest to the
    /// theoretical mass
    pub experimental_mass: f64,
    pub ppm: f64,
}

impl Precursor {
    /// Compute mass diagnostics from the isolation m/z of a scan.
    ///
    /// * `isotope_errors`: inclusive range of isotope offsets that may have
    ///   been selected for fragmentation instead of the monoisotopic peak.
    ///   `(0, 0)` disables isotope correction.
    pub fn resolve(
        isolation_mz: f64,
        charge: u8,
        theoretical_mass: f64,
        isotope_errors: (i8, i8),
    ) -> Self {
        let z = charge.max(1) as f64;
        let isolation_mass = isolation_mz * z - z * PROTON;

        let (lo, hi) = isotope_errors;
        let experimental_mass = (lo..=hi)
            .map(|isotope| isolation_mass - isotope as f64 * NEUTRON)
            .min_by(|a, b| {
                (a - theoretical_mass)
                    .abs()
                    .total_cmp(&(b - theoretical_mass).abs())
            })
            .unwrap_or(isolation_mass);

        Precursor {
            isolation_mz,
            isolation_mass,
            theoretical_mass,
            experimental_mass,
            ppm: ppm(experimental_mass, theoretical_mass),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn isolation_mass() {
        let p = Precursor::resolve(500.0, 2, 998.0, (0, 0));
        assert!((p.isolation_mass - (1000.0 - 2.0 * PROTON)).abs() < 1e-9);
        assert_eq!(p.isolation_mass, p.experimental_mass);
        assert!((p.ppm - ppm(p.isolation_mass, 998.0)).abs() < 1e-9);
    }

    #[test]
    fn isotope_correction() {
        let theoretical = 1500.0;
        let mz = (theoretical + NEUTRON + 2.0 * PROTON) / 2.0;

        let uncorrected = Precursor::resolve(mz, 2, theoretical, (0, 0));
        assert!(uncorrected.ppm > 600.0);

        let corrected = Precursor::resolve(mz, 2, theoretical, (-1, 3));
        assert!(corrected.ppm.abs() < 1e-6);
        assert!((corrected.isolation_mass - uncorrected.isolation_mass).abs() < 1e-9);
    }
}
