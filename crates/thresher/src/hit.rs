use crate::mass::Precursor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Modification annotation that marks a phosphopeptide
pub const PHOSPHORYLATION: &str = "phosphorylation";

/// Which direction of the search engine score is "better"
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// e.g. hyperscore, XCorr
    Higher,
    /// e.g. E-values, P-values
    #[default]
    Lower,
}

impl Polarity {
    /// Is `a` strictly better than `b`?
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Polarity::Higher => a > b,
            Polarity::Lower => a < b,
        }
    }

    /// Is `a` at least as good as `b`?
    pub fn at_least(self, a: f64, b: f64) -> bool {
        match self {
            Polarity::Higher => a >= b,
            Polarity::Lower => a <= b,
        }
    }

    /// Total ordering that places the best score first. Signed zeros compare
    /// equal, as they do under `==`.
    pub fn order(self, a: f64, b: f64) -> Ordering {
        let (a, b) = (a + 0.0, b + 0.0);
        match self {
            Polarity::Higher => b.total_cmp(&a),
            Polarity::Lower => a.total_cmp(&b),
        }
    }

    /// A score that no real score is at least as good as
    pub fn unreachable(self) -> f64 {
        match self {
            Polarity::Higher => f64::INFINITY,
            Polarity::Lower => f64::NEG_INFINITY,
        }
    }
}

/// A single row of search engine output, as ingested
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub scan: u32,
    pub sequence: String,
    pub score: f64,
    pub decoy: bool,
    pub modifications: String,
    pub charge: u8,
    /// Theoretical neutral mass reported by the search engine
    pub theoretical_mass: f64,
    /// Verbatim fields of the original row
    pub fields: Vec<String>,
}

/// Provides precursor isolation m/z values for an acquisition, keyed by scan
pub trait SpectralSource {
    /// Identifier of the underlying data (e.g. file path)
    fn name(&self) -> &str;

    fn isolation_mz(&self, scan: u32) -> Option<f64>;
}

/// A peptide-spectrum match, enriched with precursor mass diagnostics
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub scan: u32,
    pub sequence: String,
    pub score: f64,
    pub decoy: bool,
    pub modifications: String,
    pub charge: u8,
    pub precursor: Precursor,
    /// Mass error after removing the systematic offset of the file.
    /// NaN until calibrated.
    pub adjusted_ppm: f64,
    /// Percent. NaN until assigned.
    pub q_value: f64,
    pub fields: Vec<String>,
}

impl Hit {
    pub fn new(record: Record, precursor: Precursor) -> Self {
        Hit {
            scan: record.scan,
            sequence: record.sequence,
            score: record.score,
            decoy: record.decoy,
            modifications: record.modifications,
            charge: record.charge,
            precursor,
            adjusted_ppm: f64::NAN,
            q_value: f64::NAN,
            fields: record.fields,
        }
    }

    /// Look up the isolation m/z of `record` in `spectra` and build a [`Hit`]
    pub fn resolve<S: SpectralSource + ?Sized>(
        record: Record,
        spectra: &S,
        isotope_errors: (i8, i8),
    ) -> Result<Self, crate::Error> {
        let mz = spectra
            .isolation_mz(record.scan)
            .ok_or_else(|| crate::Error::MissingScan {
                scan: record.scan,
                spectra: spectra.name().into(),
            })?;
        let precursor =
            Precursor::resolve(mz, record.charge, record.theoretical_mass, isotope_errors);
        Ok(Hit::new(record, precursor))
    }

    pub fn ppm(&self) -> f64 {
        self.precursor.ppm
    }

    pub fn is_phospho(&self) -> bool {
        self.modifications.contains(PHOSPHORYLATION)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Build a hit with a precomputed ppm error, for tests
    pub fn hit(scan: u32, sequence: &str, score: f64, decoy: bool, ppm: f64) -> Hit {
        Hit {
            scan,
            sequence: sequence.into(),
            score,
            decoy,
            modifications: String::new(),
            charge: 2,
            precursor: Precursor {
                ppm,
                ..Default::default()
            },
            adjusted_ppm: f64::NAN,
            q_value: f64::NAN,
            fields: Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fnv::FnvHashMap;

    struct Spectra(FnvHashMap<u32, f64>);

    impl SpectralSource for Spectra {
        fn name(&self) -> &str {
            "test.mzML"
        }

        fn isolation_mz(&self, scan: u32) -> Option<f64> {
            self.0.get(&scan).copied()
        }
    }

    fn record(scan: u32) -> Record {
        Record {
            scan,
            sequence: "PEPTIDE".into(),
            score: 0.01,
            decoy: false,
            modifications: "oxidation of M:3".into(),
            charge: 2,
            theoretical_mass: 799.36,
            fields: vec!["1".into()],
        }
    }

    #[test]
    fn polarity() {
        assert!(Polarity::Lower.better(0.01, 0.1));
        assert!(Polarity::Higher.better(10.0, 9.0));
        assert!(Polarity::Lower.at_least(0.1, 0.1));
        assert!(!Polarity::Higher.at_least(9.0, 10.0));
        assert_eq!(Polarity::Lower.order(1.0, 2.0), Ordering::Less);
        assert_eq!(Polarity::Higher.order(1.0, 2.0), Ordering::Greater);
        assert_eq!(Polarity::Lower.order(-0.0, 0.0), Ordering::Equal);
        assert!(!Polarity::Lower.at_least(-1e300, Polarity::Lower.unreachable()));
        assert!(!Polarity::Higher.at_least(1e300, Polarity::Higher.unreachable()));
    }

    #[test]
    fn resolve_against_spectra() {
        let mut map = FnvHashMap::default();
        map.insert(7, 400.6873);
        let spectra = Spectra(map);

        let hit = Hit::resolve(record(7), &spectra, (0, 0)).unwrap();
        assert_eq!(hit.scan, 7);
        assert!(hit.q_value.is_nan());
        assert!(hit.adjusted_ppm.is_nan());
        assert!(hit.ppm().abs() < 10.0);
        assert!(!hit.is_phospho());

        match Hit::resolve(record(8), &spectra, (0, 0)) {
            Err(crate::Error::MissingScan { scan, spectra }) => {
                assert_eq!(scan, 8);
                assert_eq!(spectra, "test.mzML");
            }
            other => panic!("expected missing scan, got {:?}", other),
        }
    }
}
