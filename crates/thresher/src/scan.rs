//! Collapse competing identifications of the same spectrum to a single hit

use crate::hit::{Hit, Polarity};
use std::collections::btree_map::{BTreeMap, Entry};

/// Retains the best hit observed for each scan
pub struct ScanReducer {
    polarity: Polarity,
    scans: BTreeMap<u32, Hit>,
}

impl ScanReducer {
    pub fn new(polarity: Polarity) -> Self {
        Self {
            polarity,
            scans: BTreeMap::new(),
        }
    }

    /// Should `challenger` replace `incumbent`? Exact score ties are given to
    /// a target over a decoy, otherwise the first-seen hit is kept.
    pub fn replaces(polarity: Polarity, challenger: &Hit, incumbent: &Hit) -> bool {
        polarity.better(challenger.score, incumbent.score)
            || (challenger.score == incumbent.score && incumbent.decoy && !challenger.decoy)
    }

    pub fn insert(&mut self, hit: Hit) {
        match self.scans.entry(hit.scan) {
            Entry::Vacant(v) => {
                v.insert(hit);
            }
            Entry::Occupied(mut o) => {
                if Self::replaces(self.polarity, &hit, o.get()) {
                    o.insert(hit);
                }
            }
        }
    }

    /// Number of scans whose surviving hit is a phosphopeptide
    pub fn phospho_scans(&self) -> usize {
        self.scans.values().filter(|hit| hit.is_phospho()).count()
    }

    /// Surviving hits, ordered by scan number
    pub fn finish(self) -> Vec<Hit> {
        self.scans.into_values().collect()
    }
}

impl Extend<Hit> for ScanReducer {
    fn extend<I: IntoIterator<Item = Hit>>(&mut self, iter: I) {
        for hit in iter {
            self.insert(hit);
        }
    }
}
