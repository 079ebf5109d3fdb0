use crate::calibration::{self, Calibration};
use crate::fdr::Counting;
use crate::hit::{Hit, Polarity};
use crate::qvalue::assign_q_values;
use crate::scan::ScanReducer;
use crate::threshold::Thresholds;
use crate::unique::SequenceWinners;
use rayon::prelude::*;

/// Scan-reduced, calibrated and q-valued hits of one identification file
#[derive(Clone, Debug)]
pub struct FileAnalysis {
    /// Identifier of the identification file
    pub source: String,
    /// Identifier of the spectral source its scans were resolved against
    pub spectra: String,
    /// One hit per scan, sorted by score (best first). Equal scores retain
    /// scan order.
    pub hits: Vec<Hit>,
    pub calibration: Calibration,
    pub phospho_scans: usize,
}

impl FileAnalysis {
    /// Calibrate mass errors and assign q-values to the survivors of `reducer`
    pub fn new(
        source: String,
        spectra: String,
        reducer: ScanReducer,
        polarity: Polarity,
        counting: Counting,
    ) -> Self {
        let phospho_scans = reducer.phospho_scans();
        let mut hits = reducer.finish();
        hits.par_sort_by(|a, b| polarity.order(a.score, b.score));

        let calibration = calibration::estimate(&hits, polarity);
        calibration::apply(&mut hits, &calibration);
        assign_q_values(&mut hits, counting);

        log::debug!(
            "{}: {} scans, systematic mass error {:.3} ppm from {} targets",
            source,
            hits.len(),
            calibration.offset,
            calibration.targets
        );

        FileAnalysis {
            source,
            spectra,
            hits,
            calibration,
            phospho_scans,
        }
    }

    pub fn scans(&self) -> usize {
        self.hits.len()
    }

    /// Hits ordered by scan number
    pub fn by_scan(&self) -> Vec<&Hit> {
        let mut hits = self.hits.iter().collect::<Vec<_>>();
        hits.sort_by_key(|hit| hit.scan);
        hits
    }

    /// Hits passing `thresholds`, in scan order, and their per-sequence winners
    pub fn accept(&self, thresholds: &Thresholds, polarity: Polarity) -> Accepted<'_> {
        let mut accepted = Accepted {
            targets: Vec::new(),
            decoys: Vec::new(),
            unique: SequenceWinners::new(polarity),
        };
        for hit in self.by_scan() {
            if !thresholds.accepts(hit, polarity) {
                continue;
            }
            accepted.unique.insert(hit);
            match hit.decoy {
                true => accepted.decoys.push(hit),
                false => accepted.targets.push(hit),
            }
        }
        accepted
    }
}

/// Hits of a single file accepted by the batch thresholds
#[derive(Clone, Debug)]
pub struct Accepted<'a> {
    pub targets: Vec<&'a Hit>,
    pub decoys: Vec<&'a Hit>,
    pub unique: SequenceWinners<'a>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hit::testing::hit;

    fn analysis() -> FileAnalysis {
        let mut reducer = ScanReducer::new(Polarity::Lower);
        reducer.extend([
            hit(4, "CCC", 0.002, false, 3.0),
            hit(1, "AAA", 0.001, false, 1.0),
            hit(2, "AAA", 0.003, false, 2.0),
            hit(3, "KKK", 0.5, true, 2.0),
            hit(3, "DDD", 0.004, false, 2.0),
        ]);
        FileAnalysis::new(
            "a.csv".into(),
            "a.mzML".into(),
            reducer,
            Polarity::Lower,
            Counting::Redundant,
        )
    }

    #[test]
    fn calibrated_and_sorted() {
        let file = analysis();
        assert_eq!(file.scans(), 4);
        let scores = file.hits.iter().map(|h| h.scan).collect::<Vec<_>>();
        assert_eq!(scores, vec![1, 4, 2, 3]);
        // median of 1, 2, 2, 3
        assert_eq!(file.calibration.offset, 2.0);
        assert_eq!(file.hits[0].adjusted_ppm, -1.0);
        assert!(file.hits.iter().all(|h| h.q_value == 0.0));

        let scans = file.by_scan().iter().map(|h| h.scan).collect::<Vec<_>>();
        assert_eq!(scans, vec![1, 2, 3, 4]);
    }

    #[test]
    fn accept_in_scan_order() {
        let file = analysis();
        let thresholds = Thresholds {
            score: 0.003,
            q_value: 0.0,
            tolerance: 1.0,
            targets: 0,
            decoys: 0,
            fdr: 0.0,
        };
        let accepted = file.accept(&thresholds, Polarity::Lower);
        let scans = accepted.targets.iter().map(|h| h.scan).collect::<Vec<_>>();
        assert_eq!(scans, vec![1, 2, 4]);
        assert!(accepted.decoys.is_empty());
        // AAA appears twice
        assert_eq!(accepted.unique.target_count(), 2);
        assert_eq!(accepted.unique.targets().next().map(|h| h.scan), Some(1));

        let none = file.accept(&Thresholds::unsatisfied(Polarity::Lower), Polarity::Lower);
        assert!(none.targets.is_empty() && none.decoys.is_empty());
    }
}
