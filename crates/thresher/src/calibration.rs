//! Systematic precursor mass error estimation
//!
//! A small, very high confidence subset of each file is used to measure the
//! instrument's calibration drift, which is then removed from every hit before
//! precursor mass tolerances are applied.

use crate::fdr::{Counting, Tally, Tracker};
use crate::hit::{Hit, Polarity};
use serde::Serialize;

/// FDR (percent) of the subset used to estimate the systematic offset.
/// Independent of the user supplied FDR bound.
pub const CALIBRATION_FDR: f64 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Calibration {
    /// Worst score admitted to the calibration subset, or
    /// [`Polarity::unreachable`] if no score tier satisfied the bound
    pub score: f64,
    pub targets: usize,
    pub decoys: usize,
    /// NaN if no score tier satisfied the bound
    pub fdr: f64,
    /// Median mass error (ppm) of the targets in the calibration subset
    pub offset: f64,
}

/// Median of `values`, or 0 if there are none
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Estimate the systematic mass error of a file
///
/// # Invariants
/// * `hits` must be sorted by score, best first
pub fn estimate(hits: &[Hit], polarity: Polarity) -> Calibration {
    let mut tally = Tally::new(Counting::Redundant);
    let mut tracker = Tracker::new(CALIBRATION_FDR);

    let mut end = 0;
    for tier in hits.chunk_by(|a, b| a.score == b.score) {
        tally.extend(tier);
        end += tier.len();
        tracker.offer(&tally, end);
    }

    match tracker.finish() {
        Some(best) => {
            let subset = &hits[..best.at];
            let mut errors = subset
                .iter()
                .filter(|hit| !hit.decoy)
                .map(Hit::ppm)
                .collect::<Vec<_>>();

            Calibration {
                score: subset[best.at - 1].score,
                targets: best.targets,
                decoys: best.decoys,
                fdr: best.fdr,
                offset: median(&mut errors),
            }
        }
        None => Calibration {
            score: polarity.unreachable(),
            targets: 0,
            decoys: 0,
            fdr: f64::NAN,
            offset: 0.0,
        },
    }
}

/// Remove the systematic offset from every hit. Always computed from the raw
/// mass error, so applying a calibration twice is harmless.
pub fn apply(hits: &mut [Hit], calibration: &Calibration) {
    for hit in hits {
        hit.adjusted_ppm = hit.ppm() - calibration.offset;
    }
}
