//! Joint search over q-value, score and precursor mass tolerance cutoffs

use crate::fdr::{Best, Counting, Tally, Tracker};
use crate::hit::{Hit, Polarity};
use rayon::prelude::*;
use serde::Serialize;

/// A (score, q-value, tolerance) cutoff applied uniformly to every file
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    /// Worst score accepted within the worst accepted q-value
    pub score: f64,
    /// Worst accepted q-value (percent)
    pub q_value: f64,
    /// Maximum absolute adjusted precursor mass error (ppm)
    pub tolerance: f64,
    /// Targets accepted from the pooled hits
    pub targets: usize,
    pub decoys: usize,
    pub fdr: f64,
}

impl Thresholds {
    /// Cutoffs that accept nothing, used when no cutoff satisfies the
    /// FDR bound
    pub fn unsatisfied(polarity: Polarity) -> Self {
        Thresholds {
            score: polarity.unreachable(),
            q_value: f64::NEG_INFINITY,
            tolerance: 0.0,
            targets: 0,
            decoys: 0,
            fdr: f64::NAN,
        }
    }

    /// Does `hit` pass all three cutoffs?
    pub fn accepts(&self, hit: &Hit, polarity: Polarity) -> bool {
        let q = hit.q_value < self.q_value
            || (hit.q_value == self.q_value && polarity.at_least(hit.score, self.score));
        q && hit.adjusted_ppm.abs() <= self.tolerance
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThresholdSearch {
    pub polarity: Polarity,
    pub counting: Counting,
    /// FDR bound, percent
    pub max_fdr: f64,
    /// Tolerance grid step (ppm)
    pub increment: f64,
    /// Largest tolerance evaluated (ppm), inclusive
    pub max_tolerance: f64,
}

impl ThresholdSearch {
    /// Tolerance grid: `increment, 2 * increment, ..` up to and including
    /// `max_tolerance`
    pub fn tolerances(&self) -> Vec<f64> {
        if !(self.increment > 0.0) || !(self.max_tolerance >= self.increment) {
            return Vec::new();
        }
        // Multiply rather than accumulate, so 0.1 steps land on 10.0
        let steps = (self.max_tolerance / self.increment + 1E-9).floor() as usize;
        (1..=steps).map(|k| k as f64 * self.increment).collect()
    }

    /// Exhaustively search the tolerance grid and every (q-value, score) tier
    /// within each tolerance. Returns `None` if no cutoff satisfies the FDR
    /// bound.
    ///
    /// Hits without a defined q-value can never be accepted, and are ignored
    pub fn search(&self, pool: &[&Hit]) -> Option<Thresholds> {
        let mut sorted = pool
            .iter()
            .copied()
            .filter(|hit| !hit.q_value.is_nan())
            .collect::<Vec<_>>();
        sorted.par_sort_by(|a, b| {
            a.q_value
                .total_cmp(&b.q_value)
                .then_with(|| self.polarity.order(a.score, b.score))
        });

        let tolerances = self.tolerances();
        log::debug!(
            "searching {} tolerances over {} hits",
            tolerances.len(),
            sorted.len()
        );

        // Each tolerance is independent. Results are reduced in ascending
        // tolerance order so the tightest tolerance wins exact ties.
        let candidates = tolerances
            .par_iter()
            .map(|&tolerance| self.search_tolerance(&sorted, tolerance))
            .collect::<Vec<_>>();

        let mut tracker = Tracker::new(self.max_fdr);
        for candidate in candidates.into_iter().flatten() {
            tracker.offer_best(candidate);
        }

        tracker.finish().map(|best| {
            let (score, q_value, tolerance) = best.at;
            Thresholds {
                score,
                q_value,
                tolerance,
                targets: best.targets,
                decoys: best.decoys,
                fdr: best.fdr,
            }
        })
    }

    /// Best tier boundary within one tolerance
    ///
    /// # Invariants
    /// * `sorted` must be ordered by q-value, then by score (best first)
    fn search_tolerance(&self, sorted: &[&Hit], tolerance: f64) -> Option<Best<(f64, f64, f64)>> {
        let within = sorted
            .iter()
            .copied()
            .filter(|hit| hit.adjusted_ppm.abs() <= tolerance)
            .collect::<Vec<_>>();

        let mut tally = Tally::new(self.counting);
        let mut tracker = Tracker::new(self.max_fdr);
        for tier in within.chunk_by(|a, b| a.q_value == b.q_value && a.score == b.score) {
            tally.extend(tier.iter().copied());
            let last = tier[tier.len() - 1];
            tracker.offer(&tally, (last.score, last.q_value, tolerance));
        }
        tracker.finish()
    }
}
