//! Per-file and batch level counts for reporting

use crate::analysis::{Accepted, FileAnalysis};
use crate::calibration::Calibration;
use crate::fdr::{fdr, Counting};
use crate::hit::Hit;
use crate::threshold::Thresholds;
use crate::unique::SequenceWinners;
use serde::Serialize;
use std::ops::AddAssign;

/// Target and decoy counts, with their phosphopeptide subsets
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub targets: usize,
    pub decoys: usize,
    pub phospho_targets: usize,
    pub phospho_decoys: usize,
}

impl Counts {
    pub fn of<'a, T, D>(targets: T, decoys: D) -> Self
    where
        T: IntoIterator<Item = &'a Hit>,
        D: IntoIterator<Item = &'a Hit>,
    {
        let mut counts = Counts::default();
        for hit in targets {
            counts.targets += 1;
            counts.phospho_targets += hit.is_phospho() as usize;
        }
        for hit in decoys {
            counts.decoys += 1;
            counts.phospho_decoys += hit.is_phospho() as usize;
        }
        counts
    }

    pub fn fdr(&self) -> f64 {
        fdr(self.decoys, self.targets)
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        self.targets += rhs.targets;
        self.decoys += rhs.decoys;
        self.phospho_targets += rhs.phospho_targets;
        self.phospho_decoys += rhs.phospho_decoys;
    }
}

/// One line of the batch summary. `None` marks a value that is not defined
/// for the row (e.g. calibration for the batch rows).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    pub label: String,
    pub spectra: Option<String>,
    pub calibration: Option<Calibration>,
    pub scans: Option<usize>,
    pub phospho_scans: Option<usize>,
    pub thresholds: Thresholds,
    pub accepted: Option<Counts>,
    pub unique: Counts,
    /// FDR under the configured counting mode
    pub fdr: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub counting: Counting,
    pub files: Vec<Row>,
    /// Totals over the per-file rows
    pub sum: Row,
    /// Batch-wide unique sequences
    pub overall: Row,
}

/// Accumulates per-file rows and batch totals
pub struct Aggregator {
    counting: Counting,
    thresholds: Thresholds,
    files: Vec<Row>,
    scans: usize,
    phospho_scans: usize,
    accepted: Counts,
    unique: Counts,
}

impl Aggregator {
    pub fn new(counting: Counting, thresholds: Thresholds) -> Self {
        Self {
            counting,
            thresholds,
            files: Vec::new(),
            scans: 0,
            phospho_scans: 0,
            accepted: Counts::default(),
            unique: Counts::default(),
        }
    }

    pub fn add(&mut self, file: &FileAnalysis, accepted: &Accepted) {
        let redundant = Counts::of(
            accepted.targets.iter().copied(),
            accepted.decoys.iter().copied(),
        );
        let unique = Counts::of(accepted.unique.targets(), accepted.unique.decoys());

        self.scans += file.scans();
        self.phospho_scans += file.phospho_scans;
        self.accepted += redundant;
        self.unique += unique;

        self.files.push(Row {
            label: file.source.clone(),
            spectra: Some(file.spectra.clone()),
            calibration: Some(file.calibration),
            scans: Some(file.scans()),
            phospho_scans: Some(file.phospho_scans),
            thresholds: self.thresholds,
            accepted: Some(redundant),
            unique,
            fdr: Some(match self.counting {
                Counting::Redundant => redundant.fdr(),
                Counting::Unique => unique.fdr(),
            }),
        });
    }

    /// Close the batch, given the batch-wide sequence winners
    pub fn finish(self, overall: &SequenceWinners) -> Summary {
        let global = Counts::of(overall.targets(), overall.decoys());
        let (sum_fdr, overall_fdr) = match self.counting {
            Counting::Redundant => (Some(self.accepted.fdr()), None),
            Counting::Unique => (None, Some(global.fdr())),
        };

        let sum = Row {
            label: "SUM".into(),
            spectra: None,
            calibration: None,
            scans: Some(self.scans),
            phospho_scans: Some(self.phospho_scans),
            thresholds: self.thresholds,
            accepted: Some(self.accepted),
            unique: self.unique,
            fdr: sum_fdr,
        };
        let overall = Row {
            label: "OVERALL".into(),
            spectra: None,
            calibration: None,
            scans: None,
            phospho_scans: None,
            thresholds: self.thresholds,
            accepted: None,
            unique: global,
            fdr: overall_fdr,
        };

        Summary {
            counting: self.counting,
            files: self.files,
            sum,
            overall,
        }
    }
}
