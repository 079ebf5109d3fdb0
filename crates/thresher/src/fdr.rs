//! Target-decoy false discovery rate estimation
//!
//! Elias & Gygi, https://pubmed.ncbi.nlm.nih.gov/17327847/

use crate::hit::Hit;
use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};

/// What is counted when estimating FDR at a threshold
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counting {
    /// Every accepted hit counts
    #[default]
    Redundant,
    /// Only distinct peptide sequences count
    Unique,
}

/// Estimated FDR, in percent. Undefined (NaN) when there are no targets,
/// which never satisfies an FDR bound.
pub fn fdr(decoys: usize, targets: usize) -> f64 {
    if targets == 0 {
        return f64::NAN;
    }
    decoys as f64 / targets as f64 * 100.0
}

/// Cumulative target & decoy counts over a walk from the best hit downwards
pub struct Tally<'a> {
    counting: Counting,
    targets: usize,
    decoys: usize,
    target_sequences: FnvHashSet<&'a str>,
    decoy_sequences: FnvHashSet<&'a str>,
}

impl<'a> Tally<'a> {
    pub fn new(counting: Counting) -> Self {
        Self {
            counting,
            targets: 0,
            decoys: 0,
            target_sequences: FnvHashSet::default(),
            decoy_sequences: FnvHashSet::default(),
        }
    }

    pub fn push(&mut self, hit: &'a Hit) {
        match hit.decoy {
            true => {
                self.decoys += 1;
                if self.counting == Counting::Unique {
                    self.decoy_sequences.insert(&hit.sequence);
                }
            }
            false => {
                self.targets += 1;
                if self.counting == Counting::Unique {
                    self.target_sequences.insert(&hit.sequence);
                }
            }
        }
    }

    pub fn targets(&self) -> usize {
        match self.counting {
            Counting::Redundant => self.targets,
            Counting::Unique => self.target_sequences.len(),
        }
    }

    pub fn decoys(&self) -> usize {
        match self.counting {
            Counting::Redundant => self.decoys,
            Counting::Unique => self.decoy_sequences.len(),
        }
    }

    pub fn fdr(&self) -> f64 {
        fdr(self.decoys(), self.targets())
    }
}

impl<'a> Extend<&'a Hit> for Tally<'a> {
    fn extend<I: IntoIterator<Item = &'a Hit>>(&mut self, iter: I) {
        for hit in iter {
            self.push(hit);
        }
    }
}

/// Running best of a threshold walk: most targets, then lowest FDR
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Best<T> {
    pub targets: usize,
    pub decoys: usize,
    pub fdr: f64,
    pub at: T,
}

impl<T> Best<T> {
    /// Does `self` beat `incumbent`? Must be feasible under the caller's
    /// bound; earlier candidates win exact ties.
    pub fn improves(&self, incumbent: Option<&Best<T>>) -> bool {
        match incumbent {
            None => true,
            Some(b) => self.targets > b.targets || (self.targets == b.targets && self.fdr < b.fdr),
        }
    }
}

/// Track the best tier boundary satisfying `fdr <= bound`
pub struct Tracker<T> {
    bound: f64,
    best: Option<Best<T>>,
}

impl<T> Tracker<T> {
    pub fn new(bound: f64) -> Self {
        Self { bound, best: None }
    }

    pub fn offer(&mut self, tally: &Tally, at: T) {
        let candidate = Best {
            targets: tally.targets(),
            decoys: tally.decoys(),
            fdr: tally.fdr(),
            at,
        };
        self.offer_best(candidate);
    }

    pub fn offer_best(&mut self, candidate: Best<T>) {
        // NaN comparisons are false, so an undefined FDR is never feasible
        if candidate.fdr <= self.bound && candidate.improves(self.best.as_ref()) {
            self.best = Some(candidate);
        }
    }

    pub fn finish(self) -> Option<Best<T>> {
        self.best
    }
}
