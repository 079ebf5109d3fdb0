//! Batch driver: per-file analysis followed by the batch-wide threshold search

use crate::analysis::{Accepted, FileAnalysis};
use crate::events::{Observer, Progress};
use crate::fdr::Counting;
use crate::hit::{Hit, Polarity, Record, SpectralSource};
use crate::scan::ScanReducer;
use crate::summary::{Aggregator, Summary};
use crate::threshold::{ThresholdSearch, Thresholds};
use crate::unique::SequenceWinners;
use crate::Error;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Settings {
    pub polarity: Polarity,
    /// Largest precursor tolerance searched (ppm)
    pub max_precursor_tolerance: f64,
    /// Precursor tolerance search step (ppm)
    pub tolerance_increment: f64,
    /// FDR bound (percent)
    pub max_fdr: f64,
    pub counting: Counting,
    /// Inclusive range of C13 isotope errors considered when computing the
    /// experimental mass
    pub isotope_errors: (i8, i8),
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            polarity: Polarity::Lower,
            max_precursor_tolerance: 10.0,
            tolerance_increment: 0.1,
            max_fdr: 1.0,
            counting: Counting::Redundant,
            isotope_errors: (0, 0),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |msg: String| Err(Error::InvalidSettings(msg));
        if !(self.tolerance_increment > 0.0) {
            return invalid(format!(
                "precursor tolerance increment must be positive, got {}",
                self.tolerance_increment
            ));
        }
        if !(self.max_precursor_tolerance >= self.tolerance_increment) {
            return invalid(format!(
                "maximum precursor tolerance {} is smaller than the increment {}",
                self.max_precursor_tolerance, self.tolerance_increment
            ));
        }
        if !(self.max_fdr >= 0.0) {
            return invalid(format!("FDR bound must be non-negative, got {}", self.max_fdr));
        }
        if self.isotope_errors.0 > self.isotope_errors.1 {
            return invalid(format!(
                "isotope error range ({}, {}) is not ordered",
                self.isotope_errors.0, self.isotope_errors.1
            ));
        }
        Ok(())
    }

    pub fn search(&self) -> ThresholdSearch {
        ThresholdSearch {
            polarity: self.polarity,
            counting: self.counting,
            max_fdr: self.max_fdr,
            increment: self.tolerance_increment,
            max_tolerance: self.max_precursor_tolerance,
        }
    }
}

/// An ingested record, and the number of input bytes consumed to produce it
#[derive(Clone, Debug, PartialEq)]
pub struct Ingested {
    pub record: Record,
    pub bytes: u64,
}

/// Processes identification files one at a time, then searches for the batch
/// thresholds.
///
/// Every error returned from a method has already been reported to the
/// observer through [`Observer::on_fatal_error`].
pub struct Optimizer<'o> {
    settings: Settings,
    observer: &'o dyn Observer,
    progress: Progress,
    files: Vec<FileAnalysis>,
}

impl<'o> Optimizer<'o> {
    /// Start a run over `total_bytes` of input
    pub fn new(
        settings: Settings,
        observer: &'o dyn Observer,
        total_bytes: u64,
    ) -> Result<Self, Error> {
        if let Err(e) = settings.validate() {
            observer.on_fatal_error(&e);
            return Err(e);
        }
        observer.on_start();
        let mut progress = Progress::new(total_bytes);
        progress.start(observer);
        Ok(Self {
            settings,
            observer,
            progress,
            files: Vec::new(),
        })
    }

    /// Report an error raised outside of the optimizer (e.g. while locating
    /// or parsing a spectral source), aborting the run
    pub fn fail(self, error: &dyn std::error::Error) {
        self.observer.on_fatal_error(error);
    }

    /// Reduce, calibrate and q-value the records of one identification file,
    /// resolving precursors against `spectra`
    pub fn analyze<S, I>(&mut self, source: &str, spectra: &S, records: I) -> Result<(), Error>
    where
        S: SpectralSource + ?Sized,
        I: IntoIterator<Item = Result<Ingested, Error>>,
    {
        self.observer.on_file_start(source);
        match self.analyze_inner(source, spectra, records) {
            Ok(file) => {
                self.files.push(file);
                self.observer.on_file_finish(source);
                Ok(())
            }
            Err(e) => {
                self.observer.on_fatal_error(&e);
                Err(e)
            }
        }
    }

    fn analyze_inner<S, I>(
        &mut self,
        source: &str,
        spectra: &S,
        records: I,
    ) -> Result<FileAnalysis, Error>
    where
        S: SpectralSource + ?Sized,
        I: IntoIterator<Item = Result<Ingested, Error>>,
    {
        let mut reducer = ScanReducer::new(self.settings.polarity);
        for ingested in records {
            let Ingested { record, bytes } = ingested?;
            let hit = Hit::resolve(record, spectra, self.settings.isotope_errors)?;
            reducer.insert(hit);
            self.progress.advance(bytes, self.observer);
        }

        Ok(FileAnalysis::new(
            source.into(),
            spectra.name().into(),
            reducer,
            self.settings.polarity,
            self.settings.counting,
        ))
    }

    /// Search the pooled hits of every analyzed file for the batch thresholds.
    /// The run stays open until [`Finished::complete`] or [`Finished::fail`],
    /// so that writing reports is still part of it.
    pub fn finish(mut self) -> Finished<'o> {
        self.progress.finish(self.observer);

        let pool = self
            .files
            .iter()
            .flat_map(|file| file.hits.iter())
            .collect::<Vec<_>>();

        let found = self.settings.search().search(&pool);
        let satisfied = found.is_some();
        let thresholds = match found {
            Some(thresholds) => thresholds,
            None => {
                log::warn!(
                    "no thresholds satisfy a {}% FDR over {} hits: nothing will be accepted",
                    self.settings.max_fdr,
                    pool.len()
                );
                Thresholds::unsatisfied(self.settings.polarity)
            }
        };

        Finished {
            outcome: Outcome {
                settings: self.settings,
                files: self.files,
                thresholds,
                satisfied,
            },
            observer: self.observer,
        }
    }
}

/// Thresholds are chosen, and the caller is consuming the [`Outcome`]
pub struct Finished<'o> {
    pub outcome: Outcome,
    observer: &'o dyn Observer,
}

impl<'o> Finished<'o> {
    /// End the run successfully
    pub fn complete(self) -> Outcome {
        self.observer.on_finish();
        self.outcome
    }

    /// End the run with an error raised while consuming the outcome (e.g.
    /// writing reports)
    pub fn fail(self, error: &dyn std::error::Error) {
        self.observer.on_fatal_error(error);
    }
}

/// Analyzed files and the thresholds chosen for the batch
#[derive(Clone, Debug)]
pub struct Outcome {
    pub settings: Settings,
    pub files: Vec<FileAnalysis>,
    pub thresholds: Thresholds,
    /// Whether any thresholds satisfied the FDR bound. If not, `thresholds`
    /// accept nothing.
    pub satisfied: bool,
}

/// Accepted hits of one file
pub struct FileReport<'a> {
    pub analysis: &'a FileAnalysis,
    pub accepted: Accepted<'a>,
}

/// Everything the report writer needs, borrowing hits from the [`Outcome`]
pub struct Report<'a> {
    pub files: Vec<FileReport<'a>>,
    /// Batch-wide winners among the per-file sequence winners
    pub overall: SequenceWinners<'a>,
    pub summary: Summary,
}

impl Outcome {
    pub fn report(&self) -> Report<'_> {
        let polarity = self.settings.polarity;
        let mut aggregator = Aggregator::new(self.settings.counting, self.thresholds);
        let mut overall = SequenceWinners::new(polarity);

        let files = self
            .files
            .iter()
            .map(|analysis| {
                let accepted = analysis.accept(&self.thresholds, polarity);
                overall.extend(accepted.unique.targets());
                overall.extend(accepted.unique.decoys());
                aggregator.add(analysis, &accepted);
                FileReport { analysis, accepted }
            })
            .collect::<Vec<_>>();

        let summary = aggregator.finish(&overall);
        Report {
            files,
            overall,
            summary,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validation() {
        assert!(Settings::default().validate().is_ok());
        let bad = [
            Settings {
                tolerance_increment: 0.0,
                ..Default::default()
            },
            Settings {
                max_precursor_tolerance: 0.05,
                ..Default::default()
            },
            Settings {
                max_fdr: f64::NAN,
                ..Default::default()
            },
            Settings {
                isotope_errors: (1, -1),
                ..Default::default()
            },
        ];
        for settings in bad {
            assert!(matches!(
                settings.validate(),
                Err(Error::InvalidSettings(_))
            ));
        }
    }
}
