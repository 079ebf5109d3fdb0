use crate::discover;
use crate::ingest::CsvRecords;
use crate::input::Search;
use crate::output::{self, Layout};
use csv::ByteRecord;
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use thresher_core::events::Observer;
use thresher_core::hit::Hit;
use thresher_core::optimizer::{Optimizer, Outcome, Report};
use thresher_core::summary::Summary;

/// Forwards optimizer events to the log
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_start(&self) {
        info!("optimizing thresholds");
    }

    fn on_file_start(&self, source: &str) {
        info!("reading {}", source);
    }

    fn on_file_finish(&self, source: &str) {
        log::debug!("finished {}", source);
    }

    fn on_progress(&self, percent: u8) {
        log::trace!("{}% complete", percent);
    }

    fn on_fatal_error(&self, error: &dyn std::error::Error) {
        log::error!("{}", error);
    }

    fn on_finish(&self) {
        info!("thresholds chosen");
    }
}

#[derive(Serialize)]
struct Results<'a> {
    #[serde(flatten)]
    search: &'a Search,
    satisfied: bool,
    summary: &'a Summary,
}

pub struct Runner {
    pub parameters: Search,
    start: Instant,
}

fn stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

impl Runner {
    pub fn new(parameters: Search) -> Self {
        Self {
            parameters,
            start: Instant::now(),
        }
    }

    fn total_bytes(&self) -> anyhow::Result<u64> {
        self.parameters
            .input_paths
            .iter()
            .map(|path| {
                std::fs::metadata(path)
                    .map(|m| m.len())
                    .map_err(|e| anyhow::Error::from(thresher_core::Error::read(path.as_str(), e)))
            })
            .sum()
    }

    /// Analyze every input, choose the batch thresholds and write reports.
    /// Every error returned has been reported through `observer`.
    pub fn run(mut self, observer: &dyn Observer) -> anyhow::Result<Summary> {
        let total_bytes = match self.total_bytes() {
            Ok(total) => total,
            Err(e) => {
                observer.on_fatal_error(&*e);
                return Err(e);
            }
        };
        let mut optimizer = Optimizer::new(self.parameters.settings, observer, total_bytes)?;

        let spectra_dir = self.parameters.spectra_directory.as_ref().map(Path::new);
        let groups = match discover::group(&self.parameters.input_paths, spectra_dir) {
            Ok(groups) => groups,
            Err(e) => {
                optimizer.fail(&e);
                return Err(e.into());
            }
        };

        let mut headers = HashMap::new();
        for (spectra_path, inputs) in groups {
            let spectra = match thresher_spectra::util::read_mzml(&spectra_path) {
                Ok(spectra) => spectra,
                Err(e) => {
                    optimizer.fail(&e);
                    return Err(e.into());
                }
            };
            info!(
                "- indexed {} precursors from {}",
                spectra.len(),
                spectra_path.display()
            );

            for input in inputs {
                let source = input.display().to_string();
                let mut records = match CsvRecords::open(
                    &input,
                    self.parameters.columns,
                    &self.parameters.decoy_tags,
                ) {
                    Ok(records) => records,
                    Err(e) => {
                        optimizer.fail(&e);
                        return Err(e.into());
                    }
                };
                let header = match records.headers() {
                    Ok(header) => header,
                    Err(e) => {
                        optimizer.fail(&e);
                        return Err(e.into());
                    }
                };
                headers.insert(source.clone(), output::extended_header(&header));
                optimizer.analyze(&source, &spectra, records)?;
            }
        }

        let finished = optimizer.finish();
        match self.write_outputs(&finished.outcome, &headers) {
            Ok(summary) => {
                finished.complete();
                let run_time = (Instant::now() - self.start).as_secs();
                info!("finished in {}s", run_time);
                Ok(summary)
            }
            Err(e) => {
                finished.fail(&*e);
                Err(e)
            }
        }
    }

    fn write_outputs(
        &mut self,
        outcome: &Outcome,
        headers: &HashMap<String, ByteRecord>,
    ) -> anyhow::Result<Summary> {
        let report = outcome.report();
        let t = &outcome.thresholds;
        info!(
            "- thresholds: q-value <= {}%, score {}, precursor error <= {} ppm",
            t.q_value, t.score, t.tolerance
        );

        log::trace!("writing outputs");
        let start = Instant::now();
        self.write_reports(&report, headers)?;
        info!("- file IO: {:8} ms", start.elapsed().as_millis());

        let path = self.parameters.output_directory.join("results.json");
        self.parameters
            .output_paths
            .push(path.display().to_string());
        let results = Results {
            search: &self.parameters,
            satisfied: outcome.satisfied,
            summary: &report.summary,
        };
        println!("{}", serde_json::to_string_pretty(&results)?);
        let bytes = serde_json::to_vec_pretty(&results)?;
        thresher_spectra::write_bytes_sync(&path, bytes)?;

        Ok(report.summary)
    }

    fn write_reports(
        &mut self,
        report: &Report<'_>,
        headers: &HashMap<String, ByteRecord>,
    ) -> anyhow::Result<()> {
        let layout = Layout {
            directory: &self.parameters.output_directory,
            phospho: self.parameters.phospho_outputs,
        };
        let mut written = Vec::new();

        for file in &report.files {
            let source = &file.analysis.source;
            let name = stem(source);
            let header = headers
                .get(source)
                .ok_or_else(|| anyhow::anyhow!("no header recorded for {}", source))?;
            let accepted = &file.accepted;
            info!(
                "- {}: {} target and {} decoy peptides accepted",
                source,
                accepted.targets.len(),
                accepted.decoys.len()
            );

            written.extend(layout.write_set(
                Some("scans"),
                &format!("{}_scans", name),
                header,
                &file.analysis.by_scan(),
            )?);
            written.extend(layout.write_set(
                Some("target-decoy"),
                &format!("{}_target", name),
                header,
                &accepted.targets,
            )?);
            written.extend(layout.write_set(
                Some("target-decoy"),
                &format!("{}_decoy", name),
                header,
                &accepted.decoys,
            )?);
            written.extend(layout.write_set(
                Some("unique"),
                &format!("{}_target_unique", name),
                header,
                &accepted.unique.targets().collect::<Vec<_>>(),
            )?);
            written.extend(layout.write_set(
                Some("unique"),
                &format!("{}_decoy_unique", name),
                header,
                &accepted.unique.decoys().collect::<Vec<_>>(),
            )?);
        }

        if self.parameters.overall_outputs {
            // Batch tables carry the columns of the first input
            if let Some(header) = report
                .files
                .first()
                .and_then(|file| headers.get(&file.analysis.source))
            {
                let mut scans = Vec::new();
                let mut targets = Vec::new();
                let mut decoys = Vec::new();
                let mut unique_targets = Vec::new();
                let mut unique_decoys = Vec::new();
                for file in &report.files {
                    scans.extend(file.analysis.by_scan());
                    targets.extend(file.accepted.targets.iter().copied());
                    decoys.extend(file.accepted.decoys.iter().copied());
                    unique_targets.extend(file.accepted.unique.targets());
                    unique_decoys.extend(file.accepted.unique.decoys());
                }

                let tables: [(&str, Vec<&Hit>); 7] = [
                    ("scans", scans),
                    ("target", targets),
                    ("decoy", decoys),
                    ("target_unique", unique_targets),
                    ("decoy_unique", unique_decoys),
                    ("target_unique_unique", report.overall.targets().collect()),
                    ("decoy_unique_unique", report.overall.decoys().collect()),
                ];
                for (name, hits) in tables {
                    written.extend(layout.write_set(None, name, header, &hits)?);
                }
            }

            written.push(output::write_summary(
                &layout.summary_path(),
                &report.summary,
                self.parameters.phospho_outputs,
            )?);
        }

        self.parameters.output_paths.extend(written);
        Ok(())
    }
}
