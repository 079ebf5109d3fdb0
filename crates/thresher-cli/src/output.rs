use csv::ByteRecord;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thresher_core::hit::Hit;
use thresher_core::summary::{Row, Summary};

/// Columns appended to every row of the original search engine output
pub const EXTENDED_HEADERS: [&str; 7] = [
    "Precursor Isolation m/z",
    "Precursor Isolation Mass (Da)",
    "Precursor Theoretical Neutral Mass (Da)",
    "Precursor Experimental Neutral Mass (Da)",
    "Precursor Mass Error (ppm)",
    "Adjusted Precursor Mass Error (ppm)",
    "Q-Value (%)",
];

pub fn extended_header(headers: &[String]) -> ByteRecord {
    headers
        .iter()
        .map(String::as_str)
        .chain(EXTENDED_HEADERS)
        .collect()
}

pub fn serialize_hit(hit: &Hit) -> ByteRecord {
    let mut record = ByteRecord::new();
    for field in &hit.fields {
        record.push_field(field.as_bytes());
    }
    let p = &hit.precursor;
    record.push_field(ryu::Buffer::new().format(p.isolation_mz).as_bytes());
    record.push_field(ryu::Buffer::new().format(p.isolation_mass).as_bytes());
    record.push_field(ryu::Buffer::new().format(p.theoretical_mass).as_bytes());
    record.push_field(ryu::Buffer::new().format(p.experimental_mass).as_bytes());
    record.push_field(ryu::Buffer::new().format(p.ppm).as_bytes());
    record.push_field(ryu::Buffer::new().format(hit.adjusted_ppm).as_bytes());
    record.push_field(ryu::Buffer::new().format(hit.q_value).as_bytes());
    record
}

/// Write `hits` as CSV to `path`, returning the path written
pub fn write_hits(path: &Path, header: &ByteRecord, hits: &[&Hit]) -> anyhow::Result<String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(vec![]);
    wtr.write_byte_record(header)?;
    for record in hits
        .par_iter()
        .map(|hit| serialize_hit(hit))
        .collect::<Vec<_>>()
    {
        wtr.write_byte_record(&record)?;
    }

    wtr.flush()?;
    let bytes = wtr.into_inner()?;
    thresher_spectra::write_bytes_sync(path, bytes)?;
    Ok(path.display().to_string())
}

/// Lays out report files below the output directory
pub struct Layout<'a> {
    pub directory: &'a Path,
    pub phospho: bool,
}

impl<'a> Layout<'a> {
    /// `<folder>/<name>.csv`, and the phosphopeptide subset at
    /// `<folder>/phospho/<name>_phospho.csv`
    pub fn write_set(
        &self,
        folder: Option<&str>,
        name: &str,
        header: &ByteRecord,
        hits: &[&Hit],
    ) -> anyhow::Result<Vec<String>> {
        let mut dir = self.directory.to_path_buf();
        if let Some(folder) = folder {
            dir.push(folder);
        }

        let mut written = vec![write_hits(&dir.join(format!("{}.csv", name)), header, hits)?];
        if self.phospho {
            let phospho = hits
                .iter()
                .copied()
                .filter(|hit| hit.is_phospho())
                .collect::<Vec<_>>();
            let path = dir.join("phospho").join(format!("{}_phospho.csv", name));
            written.push(write_hits(&path, header, &phospho)?);
        }
        Ok(written)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.directory.join("summary.csv")
    }
}

fn float(x: f64) -> String {
    match x.is_nan() {
        true => "n/a".into(),
        false => ryu::Buffer::new().format(x).into(),
    }
}

fn count(x: Option<usize>) -> String {
    match x {
        Some(x) => itoa::Buffer::new().format(x).into(),
        None => "n/a".into(),
    }
}

fn summary_row(row: &Row, summary: &Summary, phospho: bool) -> Vec<String> {
    let na = || String::from("n/a");
    let calibration = row.calibration.as_ref();
    let accepted = row.accepted.as_ref();

    let mut fields = vec![
        row.label.clone(),
        row.spectra.clone().unwrap_or_else(na),
        calibration.map(|c| float(c.score)).unwrap_or_else(na),
        count(calibration.map(|c| c.targets)),
        count(calibration.map(|c| c.decoys)),
        calibration.map(|c| float(c.fdr)).unwrap_or_else(na),
        calibration.map(|c| float(c.offset)).unwrap_or_else(na),
        count(row.scans),
    ];
    if phospho {
        fields.push(count(row.phospho_scans));
    }
    fields.push(float(row.thresholds.q_value));
    fields.push(float(row.thresholds.score));
    fields.push(float(row.thresholds.tolerance));
    fields.push(count(accepted.map(|a| a.targets)));
    fields.push(count(accepted.map(|a| a.decoys)));
    if phospho {
        fields.push(count(accepted.map(|a| a.phospho_targets)));
        fields.push(count(accepted.map(|a| a.phospho_decoys)));
    }

    let fdr = row.fdr.map(float).unwrap_or_else(na);
    let unique = summary.counting == thresher_core::fdr::Counting::Unique;
    if !unique {
        fields.push(fdr.clone());
    }
    fields.push(count(Some(row.unique.targets)));
    fields.push(count(Some(row.unique.decoys)));
    if phospho {
        fields.push(count(Some(row.unique.phospho_targets)));
        fields.push(count(Some(row.unique.phospho_decoys)));
    }
    if unique {
        fields.push(fdr);
    }
    fields
}

pub fn summary_header(summary: &Summary, phospho: bool) -> Vec<&'static str> {
    let unique = summary.counting == thresher_core::fdr::Counting::Unique;
    let mut header = vec![
        "CSV Filepath",
        "Spectra Filepath",
        "Preliminary Score Threshold",
        "Preliminary Target Peptides",
        "Preliminary Decoy Peptides",
        "Preliminary FDR (%)",
        "Systematic (Median) Precursor Mass Error (ppm)",
        "Scans",
    ];
    if phospho {
        header.push("Phosphopeptide Scans");
    }
    header.extend([
        "Q-Value Threshold (%)",
        "Score Threshold",
        "Maximum Precursor Mass Error (ppm)",
        "Target Peptides",
        "Decoy Peptides",
    ]);
    if phospho {
        header.extend(["Target Phosphopeptides", "Decoy Phosphopeptides"]);
    }
    if !unique {
        header.push("FDR (%)");
    }
    header.extend(["Unique Target Peptides", "Unique Decoy Peptides"]);
    if phospho {
        header.extend(["Unique Target Phosphopeptides", "Unique Decoy Phosphopeptides"]);
    }
    if unique {
        header.push("FDR (%)");
    }
    header
}

/// Per-file rows, then `SUM` and `OVERALL`
pub fn write_summary(path: &Path, summary: &Summary, phospho: bool) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(summary_header(summary, phospho))?;
    for row in &summary.files {
        wtr.write_record(summary_row(row, summary, phospho))?;
    }
    wtr.write_record(summary_row(&summary.sum, summary, phospho))?;
    wtr.write_record(summary_row(&summary.overall, summary, phospho))?;
    wtr.flush()?;
    let bytes = wtr.into_inner()?;
    thresher_spectra::write_bytes_sync(path, bytes)?;
    Ok(path.display().to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use thresher_core::fdr::Counting;
    use thresher_core::summary::Counts;
    use thresher_core::threshold::Thresholds;

    fn summary(counting: Counting) -> Summary {
        let thresholds = Thresholds {
            score: 0.01,
            q_value: 0.5,
            tolerance: 2.5,
            targets: 10,
            decoys: 0,
            fdr: 0.0,
        };
        let row = Row {
            label: "SUM".into(),
            spectra: None,
            calibration: None,
            scans: Some(12),
            phospho_scans: Some(1),
            thresholds,
            accepted: Some(Counts {
                targets: 10,
                decoys: 0,
                phospho_targets: 1,
                phospho_decoys: 0,
            }),
            unique: Counts {
                targets: 8,
                ..Default::default()
            },
            fdr: Some(0.0),
        };
        Summary {
            counting,
            files: Vec::new(),
            sum: row.clone(),
            overall: Row {
                label: "OVERALL".into(),
                scans: None,
                accepted: None,
                fdr: Some(f64::NAN),
                ..row
            },
        }
    }

    #[test]
    fn summary_columns_line_up() {
        for counting in [Counting::Redundant, Counting::Unique] {
            for phospho in [true, false] {
                let s = summary(counting);
                let header = summary_header(&s, phospho);
                assert_eq!(header.len(), summary_row(&s.sum, &s, phospho).len());
                assert_eq!(header.len(), summary_row(&s.overall, &s, phospho).len());
            }
        }
    }

    #[test]
    fn undefined_values() {
        let s = summary(Counting::Unique);
        let row = summary_row(&s.overall, &s, false);
        assert_eq!(row[0], "OVERALL");
        assert_eq!(row[1], "n/a");
        assert_eq!(row[7], "n/a");
        assert_eq!(row[8], "0.5");
        assert_eq!(row.last().map(String::as_str), Some("n/a"));
    }

    #[test]
    fn extended_rows() {
        let header = extended_header(&["Spectrum number".into(), "Peptide".into()]);
        assert_eq!(header.len(), 9);
        assert_eq!(&header[8], b"Q-Value (%)");
    }
}
