//! Search engine output (OMSSA-style CSV) ingestion

use crate::input::Columns;
use csv::StringRecord;
use std::fs::File;
use std::path::Path;
use thresher_core::hit::Record;
use thresher_core::optimizer::Ingested;
use thresher_core::Error;

/// Streams the rows of an identification CSV as [`Record`]s, reporting how
/// many bytes each row consumed
pub struct CsvRecords<R> {
    reader: csv::Reader<R>,
    columns: Columns,
    decoy_tags: Vec<String>,
    path: String,
    consumed: u64,
    done: bool,
}

impl CsvRecords<File> {
    pub fn open<P: AsRef<Path>>(
        path: P,
        columns: Columns,
        decoy_tags: &[String],
    ) -> Result<Self, Error> {
        let display = path.as_ref().display().to_string();
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path.as_ref())
            .map_err(|e| Error::read(&display, e))?;
        Ok(Self::new(reader, columns, decoy_tags, display))
    }
}

impl<R: std::io::Read> CsvRecords<R> {
    pub fn from_reader(reader: R, columns: Columns, decoy_tags: &[String], path: &str) -> Self {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        Self::new(reader, columns, decoy_tags, path.into())
    }

    fn new(reader: csv::Reader<R>, columns: Columns, decoy_tags: &[String], path: String) -> Self {
        Self {
            reader,
            columns,
            decoy_tags: decoy_tags.to_vec(),
            path,
            consumed: 0,
            done: false,
        }
    }

    /// Header row of the file
    pub fn headers(&mut self) -> Result<Vec<String>, Error> {
        let headers = self
            .reader
            .headers()
            .map_err(|e| Error::read(&self.path, e))?;
        Ok(headers.iter().map(|h| h.trim().to_string()).collect())
    }

    fn parse(&self, row: &StringRecord) -> Result<Record, Error> {
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let field = |ix: usize, name: &str| {
            row.get(ix)
                .map(str::trim)
                .ok_or_else(|| Error::MalformedRecord {
                    line,
                    reason: format!("missing {} (column {})", name, ix),
                })
        };
        let malformed = |name: &str, value: &str| Error::MalformedRecord {
            line,
            reason: format!("invalid {}: `{}`", name, value),
        };

        let scan = field(self.columns.scan, "scan number")?;
        let scan = scan.parse().map_err(|_| malformed("scan number", scan))?;

        let score = field(self.columns.score, "score")?;
        let score = score
            .parse::<f64>()
            .ok()
            .filter(|s| !s.is_nan())
            .ok_or_else(|| malformed("score", score))?;

        let charge = field(self.columns.charge, "charge")?;
        let charge = charge.parse().map_err(|_| malformed("charge", charge))?;

        let mass = field(self.columns.theoretical_mass, "theoretical mass")?;
        let theoretical_mass = mass
            .parse::<f64>()
            .ok()
            .filter(|m| *m > 0.0)
            .ok_or_else(|| malformed("theoretical mass", mass))?;

        let defline = field(self.columns.defline, "defline")?;
        let decoy = self.decoy_tags.iter().any(|tag| defline.contains(tag.as_str()));

        Ok(Record {
            scan,
            sequence: field(self.columns.sequence, "sequence")?.into(),
            score,
            decoy,
            modifications: field(self.columns.modifications, "modifications")?.into(),
            charge,
            theoretical_mass,
            fields: row.iter().map(String::from).collect(),
        })
    }
}

impl<R: std::io::Read> Iterator for CsvRecords<R> {
    type Item = Result<Ingested, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut row = StringRecord::new();
        match self.reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(Error::read(&self.path, e)));
            }
        }

        // Skip blank lines
        if row.iter().all(|f| f.trim().is_empty()) {
            return self.next();
        }

        let position = self.reader.position().byte();
        let bytes = position.saturating_sub(self.consumed);
        self.consumed = position;

        match self.parse(&row) {
            Ok(record) => Some(Ok(Ingested { record, bytes })),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const CSV: &str = "Spectrum number, Filename/id, Peptide, E-value, Mass, gi, Accession, Start, Stop, Defline, Mods, Charge, Theo Mass, P-value, NIST score
1,scan=1,PEPTIDE,0.001,799.36,0,sp|P1,1,7,sp|P1 protein,,2,799.36,1e-5,0
2,scan=2,EDITPEP,0.2,799.36,0,DECOY_P1,1,7,DECOY_sp|P1 protein,,2,799.36,1e-3,0

3,scan=3,PEPSTIDE,0.01,879.33,0,sp|P2,1,8,sp|P2 protein,phosphorylation of S:4,2,879.33,1e-4,0
";

    fn tags() -> Vec<String> {
        vec!["DECOY".into(), "REVERSED".into()]
    }

    #[test]
    fn omssa_rows() {
        let mut records = CsvRecords::from_reader(CSV.as_bytes(), Columns::default(), &tags(), "a.csv");
        assert_eq!(records.headers().unwrap().len(), 15);

        let rows = records.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(rows.len(), 3);

        let first = &rows[0].record;
        assert_eq!(first.scan, 1);
        assert_eq!(first.sequence, "PEPTIDE");
        assert_eq!(first.score, 0.001);
        assert!(!first.decoy);
        assert_eq!(first.charge, 2);
        assert_eq!(first.theoretical_mass, 799.36);
        assert_eq!(first.fields.len(), 15);

        assert!(rows[1].record.decoy);
        assert_eq!(
            rows[2].record.modifications,
            "phosphorylation of S:4"
        );

        let total = rows.iter().map(|r| r.bytes).sum::<u64>();
        assert_eq!(total, CSV.len() as u64);
    }

    #[test]
    fn malformed_is_fatal() {
        let csv = "a,b,c,d,e,f,g,h,i,j,k,l,m\n1,x,PEPTIDE,abc,0,0,0,0,0,def,,2,799.36\n2,x,PEPTIDE,0.1,0,0,0,0,0,def,,2,799.36\n";
        let mut records = CsvRecords::from_reader(csv.as_bytes(), Columns::default(), &tags(), "b.csv");
        match records.next() {
            Some(Err(Error::MalformedRecord { line, reason })) => {
                assert_eq!(line, 2);
                assert!(reason.contains("score"));
            }
            _ => panic!("expected a malformed record"),
        }
        assert!(records.next().is_none());

        let short = "a,b,c\n1,x,PEPTIDE\n";
        let mut records = CsvRecords::from_reader(short.as_bytes(), Columns::default(), &tags(), "c.csv");
        assert!(matches!(
            records.next(),
            Some(Err(Error::MalformedRecord { .. }))
        ));
    }
}
