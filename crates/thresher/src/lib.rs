pub mod analysis;
pub mod calibration;
pub mod events;
pub mod fdr;
pub mod hit;
pub mod mass;
pub mod optimizer;
pub mod qvalue;
pub mod scan;
pub mod summary;
pub mod threshold;
pub mod unique;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no spectra file found for `{0}`")]
    MissingInput(String),
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },
    #[error("scan {scan} was not found in `{spectra}`")]
    MissingScan { scan: u32, spectra: String },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub fn read<E>(path: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Read {
            path: path.into(),
            source: source.into(),
        }
    }
}
