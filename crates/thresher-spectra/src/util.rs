use crate::mzml::{MzMLReader, PrecursorIndex};
use crate::{read_and_execute, Error};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Index the precursors of an mzML file (optionally gzip compressed)
pub fn read_mzml<P: AsRef<Path>>(path: P) -> Result<PrecursorIndex, Error> {
    let name = path.as_ref().display().to_string();
    read_and_execute(path, |bf| async move {
        let index = MzMLReader::with_name(name).parse(bf).await?;
        Ok::<_, Error>(index)
    })
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    read_and_execute(path, |mut bf| async move {
        let mut contents = String::new();
        bf.read_to_string(&mut contents).await.map_err(Error::IO)?;
        Ok::<_, Error>(serde_json::from_str(&contents)?)
    })
}
