use async_compression::tokio::bufread::GzipDecoder;
use async_compression::tokio::write::GzipEncoder;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWriteExt, BufReader};

pub mod mzml;
pub mod util;

/// Does the path end in "gz" or "gzip"?
fn gzip_heuristic(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext.to_ascii_lowercase() == "gz" || ext.to_ascii_lowercase() == "gzip",
        _ => false,
    }
}

/// Open a buffered stream to the file, transparently decompressing gzip
pub async fn read(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send + Sync>, Error> {
    let file: Box<dyn AsyncRead + Unpin + Send + Sync> =
        Box::new(tokio::fs::File::open(path).await?);
    let reader = BufReader::new(file);
    match gzip_heuristic(path) {
        true => {
            let gzip = GzipDecoder::new(reader);
            Ok(Box::new(BufReader::new(gzip)))
        }
        false => Ok(Box::new(reader)),
    }
}

pub async fn write_bytes(path: &Path, bytes: Vec<u8>) -> Result<(), Error> {
    let bytes: Vec<u8> = match gzip_heuristic(path) {
        true => {
            let inner = Vec::with_capacity(bytes.len() / 2);
            let mut wtr = GzipEncoder::new(inner);
            wtr.write_all(&bytes).await?;
            wtr.shutdown().await?;
            wtr.into_inner()
        }
        false => bytes,
    };
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    Ok(())
}

pub fn write_bytes_sync<P: AsRef<Path>>(path: P, bytes: Vec<u8>) -> Result<(), Error> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async { write_bytes(path.as_ref(), bytes).await })
}

pub fn read_and_execute<P, F, Fut, T>(path: P, func: F) -> Result<T, Error>
where
    P: AsRef<Path>,
    Fut: futures::Future<Output = Result<T, Error>>,
    F: FnOnce(Box<dyn AsyncBufRead + Unpin + Send + Sync>) -> Fut,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let reader = read(path.as_ref()).await?;
        func(reader).await
    })
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] tokio::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("MzML error: {0}")]
    MzML(#[from] mzml::MzMLError),
}
