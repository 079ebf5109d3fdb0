//! Locate the mzML file that each identification file was searched against

use std::path::{Path, PathBuf};
use thresher_core::Error;

const EXTENSIONS: [&str; 2] = [".mzML", ".mzML.gz"];

/// Every file below `dir`, recursively, in a stable order
fn files_below(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| Error::read(dir.display().to_string(), e))?;
        for entry in entries {
            let path = entry
                .map_err(|e| Error::read(dir.display().to_string(), e))?
                .path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Find the spectra for `input` below `spectra_dir` (or the directory holding
/// `input`). A file named after the input's stem is preferred; failing that,
/// the stem is shortened one character at a time.
pub fn find_spectra(input: &Path, spectra_dir: Option<&Path>) -> Result<PathBuf, Error> {
    let missing = || Error::MissingInput(input.display().to_string());

    let dir = match spectra_dir {
        Some(dir) => dir.to_path_buf(),
        None => match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };
    let candidates = files_below(&dir)?;

    let mut stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(missing)?
        .to_string();

    while !stem.is_empty() {
        let found = candidates.iter().find(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            EXTENSIONS
                .iter()
                .any(|ext| name.eq_ignore_ascii_case(&format!("{}{}", stem, ext)))
        });
        if let Some(path) = found {
            log::debug!("{} -> {}", input.display(), path.display());
            return Ok(path.clone());
        }
        stem.pop();
    }
    Err(missing())
}

/// Pair every input with its spectra, grouping inputs that share a spectra
/// file. Groups are ordered by first appearance.
pub fn group(
    inputs: &[String],
    spectra_dir: Option<&Path>,
) -> Result<Vec<(PathBuf, Vec<PathBuf>)>, Error> {
    let mut groups: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    for input in inputs {
        let input = PathBuf::from(input);
        let spectra = find_spectra(&input, spectra_dir)?;
        match groups.iter_mut().find(|(s, _)| *s == spectra) {
            Some((_, members)) => members.push(input),
            None => groups.push((spectra, vec![input])),
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod test {
    use super::*;

    fn scratch() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("nested")).unwrap();
        tmp
    }

    #[test]
    fn truncated_stems() {
        let tmp = scratch();
        let dir = tmp.path();
        std::fs::write(dir.join("nested").join("run1.mzML"), b"").unwrap();
        std::fs::write(dir.join("run2.mzML.gz"), b"").unwrap();

        let found = find_spectra(&dir.join("run1_phospho.csv"), None).unwrap();
        assert_eq!(found, dir.join("nested").join("run1.mzML"));

        let found = find_spectra(&dir.join("run2.csv"), Some(dir)).unwrap();
        assert_eq!(found, dir.join("run2.mzML.gz"));

        let inputs = vec![
            dir.join("run1_a.csv").display().to_string(),
            dir.join("run2.csv").display().to_string(),
            dir.join("run1_b.csv").display().to_string(),
        ];
        let groups = group(&inputs, None).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, dir.join("run2.mzML.gz"));
    }

    #[test]
    fn missing_input() {
        let tmp = scratch();
        let dir = tmp.path();
        match find_spectra(&dir.join("zzz.csv"), None) {
            Err(Error::MissingInput(path)) => assert!(path.ends_with("zzz.csv")),
            other => panic!("expected missing input, got {:?}", other),
        }
    }
}
