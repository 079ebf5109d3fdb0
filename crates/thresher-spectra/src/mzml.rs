use fnv::FnvHashMap;
use quick_xml::events::Event;
use quick_xml::Reader;
use thresher_core::hit::SpectralSource;
use tokio::io::AsyncBufRead;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
/// Which tag are we inside?
enum State {
    Spectrum,
    Precursor,
    IsolationWindow,
    SelectedIon,
}

const ISO_WINDOW_TARGET: &[u8] = b"MS:1000827";
const SELECTED_ION_MZ: &[u8] = b"MS:1000744";

/// Precursor isolation m/z of every MS/MS scan in an mzML file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrecursorIndex {
    pub name: String,
    pub scans: FnvHashMap<u32, f64>,
}

impl PrecursorIndex {
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }
}

impl SpectralSource for PrecursorIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn isolation_mz(&self, scan: u32) -> Option<f64> {
        self.scans.get(&scan).copied()
    }
}

/// Scan number of a spectrum: the `scan=` token of its native id, else the
/// last numeric `key=value` token, else its 1-based position in the file
pub fn scan_number(id: &str, index: Option<usize>) -> Option<u32> {
    let tokens = id
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .collect::<Vec<_>>();

    tokens
        .iter()
        .find(|(key, _)| *key == "scan")
        .and_then(|(_, value)| value.parse().ok())
        .or_else(|| {
            tokens
                .iter()
                .rev()
                .find_map(|(_, value)| value.parse().ok())
        })
        .or_else(|| index.and_then(|ix| u32::try_from(ix + 1).ok()))
}

#[derive(Default)]
pub struct MzMLReader {
    name: String,
}

impl MzMLReader {
    pub fn with_name<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    /// Collect precursor isolation m/z values, keyed by scan number. The
    /// isolation window target is preferred, falling back to the selected
    /// ion m/z. Only the first precursor of a spectrum is used.
    pub async fn parse<B: AsyncBufRead + Unpin>(&self, b: B) -> Result<PrecursorIndex, MzMLError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();

        let mut state = None;
        let mut scan = None;
        let mut target_mz: Option<f64> = None;
        let mut selected_mz: Option<f64> = None;
        let mut position = 0;

        let mut index = PrecursorIndex {
            name: self.name.clone(),
            scans: FnvHashMap::default(),
        };

        macro_rules! extract {
            ($ev:expr, $key:expr) => {
                $ev.try_get_attribute($key)?
                    .ok_or(MzMLError::Malformed)?
                    .value
            };
        }

        macro_rules! extract_value {
            ($ev:expr) => {{
                let s = $ev
                    .try_get_attribute(b"value")?
                    .ok_or(MzMLError::Malformed)?
                    .value;
                std::str::from_utf8(&s)?.parse()?
            }};
        }

        loop {
            match reader.read_event_into_async(&mut buf).await? {
                Event::Start(ref ev) => {
                    // State transition into child tag
                    state = match (ev.name().into_inner(), state) {
                        (b"spectrum", _) => Some(State::Spectrum),
                        (b"precursor", Some(State::Spectrum)) => Some(State::Precursor),
                        (b"isolationWindow", Some(State::Precursor)) => {
                            Some(State::IsolationWindow)
                        }
                        (b"selectedIon", Some(State::Precursor)) => Some(State::SelectedIon),
                        _ => state,
                    };
                    if ev.name().into_inner() == b"spectrum" {
                        let id = extract!(ev, b"id");
                        let id = std::str::from_utf8(&id)?;
                        let ix = match ev.try_get_attribute(b"index")? {
                            Some(attr) => std::str::from_utf8(&attr.value)?.parse()?,
                            None => position,
                        };
                        scan = scan_number(id, Some(ix));
                        target_mz = None;
                        selected_mz = None;
                        position += 1;
                    }
                }
                Event::Empty(ref ev) if ev.name().into_inner() == b"cvParam" => {
                    match state {
                        Some(State::IsolationWindow) if target_mz.is_none() => {
                            if extract!(ev, b"accession").as_ref() == ISO_WINDOW_TARGET {
                                target_mz = Some(extract_value!(ev));
                            }
                        }
                        Some(State::SelectedIon) if selected_mz.is_none() => {
                            if extract!(ev, b"accession").as_ref() == SELECTED_ION_MZ {
                                selected_mz = Some(extract_value!(ev));
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ev) => {
                    state = match (state, ev.name().into_inner()) {
                        (Some(State::IsolationWindow), b"isolationWindow") => {
                            Some(State::Precursor)
                        }
                        (Some(State::SelectedIon), b"selectedIon") => Some(State::Precursor),
                        (Some(State::Precursor), b"precursor") => Some(State::Spectrum),
                        (_, b"spectrum") => {
                            match (scan, target_mz.or(selected_mz)) {
                                (Some(scan), Some(mz)) => {
                                    if index.scans.insert(scan, mz).is_some() {
                                        log::warn!(
                                            "{}: duplicate scan number {}, keeping the last",
                                            self.name,
                                            scan
                                        );
                                    }
                                }
                                (None, Some(_)) => {
                                    log::warn!("{}: spectrum without a scan number", self.name)
                                }
                                // MS1 scans have no precursor
                                _ => {}
                            }
                            None
                        }
                        _ => state,
                    };
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(index)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MzMLError {
    #[error("malformed MzML")]
    Malformed,
    #[error("XML parsing error: {0}")]
    XMLError(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    AttrError(#[from] quick_xml::events::attributes::AttrError),
    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("utf8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
    #[error("error parsing float: {0}")]
    FloatError(#[from] std::num::ParseFloatError),
    #[error("error parsing int: {0}")]
    IntError(#[from] std::num::ParseIntError),
}
