use anyhow::{ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thresher_core::fdr::Counting;
use thresher_core::hit::Polarity;
use thresher_core::optimizer::Settings;

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub settings: Settings,
    pub input_paths: Vec<String>,
    pub spectra_directory: Option<String>,
    pub decoy_tags: Vec<String>,
    pub columns: Columns,
    pub overall_outputs: bool,
    pub phospho_outputs: bool,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize)]
/// Input parameters deserialized from JSON file
pub struct Input {
    input_paths: Option<Vec<String>>,
    spectra_directory: Option<String>,
    output_directory: Option<String>,
    score_polarity: Option<Polarity>,
    max_precursor_ppm: Option<f64>,
    precursor_ppm_increment: Option<f64>,
    max_fdr: Option<f64>,
    counting: Option<Counting>,
    isotope_errors: Option<(i8, i8)>,
    overall_outputs: Option<bool>,
    phospho_outputs: Option<bool>,
    decoy_tags: Option<Vec<String>>,
    columns: Option<ColumnOptions>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct ColumnOptions {
    scan: Option<usize>,
    sequence: Option<usize>,
    score: Option<usize>,
    defline: Option<usize>,
    modifications: Option<usize>,
    charge: Option<usize>,
    theoretical_mass: Option<usize>,
}

/// Zero-based column indices of the identification CSV
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Columns {
    pub scan: usize,
    pub sequence: usize,
    pub score: usize,
    pub defline: usize,
    pub modifications: usize,
    pub charge: usize,
    pub theoretical_mass: usize,
}

impl Default for Columns {
    /// OMSSA CSV layout
    fn default() -> Self {
        Columns {
            scan: 0,
            sequence: 2,
            score: 3,
            defline: 9,
            modifications: 10,
            charge: 11,
            theoretical_mass: 12,
        }
    }
}

impl From<ColumnOptions> for Columns {
    fn from(value: ColumnOptions) -> Self {
        let default = Columns::default();
        Columns {
            scan: value.scan.unwrap_or(default.scan),
            sequence: value.sequence.unwrap_or(default.sequence),
            score: value.score.unwrap_or(default.score),
            defline: value.defline.unwrap_or(default.defline),
            modifications: value.modifications.unwrap_or(default.modifications),
            charge: value.charge.unwrap_or(default.charge),
            theoretical_mass: value.theoretical_mass.unwrap_or(default.theoretical_mass),
        }
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(spectra_directory) = matches.get_one::<String>("spectra_directory") {
            log::trace!("overriding `spectra_directory` parameter.");
            input.spectra_directory = Some(spectra_directory.into());
        }
        if let Some(input_paths) = matches.get_many::<String>("input_paths") {
            log::trace!("overriding `input_paths` parameter.");
            input.input_paths = Some(input_paths.into_iter().map(|p| p.into()).collect());
        }
        if matches.get_flag("unique") {
            log::trace!("overriding `counting` parameter.");
            input.counting = Some(Counting::Unique);
        }

        ensure!(
            input.input_paths.as_ref().is_some_and(|p| !p.is_empty()),
            "`input_paths` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        thresher_spectra::util::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Search> {
        let default = Settings::default();
        let settings = Settings {
            polarity: self.score_polarity.unwrap_or(default.polarity),
            max_precursor_tolerance: self
                .max_precursor_ppm
                .unwrap_or(default.max_precursor_tolerance),
            tolerance_increment: self
                .precursor_ppm_increment
                .unwrap_or(default.tolerance_increment),
            max_fdr: self.max_fdr.unwrap_or(default.max_fdr),
            counting: self.counting.unwrap_or(default.counting),
            isotope_errors: self.isotope_errors.unwrap_or(default.isotope_errors),
        };
        settings.validate()?;

        if settings.max_fdr > 10.0 {
            log::warn!(
                "`max_fdr` is a percentage: {}% is higher than expected",
                settings.max_fdr
            );
        }
        if settings.max_precursor_tolerance / settings.tolerance_increment > 10_000.0 {
            log::warn!(
                "searching {} precursor tolerances, consider a larger `precursor_ppm_increment`",
                (settings.max_precursor_tolerance / settings.tolerance_increment) as usize
            );
        }

        let decoy_tags = self
            .decoy_tags
            .unwrap_or_else(|| vec!["DECOY".into(), "REVERSED".into()]);
        ensure!(
            decoy_tags.iter().all(|tag| !tag.is_empty()),
            "`decoy_tags` must not contain empty tags"
        );

        let input_paths = self
            .input_paths
            .context("'input_paths' must be provided!")?;

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path)?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Search {
            version: clap::crate_version!().into(),
            settings,
            input_paths,
            spectra_directory: self.spectra_directory,
            decoy_tags,
            columns: self.columns.map(Into::into).unwrap_or_default(),
            overall_outputs: self.overall_outputs.unwrap_or(true),
            phospho_outputs: self.phospho_outputs.unwrap_or(false),
            output_paths: Vec::new(),
            output_directory,
        })
    }
}
