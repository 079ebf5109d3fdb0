use clap::{value_parser, Arg, Command, ValueHint};
use rayon::ThreadPoolBuilder;
use thresher_cli::input::Input;
use thresher_cli::runner::{LogObserver, Runner};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("THRESHER_LOG", "error,thresher=info"))
        .init();

    let matches = Command::new("thresher")
        .version(clap::crate_version!())
        .author("Michael Lazear <michaellazear92@gmail.com>")
        .about("Batch FDR optimization of database search results")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("input_paths")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Paths to search engine CSV files to process. Overrides input files \
                     listed in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("spectra_directory")
                .short('s')
                .long("spectra-directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Directory searched (recursively) for the mzML files matching each \
                     input. Defaults to the directory of each input.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output-directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where reports will be written. Overrides the directory \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("unique")
                .long("unique")
                .action(clap::ArgAction::SetTrue)
                .help("Count unique peptide sequences, rather than scans, when estimating FDR"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(u16).range(1..))
                .help("Number of threads used for the threshold search (default = # of CPUs)")
                .value_hint(ValueHint::Other),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let threads = matches
        .get_one::<u16>("threads")
        .copied()
        .map(usize::from)
        .unwrap_or_else(num_cpus::get);
    ThreadPoolBuilder::new().num_threads(threads).build_global()?;

    let input = Input::from_arguments(matches)?;
    let runner = input.build().map(Runner::new)?;
    runner.run(&LogObserver)?;

    Ok(())
}
