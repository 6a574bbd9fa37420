use crate::model::DEFAULT_HIGHLIGHT;
use crate::plot::DifferentialColors;
use anyhow::{Context, Result};
use std::borrow::ToOwned;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Stroke and fill colors used in the plots, as CSS color strings.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Colors {
    /// Aggregate curve of the implementation under test. Defaults to #ff694eff
    pub candidate: String,
    /// Aggregate curve of the reference implementation. Defaults to #888888ff
    pub baseline: String,
    /// Dashed curve of the highlighted image. Defaults to #ff694eff
    pub highlight: String,
    /// Per-image reference curves. Defaults to #dddddd80
    pub baseline_image: String,
    /// Per-image curves of the implementation under test. Defaults to #ffbf9d80
    pub candidate_image: String,
    /// Dots and stems of improvements in differential plots. Defaults to #ff694eff
    pub fill_better: String,
    /// Dots and stems of regressions in differential plots. Defaults to #888888ff
    pub fill_worse: String,
    /// Percent labels of improvements. Defaults to #ff694eff
    pub text_better: String,
    /// Percent labels of regressions. Defaults to #666666ff
    pub text_worse: String,
    /// Toolchain history curves, oldest to newest. The newest toolchain takes the last color.
    pub toolchains: Vec<String>,
}
impl Default for Colors {
    fn default() -> Self {
        let differential = DifferentialColors::default();
        Self {
            candidate: "#ff694eff".to_owned(),
            baseline: "#888888ff".to_owned(),
            highlight: "#ff694eff".to_owned(),
            baseline_image: "#dddddd80".to_owned(),
            candidate_image: "#ffbf9d80".to_owned(),
            fill_better: differential.fill_better,
            fill_worse: differential.fill_worse,
            text_better: differential.text_better,
            text_worse: differential.text_worse,
            toolchains: [
                "#b2a77fff",
                "#dfc47cff",
                "#e9ce77ff",
                "#ffdb6cff",
                "#ffa34eff",
                "#ff694eff",
            ]
            .iter()
            .map(|&color| color.to_owned())
            .collect(),
        }
    }
}
impl Colors {
    pub fn differential(&self) -> DifferentialColors {
        DifferentialColors {
            fill_better: self.fill_better.clone(),
            fill_worse: self.fill_worse.clone(),
            text_better: self.text_better.clone(),
            text_worse: self.text_worse.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
/// Struct to hold the various configuration settings that we can read from the TOML config file.
struct TomlConfig {
    /// Path to output directory
    pub output_directory: Option<PathBuf>,
    /// Image called out separately in plots and in the summary
    pub highlight: Option<String>,
    /// Images to report on, in plot order
    pub images: Option<Vec<String>>,
    /// Legend label of the reference implementation
    pub baseline_label: Option<String>,
    /// Legend label of the implementation under test
    pub candidate_label: Option<String>,
    /// Density plot resolution
    pub bins: Option<usize>,
    /// Kernel bandwidth in bins; replaces every plot's own bandwidth
    pub smoothing: Option<f64>,

    /// The colors used for the charts. Users may wish to override this to accommodate
    /// colorblindness, or just to make things look prettier.
    pub colors: Colors,
}

/// Struct to hold the various configuration settings for the report itself.
#[derive(Debug)]
pub struct SelfConfig {
    /// Directory holding the cache files
    pub data_directory: PathBuf,
    /// The path to the output directory
    pub output_directory: PathBuf,
    /// Images to report on. Empty means every image found in the caches.
    pub images: Vec<String>,
    /// Image called out separately. `None` disables the highlight.
    pub highlight: Option<String>,
    pub baseline_label: String,
    pub candidate_label: String,
    /// Density plot resolution
    pub bins: usize,
    /// Overrides the per-plot kernel bandwidth
    pub smoothing: Option<f64>,
    /// Expected number of decompression samples per series, if it should be checked
    pub decompression_trials: Option<usize>,
    /// Expected number of compression samples per series, if it should be checked
    pub compression_trials: Option<usize>,
    /// Expected number of samples per toolchain in historical.data, if it should be checked
    pub historical_trials: Option<usize>,
    /// Should we render the crunch plots?
    pub do_crunch: bool,
    /// The colors to use for charts.
    pub colors: Colors,
}

/// Overall struct that represents all of the configuration data for this run.
#[derive(Debug)]
pub struct FullConfig {
    /// The config settings for the report
    pub self_config: SelfConfig,
    /// How many times `-v` was given
    pub verbosity: u64,
}

fn parse_count(matches: &clap::ArgMatches<'_>, name: &str) -> Result<Option<usize>> {
    matches
        .value_of(name)
        .map(|value| {
            value
                .parse()
                .with_context(|| format!("Invalid value {:?} for --{}", value, name))
        })
        .transpose()
}

/// Parse the command-line arguments, load the pngbench.toml config file, and generate a
/// configuration object used for the rest of the run.
pub fn configure() -> Result<FullConfig, anyhow::Error> {
    use clap::{App, AppSettings, Arg};

    let matches = App::new("pngbench-report")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render SVG plots and a summary from cached PNG codec benchmark results")
        .settings(&[
            AppSettings::UnifiedHelpMessage,
            AppSettings::DeriveDisplayOrder,
        ])
        .arg(
            Arg::with_name("DATA_DIR")
                .required(true)
                .help("Directory containing the decompression, compression, crunch and historical caches"),
        )
        .arg(
            Arg::with_name("output")
                .long("--output")
                .short("o")
                .takes_value(true)
                .value_name("DIRECTORY")
                .help("Directory to write the plots and fields.json to, defaults to DATA_DIR"),
        )
        .arg(
            Arg::with_name("config")
                .long("--config")
                .takes_value(true)
                .value_name("PATH")
                .help("Path to pngbench.toml"),
        )
        .arg(
            Arg::with_name("image")
                .long("--image")
                .takes_value(true)
                .value_name("NAME")
                .multiple(true)
                .number_of_values(1)
                .help("Report only the specified image; may be repeated, plots follow this order"),
        )
        .arg(
            Arg::with_name("highlight")
                .long("--highlight")
                .takes_value(true)
                .value_name("NAME")
                .help("Image to call out separately in the plots and summary"),
        )
        .arg(
            Arg::with_name("decompression-trials")
                .long("--decompression-trials")
                .takes_value(true)
                .value_name("N")
                .help("Fail unless every decompression series has exactly N samples"),
        )
        .arg(
            Arg::with_name("compression-trials")
                .long("--compression-trials")
                .takes_value(true)
                .value_name("N")
                .help("Fail unless every compression series has exactly N samples"),
        )
        .arg(
            Arg::with_name("historical-trials")
                .long("--historical-trials")
                .takes_value(true)
                .value_name("N")
                .help("Fail unless every toolchain series in historical.data has exactly N samples"),
        )
        .arg(
            Arg::with_name("no-crunch")
                .long("--no-crunch")
                .help("Don't render plots from crunch.data"),
        )
        .arg(
            Arg::with_name("verbose")
                .long("--verbose")
                .short("v")
                .multiple(true)
                .help("Use verbose output (-vv very verbose)"),
        )
        .after_help(
            "\
Set the PNGBENCH_HOME environment variable to override the output directory. Set PNGBENCH_DEBUG
to log everything and to write each plot's configuration as JSON next to the SVG.
",
        )
        .get_matches();

    // Load the config file.
    let config_file: PathBuf = matches
        .value_of_os("config")
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| {
            // Support both capitalized and un-capitalized configuration files.
            if PathBuf::from("Pngbench.toml").exists() {
                "Pngbench.toml".into()
            } else {
                "pngbench.toml".into()
            }
        })
        .into();

    let toml_config = load_toml_file(&config_file)?;

    let data_directory: PathBuf = matches
        .value_of_os("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    // Set the output directory to (in descending order of preference):
    // - $PNGBENCH_HOME
    // - --output
    // - The value from the config file
    // - The data directory
    let output_directory = if let Some(value) = std::env::var_os("PNGBENCH_HOME") {
        PathBuf::from(value)
    } else if let Some(value) = matches.value_of_os("output") {
        PathBuf::from(value)
    } else if let Some(directory) = toml_config.output_directory {
        directory
    } else {
        data_directory.clone()
    };

    let images = matches
        .values_of("image")
        .map(|values| values.map(ToOwned::to_owned).collect())
        .or(toml_config.images)
        .unwrap_or_default();

    let highlight = matches
        .value_of("highlight")
        .map(ToOwned::to_owned)
        .or(toml_config.highlight)
        .unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_owned());

    let self_config = SelfConfig {
        data_directory,
        output_directory,
        images,
        highlight: Some(highlight).filter(|name| !name.is_empty()),
        baseline_label: toml_config
            .baseline_label
            .unwrap_or_else(|| "libpng".to_owned()),
        candidate_label: toml_config
            .candidate_label
            .unwrap_or_else(|| "swift png".to_owned()),
        bins: toml_config.bins.unwrap_or(40),
        smoothing: toml_config.smoothing,
        decompression_trials: parse_count(&matches, "decompression-trials")?,
        compression_trials: parse_count(&matches, "compression-trials")?,
        historical_trials: parse_count(&matches, "historical-trials")?,
        do_crunch: !matches.is_present("no-crunch"),
        colors: toml_config.colors,
    };

    let configuration = FullConfig {
        self_config,
        verbosity: matches.occurrences_of("verbose"),
    };
    Ok(configuration)
}

/// Load & parse the pngbench.toml file (if present).
fn load_toml_file(toml_path: &Path) -> Result<TomlConfig, anyhow::Error> {
    if !toml_path.exists() {
        return Ok(TomlConfig::default());
    };

    let mut file = File::open(toml_path)
        .with_context(|| format!("Failed to open config file {:?}", toml_path))?;

    let mut str_buf = String::new();
    file.read_to_string(&mut str_buf)
        .with_context(|| format!("Failed to read config file {:?}", toml_path))?;

    let config: TomlConfig = toml::from_str(&str_buf)
        .with_context(|| format!("Failed to parse config file {:?}", toml_path))?;
    Ok(config)
}
