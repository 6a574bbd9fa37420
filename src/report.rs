//! One report run: read the caches in a data directory, render every plot, and write a summary of
//! the headline numbers to `fields.json`.

use crate::cache::{Level, LevelMap, RatioLevels};
use crate::config::SelfConfig;
use crate::format;
use crate::model::{self, Model, BASELINE, CANDIDATE};
use crate::plot::{Axis, DensityPlot, DifferentialPlot, RatioMap, SeriesMap, SeriesStyle};
use crate::stats;
use crate::svg::Document;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Summary values keyed by field name, eg. `median_compression_speed@9`.
pub type Fields = BTreeMap<String, String>;

pub const FIELDS_FILE: &str = "fields.json";

const DENSITY_SMOOTHING: f64 = 0.6;
const HISTORICAL_SMOOTHING: f64 = 0.25;

fn save<D, P>(data: &D, path: &P) -> Result<()>
where
    D: Serialize + Debug,
    P: AsRef<Path> + Debug,
{
    let buf = serde_json::to_string_pretty(&data)
        .with_context(|| format!("Unable to serialize {:?}", data))?;
    save_string(&buf, path)
}

fn save_string<P>(data: &str, path: &P) -> Result<()>
where
    P: AsRef<Path> + Debug,
{
    use std::io::Write;

    File::create(path)
        .and_then(|mut f| f.write_all(data.as_bytes()))
        .with_context(|| format!("Unable to save file {:?}", path))?;

    Ok(())
}

fn mkdirp<P>(path: &P) -> Result<()>
where
    P: AsRef<Path> + Debug,
{
    std::fs::create_dir_all(path.as_ref())
        .with_context(|| format!("Unable to create directory {:?}", path))?;
    Ok(())
}

/// Writes the configuration a plot was rendered from next to it, when debugging is enabled.
fn debug_context<S: Serialize + Debug>(path: &Path, context: &S) {
    if crate::debug_enabled() {
        let mut context_path = PathBuf::from(path);
        context_path.set_extension("json");
        info!("Writing plot configuration to {:?}", context_path);
        let result = save(context, &context_path);
        if let Err(e) = result {
            error!("Failed to write plot configuration debug output: {}", e);
        }
    }
}

fn save_plot<C: Serialize + Debug>(path: &Path, context: &C, document: &Document) -> Result<()> {
    debug_context(path, context);
    save_string(&document.to_string(), &path)?;
    info!("Wrote {:?}", path);
    Ok(())
}

pub struct Report<'a> {
    config: &'a SelfConfig,
    images: Vec<String>,
    /// Curve styles in drawing order.
    styles: Vec<SeriesStyle>,
}
impl<'a> Report<'a> {
    pub fn new(config: &'a SelfConfig, model: &Model) -> Report<'a> {
        let images = if config.images.is_empty() {
            model.images()
        } else {
            config.images.clone()
        };
        let mut styles =
            model::assign_styles(&images, config.highlight.as_deref(), &config.colors);
        styles.reverse();
        Report {
            config,
            images,
            styles,
        }
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    fn output(&self, file_name: &str) -> PathBuf {
        path!(&self.config.output_directory, file_name)
    }

    fn highlight_series(&self) -> Option<String> {
        self.config
            .highlight
            .as_deref()
            .map(model::candidate_name)
    }

    fn density_plot(&self, title: String, trials: usize, range: f64, major: f64) -> DensityPlot {
        DensityPlot {
            bins: self.config.bins,
            smoothing: self.config.smoothing.unwrap_or(DENSITY_SMOOTHING),
            x: Axis::new((0.0, range), major, 2),
            y: Axis::new((0.0, 0.6), 0.1, 2),
            title: Some(title),
            subtitle: Some(format!("{} trials per test image", trials)),
            label_x: Some("relative run time".to_owned()),
            label_y: Some("density".to_owned()),
            legend: model::legend(&self.config.baseline_label, &self.config.candidate_label),
            styles: self.styles.clone(),
        }
    }

    fn differential_plot(&self, title: String, subtitle: &str) -> DifferentialPlot {
        DifferentialPlot {
            axis: Axis::new((0.0, 1.8), 0.2, 4),
            title: Some(title),
            subtitle: Some(subtitle.to_owned()),
            colors: self.config.colors.differential(),
        }
    }

    /// Median of the aggregate candidate series and of the highlighted image's series.
    fn speed_fields(&self, series: &SeriesMap, suffix: &str, fields: &mut Fields) {
        match series.get(CANDIDATE).and_then(|samples| stats::median(samples)) {
            Some(median) => {
                fields.insert(format!("median_{}", suffix), format::percent(median));
            }
            None => warn!("No {} measurements for {}", CANDIDATE, suffix),
        }
        let highlight = self
            .highlight_series()
            .and_then(|name| series.get(&name))
            .and_then(|samples| stats::median(samples));
        if let Some(median) = highlight {
            fields.insert(format!("highlight_{}", suffix), format::percent(median));
        }
    }

    fn ratio_fields(&self, ratios: &RatioMap, key: String, fields: &mut Fields) {
        let ratio = self
            .config
            .highlight
            .as_ref()
            .and_then(|image| ratios.get(image));
        if let Some(&ratio) = ratio {
            fields.insert(key, format::percent(ratio));
        }
    }

    fn decompression(&self, path: &Path, series: &SeriesMap) -> Result<Fields> {
        let trials = self.check_trials(path, series, self.config.decompression_trials)?;
        let series = model::normalize_images(series, &self.images);

        let plot = self.density_plot("decoding performance".to_owned(), trials, 2.0, 0.2);
        let output = self.output("decompression-speed.svg");
        let document = plot
            .render(&series)
            .with_context(|| format!("Failed to render {:?}", output))?;
        save_plot(&output, &plot, &document)?;

        let mut fields = Fields::new();
        self.speed_fields(&series, "decompression_speed", &mut fields);
        fields.insert(
            "plot_decompression_speed".to_owned(),
            output.display().to_string(),
        );
        Ok(fields)
    }

    fn compression_level(&self, level: u32, data: &Level, trials: usize) -> Result<Fields> {
        let series = model::normalize_images(&model::level_series(data), &self.images);
        let mut fields = Fields::new();

        let plot = self.density_plot(
            format!("encoding performance (level {})", level),
            trials,
            5.0,
            0.5,
        );
        let output = self.output(&format!("compression-speed@{}.svg", level));
        let document = plot
            .render(&series)
            .with_context(|| format!("Failed to render {:?}", output))?;
        save_plot(&output, &plot, &document)?;
        self.speed_fields(&series, &format!("compression_speed@{}", level), &mut fields);
        fields.insert(
            format!("plot_compression_speed@{}", level),
            output.display().to_string(),
        );

        let ratios = model::compare_sizes(data, &self.images);
        if ratios.is_empty() {
            warn!("No file sizes recorded for compression level {}", level);
        }
        let plot = self.differential_plot(
            format!("relative file size (level {})", level),
            "swift png size / libpng size",
        );
        let output = self.output(&format!("compression-size@{}.svg", level));
        let document = plot
            .render(&ratios)
            .with_context(|| format!("Failed to render {:?}", output))?;
        save_plot(&output, &plot, &document)?;
        self.ratio_fields(
            &ratios,
            format!("highlight_compression_ratio@{}", level),
            &mut fields,
        );
        fields.insert(
            format!("plot_compression_ratio@{}", level),
            output.display().to_string(),
        );
        Ok(fields)
    }

    fn compression(&self, path: &Path, levels: &LevelMap) -> Result<Fields> {
        let all_samples = levels
            .values()
            .flat_map(|level| level.values())
            .map(|measurement| measurement.samples.as_slice());
        let trials = match self.config.compression_trials {
            Some(expected) => {
                model::check_trials(path, all_samples, expected)?;
                expected
            }
            None => model::shortest(all_samples).unwrap_or(0),
        };

        let levels: Vec<Fields> = levels
            .par_iter()
            .map(|(&level, data)| self.compression_level(level, data, trials))
            .collect::<Result<_>>()?;
        Ok(levels.into_iter().flatten().collect())
    }

    fn crunch(&self, levels: &RatioLevels) -> Result<Fields> {
        let mut fields = Fields::new();
        for (level, ratios) in levels {
            let ratios: RatioMap = self
                .images
                .iter()
                .filter_map(|image| ratios.get(image).map(|&ratio| (image.clone(), ratio)))
                .collect();

            let plot = self.differential_plot(
                format!("relative file size (level {})", level),
                "swift png size / best libpng size",
            );
            let output = self.output(&format!("crunch-size@{}.svg", level));
            let document = plot
                .render(&ratios)
                .with_context(|| format!("Failed to render {:?}", output))?;
            save_plot(&output, &plot, &document)?;

            self.ratio_fields(
                &ratios,
                format!("highlight_crunch_ratio@{}", level),
                &mut fields,
            );
            fields.insert(
                format!("plot_crunch_ratio@{}", level),
                output.display().to_string(),
            );
        }
        Ok(fields)
    }

    /// Toolchain history: every toolchain's compression times relative to the baseline median, as
    /// an overview plot and a close-up of the range the toolchains fall in.
    fn historical(&self, path: &Path, series: &SeriesMap) -> Result<Fields> {
        let trials = self.check_trials(path, series, self.config.historical_trials)?;
        let series = match model::normalize_to_baseline(series) {
            Some(series) => series,
            None => {
                warn!(
                    "No {} measurements in {:?}, skipping the toolchain history",
                    BASELINE, path
                );
                return Ok(Fields::new());
            }
        };
        let toolchains = model::toolchains(&series);

        let overview = DensityPlot {
            bins: self.config.bins,
            smoothing: self.config.smoothing.unwrap_or(HISTORICAL_SMOOTHING),
            x: Axis::new((0.0, 2.5), 0.5, 2),
            y: Axis::new((0.0, 1.0), 0.25, 2),
            title: Some("encoding performance by swift toolchain".to_owned()),
            subtitle: Some(format!(
                "compression level {}, {} trials per test image",
                model::HISTORICAL_LEVEL,
                trials
            )),
            label_x: Some("relative run time".to_owned()),
            label_y: Some("density".to_owned()),
            legend: model::toolchain_legend(&toolchains, &self.config.baseline_label),
            styles: model::assign_toolchain_styles(&toolchains, &self.config.colors),
        };
        let detail = DensityPlot {
            smoothing: self.config.smoothing.unwrap_or(DENSITY_SMOOTHING),
            x: Axis::new((1.5, 2.0), 0.1, 4),
            y: Axis::new((0.0, 0.25), 0.05, 2),
            title: Some("encoding performance by swift toolchain (detail)".to_owned()),
            ..overview.clone()
        };

        let mut fields = Fields::new();
        let plots = vec![
            (overview, "densityplot-historical.svg", "plot_historical_speed"),
            (
                detail,
                "densityplot-historical-detail.svg",
                "plot_historical_speed_detail",
            ),
        ];
        for (plot, file_name, key) in plots {
            let output = self.output(file_name);
            let document = plot
                .render(&series)
                .with_context(|| format!("Failed to render {:?}", output))?;
            save_plot(&output, &plot, &document)?;
            fields.insert(key.to_owned(), output.display().to_string());
        }
        let listing: Vec<String> = toolchains
            .iter()
            .map(|toolchain| format!("- `DEVELOPMENT-SNAPSHOT-{}`", toolchain))
            .collect();
        fields.insert("historical_toolchains".to_owned(), listing.join("\n"));
        Ok(fields)
    }

    /// Validates the trial count when one is configured; otherwise reports the shortest series.
    fn check_trials(
        &self,
        path: &Path,
        series: &SeriesMap,
        expected: Option<usize>,
    ) -> Result<usize> {
        let samples = series.values().map(Vec::as_slice);
        match expected {
            Some(expected) => {
                model::check_trials(path, samples, expected)?;
                Ok(expected)
            }
            None => Ok(model::shortest(samples).unwrap_or(0)),
        }
    }

    /// Renders every plot the model has data for and returns the summary fields.
    pub fn generate(&self, model: &Model) -> Result<Fields> {
        mkdirp(&self.config.output_directory)?;

        let mut fields = Fields::new();
        fields.insert("images".to_owned(), self.images.len().to_string());

        if let Some(cached) = &model.decompression {
            fields.extend(elapsed!(
                "Rendering decompression plots",
                self.decompression(&cached.path, &cached.data)
            )?);
        }
        if let Some(cached) = &model.compression {
            fields.extend(elapsed!(
                "Rendering compression plots",
                self.compression(&cached.path, &cached.data)
            )?);
        }
        match &model.crunch {
            Some(cached) if self.config.do_crunch => {
                fields.extend(elapsed!("Rendering crunch plots", self.crunch(&cached.data))?);
            }
            Some(_) => info!("Skipping crunch plots"),
            None => {}
        }
        if let Some(cached) = &model.historical {
            fields.extend(elapsed!(
                "Rendering toolchain history plots",
                self.historical(&cached.path, &cached.data)
            )?);
        }

        let output = self.output(FIELDS_FILE);
        save(&fields, &output)?;
        info!("Wrote {:?}", output);
        Ok(fields)
    }
}

/// Loads the caches under the configured data directory and writes the full report.
pub fn run(config: &SelfConfig) -> Result<Fields> {
    let model = Model::load(&config.data_directory)?;
    if model.is_empty() {
        anyhow::bail!("No benchmark caches found in {:?}", config.data_directory);
    }
    let report = Report::new(config, &model);
    info!(
        "Reporting on {} images: {}",
        report.images().len(),
        report.images().join(", ")
    );
    report.generate(&model)
}
