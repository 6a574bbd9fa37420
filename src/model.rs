use crate::cache::{self, CacheError, Level, LevelMap, RatioLevels};
use crate::config::Colors;
use crate::plot::{LegendEntry, LineStyle, RatioMap, SeriesMap, SeriesStyle};
use crate::stats;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Aggregate series of the reference encoder/decoder.
pub const BASELINE: &str = "baseline";
/// Aggregate series of the implementation under test.
pub const CANDIDATE: &str = "swift";
/// Image whose numbers are called out separately in the report.
pub const DEFAULT_HIGHLIGHT: &str = "rgb8-color-photographic";
/// Prefix of the per-toolchain series in the historical cache, eg. `nightly-2020-05-03-a`.
pub const TOOLCHAIN: &str = "nightly";
/// Compression level the toolchain history is measured at.
pub const HISTORICAL_LEVEL: u32 = 8;

pub fn baseline_name(image: &str) -> String {
    format!("{}-{}", BASELINE, image)
}

pub fn candidate_name(image: &str) -> String {
    format!("{}-{}", CANDIDATE, image)
}

/// Image name of a per-image series (`baseline-<image>` or `swift-<image>`).
pub fn image_of(series: &str) -> Option<&str> {
    [BASELINE, CANDIDATE]
        .iter()
        .find_map(|prefix| series.strip_prefix(prefix)?.strip_prefix('-'))
        .filter(|image| !image.is_empty())
}

pub fn toolchain_name(toolchain: &str) -> String {
    format!("{}-{}", TOOLCHAIN, toolchain)
}

/// Toolchain of a historical series (`nightly-<toolchain>`).
pub fn toolchain_of(series: &str) -> Option<&str> {
    series
        .strip_prefix(TOOLCHAIN)?
        .strip_prefix('-')
        .filter(|toolchain| !toolchain.is_empty())
}

/// Toolchains in a historical cache, in file order.
pub fn toolchains(series: &SeriesMap) -> Vec<String> {
    series
        .keys()
        .filter_map(|name| toolchain_of(name))
        .map(ToOwned::to_owned)
        .collect()
}

fn add_image(images: &mut Vec<String>, image: &str) {
    if !images.iter().any(|known| known == image) {
        images.push(image.to_owned());
    }
}

/// Curve styles for the aggregate and per-image series.
///
/// Aggregates come first, then for each image its baseline and candidate curves. The highlighted
/// image's candidate curve is dashed and moved ahead of all solid curves. Renderers should draw
/// the result in reverse so that the highlight and the aggregates end up on top.
pub fn assign_styles(
    images: &[String],
    highlight: Option<&str>,
    colors: &Colors,
) -> Vec<SeriesStyle> {
    let mut solid = vec![
        SeriesStyle::new(CANDIDATE, &colors.candidate, LineStyle::Solid),
        SeriesStyle::new(BASELINE, &colors.baseline, LineStyle::Solid),
    ];
    let mut dashed = vec![];
    for image in images {
        solid.push(SeriesStyle::new(
            &baseline_name(image),
            &colors.baseline_image,
            LineStyle::Solid,
        ));
        if highlight == Some(image.as_str()) {
            dashed.push(SeriesStyle::new(
                &candidate_name(image),
                &colors.highlight,
                LineStyle::Dashed,
            ));
        } else {
            solid.push(SeriesStyle::new(
                &candidate_name(image),
                &colors.candidate_image,
                LineStyle::Solid,
            ));
        }
    }
    dashed.extend(solid);
    dashed
}

pub fn legend(baseline_label: &str, candidate_label: &str) -> Vec<LegendEntry> {
    vec![
        LegendEntry::new(BASELINE, baseline_label),
        LegendEntry::new(CANDIDATE, candidate_label),
    ]
}

/// Curve styles for the toolchain history: the baseline first, then one solid curve per
/// toolchain in the given (oldest first) order.
///
/// The gradient is aligned to the newest toolchain, which gets its last color. Toolchains older
/// than the gradient reaches share its first color.
pub fn assign_toolchain_styles(toolchains: &[String], colors: &Colors) -> Vec<SeriesStyle> {
    let gradient = &colors.toolchains;
    let mut styles = vec![SeriesStyle::new(
        BASELINE,
        &colors.baseline,
        LineStyle::Solid,
    )];
    for (i, toolchain) in toolchains.iter().enumerate() {
        let color = (gradient.len() + i)
            .checked_sub(toolchains.len())
            .and_then(|index| gradient.get(index))
            .or_else(|| gradient.first())
            .unwrap_or(&colors.candidate);
        styles.push(SeriesStyle::new(
            &toolchain_name(toolchain),
            color,
            LineStyle::Solid,
        ));
    }
    styles
}

pub fn toolchain_legend(toolchains: &[String], baseline_label: &str) -> Vec<LegendEntry> {
    let mut legend = vec![LegendEntry::new(BASELINE, baseline_label)];
    legend.extend(
        toolchains
            .iter()
            .map(|toolchain| LegendEntry::new(&toolchain_name(toolchain), toolchain)),
    );
    legend
}

/// Divides every series by the median of the `baseline` series. Returns `None` when there is no
/// baseline to divide by.
pub fn normalize_to_baseline(series: &SeriesMap) -> Option<SeriesMap> {
    let reference = series.get(BASELINE)?;
    series
        .iter()
        .map(|(name, samples)| Some((name.clone(), stats::normalize(samples, reference)?)))
        .collect()
}

/// Encoded size of the candidate relative to the baseline, per image, in `images` order. Images
/// missing either size are left out.
pub fn compare_sizes(level: &Level, images: &[String]) -> RatioMap {
    let size = |name: String| level.get(&name).and_then(|measurement| measurement.size);

    let mut ratios = RatioMap::new();
    for image in images {
        match (size(candidate_name(image)), size(baseline_name(image))) {
            (Some(candidate), Some(baseline)) if baseline > 0 => {
                ratios.insert(image.clone(), candidate as f64 / baseline as f64);
            }
            _ => debug!("No file size comparison available for image {}", image),
        }
    }
    ratios
}

/// Timing samples of one compression level, by series name.
pub fn level_series(level: &Level) -> SeriesMap {
    level
        .iter()
        .map(|(name, measurement)| (name.clone(), measurement.samples.clone()))
        .collect()
}

/// Rescales every image's series so that its baseline median is 1.0, and rebuilds the aggregate
/// series by concatenating the rescaled images in order. Data that was already normalized by the
/// harness comes back unchanged. When no per-image series are present the input is returned as is.
pub fn normalize_images(series: &SeriesMap, images: &[String]) -> SeriesMap {
    let mut aggregate_baseline = vec![];
    let mut aggregate_candidate = vec![];
    let mut per_image = SeriesMap::new();

    for image in images {
        let (baseline, candidate) = (baseline_name(image), candidate_name(image));
        let reference = match series.get(&baseline) {
            Some(reference) if !reference.is_empty() => reference,
            _ => {
                warn!("No {} measurements; leaving image {} out", BASELINE, image);
                continue;
            }
        };

        if let Some(normalized) = stats::normalize(reference, reference) {
            aggregate_baseline.extend_from_slice(&normalized);
            per_image.insert(baseline, normalized);
        }
        if let Some(normalized) = series
            .get(&candidate)
            .and_then(|samples| stats::normalize(samples, reference))
        {
            aggregate_candidate.extend_from_slice(&normalized);
            per_image.insert(candidate, normalized);
        }
    }

    if per_image.is_empty() {
        return series.clone();
    }
    let mut normalized = SeriesMap::new();
    normalized.insert(BASELINE.to_owned(), aggregate_baseline);
    normalized.insert(CANDIDATE.to_owned(), aggregate_candidate);
    normalized.extend(per_image);
    normalized
}

#[derive(Debug, PartialEq)]
pub struct TrialCountMismatch {
    pub path: PathBuf,
    pub found: usize,
    pub expected: usize,
}
impl fmt::Display for TrialCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file '{}' has only {} measurements per test case (expected {})",
            self.path.display(),
            self.found,
            self.expected
        )
    }
}
impl std::error::Error for TrialCountMismatch {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// Length of the shortest series, or `None` when there are no series at all.
pub fn shortest<'a, I>(series: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    series.into_iter().map(<[f64]>::len).min()
}

/// Checks that the shortest series loaded from `path` has exactly `expected` samples.
pub fn check_trials<'a, I>(
    path: &Path,
    series: I,
    expected: usize,
) -> Result<(), TrialCountMismatch>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let found = shortest(series).unwrap_or(0);
    if found != expected {
        return Err(TrialCountMismatch {
            path: path.to_owned(),
            found,
            expected,
        });
    }
    Ok(())
}

/// A parsed cache file and where it came from.
#[derive(Debug)]
pub struct Cached<T> {
    pub path: PathBuf,
    pub data: T,
}

/// Everything the report reads from a data directory. Caches that don't exist are `None`.
#[derive(Debug, Default)]
pub struct Model {
    pub decompression: Option<Cached<SeriesMap>>,
    pub compression: Option<Cached<LevelMap>>,
    pub crunch: Option<Cached<RatioLevels>>,
    pub historical: Option<Cached<SeriesMap>>,
}
impl Model {
    pub fn load(data_directory: &Path) -> Result<Model> {
        Ok(Model {
            decompression: load_cache(
                &data_directory.join(cache::DECOMPRESSION_CACHE),
                cache::load_series,
            )?,
            compression: load_cache(
                &data_directory.join(cache::COMPRESSION_CACHE),
                cache::load_leveled,
            )?,
            crunch: load_cache(&data_directory.join(cache::CRUNCH_CACHE), cache::load_ratios)?,
            historical: load_cache(
                &data_directory.join(cache::HISTORICAL_CACHE),
                cache::load_series,
            )?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.decompression.is_none()
            && self.compression.is_none()
            && self.crunch.is_none()
            && self.historical.is_none()
    }

    /// Image names mentioned in any cache, in order of first appearance. The historical cache
    /// measures a single image and names toolchains instead.
    pub fn images(&self) -> Vec<String> {
        let mut images = vec![];
        if let Some(cached) = &self.decompression {
            for image in cached.data.keys().filter_map(|name| image_of(name)) {
                add_image(&mut images, image);
            }
        }
        if let Some(cached) = &self.compression {
            let names = cached.data.values().flat_map(|level| level.keys());
            for image in names.filter_map(|name| image_of(name)) {
                add_image(&mut images, image);
            }
        }
        if let Some(cached) = &self.crunch {
            for image in cached.data.values().flat_map(|ratios| ratios.keys()) {
                add_image(&mut images, image);
            }
        }
        images
    }
}

fn load_cache<T>(
    path: &Path,
    parse: fn(&str) -> Result<T, CacheError>,
) -> Result<Option<Cached<T>>> {
    if !path.exists() {
        warn!("Cache file {:?} not found, skipping", path);
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file {:?}", path))?;
    let data = parse(&text).with_context(|| format!("Failed to parse cache file {:?}", path))?;
    info!("Loaded {:?}", path);
    Ok(Some(Cached {
        path: path.to_owned(),
        data,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::Measurement;

    fn images(names: &[&str]) -> Vec<String> {
        names.iter().map(|&name| name.to_owned()).collect()
    }

    #[test]
    fn test_image_of() {
        assert_eq!(
            image_of("baseline-rgb8-color-photographic"),
            Some("rgb8-color-photographic")
        );
        assert_eq!(image_of("swift-va8"), Some("va8"));
        assert_eq!(image_of("swift"), None);
        assert_eq!(image_of("baseline-"), None);
        assert_eq!(image_of("swiftly-va8"), None);
    }

    #[test]
    fn test_assign_styles() {
        let colors = Colors::default();
        let styles = assign_styles(
            &images(&["va8", "rgb8-color-photographic"]),
            Some(DEFAULT_HIGHLIGHT),
            &colors,
        );
        let names: Vec<&str> = styles.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "swift-rgb8-color-photographic",
                "swift",
                "baseline",
                "baseline-va8",
                "swift-va8",
                "baseline-rgb8-color-photographic",
            ]
        );
        assert_eq!(styles[0].line, LineStyle::Dashed);
        assert_eq!(styles[0].color, "#ff694eff");
        assert_eq!(styles[1].color, "#ff694eff");
        assert_eq!(styles[2].color, "#888888ff");
        assert_eq!(styles[3].color, "#dddddd80");
        assert_eq!(styles[4].color, "#ffbf9d80");
        assert!(styles[1..].iter().all(|s| s.line == LineStyle::Solid));
    }

    #[test]
    fn test_assign_styles_without_highlight() {
        let styles = assign_styles(&images(&["va8"]), None, &Colors::default());
        assert_eq!(styles.len(), 4);
        assert!(styles.iter().all(|s| s.line == LineStyle::Solid));
    }

    #[test]
    fn test_toolchains() {
        let mut series = SeriesMap::new();
        series.insert("baseline".to_owned(), vec![1.0]);
        series.insert("nightly-2020-05-03-a".to_owned(), vec![2.0]);
        series.insert("nightly-".to_owned(), vec![2.0]);
        series.insert("nightly-2020-12-05-a".to_owned(), vec![1.5]);
        assert_eq!(
            toolchains(&series),
            images(&["2020-05-03-a", "2020-12-05-a"])
        );
        assert_eq!(toolchain_of("nightlyx"), None);
    }

    #[test]
    fn test_assign_toolchain_styles() {
        let colors = Colors::default();
        let styles = assign_toolchain_styles(&images(&["old", "new"]), &colors);
        let entries: Vec<(&str, &str)> = styles
            .iter()
            .map(|s| (s.name.as_str(), s.color.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("baseline", "#888888ff"),
                ("nightly-old", "#ffa34eff"),
                ("nightly-new", "#ff694eff"),
            ]
        );
        assert!(styles.iter().all(|s| s.line == LineStyle::Solid));
    }

    #[test]
    fn test_assign_toolchain_styles_past_the_gradient() {
        let mut colors = Colors::default();
        colors.toolchains = vec!["#000001ff".to_owned(), "#000002ff".to_owned()];
        let styles = assign_toolchain_styles(&images(&["a", "b", "c"]), &colors);
        let colors: Vec<&str> = styles[1..].iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, vec!["#000001ff", "#000001ff", "#000002ff"]);

        let mut empty = Colors::default();
        empty.toolchains.clear();
        let styles = assign_toolchain_styles(&images(&["a"]), &empty);
        assert_eq!(styles[1].color, empty.candidate);
    }

    #[test]
    fn test_toolchain_legend() {
        let legend = toolchain_legend(&images(&["2020-05-03-a"]), "libpng");
        assert_eq!(
            legend,
            vec![
                LegendEntry::new("baseline", "libpng"),
                LegendEntry::new("nightly-2020-05-03-a", "2020-05-03-a"),
            ]
        );
    }

    #[test]
    fn test_normalize_to_baseline() {
        let mut series = SeriesMap::new();
        series.insert("nightly-a".to_owned(), vec![4.0, 6.0]);
        series.insert("baseline".to_owned(), vec![1.0, 2.0, 3.0]);
        let normalized = normalize_to_baseline(&series).unwrap();
        let names: Vec<&str> = normalized.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["nightly-a", "baseline"]);
        assert_eq!(normalized["nightly-a"], vec![2.0, 3.0]);
        assert_eq!(normalized["baseline"], vec![0.5, 1.0, 1.5]);

        series.insert("baseline".to_owned(), vec![]);
        assert_eq!(normalize_to_baseline(&series), None);
        series.remove("baseline");
        assert_eq!(normalize_to_baseline(&series), None);
    }

    #[test]
    fn test_compare_sizes() {
        let mut level = Level::new();
        let sized = |size| Measurement {
            samples: vec![1.0],
            size: Some(size),
        };
        level.insert("baseline-a".to_owned(), sized(1000));
        level.insert("swift-a".to_owned(), sized(900));
        level.insert("baseline-b".to_owned(), sized(400));
        level.insert("swift-b".to_owned(), sized(500));
        level.insert("swift-c".to_owned(), sized(10));
        level.insert("swift".to_owned(), Measurement::default());

        let ratios = compare_sizes(&level, &images(&["b", "a", "c"]));
        let entries: Vec<(&str, f64)> = ratios.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        assert_eq!(entries, vec![("b", 1.25), ("a", 0.9)]);
    }

    #[test]
    fn test_normalize_images() {
        let mut series = SeriesMap::new();
        series.insert("baseline".to_owned(), vec![]);
        series.insert("swift".to_owned(), vec![]);
        series.insert("baseline-a".to_owned(), vec![2.0, 4.0, 6.0]);
        series.insert("swift-a".to_owned(), vec![2.0, 3.0]);
        series.insert("baseline-b".to_owned(), vec![10.0]);
        series.insert("swift-b".to_owned(), vec![5.0]);

        let normalized = normalize_images(&series, &images(&["a", "b"]));
        assert_eq!(normalized["baseline-a"], vec![0.5, 1.0, 1.5]);
        assert_eq!(normalized["swift-a"], vec![0.5, 0.75]);
        assert_eq!(normalized["baseline"], vec![0.5, 1.0, 1.5, 1.0]);
        assert_eq!(normalized["swift"], vec![0.5, 0.75, 0.5]);

        // Normalizing twice changes nothing.
        assert_eq!(normalize_images(&normalized, &images(&["a", "b"])), normalized);
    }

    #[test]
    fn test_normalize_aggregates_only() {
        let mut series = SeriesMap::new();
        series.insert("baseline".to_owned(), vec![1.0, 1.1]);
        series.insert("swift".to_owned(), vec![0.5]);
        assert_eq!(normalize_images(&series, &[]), series);
    }

    #[test]
    fn test_check_trials() {
        let series: Vec<Vec<f64>> = vec![vec![1.0; 10], vec![1.0; 8]];
        let path = Path::new("data/decompression.data");
        let error = check_trials(path, series.iter().map(Vec::as_slice), 10).unwrap_err();
        assert_eq!(
            error.to_string(),
            "file 'data/decompression.data' has only 8 measurements per test case (expected 10)"
        );
        assert!(check_trials(path, series.iter().map(Vec::as_slice), 8).is_ok());
    }

    #[test]
    fn test_model_images_in_first_appearance_order() {
        let mut decompression = SeriesMap::new();
        decompression.insert("baseline".to_owned(), vec![1.0]);
        decompression.insert("baseline-b".to_owned(), vec![1.0]);
        decompression.insert("swift-a".to_owned(), vec![1.0]);
        let mut crunch = RatioLevels::new();
        crunch.insert(10, RatioMap::new());
        crunch.get_mut(&10).unwrap().insert("c".to_owned(), 0.9);
        crunch.get_mut(&10).unwrap().insert("a".to_owned(), 0.9);

        let model = Model {
            decompression: Some(Cached {
                path: PathBuf::from("decompression.data"),
                data: decompression,
            }),
            compression: None,
            crunch: Some(Cached {
                path: PathBuf::from("crunch.data"),
                data: crunch,
            }),
            historical: None,
        };
        assert_eq!(model.images(), images(&["b", "a", "c"]));
    }

    #[test]
    fn test_load_missing_caches() {
        let directory = tempfile::tempdir().unwrap();
        let model = Model::load(directory.path()).unwrap();
        assert!(model.is_empty());
    }

    #[test]
    fn test_load_historical_cache() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(
            directory.path().join("historical.data"),
            "baseline:1.0\nnightly-2020-05-03-a:1.9\n",
        )
        .unwrap();
        let model = Model::load(directory.path()).unwrap();
        assert!(!model.is_empty());
        assert!(model.images().is_empty());
        let historical = model.historical.unwrap();
        assert_eq!(toolchains(&historical.data), images(&["2020-05-03-a"]));
    }

    #[test]
    fn test_load_reports_file_and_line() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(directory.path().join("crunch.data"), "10:a:0.9\n10:b:x\n").unwrap();
        let error = Model::load(directory.path()).unwrap_err();
        let message = format!("{:#}", error);
        assert!(message.contains("crunch.data"));
        assert!(message.contains("Line 2"));
    }
}
