//! Smoothed probability-density curves of one or more sample series.

use linked_hash_map::LinkedHashMap;

use super::{
    draw_horizontal_axis, shift, top_margin, Affine, Axis, Edge, Layers, Layout, LegendEntry,
    LineStyle, SeriesStyle, COMMON_RULES,
};
use crate::format;
use crate::stats::kde::{Gaussian, Kde};
use crate::svg::{self, Document, MarkupError, Point, Rule, StaticRules, Stylesheet};

/// Series name to samples, in caller order.
pub type SeriesMap = LinkedHashMap<String, Vec<f64>>;

pub const DENSITY_DISPLAY: [u32; 2] = [800, 400];

/// Number of curve points evaluated per bin.
const POINTS_PER_BIN: usize = 20;

const LEGEND_SPACING: f64 = 20.0;

static DENSITY_RULES: StaticRules = &[
    (
        "text.label-x",
        &[("text-anchor", "middle"), ("dominant-baseline", "hanging")],
    ),
    (
        "text.label-y",
        &[("text-anchor", "end"), ("dominant-baseline", "middle")],
    ),
    (
        "text.label-legend",
        &[
            ("font-size", "12px"),
            ("text-anchor", "begin"),
            ("dominant-baseline", "middle"),
        ],
    ),
    (
        "text.label-axis",
        &[("font-size", "14px"), ("font-weight", "700")],
    ),
    (
        "text.label-vertical.label-y",
        &[
            ("text-anchor", "middle"),
            ("transform-box", "fill-box"),
            ("transform-origin", "center"),
            ("transform", "rotate(-90deg)"),
        ],
    ),
    (
        "path.density-curve",
        &[
            ("stroke-linejoin", "round"),
            ("stroke-width", "2px"),
            ("fill", "none"),
        ],
    ),
];

/// Configuration of a density plot.
///
/// `bins` controls the resolution of the curve (`20 * bins + 1` points across the x range) and,
/// together with `smoothing`, the kernel bandwidth (`smoothing / bins` of the x range). Densities
/// are expressed as probability mass per bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityPlot {
    pub bins: usize,
    pub smoothing: f64,
    pub x: Axis,
    pub y: Axis,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub label_x: Option<String>,
    pub label_y: Option<String>,
    /// Legend rows, top to bottom.
    pub legend: Vec<LegendEntry>,
    /// One curve per entry, drawn in this order.
    pub styles: Vec<SeriesStyle>,
}
impl Default for DensityPlot {
    fn default() -> DensityPlot {
        DensityPlot {
            bins: 40,
            smoothing: 1.0,
            x: Axis::new((0.0, 1.0), 0.1, 2),
            y: Axis::new((0.0, 1.0), 0.1, 2),
            title: None,
            subtitle: None,
            label_x: None,
            label_y: None,
            legend: vec![],
            styles: vec![],
        }
    }
}

impl DensityPlot {
    pub fn layout(&self) -> Layout {
        Layout {
            display: DENSITY_DISPLAY,
            margin_x: (120.0, 120.0),
            margin_y: (
                80.0,
                top_margin(50.0, self.title.is_some(), self.subtitle.is_some()),
            ),
        }
    }

    fn bins(&self) -> usize {
        self.bins.max(1)
    }

    /// Smoothed density of `samples` as `(u, density)` pairs, where `u` runs over `[0, 1]` across
    /// the x range. Empty input yields no points.
    pub fn density(&self, samples: &[f64]) -> Vec<Point> {
        if samples.is_empty() {
            return vec![];
        }
        if !(self.smoothing > 0.0) {
            warn!("Smoothing must be positive, got {}", self.smoothing);
            return vec![];
        }

        let bins = self.bins();
        let resolution = POINTS_PER_BIN * bins;
        let centers: Vec<f64> = samples.iter().map(|&p| self.x.normalize(p)).collect();
        let kde = Kde::new(&centers, Gaussian, self.smoothing / bins as f64);
        debug!(
            "Estimating density of {} samples with bandwidth {}",
            samples.len(),
            kde.bandwidth()
        );

        let us: Vec<f64> = (0..=resolution)
            .map(|i| i as f64 / resolution as f64)
            .collect();
        let densities = kde.map(&us);
        us.into_iter()
            .zip(densities.iter().map(|d| d / bins as f64))
            .collect()
    }

    /// The density curve of `samples` in normalized plot coordinates.
    pub fn curve(&self, samples: &[f64]) -> Vec<Point> {
        let (low, high) = self.y.range;
        self.density(samples)
            .into_iter()
            .map(|(u, density)| (u, (density - low) / (high - low)))
            .collect()
    }

    fn draw_vertical_axis(&self, plot: &Affine, layers: &mut Layers) -> Result<(), MarkupError> {
        for tick in self.y.ticks() {
            let left = plot.anchor((0.0, tick.position));
            let right = plot.anchor((1.0, tick.position));
            let length = tick.length();

            let grid = svg::path(
                vec![shift(left, 0.0, -0.5), shift(right, 1.0, -0.5)],
                &["grid", tick.grid_class()],
            )?;
            layers.grid(tick.is_major).push(grid);
            layers.ticks.push(svg::path(
                vec![shift(left, -8.0, -0.5), shift(left, -8.0 - length, -0.5)],
                &["tick"],
            )?);

            if tick.is_major {
                layers.labels.push(svg::text(
                    format::tick_label(tick.value),
                    shift(left, -16.0 - length, 0.0),
                    &["label-numeric", "label-y"],
                ));
            }
        }
        Ok(())
    }

    fn draw_decorations(&self, plot: &Affine, layers: &mut Layers) {
        let top = plot.anchor((0.5, 1.0));
        if let Some(title) = &self.title {
            layers
                .labels
                .push(svg::text(title.as_str(), shift(top, 0.0, -40.0), &["title"]));
        }
        if let Some(subtitle) = &self.subtitle {
            layers.labels.push(svg::text(
                subtitle.as_str(),
                shift(top, 0.0, -20.0),
                &["subtitle"],
            ));
        }
        if let Some(label) = &self.label_x {
            let bottom = plot.anchor((0.5, 0.0));
            layers.labels.push(svg::text(
                label.as_str(),
                shift(bottom, 0.0, 50.0),
                &["label-axis", "label-x"],
            ));
        }
        if let Some(label) = &self.label_y {
            let left = plot.anchor((0.0, 0.5));
            layers.labels.push(svg::text(
                label.as_str(),
                shift(left, -80.0, 0.0),
                &["label-axis", "label-y", "label-vertical"],
            ));
        }
    }

    fn stylesheet(&self) -> Stylesheet {
        let mut style = Stylesheet::new()
            .with_static(COMMON_RULES)
            .with_static(DENSITY_RULES);
        for series in &self.styles {
            let mut rule =
                Rule::new(format!("path.{}", series.name)).declare("stroke", &*series.color);
            if series.line == LineStyle::Dashed {
                rule = rule.declare("stroke-dasharray", "6 3");
            }
            style.push(rule);
        }
        style
    }

    /// Renders the curves of every series named in `styles`, plus grid, ticks, legend and labels.
    pub fn render(&self, series: &SeriesMap) -> Result<Document, MarkupError> {
        let plot = self.layout().plot_area();
        let mut layers = Layers::default();

        draw_horizontal_axis(&self.x, &plot, Edge::Bottom, &mut layers, |_| None)?;
        self.draw_vertical_axis(&plot, &mut layers)?;

        for style in &self.styles {
            let curve = series
                .get(&style.name)
                .map(|samples| self.curve(samples))
                .unwrap_or_default();
            if curve.is_empty() {
                warn!("No samples for series '{}'; its curve is omitted", style.name);
                continue;
            }
            layers.data.push(svg::path(
                curve.into_iter().map(|point| plot.apply(point)),
                &[style.name.as_str(), "density-curve"],
            )?);
        }

        let corner = plot.anchor((1.0, 1.0));
        for (i, entry) in self.legend.iter().enumerate() {
            let dy = LEGEND_SPACING * i as f64;
            layers.data.push(svg::path(
                vec![shift(corner, 10.0, dy), shift(corner, 25.0, dy)],
                &[entry.name.as_str(), "density-curve"],
            )?);
            layers.labels.push(svg::text(
                entry.label.as_str(),
                shift(corner, 32.0, dy),
                &["label-legend"],
            ));
        }

        self.draw_decorations(&plot, &mut layers);

        svg::document(&DENSITY_DISPLAY, self.stylesheet(), layers.into_content())
    }
}
