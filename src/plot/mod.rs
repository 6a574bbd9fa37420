//! Layout machinery shared by the density and differential renderers: affine transforms from
//! normalized plot coordinates to pixels, axis/tick generation, and the common stylesheet.

pub mod density;
pub mod differential;

pub use self::density::{DensityPlot, SeriesMap};
pub use self::differential::{DifferentialColors, DifferentialPlot, RatioMap};

use crate::format;
use crate::svg::{self, Element, MarkupError, Point, StaticRules};

/// Tolerance applied when dividing an axis range into grid cells. A range that is within this
/// distance of a whole number of cells counts as that whole number; anything else is truncated.
pub const CELL_EPSILON: f64 = 1e-5;

const MAJOR_TICK_LENGTH: f64 = 12.0;
const MINOR_TICK_LENGTH: f64 = 6.0;

/// `point * scale + offset`, component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Affine {
    pub scale: (f64, f64),
    pub offset: (f64, f64),
}
impl Affine {
    pub fn new(scale: (f64, f64), offset: (f64, f64)) -> Affine {
        Affine { scale, offset }
    }

    /// Identity scale with a fixed pixel offset.
    pub fn shift(dx: f64, dy: f64) -> Affine {
        Affine::new((1.0, 1.0), (dx, dy))
    }

    pub fn apply(&self, (x, y): Point) -> Point {
        (
            x * self.scale.0 + self.offset.0,
            y * self.scale.1 + self.offset.1,
        )
    }

    /// Like `apply`, snapped to whole pixels (ties to even).
    pub fn anchor(&self, point: Point) -> Point {
        let (x, y) = self.apply(point);
        (x.round_ties_even(), y.round_ties_even())
    }
}

/// Nudges a pixel-space point by a fixed offset.
pub fn shift(point: Point, dx: f64, dy: f64) -> Point {
    Affine::shift(dx, dy).apply(point)
}

/// Canvas size and margins. Margins are `(left, right)` and `(bottom, top)` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Layout {
    pub display: [u32; 2],
    pub margin_x: (f64, f64),
    pub margin_y: (f64, f64),
}
impl Layout {
    /// Plot area size. The height is negative since pixel y grows downwards.
    pub fn area(&self) -> (f64, f64) {
        let [width, height] = self.display;
        (
            f64::from(width) - self.margin_x.0 - self.margin_x.1,
            self.margin_y.0 + self.margin_y.1 - f64::from(height),
        )
    }

    /// Pixel position of the plot area's bottom-left corner.
    pub fn offset(&self) -> (f64, f64) {
        (
            self.margin_x.0,
            f64::from(self.display[1]) - self.margin_y.0,
        )
    }

    /// Maps normalized plot coordinates (`[0, 1]` on both axes) into pixel space.
    pub fn plot_area(&self) -> Affine {
        Affine::new(self.area(), self.offset())
    }
}

/// Top margin, grown to make room for the title and subtitle when present.
pub(crate) fn top_margin(base: f64, title: bool, subtitle: bool) -> f64 {
    base + if subtitle { 10.0 } else { 0.0 } + if title { 20.0 } else { 0.0 }
}

/// Data range of one axis, the spacing of its major ticks, and how many minor cells each major
/// interval is split into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Axis {
    pub range: (f64, f64),
    pub major: f64,
    pub minor: usize,
}
impl Axis {
    pub fn new(range: (f64, f64), major: f64, minor: usize) -> Axis {
        Axis {
            range,
            major,
            minor,
        }
    }

    fn subdivisions(&self) -> usize {
        self.minor.max(1)
    }

    fn width(&self) -> f64 {
        self.range.1 - self.range.0
    }

    /// Number of minor grid cells spanning the range.
    pub fn cells(&self) -> usize {
        let exact = self.width() / self.major * self.subdivisions() as f64;
        if !exact.is_finite() || exact <= 0.0 {
            return 0;
        }
        let cells = (exact + CELL_EPSILON).floor();
        if exact - cells > CELL_EPSILON {
            warn!(
                "Axis range {:?} does not divide into whole cells of {}/{}; truncating to {} cells",
                self.range,
                self.major,
                self.subdivisions(),
                cells
            );
        }
        cells as usize
    }

    /// Position of `value` along the axis, with the range mapped to `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.range.0) / self.width()
    }

    /// One tick per grid line, `cells() + 1` in total. Every `minor`-th tick is major.
    pub fn ticks(&self) -> Vec<Tick> {
        let minor = self.subdivisions();
        let step = self.major / minor as f64;
        let width = self.width();
        (0..=self.cells())
            .map(|index| Tick {
                index,
                position: if width == 0.0 {
                    0.0
                } else {
                    index as f64 * step / width
                },
                value: index as f64 * step + self.range.0,
                is_major: index % minor == 0,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub index: usize,
    /// Normalized position in `[0, 1]`.
    pub position: f64,
    /// Value in data units.
    pub value: f64,
    pub is_major: bool,
}
impl Tick {
    fn length(&self) -> f64 {
        if self.is_major {
            MAJOR_TICK_LENGTH
        } else {
            MINOR_TICK_LENGTH
        }
    }

    fn grid_class(&self) -> &'static str {
        if self.is_major {
            "grid-major"
        } else {
            "grid-minor"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// Stroke color and line style for one series. Curves and their stylesheet rules are emitted in
/// the order these entries are given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub name: String,
    pub color: String,
    pub line: LineStyle,
}
impl SeriesStyle {
    pub fn new(name: &str, color: &str, line: LineStyle) -> SeriesStyle {
        SeriesStyle {
            name: name.to_owned(),
            color: color.to_owned(),
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub name: String,
    pub label: String,
}
impl LegendEntry {
    pub fn new(name: &str, label: &str) -> LegendEntry {
        LegendEntry {
            name: name.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// Output elements grouped by z-order.
#[derive(Debug, Default)]
pub(crate) struct Layers {
    pub grid_minor: Vec<Element>,
    pub grid_major: Vec<Element>,
    pub ticks: Vec<Element>,
    pub data: Vec<Element>,
    pub labels: Vec<Element>,
}
impl Layers {
    pub fn grid(&mut self, major: bool) -> &mut Vec<Element> {
        if major {
            &mut self.grid_major
        } else {
            &mut self.grid_minor
        }
    }

    /// Flattens the layers bottom to top.
    pub fn into_content(self) -> Vec<Element> {
        let mut content = self.grid_minor;
        content.extend(self.grid_major);
        content.extend(self.ticks);
        content.extend(self.data);
        content.extend(self.labels);
        content
    }
}

/// Which edge of the plot area the horizontal axis ticks hang from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Edge {
    Bottom,
    Top,
}

/// Vertical grid lines, ticks and numeric labels for a horizontal axis. `extra_class` may add a
/// class to individual major tick labels.
pub(crate) fn draw_horizontal_axis<F>(
    axis: &Axis,
    plot: &Affine,
    edge: Edge,
    layers: &mut Layers,
    extra_class: F,
) -> Result<(), MarkupError>
where
    F: Fn(&Tick) -> Option<&'static str>,
{
    for tick in axis.ticks() {
        let bottom = plot.anchor((tick.position, 0.0));
        let top = plot.anchor((tick.position, 1.0));
        let length = tick.length();

        let grid = svg::path(
            vec![shift(bottom, 0.5, 0.0), shift(top, 0.5, -1.0)],
            &["grid", tick.grid_class()],
        )?;
        layers.grid(tick.is_major).push(grid);

        let (base, outward) = match edge {
            Edge::Bottom => (bottom, 1.0),
            Edge::Top => (top, -1.0),
        };
        layers.ticks.push(svg::path(
            vec![
                shift(base, 0.5, 8.0 * outward),
                shift(base, 0.5, (8.0 + length) * outward),
            ],
            &["tick"],
        )?);

        if tick.is_major {
            let mut classes = vec!["label-numeric", "label-x"];
            classes.extend(extra_class(&tick));
            layers.labels.push(svg::text(
                format::tick_label(tick.value),
                shift(base, 0.0, (16.0 + length) * outward),
                &classes,
            ));
        }
    }
    Ok(())
}

/// Rules shared by every plot.
pub(crate) static COMMON_RULES: StaticRules = &[
    ("rect.background", &[("fill", "white")]),
    ("path.grid", &[("stroke-width", "1px"), ("fill", "none")]),
    ("path.grid-major", &[("stroke", "#eeeeeeff")]),
    ("path.grid-minor", &[("stroke", "#f5f5f5ff")]),
    (
        "path.tick",
        &[
            ("stroke-width", "1px"),
            ("stroke", "#333333ff"),
            ("fill", "none"),
        ],
    ),
    (
        "text",
        &[("fill", "#333333ff"), ("font-family", "'SF Mono'")],
    ),
    ("text.label-numeric", &[("font-size", "12px")]),
    ("text.title, text.subtitle", &[("text-anchor", "middle")]),
    ("text.title", &[("font-size", "20px")]),
    ("text.subtitle", &[("font-size", "12px")]),
];
