//! Dot-and-stem chart of named ratios against a baseline of 1.0.

use linked_hash_map::LinkedHashMap;

use super::{
    draw_horizontal_axis, shift, top_margin, Axis, Edge, Layers, Layout, COMMON_RULES,
};
use crate::format;
use crate::svg::{self, Document, MarkupError, Point, Rule, StaticRules, Stylesheet};

/// Name to ratio (new / baseline), in caller order.
pub type RatioMap = LinkedHashMap<String, f64>;

pub const DIFFERENTIAL_DISPLAY: [u32; 2] = [800, 680];

const ROW_HEIGHT: f64 = 20.0;
const LABEL_OFFSET: f64 = 16.0;
const DOT_RADIUS: f64 = 4.0;
/// Stems shorter than this many pixels are not drawn.
const MIN_STEM: f64 = 4.0;

static DIFFERENTIAL_RULES: StaticRules = &[
    (
        "path.stem",
        &[("stroke-width", "1px"), ("stroke-dasharray", "3 3")],
    ),
    (
        "circle.dot",
        &[("stroke-width", "2px"), ("stroke", "#666"), ("fill", "none")],
    ),
    ("text.label-numeric.unity", &[("font-weight", "700")]),
    (
        "text.label-x",
        &[("text-anchor", "middle"), ("dominant-baseline", "text-top")],
    ),
    (
        "text.label-legend, text.label-percent",
        &[("font-size", "12px"), ("dominant-baseline", "middle")],
    ),
    ("text.label-percent", &[("font-weight", "700")]),
    (
        "text.label-legend.better, text.label-percent.worse",
        &[("text-anchor", "begin")],
    ),
    (
        "text.label-legend.worse, text.label-percent.better",
        &[("text-anchor", "end")],
    ),
];

/// Colors for improvements and regressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialColors {
    /// Dot and stem stroke of rows with ratio <= 1.
    pub fill_better: String,
    /// Dot and stem stroke of rows with ratio > 1.
    pub fill_worse: String,
    /// Percent label of rows with ratio <= 1.
    pub text_better: String,
    /// Percent label of rows with ratio > 1.
    pub text_worse: String,
}
impl Default for DifferentialColors {
    fn default() -> Self {
        DifferentialColors {
            fill_better: "#ff694eff".to_owned(),
            fill_worse: "#888888ff".to_owned(),
            text_better: "#ff694eff".to_owned(),
            text_worse: "#666666ff".to_owned(),
        }
    }
}

/// Whether a ratio is an improvement. A ratio of exactly 1.0 counts as better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Better,
    Worse,
}
impl Verdict {
    pub fn of(ratio: f64) -> Verdict {
        if ratio <= 1.0 {
            Verdict::Better
        } else {
            Verdict::Worse
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            Verdict::Better => "better",
            Verdict::Worse => "worse",
        }
    }

    /// Horizontal direction from the unity line toward the row's legend label.
    fn outward(self) -> f64 {
        match self {
            Verdict::Better => 1.0,
            Verdict::Worse => -1.0,
        }
    }
}

/// One laid-out row of the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub name: &'a str,
    pub ratio: f64,
    pub verdict: Verdict,
    /// Pixel position of the row's dot.
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialPlot {
    pub axis: Axis,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub colors: DifferentialColors,
}
impl Default for DifferentialPlot {
    fn default() -> DifferentialPlot {
        DifferentialPlot {
            axis: Axis::new((0.0, 2.0), 1.0, 5),
            title: None,
            subtitle: None,
            colors: DifferentialColors::default(),
        }
    }
}

impl DifferentialPlot {
    pub fn layout(&self) -> Layout {
        Layout {
            display: DIFFERENTIAL_DISPLAY,
            margin_x: (60.0, 60.0),
            margin_y: (
                20.0,
                top_margin(80.0, self.title.is_some(), self.subtitle.is_some()),
            ),
        }
    }

    fn pixel_x(&self, value: f64) -> f64 {
        let layout = self.layout();
        layout.margin_x.0 + layout.area().0 * self.axis.normalize(value)
    }

    /// Pixel x-coordinate of a ratio of 1.0.
    pub fn unity(&self) -> f64 {
        self.pixel_x(1.0)
    }

    /// Rows sorted by ascending ratio. Equal ratios keep their input order.
    pub fn rows<'a>(&self, ratios: &'a RatioMap) -> Vec<Row<'a>> {
        let mut sorted: Vec<(&'a str, f64)> = ratios
            .iter()
            .map(|(name, &ratio)| (name.as_str(), ratio))
            .collect();
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

        let top = self.layout().margin_y.1;
        sorted
            .into_iter()
            .enumerate()
            .map(|(i, (name, ratio))| Row {
                name,
                ratio,
                verdict: Verdict::of(ratio),
                position: (self.pixel_x(ratio), top + (i as f64 + 0.5) * ROW_HEIGHT),
            })
            .collect()
    }

    fn stylesheet(&self) -> Stylesheet {
        let colors = &self.colors;
        let mut style = Stylesheet::new()
            .with_static(COMMON_RULES)
            .with_static(DIFFERENTIAL_RULES);
        style.push(
            Rule::new("circle.better, path.stem.better").declare("stroke", &*colors.fill_better),
        );
        style.push(
            Rule::new("circle.worse, path.stem.worse").declare("stroke", &*colors.fill_worse),
        );
        style.push(Rule::new("text.label-percent.better").declare("fill", &*colors.text_better));
        style.push(Rule::new("text.label-percent.worse").declare("fill", &*colors.text_worse));
        style
    }

    pub fn render(&self, ratios: &RatioMap) -> Result<Document, MarkupError> {
        let plot = self.layout().plot_area();
        let mut layers = Layers::default();

        draw_horizontal_axis(&self.axis, &plot, Edge::Top, &mut layers, |tick| {
            if format::tick_label(tick.value) == format::tick_label(1.0) {
                Some("unity")
            } else {
                None
            }
        })?;

        let top = plot.anchor((0.5, 1.0));
        if let Some(title) = &self.title {
            layers
                .labels
                .push(svg::text(title.as_str(), shift(top, 0.0, -70.0), &["title"]));
        }
        if let Some(subtitle) = &self.subtitle {
            layers.labels.push(svg::text(
                subtitle.as_str(),
                shift(top, 0.0, -50.0),
                &["subtitle"],
            ));
        }

        let unity = self.unity();
        let rows = self.rows(ratios);
        let mut stems = vec![];
        let mut dots = vec![];
        let mut legend = vec![];
        let mut percents = vec![];
        for row in &rows {
            let (x, y) = row.position;
            let class = row.verdict.class();
            let outward = row.verdict.outward();

            legend.push(svg::text(
                row.name,
                (unity + LABEL_OFFSET * outward, y),
                &["label-legend", class],
            ));
            percents.push(svg::text(
                format::percent_difference(row.ratio),
                (x - LABEL_OFFSET * outward, y),
                &["label-percent", class],
            ));
            if (x - unity).abs() > MIN_STEM {
                stems.push(svg::path(
                    vec![(unity, y), (x + MIN_STEM * outward, y)],
                    &["stem", class],
                )?);
            }
            dots.push(svg::circle(row.position, DOT_RADIUS, &["dot", class]));
        }
        layers.data.extend(stems);
        layers.data.extend(dots);
        layers.labels.extend(legend);
        layers.labels.extend(percents);

        svg::document(
            &DIFFERENTIAL_DISPLAY,
            self.stylesheet(),
            layers.into_content(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::svg::Element;
    use quickcheck::{quickcheck, TestResult};

    fn ratios(entries: &[(&str, f64)]) -> RatioMap {
        entries
            .iter()
            .map(|&(name, ratio)| (name.to_owned(), ratio))
            .collect()
    }

    fn texts<'a>(document: &'a Document, class: &str) -> Vec<&'a str> {
        document
            .content()
            .iter()
            .filter(|e| e.has_class(class))
            .filter_map(|e| match e {
                Element::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_scenario() {
        let plot = DifferentialPlot::default();
        let data = ratios(&[("x", 0.9), ("y", 1.1), ("z", 1.0)]);
        let document = plot.render(&data).unwrap();

        assert_eq!(texts(&document, "label-legend"), vec!["x", "z", "y"]);
        assert_eq!(
            texts(&document, "label-percent"),
            vec!["-10.00 %", "0.00 %", "+10.00 %"]
        );

        let z = document
            .content()
            .iter()
            .find(|e| matches!(e, Element::Text { content, .. } if content == "z"))
            .unwrap();
        assert!(z.has_class("better"));
        let y = document
            .content()
            .iter()
            .find(|e| matches!(e, Element::Text { content, .. } if content == "y"))
            .unwrap();
        assert!(y.has_class("worse"));
    }

    #[test]
    fn test_row_layout() {
        let plot = DifferentialPlot {
            title: Some("relative file size".to_owned()),
            ..DifferentialPlot::default()
        };
        let data = ratios(&[("a", 1.5), ("b", 0.5)]);
        let rows = plot.rows(&data);

        // Plot area spans x in [60, 740]; top margin is 100 with a title.
        assert_eq!(plot.unity(), 400.0);
        assert_eq!(rows[0].name, "b");
        assert_eq!(rows[0].position, (230.0, 110.0));
        assert_eq!(rows[1].name, "a");
        assert_eq!(rows[1].position, (570.0, 130.0));
    }

    #[test]
    fn test_label_sides() {
        let plot = DifferentialPlot::default();
        let data = ratios(&[("fast", 0.5), ("slow", 1.5)]);
        let svg = plot.render(&data).unwrap().to_string();

        assert!(svg.contains(r#"<text x="416" y="90" class="label-legend better">fast</text>"#));
        assert!(svg.contains(r#"<text x="214" y="90" class="label-percent better">-50.00 %</text>"#));
        assert!(svg.contains(r#"<text x="384" y="110" class="label-legend worse">slow</text>"#));
        assert!(svg.contains(r#"<text x="586" y="110" class="label-percent worse">+50.00 %</text>"#));
        assert!(svg.contains(r#"<path class="stem better" d="M 400,90 L 234,90"/>"#));
        assert!(svg.contains(r#"<path class="stem worse" d="M 400,110 L 566,110"/>"#));
        assert!(svg.contains(r#"<circle class="dot better" cx="230" cy="90" r="4"/>"#));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let plot = DifferentialPlot::default();
        let data = ratios(&[("c", 1.2), ("a", 0.8), ("b", 0.8), ("d", 1.2)]);
        let names: Vec<&str> = plot.rows(&data).iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_unity_tick_label() {
        let plot = DifferentialPlot {
            axis: Axis::new((0.0, 1.8), 0.2, 4),
            ..DifferentialPlot::default()
        };
        let document = plot.render(&RatioMap::new()).unwrap();
        let unity: Vec<&str> = texts(&document, "unity");
        assert_eq!(unity, vec!["1.0"]);
        assert_eq!(texts(&document, "label-numeric").len(), 10);
    }

    #[test]
    fn test_stylesheet_colors() {
        let plot = DifferentialPlot {
            colors: DifferentialColors {
                fill_better: "green".to_owned(),
                fill_worse: "red".to_owned(),
                text_better: "darkgreen".to_owned(),
                text_worse: "darkred".to_owned(),
            },
            ..DifferentialPlot::default()
        };
        let css = plot.render(&RatioMap::new()).unwrap().style().to_string();
        assert!(css.contains("circle.better, path.stem.better\n{\n    stroke: green;\n}"));
        assert!(css.contains("circle.worse, path.stem.worse\n{\n    stroke: red;\n}"));
        assert!(css.contains("text.label-percent.better\n{\n    fill: darkgreen;\n}"));
        assert!(css.contains("text.label-percent.worse\n{\n    fill: darkred;\n}"));
    }

    #[test]
    fn test_layering() {
        let plot = DifferentialPlot::default();
        let data = ratios(&[("a", 0.5), ("b", 1.7), ("c", 1.0)]);
        let document = plot.render(&data).unwrap();
        let rank = |element: &Element| match element {
            e if e.has_class("grid-minor") => 0,
            e if e.has_class("grid-major") => 1,
            e if e.has_class("tick") => 2,
            e if e.has_class("stem") => 3,
            Element::Circle { .. } => 4,
            _ => 5,
        };
        let ranks: Vec<u8> = document.content().iter().map(rank).collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    }

    quickcheck! {
        fn rows_are_sorted(values: Vec<u16>) -> bool {
            let plot = DifferentialPlot::default();
            let data: RatioMap = values
                .iter()
                .enumerate()
                .map(|(i, &v)| (format!("image-{}", i), f64::from(v) / 10000.0))
                .collect();
            let rows = plot.rows(&data);
            rows.len() == data.len()
                && rows.windows(2).all(|w| w[0].ratio <= w[1].ratio)
                && rows.iter().all(|r| (r.verdict == Verdict::Better) == (r.ratio <= 1.0))
        }

        fn stems_only_when_far_from_unity(value: u16) -> TestResult {
            let ratio = f64::from(value) / 20000.0;
            let plot = DifferentialPlot::default();
            let data = ratios(&[("image", ratio)]);
            let document = plot.render(&data).unwrap();
            let stems = document.content().iter().filter(|e| e.has_class("stem")).count();
            let gap = (plot.rows(&data)[0].position.0 - plot.unity()).abs();
            TestResult::from_bool(stems == if gap > 4.0 { 1 } else { 0 })
        }
    }
}
